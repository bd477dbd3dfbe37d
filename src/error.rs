//! Error taxonomy for the validation procedure
//!
//! Every failure the procedure can hit is a variant here, so callers branch on
//! the failure kind instead of relying on a crash. Only the missing-input
//! class is treated as recoverable by the binary.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running a validation
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("'{}' not found. Please place it in the same folder.", .path.display())]
    InputNotFound { path: PathBuf },

    #[error("Failed to read '{}': {source}", .path.display())]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input table is empty (no header row)")]
    EmptyTable,

    #[error("Missing required columns {missing:?}; found {found:?}")]
    MissingColumns {
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid value in column '{column}' at line {line}: '{value}'")]
    InvalidValue {
        line: usize,
        column: String,
        value: String,
    },

    #[error("Insufficient data: need at least {required} paired rows, got {rows}")]
    InsufficientRows { rows: usize, required: usize },

    #[error("Invalid null model scale: noise_std={noise_std}, row_count={row_count}")]
    InvalidScale { noise_std: f64, row_count: usize },

    #[error("Failed to write plot '{}': {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: RenderError,
    },

    #[error("Failed to write progress output: {0}")]
    Report(#[source] std::io::Error),
}

impl ValidationError {
    /// True for the input-missing class, which the binary reports and recovers from
    pub fn is_input_missing(&self) -> bool {
        matches!(
            self,
            ValidationError::InputNotFound { .. } | ValidationError::InputUnreadable { .. }
        )
    }
}

/// Errors raised while drawing or encoding the figure
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),

    #[error("Drawing failed: {0}")]
    Draw(String),
}

/// Result type for validation operations
pub type Result<T> = std::result::Result<T, ValidationError>;
