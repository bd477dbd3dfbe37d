//! Observation table loading
//!
//! The input is a comma-separated file with a header row. Only the
//! `Gain_Dual` and `Gain_Single` columns are consumed; any other columns are
//! ignored and column order is free.
//!
//! # Example file content
//! ```csv
//! Frequency,Gain_Dual,Gain_Single
//! 1,10.0,2.0
//! 2,12.0,3.0
//! ```

use crate::error::{Result, ValidationError};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Header of the dual-condition gain column
pub const GAIN_DUAL: &str = "Gain_Dual";
/// Header of the single-condition gain column
pub const GAIN_SINGLE: &str = "Gain_Single";

/// Cell tokens read as a missing value
const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "<NA>", "#N/A",
];

/// One row of paired measurements; `None` marks a missing cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub gain_dual: Option<f64>,
    pub gain_single: Option<f64>,
}

impl Observation {
    /// `Gain_Dual - Gain_Single`, or `None` if either side is missing
    pub fn difference(&self) -> Option<f64> {
        match (self.gain_dual, self.gain_single) {
            (Some(dual), Some(single)) => Some(dual - single),
            _ => None,
        }
    }
}

/// Immutable table of observations, loaded once per run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationTable {
    rows: Vec<Observation>,
}

impl ObservationTable {
    /// Build a table from complete `(Gain_Dual, Gain_Single)` pairs
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        let rows = pairs
            .iter()
            .map(|&(dual, single)| Observation {
                gain_dual: Some(dual),
                gain_single: Some(single),
            })
            .collect();
        Self { rows }
    }

    /// Parse a table from CSV text
    pub fn from_csv_str(content: &str) -> Result<Self> {
        Self::from_reader(content.as_bytes())
    }

    /// Parse a table from any CSV byte stream
    ///
    /// Fields are trimmed and may be quoted. Blank lines are skipped. A row
    /// shorter than the header reads its absent cells as missing values.
    ///
    /// # Errors
    /// `EmptyTable` without a header, `MissingColumns` when a required header
    /// is absent, `Parse` for malformed CSV and `InvalidValue` for non-numeric cells.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let header: Vec<String> = reader
            .headers()
            .map_err(parse_error)?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();
        if header.iter().all(String::is_empty) {
            return Err(ValidationError::EmptyTable);
        }

        let dual_idx = header.iter().position(|h| h == GAIN_DUAL);
        let single_idx = header.iter().position(|h| h == GAIN_SINGLE);
        let (dual_idx, single_idx) = match (dual_idx, single_idx) {
            (Some(d), Some(s)) => (d, s),
            _ => {
                let missing = [(GAIN_DUAL, dual_idx), (GAIN_SINGLE, single_idx)]
                    .iter()
                    .filter(|(_, idx)| idx.is_none())
                    .map(|(name, _)| name.to_string())
                    .collect();
                return Err(ValidationError::MissingColumns {
                    missing,
                    found: header,
                });
            }
        };

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(parse_error)?;
            // Whitespace-only line
            if record.len() == 1 && record.get(0) == Some("") {
                continue;
            }
            let line = record.position().map_or(0, |pos| pos.line() as usize);

            rows.push(Observation {
                gain_dual: parse_cell(record.get(dual_idx), line, GAIN_DUAL)?,
                gain_single: parse_cell(record.get(single_idx), line, GAIN_SINGLE)?,
            });
        }

        Ok(Self { rows })
    }

    /// Number of data rows, including rows with missing cells
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// All rows in file order
    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    /// Per-row differences for rows with both values present
    pub fn differences(&self) -> Vec<f64> {
        self.rows.iter().filter_map(Observation::difference).collect()
    }
}

/// Load the observation table from a CSV file
///
/// The file is closed once parsing finishes.
///
/// # Errors
/// `InputNotFound` if the file does not exist, `InputUnreadable` for any
/// other IO failure on open, plus the errors of [`ObservationTable::from_reader`].
pub fn load(path: &Path) -> Result<ObservationTable> {
    let file = File::open(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ValidationError::InputNotFound {
            path: path.to_path_buf(),
        },
        _ => ValidationError::InputUnreadable {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let table = ObservationTable::from_reader(file)?;
    tracing::debug!(path = %path.display(), rows = table.row_count(), "Loaded observation table");
    Ok(table)
}

fn parse_error(err: csv::Error) -> ValidationError {
    ValidationError::Parse {
        line: err.position().map_or(0, |pos| pos.line() as usize),
        message: err.to_string(),
    }
}

/// Parse one numeric cell; absent cells and missing-value tokens become `None`
fn parse_cell(raw: Option<&str>, line: usize, column: &str) -> Result<Option<f64>> {
    let value = raw.unwrap_or("");
    if MISSING_TOKENS.contains(&value) {
        return Ok(None);
    }

    value
        .parse::<f64>()
        .map(|v| if v.is_nan() { None } else { Some(v) })
        .map_err(|_| ValidationError::InvalidValue {
            line,
            column: column.to_string(),
            value: value.to_string(),
        })
}
