//! Run configuration
//!
//! All tunables of a validation run live in [`ValidationConfig`]. Values
//! come from the defaults, then an optional TOML file, then CLI flags.
//!
//! # Example validation.toml
//!
//! ```toml
//! n_simulations = 20000
//! seed = 7
//! input_path = "data/Fig1_coherence.csv"
//! output_path = "out/Fig4_True_NullModel.png"
//! dpi = 150
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_N_SIMULATIONS: usize = 10_000;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_INPUT: &str = "Fig1_coherence.csv";
pub const DEFAULT_OUTPUT: &str = "Fig4_True_NullModel.png";
pub const DEFAULT_DPI: u32 = 300;

/// Highest accepted DPI (a 10x6 inch figure at 600 DPI is 6000x3600 pixels)
pub const MAX_DPI: u32 = 600;

/// Configuration for one validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Number of null-model draws
    pub n_simulations: usize,
    /// Seed of the null-model generator
    pub seed: u64,
    /// Observation table (CSV)
    pub input_path: PathBuf,
    /// Figure destination (PNG, overwritten)
    pub output_path: PathBuf,
    /// Figure resolution
    pub dpi: u32,
    /// TrueType font for figure text; a system font is searched when unset
    pub font_path: Option<PathBuf>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            n_simulations: DEFAULT_N_SIMULATIONS,
            seed: DEFAULT_SEED,
            input_path: PathBuf::from(DEFAULT_INPUT),
            output_path: PathBuf::from(DEFAULT_OUTPUT),
            dpi: DEFAULT_DPI,
            font_path: None,
        }
    }
}

impl ValidationConfig {
    /// Load configuration from a TOML file
    ///
    /// Keys that are absent keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the procedure cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.n_simulations == 0 {
            anyhow::bail!("n_simulations must be at least 1");
        }
        if self.dpi == 0 || self.dpi > MAX_DPI {
            anyhow::bail!("dpi must be between 1 and {} (got {})", MAX_DPI, self.dpi);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_run() {
        let config = ValidationConfig::default();
        assert_eq!(config.n_simulations, 10_000);
        assert_eq!(config.seed, 42);
        assert_eq!(config.input_path, PathBuf::from("Fig1_coherence.csv"));
        assert_eq!(config.output_path, PathBuf::from("Fig4_True_NullModel.png"));
        assert_eq!(config.dpi, 300);
        assert!(config.font_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ValidationConfig::from_toml_str("seed = 7\ndpi = 150\n").unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.dpi, 150);
        assert_eq!(config.n_simulations, 10_000);
        assert_eq!(config.input_path, PathBuf::from("Fig1_coherence.csv"));
    }

    #[test]
    fn test_full_toml() {
        let toml = r#"
            n_simulations = 500
            seed = 1
            input_path = "in.csv"
            output_path = "out.png"
            dpi = 72
            font_path = "/fonts/Sans.ttf"
        "#;
        let config = ValidationConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.n_simulations, 500);
        assert_eq!(config.output_path, PathBuf::from("out.png"));
        assert_eq!(config.font_path, Some(PathBuf::from("/fonts/Sans.ttf")));
    }

    #[test]
    fn test_zero_simulations_rejected() {
        assert!(ValidationConfig::from_toml_str("n_simulations = 0").is_err());
    }

    #[test]
    fn test_dpi_bounds() {
        assert!(ValidationConfig::from_toml_str("dpi = 0").is_err());
        assert!(ValidationConfig::from_toml_str("dpi = 601").is_err());
        assert!(ValidationConfig::from_toml_str("dpi = 600").is_ok());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(ValidationConfig::from_toml_str("simulations = 5").is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let err = ValidationConfig::from_file("/nonexistent/validation.toml").unwrap_err();
        assert!(err.to_string().contains("validation.toml"));
    }
}
