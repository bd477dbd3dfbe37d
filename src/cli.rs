//! CLI argument parsing for the null model validator
//!
//! With no arguments the run uses the built-in defaults. Flags override
//! values from `--config`, which override the defaults.

use crate::config::ValidationConfig;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Progress lines on stdout (default)
    Text,
    /// Only the final report as JSON
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "null-model-validation")]
#[command(version)]
#[command(about = "Test an observed gain difference against a random-phase null model", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Observation table (default: Fig1_coherence.csv)
    #[arg(short = 'i', long = "input", value_name = "CSV")]
    pub input: Option<PathBuf>,

    /// Figure output path (default: Fig4_True_NullModel.png)
    #[arg(short = 'o', long = "output", value_name = "PNG")]
    pub output: Option<PathBuf>,

    /// Number of null-model simulations (default: 10000)
    #[arg(short = 'n', long = "simulations", value_name = "N")]
    pub simulations: Option<usize>,

    /// Random seed of the null model (default: 42)
    #[arg(short = 's', long = "seed", value_name = "SEED")]
    pub seed: Option<u64>,

    /// Figure resolution (default: 300)
    #[arg(long = "dpi", value_name = "DPI")]
    pub dpi: Option<u32>,

    /// TrueType font for figure text
    #[arg(long = "font", value_name = "TTF")]
    pub font: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Build the run configuration: defaults, then config file, then flags
    pub fn resolve_config(&self) -> Result<ValidationConfig> {
        let mut config = match &self.config {
            Some(path) => ValidationConfig::from_file(path)?,
            None => ValidationConfig::default(),
        };

        if let Some(input) = &self.input {
            config.input_path = input.clone();
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(n) = self.simulations {
            config.n_simulations = n;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(dpi) = self.dpi {
            config.dpi = dpi;
        }
        if let Some(font) = &self.font {
            config.font_path = Some(font.clone());
        }

        config.validate()?;
        Ok(config)
    }
}
