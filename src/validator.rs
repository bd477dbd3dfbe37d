//! End-to-end validation procedure
//!
//! load -> observed statistic -> null simulation -> significance -> figure.
//! The only early exit is a failed load; every later step runs to completion
//! or returns its error.

use crate::config::ValidationConfig;
use crate::error::{Result, ValidationError};
use crate::null_model::{simulate_null, GaussianSource, SeededGaussian};
use crate::render::{NullModelFigure, PlottersRenderer, Renderer};
use crate::stats::{compute_observed, score, ObservedStatistic, SignificanceSummary};
use crate::table::{self, ObservationTable};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub observed: ObservedStatistic,
    pub significance: SignificanceSummary,
    pub seed: u64,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub dpi: u32,
}

/// Runs the validation with an injectable random source and renderer
///
/// The source is consumed as the run draws from it, so a validator is meant
/// for a single run; build a new one to reproduce a seed.
pub struct Validator<S = SeededGaussian, R = PlottersRenderer> {
    config: ValidationConfig,
    source: S,
    renderer: R,
}

impl Validator {
    /// Validator with the seeded default generator and the bitmap renderer
    pub fn from_config(config: ValidationConfig) -> Self {
        let source = SeededGaussian::from_seed(config.seed);
        let renderer = PlottersRenderer::new(config.font_path.clone());
        Self::with_parts(config, source, renderer)
    }
}

impl<S: GaussianSource, R: Renderer> Validator<S, R> {
    pub fn with_parts(config: ValidationConfig, source: S, renderer: R) -> Self {
        Self {
            config,
            source,
            renderer,
        }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Load the configured input and run the procedure
    ///
    /// Progress lines go to `out`. On a load failure only the start line has
    /// been written and no figure exists.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<ValidationReport> {
        progress(out, "Starting Null Model Validation...")?;
        tracing::info!(input = %self.config.input_path.display(), "Loading observation table");
        let table = table::load(&self.config.input_path)?;
        self.analyze(&table, out)
    }

    /// Run the procedure on an already loaded table
    pub fn run_with_table<W: Write>(
        &mut self,
        table: &ObservationTable,
        out: &mut W,
    ) -> Result<ValidationReport> {
        progress(out, "Starting Null Model Validation...")?;
        self.analyze(table, out)
    }

    fn analyze<W: Write>(
        &mut self,
        table: &ObservationTable,
        out: &mut W,
    ) -> Result<ValidationReport> {
        let observed = compute_observed(table)?;
        progress(
            out,
            &format!("Observed Real Gain Difference: {:.4}", observed.real_diff),
        )?;

        let n_simulations = self.config.n_simulations;
        progress(out, &format!("Running {} random simulations...", n_simulations))?;
        let null_samples = simulate_null(
            observed.noise_std,
            observed.row_count,
            n_simulations,
            &mut self.source,
        )?;

        let significance = score(&null_samples, observed.real_diff);
        tracing::info!(
            max_random = significance.max_random,
            p_value = significance.p_value,
            exceed_count = significance.exceed_count,
            "Scored observed statistic"
        );
        progress(
            out,
            &format!("Null Model Max Gain: {:.4}", significance.max_random),
        )?;
        progress(
            out,
            &format!("P-Value: {}", format_scientific(significance.p_value, 6)),
        )?;

        progress(out, "Generating validation plot...")?;
        let figure = NullModelFigure {
            null_samples: &null_samples,
            real_diff: observed.real_diff,
            max_random: significance.max_random,
            dpi: self.config.dpi,
        };
        let output_path = self.config.output_path.clone();
        self.renderer
            .render(&figure, &output_path)
            .map_err(|source| ValidationError::WriteFailure {
                path: output_path.clone(),
                source,
            })?;

        progress(
            out,
            &format!(
                "Validation complete. Plot saved as '{}'.",
                output_path.display()
            ),
        )?;

        Ok(ValidationReport {
            observed,
            significance,
            seed: self.config.seed,
            input_path: self.config.input_path.clone(),
            output_path,
            dpi: self.config.dpi,
        })
    }
}

fn progress<W: Write>(out: &mut W, line: &str) -> Result<()> {
    writeln!(out, "{}", line).map_err(ValidationError::Report)
}

/// Scientific notation with a signed, two-digit exponent (`9.999000e-05`)
pub fn format_scientific(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let formatted = format!("{:.*e}", precision, value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exp: i32 = exponent.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => formatted,
    }
}
