//! Observed statistic, significance scoring, and plot statistics
//!
//! `compute_observed` and `score` are the two numeric steps of the
//! validation. The histogram and KDE helpers reproduce the binning and
//! smoothing used for the null distribution figure.

use crate::error::{Result, ValidationError};
use crate::table::ObservationTable;
use serde::Serialize;

/// Minimum number of paired differences for a sample standard deviation
const MIN_PAIRED_ROWS: usize = 2;

/// Upper bound on histogram bins for pathological inputs
const MAX_HISTOGRAM_BINS: usize = 1000;

/// Observed gain difference and the noise level derived from it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObservedStatistic {
    /// Mean of `Gain_Dual - Gain_Single`
    pub real_diff: f64,
    /// Sample standard deviation (N-1) of the same differences
    pub noise_std: f64,
    /// Rows in the table, including rows with missing cells
    pub row_count: usize,
    /// Rows that contributed a difference
    pub paired_rows: usize,
}

/// Significance of the observed statistic against the null samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignificanceSummary {
    /// Largest null sample
    pub max_random: f64,
    /// One-sided p-value with +1 smoothing
    pub p_value: f64,
    /// Null samples at or above the observed statistic
    pub exceed_count: usize,
    pub n_simulations: usize,
    /// `real_diff - max_random`
    pub gap: f64,
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Sample standard deviation with N-1 denominator, `None` below two values
pub fn sample_std_dev(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    let m = mean(data)?;
    let sum_sq: f64 = data.iter().map(|x| (x - m) * (x - m)).sum();
    Some((sum_sq / (data.len() - 1) as f64).sqrt())
}

/// Calculate percentile from sorted data (linear interpolation)
pub fn percentile(sorted_data: &[f64], percentile: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    if sorted_data.len() == 1 {
        return sorted_data[0];
    }

    let index = (percentile / 100.0) * (sorted_data.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted_data[lower]
    } else {
        let weight = index - lower as f64;
        sorted_data[lower] * (1.0 - weight) + sorted_data[upper] * weight
    }
}

/// Compute the observed gain difference and noise estimate
///
/// Rows with a missing cell are skipped by both statistics but still count
/// toward `row_count`.
///
/// # Errors
/// `InsufficientRows` when fewer than two rows have both values.
pub fn compute_observed(table: &ObservationTable) -> Result<ObservedStatistic> {
    let diffs = table.differences();
    let insufficient = || ValidationError::InsufficientRows {
        rows: diffs.len(),
        required: MIN_PAIRED_ROWS,
    };

    let real_diff = mean(&diffs).ok_or_else(insufficient)?;
    let noise_std = sample_std_dev(&diffs).ok_or_else(insufficient)?;

    tracing::debug!(real_diff, noise_std, paired_rows = diffs.len(), "Computed observed statistic");

    Ok(ObservedStatistic {
        real_diff,
        noise_std,
        row_count: table.row_count(),
        paired_rows: diffs.len(),
    })
}

/// Score the observed statistic against the null samples
///
/// `p = (#{x >= real_diff} + 1) / (n + 1)`. The comparison is one-sided.
pub fn score(null_samples: &[f64], real_diff: f64) -> SignificanceSummary {
    let max_random = null_samples
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let exceed_count = null_samples.iter().filter(|&&x| x >= real_diff).count();
    let n_simulations = null_samples.len();
    let p_value = (exceed_count + 1) as f64 / (n_simulations + 1) as f64;

    SignificanceSummary {
        max_random,
        p_value,
        exceed_count,
        n_simulations,
        gap: real_diff - max_random,
    }
}

/// Histogram normalised so the bar areas sum to one
#[derive(Debug, Clone, PartialEq)]
pub struct DensityHistogram {
    /// `bins + 1` ascending edges
    pub edges: Vec<f64>,
    /// Density per bin
    pub densities: Vec<f64>,
}

impl DensityHistogram {
    /// Iterate `(left, right, density)` per bin
    pub fn bars(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.edges
            .windows(2)
            .zip(&self.densities)
            .map(|(w, &d)| (w[0], w[1], d))
    }

    pub fn max_density(&self) -> f64 {
        self.densities.iter().copied().fold(0.0, f64::max)
    }
}

/// Bin width from the smaller of the Freedman-Diaconis and Sturges rules
fn auto_bin_width(sorted: &[f64], range: f64) -> f64 {
    let n = sorted.len() as f64;
    let sturges = range / (n.log2() + 1.0);
    let iqr = percentile(sorted, 75.0) - percentile(sorted, 25.0);
    let fd = 2.0 * iqr * n.powf(-1.0 / 3.0);

    if fd > 0.0 {
        fd.min(sturges)
    } else {
        sturges
    }
}

/// Density histogram of the finite samples with automatic bin edges
pub fn density_histogram(samples: &[f64]) -> DensityHistogram {
    let mut sorted: Vec<f64> = samples.iter().copied().filter(|x| x.is_finite()).collect();
    if sorted.is_empty() {
        return DensityHistogram {
            edges: Vec::new(),
            densities: Vec::new(),
        };
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut first = sorted[0];
    let mut last = sorted[sorted.len() - 1];
    let bins = if last > first {
        let width = auto_bin_width(&sorted, last - first);
        if width > 0.0 {
            (((last - first) / width).ceil() as usize).clamp(1, MAX_HISTOGRAM_BINS)
        } else {
            1
        }
    } else {
        first -= 0.5;
        last += 0.5;
        1
    };

    let step = (last - first) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| first + step * i as f64).collect();

    let mut counts = vec![0usize; bins];
    for &x in &sorted {
        let idx = (((x - first) / (last - first)) * bins as f64).floor() as usize;
        counts[idx.min(bins - 1)] += 1;
    }

    let total = sorted.len() as f64;
    let densities = counts.iter().map(|&c| c as f64 / (total * step)).collect();

    DensityHistogram { edges, densities }
}

/// Gaussian kernel density estimate with Scott's bandwidth
///
/// Evaluated at `grid_points` evenly spaced points over the sample range.
/// Returns an empty curve when the bandwidth is degenerate.
pub fn kde_curve(samples: &[f64], grid_points: usize) -> Vec<(f64, f64)> {
    let finite: Vec<f64> = samples.iter().copied().filter(|x| x.is_finite()).collect();
    let sd = match sample_std_dev(&finite) {
        Some(sd) if sd > 0.0 => sd,
        _ => return Vec::new(),
    };
    if grid_points < 2 {
        return Vec::new();
    }

    let n = finite.len() as f64;
    let bandwidth = n.powf(-0.2) * sd;
    let norm = 1.0 / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt());

    let lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let step = (hi - lo) / (grid_points - 1) as f64;

    (0..grid_points)
        .map(|i| {
            let x = lo + step * i as f64;
            let density: f64 = finite
                .iter()
                .map(|xi| {
                    let z = (x - xi) / bandwidth;
                    (-0.5 * z * z).exp()
                })
                .sum();
            (x, density * norm)
        })
        .collect()
}
