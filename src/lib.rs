//! Null Model Validation - Monte Carlo significance test for a gain difference
//!
//! This library loads a table of paired gain measurements, computes the
//! observed mean difference, simulates a random-phase null distribution with
//! a seedable Gaussian source, scores the observation with a one-sided
//! p-value, and renders the comparison figure.

pub mod cli;
pub mod config;
pub mod error;
pub mod null_model;
pub mod render;
pub mod stats;
pub mod table;
pub mod validator;

pub use config::ValidationConfig;
pub use error::{RenderError, ValidationError};
pub use validator::{ValidationReport, Validator};
