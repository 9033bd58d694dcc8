//! Detection probability of gravitational-wave sources
//!
//! This crate estimates the probability that a compact-binary source of
//! given component masses and redshift is detected by a ground-based
//! interferometer under random source/detector orientation. Direct
//! evaluation needs one expensive waveform/matched-filter computation per
//! query, so the crate is built around a memoized, parallel
//! grid-interpolation engine:
//! - a Monte Carlo estimate of the orientation projection factor reduced to
//!   an empirical survival function,
//! - an ordered batch dispatcher over a worker pool,
//! - a generic n-dimensional grid-to-interpolant compiler with disk
//!   memoization,
//! - a pipeline chaining two cached interpolants (SNR surface, detection
//!   volume) with the survival function and a cosmology.
//!
//! The waveform stack itself stays external behind [`SnrProvider`]; the
//! projection-factor distribution works standalone without it.
//!
//! ```ignore
//! use std::sync::Arc;
//! use gwdet_core::{Detectability, DetectabilityConfig, FlatLambdaCdm, Source};
//!
//! let mut pipeline = Detectability::new(
//!     DetectabilityConfig::default(),
//!     Some(provider),
//!     Arc::new(FlatLambdaCdm::planck15()),
//! );
//! let p = pipeline.eval_one(Source::new(10.0, 10.0, 0.1))?;
//! ```

#![warn(clippy::all)]

pub mod cache;
pub mod cosmology;
pub mod error;
pub mod grid;
pub mod interpolation;
pub mod parallel;
pub mod pipeline;
pub mod projection;
pub mod waveform;

#[cfg(test)]
mod tests;

pub use cosmology::{Cosmology, FlatLambdaCdm};
pub use error::{DetectabilityError, StorageError, WaveformError};
pub use interpolation::GridInterpolant;
pub use parallel::BatchEvaluator;
pub use pipeline::{Detectability, DetectabilityConfig, Source};
pub use projection::{ProjectionDistribution, SurvivalFunction};
pub use waveform::{SnrProvider, SnrRequest};
