//! Orientation-projection factor of a single interferometer.
//!
//! The projection factor w relates the SNR of an optimally oriented source
//! to the SNR actually observed for a random sky position, polarization and
//! inclination; it lies in [0, 1] by construction. Its distribution is
//! estimated once by Monte Carlo, reduced to an empirical survival function
//! and cached on disk.

use std::f64::consts::PI;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheDirectory, Fingerprint};
use crate::error::StorageError;

/// Fixed seed for the Monte Carlo build, so rebuilds of one fingerprint
/// produce identical artifacts.
const BUILD_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Draw `count` i.i.d. projection factors.
///
/// Polar angles (sky position and inclination) are drawn uniform in their
/// cosine; azimuthal and polarization angles uniform on [-pi, pi]. The two
/// antenna-pattern responses are combined into
/// w = sqrt(F+^2 (1 + cos^2 i)^2 / 4 + Fx^2 cos^2 i).
pub fn sample_projection_factors<R: Rng>(rng: &mut R, count: usize) -> Vec<f64> {
    (0..count)
        .map(|_| {
            let cos_theta: f64 = rng.random_range(-1.0..=1.0);
            let phi = PI * rng.random_range(-1.0..=1.0);
            let psi = PI * rng.random_range(-1.0..=1.0);
            let cos_iota: f64 = rng.random_range(-1.0..=1.0);

            let f_plus = 0.5 * (1.0 + cos_theta * cos_theta) * (2.0 * phi).cos() * (2.0 * psi).cos()
                - cos_theta * (2.0 * phi).sin() * (2.0 * psi).sin();
            let f_cross = 0.5 * (1.0 + cos_theta * cos_theta) * (2.0 * phi).cos() * (2.0 * psi).sin()
                + cos_theta * (2.0 * phi).sin() * (2.0 * psi).cos();

            let plus_term = f_plus * f_plus * (1.0 + cos_iota * cos_iota).powi(2) / 4.0;
            let cross_term = f_cross * f_cross * cos_iota * cos_iota;
            (plus_term + cross_term).sqrt()
        })
        .collect()
}

/// Empirical survival function S(w) = P(sample >= w).
///
/// Piecewise linear between the histogram bin edges, non-increasing,
/// saturating at 1 at or below the smallest observed sample and at 0 at or
/// above the largest. Out-of-range queries never error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalFunction {
    /// Histogram bin edges, ascending
    edges: Vec<f64>,
    /// Survival value at each edge
    survival: Vec<f64>,
}

impl SurvivalFunction {
    /// Bin `samples` into `bins` equal-width bins over the observed range
    /// and accumulate the complement of the empirical CDF at the bin edges.
    pub fn from_samples(samples: &[f64], bins: usize) -> Self {
        assert!(!samples.is_empty(), "survival function needs samples");
        assert!(bins > 0, "survival function needs at least one bin");

        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &sample in samples {
            lo = lo.min(sample);
            hi = hi.max(sample);
        }
        // Degenerate sample sets collapse to a step at the observed value.
        let width = if hi > lo { hi - lo } else { f64::MIN_POSITIVE };

        let mut counts = vec![0usize; bins];
        for &sample in samples {
            let bin = ((sample - lo) / width * bins as f64) as usize;
            counts[bin.min(bins - 1)] += 1;
        }

        let total = samples.len() as f64;
        let edges: Vec<f64> = (0..=bins)
            .map(|i| lo + width * i as f64 / bins as f64)
            .collect();
        let mut survival = Vec::with_capacity(bins + 1);
        let mut mass_below = 0.0;
        survival.push(1.0);
        for count in counts {
            mass_below += count as f64 / total;
            survival.push((1.0 - mass_below).max(0.0));
        }
        // Guard the terminal value against rounding residue.
        if let Some(last) = survival.last_mut() {
            *last = 0.0;
        }

        Self { edges, survival }
    }

    /// Survival probability at a single point.
    #[must_use]
    pub fn eval_one(&self, w: f64) -> f64 {
        let first = self.edges[0];
        let last = self.edges[self.edges.len() - 1];
        if w <= first {
            return 1.0;
        }
        if w >= last {
            return 0.0;
        }
        let cell = self
            .edges
            .partition_point(|&edge| edge <= w)
            .saturating_sub(1)
            .min(self.edges.len() - 2);
        let t = (w - self.edges[cell]) / (self.edges[cell + 1] - self.edges[cell]);
        self.survival[cell] + t * (self.survival[cell + 1] - self.survival[cell])
    }

    /// Survival probabilities at a batch of points.
    #[must_use]
    pub fn eval_many(&self, ws: &[f64]) -> Vec<f64> {
        ws.iter().map(|&w| self.eval_one(w)).collect()
    }
}

/// Cached Monte Carlo estimate of the projection-factor distribution.
///
/// Identity is the (sample count, bin count) fingerprint: construction with
/// a fingerprint already on disk loads the artifact and skips the Monte
/// Carlo step entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionDistribution {
    samples: usize,
    bins: usize,
    survival: SurvivalFunction,
}

impl ProjectionDistribution {
    /// Artifact name for a (sample count, bin count) configuration.
    #[must_use]
    pub fn file_name(samples: usize, bins: usize) -> String {
        Fingerprint::new("pdet")
            .param("samples", samples)
            .param("bins", bins)
            .file_name()
    }

    /// Run the Monte Carlo estimate without touching the cache.
    #[must_use]
    pub fn build(samples: usize, bins: usize) -> Self {
        let mut rng = SmallRng::seed_from_u64(BUILD_SEED);
        let drawn = sample_projection_factors(&mut rng, samples);
        Self {
            samples,
            bins,
            survival: SurvivalFunction::from_samples(&drawn, bins),
        }
    }

    /// Load the distribution for this fingerprint, building and persisting
    /// it if the artifact is absent.
    pub fn get_or_build(
        cache: &CacheDirectory,
        samples: usize,
        bins: usize,
    ) -> Result<Self, StorageError> {
        let file_name = Self::file_name(samples, bins);
        if cache.contains(&file_name) {
            return cache.load(&file_name);
        }
        tracing::info!(samples, bins, "building projection-factor distribution");
        let built = Self::build(samples, bins);
        cache.store(&file_name, &built)?;
        Ok(built)
    }

    /// Get the Monte Carlo sample count
    #[must_use]
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Get the histogram bin count
    #[must_use]
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Get the survival function
    #[must_use]
    pub fn survival(&self) -> &SurvivalFunction {
        &self.survival
    }

    /// Survival probability at a single projection factor.
    #[must_use]
    pub fn eval_one(&self, w: f64) -> f64 {
        self.survival.eval_one(w)
    }

    /// Survival probabilities at a batch of projection factors.
    #[must_use]
    pub fn eval_many(&self, ws: &[f64]) -> Vec<f64> {
        self.survival.eval_many(ws)
    }
}
