//! Detection-probability pipeline.
//!
//! Chains two cached grid interpolants with the projection-factor
//! distribution: a 2D SNR surface over redshifted masses, evaluated at a
//! reference distance of 1 Mpc so a lookup can later be rescaled by the true
//! luminosity distance, and a 3D detection-probability volume over
//! (mass1, mass2, redshift). All three members are built lazily on first
//! need, loaded from the shared cache directory when an artifact with the
//! same fingerprint exists, and reused for the lifetime of the pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::{self, CacheDirectory, Fingerprint};
use crate::cosmology::Cosmology;
use crate::error::{DetectabilityError, WaveformError};
use crate::grid::GridAxes;
use crate::interpolation::GridInterpolant;
use crate::parallel::BatchEvaluator;
use crate::projection::ProjectionDistribution;
use crate::waveform::{SnrProvider, SnrRequest};

/// A source described by its source-frame component masses (solar masses)
/// and redshift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Source {
    pub mass1: f64,
    pub mass2: f64,
    pub redshift: f64,
}

impl Source {
    #[must_use]
    pub const fn new(mass1: f64, mass2: f64, redshift: f64) -> Self {
        Self {
            mass1,
            mass2,
            redshift,
        }
    }
}

/// Every parameter that affects the pipeline's cached artifacts, plus the
/// execution flags that do not (cache location, parallelism).
#[derive(Debug, Clone)]
pub struct DetectabilityConfig {
    /// Named waveform model passed to the SNR provider
    pub approximant: String,
    /// Named analytical noise curve passed to the SNR provider
    pub psd: String,
    /// Low-frequency cutoff in Hz
    pub f_low: f64,
    /// Frequency spacing of the waveform grid in Hz
    pub delta_f: f64,
    /// Matched-filter SNR above which a source counts as detected
    pub snr_threshold: f64,
    /// Source-frame mass bounds in solar masses
    pub mass_min: f64,
    pub mass_max: f64,
    /// Redshift bounds
    pub z_min: f64,
    pub z_max: f64,
    /// Grid points per interpolation axis
    pub grid_resolution: usize,
    /// Monte Carlo draws for the projection-factor distribution
    pub mc_samples: usize,
    /// Histogram bins for the projection-factor distribution
    pub mc_bins: usize,
    /// Directory holding the cache artifacts
    pub cache_dir: PathBuf,
    /// Dispatch grid builds over a worker pool
    pub parallel: bool,
}

impl Default for DetectabilityConfig {
    fn default() -> Self {
        Self {
            approximant: "IMRPhenomD".to_string(),
            psd: "aLIGOZeroDetHighPower".to_string(),
            f_low: 10.0,
            delta_f: 1.0 / 40.0,
            snr_threshold: 8.0,
            mass_min: 1.0,
            mass_max: 100.0,
            z_min: 1e-4,
            z_max: 2.2,
            grid_resolution: 200,
            mc_samples: 100_000_000,
            mc_bins: 100_000,
            cache_dir: PathBuf::from("gwdet_data"),
            parallel: true,
        }
    }
}

impl DetectabilityConfig {
    /// Artifact name of the distance-normalized SNR surface.
    fn snr_surface_file_name(&self) -> String {
        Fingerprint::new("snr")
            .param("approximant", &self.approximant)
            .param("psd", &self.psd)
            .param("flow", self.f_low)
            .param("deltaf", self.delta_f)
            .param("massmin", self.mass_min)
            .param("massmax", self.mass_max)
            .param("zmin", self.z_min)
            .param("zmax", self.z_max)
            .param("grid", self.grid_resolution)
            .file_name()
    }

    /// Artifact name of the detection-probability volume. Includes every
    /// SNR-surface parameter plus the threshold and the projection-factor
    /// Monte Carlo configuration, since all of them shape the stored values.
    fn detection_volume_file_name(&self) -> String {
        Fingerprint::new("detprob")
            .param("approximant", &self.approximant)
            .param("psd", &self.psd)
            .param("flow", self.f_low)
            .param("deltaf", self.delta_f)
            .param("snrthreshold", self.snr_threshold)
            .param("massmin", self.mass_min)
            .param("massmax", self.mass_max)
            .param("zmin", self.z_min)
            .param("zmax", self.z_max)
            .param("grid", self.grid_resolution)
            .param("samples", self.mc_samples)
            .param("bins", self.mc_bins)
            .file_name()
    }
}

/// Detection probability of a compact-binary source under random
/// source/detector orientation.
pub struct Detectability {
    config: DetectabilityConfig,
    provider: Option<Arc<dyn SnrProvider>>,
    cosmology: Arc<dyn Cosmology>,
    cache: CacheDirectory,
    evaluator: Option<BatchEvaluator>,
    snr_surface: Option<Arc<GridInterpolant>>,
    projection: Option<Arc<ProjectionDistribution>>,
    detection_volume: Option<Arc<GridInterpolant>>,
}

impl Detectability {
    /// Create an idle pipeline. Nothing is computed or loaded until the
    /// first query; a missing provider only fails operations that need it.
    pub fn new(
        config: DetectabilityConfig,
        provider: Option<Arc<dyn SnrProvider>>,
        cosmology: Arc<dyn Cosmology>,
    ) -> Self {
        let cache = CacheDirectory::new(config.cache_dir.clone());
        Self {
            config,
            provider,
            cosmology,
            cache,
            evaluator: None,
            snr_surface: None,
            projection: None,
            detection_volume: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &DetectabilityConfig {
        &self.config
    }

    /// Detection probability of a single source, from the cached volume.
    pub fn eval_one(&mut self, source: Source) -> Result<f64, DetectabilityError> {
        let volume = self.detection_volume()?;
        Ok(volume.eval_one(&[source.mass1, source.mass2, source.redshift]))
    }

    /// Detection probabilities of a batch of sources, from the cached
    /// volume. One entry per input, in input order.
    pub fn eval_batch(&mut self, sources: &[Source]) -> Result<Vec<f64>, DetectabilityError> {
        let volume = self.detection_volume()?;
        Ok(sources
            .iter()
            .map(|s| volume.eval_one(&[s.mass1, s.mass2, s.redshift]))
            .collect())
    }

    /// Matched-filter SNR of an optimally oriented source at its true
    /// luminosity distance. One provider call per invocation.
    pub fn optimal_snr(&self, source: Source) -> Result<f64, DetectabilityError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(WaveformError::Unavailable)?;
        let distance = self.cosmology.luminosity_distance(source.redshift);
        let scale = 1.0 + source.redshift;
        Ok(provider.matched_filter_snr(&SnrRequest {
            approximant: self.config.approximant.as_str(),
            psd: self.config.psd.as_str(),
            mass1: source.mass1 * scale,
            mass2: source.mass2 * scale,
            distance_mpc: distance,
            delta_f: self.config.delta_f,
            f_low: self.config.f_low,
        })?)
    }

    /// Exact, non-interpolated detection probability. As expensive as one
    /// waveform evaluation; intended for validating the interpolated path,
    /// not for bulk queries.
    pub fn compute_one(&mut self, source: Source) -> Result<f64, DetectabilityError> {
        let snr = self.optimal_snr(source)?;
        let projection = self.projection()?;
        Ok(projection.eval_one(self.config.snr_threshold / snr))
    }

    /// The projection-factor distribution; usable without a waveform
    /// provider.
    pub fn projection_distribution(
        &mut self,
    ) -> Result<Arc<ProjectionDistribution>, DetectabilityError> {
        self.projection()
    }

    fn projection(&mut self) -> Result<Arc<ProjectionDistribution>, DetectabilityError> {
        if let Some(projection) = &self.projection {
            return Ok(Arc::clone(projection));
        }
        let built = Arc::new(ProjectionDistribution::get_or_build(
            &self.cache,
            self.config.mc_samples,
            self.config.mc_bins,
        )?);
        self.projection = Some(Arc::clone(&built));
        Ok(built)
    }

    fn snr_surface(&mut self) -> Result<Arc<GridInterpolant>, DetectabilityError> {
        if let Some(surface) = &self.snr_surface {
            return Ok(Arc::clone(surface));
        }
        let provider = self.provider.clone().ok_or(WaveformError::Unavailable)?;

        // Both axes span the redshifted-mass range so every detector-frame
        // lookup from the volume build lands inside the surface.
        let mass_lo = self.config.mass_min * (1.0 + self.config.z_min);
        let mass_hi = self.config.mass_max * (1.0 + self.config.z_max);
        let axes = GridAxes::linear(&[(mass_lo, mass_hi), (mass_lo, mass_hi)], self.config.grid_resolution)
            .ok_or_else(|| {
                DetectabilityError::Config(
                    "mass bounds must be increasing with at least two grid points".to_string(),
                )
            })?;

        let file_name = self.config.snr_surface_file_name();
        let approximant = self.config.approximant.clone();
        let psd = self.config.psd.clone();
        let delta_f = self.config.delta_f;
        let f_low = self.config.f_low;
        let cache = self.cache.clone();
        let evaluator = self.evaluator();

        let surface = cache::get_or_build(
            &cache,
            &file_name,
            axes,
            evaluator,
            move |point: &[f64]| {
                provider.matched_filter_snr(&SnrRequest {
                    approximant: approximant.as_str(),
                    psd: psd.as_str(),
                    mass1: point[0],
                    mass2: point[1],
                    distance_mpc: 1.0,
                    delta_f,
                    f_low,
                })
            },
        )?;

        let surface = Arc::new(surface);
        self.snr_surface = Some(Arc::clone(&surface));
        Ok(surface)
    }

    fn detection_volume(&mut self) -> Result<Arc<GridInterpolant>, DetectabilityError> {
        if let Some(volume) = &self.detection_volume {
            return Ok(Arc::clone(volume));
        }
        let file_name = self.config.detection_volume_file_name();

        // A cache hit makes the SNR surface, the projection distribution and
        // the worker pool all unnecessary.
        if self.cache.contains(&file_name) {
            let volume: GridInterpolant = self.cache.load(&file_name)?;
            let volume = Arc::new(volume);
            self.detection_volume = Some(Arc::clone(&volume));
            return Ok(volume);
        }

        let surface = self.snr_surface()?;
        let projection = self.projection()?;
        let cosmology = Arc::clone(&self.cosmology);
        let threshold = self.config.snr_threshold;
        let axes = GridAxes::linear(
            &[
                (self.config.mass_min, self.config.mass_max),
                (self.config.mass_min, self.config.mass_max),
                (self.config.z_min, self.config.z_max),
            ],
            self.config.grid_resolution,
        )
        .ok_or_else(|| {
            DetectabilityError::Config(
                "mass and redshift bounds must be increasing with at least two grid points"
                    .to_string(),
            )
        })?;
        let cache = self.cache.clone();
        let evaluator = self.evaluator();

        let volume = cache::get_or_build(
            &cache,
            &file_name,
            axes,
            evaluator,
            move |point: &[f64]| -> Result<f64, DetectabilityError> {
                let (mass1, mass2, z) = (point[0], point[1], point[2]);
                let scale = 1.0 + z;
                let snr_at_reference = surface.eval_one(&[mass1 * scale, mass2 * scale]);
                let snr = snr_at_reference / cosmology.luminosity_distance(z);
                Ok(projection.eval_one(threshold / snr))
            },
        )?;

        let volume = Arc::new(volume);
        self.detection_volume = Some(Arc::clone(&volume));
        Ok(volume)
    }

    /// The batch evaluator, created on the first build that needs it and
    /// reused for every later build in this pipeline's lifetime.
    fn evaluator(&mut self) -> &BatchEvaluator {
        let parallel = self.config.parallel;
        self.evaluator.get_or_insert_with(|| new_evaluator(parallel))
    }
}

fn new_evaluator(parallel: bool) -> BatchEvaluator {
    #[cfg(feature = "parallel")]
    if parallel {
        match BatchEvaluator::parallel() {
            Ok(evaluator) => return evaluator,
            Err(err) => {
                tracing::warn!(%err, "worker pool unavailable, evaluating sequentially");
            }
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;
    BatchEvaluator::sequential()
}
