use std::path::Path;
use std::sync::Arc;

use crate::cosmology::{Cosmology, FlatLambdaCdm};
use crate::error::{DetectabilityError, WaveformError};
use crate::pipeline::{Detectability, DetectabilityConfig, Source};
use crate::waveform::SnrProvider;

use super::ChirpLawSnr;

/// Small grids so a full build stays fast in tests.
fn test_config(cache_dir: &Path, parallel: bool) -> DetectabilityConfig {
    DetectabilityConfig {
        grid_resolution: 16,
        mc_samples: 10_000,
        mc_bins: 50,
        cache_dir: cache_dir.to_path_buf(),
        parallel,
        ..DetectabilityConfig::default()
    }
}

fn test_pipeline(cache_dir: &Path, parallel: bool) -> (Detectability, Arc<ChirpLawSnr>) {
    let provider = Arc::new(ChirpLawSnr::new(100.0));
    let pipeline = Detectability::new(
        test_config(cache_dir, parallel),
        Some(Arc::clone(&provider) as Arc<dyn SnrProvider>),
        Arc::new(FlatLambdaCdm::planck15()),
    );
    (pipeline, provider)
}

#[test]
fn test_detection_probability_limits() {
    let dir = tempfile::tempdir().unwrap();
    let (mut pipeline, _provider) = test_pipeline(dir.path(), false);

    // Heavy nearby binary: essentially always detected.
    let loud = pipeline.eval_one(Source::new(80.0, 80.0, 1e-3)).unwrap();
    assert!(loud > 0.9, "P(80, 80, 1e-3) = {loud}");

    // Light distant binary: essentially never detected.
    let quiet = pipeline.eval_one(Source::new(1.5, 1.5, 2.0)).unwrap();
    assert!(quiet < 0.05, "P(1.5, 1.5, 2.0) = {quiet}");
}

#[test]
fn test_eval_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let (mut pipeline, _provider) = test_pipeline(dir.path(), false);

    let source = Source::new(30.0, 25.0, 0.4);
    let first = pipeline.eval_one(source).unwrap();
    let second = pipeline.eval_one(source).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_eval_batch_matches_single_queries() {
    let dir = tempfile::tempdir().unwrap();
    let (mut pipeline, _provider) = test_pipeline(dir.path(), false);

    let sources = vec![
        Source::new(10.0, 10.0, 0.1),
        Source::new(45.0, 30.0, 0.8),
        Source::new(2.0, 1.5, 1.5),
    ];
    let batch = pipeline.eval_batch(&sources).unwrap();
    assert_eq!(batch.len(), sources.len());
    for (source, &value) in sources.iter().zip(&batch) {
        assert_eq!(pipeline.eval_one(*source).unwrap(), value);
    }
}

#[test]
fn test_identical_fingerprint_never_recomputes() {
    let dir = tempfile::tempdir().unwrap();

    let (mut first, provider) = test_pipeline(dir.path(), false);
    first.eval_one(Source::new(20.0, 20.0, 0.2)).unwrap();
    assert!(provider.calls() > 0);

    // Same configuration, fresh pipeline: everything loads from disk.
    let (mut second, fresh_provider) = test_pipeline(dir.path(), false);
    let value = second.eval_one(Source::new(20.0, 20.0, 0.2)).unwrap();
    assert_eq!(fresh_provider.calls(), 0);

    let reference = first.eval_one(Source::new(20.0, 20.0, 0.2)).unwrap();
    assert!((value - reference).abs() < 1e-12);
}

#[test]
fn test_missing_provider_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = Detectability::new(
        test_config(dir.path(), false),
        None,
        Arc::new(FlatLambdaCdm::planck15()),
    );

    let err = pipeline.eval_one(Source::new(10.0, 10.0, 0.1)).unwrap_err();
    assert!(matches!(
        err,
        DetectabilityError::Waveform(WaveformError::Unavailable)
    ));
    let err = pipeline.optimal_snr(Source::new(10.0, 10.0, 0.1)).unwrap_err();
    assert!(matches!(
        err,
        DetectabilityError::Waveform(WaveformError::Unavailable)
    ));

    // Projection-factor functionality stays usable standalone.
    let distribution = pipeline.projection_distribution().unwrap();
    assert!(distribution.eval_one(0.0) > 0.99);
}

#[test]
fn test_oracle_agrees_on_saturated_regimes() {
    let dir = tempfile::tempdir().unwrap();
    let (mut pipeline, _provider) = test_pipeline(dir.path(), false);

    let loud = Source::new(80.0, 80.0, 1e-3);
    let exact = pipeline.compute_one(loud).unwrap();
    let interpolated = pipeline.eval_one(loud).unwrap();
    assert!(exact > 0.95);
    assert!((exact - interpolated).abs() < 0.05);

    let quiet = Source::new(1.5, 1.5, 2.0);
    let exact = pipeline.compute_one(quiet).unwrap();
    let interpolated = pipeline.eval_one(quiet).unwrap();
    assert!(exact < 0.05);
    assert!((exact - interpolated).abs() < 0.05);
}

#[test]
fn test_optimal_snr_scales_inversely_with_distance() {
    let dir = tempfile::tempdir().unwrap();
    let (pipeline, _provider) = test_pipeline(dir.path(), false);
    let cosmology = FlatLambdaCdm::planck15();

    let near = pipeline.optimal_snr(Source::new(30.0, 30.0, 0.1)).unwrap();
    let far = pipeline.optimal_snr(Source::new(30.0, 30.0, 0.2)).unwrap();
    assert!(near > far);

    // The provider is queried at the true luminosity distance with
    // redshifted masses; check the distance scaling directly.
    let chirp = |m1: f64, m2: f64| (m1 * m2).powf(0.6) / (m1 + m2).powf(0.2);
    let scale = 1.0 + 0.1;
    let expected = 100.0 * chirp(30.0 * scale, 30.0 * scale).powf(5.0 / 6.0)
        / cosmology.luminosity_distance(0.1);
    assert!((near / expected - 1.0).abs() < 1e-12);
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_build_matches_sequential() {
    let sequential_dir = tempfile::tempdir().unwrap();
    let parallel_dir = tempfile::tempdir().unwrap();
    let (mut sequential, _) = test_pipeline(sequential_dir.path(), false);
    let (mut parallel, _) = test_pipeline(parallel_dir.path(), true);

    let sources = [
        Source::new(80.0, 80.0, 1e-3),
        Source::new(25.0, 20.0, 0.5),
        Source::new(1.5, 1.5, 2.0),
    ];
    for source in sources {
        let a = sequential.eval_one(source).unwrap();
        let b = parallel.eval_one(source).unwrap();
        assert_eq!(a, b, "parallel and sequential builds diverged");
    }
}
