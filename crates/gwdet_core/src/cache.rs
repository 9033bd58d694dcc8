//! Disk-backed memoization of grid interpolants and distributions.
//!
//! Artifacts are JSON documents under a configurable directory, named by a
//! fingerprint of every parameter that affects their content. Artifacts are
//! write-once/read-many; nothing guards two processes racing to build the
//! same missing artifact.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StorageError;
use crate::grid::{GridArray, GridAxes, grid_indices};
use crate::interpolation::GridInterpolant;
use crate::parallel::BatchEvaluator;

/// Deterministic artifact name built from parameter names and values.
///
/// Two configurations produce the same name exactly when every recorded
/// parameter matches; any parameter change changes the name.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    parts: Vec<String>,
}

impl Fingerprint {
    /// Start a fingerprint for one kind of artifact.
    #[must_use]
    pub fn new(kind: &str) -> Self {
        Self {
            parts: vec![kind.to_string()],
        }
    }

    /// Record one content-affecting parameter.
    #[must_use]
    pub fn param(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.parts.push(format!("{name}_{value}"));
        self
    }

    /// The artifact file name.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.json", self.parts.join("_"))
    }
}

/// The on-disk artifact directory, created on demand.
#[derive(Debug, Clone)]
pub struct CacheDirectory {
    root: PathBuf,
}

impl CacheDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of an artifact inside this directory.
    #[must_use]
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Whether an artifact with this name exists.
    #[must_use]
    pub fn contains(&self, file_name: &str) -> bool {
        self.path_for(file_name).is_file()
    }

    /// Create the directory if it does not exist yet.
    pub fn init(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).map_err(|e| {
            StorageError::Io(format!(
                "failed to create cache directory {}: {e}",
                self.root.display()
            ))
        })
    }

    /// Deserialize an artifact.
    ///
    /// A malformed artifact surfaces as [`StorageError::Parse`]; it is never
    /// rebuilt automatically.
    pub fn load<T: DeserializeOwned>(&self, file_name: &str) -> Result<T, StorageError> {
        let path = self.path_for(file_name);
        let raw = fs::read_to_string(&path)
            .map_err(|e| StorageError::Io(format!("failed to read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| StorageError::Parse(format!("malformed artifact {}: {e}", path.display())))
    }

    /// Serialize an artifact, creating the directory on demand.
    pub fn store<T: Serialize>(&self, file_name: &str, value: &T) -> Result<(), StorageError> {
        self.init()?;
        let path = self.path_for(file_name);
        let raw = serde_json::to_string(value).map_err(|e| {
            StorageError::Serialize(format!("failed to encode {}: {e}", path.display()))
        })?;
        fs::write(&path, raw)
            .map_err(|e| StorageError::Io(format!("failed to write {}: {e}", path.display())))?;
        tracing::info!(artifact = %path.display(), "stored cache artifact");
        Ok(())
    }
}

/// Failure while producing a cached grid interpolant: either the storage
/// layer failed, or the evaluation function did.
#[derive(Debug)]
pub enum CacheBuildError<E> {
    Storage(StorageError),
    Evaluation(E),
}

impl<E: fmt::Display> fmt::Display for CacheBuildError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheBuildError::Storage(e) => write!(f, "{e}"),
            CacheBuildError::Evaluation(e) => write!(f, "grid evaluation failed: {e}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for CacheBuildError<E> {}

impl<E> From<StorageError> for CacheBuildError<E> {
    fn from(e: StorageError) -> Self {
        CacheBuildError::Storage(e)
    }
}

/// Produce the grid interpolant for `file_name`, building it only if the
/// artifact is absent.
///
/// On a cache hit the artifact is deserialized and `point_fn` is never
/// called. On a miss, every grid point is evaluated through `evaluator`
/// (always exhaustively, never incrementally), the values are placed into a
/// dense array by index tuple, and the finished interpolant is persisted
/// before being returned.
pub fn get_or_build<E, F>(
    cache: &CacheDirectory,
    file_name: &str,
    axes: GridAxes,
    evaluator: &BatchEvaluator,
    point_fn: F,
) -> Result<GridInterpolant, CacheBuildError<E>>
where
    F: Fn(&[f64]) -> Result<f64, E> + Sync,
    E: Send,
{
    if cache.contains(file_name) {
        tracing::debug!(file_name, "interpolant cache hit");
        return cache.load(file_name).map_err(CacheBuildError::Storage);
    }

    let shape = axes.shape();
    let points: Vec<Vec<f64>> = grid_indices(&shape)
        .map(|indices| axes.coordinate(&indices))
        .collect();
    tracing::info!(file_name, points = points.len(), "building grid interpolant");

    let values = evaluator
        .run(&points, |point| point_fn(point))
        .map_err(CacheBuildError::Evaluation)?;

    let mut array = GridArray::new(shape.clone(), 0.0);
    for (indices, value) in grid_indices(&shape).zip(values) {
        array.set(&indices, value);
    }
    let interpolant =
        GridInterpolant::new(axes, array).expect("value array built from the same axes");

    cache.store(file_name, &interpolant)?;
    Ok(interpolant)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_fingerprint_encodes_every_parameter() {
        let name = Fingerprint::new("snr")
            .param("approximant", "IMRPhenomD")
            .param("flow", 10.0)
            .param("grid", 200)
            .file_name();
        assert_eq!(name, "snr_approximant_IMRPhenomD_flow_10_grid_200.json");

        let changed = Fingerprint::new("snr")
            .param("approximant", "IMRPhenomD")
            .param("flow", 15.0)
            .param("grid", 200)
            .file_name();
        assert_ne!(name, changed);
    }

    #[test]
    fn test_store_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDirectory::new(dir.path().join("artifacts"));
        assert!(!cache.contains("values.json"));

        cache.store("values.json", &vec![1.0, 2.5, -3.0]).unwrap();
        assert!(cache.contains("values.json"));
        let loaded: Vec<f64> = cache.load("values.json").unwrap();
        assert_eq!(loaded, vec![1.0, 2.5, -3.0]);
    }

    #[test]
    fn test_load_malformed_artifact_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDirectory::new(dir.path());
        fs::write(cache.path_for("bad.json"), "not json {").unwrap();
        let result: Result<Vec<f64>, _> = cache.load("bad.json");
        assert!(matches!(result, Err(StorageError::Parse(_))));
    }

    #[test]
    fn test_load_missing_artifact_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDirectory::new(dir.path());
        let result: Result<Vec<f64>, _> = cache.load("absent.json");
        assert!(matches!(result, Err(StorageError::Io(_))));
    }

    #[test]
    fn test_get_or_build_skips_evaluation_on_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDirectory::new(dir.path());
        let axes = GridAxes::linear(&[(0.0, 1.0), (0.0, 1.0)], 3).unwrap();
        let evaluator = BatchEvaluator::sequential();
        let calls = AtomicUsize::new(0);
        let point_fn = |point: &[f64]| -> Result<f64, StorageError> {
            calls.fetch_add(1, Ordering::Relaxed);
            Ok(point[0] + 10.0 * point[1])
        };

        let first = get_or_build(&cache, "surface.json", axes.clone(), &evaluator, point_fn)
            .unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 9);

        let second = get_or_build(&cache, "surface.json", axes, &evaluator, point_fn).unwrap();
        // identical fingerprint: loaded from disk, never recomputed
        assert_eq!(calls.load(Ordering::Relaxed), 9);

        for point in [[0.0, 0.0], [0.5, 0.5], [0.25, 0.75], [1.2, -0.1]] {
            assert!((first.eval_one(&point) - second.eval_one(&point)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_build_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDirectory::new(dir.path());
        let axes = GridAxes::linear(&[(0.0, 1.0)], 4).unwrap();
        let evaluator = BatchEvaluator::sequential();
        let result = get_or_build(&cache, "broken.json", axes, &evaluator, |point: &[f64]| {
            if point[0] > 0.5 {
                Err("unstable".to_string())
            } else {
                Ok(point[0])
            }
        });
        assert!(matches!(result, Err(CacheBuildError::Evaluation(_))));
        // a failed build leaves no artifact behind
        assert!(!cache.contains("broken.json"));
    }
}
