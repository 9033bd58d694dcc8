use std::fmt;

use crate::cache::CacheBuildError;

/// Errors from reading or writing cache artifacts
#[derive(Debug, Clone)]
pub enum StorageError {
    Io(String),
    Parse(String),
    Serialize(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(msg) => write!(f, "IO error: {}", msg),
            StorageError::Parse(msg) => write!(f, "Parse error: {}", msg),
            StorageError::Serialize(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

/// Errors from the external waveform / matched-filter SNR provider
#[derive(Debug, Clone)]
pub enum WaveformError {
    /// No provider is attached to the pipeline
    Unavailable,
    /// The provider failed to generate or filter a waveform
    Generation(String),
}

impl fmt::Display for WaveformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaveformError::Unavailable => write!(f, "waveform provider required"),
            WaveformError::Generation(msg) => write!(f, "waveform generation failed: {}", msg),
        }
    }
}

impl std::error::Error for WaveformError {}

/// Errors surfaced by the detection-probability pipeline
#[derive(Debug, Clone)]
pub enum DetectabilityError {
    Waveform(WaveformError),
    Storage(StorageError),
    /// Configuration error
    Config(String),
}

impl fmt::Display for DetectabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectabilityError::Waveform(e) => write!(f, "{e}"),
            DetectabilityError::Storage(e) => write!(f, "{e}"),
            DetectabilityError::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for DetectabilityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DetectabilityError::Waveform(e) => Some(e),
            DetectabilityError::Storage(e) => Some(e),
            DetectabilityError::Config(_) => None,
        }
    }
}

impl From<WaveformError> for DetectabilityError {
    fn from(e: WaveformError) -> Self {
        DetectabilityError::Waveform(e)
    }
}

impl From<StorageError> for DetectabilityError {
    fn from(e: StorageError) -> Self {
        DetectabilityError::Storage(e)
    }
}

impl<E: Into<DetectabilityError>> From<CacheBuildError<E>> for DetectabilityError {
    fn from(e: CacheBuildError<E>) -> Self {
        match e {
            CacheBuildError::Storage(e) => DetectabilityError::Storage(e),
            CacheBuildError::Evaluation(e) => e.into(),
        }
    }
}
