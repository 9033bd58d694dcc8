//! Pipeline-level tests with a deterministic stand-in SNR provider.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::WaveformError;
use crate::waveform::{SnrProvider, SnrRequest};

mod pipeline;

/// Stand-in provider following the leading-order chirp-mass scaling
/// SNR ~ Mc^(5/6) / d. Counts every invocation so tests can verify that a
/// cache hit performs no waveform work.
pub(crate) struct ChirpLawSnr {
    amplitude: f64,
    calls: AtomicUsize,
}

impl ChirpLawSnr {
    pub(crate) fn new(amplitude: f64) -> Self {
        Self {
            amplitude,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl SnrProvider for ChirpLawSnr {
    fn matched_filter_snr(&self, request: &SnrRequest<'_>) -> Result<f64, WaveformError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let chirp_mass = (request.mass1 * request.mass2).powf(0.6)
            / (request.mass1 + request.mass2).powf(0.2);
        Ok(self.amplitude * chirp_mass.powf(5.0 / 6.0) / request.distance_mpc)
    }
}
