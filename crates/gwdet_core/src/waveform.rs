//! Interface to the external waveform / matched-filter SNR provider.

use crate::error::WaveformError;

/// One SNR evaluation request.
#[derive(Debug, Clone, Copy)]
pub struct SnrRequest<'a> {
    /// Named waveform model
    pub approximant: &'a str,
    /// Named analytical noise curve
    pub psd: &'a str,
    /// Detector-frame (redshifted) component masses in solar masses
    pub mass1: f64,
    pub mass2: f64,
    /// Source distance in Mpc
    pub distance_mpc: f64,
    /// Frequency spacing of the waveform grid in Hz
    pub delta_f: f64,
    /// Low-frequency cutoff in Hz
    pub f_low: f64,
}

/// Matched-filter SNR of an optimally oriented source against a noise model.
///
/// Implementations wrap an external waveform stack; the pipeline treats the
/// computation as an expensive scalar black box.
pub trait SnrProvider: Send + Sync {
    fn matched_filter_snr(&self, request: &SnrRequest<'_>) -> Result<f64, WaveformError>;
}
