//! Error types for the metering engine

use thiserror::Error;

/// Configuration error raised at meter construction time.
///
/// Steady-state `process` calls never fail; misconfiguration is
/// rejected up front so later arithmetic cannot be corrupted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeterError {
    /// Sample rate outside the supported range.
    #[error("Invalid sample rate: {0} Hz (must be >= 8000 Hz)")]
    InvalidSampleRate(u32),

    /// Channel count of zero.
    #[error("Invalid channel count: {0} (must be >= 1)")]
    InvalidChannelCount(usize),

    /// FFT size that is not a power of two or outside the supported range.
    #[error("Invalid FFT size: {0} (must be a power of two between 64 and 65536)")]
    InvalidFftSize(usize),
}

/// Result type alias for meter construction.
pub type MeterResult<T> = Result<T, MeterError>;
