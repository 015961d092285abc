//! K-weighting pre-filter (ITU-R BS.1770)
//!
//! Two cascaded TDF-II biquad stages approximating the frequency
//! response of human loudness perception: a +4 dB high shelf at
//! 1500 Hz followed by a 38 Hz high-pass (Q = 0.5). Coefficients are
//! designed with the bilinear pre-warp `K = tan(pi * fc / fs)` and
//! recomputed whenever the sample rate changes.

use sono_core::{MeterError, MeterResult, Sample};
use std::f64::consts::PI;

/// Shelf stage center frequency (Hz).
const SHELF_FREQ: f64 = 1500.0;
/// Shelf stage gain (dB).
const SHELF_GAIN_DB: f64 = 4.0;
/// High-pass stage cutoff (Hz).
const HIGHPASS_FREQ: f64 = 38.0;
/// High-pass stage resonance.
const HIGHPASS_Q: f64 = 0.5;
/// Lowest sample rate the filter design is stable for.
const MIN_SAMPLE_RATE: u32 = 8000;

/// Normalized biquad coefficients (a0 = 1)
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadCoeffs {
    /// Feed-forward coefficients
    pub b0: f64,
    /// Feed-forward z^-1
    pub b1: f64,
    /// Feed-forward z^-2
    pub b2: f64,
    /// Feedback z^-1
    pub a1: f64,
    /// Feedback z^-2
    pub a2: f64,
}

impl BiquadCoeffs {
    /// High-shelf stage of the K-weighting cascade.
    ///
    /// Standard shelving design with `Vh = 10^(G/20)`, `Vb = Vh^0.5`
    /// and Butterworth damping (`Q = 1/sqrt(2)`).
    pub fn shelving_high(freq: f64, gain_db: f64, sample_rate: f64) -> Self {
        let k = (PI * freq / sample_rate).tan();
        let vh = 10.0_f64.powf(gain_db / 20.0);
        let vb = vh.powf(0.5);
        let a0 = 1.0 + 2.0_f64.sqrt() * k + k * k;

        Self {
            b0: (vh + 2.0_f64.sqrt() * vb * k + k * k) / a0,
            b1: 2.0 * (k * k - vh) / a0,
            b2: (vh - 2.0_f64.sqrt() * vb * k + k * k) / a0,
            a1: 2.0 * (k * k - 1.0) / a0,
            a2: (1.0 - 2.0_f64.sqrt() * k + k * k) / a0,
        }
    }

    /// Resonant high-pass stage of the K-weighting cascade.
    pub fn highpass(freq: f64, q: f64, sample_rate: f64) -> Self {
        let k = (PI * freq / sample_rate).tan();
        let a0 = 1.0 + k / q + k * k;

        Self {
            b0: 1.0 / a0,
            b1: -2.0 / a0,
            b2: 1.0 / a0,
            a1: 2.0 * (k * k - 1.0) / a0,
            a2: (1.0 - k / q + k * k) / a0,
        }
    }
}

/// TDF-II state pair for one biquad stage
#[derive(Debug, Clone, Copy, Default)]
struct Tdf2State {
    z1: f64,
    z2: f64,
}

impl Tdf2State {
    #[inline(always)]
    fn process(&mut self, coeffs: &BiquadCoeffs, input: f64) -> f64 {
        let output = coeffs.b0 * input + self.z1;
        self.z1 = coeffs.b1 * input - coeffs.a1 * output + self.z2;
        self.z2 = coeffs.b2 * input - coeffs.a2 * output;
        output
    }
}

/// Per-channel K-weighting filter.
///
/// One instance per channel; state is never shared between channels.
/// Stable for all audio sample rates >= 8 kHz, and always produces a
/// finite output for a finite input.
#[derive(Debug, Clone)]
pub struct KWeightingFilter {
    sample_rate: u32,
    shelf: BiquadCoeffs,
    shelf_state: Tdf2State,
    hp: BiquadCoeffs,
    hp_state: Tdf2State,
}

impl KWeightingFilter {
    /// Create a filter for the given sample rate.
    pub fn new(sample_rate: u32) -> MeterResult<Self> {
        if sample_rate < MIN_SAMPLE_RATE {
            return Err(MeterError::InvalidSampleRate(sample_rate));
        }

        let fs = sample_rate as f64;
        Ok(Self {
            sample_rate,
            shelf: BiquadCoeffs::shelving_high(SHELF_FREQ, SHELF_GAIN_DB, fs),
            shelf_state: Tdf2State::default(),
            hp: BiquadCoeffs::highpass(HIGHPASS_FREQ, HIGHPASS_Q, fs),
            hp_state: Tdf2State::default(),
        })
    }

    /// Recompute coefficients for a new sample rate and clear state.
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> MeterResult<()> {
        if sample_rate < MIN_SAMPLE_RATE {
            return Err(MeterError::InvalidSampleRate(sample_rate));
        }

        let fs = sample_rate as f64;
        self.sample_rate = sample_rate;
        self.shelf = BiquadCoeffs::shelving_high(SHELF_FREQ, SHELF_GAIN_DB, fs);
        self.hp = BiquadCoeffs::highpass(HIGHPASS_FREQ, HIGHPASS_Q, fs);
        self.reset();
        Ok(())
    }

    /// Run one sample through the shelf/high-pass cascade.
    #[inline(always)]
    pub fn process(&mut self, input: f64) -> f64 {
        let shelved = self.shelf_state.process(&self.shelf, input);
        self.hp_state.process(&self.hp, shelved)
    }

    /// Convenience wrapper for `f32` samples.
    #[inline]
    pub fn process_sample(&mut self, input: Sample) -> f64 {
        self.process(input as f64)
    }

    /// Clear filter memory without touching coefficients.
    pub fn reset(&mut self) {
        self.shelf_state = Tdf2State::default();
        self.hp_state = Tdf2State::default();
    }

    /// Configured sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
