//! Crest factor and dynamic range measurement
//!
//! Tracks the last three seconds of audio in two rolling windows (peak
//! magnitudes and squared samples) and reports crest factor
//! (peak-to-RMS ratio in dB) and a short-term dynamic range estimate.

use sono_core::{MeterError, MeterResult, Sample, gain_to_db};
use std::collections::VecDeque;

/// Rolling window length in seconds.
const WINDOW_SECS: f64 = 3.0;
/// RMS / floor threshold below which metrics report 0.
const LEVEL_FLOOR: f64 = 1e-10;

/// Rolling crest-factor and dynamic-range meter.
///
/// Heavily limited material reads a low crest factor (approaching
/// 3 dB for a pure square-ish waveform); dynamic material reads
/// higher. Both metrics report 0 until the window holds signal.
pub struct DynamicRangeMeter {
    window_size: usize,
    /// |s| history over the window.
    peaks: VecDeque<f64>,
    /// s^2 history over the window.
    squares: VecDeque<f64>,
    peak: f64,
    rms: f64,
    crest_factor_db: f64,
    dynamic_range_db: f64,
}

impl DynamicRangeMeter {
    /// Create a meter with a 3 s analysis window.
    pub fn new(sample_rate: u32) -> MeterResult<Self> {
        if sample_rate == 0 {
            return Err(MeterError::InvalidSampleRate(sample_rate));
        }

        let window_size = (sample_rate as f64 * WINDOW_SECS) as usize;
        Ok(Self {
            window_size,
            peaks: VecDeque::with_capacity(window_size + 1),
            squares: VecDeque::with_capacity(window_size + 1),
            peak: 0.0,
            rms: 0.0,
            crest_factor_db: 0.0,
            dynamic_range_db: 0.0,
        })
    }

    /// Feed mono samples and recompute both metrics.
    pub fn process(&mut self, input: &[Sample]) {
        for &s in input {
            let s = s as f64;
            self.peaks.push_back(s.abs());
            self.squares.push_back(s * s);
            if self.peaks.len() > self.window_size {
                self.peaks.pop_front();
                self.squares.pop_front();
            }
        }
        self.recompute();
    }

    fn recompute(&mut self) {
        if self.squares.is_empty() {
            self.peak = 0.0;
            self.rms = 0.0;
            self.crest_factor_db = 0.0;
            self.dynamic_range_db = 0.0;
            return;
        }

        let peak = self.peaks.iter().copied().fold(0.0, f64::max);
        let mean_square = self.squares.iter().sum::<f64>() / self.squares.len() as f64;
        let rms = mean_square.sqrt();
        self.peak = peak;
        self.rms = rms;

        self.crest_factor_db = if rms > LEVEL_FLOOR {
            20.0 * (peak / rms).log10()
        } else {
            0.0
        };

        // Quietest instantaneous level in the window vs the RMS; a
        // coarse stand-in for a percentile-based loudness spread.
        let min_square = self.squares.iter().copied().fold(f64::INFINITY, f64::min);
        self.dynamic_range_db = if min_square > LEVEL_FLOOR {
            20.0 * (rms / min_square.sqrt()).log10()
        } else {
            0.0
        };
    }

    /// Highest sample magnitude in the window (dBFS).
    pub fn peak_db(&self) -> f64 {
        gain_to_db(self.peak)
    }

    /// RMS level over the window (dBFS).
    pub fn rms_db(&self) -> f64 {
        gain_to_db(self.rms)
    }

    /// Peak-to-RMS ratio over the window (dB).
    pub fn crest_factor_db(&self) -> f64 {
        self.crest_factor_db
    }

    /// RMS-to-quietest-sample ratio over the window (dB).
    pub fn dynamic_range_db(&self) -> f64 {
        self.dynamic_range_db
    }

    /// Clear the window and both metrics.
    pub fn reset(&mut self) {
        self.peaks.clear();
        self.squares.clear();
        self.peak = 0.0;
        self.rms = 0.0;
        self.crest_factor_db = 0.0;
        self.dynamic_range_db = 0.0;
    }
}
