//! Stereo balance meter
//!
//! Compares per-block RMS of the left and right channels and exposes
//! a smoothed balance position in [-1, +1] (negative = left-heavy)
//! plus an equivalent dB offset.

use sono_core::{Sample, gain_to_db};

/// One-pole smoothing: retained share of the previous reading.
const SMOOTHING: f64 = 0.9;
/// RMS-sum floor below which the block is treated as silent.
const LEVEL_FLOOR: f64 = 1e-10;

/// RMS stereo balance meter.
#[derive(Debug, Clone, Default)]
pub struct BalanceMeter {
    smoothed: f64,
}

impl BalanceMeter {
    /// Create a centered meter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one stereo block and fold its balance into the smoothed
    /// reading. Silent blocks pull the reading toward center.
    pub fn process(&mut self, left: &[Sample], right: &[Sample]) {
        let frames = left.len().min(right.len());
        if frames == 0 {
            return;
        }

        let mut sum_l = 0.0;
        let mut sum_r = 0.0;
        for i in 0..frames {
            let l = left[i] as f64;
            let r = right[i] as f64;
            sum_l += l * l;
            sum_r += r * r;
        }
        let rms_l = (sum_l / frames as f64).sqrt();
        let rms_r = (sum_r / frames as f64).sqrt();

        let block = if rms_l + rms_r > LEVEL_FLOOR {
            (rms_r - rms_l) / (rms_l + rms_r)
        } else {
            0.0
        };

        self.smoothed = self.smoothed * SMOOTHING + block * (1.0 - SMOOTHING);
    }

    /// Smoothed balance in [-1, +1]; negative means left-heavy.
    pub fn balance(&self) -> f64 {
        self.smoothed
    }

    /// Balance expressed as a channel level offset in dB; negative
    /// means the left channel is louder.
    pub fn balance_db(&self) -> f64 {
        if self.smoothed >= 0.0 {
            gain_to_db(1.0 + self.smoothed)
        } else {
            -gain_to_db(1.0 - self.smoothed)
        }
    }

    /// Return the meter to center.
    pub fn reset(&mut self) {
        self.smoothed = 0.0;
    }
}
