//! Stereo phase correlation meter
//!
//! Maintains a circular window of the most recent left/right samples
//! and reports the normalized cross-correlation over that window:
//! +1 for identical channels, 0 for uncorrelated material, -1 for a
//! polarity-inverted pair.

use serde::{Deserialize, Serialize};
use sono_core::Sample;
use std::fmt;

/// Analysis window length in samples (~43 ms at 48 kHz).
const WINDOW_SIZE: usize = 2048;
/// Denominator floor below which the correlation is reported as 0.
const DENOM_FLOOR: f64 = 1e-10;

/// Qualitative mono-compatibility verdict derived from the
/// correlation coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseStatus {
    /// Correlation above +0.8; the mix collapses to mono cleanly.
    MonoSafe,
    /// Correlation in (+0.3, +0.8]; normal stereo content.
    Stereo,
    /// Correlation in (0, +0.3]; wide stereo, watch mono playback.
    WideStereo,
    /// Correlation in (-0.3, 0]; likely phase problems.
    PhaseIssues,
    /// Correlation at or below -0.3; heavy cancellation in mono.
    OutOfPhase,
}

impl PhaseStatus {
    /// Short human-readable label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MonoSafe => "mono safe",
            Self::Stereo => "stereo",
            Self::WideStereo => "wide stereo",
            Self::PhaseIssues => "phase issues",
            Self::OutOfPhase => "out of phase",
        }
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sliding-window stereo correlation meter.
///
/// The window starts zero-filled and the correlation starts at +1.0,
/// so a meter that has seen no audio reads as perfectly mono rather
/// than out of phase.
pub struct CorrelationMeter {
    left: Vec<f64>,
    right: Vec<f64>,
    write_pos: usize,
    correlation: f64,
}

impl Default for CorrelationMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelationMeter {
    /// Create a meter with an empty (silent) window.
    pub fn new() -> Self {
        Self {
            left: vec![0.0; WINDOW_SIZE],
            right: vec![0.0; WINDOW_SIZE],
            write_pos: 0,
            correlation: 1.0,
        }
    }

    /// Push one block of stereo samples and recompute the correlation
    /// over the full window.
    ///
    /// Frame count is the shorter of the two slices.
    pub fn process(&mut self, left: &[Sample], right: &[Sample]) {
        let frames = left.len().min(right.len());
        for i in 0..frames {
            self.left[self.write_pos] = left[i] as f64;
            self.right[self.write_pos] = right[i] as f64;
            self.write_pos = (self.write_pos + 1) % WINDOW_SIZE;
        }

        let mut sum_lr = 0.0;
        let mut sum_ll = 0.0;
        let mut sum_rr = 0.0;
        for i in 0..WINDOW_SIZE {
            let l = self.left[i];
            let r = self.right[i];
            sum_lr += l * r;
            sum_ll += l * l;
            sum_rr += r * r;
        }

        let denom = (sum_ll * sum_rr).sqrt();
        self.correlation = if denom > DENOM_FLOOR {
            (sum_lr / denom).clamp(-1.0, 1.0)
        } else {
            0.0
        };
    }

    /// Current correlation coefficient in [-1, +1].
    pub fn correlation(&self) -> f64 {
        self.correlation
    }

    /// Whether the current material survives a mono fold-down
    /// (positive correlation).
    pub fn is_mono_compatible(&self) -> bool {
        self.correlation > 0.0
    }

    /// Verdict derived from the current coefficient.
    pub fn status(&self) -> PhaseStatus {
        let c = self.correlation;
        if c > 0.8 {
            PhaseStatus::MonoSafe
        } else if c > 0.3 {
            PhaseStatus::Stereo
        } else if c > 0.0 {
            PhaseStatus::WideStereo
        } else if c > -0.3 {
            PhaseStatus::PhaseIssues
        } else {
            PhaseStatus::OutOfPhase
        }
    }

    /// Zero the window and restore the initial +1.0 reading.
    pub fn reset(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
        self.write_pos = 0;
        self.correlation = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, samples: usize) -> Vec<Sample> {
        (0..samples)
            .map(|i| (0.5 * (2.0 * PI * freq * i as f64 / 48000.0).sin()) as Sample)
            .collect()
    }

    #[test]
    fn test_initial_state_is_mono_safe() {
        let meter = CorrelationMeter::new();
        assert_eq!(meter.correlation(), 1.0);
        assert_eq!(meter.status(), PhaseStatus::MonoSafe);
    }

    #[test]
    fn test_identical_channels() {
        let mut meter = CorrelationMeter::new();
        let tone = sine(440.0, 4096);
        meter.process(&tone, &tone);
        assert!((meter.correlation() - 1.0).abs() < 1e-9);
        assert_eq!(meter.status(), PhaseStatus::MonoSafe);
    }

    #[test]
    fn test_inverted_channels() {
        let mut meter = CorrelationMeter::new();
        let tone = sine(440.0, 4096);
        let inverted: Vec<Sample> = tone.iter().map(|s| -s).collect();
        meter.process(&tone, &inverted);
        assert!((meter.correlation() + 1.0).abs() < 1e-9);
        assert_eq!(meter.status(), PhaseStatus::OutOfPhase);
    }

    #[test]
    fn test_silence_reads_zero() {
        let mut meter = CorrelationMeter::new();
        let zeros = vec![0.0 as Sample; 4096];
        meter.process(&zeros, &zeros);
        assert_eq!(meter.correlation(), 0.0);
        assert_eq!(meter.status(), PhaseStatus::PhaseIssues);
    }

    #[test]
    fn test_quadrature_tones_decorrelate() {
        // Sine vs cosine of the same frequency: correlation ~0 over a
        // whole number of periods.
        let mut meter = CorrelationMeter::new();
        let n = 2048;
        let left: Vec<Sample> = (0..n)
            .map(|i| (2.0 * PI * 187.5 * i as f64 / 48000.0).sin() as Sample)
            .collect();
        let right: Vec<Sample> = (0..n)
            .map(|i| (2.0 * PI * 187.5 * i as f64 / 48000.0).cos() as Sample)
            .collect();
        meter.process(&left, &right);
        assert!(meter.correlation().abs() < 0.05, "c = {}", meter.correlation());
    }

    #[test]
    fn test_status_thresholds() {
        let cases = [
            (0.9, PhaseStatus::MonoSafe),
            (0.5, PhaseStatus::Stereo),
            (0.1, PhaseStatus::WideStereo),
            (-0.1, PhaseStatus::PhaseIssues),
            (-0.7, PhaseStatus::OutOfPhase),
        ];
        for (c, expected) in cases {
            let meter = CorrelationMeter {
                left: vec![0.0; WINDOW_SIZE],
                right: vec![0.0; WINDOW_SIZE],
                write_pos: 0,
                correlation: c,
            };
            assert_eq!(meter.status(), expected, "c = {c}");
        }
    }

    #[test]
    fn test_reset_restores_initial_reading() {
        let mut meter = CorrelationMeter::new();
        let tone = sine(440.0, 4096);
        let inverted: Vec<Sample> = tone.iter().map(|s| -s).collect();
        meter.process(&tone, &inverted);
        assert!(meter.correlation() < 0.0);

        meter.reset();
        assert_eq!(meter.correlation(), 1.0);
        assert_eq!(meter.status(), PhaseStatus::MonoSafe);
    }

    #[test]
    fn test_status_serializes() {
        let json = serde_json::to_string(&PhaseStatus::WideStereo).unwrap();
        assert_eq!(json, "\"WideStereo\"");
        let back: PhaseStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PhaseStatus::WideStereo);
    }
}
