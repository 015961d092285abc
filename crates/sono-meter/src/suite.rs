//! Combined metering suite
//!
//! Owns one of each meter and fans incoming multi-channel audio out to
//! all of them: the full block to the loudness meter, channels 0/1 to
//! the correlation and balance meters, and an equal-weight mono
//! downmix to the spectrum and dynamics meters. Compliance is judged
//! against a selectable delivery standard.

use crate::balance::BalanceMeter;
use crate::correlation::{CorrelationMeter, PhaseStatus};
use crate::dynamics::DynamicRangeMeter;
use crate::loudness::LoudnessMeter;
use crate::spectrum::SpectrumAnalyzer;
use crate::standards::LoudnessStandard;
use serde::{Deserialize, Serialize};
use sono_core::{MeterResult, Sample};

/// Allowed integrated-loudness deviation from the target (LU).
const COMPLIANCE_TOLERANCE_LU: f64 = 1.0;

/// Plain-data snapshot of every metric, for handing off to a display
/// or logging thread without holding the suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeteringReport {
    /// Standard the compliance fields were judged against.
    pub standard: LoudnessStandard,
    /// Momentary loudness (LUFS).
    pub momentary_lufs: f64,
    /// Short-term loudness (LUFS).
    pub short_term_lufs: f64,
    /// Integrated loudness (LUFS).
    pub integrated_lufs: f64,
    /// Loudness range (LU).
    pub loudness_range_lu: f64,
    /// Sample peak (dBFS).
    pub true_peak_db: f64,
    /// Stereo correlation coefficient.
    pub correlation: f64,
    /// Mono-compatibility verdict.
    pub phase_status: PhaseStatus,
    /// Smoothed stereo balance in [-1, +1].
    pub balance: f64,
    /// Balance as a signed dB offset.
    pub balance_db: f64,
    /// Crest factor (dB).
    pub crest_factor_db: f64,
    /// Short-term dynamic range estimate (dB).
    pub dynamic_range_db: f64,
    /// Integrated loudness within tolerance of the target.
    pub loudness_compliant: bool,
    /// Peak at or under the standard's ceiling.
    pub true_peak_compliant: bool,
}

/// All meters behind one `process` call.
pub struct MeteringSuite {
    channels: usize,
    standard: LoudnessStandard,
    loudness: LoudnessMeter,
    correlation: CorrelationMeter,
    balance: BalanceMeter,
    spectrum: SpectrumAnalyzer,
    dynamics: DynamicRangeMeter,
    /// Mono downmix scratch, reused across calls.
    downmix: Vec<Sample>,
}

impl MeteringSuite {
    /// Create a suite for the given sample rate and channel count,
    /// targeting the default streaming standard.
    pub fn new(sample_rate: u32, channels: usize) -> MeterResult<Self> {
        Ok(Self {
            channels,
            standard: LoudnessStandard::default(),
            loudness: LoudnessMeter::new(sample_rate, channels)?,
            correlation: CorrelationMeter::new(),
            balance: BalanceMeter::new(),
            spectrum: SpectrumAnalyzer::new(sample_rate)?,
            dynamics: DynamicRangeMeter::new(sample_rate)?,
            downmix: Vec::new(),
        })
    }

    /// Feed one multi-channel block to every meter.
    pub fn process(&mut self, channels: &[&[Sample]]) {
        let used = channels.len().min(self.channels);
        if used == 0 {
            return;
        }
        let frames = channels[..used].iter().map(|c| c.len()).min().unwrap_or(0);
        if frames == 0 {
            return;
        }

        self.loudness.process(channels);

        if used >= 2 {
            self.correlation.process(channels[0], channels[1]);
            self.balance.process(channels[0], channels[1]);
        }

        self.downmix.clear();
        self.downmix.reserve(frames);
        let scale = 1.0 / used as f64;
        for i in 0..frames {
            let sum: f64 = channels[..used].iter().map(|c| c[i] as f64).sum();
            self.downmix.push((sum * scale) as Sample);
        }
        let downmix = std::mem::take(&mut self.downmix);
        self.spectrum.process(&downmix);
        self.dynamics.process(&downmix);
        self.downmix = downmix;
    }

    /// Select the delivery standard compliance is judged against.
    pub fn set_target_standard(&mut self, standard: LoudnessStandard) {
        self.standard = standard;
    }

    /// Current delivery standard.
    pub fn target_standard(&self) -> LoudnessStandard {
        self.standard
    }

    /// Whether integrated loudness sits within 1 LU of the standard's
    /// target. Standards without a target are always compliant.
    pub fn is_loudness_compliant(&self) -> bool {
        match self.standard.target_lufs() {
            Some(target) => {
                (self.loudness.integrated_lufs() - target).abs() <= COMPLIANCE_TOLERANCE_LU
            }
            None => true,
        }
    }

    /// Whether the sample peak sits at or under the standard's
    /// true-peak ceiling. Standards without a ceiling are always
    /// compliant.
    pub fn is_true_peak_compliant(&self) -> bool {
        match self.standard.true_peak_ceiling_db() {
            Some(ceiling) => self.loudness.true_peak_db() <= ceiling,
            None => true,
        }
    }

    /// Signed distance from the integrated loudness to the target
    /// (LU); 0 when the standard has no target.
    pub fn loudness_deviation_lu(&self) -> f64 {
        match self.standard.target_lufs() {
            Some(target) => self.loudness.integrated_lufs() - target,
            None => 0.0,
        }
    }

    /// Snapshot every metric and compliance verdict.
    pub fn report(&self) -> MeteringReport {
        MeteringReport {
            standard: self.standard,
            momentary_lufs: self.loudness.momentary_lufs(),
            short_term_lufs: self.loudness.short_term_lufs(),
            integrated_lufs: self.loudness.integrated_lufs(),
            loudness_range_lu: self.loudness.loudness_range_lu(),
            true_peak_db: self.loudness.true_peak_db(),
            correlation: self.correlation.correlation(),
            phase_status: self.correlation.status(),
            balance: self.balance.balance(),
            balance_db: self.balance.balance_db(),
            crest_factor_db: self.dynamics.crest_factor_db(),
            dynamic_range_db: self.dynamics.dynamic_range_db(),
            loudness_compliant: self.is_loudness_compliant(),
            true_peak_compliant: self.is_true_peak_compliant(),
        }
    }

    /// Loudness meter (momentary / short-term / integrated / LRA / peak).
    pub fn loudness(&self) -> &LoudnessMeter {
        &self.loudness
    }

    /// Phase correlation meter.
    pub fn correlation(&self) -> &CorrelationMeter {
        &self.correlation
    }

    /// Stereo balance meter.
    pub fn balance(&self) -> &BalanceMeter {
        &self.balance
    }

    /// Spectrum analyzer fed by the mono downmix.
    pub fn spectrum(&self) -> &SpectrumAnalyzer {
        &self.spectrum
    }

    /// Crest / dynamic range meter fed by the mono downmix.
    pub fn dynamics(&self) -> &DynamicRangeMeter {
        &self.dynamics
    }

    /// Configured channel count.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Configured sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.loudness.sample_rate()
    }

    /// Change the sample rate of the loudness measurement. The
    /// spectrum and dynamics windows keep their original rate; rebuild
    /// the suite if the whole chain must follow.
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> MeterResult<()> {
        self.loudness.set_sample_rate(sample_rate)?;
        log::debug!("metering suite sample rate -> {sample_rate} Hz");
        Ok(())
    }

    /// Reset every meter to its initial state.
    pub fn reset(&mut self) {
        self.loudness.reset();
        self.correlation.reset();
        self.balance.reset();
        self.spectrum.reset();
        self.dynamics.reset();
        log::debug!("metering suite reset");
    }
}
