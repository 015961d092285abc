//! Gated loudness measurement (ITU-R BS.1770)
//!
//! Accumulates K-weighted energy into overlapping 400 ms blocks
//! (100 ms hop, 75% overlap) and derives momentary, short-term (3 s)
//! and integrated loudness with the two-stage gating algorithm, plus
//! loudness range (EBU R128 LRA) and sample-peak tracking.
//!
//! The measurement is strictly deterministic: the same signal fed in
//! any call granularity always yields the same LUFS sequence.

use crate::kweight::KWeightingFilter;
use sono_core::{MeterError, MeterResult, Sample, gain_to_db};
use std::collections::VecDeque;

/// Measurement block length (seconds).
const BLOCK_SECS: f64 = 0.4;
/// Block hop (seconds); blocks overlap by 75%.
const HOP_SECS: f64 = 0.1;
/// Short-term window in blocks (3 s at 100 ms hop).
const SHORT_TERM_BLOCKS: usize = 30;
/// Absolute gate threshold (LUFS).
const ABSOLUTE_GATE_LUFS: f64 = -70.0;
/// Relative gate offset below the first-pass mean (LU).
const RELATIVE_GATE_LU: f64 = 10.0;
/// Floor reported for silence / empty measurements.
const SILENCE_FLOOR_LUFS: f64 = -100.0;
/// Mean-square floor preventing `-inf` loudness.
const ENERGY_FLOOR: f64 = 1e-10;
/// BS.1770 loudness offset.
const LUFS_OFFSET: f64 = -0.691;
/// Channel weight for surround channels (index >= 2).
const SURROUND_WEIGHT: f64 = 1.41;

/// Two-stage gated loudness over an ordered sequence of block values.
///
/// First pass drops blocks at or below the -70 LUFS absolute gate;
/// second pass drops blocks at or below the energy mean of the
/// survivors minus 10 LU. Returns the energy-domain mean of the final
/// survivors, the first-pass mean if the relative gate rejects
/// everything, or the silence floor if there are no blocks at all.
fn gated_loudness<I>(blocks: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let survivors: Vec<f64> = blocks
        .into_iter()
        .filter(|&l| l > ABSOLUTE_GATE_LUFS)
        .collect();
    if survivors.is_empty() {
        return SILENCE_FLOOR_LUFS;
    }

    let mean1 = energy_mean(&survivors);
    let threshold = mean1 - RELATIVE_GATE_LU;
    let gated: Vec<f64> = survivors.iter().copied().filter(|&l| l > threshold).collect();

    if gated.is_empty() { mean1 } else { energy_mean(&gated) }
}

/// Mean of loudness values in the energy domain, back in LUFS.
fn energy_mean(blocks: &[f64]) -> f64 {
    let sum: f64 = blocks.iter().map(|&l| 10.0_f64.powf(l / 10.0)).sum();
    10.0 * (sum / blocks.len() as f64).log10()
}

/// LRA: 95th minus 10th percentile of the gated block history.
fn loudness_range(blocks: &[f64]) -> f64 {
    if blocks.len() < 2 {
        return 0.0;
    }

    let mut sorted = blocks.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let low = (sorted.len() as f64 * 0.10) as usize;
    let high = (sorted.len() as f64 * 0.95) as usize;
    sorted[high] - sorted[low]
}

/// BS.1770 loudness meter.
///
/// Consumes multi-channel blocks of arbitrary length; per-sample
/// K-weighted energy is summed across channels (surround channels
/// weighted by 1.41) and folded into overlapping measurement blocks.
/// All metrics are updated synchronously before `process` returns.
pub struct LoudnessMeter {
    sample_rate: u32,
    filters: Vec<KWeightingFilter>,
    block_size: usize,
    hop_size: usize,
    /// Per-sample channel-summed weighted energy awaiting a full block.
    energy: Vec<f64>,
    short_term: VecDeque<f64>,
    integrated: Vec<f64>,
    momentary_lufs: f64,
    short_term_lufs: f64,
    integrated_lufs: f64,
    loudness_range_lu: f64,
    true_peak_linear: f64,
    true_peak_db: f64,
}

impl LoudnessMeter {
    /// Create a meter for the given sample rate and channel count.
    pub fn new(sample_rate: u32, channels: usize) -> MeterResult<Self> {
        if channels == 0 {
            return Err(MeterError::InvalidChannelCount(channels));
        }

        let filters = (0..channels)
            .map(|_| KWeightingFilter::new(sample_rate))
            .collect::<MeterResult<Vec<_>>>()?;

        Ok(Self {
            sample_rate,
            filters,
            block_size: (sample_rate as f64 * BLOCK_SECS) as usize,
            hop_size: (sample_rate as f64 * HOP_SECS) as usize,
            energy: Vec::new(),
            short_term: VecDeque::with_capacity(SHORT_TERM_BLOCKS + 1),
            integrated: Vec::new(),
            momentary_lufs: SILENCE_FLOOR_LUFS,
            short_term_lufs: SILENCE_FLOOR_LUFS,
            integrated_lufs: SILENCE_FLOOR_LUFS,
            loudness_range_lu: 0.0,
            true_peak_linear: 0.0,
            true_peak_db: SILENCE_FLOOR_LUFS,
        })
    }

    /// Process one block of per-channel sample slices.
    ///
    /// Slices beyond the configured channel count are ignored; frame
    /// count is the shortest of the used slices. Partial measurement
    /// blocks are buffered across calls, never measured.
    pub fn process(&mut self, channels: &[&[Sample]]) {
        let used = channels.len().min(self.filters.len());
        if used == 0 {
            return;
        }
        let frames = channels[..used].iter().map(|c| c.len()).min().unwrap_or(0);

        for i in 0..frames {
            let mut sum = 0.0;
            for (ch, data) in channels[..used].iter().enumerate() {
                let sample = data[i] as f64;

                let abs = sample.abs();
                if abs > self.true_peak_linear {
                    self.true_peak_linear = abs;
                    self.true_peak_db = gain_to_db(abs);
                }

                let weighted = self.filters[ch].process(sample);
                let channel_weight = if ch >= 2 { SURROUND_WEIGHT } else { 1.0 };
                sum += weighted * weighted * channel_weight;
            }

            self.energy.push(sum);
            if self.energy.len() >= self.block_size {
                self.complete_block();
            }
        }
    }

    /// Fold one full 400 ms block into the rolling measurements.
    fn complete_block(&mut self) {
        let mean_square = self.energy.iter().sum::<f64>() / self.energy.len() as f64;
        let block = (LUFS_OFFSET + 10.0 * mean_square.max(ENERGY_FLOOR).log10())
            .max(SILENCE_FLOOR_LUFS);

        self.momentary_lufs = block;

        self.short_term.push_back(block);
        if self.short_term.len() > SHORT_TERM_BLOCKS {
            self.short_term.pop_front();
        }
        self.short_term_lufs = gated_loudness(self.short_term.iter().copied());

        if block > ABSOLUTE_GATE_LUFS {
            self.integrated.push(block);
            self.integrated_lufs = gated_loudness(self.integrated.iter().copied());
            self.loudness_range_lu = loudness_range(&self.integrated);
        }

        // 100 ms hop: keep the trailing 300 ms for the next block
        self.energy.drain(..self.hop_size);
    }

    /// Loudness of the most recent 400 ms block (LUFS).
    pub fn momentary_lufs(&self) -> f64 {
        self.momentary_lufs
    }

    /// Gated loudness over the last 3 s of blocks (LUFS).
    pub fn short_term_lufs(&self) -> f64 {
        self.short_term_lufs
    }

    /// Gated loudness over the whole program since the last reset (LUFS).
    pub fn integrated_lufs(&self) -> f64 {
        self.integrated_lufs
    }

    /// Loudness range over the gated program history (LU).
    pub fn loudness_range_lu(&self) -> f64 {
        self.loudness_range_lu
    }

    /// Maximum sample peak in dBFS.
    ///
    /// Sample-peak approximation: no oversampled inter-sample peak
    /// detection is performed.
    pub fn true_peak_db(&self) -> f64 {
        self.true_peak_db
    }

    /// Maximum sample peak as linear gain.
    pub fn true_peak_linear(&self) -> f64 {
        self.true_peak_linear
    }

    /// Number of gated blocks in the integrated history.
    pub fn integrated_block_count(&self) -> usize {
        self.integrated.len()
    }

    /// Configured sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Configured channel count.
    pub fn channels(&self) -> usize {
        self.filters.len()
    }

    /// Rebuild the weighting filters and block sizes for a new sample
    /// rate. Clears all rolling state.
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> MeterResult<()> {
        for filter in &mut self.filters {
            filter.set_sample_rate(sample_rate)?;
        }
        self.sample_rate = sample_rate;
        self.block_size = (sample_rate as f64 * BLOCK_SECS) as usize;
        self.hop_size = (sample_rate as f64 * HOP_SECS) as usize;
        self.reset();
        Ok(())
    }

    /// Clear all rolling state and metrics.
    ///
    /// Must be called between unrelated measurement sessions so prior
    /// audio cannot bleed into the block gating.
    pub fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
        self.energy.clear();
        self.short_term.clear();
        self.integrated.clear();
        self.momentary_lufs = SILENCE_FLOOR_LUFS;
        self.short_term_lufs = SILENCE_FLOOR_LUFS;
        self.integrated_lufs = SILENCE_FLOOR_LUFS;
        self.loudness_range_lu = 0.0;
        self.true_peak_linear = 0.0;
        self.true_peak_db = SILENCE_FLOOR_LUFS;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const SAMPLE_RATE: u32 = 48000;

    fn sine(freq: f64, amplitude: f64, samples: usize) -> Vec<Sample> {
        (0..samples)
            .map(|i| {
                (amplitude * (2.0 * PI * freq * i as f64 / SAMPLE_RATE as f64).sin()) as Sample
            })
            .collect()
    }

    #[test]
    fn test_construction_validation() {
        assert!(LoudnessMeter::new(48000, 0).is_err());
        assert!(LoudnessMeter::new(0, 2).is_err());
        assert!(LoudnessMeter::new(48000, 2).is_ok());
        assert!(LoudnessMeter::new(48000, 6).is_ok());
    }

    #[test]
    fn test_gated_loudness_empty() {
        assert_eq!(gated_loudness(std::iter::empty()), SILENCE_FLOOR_LUFS);
    }

    #[test]
    fn test_gated_loudness_all_below_absolute_gate() {
        let blocks = [-80.0, -75.0, -90.0];
        assert_eq!(gated_loudness(blocks.iter().copied()), SILENCE_FLOOR_LUFS);
    }

    #[test]
    fn test_gated_loudness_constant_blocks() {
        let blocks = [-20.0; 10];
        let gated = gated_loudness(blocks.iter().copied());
        assert!((gated + 20.0).abs() < 1e-9, "gated = {gated}");
    }

    #[test]
    fn test_relative_gate_drops_quiet_blocks() {
        // Twenty loud blocks and one 30 LU quieter; the quiet block
        // passes the absolute gate but not the relative gate.
        let mut blocks = vec![-20.0; 20];
        blocks.push(-50.0);
        let gated = gated_loudness(blocks.iter().copied());
        assert!((gated + 20.0).abs() < 0.1, "gated = {gated}");
    }

    #[test]
    fn test_loudness_range_percentiles() {
        assert_eq!(loudness_range(&[]), 0.0);
        assert_eq!(loudness_range(&[-20.0]), 0.0);

        let blocks: Vec<f64> = (0..100).map(|i| -40.0 + i as f64 * 0.2).collect();
        let lra = loudness_range(&blocks);
        // 95th percentile (-21.0) minus 10th percentile (-38.0)
        assert!((lra - 17.0).abs() < 1e-9, "lra = {lra}");
    }

    #[test]
    fn test_silence_floor() {
        let mut meter = LoudnessMeter::new(SAMPLE_RATE, 2).unwrap();
        let zeros = vec![0.0 as Sample; SAMPLE_RATE as usize * 2];
        meter.process(&[&zeros, &zeros]);

        assert_eq!(meter.momentary_lufs(), SILENCE_FLOOR_LUFS);
        assert_eq!(meter.short_term_lufs(), SILENCE_FLOOR_LUFS);
        assert_eq!(meter.integrated_lufs(), SILENCE_FLOOR_LUFS);
        assert_eq!(meter.integrated_block_count(), 0);
        assert_eq!(meter.loudness_range_lu(), 0.0);
    }

    #[test]
    fn test_sine_momentary_matches_closed_form() {
        // 500 Hz sits in the flat region of the K-weighting curve, so
        // a -20 dBFS stereo sine must land near
        // -0.691 + 10*log10(2 * 0.5 * 0.1^2) = -20.69 LUFS.
        let mut meter = LoudnessMeter::new(SAMPLE_RATE, 2).unwrap();
        let tone = sine(500.0, 0.1, SAMPLE_RATE as usize * 2);
        meter.process(&[&tone, &tone]);

        let momentary = meter.momentary_lufs();
        assert!(
            (momentary + 20.69).abs() < 0.5,
            "momentary = {momentary}, expected ~-20.69"
        );
    }

    #[test]
    fn test_1khz_sine_against_reference() {
        // A -20 dBFS stereo 1 kHz sine reads ~-20 LUFS on a BS.1770
        // reference meter (the shelf contributes just under +1 dB).
        let mut meter = LoudnessMeter::new(SAMPLE_RATE, 2).unwrap();
        let tone = sine(1000.0, 0.1, SAMPLE_RATE as usize * 3);
        meter.process(&[&tone, &tone]);

        let integrated = meter.integrated_lufs();
        assert!(
            (integrated + 20.0).abs() < 0.5,
            "integrated = {integrated}, expected ~-20.0"
        );
    }

    #[test]
    fn test_true_peak_tracks_sample_peak() {
        let mut meter = LoudnessMeter::new(SAMPLE_RATE, 2).unwrap();
        let mut tone = sine(500.0, 0.25, 4800);
        tone[1234] = -0.5;
        let other = sine(500.0, 0.25, 4800);
        meter.process(&[&tone, &other]);

        assert!((meter.true_peak_linear() - 0.5).abs() < 1e-6);
        assert!((meter.true_peak_db() + 6.0206).abs() < 1e-3);
    }

    #[test]
    fn test_partial_blocks_are_buffered() {
        let mut meter = LoudnessMeter::new(SAMPLE_RATE, 1).unwrap();
        // 300 ms of audio: less than one 400 ms block
        let tone = sine(500.0, 0.5, SAMPLE_RATE as usize * 3 / 10);
        meter.process(&[&tone]);
        assert_eq!(meter.momentary_lufs(), SILENCE_FLOOR_LUFS);

        // 100 ms more completes the first block
        let more = sine(500.0, 0.5, SAMPLE_RATE as usize / 10);
        meter.process(&[&more]);
        assert!(meter.momentary_lufs() > -70.0);
    }

    #[test]
    fn test_reset_determinism() {
        let mut meter = LoudnessMeter::new(SAMPLE_RATE, 2).unwrap();
        let tone = sine(500.0, 0.3, SAMPLE_RATE as usize);

        meter.process(&[&tone, &tone]);
        let first = (
            meter.momentary_lufs(),
            meter.short_term_lufs(),
            meter.integrated_lufs(),
            meter.true_peak_db(),
        );

        meter.reset();
        meter.process(&[&tone, &tone]);
        let second = (
            meter.momentary_lufs(),
            meter.short_term_lufs(),
            meter.integrated_lufs(),
            meter.true_peak_db(),
        );

        assert_eq!(first, second);
    }

    #[test]
    fn test_call_granularity_invariance() {
        let tone = sine(500.0, 0.3, SAMPLE_RATE as usize * 2);

        let mut whole = LoudnessMeter::new(SAMPLE_RATE, 1).unwrap();
        whole.process(&[&tone]);

        let mut chunked = LoudnessMeter::new(SAMPLE_RATE, 1).unwrap();
        for chunk in tone.chunks(333) {
            chunked.process(&[chunk]);
        }

        assert_eq!(whole.momentary_lufs(), chunked.momentary_lufs());
        assert_eq!(whole.integrated_lufs(), chunked.integrated_lufs());
    }

    #[test]
    fn test_surround_channel_weighting() {
        // The same mono tone on a surround channel carries 1.41x the
        // energy of the same tone on a front channel.
        let tone = sine(500.0, 0.1, SAMPLE_RATE as usize);
        let zeros = vec![0.0 as Sample; tone.len()];

        let mut front = LoudnessMeter::new(SAMPLE_RATE, 4).unwrap();
        front.process(&[&tone, &zeros, &zeros, &zeros]);

        let mut rear = LoudnessMeter::new(SAMPLE_RATE, 4).unwrap();
        rear.process(&[&zeros, &zeros, &tone, &zeros]);

        let delta = rear.momentary_lufs() - front.momentary_lufs();
        let expected = 10.0 * SURROUND_WEIGHT.log10();
        assert!((delta - expected).abs() < 0.01, "delta = {delta}");
    }
}
