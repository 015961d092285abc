//! Windowed-FFT spectrum analyzer
//!
//! Accumulates incoming audio into an overlap buffer and, once a full
//! FFT frame is available, produces Hann-windowed magnitude spectra in
//! dBFS with exponential smoothing across frames. Frames advance by
//! half the FFT size (50% overlap).

use realfft::{RealFftPlanner, RealToComplex};
use sono_core::{MeterError, MeterResult, Sample};
use std::sync::Arc;

/// Default FFT frame length.
const DEFAULT_FFT_SIZE: usize = 4096;
/// Smallest accepted FFT frame length.
const MIN_FFT_SIZE: usize = 64;
/// Largest accepted FFT frame length.
const MAX_FFT_SIZE: usize = 65536;
/// Default inter-frame smoothing factor.
const DEFAULT_SMOOTHING: f64 = 0.8;
/// Magnitude floor before conversion to dB.
const MAG_FLOOR: f64 = 1e-10;
/// Level reported for bins that have seen no audio (dB).
const SILENCE_DB: f64 = -100.0;

/// Real-input FFT spectrum analyzer with Hann windowing.
pub struct SpectrumAnalyzer {
    sample_rate: u32,
    fft_size: usize,
    fft: Arc<dyn RealToComplex<f64>>,
    window: Vec<f64>,
    /// Pending input; drained by `fft_size / 2` per analyzed frame.
    buffer: Vec<f64>,
    scratch: Vec<f64>,
    output: Vec<rustfft::num_complex::Complex<f64>>,
    /// Smoothed per-bin magnitudes in dB.
    magnitudes: Vec<f64>,
    smoothing: f64,
}

impl SpectrumAnalyzer {
    /// Create an analyzer with the default 4096-point FFT.
    pub fn new(sample_rate: u32) -> MeterResult<Self> {
        Self::with_fft_size(sample_rate, DEFAULT_FFT_SIZE)
    }

    /// Create an analyzer with an explicit FFT frame length.
    ///
    /// The length must be a power of two in [64, 65536].
    pub fn with_fft_size(sample_rate: u32, fft_size: usize) -> MeterResult<Self> {
        if sample_rate == 0 {
            return Err(MeterError::InvalidSampleRate(sample_rate));
        }
        if !fft_size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&fft_size) {
            return Err(MeterError::InvalidFftSize(fft_size));
        }

        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(fft_size);

        let window: Vec<f64> = (0..fft_size)
            .map(|i| {
                0.5 * (1.0
                    - (2.0 * std::f64::consts::PI * i as f64 / (fft_size - 1) as f64).cos())
            })
            .collect();

        let bins = fft_size / 2 + 1;
        Ok(Self {
            sample_rate,
            fft_size,
            fft,
            window,
            buffer: Vec::with_capacity(fft_size * 2),
            scratch: vec![0.0; fft_size],
            output: vec![rustfft::num_complex::Complex::new(0.0, 0.0); bins],
            magnitudes: vec![SILENCE_DB; bins],
            smoothing: DEFAULT_SMOOTHING,
        })
    }

    /// Feed mono samples; analyzes every completed frame.
    pub fn process(&mut self, input: &[Sample]) {
        self.buffer.extend(input.iter().map(|&s| s as f64));
        while self.buffer.len() >= self.fft_size {
            self.analyze_frame();
            self.buffer.drain(..self.fft_size / 2);
        }
    }

    fn analyze_frame(&mut self) {
        for i in 0..self.fft_size {
            self.scratch[i] = self.buffer[i] * self.window[i];
        }

        if self.fft.process(&mut self.scratch, &mut self.output).is_err() {
            log::warn!("spectrum FFT failed for frame of {} samples", self.fft_size);
            return;
        }

        let alpha = self.smoothing;
        let scale = self.fft_size as f64;
        for (smoothed, bin) in self.magnitudes.iter_mut().zip(self.output.iter()) {
            let mag_db = 20.0 * (bin.norm() / scale).max(MAG_FLOOR).log10();
            *smoothed = *smoothed * alpha + mag_db * (1.0 - alpha);
        }
    }

    /// Smoothed magnitude spectrum in dB, one value per bin
    /// (`fft_size / 2 + 1` bins, DC through Nyquist).
    pub fn magnitudes_db(&self) -> &[f64] {
        &self.magnitudes
    }

    /// Center frequency of a bin in Hz.
    pub fn bin_frequency(&self, bin: usize) -> f64 {
        bin as f64 * self.sample_rate as f64 / self.fft_size as f64
    }

    /// Number of spectrum bins (`fft_size / 2 + 1`).
    pub fn bin_count(&self) -> usize {
        self.magnitudes.len()
    }

    /// Smoothed magnitude (dB) of the bin nearest a frequency in Hz.
    pub fn magnitude_at(&self, freq: f64) -> f64 {
        self.magnitudes[self.frequency_to_bin(freq)]
    }

    /// Nearest bin for a frequency in Hz.
    pub fn frequency_to_bin(&self, freq: f64) -> usize {
        let bin = (freq * self.fft_size as f64 / self.sample_rate as f64).round() as usize;
        bin.min(self.magnitudes.len() - 1)
    }

    /// Set the inter-frame smoothing factor, clamped to [0, 0.99].
    /// 0 disables smoothing entirely.
    pub fn set_smoothing(&mut self, smoothing: f64) {
        self.smoothing = smoothing.clamp(0.0, 0.99);
    }

    /// Configured FFT frame length.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Configured sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Drop buffered input and return all bins to the silence floor.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.magnitudes.fill(SILENCE_DB);
    }
}
