//! Broadcast-grade audio metering
//!
//! Real-time meters for loudness (ITU-R BS.1770 gated LUFS), stereo
//! phase correlation, stereo balance, spectrum, and dynamic range,
//! plus a [`MeteringSuite`] that drives all of them from one stream of
//! multi-channel audio and checks the result against named delivery
//! standards (EBU R128, ATSC A/85, streaming platforms).
//!
//! All meters are synchronous and allocation-free in the steady state;
//! feed them audio in blocks of any size.
//!
//! ```
//! use sono_meter::{LoudnessStandard, MeteringSuite};
//!
//! let mut suite = MeteringSuite::new(48_000, 2)?;
//! suite.set_target_standard(LoudnessStandard::EbuR128);
//!
//! let left = vec![0.0f32; 4800];
//! let right = vec![0.0f32; 4800];
//! suite.process(&[&left, &right]);
//!
//! let report = suite.report();
//! assert_eq!(report.integrated_lufs, -100.0);
//! # Ok::<(), sono_meter::MeterError>(())
//! ```

#![warn(missing_docs)]

pub mod balance;
pub mod correlation;
pub mod dynamics;
pub mod kweight;
pub mod loudness;
pub mod spectrum;
pub mod standards;
pub mod suite;

pub use balance::BalanceMeter;
pub use correlation::{CorrelationMeter, PhaseStatus};
pub use dynamics::DynamicRangeMeter;
pub use kweight::KWeightingFilter;
pub use loudness::LoudnessMeter;
pub use spectrum::SpectrumAnalyzer;
pub use standards::LoudnessStandard;
pub use suite::{MeteringReport, MeteringSuite};

pub use sono_core::{MeterError, MeterResult, Sample, db_to_gain, gain_to_db};
