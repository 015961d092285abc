//! sono-core: shared primitives for the Sonoscope metering engine
//!
//! Defines the sample type consumed by every meter, linear/decibel
//! conversions, and the configuration error type returned by meter
//! constructors.

#![warn(missing_docs)]

mod error;
mod sample;

pub use error::{MeterError, MeterResult};
pub use sample::{Sample, db_to_gain, gain_to_db};
