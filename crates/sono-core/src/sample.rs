//! Sample type and decibel conversions

/// Type alias for audio samples entering the engine (32-bit float).
///
/// Internal accumulation is always performed in `f64` for precision;
/// the alias documents the wire format of incoming audio blocks.
pub type Sample = f32;

/// Linear-gain floor used before taking logarithms.
const GAIN_FLOOR: f64 = 1e-10;

/// Convert linear gain to decibels, floored to avoid `-inf`.
#[inline]
pub fn gain_to_db(gain: f64) -> f64 {
    20.0 * gain.max(GAIN_FLOOR).log10()
}

/// Convert decibels to linear gain.
#[inline]
pub fn db_to_gain(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_conversions() {
        assert!((gain_to_db(1.0)).abs() < 1e-12);
        assert!((gain_to_db(0.5) + 6.0206).abs() < 1e-3);
        assert!((db_to_gain(-6.0206) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_zero_gain_is_finite() {
        let db = gain_to_db(0.0);
        assert!(db.is_finite());
        assert!(db <= -190.0);
    }
}
