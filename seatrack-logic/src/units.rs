use std::fmt;

use serde::{Deserialize, Serialize};

/// Knots in one meter per second
pub const MPS_TO_KNOTS: f64 = 1.94384;

/// Round to `places` decimal places, half away from zero
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, specta::Type)]
/// A speed over ground in knots, always non-negative and rounded to hundredths
pub struct Knots(f64);

impl Knots {
    /// Convert a raw speed-over-ground in m/s. Returns `None` for missing readings, which the
    /// platform reports as NaN or negative values.
    pub fn from_mps(mps: f64) -> Option<Self> {
        if mps.is_nan() || mps < 0.0 {
            return None;
        }
        let knots = round_to(mps * MPS_TO_KNOTS, 2);
        knots.is_finite().then_some(Self(knots))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Knots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion() {
        assert_eq!(Knots::from_mps(10.0).map(Knots::value), Some(19.44));
        assert_eq!(Knots::from_mps(5.0).unwrap().to_string(), "9.72");
        assert_eq!(Knots::from_mps(0.0).unwrap().to_string(), "0.00");
    }

    #[test]
    fn test_invalid_speed() {
        assert!(Knots::from_mps(f64::NAN).is_none());
        assert!(Knots::from_mps(-1.0).is_none());
        assert!(Knots::from_mps(f64::INFINITY).is_none());
        // Finite input that overflows once converted
        assert!(Knots::from_mps(1e307).is_none());
    }

    #[test]
    fn test_rounding() {
        // 1.0 m/s = 1.94384 kn
        assert_eq!(Knots::from_mps(1.0).unwrap().value(), 1.94);
        // 2.5 m/s = 4.8596 kn
        assert_eq!(Knots::from_mps(2.5).unwrap().value(), 4.86);
        assert_eq!(round_to(12.3456, 0), 12.0);
    }
}
