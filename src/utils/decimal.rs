/// Decimal helpers for monetary values.
///
/// All amounts are stored as NUMERIC and handled as `BigDecimal` end to end;
/// `f64` only appears at the JSON boundary, rounded to 2 decimal places on
/// the way in.
use bigdecimal::{BigDecimal, RoundingMode};
use num_traits::{FromPrimitive, ToPrimitive};

pub fn zero() -> BigDecimal {
    BigDecimal::from(0)
}

/// Convert a wire-format amount into a BigDecimal, rounded to 2 dp.
/// Returns None for NaN/infinite input.
pub fn amount_from_f64(value: f64) -> Option<BigDecimal> {
    BigDecimal::from_f64(value).map(|d| d.with_scale_round(2, RoundingMode::HalfUp))
}

/// Lossy conversion for response payloads.
pub fn amount_to_f64(value: &BigDecimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_amount_from_f64() {
        assert_eq!(amount_from_f64(5000.0), Some(BigDecimal::from_str("5000.00").unwrap()));
        assert_eq!(amount_from_f64(0.555), Some(BigDecimal::from_str("0.56").unwrap()));
        assert_eq!(amount_from_f64(f64::NAN), None);
        assert_eq!(amount_from_f64(f64::INFINITY), None);
    }

    #[test]
    fn test_amount_to_f64() {
        assert_eq!(amount_to_f64(&BigDecimal::from(1500)), 1500.0);
        assert_eq!(amount_to_f64(&BigDecimal::from_str("123.45").unwrap()), 123.45);
    }

    #[test]
    fn test_zero() {
        assert_eq!(zero(), BigDecimal::from(0));
    }
}
