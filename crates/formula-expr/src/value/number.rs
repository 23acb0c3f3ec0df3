//! Decimal number type used by the evaluator.
//!
//! Arithmetic runs on [`rust_decimal::Decimal`]; this wrapper adds the NaN
//! and ±infinity states the language requires (division by zero, overflow,
//! failed string coercions, non-finite host floats).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};

#[derive(Debug, Clone, Copy)]
pub enum Number {
    Finite(Decimal),
    Nan,
    PosInf,
    NegInf,
}

impl Number {
    pub const ZERO: Number = Number::Finite(Decimal::ZERO);
    pub const ONE: Number = Number::Finite(Decimal::ONE);

    pub fn is_finite(self) -> bool {
        matches!(self, Number::Finite(_))
    }

    pub fn is_nan(self) -> bool {
        matches!(self, Number::Nan)
    }

    pub fn is_zero(self) -> bool {
        matches!(self, Number::Finite(d) if d.is_zero())
    }

    fn is_negative(self) -> bool {
        match self {
            Number::Finite(d) => d.is_sign_negative() && !d.is_zero(),
            Number::NegInf => true,
            Number::Nan | Number::PosInf => false,
        }
    }

    /// Number literal as written in a formula: decimal, `.5`/`5.` forms,
    /// scientific, or `0x` hex.
    pub fn from_literal(text: &str) -> Option<Number> {
        if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            let value = u64::from_str_radix(hex, 16).ok()?;
            return Some(Number::Finite(Decimal::from(value)));
        }
        if text.contains(['e', 'E']) {
            return Decimal::from_scientific(text).ok().map(Number::Finite);
        }

        let mut normalized = text;
        let prefixed;
        if normalized.starts_with('.') {
            prefixed = format!("0{normalized}");
            normalized = &prefixed;
        }
        let trimmed = normalized.strip_suffix('.').unwrap_or(normalized);
        Decimal::from_str(trimmed).ok().map(Number::Finite)
    }

    /// Coercing parse: any failure yields NaN. Named non-finite forms are
    /// accepted so values that printed as `NaN`/`Infinity` round-trip.
    pub fn parse_lenient(text: &str) -> Number {
        let (sign_negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        if unsigned.eq_ignore_ascii_case("nan") {
            return Number::Nan;
        }
        if unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity") {
            return if sign_negative {
                Number::NegInf
            } else {
                Number::PosInf
            };
        }
        match Number::from_literal(text) {
            Some(n) => n,
            None => Number::Nan,
        }
    }

    /// Host floats are converted through their shortest round-trip string so
    /// decimal formulas never see binary representation artifacts.
    pub fn from_f64(value: f64) -> Number {
        if value.is_nan() {
            return Number::Nan;
        }
        if value.is_infinite() {
            return if value > 0.0 {
                Number::PosInf
            } else {
                Number::NegInf
            };
        }
        match Decimal::from_str(&value.to_string()) {
            Ok(d) => Number::Finite(d),
            // Magnitudes outside the decimal range saturate.
            Err(_) => {
                if value > 0.0 {
                    Number::PosInf
                } else {
                    Number::NegInf
                }
            }
        }
    }

    pub fn from_i64(value: i64) -> Number {
        Number::Finite(Decimal::from(value))
    }

    /// 64-bit integer part. Non-finite values and out-of-range magnitudes
    /// collapse to zero / the saturated bound.
    pub fn to_i64(self) -> i64 {
        match self {
            Number::Finite(d) => {
                let truncated = d.trunc();
                truncated.to_i64().unwrap_or(if truncated.is_sign_negative() {
                    i64::MIN
                } else {
                    i64::MAX
                })
            }
            Number::Nan | Number::PosInf | Number::NegInf => 0,
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Number::Finite(d) => d.to_f64().unwrap_or(f64::NAN),
            Number::Nan => f64::NAN,
            Number::PosInf => f64::INFINITY,
            Number::NegInf => f64::NEG_INFINITY,
        }
    }

    pub fn neg(self) -> Number {
        match self {
            Number::Finite(d) => Number::Finite(-d),
            Number::Nan => Number::Nan,
            Number::PosInf => Number::NegInf,
            Number::NegInf => Number::PosInf,
        }
    }

    pub fn abs(self) -> Number {
        match self {
            Number::Finite(d) => Number::Finite(d.abs()),
            Number::Nan => Number::Nan,
            Number::PosInf | Number::NegInf => Number::PosInf,
        }
    }

    pub fn add(self, other: Number) -> Number {
        match (self, other) {
            (Number::Nan, _) | (_, Number::Nan) => Number::Nan,
            (Number::PosInf, Number::NegInf) | (Number::NegInf, Number::PosInf) => Number::Nan,
            (Number::PosInf, _) | (_, Number::PosInf) => Number::PosInf,
            (Number::NegInf, _) | (_, Number::NegInf) => Number::NegInf,
            (Number::Finite(a), Number::Finite(b)) => match a.checked_add(b) {
                Some(sum) => Number::Finite(sum),
                None => overflow(a.is_sign_negative()),
            },
        }
    }

    pub fn sub(self, other: Number) -> Number {
        self.add(other.neg())
    }

    pub fn mul(self, other: Number) -> Number {
        match (self, other) {
            (Number::Nan, _) | (_, Number::Nan) => Number::Nan,
            (a, b) if !a.is_finite() || !b.is_finite() => {
                if a.is_zero() || b.is_zero() {
                    Number::Nan
                } else {
                    signed_infinity(a.is_negative() != b.is_negative())
                }
            }
            (Number::Finite(a), Number::Finite(b)) => match a.checked_mul(b) {
                Some(product) => Number::Finite(product),
                None => signed_infinity(a.is_sign_negative() != b.is_sign_negative()),
            },
            _ => unreachable!(),
        }
    }

    pub fn div(self, other: Number) -> Number {
        match (self, other) {
            (Number::Nan, _) | (_, Number::Nan) => Number::Nan,
            (a, b) if !a.is_finite() && !b.is_finite() => Number::Nan,
            (a, Number::Finite(b)) if !a.is_finite() => {
                signed_infinity(a.is_negative() != b.is_sign_negative())
            }
            (Number::Finite(_), b) if !b.is_finite() => Number::ZERO,
            (Number::Finite(a), Number::Finite(b)) => {
                if b.is_zero() {
                    if a.is_zero() {
                        Number::Nan
                    } else {
                        signed_infinity(a.is_sign_negative())
                    }
                } else {
                    match a.checked_div(b) {
                        Some(quotient) => Number::Finite(quotient),
                        None => signed_infinity(a.is_sign_negative() != b.is_sign_negative()),
                    }
                }
            }
            _ => unreachable!(),
        }
    }

    pub fn rem(self, other: Number) -> Number {
        match (self, other) {
            (Number::Nan, _) | (_, Number::Nan) => Number::Nan,
            (a, _) if !a.is_finite() => Number::Nan,
            (a @ Number::Finite(_), b) if !b.is_finite() => a,
            (Number::Finite(a), Number::Finite(b)) => {
                if b.is_zero() {
                    Number::Nan
                } else {
                    match a.checked_rem(b) {
                        Some(remainder) => Number::Finite(remainder),
                        None => Number::Nan,
                    }
                }
            }
            _ => unreachable!(),
        }
    }

    pub fn floor(self) -> Number {
        match self {
            Number::Finite(d) => Number::Finite(d.floor()),
            other => other,
        }
    }

    pub fn ceil(self) -> Number {
        match self {
            Number::Finite(d) => Number::Finite(d.ceil()),
            other => other,
        }
    }

    /// Half-away-from-zero rounding to `places` decimal places.
    pub fn round_half_away(self, places: u32) -> Number {
        match self {
            Number::Finite(d) => {
                Number::Finite(d.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero))
            }
            other => other,
        }
    }

    /// Banker's rounding (half to even) to `places` decimal places.
    pub fn round_half_even(self, places: u32) -> Number {
        match self {
            Number::Finite(d) => {
                Number::Finite(d.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven))
            }
            other => other,
        }
    }

    pub fn exp(self) -> Number {
        match self {
            Number::Finite(d) => match d.checked_exp() {
                Some(result) => Number::Finite(result),
                None => Number::PosInf,
            },
            Number::Nan => Number::Nan,
            Number::PosInf => Number::PosInf,
            Number::NegInf => Number::ZERO,
        }
    }

    pub fn ln(self) -> Number {
        match self {
            Number::Finite(d) => {
                if d.is_zero() {
                    Number::NegInf
                } else if d.is_sign_negative() {
                    Number::Nan
                } else {
                    match d.checked_ln() {
                        Some(result) => Number::Finite(result),
                        None => Number::Nan,
                    }
                }
            }
            Number::Nan | Number::NegInf => Number::Nan,
            Number::PosInf => Number::PosInf,
        }
    }

    /// Base-10 logarithm with the same edge rules as [`Number::ln`].
    pub fn log10(self) -> Number {
        match self {
            Number::Finite(d) => {
                if d.is_zero() {
                    Number::NegInf
                } else if d.is_sign_negative() {
                    Number::Nan
                } else {
                    match d.checked_log10() {
                        Some(result) => Number::Finite(result),
                        None => Number::Nan,
                    }
                }
            }
            Number::Nan | Number::NegInf => Number::Nan,
            Number::PosInf => Number::PosInf,
        }
    }

    pub fn sqrt(self) -> Number {
        match self {
            Number::Finite(d) => {
                if d.is_sign_negative() && !d.is_zero() {
                    Number::Nan
                } else {
                    match d.sqrt() {
                        Some(result) => Number::Finite(result),
                        None => Number::Nan,
                    }
                }
            }
            Number::Nan | Number::NegInf => Number::Nan,
            Number::PosInf => Number::PosInf,
        }
    }

    /// Deterministic total order: `NaN < -∞ < finite < +∞`.
    ///
    /// The language's comparison operators and equality run on this order,
    /// which is the documented resolution of NaN comparisons.
    pub fn cmp_total(self, other: Number) -> Ordering {
        fn rank(n: Number) -> u8 {
            match n {
                Number::Nan => 0,
                Number::NegInf => 1,
                Number::Finite(_) => 2,
                Number::PosInf => 3,
            }
        }

        match (self, other) {
            (Number::Finite(a), Number::Finite(b)) => a.cmp(&b),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}

fn signed_infinity(negative: bool) -> Number {
    if negative {
        Number::NegInf
    } else {
        Number::PosInf
    }
}

fn overflow(negative: bool) -> Number {
    signed_infinity(negative)
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.cmp_total(*other) == Ordering::Equal
    }
}

impl Eq for Number {}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp_total(*other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_total(*other)
    }
}

impl From<Decimal> for Number {
    fn from(value: Decimal) -> Self {
        Number::Finite(value)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::from_i64(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Canonical form: trailing fractional zeros trimmed.
            Number::Finite(d) => write!(f, "{}", d.normalize()),
            Number::Nan => f.write_str("NaN"),
            Number::PosInf => f.write_str("Infinity"),
            Number::NegInf => f.write_str("-Infinity"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(text: &str) -> Number {
        Number::from_literal(text).expect("literal")
    }

    #[test]
    fn literal_forms() {
        assert_eq!(n("12"), Number::from_i64(12));
        assert_eq!(n(".5"), n("0.5"));
        assert_eq!(n("1.5e-3"), n("0.0015"));
        assert_eq!(n("0xff"), Number::from_i64(255));
        assert!(Number::from_literal("abc").is_none());
    }

    #[test]
    fn lenient_parse_failures_are_nan() {
        assert!(Number::parse_lenient("hello").is_nan());
        assert!(Number::parse_lenient("NaN").is_nan());
        assert_eq!(Number::parse_lenient("-Infinity"), Number::NegInf);
        assert_eq!(Number::parse_lenient("42"), Number::from_i64(42));
    }

    #[test]
    fn float_round_trip_avoids_binary_artifacts() {
        // 1.1 as a binary double is not exactly 1.1; the string round-trip is.
        assert_eq!(Number::from_f64(1.1), n("1.1"));
        assert_eq!(Number::from_f64(0.1).add(Number::from_f64(0.2)), n("0.3"));
        assert!(Number::from_f64(f64::NAN).is_nan());
        assert_eq!(Number::from_f64(f64::INFINITY), Number::PosInf);
    }

    #[test]
    fn division_edges() {
        assert_eq!(n("1").div(n("0")), Number::PosInf);
        assert_eq!(n("-1").div(n("0")), Number::NegInf);
        assert!(n("0").div(n("0")).is_nan());
        assert_eq!(n("1").div(n("3")).mul(n("3")).round_half_away(10), n("1"));
    }

    #[test]
    fn remainder_edges() {
        assert_eq!(n("7").rem(n("3")), n("1"));
        assert_eq!(n("-7").rem(n("3")), n("-1"));
        assert!(n("7").rem(n("0")).is_nan());
    }

    #[test]
    fn nan_propagates_through_arithmetic() {
        assert!(Number::Nan.add(n("1")).is_nan());
        assert!(Number::PosInf.add(Number::NegInf).is_nan());
        assert!(Number::PosInf.mul(Number::ZERO).is_nan());
    }

    #[test]
    fn total_order_is_documented() {
        assert_eq!(Number::Nan.cmp_total(Number::NegInf), Ordering::Less);
        assert_eq!(Number::NegInf.cmp_total(n("0")), Ordering::Less);
        assert_eq!(n("0").cmp_total(Number::PosInf), Ordering::Less);
        assert_eq!(Number::Nan.cmp_total(Number::Nan), Ordering::Equal);
    }

    #[test]
    fn rounding_strategies() {
        assert_eq!(n("2.5").round_half_away(0), n("3"));
        assert_eq!(n("-2.5").round_half_away(0), n("-3"));
        assert_eq!(n("2.5").round_half_even(0), n("2"));
        assert_eq!(n("3.5").round_half_even(0), n("4"));
    }

    #[test]
    fn log_and_sqrt_edges() {
        assert_eq!(n("0").ln(), Number::NegInf);
        assert!(n("-1").ln().is_nan());
        assert!(n("-4").sqrt().is_nan());
        // The maths routines are iterative; compare at a tolerant scale.
        assert_eq!(n("100").log10().round_half_away(12), n("2"));
        assert_eq!(n("9").sqrt().round_half_away(12), n("3"));
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(n("1.500").to_string(), "1.5");
        assert_eq!(n("1.5e3").to_string(), "1500");
        assert_eq!(Number::Nan.to_string(), "NaN");
    }

    #[test]
    fn integer_part_of_non_finite_is_zero() {
        assert_eq!(Number::Nan.to_i64(), 0);
        assert_eq!(Number::PosInf.to_i64(), 0);
        assert_eq!(n("9.99").to_i64(), 9);
        assert_eq!(n("-9.99").to_i64(), -9);
    }
}
