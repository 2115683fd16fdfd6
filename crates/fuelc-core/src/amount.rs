//! # Compliance-Balance Amounts: Fixed-Point gCO₂e
//!
//! [`CbAmount`] is a signed quantity of grams of CO₂-equivalent held as an
//! integer number of hundredths. Two decimal places is the reporting
//! precision of a compliance balance, so every banked, withdrawn, transferred
//! or pooled quantity is exactly representable and sums never drift.
//!
//! The textual form is `-?\d+(\.\d{1,2})?`, rendered with exactly two
//! decimals (`"-340956000.00"`). JSON serialization uses that string form.
//! Deserialization also accepts JSON integers (whole grams) and floats
//! (rounded half away from zero) for client convenience.
//!
//! Every constructor fed by outside input rejects magnitudes above
//! [`CbAmount::MAX_INPUT`] (10¹⁴ g, i.e. 100 Mt CO₂e). Up to 922 such
//! amounts sum without overflowing `i64`, far more than a pool or a ship's
//! ledger holds. Aggregates over untrusted lists still use
//! [`CbAmount::checked_sum`].

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Hundredths per gram.
const SCALE: i64 = 100;

/// Basis points per unit.
const BPS_PER_UNIT: i128 = 10_000;

/// 10¹⁴ g in hundredths.
const MAX_INPUT_HUNDREDTHS: i64 = 10_000_000_000_000_000;

/// A signed compliance-balance quantity in hundredths of gCO₂e.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CbAmount(i64);

impl CbAmount {
    /// Zero balance.
    pub const ZERO: CbAmount = CbAmount(0);

    /// Largest magnitude accepted from parsed or converted input.
    pub const MAX_INPUT: CbAmount = CbAmount(MAX_INPUT_HUNDREDTHS);

    /// Construct from a raw count of hundredths of a gram.
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Self(hundredths)
    }

    /// Construct from whole grams. Returns `None` above [`Self::MAX_INPUT`].
    pub fn from_grams(grams: i64) -> Option<Self> {
        grams
            .checked_mul(SCALE)
            .filter(|h| h.unsigned_abs() <= MAX_INPUT_HUNDREDTHS as u64)
            .map(Self)
    }

    /// Round a floating-point gram value to two decimals, half away from zero.
    ///
    /// This is the only float-to-amount conversion in the workspace.
    pub fn from_f64_rounded(grams: f64) -> Result<Self, ValidationError> {
        if !grams.is_finite() {
            return Err(ValidationError::NonFiniteInput { field: "amount" });
        }
        // f64::round rounds half away from zero.
        let scaled = (grams * SCALE as f64).round();
        if scaled.abs() > MAX_INPUT_HUNDREDTHS as f64 {
            return Err(ValidationError::AmountOutOfRange(format!("{grams}")));
        }
        Ok(Self(scaled as i64))
    }

    /// Raw hundredths.
    pub const fn hundredths(self) -> i64 {
        self.0
    }

    /// Lossy conversion to grams for display and ratio math.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// Strictly greater than zero.
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Strictly less than zero.
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Exactly zero.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Absolute value.
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Checked addition.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Sum that returns `None` instead of overflowing.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Self>) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, x| acc.checked_add(x))
    }

    /// Fraction of this amount expressed in basis points, truncated toward zero.
    ///
    /// `CbAmount::from_hundredths(1001).fraction_bps(2000)` is `2.00`:
    /// a cap derived from a surplus never rounds up past the surplus share.
    pub fn fraction_bps(self, bps: u32) -> Self {
        let scaled = (self.0 as i128) * (bps as i128) / BPS_PER_UNIT;
        Self(scaled as i64)
    }
}

impl fmt::Display for CbAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(
            f,
            "{sign}{}.{:02}",
            abs / SCALE as u64,
            abs % SCALE as u64
        )
    }
}

impl FromStr for CbAmount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let (negative, digits) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw.strip_prefix('+').unwrap_or(raw)),
        };

        let (int_part, frac_part) = match digits.split_once('.') {
            Some((int_part, frac_part)) if !frac_part.is_empty() => (int_part, frac_part),
            Some(_) => return Err(ValidationError::InvalidAmount(s.to_string())),
            None => (digits, ""),
        };

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty() || !all_digits(int_part) || !all_digits(frac_part) {
            return Err(ValidationError::InvalidAmount(s.to_string()));
        }
        if frac_part.len() > 2 {
            return Err(ValidationError::AmountTooPrecise(s.to_string()));
        }

        let whole: i64 = int_part
            .parse()
            .map_err(|_| ValidationError::AmountOutOfRange(s.to_string()))?;
        let frac: i64 = match frac_part.len() {
            0 => 0,
            1 => i64::from(frac_part.as_bytes()[0] - b'0') * 10,
            _ => i64::from(frac_part.as_bytes()[0] - b'0') * 10
                + i64::from(frac_part.as_bytes()[1] - b'0'),
        };

        let magnitude = whole
            .checked_mul(SCALE)
            .and_then(|w| w.checked_add(frac))
            .filter(|&m| m <= MAX_INPUT_HUNDREDTHS)
            .ok_or_else(|| ValidationError::AmountOutOfRange(s.to_string()))?;

        Ok(Self(if negative { -magnitude } else { magnitude }))
    }
}

impl Add for CbAmount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for CbAmount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Neg for CbAmount {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl AddAssign for CbAmount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for CbAmount {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Sum for CbAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a CbAmount> for CbAmount {
    fn sum<I: Iterator<Item = &'a CbAmount>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc + *x)
    }
}

impl Serialize for CbAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CbAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CbAmountVisitor)
    }
}

struct CbAmountVisitor;

impl<'de> Visitor<'de> for CbAmountVisitor {
    type Value = CbAmount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a gCO2e amount as a decimal string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<CbAmount, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<CbAmount, E> {
        CbAmount::from_grams(v).ok_or_else(|| E::custom(format!("amount out of range: {v}")))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<CbAmount, E> {
        i64::try_from(v)
            .ok()
            .and_then(CbAmount::from_grams)
            .ok_or_else(|| E::custom(format!("amount out of range: {v}")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<CbAmount, E> {
        CbAmount::from_f64_rounded(v).map_err(E::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(s: &str) -> CbAmount {
        s.parse().unwrap()
    }

    #[test]
    fn parse_whole_and_decimal() {
        assert_eq!(amt("100").hundredths(), 10_000);
        assert_eq!(amt("100.5").hundredths(), 10_050);
        assert_eq!(amt("100.05").hundredths(), 10_005);
        assert_eq!(amt("-0.01").hundredths(), -1);
        assert_eq!(amt("+7").hundredths(), 700);
        assert_eq!(amt("  12.34 ").hundredths(), 1_234);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            "abc".parse::<CbAmount>(),
            Err(ValidationError::InvalidAmount(_))
        ));
        assert!("".parse::<CbAmount>().is_err());
        assert!("-".parse::<CbAmount>().is_err());
        assert!("1.".parse::<CbAmount>().is_err());
        assert!(".5".parse::<CbAmount>().is_err());
        assert!("1e5".parse::<CbAmount>().is_err());
        assert!(matches!(
            "1.234".parse::<CbAmount>(),
            Err(ValidationError::AmountTooPrecise(_))
        ));
        assert!(matches!(
            "99999999999999999999".parse::<CbAmount>(),
            Err(ValidationError::AmountOutOfRange(_))
        ));
    }

    #[test]
    fn display_always_two_decimals() {
        assert_eq!(CbAmount::from_hundredths(0).to_string(), "0.00");
        assert_eq!(CbAmount::from_hundredths(5).to_string(), "0.05");
        assert_eq!(CbAmount::from_hundredths(-5).to_string(), "-0.05");
        assert_eq!(
            CbAmount::from_hundredths(-34_095_600_000).to_string(),
            "-340956000.00"
        );
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(CbAmount::from_f64_rounded(0.125).unwrap().hundredths(), 13);
        assert_eq!(CbAmount::from_f64_rounded(-0.125).unwrap().hundredths(), -13);
        assert_eq!(CbAmount::from_f64_rounded(2.5).unwrap().hundredths(), 250);
        assert!(CbAmount::from_f64_rounded(f64::NAN).is_err());
        assert!(CbAmount::from_f64_rounded(f64::INFINITY).is_err());
        assert!(CbAmount::from_f64_rounded(1e30).is_err());
    }

    #[test]
    fn fraction_truncates_toward_zero() {
        assert_eq!(CbAmount::from_hundredths(1_001).fraction_bps(2_000).hundredths(), 200);
        assert_eq!(amt("1000").fraction_bps(2_000), amt("200"));
        assert_eq!(CbAmount::from_hundredths(-1_001).fraction_bps(2_000).hundredths(), -200);
    }

    #[test]
    fn arithmetic_and_sum() {
        let total: CbAmount = [amt("1.50"), amt("-0.25"), amt("3")].iter().sum();
        assert_eq!(total, amt("4.25"));
        let mut a = amt("10");
        a -= amt("2.5");
        a += amt("0.5");
        assert_eq!(a, amt("8"));
        assert_eq!(-a, amt("-8"));
        assert_eq!(amt("-3").abs(), amt("3"));
        assert!(CbAmount::from_hundredths(i64::MAX).checked_add(amt("1")).is_none());
    }

    #[test]
    fn input_magnitude_is_bounded() {
        assert_eq!(amt("100000000000000"), CbAmount::MAX_INPUT);
        assert_eq!(amt("-100000000000000"), -CbAmount::MAX_INPUT);
        for too_big in ["100000000000000.01", "50000000000000000", "-50000000000000000"] {
            assert!(
                matches!(too_big.parse::<CbAmount>(), Err(ValidationError::AmountOutOfRange(_))),
                "{too_big} accepted"
            );
        }
        assert!(CbAmount::from_grams(100_000_000_000_001).is_none());
        assert!(CbAmount::from_f64_rounded(5e16).is_err());
        assert!(serde_json::from_str::<CbAmount>("50000000000000000").is_err());
    }

    #[test]
    fn checked_sum_reports_overflow() {
        let half = CbAmount::from_hundredths(i64::MAX / 2 + 1);
        assert_eq!(CbAmount::checked_sum([half, half]), None);
        assert_eq!(CbAmount::checked_sum([amt("1"), amt("-3.5")]), Some(amt("-2.5")));
        assert_eq!(CbAmount::checked_sum(std::iter::empty()), Some(CbAmount::ZERO));
    }

    #[test]
    fn serde_string_form_and_numeric_input() {
        let json = serde_json::to_string(&amt("-12.30")).unwrap();
        assert_eq!(json, "\"-12.30\"");
        let from_str: CbAmount = serde_json::from_str("\"42.01\"").unwrap();
        assert_eq!(from_str, amt("42.01"));
        let from_int: CbAmount = serde_json::from_str("42").unwrap();
        assert_eq!(from_int, amt("42"));
        let from_float: CbAmount = serde_json::from_str("-1.005").unwrap();
        assert_eq!(from_float.hundredths(), -100);
        assert!(serde_json::from_str::<CbAmount>("\"x\"").is_err());
    }
}
