use crate::Result;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GramsError {
    #[error("Overflow error while applying {0} operation on {1} and {2}")]
    Overflow(&'static str, Grams, Grams),

    #[error("Grams parse error: {0}, {1:?}")]
    Parse(&'static str, String),
}

/// Quantity of tea, stored as whole milligrams so arithmetic stays exact.
#[derive(
    Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Grams(pub i64);

impl Grams {
    pub const ZERO: Self = Self(0);

    /// Milligrams per gram
    pub const SCALE: i64 = 1000;

    const DECIMALS: usize = 3;

    /// Whole grams. Fails when the milligram value does not fit in an `i64`.
    pub fn from_grams(grams: i64) -> Result<Self> {
        let milligrams = grams
            .checked_mul(Self::SCALE)
            .ok_or(GramsError::Overflow("scale", Self(grams), Self(Self::SCALE)))?;

        return Ok(Self(milligrams));
    }

    /// Parses a decimal string such as `"12"`, `"0.5"` or `"-3.125"`.
    pub fn parse(string: &str) -> Result<Self> {
        let trimmed = string.trim();

        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let mut parts = digits.split('.');

        let whole = parts.next().unwrap_or_default();
        let fraction = parts.next().unwrap_or_default();

        if parts.next().is_some() {
            Err(GramsError::Parse("Too many decimal points", string.to_string()))?
        }

        if whole.is_empty() && fraction.is_empty() {
            Err(GramsError::Parse("No digits", string.to_string()))?
        }

        if fraction.len() > Self::DECIMALS {
            Err(GramsError::Parse(
                "More than 3 decimal places",
                string.to_string(),
            ))?
        }

        if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
            Err(GramsError::Parse("Invalid digit", string.to_string()))?
        }

        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse()? };
        let fraction: i64 = format!("{:0<3}", fraction).parse()?;

        let milligrams = whole
            .checked_mul(Self::SCALE)
            .and_then(|mg| mg.checked_add(fraction))
            .ok_or_else(|| GramsError::Parse("Value out of range", string.to_string()))?;

        if negative {
            return Ok(Self(-milligrams));
        }

        return Ok(Self(milligrams));
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Self) -> Result<Self> {
        let sum = self
            .0
            .checked_add(other.0)
            .ok_or(GramsError::Overflow("add", self, other))?;

        return Ok(Self(sum));
    }

    pub fn checked_sub(self, other: Self) -> Result<Self> {
        let difference = self
            .0
            .checked_sub(other.0)
            .ok_or(GramsError::Overflow("sub", self, other))?;

        return Ok(Self(difference));
    }
}

impl fmt::Display for Grams {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = Self::SCALE as u64;

        write!(f, "{sign}{}.{:03}", abs / scale, abs % scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        assert_eq!(Grams::parse("12").unwrap(), Grams(12_000));
        assert_eq!(Grams::parse("0.5").unwrap(), Grams(500));
        assert_eq!(Grams::parse(".25").unwrap(), Grams(250));
        assert_eq!(Grams::parse(" 3.125 ").unwrap(), Grams(3_125));
        assert_eq!(Grams::parse("-1.5").unwrap(), Grams(-1_500));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Grams::parse("").is_err());
        assert!(Grams::parse("1.2.3").is_err());
        assert!(Grams::parse("1.2345").is_err());
        assert!(Grams::parse("abc").is_err());
        assert!(Grams::parse("1.-5").is_err());
        assert!(Grams::parse("99999999999999999999").is_err());
    }

    #[test]
    fn from_grams() {
        assert_eq!(Grams::from_grams(70).unwrap(), Grams(70_000));
        assert_eq!(Grams::from_grams(-2).unwrap(), Grams(-2_000));

        assert!(Grams::from_grams(i64::MAX).is_err());
        assert!(Grams::from_grams(i64::MIN / 100).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(Grams(70_000).to_string(), "70.000");
        assert_eq!(Grams(1_005).to_string(), "1.005");
        assert_eq!(Grams(-250).to_string(), "-0.250");
        assert_eq!(Grams::ZERO.to_string(), "0.000");
    }

    #[test]
    fn checked_arithmetic() {
        assert_eq!(
            Grams(100).checked_add(Grams(50)).unwrap(),
            Grams(150)
        );
        assert_eq!(
            Grams(100).checked_sub(Grams(150)).unwrap(),
            Grams(-50)
        );

        assert!(Grams(i64::MAX).checked_add(Grams(1)).is_err());
        assert!(Grams(i64::MIN).checked_sub(Grams(1)).is_err());
    }
}
