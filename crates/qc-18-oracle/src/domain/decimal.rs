//! Signed fixed-point decimal with exactly 18 fractional digits.
//!
//! Backed by `i128` holding the value scaled by [`Decimal::SCALE`]. No
//! floating-point type appears anywhere in this module; every arithmetic
//! operation is exact and checked.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::OracleError;

/// Signed fixed-point number with 18 fractional digits.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decimal(i128);

impl Decimal {
    /// Number of fractional digits carried by every `Decimal`.
    pub const DECIMAL_PLACES: u32 = 18;
    const SCALE: i128 = 1_000_000_000_000_000_000; // 10^18

    pub const fn zero() -> Self {
        Decimal(0)
    }

    pub const fn one() -> Self {
        Decimal(Self::SCALE)
    }

    /// Build a `Decimal` directly from its raw (already-scaled) units.
    pub const fn raw(units: i128) -> Self {
        Decimal(units)
    }

    /// Build a `Decimal` from an integer value (no fractional part).
    pub fn from_i64(value: i64) -> Self {
        Decimal(i128::from(value) * Self::SCALE)
    }

    /// Parse a decimal string such as `"49900.5"` or `"-3"`.
    ///
    /// Rejects malformed input; never silently truncates precision beyond
    /// 18 fractional digits.
    pub fn parse(input: &str) -> Result<Self, OracleError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(OracleError::InvalidPrice(input.to_string()));
        }
        let (neg, unsigned) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input.strip_prefix('+').unwrap_or(input)),
        };
        let mut parts = unsigned.splitn(2, '.');
        let int_part = parts.next().unwrap_or("");
        let frac_part = parts.next().unwrap_or("");
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(OracleError::InvalidPrice(input.to_string()));
        }
        if frac_part.len() as u32 > Self::DECIMAL_PLACES {
            return Err(OracleError::InvalidPrice(input.to_string()));
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(OracleError::InvalidPrice(input.to_string()));
        }
        let int_value: i128 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| OracleError::InvalidPrice(input.to_string()))?
        };
        let mut frac_value: i128 = if frac_part.is_empty() {
            0
        } else {
            frac_part
                .parse()
                .map_err(|_| OracleError::InvalidPrice(input.to_string()))?
        };
        let missing = Self::DECIMAL_PLACES - frac_part.len() as u32;
        for _ in 0..missing {
            frac_value *= 10;
        }
        let magnitude = int_value
            .checked_mul(Self::SCALE)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(|| OracleError::InvalidPrice(input.to_string()))?;
        Ok(Decimal(if neg { -magnitude } else { magnitude }))
    }

    pub fn is_nil(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    pub fn checked_add(&self, other: &Decimal) -> Result<Self, OracleError> {
        self.0
            .checked_add(other.0)
            .map(Decimal)
            .ok_or_else(|| OracleError::StateCorruption("decimal add overflow".into()))
    }

    pub fn checked_sub(&self, other: &Decimal) -> Result<Self, OracleError> {
        self.0
            .checked_sub(other.0)
            .map(Decimal)
            .ok_or_else(|| OracleError::StateCorruption("decimal sub overflow".into()))
    }

    /// Multiply two decimals, rounding the 18-digit remainder half away
    /// from zero.
    pub fn checked_mul(&self, other: &Decimal) -> Result<Self, OracleError> {
        let product = self
            .0
            .checked_mul(other.0)
            .ok_or_else(|| OracleError::StateCorruption("decimal mul overflow".into()))?;
        Ok(Decimal(Self::div_round_half_away_from_zero(
            product,
            Self::SCALE,
        )))
    }

    /// Divide two decimals, rounding half away from zero.
    pub fn checked_quo(&self, other: &Decimal) -> Result<Self, OracleError> {
        if other.0 == 0 {
            return Err(OracleError::StateCorruption("decimal division by zero".into()));
        }
        let numerator = self
            .0
            .checked_mul(Self::SCALE)
            .ok_or_else(|| OracleError::StateCorruption("decimal quo overflow".into()))?;
        Ok(Decimal(Self::div_round_half_away_from_zero(
            numerator, other.0,
        )))
    }

    fn div_round_half_away_from_zero(numerator: i128, denominator: i128) -> i128 {
        let quotient = numerator / denominator;
        let remainder = numerator % denominator;
        if remainder == 0 {
            return quotient;
        }
        let twice_remainder = remainder.abs().checked_mul(2).unwrap_or(i128::MAX);
        if twice_remainder >= denominator.abs() {
            quotient + numerator.signum() * denominator.signum()
        } else {
            quotient
        }
    }

    /// Raw scaled integer units, for persistence and bit-exact comparisons.
    pub fn raw_units(&self) -> i128 {
        self.0
    }
}

impl Default for Decimal {
    fn default() -> Self {
        Decimal::zero()
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal({})", self)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negative = self.0 < 0;
        let magnitude = self.0.unsigned_abs();
        let int_part = magnitude / Self::SCALE as u128;
        let frac_part = magnitude % Self::SCALE as u128;
        if negative {
            write!(f, "-")?;
        }
        write!(f, "{int_part}.{frac_part:018}")
    }
}
