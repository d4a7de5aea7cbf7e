//! Lossless decimal amount type backed by rust_decimal.
//!
//! Token amounts are held in whole-token units (LTR). The chain stores them as
//! wei (`10^18` per token); `to_wei` / `from_wei` convert at the boundary.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of wei per whole token.
pub const WEI_SCALE: u32 = 18;

/// Lossless decimal numeric type for fare and fee arithmetic.
///
/// Backed by rust_decimal to avoid floating-point drift.
/// Serializes to JSON number (not string) by default.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeiConversionError {
    #[error("amount {0} is negative")]
    Negative(String),
    #[error("amount {0} has more than 18 decimal places")]
    TooPrecise(String),
    #[error("amount {0} does not fit in 96-bit decimal precision")]
    Overflow(String),
}

impl Decimal {
    /// Largest representable value.
    pub const MAX: Decimal = Decimal(RustDecimal::MAX);

    /// Create a Decimal from a RustDecimal.
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Decimal)
    }

    /// Format the Decimal as a canonical string (no exponent notation).
    pub fn to_canonical_string(&self) -> String {
        let normalized = self.0.normalize();
        format!("{}", normalized)
    }

    /// Get the underlying RustDecimal.
    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Sum clamped to the representable range instead of panicking.
    pub fn saturating_add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0.saturating_add(rhs.0))
    }

    /// Product clamped to the representable range instead of panicking.
    pub fn saturating_mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0.saturating_mul(rhs.0))
    }

    /// True when the value has no fractional part.
    pub fn is_integer(&self) -> bool {
        self.0.fract().is_zero()
    }

    /// Whole-number value, if non-negative, integral and within `u64`.
    pub fn to_u64_exact(&self) -> Option<u64> {
        if self.is_negative() || !self.is_integer() {
            return None;
        }
        self.0.to_u64()
    }

    /// Convert a token amount to wei (the `parseEther` of the chain tooling).
    pub fn to_wei(&self) -> Result<u128, WeiConversionError> {
        if self.is_negative() {
            return Err(WeiConversionError::Negative(self.to_canonical_string()));
        }
        let scaled = self
            .0
            .checked_mul(RustDecimal::from(10u64.pow(WEI_SCALE)))
            .ok_or_else(|| WeiConversionError::Overflow(self.to_canonical_string()))?;
        if !scaled.fract().is_zero() {
            return Err(WeiConversionError::TooPrecise(self.to_canonical_string()));
        }
        scaled
            .to_u128()
            .ok_or_else(|| WeiConversionError::Overflow(self.to_canonical_string()))
    }

    /// Convert a wei amount back to whole-token units (`formatEther`).
    pub fn from_wei(wei: u128) -> Result<Self, WeiConversionError> {
        let signed =
            i128::try_from(wei).map_err(|_| WeiConversionError::Overflow(wei.to_string()))?;
        RustDecimal::try_from_i128_with_scale(signed, WEI_SCALE)
            .map(|d| Decimal(d.normalize()))
            .map_err(|_| WeiConversionError::Overflow(wei.to_string()))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl From<u64> for Decimal {
    fn from(value: u64) -> Self {
        Decimal(RustDecimal::from(value))
    }
}

impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}
