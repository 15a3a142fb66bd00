//! A fixed-point money newtype which maintains useful internal invariants:
//! non-negative by construction, bounded, checked arithmetic throughout.
//!
//! Note that we don't impl `From<i64>`/`FromStr` directly on the minor-unit
//! getters/constructors because callers should be explicit about what they're
//! constructing from. Parse a [`rust_decimal::Decimal`] first, then call the
//! appropriate [`Money`] constructor.

use std::fmt::{self, Display};
use std::ops::{Add, Sub};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when attempting to construct or combine [`Money`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("amount is negative")]
    Negative,
    #[error("amount exceeds the representable maximum")]
    TooLarge,
}

/// A non-negative fixed-point currency amount, scaled to 2 decimal places
/// (the platform's single currency has no subunits finer than cents).
///
/// Invariants upheld by construction:
/// - the contained value is never negative
/// - the contained value never exceeds [`Money::MAX`]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
pub struct Money(Decimal);

impl Money {
    /// The maximum representable [`Money`] value. Set well above any
    /// plausible marketplace balance so legitimate arithmetic never
    /// saturates, while still catching runaway bugs (e.g. a unit confusion
    /// that multiplies by 100 instead of dividing).
    pub const MAX: Self = Self(Decimal::from_parts(u32::MAX, u32::MAX, 0, false, 2));

    pub const ZERO: Self = Self(dec!(0));

    /// Construct a [`Money`] from a [`Decimal`] already denominated in the
    /// platform's base currency unit (not minor units).
    pub fn try_from_decimal(amount: Decimal) -> Result<Self, Error> {
        Self::try_from_inner(amount.round_dp(2))
    }

    /// Construct a [`Money`] from an integer count of minor units (e.g.
    /// cents), infallible because any `i64` of cents fits under [`Money::MAX`].
    pub fn from_minor_units(minor_units: i64) -> Self {
        Self::try_from_inner(Decimal::new(minor_units, 2))
            .expect("i64 minor units always fit under Money::MAX")
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        let inner = self.0.checked_add(rhs.0)?;
        Self::try_from_inner(inner).ok()
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        let inner = self.0.checked_sub(rhs.0)?;
        Self::try_from_inner(inner).ok()
    }

    /// Money * percentage (0..=100, may carry decimals) => Money, rounded to
    /// 2 decimal places. Used for commission splits and gold-status discount
    /// application.
    pub fn checked_mul_percent(self, pct: Decimal) -> Option<Self> {
        let inner = (self.0 * pct / dec!(100)).round_dp(2);
        Self::try_from_inner(inner).ok()
    }

    fn try_from_inner(inner: Decimal) -> Result<Self, Error> {
        if inner.is_sign_negative() {
            Err(Error::Negative)
        } else if inner > Self::MAX.0 {
            Err(Error::TooLarge)
        } else {
            Ok(Self(inner.round_dp(2)))
        }
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner: Decimal = Deserialize::deserialize(deserializer)?;
        Self::try_from_inner(inner).map_err(|e| match e {
            Error::Negative => serde::de::Error::custom("amount was negative"),
            Error::TooLarge => serde::de::Error::custom("amount was too large"),
        })
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Decimal::fmt(&self.0, f)
    }
}

// Panicking std::ops impls for contexts where overflow/underflow is already
// precluded by an earlier explicit check (e.g. a prior `InsufficientFunds`
// guard before a debit). Anywhere that isn't true, use the checked_* methods.
impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::try_from_inner(self.0 + rhs.0).expect("Money overflowed")
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::try_from_inner(self.0 - rhs.0).expect("Money underflowed")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_negative() {
        assert_eq!(
            Money::try_from_decimal(dec!(-1)).unwrap_err(),
            Error::Negative
        );
    }

    #[test]
    fn minor_units_roundtrip() {
        let m = Money::from_minor_units(123_456);
        assert_eq!(m.as_decimal(), dec!(1234.56));
    }

    #[test]
    fn commission_percent_rounds_to_cents() {
        let gross = Money::from_minor_units(1_000_000); // 10,000.00
        let commission = gross.checked_mul_percent(dec!(9.5)).unwrap();
        assert_eq!(commission, Money::from_minor_units(95_000)); // 950.00
    }

    #[test]
    fn checked_sub_insufficient_returns_none() {
        let small = Money::from_minor_units(100);
        let big = Money::from_minor_units(200);
        assert_eq!(small.checked_sub(big), None);
    }
}
