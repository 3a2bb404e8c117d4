//! Amount and Balance types
//!
//! Domain primitives for credit quantities. Validation happens at
//! construction time, so an invalid amount or a negative balance cannot
//! exist anywhere downstream of these constructors.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum credits a single transfer or account may hold (1 billion)
const MAX_CREDITS: &str = "1000000000";

/// Maximum decimal places for credit amounts
const MAX_SCALE: u32 = 4;

/// A validated transfer amount: strictly positive, bounded, finite.
///
/// `Decimal` cannot represent NaN or infinity, so finiteness holds by
/// construction; positivity and the upper bound are checked here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

/// Errors from constructing an [`Amount`] or [`Balance`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount must be positive (got {0})")]
    NotPositive(Decimal),

    #[error("amount has too many decimal places (max {MAX_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("amount exceeds maximum allowed value ({MAX_CREDITS})")]
    Overflow,

    #[error("balance cannot be negative (got {0})")]
    NegativeBalance(Decimal),

    #[error("invalid amount format: {0}")]
    Parse(String),
}

impl Amount {
    /// Validate and wrap a raw decimal.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }
        if value.scale() > MAX_SCALE {
            return Err(AmountError::TooManyDecimals(value.scale()));
        }
        if value > max_credits() {
            return Err(AmountError::Overflow);
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

fn max_credits() -> Decimal {
    Decimal::from_str(MAX_CREDITS).expect("MAX_CREDITS constant must parse")
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = Decimal::from_str(s).map_err(|e| AmountError::Parse(e.to_string()))?;
        Amount::new(raw)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// An account balance: zero or positive.
///
/// The non-negativity invariant of the ledger lives here. [`Balance::debit`]
/// refuses to produce a negative result, so no store write can ever record
/// an overdrawn account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Balance(Decimal);

impl Balance {
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            return Err(AmountError::NegativeBalance(value));
        }
        if value > max_credits() {
            return Err(AmountError::Overflow);
        }
        Ok(Self(value))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Whether this balance covers `amount`.
    pub fn covers(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Balance after adding `amount`.
    pub fn credit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        Balance::new(self.0 + amount.value())
    }

    /// Balance after subtracting `amount`. Fails rather than go negative.
    pub fn debit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        Balance::new(self.0 - amount.value())
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn amount_accepts_positive() {
        let amount = Amount::new(dec!(30)).unwrap();
        assert_eq!(amount.value(), dec!(30));
    }

    #[test]
    fn amount_rejects_zero_and_negative() {
        assert!(matches!(
            Amount::new(Decimal::ZERO),
            Err(AmountError::NotPositive(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-5)),
            Err(AmountError::NotPositive(_))
        ));
    }

    #[test]
    fn amount_rejects_excess_scale() {
        assert!(matches!(
            Amount::new(dec!(0.00001)),
            Err(AmountError::TooManyDecimals(5))
        ));
        assert!(Amount::new(dec!(0.0001)).is_ok());
    }

    #[test]
    fn amount_rejects_overflow() {
        assert!(matches!(
            Amount::new(dec!(1000000001)),
            Err(AmountError::Overflow)
        ));
        assert!(Amount::new(dec!(1000000000)).is_ok());
    }

    #[test]
    fn amount_parses_from_str() {
        let amount: Amount = "12.5".parse().unwrap();
        assert_eq!(amount.value(), dec!(12.5));
        assert!("abc".parse::<Amount>().is_err());
        assert!("0".parse::<Amount>().is_err());
    }

    #[test]
    fn balance_credit_and_debit() {
        let balance = Balance::zero();
        let hundred = Amount::new(dec!(100)).unwrap();
        let thirty = Amount::new(dec!(30)).unwrap();

        let balance = balance.credit(&hundred).unwrap();
        assert_eq!(balance.value(), dec!(100));

        let balance = balance.debit(&thirty).unwrap();
        assert_eq!(balance.value(), dec!(70));
    }

    #[test]
    fn balance_never_goes_negative() {
        let balance = Balance::new(dec!(5)).unwrap();
        let ten = Amount::new(dec!(10)).unwrap();

        assert!(!balance.covers(&ten));
        assert!(matches!(
            balance.debit(&ten),
            Err(AmountError::NegativeBalance(_))
        ));
    }

    #[test]
    fn balance_debit_to_exactly_zero() {
        let balance = Balance::new(dec!(10)).unwrap();
        let ten = Amount::new(dec!(10)).unwrap();

        assert!(balance.covers(&ten));
        assert_eq!(balance.debit(&ten).unwrap(), Balance::zero());
    }
}
