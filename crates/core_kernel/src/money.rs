//! Fixed-point amount helpers
//!
//! Ledger amounts are plain `rust_decimal::Decimal` values in a single
//! reporting currency. This module holds the rules every amount obeys:
//! the scale amounts are stored at, the tolerance used when comparing
//! debit and credit totals, and a strictly-positive wrapper for values
//! that move balances.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Two totals closer than this are considered equal.
///
/// An entry balances when `|debits - credits| < BALANCE_TOLERANCE`.
pub const BALANCE_TOLERANCE: Decimal = dec!(0.01);

/// Number of decimal places amounts are stored with
pub const AMOUNT_SCALE: u32 = 4;

/// Errors that can occur during amount operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Amount must be greater than zero, got {0}")]
    NonPositive(Decimal),

    #[error("Amount cannot be negative, got {0}")]
    Negative(Decimal),

    #[error("Overflow during calculation")]
    Overflow,
}

/// An amount that is strictly greater than zero
///
/// Every debit or credit applied to an account goes through this type, so a
/// zero or negative movement cannot reach a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct PositiveAmount(Decimal);

impl PositiveAmount {
    /// Validates and wraps an amount
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::NonPositive` if `amount` is not above zero once
    /// rounded to `AMOUNT_SCALE`, so `0.00001` is rejected
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        let normalized = normalize(amount);
        if normalized <= Decimal::ZERO {
            return Err(MoneyError::NonPositive(amount));
        }
        Ok(Self(normalized))
    }

    /// Returns the wrapped value
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for PositiveAmount {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PositiveAmount> for Decimal {
    fn from(amount: PositiveAmount) -> Decimal {
        amount.0
    }
}

impl fmt::Display for PositiveAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rounds an amount to the storage scale
pub fn normalize(amount: Decimal) -> Decimal {
    amount.round_dp(AMOUNT_SCALE)
}

/// Returns true when two totals are equal within `BALANCE_TOLERANCE`
pub fn within_tolerance(left: Decimal, right: Decimal) -> bool {
    (left - right).abs() < BALANCE_TOLERANCE
}

/// Adds two amounts, failing instead of panicking on overflow
pub fn checked_add(left: Decimal, right: Decimal) -> Result<Decimal, MoneyError> {
    left.checked_add(right).ok_or(MoneyError::Overflow)
}

/// Sums amounts, failing on overflow
pub fn checked_sum<I>(amounts: I) -> Result<Decimal, MoneyError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, checked_add)
}

/// Rejects negative amounts, allowing zero
pub fn ensure_non_negative(amount: Decimal) -> Result<Decimal, MoneyError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(MoneyError::Negative(amount));
    }
    Ok(normalize(amount))
}
