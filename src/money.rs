// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::currency;
use crate::errors::{LedgerError, Result};

/// A fixed-point currency amount. `minor` is the integer count of the
/// currency's smallest denomination (cents for USD, whole yen for JPY);
/// float math never crosses this boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub minor: i64,
    pub currency: String,
}

/// A directed quote: one unit of `from` buys `rate` units of `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from: String,
    pub to: String,
    pub rate: Decimal,
}

impl Money {
    pub fn new(minor: i64, currency: impl Into<String>) -> Self {
        Money {
            minor,
            currency: currency.into(),
        }
    }

    pub fn zero(currency: impl Into<String>) -> Self {
        Money::new(0, currency)
    }

    /// Build from a major-unit decimal, rounding half-away-from-zero to the
    /// currency's minor-unit scale.
    pub fn from_major(major: Decimal, currency: &str) -> Result<Self> {
        Ok(Money::new(to_minor(major, currency)?, currency))
    }

    pub fn to_major(&self) -> Result<Decimal> {
        let info = currency::lookup(&self.currency)?;
        Ok(Decimal::new(self.minor, info.minor_units))
    }

    pub fn add(&self, other: &Money) -> Result<Money> {
        self.require_same_currency(other)?;
        let minor = self
            .minor
            .checked_add(other.minor)
            .ok_or_else(|| LedgerError::validation("amount", "amount overflow"))?;
        Ok(Money::new(minor, self.currency.clone()))
    }

    pub fn sub(&self, other: &Money) -> Result<Money> {
        self.require_same_currency(other)?;
        let minor = self
            .minor
            .checked_sub(other.minor)
            .ok_or_else(|| LedgerError::validation("amount", "amount overflow"))?;
        Ok(Money::new(minor, self.currency.clone()))
    }

    /// Convert into the rate's quote currency. Fails with `CurrencyMismatch`
    /// when the rate is quoted against a different base than this amount.
    pub fn convert(&self, rate: &ExchangeRate) -> Result<Money> {
        if rate.from != self.currency {
            return Err(LedgerError::CurrencyMismatch {
                left: self.currency.clone(),
                right: rate.from.clone(),
            });
        }
        let major = self.to_major()? * rate.rate;
        Money::from_major(major, &rate.to)
    }

    /// Render as `symbol + major units` with the currency's decimal places,
    /// e.g. `$12.34` or `¥1200`.
    pub fn format(&self) -> Result<String> {
        let info = currency::lookup(&self.currency)?;
        let major = Decimal::new(self.minor, info.minor_units);
        Ok(format!(
            "{}{:.*}",
            info.symbol, info.minor_units as usize, major
        ))
    }

    fn require_same_currency(&self, other: &Money) -> Result<()> {
        if self.currency != other.currency {
            return Err(LedgerError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            });
        }
        Ok(())
    }
}

/// Round a major-unit decimal to the currency's minor-unit integer.
pub fn to_minor(major: Decimal, currency: &str) -> Result<i64> {
    let info = currency::lookup(currency)?;
    let scaled = (major * Decimal::from(10i64.pow(info.minor_units)))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    scaled
        .to_i64()
        .ok_or_else(|| LedgerError::validation("amount", format!("amount '{}' out of range", major)))
}
