//! Currency-checked decimal money arithmetic.
//!
//! Monetary values are `rust_decimal::Decimal` end-to-end; floats never
//! touch an amount. Formatting (decimal strings, signed percents) is a
//! presentation concern and lives with the result serializer, not here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

/// Hours in a billing month. Conversion between monthly and hourly
/// amounts always uses this constant.
pub const HOURS_PER_MONTH: u32 = 730;

// =============================================================================
// CURRENCY
// =============================================================================

/// ISO currency of a monetary amount.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Currency {
    /// United States dollar.
    #[default]
    #[serde(rename = "USD")]
    Usd,
    /// Euro.
    #[serde(rename = "EUR")]
    Eur,
    /// British pound sterling.
    #[serde(rename = "GBP")]
    Gbp,
}

impl Currency {
    /// Returns the ISO 4217 code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// =============================================================================
// MONEY
// =============================================================================

/// A decimal amount in a specific currency.
///
/// Addition and scaling are currency-checked; mixing currencies is a
/// composition bug and panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount.
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency: Currency,
}

impl Money {
    /// Creates a new amount.
    #[must_use]
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency.
    #[must_use]
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Scales the amount by a decimal quantity.
    #[must_use]
    pub fn scale(&self, factor: Decimal) -> Self {
        Self {
            amount: self.amount * factor,
            currency: self.currency,
        }
    }

    /// Converts a monthly amount to an hourly amount.
    #[must_use]
    pub fn monthly_to_hourly(&self) -> Self {
        Self {
            amount: self.amount / Decimal::from(HOURS_PER_MONTH),
            currency: self.currency,
        }
    }

    /// Converts an hourly amount to a monthly amount.
    #[must_use]
    pub fn hourly_to_monthly(&self) -> Self {
        Self {
            amount: self.amount * Decimal::from(HOURS_PER_MONTH),
            currency: self.currency,
        }
    }

    /// Decimal-string form used in result JSON (e.g. `"15.1840"`).
    #[must_use]
    pub fn to_decimal_string(&self) -> String {
        self.amount.to_string()
    }

    fn assert_same_currency(&self, other: &Money) {
        assert_eq!(
            self.currency, other.currency,
            "currency mix: {} + {}",
            self.currency, other.currency
        );
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        self.assert_same_currency(&rhs);
        Money {
            amount: self.amount + rhs.amount,
            currency: self.currency,
        }
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.assert_same_currency(&rhs);
        self.amount += rhs.amount;
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
