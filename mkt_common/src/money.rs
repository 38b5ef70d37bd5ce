use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY_CODE: &str = "MXN";
pub const DEFAULT_CURRENCY_CODE_LOWER: &str = "mxn";

//--------------------------------------       Money         ---------------------------------------------------------
/// A monetary amount in minor units (centavos). 1 peso = 100 units.
///
/// Amounts are integers end to end: in the database, in JSON payloads and in provider requests that expect minor
/// units. Only MercadoPago-style APIs, which take decimal major units, go through [`Money::to_major_f64`].
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

/// Saturates at the bounds of `i64`. Use [`Money::checked_mul`] when the quantity comes from a request.
impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value().saturating_mul(rhs))
    }
}

/// Saturates at the bounds of `i64`. Use [`Money::checked_sum`] when the amounts come from a request.
impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, m| Self(acc.0.saturating_add(m.0)))
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a monetary amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// Parses decimal strings in major units, e.g. `"150"`, `"150.5"` or `"150.00"`. More than two decimal places is an
/// error rather than a silent rounding.
impl FromStr for Money {
    type Err = MoneyConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() || frac.len() > 2 {
            return Err(MoneyConversionError(s.to_string()));
        }
        let whole = whole.parse::<i64>().map_err(|e| MoneyConversionError(format!("{s}: {e}")))?;
        let frac = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|e| MoneyConversionError(format!("{s}: {e}")))? * 10,
            _ => frac.parse::<i64>().map_err(|e| MoneyConversionError(format!("{s}: {e}")))?,
        };
        let units = whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(|| MoneyConversionError(format!("{s} is out of range")))?;
        Ok(Self(if negative { -units } else { units }))
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Build an amount from whole currency units (pesos).
    pub const fn from_major(major: i64) -> Self {
        Self(major * 100)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_mul(self, quantity: i64) -> Option<Money> {
        self.0.checked_mul(quantity).map(Self)
    }

    /// Adds up `amounts`, or returns `None` if the total does not fit in an `i64`.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Money> {
        amounts.into_iter().try_fold(Money::default(), Money::checked_add)
    }

    /// Amount in major units, for provider APIs that take decimal prices.
    pub fn to_major_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}
