//! A two-decimal currency amount stored as an integer number of cents.

use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Sub},
};

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// An amount of money with exactly two decimal places.
///
/// Amounts are kept as whole cents so that sums are exact, e.g. three
/// installments of 33.34, 33.33 and 33.33 add up to exactly 100.00.
///
/// In JSON an amount is a plain number such as `33.34`. Inputs with more
/// than two decimals are rounded half-up to the nearest cent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(i64);

impl Amount {
    /// The amount 0.00.
    pub const ZERO: Amount = Amount(0);

    /// Create an amount from a whole number of cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// The largest amount accepted from a decimal number, one trillion.
    pub const MAX: Amount = Amount(100_000_000_000_000);

    /// Create an amount from a decimal number, rounding half-up to the cent.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidAmount] if `value` is NaN, infinite or its
    /// magnitude is larger than [Amount::MAX].
    pub fn from_decimal(value: f64) -> Result<Self, Error> {
        if !value.is_finite() {
            return Err(Error::InvalidAmount(value.to_string()));
        }

        // `f64::round` rounds half away from zero, which is half-up for the
        // positive amounts this application deals with.
        let cents = (value * 100.0).round();

        if cents.abs() > Self::MAX.0 as f64 {
            return Err(Error::InvalidAmount(format!(
                "{value} (the amount must not exceed {})",
                Self::MAX
            )));
        }

        Ok(Self(cents as i64))
    }

    /// The amount as a whole number of cents.
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// The amount as a decimal number, e.g. `33.34`.
    pub fn as_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Whether the amount is strictly greater than zero.
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();

        write!(f, "{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Self) -> Self::Output {
        Amount(self.0 - rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;

        Amount::from_decimal(value).map_err(serde::de::Error::custom)
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Amount)
    }
}

#[cfg(test)]
mod amount_tests {
    use crate::{Amount, Error};

    #[test]
    fn from_decimal_rounds_half_up() {
        assert_eq!(Amount::from_decimal(33.335), Ok(Amount::from_cents(3334)));
        assert_eq!(Amount::from_decimal(0.125), Ok(Amount::from_cents(13)));
        assert_eq!(Amount::from_decimal(12.3), Ok(Amount::from_cents(1230)));
    }

    #[test]
    fn from_decimal_rejects_nan() {
        assert!(matches!(
            Amount::from_decimal(f64::NAN),
            Err(Error::InvalidAmount(_))
        ));
    }

    #[test]
    fn from_decimal_rejects_amounts_above_maximum() {
        assert!(matches!(
            Amount::from_decimal(1e17),
            Err(Error::InvalidAmount(_))
        ));
        assert!(matches!(
            Amount::from_decimal(-1e17),
            Err(Error::InvalidAmount(_))
        ));
        assert_eq!(
            Amount::from_decimal(1_000_000_000_000.0),
            Ok(Amount::MAX)
        );
    }

    #[test]
    fn deserializing_a_huge_amount_fails() {
        assert!(serde_json::from_str::<Amount>("1e17").is_err());
    }

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(Amount::from_cents(3334).to_string(), "33.34");
        assert_eq!(Amount::from_cents(5).to_string(), "0.05");
        assert_eq!(Amount::from_cents(-150).to_string(), "-1.50");
    }

    #[test]
    fn sum_is_exact() {
        let amounts = [
            Amount::from_cents(3334),
            Amount::from_cents(3333),
            Amount::from_cents(3333),
        ];

        assert_eq!(amounts.iter().sum::<Amount>(), Amount::from_cents(10_000));
    }

    #[test]
    fn serializes_as_decimal_number() {
        let json = serde_json::to_string(&Amount::from_cents(3334)).unwrap();

        assert_eq!(json, "33.34");

        let amount: Amount = serde_json::from_str("100").unwrap();
        assert_eq!(amount, Amount::from_cents(10_000));
    }
}
