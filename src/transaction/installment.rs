//! Splitting a credit purchase into monthly installments.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::{Date, Month, PrimitiveDateTime};

use crate::{Amount, Error};

/// The number of installments a purchase is split into.
///
/// Always at least one and at most [InstallmentCount::MAX].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct InstallmentCount(u32);

impl InstallmentCount {
    /// A purchase paid in one go.
    pub const ONE: InstallmentCount = InstallmentCount(1);

    /// The largest supported number of installments, thirty years of monthly payments.
    pub const MAX: u32 = 360;

    /// Create an installment count.
    ///
    /// # Errors
    ///
    /// Returns an [Error::Validation] if `count` is less than one or greater
    /// than [InstallmentCount::MAX].
    pub fn new(count: i64) -> Result<Self, Error> {
        if count < 1 {
            return Err(Error::Validation(format!(
                "the number of installments must be at least 1, got {count}"
            )));
        }

        if count > Self::MAX as i64 {
            return Err(Error::Validation(format!(
                "the number of installments must be at most {}, got {count}",
                Self::MAX
            )));
        }

        Ok(Self(count as u32))
    }

    /// The count as a plain number.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for InstallmentCount {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        InstallmentCount::new(value)
    }
}

impl From<InstallmentCount> for u32 {
    fn from(count: InstallmentCount) -> Self {
        count.0
    }
}

impl Default for InstallmentCount {
    fn default() -> Self {
        Self::ONE
    }
}

impl Display for InstallmentCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One generated installment, before it is given a group and stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installment {
    /// The position of the installment, starting at 1.
    pub index: u32,
    /// The amount due for this installment.
    pub amount: Amount,
    /// When the installment is due.
    pub due_date: PrimitiveDateTime,
    /// The purchase description, with an "installment i/N" suffix when split.
    pub description: String,
}

/// Split `total` into `count` installments.
///
/// Each installment is `total / count` rounded half-up to the cent, and the
/// first installment absorbs whatever is left over so that the installments
/// add up to exactly `total`.
///
/// The first installment is due on `first_due_date`. Installment `i` (for
/// `i >= 2`) is due on the first day of the month `i - 1` months later, at
/// the same time of day.
///
/// With a single installment the amount and description are returned as
/// given.
///
/// # Errors
///
/// Returns an [Error::InvalidAmount] if `total` is not positive or too large
/// to split, and an [Error::InvalidDate] if a due date falls outside the
/// supported range.
pub fn split_into_installments(
    total: Amount,
    count: InstallmentCount,
    first_due_date: PrimitiveDateTime,
    description: &str,
) -> Result<Vec<Installment>, Error> {
    if !total.is_positive() {
        return Err(Error::InvalidAmount(format!(
            "{total} (the amount must be greater than zero)"
        )));
    }

    let n = i64::from(count.get());
    let cents = total.cents();
    // Integer form of round_half_up(cents / n).
    let installment_cents = cents
        .checked_mul(2)
        .and_then(|doubled| doubled.checked_add(n))
        .map(|numerator| numerator / (2 * n))
        .ok_or_else(|| Error::InvalidAmount(format!("{total} (the amount is too large)")))?;
    // Can be zero or negative when the total has fewer cents than installments.
    let first_cents = cents - installment_cents * (n - 1);

    (1..=count.get())
        .map(|index| {
            let amount = if index == 1 {
                first_cents
            } else {
                installment_cents
            };

            let description = if count == InstallmentCount::ONE {
                description.to_owned()
            } else {
                format!("{description} - installment {index}/{count}")
            };

            Ok(Installment {
                index,
                amount: Amount::from_cents(amount),
                due_date: installment_due_date(first_due_date, index)?,
                description,
            })
        })
        .collect()
}

/// The due date of installment `index` of a purchase first due on `first_due_date`.
fn installment_due_date(
    first_due_date: PrimitiveDateTime,
    index: u32,
) -> Result<PrimitiveDateTime, Error> {
    if index <= 1 {
        return Ok(first_due_date);
    }

    let first_date = first_due_date.date();
    let month_index = first_date.year() as i64 * 12
        + (u8::from(first_date.month()) as i64 - 1)
        + (index as i64 - 1);

    let year = month_index.div_euclid(12);
    let month = (month_index.rem_euclid(12) + 1) as u8;

    let invalid_date = || Error::InvalidDate(format!("installment {index} of {first_due_date}"));

    let year = i32::try_from(year).map_err(|_| invalid_date())?;
    let month = Month::try_from(month).map_err(|_| invalid_date())?;
    let date = Date::from_calendar_date(year, month, 1).map_err(|_| invalid_date())?;

    Ok(PrimitiveDateTime::new(date, first_due_date.time()))
}
