//! Parsing of the date formats accepted from clients.
//!
//! Dates arrive from forms and spreadsheets in a handful of formats, so
//! parsing tries each supported format in turn:
//!
//! 1. `DD/MM/YYYY`
//! 2. `YYYY-MM-DD`
//! 3. `MM/DD/YYYY`
//! 4. ISO 8601 date-time with an offset, converted to UTC
//! 5. ISO 8601 date-time without an offset, with either `T` or a space
//!    between the date and the time
//!
//! A JSON number, or a string of digits, is read as a Unix timestamp in
//! seconds (UTC).

use serde::{Deserialize, Serialize, Serializer};
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};

use crate::Error;

const DAY_MONTH_YEAR: &[BorrowedFormatItem<'static>] =
    format_description!("[day padding:none]/[month padding:none]/[year]");
const YEAR_MONTH_DAY: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const MONTH_DAY_YEAR: &[BorrowedFormatItem<'static>] =
    format_description!("[month padding:none]/[day padding:none]/[year]");
const ISO_DATE_TIME: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute][optional [:[second][optional [.[subsecond]]]]]"
);
const ISO_DATE_TIME_WITH_SPACE: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute][optional [:[second][optional [.[subsecond]]]]]"
);

/// The format used when sending date-times to clients, e.g. `2025-01-31T00:00:00`.
pub const DATE_TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// A date as sent by a client, either a Unix timestamp or a date string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    /// Seconds since the Unix epoch.
    Timestamp(f64),
    /// A date string in one of the supported formats.
    Text(String),
}

impl DateInput {
    /// Convert the client's input into a date-time.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidDate] if the input does not match any of the
    /// supported formats.
    pub fn resolve(&self) -> Result<PrimitiveDateTime, Error> {
        match self {
            DateInput::Timestamp(seconds) => from_timestamp(*seconds),
            DateInput::Text(text) => parse_date_time(text),
        }
    }
}

/// Parse a date string in any of the supported formats.
///
/// Dates without a time of day are set to midnight.
///
/// # Errors
///
/// Returns [Error::InvalidDate] if `input` does not match any of the
/// supported formats.
pub fn parse_date_time(input: &str) -> Result<PrimitiveDateTime, Error> {
    let input = input.trim();

    if !input.is_empty() && input.bytes().all(|byte| byte.is_ascii_digit()) {
        let seconds: i64 = input
            .parse()
            .map_err(|_| Error::InvalidDate(input.to_owned()))?;

        return timestamp_to_date_time(seconds, input);
    }

    for format in [DAY_MONTH_YEAR, YEAR_MONTH_DAY, MONTH_DAY_YEAR] {
        if let Ok(date) = Date::parse(input, format) {
            return Ok(date.midnight());
        }
    }

    if let Ok(date_time) = OffsetDateTime::parse(input, &Rfc3339) {
        let date_time = date_time.to_offset(UtcOffset::UTC);
        return Ok(PrimitiveDateTime::new(date_time.date(), date_time.time()));
    }

    for format in [ISO_DATE_TIME, ISO_DATE_TIME_WITH_SPACE] {
        if let Ok(date_time) = PrimitiveDateTime::parse(input, format) {
            return Ok(date_time);
        }
    }

    Err(Error::InvalidDate(input.to_owned()))
}

/// Parse a date string and drop the time of day.
pub fn parse_date(input: &str) -> Result<Date, Error> {
    parse_date_time(input).map(|date_time| date_time.date())
}

/// Convert a Unix timestamp in seconds to a UTC date-time.
///
/// Fractions of a second are discarded.
///
/// # Errors
///
/// Returns [Error::InvalidDate] if `seconds` is not finite or is out of the
/// supported date range.
pub fn from_timestamp(seconds: f64) -> Result<PrimitiveDateTime, Error> {
    if !seconds.is_finite() {
        return Err(Error::InvalidDate(seconds.to_string()));
    }

    timestamp_to_date_time(seconds.floor() as i64, &seconds.to_string())
}

fn timestamp_to_date_time(seconds: i64, input: &str) -> Result<PrimitiveDateTime, Error> {
    let date_time = OffsetDateTime::from_unix_timestamp(seconds)
        .map_err(|_| Error::InvalidDate(input.to_owned()))?;

    Ok(PrimitiveDateTime::new(date_time.date(), date_time.time()))
}

/// The first instant after `date`, i.e. midnight of the following day.
///
/// Used as the exclusive upper bound so that a query ending on `date` covers
/// the whole day.
pub fn end_of_day_bound(date: Date) -> Result<PrimitiveDateTime, Error> {
    date.next_day()
        .map(|next_day| PrimitiveDateTime::new(next_day, Time::MIDNIGHT))
        .ok_or_else(|| Error::InvalidDate(date.to_string()))
}

/// Serialize a date-time as `YYYY-MM-DDTHH:MM:SS`.
pub fn serialize_date_time<S: Serializer>(
    date_time: &PrimitiveDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    date_time
        .format(DATE_TIME_FORMAT)
        .map_err(serde::ser::Error::custom)?
        .serialize(serializer)
}

/// Serialize a UTC timestamp as RFC 3339, e.g. `2025-01-31T12:00:00Z`.
pub fn serialize_rfc3339<S: Serializer>(
    date_time: &OffsetDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    date_time
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?
        .serialize(serializer)
}

#[cfg(test)]
mod date_input_tests {
    use time::macros::{date, datetime};

    use crate::Error;

    use super::{DateInput, end_of_day_bound, from_timestamp, parse_date, parse_date_time};

    #[test]
    fn parses_day_month_year_first() {
        assert_eq!(parse_date("01/02/2025"), Ok(date!(2025 - 02 - 01)));
        assert_eq!(parse_date("5/3/2025"), Ok(date!(2025 - 03 - 05)));
    }

    #[test]
    fn parses_year_month_day() {
        assert_eq!(
            parse_date_time("2025-01-31"),
            Ok(datetime!(2025 - 01 - 31 0:00))
        );
    }

    #[test]
    fn falls_back_to_month_day_year() {
        assert_eq!(parse_date("12/31/2025"), Ok(date!(2025 - 12 - 31)));
    }

    #[test]
    fn parses_iso_date_time_with_offset_as_utc() {
        assert_eq!(
            parse_date_time("2025-03-10T22:30:00-03:00"),
            Ok(datetime!(2025 - 03 - 11 1:30))
        );
        assert_eq!(
            parse_date_time("2025-03-10T10:00:00Z"),
            Ok(datetime!(2025 - 03 - 10 10:00))
        );
    }

    #[test]
    fn parses_iso_date_time_without_offset() {
        assert_eq!(
            parse_date_time("2025-03-10T08:15:30"),
            Ok(datetime!(2025 - 03 - 10 8:15:30))
        );
        assert_eq!(
            parse_date_time("2025-03-10 08:15"),
            Ok(datetime!(2025 - 03 - 10 8:15))
        );
    }

    #[test]
    fn parses_timestamps() {
        assert_eq!(
            from_timestamp(1_735_689_600.0),
            Ok(datetime!(2025 - 01 - 01 0:00))
        );
        assert_eq!(
            parse_date_time("1735689600"),
            Ok(datetime!(2025 - 01 - 01 0:00))
        );
    }

    #[test]
    fn rejects_unknown_formats() {
        assert_eq!(
            parse_date_time("31st of January"),
            Err(Error::InvalidDate("31st of January".to_owned()))
        );
        assert!(parse_date_time("").is_err());
        assert!(parse_date("31/31/2025").is_err());
    }

    #[test]
    fn deserializes_numbers_and_strings() {
        let number: DateInput = serde_json::from_str("1735689600").unwrap();
        let text: DateInput = serde_json::from_str("\"31/01/2025\"").unwrap();

        assert_eq!(number.resolve(), Ok(datetime!(2025 - 01 - 01 0:00)));
        assert_eq!(text.resolve(), Ok(datetime!(2025 - 01 - 31 0:00)));
    }

    #[test]
    fn end_of_day_bound_is_next_midnight() {
        assert_eq!(
            end_of_day_bound(date!(2024 - 12 - 31)),
            Ok(datetime!(2025 - 01 - 01 0:00))
        );
    }
}
