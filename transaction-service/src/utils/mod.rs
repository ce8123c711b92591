//! Date-of-birth parsing and age arithmetic.

use chrono::{Datelike, NaiveDate};

/// Layout accepted for dates of birth, e.g. `15-03-1990`.
pub const DATE_OF_BIRTH_FORMAT: &str = "%d-%m-%Y";

/// Parse a `DD-MM-YYYY` date: two-digit day, two-digit month, four-digit year,
/// dash separated, and a real calendar date.
pub fn parse_date_of_birth(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    if bytes.len() != 10 {
        return None;
    }

    let shape_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        2 | 5 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }

    NaiveDate::parse_from_str(value, DATE_OF_BIRTH_FORMAT).ok()
}

/// Whole calendar years elapsed between `birth` and `today`.
///
/// Negative when `birth` lies in the future.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years
}
