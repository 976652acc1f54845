//! Date and money token matchers.
//!
//! Both matchers are first-match-only: a line contributes at most one date
//! and one amount.

use crate::error::DateError;
use chrono::NaiveDate;
use regex::{Match, Regex};
use std::ops::Range;
use std::sync::LazyLock;

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{1,2}/[0-9]{1,2}/[0-9]{2,4}").unwrap());

// Digit groups with optional thousands commas and an optional fraction.
// Negatives: `-$250.00`, `$-250.00` and `($250.00)`. A trailing `250.00-`
// is handled in `find_money`.
static MONEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    let num = r"(?:[0-9]{1,3}(?:,[0-9]{3})+|[0-9]+)(?:\.[0-9]+)?";
    Regex::new(&format!(r"\(\$?{num}\)|(?:-\$?|\$-?)?{num}")).unwrap()
});

/// First `M/D/Y`-shaped token in the line.
pub fn find_date(line: &str) -> Option<Match<'_>> {
    DATE_RE.find(line)
}

/// First currency-like token in the line that is not part of any date token.
///
/// A `-` right after the number makes it negative only when it ends the
/// word (`250.00-`), so references like `123-456` stay positive.
pub fn find_money(line: &str) -> Option<&str> {
    let dates: Vec<Range<usize>> = DATE_RE.find_iter(line).map(|d| d.range()).collect();
    let m = MONEY_RE
        .find_iter(line)
        .find(|m| dates.iter().all(|d| m.end() <= d.start || m.start() >= d.end))?;

    let rest = &line[m.end()..];
    let trailing_minus = rest.starts_with('-')
        && !m.as_str().ends_with(')')
        && rest[1..].chars().next().is_none_or(char::is_whitespace);
    let end = if trailing_minus { m.end() + 1 } else { m.end() };
    Some(&line[m.start()..end])
}

/// Parse a `MM/DD/YYYY` token. Two-digit years are rejected, not guessed.
pub fn parse_date(token: &str) -> Result<NaiveDate, DateError> {
    let shape = || DateError::Shape(token.to_string());

    let mut parts = token.trim().split('/');
    let (Some(m), Some(d), Some(y), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(shape());
    };

    let is_digits = |s: &str, max: usize| {
        !s.is_empty() && s.len() <= max && s.bytes().all(|b| b.is_ascii_digit())
    };
    if !is_digits(m, 2) || !is_digits(d, 2) || !is_digits(y, 4) {
        return Err(shape());
    }
    if y.len() != 4 {
        return Err(DateError::ShortYear(token.to_string()));
    }

    let month: u32 = m.parse().map_err(|_| shape())?;
    let day: u32 = d.parse().map_err(|_| shape())?;
    let year: i32 = y.parse().map_err(|_| shape())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| DateError::Calendar(token.to_string()))
}
