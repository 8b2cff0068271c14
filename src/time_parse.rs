//! # Tolerant Date and Time Parsing
//!
//! The college portal formats times and dates inconsistently between pages and
//! over time. Every parser here returns `None` on failure; the merge engine treats
//! that as "drop this item" and carries on.
//!
//! ## Accepted Forms
//!
//! ### Time of day
//! - 24-hour: `9:30`, `09:30`, `17:05`
//! - 12-hour: `9:30AM`, `9:30 am`, `09:30 PM`, `9:30\u{a0}pm`
//!
//! Minutes are always two digits. Non-breaking spaces are treated as spaces and
//! runs of whitespace collapse to one.
//!
//! ### Exam dates
//! `DD-MM-YYYY`, `DD/MM/YYYY` or `YYYY-MM-DD`.
//!
//! ### Day labels
//! `"Monday 12/09/2025"` (trailing `d/M/yyyy` token) or a bare weekday name.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};

/// Weekday names in the order they are checked against a day label.
const WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

/// How far ahead weekday inference looks, inclusive of today.
const WEEKDAY_SCAN_DAYS: i64 = 7;

/// Parse a wall-clock time in any of the tolerated 12- or 24-hour forms.
///
/// # Example
/// ```
/// use chrono::NaiveTime;
/// use nscg_schedule_lib::time_parse::parse_time_of_day;
///
/// assert_eq!(parse_time_of_day("9:30AM"), NaiveTime::from_hms_opt(9, 30, 0));
/// assert_eq!(parse_time_of_day("1:45 pm"), NaiveTime::from_hms_opt(13, 45, 0));
/// assert_eq!(parse_time_of_day("25:00"), None);
/// ```
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let cleaned = normalize_whitespace(raw).to_ascii_uppercase();
    if cleaned.is_empty() {
        return None;
    }

    let (clock, meridiem) = split_meridiem(&cleaned);
    if !is_clock_shape(clock) {
        log::debug!("Couldn't parse time: raw='{raw}' cleaned='{cleaned}'");
        return None;
    }

    let parsed = match meridiem {
        Some(m) => NaiveTime::parse_from_str(&format!("{clock} {m}"), "%I:%M %p"),
        None => NaiveTime::parse_from_str(clock, "%H:%M"),
    };

    match parsed {
        Ok(time) => Some(time),
        Err(err) => {
            log::debug!("Couldn't parse time: raw='{raw}' cleaned='{cleaned}' err='{err}'");
            None
        }
    }
}

/// Parse an exam date, telling `YYYY-MM-DD` apart from `DD-MM-YYYY` by which
/// token is four characters long.
pub fn parse_exam_date(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw
        .trim()
        .split(['-', '/'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let [a, b, c] = parts.as_slice() else {
        log::debug!("Couldn't parse exam date: raw='{raw}'");
        return None;
    };

    let (year, month, day) = if a.len() == 4 { (a, b, c) } else { (c, b, a) };
    let date = NaiveDate::from_ymd_opt(
        year.parse().ok()?,
        month.parse().ok()?,
        day.parse().ok()?,
    );

    if date.is_none() {
        log::debug!("Exam date out of range: raw='{raw}'");
    }
    date
}

/// Parse an explicit date from the trailing token of a day label such as
/// `"Monday 12/09/2025"`.
pub fn parse_day_label_date(label: &str) -> Option<NaiveDate> {
    let token = label.split_whitespace().last()?;

    // Day and month may be one or two digits; the year must be four.
    let year_len = token.rsplit('/').next().map_or(0, str::len);
    if year_len != 4 {
        return None;
    }

    NaiveDate::parse_from_str(token, "%d/%m/%Y").ok()
}

/// Find the next date on or after `today` whose weekday is named in `label`.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use nscg_schedule_lib::time_parse::infer_weekday_date;
///
/// // 2025-09-10 is a Wednesday
/// let today = NaiveDate::from_ymd_opt(2025, 9, 10).unwrap();
/// assert_eq!(
///     infer_weekday_date("Friday", today),
///     NaiveDate::from_ymd_opt(2025, 9, 12)
/// );
/// ```
pub fn infer_weekday_date(label: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lower = label.to_lowercase();
    let target = WEEKDAYS
        .iter()
        .find(|(name, _)| lower.contains(name))
        .map(|&(_, weekday)| weekday)?;

    (0..=WEEKDAY_SCAN_DAYS)
        .map(|offset| today + Duration::days(offset))
        .find(|date| date.weekday() == target)
}

/// Resolve the calendar date for a day label: explicit date first, then the
/// next occurrence of the named weekday.
pub fn resolve_day_date(label: &str, today: NaiveDate) -> Option<NaiveDate> {
    if label.trim().is_empty() {
        return None;
    }
    parse_day_label_date(label).or_else(|| infer_weekday_date(label, today))
}

fn normalize_whitespace(raw: &str) -> String {
    raw.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a trailing AM/PM marker (already uppercased) off the clock part.
fn split_meridiem(cleaned: &str) -> (&str, Option<&str>) {
    for marker in ["AM", "PM"] {
        if let Some(clock) = cleaned.strip_suffix(marker) {
            return (clock.trim_end(), Some(marker));
        }
    }
    (cleaned, None)
}

/// `H:MM` or `HH:MM`, digits only.
fn is_clock_shape(clock: &str) -> bool {
    let Some((hour, minute)) = clock.split_once(':') else {
        return false;
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());

    (1..=2).contains(&hour.len()) && minute.len() == 2 && all_digits(hour) && all_digits(minute)
}
