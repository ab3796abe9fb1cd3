//! RFC 822/2822 date parsing.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};

/// Month names, indexed by month number minus one.
pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Obsolete named zones (RFC 5322 section 4.3) and their offsets in hours.
const ZONES: &[(&str, i32)] = &[
    ("UT", 0),
    ("UTC", 0),
    ("GMT", 0),
    ("Z", 0),
    ("EST", -5),
    ("EDT", -4),
    ("CST", -6),
    ("CDT", -5),
    ("MST", -7),
    ("MDT", -6),
    ("PST", -8),
    ("PDT", -7),
];

/// Parses an RFC 822/2822 date (e.g. `Sun, 12 Jun 2022 17:21:02 +0200`).
///
/// Beyond the strict grammar this accepts a missing weekday, two- and
/// three-digit years, missing seconds, named zones, a missing zone (taken as
/// UTC) and trailing comments. Returns `None` if no date can be recovered.
#[must_use]
pub fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed = DateTime::parse_from_rfc2822(raw).ok().or_else(|| parse_lenient(raw));
    if parsed.is_none() {
        tracing::debug!(date = raw, "Unparseable date");
    }
    parsed
}

fn parse_lenient(raw: &str) -> Option<DateTime<FixedOffset>> {
    let cleaned = strip_comments(raw).replace(',', " ");
    let mut tokens = cleaned.split_whitespace().peekable();

    // Optional weekday
    if tokens
        .peek()
        .is_some_and(|t| t.chars().all(char::is_alphabetic) && month_number(t).is_none())
    {
        tokens.next();
    }

    // Day and month, in either order
    let first = tokens.next()?;
    let (day, month) = if let Some(month) = month_number(first) {
        (tokens.next()?.parse::<u32>().ok()?, month)
    } else {
        (first.parse::<u32>().ok()?, month_number(tokens.next()?)?)
    };

    let year = expand_year(tokens.next()?)?;

    let (hour, minute, second) = parse_time(tokens.next()?)?;

    let offset_seconds = match tokens.next() {
        Some(zone) => parse_zone(zone)?,
        None => 0,
    };

    let offset = FixedOffset::east_opt(offset_seconds)?;
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    offset.from_local_datetime(&naive).single()
}

/// Returns the 1-based month for a month name (matched on its first three
/// letters, case-insensitively).
fn month_number(token: &str) -> Option<u32> {
    let prefix = token.get(..3)?;
    MONTH_NAMES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(prefix))
        .and_then(|index| u32::try_from(index + 1).ok())
}

/// Expands two- and three-digit years as RFC 5322 section 4.3 prescribes.
fn expand_year(token: &str) -> Option<i32> {
    if !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year: i32 = token.parse().ok()?;
    Some(match token.len() {
        1 | 2 if year < 50 => 2000 + year,
        1 | 2 => 1900 + year,
        3 => 1900 + year,
        _ => year,
    })
}

fn parse_time(token: &str) -> Option<(u32, u32, u32)> {
    let mut fields = token.split(':');
    let hour = fields.next()?.parse().ok()?;
    let minute = fields.next()?.parse().ok()?;
    let second: u32 = fields.next().map_or(Some(0), |s| s.parse().ok())?;
    if fields.next().is_some() {
        return None;
    }
    // Leap seconds are folded into the preceding second
    Some((hour, minute, second.min(59)))
}

/// Parses `+HHMM`, `-HH:MM` or a named zone into an offset in seconds.
fn parse_zone(token: &str) -> Option<i32> {
    if let Some(&(_, hours)) = ZONES.iter().find(|(name, _)| name.eq_ignore_ascii_case(token)) {
        return Some(hours * 3600);
    }

    let (sign, digits) = match token.as_bytes().first()? {
        b'+' => (1, &token[1..]),
        b'-' => (-1, &token[1..]),
        _ => return None,
    };
    let digits = digits.replace(':', "");
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    Some(sign * (hours * 3600 + minutes * 60))
}

fn strip_comments(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for ch in raw.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => result.push(ch),
            _ => {}
        }
    }
    result
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    fn expected(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_parse_rfc2822() {
        let date = parse_date("Sun, 12 Jun 2022 17:21:02 +0200").unwrap();
        assert_eq!(date, expected("2022-06-12T17:21:02+02:00"));
        assert_eq!(date.timestamp(), 1_655_047_262);
    }

    #[test]
    fn test_parse_without_weekday_or_seconds() {
        assert_eq!(
            parse_date("12 Jun 2022 17:21 +0200").unwrap(),
            expected("2022-06-12T17:21:00+02:00")
        );
    }

    #[test]
    fn test_parse_two_digit_years() {
        assert_eq!(
            parse_date("Fri, 21 Nov 97 09:55:06 -0600").unwrap(),
            expected("1997-11-21T09:55:06-06:00")
        );
        assert_eq!(
            parse_date("1 Jan 05 00:00:00 +0000").unwrap(),
            expected("2005-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_parse_named_zones() {
        assert_eq!(
            parse_date("Thu, 13 Feb 1969 23:32:54 EST").unwrap(),
            expected("1969-02-13T23:32:54-05:00")
        );
        assert_eq!(
            parse_date("Mon, 1 Mar 2021 10:00:00 GMT").unwrap(),
            expected("2021-03-01T10:00:00+00:00")
        );
    }

    #[test]
    fn test_parse_trailing_comment_and_missing_zone() {
        assert_eq!(
            parse_date("Tue, 7 Sep 2021 08:15:00 +0000 (UTC)").unwrap(),
            expected("2021-09-07T08:15:00+00:00")
        );
        assert_eq!(
            parse_date("7 Sep 2021 08:15:00").unwrap(),
            expected("2021-09-07T08:15:00+00:00")
        );
    }

    #[test]
    fn test_parse_month_first_and_long_names() {
        assert_eq!(
            parse_date("Wednesday, June 15 2022 09:00:00 +0100").unwrap(),
            expected("2022-06-15T09:00:00+01:00")
        );
    }

    #[test]
    fn test_unparseable_dates() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("32 Jan 2022 10:00:00 +0000"), None);
        assert_eq!(parse_date("12 Foo 2022 10:00:00 +0000"), None);
        assert_eq!(parse_date("12 Jun 2022 10:00:00 +9999"), None);
    }

    #[test]
    fn test_month_table() {
        assert_eq!(MONTH_NAMES.len(), 12);
        assert_eq!(month_number("dec"), Some(12));
        assert_eq!(month_number("Ja"), None);
    }
}
