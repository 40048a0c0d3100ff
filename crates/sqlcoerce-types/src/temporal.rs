//! Date and time text handling
//!
//! Parsing of ISO-8601-like date, time and timestamp literals, the
//! `to_date`/`to_timestamp` format patterns, time zone offsets, PostgreSQL
//! style rendering and fractional-second rounding.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, Timelike, Utc};
use regex::Regex;
use std::sync::LazyLock;

static TIME_HMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{1,2}):(\d{1,2})(?:\.(\d+))?$").expect("valid time regex")
});

static TIME_HM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{1,2})$").expect("valid time regex"));

static TIME_MS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{1,2})\.(\d+)$").expect("valid time regex"));

static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(\d{4})-(\d{1,2})-(\d{1,2})(?:(?:T|\s+)(\d{1,2}):(\d{1,2})(?::(\d{1,2})(?:\.(\d+))?)?)?\s*(Z|UTC|[+-]\d{1,2}(?::?\d{2})?)?$",
    )
    .expect("valid timestamp regex")
});

static OFFSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-])(\d{1,2})(?::?(\d{2}))?$").expect("valid offset regex")
});

/// Parse a time of day
///
/// Interpretations are tried from most to least specific and the first one
/// whose components are in range wins:
/// 1. `H:M:S[.f]`
/// 2. `H:M`
/// 3. `M:S.f`
///
/// So `23:18` is 23:18:00 while `23:18.5` is 00:23:18.5.
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    if let Some(caps) = TIME_HMS.captures(text) {
        return clock(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
            caps.get(4).map(|m| m.as_str()),
        );
    }
    if let Some(caps) = TIME_HM.captures(text) {
        if let Some(time) = clock(caps[1].parse().ok()?, caps[2].parse().ok()?, 0, None) {
            return Some(time);
        }
    }
    if let Some(caps) = TIME_MS.captures(text) {
        return clock(0, caps[1].parse().ok()?, caps[2].parse().ok()?, Some(&caps[3]));
    }
    None
}

fn clock(hour: u32, minute: u32, second: u32, fraction: Option<&str>) -> Option<NaiveTime> {
    if hour > 23 || minute > 59 || second > 59 {
        return None;
    }
    let nanos = fraction.map_or(0, fraction_nanos);
    NaiveTime::from_hms_nano_opt(hour, minute, second, nanos).map(|t| t.round_subsecs(6))
}

/// Nanoseconds represented by the digits after a decimal point
fn fraction_nanos(digits: &str) -> u32 {
    let mut padded: String = digits.chars().take(9).collect();
    while padded.len() < 9 {
        padded.push('0');
    }
    padded.parse().unwrap_or(0)
}

/// Parse a timestamp with an optional time part and zone suffix
///
/// Accepts a `T` or whitespace separator, optional seconds and fraction and
/// a trailing `Z`, `UTC`, `±HH`, `±HH:MM` or `±HHMM`. A bare date means
/// midnight.
pub fn parse_timestamp(text: &str) -> Option<(NaiveDateTime, Option<FixedOffset>)> {
    let caps = TIMESTAMP.captures(text.trim())?;
    let date = NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )?;
    let time = match caps.get(4) {
        Some(hour) => clock(
            hour.as_str().parse().ok()?,
            caps.get(5)?.as_str().parse().ok()?,
            caps.get(6).map_or(Some(0), |m| m.as_str().parse().ok())?,
            caps.get(7).map(|m| m.as_str()),
        )?,
        None => NaiveTime::MIN,
    };
    let offset = match caps.get(8) {
        Some(zone) => Some(parse_offset(zone.as_str())?),
        None => None,
    };
    Some((date.and_time(time), offset))
}

/// Parse a date, ignoring any time part
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    parse_timestamp(text).map(|(dt, _)| dt.date())
}

/// Parse a fixed UTC offset (`Z`, `UTC`, `+02`, `+02:00`, `-0530`)
pub fn parse_offset(text: &str) -> Option<FixedOffset> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("z") || text.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    let caps = OFFSET.captures(text)?;
    let hours: i32 = caps[2].parse().ok()?;
    let minutes: i32 = caps.get(3).map_or(Some(0), |m| m.as_str().parse().ok())?;
    if hours > 15 || minutes > 59 {
        return None;
    }
    let seconds = hours * 3600 + minutes * 60;
    if &caps[1] == "-" {
        FixedOffset::west_opt(seconds)
    } else {
        FixedOffset::east_opt(seconds)
    }
}

// === Format patterns ===

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormatToken {
    Year4,
    Year2,
    Month,
    Day,
    Hour24,
    Hour12,
    Minute,
    Second,
    Millis,
    Micros,
    Literal(char),
}

impl FormatToken {
    fn width(self) -> usize {
        match self {
            Self::Year4 => 4,
            Self::Millis => 3,
            Self::Micros => 6,
            Self::Literal(_) => 0,
            _ => 2,
        }
    }
}

const PATTERN_TOKENS: &[(&str, FormatToken)] = &[
    ("YYYY", FormatToken::Year4),
    ("HH24", FormatToken::Hour24),
    ("HH12", FormatToken::Hour12),
    ("YY", FormatToken::Year2),
    ("MM", FormatToken::Month),
    ("DD", FormatToken::Day),
    ("HH", FormatToken::Hour12),
    ("MI", FormatToken::Minute),
    ("SS", FormatToken::Second),
    ("MS", FormatToken::Millis),
    ("US", FormatToken::Micros),
];

fn tokenize_pattern(pattern: &str) -> Vec<FormatToken> {
    let mut tokens = Vec::new();
    let mut rest = pattern;
    while let Some(c) = rest.chars().next() {
        let matched = PATTERN_TOKENS.iter().find(|(text, _)| {
            rest.len() >= text.len()
                && rest.is_char_boundary(text.len())
                && rest[..text.len()].eq_ignore_ascii_case(text)
        });
        match matched {
            Some((text, token)) => {
                tokens.push(*token);
                rest = &rest[text.len()..];
            }
            None => {
                tokens.push(FormatToken::Literal(c));
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    tokens
}

/// Parse `text` against a `to_date`/`to_timestamp` pattern
///
/// Numeric fields have fixed widths (`YYYY` four digits, `MS` three, `US`
/// six, all others two) and every other pattern character must appear
/// verbatim. The whole text must be consumed.
pub fn parse_with_pattern(text: &str, pattern: &str) -> Option<NaiveDateTime> {
    let mut year = 1;
    let (mut month, mut day) = (1, 1);
    let (mut hour, mut minute, mut second, mut micros) = (0, 0, 0, 0);
    let mut rest = text;

    for token in tokenize_pattern(pattern) {
        if let FormatToken::Literal(expected) = token {
            rest = rest.strip_prefix(expected)?;
            continue;
        }
        let width = token.width();
        let digits = rest.get(..width)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u32 = digits.parse().ok()?;
        rest = &rest[width..];
        match token {
            FormatToken::Year4 => year = value as i32,
            FormatToken::Year2 => {
                let century = if value < 70 { 2000 } else { 1900 };
                year = century + value as i32;
            }
            FormatToken::Month => month = value,
            FormatToken::Day => day = value,
            FormatToken::Hour24 => hour = value,
            FormatToken::Hour12 if (1..=12).contains(&value) => hour = value % 12,
            FormatToken::Hour12 => return None,
            FormatToken::Minute => minute = value,
            FormatToken::Second => second = value,
            FormatToken::Millis => micros = value * 1000,
            FormatToken::Micros => micros = value,
            FormatToken::Literal(_) => {}
        }
    }
    if !rest.is_empty() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_micro_opt(hour, minute, second, micros)
}

// === Rendering ===

/// Render a time as `HH:MM:SS[.f]` with trailing fraction zeros dropped
pub fn format_time(time: NaiveTime) -> String {
    let mut out = time.format("%H:%M:%S").to_string();
    push_fraction(&mut out, time.nanosecond());
    out
}

/// Render a timestamp as `YYYY-MM-DD HH:MM:SS[.f]`
pub fn format_timestamp(dt: NaiveDateTime) -> String {
    format!("{} {}", dt.date().format("%Y-%m-%d"), format_time(dt.time()))
}

/// Render an instant in `offset` as `YYYY-MM-DD HH:MM:SS[.f]±HH[:MM]`
pub fn format_timestamptz(instant: DateTime<Utc>, offset: FixedOffset) -> String {
    let local = instant.with_timezone(&offset).naive_local();
    format!("{}{}", format_timestamp(local), format_offset(offset))
}

/// Render an offset as `+HH` or `+HH:MM`
pub fn format_offset(offset: FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let (hours, minutes) = (seconds.abs() / 3600, (seconds.abs() % 3600) / 60);
    if minutes == 0 {
        format!("{sign}{hours:02}")
    } else {
        format!("{sign}{hours:02}:{minutes:02}")
    }
}

fn push_fraction(out: &mut String, nanos: u32) {
    if nanos == 0 || nanos >= 1_000_000_000 {
        return;
    }
    let digits = format!("{nanos:09}");
    out.push('.');
    out.push_str(digits.trim_end_matches('0'));
}

// === Precision ===

/// Round a time to `precision` fractional-second digits
pub fn round_time(time: NaiveTime, precision: u8) -> NaiveTime {
    time.round_subsecs(u16::from(precision))
}

/// Round a timestamp to `precision` fractional-second digits
pub fn round_timestamp(dt: NaiveDateTime, precision: u8) -> NaiveDateTime {
    dt.round_subsecs(u16::from(precision))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("23:18", "23:18:00")]
    #[case("23:18.5", "00:23:18.5")]
    #[case("23:18.005", "00:23:18.005")]
    #[case("1:2:3", "01:02:03")]
    #[case("12:30:45.123456", "12:30:45.123456")]
    #[case(" 08:00 ", "08:00:00")]
    fn test_time_hierarchy(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(parse_time(input).map(format_time), Some(expected.to_string()));
    }

    #[rstest]
    #[case("24:00:00")]
    #[case("12:60")]
    #[case("75:30.5")]
    #[case("noon")]
    #[case("12")]
    fn test_time_invalid(#[case] input: &str) {
        assert_eq!(parse_time(input), None);
    }

    #[test]
    fn test_timestamp_with_zone() {
        let (dt, offset) = parse_timestamp("2021-09-18 00:00:00Z").unwrap();
        assert_eq!(format_timestamp(dt), "2021-09-18 00:00:00");
        assert_eq!(offset, FixedOffset::east_opt(0));

        let (_, offset) = parse_timestamp("2021-09-18T10:00+02:00").unwrap();
        assert_eq!(offset, FixedOffset::east_opt(7200));
    }

    #[rstest]
    #[case("2017-01-03")]
    #[case("2017-1-3")]
    #[case("2017-01-03 12:00")]
    fn test_parse_date(#[case] input: &str) {
        assert_eq!(parse_date(input), NaiveDate::from_ymd_opt(2017, 1, 3));
    }

    #[rstest]
    #[case("2017-02-30")]
    #[case("03/01/2017")]
    #[case("2017-01-03 25:00")]
    fn test_parse_date_invalid(#[case] input: &str) {
        assert_eq!(parse_date(input), None);
    }

    #[rstest]
    #[case("+02", 7200)]
    #[case("-0530", -19800)]
    #[case("+05:45", 20700)]
    #[case("UTC", 0)]
    fn test_parse_offset(#[case] input: &str, #[case] seconds: i32) {
        assert_eq!(parse_offset(input).map(|o| o.local_minus_utc()), Some(seconds));
    }

    #[test]
    fn test_pattern_compact_date() {
        let dt = parse_with_pattern("20170103", "YYYYMMDD").unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2017, 1, 3).unwrap());
    }

    #[test]
    fn test_pattern_timestamp() {
        let dt = parse_with_pattern("2017-01-03 14:05:09.250", "YYYY-MM-DD HH24:MI:SS.MS").unwrap();
        assert_eq!(format_timestamp(dt), "2017-01-03 14:05:09.25");
    }

    #[rstest]
    #[case("2017013", "YYYYMMDD")]
    #[case("201701031", "YYYYMMDD")]
    #[case("2017/01/03", "YYYY-MM-DD")]
    #[case("20171303", "YYYYMMDD")]
    fn test_pattern_mismatch(#[case] text: &str, #[case] pattern: &str) {
        assert_eq!(parse_with_pattern(text, pattern), None);
    }

    #[test]
    fn test_format_timestamptz() {
        let (dt, _) = parse_timestamp("2021-09-18 00:00:00").unwrap();
        let instant = dt.and_utc();
        let offset = parse_offset("+05:30").unwrap();
        assert_eq!(format_timestamptz(instant, offset), "2021-09-18 05:30:00+05:30");
        assert_eq!(
            format_timestamptz(instant, FixedOffset::east_opt(0).unwrap()),
            "2021-09-18 00:00:00+00"
        );
    }

    #[test]
    fn test_round_precision() {
        let time = parse_time("10:00:00.123456").unwrap();
        assert_eq!(format_time(round_time(time, 2)), "10:00:00.12");
        assert_eq!(format_time(round_time(time, 0)), "10:00:00");
    }
}
