//! Interval payload
//!
//! Intervals keep calendar components (years, months, days) apart from the
//! clock components, as PostgreSQL does. Months fold into years and clock
//! components fold into hours/minutes/seconds; days never fold into months
//! and hours never fold into days.

use chrono::{NaiveTime, Timelike};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::{ToPrimitive, Zero};
use serde_json::{Map, Number, Value as JsonValue};
use std::fmt;
use std::sync::LazyLock;

static ISO_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^P(?:(-?\d+)Y)?(?:(-?\d+)M)?(?:(-?\d+)W)?(?:(-?\d+)D)?(?:T(?:(-?\d+)H)?(?:(-?\d+)M)?(?:(-?\d+(?:\.\d+)?)S)?)?$",
    )
    .expect("valid ISO duration regex")
});

static CLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-])?(\d+):(\d{1,2})(?::(\d{1,2}(?:\.\d+)?))?$").expect("valid clock regex")
});

/// A structured interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Interval {
    pub years: i32,
    pub months: i32,
    pub days: i32,
    pub hours: i32,
    pub minutes: i32,
    pub seconds: Decimal,
}

impl Interval {
    /// Interval of `months` months
    pub fn months(months: i32) -> Self {
        Self {
            years: months / 12,
            months: months % 12,
            ..Self::default()
        }
    }

    /// Parse an ISO-8601 duration or the PostgreSQL verbose form
    ///
    /// Returns `None` when the text matches neither syntax or a component
    /// overflows.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.len() > 1 && text.as_bytes()[0].eq_ignore_ascii_case(&b'p') {
            Self::parse_iso(text)
        } else {
            Self::parse_verbose(text)
        }
    }

    fn parse_iso(text: &str) -> Option<Self> {
        // `PT` with nothing after it is not a duration
        if text.eq_ignore_ascii_case("pt") || text.to_ascii_uppercase().ends_with('T') {
            return None;
        }
        let caps = ISO_DURATION.captures(text)?;
        let int = |i: usize| -> Option<i32> {
            caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok())
        };
        let seconds = match caps.get(7) {
            Some(m) => m.as_str().parse::<Decimal>().ok()?,
            None => Decimal::ZERO,
        };
        Self {
            years: int(1)?,
            months: int(2)?,
            days: int(3)?.checked_mul(7)?.checked_add(int(4)?)?,
            hours: int(5)?,
            minutes: int(6)?,
            seconds,
        }
        .normalized()
    }

    fn parse_verbose(text: &str) -> Option<Self> {
        let mut interval = Self::default();
        let mut tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.is_empty() {
            return None;
        }
        let ago = tokens.last().is_some_and(|t| t.eq_ignore_ascii_case("ago"));
        if ago {
            tokens.pop();
        }

        let mut i = 0;
        while i < tokens.len() {
            if let Some(caps) = CLOCK.captures(tokens[i]) {
                let sign = if caps.get(1).is_some_and(|m| m.as_str() == "-") { -1 } else { 1 };
                let hours: i32 = caps[2].parse().ok()?;
                let minutes: i32 = caps[3].parse().ok()?;
                let seconds = match caps.get(4) {
                    Some(m) => m.as_str().parse::<Decimal>().ok()?,
                    None => Decimal::ZERO,
                };
                interval.hours = interval.hours.checked_add(sign * hours)?;
                interval.minutes = interval.minutes.checked_add(sign * minutes)?;
                interval.seconds = interval.seconds.checked_add(Decimal::from(sign) * seconds)?;
                i += 1;
                continue;
            }

            let amount: Decimal = tokens[i].parse().ok()?;
            let unit = tokens.get(i + 1)?.to_ascii_lowercase();
            let whole = || amount.trunc().to_i32().filter(|_| amount.fract().is_zero());
            let (field, amount) = match unit.as_str() {
                "year" | "years" | "y" => (&mut interval.years, whole()?),
                "mon" | "mons" | "month" | "months" => (&mut interval.months, whole()?),
                "week" | "weeks" | "w" => (&mut interval.days, whole()?.checked_mul(7)?),
                "day" | "days" | "d" => (&mut interval.days, whole()?),
                "hour" | "hours" | "h" => (&mut interval.hours, whole()?),
                "min" | "mins" | "minute" | "minutes" | "m" => (&mut interval.minutes, whole()?),
                "sec" | "secs" | "second" | "seconds" | "s" => {
                    interval.seconds = interval.seconds.checked_add(amount)?;
                    i += 2;
                    continue;
                }
                "millisecond" | "milliseconds" | "ms" => {
                    let seconds = amount.checked_div(Decimal::from(1000))?;
                    interval.seconds = interval.seconds.checked_add(seconds)?;
                    i += 2;
                    continue;
                }
                _ => return None,
            };
            *field = field.checked_add(amount)?;
            i += 2;
        }

        if ago {
            interval = interval.negated()?;
        }
        interval.normalized()
    }

    /// Fold months into years and clock components into h/m/s
    ///
    /// Returns `None` when a folded component no longer fits.
    pub fn normalized(self) -> Option<Self> {
        let total_months = i64::from(self.years) * 12 + i64::from(self.months);
        let total_seconds = (Decimal::from(self.hours) * Decimal::from(3600))
            .checked_add(Decimal::from(self.minutes) * Decimal::from(60))?
            .checked_add(self.seconds)?;

        let whole = total_seconds.trunc();
        let fraction = total_seconds - whole;
        let whole = whole.to_i64()?;

        Some(Self {
            years: i32::try_from(total_months / 12).ok()?,
            months: i32::try_from(total_months % 12).ok()?,
            days: self.days,
            hours: i32::try_from(whole / 3600).ok()?,
            minutes: i32::try_from((whole % 3600) / 60).ok()?,
            seconds: Decimal::from(whole % 60) + fraction,
        })
    }

    fn negated(self) -> Option<Self> {
        Some(Self {
            years: self.years.checked_neg()?,
            months: self.months.checked_neg()?,
            days: self.days.checked_neg()?,
            hours: self.hours.checked_neg()?,
            minutes: self.minutes.checked_neg()?,
            seconds: -self.seconds,
        })
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// Interval covering the clock time of `time`
    pub fn from_time(time: NaiveTime) -> Self {
        let nanos = Decimal::from(time.nanosecond()) / Decimal::from(1_000_000_000);
        Self {
            hours: time.hour() as i32,
            minutes: time.minute() as i32,
            seconds: Decimal::from(time.second()) + nanos,
            ..Self::default()
        }
    }

    /// Clock component wrapped into a time of day
    pub fn to_time(&self) -> Option<NaiveTime> {
        let total = Decimal::from(self.hours) * Decimal::from(3600)
            + Decimal::from(self.minutes) * Decimal::from(60)
            + self.seconds;
        let day = Decimal::from(86_400);
        let mut wrapped = total % day;
        if wrapped.is_sign_negative() {
            wrapped += day;
        }
        let secs = wrapped.trunc().to_u32()?;
        let nanos = ((wrapped - wrapped.trunc()) * Decimal::from(1_000_000_000))
            .round()
            .to_u32()?;
        NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
    }

    /// JSON object holding the non-zero components
    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        for (key, value) in [
            ("years", self.years),
            ("months", self.months),
            ("days", self.days),
            ("hours", self.hours),
            ("minutes", self.minutes),
        ] {
            if value != 0 {
                map.insert(key.to_string(), JsonValue::from(value));
            }
        }
        if !self.seconds.is_zero() {
            let seconds = if self.seconds.fract().is_zero() {
                self.seconds.to_i64().map(Number::from)
            } else {
                self.seconds.to_f64().and_then(Number::from_f64)
            };
            if let Some(n) = seconds {
                map.insert("seconds".to_string(), JsonValue::Number(n));
            }
        }
        JsonValue::Object(map)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        let plural = |n: i32, one: &str, many: &str| {
            format!("{n} {}", if n.abs() == 1 { one } else { many })
        };
        if self.years != 0 {
            parts.push(plural(self.years, "year", "years"));
        }
        if self.months != 0 {
            parts.push(plural(self.months, "mon", "mons"));
        }
        if self.days != 0 {
            parts.push(plural(self.days, "day", "days"));
        }
        let has_clock = self.hours != 0 || self.minutes != 0 || !self.seconds.is_zero();
        if has_clock || parts.is_empty() {
            let negative = self.hours < 0 || self.minutes < 0 || self.seconds.is_sign_negative();
            let seconds = self.seconds.abs().normalize();
            let whole = seconds.trunc().to_u32().unwrap_or(0);
            let mut clock = format!(
                "{}{:02}:{:02}:{:02}",
                if negative && has_clock { "-" } else { "" },
                self.hours.unsigned_abs(),
                self.minutes.unsigned_abs(),
                whole
            );
            let fraction = (seconds - seconds.trunc()).to_string();
            if let Some(digits) = fraction.strip_prefix("0.") {
                clock.push('.');
                clock.push_str(digits);
            }
            parts.push(clock);
        }
        write!(f, "{}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_iso_months() {
        let interval = Interval::parse("P2M").unwrap();
        assert_eq!(interval, Interval::months(2));
        assert_eq!(interval.to_json(), json!({ "months": 2 }));
        assert_eq!(interval.to_string(), "2 mons");
    }

    #[rstest]
    #[case("P1Y2M3DT4H5M6S", "1 year 2 mons 3 days 04:05:06")]
    #[case("P14M", "1 year 2 mons")]
    #[case("P2W", "14 days")]
    #[case("PT90M", "01:30:00")]
    #[case("PT1.5S", "00:00:01.5")]
    #[case("1 year 2 mons 3 days 04:05:06", "1 year 2 mons 3 days 04:05:06")]
    #[case("3 days ago", "-3 days")]
    #[case("250 ms", "00:00:00.25")]
    fn test_parse_and_display(#[case] input: &str, #[case] rendered: &str) {
        assert_eq!(Interval::parse(input).unwrap().to_string(), rendered);
    }

    #[rstest]
    #[case("P")]
    #[case("PT")]
    #[case("P2X")]
    #[case("P1DT")]
    #[case("two days")]
    #[case("1.5 days")]
    #[case("")]
    fn test_parse_invalid(#[case] input: &str) {
        assert_eq!(Interval::parse(input), None);
    }

    #[rstest]
    #[case("2000000000 years 2000000000 years")]
    #[case("2147483647 days 1 day")]
    #[case("-2147483648 days ago")]
    #[case("79228162514264337593543950335 s 1 s")]
    #[case("2147483647:00 1 hour")]
    #[case("PT99999999999999999999999S")]
    #[case("P2147483647Y12M")]
    fn test_parse_out_of_range(#[case] input: &str) {
        assert_eq!(Interval::parse(input), None);
    }

    #[test]
    fn test_time_round_trip() {
        let time = NaiveTime::from_hms_opt(23, 18, 0).unwrap();
        let interval = Interval::from_time(time);
        assert_eq!(interval.hours, 23);
        assert_eq!(interval.to_time(), Some(time));
    }

    #[test]
    fn test_zero_display() {
        assert_eq!(Interval::default().to_string(), "00:00:00");
    }
}
