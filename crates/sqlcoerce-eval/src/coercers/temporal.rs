//! Date, time, timestamp and interval literal coercion

use crate::session::SessionSettings;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use sqlcoerce_diagnostics::{CastError, CastResult};
use sqlcoerce_types::{Interval, temporal};

pub fn parse_date(raw: &str) -> CastResult<NaiveDate> {
    temporal::parse_date(raw).ok_or_else(|| CastError::invalid_datetime("date", raw))
}

pub fn parse_time(raw: &str) -> CastResult<NaiveTime> {
    temporal::parse_time(raw).ok_or_else(|| CastError::invalid_datetime("time", raw))
}

/// Parse a timestamp without time zone; a zone suffix is ignored
pub fn parse_timestamp(raw: &str) -> CastResult<NaiveDateTime> {
    temporal::parse_timestamp(raw)
        .map(|(dt, _)| dt)
        .ok_or_else(|| CastError::invalid_datetime("timestamp", raw))
}

/// Parse an absolute instant; zone-less text is read in the session offset
pub fn parse_timestamptz(raw: &str, session: &SessionSettings) -> CastResult<DateTime<Utc>> {
    let invalid = || CastError::invalid_datetime("timestamp with time zone", raw);
    let (local, offset) = temporal::parse_timestamp(raw).ok_or_else(invalid)?;
    let offset = offset.unwrap_or(session.time_zone);
    offset
        .from_local_datetime(&local)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(invalid)
}

pub fn parse_interval(raw: &str) -> CastResult<Interval> {
    Interval::parse(raw).ok_or_else(|| CastError::invalid_interval(raw))
}

/// `to_date(text, pattern)`
pub fn to_date(raw: &str, pattern: &str) -> CastResult<NaiveDate> {
    temporal::parse_with_pattern(raw, pattern)
        .map(|dt| dt.date())
        .ok_or_else(|| CastError::invalid_datetime("date", raw))
}

/// `to_timestamp(text, pattern)`, read in the session offset
pub fn to_timestamp(
    raw: &str,
    pattern: &str,
    session: &SessionSettings,
) -> CastResult<DateTime<Utc>> {
    let invalid = || CastError::invalid_datetime("timestamp with time zone", raw);
    let local = temporal::parse_with_pattern(raw, pattern).ok_or_else(invalid)?;
    session
        .time_zone
        .from_local_datetime(&local)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(invalid)
}
