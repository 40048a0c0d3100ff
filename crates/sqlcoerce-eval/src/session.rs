//! Session settings consulted by conversions

use chrono::{FixedOffset, Offset, Utc};
use sqlcoerce_types::temporal::format_offset;

/// Per-engine settings that influence conversions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Offset used for zone-less `timestamptz` input and for rendering
    pub time_zone: FixedOffset,
}

impl SessionSettings {
    pub fn new(time_zone: FixedOffset) -> Self {
        Self { time_zone }
    }

    pub fn utc() -> Self {
        Self {
            time_zone: Utc.fix(),
        }
    }

    /// Offset rendered as `+HH[:MM]`
    pub fn time_zone_name(&self) -> String {
        format_offset(self.time_zone)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::utc()
    }
}
