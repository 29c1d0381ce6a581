use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};

pub const DEFAULT_SHIFT_HOURS: i32 = 8;

const CLOCK_FORMAT: &str = "%H:%M:%S";
const FULL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Flat display shift applied to every parsed timestamp.
///
/// There is no timezone database involved: the instant is normalized to UTC
/// and moved by a fixed number of hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeShift {
    offset: TimeDelta,
}

impl TimeShift {
    pub fn hours(hours: i32) -> Self {
        Self {
            offset: TimeDelta::hours(hours as i64),
        }
    }

    /// Parses `raw` and returns the shifted wall-clock time.
    pub fn apply(&self, raw: &str) -> Option<NaiveDateTime> {
        parse_utc(raw)?.checked_add_signed(self.offset)
    }

    /// `HH:MM:SS` for entry headers, or `raw` untouched when it does not parse.
    pub fn format_clock(&self, raw: &str) -> String {
        match self.apply(raw) {
            Some(shifted) => shifted.format(CLOCK_FORMAT).to_string(),
            None => raw.to_string(),
        }
    }

    /// `YYYY-MM-DD HH:MM:SS` for summaries, or `raw` untouched when it does not parse.
    pub fn format_full(&self, raw: &str) -> String {
        match self.apply(raw) {
            Some(shifted) => format_full(&shifted),
            None => raw.to_string(),
        }
    }
}

impl Default for TimeShift {
    fn default() -> Self {
        Self::hours(DEFAULT_SHIFT_HOURS)
    }
}

pub fn format_full(shifted: &NaiveDateTime) -> String {
    shifted.format(FULL_FORMAT).to_string()
}

/// Parses an ISO-8601-like timestamp into a UTC wall-clock time.
///
/// Offsets (including a trailing `Z`) are folded into UTC. Strings without an
/// offset are taken as UTC already. A bare date means midnight.
pub fn parse_utc(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    let normalized = match trimmed.strip_suffix(['Z', 'z']) {
        Some(stem) => format!("{}+00:00", stem),
        None => trimmed.to_string(),
    };

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, format) {
            return Some(dt.naive_utc());
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive);
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
