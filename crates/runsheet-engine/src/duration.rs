//! Item lengths and setup times.
//!
//! A [`ReadableTime`] is the hours/minutes/seconds structure a schedule stores
//! for every item length and for the optional setup time. It converts to:
//!
//! - a total number of seconds ([`ReadableTime::to_seconds`]),
//! - a canonical ISO 8601 duration ([`ReadableTime::to_iso_duration`]),
//! - a [`CalendarInterval`] for start-time arithmetic ([`ReadableTime::to_interval`]).
//!
//! Components are unsigned: a negative value can never be represented, and
//! every constructor that accepts signed input rejects it with
//! [`RunsheetError::InvalidDuration`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RunsheetError};

// ── ReadableTime ────────────────────────────────────────────────────────────

/// A non-negative hours/minutes/seconds duration.
///
/// Components are kept as given (`0:90:00` stays 90 minutes); every derived
/// representation is computed from the total and is therefore canonical.
///
/// Serializes as its readable text form (`H:MM:SS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReadableTime {
    hours: u32,
    minutes: u32,
    seconds: u32,
}

impl ReadableTime {
    /// The zero-length duration.
    pub const ZERO: ReadableTime = ReadableTime {
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    /// Build a duration from signed components.
    ///
    /// # Errors
    ///
    /// Returns [`RunsheetError::InvalidDuration`] if any component is negative
    /// or does not fit into 32 bits.
    pub fn new(hours: i64, minutes: i64, seconds: i64) -> Result<Self> {
        Ok(Self {
            hours: component("hours", hours)?,
            minutes: component("minutes", minutes)?,
            seconds: component("seconds", seconds)?,
        })
    }

    /// Split a total number of seconds into hours, minutes and seconds.
    ///
    /// # Errors
    ///
    /// Returns [`RunsheetError::InvalidDuration`] if the hour count overflows.
    pub fn from_seconds(total: u64) -> Result<Self> {
        let hours = u32::try_from(total / 3600).map_err(|_| {
            RunsheetError::InvalidDuration(format!("{total} seconds is out of range"))
        })?;
        Ok(Self {
            hours,
            minutes: ((total % 3600) / 60) as u32,
            seconds: (total % 60) as u32,
        })
    }

    /// Parse the readable text form: `H:MM:SS` or `MM:SS`.
    ///
    /// ```
    /// use runsheet_engine::ReadableTime;
    ///
    /// let t = ReadableTime::parse("1:30:00").unwrap();
    /// assert_eq!(t.to_seconds(), 5400);
    /// assert_eq!(ReadableTime::parse("45:10").unwrap().to_seconds(), 2710);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`RunsheetError::InvalidDuration`] for anything else, including
    /// negative components.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split(':').collect();
        // Digits only: a sign on any component (even "-0") is rejected.
        let numbers = parts
            .iter()
            .map(|p| {
                let p = p.trim();
                if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(RunsheetError::InvalidDuration(format!(
                        "'{s}' is not a H:MM:SS time"
                    )));
                }
                p.parse::<i64>().map_err(|_| {
                    RunsheetError::InvalidDuration(format!("'{s}' is out of range"))
                })
            })
            .collect::<Result<Vec<i64>>>()?;

        match numbers.as_slice() {
            [h, m, sec] => Self::new(*h, *m, *sec),
            [m, sec] => Self::new(0, *m, *sec),
            _ => Err(RunsheetError::InvalidDuration(format!(
                "'{s}' is not a H:MM:SS time"
            ))),
        }
    }

    /// Parse an ISO 8601 duration such as `PT1H30M` or `P1DT2H`.
    ///
    /// Days count as 24 hours; years, months and weeks are rejected because
    /// they have no fixed length. Fractional values are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`RunsheetError::InvalidDuration`] if the string is malformed.
    pub fn parse_iso_duration(s: &str) -> Result<Self> {
        let invalid = |why: &str| RunsheetError::InvalidDuration(format!("'{s}': {why}"));

        let rest = s
            .trim()
            .strip_prefix('P')
            .ok_or_else(|| invalid("ISO duration must start with 'P'"))?;
        if rest.is_empty() {
            return Err(invalid("no components"));
        }

        let mut total: u64 = 0;
        let mut in_time = false;
        let mut num_buf = String::new();
        let mut found_any = false;

        for ch in rest.chars() {
            if ch.is_ascii_digit() {
                num_buf.push(ch);
                continue;
            }
            if ch == 'T' {
                if in_time || !num_buf.is_empty() {
                    return Err(invalid("misplaced 'T'"));
                }
                in_time = true;
                continue;
            }
            if num_buf.is_empty() {
                return Err(invalid(&format!("expected number before '{ch}'")));
            }
            let n: u64 = num_buf.parse().map_err(|_| invalid("number out of range"))?;
            num_buf.clear();
            found_any = true;

            let unit_seconds = match (ch, in_time) {
                ('D', false) => 86_400,
                ('H', true) => 3_600,
                ('M', true) => 60,
                ('S', true) => 1,
                _ => return Err(invalid(&format!("unsupported unit '{ch}'"))),
            };
            total = n
                .checked_mul(unit_seconds)
                .and_then(|v| v.checked_add(total))
                .ok_or_else(|| invalid("duration out of range"))?;
        }

        if !num_buf.is_empty() {
            return Err(invalid("number without unit"));
        }
        if !found_any {
            return Err(invalid("no components"));
        }

        Self::from_seconds(total)
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    /// Total length in seconds: `hours*3600 + minutes*60 + seconds`.
    pub fn to_seconds(&self) -> u64 {
        u64::from(self.hours) * 3600 + u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }

    pub fn is_zero(&self) -> bool {
        self.to_seconds() == 0
    }

    /// Canonical ISO 8601 duration, e.g. `PT1H30M`. Zero is `PT0S`.
    ///
    /// Hours are never folded into days, so the result is always a pure
    /// time-part duration.
    pub fn to_iso_duration(&self) -> String {
        let total = self.to_seconds();
        if total == 0 {
            return "PT0S".to_string();
        }

        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;

        let mut out = String::from("PT");
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if seconds > 0 {
            out.push_str(&format!("{seconds}S"));
        }
        out
    }

    /// The calendar-interval form used for start-time arithmetic.
    pub fn to_interval(&self) -> CalendarInterval {
        CalendarInterval {
            hours: i64::from(self.hours),
            minutes: i64::from(self.minutes),
            seconds: i64::from(self.seconds),
        }
    }
}

fn component(name: &str, value: i64) -> Result<u32> {
    if value < 0 {
        return Err(RunsheetError::InvalidDuration(format!(
            "{name} must not be negative (got {value})"
        )));
    }
    u32::try_from(value)
        .map_err(|_| RunsheetError::InvalidDuration(format!("{name} out of range (got {value})")))
}

impl fmt::Display for ReadableTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.to_seconds();
        write!(
            f,
            "{}:{:02}:{:02}",
            total / 3600,
            (total % 3600) / 60,
            total % 60
        )
    }
}

impl FromStr for ReadableTime {
    type Err = RunsheetError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ReadableTime {
    type Error = RunsheetError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ReadableTime> for String {
    fn from(value: ReadableTime) -> Self {
        value.to_string()
    }
}

// ── CalendarInterval ────────────────────────────────────────────────────────

/// A duration expressed in calendar units.
///
/// Unlike a bare seconds count, an interval is only ever applied to a
/// fixed-offset instant: adding it can never pick up a different UTC offset
/// half-way through a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalendarInterval {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl CalendarInterval {
    /// Add this interval to a fixed-offset instant. The offset of the result
    /// is always the offset of `at`.
    ///
    /// # Errors
    ///
    /// Returns [`RunsheetError::InvalidDuration`] if the result falls outside
    /// the range of representable datetimes.
    pub fn add_to(&self, at: DateTime<FixedOffset>) -> Result<DateTime<FixedOffset>> {
        let total = self.total_seconds();
        TimeDelta::try_seconds(total)
            .and_then(|delta| at.checked_add_signed(delta))
            .ok_or_else(|| {
                RunsheetError::InvalidDuration(format!(
                    "{} plus {total} seconds runs past the representable range",
                    at.to_rfc3339()
                ))
            })
    }

    pub fn total_seconds(&self) -> i64 {
        self.hours * 3600 + self.minutes * 60 + self.seconds
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    // ── construction tests ──────────────────────────────────────────────

    #[test]
    fn test_new_rejects_negative_components() {
        for (h, m, s) in [(-1, 0, 0), (0, -1, 0), (0, 0, -1)] {
            let err = ReadableTime::new(h, m, s).unwrap_err();
            assert!(matches!(err, RunsheetError::InvalidDuration(_)), "got {err:?}");
        }
    }

    #[test]
    fn test_new_keeps_unnormalized_components() {
        let t = ReadableTime::new(0, 90, 0).unwrap();
        assert_eq!(t.minutes(), 90);
        assert_eq!(t.to_seconds(), 5400);
    }

    #[test]
    fn test_from_seconds_splits_components() {
        let t = ReadableTime::from_seconds(3723).unwrap();
        assert_eq!((t.hours(), t.minutes(), t.seconds()), (1, 2, 3));
    }

    // ── to_seconds / to_iso_duration tests ──────────────────────────────

    #[test]
    fn test_to_seconds() {
        let t = ReadableTime::new(2, 15, 30).unwrap();
        assert_eq!(t.to_seconds(), 2 * 3600 + 15 * 60 + 30);
    }

    #[test]
    fn test_iso_duration_zero_is_pt0s() {
        assert_eq!(ReadableTime::ZERO.to_iso_duration(), "PT0S");
    }

    #[test]
    fn test_iso_duration_hours_and_minutes() {
        let t = ReadableTime::new(1, 30, 0).unwrap();
        assert_eq!(t.to_iso_duration(), "PT1H30M");
    }

    #[test]
    fn test_iso_duration_is_canonical() {
        let t = ReadableTime::new(0, 90, 61).unwrap();
        assert_eq!(t.to_iso_duration(), "PT1H31M1S");
    }

    #[test]
    fn test_iso_duration_never_emits_days() {
        let t = ReadableTime::new(26, 0, 0).unwrap();
        assert_eq!(t.to_iso_duration(), "PT26H");
    }

    // ── parse tests ─────────────────────────────────────────────────────

    #[test]
    fn test_parse_readable_forms() {
        assert_eq!(ReadableTime::parse("1:30:00").unwrap().to_seconds(), 5400);
        assert_eq!(ReadableTime::parse("05:07").unwrap().to_seconds(), 307);
        assert_eq!(ReadableTime::parse(" 0:00:00 ").unwrap(), ReadableTime::ZERO);
    }

    #[test]
    fn test_parse_rejects_negative_and_garbage() {
        assert!(ReadableTime::parse("-1:00:00").is_err());
        assert!(ReadableTime::parse("-0:00:30").is_err());
        assert!(ReadableTime::parse("0:-0:30").is_err());
        assert!(ReadableTime::parse("+1:00:00").is_err());
        assert!(ReadableTime::parse("1::00").is_err());
        assert!(ReadableTime::parse("abc").is_err());
        assert!(ReadableTime::parse("1:2:3:4").is_err());
        assert!(ReadableTime::parse("").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let t = ReadableTime::new(12, 5, 9).unwrap();
        assert_eq!(t.to_string(), "12:05:09");
        assert_eq!(t.to_string().parse::<ReadableTime>().unwrap(), t);
    }

    #[test]
    fn test_parse_iso_duration() {
        assert_eq!(ReadableTime::parse_iso_duration("PT1H30M").unwrap().to_seconds(), 5400);
        assert_eq!(ReadableTime::parse_iso_duration("PT0S").unwrap(), ReadableTime::ZERO);
        assert_eq!(ReadableTime::parse_iso_duration("P1DT2H").unwrap().to_seconds(), 93_600);
        assert_eq!(ReadableTime::parse_iso_duration("PT45S").unwrap().to_seconds(), 45);
    }

    #[test]
    fn test_parse_iso_duration_rejects_malformed() {
        for bad in ["", "P", "PT", "1H", "PT1Y", "P1M", "PT1.5H", "PT5", "PTT1H", "P1H"] {
            let err = ReadableTime::parse_iso_duration(bad).unwrap_err();
            assert!(matches!(err, RunsheetError::InvalidDuration(_)), "{bad}: {err:?}");
        }
    }

    #[test]
    fn test_serde_uses_readable_form() {
        let t = ReadableTime::new(0, 15, 0).unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"0:15:00\"");
        let back: ReadableTime = serde_json::from_str("\"0:15:00\"").unwrap();
        assert_eq!(back, t);
        assert!(serde_json::from_str::<ReadableTime>("\"-0:15:00\"").is_err());
    }

    // ── CalendarInterval tests ──────────────────────────────────────────

    #[test]
    fn test_interval_keeps_offset() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let start = offset
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(2024, 3, 10)
                    .unwrap()
                    .and_hms_opt(1, 30, 0)
                    .unwrap(),
            )
            .unwrap();
        let later = ReadableTime::new(2, 0, 0)
            .unwrap()
            .to_interval()
            .add_to(start)
            .unwrap();
        assert_eq!(later.offset(), &offset);
        assert_eq!((later - start).num_seconds(), 7200);
    }

    #[test]
    fn test_interval_past_representable_range_is_an_error() {
        let start = FixedOffset::east_opt(0)
            .unwrap()
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(2024, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            )
            .unwrap();
        let huge = ReadableTime::parse("4000000000:00:00").unwrap().to_interval();
        let err = huge.add_to(start).unwrap_err();
        assert!(matches!(err, RunsheetError::InvalidDuration(_)), "got {err:?}");
    }

    #[test]
    fn test_interval_total_seconds() {
        let interval = ReadableTime::new(1, 1, 1).unwrap().to_interval();
        assert_eq!(interval.total_seconds(), 3661);
    }
}
