//! Timezone-anchored schedule starts.
//!
//! A schedule stores its start as a civil wall-clock time plus an IANA zone.
//! [`anchor_start`] resolves the UTC offset for that civil time **once** and
//! returns a fixed-offset instant. Every later start is computed by adding
//! [`CalendarInterval`](crate::duration::CalendarInterval)s to that instant, so
//! a schedule that runs across a DST change keeps the offset it started with:
//!
//! ```text
//!   2024-03-10 01:30 -05:00   (anchored, America/New_York)
//! +            02:00
//! = 2024-03-10 03:30 -05:00   (same instant as 04:30 -04:00)
//! ```
//!
//! Re-resolving the zone after each addition would instead land on
//! `03:30 -04:00`, an hour early.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::{Result, RunsheetError};

/// A schedule start pinned to the UTC offset in effect at its civil start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchoredStart {
    instant: DateTime<FixedOffset>,
    timezone: Tz,
}

impl AnchoredStart {
    /// The fixed-offset start instant.
    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.instant
    }

    /// The offset resolved at anchoring time.
    pub fn offset(&self) -> FixedOffset {
        *self.instant.offset()
    }

    /// The schedule's own zone.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn to_utc(&self) -> DateTime<Utc> {
        self.instant.with_timezone(&Utc)
    }

    /// The start as the schedule's zone would display it. After a DST change
    /// this may show a different offset than [`AnchoredStart::offset`].
    pub fn local(&self) -> DateTime<Tz> {
        self.instant.with_timezone(&self.timezone)
    }

    /// The start converted to another IANA zone, for display.
    ///
    /// # Errors
    ///
    /// Returns [`RunsheetError::InvalidTimezone`] for an unknown zone name.
    pub fn in_timezone(&self, timezone: &str) -> Result<DateTime<Tz>> {
        to_timezone(self.instant, timezone)
    }
}

/// Resolve a civil start time in `timezone` to a fixed-offset instant.
///
/// The offset is chosen as follows:
///
/// - an unambiguous civil time uses its offset;
/// - a time repeated by a fall-back transition uses the earlier offset;
/// - a time skipped by a spring-forward transition uses the offset in effect
///   after the transition. The civil numerals are kept, so `02:30` becomes
///   `02:30 -04:00` in `America/New_York`.
///
/// ```
/// use chrono::NaiveDate;
/// use runsheet_engine::anchor_start;
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(10, 0, 0).unwrap();
/// let anchored = anchor_start(start, "Europe/Berlin").unwrap();
/// assert_eq!(anchored.instant().to_rfc3339(), "2024-01-01T10:00:00+01:00");
/// ```
///
/// # Errors
///
/// Returns [`RunsheetError::InvalidTimezone`] if the zone name is not a valid
/// IANA identifier.
pub fn anchor_start(start: NaiveDateTime, timezone: &str) -> Result<AnchoredStart> {
    let tz = parse_timezone(timezone)?;
    let offset = resolve_offset(&tz, start)?;
    let instant = offset
        .from_local_datetime(&start)
        .single()
        .ok_or_else(|| {
            RunsheetError::InvalidDatetime(format!("'{start}' cannot carry offset {offset}"))
        })?;

    tracing::debug!(
        start = %start,
        timezone,
        offset = %format_offset(offset),
        "anchored schedule start"
    );

    Ok(AnchoredStart {
        instant,
        timezone: tz,
    })
}

/// Convert any fixed-offset instant to an IANA zone, for display.
///
/// # Errors
///
/// Returns [`RunsheetError::InvalidTimezone`] for an unknown zone name.
pub fn to_timezone(instant: DateTime<FixedOffset>, timezone: &str) -> Result<DateTime<Tz>> {
    let tz = parse_timezone(timezone)?;
    Ok(instant.with_timezone(&tz))
}

/// Parse an IANA timezone string into `Tz`.
pub fn parse_timezone(s: &str) -> Result<Tz> {
    s.parse::<Tz>()
        .map_err(|_| RunsheetError::InvalidTimezone(format!("'{}'", s)))
}

/// Format a UTC offset as a string (e.g., "-05:00", "+09:30").
pub fn format_offset(offset: FixedOffset) -> String {
    let offset_secs = offset.local_minus_utc();
    let sign = if offset_secs >= 0 { "+" } else { "-" };
    let abs_secs = offset_secs.unsigned_abs();
    let hours = abs_secs / 3600;
    let minutes = (abs_secs % 3600) / 60;
    format!("{sign}{hours:02}:{minutes:02}")
}

/// Summary of an anchored start, for callers that want to show how the
/// offset was chosen.
#[derive(Debug, Clone, Serialize)]
pub struct AnchorInfo {
    /// The anchored start (RFC 3339 with the fixed offset).
    pub local: String,
    /// The same instant in UTC (RFC 3339).
    pub utc: String,
    /// The IANA zone name.
    pub timezone: String,
    /// The fixed offset (e.g. "-05:00").
    pub utc_offset: String,
    /// Whether daylight saving time was in effect at the anchored instant.
    pub dst_active: bool,
}

impl From<&AnchoredStart> for AnchorInfo {
    fn from(anchor: &AnchoredStart) -> Self {
        Self {
            local: anchor.instant.to_rfc3339(),
            utc: anchor.to_utc().to_rfc3339(),
            timezone: anchor.timezone.name().to_string(),
            utc_offset: format_offset(anchor.offset()),
            dst_active: is_dst_active(anchor),
        }
    }
}

// ── Internal helpers ────────────────────────────────────────────────────────

fn resolve_offset(tz: &Tz, start: NaiveDateTime) -> Result<FixedOffset> {
    if let Some(offset) = tz.offset_from_local_datetime(&start).earliest() {
        return Ok(offset.fix());
    }

    // Civil time inside a spring-forward gap. Read it with the offset in force
    // a day earlier; the resulting UTC instant lies past the transition, and
    // the zone's offset there is the post-transition one.
    let before = start - TimeDelta::days(1);
    let before_offset = tz
        .offset_from_local_datetime(&before)
        .earliest()
        .map(|o| o.fix())
        .ok_or_else(|| {
            RunsheetError::InvalidDatetime(format!(
                "'{start}' does not exist in {} and has no earlier offset",
                tz.name()
            ))
        })?;
    let utc = start - TimeDelta::seconds(i64::from(before_offset.local_minus_utc()));
    Ok(tz.offset_from_utc_datetime(&utc).fix())
}

/// Compare January 1 offset (winter / standard) with the anchored offset.
fn is_dst_active(anchor: &AnchoredStart) -> bool {
    use chrono::Datelike;

    let utc = anchor.to_utc();
    let jan1 = Utc
        .with_ymd_and_hms(utc.year(), 1, 1, 12, 0, 0)
        .single()
        .unwrap_or(utc);
    let jan_offset = jan1.with_timezone(&anchor.timezone).offset().fix();

    anchor.offset().local_minus_utc() != jan_offset.local_minus_utc()
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn civil(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    // ── anchor_start tests ──────────────────────────────────────────────

    #[test]
    fn test_anchor_utc() {
        let anchored = anchor_start(civil(2024, 1, 1, 10, 0), "UTC").unwrap();
        assert_eq!(anchored.instant().to_rfc3339(), "2024-01-01T10:00:00+00:00");
        assert_eq!(anchored.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_anchor_winter_and_summer_offsets() {
        let winter = anchor_start(civil(2024, 1, 15, 12, 0), "America/New_York").unwrap();
        assert_eq!(format_offset(winter.offset()), "-05:00");

        let summer = anchor_start(civil(2024, 7, 15, 12, 0), "America/New_York").unwrap();
        assert_eq!(format_offset(summer.offset()), "-04:00");
    }

    #[test]
    fn test_anchor_just_before_spring_forward_keeps_standard_offset() {
        let anchored = anchor_start(civil(2024, 3, 10, 1, 30), "America/New_York").unwrap();
        assert_eq!(anchored.instant().to_rfc3339(), "2024-03-10T01:30:00-05:00");
    }

    #[test]
    fn test_anchor_inside_spring_forward_gap_uses_later_offset() {
        // 02:30 does not exist on 2024-03-10 in New York.
        let anchored = anchor_start(civil(2024, 3, 10, 2, 30), "America/New_York").unwrap();
        assert_eq!(anchored.instant().to_rfc3339(), "2024-03-10T02:30:00-04:00");
    }

    #[test]
    fn test_anchor_ambiguous_fall_back_uses_earlier_offset() {
        // 01:30 happens twice on 2024-11-03 in New York; the first is EDT.
        let anchored = anchor_start(civil(2024, 11, 3, 1, 30), "America/New_York").unwrap();
        assert_eq!(anchored.instant().to_rfc3339(), "2024-11-03T01:30:00-04:00");
    }

    #[test]
    fn test_anchor_half_hour_zone() {
        let anchored = anchor_start(civil(2024, 6, 1, 9, 0), "Asia/Kolkata").unwrap();
        assert_eq!(format_offset(anchored.offset()), "+05:30");
    }

    #[test]
    fn test_anchor_invalid_timezone() {
        let err = anchor_start(civil(2024, 1, 1, 0, 0), "Mars/Olympus_Mons").unwrap_err();
        assert!(matches!(err, RunsheetError::InvalidTimezone(_)));
        assert!(err.to_string().contains("Mars/Olympus_Mons"));
    }

    // ── conversion tests ────────────────────────────────────────────────

    #[test]
    fn test_to_utc() {
        let anchored = anchor_start(civil(2024, 1, 15, 12, 0), "America/New_York").unwrap();
        assert_eq!(anchored.to_utc().to_rfc3339(), "2024-01-15T17:00:00+00:00");
    }

    #[test]
    fn test_in_other_timezone() {
        let anchored = anchor_start(civil(2024, 1, 15, 12, 0), "America/New_York").unwrap();
        let tokyo = anchored.in_timezone("Asia/Tokyo").unwrap();
        assert!(tokyo.to_rfc3339().starts_with("2024-01-16T02:00:00"));
        assert!(anchored.in_timezone("Nowhere/Special").is_err());
    }

    #[test]
    fn test_local_reflects_zone_rules_after_anchoring() {
        let anchored = anchor_start(civil(2024, 3, 10, 1, 30), "America/New_York").unwrap();
        let later = anchored.instant() + TimeDelta::hours(2);
        let local = later.with_timezone(&anchored.timezone());
        // Fixed offset keeps -05:00; the zone shows the same instant as EDT.
        assert_eq!(later.to_rfc3339(), "2024-03-10T03:30:00-05:00");
        assert_eq!(local.to_rfc3339(), "2024-03-10T04:30:00-04:00");
    }

    #[test]
    fn test_anchor_info_reports_dst() {
        let summer = anchor_start(civil(2024, 7, 1, 9, 0), "Europe/Berlin").unwrap();
        let info = AnchorInfo::from(&summer);
        assert_eq!(info.utc_offset, "+02:00");
        assert!(info.dst_active);
        assert_eq!(info.timezone, "Europe/Berlin");

        let winter = anchor_start(civil(2024, 1, 1, 9, 0), "Europe/Berlin").unwrap();
        assert!(!AnchorInfo::from(&winter).dst_active);
    }

    #[test]
    fn test_format_offset_negative_half_hour() {
        let offset = FixedOffset::west_opt(3 * 3600 + 1800).unwrap();
        assert_eq!(format_offset(offset), "-03:30");
    }
}
