//! The structural dump shared by the JSON and XML exports.
//!
//! Both hierarchical formats are renderings of one [`ScheduleDocument`].
//! Each format also decodes back into it, which is what makes the two
//! formats interchangeable: decoding either export of a schedule yields the
//! same document.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::ReadableTime;
use crate::error::{Result, RunsheetError};
use crate::model::Schedule;
use crate::sequence::Sequence;

use super::ExportOptions;

/// Document layout version.
pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDocument {
    pub meta: DocumentMeta,
    pub schedule: ScheduleData,
}

/// How the document was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub version: u32,
    pub hidden_columns: bool,
    pub inactive_items: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleData {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub timezone: String,
    #[serde(with = "instant")]
    pub start: DateTime<FixedOffset>,
    pub start_t: i64,
    #[serde(with = "instant")]
    pub end: DateTime<FixedOffset>,
    pub end_t: i64,
    pub setup: Option<String>,
    pub setup_t: Option<u64>,
    #[serde(with = "instant")]
    pub updated: DateTime<FixedOffset>,
    pub url: String,
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub twitch: Option<String>,
    pub youtube: Option<String>,
    pub description: Option<String>,
    pub event: EventData,
    pub columns: Vec<ColumnData>,
    pub items: Vec<ItemData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub twitch: Option<String>,
    pub youtube: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnData {
    pub id: u64,
    pub position: i32,
    pub name: String,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemData {
    pub id: u64,
    /// ISO 8601 duration.
    pub length: String,
    pub length_t: u64,
    #[serde(with = "instant")]
    pub scheduled: DateTime<FixedOffset>,
    pub scheduled_t: i64,
    pub skipped: bool,
    /// One cell per entry of [`ScheduleData::columns`], in the same order.
    pub data: Vec<String>,
}

impl ScheduleDocument {
    /// Sequence `schedule` and collect everything the hierarchical exports show.
    ///
    /// # Errors
    ///
    /// Fails if the schedule's timezone cannot be resolved or its items run
    /// past the representable datetime range.
    pub fn build(schedule: &Schedule, options: ExportOptions) -> Result<Self> {
        let sequence = Sequence::new(schedule)?;
        let columns = schedule.export_columns(options.include_hidden);
        let start = sequence.anchor().instant();
        let end = sequence.end();
        let updated = schedule.updated_at_utc().fixed_offset();

        let items = sequence
            .entries(options.include_inactive)
            .into_iter()
            .map(|entry| ItemData {
                id: entry.item.id.0,
                length: entry.item.length.to_iso_duration(),
                length_t: entry.item.length.to_seconds(),
                scheduled: entry.scheduled,
                scheduled_t: entry.scheduled.timestamp(),
                skipped: entry.item.skipped,
                data: columns
                    .iter()
                    .map(|c| clean(entry.item.value(c.id)))
                    .collect(),
            })
            .collect();

        let event = &schedule.event;

        Ok(Self {
            meta: DocumentMeta {
                version: DOCUMENT_VERSION,
                hidden_columns: options.include_hidden,
                inactive_items: options.include_inactive,
            },
            schedule: ScheduleData {
                id: schedule.id.0,
                name: clean(&schedule.name),
                slug: clean(&schedule.slug),
                timezone: clean(&schedule.timezone),
                start,
                start_t: start.timestamp(),
                end,
                end_t: end.timestamp(),
                setup: schedule.setup_time.map(|t| t.to_iso_duration()),
                setup_t: schedule.setup_time.map(|t| t.to_seconds()),
                updated,
                url: clean(&schedule.path()),
                website: text(&schedule.website),
                twitter: text(&schedule.twitter),
                twitch: text(&schedule.twitch),
                youtube: text(&schedule.youtube),
                description: text(&schedule.description),
                event: EventData {
                    id: event.id.0,
                    name: clean(&event.name),
                    slug: clean(&event.slug),
                    website: text(&event.website),
                    twitter: text(&event.twitter),
                    twitch: text(&event.twitch),
                    youtube: text(&event.youtube),
                    description: text(&event.description),
                },
                columns: columns
                    .iter()
                    .map(|c| ColumnData {
                        id: c.id.0,
                        position: c.position,
                        name: clean(&c.name),
                        hidden: c.hidden,
                    })
                    .collect(),
                items,
            },
        })
    }

    /// Check that every ISO duration agrees with its seconds count. Both
    /// decoders run this before handing a document out.
    pub(crate) fn validate(self) -> Result<Self> {
        let data = &self.schedule;
        for item in &data.items {
            check_duration(&item.length, item.length_t)?;
        }
        match (&data.setup, data.setup_t) {
            (Some(setup), Some(seconds)) => check_duration(setup, seconds)?,
            (None, None) => {}
            _ => {
                return Err(RunsheetError::InvalidDocument(
                    "setup and setup_t must be present together".to_string(),
                ))
            }
        }
        Ok(self)
    }

    /// Start instants of the exported items, in order.
    pub fn scheduled(&self) -> Vec<DateTime<Utc>> {
        self.schedule
            .items
            .iter()
            .map(|i| i.scheduled.with_timezone(&Utc))
            .collect()
    }
}

fn check_duration(iso: &str, seconds: u64) -> Result<()> {
    let parsed = ReadableTime::parse_iso_duration(iso)
        .map_err(|e| RunsheetError::InvalidDocument(e.to_string()))?;
    if parsed.to_seconds() != seconds {
        return Err(RunsheetError::InvalidDocument(format!(
            "duration '{iso}' disagrees with {seconds} seconds"
        )));
    }
    Ok(())
}

/// Optional metadata text: blank counts as absent.
fn text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(clean)
}

/// Replace characters XML 1.0 cannot carry with U+FFFD, so both
/// hierarchical formats hold the same text.
fn clean(value: &str) -> String {
    value
        .chars()
        .map(|c| if xml_char(c) { c } else { char::REPLACEMENT_CHARACTER })
        .collect()
}

fn xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// RFC 3339 (de)serialization that keeps the offset and whole seconds.
pub(crate) mod instant {
    use chrono::{DateTime, FixedOffset};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<FixedOffset>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::super::format_instant(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<FixedOffset>, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s).map_err(serde::de::Error::custom)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
