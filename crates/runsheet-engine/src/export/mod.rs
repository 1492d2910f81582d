//! Schedule exports.
//!
//! One stateless [`Transformer`] per format turns a schedule snapshot into
//! bytes. [`ExportFormat`] is the only way to pick one: format tokens are
//! parsed (case-insensitively) before any encoder runs, so an unknown token
//! never produces partial output.
//!
//! | token  | content type                   | extension |
//! |--------|--------------------------------|-----------|
//! | `json` | `application/json`             | `json`    |
//! | `xml`  | `application/xml`              | `xml`     |
//! | `csv`  | `text/csv; charset=utf-8`      | `csv`     |
//! | `ical` | `text/calendar; charset=utf-8` | `ics`     |
//!
//! Every encoder is deterministic: the same snapshot always yields the same
//! bytes. The only timestamp embedded besides computed starts is the
//! schedule's own `updated_at`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RunsheetError};
use crate::model::Schedule;

pub mod csv;
pub mod document;
pub mod ical;
pub mod json;
pub mod xml;

pub use document::{ColumnData, DocumentMeta, EventData, ItemData, ScheduleData, ScheduleDocument};

/// Which parts of a schedule an export includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Export hidden columns too. The options carrier is never exported.
    #[serde(default)]
    pub include_hidden: bool,
    /// Export skipped items too.
    #[serde(default = "default_include_inactive")]
    pub include_inactive: bool,
}

fn default_include_inactive() -> bool {
    true
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_hidden: false,
            include_inactive: default_include_inactive(),
        }
    }
}

/// A format encoder.
pub trait Transformer: Send + Sync {
    /// Encode `schedule`.
    ///
    /// # Errors
    ///
    /// Fails on an unresolvable schedule timezone, on format-specific
    /// conflicts (see [`RunsheetError::ColumnNameCollision`]) and on writer
    /// failures.
    fn transform(&self, schedule: &Schedule, options: ExportOptions) -> Result<Vec<u8>>;

    fn content_type(&self) -> &'static str;

    fn file_extension(&self) -> &'static str;
}

/// The supported export formats.
///
/// Serializes as its lowercase token and deserializes through [`FromStr`],
/// so config files accept the same case-insensitive tokens as the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExportFormat {
    Json,
    Xml,
    Csv,
    Ical,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Json,
        ExportFormat::Xml,
        ExportFormat::Csv,
        ExportFormat::Ical,
    ];

    /// The token that selects this format.
    pub fn token(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Xml => "xml",
            ExportFormat::Csv => "csv",
            ExportFormat::Ical => "ical",
        }
    }

    pub fn transformer(&self) -> &'static dyn Transformer {
        match self {
            ExportFormat::Json => &self::json::JsonTransformer,
            ExportFormat::Xml => &self::xml::XmlTransformer,
            ExportFormat::Csv => &self::csv::CsvTransformer,
            ExportFormat::Ical => &self::ical::IcalTransformer,
        }
    }

    pub fn content_type(&self) -> &'static str {
        self.transformer().content_type()
    }

    pub fn file_extension(&self) -> &'static str {
        self.transformer().file_extension()
    }
}

impl FromStr for ExportFormat {
    type Err = RunsheetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "xml" => Ok(ExportFormat::Xml),
            "csv" => Ok(ExportFormat::Csv),
            "ical" => Ok(ExportFormat::Ical),
            _ => Err(RunsheetError::UnsupportedFormat(format!(
                "'{s}' (expected one of json, xml, csv, ical)"
            ))),
        }
    }
}

impl TryFrom<String> for ExportFormat {
    type Error = RunsheetError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ExportFormat> for String {
    fn from(value: ExportFormat) -> Self {
        value.token().to_string()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// An encoded schedule, ready to be served or written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub body: Vec<u8>,
    pub content_type: &'static str,
    pub file_extension: &'static str,
    /// `{event_slug}-{schedule_slug}.{extension}`
    pub filename: String,
}

/// Encode `schedule` in `format`.
///
/// ```
/// use chrono::NaiveDate;
/// use runsheet_engine::{export, Event, EventId, ExportFormat, ExportOptions, Owner, Schedule, ScheduleId, UserId};
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(10, 0, 0).unwrap();
/// let event = Event::new(EventId(1), "Marathon", "marathon", Owner::User(UserId(1)));
/// let schedule = Schedule::new(ScheduleId(1), event, "Day 1", "day-1", "UTC", start);
///
/// let format: ExportFormat = "ICAL".parse().unwrap();
/// let out = export(&schedule, format, ExportOptions::default()).unwrap();
/// assert_eq!(out.filename, "marathon-day-1.ics");
/// assert!(out.content_type.starts_with("text/calendar"));
/// ```
///
/// # Errors
///
/// Propagates the encoder's error; nothing is returned on failure.
pub fn export(schedule: &Schedule, format: ExportFormat, options: ExportOptions) -> Result<Export> {
    let transformer = format.transformer();
    let body = transformer.transform(schedule, options)?;

    tracing::debug!(
        schedule = %schedule.id,
        format = %format,
        bytes = body.len(),
        include_hidden = options.include_hidden,
        include_inactive = options.include_inactive,
        "exported schedule"
    );

    Ok(Export {
        body,
        content_type: transformer.content_type(),
        file_extension: transformer.file_extension(),
        filename: filename(&schedule.event.slug, &schedule.slug, transformer.file_extension()),
    })
}

/// Parse `token` and encode `schedule`.
///
/// # Errors
///
/// Returns [`RunsheetError::UnsupportedFormat`] for unknown tokens, before
/// any encoding work, or the encoder's error.
pub fn export_as(schedule: &Schedule, token: &str, options: ExportOptions) -> Result<Export> {
    let format = token.parse::<ExportFormat>()?;
    export(schedule, format, options)
}

/// `{event_slug}-{schedule_slug}.{extension}`
pub fn filename(event_slug: &str, schedule_slug: &str, extension: &str) -> String {
    format!("{event_slug}-{schedule_slug}.{extension}")
}

/// RFC 3339 with whole seconds and the instant's own offset.
pub(crate) fn format_instant(instant: &DateTime<FixedOffset>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, false)
}

// ── Tests ───────────────────────────────────────────────────────────────────
