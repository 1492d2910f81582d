//! Schedule snapshots.
//!
//! These are plain values handed to the engine by whatever owns persistence.
//! Identities are opaque keys; there are no links back to a store, and the
//! engine never mutates a snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::anchor::{anchor_start, parse_timezone, AnchoredStart};
use crate::duration::ReadableTime;
use crate::error::Result;
use crate::sequence::Sequence;

// ── Identities ──────────────────────────────────────────────────────────────

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

opaque_id!(EventId);
opaque_id!(ScheduleId);
opaque_id!(ItemId);
opaque_id!(
    /// Key of a column; item cell values are keyed by it.
    ColumnId
);
opaque_id!(UserId);
opaque_id!(TeamId);

// ── Event ───────────────────────────────────────────────────────────────────

/// Who owns an event. Exactly one of a user or a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Owner {
    User(UserId),
    Team(TeamId),
}

/// The event a schedule belongs to. Only the fields schedules need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub slug: String,
    pub owner: Owner,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default)]
    pub max_schedules: u32,
}

impl Event {
    pub fn new(id: EventId, name: impl Into<String>, slug: impl Into<String>, owner: Owner) -> Self {
        Self {
            id,
            name: name.into(),
            slug: slug.into(),
            owner,
            website: None,
            twitter: None,
            twitch: None,
            youtube: None,
            theme: None,
            description: None,
            secret: None,
            max_schedules: 0,
        }
    }

    /// An event is public unless it carries a secret.
    pub fn is_public(&self) -> bool {
        non_empty(&self.secret).is_none()
    }

    pub fn website_host(&self) -> Option<String> {
        non_empty(&self.website).and_then(url_host)
    }
}

// ── Column ──────────────────────────────────────────────────────────────────

/// What a column is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Displayable item data.
    #[default]
    Normal,
    /// Carries per-item behavioral flags. Never displayed or exported as data.
    OptionsCarrier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub position: i32,
    pub name: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(id: ColumnId, position: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            position,
            name: name.into(),
            hidden: false,
            kind: ColumnKind::Normal,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn options_carrier(id: ColumnId, position: i32) -> Self {
        Self {
            id,
            position,
            name: String::new(),
            hidden: true,
            kind: ColumnKind::OptionsCarrier,
        }
    }

    pub fn is_options(&self) -> bool {
        self.kind == ColumnKind::OptionsCarrier
    }
}

// ── Item ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub position: u32,
    pub length: ReadableTime,
    /// Skipped items drop out of the active view but keep their time slot.
    #[serde(default)]
    pub skipped: bool,
    /// Sparse cell values. Missing keys render as empty cells.
    #[serde(default)]
    pub values: BTreeMap<ColumnId, String>,
}

impl Item {
    pub fn new(id: ItemId, position: u32, length: ReadableTime) -> Self {
        Self {
            id,
            position,
            length,
            skipped: false,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, column: ColumnId, value: impl Into<String>) -> Self {
        self.values.insert(column, value.into());
        self
    }

    pub fn skip(mut self) -> Self {
        self.skipped = true;
        self
    }

    /// The cell for `column`, or `""` when the item has none.
    pub fn value(&self, column: ColumnId) -> &str {
        self.values.get(&column).map(String::as_str).unwrap_or("")
    }
}

// ── Extra ───────────────────────────────────────────────────────────────────

/// Free-form extension data attached to a schedule.
///
/// Serialization is canonical: object keys are sorted at every depth, so
/// logically equal maps always produce the same bytes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Value>")]
pub struct Extra(BTreeMap<String, Value>);

impl Extra {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), canonicalize(value));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A custom text stored under `texts.<key>`.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get("texts")?.get(key)?.as_str()
    }

    /// Canonical JSON encoding.
    pub fn to_canonical_json(&self) -> String {
        // String keys and JSON values only; serialization cannot fail.
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

impl From<BTreeMap<String, Value>> for Extra {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(
            map.into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect(),
        )
    }
}

/// Sort object keys recursively.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map
                .into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().collect::<Map<String, Value>>())
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

// ── Schedule ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub name: String,
    pub slug: String,
    /// IANA zone name the civil `start` is expressed in.
    pub timezone: String,
    /// Civil wall-clock start, no offset.
    pub start: NaiveDateTime,
    /// Last edit, as UTC civil time.
    pub updated_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_time: Option<ReadableTime>,
    pub event: Event,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default, skip_serializing_if = "Extra::is_empty")]
    pub extra: Extra,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_secret: Option<String>,
    #[serde(default)]
    pub max_items: u32,
}

impl Schedule {
    /// A schedule with no items, no columns and no metadata beyond the
    /// required identity and timing fields.
    pub fn new(
        id: ScheduleId,
        event: Event,
        name: impl Into<String>,
        slug: impl Into<String>,
        timezone: impl Into<String>,
        start: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            slug: slug.into(),
            timezone: timezone.into(),
            start,
            updated_at: start,
            setup_time: None,
            event,
            columns: Vec::new(),
            items: Vec::new(),
            extra: Extra::new(),
            website: None,
            twitter: None,
            twitch: None,
            youtube: None,
            theme: None,
            description: None,
            secret: None,
            hidden_secret: None,
            max_items: 0,
        }
    }

    pub fn tz(&self) -> Result<Tz> {
        parse_timezone(&self.timezone)
    }

    // ── columns ─────────────────────────────────────────────────────────

    /// Non-hidden data columns in position order.
    pub fn visible_columns(&self) -> Vec<&Column> {
        self.export_columns(false)
    }

    /// Data columns in position order; hidden ones only when asked for.
    /// The options carrier is never included.
    pub fn export_columns(&self, include_hidden: bool) -> Vec<&Column> {
        let mut columns: Vec<&Column> = self
            .columns
            .iter()
            .filter(|c| !c.is_options() && (include_hidden || !c.hidden))
            .collect();
        columns.sort_by_key(|c| c.position);
        columns
    }

    pub fn options_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_options())
    }

    // ── items ───────────────────────────────────────────────────────────

    /// Items in position order.
    pub fn ordered_items(&self) -> Vec<&Item> {
        let mut items: Vec<&Item> = self.items.iter().collect();
        items.sort_by_key(|i| i.position);
        items
    }

    // ── timing ──────────────────────────────────────────────────────────

    pub fn anchored_start(&self) -> Result<AnchoredStart> {
        anchor_start(self.start, &self.timezone)
    }

    /// Start with the offset fixed at its civil time.
    pub fn local_start(&self) -> Result<DateTime<FixedOffset>> {
        Ok(self.anchored_start()?.instant())
    }

    pub fn utc_start(&self) -> Result<DateTime<Utc>> {
        Ok(self.anchored_start()?.to_utc())
    }

    /// When the last item ends.
    pub fn local_end(&self) -> Result<DateTime<FixedOffset>> {
        Ok(Sequence::new(self)?.end())
    }

    pub fn sequence(&self) -> Result<Sequence<'_>> {
        Sequence::new(self)
    }

    /// Whether any computed start falls off a full minute.
    pub fn needs_seconds(&self) -> Result<bool> {
        Ok(self
            .sequence()?
            .iter()
            .any(|entry| entry.scheduled.second() != 0))
    }

    pub fn updated_at_utc(&self) -> DateTime<Utc> {
        self.updated_at.and_utc()
    }

    /// `updated_at` as the schedule's zone shows it.
    pub fn local_updated_at(&self) -> Result<DateTime<Tz>> {
        Ok(self.updated_at_utc().with_timezone(&self.tz()?))
    }

    // ── access ──────────────────────────────────────────────────────────

    pub fn is_public(&self) -> bool {
        non_empty(&self.secret).is_none() && self.event.is_public()
    }

    /// Path to the schedule page without any access key.
    pub fn path(&self) -> String {
        format!("/{}/{}", self.event.slug, self.slug)
    }

    /// Path to the schedule page, carrying the widest access key available.
    pub fn link(&self) -> String {
        let mut url = self.path();
        if let Some(key) = non_empty(&self.event.secret).or_else(|| non_empty(&self.secret)) {
            url.push_str("?key=");
            url.push_str(key);
        }
        url
    }

    pub fn website_host(&self) -> Option<String> {
        non_empty(&self.website).and_then(url_host)
    }

    /// A custom text from the extension map.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.extra.text(key)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn url_host(url: &str) -> Option<String> {
    let rest = url.split_once("://").map(|(_, r)| r)?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);
    let host = host_port.split(':').next()?;
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
