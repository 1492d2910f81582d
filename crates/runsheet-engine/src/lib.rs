//! # runsheet-engine
//!
//! Deterministic timing for event run sheets.
//!
//! A schedule is a list of items with lengths, started at a civil date and
//! time in an IANA timezone. The engine anchors that start to a fixed UTC
//! offset, walks the items to compute every start instant, and exports the
//! result as iCalendar, CSV, JSON or XML. The same snapshot always produces
//! the same bytes.
//!
//! ## Modules
//!
//! - [`duration`]: `H:MM:SS` item lengths, ISO 8601 durations
//! - [`anchor`]: civil start + timezone to a fixed-offset instant (DST gaps and overlaps)
//! - [`model`]: schedule, event, column and item snapshots
//! - [`sequence`]: item start times, skip handling, schedule end
//! - [`export`]: format dispatch and the iCal/CSV/JSON/XML encoders
//! - [`error`]: error types

pub mod anchor;
pub mod duration;
pub mod error;
pub mod export;
pub mod model;
pub mod sequence;

pub use anchor::{anchor_start, format_offset, parse_timezone, to_timezone, AnchorInfo, AnchoredStart};
pub use duration::{CalendarInterval, ReadableTime};
pub use error::{Result, RunsheetError};
pub use export::{
    export, export_as, Export, ExportFormat, ExportOptions, ScheduleDocument, Transformer,
};
pub use model::{
    Column, ColumnId, ColumnKind, Event, EventId, Extra, Item, ItemId, Owner, Schedule,
    ScheduleId, TeamId, UserId,
};
pub use sequence::{ScheduledItem, ScheduledItems, Sequence};
