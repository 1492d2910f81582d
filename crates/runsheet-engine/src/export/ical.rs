//! iCalendar (RFC 5545) export.
//!
//! One `VEVENT` per exported item. Start times are written in UTC, so the
//! calendar needs no `VTIMEZONE`; `X-WR-TIMEZONE` tells clients which zone
//! the schedule is planned in.

use chrono::{DateTime, TimeZone};

use crate::error::Result;
use crate::model::{Column, Schedule};
use crate::sequence::{ScheduledItem, Sequence};

use super::{ExportOptions, Transformer};

pub const PRODID: &str = "-//runsheet//runsheet-engine//EN";

/// Maximum content line length in octets, excluding the line break.
const MAX_LINE_OCTETS: usize = 75;

#[derive(Debug, Clone, Copy, Default)]
pub struct IcalTransformer;

impl Transformer for IcalTransformer {
    fn transform(&self, schedule: &Schedule, options: ExportOptions) -> Result<Vec<u8>> {
        let sequence = Sequence::new(schedule)?;
        let columns = schedule.export_columns(options.include_hidden);
        let dtstamp = format_utc(&schedule.updated_at_utc());
        let domain = format!("{}.{}", schedule.event.slug, schedule.slug);

        let mut out = Calendar::default();
        out.line("BEGIN", "VCALENDAR");
        out.line("VERSION", "2.0");
        out.line("PRODID", PRODID);
        out.line("CALSCALE", "GREGORIAN");
        out.line("METHOD", "PUBLISH");
        out.line("X-WR-CALNAME", &escape_text(&schedule.name));
        out.line("X-WR-TIMEZONE", &escape_text(&schedule.timezone));

        for entry in sequence.entries(options.include_inactive) {
            out.line("BEGIN", "VEVENT");
            out.line("UID", &format!("{}@{domain}", entry.item.id));
            out.line("DTSTAMP", &dtstamp);
            out.line("DTSTART", &format_utc(&entry.scheduled));
            out.line("DURATION", &entry.item.length.to_iso_duration());
            out.line("SUMMARY", &escape_text(&summary(&entry, &columns)));
            if let Some(description) = description(&entry, &columns) {
                out.line("DESCRIPTION", &escape_text(&description));
            }
            if entry.item.skipped {
                out.line("STATUS", "CANCELLED");
            }
            out.line("END", "VEVENT");
        }

        out.line("END", "VCALENDAR");
        Ok(out.into_bytes())
    }

    fn content_type(&self) -> &'static str {
        "text/calendar; charset=utf-8"
    }

    fn file_extension(&self) -> &'static str {
        "ics"
    }
}

/// Content lines, folded and CRLF-terminated as they are added.
#[derive(Debug, Default)]
struct Calendar {
    buf: String,
}

impl Calendar {
    fn line(&mut self, name: &str, value: &str) {
        let line = format!("{name}:{value}");
        self.buf.push_str(&fold_line(&line));
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buf.into_bytes()
    }
}

/// `YYYYMMDDTHHMMSSZ`
fn format_utc<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    instant.naive_utc().format("%Y%m%dT%H%M%SZ").to_string()
}

/// The first export column's value, or `Item N` when it is blank.
fn summary(entry: &ScheduledItem<'_>, columns: &[&Column]) -> String {
    columns
        .first()
        .map(|c| entry.item.value(c.id).trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Item {}", entry.index + 1))
}

/// `Name: value` lines for the remaining export columns, skipping blanks.
fn description(entry: &ScheduledItem<'_>, columns: &[&Column]) -> Option<String> {
    let lines: Vec<String> = columns
        .iter()
        .skip(1)
        .filter_map(|c| {
            let value = entry.item.value(c.id).trim();
            (!value.is_empty()).then(|| format!("{}: {value}", c.name))
        })
        .collect();

    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Escape a TEXT value (RFC 5545 §3.3.11).
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\\n");
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

/// Fold a content line at 75 octets (RFC 5545 §3.1) and terminate it with
/// CRLF. Continuation lines start with a single space, which counts toward
/// their length. Multi-octet characters are never split.
pub fn fold_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3 + 2);
    let mut width = 0;

    for c in line.chars() {
        let len = c.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(c);
        width += len;
    }

    out.push_str("\r\n");
    out
}

// ── Tests ───────────────────────────────────────────────────────────────────
