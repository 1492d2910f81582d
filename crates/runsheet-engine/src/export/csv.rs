//! CSV export: one header row, then one row per exported item.
//!
//! The first two columns are synthetic: `Scheduled` (RFC 3339 start with the
//! anchored offset) and `Estimate` (ISO 8601 length). The schedule's export
//! columns follow in order.

use ::csv::{Terminator, WriterBuilder};

use crate::error::{Result, RunsheetError};
use crate::model::{Column, Schedule};
use crate::sequence::Sequence;

use super::{format_instant, ExportOptions, Transformer};

/// Headers written ahead of the schedule's own columns.
pub const SYNTHETIC_HEADERS: [&str; 2] = ["Scheduled", "Estimate"];

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvTransformer;

impl Transformer for CsvTransformer {
    fn transform(&self, schedule: &Schedule, options: ExportOptions) -> Result<Vec<u8>> {
        let columns = schedule.export_columns(options.include_hidden);
        check_collisions(&columns)?;

        let sequence = Sequence::new(schedule)?;
        let mut writer = WriterBuilder::new()
            .terminator(Terminator::CRLF)
            .from_writer(Vec::new());

        let header = SYNTHETIC_HEADERS
            .iter()
            .copied()
            .chain(columns.iter().map(|c| c.name.as_str()));
        writer.write_record(header)?;

        for entry in sequence.entries(options.include_inactive) {
            let scheduled = format_instant(&entry.scheduled);
            let estimate = entry.item.length.to_iso_duration();
            let row = [scheduled.as_str(), estimate.as_str()]
                .into_iter()
                .chain(columns.iter().map(|c| entry.item.value(c.id)));
            writer.write_record(row)?;
        }

        writer
            .into_inner()
            .map_err(|e| RunsheetError::Encoding(format!("csv: {}", e.error())))
    }

    fn content_type(&self) -> &'static str {
        "text/csv; charset=utf-8"
    }

    fn file_extension(&self) -> &'static str {
        "csv"
    }
}

/// Reject user columns that would read as a synthetic header.
fn check_collisions(columns: &[&Column]) -> Result<()> {
    for column in columns {
        let name = column.name.trim();
        if let Some(header) = SYNTHETIC_HEADERS
            .iter()
            .find(|h| h.eq_ignore_ascii_case(name))
        {
            return Err(RunsheetError::ColumnNameCollision(format!(
                "column {} '{}' clashes with the '{header}' header",
                column.id, column.name
            )));
        }
    }
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────────────
