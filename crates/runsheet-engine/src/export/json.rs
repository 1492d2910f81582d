//! JSON export: the [`ScheduleDocument`] as a nested key/value tree.

use crate::error::{Result, RunsheetError};
use crate::model::Schedule;

use super::document::ScheduleDocument;
use super::{ExportOptions, Transformer};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTransformer;

impl Transformer for JsonTransformer {
    fn transform(&self, schedule: &Schedule, options: ExportOptions) -> Result<Vec<u8>> {
        let document = ScheduleDocument::build(schedule, options)?;
        encode(&document)
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }
}

/// Pretty-printed JSON with a trailing newline.
pub fn encode(document: &ScheduleDocument) -> Result<Vec<u8>> {
    let mut body = serde_json::to_vec_pretty(document)
        .map_err(|e| RunsheetError::Encoding(format!("json: {e}")))?;
    body.push(b'\n');
    Ok(body)
}

/// Read a JSON export back.
///
/// # Errors
///
/// Returns [`RunsheetError::InvalidDocument`] if `body` is not a schedule
/// document.
pub fn decode(body: &[u8]) -> Result<ScheduleDocument> {
    serde_json::from_slice::<ScheduleDocument>(body)
        .map_err(|e| RunsheetError::InvalidDocument(format!("json: {e}")))?
        .validate()
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::ReadableTime;
    use crate::model::{Column, ColumnId, Event, EventId, Item, ItemId, Owner, ScheduleId, TeamId};
    use chrono::NaiveDate;
    use serde_json::Value;

    fn schedule() -> Schedule {
        let start = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(1, 30, 0)
            .unwrap();
        let event = Event::new(EventId(4), "Spring Event", "spring", Owner::Team(TeamId(2)));
        let mut s = Schedule::new(ScheduleId(5), event, "Night", "night", "America/New_York", start);
        s.columns = vec![Column::new(ColumnId(1), 1, "Description")];
        s.items = vec![
            Item::new(ItemId(1), 1, ReadableTime::new(2, 0, 0).unwrap())
                .with_value(ColumnId(1), "Quote \" and \\ backslash"),
            Item::new(ItemId(2), 2, ReadableTime::new(2, 0, 0).unwrap()),
        ];
        s
    }

    #[test]
    fn test_json_layout() {
        let body = JsonTransformer
            .transform(&schedule(), ExportOptions::default())
            .unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(value["meta"]["version"], 1);
        assert_eq!(value["schedule"]["start"], "2024-03-10T01:30:00-05:00");
        assert_eq!(value["schedule"]["items"][1]["scheduled"], "2024-03-10T03:30:00-05:00");
        assert_eq!(value["schedule"]["items"][1]["length"], "PT2H");
        assert_eq!(value["schedule"]["items"][1]["length_t"], 7200);
        assert_eq!(value["schedule"]["items"][1]["data"][0], "");
        assert_eq!(value["schedule"]["columns"][0]["name"], "Description");
        assert_eq!(value["schedule"]["setup"], Value::Null);
        assert_eq!(value["schedule"]["event"]["slug"], "spring");
    }

    #[test]
    fn test_json_keeps_field_order() {
        let body = JsonTransformer
            .transform(&schedule(), ExportOptions::default())
            .unwrap();
        let text = String::from_utf8(body).unwrap();
        let meta = text.find("\"meta\"").unwrap();
        let sched = text.find("\"schedule\"").unwrap();
        assert!(meta < sched);
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_json_decode_round_trip() {
        let body = JsonTransformer
            .transform(&schedule(), ExportOptions::default())
            .unwrap();
        let decoded = decode(&body).unwrap();
        let expected = ScheduleDocument::build(&schedule(), ExportOptions::default()).unwrap();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_json_decode_checks_lengths() {
        let body = JsonTransformer
            .transform(&schedule(), ExportOptions::default())
            .unwrap();
        let text = String::from_utf8(body).unwrap().replacen("\"PT2H\"", "\"PT3H\"", 1);
        let err = decode(text.as_bytes()).unwrap_err();
        assert!(matches!(err, RunsheetError::InvalidDocument(_)));
    }

    #[test]
    fn test_json_decode_rejects_other_documents() {
        let err = decode(br#"{"hello": "world"}"#).unwrap_err();
        assert!(matches!(err, RunsheetError::InvalidDocument(_)));
    }
}
