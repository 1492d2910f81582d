//! XML export: the [`ScheduleDocument`] as elements, with identity data
//! (ids, slugs, positions, flags) in attributes.
//!
//! ```xml
//! <export version="1" hidden-columns="false" inactive-items="true">
//!   <schedule id="5" slug="night">
//!     <name>Night</name>
//!     ...
//!     <columns>
//!       <column id="1" position="1" hidden="false">Description</column>
//!     </columns>
//!     <items>
//!       <item id="1" skipped="false">
//!         <length>PT2H</length>
//!         ...
//!         <data>
//!           <value>Opening</value>
//!         </data>
//!       </item>
//!     </items>
//!   </schedule>
//! </export>
//! ```
//!
//! Optional fields that are absent are left out entirely. Carriage returns
//! are written as character references so that parsers which normalize line
//! endings still read them back.

use chrono::{DateTime, FixedOffset};
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Result, RunsheetError};
use crate::model::Schedule;

use super::document::{ColumnData, DocumentMeta, EventData, ItemData, ScheduleData, ScheduleDocument};
use super::{format_instant, ExportOptions, Transformer};

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlTransformer;

impl Transformer for XmlTransformer {
    fn transform(&self, schedule: &Schedule, options: ExportOptions) -> Result<Vec<u8>> {
        let document = ScheduleDocument::build(schedule, options)?;
        encode(&document)
    }

    fn content_type(&self) -> &'static str {
        "application/xml"
    }

    fn file_extension(&self) -> &'static str {
        "xml"
    }
}

// ── Encoding ────────────────────────────────────────────────────────────────

/// Indented XML with a declaration and a trailing newline.
pub fn encode(document: &ScheduleDocument) -> Result<Vec<u8>> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let meta = &document.meta;
    let version = meta.version.to_string();
    open(
        &mut w,
        "export",
        &[
            ("version", version.as_str()),
            ("hidden-columns", bool_str(meta.hidden_columns)),
            ("inactive-items", bool_str(meta.inactive_items)),
        ],
    )?;
    write_schedule(&mut w, &document.schedule)?;
    close(&mut w, "export")?;

    let mut body = w.into_inner();
    body.push(b'\n');
    Ok(body)
}

fn write_schedule(w: &mut Writer<Vec<u8>>, s: &ScheduleData) -> Result<()> {
    let id = s.id.to_string();
    open(w, "schedule", &[("id", id.as_str()), ("slug", s.slug.as_str())])?;

    leaf(w, "name", &s.name)?;
    leaf(w, "timezone", &s.timezone)?;
    leaf(w, "start", &format_instant(&s.start))?;
    leaf(w, "start_t", &s.start_t.to_string())?;
    leaf(w, "end", &format_instant(&s.end))?;
    leaf(w, "end_t", &s.end_t.to_string())?;
    optional_leaf(w, "setup", s.setup.as_deref())?;
    optional_leaf(w, "setup_t", s.setup_t.map(|t| t.to_string()).as_deref())?;
    leaf(w, "updated", &format_instant(&s.updated))?;
    leaf(w, "url", &s.url)?;
    optional_leaf(w, "website", s.website.as_deref())?;
    optional_leaf(w, "twitter", s.twitter.as_deref())?;
    optional_leaf(w, "twitch", s.twitch.as_deref())?;
    optional_leaf(w, "youtube", s.youtube.as_deref())?;
    optional_leaf(w, "description", s.description.as_deref())?;

    write_event(w, &s.event)?;

    open(w, "columns", &[])?;
    for column in &s.columns {
        let id = column.id.to_string();
        let position = column.position.to_string();
        open(
            w,
            "column",
            &[
                ("id", id.as_str()),
                ("position", position.as_str()),
                ("hidden", bool_str(column.hidden)),
            ],
        )?;
        write_text(w, &column.name)?;
        close(w, "column")?;
    }
    close(w, "columns")?;

    open(w, "items", &[])?;
    for item in &s.items {
        write_item(w, item)?;
    }
    close(w, "items")?;

    close(w, "schedule")
}

fn write_event(w: &mut Writer<Vec<u8>>, e: &EventData) -> Result<()> {
    let id = e.id.to_string();
    open(w, "event", &[("id", id.as_str()), ("slug", e.slug.as_str())])?;
    leaf(w, "name", &e.name)?;
    optional_leaf(w, "website", e.website.as_deref())?;
    optional_leaf(w, "twitter", e.twitter.as_deref())?;
    optional_leaf(w, "twitch", e.twitch.as_deref())?;
    optional_leaf(w, "youtube", e.youtube.as_deref())?;
    optional_leaf(w, "description", e.description.as_deref())?;
    close(w, "event")
}

fn write_item(w: &mut Writer<Vec<u8>>, item: &ItemData) -> Result<()> {
    let id = item.id.to_string();
    open(w, "item", &[("id", id.as_str()), ("skipped", bool_str(item.skipped))])?;
    leaf(w, "length", &item.length)?;
    leaf(w, "length_t", &item.length_t.to_string())?;
    leaf(w, "scheduled", &format_instant(&item.scheduled))?;
    leaf(w, "scheduled_t", &item.scheduled_t.to_string())?;
    open(w, "data", &[])?;
    for value in &item.data {
        leaf(w, "value", value)?;
    }
    close(w, "data")?;
    close(w, "item")
}

fn open(w: &mut Writer<Vec<u8>>, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
    let mut start = BytesStart::new(name);
    for (key, value) in attributes {
        let value = escaped(value, true);
        start.push_attribute((key.as_bytes(), value.as_bytes()));
    }
    w.write_event(Event::Start(start))?;
    Ok(())
}

fn close(w: &mut Writer<Vec<u8>>, name: &str) -> Result<()> {
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn leaf(w: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    open(w, name, &[])?;
    write_text(w, text)?;
    close(w, name)
}

fn write_text(w: &mut Writer<Vec<u8>>, text: &str) -> Result<()> {
    w.write_event(Event::Text(BytesText::from_escaped(escaped(text, false))))?;
    Ok(())
}

/// Markup-escape `value`; whitespace a reader would normalize becomes a
/// character reference (`\r` always, `\n` and `\t` inside attributes).
fn escaped(value: &str, in_attribute: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for c in escape(value).chars() {
        match c {
            '\r' => out.push_str("&#13;"),
            '\n' if in_attribute => out.push_str("&#10;"),
            '\t' if in_attribute => out.push_str("&#9;"),
            c => out.push(c),
        }
    }
    out
}

fn optional_leaf(w: &mut Writer<Vec<u8>>, name: &str, text: Option<&str>) -> Result<()> {
    match text {
        Some(text) => leaf(w, name, text),
        None => Ok(()),
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

// ── Decoding ────────────────────────────────────────────────────────────────

/// A parsed element: attributes, child elements and its own text.
#[derive(Debug, Default)]
struct Node {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
    text: String,
}

impl Node {
    fn attr(&self, key: &str) -> Result<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| invalid(format!("<{}> lacks attribute '{key}'", self.name)))
    }

    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    fn required(&self, name: &str) -> Result<&Node> {
        self.child(name)
            .ok_or_else(|| invalid(format!("<{}> lacks <{name}>", self.name)))
    }

    fn text_of(&self, name: &str) -> Result<String> {
        Ok(self.required(name)?.text.clone())
    }

    fn optional_text(&self, name: &str) -> Option<String> {
        self.child(name).map(|c| c.text.clone())
    }

    fn children_named<'n>(&'n self, name: &'n str) -> impl Iterator<Item = &'n Node> + 'n {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// Read an XML export back.
///
/// # Errors
///
/// Returns [`RunsheetError::InvalidDocument`] if `body` is not well-formed
/// or is not a schedule document.
pub fn decode(body: &[u8]) -> Result<ScheduleDocument> {
    let root = parse_tree(body)?;
    if root.name != "export" {
        return Err(invalid(format!("root element is <{}>, expected <export>", root.name)));
    }

    let meta = DocumentMeta {
        version: parse_number(root.attr("version")?, "version")?,
        hidden_columns: parse_bool(root.attr("hidden-columns")?)?,
        inactive_items: parse_bool(root.attr("inactive-items")?)?,
    };

    let s = root.required("schedule")?;
    let e = s.required("event")?;

    let event = EventData {
        id: parse_number(e.attr("id")?, "event id")?,
        name: e.text_of("name")?,
        slug: e.attr("slug")?.to_string(),
        website: e.optional_text("website"),
        twitter: e.optional_text("twitter"),
        twitch: e.optional_text("twitch"),
        youtube: e.optional_text("youtube"),
        description: e.optional_text("description"),
    };

    let columns = s
        .required("columns")?
        .children_named("column")
        .map(|c| {
            Ok(ColumnData {
                id: parse_number(c.attr("id")?, "column id")?,
                position: parse_number(c.attr("position")?, "column position")?,
                name: c.text.clone(),
                hidden: parse_bool(c.attr("hidden")?)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let items = s
        .required("items")?
        .children_named("item")
        .map(|i| {
            Ok(ItemData {
                id: parse_number(i.attr("id")?, "item id")?,
                length: i.text_of("length")?,
                length_t: parse_number(&i.text_of("length_t")?, "length_t")?,
                scheduled: parse_instant(&i.text_of("scheduled")?)?,
                scheduled_t: parse_number(&i.text_of("scheduled_t")?, "scheduled_t")?,
                skipped: parse_bool(i.attr("skipped")?)?,
                data: i
                    .required("data")?
                    .children_named("value")
                    .map(|v| v.text.clone())
                    .collect(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let schedule = ScheduleData {
        id: parse_number(s.attr("id")?, "schedule id")?,
        name: s.text_of("name")?,
        slug: s.attr("slug")?.to_string(),
        timezone: s.text_of("timezone")?,
        start: parse_instant(&s.text_of("start")?)?,
        start_t: parse_number(&s.text_of("start_t")?, "start_t")?,
        end: parse_instant(&s.text_of("end")?)?,
        end_t: parse_number(&s.text_of("end_t")?, "end_t")?,
        setup: s.optional_text("setup"),
        setup_t: s
            .optional_text("setup_t")
            .map(|t| parse_number(&t, "setup_t"))
            .transpose()?,
        updated: parse_instant(&s.text_of("updated")?)?,
        url: s.text_of("url")?,
        website: s.optional_text("website"),
        twitter: s.optional_text("twitter"),
        twitch: s.optional_text("twitch"),
        youtube: s.optional_text("youtube"),
        description: s.optional_text("description"),
        event,
        columns,
        items,
    };

    ScheduleDocument { meta, schedule }.validate()
}

fn parse_tree(body: &[u8]) -> Result<Node> {
    let mut reader = Reader::from_reader(body);
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader.read_event().map_err(|e| invalid(format!("xml: {e}")))? {
            Event::Start(start) => stack.push(node_from(&start)?),
            Event::Empty(start) => {
                let node = node_from(&start)?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| invalid("unbalanced closing tag".to_string()))?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let text = text.unescape().map_err(|e| invalid(format!("xml: {e}")))?;
                    current.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    let raw = std::str::from_utf8(data.as_ref())
                        .map_err(|e| invalid(format!("xml: {e}")))?;
                    current.text.push_str(raw);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(invalid("unclosed elements at end of input".to_string()));
    }
    root.ok_or_else(|| invalid("no root element".to_string()))
}

fn node_from(start: &BytesStart<'_>) -> Result<Node> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| invalid(format!("xml: {e}")))?
        .to_string();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| invalid(format!("xml: {e}")))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| invalid(format!("xml: {e}")))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| invalid(format!("xml: {e}")))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(Node {
        name,
        attributes,
        ..Node::default()
    })
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(invalid("more than one root element".to_string())),
    }
    Ok(())
}

fn parse_instant(s: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).map_err(|e| invalid(format!("bad timestamp '{s}': {e}")))
}

fn parse_number<T: std::str::FromStr>(s: &str, what: &str) -> Result<T> {
    s.trim()
        .parse()
        .map_err(|_| invalid(format!("bad {what} '{s}'")))
}

fn parse_bool(s: &str) -> Result<bool> {
    match s {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(invalid(format!("bad flag '{other}'"))),
    }
}

fn invalid(message: String) -> RunsheetError {
    RunsheetError::InvalidDocument(message)
}

// ── Tests ───────────────────────────────────────────────────────────────────
