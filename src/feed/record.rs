//! Raw catalog records
//!
//! Streams an arbitrary XML document and collects every `<item>` element, at any
//! nesting depth, in document order (by start tag). Each record keeps the direct
//! text of the first child element of every name it carries.

use crate::error::AppError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::collections::HashMap;

/// Element name that marks a catalog record
pub const ITEM_TAG: &str = "item";

/// A catalog record as found in the input document
///
/// Read-only view over named child fields. A field may be absent or empty;
/// interpreting that is the field mapper's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: HashMap<String, String>,
    defect: Option<String>,
}

impl RawRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper for constructing records by hand
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_first(name.into(), value.into());
        self
    }

    /// Text of the named child field, if the element was present
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Why this record could not be read intact, if it could not
    pub fn defect(&self) -> Option<&str> {
        self.defect.as_deref()
    }

    fn insert_first(&mut self, name: String, value: String) {
        self.fields.entry(name).or_insert(value);
    }

    fn mark_defective(&mut self, reason: String) {
        if self.defect.is_none() {
            self.defect = Some(reason);
        }
    }
}

/// All catalog records of one input document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDocument {
    records: Vec<RawRecord>,
}

/// Text captured for a field element that sits directly under an item
struct FieldCapture {
    record: usize,
    name: String,
    text: String,
    saw_child: bool,
}

/// One open element on the parse stack
struct Frame {
    name: String,
    /// Record opened by this element, if it is an item
    item: Option<usize>,
    /// Innermost record this element belongs to
    enclosing: Option<usize>,
    field: Option<FieldCapture>,
}

impl RawDocument {
    /// Build a document from already-extracted records
    pub fn from_records(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    /// Records in document order
    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    /// Parse XML bytes and extract every item record
    ///
    /// # Returns
    /// * `Ok(RawDocument)` - Records in document order (possibly none)
    /// * `Err(AppError::ParseFailed)` - If the bytes are not a well-formed document
    ///
    /// Text is decoded through the encoding named in the XML declaration. Text that
    /// cannot be decoded, or that holds a character XML 1.0 forbids, marks only the
    /// enclosing record as defective; outside any item it fails the whole document.
    pub fn parse(bytes: &[u8]) -> Result<Self, AppError> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut records: Vec<RawRecord> = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut root_closed = false;
        let mut root_seen = false;

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| {
                AppError::ParseFailed(format!("{} at position {}", e, reader.buffer_position()))
            })?;

            match event {
                Event::Start(e) | Event::Empty(e) if root_closed => {
                    return Err(AppError::ParseFailed(format!(
                        "junk after document element: <{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    )));
                }
                Event::Start(e) => {
                    root_seen = true;
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    open_element(&mut stack, &mut records, name);
                }
                Event::Empty(e) => {
                    root_seen = true;
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    open_element(&mut stack, &mut records, name);
                    root_closed = close_element(&mut stack, &mut records)?;
                }
                Event::End(_) => {
                    root_closed = close_element(&mut stack, &mut records)?;
                }
                Event::Text(t) => {
                    if stack.is_empty() {
                        if !t.iter().all(u8::is_ascii_whitespace) {
                            return Err(AppError::ParseFailed(
                                "text content outside the document element".to_string(),
                            ));
                        }
                    } else {
                        match t.unescape().map_err(|e| e.to_string()).and_then(xml_chars_only) {
                            Ok(text) => append_text(&mut stack, &text),
                            Err(reason) => mark_enclosing(&stack, &mut records, reason)?,
                        }
                    }
                }
                Event::CData(c) => {
                    if stack.is_empty() {
                        return Err(AppError::ParseFailed(
                            "CDATA outside the document element".to_string(),
                        ));
                    }
                    let raw = c.into_inner();
                    let decoded = reader
                        .decoder()
                        .decode(&raw)
                        .map_err(|e| e.to_string())
                        .and_then(xml_chars_only);
                    match decoded {
                        Ok(text) => append_text(&mut stack, &text),
                        Err(reason) => mark_enclosing(&stack, &mut records, reason)?,
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(frame) = stack.last() {
            return Err(AppError::ParseFailed(format!(
                "unclosed element <{}>",
                frame.name
            )));
        }
        if !root_seen {
            return Err(AppError::ParseFailed("no element found".to_string()));
        }

        Ok(Self { records })
    }
}

fn open_element(stack: &mut Vec<Frame>, records: &mut Vec<RawRecord>, name: String) {
    // The document element is never a record, even when it is named `item`.
    let nested = !stack.is_empty();
    let parent = stack.last_mut();
    let parent_enclosing = parent.as_ref().and_then(|p| p.enclosing);

    let field = match parent {
        Some(parent) => {
            if let Some(capture) = parent.field.as_mut() {
                capture.saw_child = true;
            }
            parent.item.map(|record| FieldCapture {
                record,
                name: name.clone(),
                text: String::new(),
                saw_child: false,
            })
        }
        None => None,
    };

    let item = if nested && name == ITEM_TAG {
        records.push(RawRecord::new());
        Some(records.len() - 1)
    } else {
        None
    };

    stack.push(Frame {
        name,
        item,
        enclosing: item.or(parent_enclosing),
        field,
    });
}

/// Pops the innermost element; returns true when the document element closed
fn close_element(stack: &mut Vec<Frame>, records: &mut [RawRecord]) -> Result<bool, AppError> {
    let frame = stack
        .pop()
        .ok_or_else(|| AppError::ParseFailed("unexpected closing tag".to_string()))?;

    if let Some(capture) = frame.field {
        records[capture.record].insert_first(capture.name, capture.text);
    }

    Ok(stack.is_empty())
}

fn append_text(stack: &mut [Frame], text: &str) {
    if let Some(capture) = stack.last_mut().and_then(|f| f.field.as_mut()) {
        // Only the text before the first child element counts.
        if !capture.saw_child {
            capture.text.push_str(text);
        }
    }
}

/// Passes text through unless it holds a character XML 1.0 forbids
fn xml_chars_only(text: Cow<'_, str>) -> Result<Cow<'_, str>, String> {
    match text.chars().find(|c| !is_xml_char(*c)) {
        Some(c) => Err(format!("character U+{:04X} is not allowed in XML", c as u32)),
        None => Ok(text),
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\u{9}'
            | '\u{A}'
            | '\u{D}'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

fn mark_enclosing(
    stack: &[Frame],
    records: &mut [RawRecord],
    reason: String,
) -> Result<(), AppError> {
    match stack.last().and_then(|f| f.enclosing) {
        Some(record) => {
            records[record].mark_defective(reason);
            Ok(())
        }
        None => Err(AppError::ParseFailed(reason)),
    }
}
