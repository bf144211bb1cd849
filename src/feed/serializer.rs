//! Feed serializer
//!
//! Renders a feed document as indented RSS 2.0 with `g:`-prefixed item fields.
//! Output depends only on the document, so equal documents render to equal bytes.

use super::builder::FeedDocument;
use super::mapper::CanonicalItem;
use crate::error::AppError;
use crate::services::storage::WorkingStorage;
use anyhow::anyhow;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;
use std::path::PathBuf;

const INDENT_WIDTH: usize = 2;

/// Render a feed document to XML bytes
pub fn render(document: &FeedDocument) -> Result<Vec<u8>, AppError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT_WIDTH);
    write_document(&mut writer, document)
        .map_err(|e| AppError::Internal(anyhow!("Failed to render feed: {}", e)))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

/// Render a feed document and store it as `name` in outbound storage
///
/// Replaces any artifact already stored under the same name.
pub async fn persist(
    document: &FeedDocument,
    storage: &WorkingStorage,
    name: &str,
) -> Result<PathBuf, AppError> {
    let bytes = render(document)?;
    storage.write_artifact(name, &bytes).await
}

fn write_document<W: Write>(
    writer: &mut Writer<W>,
    document: &FeedDocument,
) -> quick_xml::Result<()> {
    let meta = document.meta();

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("xmlns:g", meta.namespace.as_str()));
    rss.push_attribute(("version", "2.0"));
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    write_text_element(writer, "title", &meta.title)?;
    write_text_element(writer, "link", &meta.link)?;
    write_text_element(writer, "description", &meta.description)?;

    for item in document.items() {
        write_item(writer, item)?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;
    Ok(())
}

fn write_item<W: Write>(writer: &mut Writer<W>, item: &CanonicalItem) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new("item")))?;
    write_text_element(writer, "g:id", &item.id)?;
    write_text_element(writer, "g:title", &item.title)?;
    write_text_element(writer, "g:description", &item.description)?;
    write_text_element(writer, "g:link", &item.link)?;
    write_text_element(writer, "g:image_link", &item.image_link)?;
    write_text_element(writer, "g:price", &item.price)?;
    write_text_element(writer, "g:availability", &item.availability)?;
    write_text_element(writer, "g:condition", &item.condition)?;
    writer.write_event(Event::End(BytesEnd::new("item")))?;
    Ok(())
}

fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
