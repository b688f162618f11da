//! [`Document`] → OME-XML text.
//!
//! Output is UTF-8 with an explicit `standalone="no"` declaration and
//! two-space indentation. Attributes keep their stored order, so the same
//! document always serializes to the same bytes.

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::document::{Content, Document, ElementId};

/// Render a document as indented XML text.
pub fn serialize(document: &Document) -> String {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    // Writing into a Vec cannot fail
    let _ = write_document(&mut writer, document);

    String::from_utf8_lossy(&writer.into_inner()).into_owned()
}

fn write_document(writer: &mut Writer<Vec<u8>>, document: &Document) -> std::io::Result<()> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))?;
    for comment in document.prolog_comments() {
        writer.write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))?;
    }
    write_element(writer, document, document.root())?;
    writer.write_indent()?;
    Ok(())
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    document: &Document,
    el: ElementId,
) -> std::io::Result<()> {
    let name = document.name(el);
    let mut start = BytesStart::new(name);
    for attribute in document.attributes(el) {
        start.push_attribute((attribute.name.as_str(), attribute.value.as_str()));
    }

    let contents = document.contents(el);
    if contents.is_empty() {
        return writer.write_event(Event::Empty(start));
    }

    writer.write_event(Event::Start(start))?;
    for content in contents {
        match content {
            Content::Element(child) => write_element(writer, document, *child)?,
            Content::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            Content::CData(data) => writer.write_event(Event::CData(BytesCData::new(data)))?,
            Content::Comment(comment) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))?
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(name)))
}
