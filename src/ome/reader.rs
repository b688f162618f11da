//! OME-XML text → [`Document`].

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use super::document::{Content, Document, ElementId};
use crate::error::MetadataError;

/// Parse OME-XML text.
///
/// Whitespace-only text between elements is dropped since the serializer
/// re-indents on output. Other text is kept verbatim, including whitespace
/// next to inline elements. Processing instructions and DOCTYPE declarations
/// are skipped.
pub fn parse(text: &str) -> Result<Document, MetadataError> {
    let mut reader = Reader::from_str(text);

    let mut document: Option<Document> = None;
    let mut prolog: Vec<String> = Vec::new();
    let mut stack: Vec<ElementId> = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| MetadataError::Malformed {
            position: reader.error_position() as u64,
            message: e.to_string(),
        })?;
        let position = reader.buffer_position() as u64;

        match event {
            Event::Start(start) => {
                let id = open_element(&mut document, &stack, &start, position)?;
                stack.push(id);
            }
            Event::Empty(start) => {
                open_element(&mut document, &stack, &start, position)?;
            }
            Event::End(_) => {
                // Name matching is checked by the reader
                stack.pop();
            }
            Event::Text(text) if text.iter().all(u8::is_ascii_whitespace) => {}
            Event::Text(text) => {
                let value = text.unescape().map_err(|e| malformed(position, e))?;
                let content = Content::Text(value.into_owned());
                append_to_open(&mut document, &stack, content, position)?;
            }
            Event::CData(data) => {
                let content = Content::CData(utf8(&data, position)?);
                append_to_open(&mut document, &stack, content, position)?;
            }
            Event::Comment(comment) => {
                let value = utf8(&comment, position)?;
                if !stack.is_empty() {
                    append_to_open(&mut document, &stack, Content::Comment(value), position)?;
                } else if document.is_none() {
                    prolog.push(value);
                } else {
                    debug!("Dropping comment after root element");
                }
            }
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if !stack.is_empty() {
        return Err(MetadataError::Malformed {
            position: reader.buffer_position() as u64,
            message: "unexpected end of input inside an element".to_string(),
        });
    }

    let mut document = document.ok_or_else(|| MetadataError::Malformed {
        position: 0,
        message: "no root element".to_string(),
    })?;
    for comment in prolog {
        document.push_prolog_comment(comment);
    }

    Ok(document)
}

/// Create the element for a start or empty tag under the innermost open
/// element, or as the root if nothing is open yet.
fn open_element(
    document: &mut Option<Document>,
    stack: &[ElementId],
    start: &BytesStart<'_>,
    position: u64,
) -> Result<ElementId, MetadataError> {
    let name = utf8(start.name().as_ref(), position)?;

    let id = if let Some(doc) = document.as_mut() {
        let Some(parent) = stack.last() else {
            return Err(malformed(position, format!("second root element <{name}>")));
        };
        doc.append_element(*parent, name)
    } else {
        document.insert(Document::new(name)).root()
    };

    let Some(doc) = document.as_mut() else {
        return Err(malformed(position, "document not initialised"));
    };
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| malformed(position, e))?;
        let key = utf8(attribute.key.as_ref(), position)?;
        let value = attribute
            .unescape_value()
            .map_err(|e| malformed(position, e))?;
        if doc.attribute(id, &key).is_some() {
            return Err(malformed(position, format!("duplicate attribute '{key}'")));
        }
        doc.set_attribute(id, &key, value);
    }

    Ok(id)
}

fn append_to_open(
    document: &mut Option<Document>,
    stack: &[ElementId],
    content: Content,
    position: u64,
) -> Result<(), MetadataError> {
    match (document.as_mut(), stack.last()) {
        (Some(doc), Some(parent)) => {
            doc.append_content(*parent, content);
            Ok(())
        }
        _ => Err(malformed(position, "content outside the root element")),
    }
}

fn utf8(bytes: &[u8], position: u64) -> Result<String, MetadataError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| malformed(position, e))
}

fn malformed(position: u64, message: impl ToString) -> MetadataError {
    MetadataError::Malformed {
        position,
        message: message.to_string(),
    }
}
