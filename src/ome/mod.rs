//! OME-XML document model, parsing, serialization and mutation.
//!
//! # Example
//!
//! ```
//! use ome_meta_editor::mapping::{Category, MappingTable};
//! use ome_meta_editor::ome::{apply, parse, serialize};
//!
//! let mut doc = parse(r#"<OME><Image><Pixels SizeC="3"/></Image></OME>"#).unwrap();
//! let table = MappingTable::from_rules([(Category::Size, "SizeC", "4")]);
//! apply(&mut doc, &table, true);
//! assert!(serialize(&doc).contains(r#"SizeC="4""#));
//! ```

mod document;
mod mutate;
mod reader;
mod writer;

pub use document::{local_name, Attribute, Content, Document, ElementId};
pub use mutate::{apply, ApplySummary};
pub use reader::parse;
pub use writer::serialize;

impl Document {
    /// Parse OME-XML text. See [`parse`].
    pub fn parse(text: &str) -> Result<Self, crate::error::MetadataError> {
        reader::parse(text)
    }

    /// Render as XML text. See [`serialize`].
    pub fn serialize(&self) -> String {
        writer::serialize(self)
    }
}
