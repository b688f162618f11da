//! End-to-end metadata edits.
//!
//! [`EditService`] ties together a [`MetadataSource`](crate::source::MetadataSource),
//! the OME document model and mutation engine, and the output writers
//! (XML file, TIFF patcher, converter).

mod service;

pub use service::{EditReport, EditRequest, EditService, OutputAction};
