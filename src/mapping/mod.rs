//! Rename and override rules for OME metadata.
//!
//! A [`MappingTable`] holds four independent string maps, one per
//! [`Category`]. Tables are built in code with [`MappingTable::from_rules`]
//! or read from a YAML/JSON file with [`load_mapping`].

mod loader;
mod table;

pub use loader::{load_mapping, parse_mapping, MappingFormat};
pub use table::{Category, MappingTable};
