//! Mapping file loading (YAML or JSON).
//!
//! A mapping file has up to four top-level keys, one per [`Category`]. Each
//! holds a list of single-entry maps from the original value to its
//! replacement:
//!
//! ```yaml
//! channel_name:
//!   - DAPI: Nuclei
//! fluor_name:
//!   - Alexa Fluor 488: AF488
//! size:
//!   - SizeC: 4
//! physical_size:
//!   - PhysicalSizeX: 0.65
//! ```
//!
//! Numbers and booleans are taken as their string form.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::de::IgnoredAny;
use serde::Deserialize;
use tracing::{debug, warn};

use super::table::{Category, MappingTable};
use crate::error::MappingError;

// =============================================================================
// File Format
// =============================================================================

/// Serialization format of a mapping file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingFormat {
    Yaml,
    Json,
}

impl MappingFormat {
    /// `.yaml`/`.yml` or `.json`, case-insensitive.
    pub fn from_path(path: &Path) -> Result<Self, MappingError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(MappingError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

// =============================================================================
// Raw Document
// =============================================================================

/// A rule value as written in the file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Other(IgnoredAny),
}

impl Scalar {
    fn render(self) -> Option<String> {
        match self {
            Scalar::Bool(b) => Some(b.to_string()),
            Scalar::Int(i) => Some(i.to_string()),
            // Keep "1.0" as written rather than "1"
            Scalar::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(format!("{f:.1}")),
            Scalar::Float(f) => Some(f.to_string()),
            Scalar::Str(s) => Some(s),
            Scalar::Other(_) => None,
        }
    }
}

type RuleList = Vec<BTreeMap<String, Scalar>>;

#[derive(Debug, Default, Deserialize)]
struct MappingDocument {
    channel_name: Option<RuleList>,
    fluor_name: Option<RuleList>,
    size: Option<RuleList>,
    physical_size: Option<RuleList>,

    #[serde(flatten)]
    unknown: BTreeMap<String, serde_json::Value>,
}

// =============================================================================
// Loading
// =============================================================================

/// Load a mapping table from a YAML or JSON file.
pub fn load_mapping(path: impl AsRef<Path>) -> Result<MappingTable, MappingError> {
    let path = path.as_ref();
    let format = MappingFormat::from_path(path)?;

    let text = fs::read_to_string(path).map_err(|source| MappingError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let table = parse_mapping(&text, format)?;
    debug!(
        path = %path.display(),
        channel_name = table.len(Category::ChannelName),
        fluor_name = table.len(Category::FluorName),
        size = table.len(Category::Size),
        physical_size = table.len(Category::PhysicalSize),
        "Loaded mapping"
    );

    Ok(table)
}

/// Parse mapping text in the given format. Empty input is an empty table.
pub fn parse_mapping(text: &str, format: MappingFormat) -> Result<MappingTable, MappingError> {
    if text.trim().is_empty() {
        return Ok(MappingTable::empty());
    }

    let document: Option<MappingDocument> = match format {
        MappingFormat::Yaml => {
            serde_yml::from_str(text).map_err(|e| MappingError::Parse(e.to_string()))?
        }
        MappingFormat::Json => {
            serde_json::from_str(text).map_err(|e| MappingError::Parse(e.to_string()))?
        }
    };
    let document = document.unwrap_or_default();

    for key in document.unknown.keys() {
        warn!(key = %key, "Ignoring unknown mapping category");
    }

    let mut rules = Vec::new();
    for (category, list) in [
        (Category::ChannelName, document.channel_name),
        (Category::FluorName, document.fluor_name),
        (Category::Size, document.size),
        (Category::PhysicalSize, document.physical_size),
    ] {
        for item in list.unwrap_or_default() {
            rules.push(flatten_item(category, item)?);
        }
    }

    Ok(MappingTable::from_rules(rules))
}

fn flatten_item(
    category: Category,
    item: BTreeMap<String, Scalar>,
) -> Result<(Category, String, String), MappingError> {
    if item.len() != 1 {
        return Err(MappingError::InvalidRule {
            category: category.key(),
            message: format!("expected exactly one 'old: new' pair, found {}", item.len()),
        });
    }

    let mut entries = item.into_iter();
    let Some((key, value)) = entries.next() else {
        return Err(MappingError::InvalidRule {
            category: category.key(),
            message: "empty rule".to_string(),
        });
    };

    let value = value.render().ok_or_else(|| MappingError::InvalidRule {
        category: category.key(),
        message: format!("value for '{key}' must be a string, number or boolean"),
    })?;

    Ok((category, key, value))
}
