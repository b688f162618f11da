//! Edit service: the end-to-end metadata edit.
//!
//! ```text
//! input ──► MetadataSource ──► parse ──► apply(MappingTable) ──► serialize
//!                                                                   │
//!            ┌──────────────────────────────┬───────────────────────┤
//!            ▼                              ▼                       ▼
//!      write .xml file          patch existing .tif/.tiff    (new .tif/.tiff)
//!                                                             Converter only
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::convert::Converter;
use crate::error::EditError;
use crate::format::tiff::{overwrite_description, PatchOutcome};
use crate::format::OutputTarget;
use crate::mapping::MappingTable;
use crate::ome::{apply, ApplySummary, Document};
use crate::source::MetadataSource;

// =============================================================================
// Edit Request
// =============================================================================

/// Parameters of a single edit.
#[derive(Debug, Clone)]
pub struct EditRequest {
    /// Image or XML file the metadata is read from
    pub input: PathBuf,

    /// `.xml` file, or `.tif`/`.tiff` container, to write to
    pub output: PathBuf,

    /// Rename and override rules
    pub mapping: MappingTable,

    /// Remove secondary images and structured annotations
    pub prune: bool,

    /// Re-create an existing TIFF output instead of patching it
    pub overwrite: bool,
}

impl EditRequest {
    /// A pruning edit with no rules.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            mapping: MappingTable::empty(),
            prune: true,
            overwrite: false,
        }
    }

    pub fn with_mapping(mut self, mapping: MappingTable) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

// =============================================================================
// Edit Report
// =============================================================================

/// How the output was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputAction {
    /// Standalone XML written, with its size in bytes
    WroteXml { bytes: usize },

    /// Existing TIFF patched
    Patched(PatchOutcome),

    /// New TIFF created by the converter; edits were not embedded
    Converted,
}

/// Result of a successful edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditReport {
    pub action: OutputAction,

    /// `None` when the metadata was not edited (conversion only)
    pub summary: Option<ApplySummary>,
}

// =============================================================================
// Edit Service
// =============================================================================

/// Runs edits with a given metadata source and converter.
pub struct EditService<S, C> {
    source: S,
    converter: C,
}

impl<S: MetadataSource, C: Converter> EditService<S, C> {
    pub fn new(source: S, converter: C) -> Self {
        Self { source, converter }
    }

    /// Read, edit and write the metadata described by `request`.
    pub fn run(&self, request: &EditRequest) -> Result<EditReport, EditError> {
        let target = OutputTarget::classify(&request.output, request.overwrite);
        debug!(?target, "Classified output");

        match target {
            OutputTarget::Unsupported(path) => Err(EditError::UnsupportedOutput(path)),
            OutputTarget::ConvertTiff {
                path,
                replace_existing,
            } => self.convert(&request.input, &path, replace_existing),
            OutputTarget::Xml(path) => {
                let (xml, summary) = self.edited_metadata(request)?;
                fs::write(&path, xml.as_bytes()).map_err(|source| EditError::Write {
                    path: path.clone(),
                    source,
                })?;
                info!(output = %path.display(), bytes = xml.len(), "Wrote metadata");

                Ok(EditReport {
                    action: OutputAction::WroteXml { bytes: xml.len() },
                    summary: Some(summary),
                })
            }
            OutputTarget::PatchTiff(path) => {
                let (xml, summary) = self.edited_metadata(request)?;
                let outcome = overwrite_description(&path, &xml)?;

                Ok(EditReport {
                    action: OutputAction::Patched(outcome),
                    summary: Some(summary),
                })
            }
        }
    }

    /// Source → parse → apply → serialize.
    fn edited_metadata(&self, request: &EditRequest) -> Result<(String, ApplySummary), EditError> {
        let text = self.source.read_metadata(&request.input)?;
        let mut document = Document::parse(&text)?;
        let summary = apply(&mut document, &request.mapping, request.prune);
        info!(
            images_removed = summary.images_removed,
            annotations_removed = summary.annotations_removed,
            channels_renamed = summary.channels_renamed,
            pixel_attributes_set = summary.pixel_attributes_set,
            "Edited metadata"
        );

        Ok((document.serialize(), summary))
    }

    fn convert(
        &self,
        input: &Path,
        output: &Path,
        replace_existing: bool,
    ) -> Result<EditReport, EditError> {
        if replace_existing {
            debug!(output = %output.display(), "Removing existing output");
            fs::remove_file(output).map_err(|source| EditError::Write {
                path: output.to_path_buf(),
                source,
            })?;
        }

        warn!(
            output = %output.display(),
            replace_existing,
            "Creating output by conversion without embedding edited metadata. \
             Run the edit again on the new file to apply it"
        );
        self.converter.convert(input, output)?;

        Ok(EditReport {
            action: OutputAction::Converted,
            summary: None,
        })
    }
}
