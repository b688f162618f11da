//! Pruning and rule application.

use tracing::debug;

use super::document::{Document, ElementId};
use crate::mapping::{Category, MappingTable};

/// What [`apply`] changed, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub images_removed: usize,
    pub annotations_removed: usize,
    pub channels_renamed: usize,
    pub pixel_attributes_set: usize,
}

/// Apply `table` to `document` in place.
///
/// With `prune` set, every `Image` after the first and every
/// `StructuredAnnotations` block is removed first. Rules then act on the
/// channels and `Pixels` of the first image only:
///
/// - `fluor_name` matches the original `Fluor` and sets both `Fluor` and
///   `Name`.
/// - `channel_name` matches the original `Name` and sets `Name`; it runs
///   after `fluor_name`, so it wins when both match.
/// - `size` then `physical_size` set `Pixels` attributes verbatim.
///
/// Missing images, pixels, channels or attributes leave the document as is.
pub fn apply(document: &mut Document, table: &MappingTable, prune: bool) -> ApplySummary {
    let mut summary = ApplySummary::default();

    if prune {
        prune_document(document, &mut summary);
    }

    let Some(image) = document.images().first().copied() else {
        debug!("No Image element, skipping rules");
        return summary;
    };
    let Some(pixels) = document.pixels_of(image) else {
        debug!("First Image has no Pixels, skipping rules");
        return summary;
    };

    summary.channels_renamed = rename_channels(document, pixels, table);

    for category in [Category::Size, Category::PhysicalSize] {
        for (attribute, value) in table.rules(category) {
            document.set_attribute(pixels, attribute, value);
            summary.pixel_attributes_set += 1;
        }
    }

    debug!(?summary, "Applied mapping");
    summary
}

fn prune_document(document: &mut Document, summary: &mut ApplySummary) {
    let images = document.images();
    for image in images.iter().skip(1).rev() {
        document.remove_subtree(*image);
        summary.images_removed += 1;
    }

    // A block nested in a removed image is already unreachable
    let annotations = document.elements_named("StructuredAnnotations");
    for block in annotations.iter().rev() {
        document.remove_subtree(*block);
        summary.annotations_removed += 1;
    }
}

fn rename_channels(document: &mut Document, pixels: ElementId, table: &MappingTable) -> usize {
    let mut renamed = 0;

    for channel in document.channels_of(pixels) {
        let original_name = document.attribute(channel, "Name").map(str::to_owned);
        let original_fluor = document.attribute(channel, "Fluor").map(str::to_owned);
        let mut changed = false;

        if let Some(fluor) = original_fluor
            .as_deref()
            .and_then(|f| table.lookup(Category::FluorName, f))
        {
            document.set_attribute(channel, "Fluor", fluor);
            document.set_attribute(channel, "Name", fluor);
            changed = true;
        }

        if let Some(name) = original_name
            .as_deref()
            .and_then(|n| table.lookup(Category::ChannelName, n))
        {
            document.set_attribute(channel, "Name", name);
            changed = true;
        }

        if changed {
            renamed += 1;
        }
    }

    renamed
}
