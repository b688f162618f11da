//! ImageDescription patching on real files.

use std::fs;

use ome_meta_editor::error::PatchError;
use ome_meta_editor::format::tiff::{overwrite_description, read_description, PatchOutcome};

use super::test_utils::{
    changed_positions, decode_with_image_crate, encode_with_image_crate, strip_layout,
    ByteOrderType, TiffBuilder,
};

const ORIGINAL: &str = r#"<?xml version="1.0" encoding="UTF-8"?><OME><Image ID="Image:0"><Pixels SizeC="1"/></Image></OME>"#;

fn variants() -> Vec<(&'static str, TiffBuilder)> {
    vec![
        ("le", TiffBuilder::new()),
        (
            "be",
            TiffBuilder::new().with_byte_order(ByteOrderType::BigEndian),
        ),
        ("bigtiff-le", TiffBuilder::new().with_bigtiff(true)),
        (
            "bigtiff-be",
            TiffBuilder::new()
                .with_bigtiff(true)
                .with_byte_order(ByteOrderType::BigEndian),
        ),
    ]
}

// =============================================================================
// In-place Path
// =============================================================================

#[test]
fn test_in_place_changes_only_description_bytes() {
    let dir = tempfile::tempdir().unwrap();

    for (name, builder) in variants() {
        let built = builder.with_description(ORIGINAL).build();
        let path = built.write_to(dir.path(), &format!("{name}.tif"));
        let range = built.description_range.clone().unwrap();

        let outcome = overwrite_description(&path, "<OME/>").unwrap();
        assert!(
            matches!(outcome, PatchOutcome::InPlace { value_offset, allocated }
                if value_offset == range.start as u64 && allocated == range.len() as u64),
            "{name}: {outcome:?}"
        );

        let after = fs::read(&path).unwrap();
        for pos in changed_positions(&built.bytes, &after) {
            assert!(range.contains(&pos), "{name}: byte {pos} outside {range:?}");
        }
        assert_eq!(
            read_description(&path).unwrap().as_deref(),
            Some("<OME/>"),
            "{name}"
        );
    }
}

#[test]
fn test_exact_fit_is_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let built = TiffBuilder::new().with_description(ORIGINAL).build();
    let path = built.write_to(dir.path(), "exact.tif");

    let replacement: String = "x".repeat(ORIGINAL.len());
    let outcome = overwrite_description(&path, &replacement).unwrap();

    assert!(matches!(outcome, PatchOutcome::InPlace { .. }));
    assert_eq!(fs::metadata(&path).unwrap().len(), built.bytes.len() as u64);
    assert_eq!(read_description(&path).unwrap(), Some(replacement));
}

#[test]
fn test_same_text_leaves_file_identical() {
    let dir = tempfile::tempdir().unwrap();
    let built = TiffBuilder::new().with_description(ORIGINAL).build();
    let path = built.write_to(dir.path(), "same.tif");

    overwrite_description(&path, ORIGINAL).unwrap();
    assert_eq!(fs::read(&path).unwrap(), built.bytes);
}

// =============================================================================
// Grow Path
// =============================================================================

#[test]
fn test_grow_relocates_and_keeps_strips() {
    let dir = tempfile::tempdir().unwrap();
    let longer = format!("{ORIGINAL}<!-- {} -->", "padding ".repeat(40));

    for (name, builder) in variants() {
        let built = builder.with_description(ORIGINAL).build();
        let path = built.write_to(dir.path(), &format!("{name}.tif"));
        let before_layout = strip_layout(&path);

        let outcome = overwrite_description(&path, &longer).unwrap();
        match outcome {
            PatchOutcome::Relocated { value_offset } => {
                assert!(value_offset >= built.bytes.len() as u64, "{name}");
                assert_eq!(value_offset % 2, 0, "{name}: unaligned");
            }
            other => panic!("{name}: expected relocation, got {other:?}"),
        }

        assert_eq!(read_description(&path).unwrap().as_deref(), Some(longer.as_str()));

        let after = fs::read(&path).unwrap();
        assert_eq!(strip_layout(&path), before_layout, "{name}");
        assert_eq!(before_layout.0, vec![built.strip_offset]);
        let start = built.strip_offset as usize;
        assert_eq!(&after[start..start + built.strip.len()], built.strip.as_slice());

        // Old description bytes are left in place
        let range = built.description_range.clone().unwrap();
        assert_eq!(&after[range.clone()], &built.bytes[range]);
    }
}

#[test]
fn test_repeated_growth() {
    let dir = tempfile::tempdir().unwrap();
    let built = TiffBuilder::new().with_description("<OME/>").build();
    let path = built.write_to(dir.path(), "grow.tif");

    let mut text = String::from("<OME>");
    for round in 0..4 {
        text.push_str(&"<Image/>".repeat(10 * (round + 1)));
        let candidate = format!("{text}</OME>");
        overwrite_description(&path, &candidate).unwrap();
        assert_eq!(read_description(&path).unwrap(), Some(candidate));
    }

    // Shrinking back fits in the last allocation
    let outcome = overwrite_description(&path, "<OME/>").unwrap();
    assert!(matches!(outcome, PatchOutcome::InPlace { .. }));
    assert_eq!(strip_layout(&path).0, vec![built.strip_offset]);
}

// =============================================================================
// Inline Descriptions
// =============================================================================

#[test]
fn test_inline_description_classic() {
    let dir = tempfile::tempdir().unwrap();
    let built = TiffBuilder::new().with_description("ab").build();
    let path = built.write_to(dir.path(), "inline.tif");
    let range = built.description_range.clone().unwrap();
    assert_eq!(range.len(), 3);

    let outcome = overwrite_description(&path, "z").unwrap();
    assert!(matches!(outcome, PatchOutcome::InPlace { allocated: 3, .. }));
    for pos in changed_positions(&built.bytes, &fs::read(&path).unwrap()) {
        assert!(range.contains(&pos));
    }

    // 4 bytes with NUL still fits the value field, but not the 3 allocated
    let outcome = overwrite_description(&path, "abc").unwrap();
    assert!(matches!(outcome, PatchOutcome::Relocated { .. }));
    assert_eq!(fs::metadata(&path).unwrap().len(), built.bytes.len() as u64);
    assert_eq!(read_description(&path).unwrap().as_deref(), Some("abc"));

    let outcome = overwrite_description(&path, "a much longer description").unwrap();
    assert!(matches!(outcome, PatchOutcome::Relocated { .. }));
    assert_eq!(
        read_description(&path).unwrap().as_deref(),
        Some("a much longer description")
    );
}

#[test]
fn test_inline_description_bigtiff() {
    let dir = tempfile::tempdir().unwrap();
    let built = TiffBuilder::new()
        .with_bigtiff(true)
        .with_byte_order(ByteOrderType::BigEndian)
        .with_description("1234567")
        .build();
    let path = built.write_to(dir.path(), "inline.btf");
    assert_eq!(built.description_range.clone().unwrap().len(), 8);

    assert_eq!(read_description(&path).unwrap().as_deref(), Some("1234567"));
    let outcome = overwrite_description(&path, "7654321").unwrap();
    assert!(matches!(outcome, PatchOutcome::InPlace { allocated: 8, .. }));
    assert_eq!(read_description(&path).unwrap().as_deref(), Some("7654321"));
}

// =============================================================================
// Insert Path
// =============================================================================

#[test]
fn test_insert_when_missing() {
    let dir = tempfile::tempdir().unwrap();

    for (name, builder) in variants() {
        let built = builder.build();
        let path = built.write_to(dir.path(), &format!("{name}.tif"));
        assert_eq!(read_description(&path).unwrap(), None);
        let before_layout = strip_layout(&path);

        let outcome = overwrite_description(&path, ORIGINAL).unwrap();
        assert!(
            matches!(outcome, PatchOutcome::Inserted { ifd_offset, .. }
                if ifd_offset >= built.bytes.len() as u64),
            "{name}: {outcome:?}"
        );

        assert_eq!(read_description(&path).unwrap().as_deref(), Some(ORIGINAL));
        assert_eq!(strip_layout(&path), before_layout, "{name}");

        // Only the header pointer changed within the original bytes
        let after = fs::read(&path).unwrap();
        let pointer = if name.starts_with("bigtiff") { 8..16 } else { 4..8 };
        for (pos, (a, b)) in built.bytes.iter().zip(&after).enumerate() {
            if a != b {
                assert!(pointer.contains(&pos), "{name}: byte {pos} changed");
            }
        }
    }
}

// =============================================================================
// Independent Decoder
// =============================================================================

#[test]
fn test_image_crate_decodes_after_every_path() {
    let dir = tempfile::tempdir().unwrap();
    let (bytes, pixels) = encode_with_image_crate(13, 7);
    let path = dir.path().join("encoded.tif");
    fs::write(&path, &bytes).unwrap();
    assert_eq!(decode_with_image_crate(&path), pixels);

    let texts = [
        ORIGINAL.to_string(),
        format!("{ORIGINAL}{}", " ".repeat(200)),
        "<OME/>".to_string(),
    ];
    let mut outcomes = Vec::new();
    for text in &texts {
        outcomes.push(overwrite_description(&path, text).unwrap());
        assert_eq!(decode_with_image_crate(&path), pixels);
        assert_eq!(read_description(&path).unwrap().as_deref(), Some(text.as_str()));
    }

    assert!(matches!(outcomes[0], PatchOutcome::Inserted { .. }));
    assert!(matches!(outcomes[1], PatchOutcome::Relocated { .. }));
    assert!(matches!(outcomes[2], PatchOutcome::InPlace { .. }));
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_errors() {
    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("missing.tif");
    assert!(matches!(
        overwrite_description(&missing, "x"),
        Err(PatchError::NoSuchFile(_))
    ));

    let png = dir.path().join("image.tif");
    fs::write(&png, b"\x89PNG\r\n\x1a\n0000000000").unwrap();
    assert!(matches!(
        overwrite_description(&png, "x"),
        Err(PatchError::NotATiff { .. })
    ));
    assert_eq!(fs::read(&png).unwrap(), b"\x89PNG\r\n\x1a\n0000000000");

    let short = dir.path().join("short.tif");
    fs::write(&short, b"II*").unwrap();
    assert!(matches!(
        overwrite_description(&short, "x"),
        Err(PatchError::NotATiff { .. })
    ));

    // Header pointing past end of file
    let dangling = dir.path().join("dangling.tif");
    fs::write(&dangling, [0x49, 0x49, 0x2A, 0x00, 0xFF, 0x00, 0x00, 0x00]).unwrap();
    assert!(matches!(
        overwrite_description(&dangling, "x"),
        Err(PatchError::Tiff(_))
    ));
}
