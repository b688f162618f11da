//! End-to-end edits through the file-based metadata source.

use std::fs;

use ome_meta_editor::convert::CommandConverter;
use ome_meta_editor::edit::{EditRequest, EditService, OutputAction};
use ome_meta_editor::error::{EditError, SourceError};
use ome_meta_editor::format::tiff::{read_description, PatchOutcome};
use ome_meta_editor::mapping::load_mapping;
use ome_meta_editor::ome::Document;
use ome_meta_editor::source::FileMetadataSource;

use super::test_utils::{strip_layout, TiffBuilder};

const OME_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<OME xmlns="http://www.openmicroscopy.org/Schemas/OME/2016-06">
  <Image ID="Image:0" Name="slide">
    <Pixels ID="Pixels:0" DimensionOrder="XYCZT" SizeC="3" SizeT="1" SizeX="4" SizeY="4" SizeZ="1" Type="uint8">
      <Channel ID="Channel:0:0" Name="DAPI" Fluor="DAPI" SamplesPerPixel="1"/>
      <Channel ID="Channel:0:1" Name="FITC" Fluor="Alexa Fluor 488" SamplesPerPixel="1"/>
      <Channel ID="Channel:0:2" Name="Cy5" Fluor="Cy5" SamplesPerPixel="1"/>
    </Pixels>
  </Image>
  <Image ID="Image:1" Name="macro"><Pixels ID="Pixels:1" SizeC="1"/></Image>
  <StructuredAnnotations>
    <MapAnnotation ID="Annotation:0"><Value><M K="vendor">x</M></Value></MapAnnotation>
  </StructuredAnnotations>
</OME>"#;

const MAPPING: &str = "\
fluor_name:
  - Alexa Fluor 488: AF488
channel_name:
  - Cy5: Membrane
size:
  - SizeC: 4
physical_size:
  - PhysicalSizeX: 0.325
";

fn service() -> EditService<FileMetadataSource, CommandConverter> {
    EditService::new(FileMetadataSource::new(), CommandConverter::default())
}

fn channel_values(doc: &Document, attribute: &str) -> Vec<String> {
    let pixels = doc.pixels_of(doc.images()[0]).unwrap();
    doc.channels_of(pixels)
        .into_iter()
        .map(|c| doc.attribute(c, attribute).unwrap().to_string())
        .collect()
}

#[test]
fn test_ome_tiff_to_xml() {
    let dir = tempfile::tempdir().unwrap();
    let input = TiffBuilder::new()
        .with_description(OME_XML)
        .build()
        .write_to(dir.path(), "slide.ome.tif");
    let mapping_path = dir.path().join("rules.yaml");
    fs::write(&mapping_path, MAPPING).unwrap();
    let output = dir.path().join("slide.xml");

    let request = EditRequest::new(&input, &output).with_mapping(load_mapping(&mapping_path).unwrap());
    let report = service().run(&request).unwrap();
    assert!(matches!(report.action, OutputAction::WroteXml { .. }));

    let doc = Document::parse(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(doc.images().len(), 1);
    assert!(doc.elements_named("StructuredAnnotations").is_empty());
    assert_eq!(channel_values(&doc, "Name"), ["DAPI", "AF488", "Membrane"]);
    assert_eq!(channel_values(&doc, "Fluor"), ["DAPI", "AF488", "Cy5"]);

    let pixels = doc.pixels_of(doc.images()[0]).unwrap();
    assert_eq!(doc.attribute(pixels, "SizeC"), Some("4"));
    assert_eq!(doc.attribute(pixels, "PhysicalSizeX"), Some("0.325"));
    assert_eq!(doc.attribute(pixels, "SizeX"), Some("4"));
}

#[test]
fn test_edit_ome_tiff_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let built = TiffBuilder::new().with_description(OME_XML).build();
    let path = built.write_to(dir.path(), "slide.ome.tiff");
    let layout = strip_layout(&path);

    // Pruning shortens the document, so it fits the existing allocation
    let report = service().run(&EditRequest::new(&path, &path)).unwrap();
    assert!(matches!(
        report.action,
        OutputAction::Patched(PatchOutcome::InPlace { .. })
    ));
    assert_eq!(fs::metadata(&path).unwrap().len(), built.bytes.len() as u64);
    assert_eq!(strip_layout(&path), layout);

    let doc = Document::parse(&read_description(&path).unwrap().unwrap()).unwrap();
    assert_eq!(doc.images().len(), 1);
    assert!(doc.elements_named("StructuredAnnotations").is_empty());
}

#[test]
fn test_patch_other_tiff_with_xml_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("metadata.xml");
    fs::write(&input, OME_XML).unwrap();
    let target = TiffBuilder::new().build().write_to(dir.path(), "plain.tif");

    let request = EditRequest::new(&input, &target).with_prune(false);
    let report = service().run(&request).unwrap();

    assert!(matches!(
        report.action,
        OutputAction::Patched(PatchOutcome::Inserted { .. })
    ));
    let doc = Document::parse(&read_description(&target).unwrap().unwrap()).unwrap();
    assert_eq!(doc.images().len(), 2);
    assert_eq!(doc.elements_named("StructuredAnnotations").len(), 1);
}

#[test]
fn test_output_is_stable_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("metadata.xml");
    fs::write(&input, OME_XML).unwrap();
    let first = dir.path().join("first.xml");
    let second = dir.path().join("second.xml");

    service().run(&EditRequest::new(&input, &first)).unwrap();
    service().run(&EditRequest::new(&first, &second)).unwrap();

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_tiff_input_without_description() {
    let dir = tempfile::tempdir().unwrap();
    let input = TiffBuilder::new().build().write_to(dir.path(), "plain.tif");

    let err = service()
        .run(&EditRequest::new(&input, dir.path().join("out.xml")))
        .unwrap_err();
    assert!(matches!(err, EditError::Source(SourceError::NoDescription(_))));
}

#[cfg(unix)]
#[test]
fn test_new_tiff_uses_converter() {
    let dir = tempfile::tempdir().unwrap();
    let input = TiffBuilder::new()
        .with_description(OME_XML)
        .build()
        .write_to(dir.path(), "source.tif");
    let output = dir.path().join("converted.tif");

    let service = EditService::new(FileMetadataSource::new(), CommandConverter::new("cp"));
    let report = service.run(&EditRequest::new(&input, &output)).unwrap();

    assert_eq!(report.action, OutputAction::Converted);
    assert_eq!(fs::read(&output).unwrap(), fs::read(&input).unwrap());
    // Edits are not embedded on first conversion
    assert_eq!(read_description(&output).unwrap().as_deref(), Some(OME_XML));
}
