//! Metadata populated at open.
//!
//! Tests verify:
//! - Acquisition dates are normalised to ISO-8601
//! - Physical pixel sizes follow the resolution unit
//! - Scanner properties and source lens come from the first sub-image
//! - Series descriptors report the pixel model of their sub-image

use ndpi_reader::{JpegDecoderFactory, PixelType, PyramidReader, RawDecoderFactory, ReaderConfig};

use super::test_utils::{
    create_test_rgb_jpeg, init_tracing, reader_source, ImageBuilder, TagValue, TiffBuilder,
    TAG_SCANNER_PROPERTIES, TAG_SOURCE_LENS,
};

fn slide() -> Vec<u8> {
    TiffBuilder::new()
        .add_image(
            ImageBuilder::gray(64, 48)
                .with_date("2020:01:02 03:04:05")
                .with_resolution((40_000, 1), (20_000, 1), Some(3))
                .with_tag(
                    TAG_SCANNER_PROPERTIES,
                    TagValue::Ascii("Model=C13220\r\nSerial=0042\nbroken line".to_string()),
                )
                .with_tag(TAG_SOURCE_LENS, TagValue::Float(vec![40.0])),
        )
        .add_image(
            ImageBuilder::gray(32, 24)
                .with_date("2020:01:02 03:04:06")
                .with_resolution((254, 1), (127, 1), None),
        )
        .add_image(ImageBuilder::gray(16, 12).with_date("not a date"))
        .build()
}

#[test]
fn test_metadata_store() {
    init_tracing();
    let reader = PyramidReader::open(
        reader_source(slide()),
        &RawDecoderFactory::new(1),
        ReaderConfig::default(),
    )
    .unwrap();
    let metadata = reader.metadata();
    assert_eq!(metadata.images.len(), 3);

    let base = metadata.image(0).unwrap();
    assert_eq!(base.name, "Series 1");
    assert_eq!(base.acquisition_date.as_deref(), Some("2020-01-02T03:04:05"));
    assert_eq!(base.physical_size_x, Some(0.25));
    assert_eq!(base.physical_size_y, Some(0.5));
    assert_eq!(base.physical_size_z, None);

    // No ResolutionUnit: inch
    let level1 = metadata.image(1).unwrap();
    assert_eq!(level1.acquisition_date.as_deref(), Some("2020-01-02T03:04:06"));
    assert_eq!(level1.physical_size_x, Some(100.0));
    assert_eq!(level1.physical_size_y, Some(200.0));
    assert_eq!(level1.physical_size_z, Some(0.0));

    let level2 = metadata.image(2).unwrap();
    assert_eq!(level2.name, "Series 3");
    assert!(level2.acquisition_date.is_none());
    assert!(level2.physical_size_x.is_none());

    assert_eq!(metadata.source_lens, Some(40.0));
    assert_eq!(metadata.scanner_properties.len(), 2);
    assert_eq!(metadata.scanner_properties.get("Model"), Some("C13220"));
    assert_eq!(metadata.scanner_properties.get("Serial"), Some("0042"));
}

#[test]
fn test_metadata_serializes_camel_case() {
    init_tracing();
    let reader = PyramidReader::open(
        reader_source(slide()),
        &RawDecoderFactory::new(1),
        ReaderConfig::default(),
    )
    .unwrap();

    let json = serde_json::to_value(reader.metadata()).unwrap();
    assert_eq!(json["images"][0]["acquisitionDate"], "2020-01-02T03:04:05");
    assert_eq!(json["sourceLens"], 40.0);
    assert_eq!(json["scannerProperties"]["properties"]["Model"], "C13220");
}

#[test]
fn test_rgb_series_descriptor() {
    init_tracing();
    let data = TiffBuilder::new()
        .add_image(ImageBuilder::jpeg(96, 64, create_test_rgb_jpeg(96, 64, 85)))
        .build();
    let reader = PyramidReader::open(
        reader_source(data),
        &JpegDecoderFactory,
        ReaderConfig::default(),
    )
    .unwrap();

    let series = reader.series_descriptor(0).unwrap();
    assert_eq!((series.size_x, series.size_y), (96, 64));
    assert_eq!(series.size_c, 3);
    assert_eq!(series.size_t, 1);
    assert_eq!(series.pixel_type, PixelType::Uint8);
    assert!(series.is_rgb);
    assert!(!series.is_indexed);
    assert!(series.little_endian);
    assert_eq!(series.dimension_order, "XYCZT");
    assert!(!series.interleaved);
    assert!(!series.is_thumbnail);
    assert_eq!(series.optimal_tile_width, 96);
    assert_eq!(series.optimal_tile_height, 64);
    assert_eq!(series.pixel_bytes(), 3);
}
