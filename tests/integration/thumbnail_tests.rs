//! Thumbnail reads.
//!
//! Tests verify:
//! - Pyramid series are answered from the smallest level
//! - Flat series use their own pixels
//! - The active series survives both successful and failed reads

use ndpi_reader::{PyramidReader, RawDecoderFactory, ReaderConfig, ReaderError};

use super::test_utils::{
    gray_pattern, gray_pyramid, init_tracing, reader_source, ImageBuilder, TrackingMockReader,
};

type TestReader = PyramidReader<TrackingMockReader, RawDecoderFactory>;

fn open(data: Vec<u8>, config: ReaderConfig) -> TestReader {
    init_tracing();
    PyramidReader::open(reader_source(data), &RawDecoderFactory::new(1), config).unwrap()
}

#[test]
fn test_pyramid_thumbnail_comes_from_smallest_level() {
    // Levels: 512x256, 256x128, 128x64
    let mut reader = open(gray_pyramid(512, 256, 3, 1).build(), ReaderConfig::default());

    assert_eq!(reader.thumbnail_size(0), Some((128, 64)));
    let thumbnail = reader.read_thumbnail(0).unwrap();

    assert_eq!(thumbnail, gray_pattern(128, 64));
    assert_eq!(reader.series(), 0);
}

#[test]
fn test_active_series_restored_after_success() {
    let mut reader = open(gray_pyramid(512, 256, 3, 1).build(), ReaderConfig::default());
    reader.set_series(1).unwrap();

    let thumbnail = reader.read_thumbnail(0).unwrap();
    assert_eq!(thumbnail.len(), 128 * 64);
    assert_eq!(reader.series(), 1);
}

#[test]
fn test_active_series_restored_after_failure() {
    let mut reader = open(gray_pyramid(512, 256, 3, 1).build(), ReaderConfig::default());
    reader.set_series(1).unwrap();

    assert!(matches!(
        reader.read_thumbnail(4),
        Err(ReaderError::PlaneOutOfRange { plane: 4, count: 1 })
    ));
    assert_eq!(reader.series(), 1);
}

#[test]
fn test_flat_series_uses_its_own_pixels() {
    // Two levels, two planes, then a macro image
    let data = gray_pyramid(512, 256, 2, 2)
        .add_image(ImageBuilder::gray(300, 100))
        .build();
    let mut reader = open(data, ReaderConfig::default());
    assert_eq!(reader.series_count(), 3);
    assert!(!reader.layout().is_pyramid_level(2));

    reader.set_series(2).unwrap();
    assert_eq!(reader.thumbnail_size(2), Some((128, 42)));

    let thumbnail = reader.read_thumbnail(0).unwrap();
    assert_eq!(thumbnail.len(), 128 * 42);

    // Column 1 samples source column 1 * 300 / 128 = 2
    let source = gray_pattern(300, 100);
    assert_eq!(thumbnail[0], source[0]);
    assert_eq!(thumbnail[1], source[2]);
    // Row 1 samples source row 1 * 100 / 42 = 2
    assert_eq!(thumbnail[128], source[2 * 300]);
    assert_eq!(reader.series(), 2);
}

#[test]
fn test_small_smallest_level_keeps_its_size() {
    let mut reader = open(gray_pyramid(200, 100, 2, 1).build(), ReaderConfig::default());

    // Smallest level is 100x50, below the thumbnail dimension
    let thumbnail = reader.read_thumbnail(0).unwrap();
    assert_eq!(thumbnail, gray_pattern(100, 50));
}

#[test]
fn test_custom_thumbnail_dimension() {
    let config = ReaderConfig {
        thumbnail_dimension: 32,
        ..ReaderConfig::default()
    };
    let mut reader = open(gray_pyramid(512, 256, 3, 1).build(), config);

    assert_eq!(reader.thumbnail_size(0), Some((32, 16)));
    assert_eq!(reader.read_thumbnail(0).unwrap().len(), 32 * 16);
    assert_eq!(reader.thumbnail_size(3), None);
}

#[test]
fn test_thumbnail_on_staged_level() {
    // Force every level through the scanline window
    let mut reader = open(
        gray_pyramid(256, 128, 2, 1).build(),
        ReaderConfig::default().with_direct_decode_threshold(16),
    );

    let thumbnail = reader.read_thumbnail(0).unwrap();
    assert_eq!(thumbnail, gray_pattern(128, 64));
    assert_eq!(reader.series(), 0);
}
