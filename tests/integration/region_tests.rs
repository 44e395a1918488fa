//! Region reads on the direct and staged paths.
//!
//! Tests verify:
//! - Direct strip decoding across strip boundaries
//! - The staged window returns the same pixels as direct decoding
//! - Window priming, reuse and re-staging
//! - Rows outside the window leave the caller's buffer alone
//! - Request validation and close semantics

use ndpi_reader::{
    IoError, JpegDecoderFactory, PyramidReader, RawDecoderFactory, ReaderConfig, ReaderError,
    WindowState,
};

use super::test_utils::{
    create_test_rgb_jpeg, gray_pattern, gray_pyramid, init_tracing, reader_source, DecoderCall,
    ImageBuilder, RecordingDecoderFactory, TagValue, TiffBuilder, TrackingMockReader,
    TAG_STRIP_BYTE_COUNTS, TAG_STRIP_OFFSETS,
};

const HUGE: u32 = 20_000;

type HugeReader = PyramidReader<TrackingMockReader, RecordingDecoderFactory>;

fn open_with<F: ndpi_reader::ScanlineDecoderFactory>(
    data: Vec<u8>,
    factory: &F,
    config: ReaderConfig,
) -> PyramidReader<TrackingMockReader, F> {
    init_tracing();
    PyramidReader::open(reader_source(data), factory, config).unwrap()
}

/// One 20000 x 20000 RGB image per plane, decoded by a recording decoder.
fn open_huge(planes: usize) -> (HugeReader, RecordingDecoderFactory) {
    let mut builder = TiffBuilder::new();
    for _ in 0..planes {
        builder = builder.add_image(ImageBuilder::placeholder(HUGE, HUGE, 3));
    }
    let factory = RecordingDecoderFactory::new(3, HUGE);
    let reader = open_with(builder.build(), &factory, ReaderConfig::default());
    (reader, factory)
}

fn read(
    reader: &mut PyramidReader<TrackingMockReader, impl ndpi_reader::ScanlineDecoderFactory>,
    series: usize,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
) -> Vec<u8> {
    let pixel_bytes = reader.series_descriptor(series).unwrap().pixel_bytes();
    let mut buf = vec![0u8; w as usize * h as usize * pixel_bytes];
    reader.read_region(series, 0, x, y, w, h, &mut buf).unwrap();
    buf
}

fn crop(src: &[u8], width: u32, pixel_bytes: usize, x: u32, y: u32, w: u32, h: u32) -> Vec<u8> {
    let stride = width as usize * pixel_bytes;
    (y..y + h)
        .flat_map(|row| {
            let start = row as usize * stride + x as usize * pixel_bytes;
            src[start..start + w as usize * pixel_bytes].to_vec()
        })
        .collect()
}

// =============================================================================
// Direct Path
// =============================================================================

#[test]
fn test_direct_read_across_strips() {
    let pixels = gray_pattern(50, 40);
    let data = TiffBuilder::new()
        .add_image(ImageBuilder::raw(50, 40, 1, &pixels, 7))
        .build();
    let mut reader = open_with(data, &RawDecoderFactory::new(1), ReaderConfig::default());

    assert_eq!(read(&mut reader, 0, 3, 5, 20, 30), crop(&pixels, 50, 1, 3, 5, 20, 30));
    assert_eq!(read(&mut reader, 0, 0, 35, 50, 5), crop(&pixels, 50, 1, 0, 35, 50, 5));
    assert_eq!(reader.window_state(), &WindowState::Unstaged);
}

#[test]
fn test_direct_read_rgb() {
    let pixels: Vec<u8> = (0..30u32 * 20 * 3).map(|i| (i % 256) as u8).collect();
    let data = TiffBuilder::new()
        .add_image(ImageBuilder::raw(30, 20, 3, &pixels, 4))
        .build();
    let mut reader = open_with(data, &RawDecoderFactory::new(3), ReaderConfig::default());

    let series = reader.series_descriptor(0).unwrap();
    assert!(series.is_rgb);
    assert_eq!(series.size_c, 3);
    assert_eq!(read(&mut reader, 0, 10, 3, 15, 9), crop(&pixels, 30, 3, 10, 3, 15, 9));
}

#[test]
fn test_origin_pixel_request_is_a_no_op() {
    let mut reader = open_with(
        gray_pyramid(64, 48, 1, 1).build(),
        &RawDecoderFactory::new(1),
        ReaderConfig::default(),
    );

    let mut buf = [0xEEu8];
    reader.read_region(0, 0, 0, 0, 1, 1, &mut buf).unwrap();
    assert_eq!(buf, [0xEE]);

    // Any other single pixel is read
    reader.read_region(0, 0, 1, 0, 1, 1, &mut buf).unwrap();
    assert_eq!(buf, [7]);
}

// =============================================================================
// Staged Path
// =============================================================================

#[test]
fn test_staged_matches_direct_raw() {
    let data = gray_pyramid(300, 200, 1, 1).build();
    let mut direct = open_with(data.clone(), &RawDecoderFactory::new(1), ReaderConfig::default());
    let mut staged = open_with(
        data,
        &RawDecoderFactory::new(1),
        ReaderConfig::default().with_direct_decode_threshold(100),
    );
    assert!(staged.series_descriptor(0).unwrap().interleaved);
    assert!(!direct.series_descriptor(0).unwrap().interleaved);

    for (x, y, w, h) in [
        (0, 0, 300, 200),
        (17, 33, 50, 60),
        (250, 190, 50, 10),
        (0, 0, 10, 10),
        (299, 199, 1, 1),
    ] {
        assert_eq!(
            read(&mut staged, 0, x, y, w, h),
            read(&mut direct, 0, x, y, w, h),
            "region ({x}, {y}, {w}, {h})"
        );
    }
    assert!(matches!(staged.window_state(), WindowState::Staged { .. }));
}

#[test]
fn test_staged_matches_direct_jpeg() {
    let data = TiffBuilder::new()
        .add_image(ImageBuilder::jpeg(96, 64, create_test_rgb_jpeg(96, 64, 90)))
        .build();
    let mut direct = open_with(data.clone(), &JpegDecoderFactory, ReaderConfig::default());
    let mut staged = open_with(
        data,
        &JpegDecoderFactory,
        ReaderConfig::default().with_direct_decode_threshold(32),
    );

    assert_eq!(read(&mut staged, 0, 0, 0, 96, 64), read(&mut direct, 0, 0, 0, 96, 64));
    assert_eq!(read(&mut staged, 0, 40, 10, 16, 30), read(&mut direct, 0, 40, 10, 16, 30));
}

#[test]
fn test_staged_matches_direct_abbreviated_jpeg() {
    let stream = create_test_rgb_jpeg(96, 64, 90);
    let complete = TiffBuilder::new()
        .add_image(ImageBuilder::jpeg(96, 64, stream.clone()))
        .build();
    let data = TiffBuilder::new()
        .add_image(ImageBuilder::abbreviated_jpeg(96, 64, &stream))
        .build();

    let mut reference = open_with(complete, &JpegDecoderFactory, ReaderConfig::default());
    let mut direct = open_with(data.clone(), &JpegDecoderFactory, ReaderConfig::default());
    let mut staged = open_with(
        data,
        &JpegDecoderFactory,
        ReaderConfig::default().with_direct_decode_threshold(32),
    );

    let expected = read(&mut reference, 0, 40, 10, 16, 30);
    assert_eq!(read(&mut direct, 0, 40, 10, 16, 30), expected);
    assert_eq!(read(&mut staged, 0, 40, 10, 16, 30), expected);
    assert_eq!(read(&mut staged, 0, 0, 0, 96, 64), read(&mut direct, 0, 0, 0, 96, 64));
}

#[test]
fn test_window_hits_issue_no_reads() {
    let source = reader_source(gray_pyramid(300, 200, 1, 1).build());
    let mut reader = PyramidReader::open(
        source.clone(),
        &RawDecoderFactory::new(1),
        ReaderConfig::default().with_direct_decode_threshold(100),
    )
    .unwrap();

    read(&mut reader, 0, 0, 10, 300, 20);
    source.reset();

    let pixels = gray_pattern(300, 200);
    assert_eq!(read(&mut reader, 0, 5, 15, 10, 10), crop(&pixels, 300, 1, 5, 15, 10, 10));
    assert_eq!(source.request_count(), 0);

    read(&mut reader, 0, 0, 100, 10, 10);
    assert!(source.request_count() > 0);
}

/// Staging a huge image whose strip table points outside the file.
fn assert_staging_io_error(tag: u16, value: u32, bad_offset: u64, bad_len: u64) {
    let data = TiffBuilder::new()
        .add_image(ImageBuilder::placeholder(HUGE, HUGE, 3).with_tag(tag, TagValue::Long(vec![value])))
        .build();
    let size = data.len() as u64;
    let factory = RecordingDecoderFactory::new(3, HUGE);
    let mut reader = open_with(data, &factory, ReaderConfig::default());

    let mut buf = vec![0u8; 10 * 10 * 3];
    let result = reader.read_region(0, 0, 5, 5, 10, 10, &mut buf);
    match result {
        Err(ReaderError::Io(IoError::RangeOutOfBounds {
            offset,
            requested,
            size: reported,
        })) => {
            assert_eq!((offset, requested, reported), (bad_offset, bad_len, size));
        }
        other => panic!("expected an out-of-bounds read, got {other:?}"),
    }
    assert_eq!(reader.window_state(), &WindowState::Unstaged);
    assert!(factory.calls().is_empty());
}

#[test]
fn test_staging_strip_offset_past_end() {
    assert_staging_io_error(TAG_STRIP_OFFSETS, 1_000_000, 1_000_000, 32);
}

#[test]
fn test_staging_strip_byte_count_past_end() {
    assert_staging_io_error(TAG_STRIP_BYTE_COUNTS, 1_000_000, 8, 1_000_000);
}

// =============================================================================
// Priming
// =============================================================================

#[test]
fn test_optimal_tile_at_origin_primes_full_height() {
    let (mut reader, factory) = open_huge(1);

    let series = reader.series_descriptor(0).unwrap().clone();
    assert_eq!(series.optimal_tile_width, HUGE);
    assert_eq!(series.optimal_tile_height, 17);

    read(&mut reader, 0, 0, 0, HUGE, 17);
    let stagings = factory.stagings();
    assert_eq!(stagings.len(), 1);
    assert!(matches!(
        stagings[0],
        DecoderCall::Initialize { len: 32, width: HUGE, .. }
    ));
    assert_eq!(
        reader.window_state(),
        &WindowState::Staged {
            series: 0,
            plane: 0,
            rows: 0..HUGE
        }
    );

    // Anywhere in the image is now a hit
    read(&mut reader, 0, 5000, 19_000, 50, 50);
    assert_eq!(factory.stagings().len(), 1);
}

#[test]
fn test_other_requests_prime_exact_rows() {
    let (mut reader, factory) = open_huge(1);

    let buf = read(&mut reader, 0, 5000, 100, 50, 50);
    assert_eq!(
        factory.stagings(),
        vec![DecoderCall::InitializeRows {
            offset: 8,
            len: 32,
            start_row: 100,
            row_count: 50,
            width: HUGE
        }]
    );
    assert_eq!(&buf[..3], &[(5000 % 251) as u8; 3]);
    assert_eq!(&buf[150..153], &[(5000 % 251) as u8; 3]);
}

#[test]
fn test_window_reuse_and_restage() {
    let (mut reader, factory) = open_huge(1);

    read(&mut reader, 0, 5000, 100, 50, 50);
    read(&mut reader, 0, 0, 120, 10, 10);
    assert_eq!(factory.stagings().len(), 1);

    read(&mut reader, 0, 0, 160, 10, 10);
    let calls = factory.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0], DecoderCall::Close);
    assert!(matches!(calls[1], DecoderCall::InitializeRows { start_row: 100, .. }));
    assert_eq!(calls[2], DecoderCall::Close);
    assert!(matches!(
        calls[3],
        DecoderCall::InitializeRows {
            start_row: 160,
            row_count: 10,
            ..
        }
    ));
}

#[test]
fn test_rows_outside_window_keep_buffer_bytes() {
    let (mut reader, _factory) = open_huge(1);
    read(&mut reader, 0, 5000, 100, 50, 50);

    // Starts inside the window at 100..150, ends past it
    let mut buf = vec![0xEEu8; 10 * 20 * 3];
    reader.read_region(0, 0, 0, 140, 10, 20, &mut buf).unwrap();

    let stride = 10 * 3;
    let expected_row: Vec<u8> = (0..10u8).flat_map(|x| [x; 3]).collect();
    for row in 0..10 {
        assert_eq!(&buf[row * stride..(row + 1) * stride], expected_row.as_slice());
    }
    assert!(buf[10 * stride..].iter().all(|&b| b == 0xEE));
}

#[test]
fn test_plane_switch_restages() {
    let (mut reader, factory) = open_huge(2);
    assert_eq!(reader.series_descriptor(0).unwrap().size_z, 2);

    let mut buf = vec![0u8; 50 * 50 * 3];
    reader.read_region(0, 0, 5000, 100, 50, 50, &mut buf).unwrap();
    reader.read_region(0, 1, 5000, 100, 50, 50, &mut buf).unwrap();
    reader.read_region(0, 1, 5000, 110, 50, 40, &mut buf).unwrap();

    let offsets: Vec<u64> = factory
        .stagings()
        .iter()
        .map(|call| match call {
            DecoderCall::InitializeRows { offset, .. } => *offset,
            other => panic!("unexpected staging {other:?}"),
        })
        .collect();
    assert_eq!(offsets, vec![8, 40]);
    assert_eq!(
        reader.window_state(),
        &WindowState::Staged {
            series: 0,
            plane: 1,
            rows: 100..150
        }
    );
}

#[test]
fn test_repeated_reads_are_identical() {
    let (mut reader, factory) = open_huge(1);

    let first = read(&mut reader, 0, 123, 456, 64, 32);
    let second = read(&mut reader, 0, 123, 456, 64, 32);
    assert_eq!(first, second);
    assert_eq!(factory.stagings().len(), 1);
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_invalid_requests() {
    let mut reader = open_with(
        gray_pyramid(64, 48, 2, 1).build(),
        &RawDecoderFactory::new(1),
        ReaderConfig::default(),
    );
    let mut buf = vec![0u8; 64 * 48];

    assert!(matches!(
        reader.read_region(2, 0, 0, 0, 4, 4, &mut buf),
        Err(ReaderError::SeriesOutOfRange { series: 2, count: 2 })
    ));
    assert!(matches!(
        reader.read_region(0, 1, 0, 0, 4, 4, &mut buf),
        Err(ReaderError::PlaneOutOfRange { plane: 1, count: 1 })
    ));
    assert!(matches!(
        reader.read_region(1, 0, 30, 0, 4, 4, &mut buf),
        Err(ReaderError::RegionOutOfBounds { width: 32, .. })
    ));
    assert!(matches!(
        reader.read_region(0, 0, 0, 0, 0, 4, &mut buf),
        Err(ReaderError::RegionOutOfBounds { .. })
    ));
    assert!(matches!(
        reader.read_region(0, 0, 0, u32::MAX, 4, 4, &mut buf),
        Err(ReaderError::RegionOutOfBounds { .. })
    ));
    assert!(matches!(
        reader.read_region(0, 0, 0, 0, 8, 8, &mut buf[..10]),
        Err(ReaderError::BufferTooSmall {
            required: 64,
            actual: 10
        })
    ));
}

#[test]
fn test_open_bytes_reads_active_series() {
    let mut reader = open_with(
        gray_pyramid(64, 48, 2, 1).build(),
        &RawDecoderFactory::new(1),
        ReaderConfig::default(),
    );

    reader.set_series(1).unwrap();
    assert_eq!(reader.series(), 1);

    let mut buf = vec![0u8; 32 * 24];
    reader.open_bytes(0, 0, 0, 32, 24, &mut buf).unwrap();
    assert_eq!(buf, gray_pattern(32, 24));

    assert!(matches!(
        reader.set_series(2),
        Err(ReaderError::SeriesOutOfRange { series: 2, count: 2 })
    ));
    assert_eq!(reader.series(), 1);
}

// =============================================================================
// Close
// =============================================================================

#[test]
fn test_reads_after_close_fail() {
    let (mut reader, factory) = open_huge(1);
    read(&mut reader, 0, 0, 0, 10, 10);

    reader.close();
    reader.close();
    assert!(reader.is_closed());
    assert_eq!(reader.window_state(), &WindowState::Closed);
    assert_eq!(factory.calls().last(), Some(&DecoderCall::Close));

    let mut buf = vec![0u8; 300];
    assert!(matches!(
        reader.read_region(0, 0, 0, 0, 10, 10, &mut buf),
        Err(ReaderError::Closed)
    ));
    assert!(matches!(reader.set_series(0), Err(ReaderError::Closed)));
    assert!(matches!(reader.read_thumbnail(0), Err(ReaderError::Closed)));
}

#[test]
fn test_drop_releases_session() {
    let (mut reader, factory) = open_huge(1);
    read(&mut reader, 0, 0, 0, 10, 10);
    let before = factory.calls().len();

    drop(reader);
    let calls = factory.calls();
    assert_eq!(calls.len(), before + 1);
    assert_eq!(calls.last(), Some(&DecoderCall::Close));
}
