//! Thumbnail sizing and sampling.

/// Thumbnail size for an image of `size_x` x `size_y`.
///
/// Images smaller than `dimension` on both sides keep their size. Otherwise
/// the longer side becomes `dimension` and the shorter one is scaled to
/// match, never below 1.
pub fn thumbnail_size(size_x: u32, size_y: u32, dimension: u32) -> (u32, u32) {
    if size_x < dimension && size_y < dimension {
        return (size_x, size_y);
    }

    let scale = |short: u32, long: u32| -> u32 {
        ((short as u64 * dimension as u64) / long.max(1) as u64).max(1) as u32
    };

    if size_x > size_y {
        (dimension, scale(size_y, size_x))
    } else if size_y > size_x {
        (scale(size_x, size_y), dimension)
    } else {
        (dimension, dimension)
    }
}

/// Nearest-neighbour resize of a packed image.
///
/// Pixels are copied whole (`pixel_bytes` each), so any sample type works.
pub fn sample_nearest(
    src: &[u8],
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
    pixel_bytes: usize,
) -> Vec<u8> {
    let src_stride = src_width as usize * pixel_bytes;
    let mut out = Vec::with_capacity(dst_width as usize * dst_height as usize * pixel_bytes);

    for ty in 0..dst_height as u64 {
        let sy = (ty * src_height as u64 / dst_height as u64) as usize;
        let row = &src[sy * src_stride..(sy + 1) * src_stride];
        for tx in 0..dst_width as u64 {
            let sx = (tx * src_width as u64 / dst_width as u64) as usize;
            out.extend_from_slice(&row[sx * pixel_bytes..(sx + 1) * pixel_bytes]);
        }
    }

    out
}
