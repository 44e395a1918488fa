//! Pyramid interpretation of an NDPI container.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             PyramidReader               │
//! │  (series, planes, regions, thumbnails)  │
//! └───────┬──────────────┬──────────────┬───┘
//!         │              │              │
//!         ▼              ▼              ▼
//! ┌──────────────┐ ┌────────────┐ ┌──────────────────────┐
//! │PyramidLayout │ │ Series +   │ │ ScanlineWindowCache  │
//! │ (geometry)   │ │ Metadata   │ │ (staged decoding)    │
//! └──────┬───────┘ └─────┬──────┘ └──────────┬───────────┘
//!        └───────────────┼───────────────────┘
//!                        ▼
//! ┌─────────────────────────────────────────┐
//! │        TiffDirectory / strips           │
//! └─────────────────────────────────────────┘
//! ```

mod layout;
mod metadata;
mod reader;
mod series;
mod thumbnail;
mod window;

pub use layout::PyramidLayout;
pub use metadata::{normalize_date, physical_size, ImageMetadata, MetadataStore, ScannerProperties};
pub use reader::PyramidReader;
pub use series::{PixelType, SeriesDescriptor};
pub use thumbnail::{sample_nearest, thumbnail_size};
pub use window::{Priming, ScanlineWindowCache, WindowState};
