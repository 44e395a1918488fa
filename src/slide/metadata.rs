//! Image-level metadata derived from the tag directories.
//!
//! For every series the store records a name, the acquisition date and the
//! physical pixel size of its representative sub-image. Container-wide
//! scanner information comes from the first IFD:
//!
//! - **ScannerProperties** (tag 65449): `key=value` lines written by the
//!   scanner software
//! - **SourceLens** (tag 65421): objective magnification as a FLOAT

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::warn;

use crate::format::tiff::{Ifd, ResolutionUnit, TiffTag};

/// Date layout of the TIFF DateTime tag.
const TIFF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// ISO-8601 layout used in the store.
const ISO_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// =============================================================================
// ScannerProperties
// =============================================================================

/// Key/value pairs from the scanner properties tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScannerProperties {
    pub properties: HashMap<String, String>,
}

impl ScannerProperties {
    /// Parse `key=value` lines; lines without `=` are ignored.
    pub fn parse(text: &str) -> Self {
        let properties = text
            .lines()
            .filter_map(|line| {
                let (key, value) = line.split_once('=')?;
                let key = key.trim();
                (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
            })
            .collect();
        Self { properties }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

// =============================================================================
// ImageMetadata
// =============================================================================

/// Metadata of one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub name: String,
    /// ISO-8601 acquisition date
    pub acquisition_date: Option<String>,
    /// Microns per pixel along X
    pub physical_size_x: Option<f64>,
    /// Microns per pixel along Y
    pub physical_size_y: Option<f64>,
    pub physical_size_z: Option<f64>,
}

impl ImageMetadata {
    /// Read the metadata of `series` from its representative IFD.
    pub fn from_ifd(series: usize, ifd: &Ifd) -> Self {
        let unit = ifd.resolution_unit();
        let acquisition_date = ifd.text(TiffTag::DateTime).and_then(|raw| {
            let iso = normalize_date(&raw);
            if iso.is_none() {
                warn!(series, date = %raw, "Dropping unparseable acquisition date");
            }
            iso
        });

        Self {
            name: format!("Series {}", series + 1),
            acquisition_date,
            physical_size_x: physical_size(ifd.x_resolution(), unit),
            physical_size_y: physical_size(ifd.y_resolution(), unit),
            physical_size_z: (series > 0).then_some(0.0),
        }
    }
}

// =============================================================================
// MetadataStore
// =============================================================================

/// Metadata for all series plus container-wide scanner information.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataStore {
    pub images: Vec<ImageMetadata>,
    pub scanner_properties: ScannerProperties,
    /// Objective magnification
    pub source_lens: Option<f64>,
}

impl MetadataStore {
    /// Build the store from the first IFD and each series' representative.
    pub fn populate<'a>(first: &Ifd, representatives: impl IntoIterator<Item = &'a Ifd>) -> Self {
        let images = representatives
            .into_iter()
            .enumerate()
            .map(|(series, ifd)| ImageMetadata::from_ifd(series, ifd))
            .collect();

        let scanner_properties = first
            .text(TiffTag::ScannerProperties)
            .map(|text| ScannerProperties::parse(&text))
            .unwrap_or_default();

        Self {
            images,
            scanner_properties,
            source_lens: first.float(TiffTag::SourceLens),
        }
    }

    /// Metadata of `series`.
    pub fn image(&self, series: usize) -> Option<&ImageMetadata> {
        self.images.get(series)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Convert a TIFF `YYYY:MM:DD HH:MM:SS` timestamp to ISO-8601.
pub fn normalize_date(raw: &str) -> Option<String> {
    NaiveDateTime::parse_from_str(raw.trim(), TIFF_DATE_FORMAT)
        .ok()
        .map(|dt| dt.format(ISO_DATE_FORMAT).to_string())
}

/// Microns per pixel for a resolution in pixels per `unit`.
pub fn physical_size(resolution: Option<f64>, unit: Option<ResolutionUnit>) -> Option<f64> {
    let microns = unit?.microns()?;
    let resolution = resolution.filter(|r| r.is_finite() && *r > 0.0)?;
    Some(microns / resolution)
}
