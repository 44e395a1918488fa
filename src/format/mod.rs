//! Container parsing for NDPI slides.
//!
//! NDPI is a TIFF derivative, so everything format-specific sits on top of
//! the generic [`tiff`] directory parser: JPEG strip handling lives in
//! [`jpeg`], the pyramid interpretation in [`crate::slide`].

pub mod jpeg;
pub mod tiff;
