//! Raster codec boundary.
//!
//! The fetch worker tags band descriptions after persisting an artifact and
//! the validator reads band counts back; both go through `RasterCodec`.
//! `TiffCodec` is a deliberately small GeoTIFF-compatible implementation:
//! it reads `SamplesPerPixel` and rewrites the `ImageDescription` tag, and
//! nothing else. Full raster decoding stays with the remote service.

mod tiff;

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("raster io: {0}")]
    Io(#[from] std::io::Error),
    #[error("raster format: {0}")]
    Format(String),
}

pub trait RasterCodec: Send + Sync {
    /// Number of bands in the raster at `path`.
    fn band_count(&self, path: &Path) -> Result<usize, RasterError>;

    /// Writes band descriptions (one per band, in band order) into the file.
    fn tag_bands(&self, path: &Path, names: &[String]) -> Result<(), RasterError>;
}

/// TIFF-backed codec; descriptions are stored newline-joined in the
/// `ImageDescription` tag.
#[derive(Debug, Default, Clone, Copy)]
pub struct TiffCodec;

impl RasterCodec for TiffCodec {
    fn band_count(&self, path: &Path) -> Result<usize, RasterError> {
        tiff::read_band_count(path).map(|n| n as usize)
    }

    fn tag_bands(&self, path: &Path, names: &[String]) -> Result<(), RasterError> {
        tiff::write_description(path, &names.join("\n"))
    }
}

#[cfg(test)]
pub(crate) use tiff::build_test_tiff;
