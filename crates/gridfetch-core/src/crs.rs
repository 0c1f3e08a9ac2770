//! UTM zone and EPSG code resolution from tile centroids.
//!
//! Two hemisphere modes exist and are deliberately not unified: per-tile
//! derives north/south from each centroid's latitude, global applies one
//! configured flag to every tile. They disagree for mixed-hemisphere areas
//! of interest, so the mode is explicit configuration.

use std::fmt;

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// How the N/S hemisphere of a tile's projected CRS is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HemisphereMode {
    /// Derive from each tile's own centroid latitude.
    PerTile,
    /// Apply one flag uniformly (used when a whole zone shares one CRS).
    Global { south: bool },
}

/// Centroid could not be resolved to a CRS (degenerate or out-of-range geometry).
#[derive(Debug, Clone, PartialEq)]
pub struct CrsError {
    pub centroid: LonLat,
}

impl fmt::Display for CrsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid centroid ({}, {}): cannot resolve UTM zone",
            self.centroid.lon, self.centroid.lat
        )
    }
}

impl std::error::Error for CrsError {}

/// UTM zone for a longitude: `floor((lon + 180) / 6) + 1`.
///
/// Longitude 180 wraps into zone 60 rather than the nonexistent zone 61.
pub fn utm_zone(lon: f64) -> u32 {
    let zone = ((lon + 180.0) / 6.0).floor() as u32 + 1;
    zone.min(60)
}

/// EPSG code for a zone and hemisphere: 326xx north, 327xx south.
pub fn epsg_for_zone(zone: u32, south: bool) -> u32 {
    if south {
        32700 + zone
    } else {
        32600 + zone
    }
}

/// Resolves the projected CRS code for a tile centroid.
///
/// Pure and deterministic; the only failure is a centroid outside valid
/// WGS84 bounds (including NaN), which callers treat as a fatal per-tile error.
pub fn epsg_for(centroid: LonLat, mode: HemisphereMode) -> Result<u32, CrsError> {
    if !centroid.lon.is_finite()
        || !centroid.lat.is_finite()
        || centroid.lon < -180.0
        || centroid.lon > 180.0
        || centroid.lat < -90.0
        || centroid.lat > 90.0
    {
        return Err(CrsError { centroid });
    }

    let zone = utm_zone(centroid.lon);
    let south = match mode {
        HemisphereMode::PerTile => centroid.lat < 0.0,
        HemisphereMode::Global { south } => south,
    };
    Ok(epsg_for_zone(zone, south))
}
