//! Boundary to the remote geospatial compute service.
//!
//! The service does the actual raster work (compositing, clipping, export);
//! this crate only orchestrates it. Each concern is a narrow trait so tests
//! can substitute in-memory fakes: tile enumeration (`TileSource`),
//! composite construction and download-URL issuance (`CompositeService`),
//! and durable zone-grid assets with async export tasks (`ZoneStore`).

mod client;
mod error;

pub use client::GatewayClient;
pub use error::RemoteError;

use serde::{Deserialize, Serialize};

use crate::crs::LonLat;

/// Embedding image collection queried for the composites.
pub const EMBEDDING_COLLECTION: &str = "GOOGLE/SATELLITE_EMBEDDING/V1/ANNUAL";

/// Multiplier applied to embedding band means before the integer cast.
pub const EMBED_SCALE_FACTOR: f64 = 10_000.0;

/// Tolerance (meters) for tile geometry reprojection.
pub const REPROJECT_TOLERANCE_M: f64 = 0.001;

/// Output format requested for download URLs.
pub const DOWNLOAD_FORMAT: &str = "GEO_TIFF";

/// A polygon in a concrete CRS (EPSG 4326 unless reprojected).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileGeometry {
    pub ring: Vec<LonLat>,
    pub epsg: u32,
}

impl TileGeometry {
    pub fn wgs84(ring: Vec<LonLat>) -> Self {
        Self { ring, epsg: 4326 }
    }
}

/// One cell of the grid covering the area of interest. Identity is the
/// index within its source collection's enumeration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridTile {
    pub index: usize,
    pub geometry: TileGeometry,
    pub centroid: LonLat,
}

/// Composite raster definition: one categorical label band stacked on the
/// yearly mean of the requested embedding bands, clipped to the tile,
/// scaled and cast to a fixed-width integer type by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSpec {
    pub collection: String,
    pub label_asset: String,
    pub bands: Vec<String>,
    pub year: i32,
    pub scale_factor: f64,
    pub geometry: TileGeometry,
    pub epsg: u32,
}

/// Opaque server-side handle to a built composite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeHandle {
    pub id: String,
}

/// Request to export a per-zone tile grid to a durable asset. Tiles are
/// shrunk by `buffer_m` (negative) to eliminate edge overlap and tagged
/// with their zone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSpec {
    pub country: String,
    pub zone: u32,
    pub epsg: u32,
    pub grid_size_m: u32,
    pub buffer_m: f64,
    pub asset_id: String,
    pub description: String,
}

/// Handle to a submitted export task, observed only via polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTask {
    pub id: String,
}

/// Remote export task state machine: `submitted → active → {completed, failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Submitted,
    Active,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

/// Enumeration of a remote tile collection.
pub trait TileSource: Send + Sync {
    fn collection_size(&self, asset_id: &str) -> Result<usize, RemoteError>;
    fn tile(&self, asset_id: &str, index: usize) -> Result<GridTile, RemoteError>;
}

/// Composite construction and one-time download-URL issuance.
pub trait CompositeService: Send + Sync {
    /// Reprojects a tile geometry into the given CRS with the given tolerance.
    fn reproject(
        &self,
        geometry: &TileGeometry,
        epsg: u32,
        tolerance_m: f64,
    ) -> Result<TileGeometry, RemoteError>;

    /// Builds the composite for a spec and returns a server-side handle.
    fn composite(&self, spec: &CompositeSpec) -> Result<CompositeHandle, RemoteError>;

    /// Issues a one-time download URL for the composite over `region` at
    /// `res_m` meters per pixel, in GEO_TIFF format.
    fn download_url(
        &self,
        handle: &CompositeHandle,
        region: &TileGeometry,
        res_m: u32,
    ) -> Result<String, RemoteError>;
}

/// Durable asset store plus the zone-level geometry queries provisioning needs.
pub trait ZoneStore: Send + Sync {
    /// UTM zone numbers whose polygons intersect the country AOI.
    fn zones_intersecting(&self, country: &str) -> Result<Vec<u32>, RemoteError>;

    /// Area in square meters of the intersection of the AOI with one zone.
    fn intersection_area_sq_m(&self, country: &str, zone: u32) -> Result<f64, RemoteError>;

    fn asset_exists(&self, asset_id: &str) -> Result<bool, RemoteError>;

    fn submit_export(&self, spec: &ExportSpec) -> Result<ExportTask, RemoteError>;

    fn task_state(&self, task: &ExportTask) -> Result<TaskState, RemoteError>;
}

/// Fetches every tile of a collection in enumeration order.
pub fn all_tiles(source: &dyn TileSource, asset_id: &str) -> Result<Vec<GridTile>, RemoteError> {
    let size = source.collection_size(asset_id)?;
    let mut tiles = Vec::with_capacity(size);
    for i in 0..size {
        tiles.push(source.tile(asset_id, i)?);
    }
    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_terminal_states() {
        assert!(!TaskState::Submitted.is_terminal());
        assert!(!TaskState::Active.is_terminal());
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
    }

    #[test]
    fn task_state_wire_names() {
        assert_eq!(serde_json::to_string(&TaskState::Active).unwrap(), "\"active\"");
        let s: TaskState = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(s, TaskState::Failed);
    }
}
