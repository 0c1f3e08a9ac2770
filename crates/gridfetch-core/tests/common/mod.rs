//! Shared fakes for integration tests: an in-memory compute gateway and an
//! HTTP client that serves synthetic TIFF bytes.

use std::sync::atomic::{AtomicUsize, Ordering};

use gridfetch_core::crs::LonLat;
use gridfetch_core::http::HttpClient;
use gridfetch_core::remote::{
    CompositeHandle, CompositeService, CompositeSpec, GridTile, RemoteError, TileGeometry,
    TileSource,
};
use gridfetch_core::retry::FetchError;

/// Minimal little-endian TIFF carrying only the tags the codec reads:
/// ImageWidth, ImageLength, and SamplesPerPixel.
pub fn tiny_tiff(bands: u16) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"II");
    buf.extend_from_slice(&42u16.to_le_bytes());
    buf.extend_from_slice(&8u32.to_le_bytes());

    let entries: [(u16, u16, u32); 3] = [(256, 4, 1), (257, 4, 1), (277, 3, u32::from(bands))];
    buf.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (tag, ty, value) in entries {
        buf.extend_from_slice(&tag.to_le_bytes());
        buf.extend_from_slice(&ty.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        if ty == 3 {
            buf.extend_from_slice(&(value as u16).to_le_bytes());
            buf.extend_from_slice(&[0, 0]);
        } else {
            buf.extend_from_slice(&value.to_le_bytes());
        }
    }
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf
}

/// Fixed-size grid centered in northern Hungary (UTM zone 34).
pub struct FakeGrid {
    pub tiles: usize,
}

impl TileSource for FakeGrid {
    fn collection_size(&self, _asset_id: &str) -> Result<usize, RemoteError> {
        Ok(self.tiles)
    }

    fn tile(&self, _asset_id: &str, index: usize) -> Result<GridTile, RemoteError> {
        let c = LonLat::new(19.5, 47.2);
        Ok(GridTile {
            index,
            geometry: TileGeometry::wgs84(vec![c, c, c, c]),
            centroid: c,
        })
    }
}

/// Compute service that always succeeds.
pub struct FakeCompute;

impl CompositeService for FakeCompute {
    fn reproject(
        &self,
        geometry: &TileGeometry,
        epsg: u32,
        _tolerance_m: f64,
    ) -> Result<TileGeometry, RemoteError> {
        Ok(TileGeometry { ring: geometry.ring.clone(), epsg })
    }

    fn composite(&self, spec: &CompositeSpec) -> Result<CompositeHandle, RemoteError> {
        Ok(CompositeHandle { id: format!("composite-{}-{}", spec.year, spec.bands.len()) })
    }

    fn download_url(
        &self,
        handle: &CompositeHandle,
        _region: &TileGeometry,
        _res_m: u32,
    ) -> Result<String, RemoteError> {
        Ok(format!("https://gateway.test/dl/{}", handle.id))
    }
}

/// Serves the same synthetic TIFF for every URL and counts requests.
pub struct TiffServer {
    pub bands: u16,
    pub requests: AtomicUsize,
}

impl TiffServer {
    pub fn new(bands: u16) -> Self {
        Self { bands, requests: AtomicUsize::new(0) }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl HttpClient for TiffServer {
    fn get(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(tiny_tiff(self.bands))
    }
}
