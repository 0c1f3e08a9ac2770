//! JSON-over-HTTP adapter to the compute gateway.
//!
//! Production wiring for the `remote` traits. The gateway fronts the actual
//! geospatial compute service; this client only shuttles specs and handles
//! back and forth. Runs in the calling thread (workers are already on a
//! thread pool, so no extra indirection is needed).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{
    CompositeHandle, CompositeService, CompositeSpec, ExportSpec, ExportTask, GridTile,
    RemoteError, TaskState, TileGeometry, TileSource, ZoneStore, DOWNLOAD_FORMAT,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for the compute gateway's REST surface.
pub struct GatewayClient {
    base: String,
}

impl GatewayClient {
    /// `base` is the gateway root, e.g. `https://compute.internal/v1`.
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self { base }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn perform(&self, url: &str, body: Option<&[u8]>) -> Result<Vec<u8>, RemoteError> {
        let mut out = Vec::new();
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.connect_timeout(CONNECT_TIMEOUT)?;
        easy.timeout(REQUEST_TIMEOUT)?;
        easy.follow_location(true)?;

        if body.is_some() {
            easy.post(true)?;
            let mut headers = curl::easy::List::new();
            headers.append("Content-Type: application/json")?;
            easy.http_headers(headers)?;
        }

        {
            let mut body_remaining = body.unwrap_or(&[]);
            let mut transfer = easy.transfer();
            if body.is_some() {
                transfer.read_function(move |buf| {
                    let n = body_remaining.len().min(buf.len());
                    buf[..n].copy_from_slice(&body_remaining[..n]);
                    body_remaining = &body_remaining[n..];
                    Ok(n)
                })?;
            }
            transfer.write_function(|data| {
                out.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        match code {
            200..=299 => Ok(out),
            // The gateway reports unprocessable geometry as 422 with a
            // plain-text reason; surface it as the non-transient kind.
            422 => Err(RemoteError::Geometry(
                String::from_utf8_lossy(&out).into_owned(),
            )),
            _ => Err(RemoteError::Http(code)),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let bytes = self.perform(&self.url(path), None)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| RemoteError::Service(format!("bad gateway response for {}: {}", path, e)))
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RemoteError> {
        let payload = serde_json::to_vec(body)
            .map_err(|e| RemoteError::Service(format!("encode request for {}: {}", path, e)))?;
        let bytes = self.perform(&self.url(path), Some(&payload))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| RemoteError::Service(format!("bad gateway response for {}: {}", path, e)))
    }
}

#[derive(Deserialize)]
struct SizeResponse {
    size: usize,
}

#[derive(Deserialize)]
struct UrlResponse {
    url: String,
}

#[derive(Deserialize)]
struct ExistsResponse {
    exists: bool,
}

#[derive(Deserialize)]
struct ZonesResponse {
    zones: Vec<u32>,
}

#[derive(Deserialize)]
struct AreaResponse {
    area_sq_m: f64,
}

#[derive(Deserialize)]
struct TaskResponse {
    state: TaskState,
}

#[derive(Serialize)]
struct ReprojectRequest<'a> {
    geometry: &'a TileGeometry,
    epsg: u32,
    tolerance_m: f64,
}

#[derive(Serialize)]
struct DownloadUrlRequest<'a> {
    region: &'a TileGeometry,
    scale_m: u32,
    format: &'a str,
}

impl TileSource for GatewayClient {
    fn collection_size(&self, asset_id: &str) -> Result<usize, RemoteError> {
        let r: SizeResponse = self.get_json(&format!("/collections/{}/size", asset_id))?;
        Ok(r.size)
    }

    fn tile(&self, asset_id: &str, index: usize) -> Result<GridTile, RemoteError> {
        self.get_json(&format!("/collections/{}/features/{}", asset_id, index))
    }
}

impl CompositeService for GatewayClient {
    fn reproject(
        &self,
        geometry: &TileGeometry,
        epsg: u32,
        tolerance_m: f64,
    ) -> Result<TileGeometry, RemoteError> {
        self.post_json(
            "/geometry/reproject",
            &ReprojectRequest { geometry, epsg, tolerance_m },
        )
    }

    fn composite(&self, spec: &CompositeSpec) -> Result<CompositeHandle, RemoteError> {
        self.post_json("/composites", spec)
    }

    fn download_url(
        &self,
        handle: &CompositeHandle,
        region: &TileGeometry,
        res_m: u32,
    ) -> Result<String, RemoteError> {
        let r: UrlResponse = self.post_json(
            &format!("/composites/{}/download-url", handle.id),
            &DownloadUrlRequest { region, scale_m: res_m, format: DOWNLOAD_FORMAT },
        )?;
        Ok(r.url)
    }
}

impl ZoneStore for GatewayClient {
    fn zones_intersecting(&self, country: &str) -> Result<Vec<u32>, RemoteError> {
        let r: ZonesResponse = self.get_json(&format!("/aoi/{}/utm-zones", country))?;
        Ok(r.zones)
    }

    fn intersection_area_sq_m(&self, country: &str, zone: u32) -> Result<f64, RemoteError> {
        let r: AreaResponse =
            self.get_json(&format!("/aoi/{}/utm-zones/{}/intersection-area", country, zone))?;
        Ok(r.area_sq_m)
    }

    fn asset_exists(&self, asset_id: &str) -> Result<bool, RemoteError> {
        let r: ExistsResponse = self.get_json(&format!("/assets/{}/exists", asset_id))?;
        Ok(r.exists)
    }

    fn submit_export(&self, spec: &ExportSpec) -> Result<ExportTask, RemoteError> {
        self.post_json("/exports", spec)
    }

    fn task_state(&self, task: &ExportTask) -> Result<TaskState, RemoteError> {
        let r: TaskResponse = self.get_json(&format!("/exports/{}", task.id))?;
        Ok(r.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let c = GatewayClient::new("https://compute.internal/v1/");
        assert_eq!(c.url("/exports"), "https://compute.internal/v1/exports");
    }
}
