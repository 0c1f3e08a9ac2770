//! Fetch worker: executes one work item end-to-end.
//!
//! Reproject, request the composite, obtain a one-time download URL, fetch
//! the bytes, persist atomically, tag band descriptions, and write the
//! directory manifest if it is not there yet. Steps after reprojection are
//! retried as a unit under the run's policy; a geometry failure is final
//! immediately. The worker always returns an outcome; item failures are
//! counted and logged, never propagated.

use std::fs;
use std::sync::Arc;

use crate::http::HttpClient;
use crate::layout::OutputLayout;
use crate::raster::RasterCodec;
use crate::remote::{
    CompositeService, CompositeSpec, TileGeometry, EMBED_SCALE_FACTOR, REPROJECT_TOLERANCE_M,
};
use crate::retry::{run_with_retry, FetchError, RetryPolicy};
use crate::sleep::Sleeper;
use crate::storage;
use crate::workgen::WorkItem;

/// Run-wide composite parameters shared by every item.
#[derive(Debug, Clone)]
pub struct CompositeParams {
    pub collection: String,
    pub label_asset: String,
    pub year: i32,
    pub res_m: u32,
}

/// Result of one work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Artifact fetched and persisted.
    Fetched,
    /// Artifact already existed; nothing done.
    Skipped,
    /// All attempts exhausted or non-transient failure; logged.
    Failed,
}

/// Executes work items. Cheap to clone; one clone per pool worker.
#[derive(Clone)]
pub struct FetchWorker {
    pub service: Arc<dyn CompositeService>,
    pub http: Arc<dyn HttpClient>,
    pub codec: Arc<dyn RasterCodec>,
    pub sleeper: Arc<dyn Sleeper>,
    pub layout: OutputLayout,
    pub policy: RetryPolicy,
    pub params: CompositeParams,
}

impl FetchWorker {
    pub fn run(&self, item: &WorkItem) -> ItemOutcome {
        let path = self.layout.artifact_path(item.epsg, &item.chunk.name, item.tile.index);
        if path.exists() {
            return ItemOutcome::Skipped;
        }

        // Reprojection failure means degenerate geometry; retrying is useless.
        let geometry = match self.service.reproject(
            &item.tile.geometry,
            item.epsg,
            REPROJECT_TOLERANCE_M,
        ) {
            Ok(g) => g,
            Err(e) => {
                tracing::error!("tile {}: failed to prepare geometry: {}", item.tile.index, e);
                return ItemOutcome::Failed;
            }
        };

        let what = format!("tile {} ({})", item.tile.index, item.chunk.name);
        let result = run_with_retry(&self.policy, self.sleeper.as_ref(), &what, || {
            self.fetch_once(item, &geometry)
        });

        match result {
            Ok(()) => {
                self.write_manifest_if_missing(item);
                ItemOutcome::Fetched
            }
            Err(e) => {
                tracing::error!(
                    "tile {} ({}): giving up after {} attempts: {}",
                    item.tile.index,
                    item.chunk.name,
                    self.policy.max_attempts,
                    e
                );
                ItemOutcome::Failed
            }
        }
    }

    /// One fetch attempt. Any error here rolls the whole attempt back to
    /// the composite request; download URLs are one-time, so a partial
    /// sequence cannot be resumed midway.
    fn fetch_once(&self, item: &WorkItem, geometry: &TileGeometry) -> Result<(), FetchError> {
        let spec = CompositeSpec {
            collection: self.params.collection.clone(),
            label_asset: self.params.label_asset.clone(),
            bands: item.chunk.bands.clone(),
            year: self.params.year,
            scale_factor: EMBED_SCALE_FACTOR,
            geometry: geometry.clone(),
            epsg: item.epsg,
        };
        let handle = self.service.composite(&spec)?;
        let url = self.service.download_url(&handle, geometry, self.params.res_m)?;
        let bytes = self.http.get(&url)?;

        let path = self.layout.artifact_path(item.epsg, &item.chunk.name, item.tile.index);
        storage::persist(&path, &bytes)?;
        self.codec.tag_bands(&path, &item.chunk.band_descriptions())?;
        Ok(())
    }

    /// Writes `bands_used.txt` beside the artifacts once per directory,
    /// from whichever tile gets there first. Content is identical for every
    /// item of a chunk, so a duplicate write from a racing worker is harmless.
    fn write_manifest_if_missing(&self, item: &WorkItem) {
        let manifest = self.layout.manifest_path(&item.chunk.name);
        if manifest.exists() {
            return;
        }
        if let Err(e) = fs::write(&manifest, item.chunk.bands.join("\n")) {
            tracing::warn!("could not write {}: {}", manifest.display(), e);
        }
    }
}
