//! Zone-grid provisioning.
//!
//! Before a zoned run, every UTM zone intersecting the country AOI needs a
//! durable tile-grid asset on the service side. Provisioning is idempotent:
//! an asset that already exists is never re-exported. Export is an
//! asynchronous remote task observed purely by polling.

use std::time::Duration;

use anyhow::{bail, Result};

use crate::crs;
use crate::remote::{ExportSpec, ExportTask, TaskState, ZoneStore};
use crate::sleep::Sleeper;

/// Fixed poll interval for export tasks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Negative buffer applied to exported tiles to eliminate edge overlap.
pub const TILE_EDGE_BUFFER_M: f64 = -1.0;

/// A provisioned per-zone grid: what the work-item generator needs to
/// enumerate that zone's tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneGrid {
    pub zone: u32,
    pub epsg: u32,
    pub asset_id: String,
}

pub struct ZoneGridProvisioner<'a> {
    store: &'a dyn ZoneStore,
    sleeper: &'a dyn Sleeper,
}

impl<'a> ZoneGridProvisioner<'a> {
    pub fn new(store: &'a dyn ZoneStore, sleeper: &'a dyn Sleeper) -> Self {
        Self { store, sleeper }
    }

    /// Ensures a grid asset exists for every zone with a nonzero AOI
    /// intersection and returns them.
    ///
    /// A zone whose area cannot be computed, or whose export task fails, is
    /// skipped with a log; ending up with no zones at all is fatal since
    /// the run would produce nothing.
    pub fn provision(
        &self,
        country: &str,
        grid_size_m: u32,
        asset_folder: &str,
        south: bool,
    ) -> Result<Vec<ZoneGrid>> {
        tracing::info!("provisioning per-zone grids for {}", country);
        let zones = self.store.zones_intersecting(country)?;

        let mut grids = Vec::new();
        for zone in zones {
            let area = match self.store.intersection_area_sq_m(country, zone) {
                Ok(a) => a,
                Err(e) => {
                    tracing::error!("error computing area for zone {}: {}", zone, e);
                    continue;
                }
            };
            if area == 0.0 {
                tracing::warn!("zone {} does not overlap the AOI, skipping", zone);
                continue;
            }

            let epsg = crs::epsg_for_zone(zone, south);
            let asset_id = zone_asset_id(asset_folder, country, grid_size_m, zone);
            if self.store.asset_exists(&asset_id)? {
                tracing::info!("asset {} already exists, skipping export", asset_id);
            } else {
                tracing::info!("exporting grid asset {}", asset_id);
                let spec = ExportSpec {
                    country: country.to_string(),
                    zone,
                    epsg,
                    grid_size_m,
                    buffer_m: TILE_EDGE_BUFFER_M,
                    asset_id: asset_id.clone(),
                    description: format!("{}_grid_{}_zone{}", country, grid_size_m, zone),
                };
                let task = self.store.submit_export(&spec)?;
                if !self.wait_for_export(&task, zone)? {
                    continue;
                }
                tracing::info!("export of zone {} completed", zone);
            }

            grids.push(ZoneGrid { zone, epsg, asset_id });
        }

        if grids.is_empty() {
            bail!("no UTM zone with a nonzero AOI intersection found for {}", country);
        }
        tracing::info!("finished provisioning {} zone grid(s)", grids.len());
        Ok(grids)
    }

    /// Polls a task to a terminal state. Returns `Ok(true)` on completion,
    /// `Ok(false)` if the task failed (the zone is then skipped).
    fn wait_for_export(&self, task: &ExportTask, zone: u32) -> Result<bool> {
        loop {
            match self.store.task_state(task)? {
                TaskState::Completed => return Ok(true),
                TaskState::Failed => {
                    tracing::error!("export task for zone {} failed", zone);
                    return Ok(false);
                }
                TaskState::Submitted | TaskState::Active => {
                    tracing::info!("waiting for export of zone {}...", zone);
                    self.sleeper.sleep(POLL_INTERVAL);
                }
            }
        }
    }
}

/// Deterministic asset id for a zone grid.
pub fn zone_asset_id(asset_folder: &str, country: &str, grid_size_m: u32, zone: u32) -> String {
    format!("{}{}_utm_grid_{}m_zone{}", asset_folder, country, grid_size_m, zone)
}
