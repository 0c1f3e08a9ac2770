//! Batch pipeline: config plus collaborators in, per-chunk summaries out.
//!
//! The pipeline owns the run order. In single-grid mode the country grid is
//! enumerated once and every chunk runs over it. In zoned mode the zone
//! grids are provisioned first, then every chunk runs once per zone with
//! that zone's EPSG pinned. Failures inside an item stay inside the item;
//! the errors propagated from here are the pre-flight ones (configuration,
//! zone discovery, grid enumeration).

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::config::{GridMode, RunConfig};
use crate::fetcher::{CompositeParams, FetchWorker};
use crate::http::HttpClient;
use crate::layout::OutputLayout;
use crate::provision::ZoneGridProvisioner;
use crate::raster::RasterCodec;
use crate::remote::{all_tiles, CompositeService, TileSource, ZoneStore};
use crate::scheduler::{run_chunk, ChunkProgress, ChunkRunSummary};
use crate::sleep::Sleeper;

/// External collaborators of a batch run. `zones` is only needed for zoned
/// mode; single-grid runs leave it `None`.
pub struct PipelineDeps {
    pub tiles: Arc<dyn TileSource>,
    pub service: Arc<dyn CompositeService>,
    pub zones: Option<Arc<dyn ZoneStore>>,
    pub http: Arc<dyn HttpClient>,
    pub codec: Arc<dyn RasterCodec>,
    pub sleeper: Arc<dyn Sleeper>,
}

/// Runs the whole batch described by `cfg` with at most `slots` items in
/// flight. `on_progress` fires per completed item with the chunk name.
pub fn run_batch(
    cfg: &RunConfig,
    deps: &PipelineDeps,
    slots: usize,
    mut on_progress: impl FnMut(&str, ChunkProgress),
) -> Result<Vec<ChunkRunSummary>> {
    let year = cfg.year()?;
    let worker = FetchWorker {
        service: Arc::clone(&deps.service),
        http: Arc::clone(&deps.http),
        codec: Arc::clone(&deps.codec),
        sleeper: Arc::clone(&deps.sleeper),
        layout: OutputLayout::new(&cfg.output_dir, &cfg.country_name, year.to_string(), cfg.res_m),
        policy: cfg.retry_policy(),
        params: CompositeParams {
            collection: cfg.embedding_collection.clone(),
            label_asset: cfg.label_asset.clone(),
            year,
            res_m: cfg.res_m,
        },
    };
    let chunks = cfg.band_chunks();

    let mut summaries = Vec::new();
    match cfg.grid_mode() {
        GridMode::Single { asset } => {
            let tiles = all_tiles(deps.tiles.as_ref(), &asset)
                .with_context(|| format!("enumerating grid {}", asset))?;
            tracing::info!("grid {} has {} tiles", asset, tiles.len());
            for chunk in &chunks {
                let summary = run_chunk(
                    &tiles,
                    chunk,
                    &worker,
                    cfg.hemisphere_mode(),
                    None,
                    cfg.resume,
                    slots,
                    |p| on_progress(&chunk.name, p),
                )?;
                summaries.push(summary);
            }
        }
        GridMode::Zoned { grid_size_m, asset_folder } => {
            let Some(zones) = &deps.zones else {
                bail!("zoned mode requires a zone store");
            };
            let provisioner = ZoneGridProvisioner::new(zones.as_ref(), deps.sleeper.as_ref());
            let grids =
                provisioner.provision(&cfg.country_name, grid_size_m, &asset_folder, cfg.south)?;

            for chunk in &chunks {
                for grid in &grids {
                    let tiles = all_tiles(deps.tiles.as_ref(), &grid.asset_id)
                        .with_context(|| format!("enumerating grid {}", grid.asset_id))?;
                    tracing::info!(
                        "zone {} grid {} has {} tiles",
                        grid.zone,
                        grid.asset_id,
                        tiles.len()
                    );
                    let mut summary = run_chunk(
                        &tiles,
                        chunk,
                        &worker,
                        crate::crs::HemisphereMode::Global { south: cfg.south },
                        Some(grid.epsg),
                        cfg.resume,
                        slots,
                        |p| on_progress(&chunk.name, p),
                    )?;
                    summary.zone = Some(grid.zone);
                    summaries.push(summary);
                }
            }
        }
    }

    let failed: usize = summaries.iter().map(|s| s.failed).sum();
    if failed > 0 {
        tracing::warn!("batch finished with {} failed item(s)", failed);
    } else {
        tracing::info!("batch finished cleanly");
    }
    Ok(summaries)
}

/// Builds the run's output layout without running anything. Used by the
/// status and validate commands.
pub fn layout_for(cfg: &RunConfig) -> Result<OutputLayout> {
    let year = cfg.year()?;
    Ok(OutputLayout::new(&cfg.output_dir, &cfg.country_name, year.to_string(), cfg.res_m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::LonLat;
    use crate::raster::RasterError;
    use crate::remote::{
        CompositeHandle, CompositeSpec, GridTile, RemoteError, TileGeometry,
    };
    use crate::retry::FetchError;
    use crate::sleep::RecordingSleeper;
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedTiles {
        n: usize,
    }

    impl TileSource for FixedTiles {
        fn collection_size(&self, _asset_id: &str) -> Result<usize, RemoteError> {
            Ok(self.n)
        }

        fn tile(&self, _asset_id: &str, index: usize) -> Result<GridTile, RemoteError> {
            let c = LonLat::new(19.0, 47.0);
            Ok(GridTile {
                index,
                geometry: TileGeometry::wgs84(vec![c, c, c, c]),
                centroid: c,
            })
        }
    }

    struct OkService;

    impl CompositeService for OkService {
        fn reproject(
            &self,
            geometry: &TileGeometry,
            epsg: u32,
            _tolerance_m: f64,
        ) -> Result<TileGeometry, RemoteError> {
            Ok(TileGeometry { ring: geometry.ring.clone(), epsg })
        }

        fn composite(&self, _spec: &CompositeSpec) -> Result<CompositeHandle, RemoteError> {
            Ok(CompositeHandle { id: "c".into() })
        }

        fn download_url(
            &self,
            _handle: &CompositeHandle,
            _region: &TileGeometry,
            _res_m: u32,
        ) -> Result<String, RemoteError> {
            Ok("https://dl.example/c".into())
        }
    }

    struct CountingHttp {
        calls: AtomicUsize,
    }

    impl HttpClient for CountingHttp {
        fn get(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(b"tif".to_vec())
        }
    }

    struct NoopCodec;

    impl RasterCodec for NoopCodec {
        fn band_count(&self, _path: &Path) -> Result<usize, RasterError> {
            Ok(3)
        }

        fn tag_bands(&self, _path: &Path, _names: &[String]) -> Result<(), RasterError> {
            Ok(())
        }
    }

    fn single_grid_config(out: &Path) -> RunConfig {
        let mut chunks = BTreeMap::new();
        chunks.insert("bands_01_02".to_string(), vec![1u16, 2]);
        let cfg: RunConfig = toml::from_str(&format!(
            r#"
                country_name = "Hungary"
                start_date = "2022-01-01"
                res_m = 10
                output_dir = "{}"
                grid_asset = "projects/x/assets/grid"

                [chunks]
                bands_01_02 = [1, 2]
            "#,
            out.display()
        ))
        .unwrap();
        assert_eq!(cfg.chunks, chunks);
        cfg
    }

    fn deps(http: Arc<CountingHttp>) -> PipelineDeps {
        PipelineDeps {
            tiles: Arc::new(FixedTiles { n: 4 }),
            service: Arc::new(OkService),
            zones: None,
            http,
            codec: Arc::new(NoopCodec),
            sleeper: Arc::new(RecordingSleeper::new()),
        }
    }

    #[test]
    fn second_run_downloads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = single_grid_config(dir.path());
        let http = Arc::new(CountingHttp { calls: AtomicUsize::new(0) });
        let d = deps(Arc::clone(&http));

        let first = run_batch(&cfg, &d, 2, |_, _| {}).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].fetched, 4);
        assert_eq!(http.calls.load(Ordering::SeqCst), 4);

        let second = run_batch(&cfg, &d, 2, |_, _| {}).unwrap();
        assert_eq!(second[0].fetched, 0);
        assert_eq!(second[0].skipped, 4);
        assert_eq!(http.calls.load(Ordering::SeqCst), 4, "no re-downloads");
    }

    #[test]
    fn zoned_mode_without_zone_store_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = single_grid_config(dir.path());
        cfg.grid_asset = None;
        cfg.grid_size_m = Some(15360);
        cfg.asset_folder = Some("projects/x/".into());
        let http = Arc::new(CountingHttp { calls: AtomicUsize::new(0) });
        assert!(run_batch(&cfg, &deps(http), 2, |_, _| {}).is_err());
    }

    #[test]
    fn progress_reports_carry_the_chunk_name() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = single_grid_config(dir.path());
        let http = Arc::new(CountingHttp { calls: AtomicUsize::new(0) });
        let d = deps(http);

        let mut seen = Vec::new();
        run_batch(&cfg, &d, 1, |chunk, p| seen.push((chunk.to_string(), p.completed))).unwrap();
        assert_eq!(seen.len(), 4);
        assert!(seen.iter().all(|(c, _)| c == "bands_01_02"));
        assert_eq!(seen.last().unwrap().1, 4);
    }
}
