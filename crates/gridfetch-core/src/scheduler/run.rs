//! Run one chunk (optionally one zone of it) to completion.

use std::io;
use std::sync::Arc;

use super::pool::run_bounded;
use super::progress::ChunkProgress;
use crate::chunk::BandChunk;
use crate::crs::HemisphereMode;
use crate::fetcher::{FetchWorker, ItemOutcome};
use crate::remote::GridTile;
use crate::workgen::{self, ResumeStrategy};

/// Aggregate result of one chunk (× zone) run. Every input tile lands in
/// exactly one of the three outcome counters.
#[derive(Debug, Clone)]
pub struct ChunkRunSummary {
    pub chunk: String,
    pub zone: Option<u32>,
    /// Items actually handed to the pool this run.
    pub attempted: usize,
    pub fetched: usize,
    /// Tiles whose artifact already existed, whether filtered at
    /// generation time or caught by a worker's own existence check.
    pub skipped: usize,
    /// Item failures plus tiles with no resolvable CRS.
    pub failed: usize,
}

/// Generates this chunk's work items and drives them through the pool.
///
/// Item failures are reflected only in the summary; the single error path
/// out of here is a failure to enumerate existing output (resume scan).
#[allow(clippy::too_many_arguments)]
pub fn run_chunk(
    tiles: &[GridTile],
    chunk: &Arc<BandChunk>,
    worker: &FetchWorker,
    hemisphere: HemisphereMode,
    zone_epsg: Option<u32>,
    strategy: ResumeStrategy,
    slots: usize,
    mut on_progress: impl FnMut(ChunkProgress),
) -> io::Result<ChunkRunSummary> {
    tracing::info!(
        "starting chunk {} ({} bands: {:?}){}",
        chunk.name,
        chunk.bands.len(),
        chunk.bands,
        zone_epsg.map(|z| format!(" in EPSG {}", z)).unwrap_or_default()
    );

    let plan = workgen::generate(tiles, chunk, &worker.layout, hemisphere, zone_epsg, strategy)?;
    let attempted = plan.items.len();
    if attempted == 0 {
        tracing::info!("chunk {}: nothing to do ({} tiles already done)", chunk.name, plan.done);
    }

    let w = worker.clone();
    let results = run_bounded(
        plan.items,
        slots,
        Arc::new(move |item: &crate::workgen::WorkItem| w.run(item)),
        &mut on_progress,
    );

    let mut summary = ChunkRunSummary {
        chunk: chunk.name.clone(),
        zone: None,
        attempted,
        fetched: 0,
        skipped: plan.done,
        failed: plan.dropped,
    };
    for r in &results {
        match r {
            ItemOutcome::Fetched => summary.fetched += 1,
            ItemOutcome::Skipped => summary.skipped += 1,
            ItemOutcome::Failed => summary.failed += 1,
        }
    }

    tracing::info!(
        "chunk {}: {} fetched, {} already present, {} failed",
        summary.chunk,
        summary.fetched,
        summary.skipped,
        summary.failed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::LonLat;
    use crate::fetcher::CompositeParams;
    use crate::http::HttpClient;
    use crate::layout::OutputLayout;
    use crate::raster::RasterCodec;
    use crate::remote::{
        CompositeHandle, CompositeService, CompositeSpec, RemoteError, TileGeometry,
    };
    use crate::retry::{FetchError, RetryPolicy};
    use crate::sleep::RecordingSleeper;
    use std::path::Path;
    use std::time::Duration;

    struct NullService;

    impl CompositeService for NullService {
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

    struct OkHttp;

    impl HttpClient for OkHttp {
        fn get(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            Ok(b"bytes".to_vec())
        }
    }

    /// Fails for even tile indices (url carries the composite id only, so
    /// failure is keyed off request order instead: every other call).
    struct FlakyHttp {
        fail_every_other: std::sync::atomic::AtomicBool,
    }

    impl HttpClient for FlakyHttp {
        fn get(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            let fail = self
                .fail_every_other
                .fetch_xor(true, std::sync::atomic::Ordering::SeqCst);
            if fail {
                Err(FetchError::Http(502))
            } else {
                Ok(b"bytes".to_vec())
            }
        }
    }

    struct NoopCodec;

    impl RasterCodec for NoopCodec {
        fn band_count(&self, _path: &Path) -> Result<usize, crate::raster::RasterError> {
            Ok(4)
        }

        fn tag_bands(
            &self,
            _path: &Path,
            _names: &[String],
        ) -> Result<(), crate::raster::RasterError> {
            Ok(())
        }
    }

    fn tiles(n: usize) -> Vec<GridTile> {
        let c = LonLat::new(19.0, 47.0);
        (0..n)
            .map(|index| GridTile {
                index,
                geometry: TileGeometry::wgs84(vec![c, c, c, c]),
                centroid: c,
            })
            .collect()
    }

    #[test]
    fn summary_counts_mixed_outcomes_and_run_finishes() {
        let dir = tempfile::tempdir().unwrap();
        let chunk = Arc::new(BandChunk::from_indices("bands_01_22", &[1, 2, 3]));
        let worker = FetchWorker {
            service: Arc::new(NullService),
            http: Arc::new(FlakyHttp { fail_every_other: Default::default() }),
            codec: Arc::new(NoopCodec),
            sleeper: Arc::new(RecordingSleeper::new()),
            layout: OutputLayout::new(dir.path(), "Hungary", "2022", 10),
            policy: RetryPolicy {
                max_attempts: 1,
                base_wait: Duration::from_secs(0),
                max_delay: Duration::from_secs(0),
            },
            params: CompositeParams {
                collection: "c".into(),
                label_asset: "l".into(),
                year: 2022,
                res_m: 10,
            },
        };

        let mut last_progress = None;
        let summary = run_chunk(
            &tiles(8),
            &chunk,
            &worker,
            HemisphereMode::PerTile,
            None,
            crate::workgen::ResumeStrategy::Exists,
            2,
            |p| last_progress = Some(p),
        )
        .unwrap();

        assert_eq!(summary.attempted, 8);
        assert_eq!(summary.fetched + summary.failed, 8);
        assert!(summary.failed > 0, "flaky http should fail some items");
        assert!(summary.fetched > 0, "flaky http should pass some items");
        assert_eq!(last_progress.unwrap().completed, 8);
    }

    #[test]
    fn rerun_counts_existing_artifacts_as_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let chunk = Arc::new(BandChunk::from_indices("bands_01_22", &[1, 2, 3]));
        let worker = FetchWorker {
            service: Arc::new(NullService),
            http: Arc::new(OkHttp),
            codec: Arc::new(NoopCodec),
            sleeper: Arc::new(RecordingSleeper::new()),
            layout: OutputLayout::new(dir.path(), "Hungary", "2022", 10),
            policy: RetryPolicy::default(),
            params: CompositeParams {
                collection: "c".into(),
                label_asset: "l".into(),
                year: 2022,
                res_m: 10,
            },
        };

        let run = |tiles: &[GridTile]| {
            run_chunk(
                tiles,
                &chunk,
                &worker,
                HemisphereMode::PerTile,
                None,
                crate::workgen::ResumeStrategy::Exists,
                2,
                |_| {},
            )
            .unwrap()
        };

        let first = run(&tiles(5));
        assert_eq!(first.attempted, 5);
        assert_eq!(first.fetched, 5);
        assert_eq!(first.skipped, 0);

        // Everything exists now; generation filters it all and the summary
        // still accounts for every tile.
        let second = run(&tiles(5));
        assert_eq!(second.attempted, 0);
        assert_eq!(second.fetched, 0);
        assert_eq!(second.skipped, 5);
        assert_eq!(second.failed, 0);
    }
}
