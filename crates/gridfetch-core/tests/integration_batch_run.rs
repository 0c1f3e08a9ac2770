//! Integration test: full batch run against an in-memory gateway, then a
//! sweep and a repair run.
//!
//! Exercises the whole chain with the real TIFF codec: work generation,
//! the bounded pool, atomic persistence, band tagging, the manifest, and
//! the sweeper feeding the next run.

mod common;

use std::sync::Arc;

use gridfetch_core::config::RunConfig;
use gridfetch_core::pipeline::{layout_for, run_batch, PipelineDeps};
use gridfetch_core::raster::{RasterCodec, TiffCodec};
use gridfetch_core::sleep::ThreadSleeper;
use gridfetch_core::validate::sweep_chunk;
use tempfile::tempdir;

fn config_for(out: &std::path::Path) -> RunConfig {
    let body = format!(
        r#"
            country_name = "Hungary"
            start_date = "2022-01-01"
            res_m = 10
            output_dir = "{}"
            grid_asset = "projects/test/assets/hungary_grid"

            [chunks]
            bands_01_03 = [1, 2, 3]
        "#,
        out.display()
    );
    let cfg: RunConfig = toml::from_str(&body).unwrap();
    cfg.validate().unwrap();
    cfg
}

fn deps(server: Arc<common::TiffServer>, tiles: usize) -> PipelineDeps {
    PipelineDeps {
        tiles: Arc::new(common::FakeGrid { tiles }),
        service: Arc::new(common::FakeCompute),
        zones: None,
        http: server,
        codec: Arc::new(TiffCodec),
        sleeper: Arc::new(ThreadSleeper),
    }
}

#[test]
fn batch_run_writes_tagged_artifacts_and_manifest() {
    let out = tempdir().unwrap();
    let cfg = config_for(out.path());
    // Label band plus three embedding bands.
    let server = Arc::new(common::TiffServer::new(4));
    let d = deps(Arc::clone(&server), 5);

    let summaries = run_batch(&cfg, &d, 2, |_, _| {}).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].fetched, 5);
    assert_eq!(summaries[0].failed, 0);

    let layout = layout_for(&cfg).unwrap();
    let dir = layout.chunk_dir("bands_01_03");
    for index in 0..5 {
        // Hungary sits in UTM zone 34 north.
        let path = layout.artifact_path(32634, "bands_01_03", index);
        assert!(path.exists(), "artifact {} missing", index);
        assert_eq!(TiffCodec.band_count(&path).unwrap(), 4);
    }

    let manifest = std::fs::read_to_string(dir.join("bands_used.txt")).unwrap();
    assert_eq!(manifest, "A01\nA02\nA03");

    // No stray .part files once the run completes.
    let leftovers: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn sweep_then_rerun_repairs_broken_artifacts() {
    let out = tempdir().unwrap();
    let cfg = config_for(out.path());
    let server = Arc::new(common::TiffServer::new(4));
    let d = deps(Arc::clone(&server), 4);

    run_batch(&cfg, &d, 2, |_, _| {}).unwrap();
    assert_eq!(server.request_count(), 4);

    // Simulate a truncated download that slipped through: wrong band count.
    let layout = layout_for(&cfg).unwrap();
    let broken = layout.artifact_path(32634, "bands_01_03", 2);
    std::fs::write(&broken, common::tiny_tiff(2)).unwrap();

    let report = sweep_chunk(&layout.chunk_dir("bands_01_03"), "bands_01_03", 4, &TiffCodec).unwrap();
    assert_eq!(report.examined, 4);
    assert_eq!(report.deleted, 1);
    assert!(!broken.exists());

    // The next run fetches exactly the deleted tile.
    let summaries = run_batch(&cfg, &d, 2, |_, _| {}).unwrap();
    assert_eq!(summaries[0].fetched, 1);
    assert_eq!(summaries[0].skipped, 3);
    assert_eq!(server.request_count(), 5);
    assert!(broken.exists());
    assert_eq!(TiffCodec.band_count(&broken).unwrap(), 4);
}

#[test]
fn rerun_after_clean_run_is_a_no_op() {
    let out = tempdir().unwrap();
    let cfg = config_for(out.path());
    let server = Arc::new(common::TiffServer::new(4));
    let d = deps(Arc::clone(&server), 3);

    run_batch(&cfg, &d, 1, |_, _| {}).unwrap();
    let second = run_batch(&cfg, &d, 1, |_, _| {}).unwrap();
    assert_eq!(second[0].skipped, 3);
    assert_eq!(server.request_count(), 3);
}
