//! `gridfetch run` – execute the configured batch.

use std::sync::Arc;

use anyhow::{bail, Result};
use gridfetch_core::config::RunConfig;
use gridfetch_core::http::CurlClient;
use gridfetch_core::pipeline::{run_batch, PipelineDeps};
use gridfetch_core::raster::TiffCodec;
use gridfetch_core::scheduler::default_slots;
use gridfetch_core::sleep::ThreadSleeper;

use super::gateway;

pub fn run_batch_cmd(cfg: &RunConfig, jobs: Option<usize>) -> Result<()> {
    let client = Arc::new(gateway(cfg)?);
    let deps = PipelineDeps {
        tiles: client.clone(),
        service: client.clone(),
        zones: Some(client),
        http: Arc::new(CurlClient::new()),
        codec: Arc::new(TiffCodec),
        sleeper: Arc::new(ThreadSleeper),
    };
    let slots = jobs.unwrap_or_else(default_slots).max(1);

    let summaries = run_batch(cfg, &deps, slots, |chunk, p| {
        if p.completed == p.total || p.completed % 25 == 0 {
            println!("{}: {}/{}", chunk, p.completed, p.total);
        }
    })?;

    let mut failed = 0usize;
    println!("{:<16} {:<6} {:>9} {:>8} {:>8} {:>7}", "CHUNK", "ZONE", "ATTEMPTED", "FETCHED", "SKIPPED", "FAILED");
    for s in &summaries {
        let zone = s.zone.map(|z| z.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<16} {:<6} {:>9} {:>8} {:>8} {:>7}",
            s.chunk, zone, s.attempted, s.fetched, s.skipped, s.failed
        );
        failed += s.failed;
    }

    if failed > 0 {
        bail!("{} item(s) failed; re-run to retry them", failed);
    }
    Ok(())
}
