//! `gridfetch status` – show per-chunk artifact counts.

use anyhow::Result;
use gridfetch_core::config::RunConfig;
use gridfetch_core::layout::list_artifacts;
use gridfetch_core::pipeline::layout_for;

pub fn run_status(cfg: &RunConfig) -> Result<()> {
    let layout = layout_for(cfg)?;
    let chunks = cfg.band_chunks();
    if chunks.is_empty() {
        println!("No chunks configured.");
        return Ok(());
    }

    println!("{:<16} {:>9} DIRECTORY", "CHUNK", "ARTIFACTS");
    for chunk in chunks {
        let dir = layout.chunk_dir(&chunk.name);
        let count = list_artifacts(&dir, &layout.scan_prefix())?.len();
        println!("{:<16} {:>9} {}", chunk.name, count, dir.display());
    }
    Ok(())
}
