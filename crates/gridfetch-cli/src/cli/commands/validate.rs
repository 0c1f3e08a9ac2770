//! `gridfetch validate` – sweep output directories for broken artifacts.

use anyhow::Result;
use gridfetch_core::config::RunConfig;
use gridfetch_core::pipeline::layout_for;
use gridfetch_core::raster::TiffCodec;
use gridfetch_core::validate::sweep_chunk;

pub fn run_validate(cfg: &RunConfig) -> Result<()> {
    let layout = layout_for(cfg)?;

    println!("{:<16} {:>8} {:>8}", "CHUNK", "EXAMINED", "DELETED");
    for chunk in cfg.band_chunks() {
        let report = sweep_chunk(
            &layout.chunk_dir(&chunk.name),
            &chunk.name,
            chunk.expected_band_count(),
            &TiffCodec,
        )?;
        println!("{:<16} {:>8} {:>8}", report.chunk, report.examined, report.deleted);
    }
    Ok(())
}
