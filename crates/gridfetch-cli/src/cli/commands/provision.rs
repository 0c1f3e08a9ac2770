//! `gridfetch provision` – ensure per-zone grid assets exist.

use anyhow::{bail, Result};
use gridfetch_core::config::{GridMode, RunConfig};
use gridfetch_core::provision::ZoneGridProvisioner;
use gridfetch_core::sleep::ThreadSleeper;

use super::gateway;

pub fn run_provision(cfg: &RunConfig) -> Result<()> {
    let GridMode::Zoned { grid_size_m, asset_folder } = cfg.grid_mode() else {
        bail!("provision requires zoned mode (grid_size_m + asset_folder)");
    };
    let client = gateway(cfg)?;
    let sleeper = ThreadSleeper;
    let provisioner = ZoneGridProvisioner::new(&client, &sleeper);
    let grids = provisioner.provision(&cfg.country_name, grid_size_m, &asset_folder, cfg.south)?;

    println!("{:<6} {:<7} ASSET", "ZONE", "EPSG");
    for g in grids {
        println!("{:<6} {:<7} {}", g.zone, g.epsg, g.asset_id);
    }
    Ok(())
}
