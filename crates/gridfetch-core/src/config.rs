//! Run configuration.
//!
//! A run is described by one TOML (or JSON) file naming the country, the
//! acquisition window, the band chunks, and the grid mode. Everything here
//! is validated up front; configuration errors are the only errors that
//! abort a batch before any tile is attempted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::chunk::BandChunk;
use crate::crs::HemisphereMode;
use crate::remote::EMBEDDING_COLLECTION;
use crate::retry::RetryPolicy;
use crate::workgen::ResumeStrategy;

/// Default label raster when the config names none.
pub const DEFAULT_LABEL_ASSET: &str =
    "projects/ee-gmkovacs/assets/ext_wetland_2018_v2021_nw";

/// Retry policy parameters (optional `[retry]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per tile (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff.
    pub base_wait_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_wait_secs: 2.0,
            max_delay_secs: 3600,
        }
    }
}

/// How the run enumerates tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridMode {
    /// One precomputed grid asset covering the whole country.
    Single { asset: String },
    /// One grid asset per intersecting UTM zone, provisioned on demand.
    Zoned {
        grid_size_m: u32,
        asset_folder: String,
    },
}

/// Configuration for one batch run, loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Country name as known to the zone store, e.g. "Hungary".
    pub country_name: String,
    /// Acquisition window start, `YYYY-MM-DD`. The year component selects
    /// the annual embedding image.
    pub start_date: String,
    /// Acquisition window end; defaults to one year after the start.
    #[serde(default)]
    pub end_date: Option<String>,
    /// Output resolution in meters per pixel.
    pub res_m: u32,
    /// Root directory artifacts are written under.
    pub output_dir: PathBuf,
    /// Named band chunks: chunk name to 1-based embedding band indices.
    pub chunks: BTreeMap<String, Vec<u16>>,
    /// Southern-hemisphere EPSG codes for the whole run.
    #[serde(default)]
    pub south: bool,
    /// Resolve hemisphere per tile centroid instead of using `south`
    /// globally. Only meaningful in single-grid mode.
    #[serde(default)]
    pub per_tile_hemisphere: Option<bool>,
    /// Resume strategy: "exists" (default) or "index".
    #[serde(default)]
    pub resume: ResumeStrategy,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Single-grid mode: id of the precomputed country grid asset.
    #[serde(default)]
    pub grid_asset: Option<String>,
    /// Zoned mode: tile edge length in meters for provisioned grids.
    #[serde(default)]
    pub grid_size_m: Option<u32>,
    /// Zoned mode: asset folder provisioned grids are written under.
    #[serde(default)]
    pub asset_folder: Option<String>,
    /// Nodata value recorded for downstream consumers. Carried through the
    /// config but not applied to artifacts.
    #[serde(default)]
    pub no_data_value: Option<f64>,
    /// Embedding image collection id.
    #[serde(default = "default_collection")]
    pub embedding_collection: String,
    /// Categorical label raster asset id.
    #[serde(default = "default_label_asset")]
    pub label_asset: String,
    /// Base URL of the compute gateway.
    #[serde(default)]
    pub service_endpoint: Option<String>,
}

fn default_collection() -> String {
    EMBEDDING_COLLECTION.to_string()
}

fn default_label_asset() -> String {
    DEFAULT_LABEL_ASSET.to_string()
}

impl RunConfig {
    /// Loads and validates a config file; the extension picks the format
    /// (`.json` is JSON, anything else TOML).
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg: RunConfig = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&data)
                .with_context(|| format!("parsing {}", path.display()))?
        } else {
            toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks cross-field consistency. Everything reported here is fatal.
    pub fn validate(&self) -> Result<()> {
        if self.country_name.is_empty() {
            bail!("country_name must not be empty");
        }
        self.year()?;
        if self.res_m == 0 {
            bail!("res_m must be positive");
        }
        if self.chunks.is_empty() {
            bail!("at least one band chunk is required");
        }
        for (name, indices) in &self.chunks {
            if name.is_empty() {
                bail!("chunk names must not be empty");
            }
            if indices.is_empty() {
                bail!("chunk {} has no band indices", name);
            }
            if indices.iter().any(|&i| i == 0) {
                bail!("chunk {} has a zero band index (bands are 1-based)", name);
            }
        }
        match (&self.grid_asset, self.grid_size_m, &self.asset_folder) {
            (Some(_), None, None) => {}
            (None, Some(_), Some(_)) => {
                if self.per_tile_hemisphere == Some(true) {
                    bail!("per_tile_hemisphere is only valid with grid_asset");
                }
            }
            (None, None, None) => {
                bail!("either grid_asset or grid_size_m + asset_folder is required")
            }
            _ => bail!("grid_asset and grid_size_m/asset_folder are mutually exclusive"),
        }
        if let Some(r) = &self.retry {
            if r.max_attempts == 0 {
                bail!("retry.max_attempts must be at least 1");
            }
            if !(r.base_wait_secs.is_finite() && r.base_wait_secs >= 0.0) {
                bail!("retry.base_wait_secs must be a non-negative number");
            }
        }
        Ok(())
    }

    /// Which grid mode this config selects. `validate` guarantees exactly
    /// one is configured.
    pub fn grid_mode(&self) -> GridMode {
        match (&self.grid_asset, self.grid_size_m, &self.asset_folder) {
            (Some(asset), _, _) => GridMode::Single { asset: asset.clone() },
            (None, Some(grid_size_m), Some(folder)) => GridMode::Zoned {
                grid_size_m,
                asset_folder: folder.clone(),
            },
            _ => unreachable!("validated config"),
        }
    }

    /// Acquisition year parsed from `start_date`.
    pub fn year(&self) -> Result<i32> {
        let y = self
            .start_date
            .get(..4)
            .and_then(|s| s.parse::<i32>().ok())
            .with_context(|| format!("start_date {:?} is not YYYY-MM-DD", self.start_date))?;
        if !self.start_date[4..].starts_with('-') {
            bail!("start_date {:?} is not YYYY-MM-DD", self.start_date);
        }
        Ok(y)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let r = self.retry.clone().unwrap_or_default();
        RetryPolicy {
            max_attempts: r.max_attempts,
            base_wait: Duration::from_secs_f64(r.base_wait_secs),
            max_delay: Duration::from_secs(r.max_delay_secs),
        }
    }

    /// Hemisphere handling for single-grid runs. Zoned runs pin the EPSG
    /// per zone and never consult this.
    pub fn hemisphere_mode(&self) -> HemisphereMode {
        match self.per_tile_hemisphere {
            Some(true) => HemisphereMode::PerTile,
            Some(false) => HemisphereMode::Global { south: self.south },
            None if self.south => HemisphereMode::Global { south: true },
            None => HemisphereMode::PerTile,
        }
    }

    /// Materializes the configured chunks, preserving name order.
    pub fn band_chunks(&self) -> Vec<Arc<BandChunk>> {
        self.chunks
            .iter()
            .map(|(name, indices)| Arc::new(BandChunk::from_indices(name.clone(), indices)))
            .collect()
    }
}
