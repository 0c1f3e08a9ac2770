//! Work-item generation with resumability.
//!
//! Produces the ordered (ascending tile index) sequence of items for one
//! chunk, leaving out work whose artifact already exists. Two resume
//! strategies coexist: `Index` trusts gap-free ascending production and
//! resumes after the highest existing index; `Exists` stats every candidate
//! path and handles non-contiguous or externally modified directories.

use std::io;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chunk::BandChunk;
use crate::crs::{self, HemisphereMode};
use crate::layout::{self, OutputLayout};
use crate::remote::GridTile;

/// How previously completed work is detected on a rerun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeStrategy {
    /// Resume at `max(existing tile index) + 1`.
    Index,
    /// Emit only items whose concrete output path does not exist.
    #[default]
    Exists,
}

/// One unit of work: a tile, the chunk to fetch for it, and its resolved CRS.
/// Created per run, never persisted.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub tile: GridTile,
    pub chunk: Arc<BandChunk>,
    pub epsg: u32,
}

/// What generation produced: the items to run plus counts of what it
/// filtered out, so run summaries can account for every input tile.
#[derive(Debug)]
pub struct WorkPlan {
    pub items: Vec<WorkItem>,
    /// Tiles left out because their artifact already exists (or they sit
    /// below the resume index).
    pub done: usize,
    /// Tiles dropped because their centroid has no resolvable CRS.
    pub dropped: usize,
}

/// Generates work items for `chunk` over `tiles` (assumed to be in
/// collection enumeration order, i.e. ascending index).
///
/// `zone_epsg` pins every item to one CRS (zoned runs); otherwise each
/// tile's CRS is resolved from its centroid under `hemisphere`. A tile
/// whose centroid cannot be resolved is logged and dropped; that item is
/// dead on arrival every run, not transient.
pub fn generate(
    tiles: &[GridTile],
    chunk: &Arc<BandChunk>,
    layout: &OutputLayout,
    hemisphere: HemisphereMode,
    zone_epsg: Option<u32>,
    strategy: ResumeStrategy,
) -> io::Result<WorkPlan> {
    let start_index = match strategy {
        ResumeStrategy::Index => {
            max_existing_index(layout, &chunk.name)?.map(|i| i + 1).unwrap_or(0)
        }
        ResumeStrategy::Exists => 0,
    };

    let mut plan = WorkPlan { items: Vec::new(), done: 0, dropped: 0 };
    for tile in tiles {
        if tile.index < start_index {
            plan.done += 1;
            continue;
        }
        let epsg = match zone_epsg {
            Some(code) => code,
            None => match crs::epsg_for(tile.centroid, hemisphere) {
                Ok(code) => code,
                Err(e) => {
                    tracing::error!("tile {}: {}", tile.index, e);
                    plan.dropped += 1;
                    continue;
                }
            },
        };
        if strategy == ResumeStrategy::Exists
            && layout.artifact_path(epsg, &chunk.name, tile.index).exists()
        {
            plan.done += 1;
            continue;
        }
        plan.items.push(WorkItem { tile: tile.clone(), chunk: Arc::clone(chunk), epsg });
    }
    Ok(plan)
}

/// Highest tile index among this run's existing artifacts in the chunk
/// directory, or `None` if there are none (or no directory yet).
pub fn max_existing_index(layout: &OutputLayout, chunk: &str) -> io::Result<Option<usize>> {
    let names = layout::list_artifacts(&layout.chunk_dir(chunk), &layout.scan_prefix())?;
    Ok(names.iter().filter_map(|n| layout::parse_tile_index(n)).max())
}
