//! Deterministic output layout.
//!
//! Every artifact path is a pure function of (country, year, resolution,
//! EPSG, chunk name, tile index), so concurrent workers never contend on a
//! path and a file's existence is the sole completion marker for its item:
//!
//! ```text
//! {out}/{country}/{year}/{chunk}/google_embed_{country}_{year}_{res}m_{epsg}_{chunk}_{idx}.tif
//! {out}/{country}/{year}/{chunk}/bands_used.txt
//! ```

use std::path::{Path, PathBuf};

/// Leading component of every artifact filename.
pub const ARTIFACT_PREFIX: &str = "google_embed";

/// Artifact file extension.
pub const ARTIFACT_EXT: &str = ".tif";

/// Sidecar manifest listing the band identifiers used for a directory.
pub const MANIFEST_FILE: &str = "bands_used.txt";

/// Computes artifact and manifest paths for one run's fixed parameters.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    output_dir: PathBuf,
    country: String,
    year: String,
    res_m: u32,
}

impl OutputLayout {
    pub fn new(output_dir: impl Into<PathBuf>, country: impl Into<String>, year: impl Into<String>, res_m: u32) -> Self {
        Self {
            output_dir: output_dir.into(),
            country: country.into(),
            year: year.into(),
            res_m,
        }
    }

    /// Directory holding all artifacts of one chunk.
    pub fn chunk_dir(&self, chunk: &str) -> PathBuf {
        self.output_dir
            .join(&self.country)
            .join(&self.year)
            .join(chunk)
    }

    pub fn artifact_name(&self, epsg: u32, chunk: &str, tile_index: usize) -> String {
        format!(
            "{}_{}_{}_{}m_{}_{}_{}{}",
            ARTIFACT_PREFIX, self.country, self.year, self.res_m, epsg, chunk, tile_index, ARTIFACT_EXT
        )
    }

    pub fn artifact_path(&self, epsg: u32, chunk: &str, tile_index: usize) -> PathBuf {
        self.chunk_dir(chunk).join(self.artifact_name(epsg, chunk, tile_index))
    }

    pub fn manifest_path(&self, chunk: &str) -> PathBuf {
        self.chunk_dir(chunk).join(MANIFEST_FILE)
    }

    /// Prefix shared by every artifact this run would write, regardless of
    /// EPSG, chunk, or index. Used when scanning a directory for resume.
    pub fn scan_prefix(&self) -> String {
        format!("{}_{}_{}_{}m_", ARTIFACT_PREFIX, self.country, self.year, self.res_m)
    }
}

/// True if `name` looks like an artifact filename (any run's parameters).
pub fn is_artifact_name(name: &str) -> bool {
    name.starts_with(ARTIFACT_PREFIX) && name.ends_with(ARTIFACT_EXT)
}

/// Parses the trailing tile index out of an artifact filename.
///
/// Country and chunk names may themselves contain underscores, so only the
/// final `_`-separated token before `.tif` is the index.
pub fn parse_tile_index(name: &str) -> Option<usize> {
    let stem = name.strip_suffix(ARTIFACT_EXT)?;
    let token = stem.rsplit('_').next()?;
    token.parse().ok()
}

/// Lists artifact filenames in `dir` that match `prefix`, sorted.
/// A missing directory yields an empty list.
pub fn list_artifacts(dir: &Path, prefix: &str) -> std::io::Result<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|n| n.starts_with(prefix) && n.ends_with(ARTIFACT_EXT))
        .collect();
    names.sort();
    Ok(names)
}
