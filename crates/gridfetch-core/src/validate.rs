//! Output sweeping.
//!
//! A kill mid-download or a service hiccup can leave a composite on disk
//! with the wrong number of bands. The sweeper walks a chunk directory,
//! opens every artifact, and deletes the ones whose band count does not
//! match the chunk's expectation (label band plus one band per embedding
//! index). A later run then re-fetches the deleted tiles.

use std::path::Path;

use anyhow::{Context, Result};

use crate::layout::{self, ARTIFACT_EXT};
use crate::raster::RasterCodec;

/// What one chunk sweep saw and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub chunk: String,
    pub examined: usize,
    pub deleted: usize,
}

/// Sweeps one chunk directory, deleting artifacts with an unexpected band
/// count. A missing directory is not an error: there is nothing to sweep.
pub fn sweep_chunk(
    dir: &Path,
    chunk_name: &str,
    expected_bands: usize,
    codec: &dyn RasterCodec,
) -> Result<SweepReport> {
    let mut report = SweepReport { chunk: chunk_name.to_string(), examined: 0, deleted: 0 };
    if !dir.is_dir() {
        tracing::warn!("chunk directory {} does not exist, nothing to sweep", dir.display());
        return Ok(report);
    }

    let mut names: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("reading chunk directory {}", dir.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(ARTIFACT_EXT) && layout::is_artifact_name(&name) {
            names.push(name);
        }
    }
    names.sort();

    for name in names {
        let path = dir.join(&name);
        report.examined += 1;
        let keep = match codec.band_count(&path) {
            Ok(n) if n == expected_bands => true,
            Ok(n) => {
                tracing::warn!(
                    "{}: {} band(s), expected {}, deleting",
                    name,
                    n,
                    expected_bands
                );
                false
            }
            Err(e) => {
                tracing::warn!("{}: unreadable ({}), deleting", name, e);
                false
            }
        };
        if !keep {
            std::fs::remove_file(&path)
                .with_context(|| format!("deleting {}", path.display()))?;
            report.deleted += 1;
        }
    }

    tracing::info!(
        "chunk {}: examined {} artifact(s), deleted {}",
        report.chunk,
        report.examined,
        report.deleted
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{build_test_tiff, TiffCodec};

    #[test]
    fn missing_directory_yields_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let report =
            sweep_chunk(&dir.path().join("absent"), "bands_01_22", 23, &TiffCodec).unwrap();
        assert_eq!(report, SweepReport { chunk: "bands_01_22".into(), examined: 0, deleted: 0 });
    }

    #[test]
    fn wrong_band_count_is_deleted_and_correct_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("google_embed_Hungary_2022_10m_32634_bands_01_03_0.tif");
        let short = dir.path().join("google_embed_Hungary_2022_10m_32634_bands_01_03_1.tif");
        std::fs::write(&good, build_test_tiff(4)).unwrap();
        std::fs::write(&short, build_test_tiff(2)).unwrap();

        let report = sweep_chunk(dir.path(), "bands_01_03", 4, &TiffCodec).unwrap();
        assert_eq!(report.examined, 2);
        assert_eq!(report.deleted, 1);
        assert!(good.exists());
        assert!(!short.exists());
    }

    #[test]
    fn unreadable_artifact_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let junk = dir.path().join("google_embed_Hungary_2022_10m_32634_bands_01_03_0.tif");
        std::fs::write(&junk, b"not a tiff").unwrap();

        let report = sweep_chunk(dir.path(), "bands_01_03", 4, &TiffCodec).unwrap();
        assert_eq!(report.deleted, 1);
        assert!(!junk.exists());
    }

    #[test]
    fn non_artifact_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bands_used.txt"), b"wetland_label\n").unwrap();
        std::fs::write(dir.path().join("notes.tif"), b"junk").unwrap();

        let report = sweep_chunk(dir.path(), "bands_01_03", 4, &TiffCodec).unwrap();
        assert_eq!(report.examined, 0);
        assert_eq!(report.deleted, 0);
        assert!(dir.path().join("notes.tif").exists());
    }
}
