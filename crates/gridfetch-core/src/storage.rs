//! Artifact persistence: write to a `.part` temp file, sync, then rename.
//!
//! Paths are disjoint per work item, so no locking is needed; a process
//! killed mid-write leaves either a stray `.part` (ignored by every scan)
//! or, at worst, a truncated artifact for the validator to purge.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Temporary file suffix used before the atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the in-progress file: appends `.part` to the final path.
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Persists `bytes` at `final_path` atomically, creating parent
/// directories as needed. An existing file at the path is replaced.
pub fn persist(final_path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(final_path);
    let mut file = File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, final_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("/out/tile_0.tif"));
        assert_eq!(p.to_string_lossy(), "/out/tile_0.tif.part");
    }

    #[test]
    fn persist_writes_atomically_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep/nested/tile_3.tif");
        persist(&path, b"raster bytes").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"raster bytes");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn persist_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile_0.tif");
        persist(&path, b"first").unwrap();
        persist(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
    }
}
