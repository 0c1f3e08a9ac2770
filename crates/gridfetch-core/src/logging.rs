//! Logging init: append to a log file, or graceful fallback to stderr.
//!
//! Batch runs are long and usually unattended, so the log goes to a file
//! by default: `$GRIDFETCH_LOG` if set, otherwise
//! `~/.local/state/gridfetch/gridfetch.log`.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,gridfetch_core=debug,gridfetch=debug";

/// Environment variable overriding the log file location.
pub const LOG_PATH_VAR: &str = "GRIDFETCH_LOG";

/// Writer that is either a file or stderr (used when file clone fails).
enum FileOrStderr {
    File(fs::File),
    Stderr,
}

impl io::Write for FileOrStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FileOrStderr::File(f) => f.write(buf),
            FileOrStderr::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FileOrStderr::File(f) => f.flush(),
            FileOrStderr::Stderr => io::stderr().lock().flush(),
        }
    }
}

struct FileMakeWriter(fs::File);

impl<'a> MakeWriter<'a> for FileMakeWriter {
    type Writer = FileOrStderr;

    fn make_writer(&'a self) -> Self::Writer {
        self.0
            .try_clone()
            .map(FileOrStderr::File)
            .unwrap_or(FileOrStderr::Stderr)
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Resolves the log file path: `$GRIDFETCH_LOG` if set, otherwise the
/// XDG state directory.
pub fn default_log_path() -> Result<PathBuf> {
    if let Some(p) = std::env::var_os(LOG_PATH_VAR) {
        return Ok(PathBuf::from(p));
    }
    let xdg_dirs = xdg::BaseDirectories::with_prefix("gridfetch")?;
    Ok(xdg_dirs.get_state_home().join("gridfetch.log"))
}

/// Initialize structured logging appending to the default log path.
/// On failure (e.g. log dir unwritable), returns Err so the caller can
/// fall back to stderr.
pub fn init_logging() -> Result<()> {
    init_logging_at(&default_log_path()?)
}

/// Initialize structured logging appending to `path`, creating parent
/// directories as needed.
pub fn init_logging_at(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    let writer: BoxMakeWriter = BoxMakeWriter::new(FileMakeWriter(file));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .init();

    tracing::info!("gridfetch logging initialized at {}", path.display());

    Ok(())
}

/// Initialize logging to stderr only (no file). Use when init_logging() fails so the CLI doesn't crash.
pub fn init_logging_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_overrides_log_path() {
        std::env::set_var(LOG_PATH_VAR, "/tmp/gridfetch-test/run.log");
        let p = default_log_path().unwrap();
        std::env::remove_var(LOG_PATH_VAR);
        assert_eq!(p, PathBuf::from("/tmp/gridfetch-test/run.log"));
    }

    #[test]
    fn init_creates_the_log_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state/run.log");
        init_logging_at(&path).unwrap();
        tracing::info!("log file smoke test");
        assert!(path.exists());
    }
}
