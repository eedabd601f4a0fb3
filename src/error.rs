use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Per-target failure taxonomy. Errors are isolated per file: one bad
/// target never aborts the others. `Config` is the exception and stops
/// the run before any monitor starts.
#[derive(Debug, Error)]
pub enum TailError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("{}: not a regular file", path.display())]
    NotRegularFile { path: PathBuf },

    /// Transient: the file is missing or unreadable right now. Follow
    /// mode retries this every tick instead of stopping the monitor.
    #[error("{}: temporarily unavailable: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permanent failure for one target. Its monitor stops; the rest
    /// keep running.
    #[error("{}: {source}", path.display())]
    FatalTarget {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Config(String),
}

impl TailError {
    /// Classify a stat/open/read failure for one target path.
    pub fn classify(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => TailError::Unavailable {
                path: path.to_path_buf(),
                source,
            },
            _ => TailError::FatalTarget {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, TailError::Unavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_missing_file_is_transient() {
        let err = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert!(TailError::classify(Path::new("/tmp/x"), err).is_transient());
    }

    #[test]
    fn test_classify_disk_error_is_fatal() {
        let err = io::Error::other("bad sector");
        let classified = TailError::classify(Path::new("/tmp/x"), err);
        assert!(!classified.is_transient());
        assert!(matches!(classified, TailError::FatalTarget { .. }));
    }
}
