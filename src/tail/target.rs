use std::fs::{File, Metadata};
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};

use crate::error::TailError;

/// Filesystem identity of an open target, used to detect replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileId {
    pub dev: u64,
    pub ino: u64,
}

impl From<&Metadata> for FileId {
    fn from(meta: &Metadata) -> Self {
        Self {
            dev: meta.dev(),
            ino: meta.ino(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Regular or block file: supports the backward line scan.
    Seekable,
    /// FIFO or character device: no seeking, read forward only.
    Stream,
}

/// One input file and everything follow mode needs to track for it.
///
/// Invariant: `offset <= size`, and bytes below `offset` are never
/// emitted again except after a detected discontinuity, which resets
/// `offset` to 0.
#[derive(Debug)]
pub struct FileTarget {
    pub path: PathBuf,
    /// Registration order; fixes cross-file interleaving within a tick.
    pub index: usize,
    pub kind: TargetKind,
    pub size: u64,
    pub identity: Option<FileId>,
    pub offset: u64,
}

impl FileTarget {
    /// Open and classify one input path. Directories are rejected;
    /// missing files come back as transient `Unavailable`.
    pub fn open(path: &Path, index: usize) -> Result<(Self, File), TailError> {
        let file = File::open(path).map_err(|e| TailError::classify(path, e))?;
        let meta = file.metadata()?;
        let file_type = meta.file_type();

        let kind = if file_type.is_file() || file_type.is_block_device() {
            TargetKind::Seekable
        } else if file_type.is_fifo() || file_type.is_char_device() {
            TargetKind::Stream
        } else {
            return Err(TailError::NotRegularFile {
                path: path.to_path_buf(),
            });
        };

        let target = Self {
            path: path.to_path_buf(),
            index,
            kind,
            size: meta.len(),
            identity: Some(FileId::from(&meta)),
            offset: 0,
        };
        Ok((target, file))
    }

    /// True once `meta` no longer matches the identity recorded at open
    /// time (the path now names a different file).
    pub fn replaced_by(&self, meta: &Metadata) -> bool {
        match self.identity {
            Some(id) => id.dev != meta.dev() || id.ino != meta.ino(),
            None => false,
        }
    }

    /// True when the file shrank below what was already emitted.
    pub fn truncated_by(&self, meta: &Metadata) -> bool {
        meta.len() < self.offset
    }
}
