use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;

use bytes::Bytes;
use tracing::debug;

use crate::error::TailError;
use crate::tail::{FileId, FileTarget, TargetKind, CHUNK_SIZE};

/// A unit of newly observed content for one target. Atomic once emitted:
/// the multiplexer writes it whole or not at all.
#[derive(Debug)]
pub struct AppendEvent {
    pub index: usize,
    pub path: PathBuf,
    pub kind: EventKind,
}

#[derive(Debug)]
pub enum EventKind {
    /// New bytes occupying `start..start + data.len()` in the file.
    Data { start: u64, data: Bytes },
    /// Truncation or replacement; content restarts at offset 0.
    Discontinuity,
    /// Human-readable status change (unavailable, recovered, fatal).
    Notice(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Polling,
    Growing,
    Truncated,
    Unreachable,
    Stopped,
}

/// Watches one target for growth, truncation and availability changes.
///
/// Owns its `FileTarget` exclusively; all output reaches the terminal
/// through the multiplexer, never directly from here.
pub struct FollowMonitor {
    target: FileTarget,
    file: Option<File>,
    state: MonitorState,
    unreachable_reported: bool,
}

impl FollowMonitor {
    /// `file` is the handle left over from the initial snapshot, already
    /// positioned at the target's offset.
    pub fn new(target: FileTarget, file: File) -> Self {
        Self {
            target,
            file: Some(file),
            state: MonitorState::Idle,
            unreachable_reported: false,
        }
    }

    /// Monitor for a target that could not be opened yet. Stays
    /// unreachable (already reported) and picks the file up from offset
    /// 0 once the path appears.
    pub fn pending(path: &std::path::Path, index: usize) -> Self {
        Self {
            target: FileTarget {
                path: path.to_path_buf(),
                index,
                kind: TargetKind::Seekable,
                size: 0,
                identity: None,
                offset: 0,
            },
            file: None,
            state: MonitorState::Unreachable,
            unreachable_reported: true,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state == MonitorState::Stopped
    }

    pub fn index(&self) -> usize {
        self.target.index
    }

    /// Release the file handle and refuse further polls.
    pub fn stop(&mut self) {
        self.file = None;
        self.state = MonitorState::Stopped;
    }

    /// One poll tick: compare current size and identity against the last
    /// known values and emit events for whatever changed. Reads are
    /// bounded chunk reads, so one busy file cannot stall the tick for
    /// longer than a chunk.
    pub fn poll(&mut self) -> Vec<AppendEvent> {
        let mut events = Vec::new();
        if self.state == MonitorState::Stopped {
            return events;
        }
        self.state = MonitorState::Polling;

        let meta = match std::fs::metadata(&self.target.path) {
            Ok(meta) => meta,
            Err(e) => {
                self.on_target_error(e, &mut events);
                return events;
            }
        };

        if self.unreachable_reported {
            self.unreachable_reported = false;
            self.notice(
                format!(
                    "{} has appeared, following new file",
                    self.target.path.display()
                ),
                &mut events,
            );
            self.reset(&mut events);
        } else if self.target.replaced_by(&meta) || self.target.truncated_by(&meta) {
            self.state = MonitorState::Truncated;
            debug!(path = %self.target.path.display(), "discontinuity detected");
            events.push(AppendEvent {
                index: self.target.index,
                path: self.target.path.clone(),
                kind: EventKind::Discontinuity,
            });
            self.reset(&mut events);
        } else {
            self.target.size = meta.len().max(self.target.offset);
        }

        if self.state == MonitorState::Stopped || self.state == MonitorState::Unreachable {
            return events;
        }
        self.read_new(&mut events);
        events
    }

    /// Reopen the path from offset 0 with a fresh identity.
    fn reset(&mut self, events: &mut Vec<AppendEvent>) {
        self.file = None;
        self.target.offset = 0;
        let file = match File::open(&self.target.path) {
            Ok(file) => file,
            Err(e) => {
                self.on_target_error(e, events);
                return;
            }
        };
        match file.metadata() {
            Ok(meta) => {
                self.target.identity = Some(FileId::from(&meta));
                self.target.size = meta.len();
                self.file = Some(file);
            }
            Err(e) => self.on_target_error(e, events),
        }
    }

    fn read_new(&mut self, events: &mut Vec<AppendEvent>) {
        if self.target.offset >= self.target.size && self.file.is_some() {
            self.state = MonitorState::Polling;
            return;
        }
        if self.file.is_none() {
            let mut file = match File::open(&self.target.path) {
                Ok(file) => file,
                Err(e) => {
                    self.on_target_error(e, events);
                    return;
                }
            };
            if let Err(e) = file.seek(SeekFrom::Start(self.target.offset)) {
                self.on_target_error(e, events);
                return;
            }
            self.file = Some(file);
        }
        let Some(file) = self.file.as_mut() else {
            return;
        };

        let mut grew = false;
        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            match file.read(&mut chunk) {
                Ok(0) => break,
                Ok(read) => {
                    grew = true;
                    events.push(AppendEvent {
                        index: self.target.index,
                        path: self.target.path.clone(),
                        kind: EventKind::Data {
                            start: self.target.offset,
                            data: Bytes::copy_from_slice(&chunk[..read]),
                        },
                    });
                    self.target.offset += read as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    let err = TailError::FatalTarget {
                        path: self.target.path.clone(),
                        source: e,
                    };
                    self.stop();
                    self.notice(err.to_string(), events);
                    return;
                }
            }
        }
        self.target.size = self.target.size.max(self.target.offset);
        self.state = if grew {
            MonitorState::Growing
        } else {
            MonitorState::Polling
        };
    }

    fn on_target_error(&mut self, source: io::Error, events: &mut Vec<AppendEvent>) {
        match TailError::classify(&self.target.path, source) {
            err @ TailError::Unavailable { .. } => {
                self.file = None;
                self.state = MonitorState::Unreachable;
                // report once, then retry silently until recovery
                if !self.unreachable_reported {
                    self.unreachable_reported = true;
                    self.notice(err.to_string(), events);
                }
            }
            err => {
                self.stop();
                self.notice(err.to_string(), events);
            }
        }
    }

    fn notice(&self, message: String, events: &mut Vec<AppendEvent>) {
        events.push(AppendEvent {
            index: self.target.index,
            path: self.target.path.clone(),
            kind: EventKind::Notice(message),
        });
    }
}
