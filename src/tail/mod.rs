mod locate;
mod output;
mod snapshot;
mod target;

pub use locate::{locate_bytes, locate_lines, CHUNK_SIZE};
pub use output::OutputWriter;
pub use snapshot::{read_stream_bytes, read_stream_window, read_window, LineWindow};
pub use target::{FileId, FileTarget, TargetKind};
