mod monitor;
mod mux;

pub use monitor::{AppendEvent, EventKind, FollowMonitor, MonitorState};
pub use mux::Multiplexer;
