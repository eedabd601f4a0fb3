use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::follow::monitor::{AppendEvent, EventKind, FollowMonitor};
use crate::tail::OutputWriter;

/// Channel depth between the polling task and the writer.
const EVENT_QUEUE_DEPTH: usize = 256;

/// Merges per-file monitors into one ordered output stream.
///
/// A producer task drives a shared interval; each tick it polls every
/// monitor in registration order and feeds the resulting events into a
/// channel. The consumer end is the only writer, draining the channel
/// and flushing each event as it arrives. Per-file order is strict;
/// cross-file interleaving within one tick is registration order.
pub struct Multiplexer {
    monitors: Vec<FollowMonitor>,
    interval: Duration,
}

impl Multiplexer {
    pub fn new(interval: Duration) -> Self {
        Self {
            monitors: Vec::new(),
            interval,
        }
    }

    pub fn register(&mut self, monitor: FollowMonitor) {
        self.monitors.push(monitor);
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Stream events until interrupted or until every monitor has
    /// stopped. Interruption stops all monitors within one poll
    /// interval; events already decided are written whole.
    pub async fn run<W: Write>(mut self, writer: &mut OutputWriter<W>) -> Result<()> {
        let (tx, mut rx) = mpsc::channel::<AppendEvent>(EVENT_QUEUE_DEPTH);
        let interval = self.interval;
        let mut monitors = std::mem::take(&mut self.monitors);

        let producer = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                for event in poll_all(&mut monitors) {
                    if tx.send(event).await.is_err() {
                        // consumer is gone, shut everything down
                        for monitor in monitors.iter_mut() {
                            monitor.stop();
                        }
                        return;
                    }
                }
                if monitors.iter().all(FollowMonitor::is_stopped) {
                    debug!("all monitors stopped, ending follow");
                    return;
                }
            }
        });

        // one registration, so a signal arriving mid-write is not dropped
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => write_event(writer, event)?,
                    None => break,
                },
                _ = &mut ctrl_c => {
                    debug!("interrupt received, stopping monitors");
                    break;
                }
            }
        }

        drop(rx);
        producer.abort();
        Ok(())
    }
}

/// One poll cycle over every monitor, in registration order. All files
/// are drained before the cycle ends, so a tick never leaves one file's
/// new content behind while advancing another.
fn poll_all(monitors: &mut [FollowMonitor]) -> Vec<AppendEvent> {
    let mut events = Vec::new();
    for monitor in monitors.iter_mut() {
        let polled = monitor.poll();
        if !polled.is_empty() {
            debug!(
                index = monitor.index(),
                state = ?monitor.state(),
                events = polled.len(),
                "poll produced events"
            );
        }
        events.extend(polled);
    }
    events
}

fn write_event<W: Write>(writer: &mut OutputWriter<W>, event: AppendEvent) -> Result<()> {
    match event.kind {
        EventKind::Data { start, data } => {
            trace!(index = event.index, start, len = data.len(), "append");
            writer.write_block(event.index, &event.path, &data)?;
        }
        EventKind::Discontinuity => {
            eprintln!("tailf: {}: file truncated", event.path.display());
        }
        EventKind::Notice(message) => {
            eprintln!("tailf: {}", message);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::{Seek, SeekFrom, Write as _};
    use std::path::Path;

    use super::*;
    use crate::tail::FileTarget;

    fn monitor_at_eof(path: &Path, index: usize) -> FollowMonitor {
        let (mut target, mut file) = FileTarget::open(path, index).unwrap();
        target.offset = file.seek(SeekFrom::End(0)).unwrap();
        FollowMonitor::new(target, file)
    }

    fn append(path: &Path, data: &[u8]) {
        let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(data).unwrap();
    }

    #[test]
    fn test_poll_cycle_interleaves_in_registration_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.log");
        let b = dir.path().join("b.log");
        std::fs::write(&a, b"").unwrap();
        std::fs::write(&b, b"").unwrap();

        let mut monitors = vec![monitor_at_eof(&a, 0), monitor_at_eof(&b, 1)];

        // both grow within the same tick; a is registered first
        append(&b, b"from b\n");
        append(&a, b"from a\n");

        let events = poll_all(&mut monitors);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].index, 0);
        assert_eq!(events[1].index, 1);
    }

    #[test]
    fn test_events_render_with_alternating_headers() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.log");
        let b = dir.path().join("b.log");
        std::fs::write(&a, b"").unwrap();
        std::fs::write(&b, b"").unwrap();

        let mut monitors = vec![monitor_at_eof(&a, 0), monitor_at_eof(&b, 1)];
        append(&a, b"1\n");
        append(&b, b"2\n");

        let mut writer = OutputWriter::new(Vec::new(), true);
        for event in poll_all(&mut monitors) {
            write_event(&mut writer, event).unwrap();
        }
        append(&a, b"3\n");
        for event in poll_all(&mut monitors) {
            write_event(&mut writer, event).unwrap();
        }

        let rendered = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(
            rendered,
            format!(
                "==> {a} <==\n1\n\n==> {b} <==\n2\n\n==> {a} <==\n3\n",
                a = a.display(),
                b = b.display()
            )
        );
    }

    #[tokio::test]
    async fn test_run_ends_once_all_monitors_stop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        std::fs::write(&path, b"x\n").unwrap();

        let mut stopped = monitor_at_eof(&path, 0);
        stopped.stop();
        let mut mux = Multiplexer::new(Duration::from_millis(1));
        mux.register(stopped);

        let mut writer = OutputWriter::new(Vec::new(), false);
        tokio::time::timeout(Duration::from_secs(5), mux.run(&mut writer))
            .await
            .expect("multiplexer should end when every monitor is stopped")
            .unwrap();
    }
}
