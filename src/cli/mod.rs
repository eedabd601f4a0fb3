use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::TailError;
use crate::follow::{FollowMonitor, Multiplexer};
use crate::tail::{self, FileTarget, LineWindow, OutputWriter, TargetKind};

#[derive(Parser, Debug)]
#[command(
    name = "tailf",
    version,
    about = "Print the last part of files and follow them as they grow"
)]
pub struct Cli {
    /// Files to display
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Number of trailing lines to print
    #[arg(short = 'n', long, value_name = "N")]
    pub lines: Option<u64>,

    /// Print the last N bytes instead of lines
    #[arg(short = 'c', long, value_name = "N", conflicts_with = "lines")]
    pub bytes: Option<u64>,

    /// Keep the files open and print appended data as they grow
    #[arg(short, long)]
    pub follow: bool,

    /// Never print per-file headers
    #[arg(short, long)]
    pub quiet: bool,

    /// Line delimiter is NUL instead of newline
    #[arg(short = 'z', long)]
    pub zero_terminated: bool,

    /// Seconds between polls in follow mode
    #[arg(short = 's', long, value_name = "SECS")]
    pub sleep_interval: Option<f64>,

    /// Defaults file path (default: ~/.config/tailf/default.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Effective options for one run: command-line flags override the
/// defaults file, which overrides built-ins.
#[derive(Debug)]
struct RunOptions {
    lines: u64,
    delimiter: u8,
    interval: Duration,
    headers: bool,
}

impl RunOptions {
    fn resolve(cli: &Cli, settings: &Settings) -> Result<Self> {
        let interval = match cli.sleep_interval {
            Some(secs) if secs.is_finite() && secs > 0.0 => Duration::from_secs_f64(secs),
            Some(secs) => {
                return Err(TailError::Config(format!("invalid sleep interval: {}", secs)).into())
            }
            None => settings.sleep_interval,
        };
        Ok(Self {
            lines: cli.lines.unwrap_or(settings.lines),
            delimiter: if cli.zero_terminated { b'\0' } else { b'\n' },
            interval,
            headers: settings.headers && !cli.quiet && cli.files.len() > 1,
        })
    }
}

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let settings = Settings::load(cli.config.as_deref())?;
    let opts = RunOptions::resolve(&cli, &settings)?;

    let stdout = std::io::stdout();
    let mut writer = OutputWriter::new(stdout.lock(), opts.headers);

    let mut mux = Multiplexer::new(opts.interval);
    let mut failed = false;

    for (index, path) in cli.files.iter().enumerate() {
        match print_initial(
            path,
            index,
            opts.lines,
            cli.bytes,
            opts.delimiter,
            cli.follow,
            &mut writer,
        ) {
            Ok(Some(monitor)) => mux.register(monitor),
            Ok(None) => {}
            Err(e) => {
                // one bad file never aborts the others
                eprintln!("tailf: {}", e);
                failed = true;
                // in follow mode a missing file may still appear later
                if cli.follow && e.is_transient() {
                    mux.register(FollowMonitor::pending(path, index));
                }
            }
        }
    }

    if cli.follow && !mux.is_empty() {
        debug!(files = cli.files.len(), interval = ?opts.interval, "entering follow mode");
        mux.run(&mut writer).await?;
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Open one target, print its initial window, and hand back a monitor
/// when follow mode wants one.
fn print_initial<W: Write>(
    path: &Path,
    index: usize,
    lines: u64,
    bytes: Option<u64>,
    delimiter: u8,
    follow: bool,
    writer: &mut OutputWriter<W>,
) -> Result<Option<FollowMonitor>, TailError> {
    let (mut target, mut file) = FileTarget::open(path, index)?;
    let window = initial_window(&mut file, target.kind, lines, bytes, delimiter)?;

    if let Some(last) = window.lines.last() {
        debug!(
            path = %path.display(),
            lines = window.lines.len(),
            range_start = last.start,
            range_end = last.end,
            terminated = last.terminated,
            last_line = %last.text,
            "initial window"
        );
    }
    writer.write_block(index, path, &window.raw)?;
    target.offset = window.end_offset;
    target.size = target.size.max(window.end_offset);

    if follow {
        if target.kind == TargetKind::Stream {
            warn!(path = %path.display(), "cannot follow a non-seekable file, snapshot only");
            return Ok(None);
        }
        return Ok(Some(FollowMonitor::new(target, file)));
    }
    Ok(None)
}

fn initial_window(
    file: &mut std::fs::File,
    kind: TargetKind,
    lines: u64,
    bytes: Option<u64>,
    delimiter: u8,
) -> Result<LineWindow, TailError> {
    let window = match kind {
        TargetKind::Seekable => {
            let offset = match bytes {
                Some(count) => tail::locate_bytes(file, count)?,
                None => tail::locate_lines(file, lines, delimiter)?,
            };
            tail::read_window(file, offset, delimiter)?
        }
        TargetKind::Stream => match bytes {
            Some(count) => tail::read_stream_bytes(file, count, delimiter)?,
            None => tail::read_stream_window(file, lines, delimiter)?,
        },
    };
    Ok(window)
}
