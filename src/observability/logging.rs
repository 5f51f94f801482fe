//! Log sink with three named channels.
//!
//! # Responsibilities
//! - Open the dated log file (`YYYY_M_D.log`) in append mode
//! - Tee lines to stdout and/or the file, or discard them
//! - Prefix each line with date, time and a channel tag
//!
//! # Channels
//! - `[info] `: `tracing::info!` and below-error events from this crate
//! - `[error] `: `tracing::error!` and `tracing::warn!`
//! - `[connection] `: events with `target: "connection"`, routed to discard
//!   unless per-connection logging is enabled
//!
//! # Design Decisions
//! - One `tracing-subscriber` fmt layer; the channel is picked per event
//! - Every formatted line reaches the writer in a single locked write

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Datelike, Local, NaiveDate};
use thiserror::Error;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::config::validation::{file_exists, folder_exists};
use crate::config::ProxyConfig;

/// Target of events that belong on the `[connection]` channel.
pub const CONNECTION_TARGET: &str = "connection";

/// Error raised while opening the log file.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("unable to create log directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to open log file {}: {source}", .path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The channel an event is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Info,
    Error,
    Connection,
}

impl Channel {
    pub fn of(target: &str, level: &Level) -> Self {
        if target == CONNECTION_TARGET {
            Channel::Connection
        } else if *level <= Level::WARN {
            Channel::Error
        } else {
            Channel::Info
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Channel::Info => "[info] ",
            Channel::Error => "[error] ",
            Channel::Connection => "[connection] ",
        }
    }
}

/// Name of the log file for `date`, without zero padding.
pub fn log_file_name(date: NaiveDate) -> String {
    format!("{}_{}_{}.log", date.year(), date.month(), date.day())
}

#[derive(Debug)]
enum FileState {
    None,
    Open(File),
    Closed,
}

struct Outputs {
    /// stdout unless quiet; its failures never block the file.
    console: Option<Box<dyn Write + Send>>,
    file: FileState,
}

impl fmt::Debug for Outputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outputs")
            .field("console", &self.console.is_some())
            .field("file", &self.file)
            .finish()
    }
}

/// Shared writer behind every channel.
#[derive(Debug, Clone)]
pub struct SinkWriter {
    outputs: Arc<Mutex<Outputs>>,
}

impl SinkWriter {
    fn lock(&self) -> MutexGuard<'_, Outputs> {
        self.outputs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut outputs = self.lock();
        if let FileState::Open(file) = &mut outputs.file {
            file.write_all(buf)?;
        }
        if let Some(console) = &mut outputs.console {
            let _ = console.write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut outputs = self.lock();
        if let FileState::Open(file) = &mut outputs.file {
            file.flush()?;
        }
        if let Some(console) = &mut outputs.console {
            let _ = console.flush();
        }
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SinkWriter {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Formats `YYYY/MM/DD HH:MM:SS [tag] message`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let channel = Channel::of(metadata.target(), metadata.level());
        write!(
            writer,
            "{} {}",
            Local::now().format("%Y/%m/%d %H:%M:%S"),
            channel.tag()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// The process log sink.
#[derive(Debug, Clone)]
pub struct LogSink {
    writer: SinkWriter,
    connections: bool,
    path: Option<PathBuf>,
}

impl LogSink {
    /// Create the log directory and file as needed and wire the channels.
    pub fn init(config: &ProxyConfig) -> Result<Self, LogError> {
        let (file, path) = if config.log.enabled {
            let path = config.log.dir.join(log_file_name(Local::now().date_naive()));
            let file = open_log_file(&config.log.dir, &path)?;
            (FileState::Open(file), Some(path))
        } else {
            (FileState::None, None)
        };

        let console: Option<Box<dyn Write + Send>> = if config.quiet {
            None
        } else {
            Some(Box::new(io::stdout()))
        };

        Ok(Self {
            writer: SinkWriter {
                outputs: Arc::new(Mutex::new(Outputs { console, file })),
            },
            connections: config.log.connections,
            path,
        })
    }

    /// A sink that drops everything.
    pub fn discard() -> Self {
        Self {
            writer: SinkWriter {
                outputs: Arc::new(Mutex::new(Outputs {
                    console: None,
                    file: FileState::None,
                })),
            },
            connections: false,
            path: None,
        }
    }

    /// Path of the open log file, if file logging is enabled.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The writer shared by all channels.
    pub fn writer(&self) -> SinkWriter {
        self.writer.clone()
    }

    /// Channel routing: this crate at info and above, connection lines only when enabled.
    pub fn filter(&self) -> Targets {
        let connections = if self.connections {
            LevelFilter::INFO
        } else {
            LevelFilter::OFF
        };
        Targets::new()
            .with_target(CONNECTION_TARGET, connections)
            .with_target(env!("CARGO_CRATE_NAME"), LevelFilter::INFO)
    }

    /// A fmt layer writing through this sink.
    pub fn layer<S>(&self) -> impl Layer<S> + Send + Sync + 'static
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .event_format(LineFormat)
            .with_writer(self.writer())
            .with_filter(self.filter())
    }

    /// Close the log file. A repeated close is reported on stdout, not failed.
    pub fn close(&self) {
        let mut outputs = self.writer.lock();
        match std::mem::replace(&mut outputs.file, FileState::Closed) {
            FileState::Open(file) => {
                if let Err(e) = file.sync_all() {
                    println!("error while closing log file: {e}");
                }
            }
            FileState::Closed => println!("error while closing log file: file already closed"),
            FileState::None => outputs.file = FileState::None,
        }
    }
}

fn open_log_file(dir: &Path, path: &Path) -> Result<File, LogError> {
    if !folder_exists(dir) {
        create_dir(dir).map_err(|source| LogError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if !file_exists(path) {
            options.mode(0o644);
        }
    }

    options.open(path).map_err(|source| LogError::OpenFile {
        path: path.to_path_buf(),
        source,
    })
}

fn create_dir(dir: &Path) -> io::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o750);
    }
    match builder.create(dir) {
        Err(e) if e.kind() != io::ErrorKind::AlreadyExists => Err(e),
        _ => Ok(()),
    }
}
