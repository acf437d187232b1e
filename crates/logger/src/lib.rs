// Rust guideline compliant 2026-10-15

//! Logger crate: the append-only run log.
//!
//! [`RunLog`] owns a `tracing::Dispatch` writing every event as one line
//! `[HH:MM:SS.mmm] [LEVEL  PREFIX] message`, to the console, a file, or both.
//! Nothing is installed globally: callers attach the dispatch to the futures
//! that should log through it via [`RunLog::attach`].
//!
//! Entry points: [`RunLog::open`], [`RunLog::attach`].
//! Configuration via [`RunLogConfig::builder`].

mod format;

pub use format::RunLogFormat;

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Dispatch;
use tracing::instrument::{WithDispatch, WithSubscriber as _};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt as _;

// ---------------------------------------------------------------------------
// RunLogError
// ---------------------------------------------------------------------------

/// Errors that can occur while opening the run log.
#[derive(Debug, thiserror::Error)]
pub enum RunLogError {
    /// The log file (or its parent directory) could not be created.
    #[error("cannot open log file {path}: {source}")]
    File {
        /// Requested log file.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
}

// ---------------------------------------------------------------------------
// RunLogConfig + builder
// ---------------------------------------------------------------------------

/// Sinks and verbosity of a [`RunLog`].
///
/// Construct via [`RunLogConfig::builder`].
#[derive(Debug, Clone)]
pub struct RunLogConfig {
    /// Log file, truncated on open. `None` disables the file sink.
    pub file: Option<PathBuf>,
    /// Mirror every line to stdout.
    pub console: bool,
    /// Most verbose level written.
    pub level: LevelFilter,
}

/// Builder for [`RunLogConfig`].
///
/// Obtain via [`RunLogConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct RunLogConfigBuilder {
    file: Option<PathBuf>,
    console: bool,
    level: LevelFilter,
}

impl RunLogConfig {
    /// Create a builder.
    ///
    /// Default values: no file, console enabled, level `INFO`.
    #[must_use]
    pub fn builder() -> RunLogConfigBuilder {
        RunLogConfigBuilder { file: None, console: true, level: LevelFilter::INFO }
    }
}

impl RunLogConfigBuilder {
    /// Write lines to `path` (truncated on open).
    #[must_use]
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Enable or disable the stdout sink.
    #[must_use]
    pub fn console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    /// Set the most verbose level written.
    #[must_use]
    pub fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Finalize the configuration.
    #[must_use]
    pub fn build(self) -> RunLogConfig {
        RunLogConfig { file: self.file, console: self.console, level: self.level }
    }
}

// ---------------------------------------------------------------------------
// RunLog
// ---------------------------------------------------------------------------

/// Explicit run-log handle; cheap to clone.
///
/// Write failures on either sink are dropped by the subscriber and never
/// reach the code that emitted the event.
#[derive(Debug, Clone)]
pub struct RunLog {
    dispatch: Dispatch,
}

impl RunLog {
    /// Open the configured sinks.
    ///
    /// Creates missing parent directories of the log file and truncates it.
    ///
    /// # Errors
    ///
    /// Returns [`RunLogError::File`] if the log file cannot be created.
    pub fn open(config: &RunLogConfig) -> Result<Self, RunLogError> {
        let file = match &config.file {
            Some(path) => Some(Mutex::new(create_truncated(path)?)),
            None => None,
        };
        let console = config.console.then_some(io::stdout);
        Ok(Self { dispatch: build_dispatch(config.level, file, console) })
    }

    /// Build a run log over an arbitrary writer (console-style sink only).
    #[must_use]
    pub fn with_writer<W>(level: LevelFilter, writer: W) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        Self { dispatch: build_dispatch(level, None, Some(writer)) }
    }

    /// A run log that discards everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self { dispatch: Dispatch::none() }
    }

    /// The underlying dispatch.
    #[must_use]
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Route every event emitted while polling `future` to this run log.
    pub fn attach<F>(&self, future: F) -> WithDispatch<F> {
        future.with_subscriber(self.dispatch.clone())
    }
}

fn create_truncated(path: &Path) -> Result<File, RunLogError> {
    let wrap = |source| RunLogError::File { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    File::create(path).map_err(wrap)
}

fn build_dispatch<W>(level: LevelFilter, file: Option<Mutex<File>>, console: Option<W>) -> Dispatch
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let file_layer = file.map(|f| {
        tracing_subscriber::fmt::layer()
            .event_format(RunLogFormat)
            .with_ansi(false)
            .with_writer(f)
    });
    let console_layer = console.map(|w| {
        tracing_subscriber::fmt::layer()
            .event_format(RunLogFormat)
            .with_ansi(false)
            .with_writer(w)
    });
    let subscriber = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(level);
    Dispatch::new(subscriber)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
