// Rust guideline compliant 2026-10-15

//! Line format of the run log.

use domain::SYSTEM_ACTOR;
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Field naming the worker (or subsystem) an event belongs to.
const ACTOR_FIELD: &str = "actor";

/// `[HH:MM:SS.mmm] [LEVEL  PREFIX] message key=value ...`
///
/// `PREFIX` is the event's `actor` field, or `SYSTEM` when absent. Levels
/// print as `INFO`, `WARN`, `ERR` and `DBG` (trace folds into `DBG`), padded
/// so prefixes line up.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunLogFormat;

fn level_label(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERR",
        Level::WARN => "WARN",
        Level::INFO => "INFO",
        Level::DEBUG | Level::TRACE => "DBG",
    }
}

#[derive(Default)]
struct LineFields {
    actor: Option<String>,
    message: String,
    extra: Vec<(&'static str, String)>,
}

impl LineFields {
    fn put(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = value,
            ACTOR_FIELD => self.actor = Some(value),
            name => self.extra.push((name, value)),
        }
    }
}

impl Visit for LineFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }
}

impl<S, N> FormatEvent<S, N> for RunLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = LineFields::default();
        event.record(&mut fields);

        write!(
            writer,
            "[{}] [{:<6}{}] {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            level_label(event.metadata().level()),
            fields.actor.as_deref().unwrap_or(SYSTEM_ACTOR),
            fields.message,
        )?;
        for (name, value) in &fields.extra {
            write!(writer, " {name}={value}")?;
        }
        writeln!(writer)
    }
}
