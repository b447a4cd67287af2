//! Console log format for the simlink binary.
//!
//! Lines look like
//! `[2024-05-01 12:00:00.123] [simlink-session   ] [ℹ INFO   ] Connected key=value`.
//! Events tagged with a `component` field (see the `component_*!` macros) get
//! the component appended to the service name in the second column.

use std::fmt;
use std::io::IsTerminal;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

const COMPONENT_COLUMN: usize = 18;
const LEVEL_COLUMN: usize = 9;

/// Log an info event tagged with a component
#[macro_export]
macro_rules! component_info {
    ($component:expr, $($arg:tt)*) => {
        tracing::info!(component = $component, $($arg)*)
    };
}

/// Log a warning tagged with a component
#[macro_export]
macro_rules! component_warn {
    ($component:expr, $($arg:tt)*) => {
        tracing::warn!(component = $component, $($arg)*)
    };
}

/// Log a debug event tagged with a component
#[macro_export]
macro_rules! component_debug {
    ($component:expr, $($arg:tt)*) => {
        tracing::debug!(component = $component, $($arg)*)
    };
}

/// ANSI escapes used for one output stream; empty when colors are off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Palette {
    timestamp: &'static str,
    error: &'static str,
    warn: &'static str,
    info: &'static str,
    quiet: &'static str,
    reset: &'static str,
}

impl Palette {
    const ANSI: Palette = Palette {
        timestamp: "\x1b[36m",
        error: "\x1b[91m",
        warn: "\x1b[93m",
        info: "\x1b[32m",
        quiet: "\x1b[90m",
        reset: "\x1b[0m",
    };

    const PLAIN: Palette = Palette {
        timestamp: "",
        error: "",
        warn: "",
        info: "",
        quiet: "",
        reset: "",
    };

    /// Colors for stdout, unless it is redirected or the terminal is dumb
    fn detect() -> Self {
        let dumb = std::env::var("TERM").map_or(true, |term| term == "dumb");
        if std::io::stdout().is_terminal() && !dumb {
            Self::ANSI
        } else {
            Self::PLAIN
        }
    }

    fn level(&self, level: &Level) -> &'static str {
        match *level {
            Level::ERROR => self.error,
            Level::WARN => self.warn,
            Level::INFO => self.info,
            Level::DEBUG | Level::TRACE => self.quiet,
        }
    }
}

fn level_label(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "✗ ERROR",
        Level::WARN => "⚠ WARN",
        Level::INFO => "ℹ INFO",
        Level::DEBUG => "◦ DEBUG",
        Level::TRACE => "◦ TRACE",
    }
}

/// Pad `text` to `width` chars, or cut it and mark the cut with `…`
fn fit(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return format!("{text:<width$}");
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// `FormatEvent` writing the simlink console format
pub struct SimlinkLogFormatter {
    service_name: String,
    palette: Palette,
}

impl SimlinkLogFormatter {
    pub fn new(service_name: String) -> Self {
        Self {
            service_name,
            palette: Palette::detect(),
        }
    }

    fn source(&self, component: Option<&str>) -> String {
        let name = match component {
            Some(component) => format!("{}-{}", self.service_name, component),
            None => self.service_name.clone(),
        };
        fit(&name, COMPONENT_COLUMN)
    }

    fn write_line(
        &self,
        writer: &mut impl fmt::Write,
        timestamp: impl fmt::Display,
        level: &Level,
        event: &EventFields,
    ) -> fmt::Result {
        let p = &self.palette;
        write!(
            writer,
            "{}[{}]{} [{}] [{}{}{}] {}",
            p.timestamp,
            timestamp,
            p.reset,
            self.source(event.component.as_deref()),
            p.level(level),
            fit(level_label(level), LEVEL_COLUMN),
            p.reset,
            event.message
        )?;
        for (name, value) in &event.fields {
            write!(writer, " {name}={value}")?;
        }
        writeln!(writer)
    }
}

impl<S, N> FormatEvent<S, N> for SimlinkLogFormatter
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
        let mut fields = EventFields::default();
        event.record(&mut fields);
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        self.write_line(&mut writer, timestamp, event.metadata().level(), &fields)
    }
}

/// Message, component tag and remaining key/value fields of one event
#[derive(Debug, Default)]
struct EventFields {
    message: String,
    component: Option<String>,
    fields: Vec<(&'static str, String)>,
}

impl EventFields {
    fn set(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = value,
            "component" => self.component = Some(value),
            name => self.fields.push((name, value)),
        }
    }
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.set(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.set(field, format!("{value:?}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> SimlinkLogFormatter {
        SimlinkLogFormatter {
            service_name: "simlink".to_string(),
            palette: Palette::PLAIN,
        }
    }

    #[test]
    fn test_fit() {
        assert_eq!(fit("abc", 5), "abc  ");
        assert_eq!(fit("abcdef", 4), "abc…");
        assert_eq!(fit("äöüäöü", 4).chars().count(), 4);
    }

    #[test]
    fn test_source_column() {
        let f = plain();
        assert_eq!(f.source(None).trim_end(), "simlink");
        assert_eq!(f.source(Some("session")).trim_end(), "simlink-session");
        assert!(f.source(Some("a-very-long-component")).ends_with('…'));
    }

    #[test]
    fn test_plain_line() {
        let f = plain();
        let fields = EventFields {
            message: "Connected".to_string(),
            component: Some("wire".to_string()),
            fields: vec![("nodes", "3".to_string())],
        };

        let mut line = String::new();
        f.write_line(&mut line, "T", &Level::WARN, &fields).unwrap();
        assert_eq!(
            line,
            format!("[T] [{:<18}] [{:<9}] Connected nodes=3\n", "simlink-wire", "⚠ WARN")
        );
        assert!(!line.contains('\x1b'));
    }

    #[test]
    fn test_ansi_palette_levels() {
        assert_eq!(Palette::ANSI.level(&Level::ERROR), "\x1b[91m");
        assert_eq!(Palette::PLAIN.level(&Level::ERROR), "");
    }
}
