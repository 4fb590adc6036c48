//! Tracing subscriber setup for the Tether client.
//!
//! The client crates only emit `tracing` events. [`init_from_config`] turns
//! the `[logging]` section into a subscriber:
//!
//! ```rust,ignore
//! let config = ConfigLoader::new().load()?;
//! tether_runtime::logging::init_from_config(&config.logging);
//! ```
//!
//! The HTTP and WebSocket stacks under the transports log every frame and
//! pool checkout at `debug`. They are capped at `warn` unless a filter
//! names them. `RUST_LOG`, when set and valid, replaces the whole filter.

use std::ffi::OsStr;
use std::path::Path;

use tracing::warn;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LogRotation, LoggingConfig, SpanEventConfig};

/// Crates under the transports that are capped at `warn` by default.
const QUIET_DEPENDENCIES: &[&str] = &[
    "h2",
    "hyper",
    "hyper_util",
    "native_tls",
    "reqwest",
    "tokio_tungstenite",
    "tungstenite",
];

const DEFAULT_LOG_FILE: &str = "tether.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the global subscriber described by `config`.
///
/// Returns `false` if a subscriber was already installed, in which case
/// nothing changes. Problems with the configuration that do not prevent
/// logging (unknown filter targets, a file output without a path) are
/// reported through the new subscriber once it is up.
pub fn init_from_config(config: &LoggingConfig) -> bool {
    let (filter, rejected) = build_filter(config);
    let (writer, missing_path) = make_writer(config);

    let installed = tracing_subscriber::registry()
        .with(fmt_layer(config, writer))
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        for target in rejected {
            warn!(target = %target, "Ignoring log filter with an invalid module path");
        }
        if missing_path {
            warn!("File output requested without `file_path`, logging to stdout");
        }
    }
    installed
}

/// Filter directives for `config`, most general first.
///
/// The base level comes first, then the caps on [`QUIET_DEPENDENCIES`] that
/// no filter overrides, then the configured filters sorted by module path.
/// Filters whose key is not a module path are returned separately.
pub fn filter_directives(config: &LoggingConfig) -> (Vec<String>, Vec<String>) {
    let mut directives = vec![config.level.as_str().to_string()];

    for dep in QUIET_DEPENDENCIES {
        let overridden = config
            .filters
            .keys()
            .any(|module| module == dep || module.starts_with(&format!("{dep}::")));
        if !overridden {
            directives.push(format!("{dep}=warn"));
        }
    }

    let mut filters: Vec<_> = config.filters.iter().collect();
    filters.sort_by(|a, b| a.0.cmp(b.0));

    let mut rejected = Vec::new();
    for (module, level) in filters {
        if is_module_path(module) {
            directives.push(format!("{module}={level}"));
        } else {
            rejected.push(module.clone());
        }
    }
    (directives, rejected)
}

fn build_filter(config: &LoggingConfig) -> (EnvFilter, Vec<String>) {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return (filter, Vec::new());
    }

    let (directives, mut rejected) = filter_directives(config);
    let mut filter = EnvFilter::new("");
    for directive in directives {
        match directive.parse() {
            Ok(d) => filter = filter.add_directive(d),
            Err(_) => rejected.push(directive),
        }
    }
    (filter, rejected)
}

/// `tokio_tungstenite`, `tether_core::session`; no spaces or span syntax.
fn is_module_path(target: &str) -> bool {
    !target.is_empty()
        && target
            .split("::")
            .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}

/// Picks the writer for `config.output`. The flag is set when file output
/// was requested without a path.
fn make_writer(config: &LoggingConfig) -> (BoxMakeWriter, bool) {
    match config.output {
        LogOutput::Stdout => (BoxMakeWriter::new(std::io::stdout), false),
        LogOutput::Stderr => (BoxMakeWriter::new(std::io::stderr), false),
        LogOutput::File => match &config.file_path {
            Some(path) => {
                let dir = path.parent().unwrap_or_else(|| Path::new("."));
                let name = path
                    .file_name()
                    .unwrap_or_else(|| OsStr::new(DEFAULT_LOG_FILE));
                let appender = RollingFileAppender::new(rotation(config.rotation), dir, name);
                (BoxMakeWriter::new(appender), false)
            }
            None => (BoxMakeWriter::new(std::io::stdout), true),
        },
    }
}

fn rotation(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Never => Rotation::NEVER,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
    }
}

fn span_flags(events: &SpanEventConfig) -> FmtSpan {
    let mut span = FmtSpan::NONE;
    if events.new {
        span |= FmtSpan::NEW;
    }
    if events.enter {
        span |= FmtSpan::ENTER;
    }
    if events.exit {
        span |= FmtSpan::EXIT;
    }
    if events.close {
        span |= FmtSpan::CLOSE;
    }
    span
}

fn fmt_layer(config: &LoggingConfig, writer: BoxMakeWriter) -> BoxedLayer {
    let spans = span_flags(&config.span_events);
    let layer = fmt::layer()
        .with_span_events(spans)
        .with_target(true)
        .with_thread_ids(config.thread_ids)
        .with_file(config.file_location)
        .with_line_number(config.file_location)
        .with_writer(writer);

    match config.format {
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Full => layer.boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        #[cfg(feature = "json-log")]
        LogFormat::Json => layer.json().boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn transport_stacks_are_capped_by_default() {
        let config = LoggingConfig {
            level: LogLevel::Debug,
            ..Default::default()
        };
        let (directives, rejected) = filter_directives(&config);
        assert_eq!(directives[0], "debug");
        assert!(directives.contains(&"hyper=warn".to_string()));
        assert!(directives.contains(&"tungstenite=warn".to_string()));
        assert!(rejected.is_empty());
    }

    #[test]
    fn configured_filters_replace_caps_and_are_sorted() {
        let mut config = LoggingConfig::default();
        config.filters.insert("tether_core".into(), LogLevel::Trace);
        config.filters.insert("reqwest::connect".into(), LogLevel::Debug);
        config.filters.insert("hyper".into(), LogLevel::Info);

        let (directives, _) = filter_directives(&config);
        assert!(!directives.contains(&"hyper=warn".to_string()));
        assert!(!directives.contains(&"reqwest=warn".to_string()));
        assert!(directives.contains(&"h2=warn".to_string()));
        assert_eq!(
            directives[directives.len() - 3..],
            ["hyper=info", "reqwest::connect=debug", "tether_core=trace"]
        );
    }

    #[test]
    fn filters_that_are_not_module_paths_are_rejected() {
        let mut config = LoggingConfig::default();
        config.filters.insert("tether core".into(), LogLevel::Debug);
        config.filters.insert("tether_core::".into(), LogLevel::Debug);
        config.filters.insert("tether_core::session".into(), LogLevel::Debug);

        let (directives, mut rejected) = filter_directives(&config);
        rejected.sort();
        assert_eq!(rejected, ["tether core", "tether_core::"]);
        assert_eq!(directives.last().map(String::as_str), Some("tether_core::session=debug"));
    }

    #[test]
    fn span_config_maps_to_fmt_flags() {
        assert_eq!(span_flags(&SpanEventConfig::default()), FmtSpan::NONE);
        let lifecycle = SpanEventConfig {
            new: true,
            close: true,
            ..Default::default()
        };
        assert_eq!(span_flags(&lifecycle), FmtSpan::NEW | FmtSpan::CLOSE);
    }

    #[test]
    fn file_output_without_path_falls_back() {
        let config = LoggingConfig {
            output: LogOutput::File,
            ..Default::default()
        };
        assert!(make_writer(&config).1);

        let config = LoggingConfig {
            output: LogOutput::Stderr,
            ..Default::default()
        };
        assert!(!make_writer(&config).1);
    }

    #[test]
    fn rotation_follows_config() {
        assert_eq!(rotation(LogRotation::Never), Rotation::NEVER);
        assert_eq!(rotation(LogRotation::Hourly), Rotation::HOURLY);
        assert_eq!(rotation(LogRotation::Daily), Rotation::DAILY);
    }
}
