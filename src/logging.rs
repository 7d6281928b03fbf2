//! Logging setup for slinpin
//!
//! Every record the container emits uses the `slinpin` target with
//! structured `key`, `scope`, `depth` and `provider` fields. This module
//! installs a `tracing-subscriber` pipeline for applications that do not
//! configure one themselves.
//!
//! # Features
//!
//! - `logging` - Emit records through `tracing` (default)
//! - `logging-json` - JSON output (recommended for production)
//! - `logging-pretty` - Colorful multi-line output (recommended for development)
//!
//! Without either subscriber feature the initializers are no-ops.
//!
//! # Example
//!
//! ```rust,ignore
//! use slinpin::logging;
//!
//! // JSON if logging-json is enabled, pretty otherwise
//! logging::init();
//!
//! // Or configure the pipeline
//! logging::builder()
//!     .trace()
//!     .slinpin_only()
//!     .compact()
//!     .init();
//! ```
//!
//! `RUST_LOG` takes precedence over the configured level unless
//! [`LoggingBuilder::ignore_env`] is used.

use tracing::Level;

/// Target used by every record the container emits
pub const TARGET: &str = "slinpin";

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON structured logging (production default)
    #[default]
    Json,
    /// Pretty colorful output (development)
    Pretty,
    /// Compact single-line output
    Compact,
}

/// Builder for the logging pipeline
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    respect_env: bool,
    with_file: bool,
    with_line_number: bool,
    with_thread_ids: bool,
    with_thread_names: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Json,
            target: None,
            respect_env: true,
            with_file: false,
            with_line_number: false,
            with_thread_ids: false,
            with_thread_names: false,
        }
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum log level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// TRACE shows memo hits and parent delegation
    pub fn trace(self) -> Self {
        self.with_level(Level::TRACE)
    }

    /// DEBUG shows registrations, evaluations and missing keys
    pub fn debug(self) -> Self {
        self.with_level(Level::DEBUG)
    }

    pub fn info(self) -> Self {
        self.with_level(Level::INFO)
    }

    pub fn warn(self) -> Self {
        self.with_level(Level::WARN)
    }

    pub fn error(self) -> Self {
        self.with_level(Level::ERROR)
    }

    /// Only show records from `target`
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Only show the container's own records
    pub fn slinpin_only(self) -> Self {
        self.with_target_filter(TARGET)
    }

    /// Use the configured level even when `RUST_LOG` is set
    pub fn ignore_env(mut self) -> Self {
        self.respect_env = false;
        self
    }

    pub fn with_file(mut self) -> Self {
        self.with_file = true;
        self
    }

    pub fn with_line_number(mut self) -> Self {
        self.with_line_number = true;
        self
    }

    pub fn with_thread_ids(mut self) -> Self {
        self.with_thread_ids = true;
        self
    }

    pub fn with_thread_names(mut self) -> Self {
        self.with_thread_names = true;
        self
    }

    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// Filter directive built from the level and target settings
    pub fn directive(&self) -> String {
        match self.target {
            Some(target) => format!("{}={}", target, self.level),
            None => self.level.to_string(),
        }
    }

    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    fn filter(&self) -> tracing_subscriber::EnvFilter {
        use tracing_subscriber::EnvFilter;

        if self.respect_env {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directive()))
        } else {
            EnvFilter::new(self.directive())
        }
    }

    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    fn layer(&self) -> Box<dyn tracing_subscriber::Layer<tracing_subscriber::Registry> + Send + Sync> {
        use tracing_subscriber::{fmt, Layer};

        let base = fmt::layer()
            .with_file(self.with_file)
            .with_line_number(self.with_line_number)
            .with_thread_ids(self.with_thread_ids)
            .with_thread_names(self.with_thread_names)
            .with_target(true);

        match self.format {
            LogFormat::Json => {
                #[cfg(feature = "logging-json")]
                let layer = base.json().boxed();
                // Plain text when the json feature is off
                #[cfg(not(feature = "logging-json"))]
                let layer = base.boxed();
                layer
            }
            LogFormat::Pretty => base.pretty().boxed(),
            LogFormat::Compact => base.compact().boxed(),
        }
    }

    /// Install the subscriber, failing if one is already installed
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn try_init(self) -> Result<(), tracing_subscriber::util::TryInitError> {
        use tracing_subscriber::{prelude::*, Layer};

        tracing_subscriber::registry()
            .with(self.layer().with_filter(self.filter()))
            .try_init()
    }

    /// Install the subscriber; a subscriber that is already installed wins
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// No-op: tracing-subscriber is not enabled
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) {}
}

/// Create a new logging builder
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Initialize logging with default settings.
///
/// JSON if `logging-json` is enabled, pretty otherwise.
pub fn init() {
    #[cfg(feature = "logging-json")]
    init_json();
    #[cfg(not(feature = "logging-json"))]
    init_pretty();
}

/// Initialize JSON structured logging
///
/// # Example output
/// ```json
/// {"timestamp":"2026-01-01T00:00:00.000Z","level":"DEBUG","fields":{"message":"Evaluating provider","key":"db","provider":"service","scope":"scope-1","depth":0},"target":"slinpin"}
/// ```
pub fn init_json() {
    builder().json().debug().init();
}

/// Initialize pretty colorful logging
///
/// # Example output
/// ```text
///   2026-01-01T00:00:00.000Z DEBUG slinpin: Evaluating provider, key: db, provider: service, scope: scope-1, depth: 0
/// ```
pub fn init_pretty() {
    builder().pretty().debug().init();
}

/// Initialize logging that shows only the container's records
pub fn init_slinpin_only() {
    builder().slinpin_only().debug().init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = LoggingBuilder::default();
        assert_eq!(builder.level, Level::DEBUG);
        assert_eq!(builder.format, LogFormat::Json);
        assert!(builder.target.is_none());
        assert!(builder.respect_env);
        assert_eq!(builder.directive(), "DEBUG");
    }

    #[test]
    fn test_builder_chain() {
        let builder = LoggingBuilder::new()
            .trace()
            .pretty()
            .with_file()
            .with_line_number()
            .ignore_env()
            .slinpin_only();

        assert_eq!(builder.level, Level::TRACE);
        assert_eq!(builder.format, LogFormat::Pretty);
        assert!(builder.with_file);
        assert!(builder.with_line_number);
        assert!(!builder.respect_env);
        assert_eq!(builder.target, Some(TARGET));
        assert_eq!(builder.directive(), "slinpin=TRACE");
    }
}
