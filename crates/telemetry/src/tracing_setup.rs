//! Structured logging for the analyzer and its command-line front end.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log filter and output format.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter directive, e.g. `info` or `session_analyzer=debug`.
    pub filter: String,
    /// Emit one JSON object per event instead of plain text.
    pub json: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Filter everything at `level` and above.
    pub fn with_level(self, level: Level) -> Self {
        self.with_filter(level.as_str().to_ascii_lowercase())
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// `RUST_LOG` when set, otherwise the configured filter.
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.filter))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Installs the global subscriber.
///
/// Returns `false` when one is already installed; the existing subscriber
/// keeps running. Analyzers are built repeatedly in tests and each one asks
/// for logging.
pub fn init_tracing(config: TracingConfig) -> bool {
    let registry = tracing_subscriber::registry().with(config.env_filter());

    let installed = if config.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
            .is_ok()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init().is_ok()
    };

    if installed {
        tracing::info!(filter = %config.filter, json = config.json, "Logging initialized");
    }
    installed
}

/// Reads `RUST_LOG` and `LOG_JSON` (`1` or `true`).
pub fn init_tracing_from_env() -> bool {
    let json = std::env::var("LOG_JSON")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    init_tracing(TracingConfig::new().with_filter(filter).with_json(json))
}
