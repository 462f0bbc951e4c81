//! Navigation Analytics
//!
//! Batch run over a navigation event log:
//! - Load the analyzer snapshot, or the CSV log named by the JSON configuration
//! - Compute every KPI for all sessions and for each experiment group
//! - Save the snapshot and export the KPI results to xlsx

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use analytics_core::limits::DEFAULT_SNAPSHOT_FILE;
use analytics_core::NavigationConfig;
use navigation_data::{load_csv, NavigationDataAnalyzer};
use session_analyzer::stats;
use telemetry::init_tracing_from_env;

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    /// JSON document with data import and metadata sections
    #[serde(default = "default_config_path")]
    config_path: String,

    #[serde(default = "default_snapshot_path")]
    snapshot_path: String,

    #[serde(default = "default_export_path")]
    export_path: String,

    /// Ignore an existing snapshot and reload the CSV log
    #[serde(default)]
    refresh: bool,
}

fn default_config_path() -> String {
    "config/navigation.json".to_string()
}

fn default_snapshot_path() -> String {
    DEFAULT_SNAPSHOT_FILE.to_string()
}

fn default_export_path() -> String {
    "kpi_results.xlsx".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
            snapshot_path: default_snapshot_path(),
            export_path: default_export_path(),
            refresh: false,
        }
    }
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Navigation Analytics v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    info!(
        config_path = %config.config_path,
        snapshot_path = %config.snapshot_path,
        export_path = %config.export_path,
        "Loaded configuration"
    );

    let snapshot_path = Path::new(&config.snapshot_path);
    let analyzer = if snapshot_path.exists() && !config.refresh {
        NavigationDataAnalyzer::load(snapshot_path)
            .with_context(|| format!("Failed to load snapshot {}", snapshot_path.display()))?
    } else {
        let navigation = NavigationConfig::load(&config.config_path)
            .with_context(|| format!("Failed to load configuration {}", config.config_path))?;
        let table = load_csv(&navigation).context("Failed to load event log")?;
        NavigationDataAnalyzer::new(table, navigation.metadata)
            .context("Failed to create analyzer")?
    };

    let sessions = analyzer.session_analyzer();
    let entries = sessions.compute_all().context("Failed to compute KPIs")?;
    log_summary(&analyzer)?;

    analyzer
        .save(Some(snapshot_path))
        .context("Failed to save snapshot")?;
    let rows = analyzer
        .to_excel(Path::new(&config.export_path))
        .context("Failed to export KPI results")?;

    let metrics = sessions.metrics();
    info!(
        entries = entries,
        rows = rows,
        cache_hits = metrics.cache_hits,
        cache_misses = metrics.cache_misses,
        "Run complete"
    );
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("NAVIGATION")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Logs the headline KPIs per group.
fn log_summary(analyzer: &NavigationDataAnalyzer) -> Result<()> {
    let sessions = analyzer.session_analyzer();
    let groups = sessions.groups()?;
    let filters = std::iter::once(None).chain(groups.iter().map(|g| Some(g.as_str())));

    for group in filters {
        let label = group.unwrap_or("all");
        let session_count = sessions.session_count(group)?;
        if session_count == 0 {
            warn!(group = label, "No sessions");
            continue;
        }

        let ctr = sessions.compute_click_through_rate(group)?;
        let zrr = sessions.compute_zero_result_rate(group)?;
        let lengths = sessions.compute_session_length(group)?;
        let top_position = match sessions.compute_search_frequency(group) {
            Ok(distribution) => distribution.most_common().map(|b| b.value),
            Err(e) if e.is_empty_scope() => None,
            Err(e) => return Err(e.into()),
        };

        info!(
            group = label,
            sessions = session_count,
            click_through_rate = ctr,
            zero_result_rate = zrr,
            median_session_length = ?stats::median(&lengths),
            top_position = ?top_position,
            "KPI summary"
        );
    }
    Ok(())
}
