//! Navigation data analyzer: one event table, its metadata, and the session
//! analyzer computing KPIs over it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use analytics_core::error::PersistenceErrorCode;
use analytics_core::limits::DEFAULT_SNAPSHOT_FILE;
use analytics_core::{Error, EventTable, Metadata, Result};
use session_analyzer::SessionAnalyzer;
use telemetry::TracingConfig;
use tracing::{info, Level};

use crate::export::write_workbook;
use crate::snapshot::{read_snapshot, write_snapshot};

pub struct NavigationDataAnalyzer {
    metadata: Metadata,
    session_analyzer: SessionAnalyzer,
}

impl NavigationDataAnalyzer {
    /// Builds an analyzer over `table`, checking it against `metadata` first.
    pub fn new(table: EventTable, metadata: Metadata) -> Result<Self> {
        metadata.check()?;
        table.validate(&metadata)?;

        let session_analyzer = SessionAnalyzer::new(Arc::new(table), metadata.columns.clone());
        info!(
            rows = session_analyzer.table().len(),
            "Created navigation data analyzer"
        );

        Ok(Self {
            metadata,
            session_analyzer,
        })
    }

    /// Like [`new`](Self::new), installing a global subscriber at `level`
    /// first. An already installed subscriber is kept.
    pub fn with_log_level(table: EventTable, metadata: Metadata, level: Level) -> Result<Self> {
        telemetry::init_tracing(TracingConfig::new().with_level(level));
        Self::new(table, metadata)
    }

    /// Writes metadata, table, and the KPI cache to `path`, or to
    /// `navigation_analyzer.snapshot` in the working directory.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_FILE));
        let cache = self.session_analyzer.kpi_results();

        write_snapshot(&path, &self.metadata, self.table(), &cache)?;
        info!(path = %path.display(), cached = cache.len(), "Saved analyzer snapshot");
        Ok(path)
    }

    /// Restores an analyzer saved with [`save`](Self::save), cache included.
    pub fn load(path: &Path) -> Result<Self> {
        let snapshot = read_snapshot(path)?;

        let invalid = |e: Error| {
            Error::persistence(
                PersistenceErrorCode::Corrupt,
                format!("snapshot {} is inconsistent: {}", path.display(), e),
            )
        };
        snapshot.metadata.check().map_err(invalid)?;
        snapshot.table.validate(&snapshot.metadata).map_err(invalid)?;

        let cached = snapshot.cache.len();
        let session_analyzer = SessionAnalyzer::with_cache(
            Arc::new(snapshot.table),
            snapshot.metadata.columns.clone(),
            snapshot.cache,
        );
        info!(
            path = %path.display(),
            rows = session_analyzer.table().len(),
            cached = cached,
            "Loaded analyzer snapshot"
        );

        Ok(Self {
            metadata: snapshot.metadata,
            session_analyzer,
        })
    }

    /// Exports every cached KPI to an xlsx workbook. Nothing is computed here.
    pub fn to_excel(&self, path: &Path) -> Result<usize> {
        write_workbook(&self.session_analyzer.kpi_results(), path)
    }

    pub fn session_analyzer(&self) -> &SessionAnalyzer {
        &self.session_analyzer
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn table(&self) -> &EventTable {
        self.session_analyzer.table().as_ref()
    }
}

impl std::fmt::Debug for NavigationDataAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationDataAnalyzer")
            .field("columns", &self.metadata.data_types.len())
            .field("session_analyzer", &self.session_analyzer)
            .finish()
    }
}
