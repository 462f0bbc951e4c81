//! Memoizing session analyzer.

use std::sync::Arc;
use std::time::Instant;

use analytics_core::{ColumnRoles, Error, EventTable, Result, Session};
use parking_lot::Mutex;
use telemetry::{AnalyzerMetrics, AnalyzerMetricsSnapshot};
use tracing::{debug, info, warn};

use crate::cache::{FrequencyDistribution, KpiCache, KpiKey, KpiRecord, KpiValue, Metric};
use crate::grouping::{distinct_groups, group_sessions};
use crate::kpi;

/// Computes session KPIs over a read-only event table, caching every
/// distinct (metric, group) request.
///
/// The cache lock is held across each load-or-compute section, so concurrent
/// callers never compute the same key twice.
pub struct SessionAnalyzer {
    table: Arc<EventTable>,
    roles: ColumnRoles,
    cache: Mutex<KpiCache>,
    metrics: AnalyzerMetrics,
}

impl SessionAnalyzer {
    pub fn new(table: Arc<EventTable>, roles: ColumnRoles) -> Self {
        Self::with_cache(table, roles, KpiCache::new())
    }

    /// Creates an analyzer around a previously populated cache.
    pub fn with_cache(table: Arc<EventTable>, roles: ColumnRoles, cache: KpiCache) -> Self {
        let metrics = AnalyzerMetrics::new();
        metrics.cache_entries.set(cache.len() as u64);
        Self {
            table,
            roles,
            cache: Mutex::new(cache),
            metrics,
        }
    }

    pub fn compute_click_through_rate(&self, group: Option<&str>) -> Result<f64> {
        let key = KpiKey::new(Metric::ClickThroughRate, group);
        let record = self.load_or_compute(&key, |table, roles, sessions| {
            kpi::click_through_rate(table, roles, sessions).map(KpiValue::Rate)
        })?;
        record.value.as_rate().ok_or_else(|| mismatch(&key, record.value.kind()))
    }

    pub fn compute_zero_result_rate(&self, group: Option<&str>) -> Result<f64> {
        let key = KpiKey::new(Metric::ZeroResultRate, group);
        let record = self.load_or_compute(&key, |table, roles, sessions| {
            kpi::zero_result_rate(table, roles, sessions).map(KpiValue::Rate)
        })?;
        record.value.as_rate().ok_or_else(|| mismatch(&key, record.value.kind()))
    }

    /// Session lengths in seconds, one per session, ordered by session id.
    pub fn compute_session_length(&self, group: Option<&str>) -> Result<Vec<f64>> {
        let key = KpiKey::new(Metric::SessionLength, group);
        let record = self.load_or_compute(&key, |table, roles, sessions| {
            kpi::session_lengths(table, roles, sessions).map(KpiValue::Series)
        })?;
        let kind = record.value.kind();
        record.value.into_series().ok_or_else(|| mismatch(&key, kind))
    }

    /// Relative frequency of each clicked result position.
    pub fn compute_search_frequency(&self, group: Option<&str>) -> Result<FrequencyDistribution> {
        let key = KpiKey::new(Metric::SearchFrequency, group);
        let record = self.load_or_compute(&key, |table, roles, sessions| {
            kpi::search_frequency(table, roles, sessions)?
                .map(KpiValue::Distribution)
                .ok_or_else(|| Error::empty_scope(key.metric, &key.group))
        })?;
        let kind = record.value.kind();
        record
            .value
            .into_distribution()
            .ok_or_else(|| mismatch(&key, kind))
    }

    /// Computes every metric for all groups combined and for each group.
    ///
    /// Metrics with an empty scope are skipped. Returns the cache size.
    pub fn compute_all(&self) -> Result<usize> {
        let groups = self.groups()?;
        let filters = std::iter::once(None).chain(groups.iter().map(|g| Some(g.as_str())));

        for group in filters {
            for metric in Metric::ALL {
                let outcome = match metric {
                    Metric::ClickThroughRate => self.compute_click_through_rate(group).map(drop),
                    Metric::ZeroResultRate => self.compute_zero_result_rate(group).map(drop),
                    Metric::SessionLength => self.compute_session_length(group).map(drop),
                    Metric::SearchFrequency => self.compute_search_frequency(group).map(drop),
                };
                match outcome {
                    Ok(()) => {}
                    Err(e) if e.is_empty_scope() => {
                        warn!(metric = %metric, group = ?group, "Skipping metric with empty scope");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let entries = self.cache.lock().len();
        info!(entries = entries, groups = groups.len(), "Computed all KPIs");
        Ok(entries)
    }

    /// Distinct experiment groups in the table, sorted.
    pub fn groups(&self) -> Result<Vec<String>> {
        distinct_groups(&self.table, &self.roles)
    }

    /// Number of sessions in scope. Not cached.
    pub fn session_count(&self, group: Option<&str>) -> Result<usize> {
        Ok(group_sessions(&self.table, &self.roles, &group.into())?.len())
    }

    pub fn cached(&self, key: &KpiKey) -> Option<KpiRecord> {
        self.cache.lock().get(key).cloned()
    }

    pub fn cached_keys(&self) -> Vec<KpiKey> {
        self.cache.lock().keys().cloned().collect()
    }

    /// Copy of the whole cache.
    pub fn kpi_results(&self) -> KpiCache {
        self.cache.lock().clone()
    }

    pub fn metrics(&self) -> AnalyzerMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn table(&self) -> &Arc<EventTable> {
        &self.table
    }

    /// Returns the cached record for `key`, or computes and caches it.
    ///
    /// Failures are not cached.
    fn load_or_compute<F>(&self, key: &KpiKey, compute: F) -> Result<KpiRecord>
    where
        F: FnOnce(&EventTable, &ColumnRoles, &[Session]) -> Result<KpiValue>,
    {
        let mut cache = self.cache.lock();

        if let Some(record) = cache.get(key) {
            self.metrics.cache_hits.inc();
            debug!(kpi = %key, "KPI cache hit");
            return Ok(record.clone());
        }
        self.metrics.cache_misses.inc();

        let started = Instant::now();
        let result = self
            .sessions_in_scope(key)
            .and_then(|sessions| {
                let value = compute(self.table.as_ref(), &self.roles, &sessions)?;
                Ok(KpiRecord::new(value, sessions.len()))
            });
        self.metrics
            .compute_latency_ms
            .observe(started.elapsed().as_millis() as u64);

        match result {
            Ok(record) => {
                cache.insert(key.clone(), record.clone());
                self.metrics.cache_entries.set(cache.len() as u64);
                info!(
                    kpi = %key,
                    sessions = record.sessions,
                    kind = record.value.kind(),
                    "Computed KPI"
                );
                Ok(record)
            }
            Err(e) => {
                self.metrics.failed_computations.inc();
                warn!(kpi = %key, error = %e, "KPI computation failed");
                Err(e)
            }
        }
    }

    fn sessions_in_scope(&self, key: &KpiKey) -> Result<Vec<Session>> {
        self.metrics.grouping_passes.inc();
        let sessions = group_sessions(&self.table, &self.roles, &key.group)?;
        if sessions.is_empty() {
            return Err(Error::empty_scope(key.metric, &key.group));
        }
        Ok(sessions)
    }
}

fn mismatch(key: &KpiKey, kind: &str) -> Error {
    Error::internal(format!("cached {} holds a {} value", key, kind))
}

impl std::fmt::Debug for SessionAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAnalyzer")
            .field("rows", &self.table.len())
            .field("roles", &self.roles)
            .field("cached", &self.cache.lock().len())
            .finish()
    }
}
