//! KPI cache keys and values.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metrics the session analyzer can compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    ClickThroughRate,
    ZeroResultRate,
    SessionLength,
    SearchFrequency,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::ClickThroughRate,
        Metric::ZeroResultRate,
        Metric::SessionLength,
        Metric::SearchFrequency,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ClickThroughRate => "click_through_rate",
            Self::ZeroResultRate => "zero_result_rate",
            Self::SessionLength => "session_length",
            Self::SearchFrequency => "search_frequency",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Experiment group restriction applied before session grouping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroupFilter {
    All,
    Group(String),
}

impl GroupFilter {
    pub fn matches(&self, group: &str) -> bool {
        match self {
            Self::All => true,
            Self::Group(id) => id == group,
        }
    }
}

impl From<Option<&str>> for GroupFilter {
    fn from(group: Option<&str>) -> Self {
        match group {
            Some(id) => Self::Group(id.to_string()),
            None => Self::All,
        }
    }
}

impl fmt::Display for GroupFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Group(id) => f.write_str(id),
        }
    }
}

/// Cache key: one entry per (metric, group filter).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KpiKey {
    pub metric: Metric,
    pub group: GroupFilter,
}

impl KpiKey {
    pub fn new(metric: Metric, group: Option<&str>) -> Self {
        Self {
            metric,
            group: group.into(),
        }
    }
}

impl fmt::Display for KpiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.metric, self.group)
    }
}

/// One bucket of a frequency distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBucket {
    pub value: f64,
    pub count: u64,
    pub frequency: f64,
}

/// Relative frequencies of a categorical numeric value, sorted by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyDistribution {
    buckets: Vec<FrequencyBucket>,
}

impl FrequencyDistribution {
    /// Builds the distribution of `values`. `None` when there are none.
    pub fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.total_cmp(b));

        let total = values.len() as f64;
        let mut buckets: Vec<FrequencyBucket> = Vec::new();
        for value in values {
            match buckets.last_mut() {
                Some(last) if last.value.total_cmp(&value).is_eq() => last.count += 1,
                _ => buckets.push(FrequencyBucket {
                    value,
                    count: 1,
                    frequency: 0.0,
                }),
            }
        }
        for bucket in &mut buckets {
            bucket.frequency = bucket.count as f64 / total;
        }

        Some(Self { buckets })
    }

    /// Relative frequency of `value`, if it occurred.
    pub fn get(&self, value: f64) -> Option<f64> {
        self.buckets
            .binary_search_by(|b| b.value.total_cmp(&value))
            .ok()
            .map(|i| self.buckets[i].frequency)
    }

    pub fn buckets(&self) -> &[FrequencyBucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Sum of all frequencies (1.0 up to rounding).
    pub fn total(&self) -> f64 {
        self.buckets.iter().map(|b| b.frequency).sum()
    }

    /// Bucket with the highest count; ties go to the smaller value.
    pub fn most_common(&self) -> Option<&FrequencyBucket> {
        self.buckets
            .iter()
            .reduce(|best, b| if b.count > best.count { b } else { best })
    }
}

/// Computed metric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KpiValue {
    Rate(f64),
    Series(Vec<f64>),
    Distribution(FrequencyDistribution),
}

impl KpiValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rate(_) => "rate",
            Self::Series(_) => "series",
            Self::Distribution(_) => "distribution",
        }
    }

    pub fn as_rate(&self) -> Option<f64> {
        match self {
            Self::Rate(rate) => Some(*rate),
            _ => None,
        }
    }

    pub fn into_series(self) -> Option<Vec<f64>> {
        match self {
            Self::Series(series) => Some(series),
            _ => None,
        }
    }

    pub fn into_distribution(self) -> Option<FrequencyDistribution> {
        match self {
            Self::Distribution(distribution) => Some(distribution),
            _ => None,
        }
    }
}

/// A cached, immutable metric result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiRecord {
    pub value: KpiValue,
    /// Sessions in scope when the value was computed
    pub sessions: usize,
    pub computed_at: DateTime<Utc>,
}

impl KpiRecord {
    pub fn new(value: KpiValue, sessions: usize) -> Self {
        Self {
            value,
            sessions,
            computed_at: Utc::now(),
        }
    }
}

/// Memo of every computed (metric, group) pair. Never evicts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiCache {
    entries: BTreeMap<KpiKey, KpiRecord>,
}

impl KpiCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &KpiKey) -> Option<&KpiRecord> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: KpiKey, record: KpiRecord) {
        self.entries.insert(key, record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &KpiKey> {
        self.entries.keys()
    }

    /// Entries ordered by metric, then group.
    pub fn iter(&self) -> impl Iterator<Item = (&KpiKey, &KpiRecord)> {
        self.entries.iter()
    }
}
