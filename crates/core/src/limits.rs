//! Format constants and size limits.
//!
//! Snapshot sections carry a length prefix. Prefixes above
//! `MAX_SNAPSHOT_SECTION_BYTES` are rejected as corrupt before any buffer is
//! allocated.

// === Snapshot Format ===

/// Leading bytes of every analyzer snapshot.
pub const SNAPSHOT_MAGIC: &[u8; 8] = b"NAVSNAP\0";

/// Current snapshot format version.
///
/// Bump when the encoding of metadata, table, or cache changes.
pub const SNAPSHOT_VERSION: u32 = 1;

/// File written by `save` when no path is given.
pub const DEFAULT_SNAPSHOT_FILE: &str = "navigation_analyzer.snapshot";

/// Largest accepted snapshot section (4GB).
pub const MAX_SNAPSHOT_SECTION_BYTES: u64 = 4 * 1024 * 1024 * 1024;

// === Metric Tolerances ===

/// Allowed deviation of a frequency distribution's total from 1.0.
pub const FREQUENCY_SUM_TOLERANCE: f64 = 1e-5;
