//! Session grouping and memoized KPI computation.
//!
//! Every metric follows the same shape: filter rows by experiment group,
//! group the remaining rows by session id, reduce each session, aggregate.

pub mod analyzer;
pub mod cache;
pub mod grouping;
pub mod kpi;
pub mod stats;

pub use analyzer::SessionAnalyzer;
pub use cache::*;
