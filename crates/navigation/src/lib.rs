//! Navigation event logs: CSV loading, the composed analyzer, binary
//! snapshots, and spreadsheet export.

pub mod analyzer;
pub mod export;
pub mod loader;
pub mod snapshot;

pub use analyzer::NavigationDataAnalyzer;
pub use loader::{load_csv, load_csv_from};
