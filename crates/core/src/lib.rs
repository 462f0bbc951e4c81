//! Core types, configuration, and the typed event table for navigation analytics.

pub mod error;
pub mod limits;
pub mod metadata;
pub mod session;
pub mod table;

pub use error::{Error, Result};
pub use metadata::*;
pub use session::*;
pub use table::*;
