//! Shared fixtures for the navigation analytics integration tests.

pub mod fixtures;
