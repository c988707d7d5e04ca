//! Source merging for configuration.

pub mod policy;
pub mod service;
