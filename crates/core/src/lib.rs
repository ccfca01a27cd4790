//! Domain types for the Helio job orchestration client.
//!
//! Holds the error taxonomy, configuration, job status model, settings
//! builders, and progress helpers. Nothing here performs network I/O.

pub mod config;
pub mod credentials;
pub mod error;
pub mod job;
pub mod naming;
pub mod progress;
pub mod settings;
