//! Environment-driven workflow runner for the Helio job service.

pub mod progress_bar;
pub mod workflow;
