//! Async client for the Helio Additive job service.
//!
//! [`transport::HelioClient`] is the GraphQL envelope. The pipelines in
//! [`registration`], [`simulation`] and [`optimization`] drive remote jobs
//! through the generic loop in [`polling`]; [`artifacts`] fetches results.

pub mod artifacts;
pub mod catalog;
pub mod convert;
pub mod operations;
pub mod optimization;
pub mod polling;
pub mod registration;
pub mod simulation;
pub mod transfer;
pub mod transport;

pub use helio_core::error::HelioError;
pub use polling::{FinishedJob, PollContext};
pub use transfer::ArtifactTransfer;
pub use transport::{HelioClient, OperationOutcome, Transport};
