//! Domain layer for agent-steward
//!
//! Core models, error taxonomy and port traits.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainResult, LifecycleError};
