//! Infrastructure layer module
//!
//! Cross-cutting concerns shared by adapters and services:
//! - Configuration management
//! - Logging infrastructure
//! - Retry and cancellable sleep helpers

pub mod config;
pub mod logging;
pub mod retry;
