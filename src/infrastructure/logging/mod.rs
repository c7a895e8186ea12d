//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty console output
//! - Optional rolling JSON log files
//! - Secret scrubbing for remote error bodies

pub mod logger;
pub mod secret_scrubbing;

pub use logger::{init, LoggerGuard};
pub use secret_scrubbing::{redact_key, scrub};
