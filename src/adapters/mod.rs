//! Adapters implementing the domain ports.

pub mod platform;
pub mod templates;

pub use templates::CatalogPromptRenderer;
