//! LeadLens client library.
//!
//! Application wiring shared by the `leadlens` binary and its tests, and the
//! text presentation of enrichment records.

pub mod app;
pub mod render;

pub use app::{App, AppError};
