//! LeadLens enrichment.
//!
//! - **EnrichmentController**: validated, single-flight submits with a hard timeout
//! - **EnrichmentService**: the remote call, with a reqwest implementation and a mock

pub mod controller;
pub mod error;
pub mod http;
pub mod mock;
pub mod service;

pub use controller::{EnrichmentController, EnrichmentOutcome, EnrichmentState};
pub use error::EnrichError;
pub use http::HttpEnrichmentService;
pub use mock::{CannedEnrichment, MockEnrichmentService};
pub use service::EnrichmentService;
