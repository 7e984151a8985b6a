//! LeadLens protocol types.
//!
//! Shared by the session layer, the enrichment controller and the client binary:
//!
//! - **http_types**: request/response bodies for `POST /api/enrich`
//! - **record**: the schema-less enrichment record as a tagged value tree
//! - **config**: client configuration (file + environment)
//! - **paths**: home directory resolution

pub mod config;
pub mod defaults;
pub mod http_types;
pub mod paths;
pub mod record;

pub use config::{ClientConfig, ConfigError, IdentityConfig};
pub use http_types::{EnrichRequest, ErrorBody};
pub use record::{Record, RecordError, RecordValue, Scalar};
