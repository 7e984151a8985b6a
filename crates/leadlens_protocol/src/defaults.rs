//! Canonical default values shared by the client crates.

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const ENRICH_PATH: &str = "/api/enrich";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_IDENTITY_SCOPE: &str = "openid profile email";

/// Slot in the durable credential store holding the bearer token.
pub const CREDENTIAL_STORE_KEY: &str = "idToken";

pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a company name";
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid response format";
pub const GENERIC_FETCH_ERROR_MESSAGE: &str = "Error fetching company data";
