pub mod api_handler;
pub mod context_client;
pub mod health_handler;
pub mod in_memory_context;
pub mod mcp_client;
pub mod mcp_envelope;
pub mod metrics_handler;
pub mod remote_specialist;

use reqwest::Client;
use std::time::Duration;

/// HTTP client with a default timeout. Callers also set the timeout per
/// request, so the plain fallback client never runs unbounded.
pub(crate) fn http_client(timeout: Duration, owner: &str) -> Client {
    Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        tracing::warn!(owner = %owner, error = %e, "HTTP client builder failed, using defaults");
        Client::new()
    })
}
