//! MCP Client Adapter
//!
//! Session-oriented JSON-RPC client for one tool host, owned by one agent.
//! The session is created lazily, shared by concurrent calls of that agent,
//! and replaced when the host rejects it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::adapters::http_client;
use crate::adapters::mcp_envelope::{decode_body, extract_outcome};
use crate::agents::domain::{ToolCallRequest, ToolDefinition};
use crate::agents::error::{ToolCallResult, ToolError};
use crate::config::TimeoutSettings;
use crate::domain::mcp_types::{JsonRpcRequest, ACCEPT_BOTH, SESSION_HEADER};
use crate::domain::ToolInvoker;

/// Session established with a tool host
#[derive(Debug, Clone)]
pub struct Session {
    /// Host-issued token; `None` when the host does not issue one
    pub token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Protocol client bound to one (agent, tool host) pair
pub struct McpClient {
    agent_id: String,
    agent_name: String,
    endpoint: String,
    health_url: String,
    client: Client,
    /// Per-request bound on every JSON-RPC exchange
    call_timeout: Duration,
    health_timeout: Duration,
    session: RwLock<Option<Session>>,
    init_lock: Mutex<()>,
}

impl McpClient {
    pub fn new(
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        host_url: &str,
        timeouts: &TimeoutSettings,
    ) -> Self {
        let agent_id = agent_id.into();
        let call_timeout = Duration::from_secs(timeouts.tool_call_secs);
        let client = http_client(call_timeout, &agent_id);

        let base = host_url.trim_end_matches('/');
        let base = base.strip_suffix("/mcp").unwrap_or(base);

        Self {
            agent_id,
            agent_name: agent_name.into(),
            endpoint: format!("{}/mcp", base),
            health_url: format!("{}/health", base),
            client,
            call_timeout,
            health_timeout: Duration::from_secs(timeouts.health_secs),
            session: RwLock::new(None),
            init_lock: Mutex::new(()),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Current session, if one is active
    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Return the active session token, initializing first if needed.
    ///
    /// Concurrent callers queue on the init lock; whoever wins installs the
    /// session and the rest reuse it.
    pub async fn ensure_session(&self) -> Result<Option<String>, ToolError> {
        if let Some(session) = self.session.read().await.as_ref() {
            return Ok(session.token.clone());
        }

        let _guard = self.init_lock.lock().await;
        if let Some(session) = self.session.read().await.as_ref() {
            return Ok(session.token.clone());
        }

        let session = self.initialize().await?;
        let token = session.token.clone();
        *self.session.write().await = Some(session);
        Ok(token)
    }

    async fn initialize(&self) -> Result<Session, ToolError> {
        let frame = JsonRpcRequest::initialize(&self.agent_id);
        let response = self
            .request_builder(None)
            .json(&frame)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Transport(format!(
                "initialize against {} returned HTTP {}",
                self.endpoint, status
            )));
        }

        let token = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match &token {
            Some(token) => info!(agent_id = %self.agent_id, session = %token, "MCP session initialized"),
            None => warn!(agent_id = %self.agent_id, "MCP session ID not found in response headers"),
        }

        let notification = JsonRpcRequest::notification("notifications/initialized");
        if let Err(e) = self
            .request_builder(token.as_deref())
            .json(&notification)
            .send()
            .await
        {
            debug!(agent_id = %self.agent_id, error = %e, "initialized notification not delivered");
        }

        Ok(Session {
            token,
            created_at: Utc::now(),
        })
    }

    /// Clear the session only if it still holds the token that failed
    async fn invalidate(&self, failed: &Option<String>) {
        let mut guard = self.session.write().await;
        if guard.as_ref().map(|s| &s.token) == Some(failed) {
            *guard = None;
        }
    }

    fn request_builder(&self, token: Option<&str>) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, ACCEPT_BOTH)
            .header("x-agent-id", &self.agent_id)
            .header("x-agent-name", &self.agent_name)
            .timeout(self.call_timeout);
        if let Some(token) = token {
            builder = builder.header(SESSION_HEADER, token);
        }
        builder
    }

    async fn post(&self, frame: &Value, token: Option<&str>) -> Result<Value, ToolError> {
        let response = self.request_builder(token).json(frame).send().await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND {
            return Err(ToolError::SessionExpired {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ToolError::Transport(format!(
                "HTTP {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        decode_body(&body, content_type.as_deref())
    }

    /// Send one framed request, recovering from an expired session once
    async fn send(&self, frame: Value) -> ToolCallResult {
        let token = self.ensure_session().await?;

        match self.post(&frame, token.as_deref()).await {
            Err(ToolError::SessionExpired { status }) => {
                warn!(agent_id = %self.agent_id, status, "MCP session rejected, re-initializing");
                self.invalidate(&token).await;

                let fresh = self.ensure_session().await.map_err(|e| {
                    ToolError::Transport(format!("re-initialization failed: {}", e))
                })?;

                match self.post(&frame, fresh.as_deref()).await {
                    Err(ToolError::SessionExpired { status }) => {
                        self.invalidate(&fresh).await;
                        Err(ToolError::Transport(format!(
                            "session rejected again after re-initialization (HTTP {})",
                            status
                        )))
                    }
                    other => other.and_then(extract_outcome),
                }
            }
            other => other.and_then(extract_outcome),
        }
    }

    /// Invoke a tool on the host
    pub async fn call_tool(&self, name: &str, arguments: Value) -> ToolCallResult {
        let request = ToolCallRequest::new(&self.agent_id, name, arguments);
        let started = Instant::now();
        let outcome = self.send(request.to_rpc()).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            Ok(_) => info!(
                agent_id = %self.agent_id,
                tool = %name,
                request_id = %request.id,
                elapsed_ms,
                "Tool call succeeded"
            ),
            Err(e) => warn!(
                agent_id = %self.agent_id,
                tool = %name,
                request_id = %request.id,
                elapsed_ms,
                code = e.code(),
                error = %e,
                "Tool call failed"
            ),
        }
        outcome
    }

    /// Discover the tools exposed by the host
    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolError> {
        let frame = json!({
            "jsonrpc": "2.0",
            "method": "tools/list",
            "params": {},
            "id": format!("{}-list-{}", self.agent_id, uuid::Uuid::new_v4()),
        });
        let result = self.send(frame).await?;

        let tools = result
            .get("tools")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(ToolDefinition::from_host_listing).collect())
            .unwrap_or_default();
        Ok(tools)
    }

    /// Plain HTTP health probe of the host
    pub async fn ping(&self) -> bool {
        match self
            .client
            .get(&self.health_url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(agent_id = %self.agent_id, error = %e, "tool host health probe failed");
                false
            }
        }
    }
}

#[async_trait]
impl ToolInvoker for McpClient {
    async fn call_tool(&self, name: &str, arguments: Value) -> ToolCallResult {
        McpClient::call_tool(self, name, arguments).await
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolError> {
        McpClient::list_tools(self).await
    }

    async fn ping(&self) -> bool {
        McpClient::ping(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalization() {
        let timeouts = TimeoutSettings::default();
        let a = McpClient::new("airline-agent", "Airline Agent", "http://host:8001/", &timeouts);
        assert_eq!(a.endpoint(), "http://host:8001/mcp");
        let b = McpClient::new("airline-agent", "Airline Agent", "http://host:8001/mcp", &timeouts);
        assert_eq!(b.endpoint(), "http://host:8001/mcp");
        assert_eq!(b.health_url, "http://host:8001/health");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error_and_stays_uninitialized() {
        let timeouts = TimeoutSettings {
            tool_call_secs: 1,
            ..TimeoutSettings::default()
        };
        let client = McpClient::new("hotel-agent", "Hotel Agent", "http://127.0.0.1:1", &timeouts);
        let err = client.call_tool("list_cities", json!({})).await.unwrap_err();
        assert_eq!(err.code(), "transport_error");
        assert!(client.session().await.is_none());
        assert!(!client.ping().await);
    }
}
