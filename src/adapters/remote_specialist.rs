//! Specialist served by another process
//!
//! Speaks the same `/invoke`, `/tools`, `/health` surface that
//! `api_handler` exposes per domain, so a router can delegate to a specialist
//! running elsewhere exactly as it would to an in-process one.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::adapters::http_client;
use crate::agents::catalog::ToolCatalog;
use crate::agents::config::AgentConfig;
use crate::agents::domain::{
    AgentHealth, AgentIdentity, Specialist, SpecialistRequest, SpecialistResponse,
};
use crate::config::TimeoutSettings;

/// Identity the router presents to remote specialists
pub const ROUTER_ID: &str = "waypoint-router";

pub struct RemoteSpecialist {
    identity: AgentIdentity,
    base_url: String,
    client: Client,
    call_timeout: Duration,
    health_timeout: Duration,
}

impl RemoteSpecialist {
    pub fn new(config: &AgentConfig, endpoint: &str, catalog: &ToolCatalog, timeouts: &TimeoutSettings) -> Self {
        let call_timeout = Duration::from_secs(timeouts.tool_call_secs);
        let client = http_client(call_timeout, &config.id);

        Self {
            identity: AgentIdentity {
                agent_id: config.id.clone(),
                agent_name: config.name.clone(),
                domain: config.domain,
                tools: catalog.tools_for(&config.id).to_vec(),
            },
            base_url: endpoint.trim_end_matches('/').to_string(),
            client,
            call_timeout,
            health_timeout: Duration::from_secs(timeouts.health_secs),
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}/{}", self.base_url, path))
            .header("x-supervisor-id", ROUTER_ID)
            .header("x-target-agent", &self.identity.agent_id)
            .timeout(self.health_timeout)
    }
}

#[async_trait]
impl Specialist for RemoteSpecialist {
    fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    async fn handle(&self, request: SpecialistRequest) -> SpecialistResponse {
        let result = self
            .client
            .post(format!("{}/invoke", self.base_url))
            .header("x-supervisor-id", ROUTER_ID)
            .header("x-target-agent", &self.identity.agent_id)
            .json(&request)
            .timeout(self.call_timeout)
            .send()
            .await;

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(agent_id = %self.identity.agent_id, error = %e, "Remote specialist unreachable");
                return SpecialistResponse::failed(
                    format!("The {} is not available", self.identity.agent_name),
                    "transport_error",
                );
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(agent_id = %self.identity.agent_id, status = status.as_u16(), "Remote specialist error");
            return SpecialistResponse::failed(format!("Agent returned {}", status.as_u16()), "transport_error");
        }

        match response.json::<SpecialistResponse>().await {
            Ok(body) => body.normalized(),
            Err(e) => {
                warn!(agent_id = %self.identity.agent_id, error = %e, "Remote specialist sent an unreadable response");
                SpecialistResponse::failed("Agent response could not be read", "malformed_response")
            }
        }
    }

    async fn health(&self) -> AgentHealth {
        let healthy = match self.get("health").send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(agent_id = %self.identity.agent_id, error = %e, "Remote health probe failed");
                false
            }
        };
        let tools_count = if healthy { self.discover().await.len() } else { 0 };
        AgentHealth { healthy, tools_count }
    }

    async fn discover(&self) -> Vec<String> {
        let body: Value = match self.get("tools").send().await {
            Ok(resp) if resp.status().is_success() => resp.json().await.unwrap_or(Value::Null),
            Ok(_) | Err(_) => return Vec::new(),
        };

        let allowed = self.identity.capabilities();
        body.get("tools")
            .and_then(Value::as_array)
            .map(|tools| {
                tools
                    .iter()
                    .filter_map(|t| t.get("name").and_then(Value::as_str).or_else(|| t.as_str()))
                    .filter(|name| allowed.iter().any(|a| a == name))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}
