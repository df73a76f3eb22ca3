use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::agents::domain::AgentHealth;
use crate::agents::router::Router;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub agents: BTreeMap<String, AgentHealth>,
    pub context_provider: ComponentHealth,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub healthy: bool,
}

pub struct HealthHandler {
    router: Arc<Router>,
    probe_timeout: Duration,
    start_time: std::time::Instant,
}

impl HealthHandler {
    pub fn new(router: Arc<Router>, probe_timeout: Duration) -> Self {
        Self {
            router,
            probe_timeout,
            start_time: std::time::Instant::now(),
        }
    }

    /// Probe every specialist and the context provider.
    ///
    /// Always 200; `status` is `degraded` when any dependency is down.
    pub async fn health(&self) -> impl IntoResponse {
        let timeout = self.probe_timeout;
        let probes = self.router.registry().iter().map(|(domain, agent)| {
            let agent = agent.clone();
            let domain = *domain;
            async move {
                let health = tokio::time::timeout(timeout, agent.health())
                    .await
                    .unwrap_or(AgentHealth {
                        healthy: false,
                        tools_count: 0,
                    });
                (domain.as_str().to_string(), health)
            }
        });
        let agents: BTreeMap<String, AgentHealth> = join_all(probes).await.into_iter().collect();

        let context_healthy = tokio::time::timeout(timeout, self.router.context_provider().health())
            .await
            .unwrap_or(false);

        let all_up = context_healthy && agents.values().all(|a| a.healthy);
        let status = HealthStatus {
            status: if all_up { "healthy" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            agents,
            context_provider: ComponentHealth {
                healthy: context_healthy,
            },
            timestamp: Utc::now().to_rfc3339(),
        };

        (StatusCode::OK, Json(status))
    }

    /// Liveness check - returns 200 if server is alive
    pub async fn live(&self) -> impl IntoResponse {
        (StatusCode::OK, Json(serde_json::json!({
            "status": "alive",
            "message": "Server is alive"
        })))
    }
}
