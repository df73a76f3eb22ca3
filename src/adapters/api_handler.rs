//! REST handlers for the router and the per-domain specialist surface
//!
//! `/agents/:domain/*` speaks the same contract that [`RemoteSpecialist`]
//! consumes, so any deployment can act as a remote specialist for another.
//!
//! [`RemoteSpecialist`]: crate::adapters::remote_specialist::RemoteSpecialist

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::agents::domain::{AgentInfo, Domain, Specialist, SpecialistRequest};
use crate::agents::router::{ChatRequest, Router};

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub router: Arc<Router>,
    /// Budget for each specialist probe in listings
    pub probe_timeout: Duration,
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Serialize)]
pub struct AgentListing {
    pub agents: Vec<AgentInfo>,
}

fn not_found(domain: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error(format!("Unknown agent domain: {}", domain))),
    )
        .into_response()
}

fn specialist_for(state: &ApiState, raw: &str) -> Result<Arc<dyn Specialist>, Response> {
    raw.parse::<Domain>()
        .ok()
        .and_then(|domain| state.router.registry().get(domain))
        .ok_or_else(|| not_found(raw))
}

/// POST /chat - Serve one user request
pub async fn chat(
    State(state): State<ApiState>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    let response = state.router.route(request).await;
    (StatusCode::OK, Json(response))
}

/// GET /agents - Registered specialists with discovered tools and health
pub async fn list_agents(State(state): State<ApiState>) -> impl IntoResponse {
    let agents = state.router.registry().list(state.probe_timeout).await;
    (StatusCode::OK, Json(AgentListing { agents }))
}

/// POST /agents/:domain/invoke - Delegate a task to one specialist
pub async fn invoke_agent(
    State(state): State<ApiState>,
    Path(domain): Path<String>,
    headers: HeaderMap,
    Json(request): Json<SpecialistRequest>,
) -> Response {
    let specialist = match specialist_for(&state, &domain) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let caller = headers
        .get("x-supervisor-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("direct");
    debug!(domain = %domain, caller = %caller, "Specialist invoked over HTTP");

    let response = specialist.handle(request).await;
    (StatusCode::OK, Json(response)).into_response()
}

/// GET /agents/:domain/tools - Catalog of one specialist
pub async fn agent_tools(
    State(state): State<ApiState>,
    Path(domain): Path<String>,
) -> Response {
    match specialist_for(&state, &domain) {
        Ok(specialist) => {
            let identity = specialist.identity();
            (
                StatusCode::OK,
                Json(json!({ "agent_id": identity.agent_id, "tools": identity.tools })),
            )
                .into_response()
        }
        Err(resp) => resp,
    }
}

/// GET /agents/:domain/identity - Who this specialist is
pub async fn agent_identity(
    State(state): State<ApiState>,
    Path(domain): Path<String>,
) -> Response {
    match specialist_for(&state, &domain) {
        Ok(specialist) => {
            let identity = specialist.identity();
            (
                StatusCode::OK,
                Json(json!({
                    "agent_id": identity.agent_id,
                    "agent_name": identity.agent_name,
                    "agent_type": "worker",
                    "domain": identity.domain,
                    "capabilities": identity.capabilities(),
                })),
            )
                .into_response()
        }
        Err(resp) => resp,
    }
}

/// GET /agents/:domain/health - Tool host reachability of one specialist
pub async fn agent_health(
    State(state): State<ApiState>,
    Path(domain): Path<String>,
) -> Response {
    let specialist = match specialist_for(&state, &domain) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let health = match tokio::time::timeout(state.probe_timeout, specialist.health()).await {
        Ok(health) => health,
        Err(_) => crate::agents::domain::AgentHealth {
            healthy: false,
            tools_count: 0,
        },
    };
    let status = if health.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if health.healthy { "healthy" } else { "unhealthy" },
            "agent_id": specialist.identity().agent_id,
            "tools_count": health.tools_count,
        })),
    )
        .into_response()
}
