//! Mock tool host for integration tests
//!
//! Speaks enough of the session JSON-RPC protocol for the client: issues a
//! fresh session token on every `initialize`, records every served
//! `tools/call`, and can be scripted to answer the next calls with a status,
//! a raw event-stream body, or a tool error.

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Scripted answer for one `tools/call`
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    /// Raw `text/event-stream` body
    EventStream(String),
    /// Tool result flagged `isError` with this text
    ToolError(String),
    /// Sleep this many seconds before answering normally
    Stall(u64),
}

#[derive(Default)]
pub struct HostState {
    pub initializes: AtomicUsize,
    /// Tool name and arguments of every served call
    pub calls: Mutex<Vec<(String, Value)>>,
    /// Session tokens seen on served calls
    pub tokens_seen: Mutex<Vec<String>>,
    pub script: Mutex<VecDeque<Reply>>,
    /// Payload per tool name; `{"ok": true}` otherwise
    pub results: Mutex<HashMap<String, Value>>,
    pub tools: Vec<&'static str>,
}

impl HostState {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn called_tools(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn push_reply(&self, reply: Reply) {
        self.script.lock().unwrap().push_back(reply);
    }

    pub fn set_result(&self, tool: &str, payload: Value) {
        self.results.lock().unwrap().insert(tool.to_string(), payload);
    }
}

pub struct MockHost {
    pub base_url: String,
    pub state: Arc<HostState>,
}

impl MockHost {
    pub async fn start(tools: Vec<&'static str>) -> Self {
        let state = Arc::new(HostState {
            tools,
            ..HostState::default()
        });

        let app = Router::new()
            .route("/mcp", post(handle_rpc))
            .route("/health", get(|| async { "ok" }))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockHost {
            base_url: format!("http://{}", addr),
            state,
        }
    }
}

fn rpc_result(id: &Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn tool_text(text: String, is_error: bool) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    })
}

async fn handle_rpc(
    State(state): State<Arc<HostState>>,
    headers: HeaderMap,
    Json(frame): Json<Value>,
) -> Response {
    let id = frame.get("id").cloned().unwrap_or(Value::Null);
    let method = frame["method"].as_str().unwrap_or_default();

    match method {
        "initialize" => {
            let n = state.initializes.fetch_add(1, Ordering::SeqCst) + 1;
            let token = format!("session-{}", n);
            let body = rpc_result(
                &id,
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {"tools": {}},
                    "serverInfo": {"name": "mock-host", "version": "0.0.0"}
                }),
            );
            let mut response = Json(body).into_response();
            if let Ok(value) = HeaderValue::from_str(&token) {
                response.headers_mut().insert("mcp-session-id", value);
            }
            response
        }
        "notifications/initialized" => StatusCode::ACCEPTED.into_response(),
        "tools/list" => {
            let tools: Vec<Value> = state
                .tools
                .iter()
                .map(|name| {
                    json!({
                        "name": name,
                        "description": format!("{} tool", name),
                        "inputSchema": {"type": "object", "properties": {}}
                    })
                })
                .collect();
            Json(rpc_result(&id, json!({ "tools": tools }))).into_response()
        }
        "tools/call" => {
            let scripted = state.script.lock().unwrap().pop_front();
            if let Some(reply) = scripted {
                match reply {
                    Reply::Status(code) => {
                        return StatusCode::from_u16(code)
                            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
                            .into_response()
                    }
                    Reply::EventStream(body) => {
                        return ([("content-type", "text/event-stream")], body).into_response()
                    }
                    Reply::ToolError(text) => {
                        return Json(rpc_result(&id, tool_text(text, true))).into_response()
                    }
                    Reply::Stall(secs) => {
                        tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
                    }
                }
            }

            let name = frame["params"]["name"].as_str().unwrap_or_default().to_string();
            let arguments = frame["params"]["arguments"].clone();
            let token = headers
                .get("mcp-session-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            state.tokens_seen.lock().unwrap().push(token);
            state.calls.lock().unwrap().push((name.clone(), arguments));

            let payload = state
                .results
                .lock()
                .unwrap()
                .get(&name)
                .cloned()
                .unwrap_or_else(|| json!({"ok": true}));
            Json(rpc_result(&id, tool_text(payload.to_string(), false))).into_response()
        }
        _ => (
            StatusCode::OK,
            Json(json!({"jsonrpc": "2.0", "id": id, "error": {"code": -32601, "message": "Method not found"}})),
        )
            .into_response(),
    }
}
