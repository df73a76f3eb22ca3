//! Error types for the agent system

use thiserror::Error;

/// Errors raised while invoking a tool on a tool host.
///
/// Every variant maps to a stable code string (see [`ToolError::code`]) which
/// is what specialists report back to the router.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ToolError {
    /// Tool is not in the calling agent's catalog. Never retried.
    #[error("Tool '{tool}' is not permitted for agent '{agent}'")]
    PolicyDenied { agent: String, tool: String },

    /// Host rejected the session token
    #[error("Session expired or invalid (HTTP {status})")]
    SessionExpired { status: u16 },

    /// Connection refused, timeout, unexpected status
    #[error("Transport error: {0}")]
    Transport(String),

    /// Host executed the call and reported a domain error
    #[error("{message}")]
    Application { code: String, message: String },

    /// Event stream without any `data:` line
    #[error("No data in SSE response")]
    EmptyStream,

    /// Body could not be parsed as JSON
    #[error("Invalid JSON response: {0}")]
    Malformed(String),
}

impl ToolError {
    /// Stable machine-readable code
    pub fn code(&self) -> &str {
        match self {
            ToolError::PolicyDenied { .. } => "policy_denied",
            ToolError::SessionExpired { .. } => "session_expired",
            ToolError::Transport(_) => "transport_error",
            ToolError::Application { code, .. } => code.as_str(),
            ToolError::EmptyStream => "no_data_in_response",
            ToolError::Malformed(_) => "malformed_response",
        }
    }

    /// Build an application error with the generic code
    pub fn application(message: impl Into<String>) -> Self {
        ToolError::Application {
            code: "application_error".to_string(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ToolError::Transport(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            ToolError::Transport(format!("Connection error: {}", err))
        } else {
            ToolError::Transport(err.to_string())
        }
    }
}

/// Errors that can occur during agent operations
#[derive(Debug, Error)]
pub enum AgentError {
    /// Agent not found
    #[error("Agent not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Tool invocation error
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors specific to LLM provider operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// Provider not found
    #[error("LLM provider not found: {0}")]
    ProviderNotFound(String),

    /// API error
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited
    #[error("Rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication error
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Timeout
    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else if err.is_connect() {
            LlmError::Network(format!("Connection error: {}", err))
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::Serialization(err.to_string())
    }
}

/// Errors talking to the context provider
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Context provider unreachable: {0}")]
    Transport(String),

    #[error("Context provider returned HTTP {status}")]
    Status { status: u16 },

    #[error("Could not decode context provider response: {0}")]
    Decode(String),

    #[error("Unknown trip: {0}")]
    UnknownTrip(String),
}

impl From<reqwest::Error> for ContextError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ContextError::Decode(err.to_string())
        } else {
            ContextError::Transport(err.to_string())
        }
    }
}

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Result type alias for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// Outcome of a single tool invocation: a success payload or an error, never both
pub type ToolCallResult = Result<serde_json::Value, ToolError>;
