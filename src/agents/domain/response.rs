//! Specialist request and response types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Task delegated to a specialist
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecialistRequest {
    /// Free-text task
    pub message: String,
    /// Structured hints (ids, dates, active trip)
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl SpecialistRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }
}

/// Result returned by a specialist.
///
/// `success == false` always carries a non-empty `error`; use the
/// [`SpecialistResponse::ok`] and [`SpecialistResponse::failed`] constructors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialistResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Tool names actually invoked, in order
    #[serde(rename = "toolsCalled", alias = "tools_called", default)]
    pub tools_called: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SpecialistResponse {
    /// Successful response
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            tools_called: Vec::new(),
            error: None,
        }
    }

    /// Failed response; an empty code is replaced so the error is never blank
    pub fn failed(message: impl Into<String>, code: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            success: false,
            message: message.into(),
            data: None,
            tools_called: Vec::new(),
            error: Some(if code.trim().is_empty() {
                "unknown_error".to_string()
            } else {
                code
            }),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools_called = tools;
        self
    }

    /// Re-establish the failure invariant on a response decoded from the wire
    pub fn normalized(mut self) -> Self {
        if !self.success && self.error.as_deref().map_or(true, |e| e.trim().is_empty()) {
            self.error = Some("unknown_error".to_string());
        }
        if self.success {
            self.error = None;
        }
        self
    }
}
