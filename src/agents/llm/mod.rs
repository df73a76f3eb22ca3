//! Reasoning model providers
//!
//! A single non-streaming interface over chat-completion style APIs:
//! - OpenAI (and OpenAI-compatible endpoints via `base_url`)
//! - Anthropic messages API

mod anthropic;
mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::agents::config::{LlmProviderConfig, LlmProviderType};
use crate::agents::domain::{Message, ToolDefinition};
use crate::agents::error::{LlmError, LlmResult};

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;

    /// Complete a request
    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse>;
}

/// Request for LLM completion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Messages in the conversation
    pub messages: Vec<Message>,
    /// Model to use (overrides provider default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Temperature for sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Tools available for calling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    /// Tool choice mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        if !tools.is_empty() {
            self.tools = Some(tools);
            self.tool_choice = Some(ToolChoice::Auto);
        }
        self
    }
}

/// Tool choice mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Let the model decide
    Auto,
    /// Don't use tools
    None,
    /// Must use a tool
    Required,
    /// Use a specific tool
    Tool { name: String },
}

/// Response from LLM completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated message
    pub message: Message,
    /// Reason the completion stopped
    pub finish_reason: FinishReason,
    /// Token usage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// Reason completion stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop
    Stop,
    /// Hit max tokens
    Length,
    /// Tool call requested
    ToolCalls,
    /// Content filtered
    ContentFilter,
}

/// Token usage information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Create an LLM provider from configuration
pub fn create_provider(
    config: &LlmProviderConfig,
    timeout: Duration,
) -> LlmResult<Arc<dyn LlmProvider>> {
    match config.provider {
        LlmProviderType::OpenAI => Ok(Arc::new(OpenAiProvider::new(config, timeout)?)),
        LlmProviderType::Anthropic => Ok(Arc::new(AnthropicProvider::new(config, timeout)?)),
    }
}

pub(crate) fn read_api_key(config: &LlmProviderConfig, default_env: &str) -> LlmResult<String> {
    let env_var = config.api_key_env.as_deref().unwrap_or(default_env);
    std::env::var(env_var)
        .map_err(|_| LlmError::Authentication(format!("Environment variable {} not set", env_var)))
}

pub(crate) fn http_client(timeout: Duration) -> LlmResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::InvalidRequest(e.to_string()))
}

/// Parse a JSON object out of free model text.
///
/// Models often wrap JSON in prose or code fences; the outermost `{...}` span
/// is taken.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> LlmResult<T> {
    let start = text
        .find('{')
        .ok_or_else(|| LlmError::Parse("no JSON object in model reply".to_string()))?;
    let end = text
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| LlmError::Parse("unterminated JSON object in model reply".to_string()))?;
    serde_json::from_str(&text[start..=end]).map_err(|e| LlmError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_parse_json_reply_strips_fences() {
        let reply = "Sure:\n```json\n{\"domain\": \"hotel\", \"intent\": \"search\"}\n```";
        let value: Value = parse_json_reply(reply).unwrap();
        assert_eq!(value["domain"], "hotel");
    }

    #[test]
    fn test_parse_json_reply_rejects_prose() {
        assert!(parse_json_reply::<Value>("I think hotel").is_err());
    }

    #[test]
    fn test_with_tools_sets_auto_choice() {
        let request = CompletionRequest::new(vec![Message::user("hi")])
            .with_tools(vec![ToolDefinition::new("list_airports", "List airports")]);
        assert!(matches!(request.tool_choice, Some(ToolChoice::Auto)));

        let bare = CompletionRequest::new(vec![]).with_tools(vec![]);
        assert!(bare.tools.is_none());
    }

    #[test]
    fn test_missing_api_key_is_authentication_error() {
        let config = LlmProviderConfig {
            provider: LlmProviderType::OpenAI,
            model: "gpt-4o-mini".into(),
            api_key_env: Some("WAYPOINT_TEST_KEY_THAT_IS_NOT_SET".into()),
            base_url: None,
            temperature: None,
            max_tokens: None,
        };
        let err = create_provider(&config, Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, LlmError::Authentication(_)));
    }
}
