//! Configuration types for specialists, the router and the reasoning model

use serde::{Deserialize, Serialize};

use super::catalog::builtin_tools;
use super::dispatch::{builtin_fallback, builtin_rules, DispatchRule};
use super::domain::{Domain, ToolDefinition};

/// Configuration for one specialist agent
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    /// Unique agent id, sent to tool hosts as `x-agent-id`
    pub id: String,
    /// Human-readable name
    pub name: String,
    pub domain: Domain,
    /// Tool host URL for an in-process specialist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_host: Option<String>,
    /// Base URL of a specialist served by another process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub dispatch: DispatchStrategy,
    /// Permitted tools; empty means the built-in list for the domain
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    /// Deterministic rules; empty means the built-in table for the domain
    #[serde(default)]
    pub rules: Vec<DispatchRule>,
    /// Tool called when no rule matches. Only read when `rules` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_tool: Option<String>,
    /// System prompt for model-assisted dispatch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Upper bound on model tool-call rounds per task
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
}

fn default_max_tool_rounds() -> u32 {
    3
}

impl AgentConfig {
    /// Built-in specialist for a domain talking to `tool_host`
    pub fn builtin(domain: Domain, tool_host: &str) -> Self {
        Self {
            id: domain.default_agent_id().to_string(),
            name: domain.default_agent_name().to_string(),
            domain,
            tool_host: Some(tool_host.to_string()),
            endpoint: None,
            dispatch: DispatchStrategy::default(),
            tools: Vec::new(),
            rules: Vec::new(),
            fallback_tool: None,
            system_prompt: None,
            max_tool_rounds: default_max_tool_rounds(),
        }
    }

    pub fn resolved_tools(&self) -> Vec<ToolDefinition> {
        if self.tools.is_empty() {
            builtin_tools(self.domain)
        } else {
            self.tools.clone()
        }
    }

    pub fn resolved_rules(&self) -> Vec<DispatchRule> {
        if self.rules.is_empty() {
            builtin_rules(self.domain)
        } else {
            self.rules.clone()
        }
    }

    pub fn resolved_fallback(&self) -> Option<String> {
        if self.rules.is_empty() {
            Some(builtin_fallback(self.domain).to_string())
        } else {
            self.fallback_tool.clone()
        }
    }

    pub fn system_prompt(&self) -> String {
        self.system_prompt.clone().unwrap_or_else(|| {
            format!(
                "You are the {} in a travel booking system. You may only act through the \
                 tools you are given. Call a tool when the task needs live data or a booking \
                 action; otherwise answer briefly.",
                self.name
            )
        })
    }
}

/// How a specialist turns a task into tool calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStrategy {
    /// Ordered keyword rules only
    #[default]
    Deterministic,
    /// The reasoning model picks tools
    Model,
    /// Rules first, the model when no rule matches
    Hybrid,
}

/// Router behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouterConfig {
    /// Ceiling on specialist calls per request
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default)]
    pub classifier: ClassifierKind,
    #[serde(default)]
    pub continuation: ContinuationKind,
    #[serde(default)]
    pub synthesis: SynthesisKind,
}

fn default_max_iterations() -> u32 {
    5
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            classifier: ClassifierKind::default(),
            continuation: ContinuationKind::default(),
            synthesis: SynthesisKind::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    #[default]
    Keyword,
    Model,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContinuationKind {
    #[default]
    Heuristic,
    Model,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisKind {
    #[default]
    Template,
    Model,
}

/// LLM provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmProviderConfig {
    /// Provider type
    pub provider: LlmProviderType,
    /// Model name/identifier
    pub model: String,
    /// Environment variable containing the API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Custom base URL (for self-hosted or proxied endpoints)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Default temperature for completions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Default max tokens for completions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderType {
    /// OpenAI-compatible chat completions
    #[default]
    OpenAI,
    /// Anthropic messages API
    Anthropic,
}

impl std::fmt::Display for LlmProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProviderType::OpenAI => write!(f, "openai"),
            LlmProviderType::Anthropic => write!(f, "anthropic"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_agent_uses_domain_defaults() {
        let agent = AgentConfig::builtin(Domain::CarRental, "http://localhost:8003");
        assert_eq!(agent.id, "car-rental-agent");
        assert_eq!(agent.resolved_fallback().as_deref(), Some("list_locations"));
        assert!(agent.resolved_tools().iter().any(|t| t.name == "cancel_rental"));
        assert_eq!(agent.dispatch, DispatchStrategy::Deterministic);
    }

    #[test]
    fn test_agent_config_from_yaml() {
        let yaml = r#"
id: hotel-agent
name: Hotel Agent
domain: hotel
tool_host: http://hotel-mcp:8000
dispatch: hybrid
"#;
        let agent: AgentConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(agent.domain, Domain::Hotel);
        assert_eq!(agent.dispatch, DispatchStrategy::Hybrid);
        assert_eq!(agent.max_tool_rounds, 3);
        assert!(agent.system_prompt().contains("Hotel Agent"));
    }

    #[test]
    fn test_router_defaults() {
        let router = RouterConfig::default();
        assert_eq!(router.max_iterations, 5);
        assert_eq!(router.classifier, ClassifierKind::Keyword);
        assert_eq!(router.continuation, ContinuationKind::Heuristic);
    }

    #[test]
    fn test_llm_provider_config_deserialize() {
        let json = r#"{"provider": "anthropic", "model": "claude-3-5-sonnet-20241022"}"#;
        let config: LlmProviderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.provider, LlmProviderType::Anthropic);
        assert_eq!(config.provider.to_string(), "anthropic");
    }
}
