use std::collections::HashMap;
use thiserror::Error;

use crate::agents::catalog::{builtin_owner, CatalogError, ToolCatalog};
use crate::agents::config::{AgentConfig, ClassifierKind, ContinuationKind, DispatchStrategy, SynthesisKind};
use crate::config::{ServerSettings, Settings, TimeoutSettings};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Cross-reference error: {0}")]
    CrossReference(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        Self::validate_server(&settings.server, &mut errors);
        Self::validate_timeouts(&settings.timeouts, &mut errors);

        if settings.router.max_iterations == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "router.max_iterations".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if let Some(url) = &settings.context.url {
            if !is_http_url(url) {
                errors.push(ValidationError::InvalidValue {
                    field: "context.url".to_string(),
                    reason: format!("'{}' is not an http(s) URL", url),
                });
            }
        }

        Self::validate_agents(&settings.agents, &mut errors);
        Self::validate_cross_references(settings, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(server: &ServerSettings, errors: &mut Vec<ValidationError>) {
        if server.host.is_empty() {
            errors.push(ValidationError::MissingField("server.host".to_string()));
        }

        if server.port == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }
    }

    fn validate_timeouts(timeouts: &TimeoutSettings, errors: &mut Vec<ValidationError>) {
        let fields = [
            ("timeouts.tool_call_secs", timeouts.tool_call_secs),
            ("timeouts.llm_secs", timeouts.llm_secs),
            ("timeouts.context_secs", timeouts.context_secs),
            ("timeouts.health_secs", timeouts.health_secs),
        ];
        for (field, value) in fields {
            if value == 0 {
                errors.push(ValidationError::InvalidValue {
                    field: field.to_string(),
                    reason: "Timeout must be greater than 0".to_string(),
                });
            }
        }
    }

    fn validate_agents(agents: &[AgentConfig], errors: &mut Vec<ValidationError>) {
        let mut seen_ids = HashMap::new();
        let mut seen_domains = HashMap::new();

        for (idx, agent) in agents.iter().enumerate() {
            if let Some(prev_idx) = seen_ids.insert(&agent.id, idx) {
                errors.push(ValidationError::Duplicate(format!(
                    "Agent id '{}' appears at indices {} and {}",
                    agent.id, prev_idx, idx
                )));
            }
            if let Some(prev_idx) = seen_domains.insert(agent.domain, idx) {
                errors.push(ValidationError::Duplicate(format!(
                    "Domain '{}' is served by agents at indices {} and {}",
                    agent.domain, prev_idx, idx
                )));
            }

            if agent.id.is_empty() {
                errors.push(ValidationError::MissingField(format!("agents[{}].id", idx)));
            }
            if agent.name.is_empty() {
                errors.push(ValidationError::MissingField(format!("agents[{}].name", idx)));
            }

            match (&agent.tool_host, &agent.endpoint) {
                (None, None) => errors.push(ValidationError::MissingField(format!(
                    "agents[{}].tool_host or agents[{}].endpoint",
                    idx, idx
                ))),
                (host, endpoint) => {
                    for (field, url) in [("tool_host", host), ("endpoint", endpoint)] {
                        if let Some(url) = url {
                            if !is_http_url(url) {
                                errors.push(ValidationError::InvalidValue {
                                    field: format!("agents[{}].{}", idx, field),
                                    reason: format!("'{}' is not an http(s) URL", url),
                                });
                            }
                        }
                    }
                }
            }

            if agent.max_tool_rounds == 0 {
                errors.push(ValidationError::InvalidValue {
                    field: format!("agents[{}].max_tool_rounds", idx),
                    reason: "Must be at least 1".to_string(),
                });
            }
        }
    }

    /// Rule and fallback tools must be in the agent's own catalog, no tool
    /// may be listed for two domains, and built-in tools stay with their domain
    fn validate_cross_references(settings: &Settings, errors: &mut Vec<ValidationError>) {
        if let Err(e) = ToolCatalog::build(&settings.agents) {
            match e {
                // Reported by validate_agents and the per-agent loop below
                CatalogError::DuplicateAgent(_) | CatalogError::ForeignTool { .. } => {}
                other => errors.push(ValidationError::CrossReference(other.to_string())),
            }
        }

        for agent in &settings.agents {
            let tools: Vec<String> = agent.resolved_tools().into_iter().map(|t| t.name).collect();

            for tool in &tools {
                if let Some(owner) = builtin_owner(tool).filter(|d| *d != agent.domain) {
                    let foreign = CatalogError::ForeignTool {
                        agent: agent.id.clone(),
                        tool: tool.clone(),
                        owner,
                    };
                    errors.push(ValidationError::CrossReference(foreign.to_string()));
                }
            }

            for rule in agent.resolved_rules() {
                if !tools.contains(&rule.tool) {
                    errors.push(ValidationError::CrossReference(format!(
                        "Agent '{}' has a rule for tool '{}' which is not in its catalog",
                        agent.id, rule.tool
                    )));
                }
            }

            if let Some(fallback) = agent.resolved_fallback() {
                if !tools.contains(&fallback) {
                    errors.push(ValidationError::CrossReference(format!(
                        "Agent '{}' falls back to tool '{}' which is not in its catalog",
                        agent.id, fallback
                    )));
                }
            }

            if agent.dispatch != DispatchStrategy::Deterministic
                && agent.endpoint.is_none()
                && settings.llm.is_none()
            {
                errors.push(ValidationError::CrossReference(format!(
                    "Agent '{}' uses {:?} dispatch but no [llm] section is configured",
                    agent.id, agent.dispatch
                )));
            }
        }

        let router = &settings.router;
        let wants_model = router.classifier == ClassifierKind::Model
            || router.continuation == ContinuationKind::Model
            || router.synthesis == SynthesisKind::Model;
        if wants_model && settings.llm.is_none() {
            errors.push(ValidationError::CrossReference(
                "Router uses a model-backed stage but no [llm] section is configured".to_string(),
            ));
        }
    }
}

fn is_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.starts_with('/'))
}
