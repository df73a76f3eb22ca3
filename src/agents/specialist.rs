//! Generic specialist agent
//!
//! One type serves every domain. What differs per domain is data: the
//! identity, the catalog entry, the rule table and the fallback tool. Every
//! tool call goes through [`SpecialistAgent::call_tool`], which consults the
//! catalog before anything reaches the network.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::catalog::ToolCatalog;
use super::config::{AgentConfig, DispatchStrategy};
use super::dispatch::{fallback_data_key, resolve, DispatchRule, Resolution};
use super::domain::{
    AgentHealth, AgentIdentity, Message, Specialist, SpecialistRequest, SpecialistResponse,
};
use super::error::{ToolCallResult, ToolError};
use super::llm::{CompletionRequest, LlmProvider};
use crate::adapters::metrics_handler::MetricsCollector;
use crate::domain::ToolInvoker;

pub struct SpecialistAgent {
    identity: AgentIdentity,
    catalog: Arc<ToolCatalog>,
    invoker: Arc<dyn ToolInvoker>,
    rules: Vec<DispatchRule>,
    fallback_tool: Option<String>,
    strategy: DispatchStrategy,
    llm: Option<Arc<dyn LlmProvider>>,
    system_prompt: String,
    max_tool_rounds: u32,
    metrics: Option<Arc<MetricsCollector>>,
}

impl SpecialistAgent {
    /// Build from configuration. The identity's tools come from the catalog,
    /// so an agent can never advertise more than it may call.
    pub fn new(config: &AgentConfig, catalog: Arc<ToolCatalog>, invoker: Arc<dyn ToolInvoker>) -> Self {
        let identity = AgentIdentity {
            agent_id: config.id.clone(),
            agent_name: config.name.clone(),
            domain: config.domain,
            tools: catalog.tools_for(&config.id).to_vec(),
        };

        Self {
            identity,
            catalog,
            invoker,
            rules: config.resolved_rules(),
            fallback_tool: config.resolved_fallback(),
            strategy: config.dispatch,
            llm: None,
            system_prompt: config.system_prompt(),
            max_tool_rounds: config.max_tool_rounds.max(1),
            metrics: None,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Invoke a tool on behalf of this agent.
    ///
    /// Tools outside the agent's catalog are refused with
    /// [`ToolError::PolicyDenied`] and never reach the invoker.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> ToolCallResult {
        let agent_id = self.identity.agent_id.as_str();

        if !self.catalog.permits(agent_id, name) {
            warn!(
                audit = true,
                agent_id = %agent_id,
                domain = %self.identity.domain,
                tool = %name,
                "Tool call denied: not in agent catalog"
            );
            if let Some(metrics) = &self.metrics {
                // Names from the model are unbounded; only catalog tools become labels
                let tool_label = if self.catalog.knows(name) { name } else { "unknown" };
                metrics
                    .policy_denials_total
                    .with_label_values(&[agent_id, tool_label])
                    .inc();
            }
            return Err(ToolError::PolicyDenied {
                agent: agent_id.to_string(),
                tool: name.to_string(),
            });
        }

        let outcome = self.invoker.call_tool(name, arguments).await;

        if let Some(metrics) = &self.metrics {
            let label = match &outcome {
                Ok(_) => "ok",
                Err(e) => e.code(),
            };
            metrics
                .tool_calls_total
                .with_label_values(&[agent_id, name, label])
                .inc();
        }
        outcome
    }

    /// Run the rule table. `None` when no rule matches the task.
    async fn run_rules(&self, request: &SpecialistRequest) -> Option<SpecialistResponse> {
        match resolve(&self.rules, &request.message, &request.context)? {
            Resolution::Missing { rule, code, missing } => {
                info!(
                    agent_id = %self.identity.agent_id,
                    tool = %rule.tool,
                    missing = ?missing,
                    "Required arguments missing, no tool called"
                );
                Some(SpecialistResponse::failed(
                    format!(
                        "Please provide {} to {}",
                        missing.join(" and "),
                        rule.tool.replace('_', " ")
                    ),
                    code,
                ))
            }
            Resolution::Call { rule, arguments } => {
                debug!(agent_id = %self.identity.agent_id, tool = %rule.tool, "Rule matched");
                let message = rule.render_message(&arguments);
                let outcome = self.call_tool(&rule.tool, Value::Object(arguments)).await;
                Some(self.respond(&rule.tool, &rule.data_key, message, outcome))
            }
        }
    }

    /// Reference-data fallback, then the capability summary
    async fn run_fallback(&self) -> SpecialistResponse {
        let Some(tool) = &self.fallback_tool else {
            return self.capability_summary();
        };

        match self.call_tool(tool, json!({})).await {
            Ok(payload) => {
                let mut data = Map::new();
                data.insert(fallback_data_key(tool).to_string(), payload);
                SpecialistResponse::ok(format!(
                    "I'm the {}. Here is what I can offer; tell me more about what you need.",
                    self.identity.agent_name
                ))
                .with_data(Value::Object(data))
                .with_tools(vec![tool.clone()])
            }
            Err(e) => {
                warn!(
                    agent_id = %self.identity.agent_id,
                    tool = %tool,
                    code = e.code(),
                    error = %e,
                    "Fallback tool failed, answering with capability summary"
                );
                self.capability_summary()
            }
        }
    }

    fn capability_summary(&self) -> SpecialistResponse {
        let tools = self.identity.capabilities();
        SpecialistResponse::ok(format!(
            "I'm the {}. I can help with: {}. Please be more specific about what you need.",
            self.identity.agent_name,
            tools.join(", ")
        ))
        .with_data(json!({ "available_tools": tools }))
    }

    fn respond(
        &self,
        tool: &str,
        data_key: &str,
        message: String,
        outcome: ToolCallResult,
    ) -> SpecialistResponse {
        match outcome {
            Ok(payload) => {
                let mut data = Map::new();
                data.insert(data_key.to_string(), payload);
                SpecialistResponse::ok(message)
                    .with_data(Value::Object(data))
                    .with_tools(vec![tool.to_string()])
            }
            Err(e @ ToolError::PolicyDenied { .. }) => {
                SpecialistResponse::failed(e.to_string(), e.code())
            }
            Err(e) => SpecialistResponse::failed(e.to_string(), e.code())
                .with_tools(vec![tool.to_string()]),
        }
    }

    /// Data key for a tool payload: the rule's key when a rule uses the tool
    fn data_key_for<'a>(&'a self, tool: &'a str) -> &'a str {
        self.rules
            .iter()
            .find(|r| r.tool == tool)
            .map(|r| r.data_key.as_str())
            .unwrap_or_else(|| fallback_data_key(tool))
    }

    /// Let the reasoning model pick tools, bounded by `max_tool_rounds`
    async fn run_model(&self, llm: &dyn LlmProvider, request: &SpecialistRequest) -> SpecialistResponse {
        let mut system = self.system_prompt.clone();
        if !request.context.is_empty() {
            system.push_str("\n\nContext:\n");
            system.push_str(&Value::Object(request.context.clone()).to_string());
        }
        let mut messages = vec![Message::system(system), Message::user(&request.message)];

        let mut tools_called: Vec<String> = Vec::new();
        let mut denied: Vec<String> = Vec::new();
        let mut data = Map::new();
        let mut last_error: Option<ToolError> = None;
        let mut any_success = false;
        let mut final_text = String::new();

        for round in 0..self.max_tool_rounds {
            let completion = CompletionRequest::new(messages.clone()).with_tools(self.identity.tools.clone());
            let response = match llm.complete(completion).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(agent_id = %self.identity.agent_id, error = %e, "Reasoning model call failed");
                    return SpecialistResponse::failed(
                        "I couldn't reach the reasoning model to handle this request",
                        "llm_error",
                    )
                    .with_tools(tools_called);
                }
            };

            let calls = response.message.tool_calls.clone().unwrap_or_default();
            final_text = response.message.content.clone();
            if calls.is_empty() {
                break;
            }

            debug!(agent_id = %self.identity.agent_id, round, calls = calls.len(), "Model requested tools");
            messages.push(response.message);

            for call in calls {
                let outcome = self.call_tool(&call.name, call.arguments.clone()).await;
                let fed_back = match outcome {
                    Ok(payload) => {
                        any_success = true;
                        tools_called.push(call.name.clone());
                        let fed = payload.clone();
                        data.insert(self.data_key_for(&call.name).to_string(), payload);
                        fed
                    }
                    Err(e @ ToolError::PolicyDenied { .. }) => {
                        denied.push(call.name.clone());
                        json!({ "error": e.code(), "message": e.to_string() })
                    }
                    Err(e) => {
                        tools_called.push(call.name.clone());
                        let fed = json!({ "error": e.code(), "message": e.to_string() });
                        last_error = Some(e);
                        fed
                    }
                };
                messages.push(Message::tool_result(&call.id, &fed_back));
            }

            if !denied.is_empty() {
                break;
            }
        }

        if final_text.trim().is_empty() {
            final_text = if tools_called.is_empty() {
                format!("The {} could not complete this request.", self.identity.agent_name)
            } else {
                format!("Completed: {}", tools_called.join(", "))
            };
        }

        let response = if !denied.is_empty() {
            SpecialistResponse::failed(
                format!(
                    "The {} is not permitted to use: {}",
                    self.identity.agent_name,
                    denied.join(", ")
                ),
                "policy_denied",
            )
        } else if let (false, Some(e)) = (any_success, &last_error) {
            SpecialistResponse::failed(final_text, e.code())
        } else {
            SpecialistResponse::ok(final_text)
        };

        let response = response.with_tools(tools_called);
        if data.is_empty() {
            response
        } else {
            response.with_data(Value::Object(data))
        }
    }

    async fn dispatch(&self, request: &SpecialistRequest) -> SpecialistResponse {
        match (self.strategy, self.llm.as_deref()) {
            (DispatchStrategy::Model, Some(llm)) => self.run_model(llm, request).await,
            (DispatchStrategy::Hybrid, Some(llm)) => match self.run_rules(request).await {
                Some(response) => response,
                None => self.run_model(llm, request).await,
            },
            _ => match self.run_rules(request).await {
                Some(response) => response,
                None => self.run_fallback().await,
            },
        }
    }
}

#[async_trait]
impl Specialist for SpecialistAgent {
    fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    async fn handle(&self, request: SpecialistRequest) -> SpecialistResponse {
        if request.message.trim().is_empty() {
            return SpecialistResponse::failed("Please describe what you need", "empty_request");
        }

        info!(
            agent_id = %self.identity.agent_id,
            domain = %self.identity.domain,
            task = %request.message.chars().take(100).collect::<String>(),
            "Processing request"
        );

        self.dispatch(&request).await.normalized()
    }

    async fn health(&self) -> AgentHealth {
        if !self.invoker.ping().await {
            return AgentHealth {
                healthy: false,
                tools_count: 0,
            };
        }
        AgentHealth {
            healthy: true,
            tools_count: self.discover().await.len(),
        }
    }

    /// Tools the host exposes, filtered through the catalog
    async fn discover(&self) -> Vec<String> {
        match self.invoker.list_tools().await {
            Ok(tools) => tools
                .into_iter()
                .map(|t| t.name)
                .filter(|name| self.catalog.permits(&self.identity.agent_id, name))
                .collect(),
            Err(e) => {
                debug!(agent_id = %self.identity.agent_id, error = %e, "Tool discovery failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::domain::{Domain, ToolCall, ToolDefinition};
    use crate::agents::error::LlmResult;
    use crate::agents::llm::{CompletionResponse, FinishReason};
    use std::sync::Mutex;

    /// Records every call and answers from a fixed script
    #[derive(Default)]
    struct RecordingInvoker {
        calls: Mutex<Vec<(String, Value)>>,
        fail_with: Option<ToolError>,
    }

    impl RecordingInvoker {
        fn failing(error: ToolError) -> Self {
            Self {
                fail_with: Some(error),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<(String, Value)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolInvoker for RecordingInvoker {
        async fn call_tool(&self, name: &str, arguments: Value) -> ToolCallResult {
            self.calls.lock().unwrap().push((name.to_string(), arguments.clone()));
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok(json!({ "tool": name, "echo": arguments })),
            }
        }

        async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolError> {
            Ok(vec![
                ToolDefinition::new("list_airports", ""),
                ToolDefinition::new("admin_reset", ""),
            ])
        }

        async fn ping(&self) -> bool {
            true
        }
    }

    /// Replays canned completions
    struct ScriptedModel {
        replies: Mutex<Vec<Message>>,
    }

    impl ScriptedModel {
        fn new(mut replies: Vec<Message>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _request: CompletionRequest) -> LlmResult<CompletionResponse> {
            let message = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Message::assistant("done"));
            Ok(CompletionResponse {
                message,
                finish_reason: FinishReason::Stop,
                usage: None,
            })
        }
    }

    fn agent(domain: Domain, invoker: Arc<RecordingInvoker>) -> SpecialistAgent {
        let configs: Vec<AgentConfig> = Domain::ALL
            .iter()
            .map(|d| AgentConfig::builtin(*d, "http://localhost:9"))
            .collect();
        let catalog = Arc::new(ToolCatalog::build(&configs).unwrap());
        let config = configs.into_iter().find(|c| c.domain == domain).unwrap();
        SpecialistAgent::new(&config, catalog, invoker)
    }

    fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    #[tokio::test]
    async fn test_list_available_airports() {
        let invoker = Arc::new(RecordingInvoker::default());
        let agent = agent(Domain::Airline, invoker.clone());

        let response = agent.handle(SpecialistRequest::new("List available airports")).await;

        assert!(response.success);
        assert_eq!(response.tools_called, vec!["list_airports"]);
        assert!(response.data.unwrap().get("airports").is_some());
        assert_eq!(invoker.calls(), vec![("list_airports".to_string(), json!({}))]);
    }

    #[tokio::test]
    async fn test_cancel_rental_without_id_calls_nothing() {
        let invoker = Arc::new(RecordingInvoker::default());
        let agent = agent(Domain::CarRental, invoker.clone());

        let response = agent.handle(SpecialistRequest::new("Cancel my rental")).await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("missing_rental_id"));
        assert!(response.tools_called.is_empty());
        assert!(invoker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_catalog_tool_never_reaches_invoker() {
        let invoker = Arc::new(RecordingInvoker::default());
        let agent = agent(Domain::Hotel, invoker.clone());

        let err = agent.call_tool("book_flight", json!({})).await.unwrap_err();

        assert_eq!(err.code(), "policy_denied");
        assert!(invoker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_denial_metric_labels_stay_bounded() {
        let invoker = Arc::new(RecordingInvoker::default());
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let airline = agent(Domain::Airline, invoker.clone()).with_metrics(metrics.clone());

        airline.call_tool("book_hotel", json!({})).await.unwrap_err();
        airline.call_tool("made_up_tool_7f3a", json!({})).await.unwrap_err();
        airline.call_tool("made_up_tool_91c2", json!({})).await.unwrap_err();

        let text = metrics.encode().unwrap();
        assert!(text.contains(r#"waypoint_policy_denials_total{agent="airline-agent",tool="book_hotel"} 1"#));
        assert!(text.contains(r#"waypoint_policy_denials_total{agent="airline-agent",tool="unknown"} 2"#));
        assert!(!text.contains("made_up_tool"));
        assert!(invoker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_application_error_is_surfaced_verbatim() {
        let invoker = Arc::new(RecordingInvoker::failing(ToolError::application("Rental not found")));
        let agent = agent(Domain::CarRental, invoker.clone());

        let mut context = Map::new();
        context.insert("rental_id".into(), json!("r-404"));
        let response = agent
            .handle(SpecialistRequest::new("cancel rental").with_context(context))
            .await;

        assert!(!response.success);
        assert_eq!(response.message, "Rental not found");
        assert_eq!(response.error.as_deref(), Some("application_error"));
        assert_eq!(response.tools_called, vec!["cancel_rental"]);
    }

    #[tokio::test]
    async fn test_unmatched_task_uses_fallback_tool() {
        let invoker = Arc::new(RecordingInvoker::default());
        let agent = agent(Domain::Hotel, invoker.clone());

        let response = agent.handle(SpecialistRequest::new("what's good?")).await;

        assert!(response.success);
        assert_eq!(response.tools_called, vec!["list_cities"]);
        assert!(response.data.unwrap().get("cities").is_some());
    }

    #[tokio::test]
    async fn test_failed_fallback_gives_capability_summary() {
        let invoker = Arc::new(RecordingInvoker::failing(ToolError::Transport("down".into())));
        let agent = agent(Domain::Airline, invoker.clone());

        let response = agent.handle(SpecialistRequest::new("hello there")).await;

        assert!(response.success);
        assert!(response.message.contains("list_airports"));
        assert!(response.tools_called.is_empty());
        assert_eq!(response.data.unwrap()["available_tools"][0], "list_airports");
    }

    #[tokio::test]
    async fn test_model_request_outside_catalog_is_denied() {
        let invoker = Arc::new(RecordingInvoker::default());
        let mut config = AgentConfig::builtin(Domain::Hotel, "http://localhost:9");
        config.dispatch = DispatchStrategy::Model;
        let catalog = Arc::new(ToolCatalog::build(&[config.clone()]).unwrap());
        let model = ScriptedModel::new(vec![Message::assistant_with_tools(
            "",
            vec![
                call("c1", "list_cities", json!({})),
                call("c2", "book_flight", json!({"flight_id": "F1"})),
            ],
        )]);
        let agent = SpecialistAgent::new(&config, catalog, invoker.clone()).with_llm(Arc::new(model));

        let response = agent.handle(SpecialistRequest::new("book me a flight and a hotel")).await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("policy_denied"));
        assert_eq!(response.tools_called, vec!["list_cities"]);
        let names: Vec<String> = invoker.calls().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["list_cities"]);
    }

    #[tokio::test]
    async fn test_model_rounds_are_bounded() {
        let invoker = Arc::new(RecordingInvoker::default());
        let mut config = AgentConfig::builtin(Domain::Airline, "http://localhost:9");
        config.dispatch = DispatchStrategy::Model;
        config.max_tool_rounds = 2;
        let catalog = Arc::new(ToolCatalog::build(&[config.clone()]).unwrap());
        let looping = (0..5)
            .map(|i| {
                Message::assistant_with_tools(
                    "",
                    vec![call(&format!("c{}", i), "list_airports", json!({}))],
                )
            })
            .collect();
        let agent = SpecialistAgent::new(&config, catalog, invoker.clone())
            .with_llm(Arc::new(ScriptedModel::new(looping)));

        let response = agent.handle(SpecialistRequest::new("airports?")).await;

        assert!(response.success);
        assert_eq!(invoker.calls().len(), 2);
        assert_eq!(response.data.unwrap()["airports"]["tool"], "list_airports");
    }

    #[tokio::test]
    async fn test_hybrid_prefers_rules() {
        let invoker = Arc::new(RecordingInvoker::default());
        let mut config = AgentConfig::builtin(Domain::Airline, "http://localhost:9");
        config.dispatch = DispatchStrategy::Hybrid;
        let catalog = Arc::new(ToolCatalog::build(&[config.clone()]).unwrap());
        let model = ScriptedModel::new(vec![Message::assistant("Model answer")]);
        let agent = SpecialistAgent::new(&config, catalog, invoker.clone()).with_llm(Arc::new(model));

        let ruled = agent.handle(SpecialistRequest::new("show available airports")).await;
        assert_eq!(ruled.tools_called, vec!["list_airports"]);

        let modeled = agent.handle(SpecialistRequest::new("which is the nicest lounge?")).await;
        assert!(modeled.success);
        assert_eq!(modeled.message, "Model answer");
    }

    #[tokio::test]
    async fn test_discover_filters_through_catalog() {
        let invoker = Arc::new(RecordingInvoker::default());
        let agent = agent(Domain::Airline, invoker);

        assert_eq!(agent.discover().await, vec!["list_airports"]);
        let health = agent.health().await;
        assert!(health.healthy);
        assert_eq!(health.tools_count, 1);
    }
}
