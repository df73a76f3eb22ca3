//! Agent registry
//!
//! Maps each domain to the specialist serving it. Built once from settings
//! and handed to the router; there is no global registry.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::info;

use super::catalog::ToolCatalog;
use super::config::DispatchStrategy;
use super::domain::{AgentInfo, Domain, Specialist};
use super::error::{AgentError, AgentResult};
use super::llm::LlmProvider;
use super::specialist::SpecialistAgent;
use crate::adapters::mcp_client::McpClient;
use crate::adapters::metrics_handler::MetricsCollector;
use crate::adapters::remote_specialist::RemoteSpecialist;
use crate::config::Settings;

#[derive(Default, Clone)]
pub struct AgentRegistry {
    agents: BTreeMap<Domain, Arc<dyn Specialist>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a specialist. One specialist per domain.
    pub fn register(&mut self, specialist: Arc<dyn Specialist>) -> AgentResult<()> {
        let domain = specialist.identity().domain;
        if self.agents.contains_key(&domain) {
            return Err(AgentError::Configuration(format!(
                "domain {} already has a specialist",
                domain
            )));
        }
        self.agents.insert(domain, specialist);
        Ok(())
    }

    /// Wire every configured agent to its tool host or remote endpoint
    pub fn from_settings(
        settings: &Settings,
        catalog: Arc<ToolCatalog>,
        llm: Option<Arc<dyn LlmProvider>>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> AgentResult<Self> {
        let mut registry = Self::new();

        for config in &settings.agents {
            let specialist: Arc<dyn Specialist> = match (&config.endpoint, &config.tool_host) {
                (Some(endpoint), _) => {
                    info!(agent_id = %config.id, endpoint = %endpoint, "Registering remote specialist");
                    Arc::new(RemoteSpecialist::new(config, endpoint, &catalog, &settings.timeouts))
                }
                (None, Some(host)) => {
                    info!(agent_id = %config.id, tool_host = %host, dispatch = ?config.dispatch, "Registering specialist");
                    let client = McpClient::new(&config.id, &config.name, host, &settings.timeouts);
                    let mut agent = SpecialistAgent::new(config, catalog.clone(), Arc::new(client));
                    if config.dispatch != DispatchStrategy::Deterministic {
                        if let Some(llm) = &llm {
                            agent = agent.with_llm(llm.clone());
                        }
                    }
                    if let Some(metrics) = &metrics {
                        agent = agent.with_metrics(metrics.clone());
                    }
                    Arc::new(agent)
                }
                (None, None) => {
                    return Err(AgentError::Configuration(format!(
                        "agent {} has neither tool_host nor endpoint",
                        config.id
                    )))
                }
            };
            registry.register(specialist)?;
        }

        Ok(registry)
    }

    pub fn get(&self, domain: Domain) -> Option<Arc<dyn Specialist>> {
        self.agents.get(&domain).cloned()
    }

    /// Registered domains in processing order
    pub fn domains(&self) -> Vec<Domain> {
        self.agents.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Domain, &Arc<dyn Specialist>)> {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Probe every specialist concurrently
    pub async fn list(&self, probe_timeout: Duration) -> Vec<AgentInfo> {
        let probes = self.agents.values().map(|agent| async move {
            let identity = agent.identity();
            let (healthy, tools) = match tokio::time::timeout(probe_timeout, async {
                let health = agent.health().await;
                let tools = if health.healthy { agent.discover().await } else { Vec::new() };
                (health.healthy, tools)
            })
            .await
            {
                Ok(result) => result,
                Err(_) => (false, Vec::new()),
            };

            AgentInfo {
                agent_id: identity.agent_id.clone(),
                agent_name: identity.agent_name.clone(),
                domain: identity.domain,
                tools,
                healthy,
            }
        });
        join_all(probes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_default_settings() {
        let settings = Settings::default();
        let catalog = Arc::new(ToolCatalog::build(&settings.agents).unwrap());
        let registry = AgentRegistry::from_settings(&settings, catalog, None, None).unwrap();

        assert_eq!(registry.domains(), Domain::ALL.to_vec());
        let hotel = registry.get(Domain::Hotel).unwrap();
        assert_eq!(hotel.identity().agent_id, "hotel-agent");
        assert!(hotel.identity().capabilities().contains(&"search_hotels".to_string()));
    }

    #[test]
    fn test_duplicate_domain_is_rejected() {
        let settings = Settings::default();
        let catalog = Arc::new(ToolCatalog::build(&settings.agents).unwrap());
        let mut registry = AgentRegistry::from_settings(&settings, catalog, None, None).unwrap();

        let again = registry.get(Domain::Airline).unwrap();
        assert!(matches!(registry.register(again), Err(AgentError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_list_reports_unreachable_hosts() {
        let mut settings = Settings::default();
        settings.timeouts.health_secs = 1;
        for agent in settings.agents.iter_mut() {
            agent.tool_host = Some("http://127.0.0.1:1".into());
        }
        let catalog = Arc::new(ToolCatalog::build(&settings.agents).unwrap());
        let registry = AgentRegistry::from_settings(&settings, catalog, None, None).unwrap();

        let listing = registry.list(Duration::from_secs(2)).await;
        assert_eq!(listing.len(), 3);
        assert!(listing.iter().all(|a| !a.healthy && a.tools.is_empty()));
        assert_eq!(listing[2].domain, Domain::CarRental);
    }
}
