use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod validator;

use crate::agents::config::{AgentConfig, LlmProviderConfig, RouterConfig};
use crate::agents::domain::Domain;
use crate::cli::Cli;

/// Tool hosts used when no agent is configured
const DEFAULT_TOOL_HOSTS: [(Domain, &str); 3] = [
    (Domain::Airline, "http://localhost:8001"),
    (Domain::Hotel, "http://localhost:8002"),
    (Domain::CarRental, "http://localhost:8003"),
];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub timeouts: TimeoutSettings,
    #[serde(default)]
    pub router: RouterConfig,
    /// Reasoning model; model-assisted strategies need it
    #[serde(default)]
    pub llm: Option<LlmProviderConfig>,
    #[serde(default)]
    pub context: ContextSettings,
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Outbound timeouts in seconds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutSettings {
    #[serde(default = "default_tool_call_secs")]
    pub tool_call_secs: u64,
    #[serde(default = "default_llm_secs")]
    pub llm_secs: u64,
    #[serde(default = "default_context_secs")]
    pub context_secs: u64,
    #[serde(default = "default_health_secs")]
    pub health_secs: u64,
}

fn default_tool_call_secs() -> u64 {
    30
}

fn default_llm_secs() -> u64 {
    60
}

fn default_context_secs() -> u64 {
    10
}

fn default_health_secs() -> u64 {
    5
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            tool_call_secs: default_tool_call_secs(),
            llm_secs: default_llm_secs(),
            context_secs: default_context_secs(),
            health_secs: default_health_secs(),
        }
    }
}

/// Where user and trip context comes from
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContextSettings {
    /// Itinerary service base URL. Unset means an in-process store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            timeouts: TimeoutSettings::default(),
            router: RouterConfig::default(),
            llm: None,
            context: ContextSettings::default(),
            agents: default_agents(),
        }
    }
}

/// One built-in specialist per domain on the local default ports
pub fn default_agents() -> Vec<AgentConfig> {
    DEFAULT_TOOL_HOSTS
        .iter()
        .map(|(domain, host)| AgentConfig::builtin(*domain, host))
        .collect()
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_root(".")
    }

    /// Create settings from CLI arguments (includes config file and CLI overrides)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let config_path = &cli.config;
        let root = config_path
            .parent()
            .and_then(|p| p.to_str())
            .filter(|p| !p.is_empty())
            .unwrap_or(".");

        let mut settings = Self::load(Config::builder().add_source(File::from(config_path.clone()).required(false)))?;

        // CLI > env vars > config file
        settings.apply_cli_overrides(cli);
        settings.finish(root)?;
        Ok(settings)
    }

    pub fn from_root(root: &str) -> Result<Self, anyhow::Error> {
        let config_path = Path::new(root).join("waypoint");
        let mut settings = Self::load(Config::builder().add_source(File::from(config_path).required(false)))?;
        settings.finish(root)?;
        Ok(settings)
    }

    fn load(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, anyhow::Error> {
        let s = builder
            .add_source(
                Environment::with_prefix("WAYPOINT")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .build()?;

        Ok(s.try_deserialize()?)
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(max_iterations) = cli.max_iterations {
            self.router.max_iterations = max_iterations;
        }
        if let Some(url) = &cli.context_url {
            self.context.url = Some(url.clone());
        }
    }

    /// Load agent files, fill in defaults and validate
    fn finish(&mut self, root: &str) -> Result<(), anyhow::Error> {
        let from_files = load_agents_from_dir(&format!("{}/config/agents", root))?;
        merge_vec_by_key(&mut self.agents, from_files, |a| a.id.clone());

        if self.agents.is_empty() {
            tracing::info!("No agents configured, using built-in specialists on local ports");
            self.agents = default_agents();
        }

        validator::ConfigValidator::validate(self).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })
    }
}

/// Merge two vectors by a key function.
/// Items from `other` override items in `base` with the same key.
/// Items from `other` not in `base` are added.
fn merge_vec_by_key<T, K, F>(base: &mut Vec<T>, other: Vec<T>, key_fn: F)
where
    K: Eq + std::hash::Hash,
    F: Fn(&T) -> K,
{
    use std::collections::HashMap;

    let mut key_to_index: HashMap<K, usize> = HashMap::new();
    for (i, item) in base.iter().enumerate() {
        key_to_index.insert(key_fn(item), i);
    }

    for item in other {
        let key = key_fn(&item);
        if let Some(&idx) = key_to_index.get(&key) {
            base[idx] = item;
        } else {
            key_to_index.insert(key, base.len());
            base.push(item);
        }
    }
}

/// Read every agent definition in a directory, sorted by file name
pub fn load_agents_from_dir(path: &str) -> Result<Vec<AgentConfig>, anyhow::Error> {
    let pattern = format!("{}/*", path);
    let mut paths: Vec<_> = glob::glob(&pattern)?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("Failed to read glob entry: {}", e);
                None
            }
        })
        .collect();
    paths.sort();

    let mut agents = Vec::new();
    for path in paths {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if matches!(ext, "json" | "yaml" | "yml" | "toml") {
                let content = std::fs::read_to_string(&path)?;
                let agent: AgentConfig = match ext {
                    "json" => serde_json::from_str(&content)?,
                    "toml" => toml::from_str(&content)?,
                    _ => serde_yaml::from_str(&content)?,
                };
                tracing::debug!(agent_id = %agent.id, path = %path.display(), "Loaded agent definition");
                agents.push(agent);
            }
        }
    }
    Ok(agents)
}
