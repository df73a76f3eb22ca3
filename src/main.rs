use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use waypoint::adapters::context_client::ItineraryServiceClient;
use waypoint::adapters::health_handler::HealthHandler;
use waypoint::adapters::in_memory_context::InMemoryContextProvider;
use waypoint::adapters::metrics_handler::{MetricsCollector, MetricsHandler};
use waypoint::agents::catalog::ToolCatalog;
use waypoint::agents::llm::create_provider;
use waypoint::agents::registry::AgentRegistry;
use waypoint::agents::router::Router;
use waypoint::cli::Cli;
use waypoint::config::Settings;
use waypoint::domain::ContextProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load configuration
    let settings = Settings::new_with_cli(&cli)?;
    let host = settings.server.host.clone();
    let port = settings.server.port;

    info!("Starting Waypoint router on {}:{}", host, port);

    let llm = match &settings.llm {
        Some(config) => {
            info!(provider = %config.provider, model = %config.model, "Reasoning model configured");
            Some(create_provider(config, Duration::from_secs(settings.timeouts.llm_secs))?)
        }
        None => None,
    };

    let metrics = Arc::new(MetricsCollector::new()?);
    let catalog = Arc::new(ToolCatalog::build(&settings.agents)?);
    let registry = AgentRegistry::from_settings(&settings, catalog, llm.clone(), Some(metrics.clone()))?;
    info!("Registered {} specialists", registry.len());

    let context: Arc<dyn ContextProvider> = match &settings.context.url {
        Some(url) => {
            info!(url = %url, "Using itinerary service for user context");
            Arc::new(ItineraryServiceClient::new(url, &settings.timeouts))
        }
        None => {
            info!("No itinerary service configured, keeping trips in memory");
            Arc::new(InMemoryContextProvider::new())
        }
    };

    let router = Arc::new(
        Router::from_config(registry, context, &settings.router, llm).with_metrics(metrics.clone()),
    );

    let probe_timeout = Duration::from_secs(settings.timeouts.health_secs);
    let health_handler = Arc::new(HealthHandler::new(router.clone(), probe_timeout));
    let metrics_handler = Arc::new(MetricsHandler::new(metrics));

    // Create application using the library function
    let app = waypoint::create_app(router, health_handler, metrics_handler, probe_timeout);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
