use clap::Parser;
use std::path::PathBuf;

/// Waypoint - travel planning router over domain specialists
#[derive(Parser, Debug, Clone)]
#[command(name = "waypoint", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "WAYPOINT_CONFIG", default_value = "waypoint.toml")]
    pub config: PathBuf,

    /// Server host address
    #[arg(long, env = "WAYPOINT_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "WAYPOINT_PORT")]
    pub port: Option<u16>,

    /// Log filter, e.g. `info` or `waypoint=debug,tower_http=info`
    #[arg(long, env = "WAYPOINT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Ceiling on specialist calls per chat request
    #[arg(long, env = "WAYPOINT_MAX_ITERATIONS")]
    pub max_iterations: Option<u32>,

    /// Itinerary service base URL; in-memory context when unset
    #[arg(long, env = "WAYPOINT_CONTEXT_URL")]
    pub context_url: Option<String>,
}

impl Cli {
    /// Filter directive for the tracing subscriber
    pub fn log_filter(&self) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| "waypoint=info,tower_http=info".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["waypoint"]);
        assert_eq!(cli.config, PathBuf::from("waypoint.toml"));
        assert!(cli.host.is_none());
        assert!(cli.port.is_none());
        assert!(cli.max_iterations.is_none());
        assert_eq!(cli.log_filter(), "waypoint=info,tower_http=info");
    }

    #[test]
    fn test_cli_with_args() {
        let cli = Cli::parse_from([
            "waypoint",
            "--config",
            "custom.toml",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--log-level",
            "debug",
            "--max-iterations",
            "3",
            "--context-url",
            "http://itinerary:8084",
        ]);
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert_eq!(cli.host, Some("0.0.0.0".to_string()));
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.log_filter(), "debug");
        assert_eq!(cli.max_iterations, Some(3));
        assert_eq!(cli.context_url.as_deref(), Some("http://itinerary:8084"));
    }
}
