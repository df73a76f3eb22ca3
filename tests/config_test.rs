use std::fs;
use tempfile::TempDir;
use waypoint::agents::config::{ClassifierKind, DispatchStrategy};
use waypoint::agents::domain::Domain;
use waypoint::config::Settings;

#[test]
fn test_load_agents_from_config_dir() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    fs::create_dir_all(root.join("config/agents"))?;

    let waypoint_toml = r#"
[server]
host = "127.0.0.1"
port = 3000

[timeouts]
tool_call_secs = 12

[router]
max_iterations = 3

[context]
url = "http://localhost:9000"
"#;
    fs::write(root.join("waypoint.toml"), waypoint_toml)?;

    let airline_json = r#"
{
    "id": "airline-agent",
    "name": "Airline Agent",
    "domain": "airline",
    "tool_host": "http://localhost:8101"
}
"#;
    fs::write(root.join("config/agents/airline.json"), airline_json)?;

    let car_yaml = r#"
id: car-rental-agent
name: Car Rental Agent
domain: car_rental
endpoint: http://cars.internal:8080
"#;
    fs::write(root.join("config/agents/car.yaml"), car_yaml)?;

    // Ignored: not an agent definition format
    fs::write(root.join("config/agents/README.md"), "# agents")?;

    let settings = Settings::from_root(root.to_str().unwrap())?;

    assert_eq!(settings.server.port, 3000);
    assert_eq!(settings.timeouts.tool_call_secs, 12);
    assert_eq!(settings.timeouts.health_secs, 5);
    assert_eq!(settings.router.max_iterations, 3);
    assert_eq!(settings.router.classifier, ClassifierKind::Keyword);
    assert_eq!(settings.context.url.as_deref(), Some("http://localhost:9000"));

    assert_eq!(settings.agents.len(), 2);
    let airline = &settings.agents[0];
    assert_eq!(airline.domain, Domain::Airline);
    assert_eq!(airline.tool_host.as_deref(), Some("http://localhost:8101"));
    assert_eq!(airline.dispatch, DispatchStrategy::Deterministic);
    assert_eq!(airline.max_tool_rounds, 3);

    let car = &settings.agents[1];
    assert_eq!(car.domain, Domain::CarRental);
    assert_eq!(car.endpoint.as_deref(), Some("http://cars.internal:8080"));
    assert!(car.tool_host.is_none());

    Ok(())
}

#[test]
fn test_empty_root_uses_builtin_specialists() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let settings = Settings::from_root(temp_dir.path().to_str().unwrap())?;

    let domains: Vec<Domain> = settings.agents.iter().map(|a| a.domain).collect();
    assert_eq!(domains, vec![Domain::Airline, Domain::Hotel, Domain::CarRental]);
    assert_eq!(settings.agents[2].tool_host.as_deref(), Some("http://localhost:8003"));
    assert!(settings.context.url.is_none());
    assert!(settings.llm.is_none());
    Ok(())
}

#[test]
fn test_model_dispatch_without_llm_is_rejected() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    fs::create_dir_all(root.join("config/agents"))?;

    let hotel_yaml = r#"
id: hotel-agent
name: Hotel Agent
domain: hotel
tool_host: http://localhost:8002
dispatch: model
"#;
    fs::write(root.join("config/agents/hotel.yaml"), hotel_yaml)?;

    let err = Settings::from_root(root.to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("no [llm] section"));
    Ok(())
}

#[test]
fn test_duplicate_domain_is_rejected() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    fs::create_dir_all(root.join("config/agents"))?;

    for (file, id) in [("a.yaml", "hotel-a"), ("b.yaml", "hotel-b")] {
        let body = format!(
            "id: {}\nname: Hotel Agent\ndomain: hotel\ntool_host: http://localhost:8002\n",
            id
        );
        fs::write(root.join("config/agents").join(file), body)?;
    }

    let err = Settings::from_root(root.to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("Domain 'hotel' is served by agents"));
    Ok(())
}
