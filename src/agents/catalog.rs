//! Tool catalog
//!
//! Static per-agent whitelist of tools. Built once at startup and shared
//! read-only; there is no API to add tools afterwards.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

use super::config::AgentConfig;
use super::domain::{Domain, ParameterSpec, ToolDefinition};

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("Duplicate agent id: {0}")]
    DuplicateAgent(String),

    #[error("Tool '{tool}' is listed for both {first} and {second}")]
    CrossDomainTool {
        tool: String,
        first: Domain,
        second: Domain,
    },

    #[error("Duplicate tool '{tool}' in catalog of agent '{agent}'")]
    DuplicateTool { agent: String, tool: String },

    #[error("Agent '{agent}' lists tool '{tool}' which belongs to {owner}")]
    ForeignTool {
        agent: String,
        tool: String,
        owner: Domain,
    },
}

#[derive(Debug, Clone)]
struct AgentCatalog {
    domain: Domain,
    tools: Vec<ToolDefinition>,
    names: BTreeSet<String>,
}

/// Per-agent tool whitelist
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    agents: BTreeMap<String, AgentCatalog>,
}

impl ToolCatalog {
    /// Build the catalog from agent configuration.
    ///
    /// Agents without an explicit tool list get the built-in list for their
    /// domain. A tool name may belong to one domain only.
    pub fn build(agents: &[AgentConfig]) -> Result<Self, CatalogError> {
        let mut catalog = ToolCatalog::default();
        let mut owners: HashMap<String, Domain> = HashMap::new();

        for agent in agents {
            if catalog.agents.contains_key(&agent.id) {
                return Err(CatalogError::DuplicateAgent(agent.id.clone()));
            }

            let tools = agent.resolved_tools();
            let mut names = BTreeSet::new();
            for tool in &tools {
                if !names.insert(tool.name.clone()) {
                    return Err(CatalogError::DuplicateTool {
                        agent: agent.id.clone(),
                        tool: tool.name.clone(),
                    });
                }
                match owners.get(&tool.name) {
                    Some(owner) if *owner != agent.domain => {
                        return Err(CatalogError::CrossDomainTool {
                            tool: tool.name.clone(),
                            first: *owner,
                            second: agent.domain,
                        });
                    }
                    _ => {
                        owners.insert(tool.name.clone(), agent.domain);
                    }
                }
                if let Some(owner) = builtin_owner(&tool.name).filter(|d| *d != agent.domain) {
                    return Err(CatalogError::ForeignTool {
                        agent: agent.id.clone(),
                        tool: tool.name.clone(),
                        owner,
                    });
                }
            }

            catalog.agents.insert(
                agent.id.clone(),
                AgentCatalog {
                    domain: agent.domain,
                    tools,
                    names,
                },
            );
        }

        Ok(catalog)
    }

    /// Whether `agent_id` may call `tool_name`. Unknown agents may call nothing.
    pub fn permits(&self, agent_id: &str, tool_name: &str) -> bool {
        self.agents
            .get(agent_id)
            .map_or(false, |c| c.names.contains(tool_name))
    }

    /// Whether any agent's catalog lists `tool_name`
    pub fn knows(&self, tool_name: &str) -> bool {
        self.agents.values().any(|c| c.names.contains(tool_name))
    }

    /// Tool definitions of an agent, in catalog order
    pub fn tools_for(&self, agent_id: &str) -> &[ToolDefinition] {
        self.agents
            .get(agent_id)
            .map(|c| c.tools.as_slice())
            .unwrap_or(&[])
    }

    pub fn domain_of(&self, agent_id: &str) -> Option<Domain> {
        self.agents.get(agent_id).map(|c| c.domain)
    }

    pub fn agent_ids(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }
}

fn req(description: &str) -> ParameterSpec {
    ParameterSpec::required("string", description)
}

fn opt(kind: &str, description: &str) -> ParameterSpec {
    ParameterSpec::optional(kind, description)
}

/// Domain whose built-in list contains `tool_name`
pub fn builtin_owner(tool_name: &str) -> Option<Domain> {
    Domain::ALL
        .into_iter()
        .find(|d| builtin_tools(*d).iter().any(|t| t.name == tool_name))
}

/// Built-in tool list for a domain
pub fn builtin_tools(domain: Domain) -> Vec<ToolDefinition> {
    match domain {
        Domain::Airline => vec![
            ToolDefinition::new("list_airports", "List all available airports"),
            ToolDefinition::new("search_flights", "Search for available flights")
                .param("origin", req("Origin airport code"))
                .param("destination", req("Destination airport code"))
                .param("departure_date", req("Departure date (YYYY-MM-DD)"))
                .param("passengers", opt("integer", "Number of passengers"))
                .param("cabin_class", opt("string", "Cabin class")),
            ToolDefinition::new("get_flight_details", "Get details of a specific flight")
                .param("flight_id", req("Flight identifier")),
            ToolDefinition::new("book_flight", "Book a flight")
                .param("flight_id", req("Flight identifier"))
                .param("passengers", opt("array", "Passenger names")),
            ToolDefinition::new("get_booking", "Retrieve a booking by confirmation code")
                .param("confirmation_code", req("Booking confirmation code")),
            ToolDefinition::new("cancel_booking", "Cancel a flight booking")
                .param("confirmation_code", req("Booking confirmation code")),
        ],
        Domain::Hotel => vec![
            ToolDefinition::new("list_cities", "List cities with available hotels"),
            ToolDefinition::new("search_hotels", "Search for hotels in a city")
                .param("city_code", req("City code"))
                .param("check_in_date", req("Check-in date (YYYY-MM-DD)"))
                .param("check_out_date", req("Check-out date (YYYY-MM-DD)"))
                .param("guests", opt("integer", "Number of guests")),
            ToolDefinition::new("get_hotel_details", "Get details of a specific hotel")
                .param("hotel_id", req("Hotel identifier")),
            ToolDefinition::new("book_hotel", "Book a hotel room")
                .param("hotel_id", req("Hotel identifier"))
                .param("room_type", opt("string", "Room type"))
                .param("check_in", req("Check-in date (YYYY-MM-DD)"))
                .param("check_out", req("Check-out date (YYYY-MM-DD)"))
                .param("guest_name", opt("string", "Guest name")),
            ToolDefinition::new("get_reservation", "Retrieve a hotel reservation")
                .param("reservation_id", req("Reservation identifier")),
            ToolDefinition::new("cancel_reservation", "Cancel a hotel reservation")
                .param("reservation_id", req("Reservation identifier")),
        ],
        Domain::CarRental => vec![
            ToolDefinition::new("list_locations", "List rental locations"),
            ToolDefinition::new("get_vehicle_categories", "List vehicle categories"),
            ToolDefinition::new("search_vehicles", "Search for available vehicles")
                .param("pickup_location_code", req("Pickup location code"))
                .param("pickup_date", req("Pickup date (YYYY-MM-DD)"))
                .param("dropoff_date", req("Drop-off date (YYYY-MM-DD)"))
                .param("category", opt("string", "Vehicle category")),
            ToolDefinition::new("get_vehicle_details", "Get details of a specific vehicle")
                .param("vehicle_id", req("Vehicle identifier")),
            ToolDefinition::new("book_vehicle", "Book a rental vehicle")
                .param("vehicle_id", req("Vehicle identifier"))
                .param("pickup_date", req("Pickup date (YYYY-MM-DD)"))
                .param("return_date", req("Return date (YYYY-MM-DD)"))
                .param("driver_name", opt("string", "Driver name")),
            ToolDefinition::new("get_rental", "Retrieve a rental")
                .param("rental_id", req("Rental identifier")),
            ToolDefinition::new("modify_rental", "Change the return date of a rental")
                .param("rental_id", req("Rental identifier"))
                .param("new_return_date", req("New return date (YYYY-MM-DD)")),
            ToolDefinition::new("cancel_rental", "Cancel a rental")
                .param("rental_id", req("Rental identifier")),
        ],
    }
}
