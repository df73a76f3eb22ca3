//! Agent domain types

use serde::{Deserialize, Serialize};

use super::ToolDefinition;

/// Specialist domain tag.
///
/// The derived ordering is the fixed processing order used for multi-domain
/// requests: airline, then hotel, then car-rental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Domain {
    #[serde(rename = "airline")]
    Airline,
    #[serde(rename = "hotel")]
    Hotel,
    #[serde(rename = "car-rental", alias = "car_rental")]
    CarRental,
}

impl Domain {
    /// All domains in processing order
    pub const ALL: [Domain; 3] = [Domain::Airline, Domain::Hotel, Domain::CarRental];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Airline => "airline",
            Domain::Hotel => "hotel",
            Domain::CarRental => "car-rental",
        }
    }

    /// Item type recorded on itinerary entries
    pub fn item_type(&self) -> &'static str {
        match self {
            Domain::Airline => "flight",
            Domain::Hotel => "hotel",
            Domain::CarRental => "car_rental",
        }
    }

    /// Default agent id for the built-in specialist of this domain
    pub fn default_agent_id(&self) -> &'static str {
        match self {
            Domain::Airline => "airline-agent",
            Domain::Hotel => "hotel-agent",
            Domain::CarRental => "car-rental-agent",
        }
    }

    /// Default display name for the built-in specialist of this domain
    pub fn default_agent_name(&self) -> &'static str {
        match self {
            Domain::Airline => "Airline Agent",
            Domain::Hotel => "Hotel Agent",
            Domain::CarRental => "Car Rental Agent",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "airline" => Ok(Domain::Airline),
            "hotel" => Ok(Domain::Hotel),
            "car-rental" | "car_rental" | "carrental" => Ok(Domain::CarRental),
            other => Err(format!("unknown domain: {}", other)),
        }
    }
}

/// Identity of a specialist agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentIdentity {
    /// Opaque agent id, propagated to tool hosts as `x-agent-id`
    pub agent_id: String,
    /// Human-readable name
    pub agent_name: String,
    /// Domain this agent is bound to
    pub domain: Domain,
    /// Permitted tools
    pub tools: Vec<ToolDefinition>,
}

impl AgentIdentity {
    /// Names of the permitted tools, in catalog order
    pub fn capabilities(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }
}

/// Reachability report for one specialist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentHealth {
    pub healthy: bool,
    /// Number of tools discovered on the tool host
    pub tools_count: usize,
}

/// Agent information returned from the registry listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    pub agent_id: String,
    pub agent_name: String,
    pub domain: Domain,
    /// Tools discovered on the host, filtered through the catalog
    pub tools: Vec<String>,
    pub healthy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_order_is_fixed() {
        let mut domains = vec![Domain::CarRental, Domain::Airline, Domain::Hotel];
        domains.sort();
        assert_eq!(domains, Domain::ALL.to_vec());
    }

    #[test]
    fn test_domain_serde_accepts_underscore_alias() {
        let d: Domain = serde_json::from_str("\"car_rental\"").unwrap();
        assert_eq!(d, Domain::CarRental);
        assert_eq!(serde_json::to_string(&d).unwrap(), "\"car-rental\"");
    }

    #[test]
    fn test_domain_from_str() {
        assert_eq!("Hotel".parse::<Domain>().unwrap(), Domain::Hotel);
        assert!("cruise".parse::<Domain>().is_err());
    }
}
