//! Routing types shared by the classifier, continuation policy and synthesizer

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Domain, SpecialistResponse};

/// What the user is trying to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntentType {
    CreateTrip,
    AddToTrip,
    Modify,
    Cancel,
    QueryExisting,
    Search,
    General,
}

impl IntentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentType::CreateTrip => "create-trip",
            IntentType::AddToTrip => "add-to-trip",
            IntentType::Modify => "modify",
            IntentType::Cancel => "cancel",
            IntentType::QueryExisting => "query-existing",
            IntentType::Search => "search",
            IntentType::General => "general",
        }
    }
}

impl std::str::FromStr for IntentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(s.trim().to_lowercase().replace('_', "-")))
            .map_err(|_| format!("unknown intent: {}", s))
    }
}

/// Classified domain of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainTarget {
    Single(Domain),
    Multi,
    None,
}

impl DomainTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainTarget::Single(d) => d.as_str(),
            DomainTarget::Multi => "multi",
            DomainTarget::None => "none",
        }
    }
}

impl Serialize for DomainTarget {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DomainTarget {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "multi" => Ok(DomainTarget::Multi),
            "none" | "" => Ok(DomainTarget::None),
            other => other
                .parse::<Domain>()
                .map(DomainTarget::Single)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Output of a classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub domain: DomainTarget,
    pub intent: IntentType,
    /// Specialists that could serve the request, in processing order
    #[serde(default)]
    pub candidates: Vec<Domain>,
}

impl Classification {
    /// Whether the request explicitly spans several specialists
    pub fn is_multi_leg(&self) -> bool {
        self.candidates.len() > 1
    }
}

/// Where the next step of a request goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    Delegate(Domain),
    Complete,
}

/// A routing decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub target: RouteTarget,
    /// Task text handed to the specialist
    pub task: String,
    /// Audit only
    pub rationale: String,
}

impl RouteDecision {
    pub fn delegate(domain: Domain, task: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            target: RouteTarget::Delegate(domain),
            task: task.into(),
            rationale: rationale.into(),
        }
    }

    pub fn complete(rationale: impl Into<String>) -> Self {
        Self {
            target: RouteTarget::Complete,
            task: String::new(),
            rationale: rationale.into(),
        }
    }
}

/// One specialist call made while serving a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub domain: Domain,
    pub task: String,
    pub result: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default)]
    pub tools_called: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversationTurn {
    pub fn from_response(domain: Domain, task: &str, response: &SpecialistResponse) -> Self {
        Self {
            domain,
            task: task.to_string(),
            result: response.message.clone(),
            success: response.success,
            data: response.data.clone(),
            tools_called: response.tools_called.clone(),
            error: response.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_round_trips_through_str() {
        assert_eq!("add_to_trip".parse::<IntentType>().unwrap(), IntentType::AddToTrip);
        assert_eq!(IntentType::QueryExisting.as_str(), "query-existing");
    }

    #[test]
    fn test_domain_target_serde() {
        let target: DomainTarget = serde_json::from_str("\"car_rental\"").unwrap();
        assert_eq!(target, DomainTarget::Single(Domain::CarRental));
        assert_eq!(serde_json::to_string(&DomainTarget::Multi).unwrap(), "\"multi\"");
    }
}
