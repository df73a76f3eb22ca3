//! Trip and itinerary shapes owned by the context provider

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub trip_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default = "default_trip_status")]
    pub status: String,
}

fn default_trip_status() -> String {
    "planning".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryItem {
    pub item_id: String,
    pub trip_id: String,
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default = "default_item_status")]
    pub status: String,
    #[serde(default)]
    pub details: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
}

fn default_item_status() -> String {
    "pending".to_string()
}

/// Everything the router knows about a user before classifying
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserContext {
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub active_trip: Option<Trip>,
    #[serde(default)]
    pub all_trips: Vec<Trip>,
    #[serde(default)]
    pub itinerary: Vec<ItineraryItem>,
    #[serde(default)]
    pub recent_messages: Vec<Value>,
}

impl UserContext {
    pub fn has_active_trip(&self) -> bool {
        self.active_trip.is_some()
    }

    /// Context entries forwarded to specialists when a trip is active
    pub fn specialist_context(&self) -> Map<String, Value> {
        let mut context = Map::new();
        if let Some(trip) = &self.active_trip {
            context.insert("trip".into(), json!(trip));
            context.insert("itinerary".into(), json!(self.itinerary));
            let preferences = self
                .user
                .as_ref()
                .and_then(|u| u.get("preferences"))
                .cloned()
                .unwrap_or_else(|| json!({}));
            context.insert("user_preferences".into(), preferences);
        }
        context
    }
}

/// Payload for creating a trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrip {
    pub user_id: String,
    pub destination: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl NewTrip {
    pub fn to(user_id: impl Into<String>, destination: impl Into<String>) -> Self {
        let destination = destination.into();
        Self {
            user_id: user_id.into(),
            name: format!("Trip to {}", destination),
            destination,
            start_date: None,
            end_date: None,
        }
    }
}

/// Payload for appending an itinerary item after a booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItineraryItem {
    pub trip_id: String,
    pub item_type: String,
    pub details: Value,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_reference: Option<String>,
}

impl NewItineraryItem {
    /// Status is `confirmed` when a booking reference is known, `pending` otherwise
    pub fn new(
        trip_id: impl Into<String>,
        item_type: impl Into<String>,
        details: Value,
        booking_reference: Option<String>,
    ) -> Self {
        Self {
            trip_id: trip_id.into(),
            item_type: item_type.into(),
            details,
            status: if booking_reference.is_some() {
                "confirmed".to_string()
            } else {
                "pending".to_string()
            },
            booking_reference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_context_tolerates_sparse_payload() {
        let ctx: UserContext = serde_json::from_value(json!({
            "active_trip": { "trip_id": "t-1", "destination": "Chicago" }
        }))
        .unwrap();
        let trip = ctx.active_trip.as_ref().unwrap();
        assert_eq!(trip.status, "planning");
        assert!(ctx.itinerary.is_empty());

        let forwarded = ctx.specialist_context();
        assert_eq!(forwarded["trip"]["trip_id"], "t-1");
        assert_eq!(forwarded["user_preferences"], json!({}));
    }

    #[test]
    fn test_itinerary_status_follows_reference() {
        let confirmed = NewItineraryItem::new("t-1", "flight", json!({}), Some("ABC123".into()));
        assert_eq!(confirmed.status, "confirmed");
        let pending = NewItineraryItem::new("t-1", "hotel", json!({}), None);
        assert_eq!(pending.status, "pending");
    }

    #[test]
    fn test_new_trip_name() {
        assert_eq!(NewTrip::to("u-1", "Paris").name, "Trip to Paris");
    }
}
