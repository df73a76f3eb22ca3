//! In-process context provider
//!
//! Keeps trips and itinerary items in memory for local runs and tests. Data
//! lives as long as the process.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::agents::error::ContextError;
use crate::domain::{ContextProvider, ItineraryItem, NewItineraryItem, NewTrip, Trip, UserContext};

#[derive(Default)]
struct Store {
    /// Trips in creation order
    trips: Vec<Trip>,
    items: HashMap<String, Vec<ItineraryItem>>,
}

#[derive(Default)]
pub struct InMemoryContextProvider {
    store: RwLock<Store>,
}

impl InMemoryContextProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a trip, e.g. for tests
    pub async fn insert_trip(&self, trip: Trip) {
        self.store.write().await.trips.push(trip);
    }
}

/// A trip still being planned, or booked and not yet started
fn is_active(trip: &Trip, today: NaiveDate) -> bool {
    match trip.status.as_str() {
        "planning" => true,
        "booked" => trip
            .start_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map_or(false, |start| start > today),
        _ => false,
    }
}

#[async_trait]
impl ContextProvider for InMemoryContextProvider {
    async fn get_user_context(&self, user_id: &str) -> Result<Option<UserContext>, ContextError> {
        let store = self.store.read().await;

        let today = Utc::now().date_naive();

        // Most recent first
        let all_trips: Vec<Trip> = store
            .trips
            .iter()
            .filter(|t| t.user_id == user_id)
            .rev()
            .cloned()
            .collect();

        let active_trip = all_trips.iter().find(|t| is_active(t, today)).cloned();
        let itinerary = active_trip
            .as_ref()
            .and_then(|t| store.items.get(&t.trip_id))
            .cloned()
            .unwrap_or_default();

        Ok(Some(UserContext {
            user: None,
            active_trip,
            all_trips,
            itinerary,
            recent_messages: Vec::new(),
        }))
    }

    async fn create_trip(&self, request: NewTrip) -> Result<Trip, ContextError> {
        let trip = Trip {
            trip_id: Uuid::new_v4().to_string(),
            user_id: request.user_id,
            name: request.name,
            destination: request.destination,
            origin: None,
            start_date: request.start_date,
            end_date: request.end_date,
            status: "planning".to_string(),
        };
        self.store.write().await.trips.push(trip.clone());
        Ok(trip)
    }

    async fn append_itinerary_item(&self, item: NewItineraryItem) -> Result<ItineraryItem, ContextError> {
        let mut store = self.store.write().await;
        if !store.trips.iter().any(|t| t.trip_id == item.trip_id) {
            return Err(ContextError::UnknownTrip(item.trip_id));
        }

        let created = ItineraryItem {
            item_id: Uuid::new_v4().to_string(),
            trip_id: item.trip_id.clone(),
            item_type: item.item_type,
            booking_reference: item.booking_reference,
            provider: None,
            status: item.status,
            details: item.details,
            check_in: None,
            check_out: None,
            price_cents: None,
        };
        store
            .items
            .entry(item.trip_id)
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn health(&self) -> bool {
        true
    }
}
