//! Itinerary service client
//!
//! HTTP adapter for the external service that owns users, trips and
//! itinerary items.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::adapters::http_client;
use crate::agents::error::ContextError;
use crate::config::TimeoutSettings;
use crate::domain::{ContextProvider, ItineraryItem, NewItineraryItem, NewTrip, Trip, UserContext};

pub struct ItineraryServiceClient {
    base_url: String,
    client: Client,
    call_timeout: Duration,
    health_timeout: Duration,
}

impl ItineraryServiceClient {
    pub fn new(base_url: &str, timeouts: &TimeoutSettings) -> Self {
        let call_timeout = Duration::from_secs(timeouts.context_secs);
        let client = http_client(call_timeout, "itinerary-service");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            call_timeout,
            health_timeout: Duration::from_secs(timeouts.health_secs),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ContextError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .timeout(self.call_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContextError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ContextProvider for ItineraryServiceClient {
    async fn get_user_context(&self, user_id: &str) -> Result<Option<UserContext>, ContextError> {
        let url = format!(
            "{}/api/v1/users/{}/context",
            self.base_url,
            urlencoding::encode(user_id)
        );
        let response = self.client.get(url).timeout(self.call_timeout).send().await?;

        if response.status() != StatusCode::OK {
            warn!(user_id = %user_id, status = response.status().as_u16(), "No user context available");
            return Ok(None);
        }

        let context: UserContext = response.json().await?;
        debug!(
            user_id = %user_id,
            active_trip = context.has_active_trip(),
            trips = context.all_trips.len(),
            "Loaded user context"
        );
        Ok(Some(context))
    }

    async fn create_trip(&self, request: NewTrip) -> Result<Trip, ContextError> {
        self.post("/api/v1/trips", &request).await
    }

    async fn append_itinerary_item(&self, item: NewItineraryItem) -> Result<ItineraryItem, ContextError> {
        self.post("/api/v1/itinerary", &item).await
    }

    async fn health(&self) -> bool {
        match self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Itinerary service health probe failed");
                false
            }
        }
    }
}
