use async_trait::async_trait;
use serde_json::Value;

use crate::agents::domain::ToolDefinition;
use crate::agents::error::{ContextError, ToolCallResult, ToolError};

pub mod mcp_types;
pub mod trip;

pub use trip::*;

/// Invokes tools on one tool host on behalf of one agent
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn call_tool(&self, name: &str, arguments: Value) -> ToolCallResult;
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolError>;
    async fn ping(&self) -> bool;
}

/// Externally owned trip and itinerary state
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// `Ok(None)` when the user has no context on record
    async fn get_user_context(&self, user_id: &str) -> Result<Option<UserContext>, ContextError>;
    async fn create_trip(&self, request: NewTrip) -> Result<Trip, ContextError>;
    async fn append_itinerary_item(&self, item: NewItineraryItem) -> Result<ItineraryItem, ContextError>;
    async fn health(&self) -> bool;
}
