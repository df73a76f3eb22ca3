//! Domain types for the agent system
//!
//! Core abstractions shared by specialists and the router.

mod agent;
mod message;
mod response;
mod routing;
mod tool_call;

pub use agent::*;
pub use message::*;
pub use response::*;
pub use routing::*;
pub use tool_call::*;

use async_trait::async_trait;

/// Port trait for a specialist agent, local or remote
#[async_trait]
pub trait Specialist: Send + Sync {
    /// Identity and catalog of this specialist
    fn identity(&self) -> &AgentIdentity;

    /// Serve a delegated task. Never fails: errors come back as `success=false`.
    async fn handle(&self, request: SpecialistRequest) -> SpecialistResponse;

    /// Reachability of the backing tool host and discovered tool count
    async fn health(&self) -> AgentHealth;

    /// Tool names discovered on the host, restricted to the catalog
    async fn discover(&self) -> Vec<String>;
}
