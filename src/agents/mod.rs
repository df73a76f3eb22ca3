//! Agent system for Waypoint
//!
//! - `catalog` - per-agent tool whitelist, fixed at startup
//! - `specialist` - generic domain specialist over a tool host
//! - `dispatch` - ordered rule tables for deterministic tool selection
//! - `registry` - domain to specialist mapping
//! - `router/` - classification, bounded delegation and synthesis
//! - `llm/` - reasoning model providers

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod llm;
pub mod registry;
pub mod router;
pub mod specialist;

// Re-export commonly used types
pub use config::*;
pub use domain::*;
pub use error::*;
pub use registry::AgentRegistry;
pub use specialist::SpecialistAgent;
