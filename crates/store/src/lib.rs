//! Persistence for AgentForge: flat JSON-array files plus in-memory stand-ins.

pub mod agents;
pub mod in_memory;
pub mod json_file;
pub mod usage;

pub use agents::FileAgentStore;
pub use in_memory::{InMemoryAgentStore, InMemoryUsageLog};
pub use json_file::{JsonArrayFile, Slot};
pub use usage::FileUsageLog;
