//! # AgentForge Core
//!
//! Domain types, traits, and error definitions for the AgentForge prompt
//! backend. This crate has **no framework dependencies**: it defines the
//! domain model that the provider, store, telemetry, agent and gateway
//! crates implement against.
//!
//! ## Layout
//!
//! Every external collaborator is a trait here, with implementations in
//! their own crates:
//! - [`Provider`]: a chat-completion backend (`agentforge-providers`)
//! - [`AgentRepository`] / [`UsageLog`]: persistence (`agentforge-store`)
//!
//! Tests substitute in-memory or scripted implementations for all of them.

pub mod agent;
pub mod error;
pub mod message;
pub mod provider;
pub mod store;
pub mod usage;

// Re-export key types at crate root for ergonomics
pub use agent::{Agent, AgentPatch, NewAgent};
pub use error::{Error, ProviderError, Result, StoreError};
pub use message::{ChatMessage, Role};
pub use provider::{CompletionResult, Provider, ProviderRequest, ProviderResponse, Usage};
pub use store::{AgentRepository, UsageLog};
pub use usage::UsageRecord;
