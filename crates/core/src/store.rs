//! Persistence traits for agents and usage records.
//!
//! The file-backed implementations read the whole collection on every call
//! and rewrite it on every mutation; in-memory implementations exist for
//! tests. Both live in `agentforge-store`.

use async_trait::async_trait;

use crate::agent::{Agent, AgentPatch, NewAgent};
use crate::error::StoreError;
use crate::usage::UsageRecord;

/// CRUD access to agent records.
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// All agents in storage order.
    async fn list_all(&self) -> Result<Vec<Agent>, StoreError>;

    /// Look up a single agent.
    async fn get_by_id(&self, id: &str) -> Result<Option<Agent>, StoreError>;

    /// Create and persist a new agent.
    async fn create(&self, input: NewAgent) -> Result<Agent, StoreError>;

    /// Merge a patch into an existing agent. `None` if the id is unknown.
    async fn update(&self, id: &str, patch: AgentPatch) -> Result<Option<Agent>, StoreError>;

    /// Delete an agent. `false` if the id is unknown.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

/// Append-only log of usage records.
#[async_trait]
pub trait UsageLog: Send + Sync {
    /// Append a record to the end of the log.
    async fn append(&self, record: UsageRecord) -> Result<(), StoreError>;

    /// All records in append order.
    async fn list_all(&self) -> Result<Vec<UsageRecord>, StoreError>;

    /// Records for one user, in append order. Linear scan.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<UsageRecord>, StoreError> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect())
    }
}
