//! In-memory repositories, for tests and ephemeral runs.

use agentforge_core::agent::{Agent, AgentPatch, NewAgent};
use agentforge_core::error::StoreError;
use agentforge_core::store::{AgentRepository, UsageLog};
use agentforge_core::usage::UsageRecord;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Agents kept in a `Vec`, in insertion order.
#[derive(Default)]
pub struct InMemoryAgentStore {
    agents: RwLock<Vec<Agent>>,
}

impl InMemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentRepository for InMemoryAgentStore {
    async fn list_all(&self) -> Result<Vec<Agent>, StoreError> {
        Ok(self.agents.read().await.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Agent>, StoreError> {
        Ok(self.agents.read().await.iter().find(|a| a.id == id).cloned())
    }

    async fn create(&self, input: NewAgent) -> Result<Agent, StoreError> {
        let agent = Agent::new(input);
        self.agents.write().await.push(agent.clone());
        Ok(agent)
    }

    async fn update(&self, id: &str, patch: AgentPatch) -> Result<Option<Agent>, StoreError> {
        let mut agents = self.agents.write().await;
        Ok(agents.iter_mut().find(|a| a.id == id).map(|agent| {
            agent.apply(patch);
            agent.clone()
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut agents = self.agents.write().await;
        let before = agents.len();
        agents.retain(|a| a.id != id);
        Ok(agents.len() < before)
    }
}

#[derive(Default)]
pub struct InMemoryUsageLog {
    records: RwLock<Vec<UsageRecord>>,
}

impl InMemoryUsageLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageLog for InMemoryUsageLog {
    async fn append(&self, record: UsageRecord) -> Result<(), StoreError> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<UsageRecord>, StoreError> {
        Ok(self.records.read().await.clone())
    }
}
