//! File-backed agent repository.
//!
//! Storage location: `<data_dir>/agents.json`, a pretty-printed JSON array.
//! Each mutation holds the store's lock across its read-modify-write, so
//! calls within one process never lose updates. Separate processes sharing
//! the file are not coordinated.

use std::path::PathBuf;

use agentforge_core::agent::{Agent, AgentPatch, NewAgent};
use agentforge_core::error::StoreError;
use agentforge_core::store::AgentRepository;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::json_file::{JsonArrayFile, Slot};

pub struct FileAgentStore {
    file: JsonArrayFile<Agent>,
    lock: Mutex<()>,
}

impl FileAgentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonArrayFile::new(path),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        self.file.path()
    }
}

#[async_trait]
impl AgentRepository for FileAgentStore {
    async fn list_all(&self) -> Result<Vec<Agent>, StoreError> {
        let _guard = self.lock.lock().await;
        self.file.read_all().await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Agent>, StoreError> {
        let _guard = self.lock.lock().await;
        let agents = self.file.read_all().await?;
        Ok(agents.into_iter().find(|a| a.id == id))
    }

    async fn create(&self, input: NewAgent) -> Result<Agent, StoreError> {
        let _guard = self.lock.lock().await;
        let mut slots = self.file.read_slots().await?;
        let agent = Agent::new(input);
        slots.push(Slot::Record(agent.clone()));
        self.file.write_slots(&slots).await?;
        debug!(id = %agent.id, name = %agent.name, "Agent created");
        Ok(agent)
    }

    async fn update(&self, id: &str, patch: AgentPatch) -> Result<Option<Agent>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut slots = self.file.read_slots().await?;
        let Some(agent) = slots
            .iter_mut()
            .filter_map(Slot::record_mut)
            .find(|a| a.id == id)
        else {
            return Ok(None);
        };
        agent.apply(patch);
        let updated = agent.clone();
        self.file.write_slots(&slots).await?;
        debug!(id = %updated.id, "Agent updated");
        Ok(Some(updated))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut slots = self.file.read_slots().await?;
        let before = slots.len();
        slots.retain(|slot| slot.record().is_none_or(|a| a.id != id));
        if slots.len() == before {
            return Ok(false);
        }
        self.file.write_slots(&slots).await?;
        debug!(id, "Agent deleted");
        Ok(true)
    }
}
