//! File-backed usage log at `<data_dir>/token-usage.json`.

use std::path::PathBuf;

use agentforge_core::error::StoreError;
use agentforge_core::store::UsageLog;
use agentforge_core::usage::UsageRecord;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::json_file::{JsonArrayFile, Slot};

/// Append-only usage log. Appends rewrite the whole file.
pub struct FileUsageLog {
    file: JsonArrayFile<UsageRecord>,
    lock: Mutex<()>,
}

impl FileUsageLog {
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
impl UsageLog for FileUsageLog {
    async fn append(&self, record: UsageRecord) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut slots = self.file.read_slots().await?;
        slots.push(Slot::Record(record));
        self.file.write_slots(&slots).await
    }

    async fn list_all(&self) -> Result<Vec<UsageRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        self.file.read_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn filters_by_user_in_append_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileUsageLog::new(dir.path().join("token-usage.json"));

        log.append(UsageRecord::new("u", 1, 0, 0.0)).await.unwrap();
        log.append(UsageRecord::new("other", 9, 9, 0.0)).await.unwrap();
        log.append(UsageRecord::new("u", 2, 0, 0.0)).await.unwrap();
        log.append(UsageRecord::new("u", 3, 0, 0.0)).await.unwrap();

        let records = log.list_by_user("u").await.unwrap();
        let inputs: Vec<u32> = records.iter().map(|r| r.tokens_input).collect();
        assert_eq!(inputs, vec![1, 2, 3]);
        assert_eq!(log.list_all().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn unknown_user_has_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileUsageLog::new(dir.path().join("token-usage.json"));
        log.append(UsageRecord::new("u", 1, 1, 0.0)).await.unwrap();
        assert!(log.list_by_user("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_uses_camel_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileUsageLog::new(dir.path().join("token-usage.json"));
        log.append(UsageRecord::new("u", 1234, 567, 0.014675)).await.unwrap();

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert!(raw.contains("\"userId\": \"u\""));
        assert!(raw.contains("\"tokensInput\": 1234"));
        assert!(raw.contains("\"tokensOutput\": 567"));
    }
}
