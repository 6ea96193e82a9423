//! A flat JSON file holding one array of records.
//!
//! The whole array is read on every access and rewritten on every mutation.
//! A missing file is created as `[]`. Malformed content, or a document that
//! is not an array, reads as an empty collection; the next write then
//! replaces it. Inside a valid array, elements that do not decode as `T`
//! are skipped by readers but kept verbatim by mutations.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use agentforge_core::error::StoreError;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// One element of the array: a decoded record, or a value kept as found.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Slot<T> {
    Record(T),
    Unrecognized(serde_json::Value),
}

impl<T> Slot<T> {
    pub fn record(&self) -> Option<&T> {
        match self {
            Slot::Record(r) => Some(r),
            Slot::Unrecognized(_) => None,
        }
    }

    pub fn record_mut(&mut self) -> Option<&mut T> {
        match self {
            Slot::Record(r) => Some(r),
            Slot::Unrecognized(_) => None,
        }
    }
}

/// Path-bound reader/writer for a JSON array of `T`.
#[derive(Debug, Clone)]
pub struct JsonArrayFile<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonArrayFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create parent directories and an empty array file if missing.
    pub async fn ensure(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_error(e))?;
            }
        }

        match tokio::fs::try_exists(&self.path).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                debug!(path = %self.path.display(), "Creating empty data file");
                tokio::fs::write(&self.path, "[]")
                    .await
                    .map_err(|e| self.io_error(e))
            }
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Read every decodable record, skipping elements that do not decode.
    pub async fn read_all(&self) -> Result<Vec<T>, StoreError> {
        let slots = self.read_slots().await?;
        Ok(slots
            .into_iter()
            .filter_map(|slot| match slot {
                Slot::Record(r) => Some(r),
                Slot::Unrecognized(_) => None,
            })
            .collect())
    }

    /// Read every element in file order. Corrupt content yields an empty vec.
    pub async fn read_slots(&self) -> Result<Vec<Slot<T>>, StoreError> {
        self.ensure().await?;
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        let parsed: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Malformed data file, treating as empty");
                return Ok(Vec::new());
            }
        };

        let serde_json::Value::Array(elements) = parsed else {
            warn!(path = %self.path.display(), "Data file is not a JSON array, treating as empty");
            return Ok(Vec::new());
        };

        Ok(elements
            .into_iter()
            .enumerate()
            .map(|(index, element)| match T::deserialize(&element) {
                Ok(record) => Slot::Record(record),
                Err(e) => {
                    warn!(path = %self.path.display(), index, error = %e, "Skipping unrecognized record");
                    Slot::Unrecognized(element)
                }
            })
            .collect())
    }

    /// Replace the file with `items`, pretty-printed.
    pub async fn write_all(&self, items: &[T]) -> Result<(), StoreError> {
        self.ensure().await?;
        let content = serde_json::to_string_pretty(items).map_err(|e| StoreError::Encode {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| self.io_error(e))
    }

    /// Replace the file with `slots`, unrecognized elements unchanged.
    pub async fn write_slots(&self, slots: &[Slot<T>]) -> Result<(), StoreError> {
        self.ensure().await?;
        let content = serde_json::to_string_pretty(slots).map_err(|e| StoreError::Encode {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| self.io_error(e))
    }

    fn io_error(&self, e: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        }
    }
}
