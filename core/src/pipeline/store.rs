use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// The durable slice of the pipeline: research, script, keywords and the
/// write time in epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    #[serde(default, alias = "researchData")]
    pub research_text: String,
    #[serde(default, alias = "podcastScript")]
    pub script_text: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub timestamp: i64,
}

impl PersistedRecord {
    pub fn is_empty(&self) -> bool {
        self.research_text.is_empty() && self.script_text.is_empty() && self.keywords.is_empty()
    }

    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Whole minutes elapsed since the save, rounded down, never negative.
    pub fn minutes_since(&self, now: DateTime<Utc>) -> i64 {
        (now.timestamp_millis() - self.timestamp).max(0) / 60_000
    }

    pub fn stamped(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = at.timestamp_millis();
        self
    }
}

/// A single durable slot holding at most one record.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn load(&self) -> Result<Option<PersistedRecord>, StoreError>;
    async fn save(&self, record: &PersistedRecord) -> Result<(), StoreError>;
    async fn delete(&self) -> Result<(), StoreError>;
}

/// In-process store. Keeps the history of writes.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<PersistedRecord>>,
    writes: Mutex<Vec<PersistedRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: PersistedRecord) -> Self {
        Self {
            slot: Mutex::new(Some(record)),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().map(|w| w.len()).unwrap_or(0)
    }

    pub fn writes(&self) -> Vec<PersistedRecord> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn current(&self) -> Option<PersistedRecord> {
        self.slot.lock().ok().and_then(|s| s.clone())
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn load(&self) -> Result<Option<PersistedRecord>, StoreError> {
        Ok(self.current())
    }

    async fn save(&self, record: &PersistedRecord) -> Result<(), StoreError> {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(record.clone());
        }
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(record.clone());
        }
        Ok(())
    }

    async fn delete(&self) -> Result<(), StoreError> {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
        Ok(())
    }
}
