use tracing::{debug, warn};

use crate::db::KeyValueStore;
use crate::error::Result;
use crate::models::ApplicationRecord;

pub const DEFAULT_KEY: &str = "jobApplications";

/// What a slot held when it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loaded {
    /// Nothing was ever saved under this key.
    Absent,
    /// The payload was not a JSON array; treated as an empty collection.
    Corrupt,
    Records(Vec<ApplicationRecord>),
}

impl Loaded {
    pub fn into_records(self) -> Vec<ApplicationRecord> {
        match self {
            Loaded::Records(records) => records,
            Loaded::Absent | Loaded::Corrupt => Vec::new(),
        }
    }
}

/// Mirrors the application collection into one named slot as a JSON array.
pub struct Storage<K> {
    kv: K,
    key: String,
}

impl<K: KeyValueStore> Storage<K> {
    pub fn new(kv: K, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &K {
        &self.kv
    }

    /// Read the persisted collection. Only a backend failure is an error;
    /// a missing or unparsable payload yields an empty list, and entries
    /// that do not parse as records are skipped.
    pub fn load(&self) -> Result<Vec<ApplicationRecord>> {
        Ok(self.load_slot()?.into_records())
    }

    pub fn load_slot(&self) -> Result<Loaded> {
        let Some(raw) = self.kv.get(&self.key)? else {
            debug!(key = %self.key, "no persisted applications");
            return Ok(Loaded::Absent);
        };

        let entries = match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    key = %self.key,
                    error = %err,
                    "persisted applications are unreadable, starting empty"
                );
                return Ok(Loaded::Corrupt);
            }
        };

        // A malformed entry is dropped on its own so the rest still load.
        let records: Vec<ApplicationRecord> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                serde_json::from_value::<ApplicationRecord>(entry)
                    .inspect_err(|err| {
                        warn!(
                            key = %self.key,
                            index,
                            error = %err,
                            "skipping unreadable application"
                        );
                    })
                    .ok()
            })
            .collect();
        debug!(key = %self.key, count = records.len(), "loaded applications");
        Ok(Loaded::Records(records))
    }

    /// Full-replace write of the collection.
    pub fn save(&self, records: &[ApplicationRecord]) -> Result<()> {
        let payload = serde_json::to_string(records)?;
        self.kv.set(&self.key, &payload)?;
        debug!(key = %self.key, count = records.len(), "saved applications");
        Ok(())
    }
}
