use chrono::Utc;
use tracing::{debug, info};

use crate::db::KeyValueStore;
use crate::error::{Error, Result};
use crate::models::{ApplicationFields, ApplicationRecord};
use crate::storage::{Loaded, Storage};

/// Owns the application collection and keeps its persisted mirror in step.
///
/// Every mutation is saved before it returns. When the save fails the
/// in-memory change is undone, so memory and storage never disagree.
pub struct Store<K> {
    records: Vec<ApplicationRecord>,
    storage: Storage<K>,
}

impl<K: KeyValueStore> Store<K> {
    /// Load from storage. `defaults` is used only when nothing was ever
    /// persisted; an unreadable slot starts empty.
    pub fn open(storage: Storage<K>, defaults: Vec<ApplicationRecord>) -> Result<Self> {
        let records = match storage.load_slot()? {
            Loaded::Absent => defaults,
            loaded => loaded.into_records(),
        };
        debug!(count = records.len(), "store opened");
        Ok(Self { records, storage })
    }

    pub fn list(&self) -> &[ApplicationRecord] {
        &self.records
    }

    pub fn get(&self, id: i64) -> Option<&ApplicationRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn storage(&self) -> &Storage<K> {
        &self.storage
    }

    pub fn add(&mut self, fields: ApplicationFields) -> Result<ApplicationRecord> {
        validate(&fields)?;
        let record = ApplicationRecord::from_fields(self.next_id()?, fields);
        self.records.push(record.clone());

        if let Err(err) = self.persist() {
            self.records.pop();
            return Err(err);
        }
        info!(id = record.id, company = %record.company, "application added");
        Ok(record)
    }

    pub fn update(&mut self, id: i64, fields: ApplicationFields) -> Result<ApplicationRecord> {
        validate(&fields)?;
        let idx = self.index_of(id).ok_or(Error::NotFound(id))?;

        let previous = self.records[idx].clone();
        self.records[idx].apply(fields);

        if let Err(err) = self.persist() {
            self.records[idx] = previous;
            return Err(err);
        }
        info!(id, "application updated");
        Ok(self.records[idx].clone())
    }

    /// Returns whether anything was deleted.
    pub fn remove(&mut self, id: i64) -> Result<bool> {
        let Some(idx) = self.index_of(id) else {
            debug!(id, "remove: no such application");
            return Ok(false);
        };

        let removed = self.records.remove(idx);
        if let Err(err) = self.persist() {
            self.records.insert(idx, removed);
            return Err(err);
        }
        info!(id, "application removed");
        Ok(true)
    }

    /// Append several records at once, giving each a fresh id.
    pub fn extend(&mut self, records: Vec<ApplicationRecord>) -> Result<usize> {
        let before = self.records.len();
        for record in records {
            let id = match self.next_id() {
                Ok(id) => id,
                Err(err) => {
                    self.records.truncate(before);
                    return Err(err);
                }
            };
            self.records.push(ApplicationRecord { id, ..record });
        }

        if let Err(err) = self.persist() {
            self.records.truncate(before);
            return Err(err);
        }
        Ok(self.records.len() - before)
    }

    fn persist(&self) -> Result<()> {
        self.storage.save(&self.records)
    }

    fn index_of(&self, id: i64) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    /// Millisecond timestamp, bumped past the largest id already in use.
    fn next_id(&self) -> Result<i64> {
        let now = Utc::now().timestamp_millis();
        match self.records.iter().map(|r| r.id).max() {
            Some(max) if max >= now => max.checked_add(1).ok_or(Error::IdsExhausted(max)),
            _ => Ok(now),
        }
    }
}

fn validate(fields: &ApplicationFields) -> Result<()> {
    if fields.company.trim().is_empty() {
        return Err(Error::ValidationMissing("company"));
    }
    if fields.title.trim().is_empty() {
        return Err(Error::ValidationMissing("title"));
    }
    Ok(())
}
