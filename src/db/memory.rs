//! In-memory `RecordStore` implementation.
//!
//! Implements the same load/compare/write contract as the Postgres store
//! against process-local state. Primary use-case: deterministic tests that
//! drive the full gate without a database; also usable for embedded
//! single-process deployments.

use crate::{
    db::{RecordStore, RecordTransaction},
    models::{FieldValue, Record},
    Result,
};
use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex},
};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    subjects: HashSet<Uuid>,
    records: HashMap<(Uuid, String), Record>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_subject(&self, subject_id: Uuid) {
        self.state.lock().unwrap().subjects.insert(subject_id);
    }

    /// Committed record for a pair, if any. Test convenience.
    pub fn committed_record(&self, subject_id: Uuid, category: &str) -> Option<Record> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(&(subject_id, category.to_string()))
            .cloned()
    }
}

/// Writes are staged locally and only applied to the shared state on
/// commit; a dropped or rolled-back transaction leaves the store unchanged.
pub struct MemoryRecordTransaction {
    state: Arc<Mutex<MemoryState>>,
    staged: Vec<Record>,
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    type Tx = MemoryRecordTransaction;

    async fn begin(&self) -> Result<Self::Tx> {
        Ok(MemoryRecordTransaction {
            state: self.state.clone(),
            staged: Vec::new(),
        })
    }
}

#[async_trait]
impl RecordTransaction for MemoryRecordTransaction {
    async fn subject_exists(&mut self, subject_id: Uuid) -> Result<bool> {
        Ok(self.state.lock().unwrap().subjects.contains(&subject_id))
    }

    async fn load_record(&mut self, subject_id: Uuid, category: &str) -> Result<Option<Record>> {
        // Reads observe this transaction's own staged writes first.
        if let Some(staged) = self
            .staged
            .iter()
            .rev()
            .find(|r| r.subject_id == subject_id && r.category == category)
        {
            return Ok(Some(staged.clone()));
        }
        Ok(self
            .state
            .lock()
            .unwrap()
            .records
            .get(&(subject_id, category.to_string()))
            .cloned())
    }

    async fn write_record(
        &mut self,
        subject_id: Uuid,
        category: &str,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<Record> {
        let record = Record {
            subject_id,
            category: category.to_string(),
            fields,
            updated_at: Utc::now(),
        };
        self.staged.push(record.clone());
        Ok(record)
    }

    async fn commit(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        for record in self.staged.drain(..) {
            state
                .records
                .insert((record.subject_id, record.category.clone()), record);
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.staged.clear();
        Ok(())
    }
}
