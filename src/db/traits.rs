//! Boundary contract between the authorization gate and the backing store.

use crate::{models::FieldValue, models::Record, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use uuid::Uuid;

/// A store that can open transactional scopes over history records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    type Tx: RecordTransaction;

    /// Open a transaction. Everything the gate does for one request (load,
    /// compare, write) happens inside a single scope so that no other
    /// writer's commit becomes visible mid-sequence.
    async fn begin(&self) -> Result<Self::Tx>;
}

/// One open transactional scope.
///
/// Dropping a transaction without calling [`commit`](Self::commit) must
/// leave the store unchanged.
#[async_trait]
pub trait RecordTransaction: Send {
    /// Whether the subject has an identity record at all. Absence of
    /// history is not an error; absence of identity is.
    async fn subject_exists(&mut self, subject_id: Uuid) -> Result<bool>;

    /// Load the current record for a (subject, category) pair, if any.
    async fn load_record(&mut self, subject_id: Uuid, category: &str) -> Result<Option<Record>>;

    /// Insert-or-replace the full field set for a (subject, category) pair.
    /// Visible to other transactions only after [`commit`](Self::commit).
    async fn write_record(
        &mut self,
        subject_id: Uuid,
        category: &str,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<Record>;

    /// Commit the scope. The transaction is finished afterwards; further
    /// calls on it are an error.
    async fn commit(&mut self) -> Result<()>;

    /// Roll the scope back, discarding every staged write.
    async fn rollback(&mut self) -> Result<()>;
}
