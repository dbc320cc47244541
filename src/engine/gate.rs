//! Authorization gate: the per-request state machine.
//!
//! A request resolves its actor role, then runs load, compare, merge and
//! write inside one store transaction; clinicians skip the compare step.
//! Every terminal state maps onto one [`Error`] kind or an accepted
//! [`Record`]. There is no retry loop here; retries, if any, belong to the
//! caller.

use crate::{
    db::{RecordStore, RecordTransaction},
    engine::{build_record_fields, first_destructive_field},
    identity::ActorResolver,
    models::{ActorRole, FieldValue, Record, UpdateEnvelope, UpdateOutcome},
    registry::{CategoryRegistry, CategorySchema},
    Error, Result,
};
use std::collections::BTreeMap;
use uuid::Uuid;

/// The history engine service: schema registry plus a transactional record
/// store.
pub struct HistoryService<S: RecordStore> {
    store: S,
    registry: CategoryRegistry,
}

impl<S: RecordStore> HistoryService<S> {
    /// Service over the standard category set.
    pub fn new(store: S) -> Self {
        Self::with_registry(store, CategoryRegistry::standard())
    }

    pub fn with_registry(store: S, registry: CategoryRegistry) -> Self {
        Self { store, registry }
    }

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    /// Apply an update and fold the result into the response envelope for
    /// the embedding layer.
    pub async fn submit(&self, envelope: UpdateEnvelope) -> UpdateOutcome {
        UpdateOutcome::from_result(self.apply_update(envelope).await)
    }

    /// Apply one update request.
    ///
    /// Envelope and role problems are rejected before a transaction is
    /// opened. Inside the transaction: subject existence check, load,
    /// per-field comparison (skipped for clinicians), merge, write. Any
    /// failure rolls the transaction back; nothing is ever partially
    /// committed.
    pub async fn apply_update(&self, envelope: UpdateEnvelope) -> Result<Record> {
        let subject_id = envelope
            .subject_id
            .ok_or_else(|| Error::ClientInput("missing subjectId".to_string()))?;
        if envelope.category.trim().is_empty() {
            return Err(Error::ClientInput("missing category".to_string()));
        }
        let role = envelope
            .actor_role
            .ok_or_else(|| Error::NotAuthorized("missing actor role".to_string()))?;
        let schema = self.registry.category(&envelope.category)?;

        tracing::debug!(
            subject = %subject_id,
            category = schema.key,
            role = ?role,
            "applying history update"
        );

        let mut tx = self.store.begin().await?;
        match Self::run_update(&mut tx, schema, subject_id, role, &envelope.fields).await {
            Ok(record) => {
                tx.commit().await?;
                tracing::info!(
                    subject = %subject_id,
                    category = schema.key,
                    "history record written"
                );
                Ok(record)
            }
            Err(err) => {
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }

    /// Resolve the actor through the external identity collaborator, then
    /// apply the update under the resolved role. Any resolution failure is a
    /// hard rejection before Load.
    pub async fn apply_update_as(
        &self,
        resolver: &dyn ActorResolver,
        credential: &str,
        mut envelope: UpdateEnvelope,
    ) -> Result<Record> {
        let actor = resolver
            .resolve(credential)
            .await
            .map_err(|e| Error::NotAuthorized(e.to_string()))?;
        envelope.actor_role = Some(actor.role);
        self.apply_update(envelope).await
    }

    /// Read back the persisted record for one category. `Ok(None)` means
    /// "no history yet", which is not an error.
    pub async fn get_record(&self, subject_id: Uuid, category: &str) -> Result<Option<Record>> {
        let schema = self.registry.category(category)?;
        let mut tx = self.store.begin().await?;
        match Self::load_checked(&mut tx, subject_id, schema).await {
            Ok(record) => {
                tx.commit().await?;
                Ok(record)
            }
            Err(err) => {
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }

    /// Read back every persisted record for a subject, in category key
    /// order. Categories without history are skipped.
    pub async fn list_records(&self, subject_id: Uuid) -> Result<Vec<Record>> {
        let mut tx = self.store.begin().await?;
        let mut records = Vec::new();
        for schema in self.registry.categories() {
            match Self::load_checked(&mut tx, subject_id, schema).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(err) => {
                    let _ = tx.rollback().await;
                    return Err(err);
                }
            }
        }
        tx.commit().await?;
        Ok(records)
    }

    async fn run_update(
        tx: &mut S::Tx,
        schema: &CategorySchema,
        subject_id: Uuid,
        role: ActorRole,
        proposed: &BTreeMap<String, Option<FieldValue>>,
    ) -> Result<Record> {
        if !tx.subject_exists(subject_id).await? {
            return Err(Error::SubjectNotFound { subject_id });
        }

        let merged = build_record_fields(schema, proposed);

        // Clinicians rewrite freely; everyone else must preserve what is
        // already recorded. A first submission has nothing to protect.
        if role != ActorRole::Clinician {
            if let Some(saved) = tx.load_record(subject_id, schema.key).await? {
                if let Some(field) = first_destructive_field(schema, &saved.fields, &merged)? {
                    tracing::debug!(
                        subject = %subject_id,
                        category = schema.key,
                        field,
                        "rejecting destructive update"
                    );
                    return Err(Error::DestructiveUpdate {
                        category: schema.key.to_string(),
                        field: field.to_string(),
                    });
                }
            }
        }

        tx.write_record(subject_id, schema.key, merged).await
    }

    async fn load_checked(
        tx: &mut S::Tx,
        subject_id: Uuid,
        schema: &CategorySchema,
    ) -> Result<Option<Record>> {
        if !tx.subject_exists(subject_id).await? {
            return Err(Error::SubjectNotFound { subject_id });
        }
        tx.load_record(subject_id, schema.key).await
    }
}
