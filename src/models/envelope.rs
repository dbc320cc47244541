use crate::{
    models::{FieldValue, Record},
    Error,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Actor roles recognised by the authorization gate.
///
/// Clinicians bypass the non-destructive-update check; subjects may only add
/// to what is already recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Clinician,
    Subject,
}

/// Incoming update request, as produced by the (external) request-handling
/// layer.
///
/// `subject_id` and `actor_role` are optional at the type level so that a
/// malformed envelope reaches the gate and is rejected with the proper error
/// kind instead of failing deserialization opaquely upstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEnvelope {
    pub subject_id: Option<Uuid>,
    pub category: String,
    pub actor_role: Option<ActorRole>,
    /// Proposed fields. Omitted fields and explicit nulls fall back to the
    /// category defaults at merge time.
    #[serde(default)]
    pub fields: BTreeMap<String, Option<FieldValue>>,
}

/// Outcome envelope handed back to the (external) request-handling layer.
///
/// The mapping onto transport status codes is the embedding layer's job; the
/// engine only preserves the distinction between the four terminal states.
#[derive(Debug)]
pub enum UpdateOutcome {
    Accepted(Record),
    Rejected { category: String, field: String },
    NotAuthorized { reason: String },
    Failed(Error),
}

impl UpdateOutcome {
    pub fn from_result(result: crate::Result<Record>) -> Self {
        match result {
            Ok(record) => UpdateOutcome::Accepted(record),
            Err(Error::DestructiveUpdate { category, field }) => {
                UpdateOutcome::Rejected { category, field }
            }
            Err(Error::NotAuthorized(reason)) => UpdateOutcome::NotAuthorized { reason },
            Err(err) => UpdateOutcome::Failed(err),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, UpdateOutcome::Accepted(_))
    }
}
