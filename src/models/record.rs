use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use uuid::Uuid;

/// One versioned field slot of a history record.
///
/// `version` is a schema/format tag for the slot, persisted verbatim. It is
/// not a concurrency token and is never compared before writing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub version: i64,
    pub data: JsonValue,
}

impl FieldValue {
    pub fn new(version: i64, data: JsonValue) -> Self {
        Self { version, data }
    }
}

/// The full persisted field set for one (subject, category) pair.
///
/// Created on the first accepted write; every later accepted write replaces
/// all fields together. Fields have no lifecycle of their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub subject_id: Uuid,
    pub category: String,
    pub fields: BTreeMap<String, FieldValue>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Convenience accessor for one field's payload.
    pub fn field_data(&self, name: &str) -> Option<&JsonValue> {
        self.fields.get(name).map(|f| &f.data)
    }
}
