//! Non-destructive-update comparator.
//!
//! Decides, per field, whether a requested payload is an acceptable
//! successor to the persisted one: everything already recorded must still be
//! present under attribute equality; adding and reordering is free.

use crate::{
    models::FieldValue,
    registry::{CategorySchema, FieldShape},
    Error, Result,
};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Find the first field of `saved` that `requested` would destroy.
///
/// `requested` is the already-merged field set (omitted fields have been
/// replaced by category defaults), so a missing requested field reads as the
/// "no data" payload. Returns the offending field name, or `None` when the
/// update preserves everything.
///
/// A persisted field that is not part of the schema means the registry and
/// the stored data have diverged; that is a configuration error, not a
/// rejection.
pub fn first_destructive_field(
    schema: &CategorySchema,
    saved: &BTreeMap<String, FieldValue>,
    requested: &BTreeMap<String, FieldValue>,
) -> Result<Option<&'static str>> {
    for (name, saved_field) in saved {
        let Some(spec) = schema.field(name) else {
            return Err(Error::Internal(format!(
                "persisted field '{name}' is not part of category '{}'",
                schema.key
            )));
        };
        let requested_data = requested
            .get(name)
            .map(|f| &f.data)
            .unwrap_or(&JsonValue::Null);
        if !is_non_destructive(&spec.shape, &saved_field.data, requested_data) {
            return Ok(Some(spec.name));
        }
    }
    Ok(None)
}

/// True when `requested` is a non-destructive successor of `saved` for a
/// field of the given shape.
pub fn is_non_destructive(shape: &FieldShape, saved: &JsonValue, requested: &JsonValue) -> bool {
    match shape {
        // A previously-set scalar may not change; unset saved data imposes
        // no constraint.
        FieldShape::Scalar => saved.is_null() || saved == requested,
        FieldShape::EntryList | FieldShape::NestedObjectList => {
            entry_list_preserved(saved, requested)
        }
        FieldShape::NestedObject(subs) => {
            let Some(saved_obj) = saved.as_object() else {
                // Malformed saved payloads must be carried over verbatim.
                return saved.is_null() || saved == requested;
            };
            subs.iter().all(|sub| match saved_obj.get(sub.name) {
                // Absent saved sub-attribute: nothing to protect.
                None => true,
                Some(saved_sub) => {
                    let requested_sub = requested.get(sub.name).unwrap_or(&JsonValue::Null);
                    is_non_destructive(&sub.shape, saved_sub, requested_sub)
                }
            })
        }
    }
}

/// Entry-list rule: every saved entry must find a matching candidate in the
/// requested list.
///
/// Candidates are consumed greedily in scan order; the first unconsumed
/// match wins. No attempt is made to find an optimal global matching, so
/// pathological duplicate-entry payloads can be rejected even though a
/// different assignment would satisfy every saved entry.
fn entry_list_preserved(saved: &JsonValue, requested: &JsonValue) -> bool {
    let saved_items = match saved {
        JsonValue::Null => return true,
        JsonValue::Array(items) => items,
        other => return other == requested,
    };
    let requested_items = match requested.as_array() {
        Some(items) => items,
        None => return saved_items.is_empty(),
    };

    let mut consumed = vec![false; requested_items.len()];
    'saved: for saved_entry in saved_items {
        for (idx, candidate) in requested_items.iter().enumerate() {
            if consumed[idx] {
                continue;
            }
            if entry_matches(saved_entry, candidate) {
                consumed[idx] = true;
                continue 'saved;
            }
        }
        return false;
    }
    true
}

/// A saved entry matches a candidate when every named attribute of the saved
/// entry is present in the candidate with an equal value. Attributes only
/// the candidate carries are ignored.
fn entry_matches(saved: &JsonValue, candidate: &JsonValue) -> bool {
    match (saved.as_object(), candidate.as_object()) {
        (Some(saved_attrs), Some(candidate_attrs)) => saved_attrs
            .iter()
            .all(|(key, value)| candidate_attrs.get(key) == Some(value)),
        // Non-object entries are compared wholesale.
        _ => saved == candidate,
    }
}
