//! Record merge builder.

use crate::{models::FieldValue, registry::CategorySchema};
use std::collections::BTreeMap;

/// Build the full field set to persist for one category.
///
/// For each field of the schema the proposed value wins when it is present
/// and its payload is non-null; otherwise the category default is
/// substituted. Defaulting is field-granular only: a partially-filled
/// nested structure is taken as proposed, never patched. Proposed keys
/// outside the schema are dropped: the registry's field list is
/// authoritative for what a record may contain.
pub fn build_record_fields(
    schema: &CategorySchema,
    proposed: &BTreeMap<String, Option<FieldValue>>,
) -> BTreeMap<String, FieldValue> {
    let mut fields = BTreeMap::new();
    for spec in &schema.fields {
        let value = proposed
            .get(spec.name)
            .and_then(|v| v.clone())
            .filter(|v| !v.data.is_null())
            .unwrap_or_else(|| spec.default_value());
        fields.insert(spec.name.to_string(), value);
    }
    fields
}
