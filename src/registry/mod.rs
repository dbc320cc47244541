//! Category schema registry.
//!
//! One declarative table describes every history category: its field names,
//! each field's shape and the default payload substituted when a requester
//! omits the field. The comparator and the merge builder are driven entirely
//! by this registry; they never inspect payloads to guess their shape.

mod categories;

use crate::{models::FieldValue, Error, Result};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// The shape of one field slot, as an explicit sum type.
///
/// The comparator dispatches on this tag; payloads are never duck-typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldShape {
    /// A single scalar value (string, number, boolean).
    Scalar,
    /// An ordered list of fixed-attribute entries.
    EntryList,
    /// One dictionary of named sub-attributes, each with its own shape.
    NestedObject(Vec<SubField>),
    /// A list of objects wrapped in a single field ("otherCondition"-style).
    /// Compared with the entry-list rule.
    NestedObjectList,
}

impl FieldShape {
    /// The "no data" payload for this shape (invariant I3: defaults never
    /// fail the comparator).
    pub fn empty_data(&self) -> JsonValue {
        match self {
            FieldShape::Scalar => JsonValue::Null,
            FieldShape::EntryList | FieldShape::NestedObjectList => JsonValue::Array(Vec::new()),
            FieldShape::NestedObject(subs) => {
                let mut map = serde_json::Map::new();
                for sub in subs {
                    map.insert(sub.name.to_string(), sub.shape.empty_data());
                }
                JsonValue::Object(map)
            }
        }
    }
}

/// One named sub-attribute of a [`FieldShape::NestedObject`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubField {
    pub name: &'static str,
    pub shape: FieldShape,
}

impl SubField {
    pub fn new(name: &'static str, shape: FieldShape) -> Self {
        Self { name, shape }
    }
}

/// One field slot of a category: name, format version tag and shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub version: i64,
    pub shape: FieldShape,
}

impl FieldSpec {
    pub fn new(name: &'static str, version: i64, shape: FieldShape) -> Self {
        Self {
            name,
            version,
            shape,
        }
    }

    /// Pure default-value constructor for this field.
    pub fn default_value(&self) -> FieldValue {
        FieldValue::new(self.version, self.shape.empty_data())
    }
}

/// The fixed, statically-known field set of one history category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySchema {
    pub key: &'static str,
    pub fields: Vec<FieldSpec>,
}

impl CategorySchema {
    pub fn new(key: &'static str, fields: Vec<FieldSpec>) -> Self {
        Self { key, fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The full default field set for a record with no data yet.
    pub fn default_fields(&self) -> BTreeMap<String, FieldValue> {
        self.fields
            .iter()
            .map(|f| (f.name.to_string(), f.default_value()))
            .collect()
    }
}

/// Map from category key to schema, consumed by the gate and the merge
/// builder.
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    categories: BTreeMap<&'static str, CategorySchema>,
}

impl CategoryRegistry {
    pub fn new(categories: Vec<CategorySchema>) -> Self {
        Self {
            categories: categories.into_iter().map(|c| (c.key, c)).collect(),
        }
    }

    /// The standard clinical history categories.
    pub fn standard() -> Self {
        Self::new(categories::standard_categories())
    }

    /// Resolve a category key. An unknown key is a configuration error, not
    /// a user-facing rejection.
    pub fn category(&self, key: &str) -> Result<&CategorySchema> {
        self.categories
            .get(key)
            .ok_or_else(|| Error::UnknownCategory(key.to_string()))
    }

    pub fn categories(&self) -> impl Iterator<Item = &CategorySchema> {
        self.categories.values()
    }
}
