//! The standard clinical history categories.
//!
//! Entry attribute sets are documented per field for the benefit of the
//! embedding layer; the engine itself only relies on the declared shapes.

use super::{CategorySchema, FieldShape, FieldSpec, SubField};

pub(super) fn standard_categories() -> Vec<CategorySchema> {
    vec![
        allergic(),
        family(),
        personal_pathological(),
        personal_non_pathological(),
        gyneco_obstetric(),
    ]
}

/// Allergy history: one entry list per allergen class.
fn allergic() -> CategorySchema {
    CategorySchema::new(
        "allergic",
        vec![
            // entries: { name, severity }
            FieldSpec::new("medication", 1, FieldShape::EntryList),
            // entries: { name, reaction }
            FieldSpec::new("food", 1, FieldShape::EntryList),
            // entries: { agent, reaction }
            FieldSpec::new("environmental", 1, FieldShape::EntryList),
        ],
    )
}

/// Family history: diseases among relatives.
fn family() -> CategorySchema {
    CategorySchema::new(
        "family",
        vec![
            // entries: { who, typeOfDisease }
            FieldSpec::new("diseases", 1, FieldShape::EntryList),
            // entries: { who, condition, ageAtOnset }
            FieldSpec::new("hereditary", 1, FieldShape::EntryList),
        ],
    )
}

/// Personal pathological history: prior conditions and their treatment.
fn personal_pathological() -> CategorySchema {
    CategorySchema::new(
        "personal-pathological",
        vec![
            FieldSpec::new("bloodType", 1, FieldShape::Scalar),
            // entries: { procedure, year }
            FieldSpec::new("surgeries", 1, FieldShape::EntryList),
            // entries: { medication, dose, frequency }
            FieldSpec::new("chronicMedication", 1, FieldShape::EntryList),
            FieldSpec::new(
                "diagnosedIllnesses",
                2,
                FieldShape::NestedObject(vec![
                    // per-illness medication entries: { medication, dose, frequency }
                    SubField::new("diabetes", FieldShape::EntryList),
                    SubField::new("hypertension", FieldShape::EntryList),
                    SubField::new("asthma", FieldShape::EntryList),
                    // entries: { name, medication, dose, frequency }
                    SubField::new("otherCondition", FieldShape::NestedObjectList),
                ]),
            ),
        ],
    )
}

/// Personal non-pathological history: habits and lifestyle.
fn personal_non_pathological() -> CategorySchema {
    CategorySchema::new(
        "personal-non-pathological",
        vec![
            // entries: { substance, frequency }
            FieldSpec::new("addictions", 1, FieldShape::EntryList),
            FieldSpec::new("exercise", 1, FieldShape::Scalar),
            FieldSpec::new("diet", 1, FieldShape::Scalar),
            FieldSpec::new("occupation", 1, FieldShape::Scalar),
        ],
    )
}

/// Gyneco-obstetric history.
fn gyneco_obstetric() -> CategorySchema {
    CategorySchema::new(
        "gyneco-obstetric",
        vec![
            FieldSpec::new("menarcheAge", 1, FieldShape::Scalar),
            FieldSpec::new("pregnancies", 1, FieldShape::Scalar),
            FieldSpec::new("births", 1, FieldShape::Scalar),
            FieldSpec::new("cesareans", 1, FieldShape::Scalar),
            FieldSpec::new("miscarriages", 1, FieldShape::Scalar),
            // entries: { method, since }
            FieldSpec::new("contraception", 1, FieldShape::EntryList),
            // entries: { kind, date, notes }
            FieldSpec::new("obstetricEvents", 1, FieldShape::NestedObjectList),
        ],
    )
}
