//! End-to-end tests for the update-authorization flow: the gate, the
//! comparator and the merge builder driven through the in-memory store.

use anamnese::{
    db::InMemoryRecordStore,
    identity::{Actor, StaticActorResolver},
    models::{ActorRole, FieldValue, UpdateEnvelope, UpdateOutcome},
    Error, HistoryService,
};
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use uuid::Uuid;

fn service() -> (HistoryService<InMemoryRecordStore>, InMemoryRecordStore, Uuid) {
    let store = InMemoryRecordStore::new();
    let subject_id = Uuid::new_v4();
    store.register_subject(subject_id);
    (HistoryService::new(store.clone()), store, subject_id)
}

fn envelope(
    subject_id: Uuid,
    category: &str,
    role: ActorRole,
    fields: &[(&str, JsonValue)],
) -> UpdateEnvelope {
    UpdateEnvelope {
        subject_id: Some(subject_id),
        category: category.to_string(),
        actor_role: Some(role),
        fields: fields
            .iter()
            .map(|(name, data)| (name.to_string(), Some(FieldValue::new(1, data.clone()))))
            .collect(),
    }
}

fn ibuprofen_moderate() -> JsonValue {
    json!([{ "name": "Ibuprofen", "severity": "Moderate" }])
}

/// Seed the allergic category with one medication entry, as a subject's
/// first submission.
async fn seed_allergic(service: &HistoryService<InMemoryRecordStore>, subject_id: Uuid) {
    service
        .apply_update(envelope(
            subject_id,
            "allergic",
            ActorRole::Subject,
            &[("medication", ibuprofen_moderate())],
        ))
        .await
        .expect("first submission must be accepted");
}

// --- scenarios ---

#[tokio::test]
async fn appending_a_new_entry_is_accepted() {
    let (service, _, subject_id) = service();
    seed_allergic(&service, subject_id).await;

    let record = service
        .apply_update(envelope(
            subject_id,
            "allergic",
            ActorRole::Subject,
            &[(
                "medication",
                json!([
                    { "name": "Ibuprofen", "severity": "Moderate" },
                    { "name": "Penicillin", "severity": "Severe" },
                ]),
            )],
        ))
        .await
        .unwrap();

    assert_eq!(
        record.field_data("medication").unwrap().as_array().unwrap().len(),
        2
    );
}

#[tokio::test]
async fn dropping_an_entry_is_rejected_and_nothing_is_written() {
    let (service, store, subject_id) = service();
    seed_allergic(&service, subject_id).await;

    let err = service
        .apply_update(envelope(
            subject_id,
            "allergic",
            ActorRole::Subject,
            &[("medication", json!([{ "name": "Penicillin", "severity": "Severe" }]))],
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::DestructiveUpdate { ref category, ref field }
            if category == "allergic" && field == "medication"
    ));

    // The persisted record is untouched.
    let record = store.committed_record(subject_id, "allergic").unwrap();
    assert_eq!(record.field_data("medication").unwrap(), &ibuprofen_moderate());
}

#[tokio::test]
async fn mutating_an_existing_entry_is_rejected() {
    let (service, _, subject_id) = service();
    seed_allergic(&service, subject_id).await;

    let err = service
        .apply_update(envelope(
            subject_id,
            "allergic",
            ActorRole::Subject,
            &[("medication", json!([{ "name": "Ibuprofen", "severity": "Severe" }]))],
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::DestructiveUpdate { .. }));
}

#[tokio::test]
async fn a_clinician_may_rewrite_existing_entries() {
    let (service, _, subject_id) = service();
    seed_allergic(&service, subject_id).await;

    let record = service
        .apply_update(envelope(
            subject_id,
            "allergic",
            ActorRole::Clinician,
            &[("medication", json!([{ "name": "Ibuprofen", "severity": "Severe" }]))],
        ))
        .await
        .unwrap();

    assert_eq!(
        record.field_data("medication").unwrap(),
        &json!([{ "name": "Ibuprofen", "severity": "Severe" }])
    );
}

#[tokio::test]
async fn first_submission_creates_a_record_with_defaults_filled() {
    let (service, store, subject_id) = service();

    let record = service
        .apply_update(envelope(
            subject_id,
            "gyneco-obstetric",
            ActorRole::Subject,
            &[("pregnancies", json!(2))],
        ))
        .await
        .unwrap();

    assert_eq!(record.field_data("pregnancies").unwrap(), &json!(2));
    // Omitted fields carry the category defaults, not nulls-for-lists.
    assert_eq!(record.field_data("contraception").unwrap(), &json!([]));
    assert_eq!(record.field_data("obstetricEvents").unwrap(), &json!([]));
    assert_eq!(record.field_data("menarcheAge").unwrap(), &JsonValue::Null);
    assert!(store.committed_record(subject_id, "gyneco-obstetric").is_some());
}

// --- properties ---

#[tokio::test]
async fn any_first_submission_is_accepted_regardless_of_role() {
    for role in [ActorRole::Subject, ActorRole::Clinician] {
        let (service, _, subject_id) = service();
        let result = service
            .apply_update(envelope(
                subject_id,
                "family",
                role,
                &[("diseases", json!([{ "who": "mother", "typeOfDisease": "diabetes" }]))],
            ))
            .await;
        assert!(result.is_ok(), "first submission rejected for {role:?}");
    }
}

#[tokio::test]
async fn resubmitting_the_accepted_record_is_a_no_op_accept() {
    let (service, _, subject_id) = service();
    seed_allergic(&service, subject_id).await;

    let record = service.get_record(subject_id, "allergic").await.unwrap().unwrap();
    let resubmission = UpdateEnvelope {
        subject_id: Some(subject_id),
        category: record.category.clone(),
        actor_role: Some(ActorRole::Subject),
        fields: record
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), Some(value.clone())))
            .collect(),
    };

    let replayed = service.apply_update(resubmission).await.unwrap();
    assert_eq!(replayed.fields, record.fields);
}

#[tokio::test]
async fn a_clinician_may_reset_a_category_to_defaults() {
    let (service, _, subject_id) = service();
    seed_allergic(&service, subject_id).await;

    let record = service
        .apply_update(envelope(subject_id, "allergic", ActorRole::Clinician, &[]))
        .await
        .unwrap();

    assert_eq!(record.field_data("medication").unwrap(), &json!([]));
}

#[tokio::test]
async fn a_subject_omitting_a_populated_field_is_rejected() {
    // Default substitution happens at merge time, so omission reads as the
    // empty payload and cannot silently erase recorded data.
    let (service, _, subject_id) = service();
    seed_allergic(&service, subject_id).await;

    let err = service
        .apply_update(envelope(
            subject_id,
            "allergic",
            ActorRole::Subject,
            &[("food", json!([{ "name": "peanuts", "reaction": "hives" }]))],
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::DestructiveUpdate { ref field, .. } if field == "medication"
    ));
}

#[tokio::test]
async fn nested_sub_structures_are_protected_per_attribute() {
    let (service, _, subject_id) = service();

    service
        .apply_update(envelope(
            subject_id,
            "personal-pathological",
            ActorRole::Subject,
            &[(
                "diagnosedIllnesses",
                json!({
                    "diabetes": [{ "medication": "Metformin", "dose": "500mg", "frequency": "daily" }],
                    "hypertension": [],
                    "asthma": [],
                    "otherCondition": [{ "name": "gout", "medication": "Allopurinol" }],
                }),
            )],
        ))
        .await
        .unwrap();

    // Appending to one sub-list while preserving the rest is fine.
    let appended = service
        .apply_update(envelope(
            subject_id,
            "personal-pathological",
            ActorRole::Subject,
            &[(
                "diagnosedIllnesses",
                json!({
                    "diabetes": [
                        { "medication": "Metformin", "dose": "500mg", "frequency": "daily" },
                        { "medication": "Insulin", "dose": "10u", "frequency": "nightly" },
                    ],
                    "hypertension": [],
                    "asthma": [],
                    "otherCondition": [{ "name": "gout", "medication": "Allopurinol" }],
                }),
            )],
        ))
        .await
        .unwrap();
    assert_eq!(
        appended.field_data("diagnosedIllnesses").unwrap()["diabetes"]
            .as_array()
            .unwrap()
            .len(),
        2
    );

    // Rewriting a wrapped-list entry is not.
    let err = service
        .apply_update(envelope(
            subject_id,
            "personal-pathological",
            ActorRole::Subject,
            &[(
                "diagnosedIllnesses",
                json!({
                    "diabetes": [
                        { "medication": "Metformin", "dose": "500mg", "frequency": "daily" },
                        { "medication": "Insulin", "dose": "10u", "frequency": "nightly" },
                    ],
                    "hypertension": [],
                    "asthma": [],
                    "otherCondition": [{ "name": "gout", "medication": "Colchicine" }],
                }),
            )],
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::DestructiveUpdate { ref field, .. } if field == "diagnosedIllnesses"
    ));
}

#[tokio::test]
async fn a_previously_set_scalar_cannot_be_changed_by_a_subject() {
    let (service, _, subject_id) = service();

    service
        .apply_update(envelope(
            subject_id,
            "personal-pathological",
            ActorRole::Clinician,
            &[("bloodType", json!("O+"))],
        ))
        .await
        .unwrap();

    let err = service
        .apply_update(envelope(
            subject_id,
            "personal-pathological",
            ActorRole::Subject,
            &[("bloodType", json!("AB-"))],
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::DestructiveUpdate { ref field, .. } if field == "bloodType"
    ));

    // Restating the recorded value is fine.
    service
        .apply_update(envelope(
            subject_id,
            "personal-pathological",
            ActorRole::Subject,
            &[("bloodType", json!("O+"))],
        ))
        .await
        .unwrap();
}

// --- envelopes ---

#[tokio::test]
async fn outcome_envelope_preserves_the_terminal_state() {
    let (service, _, subject_id) = service();
    seed_allergic(&service, subject_id).await;

    let accepted = service
        .submit(envelope(
            subject_id,
            "allergic",
            ActorRole::Subject,
            &[("medication", ibuprofen_moderate())],
        ))
        .await;
    assert!(accepted.is_accepted());

    let rejected = service
        .submit(envelope(subject_id, "allergic", ActorRole::Subject, &[]))
        .await;
    match rejected {
        UpdateOutcome::Rejected { category, field } => {
            assert_eq!(category, "allergic");
            assert_eq!(field, "medication");
        }
        other => panic!("expected rejection, got {other:?}"),
    }

    let unauthorized = service
        .submit(UpdateEnvelope {
            subject_id: Some(subject_id),
            category: "allergic".to_string(),
            actor_role: None,
            fields: BTreeMap::new(),
        })
        .await;
    assert!(matches!(unauthorized, UpdateOutcome::NotAuthorized { .. }));
}

#[tokio::test]
async fn credential_resolution_feeds_the_role_branch() {
    let (service, _, subject_id) = service();
    seed_allergic(&service, subject_id).await;

    let mut resolver = StaticActorResolver::new();
    resolver.insert(
        "clinician-token",
        Actor {
            email: "dr.gray@example.org".to_string(),
            role: ActorRole::Clinician,
        },
    );
    resolver.insert(
        "subject-token",
        Actor {
            email: "pat@example.org".to_string(),
            role: ActorRole::Subject,
        },
    );

    let rewrite = envelope(
        subject_id,
        "allergic",
        ActorRole::Subject, // overwritten by the resolver
        &[("medication", json!([{ "name": "Ibuprofen", "severity": "Severe" }]))],
    );

    // Subject credential: the destructive rewrite is rejected.
    let err = service
        .apply_update_as(&resolver, "subject-token", rewrite.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DestructiveUpdate { .. }));

    // Clinician credential: the same payload goes through.
    service
        .apply_update_as(&resolver, "clinician-token", rewrite.clone())
        .await
        .unwrap();

    // Unknown credential: hard rejection before anything is loaded.
    let err = service
        .apply_update_as(&resolver, "expired-token", rewrite)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotAuthorized(_)));
}

// --- read path ---

#[tokio::test]
async fn list_records_returns_only_categories_with_history() {
    let (service, _, subject_id) = service();
    seed_allergic(&service, subject_id).await;
    service
        .apply_update(envelope(
            subject_id,
            "family",
            ActorRole::Subject,
            &[("diseases", json!([{ "who": "father", "typeOfDisease": "asthma" }]))],
        ))
        .await
        .unwrap();

    let records = service.list_records(subject_id).await.unwrap();
    let mut categories: Vec<&str> = records.iter().map(|r| r.category.as_str()).collect();
    categories.sort_unstable();
    assert_eq!(categories, vec!["allergic", "family"]);
}

#[tokio::test]
async fn categories_are_independent_records() {
    let (service, _, subject_id) = service();
    seed_allergic(&service, subject_id).await;

    // A rejection in one category leaves another category writable.
    service
        .apply_update(envelope(subject_id, "allergic", ActorRole::Subject, &[]))
        .await
        .unwrap_err();

    service
        .apply_update(envelope(
            subject_id,
            "personal-non-pathological",
            ActorRole::Subject,
            &[("exercise", json!("3x weekly"))],
        ))
        .await
        .unwrap();
}
