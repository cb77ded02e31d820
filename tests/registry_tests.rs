/// Field registry and field definition cache tests
///
/// Run with: cargo test --test registry_tests

mod common;

use common::setup;
use dynafield::{DbError, Dynamo, DynamoConfig, FieldType, InMemoryStorage, StorageEngine};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn test_add_field_is_listed_once() {
    let (dynamo, _) = setup();

    for (name, ty) in [("rating", FieldType::Number), ("summary", FieldType::Text), ("score", FieldType::Decimal)] {
        dynamo.add_field("Review", name, ty).unwrap();
        let fields = dynamo.list_fields("Review").unwrap();
        assert_eq!(fields.iter().filter(|f| *f == name).count(), 1);
    }

    assert_eq!(dynamo.list_fields("Review").unwrap(), vec!["rating", "summary", "score"]);
}

#[test]
fn test_duplicate_field_leaves_registry_unchanged() {
    let (dynamo, storage) = setup();
    dynamo.add_field("Review", "rating", FieldType::Number).unwrap();

    let err = dynamo.add_field("Review", "rating", FieldType::Decimal).unwrap_err();
    assert!(matches!(
        err,
        DbError::DuplicateField { ref model_type, ref field_name } if model_type == "Review" && field_name == "rating"
    ));
    assert_eq!(storage.definition_count().unwrap(), 1);
    assert_eq!(
        dynamo.fields_for("Review").unwrap().get("rating").unwrap().value_type,
        FieldType::Number
    );
}

#[test]
fn test_same_name_on_different_models() {
    let (dynamo, _) = setup();
    dynamo.add_field("Review", "color", FieldType::Text).unwrap();
    dynamo.add_field("Product", "color", FieldType::Text).unwrap();

    assert_eq!(dynamo.list_fields("Review").unwrap(), vec!["color"]);
    assert_eq!(dynamo.list_fields("Product").unwrap(), vec!["color"]);
}

#[test]
fn test_unknown_field_type_tag() {
    let (dynamo, storage) = setup();
    let err = dynamo.add_field_by_tag("Review", "published", "Date").unwrap_err();
    assert!(matches!(err, DbError::UnknownFieldType(ref tag) if tag == "Date"));
    assert_eq!(storage.definition_count().unwrap(), 0);

    let def = dynamo.add_field_by_tag("Review", "rating", "number").unwrap();
    assert_eq!(def.value_type, FieldType::Number);
    assert_eq!(def.column().column_name(), "val_int");
}

#[test]
fn test_remove_missing_field_is_not_an_error() {
    let (dynamo, _) = setup();
    assert!(!dynamo.remove_field("Review", "nothing").unwrap());
}

#[test]
fn test_list_fields_is_stable_without_mutation() {
    let (dynamo, storage) = setup();
    dynamo.add_field("Review", "a", FieldType::Text).unwrap();
    dynamo.add_field("Review", "b", FieldType::Text).unwrap();

    let first = dynamo.list_fields("Review").unwrap();
    storage.reset_stats();
    let second = dynamo.list_fields("Review").unwrap();

    assert_eq!(first, second);
    // Served from the cache
    assert_eq!(storage.stats().reads, 0);
}

#[test]
fn test_add_and_remove_invalidate_the_cache() {
    let (dynamo, _) = setup();
    let invalidations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invalidations);
    dynamo.cache().on_invalidate(Box::new(move |model| {
        if model == Some("Review") {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }));

    assert!(dynamo.list_fields("Review").unwrap().is_empty());
    dynamo.add_field("Review", "rating", FieldType::Number).unwrap();
    assert_eq!(dynamo.list_fields("Review").unwrap(), vec!["rating"]);

    dynamo.remove_field("Review", "rating").unwrap();
    assert!(dynamo.list_fields("Review").unwrap().is_empty());
    assert_eq!(invalidations.load(Ordering::SeqCst), 2);
}

#[test]
fn test_switching_store_clears_cache() {
    let tenant_a = Arc::new(InMemoryStorage::new());
    let tenant_b = Arc::new(InMemoryStorage::new());
    let mut dynamo = Dynamo::new(tenant_a.clone(), DynamoConfig::new().store_name("a"));

    dynamo.add_field("Review", "rating", FieldType::Number).unwrap();
    assert_eq!(dynamo.list_fields("Review").unwrap(), vec!["rating"]);

    dynamo.switch_engine(tenant_b.clone(), "b");
    assert!(dynamo.list_fields("Review").unwrap().is_empty());
    assert_eq!(dynamo.config().store_name, "b");

    dynamo.switch_engine(tenant_a, "a");
    assert_eq!(dynamo.list_fields("Review").unwrap(), vec!["rating"]);
}

#[test]
fn test_external_definition_is_seen_only_after_invalidation() {
    let (dynamo, storage) = setup();
    assert!(dynamo.list_fields("Review").unwrap().is_empty());

    // Written behind the registry's back
    storage
        .insert_definition(dynafield::core::NewFieldDefinition {
            model_type: "Review".into(),
            field_name: "hidden".into(),
            value_type: FieldType::Text,
        })
        .unwrap();
    assert!(dynamo.list_fields("Review").unwrap().is_empty());

    dynamo.cache().invalidate("Review");
    assert_eq!(dynamo.list_fields("Review").unwrap(), vec!["hidden"]);
}

#[test]
fn test_concurrent_adds_are_visible_to_other_threads() {
    let (dynamo, _) = setup();
    let dynamo = Arc::new(dynamo);

    // Warm the cache so every add must invalidate it
    assert!(dynamo.list_fields("Review").unwrap().is_empty());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let dynamo = Arc::clone(&dynamo);
            thread::spawn(move || {
                let name = format!("field_{}", i);
                dynamo.add_field("Review", &name, FieldType::Text).unwrap();
                // Visible as soon as add_field returned
                assert!(dynamo.fields_for("Review").unwrap().contains(&name));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(dynamo.list_fields("Review").unwrap().len(), 8);
}

#[test]
fn test_concurrent_duplicate_add_yields_one_definition() {
    let (dynamo, storage) = setup();
    let dynamo = Arc::new(dynamo);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let dynamo = Arc::clone(&dynamo);
            thread::spawn(move || dynamo.add_field("Review", "rating", FieldType::Number).is_ok())
        })
        .collect();
    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 1);
    assert_eq!(storage.definition_count().unwrap(), 1);
}
