use assayer::core::error::AssayerError;
use assayer::core::stats::{Datum, StatEntry, StatKind, StatStore, parse_path};
use std::collections::BTreeSet;

#[test]
fn record_then_get_round_trips() {
    let mut store = StatStore::new();
    store.record(&["n"], 10_i64, false).unwrap();
    store.record(&["label"], "candidate", false).unwrap();
    store.record(&["hit"], true, false).unwrap();

    assert_eq!(
        store.get(&["n"]).unwrap(),
        &StatEntry::Scalar(Datum::Int(10))
    );
    assert_eq!(
        store.get(&["label"]).unwrap(),
        &StatEntry::Scalar(Datum::Text("candidate".to_string()))
    );
    assert_eq!(
        store.get(&["hit"]).unwrap(),
        &StatEntry::Scalar(Datum::Bool(true))
    );
}

#[test]
fn duplicate_writes_are_rejected_unless_overwrite() {
    let mut store = StatStore::new();
    store.record(&["n"], 1_i64, false).unwrap();

    let err = store.record(&["n"], 2_i64, false).unwrap_err();
    assert!(matches!(err, AssayerError::DuplicateKey(_)));
    assert_eq!(
        store.get(&["n"]).unwrap(),
        &StatEntry::Scalar(Datum::Int(1))
    );

    store.record(&["n"], 2_i64, true).unwrap();
    assert_eq!(
        store.get(&["n"]).unwrap(),
        &StatEntry::Scalar(Datum::Int(2))
    );
}

#[test]
fn multi_segment_writes_auto_create_sub_stores() {
    let mut store = StatStore::new();
    store.record(&["a", "b"], 5_i64, false).unwrap();

    assert_eq!(
        store.get(&["a", "b"]).unwrap(),
        &StatEntry::Scalar(Datum::Int(5))
    );
    assert!(store.contains(&["a"]).unwrap());
    assert_eq!(store.get(&["a"]).unwrap().kind(), StatKind::Nested);
}

#[test]
fn segment_names_must_not_contain_the_delimiter() {
    let mut store = StatStore::new();
    let err = store.record(&["a.b"], 1_i64, false).unwrap_err();
    assert!(matches!(err, AssayerError::InvalidSegmentName(_)));

    // The check applies to intermediate segments too, and to occupied
    // names regardless of overwrite.
    let err = store.record(&["a.b", "c"], 1_i64, false).unwrap_err();
    assert!(matches!(err, AssayerError::InvalidSegmentName(_)));
    store.record(&["ok"], 1_i64, false).unwrap();
    let err = store.record(&["ok.nested"], 2_i64, true).unwrap_err();
    assert!(matches!(err, AssayerError::InvalidSegmentName(_)));
}

#[test]
fn extending_a_leaf_path_is_a_type_mismatch() {
    let mut store = StatStore::new();
    store.record(&["x"], 1_i64, false).unwrap();

    let err = store.record(&["x", "y"], 2_i64, false).unwrap_err();
    assert!(matches!(err, AssayerError::TypeMismatch(_)));
}

#[test]
fn collect_appends_in_order() {
    let mut store = StatStore::new();
    store.collect(&["hits"], 1_i64).unwrap();
    store.collect(&["hits"], 2_i64).unwrap();

    assert_eq!(
        store.get(&["hits"]).unwrap(),
        &StatEntry::List(vec![Datum::Int(1), Datum::Int(2)])
    );
}

#[test]
fn collect_into_a_non_list_is_a_type_mismatch() {
    let mut store = StatStore::new();
    store.record(&["n"], 1_i64, false).unwrap();
    let err = store.collect(&["n"], 2_i64).unwrap_err();
    assert!(matches!(err, AssayerError::TypeMismatch(_)));
}

#[test]
fn collect_unique_deduplicates() {
    let mut store = StatStore::new();
    store.collect_unique(&["ids"], "x", false).unwrap();
    store.collect_unique(&["ids"], "x", false).unwrap();
    store.collect_unique(&["ids"], "x", true).unwrap();

    let expected: BTreeSet<Datum> = [Datum::Text("x".to_string())].into_iter().collect();
    assert_eq!(store.get(&["ids"]).unwrap(), &StatEntry::Set(expected));
}

#[test]
fn collect_unique_into_a_non_set_is_a_type_mismatch() {
    let mut store = StatStore::new();
    store.collect(&["hits"], 1_i64).unwrap();
    let err = store.collect_unique(&["hits"], 2_i64, false).unwrap_err();
    assert!(matches!(err, AssayerError::TypeMismatch(_)));
}

#[test]
fn increment_adds_to_scalars() {
    let mut store = StatStore::new();
    store.record(&["n"], 10_i64, false).unwrap();
    store.increment(&["n"], 5_i64).unwrap();

    assert_eq!(
        store.get(&["n"]).unwrap(),
        &StatEntry::Scalar(Datum::Int(15))
    );
}

#[test]
fn increment_targets_the_last_list_element() {
    let mut store = StatStore::new();
    store.collect(&["seq"], 1_i64).unwrap();
    store.collect(&["seq"], 2_i64).unwrap();
    store.increment(&["seq"], 3_i64).unwrap();

    assert_eq!(
        store.get(&["seq"]).unwrap(),
        &StatEntry::List(vec![Datum::Int(1), Datum::Int(5)])
    );
}

#[test]
fn increment_requires_the_path_to_exist() {
    let mut store = StatStore::new();
    let err = store.increment(&["missing"], 1_i64).unwrap_err();
    assert!(matches!(err, AssayerError::KeyNotFound(_)));
}

#[test]
fn increment_rejects_incompatible_targets() {
    let mut store = StatStore::new();

    store.record(&["label"], "x", false).unwrap();
    let err = store.increment(&["label"], 1_i64).unwrap_err();
    assert!(matches!(err, AssayerError::TypeMismatch(_)));

    store.collect_unique(&["ids"], "x", false).unwrap();
    let err = store.increment(&["ids"], 1_i64).unwrap_err();
    assert!(matches!(err, AssayerError::TypeMismatch(_)));

    store.record(&["empty"], StatEntry::List(Vec::new()), false).unwrap();
    let err = store.increment(&["empty"], 1_i64).unwrap_err();
    assert!(matches!(err, AssayerError::TypeMismatch(_)));

    store.collect(&["tail"], 1_i64).unwrap();
    store.collect(&["tail"], "text").unwrap();
    let err = store.increment(&["tail"], 1_i64).unwrap_err();
    assert!(matches!(err, AssayerError::TypeMismatch(_)));

    // A non-numeric increment amount is just as incompatible.
    store.record(&["n"], 1_i64, false).unwrap();
    let err = store.increment(&["n"], "one").unwrap_err();
    assert!(matches!(err, AssayerError::TypeMismatch(_)));
}

#[test]
fn increment_promotes_to_float_when_an_operand_is_float() {
    let mut store = StatStore::new();
    store.record(&["ratio"], 1_i64, false).unwrap();
    store.increment(&["ratio"], 0.5).unwrap();
    assert_eq!(
        store.get(&["ratio"]).unwrap(),
        &StatEntry::Scalar(Datum::Float(1.5))
    );
}

#[test]
fn contains_distinguishes_missing_from_wrong_shape() {
    let mut store = StatStore::new();
    store.record(&["x"], 1_i64, false).unwrap();

    assert!(!store.contains(&["y"]).unwrap());
    assert!(!store.contains(&["y", "z"]).unwrap());

    let err = store.contains(&["x", "y"]).unwrap_err();
    assert!(matches!(err, AssayerError::TypeMismatch(_)));
}

#[test]
fn get_reports_missing_keys_and_wrong_shapes() {
    let mut store = StatStore::new();
    store.record(&["a", "b"], 1_i64, false).unwrap();

    assert!(matches!(
        store.get(&["missing"]),
        Err(AssayerError::KeyNotFound(_))
    ));
    assert!(matches!(
        store.get(&["a", "missing"]),
        Err(AssayerError::KeyNotFound(_))
    ));
    assert!(matches!(
        store.get(&["a", "b", "c"]),
        Err(AssayerError::TypeMismatch(_))
    ));
}

#[test]
fn empty_paths_are_rejected_everywhere() {
    let mut store = StatStore::new();
    assert!(matches!(
        store.record(&[], 1_i64, false),
        Err(AssayerError::EmptyPath)
    ));
    assert!(matches!(store.get(&[]), Err(AssayerError::EmptyPath)));
    assert!(matches!(store.contains(&[]), Err(AssayerError::EmptyPath)));
    assert!(matches!(
        store.collect(&[], 1_i64),
        Err(AssayerError::EmptyPath)
    ));
    assert!(matches!(
        store.increment(&[], 1_i64),
        Err(AssayerError::EmptyPath)
    ));
    assert!(matches!(
        store.sub_store(&[], None),
        Err(AssayerError::EmptyPath)
    ));
}

#[test]
fn sub_store_creates_only_when_absent() {
    let mut store = StatStore::new();

    let mut seeded = StatStore::new();
    seeded.record(&["inner"], 1_i64, false).unwrap();
    store.sub_store(&["group"], Some(seeded)).unwrap();
    assert_eq!(
        store.get(&["group", "inner"]).unwrap(),
        &StatEntry::Scalar(Datum::Int(1))
    );

    // Present sub-store: a second call is a no-op, the initial is ignored.
    let mut other = StatStore::new();
    other.record(&["other"], 2_i64, false).unwrap();
    store.sub_store(&["group"], Some(other)).unwrap();
    assert_eq!(
        store.get(&["group", "inner"]).unwrap(),
        &StatEntry::Scalar(Datum::Int(1))
    );
    assert!(!store.contains(&["group", "other"]).unwrap());

    // Present non-sub-store: error, never an overwrite.
    store.record(&["n"], 1_i64, false).unwrap();
    let err = store.sub_store(&["n"], None).unwrap_err();
    assert!(matches!(err, AssayerError::TypeMismatch(_)));
}

#[test]
fn entries_enumerate_in_lexicographic_order() {
    let mut store = StatStore::new();
    store.record(&["zulu"], 1_i64, false).unwrap();
    store.record(&["alpha"], 2_i64, false).unwrap();
    store.record(&["mike"], 3_i64, false).unwrap();

    let names: Vec<&str> = store.entries().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["alpha", "mike", "zulu"]);
    assert_eq!(store.len(), 3);
    assert!(!store.is_empty());
}

#[test]
fn entry_kinds_and_accessors_agree() {
    let mut store = StatStore::new();
    store.record(&["n"], 1_i64, false).unwrap();
    store.collect(&["hits"], 1_i64).unwrap();
    store.collect_unique(&["ids"], "x", false).unwrap();
    store.sub_store(&["group"], None).unwrap();

    let n = store.get(&["n"]).unwrap();
    assert_eq!(n.kind(), StatKind::Scalar);
    assert_eq!(n.as_scalar(), Some(&Datum::Int(1)));
    assert!(n.as_list().is_none());

    let hits = store.get(&["hits"]).unwrap();
    assert_eq!(hits.kind(), StatKind::List);
    assert_eq!(hits.as_list(), Some(&[Datum::Int(1)][..]));

    let ids = store.get(&["ids"]).unwrap();
    assert_eq!(ids.kind(), StatKind::Set);
    assert!(ids.as_set().unwrap().contains(&Datum::Text("x".to_string())));

    let group = store.get(&["group"]).unwrap();
    assert_eq!(group.kind(), StatKind::Nested);
    assert!(group.as_nested().unwrap().is_empty());
}

#[test]
fn record_json_accepts_loose_paths_and_leaf_values() {
    let mut store = StatStore::new();
    store
        .record_json(&serde_json::json!("run"), &serde_json::json!("nightly"), false)
        .unwrap();
    store
        .record_json(
            &serde_json::json!(["commit_features", "weight"]),
            &serde_json::json!(0.75),
            false,
        )
        .unwrap();

    assert_eq!(
        store.get(&["run"]).unwrap(),
        &StatEntry::Scalar(Datum::Text("nightly".to_string()))
    );
    assert_eq!(
        store.get(&["commit_features", "weight"]).unwrap(),
        &StatEntry::Scalar(Datum::Float(0.75))
    );

    let err = store
        .record_json(&serde_json::json!(42), &serde_json::json!(1), false)
        .unwrap_err();
    assert!(matches!(err, AssayerError::InvalidPathType(_)));

    let err = store
        .record_json(&serde_json::json!("bad"), &serde_json::json!({"k": 1}), false)
        .unwrap_err();
    assert!(matches!(err, AssayerError::TypeMismatch(_)));
}

#[test]
fn parse_path_rejects_mixed_arrays() {
    assert!(matches!(
        parse_path(&serde_json::json!([["nested"]])),
        Err(AssayerError::InvalidPathType(_))
    ));
    assert_eq!(parse_path(&serde_json::json!([])).unwrap(), Vec::<String>::new());
}

#[test]
fn deep_trees_stay_strictly_owned() {
    let mut store = StatStore::new();
    store
        .record(&["a", "b", "c", "d"], "leaf", false)
        .unwrap();
    store.collect(&["a", "b", "hits"], 1_i64).unwrap();
    store.increment(&["a", "b", "hits"], 4_i64).unwrap();

    assert_eq!(
        store.get(&["a", "b", "hits"]).unwrap(),
        &StatEntry::List(vec![Datum::Int(5)])
    );
    assert!(store.contains(&["a", "b", "c"]).unwrap());
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(&["a"]).unwrap().as_nested().unwrap().len(), 1);
}
