// crates/metastore-core/tests/patch_properties.rs
// ============================================================================
// Module: Merge Patch Property Tests
// Description: Property tests for JSON Merge Patch application.
// ============================================================================
//! ## Overview
//! Validates merge-patch idempotence and null deletion over generated documents.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use metastore_core::apply_merge_patch;
use proptest::prelude::*;
use serde_json::Map;
use serde_json::Value;

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::String),
    ]
}

fn document() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![scalar(), Just(Value::Null)];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop::collection::btree_map("[a-e]", inner, 0..4)
            .prop_map(|map| Value::Object(map.into_iter().collect::<Map<String, Value>>()))
    })
}

proptest! {
    #[test]
    fn applying_a_patch_twice_equals_applying_it_once(target in document(), patch in document()) {
        let mut once = target.clone();
        apply_merge_patch(&mut once, &patch);
        let mut twice = once.clone();
        apply_merge_patch(&mut twice, &patch);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn null_members_delete_keys(key in "[a-e]", value in scalar()) {
        let mut target = Value::Object(Map::from_iter([(key.clone(), value)]));
        let patch = Value::Object(Map::from_iter([(key.clone(), Value::Null)]));
        apply_merge_patch(&mut target, &patch);
        prop_assert!(target.get(&key).is_none());
    }
}
