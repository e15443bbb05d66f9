// crates/metastore-core/src/core/patch.rs
// ============================================================================
// Module: Metastore Merge Patch
// Description: RFC 7396 JSON Merge Patch application.
// Purpose: Apply partial updates to stored document bodies.
// Dependencies: json-patch, serde_json
// ============================================================================

//! ## Overview
//! Merge patches merge object members recursively, delete members whose patch
//! value is `null`, and replace any non-object target wholesale. Applying the
//! same patch twice yields the same document as applying it once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

// ============================================================================
// SECTION: Merge Patch
// ============================================================================

/// Applies `patch` to `target` in place.
pub fn apply_merge_patch(target: &mut Value, patch: &Value) {
    json_patch::merge(target, patch);
}

/// Returns `target` with `patch` applied.
#[must_use]
pub fn merged(mut target: Value, patch: &Value) -> Value {
    apply_merge_patch(&mut target, patch);
    target
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::merged;

    #[test]
    fn null_members_are_deleted_and_objects_merge() {
        let target =
            json!({"title": "a", "keyword": ["x"], "publisher": {"name": "p", "mbox": "m"}});
        let patch = json!({"keyword": null, "publisher": {"mbox": null, "url": "u"}});
        assert_eq!(
            merged(target, &patch),
            json!({"title": "a", "publisher": {"name": "p", "url": "u"}})
        );
    }

    #[test]
    fn non_object_patch_replaces_target() {
        assert_eq!(merged(json!({"a": 1}), &json!([1, 2])), json!([1, 2]));
    }
}
