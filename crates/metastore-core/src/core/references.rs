// crates/metastore-core/src/core/references.rs
// ============================================================================
// Module: Metastore Reference Resolution
// Description: Compact and dereferenced views of documents with reference sidecars.
// Purpose: Strip or inline `%Ref:<property>` sidecar properties on read.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! A property named `%Ref:<name>` that sits next to `<name>` carries the
//! inlined expansion of whatever `<name>` references (for example the full
//! resource record behind a `downloadURL`). Any property name containing `%`
//! is a reference artifact.
//!
//! Stripping applies to the top-level object and to every object element of
//! every top-level array, so multi-distribution datasets lose all sidecars.
//! Swapping only replaces top-level properties; sidecars nested in array
//! elements are dropped without being inlined.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

use crate::core::document::ValidatedDocument;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Substring marking any reference artifact property.
pub const REFERENCE_MARKER: &str = "%";
/// Prefix of an inlined reference sidecar property.
pub const REFERENCE_PREFIX: &str = "%Ref:";
/// Marker used when stripping after a swap.
const SWAP_STRIP_MARKER: &str = "%Ref";

// ============================================================================
// SECTION: Public Operations
// ============================================================================

/// Removes every property whose name contains `marker`.
///
/// Returns the mutated document.
#[must_use]
pub fn remove_references(mut document: ValidatedDocument, marker: &str) -> ValidatedDocument {
    strip_in_place(document.root_mut(), marker);
    document
}

/// Produces the dereferenced view of a document.
///
/// For every top-level `%Ref:<name>` property whose `<name>` exists at the
/// root, `<name>` is overwritten with the sidecar value; afterwards all `%Ref`
/// properties are removed. The result is not bound to a schema.
#[must_use]
pub fn swap_references(document: &ValidatedDocument) -> ValidatedDocument {
    let mut root = document.root().clone();
    if let Value::Object(map) = &mut root {
        swap_in_object(map);
    }
    strip_in_place(&mut root, SWAP_STRIP_MARKER);
    ValidatedDocument::unvalidated(root)
}

/// Returns a copy of `root` with reference artifacts matching `marker` removed.
#[must_use]
pub fn strip_artifacts(root: &Value, marker: &str) -> Value {
    let mut copy = root.clone();
    strip_in_place(&mut copy, marker);
    copy
}

/// Returns the referenced property name for a sidecar key.
#[must_use]
pub fn referenced_property(key: &str) -> Option<&str> {
    key.strip_prefix(REFERENCE_PREFIX)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Strips matching keys from the root object and from objects inside its arrays.
fn strip_in_place(root: &mut Value, marker: &str) {
    let Value::Object(map) = root else {
        return;
    };
    map.retain(|key, _| !key.contains(marker));
    for value in map.values_mut() {
        for_each_element_object(value, |element| element.retain(|key, _| !key.contains(marker)));
    }
}

/// Applies `apply` to every object element when `value` is an array.
fn for_each_element_object(value: &mut Value, apply: impl Fn(&mut Map<String, Value>)) {
    if let Value::Array(items) = value {
        for item in items {
            if let Value::Object(element) = item {
                apply(element);
            }
        }
    }
}

/// Overwrites root properties with their sidecar values.
fn swap_in_object(map: &mut Map<String, Value>) {
    let swaps: Vec<(String, Value)> = map
        .iter()
        .filter_map(|(key, value)| {
            referenced_property(key)
                .filter(|name| map.contains_key(*name))
                .map(|name| (name.to_string(), value.clone()))
        })
        .collect();
    for (name, value) in swaps {
        map.insert(name, value);
    }
}
