// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change detection between a previously applied attribute set and a candidate.

use serde_json::Value;

/// Returns true if `target` differs from `source` in any key `target` carries.
///
/// - A missing or non-object `source` always counts as a change.
/// - Only keys present in `target` are inspected; a key that disappeared is not a change.
/// - Object-valued keys are compared recursively with the same rule.
/// - Arrays are compared element-wise and a length difference is a change.
/// - Everything else is compared by strict equality (`1` and `"1"` differ).
///
/// Every node calls this before touching the scene, which makes re-applying an
/// identical payload a no-op.
pub fn is_changed(source: Option<&Value>, target: &Value) -> bool {
    let Some(Value::Object(source)) = source else {
        return true;
    };
    let Value::Object(target) = target else {
        return true;
    };
    target.iter().any(|(key, value)| {
        let previous = source.get(key);
        match value {
            Value::Object(_) => is_changed(previous, value),
            Value::Array(items) => match previous {
                Some(Value::Array(old)) => {
                    old.len() != items.len()
                        || items
                            .iter()
                            .zip(old)
                            .any(|(new, old)| value_changed(old, new))
                }
                _ => true,
            },
            _ => previous != Some(value),
        }
    })
}

fn value_changed(old: &Value, new: &Value) -> bool {
    match new {
        Value::Object(_) => is_changed(Some(old), new),
        _ => old != new,
    }
}
