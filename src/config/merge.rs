//! Deep merge of policy documents.
//!
//! The user document is merged onto the built-in defaults key by key:
//! mappings merge recursively, everything else (scalars and sequences
//! alike) is replaced wholesale. Sequences are never concatenated, so a user
//! writing `actions: {active: [clone]}` gets exactly `[clone]`.

use log::{debug, warn};
use serde_yaml::Value;

/// Merge `source` into `target` in place.
///
/// `path` is the dotted location of `target`, used only for logging.
pub fn merge_values(target: &mut Value, source: Value, path: &str) {
    match (target, source) {
        (Value::Mapping(target_map), Value::Mapping(source_map)) => {
            for (key, value) in source_map {
                let new_path = child_path(path, &key);
                match target_map.get_mut(&key) {
                    Some(existing) if existing.is_mapping() && value.is_mapping() => {
                        merge_values(existing, value, &new_path);
                    }
                    Some(existing) => {
                        debug!("Overriding '{}'", new_path);
                        *existing = value;
                    }
                    None => {
                        target_map.insert(key, value);
                    }
                }
            }
        }
        (target, source) => {
            if target.is_mapping() && !source.is_null() {
                warn!(
                    "Type mismatch at '{}': replacing Mapping with {}",
                    display_path(path),
                    type_name(&source)
                );
            }
            *target = source;
        }
    }
}

/// `defaults` with `user` merged on top. A null user document (an empty
/// file) leaves the defaults untouched.
pub fn merge_documents(mut defaults: Value, user: Value) -> Value {
    if !user.is_null() {
        merge_values(&mut defaults, user, "");
    }
    defaults
}

fn child_path(path: &str, key: &Value) -> String {
    let key = match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    };
    if path.is_empty() {
        key
    } else {
        format!("{}.{}", path, key)
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

/// Short name of a YAML value's type, for diagnostics.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "Null",
        Value::Bool(_) => "Bool",
        Value::Number(_) => "Number",
        Value::String(_) => "String",
        Value::Sequence(_) => "Sequence",
        Value::Mapping(_) => "Mapping",
        Value::Tagged(_) => "Tagged",
    }
}
