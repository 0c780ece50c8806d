//! Upgrades persisted mirror configurations to the current schema.
//!
//! Works on the raw JSON blob: legacy field kinds (`color`, `visibility`)
//! cannot be represented by [`crate::field::FieldKind`] and only exist
//! here, before the blob is typed.

use crate::config::{MirrorConfig, CONFIG_VERSION};
use crate::field::strip_suffix;
use serde_json::{Map, Value};

/// Migrate a single field mapping object.
///
/// `color` becomes `fill`; `visibility` becomes a visible text field.
/// Other kinds are left alone.
pub fn migrate_field(field: &Value) -> Value {
    let Some(obj) = field.as_object() else {
        return field.clone();
    };
    let mut obj = obj.clone();
    match obj.get("kind").and_then(|k| k.as_str()) {
        Some("color") => {
            obj.insert("kind".into(), Value::from("fill"));
        }
        Some("visibility") => {
            obj.insert("kind".into(), Value::from("text"));
            obj.insert("visible".into(), Value::Bool(true));
        }
        _ => {}
    }
    Value::Object(obj)
}

/// Migrate every field of an input and store them under bare identifiers.
///
/// When a bare and a suffixed name collide, the bare entry is kept.
pub fn migrate_input(input: &Value) -> Value {
    let Some(obj) = input.as_object() else {
        return input.clone();
    };
    let mut obj = obj.clone();
    if let Some(fields) = obj.get("fields").and_then(|f| f.as_object()) {
        let mut migrated = Map::new();
        let (bare, suffixed): (Vec<_>, Vec<_>) = fields
            .iter()
            .partition(|(name, _)| strip_suffix(name) == name.as_str());
        for (name, field) in bare.into_iter().chain(suffixed) {
            let identifier = strip_suffix(name);
            if migrated.contains_key(&identifier) {
                log::warn!("Dropping field {}: {} is already mapped", name, identifier);
                continue;
            }
            migrated.insert(identifier, migrate_field(field));
        }
        obj.insert("fields".into(), Value::Object(migrated));
    }
    Value::Object(obj)
}

/// Migrate a whole configuration blob. Idempotent.
pub fn migrate(config: &Value) -> Value {
    let Some(obj) = config.as_object() else {
        return config.clone();
    };
    let mut obj = obj.clone();
    let original_version = obj.get("version").and_then(|v| v.as_u64()).unwrap_or(0);

    if let Some(inputs) = obj.get("inputs").and_then(|i| i.as_object()) {
        let migrated: Map<String, Value> = inputs
            .iter()
            .map(|(id, input)| (id.clone(), migrate_input(input)))
            .collect();
        obj.insert("inputs".into(), Value::Object(migrated));
    }

    if original_version < u64::from(CONFIG_VERSION) {
        log::info!(
            "Migrating mirror configuration from v{} to v{}",
            original_version,
            CONFIG_VERSION
        );
        obj.insert("version".into(), Value::from(CONFIG_VERSION));
    }

    Value::Object(obj)
}

/// Migrate then type a configuration blob.
pub fn load(config: &Value) -> MirrorConfig {
    MirrorConfig::from_value(&migrate(config))
}
