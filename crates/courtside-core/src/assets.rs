//! Rewrites locally stored asset references into URLs the remote system can
//! fetch over the network.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Bytes left as-is in a path component: alphanumerics and `- _ . ! ~ * ' ( )`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Prefix marking a value as a local asset reference.
pub const LOCAL_ASSET_PREFIX: &str = "logos/";

/// Resolve a single value. `None` base leaves it untouched.
pub fn resolve_url(value: &str, base_url: Option<&str>) -> String {
    let Some(base) = base_url else {
        return value.to_string();
    };
    let trimmed = value.trim();
    match trimmed.strip_prefix(LOCAL_ASSET_PREFIX) {
        Some(filename) => format!(
            "{}/logos/{}",
            base.trim_end_matches('/'),
            encode_component(filename)
        ),
        None => value.to_string(),
    }
}

/// Resolve every value of a field-name → value map.
pub fn resolve(
    image_fields: &BTreeMap<String, String>,
    base_url: Option<&str>,
) -> BTreeMap<String, String> {
    image_fields
        .iter()
        .map(|(name, value)| (name.clone(), resolve_url(value, base_url)))
        .collect()
}

/// Untyped variant for blobs that arrive as JSON. Anything but an object
/// yields an empty object; non-string values pass through.
pub fn resolve_value(image_fields: &Value, base_url: Option<&str>) -> Value {
    let Some(fields) = image_fields.as_object() else {
        log::warn!("Image field map is not an object, ignoring it");
        return Value::Object(Map::new());
    };
    let resolved = fields
        .iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => Value::String(resolve_url(s, base_url)),
                other => other.clone(),
            };
            (name.clone(), value)
        })
        .collect();
    Value::Object(resolved)
}

/// Percent-encode a single path component: spaces as `%20`, slashes encoded.
fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, COMPONENT).to_string()
}
