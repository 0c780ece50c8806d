use crate::api::RemoteInputDescriptor;
use crate::field::{strip_suffix, FieldKind};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Current mirror configuration schema version - increment when the
/// persisted shape changes and add a step to `migrate`.
pub const CONFIG_VERSION: u32 = 2;

pub const MIN_OVERLAY_CHANNEL: u8 = 1;
pub const MAX_OVERLAY_CHANNEL: u8 = 8;

/// Default port of the remote system's HTTP API.
pub const DEFAULT_PORT: u16 = 8088;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// Where a mapped field takes its value from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldSource<'a> {
    DataMap(&'a str),
    Custom(&'a str),
}

/// Association between one remote field and a value source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_map_key: Option<String>,
    /// Literal override, text fields only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_value: Option<String>,
    /// Shown/hidden attribute, text fields only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

impl FieldMapping {
    pub fn data(kind: FieldKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            data_map_key: Some(key.into()),
            custom_value: None,
            visible: None,
        }
    }

    pub fn custom(value: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Text,
            data_map_key: None,
            custom_value: Some(value.into()),
            visible: None,
        }
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn source(&self) -> Option<FieldSource<'_>> {
        if let Some(value) = self.custom_value.as_deref() {
            return Some(FieldSource::Custom(value));
        }
        self.data_map_key.as_deref().map(FieldSource::DataMap)
    }

    pub fn is_unmapped(&self) -> bool {
        self.source().is_none()
    }

    /// Enforce the mapping invariants. Returns `None` when nothing is left
    /// to map, which callers represent by removing the entry.
    pub fn normalized(mut self) -> Option<Self> {
        if self.kind != FieldKind::Text {
            if self.custom_value.take().is_some() {
                log::warn!("Dropping custom value on {} field", self.kind);
            }
            self.visible = None;
        }
        if self.data_map_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            self.data_map_key = None;
        }
        if self.custom_value.is_some() && self.data_map_key.take().is_some() {
            log::warn!("Field has both a custom value and a data key, keeping the custom value");
        }
        (!self.is_unmapped()).then_some(self)
    }
}

fn default_enabled() -> bool {
    true
}

fn default_overlay_channel() -> u8 {
    MIN_OVERLAY_CHANNEL
}

/// One remote input the application writes into.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputConfig {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub remote_title: String,
    /// Stable identifier assigned by the remote system (absent on legacy entries)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_key: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub remote_number: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_overlay_channel")]
    pub overlay_channel: u8,
    #[serde(default, deserialize_with = "lenient_fields")]
    pub fields: BTreeMap<String, FieldMapping>,
}

impl InputConfig {
    pub fn new(display_name: impl Into<String>, remote: &RemoteInputDescriptor) -> Self {
        Self {
            display_name: display_name.into(),
            remote_title: remote.title.clone(),
            remote_key: Some(remote.key.clone()).filter(|k| !k.is_empty()),
            remote_number: remote.number.clone(),
            enabled: true,
            overlay_channel: MIN_OVERLAY_CHANNEL,
            fields: BTreeMap::new(),
        }
    }

    /// Value for the `Input` parameter of remote commands: title when set,
    /// number otherwise.
    pub fn remote_reference(&self) -> Option<&str> {
        let title = self.remote_title.trim();
        if !title.is_empty() {
            return Some(title);
        }
        let number = self.remote_number.trim();
        (!number.is_empty()).then_some(number)
    }

    pub fn remote_key(&self) -> Option<&str> {
        self.remote_key.as_deref().filter(|k| !k.is_empty())
    }

    fn normalize(&mut self, id: &str) {
        if !(MIN_OVERLAY_CHANNEL..=MAX_OVERLAY_CHANNEL).contains(&self.overlay_channel) {
            let clamped = self
                .overlay_channel
                .clamp(MIN_OVERLAY_CHANNEL, MAX_OVERLAY_CHANNEL);
            log::warn!(
                "Input {} has overlay channel {}, using {}",
                id,
                self.overlay_channel,
                clamped
            );
            self.overlay_channel = clamped;
        }
        let fields = std::mem::take(&mut self.fields);
        self.fields = fields
            .into_iter()
            .filter_map(|(name, mapping)| mapping.normalized().map(|m| (name, m)))
            .collect();
    }
}

/// Persisted mirroring configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorConfig {
    #[serde(default)]
    pub version: u32,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub connection_state: ConnectionState,
    #[serde(default)]
    pub input_order: Vec<String>,
    #[serde(default, deserialize_with = "lenient_inputs")]
    pub inputs: BTreeMap<String, InputConfig>,
    /// Overlay action id -> input key (internal id, title or number)
    #[serde(default)]
    pub overlay_bindings: BTreeMap<String, String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            host: default_host(),
            port: default_port(),
            connection_state: ConnectionState::default(),
            input_order: Vec::new(),
            inputs: BTreeMap::new(),
            overlay_bindings: BTreeMap::new(),
        }
    }
}

impl MirrorConfig {
    /// Build a typed config from an already-migrated blob.
    ///
    /// Malformed pieces are treated as empty and logged, never propagated.
    pub fn from_value(value: &Value) -> Self {
        let mut config = match serde_json::from_value::<MirrorConfig>(value.clone()) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Mirror configuration is malformed ({}), recovering fields", e);
                Self::recover(value)
            }
        };
        config.validate();
        config
    }

    /// Field-by-field recovery when whole-struct parsing fails.
    fn recover(value: &Value) -> Self {
        let mut config = MirrorConfig::default();
        let Some(obj) = value.as_object() else {
            log::warn!("Mirror configuration is not an object, using defaults");
            return config;
        };
        if let Some(v) = obj.get("version").and_then(|v| v.as_u64()) {
            config.version = u32::try_from(v).unwrap_or(CONFIG_VERSION);
        }
        if let Some(v) = obj.get("host").and_then(|v| v.as_str()) {
            config.host = v.to_string();
        }
        if let Some(v) = obj.get("port").and_then(|v| v.as_u64()) {
            config.port = u16::try_from(v).unwrap_or(DEFAULT_PORT);
        }
        if let Some(v) = obj.get("connectionState") {
            config.connection_state = serde_json::from_value(v.clone()).unwrap_or_default();
        }
        if let Some(items) = obj.get("inputOrder").and_then(|v| v.as_array()) {
            config.input_order = items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
        }
        if let Some(v) = obj.get("inputs") {
            config.inputs = inputs_from_value(v);
        }
        if let Some(v) = obj.get("overlayBindings") {
            config.overlay_bindings = serde_json::from_value(v.clone()).unwrap_or_default();
        }
        config
    }

    /// Repair InputOrder/Inputs drift and per-input invariants.
    pub fn validate(&mut self) {
        let mut seen = HashSet::new();
        let inputs = &self.inputs;
        self.input_order.retain(|id| {
            if !inputs.contains_key(id) {
                log::warn!("Input order references missing input {}, dropping it", id);
                return false;
            }
            seen.insert(id.clone())
        });
        for id in self.inputs.keys() {
            if !seen.contains(id) {
                log::warn!("Input {} missing from input order, appending it", id);
                self.input_order.push(id.clone());
            }
        }
        for (id, input) in &mut self.inputs {
            input.normalize(id);
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Inputs in display order.
    pub fn ordered_inputs(&self) -> impl Iterator<Item = (&str, &InputConfig)> {
        self.input_order
            .iter()
            .filter_map(|id| self.inputs.get(id).map(|input| (id.as_str(), input)))
    }

    pub fn input(&self, id: &str) -> Option<&InputConfig> {
        self.inputs.get(id)
    }

    /// Attach a remote input. Returns the freshly assigned internal id.
    pub fn add_input(&mut self, display_name: &str, remote: &RemoteInputDescriptor) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.inputs
            .insert(id.clone(), InputConfig::new(display_name, remote));
        self.input_order.push(id.clone());
        id
    }

    /// Remove an input and its place in the order. Bindings pointing at it
    /// by internal id are dropped as well.
    pub fn remove_input(&mut self, id: &str) -> Option<InputConfig> {
        let removed = self.inputs.remove(id)?;
        self.input_order.retain(|other| other != id);
        self.overlay_bindings.retain(|_, key| key != id);
        Some(removed)
    }

    /// Store a mapping under the bare field identifier. An unmapped
    /// mapping removes the entry. Returns false for an unknown input.
    pub fn set_field_mapping(&mut self, input_id: &str, field: &str, mapping: FieldMapping) -> bool {
        let Some(input) = self.inputs.get_mut(input_id) else {
            return false;
        };
        let name = strip_suffix(field.trim());
        match mapping.normalized() {
            Some(mapping) => {
                input.fields.insert(name, mapping);
            }
            None => {
                input.fields.remove(&name);
            }
        }
        true
    }

    pub fn clear_field_mapping(&mut self, input_id: &str, field: &str) -> Option<FieldMapping> {
        let input = self.inputs.get_mut(input_id)?;
        input.fields.remove(&strip_suffix(field.trim()))
    }

    pub fn bind_overlay(&mut self, action_id: &str, input_key: &str) {
        self.overlay_bindings
            .insert(action_id.to_string(), input_key.to_string());
    }
}

fn inputs_from_value(value: &Value) -> BTreeMap<String, InputConfig> {
    let Some(entries) = value.as_object() else {
        log::warn!("Inputs collection is not an object, treating it as empty");
        return BTreeMap::new();
    };
    entries
        .iter()
        .filter_map(|(id, entry)| {
            if !entry.is_object() {
                log::warn!("Skipping input {}: entry is not an object", id);
                return None;
            }
            match serde_json::from_value::<InputConfig>(entry.clone()) {
                Ok(input) => Some((id.clone(), input)),
                Err(e) => {
                    log::warn!("Input {} is malformed ({}), recovering attributes", id, e);
                    input_from_value(entry).map(|input| (id.clone(), input))
                }
            }
        })
        .collect()
}

/// Attribute-by-attribute recovery of one input. Wrong types fall back to
/// their defaults instead of losing the input and its mappings.
fn input_from_value(value: &Value) -> Option<InputConfig> {
    let obj = value.as_object()?;
    let text = |name: &str| obj.get(name).and_then(text_of).unwrap_or_default();
    let mut input = InputConfig {
        display_name: text("displayName"),
        remote_title: text("remoteTitle"),
        remote_key: obj
            .get("remoteKey")
            .and_then(text_of)
            .filter(|k| !k.is_empty()),
        remote_number: text("remoteNumber"),
        enabled: default_enabled(),
        overlay_channel: default_overlay_channel(),
        fields: obj.get("fields").map(fields_from_value).unwrap_or_default(),
    };
    match obj.get("enabled") {
        Some(Value::Bool(enabled)) => input.enabled = *enabled,
        Some(other) => log::warn!("Ignoring enabled = {}, keeping the input enabled", other),
        None => {}
    }
    match obj.get("overlayChannel") {
        Some(Value::Number(n)) => {
            input.overlay_channel = match n.as_u64() {
                Some(channel) => u8::try_from(channel).unwrap_or(MAX_OVERLAY_CHANNEL),
                None => MIN_OVERLAY_CHANNEL,
            }
        }
        Some(other) => log::warn!("Ignoring overlay channel {}", other),
        None => {}
    }
    Some(input)
}

/// Strings as-is, numbers in their decimal form.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn fields_from_value(value: &Value) -> BTreeMap<String, FieldMapping> {
    let Some(entries) = value.as_object() else {
        log::warn!("Fields collection is not an object, treating it as empty");
        return BTreeMap::new();
    };
    entries
        .iter()
        .filter_map(|(name, entry)| match serde_json::from_value::<FieldMapping>(entry.clone()) {
            Ok(mapping) => Some((name.clone(), mapping)),
            Err(e) => {
                log::warn!("Skipping field mapping {}: {}", name, e);
                None
            }
        })
        .collect()
}

fn lenient_inputs<'de, D>(deserializer: D) -> Result<BTreeMap<String, InputConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(inputs_from_value(&value))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    text_of(&value).ok_or_else(|| serde::de::Error::custom(format!("expected text, got {}", value)))
}

fn lenient_fields<'de, D>(deserializer: D) -> Result<BTreeMap<String, FieldMapping>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(fields_from_value(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn remote(key: &str, title: &str, number: &str) -> RemoteInputDescriptor {
        RemoteInputDescriptor {
            key: key.into(),
            title: title.into(),
            number: number.into(),
        }
    }

    #[test]
    fn serializes_camel_case_shape() {
        let mut config = MirrorConfig::default();
        let id = config.add_input("Score", &remote("k1", "SCORE", "3"));
        config.set_field_mapping(&id, "Home", FieldMapping::data(FieldKind::Text, "home.name"));
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["connectionState"], "disconnected");
        assert_eq!(value["inputOrder"], json!([id.clone()]));
        let input = &value["inputs"][&id];
        assert_eq!(input["remoteTitle"], "SCORE");
        assert_eq!(input["remoteKey"], "k1");
        assert_eq!(input["fields"]["Home"], json!({"kind": "text", "dataMapKey": "home.name"}));
    }

    #[test]
    fn from_value_repairs_order_mismatch() {
        let value = json!({
            "host": "10.0.0.2",
            "port": 8088,
            "inputOrder": ["a", "ghost", "a"],
            "inputs": {
                "a": {"remoteTitle": "A"},
                "b": {"remoteTitle": "B"}
            }
        });
        let config = MirrorConfig::from_value(&value);
        assert_eq!(config.input_order, vec!["a", "b"]);
        assert_eq!(config.host, "10.0.0.2");
    }

    #[test]
    fn from_value_skips_malformed_entries() {
        let value = json!({
            "inputOrder": ["a", "b"],
            "inputs": {
                "a": "not an object",
                "b": {
                    "remoteTitle": "B",
                    "fields": {
                        "Good": {"kind": "image", "dataMapKey": "home.logo"},
                        "Bad": {"kind": "hologram"},
                        "Empty": {"kind": "text"}
                    }
                }
            }
        });
        let config = MirrorConfig::from_value(&value);
        assert_eq!(config.input_order, vec!["b"]);
        let fields = &config.inputs["b"].fields;
        assert_eq!(fields.len(), 1);
        assert!(fields.contains_key("Good"));
    }

    #[test]
    fn from_value_recovers_from_wrong_types() {
        let value = json!({"host": "h", "port": "not a number", "inputs": []});
        let config = MirrorConfig::from_value(&value);
        assert_eq!(config.host, "h");
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.inputs.is_empty());
    }

    #[test]
    fn overlay_channel_is_clamped() {
        let value = json!({"inputs": {"a": {"overlayChannel": 12}}});
        let config = MirrorConfig::from_value(&value);
        assert_eq!(config.inputs["a"].overlay_channel, MAX_OVERLAY_CHANNEL);
    }

    #[test]
    fn numeric_remote_number_is_read_as_text() {
        let value = json!({"inputs": {"a": {"remoteTitle": "SCORE", "remoteNumber": 12}}});
        let config = MirrorConfig::from_value(&value);
        assert_eq!(config.inputs["a"].remote_number, "12");
        assert_eq!(config.inputs["a"].remote_title, "SCORE");
    }

    #[test]
    fn wrongly_typed_attributes_keep_the_input_and_its_fields() {
        let value = json!({
            "inputs": {
                "a": {
                    "remoteTitle": "SCORE",
                    "remoteKey": "k",
                    "remoteNumber": 12,
                    "enabled": null,
                    "overlayChannel": 300,
                    "fields": { "Home": {"kind": "text", "dataMapKey": "home.name"} }
                },
                "b": { "remoteTitle": "BUG", "enabled": false, "overlayChannel": "two" }
            }
        });
        let config = MirrorConfig::from_value(&value);
        assert_eq!(config.input_order, vec!["a", "b"]);

        let a = &config.inputs["a"];
        assert_eq!(a.remote_key(), Some("k"));
        assert_eq!(a.remote_number, "12");
        assert!(a.enabled);
        assert_eq!(a.overlay_channel, MAX_OVERLAY_CHANNEL);
        assert_eq!(a.fields["Home"], FieldMapping::data(FieldKind::Text, "home.name"));

        let b = &config.inputs["b"];
        assert!(!b.enabled);
        assert_eq!(b.overlay_channel, MIN_OVERLAY_CHANNEL);
    }

    #[test]
    fn custom_value_wins_over_data_key() {
        let mapping = FieldMapping {
            kind: FieldKind::Text,
            data_map_key: Some("home.name".into()),
            custom_value: Some("HOME".into()),
            visible: None,
        };
        let normalized = mapping.normalized().unwrap();
        assert_eq!(normalized.source(), Some(FieldSource::Custom("HOME")));
        assert!(normalized.data_map_key.is_none());
    }

    #[test]
    fn unmapped_mapping_removes_entry() {
        let mut config = MirrorConfig::default();
        let id = config.add_input("Score", &remote("k1", "SCORE", "3"));
        config.set_field_mapping(&id, "Home.Text", FieldMapping::custom("x"));
        assert!(config.inputs[&id].fields.contains_key("Home"));
        let cleared = FieldMapping {
            kind: FieldKind::Text,
            data_map_key: None,
            custom_value: None,
            visible: None,
        };
        config.set_field_mapping(&id, "Home", cleared);
        assert!(config.inputs[&id].fields.is_empty());
    }

    #[test]
    fn remove_input_cleans_order_and_bindings() {
        let mut config = MirrorConfig::default();
        let a = config.add_input("A", &remote("k1", "A", "1"));
        let b = config.add_input("B", &remote("k2", "B", "2"));
        config.bind_overlay("scoreboard", &a);
        assert!(config.remove_input(&a).is_some());
        assert_eq!(config.input_order, vec![b]);
        assert!(config.overlay_bindings.is_empty());
        assert!(config.remove_input(&a).is_none());
    }

    #[test]
    fn remote_reference_falls_back_to_number() {
        let mut input = InputConfig::new("x", &remote("k", " ", "7"));
        assert_eq!(input.remote_reference(), Some("7"));
        input.remote_number.clear();
        assert_eq!(input.remote_reference(), None);
    }
}
