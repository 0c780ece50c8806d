use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    Home,
    Away,
}

impl TeamSide {
    pub fn display_name(self) -> &'static str {
        match self {
            TeamSide::Home => "home",
            TeamSide::Away => "away",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefereeSlot {
    First,
    Second,
}

impl RefereeSlot {
    pub fn display_name(self) -> &'static str {
        match self {
            RefereeSlot::First => "first",
            RefereeSlot::Second => "second",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamState {
    pub name: String,
    pub short_name: String,
    /// `#RRGGBB`
    pub color: String,
    /// Local asset reference (`logos/...`) or absolute URL
    pub logo: String,
    pub coach: String,
    pub points: u32,
    pub sets_won: u32,
    pub timeouts: u32,
    pub serving: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Referees {
    pub first: String,
    pub second: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetScore {
    pub home: u32,
    pub away: u32,
}

/// Snapshot of the live match, owned by the scoring side of the
/// application. Data-map keys are dotted paths into its serialized form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchState {
    pub home: TeamState,
    pub away: TeamState,
    pub referees: Referees,
    pub current_set: u32,
    pub sets: Vec<SetScore>,
    pub competition: String,
    pub venue: String,
}

/// A value looked up by data-map key.
#[derive(Clone, Debug, PartialEq)]
pub enum DataValue {
    Text(String),
    Flag(bool),
}

impl DataValue {
    pub fn as_text(&self) -> String {
        match self {
            DataValue::Text(s) => s.clone(),
            DataValue::Flag(b) => b.to_string(),
        }
    }

    /// Truthiness used for visibility: booleans as-is, text when non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            DataValue::Text(s) => !s.trim().is_empty() && s != "false" && s != "0",
            DataValue::Flag(b) => *b,
        }
    }
}

impl MatchState {
    pub fn team(&self, side: TeamSide) -> &TeamState {
        match side {
            TeamSide::Home => &self.home,
            TeamSide::Away => &self.away,
        }
    }

    pub fn referee(&self, slot: RefereeSlot) -> &str {
        match slot {
            RefereeSlot::First => &self.referees.first,
            RefereeSlot::Second => &self.referees.second,
        }
    }

    /// Serialize once so many keys can be resolved against the same tree.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Walk a dotted path (`home.name`, `sets.0.home`) through a JSON tree.
///
/// Returns `None` for missing segments, objects/arrays at the leaf, and null.
pub fn lookup_path(root: &Value, key: &str) -> Option<DataValue> {
    if key.trim().is_empty() {
        return None;
    }
    let mut node = root;
    for segment in key.split('.') {
        node = match node {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match node {
        Value::String(s) => Some(DataValue::Text(s.clone())),
        Value::Number(n) => Some(DataValue::Text(n.to_string())),
        Value::Bool(b) => Some(DataValue::Flag(*b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MatchState {
        MatchState {
            home: TeamState {
                name: "Lions".into(),
                points: 21,
                serving: true,
                ..Default::default()
            },
            sets: vec![SetScore { home: 25, away: 20 }],
            ..Default::default()
        }
    }

    #[test]
    fn lookup_path_resolves_nested_keys() {
        let root = sample().to_value();
        assert_eq!(lookup_path(&root, "home.name"), Some(DataValue::Text("Lions".into())));
        assert_eq!(lookup_path(&root, "home.points"), Some(DataValue::Text("21".into())));
        assert_eq!(lookup_path(&root, "home.serving"), Some(DataValue::Flag(true)));
        assert_eq!(lookup_path(&root, "sets.0.away"), Some(DataValue::Text("20".into())));
    }

    #[test]
    fn lookup_path_missing_segments_are_none() {
        let root = sample().to_value();
        assert_eq!(lookup_path(&root, "home.nope"), None);
        assert_eq!(lookup_path(&root, "sets.4.home"), None);
        assert_eq!(lookup_path(&root, "home"), None);
        assert_eq!(lookup_path(&root, ""), None);
    }

    #[test]
    fn serialized_keys_are_camel_case() {
        let root = sample().to_value();
        assert!(root["home"].get("shortName").is_some());
        assert!(root.get("currentSet").is_some());
    }
}
