use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a remote field slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Image,
    Fill,
}

impl FieldKind {
    pub fn all_variants() -> &'static [FieldKind] {
        &[FieldKind::Text, FieldKind::Image, FieldKind::Fill]
    }

    /// Wire suffix appended to a bare field identifier.
    pub fn suffix(self) -> &'static str {
        match self {
            FieldKind::Text => ".Text",
            FieldKind::Image => ".Source",
            FieldKind::Fill => ".Fill.Color",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Image => "image",
            FieldKind::Fill => "fill",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(FieldKind::Text),
            "image" => Ok(FieldKind::Image),
            "fill" => Ok(FieldKind::Fill),
            other => Err(SchemaError::UnknownFieldKind(other.to_string())),
        }
    }
}

/// Known suffixes, longest first so `.Fill.Color` is never cut short.
const SUFFIXES_LONGEST_FIRST: [&str; 3] = [".Fill.Color", ".Source", ".Text"];

/// Qualify a bare identifier with the kind's suffix. Idempotent.
pub fn to_wire_name(identifier: &str, kind: FieldKind) -> String {
    if has_suffix(identifier, kind) {
        identifier.to_string()
    } else {
        format!("{}{}", identifier, kind.suffix())
    }
}

/// Like [`to_wire_name`] but for a kind still in string form (e.g. read
/// from an untyped source). An unrecognised kind is a schema error.
pub fn to_wire_name_str(identifier: &str, kind: &str) -> Result<String, SchemaError> {
    let kind = kind.parse::<FieldKind>()?;
    Ok(to_wire_name(identifier, kind))
}

pub fn has_suffix(identifier: &str, kind: FieldKind) -> bool {
    identifier.ends_with(kind.suffix())
}

/// Remove known wire suffixes until none remains.
///
/// Each step removes the longest matching suffix; identifiers without a
/// suffix come back unchanged.
pub fn strip_suffix(identifier: &str) -> String {
    let mut current = identifier;
    'outer: loop {
        for suffix in SUFFIXES_LONGEST_FIRST {
            if let Some(stripped) = current.strip_suffix(suffix) {
                current = stripped;
                continue 'outer;
            }
        }
        return current.to_string();
    }
}

/// Kind implied by an identifier's suffix, if it carries one.
pub fn kind_of_suffix(identifier: &str) -> Option<FieldKind> {
    FieldKind::all_variants()
        .iter()
        .copied()
        .find(|kind| has_suffix(identifier, *kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTIFIERS: &[&str] = &[
        "",
        "Home",
        "Home.Text",
        "Logo.Source",
        "Bar.Fill.Color",
        "Bar.Color",
        "Name.Text.Source",
        ".Text",
    ];

    #[test]
    fn to_wire_name_appends_suffix() {
        assert_eq!(to_wire_name("Home", FieldKind::Text), "Home.Text");
        assert_eq!(to_wire_name("Logo", FieldKind::Image), "Logo.Source");
        assert_eq!(to_wire_name("Bar", FieldKind::Fill), "Bar.Fill.Color");
        assert_eq!(to_wire_name("", FieldKind::Text), ".Text");
    }

    #[test]
    fn to_wire_name_is_idempotent() {
        for id in IDENTIFIERS {
            for kind in FieldKind::all_variants() {
                let once = to_wire_name(id, *kind);
                assert_eq!(to_wire_name(&once, *kind), once, "{id} / {kind}");
            }
        }
    }

    #[test]
    fn strip_after_wire_name_matches_strip() {
        for id in IDENTIFIERS {
            for kind in FieldKind::all_variants() {
                assert_eq!(
                    strip_suffix(&to_wire_name(id, *kind)),
                    strip_suffix(id),
                    "{id} / {kind}"
                );
            }
        }
    }

    #[test]
    fn strip_suffix_prefers_longest() {
        assert_eq!(strip_suffix("Bar.Fill.Color"), "Bar");
        // `.Color` alone is not a known suffix
        assert_eq!(strip_suffix("Bar.Color"), "Bar.Color");
        assert_eq!(strip_suffix("Plain"), "Plain");
        assert_eq!(strip_suffix(""), "");
    }

    #[test]
    fn unknown_kind_string_is_schema_error() {
        assert_eq!(
            to_wire_name_str("Home", "visibility"),
            Err(SchemaError::UnknownFieldKind("visibility".into()))
        );
        assert_eq!(to_wire_name_str("Home", "text").unwrap(), "Home.Text");
    }

    #[test]
    fn kind_of_suffix_detects_kind() {
        assert_eq!(kind_of_suffix("A.Fill.Color"), Some(FieldKind::Fill));
        assert_eq!(kind_of_suffix("A.Source"), Some(FieldKind::Image));
        assert_eq!(kind_of_suffix("A"), None);
    }
}
