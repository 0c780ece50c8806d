//! Registry of match data points that can be mapped onto remote fields.

use crate::field::FieldKind;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMapType {
    Text,
    Color,
    Image,
    Visibility,
}

impl DataMapType {
    /// Whether entries of this type may feed a field of `kind`.
    ///
    /// Visibility rides on text fields as a shown/hidden attribute.
    pub fn is_compatible_with(self, kind: FieldKind) -> bool {
        matches!(
            (kind, self),
            (FieldKind::Text, DataMapType::Text | DataMapType::Visibility)
                | (FieldKind::Fill, DataMapType::Color)
                | (FieldKind::Image, DataMapType::Image)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DataMapEntry {
    pub key: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub data_type: DataMapType,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct DataMapGroup {
    pub name: &'static str,
    pub entries: &'static [DataMapEntry],
}

/// Owned result of a filtered lookup.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatalogGroup {
    pub name: &'static str,
    pub entries: Vec<DataMapEntry>,
}

const fn entry(key: &'static str, label: &'static str, data_type: DataMapType) -> DataMapEntry {
    DataMapEntry { key, label, data_type }
}

use DataMapType::{Color, Image, Text, Visibility};

static CATALOG: &[DataMapGroup] = &[
    DataMapGroup {
        name: "Home team",
        entries: &[
            entry("home.name", "Home name", Text),
            entry("home.shortName", "Home short name", Text),
            entry("home.points", "Home points", Text),
            entry("home.setsWon", "Home sets won", Text),
            entry("home.timeouts", "Home timeouts", Text),
            entry("home.coach", "Home coach", Text),
            entry("home.color", "Home color", Color),
            entry("home.logo", "Home logo", Image),
            entry("home.serving", "Home serving", Visibility),
        ],
    },
    DataMapGroup {
        name: "Away team",
        entries: &[
            entry("away.name", "Away name", Text),
            entry("away.shortName", "Away short name", Text),
            entry("away.points", "Away points", Text),
            entry("away.setsWon", "Away sets won", Text),
            entry("away.timeouts", "Away timeouts", Text),
            entry("away.coach", "Away coach", Text),
            entry("away.color", "Away color", Color),
            entry("away.logo", "Away logo", Image),
            entry("away.serving", "Away serving", Visibility),
        ],
    },
    DataMapGroup {
        name: "Set scores",
        entries: &[
            entry("currentSet", "Current set", Text),
            entry("sets.0.home", "Set 1 home", Text),
            entry("sets.0.away", "Set 1 away", Text),
            entry("sets.1.home", "Set 2 home", Text),
            entry("sets.1.away", "Set 2 away", Text),
            entry("sets.2.home", "Set 3 home", Text),
            entry("sets.2.away", "Set 3 away", Text),
            entry("sets.3.home", "Set 4 home", Text),
            entry("sets.3.away", "Set 4 away", Text),
            entry("sets.4.home", "Set 5 home", Text),
            entry("sets.4.away", "Set 5 away", Text),
        ],
    },
    DataMapGroup {
        name: "Officials",
        entries: &[
            entry("referees.first", "First referee", Text),
            entry("referees.second", "Second referee", Text),
        ],
    },
    DataMapGroup {
        name: "Event",
        entries: &[
            entry("competition", "Competition", Text),
            entry("venue", "Venue", Text),
        ],
    },
];

/// The full catalog, in display order.
pub fn groups() -> &'static [DataMapGroup] {
    CATALOG
}

/// Catalog groups, optionally filtered to entries usable by `filter`.
/// Groups left empty by the filter are omitted.
pub fn lookup(filter: Option<FieldKind>) -> Vec<CatalogGroup> {
    CATALOG
        .iter()
        .filter_map(|group| {
            let entries: Vec<DataMapEntry> = group
                .entries
                .iter()
                .filter(|e| filter.is_none_or(|kind| e.data_type.is_compatible_with(kind)))
                .copied()
                .collect();
            (!entries.is_empty()).then_some(CatalogGroup {
                name: group.name,
                entries,
            })
        })
        .collect()
}

/// Find an entry by key regardless of kind.
pub fn find(key: &str) -> Option<&'static DataMapEntry> {
    CATALOG
        .iter()
        .flat_map(|group| group.entries.iter())
        .find(|e| e.key == key)
}

/// Human label for a stored data-map key. Falls back to the raw key.
pub fn label_for(key: &str, kind: FieldKind) -> String {
    match find(key) {
        Some(e) if e.data_type.is_compatible_with(kind) => e.label.to_string(),
        _ => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfiltered_lookup_returns_every_group() {
        let all = lookup(None);
        assert_eq!(all.len(), CATALOG.len());
        let total: usize = all.iter().map(|g| g.entries.len()).sum();
        let expected: usize = CATALOG.iter().map(|g| g.entries.len()).sum();
        assert_eq!(total, expected);
    }

    #[test]
    fn text_filter_admits_visibility() {
        let groups = lookup(Some(FieldKind::Text));
        let entries: Vec<_> = groups.iter().flat_map(|g| g.entries.iter()).collect();
        assert!(entries.iter().any(|e| e.data_type == DataMapType::Visibility));
        assert!(entries
            .iter()
            .all(|e| matches!(e.data_type, DataMapType::Text | DataMapType::Visibility)));
    }

    #[test]
    fn fill_filter_drops_empty_groups() {
        let groups = lookup(Some(FieldKind::Fill));
        let names: Vec<_> = groups.iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["Home team", "Away team"]);
        assert!(groups
            .iter()
            .flat_map(|g| g.entries.iter())
            .all(|e| e.data_type == DataMapType::Color));
    }

    #[test]
    fn image_filter_only_images() {
        let keys: Vec<_> = lookup(Some(FieldKind::Image))
            .into_iter()
            .flat_map(|g| g.entries)
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["home.logo", "away.logo"]);
    }

    #[test]
    fn label_for_falls_back_to_key() {
        assert_eq!(label_for("home.name", FieldKind::Text), "Home name");
        assert_eq!(label_for("missing.key", FieldKind::Text), "missing.key");
        // Known key but incompatible kind
        assert_eq!(label_for("home.logo", FieldKind::Text), "home.logo");
    }

    #[test]
    fn keys_are_unique() {
        let mut keys: Vec<_> = CATALOG
            .iter()
            .flat_map(|g| g.entries.iter().map(|e| e.key))
            .collect();
        let len = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), len);
    }
}
