//! Finds an input configuration from whatever key a caller holds: the
//! internal id, the remote title, or the remote number.

use crate::config::{InputConfig, MirrorConfig};

/// A resolved input and the internal id it is stored under.
#[derive(Clone, Copy, Debug)]
pub struct InputMatch<'a> {
    pub id: &'a str,
    pub input: &'a InputConfig,
}

/// A lookup strategy: pure, returns the first match or nothing.
pub type Strategy = for<'a> fn(&'a MirrorConfig, &str) -> Option<InputMatch<'a>>;

/// Strategies in the order they are tried.
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("internal_id", by_internal_id as Strategy),
    ("remote_identity", by_remote_identity as Strategy),
];

pub fn find<'a>(config: &'a MirrorConfig, key: &str) -> Option<InputMatch<'a>> {
    STRATEGIES.iter().find_map(|(name, strategy)| {
        let found = strategy(config, key);
        if let Some(m) = &found {
            log::debug!("Resolved input key {:?} to {} via {}", key, m.id, name);
        }
        found
    })
}

/// Exact match against the internal id.
pub fn by_internal_id<'a>(config: &'a MirrorConfig, key: &str) -> Option<InputMatch<'a>> {
    config
        .inputs
        .get_key_value(key)
        .map(|(id, input)| InputMatch { id: id.as_str(), input })
}

/// Trimmed, case-sensitive match against the remote title, or the remote
/// number for inputs without a title.
pub fn by_remote_identity<'a>(config: &'a MirrorConfig, key: &str) -> Option<InputMatch<'a>> {
    let wanted = key.trim();
    if wanted.is_empty() {
        return None;
    }
    scan_order(config).find(|m| remote_identity(m.input) == Some(wanted))
}

fn remote_identity(input: &InputConfig) -> Option<&str> {
    let title = input.remote_title.trim();
    if !title.is_empty() {
        return Some(title);
    }
    let number = input.remote_number.trim();
    (!number.is_empty()).then_some(number)
}

/// Inputs in display order, then any stragglers not listed in the order.
fn scan_order(config: &MirrorConfig) -> impl Iterator<Item = InputMatch<'_>> {
    let ordered = config
        .ordered_inputs()
        .map(|(id, input)| InputMatch { id, input });
    let stragglers = config
        .inputs
        .iter()
        .filter(|(id, _)| !config.input_order.contains(id))
        .map(|(id, input)| InputMatch { id: id.as_str(), input });
    ordered.chain(stragglers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RemoteInputDescriptor;

    fn make_config() -> (MirrorConfig, String, String) {
        let mut config = MirrorConfig::default();
        let score = config.add_input(
            "Score",
            &RemoteInputDescriptor {
                key: "key-a".into(),
                title: " Scoreboard ".into(),
                number: "12".into(),
            },
        );
        let card = config.add_input(
            "Card",
            &RemoteInputDescriptor {
                key: "key-b".into(),
                title: String::new(),
                number: "4".into(),
            },
        );
        (config, score, card)
    }

    #[test]
    fn internal_id_takes_precedence() {
        let (config, score, _) = make_config();
        let found = find(&config, &score).unwrap();
        assert_eq!(found.id, score);
    }

    #[test]
    fn padded_title_matches_after_trimming() {
        let (config, score, _) = make_config();
        let found = find(&config, "  Scoreboard  ").unwrap();
        assert_eq!(found.id, score);
        assert_eq!(found.input.display_name, "Score");
    }

    #[test]
    fn title_match_is_case_sensitive() {
        let (config, _, _) = make_config();
        assert!(find(&config, "scoreboard").is_none());
    }

    #[test]
    fn number_used_when_title_absent() {
        let (config, _, card) = make_config();
        assert_eq!(find(&config, "4").unwrap().id, card);
        // Titled inputs are not matched by number
        assert!(find(&config, "12").is_none());
    }

    #[test]
    fn missing_key_is_not_found() {
        let (config, _, _) = make_config();
        assert!(find(&config, "Nope").is_none());
        assert!(find(&config, "   ").is_none());
    }

    #[test]
    fn stragglers_outside_order_are_scanned() {
        let (mut config, _, card) = make_config();
        config.input_order.retain(|id| id != &card);
        assert_eq!(find(&config, "4").unwrap().id, card);
    }
}
