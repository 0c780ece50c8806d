//! Heals input configurations after the remote system renames or
//! renumbers its inputs.
//!
//! Inputs are matched by their stable remote key. Only `remote_title` and
//! `remote_number` are ever rewritten; field mappings are left as they are.
//! Overlay bindings that reached a healed input through its old title or
//! number are pinned to the internal id so they keep resolving.

use crate::api::RemoteInputDescriptor;
use crate::config::MirrorConfig;
use crate::resolve;
use std::collections::{HashMap, HashSet};

/// Result of a reconciliation pass.
#[derive(Clone, Debug, PartialEq)]
pub struct RemapOutcome {
    pub config: MirrorConfig,
    pub updated_count: usize,
    /// Internal ids whose remote identity was rewritten, in input order
    pub updated_ids: Vec<String>,
    /// Internal ids whose stale remote key no longer exists remotely
    pub unresolved_ids: Vec<String>,
    /// Overlay actions whose binding was repointed at an internal id
    pub rebound_actions: Vec<String>,
}

impl RemapOutcome {
    pub fn changed(&self) -> bool {
        self.updated_count > 0
    }
}

/// Reconcile `config` against the live remote input list.
///
/// Produces a new configuration; `config` itself is not touched.
pub fn reconcile(config: &MirrorConfig, live: &[RemoteInputDescriptor]) -> RemapOutcome {
    let by_key: HashMap<&str, &RemoteInputDescriptor> = live
        .iter()
        .filter(|d| !d.key.is_empty())
        .map(|d| (d.key.as_str(), d))
        .collect();
    let live_titles: HashSet<&str> = live.iter().map(|d| d.title.as_str()).collect();

    let mut next = config.clone();
    let mut updated_ids = Vec::new();
    let mut unresolved_ids = Vec::new();

    for id in &config.input_order {
        let Some(input) = next.inputs.get_mut(id) else {
            continue;
        };
        let Some(key) = input.remote_key().map(str::to_string) else {
            continue;
        };
        // Title still present remotely: nothing to heal, even if the key
        // now points elsewhere.
        if live_titles.contains(input.remote_title.as_str()) {
            continue;
        }
        match by_key.get(key.as_str()) {
            Some(descriptor) => {
                log::info!(
                    "Remapping input {} ({}): title {:?} -> {:?}, number {:?} -> {:?}",
                    id,
                    key,
                    input.remote_title,
                    descriptor.title,
                    input.remote_number,
                    descriptor.number
                );
                input.remote_title = descriptor.title.clone();
                input.remote_number = descriptor.number.clone();
                updated_ids.push(id.clone());
            }
            None => {
                log::info!(
                    "Input {} still unresolved: remote key {} is not live",
                    id,
                    key
                );
                unresolved_ids.push(id.clone());
            }
        }
    }

    let healed: HashSet<&str> = updated_ids.iter().map(String::as_str).collect();
    let mut rebound_actions = Vec::new();
    for (action_id, key) in next.overlay_bindings.iter_mut() {
        let Some(found) = resolve::find(config, key) else {
            continue;
        };
        if found.id != key.as_str() && healed.contains(found.id) {
            log::info!("Overlay {} bound to {:?} now follows input {}", action_id, key, found.id);
            *key = found.id.to_string();
            rebound_actions.push(action_id.clone());
        }
    }

    RemapOutcome {
        config: next,
        updated_count: updated_ids.len(),
        updated_ids,
        unresolved_ids,
        rebound_actions,
    }
}
