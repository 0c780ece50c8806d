use crate::api::RemoteFieldDescriptor;
use std::collections::HashMap;

/// Issued when a discovery request starts; hand it back with the result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveryTicket {
    input_id: String,
    generation: u64,
}

impl DiscoveryTicket {
    pub fn input_id(&self) -> &str {
        &self.input_id
    }
}

/// Discovered remote fields per input, for the lifetime of a session.
///
/// Written only by `complete` (populate on discovery) and the `invalidate*`
/// methods. A result whose ticket is older than the latest request for the
/// same input, or that predates an invalidation, is discarded.
#[derive(Default)]
pub struct FieldCache {
    entries: HashMap<String, Vec<RemoteFieldDescriptor>>,
    /// Latest generation issued per input
    pending: HashMap<String, u64>,
    next_generation: u64,
}

impl FieldCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, input_id: &str) -> Option<&[RemoteFieldDescriptor]> {
        self.entries.get(input_id).map(Vec::as_slice)
    }

    pub fn contains(&self, input_id: &str) -> bool {
        self.entries.contains_key(input_id)
    }

    /// Start a discovery for `input_id`, superseding any in flight.
    pub fn begin(&mut self, input_id: &str) -> DiscoveryTicket {
        self.next_generation += 1;
        self.pending
            .insert(input_id.to_string(), self.next_generation);
        DiscoveryTicket {
            input_id: input_id.to_string(),
            generation: self.next_generation,
        }
    }

    /// Store a discovery result. Returns false if it was stale and dropped.
    pub fn complete(&mut self, ticket: DiscoveryTicket, fields: Vec<RemoteFieldDescriptor>) -> bool {
        if self.pending.get(&ticket.input_id) != Some(&ticket.generation) {
            log::debug!(
                "Discarding stale field discovery for {} (generation {})",
                ticket.input_id,
                ticket.generation
            );
            return false;
        }
        self.pending.remove(&ticket.input_id);
        self.entries.insert(ticket.input_id, fields);
        true
    }

    pub fn invalidate(&mut self, input_id: &str) {
        self.entries.remove(input_id);
        self.pending.remove(input_id);
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldKind;

    fn fields(name: &str) -> Vec<RemoteFieldDescriptor> {
        vec![RemoteFieldDescriptor {
            name: name.into(),
            kind: FieldKind::Text,
        }]
    }

    #[test]
    fn complete_populates_entry() {
        let mut cache = FieldCache::new();
        let ticket = cache.begin("a");
        assert!(cache.complete(ticket, fields("Home")));
        assert_eq!(cache.get("a").unwrap()[0].name, "Home");
    }

    #[test]
    fn superseded_result_is_discarded() {
        let mut cache = FieldCache::new();
        let old = cache.begin("a");
        let new = cache.begin("a");
        // Newer request resolves first, older one arrives late
        assert!(cache.complete(new, fields("New")));
        assert!(!cache.complete(old, fields("Old")));
        assert_eq!(cache.get("a").unwrap()[0].name, "New");
    }

    #[test]
    fn other_inputs_are_independent() {
        let mut cache = FieldCache::new();
        let a = cache.begin("a");
        let b = cache.begin("b");
        assert!(cache.complete(b, fields("B")));
        assert!(cache.complete(a, fields("A")));
        assert!(cache.contains("a") && cache.contains("b"));
    }

    #[test]
    fn invalidate_drops_entry_and_in_flight_result() {
        let mut cache = FieldCache::new();
        let done = cache.begin("a");
        cache.complete(done, fields("Home"));
        let in_flight = cache.begin("a");
        cache.invalidate("a");
        assert!(cache.get("a").is_none());
        assert!(!cache.complete(in_flight, fields("Late")));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn invalidate_all_clears_everything() {
        let mut cache = FieldCache::new();
        for id in ["a", "b"] {
            let t = cache.begin(id);
            cache.complete(t, fields("X"));
        }
        cache.invalidate_all();
        assert!(!cache.contains("a"));
        assert!(!cache.contains("b"));
    }
}
