//! Replica ordinal bookkeeping per logical service name.

use std::collections::HashMap;

/// Next unassigned replica ordinal for each child name a parent announced.
#[derive(Debug, Default)]
pub(crate) struct IdentityCounters {
    next: HashMap<String, u32>,
}

impl IdentityCounters {
    /// Hand out the next ordinal for `name`, or `None` if no parent seeded it.
    pub fn take_next(&mut self, name: &str) -> Option<u32> {
        let counter = self.next.get_mut(name)?;
        let id = *counter;
        *counter = counter.saturating_add(1);
        Some(id)
    }

    /// Reset `name` to start numbering at zero.
    pub fn seed(&mut self, name: &str) {
        self.next.insert(name.to_string(), 0);
    }

    /// Forget `name`. Returns whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.next.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.next.get(name).copied()
    }

    pub fn clear(&mut self) {
        self.next.clear();
    }
}
