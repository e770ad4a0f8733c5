//! Counter collection.
//!
//! Insertion-ordered so reports are stable across runs.

/// A named set of monotone counters.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    entries: Vec<(String, u64)>,
}

impl Statistics {
    /// Empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` to a counter, creating it at zero if needed.
    pub fn update(&mut self, key: &str, delta: u64) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 += delta;
        } else {
            self.entries.push((key.to_string(), delta));
        }
    }

    /// Current value of a counter (zero if absent).
    #[must_use]
    pub fn get(&self, key: &str) -> u64 {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map_or(0, |(_, v)| *v)
    }

    /// Fold another collection into this one.
    pub fn merge(&mut self, other: &Statistics) {
        for (k, v) in &other.entries {
            self.update(k, *v);
        }
    }

    /// Iterate counters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Drop all counters.
    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_and_merge() {
        let mut a = Statistics::new();
        a.update("rounds", 2);
        a.update("rounds", 3);
        assert_eq!(a.get("rounds"), 5);
        let mut b = Statistics::new();
        b.update("rounds", 1);
        b.update("preds", 7);
        a.merge(&b);
        assert_eq!(a.get("rounds"), 6);
        assert_eq!(a.get("preds"), 7);
    }
}
