//! Named event counters.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A fixed set of thread-safe counters, registered up front.
///
/// Unknown names are ignored on write and read as zero.
pub struct EventCounters {
    counters: BTreeMap<&'static str, AtomicU64>,
}

impl EventCounters {
    pub fn new(names: &[&'static str]) -> Self {
        Self {
            counters: names.iter().map(|&n| (n, AtomicU64::new(0))).collect(),
        }
    }

    /// Bump a counter by one.
    pub fn increment(&self, name: &str) {
        self.add(name, 1);
    }

    pub fn add(&self, name: &str, value: u64) {
        if let Some(counter) = self.counters.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
        }
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Current values, ordered by name.
    pub fn snapshot(&self) -> BTreeMap<&'static str, u64> {
        self.counters
            .iter()
            .map(|(&k, v)| (k, v.load(Ordering::Relaxed)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_registered_names_only() {
        let c = EventCounters::new(&["uploads", "decisions"]);
        c.increment("uploads");
        c.add("uploads", 2);
        c.increment("unknown");
        assert_eq!(c.get("uploads"), 3);
        assert_eq!(c.get("unknown"), 0);
        let snap = c.snapshot();
        assert_eq!(snap.keys().copied().collect::<Vec<_>>(), vec!["decisions", "uploads"]);
    }
}
