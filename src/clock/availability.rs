//! An interval index over feature availability windows.
//!
//! Entries are kept sorted by window start. A stabbing query walks only the
//! entries whose start lies in `[t - longest, t]`, where `longest` is the
//! longest window in the index, so lookups cost `O(log N + k)` for windows of
//! comparable length.

use crate::utils::hash::FastHashMap;
use crate::utils::time::Timestamp;

use super::interval::TimeInterval;

#[derive(Debug, Clone)]
struct Entry {
    start: Timestamp,
    end: Timestamp,
    id: String,
}

/// Maps feature ids to availability windows and answers "which ids are
/// eligible at time t".
#[derive(Debug, Default)]
pub struct AvailabilityIndex {
    // Sorted by `start`; parallel id -> window map for O(1) membership tests.
    entries: Vec<Entry>,
    windows: FastHashMap<String, TimeInterval>,
    longest: f64,
}

impl AvailabilityIndex {
    pub fn new() -> Self {
        Default::default()
    }

    /// Inserts or replaces the window for `id`.
    pub fn insert(&mut self, id: &str, window: TimeInterval) {
        if self.windows.contains_key(id) {
            self.remove(id);
        }

        let entry = Entry {
            start: window.start,
            end: window.end,
            id: id.to_string(),
        };

        let at = self
            .entries
            .binary_search_by(|v| {
                v.start
                    .partial_cmp(&entry.start)
                    .unwrap_or(::std::cmp::Ordering::Equal)
            })
            .unwrap_or_else(|i| i);
        self.entries.insert(at, entry);
        self.windows.insert(id.to_string(), window);
        self.longest = self.longest.max(window.duration());
    }

    /// Removes the window for `id`. Returns false if it had none.
    pub fn remove(&mut self, id: &str) -> bool {
        if self.windows.remove(id).is_none() {
            return false;
        }

        self.entries.retain(|v| v.id != id);
        // `longest` only shrinks on full recompute; stale values just widen
        // the query window, never miss entries.
        true
    }

    #[inline]
    pub fn window_of(&self, id: &str) -> Option<TimeInterval> {
        self.windows.get(id).cloned()
    }

    /// Whether `id` is eligible at `t`. Ids with no registered window are
    /// always eligible.
    #[inline]
    pub fn contains_at(&self, id: &str, t: Timestamp) -> bool {
        match self.windows.get(id) {
            Some(window) => window.contains(t),
            None => true,
        }
    }

    /// All registered ids whose window contains `t`, in window-start order.
    pub fn query(&self, t: Timestamp) -> Vec<&str> {
        if self.entries.is_empty() {
            return Vec::new();
        }

        // Upper bound: first entry with start > t.
        let ub = self
            .entries
            .partition_point_by(|v| v.start <= t);
        let horizon = t + (-self.longest);

        let mut hits = Vec::new();
        for v in self.entries[..ub].iter().rev() {
            if v.start < horizon {
                break;
            }
            if v.end >= t {
                hits.push(v.id.as_str());
            }
        }

        hits.reverse();
        hits
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.windows.clear();
        self.longest = 0.0;
    }
}

trait PartitionPoint<T> {
    fn partition_point_by<F: Fn(&T) -> bool>(&self, pred: F) -> usize;
}

impl<T> PartitionPoint<T> for [T] {
    // Binary search for the first element failing `pred`, assuming the slice
    // is partitioned.
    fn partition_point_by<F: Fn(&T) -> bool>(&self, pred: F) -> usize {
        let (mut lo, mut hi) = (0, self.len());
        while lo < hi {
            let mid = (lo + hi) / 2;
            if pred(&self[mid]) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: f64) -> Timestamp {
        Timestamp::from_seconds(secs)
    }

    fn iv(a: f64, b: f64) -> TimeInterval {
        TimeInterval::new(t(a), t(b))
    }

    #[test]
    fn stabbing_queries() {
        let mut index = AvailabilityIndex::new();
        index.insert("a", iv(0.0, 10.0));
        index.insert("b", iv(5.0, 15.0));
        index.insert("c", iv(20.0, 30.0));

        assert_eq!(index.query(t(7.0)), vec!["a", "b"]);
        assert_eq!(index.query(t(12.0)), vec!["b"]);
        assert_eq!(index.query(t(17.0)), Vec::<&str>::new());
        assert_eq!(index.query(t(20.0)), vec!["c"]);

        // Unregistered ids are always eligible; registered ones follow their
        // window.
        assert!(index.contains_at("unknown", t(999.0)));
        assert!(!index.contains_at("a", t(11.0)));
    }

    #[test]
    fn replace_and_remove() {
        let mut index = AvailabilityIndex::new();
        index.insert("a", iv(0.0, 1.0));
        index.insert("a", iv(100.0, 101.0));
        assert_eq!(index.len(), 1);
        assert!(index.query(t(0.5)).is_empty());
        assert_eq!(index.query(t(100.5)), vec!["a"]);

        assert!(index.remove("a"));
        assert!(!index.remove("a"));
        assert!(index.is_empty());
    }
}
