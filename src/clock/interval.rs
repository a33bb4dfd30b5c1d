//! Closed time intervals.

use crate::utils::time::Timestamp;

/// An availability window `[start, end]` with `start <= end`. A feature with
/// no window is always available.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct TimeInterval {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeInterval {
    /// Constructs an interval, swapping the endpoints if given reversed.
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        if start <= end {
            TimeInterval { start, end }
        } else {
            TimeInterval {
                start: end,
                end: start,
            }
        }
    }

    /// Parses `{start, end}` from ISO-8601 strings.
    pub fn from_iso8601(start: &str, end: &str) -> crate::errors::Result<Self> {
        Ok(TimeInterval::new(
            Timestamp::parse(start)?,
            Timestamp::parse(end)?,
        ))
    }

    #[inline]
    pub fn contains(&self, t: Timestamp) -> bool {
        t >= self.start && t <= self.end
    }

    /// Interval length in seconds.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    #[inline]
    pub fn clamp(&self, t: Timestamp) -> Timestamp {
        t.max(self.start).min(self.end)
    }

    /// The overlap of two intervals, or `None` when they are disjoint.
    pub fn intersection(&self, other: &TimeInterval) -> Option<TimeInterval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start <= end {
            Some(TimeInterval { start, end })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: f64) -> Timestamp {
        Timestamp::from_seconds(secs)
    }

    #[test]
    fn containment_is_inclusive() {
        let v = TimeInterval::new(t(10.0), t(20.0));
        assert!(v.contains(t(10.0)));
        assert!(v.contains(t(20.0)));
        assert!(!v.contains(t(9.999)));
        assert_eq!(v.duration(), 10.0);

        // Reversed endpoints are swapped.
        let w = TimeInterval::new(t(20.0), t(10.0));
        assert_eq!(v, w);
    }

    #[test]
    fn intersection() {
        let a = TimeInterval::new(t(0.0), t(10.0));
        let b = TimeInterval::new(t(5.0), t(15.0));
        let c = TimeInterval::new(t(11.0), t(12.0));

        assert_eq!(a.intersection(&b), Some(TimeInterval::new(t(5.0), t(10.0))));
        assert_eq!(a.intersection(&c), None);
    }
}
