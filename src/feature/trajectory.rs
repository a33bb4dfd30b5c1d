//! Time-sampled trajectories with piecewise interpolation.

use crate::clock::interval::TimeInterval;
use crate::math::position::{polyline_length, Position};
use crate::utils::time::Timestamp;

use super::style::TrajectoryStyle;

/// One `(time, position, props)` tuple of an ordered series.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrajectorySample {
    pub time: Timestamp,
    pub position: Position,
    #[serde(default)]
    pub props: ::serde_json::Value,
}

impl TrajectorySample {
    pub fn new(time: Timestamp, position: Position) -> Self {
        TrajectorySample {
            time,
            position,
            props: ::serde_json::Value::Null,
        }
    }
}

/// Interpolation scheme between samples.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Piecewise linear (Lagrange degree 1).
    Linear,
    /// Lagrange polynomial over `degree + 1` neighboring samples.
    Lagrange { degree: u8 },
}

impl Default for Interpolation {
    fn default() -> Self {
        Interpolation::Linear
    }
}

/// Derived values recomputed whenever samples mutate.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct TrajectoryDerived {
    /// Seconds from first to last sample.
    pub duration: f64,
    /// Summed segment distance in meters.
    pub distance: f64,
    pub sample_count: usize,
}

/// A time-parameterized path. Samples stay strictly time-ordered; evaluation
/// outside the sampled span clamps to the endpoints unless extrapolation is
/// explicitly enabled.
#[derive(Debug, Clone)]
pub struct Trajectory {
    samples: Vec<TrajectorySample>,
    pub interpolation: Interpolation,
    /// Seconds of path drawn ahead of the current time.
    pub lead_time: Option<f64>,
    /// Seconds of path retained behind the current time.
    pub trail_time: Option<f64>,
    pub extrapolate: bool,
    pub style: TrajectoryStyle,
    derived: TrajectoryDerived,
}

impl Default for Trajectory {
    fn default() -> Self {
        Trajectory {
            samples: Vec::new(),
            interpolation: Interpolation::default(),
            lead_time: None,
            trail_time: None,
            extrapolate: false,
            style: TrajectoryStyle::default(),
            derived: TrajectoryDerived::default(),
        }
    }
}

impl Trajectory {
    pub fn new(samples: Vec<TrajectorySample>) -> Self {
        let mut v = Trajectory::default();
        v.set_samples(samples);
        v
    }

    #[inline]
    pub fn samples(&self) -> &[TrajectorySample] {
        &self.samples
    }

    /// Replaces the sample series. Input is sorted by time; samples with
    /// duplicate times keep the last occurrence, with a warning.
    pub fn set_samples(&mut self, mut samples: Vec<TrajectorySample>) {
        samples.sort_by(|a, b| {
            a.time
                .partial_cmp(&b.time)
                .unwrap_or(::std::cmp::Ordering::Equal)
        });

        let before = samples.len();
        samples.dedup_by(|next, prev| prev.time == next.time && {
            ::std::mem::swap(prev, next);
            true
        });
        if samples.len() != before {
            warn!(
                "Dropped {} trajectory samples with duplicate times.",
                before - samples.len()
            );
        }

        self.samples = samples;
        self.invalidate_derived();
    }

    /// Inserts one sample, keeping time order. A sample at an existing time
    /// replaces the old one.
    pub fn push_sample(&mut self, sample: TrajectorySample) {
        match self.samples.binary_search_by(|v| {
            v.time
                .partial_cmp(&sample.time)
                .unwrap_or(::std::cmp::Ordering::Equal)
        }) {
            Ok(at) => self.samples[at] = sample,
            Err(at) => self.samples.insert(at, sample),
        }
        self.invalidate_derived();
    }

    pub fn clear_samples(&mut self) {
        self.samples.clear();
        self.invalidate_derived();
    }

    /// The sampled time span, or `None` when empty.
    pub fn span(&self) -> Option<TimeInterval> {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => Some(TimeInterval::new(first.time, last.time)),
            _ => None,
        }
    }

    #[inline]
    pub fn derived(&self) -> TrajectoryDerived {
        self.derived
    }

    #[inline]
    pub fn duration(&self) -> f64 {
        self.derived.duration
    }

    #[inline]
    pub fn total_distance(&self) -> f64 {
        self.derived.distance
    }

    #[inline]
    pub fn sample_count(&self) -> usize {
        self.derived.sample_count
    }

    /// The interpolated position at `t`, or `None` when the trajectory has
    /// no samples.
    pub fn position_at(&self, t: Timestamp) -> Option<Position> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;

        if self.samples.len() == 1 {
            return Some(first.position);
        }

        if t <= first.time {
            return Some(if self.extrapolate {
                self.extrapolated(t, &self.samples[0], &self.samples[1])
            } else {
                first.position
            });
        }
        if t >= last.time {
            let n = self.samples.len();
            return Some(if self.extrapolate {
                self.extrapolated(t, &self.samples[n - 2], &self.samples[n - 1])
            } else {
                last.position
            });
        }

        match self.interpolation {
            Interpolation::Linear => Some(self.linear_at(t)),
            Interpolation::Lagrange { degree } => Some(self.lagrange_at(t, degree.max(1) as usize)),
        }
    }

    /// Bearing of travel at `t` in degrees, `None` when underdetermined.
    pub fn bearing_at(&self, t: Timestamp) -> Option<f64> {
        let span = self.span()?;
        if self.samples.len() < 2 {
            return None;
        }

        // Probe a small step ahead (behind at the very end) of t.
        let step = (span.duration() / 1000.0).max(1e-3);
        let (a, b) = if t + step <= span.end {
            (t, t + step)
        } else {
            (t + -step, t)
        };

        let from = self.position_at(a)?;
        let to = self.position_at(b)?;
        if from == to {
            return None;
        }
        Some(from.bearing(to))
    }

    /// The interpolated path restricted to `[now - trail, now + lead]`,
    /// resampled at `segments + 1` points. With neither lead nor trail set,
    /// returns the raw sample positions.
    pub fn path_window(&self, now: Timestamp, segments: usize) -> Vec<Position> {
        let span = match self.span() {
            Some(span) => span,
            None => return Vec::new(),
        };

        if self.lead_time.is_none() && self.trail_time.is_none() {
            return self.samples.iter().map(|v| v.position).collect();
        }

        let start = match self.trail_time {
            Some(trail) => span.clamp(now + -trail),
            None => span.start,
        };
        let end = match self.lead_time {
            Some(lead) => span.clamp(now + lead),
            None => span.end,
        };

        if end <= start {
            return Vec::new();
        }

        let segments = segments.max(1);
        let dt = (end - start) / segments as f64;
        (0..=segments)
            .filter_map(|i| self.position_at(start + dt * i as f64))
            .collect()
    }

    fn linear_at(&self, t: Timestamp) -> Position {
        let at = self
            .samples
            .binary_search_by(|v| {
                v.time
                    .partial_cmp(&t)
                    .unwrap_or(::std::cmp::Ordering::Equal)
            })
            .unwrap_or_else(|i| i);

        // `t` is strictly inside the span here.
        let (prev, next) = (&self.samples[at - 1], &self.samples[at]);
        let dt = next.time - prev.time;
        if dt <= 0.0 {
            return next.position;
        }

        prev.position.lerp(next.position, (t - prev.time) / dt)
    }

    fn lagrange_at(&self, t: Timestamp, degree: usize) -> Position {
        // Window of degree + 1 samples centered on the bracketing segment.
        let upper = self
            .samples
            .binary_search_by(|v| {
                v.time
                    .partial_cmp(&t)
                    .unwrap_or(::std::cmp::Ordering::Equal)
            })
            .unwrap_or_else(|i| i);

        let take = (degree + 1).min(self.samples.len());
        let half = take / 2;
        let lo = upper
            .saturating_sub(half)
            .min(self.samples.len() - take);
        let window = &self.samples[lo..lo + take];

        let t0 = window[0].time;
        let x = t - t0;
        let (mut lon, mut lat, mut h) = (0.0, 0.0, 0.0);
        for (i, si) in window.iter().enumerate() {
            let xi = si.time - t0;
            let mut basis = 1.0;
            for (j, sj) in window.iter().enumerate() {
                if i != j {
                    let xj = sj.time - t0;
                    basis *= (x - xj) / (xi - xj);
                }
            }
            lon += si.position.longitude * basis;
            lat += si.position.latitude * basis;
            h += si.position.height * basis;
        }

        Position::new(lon, lat, h).normalized()
    }

    fn extrapolated(&self, t: Timestamp, a: &TrajectorySample, b: &TrajectorySample) -> Position {
        let dt = b.time - a.time;
        if dt <= 0.0 {
            return b.position;
        }
        a.position.lerp(b.position, (t - a.time) / dt)
    }

    fn invalidate_derived(&mut self) {
        let positions: Vec<Position> = self.samples.iter().map(|v| v.position).collect();
        self.derived = TrajectoryDerived {
            duration: self.span().map(|v| v.duration()).unwrap_or(0.0),
            distance: polyline_length(&positions),
            sample_count: self.samples.len(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: f64) -> Timestamp {
        Timestamp::from_seconds(secs)
    }

    fn sample(secs: f64, lon: f64, lat: f64) -> TrajectorySample {
        TrajectorySample::new(t(secs), Position::new(lon, lat, 0.0))
    }

    #[test]
    fn linear_interpolation_hits_midpoint() {
        let v = Trajectory::new(vec![sample(0.0, 0.0, 0.0), sample(10.0, 1.0, 0.0)]);
        let mid = v.position_at(t(5.0)).unwrap();
        assert!((mid.longitude - 0.5).abs() < 1e-9);

        // Sample times evaluate to the sample positions exactly.
        assert!((v.position_at(t(0.0)).unwrap().longitude - 0.0).abs() < 1e-9);
        assert!((v.position_at(t(10.0)).unwrap().longitude - 1.0).abs() < 1e-9);
    }

    #[test]
    fn clamps_outside_span_unless_extrapolating() {
        let mut v = Trajectory::new(vec![sample(0.0, 0.0, 0.0), sample(10.0, 1.0, 0.0)]);
        assert_eq!(v.position_at(t(-5.0)).unwrap().longitude, 0.0);
        assert_eq!(v.position_at(t(50.0)).unwrap().longitude, 1.0);

        v.extrapolate = true;
        assert!((v.position_at(t(20.0)).unwrap().longitude - 2.0).abs() < 1e-9);
    }

    #[test]
    fn samples_stay_ordered() {
        let mut v = Trajectory::new(vec![sample(10.0, 1.0, 0.0), sample(0.0, 0.0, 0.0)]);
        assert_eq!(v.samples()[0].time, t(0.0));

        v.push_sample(sample(5.0, 0.7, 0.0));
        assert_eq!(v.sample_count(), 3);
        assert_eq!(v.samples()[1].time, t(5.0));

        // Same-time insertion replaces.
        v.push_sample(sample(5.0, 0.9, 0.0));
        assert_eq!(v.sample_count(), 3);
        assert!((v.position_at(t(5.0)).unwrap().longitude - 0.9).abs() < 1e-9);
    }

    #[test]
    fn derived_values_follow_mutations() {
        let mut v = Trajectory::new(vec![sample(0.0, 0.0, 0.0), sample(10.0, 1.0, 0.0)]);
        assert_eq!(v.duration(), 10.0);
        assert!(v.total_distance() > 100_000.0);

        v.clear_samples();
        assert_eq!(v.duration(), 0.0);
        assert_eq!(v.sample_count(), 0);
        assert!(v.position_at(t(0.0)).is_none());
    }

    #[test]
    fn bearing_points_east() {
        let v = Trajectory::new(vec![sample(0.0, 0.0, 0.0), sample(10.0, 1.0, 0.0)]);
        let bearing = v.bearing_at(t(5.0)).unwrap();
        assert!((bearing - 90.0).abs() < 1.0);
    }

    #[test]
    fn lagrange_degree_two() {
        let mut v = Trajectory::new(vec![
            sample(0.0, 0.0, 0.0),
            sample(10.0, 1.0, 0.0),
            sample(20.0, 4.0, 0.0),
        ]);
        v.interpolation = Interpolation::Lagrange { degree: 2 };

        // Quadratic through (0,0), (10,1), (20,4) is x(t) = t^2/100.
        let at5 = v.position_at(t(5.0)).unwrap();
        assert!((at5.longitude - 0.25).abs() < 1e-9);
    }

    #[test]
    fn path_window_respects_lead_and_trail() {
        let mut v = Trajectory::new(vec![sample(0.0, 0.0, 0.0), sample(100.0, 1.0, 0.0)]);
        v.lead_time = Some(10.0);
        v.trail_time = Some(10.0);

        let path = v.path_window(t(50.0), 4);
        assert_eq!(path.len(), 5);
        assert!((path[0].longitude - 0.4).abs() < 1e-9);
        assert!((path[4].longitude - 0.6).abs() < 1e-9);
    }
}
