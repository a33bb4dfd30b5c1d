//! Relation lines between two point features, resolved by id each frame.

use std::f64::consts::PI;

use crate::math::position::Position;

use super::style::RelationStyle;

/// A line connecting two live point features. Endpoints are dereferenced by
/// id through the entity table; if either is absent the relation is hidden,
/// not an error.
#[derive(Debug, Clone)]
pub struct Relation {
    pub source_id: String,
    pub target_id: String,
    /// Arc along a vertical parabola instead of a straight segment.
    pub curve: bool,
    /// Parabola apex height in meters above the endpoint baseline.
    pub curve_height: f64,
    /// Sample count along the curve.
    pub segments: usize,
    pub style: RelationStyle,
    // Path from the latest endpoint resolution; rebuilt when either endpoint
    // moves.
    cached_path: Vec<Position>,
    cached_endpoints: Option<(Position, Position)>,
}

impl Relation {
    pub fn new<S: Into<String>, T: Into<String>>(source_id: S, target_id: T) -> Self {
        Relation {
            source_id: source_id.into(),
            target_id: target_id.into(),
            curve: false,
            curve_height: 50_000.0,
            segments: 50,
            style: RelationStyle::default(),
            cached_path: Vec::new(),
            cached_endpoints: None,
        }
    }

    /// The path from the latest resolution; empty while an endpoint is
    /// missing.
    #[inline]
    pub fn path(&self) -> &[Position] {
        &self.cached_path
    }

    /// Re-resolves the path against current endpoint positions. Passing
    /// `None` for either endpoint hides the relation. Returns true when the
    /// path changed.
    pub fn resolve(&mut self, source: Option<Position>, target: Option<Position>) -> bool {
        match (source, target) {
            (Some(source), Some(target)) => {
                if self.cached_endpoints == Some((source, target)) {
                    return false;
                }
                self.cached_path = self.sample_path(source, target);
                self.cached_endpoints = Some((source, target));
                true
            }
            _ => {
                let had_path = !self.cached_path.is_empty();
                self.cached_path.clear();
                self.cached_endpoints = None;
                had_path
            }
        }
    }

    /// Drops the cached path so the next `resolve` rebuilds it.
    pub fn invalidate(&mut self) {
        self.cached_endpoints = None;
    }

    /// Samples the path between two endpoints. Straight relations are the
    /// two endpoints; curved ones follow a vertical parabola with apex
    /// `curve_height`, producing `(lon, lat, h·sin(π·t))` points.
    pub fn sample_path(&self, source: Position, target: Position) -> Vec<Position> {
        if !self.curve {
            return vec![source, target];
        }

        let segments = self.segments.max(2);
        let mut path = Vec::with_capacity(segments + 1);
        for i in 0..=segments {
            let t = i as f64 / segments as f64;
            let mut v = source.lerp(target, t);
            v.height += self.curve_height * (PI * t).sin();
            path.push(v);
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lon: f64, lat: f64) -> Position {
        Position::new(lon, lat, 0.0)
    }

    #[test]
    fn missing_endpoint_hides_the_path() {
        let mut v = Relation::new("a", "b");
        assert!(v.resolve(Some(p(0.0, 0.0)), Some(p(1.0, 0.0))));
        assert_eq!(v.path().len(), 2);

        // Unchanged endpoints are not a path change.
        assert!(!v.resolve(Some(p(0.0, 0.0)), Some(p(1.0, 0.0))));

        assert!(v.resolve(Some(p(0.0, 0.0)), None));
        assert!(v.path().is_empty());
    }

    #[test]
    fn parabola_apex_at_midpoint() {
        let mut v = Relation::new("a", "b");
        v.curve = true;
        v.curve_height = 1000.0;
        v.segments = 50;

        let path = v.sample_path(p(0.0, 0.0), p(2.0, 0.0));
        assert_eq!(path.len(), 51);
        assert!((path[25].height - 1000.0).abs() < 1.0);
        assert_eq!(path[0].height, 0.0);
        // sin(π) underflows to ~0 at the far endpoint.
        assert!(path[50].height.abs() < 1e-9);
    }

    #[test]
    fn endpoint_movement_rebuilds_path() {
        let mut v = Relation::new("a", "b");
        v.resolve(Some(p(0.0, 0.0)), Some(p(1.0, 0.0)));
        assert!(v.resolve(Some(p(0.5, 0.0)), Some(p(1.0, 0.0))));
        assert_eq!(v.path()[0], p(0.5, 0.0));
    }
}
