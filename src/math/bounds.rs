//! Axis-aligned geographic bounds used for view culling.

use super::position::Position;

/// A west/south/east/north rectangle in degrees. `GeoRect` does not model
/// antimeridian-crossing views; hosts split those into two rectangles.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct GeoRect {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoRect {
    #[inline]
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        GeoRect {
            west,
            south,
            east,
            north,
        }
    }

    /// The whole globe.
    pub fn whole_globe() -> Self {
        GeoRect::new(-180.0, -90.0, 180.0, 90.0)
    }

    /// The smallest rectangle containing every position, or `None` for the
    /// empty set.
    pub fn from_positions(positions: &[Position]) -> Option<Self> {
        let first = positions.first()?;
        let mut rect = GeoRect::new(
            first.longitude,
            first.latitude,
            first.longitude,
            first.latitude,
        );

        for v in &positions[1..] {
            rect.west = rect.west.min(v.longitude);
            rect.east = rect.east.max(v.longitude);
            rect.south = rect.south.min(v.latitude);
            rect.north = rect.north.max(v.latitude);
        }

        Some(rect)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.west > self.east || self.south > self.north
    }

    #[inline]
    pub fn contains(&self, v: Position) -> bool {
        v.longitude >= self.west
            && v.longitude <= self.east
            && v.latitude >= self.south
            && v.latitude <= self.north
    }

    pub fn intersects(&self, other: &GeoRect) -> bool {
        !(self.east < other.west
            || self.west > other.east
            || self.north < other.south
            || self.south > other.north)
    }

    pub fn center(&self) -> Position {
        Position::new(
            (self.west + self.east) / 2.0,
            (self.south + self.north) / 2.0,
            0.0,
        )
    }

    /// Grows the rectangle by `degrees` on every side, clamped to the globe.
    pub fn expanded(&self, degrees: f64) -> GeoRect {
        GeoRect {
            west: (self.west - degrees).max(-180.0),
            south: (self.south - degrees).max(-90.0),
            east: (self.east + degrees).min(180.0),
            north: (self.north + degrees).min(90.0),
        }
    }
}

impl Default for GeoRect {
    fn default() -> Self {
        GeoRect::whole_globe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment() {
        let rect = GeoRect::new(100.0, 30.0, 120.0, 45.0);
        assert!(rect.contains(Position::new(116.4, 39.9, 0.0)));
        assert!(!rect.contains(Position::new(0.0, 0.0, 0.0)));

        let hull =
            GeoRect::from_positions(&[Position::new(1.0, 2.0, 0.0), Position::new(-3.0, 7.0, 0.0)])
                .unwrap();
        assert_eq!(hull, GeoRect::new(-3.0, 2.0, 1.0, 7.0));
        assert!(GeoRect::from_positions(&[]).is_none());
    }

    #[test]
    fn intersection() {
        let a = GeoRect::new(0.0, 0.0, 10.0, 10.0);
        let b = GeoRect::new(5.0, 5.0, 15.0, 15.0);
        let c = GeoRect::new(11.0, 0.0, 20.0, 10.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
