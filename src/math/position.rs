//! Geographic positions and the spherical helpers built on them.
//!
//! All angles at the API boundary are degrees; heights are meters above the
//! ellipsoid. Distance helpers use the WGS84 mean radius, which is accurate
//! enough for visualization work.

use std::f64::consts::PI;

use cgmath::{InnerSpace, Vector3};

/// WGS84 equatorial radius, in meters.
pub const WGS84_EQUATORIAL_RADIUS: f64 = 6_378_137.0;

/// WGS84 mean radius, in meters. Spherical distance/area helpers use this.
pub const WGS84_MEAN_RADIUS: f64 = 6_371_008.8;

/// A geographic position: `longitude ∈ [-180, 180]`, `latitude ∈ [-90, 90]`,
/// `height` in meters above the ellipsoid.
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq)]
pub struct Position {
    pub longitude: f64,
    pub latitude: f64,
    #[serde(default)]
    pub height: f64,
}

impl Position {
    #[inline]
    pub fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Position {
            longitude,
            latitude,
            height,
        }
    }

    /// Returns true if all components are finite and inside the canonical
    /// ranges.
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && self.height.is_finite()
            && self.longitude >= -180.0
            && self.longitude <= 180.0
            && self.latitude >= -90.0
            && self.latitude <= 90.0
    }

    /// Wraps longitude into `[-180, 180]` and clamps latitude into
    /// `[-90, 90]`.
    pub fn normalized(self) -> Position {
        let mut lon = self.longitude % 360.0;
        if lon > 180.0 {
            lon -= 360.0;
        } else if lon < -180.0 {
            lon += 360.0;
        }

        Position {
            longitude: lon,
            latitude: self.latitude.max(-90.0).min(90.0),
            height: self.height,
        }
    }

    /// Great-circle surface distance to `other`, in meters (haversine).
    pub fn surface_distance(self, other: Position) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * WGS84_MEAN_RADIUS * a.sqrt().min(1.0).asin()
    }

    /// Unit direction from the globe center towards this position.
    pub fn to_unit_vector(self) -> Vector3<f64> {
        let lat = self.latitude.to_radians();
        let lon = self.longitude.to_radians();
        Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
    }

    /// Cartesian coordinates in meters, on the mean-radius sphere.
    pub fn to_cartesian(self) -> Vector3<f64> {
        self.to_unit_vector() * (WGS84_MEAN_RADIUS + self.height)
    }

    /// Straight-line (chord) distance to `other` including heights, in
    /// meters. This is the distance culling and LOD care about.
    pub fn distance(self, other: Position) -> f64 {
        (self.to_cartesian() - other.to_cartesian()).magnitude()
    }

    /// Initial great-circle bearing towards `other`, in degrees `[0, 360)`
    /// clockwise from north.
    pub fn bearing(self, other: Position) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let dlon = (other.longitude - self.longitude).to_radians();

        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        (y.atan2(x).to_degrees() + 360.0) % 360.0
    }

    /// The position reached by travelling `distance` meters along the given
    /// initial bearing (degrees). Height is carried over unchanged.
    pub fn destination(self, bearing: f64, distance: f64) -> Position {
        let delta = distance / WGS84_MEAN_RADIUS;
        let theta = bearing.to_radians();
        let lat1 = self.latitude.to_radians();
        let lon1 = self.longitude.to_radians();

        let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
        let lon2 = lon1
            + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

        Position::new(lon2.to_degrees(), lat2.to_degrees(), self.height).normalized()
    }

    /// Component-wise linear interpolation towards `other`. Longitudes take
    /// the short way around the antimeridian.
    pub fn lerp(self, other: Position, t: f64) -> Position {
        let mut dlon = other.longitude - self.longitude;
        if dlon > 180.0 {
            dlon -= 360.0;
        } else if dlon < -180.0 {
            dlon += 360.0;
        }

        Position {
            longitude: self.longitude + dlon * t,
            latitude: self.latitude + (other.latitude - self.latitude) * t,
            height: self.height + (other.height - self.height) * t,
        }
        .normalized()
    }

    /// The great-circle midpoint between `self` and `other`.
    pub fn midpoint(self, other: Position) -> Position {
        let mut mid = self.lerp(other, 0.5);
        mid.height = (self.height + other.height) / 2.0;
        mid
    }
}

/// Total length of a polyline, in meters: great-circle arcs plus height
/// deltas per segment.
pub fn polyline_length(positions: &[Position]) -> f64 {
    positions
        .windows(2)
        .map(|w| {
            let ground = w[0].surface_distance(w[1]);
            let dh = w[1].height - w[0].height;
            (ground * ground + dh * dh).sqrt()
        })
        .sum()
}

/// Arithmetic center of a point set. Returns `None` for the empty set.
pub fn center_of_mass(positions: &[Position]) -> Option<Position> {
    if positions.is_empty() {
        return None;
    }

    let n = positions.len() as f64;
    let (mut lon, mut lat, mut h) = (0.0, 0.0, 0.0);
    for v in positions {
        lon += v.longitude;
        lat += v.latitude;
        h += v.height;
    }

    Some(Position::new(lon / n, lat / n, h / n))
}

/// Area of a simple polygon ring on the WGS84 sphere, in square meters.
///
/// Uses the spherical excess accumulation over ring edges; the ring does not
/// need to be explicitly closed. Degenerate rings (< 3 points) have zero
/// area.
pub fn spherical_area(ring: &[Position]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }

    let mut total = 0.0;
    for i in 0..ring.len() {
        let p1 = ring[i];
        let p2 = ring[(i + 1) % ring.len()];

        let mut dlon = (p2.longitude - p1.longitude).to_radians();
        if dlon > PI {
            dlon -= 2.0 * PI;
        } else if dlon < -PI {
            dlon += 2.0 * PI;
        }

        total += dlon * (2.0 + p1.latitude.to_radians().sin() + p2.latitude.to_radians().sin());
    }

    (total * WGS84_MEAN_RADIUS * WGS84_MEAN_RADIUS / 2.0).abs()
}

/// Perimeter of a ring (closing edge included), in meters.
pub fn ring_perimeter(ring: &[Position]) -> f64 {
    if ring.len() < 2 {
        return 0.0;
    }

    let closing = [ring[ring.len() - 1], ring[0]];
    polyline_length(ring) + polyline_length(&closing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization() {
        let v = Position::new(190.0, 95.0, 0.0).normalized();
        assert!((v.longitude - -170.0).abs() < 1e-9);
        assert!((v.latitude - 90.0).abs() < 1e-9);
        assert!(v.is_valid());
    }

    #[test]
    fn distance_and_bearing() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(1.0, 0.0, 0.0);

        // One degree of longitude on the equator.
        let d = a.surface_distance(b);
        assert!((d - 111_195.0).abs() < 100.0);
        assert!((a.bearing(b) - 90.0).abs() < 1e-6);

        let back = b.destination(270.0, d);
        assert!(back.surface_distance(a) < 1.0);
    }

    #[test]
    fn lerp_crosses_antimeridian() {
        let a = Position::new(179.0, 0.0, 0.0);
        let b = Position::new(-179.0, 0.0, 100.0);
        let mid = a.lerp(b, 0.5);
        assert!((mid.longitude.abs() - 180.0).abs() < 1e-9);
        assert!((mid.height - 50.0).abs() < 1e-9);
    }

    #[test]
    fn ring_area() {
        // A ~111km square near the equator.
        let ring = [
            Position::new(0.0, 0.0, 0.0),
            Position::new(1.0, 0.0, 0.0),
            Position::new(1.0, 1.0, 0.0),
            Position::new(0.0, 1.0, 0.0),
        ];

        let area = spherical_area(&ring);
        assert!(area > 1.1e10 && area < 1.3e10);
        assert!(ring_perimeter(&ring) > 4.0 * 110_000.0);
        assert_eq!(spherical_area(&ring[..2]), 0.0);
    }
}
