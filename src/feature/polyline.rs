//! Polyline payload with bounded point-editing operations.

use crate::math::position::{center_of_mass, polyline_length, Position};

use super::style::PolylineStyle;

/// A connected line of at least two vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct PolylineGraphic {
    positions: Vec<Position>,
    pub style: PolylineStyle,
    /// Editing floor; removals violating it warn and no-op.
    pub min_points: usize,
    /// Editing ceiling; insertions violating it warn and no-op.
    pub max_points: Option<usize>,
}

impl Default for PolylineGraphic {
    fn default() -> Self {
        PolylineGraphic {
            positions: Vec::new(),
            style: PolylineStyle::default(),
            min_points: 2,
            max_points: None,
        }
    }
}

impl PolylineGraphic {
    pub fn new(positions: Vec<Position>) -> Self {
        PolylineGraphic {
            positions,
            ..Default::default()
        }
    }

    #[inline]
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn set_positions(&mut self, positions: Vec<Position>) {
        self.positions = positions;
    }

    /// Appends a vertex. Returns false (with a warning) when the ceiling
    /// would be exceeded.
    pub fn add_point(&mut self, v: Position) -> bool {
        self.insert_point(self.positions.len(), v)
    }

    /// Inserts a vertex at `index` (clamped to the end).
    pub fn insert_point(&mut self, index: usize, v: Position) -> bool {
        if let Some(max) = self.max_points {
            if self.positions.len() >= max {
                warn!("Polyline already has the maximum of {} points.", max);
                return false;
            }
        }

        let index = index.min(self.positions.len());
        self.positions.insert(index, v);
        true
    }

    /// Removes the vertex at `index`. Returns false (with a warning) when
    /// the floor would be violated or the index is out of range.
    pub fn remove_point(&mut self, index: usize) -> bool {
        if index >= self.positions.len() {
            warn!("Polyline point index {} out of range.", index);
            return false;
        }
        if self.positions.len() <= self.min_points {
            warn!(
                "Polyline needs at least {} points; not removing.",
                self.min_points
            );
            return false;
        }

        self.positions.remove(index);
        true
    }

    /// Moves the vertex at `index`.
    pub fn move_point(&mut self, index: usize, v: Position) -> bool {
        match self.positions.get_mut(index) {
            Some(slot) => {
                *slot = v;
                true
            }
            None => {
                warn!("Polyline point index {} out of range.", index);
                false
            }
        }
    }

    /// Reverses the vertex order in place.
    pub fn reverse(&mut self) {
        self.positions.reverse();
    }

    /// Total surface length in meters.
    #[inline]
    pub fn length(&self) -> f64 {
        polyline_length(&self.positions)
    }

    /// Arithmetic center of the vertices.
    #[inline]
    pub fn center_of_mass(&self) -> Option<Position> {
        center_of_mass(&self.positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lon: f64, lat: f64) -> Position {
        Position::new(lon, lat, 0.0)
    }

    #[test]
    fn bounded_editing() {
        let mut line = PolylineGraphic::new(vec![p(0.0, 0.0), p(1.0, 0.0)]);
        assert!(!line.remove_point(0));
        assert_eq!(line.positions().len(), 2);

        line.max_points = Some(3);
        assert!(line.add_point(p(2.0, 0.0)));
        assert!(!line.add_point(p(3.0, 0.0)));
        assert_eq!(line.positions().len(), 3);

        assert!(line.remove_point(2));
        assert!(line.move_point(1, p(1.5, 0.0)));
        assert!(!line.move_point(9, p(0.0, 0.0)));
    }

    #[test]
    fn derived_geometry() {
        let mut line = PolylineGraphic::new(vec![p(0.0, 0.0), p(2.0, 0.0)]);
        assert!(line.length() > 200_000.0);
        assert_eq!(line.center_of_mass(), Some(p(1.0, 0.0)));

        line.reverse();
        assert_eq!(line.positions()[0], p(2.0, 0.0));
    }
}
