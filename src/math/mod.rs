//! Geodetic math helpers: positions on the WGS84 ellipsoid, geographic
//! bounds and colors. Vector/angle work comes from `cgmath`.

pub mod bounds;
pub mod color;
pub mod position;

pub mod prelude {
    pub use super::bounds::GeoRect;
    pub use super::color::Color;
    pub use super::position::{
        center_of_mass, polyline_length, ring_perimeter, spherical_area, Position,
    };

    pub use cgmath::prelude::{InnerSpace, MetricSpace, VectorSpace};
    pub use cgmath::{Deg, Rad, Vector2, Vector3};
}
