//! Geometry and color types shared between the simulation and the renderers.
//!
//! Point-cloud positions live directly in normalized device coordinates:
//! X and Y in [-1, 1], Z = 0.

mod color;
mod vec3;

pub use color::ColorRgba;
pub use vec3::Vec3;
