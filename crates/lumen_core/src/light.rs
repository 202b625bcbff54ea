//! Point light source.

use lumen_math::Vec3;

/// A point light with separate ambient, diffuse and specular colors.
#[derive(Clone, Debug)]
pub struct Light {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}
