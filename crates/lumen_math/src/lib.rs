//! Math types for the lumen ray tracer.
//!
//! All world-space computation is done in f64; the vector and matrix types
//! are glam's double-precision variants, re-exported under the names the
//! rest of the workspace uses.

pub use glam::{DMat4 as Mat4, DVec3 as Vec3};

mod aabb;
pub use aabb::Aabb;

mod ray;
pub use ray::Ray;

/// Rotation around the X axis, angle in degrees.
pub fn rotation_x_deg(angle: f64) -> Mat4 {
    Mat4::from_rotation_x(angle.to_radians())
}

/// Rotation around the Y axis, angle in degrees.
pub fn rotation_y_deg(angle: f64) -> Mat4 {
    Mat4::from_rotation_y(angle.to_radians())
}

/// Rotation around the Z axis, angle in degrees.
pub fn rotation_z_deg(angle: f64) -> Mat4 {
    Mat4::from_rotation_z(angle.to_radians())
}
