use crate::Vec3;

/// A ray through world space. Only the positive direction is on the ray.
#[derive(Debug, Copy, Clone)]
pub struct Ray {
    pub origin: Vec3,
    /// Normalized direction of the ray.
    pub direction: Vec3,
    /// Componentwise inverse of the direction, used by the slab tests.
    /// Zeros in the direction become positive infinity regardless of the
    /// sign of the zero.
    pub inv_direction: Vec3,
}

impl Ray {
    /// Create a ray; the direction is normalized here.
    pub fn new(origin: Vec3, direction: Vec3) -> Ray {
        let direction = direction.normalize();
        Ray {
            origin,
            direction,
            inv_direction: invert_direction(direction),
        }
    }

    /// Point along the ray at the given distance from the origin.
    pub fn point_at(&self, distance: f64) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Replace the direction, recomputing the cached inverse.
    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = direction.normalize();
        self.inv_direction = invert_direction(self.direction);
    }
}

fn invert_direction(direction: Vec3) -> Vec3 {
    Vec3::new(
        if direction.x == 0.0 { f64::INFINITY } else { 1.0 / direction.x },
        if direction.y == 0.0 { f64::INFINITY } else { 1.0 / direction.y },
        if direction.z == 0.0 { f64::INFINITY } else { 1.0 / direction.z },
    )
}
