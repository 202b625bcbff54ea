//! Primitive trait for ray-traceable geometry.

use std::sync::Arc;

use lumen_math::{Aabb, Ray, Vec3};

use crate::material::Material;

/// A ray-primitive intersection: the hit point and its distance from the
/// ray origin.
#[derive(Debug, Copy, Clone)]
pub struct Intersection {
    pub point: Vec3,
    pub distance: f64,
}

/// Geometry that can be stored in the octree and shaded.
///
/// Primitives are owned by the octree's arena and shared read-only across
/// render threads, hence the `Send + Sync` bound.
pub trait Primitive: Send + Sync {
    /// Axis-aligned bounding box of the primitive.
    fn aabb(&self) -> Aabb;

    /// Closest intersection with the ray, if any. Intersections behind the
    /// ray origin do not count.
    fn intersect_ray(&self, ray: &Ray) -> Option<Intersection>;

    /// Interpolated surface normal at a point on the primitive.
    fn normal_at(&self, point: Vec3) -> Vec3;

    /// Interpolated texture coordinates at a point on the primitive.
    fn uvw_at(&self, point: Vec3) -> Vec3;

    /// The material, when one was assigned during parsing.
    fn material(&self) -> Option<&Arc<Material>>;

    /// Source line in the input file this primitive came from; 0 when
    /// unknown. Carried for per-pixel debugging.
    fn source_line(&self) -> u32 {
        0
    }
}
