//! Triangle primitive.
//!
//! Intersection uses the Möller-Trumbore algorithm behind a cheap slab
//! pre-test against the triangle's cached bounding box. Per-vertex
//! attributes (normals, texture coordinates) are interpolated with
//! triangle-area barycentric weights.

use std::sync::Arc;

use lumen_math::{Aabb, Ray, Vec3};

use crate::material::Material;
use crate::primitive::{Intersection, Primitive};

/// Determinants closer to zero than this mean the ray runs parallel to the
/// triangle plane.
const PARALLEL_EPSILON: f64 = 1e-8;

/// A triangle with per-vertex normals and texture coordinates.
///
/// Normals and texture coordinates are zero vectors when the source file
/// did not provide them.
pub struct Triangle {
    pub vertices: [Vec3; 3],
    pub normals: [Vec3; 3],
    pub uvw: [Vec3; 3],
    pub material: Option<Arc<Material>>,
    pub source_line: u32,
    aabb: Aabb,
}

impl Triangle {
    pub fn new(vertices: [Vec3; 3]) -> Self {
        let mut aabb = Aabb::from_point(vertices[0]);
        aabb.extend_point(vertices[1]);
        aabb.extend_point(vertices[2]);

        Self {
            vertices,
            normals: [Vec3::ZERO; 3],
            uvw: [Vec3::ZERO; 3],
            material: None,
            source_line: 0,
            aabb,
        }
    }

    pub fn with_normals(mut self, normals: [Vec3; 3]) -> Self {
        self.normals = normals;
        self
    }

    pub fn with_uvw(mut self, uvw: [Vec3; 3]) -> Self {
        self.uvw = uvw;
        self
    }

    pub fn with_material(mut self, material: Arc<Material>) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_source_line(mut self, line: u32) -> Self {
        self.source_line = line;
        self
    }

    /// Barycentric interpolation of a per-vertex attribute by sub-triangle
    /// areas. Degenerate triangles (zero total weight) fall back to the
    /// first vertex attribute so callers always get a finite value.
    fn interpolate(&self, point: Vec3, attrs: &[Vec3; 3]) -> Vec3 {
        let a = self.vertices[0].distance(self.vertices[1]);
        let b = self.vertices[1].distance(self.vertices[2]);
        let c = self.vertices[2].distance(self.vertices[0]);

        let p0 = point.distance(self.vertices[0]);
        let p1 = point.distance(self.vertices[1]);
        let p2 = point.distance(self.vertices[2]);

        let n0 = triangle_area(b, p2, p1);
        let n1 = triangle_area(c, p0, p2);
        let n2 = triangle_area(a, p1, p0);
        let n = n0 + n1 + n2;

        if n == 0.0 {
            return attrs[0];
        }

        (attrs[0] * n0 + attrs[1] * n1 + attrs[2] * n2) / n
    }
}

/// Area from the three side lengths (Heron's formula). Floating-point
/// error on degenerate triangles can push the radicand below zero; clamp
/// to zero instead of producing NaN.
fn triangle_area(a: f64, b: f64, c: f64) -> f64 {
    let p = (a + b + c) / 2.0;
    let radicand = p * (p - a) * (p - b) * (p - c);
    if radicand <= 0.0 {
        0.0
    } else {
        radicand.sqrt()
    }
}

impl Primitive for Triangle {
    fn aabb(&self) -> Aabb {
        self.aabb
    }

    /// Möller-Trumbore ray-triangle intersection.
    fn intersect_ray(&self, ray: &Ray) -> Option<Intersection> {
        // The slab test is far cheaper than the full intersection and
        // filters most candidates.
        self.aabb.intersect_ray(ray)?;

        let e1 = self.vertices[1] - self.vertices[0];
        let e2 = self.vertices[2] - self.vertices[0];
        let pvec = ray.direction.cross(e2);
        let det = e1.dot(pvec);

        if det.abs() < PARALLEL_EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let tvec = ray.origin - self.vertices[0];
        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(e1);
        let v = ray.direction.dot(qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let distance = e2.dot(qvec) * inv_det;
        if distance < 0.0 {
            // Intersection is behind the ray origin.
            return None;
        }

        Some(Intersection {
            point: ray.point_at(distance),
            distance,
        })
    }

    fn normal_at(&self, point: Vec3) -> Vec3 {
        self.interpolate(point, &self.normals)
    }

    fn uvw_at(&self, point: Vec3) -> Vec3 {
        self.interpolate(point, &self.uvw)
    }

    fn material(&self) -> Option<&Arc<Material>> {
        self.material.as_ref()
    }

    fn source_line(&self) -> u32 {
        self.source_line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Triangle {
        Triangle::new([
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ])
    }

    #[test]
    fn test_hit_inside() {
        let tri = unit_triangle();
        let ray = Ray::new(Vec3::new(0.9, 0.5, -10.0), Vec3::new(0.0, 0.0, 1.0));
        let hit = tri.intersect_ray(&ray).unwrap();
        assert!((hit.distance - 10.0).abs() < 1e-9);
        assert!((hit.point - Vec3::new(0.9, 0.5, 0.0)).length() < 1e-9);
    }

    #[test]
    fn test_miss_outside_edge() {
        let tri = unit_triangle();
        // Above the hypotenuse: u is fine, u + v exceeds the edge.
        let ray = Ray::new(Vec3::new(0.1, 0.9, -10.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(tri.intersect_ray(&ray).is_none());
    }

    #[test]
    fn test_miss_behind_origin() {
        let tri = unit_triangle();
        let ray = Ray::new(Vec3::new(0.9, 0.5, -10.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(tri.intersect_ray(&ray).is_none());
    }

    #[test]
    fn test_miss_parallel() {
        let tri = unit_triangle();
        let ray = Ray::new(Vec3::new(-5.0, 0.25, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(tri.intersect_ray(&ray).is_none());
    }

    #[test]
    fn test_cached_aabb() {
        let tri = unit_triangle();
        let aabb = tri.aabb();
        assert_eq!(aabb.min, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_normal_interpolation_at_vertex() {
        let tri = unit_triangle().with_normals([
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ]);
        let n = tri.normal_at(Vec3::new(0.0, 0.0, 0.0));
        assert!((n - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-9);
        let n = tri.normal_at(Vec3::new(1.0, 1.0, 0.0));
        assert!((n - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-9);
    }

    #[test]
    fn test_uniform_normals_interpolate_to_themselves() {
        let n = Vec3::new(0.0, 0.0, -1.0);
        let tri = unit_triangle().with_normals([n, n, n]);
        let mid = tri.normal_at(Vec3::new(0.7, 0.35, 0.0));
        assert!((mid - n).length() < 1e-9);
    }

    #[test]
    fn test_degenerate_triangle_area_clamps() {
        // Collinear side lengths would go negative under the radical.
        assert_eq!(triangle_area(1.0, 1.0, 2.0), 0.0);
        assert_eq!(triangle_area(1.0, 1.0, 2.0 + 1e-9), 0.0);
    }

    #[test]
    fn test_degenerate_triangle_interpolation_is_finite() {
        let tri = Triangle::new([Vec3::ZERO, Vec3::ZERO, Vec3::ZERO])
            .with_normals([Vec3::new(0.0, 1.0, 0.0); 3]);
        let n = tri.normal_at(Vec3::ZERO);
        assert!(n.is_finite());
        assert_eq!(n, Vec3::new(0.0, 1.0, 0.0));
    }
}
