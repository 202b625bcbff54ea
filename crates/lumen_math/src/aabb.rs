use crate::{Ray, Vec3};

/// Axis-aligned bounding box used for spatial acceleration.
///
/// Invariant: `min[k] <= max[k]` for every axis once the box encloses
/// anything.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a box from two corner points.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// A degenerate box around a single point.
    pub fn from_point(point: Vec3) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// True when the point lies inside the box (boundary inclusive).
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Overlap test against another box: the center distance is compared
    /// against the sum of half-extents on each axis.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        let (center_a, extent_a) = self.center_and_extent();
        let (center_b, extent_b) = other.center_and_extent();

        (center_a.x - center_b.x).abs() * 2.0 <= extent_a.x + extent_b.x
            && (center_a.y - center_b.y).abs() * 2.0 <= extent_a.y + extent_b.y
            && (center_a.z - center_b.z).abs() * 2.0 <= extent_a.z + extent_b.z
    }

    /// True when the other box lies entirely inside this one.
    pub fn encloses(&self, other: &Aabb) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    /// Grow the box to include the point.
    pub fn extend_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grow the box to include another box.
    pub fn extend_box(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Center point and full extent (width, height, depth).
    pub fn center_and_extent(&self) -> (Vec3, Vec3) {
        (self.min + (self.max - self.min) / 2.0, self.max - self.min)
    }

    /// Slab-method ray test. Returns the entry distance on a hit.
    ///
    /// The entry distance is negative when the ray starts inside the box.
    /// Infinite inverse-direction components (axis-parallel rays) flow
    /// through the min/max chain as IEEE-754 prescribes.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f64> {
        let t1 = (self.min.x - ray.origin.x) * ray.inv_direction.x;
        let t2 = (self.max.x - ray.origin.x) * ray.inv_direction.x;
        let t3 = (self.min.y - ray.origin.y) * ray.inv_direction.y;
        let t4 = (self.max.y - ray.origin.y) * ray.inv_direction.y;
        let t5 = (self.min.z - ray.origin.z) * ray.inv_direction.z;
        let t6 = (self.max.z - ray.origin.z) * ray.inv_direction.z;

        let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
        let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

        if tmax < 0.0 || tmin > tmax {
            None
        } else {
            Some(tmin)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_contains_point_iff_within_all_axes() {
        let aabb = unit_box();
        assert!(aabb.contains_point(Vec3::new(0.5, 0.5, 0.5)));
        assert!(aabb.contains_point(Vec3::new(0.0, 1.0, 0.5)));
        assert!(!aabb.contains_point(Vec3::new(1.5, 0.5, 0.5)));
        assert!(!aabb.contains_point(Vec3::new(0.5, -0.1, 0.5)));
        assert!(!aabb.contains_point(Vec3::new(0.5, 0.5, 1.0001)));
    }

    #[test]
    fn test_extend_point_is_idempotent() {
        let mut aabb = unit_box();
        let p = Vec3::new(2.0, -1.0, 0.5);
        aabb.extend_point(p);
        let once = aabb;
        aabb.extend_point(p);
        assert_eq!(aabb, once);
    }

    #[test]
    fn test_extend_box() {
        let mut aabb = unit_box();
        aabb.extend_box(&Aabb::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.5, 2.0, 0.5)));
        assert_eq!(aabb.min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 1.0));
    }

    #[test]
    fn test_overlaps() {
        let a = unit_box();
        let b = Aabb::new(Vec3::new(0.5, 0.5, 0.5), Vec3::new(2.0, 2.0, 2.0));
        let c = Aabb::new(Vec3::new(3.0, 3.0, 3.0), Vec3::new(4.0, 4.0, 4.0));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        // Touching faces count as overlap.
        let d = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        assert!(a.overlaps(&d));
    }

    #[test]
    fn test_encloses() {
        let outer = Aabb::new(Vec3::ZERO, Vec3::new(4.0, 4.0, 4.0));
        let inner = Aabb::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(2.0, 2.0, 2.0));
        let straddling = Aabb::new(Vec3::new(3.0, 3.0, 3.0), Vec3::new(5.0, 4.0, 4.0));
        assert!(outer.encloses(&inner));
        assert!(!inner.encloses(&outer));
        assert!(!outer.encloses(&straddling));
        assert!(outer.encloses(&outer));
    }

    #[test]
    fn test_center_and_extent() {
        let aabb = Aabb::new(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(1.0, 4.0, 3.0));
        let (center, extent) = aabb.center_and_extent();
        assert_eq!(center, Vec3::new(0.0, 2.0, 2.5));
        assert_eq!(extent, Vec3::new(2.0, 4.0, 1.0));
    }

    #[test]
    fn test_ray_hits_box() {
        let aabb = unit_box();
        let ray = Ray::new(Vec3::new(0.5, 0.5, -5.0), Vec3::new(0.0, 0.0, 1.0));
        let dist = aabb.intersect_ray(&ray).unwrap();
        assert!((dist - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_ray_misses_box() {
        let aabb = unit_box();
        let ray = Ray::new(Vec3::new(5.0, 5.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(aabb.intersect_ray(&ray).is_none());
    }

    #[test]
    fn test_ray_pointing_away_misses() {
        let aabb = unit_box();
        let ray = Ray::new(Vec3::new(0.5, 0.5, -5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(aabb.intersect_ray(&ray).is_none());
    }

    #[test]
    fn test_ray_starting_inside_hits() {
        let aabb = unit_box();
        let ray = Ray::new(Vec3::new(0.5, 0.5, 0.5), Vec3::new(0.0, 1.0, 0.0));
        let dist = aabb.intersect_ray(&ray).unwrap();
        assert!(dist <= 0.0);
    }

    #[test]
    fn test_axis_parallel_ray() {
        // Direction has zero components; the inverse is infinite there.
        let aabb = unit_box();
        let hit = Ray::new(Vec3::new(0.5, 0.5, -3.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(aabb.intersect_ray(&hit).is_some());
        let miss = Ray::new(Vec3::new(0.5, 2.0, -3.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(aabb.intersect_ray(&miss).is_none());
    }
}
