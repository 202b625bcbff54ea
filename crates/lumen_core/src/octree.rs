//! Octree acceleration structure over primitives.
//!
//! Primitives are owned by the octree's arena; tree nodes hold indices
//! into it. A node splits into eight octants around its box center once it
//! holds enough primitives, pushing down every primitive that fits
//! entirely inside a single child. Straddling primitives stay at the node,
//! which keeps queries correct without duplicating primitives.

use lumen_math::{Aabb, Ray, Vec3};

use crate::primitive::Primitive;

/// Nodes with fewer primitives than this never split.
const SPLIT_BOUNDARY: usize = 16;

/// Hard depth cap. A cluster of more than `SPLIT_BOUNDARY` coincident
/// primitives would otherwise subdivide forever.
const MAX_DEPTH: u32 = 32;

/// Nearest ray-primitive intersection found by a tree query.
pub struct SurfaceHit<'a> {
    pub primitive: &'a dyn Primitive,
    pub point: Vec3,
    pub distance: f64,
}

struct Node {
    aabb: Aabb,
    center: Vec3,
    /// Arena indices of primitives held at this node.
    primitives: Vec<usize>,
    /// Either empty or exactly eight children partitioning `aabb`.
    children: Vec<Node>,
}

impl Node {
    fn new(aabb: Aabb) -> Self {
        let (center, _) = aabb.center_and_extent();
        Self {
            aabb,
            center,
            primitives: Vec::new(),
            children: Vec::new(),
        }
    }

    /// The eight octant boxes around `center`, indexed by the bits of
    /// (x > cx, y > cy, z > cz).
    fn octants(&self) -> [Aabb; 8] {
        let lo = self.aabb.min;
        let hi = self.aabb.max;
        let c = self.center;

        let mut boxes = [Aabb::from_point(c); 8];
        for (i, octant) in boxes.iter_mut().enumerate() {
            let min = Vec3::new(
                if i & 1 != 0 { c.x } else { lo.x },
                if i & 2 != 0 { c.y } else { lo.y },
                if i & 4 != 0 { c.z } else { lo.z },
            );
            let max = Vec3::new(
                if i & 1 != 0 { hi.x } else { c.x },
                if i & 2 != 0 { hi.y } else { c.y },
                if i & 4 != 0 { hi.z } else { c.z },
            );
            *octant = Aabb::new(min, max);
        }
        boxes
    }

    fn split(&mut self, arena: &[Box<dyn Primitive>], depth: u32) {
        if self.primitives.len() < SPLIT_BOUNDARY || depth >= MAX_DEPTH {
            return;
        }

        let mut children: Vec<Node> = self.octants().into_iter().map(Node::new).collect();

        let mut kept = Vec::new();
        for idx in self.primitives.drain(..) {
            let prim_box = arena[idx].aabb();
            match children.iter_mut().find(|c| c.aabb.encloses(&prim_box)) {
                Some(child) => child.primitives.push(idx),
                None => kept.push(idx),
            }
        }
        self.primitives = kept;

        for child in &mut children {
            child.split(arena, depth + 1);
        }
        self.children = children;
    }

    fn intersect(&self, ray: &Ray, arena: &[Box<dyn Primitive>]) -> Option<RawHit> {
        self.aabb.intersect_ray(ray)?;

        let mut best: Option<RawHit> = None;
        for &idx in &self.primitives {
            if let Some(hit) = arena[idx].intersect_ray(ray) {
                if best.as_ref().is_none_or(|b| hit.distance < b.distance) {
                    best = Some(RawHit {
                        index: idx,
                        point: hit.point,
                        distance: hit.distance,
                    });
                }
            }
        }

        if !self.children.is_empty() {
            // Visit children nearest-first; octants are disjoint slabs
            // along the ray, so once one of them yields a hit no later
            // child can hold a closer one.
            let mut entries: Vec<(usize, f64)> = self
                .children
                .iter()
                .enumerate()
                .filter_map(|(i, child)| child.aabb.intersect_ray(ray).map(|d| (i, d)))
                .collect();
            entries.sort_by(|a, b| a.1.total_cmp(&b.1));

            for (i, _) in entries {
                if let Some(hit) = self.children[i].intersect(ray, arena) {
                    if best.as_ref().is_none_or(|b| hit.distance < b.distance) {
                        best = Some(hit);
                    }
                    break;
                }
            }
        }

        best
    }
}

struct RawHit {
    index: usize,
    point: Vec3,
    distance: f64,
}

/// Aggregate shape of a finalized tree.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    pub nodes: usize,
    pub leaves: usize,
    pub max_depth: u32,
    /// Primitives kept at interior nodes because they straddle octant
    /// boundaries.
    pub straddling: usize,
}

impl Node {
    fn collect_stats(&self, depth: u32, stats: &mut TreeStats) {
        stats.nodes += 1;
        stats.max_depth = stats.max_depth.max(depth);
        if self.children.is_empty() {
            stats.leaves += 1;
        } else {
            stats.straddling += self.primitives.len();
            for child in &self.children {
                child.collect_stats(depth + 1, stats);
            }
        }
    }
}

/// Octree over the scene's primitives.
///
/// Build phase: `add_primitive` for every primitive, then one `finalize`.
/// After finalization the tree is immutable and queries are lock-free.
pub struct Octree {
    arena: Vec<Box<dyn Primitive>>,
    root: Option<Node>,
    bounds: Aabb,
    finalized: bool,
}

impl Default for Octree {
    fn default() -> Self {
        Self::new()
    }
}

impl Octree {
    pub fn new() -> Self {
        Self {
            arena: Vec::new(),
            root: None,
            bounds: Aabb::new(Vec3::ZERO, Vec3::ZERO),
            finalized: false,
        }
    }

    /// Take ownership of a primitive and grow the root bound around it.
    /// Must not be called after `finalize`.
    pub fn add_primitive(&mut self, primitive: Box<dyn Primitive>) {
        assert!(!self.finalized, "add_primitive after finalize");

        let prim_box = primitive.aabb();
        if self.arena.is_empty() {
            self.bounds = prim_box;
        } else {
            self.bounds.extend_box(&prim_box);
        }
        self.arena.push(primitive);
    }

    /// Build the tree. Queries are only valid afterwards; adding more
    /// primitives is not.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }

        let mut root = Node::new(self.bounds);
        root.primitives = (0..self.arena.len()).collect();
        root.split(&self.arena, 0);

        self.root = Some(root);
        self.finalized = true;

        let stats = self.statistics();
        log::debug!(
            "octree finalized: {} primitives, {} nodes ({} leaves), depth {}, {} straddling",
            self.arena.len(),
            stats.nodes,
            stats.leaves,
            stats.max_depth,
            stats.straddling
        );
    }

    /// Node/leaf/depth counts of the finalized tree.
    pub fn statistics(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        if let Some(ref root) = self.root {
            root.collect_stats(0, &mut stats);
        }
        stats
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Bounding box over everything added so far.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Nearest intersection along the ray, or `None`. The tree must have
    /// been finalized.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<SurfaceHit<'_>> {
        let root = self.root.as_ref()?;
        let hit = root.intersect(ray, &self.arena)?;
        Some(SurfaceHit {
            primitive: self.arena[hit.index].as_ref(),
            point: hit.point,
            distance: hit.distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangle::Triangle;

    fn plane_triangle(z: f64) -> Triangle {
        Triangle::new([
            Vec3::new(1.0, 1.0, z),
            Vec3::new(1.0, 0.0, z),
            Vec3::new(0.0, 0.0, z),
        ])
    }

    fn two_plane_tree() -> Octree {
        let mut tree = Octree::new();
        tree.add_primitive(Box::new(plane_triangle(0.0).with_source_line(1)));
        tree.add_primitive(Box::new(plane_triangle(1.0).with_source_line(2)));
        tree.finalize();
        tree
    }

    #[test]
    fn test_front_ray_hits_near_triangle() {
        let tree = two_plane_tree();
        let ray = Ray::new(Vec3::new(0.9, 0.9, -10.0), Vec3::new(0.0, 0.0, 1.0));
        let hit = tree.intersect_ray(&ray).unwrap();
        assert_eq!(hit.primitive.source_line(), 1);
        assert!((hit.distance - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_back_ray_hits_far_triangle() {
        let tree = two_plane_tree();
        let ray = Ray::new(Vec3::new(0.9, 0.9, 10.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = tree.intersect_ray(&ray).unwrap();
        assert_eq!(hit.primitive.source_line(), 2);
        assert!((hit.distance - 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_ray_outside_bounds_misses() {
        let tree = two_plane_tree();
        let ray = Ray::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(tree.intersect_ray(&ray).is_none());
    }

    #[test]
    fn test_nearest_of_two_wins() {
        let mut tree = Octree::new();
        tree.add_primitive(Box::new(plane_triangle(3.0).with_source_line(1)));
        tree.add_primitive(Box::new(plane_triangle(7.0).with_source_line(2)));
        tree.finalize();

        let ray = Ray::new(Vec3::new(0.9, 0.9, 0.0), Vec3::new(0.0, 0.0, 1.0));
        let hit = tree.intersect_ray(&ray).unwrap();
        assert_eq!(hit.primitive.source_line(), 1);
        assert!((hit.distance - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_extend_over_all_primitives() {
        let tree = two_plane_tree();
        let bounds = tree.bounds();
        assert_eq!(bounds.min, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_split_tree_still_finds_hits() {
        // Enough spread-out triangles to force several levels of
        // subdivision.
        let mut tree = Octree::new();
        let mut line = 1;
        for x in 0..8 {
            for y in 0..8 {
                for z in 0..2 {
                    let base = Vec3::new(x as f64 * 4.0, y as f64 * 4.0, z as f64 * 16.0);
                    tree.add_primitive(Box::new(
                        Triangle::new([
                            base,
                            base + Vec3::new(1.0, 0.0, 0.0),
                            base + Vec3::new(1.0, 1.0, 0.0),
                        ])
                        .with_source_line(line),
                    ));
                    line += 1;
                }
            }
        }
        tree.finalize();
        assert_eq!(tree.len(), 128);

        // Shoot at the triangle based at (12, 20, 0) = x 3, y 5, z 0.
        let target_line = (3 * 8 + 5) * 2 + 1;
        let ray = Ray::new(Vec3::new(12.9, 20.5, -5.0), Vec3::new(0.0, 0.0, 1.0));
        let hit = tree.intersect_ray(&ray).unwrap();
        assert_eq!(hit.primitive.source_line(), target_line);
        assert!((hit.distance - 5.0).abs() < 1e-6);

        // And something in a different octant entirely.
        let ray = Ray::new(Vec3::new(28.9, 28.5, 30.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = tree.intersect_ray(&ray).unwrap();
        assert!((hit.distance - 14.0).abs() < 1e-6);
    }

    #[test]
    fn test_statistics_reflect_splitting() {
        let mut small = Octree::new();
        for z in 0..4 {
            small.add_primitive(Box::new(plane_triangle(z as f64)));
        }
        small.finalize();
        let stats = small.statistics();
        assert_eq!(stats.nodes, 1);
        assert_eq!(stats.leaves, 1);
        assert_eq!(stats.max_depth, 0);

        let mut spread = Octree::new();
        for x in 0..8 {
            for y in 0..8 {
                let base = Vec3::new(x as f64 * 4.0, y as f64 * 4.0, (x + y) as f64);
                spread.add_primitive(Box::new(Triangle::new([
                    base,
                    base + Vec3::new(1.0, 0.0, 0.0),
                    base + Vec3::new(1.0, 1.0, 0.0),
                ])));
            }
        }
        spread.finalize();
        let stats = spread.statistics();
        assert!(stats.nodes > 1);
        assert!(stats.max_depth >= 1);
        // Every split adds exactly eight children.
        assert_eq!((stats.nodes - 1) % 8, 0);
    }

    #[test]
    fn test_empty_tree_misses() {
        let mut tree = Octree::new();
        tree.finalize();
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0));
        assert!(tree.intersect_ray(&ray).is_none());
    }

    #[test]
    fn test_coincident_primitives_terminate() {
        // More than SPLIT_BOUNDARY identical triangles cannot be pushed
        // apart; the depth cap keeps finalize from recursing forever.
        let mut tree = Octree::new();
        for i in 0..40 {
            tree.add_primitive(Box::new(plane_triangle(0.5).with_source_line(i)));
        }
        tree.finalize();
        let ray = Ray::new(Vec3::new(0.9, 0.9, -1.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(tree.intersect_ray(&ray).is_some());
    }
}
