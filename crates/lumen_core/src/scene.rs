//! Scene: geometry, materials, textures and lights.

use std::collections::HashMap;
use std::sync::Arc;

use crate::light::Light;
use crate::material::Material;
use crate::octree::Octree;
use crate::texture::Texture;

/// A renderable scene.
///
/// The octree owns the primitives; materials and textures are shared
/// through `Arc` so a primitive's material and a material's texture always
/// refer into the same scene. Immutable (and therefore freely shared
/// across render threads) once `finalize` has run.
#[derive(Default)]
pub struct Scene {
    pub tree: Octree,
    pub materials: HashMap<String, Arc<Material>>,
    pub textures: HashMap<String, Arc<Texture>>,
    pub lights: Vec<Light>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalize the octree; queries are valid afterwards.
    pub fn finalize(&mut self) {
        self.tree.finalize();
    }
}
