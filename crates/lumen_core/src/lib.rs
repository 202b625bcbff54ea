//! Lumen core - scene representation and OBJ/MTL loading.
//!
//! This crate provides:
//!
//! - **Scene types**: `Scene`, `Material`, `Texture`, `Light`
//! - **Geometry**: the `Primitive` trait, `Triangle`, and the `Octree`
//!   acceleration structure
//! - **Loading**: Wavefront OBJ/MTL parsing into a `Scene`

pub mod light;
pub mod material;
pub mod mtl;
pub mod obj;
pub mod octree;
pub mod primitive;
pub mod scene;
pub mod texture;
pub mod triangle;

pub use light::Light;
pub use material::Material;
pub use obj::load_obj;
pub use octree::{Octree, SurfaceHit, TreeStats};
pub use primitive::{Intersection, Primitive};
pub use scene::Scene;
pub use texture::Texture;
pub use triangle::Triangle;
