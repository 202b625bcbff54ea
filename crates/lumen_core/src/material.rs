//! Surface material in the MTL model.

use std::sync::Arc;

use lumen_math::Vec3;

use crate::texture::Texture;

/// A material as described by a Wavefront MTL file.
#[derive(Clone, Debug, Default)]
pub struct Material {
    /// Ambient reflectivity (Ka).
    pub ambient: Vec3,
    /// Diffuse reflectivity (Kd).
    pub diffuse: Vec3,
    /// Specular reflectivity (Ks).
    pub specular: Vec3,

    /// Specular exponent (Ns). Higher values give a tighter highlight.
    pub specular_exp: f64,

    /// Mirror-like reflectance (non-standard `Refl`). Zero means no
    /// reflection.
    pub reflectance: f64,

    /// Transparency (Tr, with `d` accepted as `Tr = 1 - d`). Zero means
    /// fully opaque.
    pub transparency: f64,

    /// Color filter applied to light passing through the surface (Tf).
    /// E.g. (0, 1, 1) removes red from transmitted light.
    pub transmission_filter: Vec3,

    /// Index of refraction (Ni).
    pub refraction_index: f64,

    /// Texture modulating the ambient base color (map_Ka).
    pub texture: Option<Arc<Texture>>,
}
