//! Texture loading and sampling.
//!
//! Textures are decoded from image files into [0, 1] RGB samples and
//! sampled bilinearly with wrap-around texture coordinates.

use std::path::Path;

use lumen_math::Vec3;
use thiserror::Error;

/// Upper bound on texture dimensions; anything larger is rejected as
/// corrupt input.
const MAX_DIMENSION: u32 = 30000;

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("unreasonable texture dimensions {width}x{height} in {path}")]
    BadDimensions {
        path: String,
        width: u32,
        height: u32,
    },
}

/// A decoded texture: row-major RGB samples in [0, 1].
#[derive(Clone, Debug)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    pub samples: Vec<Vec3>,
}

impl Texture {
    /// Build a texture from raw samples. The sample vector must hold
    /// `width * height` entries in row-major order.
    pub fn new(width: usize, height: usize, samples: Vec<Vec3>) -> Self {
        debug_assert_eq!(samples.len(), width * height);
        Self {
            width,
            height,
            samples,
        }
    }

    /// Load and decode a texture from a file.
    pub fn load(path: &Path) -> Result<Texture, TextureError> {
        log::info!("loading texture {}", path.display());

        let img = image::open(path)?;
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();

        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(TextureError::BadDimensions {
                path: path.display().to_string(),
                width,
                height,
            });
        }

        let samples = rgb
            .pixels()
            .map(|p| {
                Vec3::new(
                    p[0] as f64 / 255.0,
                    p[1] as f64 / 255.0,
                    p[2] as f64 / 255.0,
                )
            })
            .collect();

        Ok(Texture::new(width as usize, height as usize, samples))
    }

    /// Sample the texture at (u, v) with bilinear filtering.
    ///
    /// U and V wrap around; V is flipped so that v = 0 addresses the
    /// bottom of the image. Neighbor lookups clamp at the right and bottom
    /// edges.
    pub fn sample(&self, u: f64, v: f64) -> Vec3 {
        let u = u.rem_euclid(1.0);
        let v = 1.0 - v.rem_euclid(1.0);

        let x = u * (self.width - 1) as f64;
        let y = v * (self.height - 1) as f64;

        let base_x = x as usize;
        let base_y = y as usize;
        let next_x = if base_x + 1 == self.width { base_x } else { base_x + 1 };
        let next_y = if base_y + 1 == self.height { base_y } else { base_y + 1 };

        let c00 = self.samples[base_x + base_y * self.width];
        let c10 = self.samples[next_x + base_y * self.width];
        let c01 = self.samples[base_x + next_y * self.width];
        let c11 = self.samples[next_x + next_y * self.width];

        let fx = x.fract();
        let fy = y.fract();

        c00 * ((1.0 - fx) * (1.0 - fy))
            + c10 * (fx * (1.0 - fy))
            + c01 * ((1.0 - fx) * fy)
            + c11 * (fx * fy)
    }
}
