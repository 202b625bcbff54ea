//! Work chunks: rectangular tiles of the output image.
//!
//! A chunk is the unit of work handed to render workers. Its input half
//! (image and tile geometry plus the camera) and output half (the rendered
//! RGB bytes) have separate wire encodings.

use std::io::{self, Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::camera::Camera;
use crate::shading::PixelTrace;

/// Default tile width in pixels.
pub const CHUNK_WIDTH: u32 = 128;
/// Default tile height in pixels.
pub const CHUNK_HEIGHT: u32 = 128;

/// Dimensions beyond this are rejected as corrupt input.
const MAX_IMAGE_DIMENSION: u32 = 100_000;

/// Serialized chunk input: six u32 fields.
pub const SERIALIZED_INPUT_SIZE: usize = 6 * 4;

/// Errors produced while decoding chunk payloads.
#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("chunk input payload must be {SERIALIZED_INPUT_SIZE} bytes, got {0}")]
    BadInputSize(usize),

    #[error("chunk geometry out of range")]
    BadGeometry,

    #[error("pixel payload length {got} does not match chunk size {expected}")]
    BadPixelCount { expected: usize, got: usize },

    #[error("pixel payload truncated")]
    Truncated,
}

/// A rectangular region of the output image together with the camera it
/// is rendered through.
#[derive(Debug, Clone)]
pub struct WorkChunk {
    pub image_width: u32,
    pub image_height: u32,
    pub chunk_x: u32,
    pub chunk_y: u32,
    pub chunk_width: u32,
    pub chunk_height: u32,
    pub camera: Camera,

    /// Rendered pixels, `3 * chunk_width * chunk_height` RGB bytes.
    pub pixels: Vec<u8>,
    /// Optional per-pixel trace info, filled when requested.
    pub debug: Option<Vec<PixelTrace>>,
}

impl WorkChunk {
    pub fn new(
        image_width: u32,
        image_height: u32,
        chunk_x: u32,
        chunk_y: u32,
        chunk_width: u32,
        chunk_height: u32,
        camera: Camera,
    ) -> Self {
        Self {
            image_width,
            image_height,
            chunk_x,
            chunk_y,
            chunk_width,
            chunk_height,
            camera,
            pixels: Vec::new(),
            debug: None,
        }
    }

    /// A chunk covering the whole image.
    pub fn full_image(image_width: u32, image_height: u32, camera: Camera) -> Self {
        Self::new(image_width, image_height, 0, 0, image_width, image_height, camera)
    }

    /// Number of pixels in the tile.
    pub fn pixel_count(&self) -> usize {
        self.chunk_width as usize * self.chunk_height as usize
    }

    /// Number of bytes in the tile's RGB buffer.
    pub fn byte_count(&self) -> usize {
        self.pixel_count() * 3
    }

    /// Encode the input half (tile geometry; the camera travels in its own
    /// packet).
    pub fn serialize_input(&self, out: &mut impl Write) -> io::Result<()> {
        out.write_u32::<LittleEndian>(self.image_width)?;
        out.write_u32::<LittleEndian>(self.image_height)?;
        out.write_u32::<LittleEndian>(self.chunk_x)?;
        out.write_u32::<LittleEndian>(self.chunk_y)?;
        out.write_u32::<LittleEndian>(self.chunk_width)?;
        out.write_u32::<LittleEndian>(self.chunk_height)?;
        Ok(())
    }

    /// Input half as a fresh byte vector.
    pub fn input_to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SERIALIZED_INPUT_SIZE);
        self.serialize_input(&mut bytes)
            .expect("writing to a Vec cannot fail");
        bytes
    }

    /// Decode the input half, validating the tile geometry. The camera is
    /// taken separately (from the most recent camera packet).
    pub fn deserialize_input(bytes: &[u8], camera: Camera) -> Result<WorkChunk, ChunkError> {
        if bytes.len() != SERIALIZED_INPUT_SIZE {
            return Err(ChunkError::BadInputSize(bytes.len()));
        }

        let mut cursor = Cursor::new(bytes);
        let mut next = || cursor.read_u32::<LittleEndian>().map_err(|_| ChunkError::Truncated);
        let image_width = next()?;
        let image_height = next()?;
        let chunk_x = next()?;
        let chunk_y = next()?;
        let chunk_width = next()?;
        let chunk_height = next()?;

        let valid = image_width > 0
            && image_height > 0
            && image_width <= MAX_IMAGE_DIMENSION
            && image_height <= MAX_IMAGE_DIMENSION
            && chunk_width > 0
            && chunk_height > 0
            && chunk_x <= image_width
            && chunk_y <= image_height
            && chunk_width <= image_width
            && chunk_height <= image_height
            && chunk_x + chunk_width <= image_width
            && chunk_y + chunk_height <= image_height;
        if !valid {
            return Err(ChunkError::BadGeometry);
        }

        Ok(WorkChunk::new(
            image_width,
            image_height,
            chunk_x,
            chunk_y,
            chunk_width,
            chunk_height,
            camera,
        ))
    }

    /// Encode the output half: a u32 byte count followed by the RGB bytes.
    pub fn serialize_output(&self, out: &mut impl Write) -> io::Result<()> {
        out.write_u32::<LittleEndian>(self.pixels.len() as u32)?;
        out.write_all(&self.pixels)?;
        Ok(())
    }

    /// Output half as a fresh byte vector.
    pub fn output_to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(4 + self.pixels.len());
        self.serialize_output(&mut bytes)
            .expect("writing to a Vec cannot fail");
        bytes
    }

    /// Decode the output half into this chunk's pixel buffer. The byte
    /// count must match the tile size exactly.
    pub fn deserialize_output(&mut self, bytes: &[u8]) -> Result<(), ChunkError> {
        if bytes.len() < 4 {
            return Err(ChunkError::Truncated);
        }
        let mut cursor = Cursor::new(bytes);
        let count = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| ChunkError::Truncated)? as usize;

        if count != self.byte_count() {
            return Err(ChunkError::BadPixelCount {
                expected: self.byte_count(),
                got: count,
            });
        }
        let payload = &bytes[4..];
        if payload.len() != count {
            return Err(ChunkError::BadPixelCount {
                expected: count,
                got: payload.len(),
            });
        }

        self.pixels.clear();
        self.pixels.extend_from_slice(payload);
        Ok(())
    }

    /// Copy the tile's pixels into their place in a full image bitmap
    /// (`3 * image_width * image_height` bytes).
    pub fn blit_into(&self, bitmap: &mut [u8]) {
        let row_bytes = self.chunk_width as usize * 3;
        for j in 0..self.chunk_height as usize {
            let src = j * row_bytes;
            let dst =
                ((j + self.chunk_y as usize) * self.image_width as usize + self.chunk_x as usize) * 3;
            bitmap[dst..dst + row_bytes].copy_from_slice(&self.pixels[src..src + row_bytes]);
        }
    }
}

/// Partition an image into a grid of tiles, clamped at the right and
/// bottom edges. Every tile captures the given camera.
pub fn generate_chunks(
    image_width: u32,
    image_height: u32,
    camera: Camera,
    tile_width: u32,
    tile_height: u32,
) -> Vec<WorkChunk> {
    let mut chunks = Vec::new();
    let mut y = 0;
    while y < image_height {
        let mut x = 0;
        while x < image_width {
            let chunk_width = tile_width.min(image_width - x);
            let chunk_height = tile_height.min(image_height - y);
            chunks.push(WorkChunk::new(
                image_width,
                image_height,
                x,
                y,
                chunk_width,
                chunk_height,
                camera,
            ));
            x += tile_width;
        }
        y += tile_height;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_math::Vec3;

    fn test_camera() -> Camera {
        Camera::new(Vec3::new(300.0, 57.0, 160.0), 0.0, 180.0, 0.0, 110.0)
    }

    #[test]
    fn test_input_round_trip() {
        let chunk = WorkChunk::new(1920, 1080, 256, 512, 128, 56, test_camera());
        let bytes = chunk.input_to_bytes();
        assert_eq!(bytes.len(), SERIALIZED_INPUT_SIZE);

        let back = WorkChunk::deserialize_input(&bytes, test_camera()).unwrap();
        assert_eq!(back.image_width, 1920);
        assert_eq!(back.image_height, 1080);
        assert_eq!(back.chunk_x, 256);
        assert_eq!(back.chunk_y, 512);
        assert_eq!(back.chunk_width, 128);
        assert_eq!(back.chunk_height, 56);
    }

    #[test]
    fn test_input_rejects_wrong_size() {
        assert!(matches!(
            WorkChunk::deserialize_input(&[0u8; 23], test_camera()),
            Err(ChunkError::BadInputSize(23))
        ));
    }

    #[test]
    fn test_input_rejects_bad_geometry() {
        let cases = [
            // Chunk hangs over the right edge.
            WorkChunk::new(100, 100, 90, 0, 20, 10, test_camera()),
            // Zero-sized chunk.
            WorkChunk::new(100, 100, 0, 0, 0, 10, test_camera()),
            // Zero-sized image.
            WorkChunk::new(0, 100, 0, 0, 10, 10, test_camera()),
            // Absurd image dimensions.
            WorkChunk::new(200_000, 100, 0, 0, 10, 10, test_camera()),
        ];
        for chunk in cases {
            let bytes = chunk.input_to_bytes();
            assert!(
                WorkChunk::deserialize_input(&bytes, test_camera()).is_err(),
                "accepted {chunk:?}"
            );
        }
    }

    #[test]
    fn test_output_round_trip() {
        let mut chunk = WorkChunk::new(64, 64, 0, 0, 4, 2, test_camera());
        chunk.pixels = (0..24).collect();
        let bytes = chunk.output_to_bytes();
        assert_eq!(bytes.len(), 4 + 24);

        let mut receiver = WorkChunk::new(64, 64, 0, 0, 4, 2, test_camera());
        receiver.deserialize_output(&bytes).unwrap();
        assert_eq!(receiver.pixels, chunk.pixels);
    }

    #[test]
    fn test_output_rejects_mismatched_count() {
        let mut chunk = WorkChunk::new(64, 64, 0, 0, 4, 2, test_camera());
        chunk.pixels = vec![0; 24];
        let bytes = chunk.output_to_bytes();

        // Receiver expects an 8x8 tile, not 4x2.
        let mut receiver = WorkChunk::new(64, 64, 0, 0, 8, 8, test_camera());
        assert!(receiver.deserialize_output(&bytes).is_err());
    }

    #[test]
    fn test_generate_chunks_exact_fit() {
        let chunks = generate_chunks(256, 256, test_camera(), 128, 128);
        assert_eq!(chunks.len(), 4);
        let total: usize = chunks.iter().map(|c| c.pixel_count()).sum();
        assert_eq!(total, 256 * 256);
    }

    #[test]
    fn test_generate_chunks_clamps_edges() {
        let chunks = generate_chunks(300, 200, test_camera(), 128, 128);
        assert_eq!(chunks.len(), 3 * 2);

        let total: usize = chunks.iter().map(|c| c.pixel_count()).sum();
        assert_eq!(total, 300 * 200);

        let last = chunks.last().unwrap();
        assert_eq!(last.chunk_x, 256);
        assert_eq!(last.chunk_y, 128);
        assert_eq!(last.chunk_width, 44);
        assert_eq!(last.chunk_height, 72);
    }

    #[test]
    fn test_blit_into_places_rows() {
        let mut chunk = WorkChunk::new(4, 4, 1, 2, 2, 2, test_camera());
        chunk.pixels = vec![255; chunk.byte_count()];

        let mut bitmap = vec![0u8; 4 * 4 * 3];
        chunk.blit_into(&mut bitmap);

        for y in 0..4u32 {
            for x in 0..4u32 {
                let idx = ((y * 4 + x) * 3) as usize;
                let inside = (1..3).contains(&x) && (2..4).contains(&y);
                let expected = if inside { 255 } else { 0 };
                assert_eq!(bitmap[idx], expected, "pixel ({x},{y})");
                assert_eq!(bitmap[idx + 1], expected);
                assert_eq!(bitmap[idx + 2], expected);
            }
        }
    }
}
