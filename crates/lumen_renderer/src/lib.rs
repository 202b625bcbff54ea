//! Lumen renderer - camera, shading kernel and tile rendering.
//!
//! The shading kernel is a classic recursive Whitted tracer: Phong
//! illumination with shadow rays that traverse transparent surfaces,
//! mirror reflection and refraction, bounded at a fixed recursion depth.
//! Images are rendered in rectangular chunks whose scanlines are processed
//! in parallel.

pub mod camera;
pub mod chunk;
pub mod renderer;
pub mod shading;

pub use camera::{Camera, Sensor};
pub use chunk::{generate_chunks, ChunkError, WorkChunk, CHUNK_HEIGHT, CHUNK_WIDTH};
pub use renderer::{render_chunk, render_image};
pub use shading::{color_to_rgb, trace_ray, PixelTrace, MAX_RECURSION_LEVEL};
