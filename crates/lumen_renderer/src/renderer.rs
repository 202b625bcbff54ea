//! Chunk rendering.
//!
//! A chunk's scanlines are independent, so they are rendered in parallel
//! with rayon. The scene is immutable after finalization and shared
//! read-only across the worker threads.

use std::time::Instant;

use lumen_core::Scene;
use rayon::prelude::*;

use crate::camera::{Camera, Sensor};
use crate::chunk::WorkChunk;
use crate::shading::{color_to_rgb, trace_ray, trace_ray_traced, PixelTrace};

/// Render one chunk into its pixel buffer. The scene must be finalized.
pub fn render_chunk(scene: &Scene, chunk: &mut WorkChunk) {
    assert!(scene.tree.is_finalized(), "render_chunk on an unfinalized scene");

    let start = Instant::now();

    // The sensor spans the full image; the chunk offsets index into it.
    let sensor = chunk.camera.sensor(chunk.image_width, chunk.image_height);
    let row_bytes = chunk.chunk_width as usize * 3;
    let (chunk_x, chunk_y, chunk_width) = (chunk.chunk_x, chunk.chunk_y, chunk.chunk_width);
    let pixel_count = chunk.pixel_count();

    chunk.pixels.resize(pixel_count * 3, 0);

    match chunk.debug {
        None => {
            chunk
                .pixels
                .par_chunks_mut(row_bytes)
                .enumerate()
                .for_each(|(j, row)| {
                    render_scanline(scene, &sensor, chunk_x, chunk_y + j as u32, chunk_width, row, None);
                });
        }
        Some(ref mut debug) => {
            debug.resize(pixel_count, PixelTrace::default());
            chunk
                .pixels
                .par_chunks_mut(row_bytes)
                .zip(debug.par_chunks_mut(chunk_width as usize))
                .enumerate()
                .for_each(|(j, (row, debug_row))| {
                    render_scanline(
                        scene,
                        &sensor,
                        chunk_x,
                        chunk_y + j as u32,
                        chunk_width,
                        row,
                        Some(debug_row),
                    );
                });
        }
    }

    log::debug!(
        "rendered {}x{} chunk at ({}, {}) in {:.3}s",
        chunk.chunk_width,
        chunk.chunk_height,
        chunk.chunk_x,
        chunk.chunk_y,
        start.elapsed().as_secs_f64()
    );
}

fn render_scanline(
    scene: &Scene,
    sensor: &Sensor,
    chunk_x: u32,
    image_y: u32,
    width: u32,
    row: &mut [u8],
    mut debug_row: Option<&mut [PixelTrace]>,
) {
    for i in 0..width as usize {
        let ray = sensor.ray(chunk_x + i as u32, image_y);
        let color = match debug_row {
            Some(ref mut debug_row) => trace_ray_traced(scene, &ray, Some(&mut debug_row[i])),
            None => trace_ray(scene, &ray),
        };
        row[i * 3..i * 3 + 3].copy_from_slice(&color_to_rgb(color));
    }
}

/// Render a full image and return its RGB bytes.
pub fn render_image(
    scene: &Scene,
    camera: Camera,
    image_width: u32,
    image_height: u32,
) -> Vec<u8> {
    let mut chunk = WorkChunk::full_image(image_width, image_height, camera);
    render_chunk(scene, &mut chunk);
    chunk.pixels
}
