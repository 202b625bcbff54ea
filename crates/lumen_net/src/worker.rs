//! Worker side: connect to the master, render chunks, send pixels back.

use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use lumen_core::Scene;
use lumen_renderer::{render_chunk, Camera, ChunkError, WorkChunk};
use thiserror::Error;

use crate::protocol::{recv_packet, send_packet, Packet, ProtocolError, Side, Tag, WorkerId};

/// Wait between connection attempts.
const CONNECT_RETRY: Duration = Duration::from_secs(1);
/// Back off after a protocol failure before reconnecting.
const PROTOCOL_RETRY: Duration = Duration::from_secs(2);

/// Errors that end a worker's connection (it will reconnect).
#[derive(Error, Debug)]
pub enum ServeError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Chunk(#[from] ChunkError),
}

/// Run the worker loop forever: connect, announce readiness, then serve
/// camera updates and render orders. Every failure backs off and
/// reconnects.
pub fn run(master_addr: &str, name: &str, scene: &Scene) -> ! {
    let id = WorkerId::new(name);
    loop {
        log::info!("connecting to {master_addr}");
        let mut stream = match TcpStream::connect(master_addr) {
            Ok(stream) => stream,
            Err(err) => {
                log::warn!("failed to connect to {master_addr}: {err}");
                thread::sleep(CONNECT_RETRY);
                continue;
            }
        };
        log::info!("connected");

        if let Err(err) = serve_connection(&mut stream, id, scene) {
            log::warn!("connection ended: {err}");
        }
        thread::sleep(PROTOCOL_RETRY);
    }
}

/// Serve one connection until the first failure.
pub fn serve_connection(
    stream: &mut TcpStream,
    id: WorkerId,
    scene: &Scene,
) -> Result<(), ServeError> {
    send_packet(stream, &Packet::new(Tag::Ready, id, Vec::new()))?;

    // The camera arrives in its own packet and applies to every chunk
    // after it.
    let mut camera = Camera::default();

    loop {
        let packet = recv_packet(stream, Side::Worker)?;
        match packet.tag {
            Tag::Camera => {
                camera = Camera::deserialize(&packet.payload)
                    .ok_or(ProtocolError::Malformed { tag: Tag::Camera })?;
                log::info!(
                    "camera update: origin {:?}, pitch/yaw/roll {}/{}/{}, aov {}",
                    camera.origin,
                    camera.pitch,
                    camera.yaw,
                    camera.roll,
                    camera.aov
                );
            }
            Tag::Work => {
                let mut chunk = WorkChunk::deserialize_input(&packet.payload, camera)?;
                log::info!(
                    "rendering {}x{} chunk at ({}, {}) of a {}x{} frame",
                    chunk.chunk_width,
                    chunk.chunk_height,
                    chunk.chunk_x,
                    chunk.chunk_y,
                    chunk.image_width,
                    chunk.image_height
                );
                render_chunk(scene, &mut chunk);
                send_packet(stream, &Packet::new(Tag::Pixels, id, chunk.output_to_bytes()))?;
                log::info!("chunk sent");
            }
            Tag::Scene => {
                // Reserved: scenes are currently loaded from disk on the
                // worker.
                log::warn!("ignoring SCNE packet");
            }
            // recv_packet only passes worker-side tags through.
            Tag::Ready | Tag::Pixels => unreachable!(),
        }
    }
}
