//! Master side: job queues, worker handlers and the accept loop.
//!
//! Work chunks live in a pool guarded by a mutex. Each connected worker
//! gets its own handler thread that pulls chunks from the pool, ships them
//! over the wire and commits the returned pixels. If anything goes wrong
//! on a connection, the in-flight chunk goes back into the pool for the
//! next worker.

use std::collections::VecDeque;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use lumen_renderer::WorkChunk;

use crate::protocol::{recv_packet, send_packet, Packet, Side, Tag, WorkerId};

/// How long a handler sleeps between polls of the empty work pool.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A chunk rendered by some worker.
pub struct CompletedChunk {
    pub chunk: WorkChunk,
    pub worker: WorkerId,
}

/// The master's two chunk queues.
#[derive(Default)]
pub struct JobQueues {
    available: Mutex<VecDeque<WorkChunk>>,
    finished: Mutex<Vec<CompletedChunk>>,
    shutdown: AtomicBool,
}

impl JobQueues {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add freshly generated chunks to the pool.
    pub fn submit(&self, chunks: impl IntoIterator<Item = WorkChunk>) {
        let mut available = self.available.lock().expect("available queue poisoned");
        available.extend(chunks);
    }

    /// Put an undelivered chunk back into the pool.
    pub fn return_chunk(&self, chunk: WorkChunk) {
        log::info!("returning chunk ({}, {}) to the pool", chunk.chunk_x, chunk.chunk_y);
        let mut available = self.available.lock().expect("available queue poisoned");
        available.push_back(chunk);
    }

    /// Record a finished chunk.
    pub fn commit(&self, chunk: WorkChunk, worker: WorkerId) {
        let mut finished = self.finished.lock().expect("finished queue poisoned");
        finished.push(CompletedChunk { chunk, worker });
    }

    /// Drain everything the workers have finished so far.
    pub fn take_finished(&self) -> Vec<CompletedChunk> {
        let mut finished = self.finished.lock().expect("finished queue poisoned");
        std::mem::take(&mut *finished)
    }

    pub fn available_len(&self) -> usize {
        self.available.lock().expect("available queue poisoned").len()
    }

    /// Ask handler threads to wind down once the pool is empty.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Pop the next chunk, polling until one is available. Returns `None`
    /// only after `shutdown` with an empty pool.
    fn next_chunk(&self) -> Option<WorkChunk> {
        loop {
            {
                let mut available = self.available.lock().expect("available queue poisoned");
                if let Some(chunk) = available.pop_front() {
                    return Some(chunk);
                }
            }
            if self.is_shut_down() {
                return None;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Holds a chunk while it is out with a worker; putting the lease down
/// without committing returns the chunk to the pool.
struct ChunkLease<'a> {
    queues: &'a JobQueues,
    chunk: Option<WorkChunk>,
}

impl<'a> ChunkLease<'a> {
    fn new(queues: &'a JobQueues, chunk: WorkChunk) -> Self {
        Self {
            queues,
            chunk: Some(chunk),
        }
    }

    fn chunk(&self) -> &WorkChunk {
        self.chunk.as_ref().expect("lease already released")
    }

    fn chunk_mut(&mut self) -> &mut WorkChunk {
        self.chunk.as_mut().expect("lease already released")
    }

    fn take(mut self) -> WorkChunk {
        self.chunk.take().expect("lease already released")
    }
}

impl Drop for ChunkLease<'_> {
    fn drop(&mut self) {
        if let Some(chunk) = self.chunk.take() {
            self.queues.return_chunk(chunk);
        }
    }
}

/// Serve one worker connection until it disconnects, fails, or the pool
/// shuts down.
pub fn worker_handler(mut stream: TcpStream, queues: Arc<JobQueues>) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());

    // The worker introduces itself with a single RDY! packet.
    let hello = match recv_packet(&mut stream, Side::Master) {
        Ok(packet) => packet,
        Err(err) => {
            log::warn!("{peer}: invalid packet or disconnected before RDY!: {err}");
            return;
        }
    };
    if hello.tag != Tag::Ready {
        log::warn!("{peer}: expected RDY!, got {}", hello.tag);
        return;
    }
    let id = hello.id;
    log::info!("{peer} is worker \"{id}\"");

    loop {
        let Some(chunk) = queues.next_chunk() else {
            break;
        };
        let mut lease = ChunkLease::new(&queues, chunk);

        let camera = Packet::new(Tag::Camera, id, lease.chunk().camera.to_bytes());
        if let Err(err) = send_packet(&mut stream, &camera) {
            log::warn!("{id}: failed to send camera: {err}");
            return;
        }

        let work = Packet::new(Tag::Work, id, lease.chunk().input_to_bytes());
        if let Err(err) = send_packet(&mut stream, &work) {
            log::warn!("{id}: failed to send work: {err}");
            return;
        }
        log::debug!(
            "{id}: sent chunk ({}, {})",
            lease.chunk().chunk_x,
            lease.chunk().chunk_y
        );

        let reply = match recv_packet(&mut stream, Side::Master) {
            Ok(packet) => packet,
            Err(err) => {
                log::warn!("{id}: invalid packet or disconnected: {err}");
                return;
            }
        };
        if reply.tag != Tag::Pixels {
            log::warn!("{id}: expected PXLS, got {}", reply.tag);
            return;
        }
        if let Err(err) = lease.chunk_mut().deserialize_output(&reply.payload) {
            log::warn!("{id}: bad PXLS payload: {err}");
            return;
        }

        log::debug!("{id}: chunk complete");
        queues.commit(lease.take(), id);
    }

    log::info!("{id}: no more work, closing connection");
}

/// Accept connections forever, spawning a handler thread per worker.
pub fn accept_loop(listener: TcpListener, queues: Arc<JobQueues>) {
    match listener.local_addr() {
        Ok(addr) => log::info!("listening on {addr}"),
        Err(_) => log::info!("listening"),
    }

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                if let Ok(peer) = stream.peer_addr() {
                    log::info!("new connection from {peer}");
                }
                let queues = queues.clone();
                thread::spawn(move || worker_handler(stream, queues));
            }
            Err(err) => {
                log::warn!("accept failed: {err}");
            }
        }
    }
}
