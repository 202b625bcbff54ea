//! Lumen net - tile distribution between a render master and workers.
//!
//! The master partitions each frame into work chunks and serves them to
//! any worker that connects; workers render chunks with their local copy
//! of the scene and stream the pixels back. Connection loss returns
//! in-flight chunks to the pool, so any surviving worker can pick them up.

pub mod master;
pub mod protocol;
pub mod worker;

pub use master::{CompletedChunk, JobQueues};
pub use protocol::{Packet, ProtocolError, Side, Tag, WorkerId, MAX_PAYLOAD};
