//! Render master: partitions frames into chunks, serves them to workers
//! over TCP and composites the returned pixels into raw RGB frame dumps.

use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use lumen_cli::{default_camera, init_logging, DEFAULT_HEIGHT, DEFAULT_PORT, DEFAULT_WIDTH};
use lumen_net::master::{accept_loop, JobQueues};
use lumen_renderer::{generate_chunks, CHUNK_HEIGHT, CHUNK_WIDTH};

/// How often the partial frame is flushed to disk.
const DUMP_INTERVAL: Duration = Duration::from_secs(2);

fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let port = match args.len() {
        1 => DEFAULT_PORT,
        2 => args[1].parse().context("bad port")?,
        _ => bail!("usage: master [port]"),
    };

    fs::create_dir_all("anim").context("creating anim/ directory")?;

    let (width, height) = (DEFAULT_WIDTH, DEFAULT_HEIGHT);
    let camera = default_camera();
    log::info!("resolution: {width} x {height}");

    let queues = JobQueues::new();
    let listener = TcpListener::bind(("0.0.0.0", port))
        .with_context(|| format!("listening on TCP port {port}"))?;
    let accept_queues = queues.clone();
    thread::spawn(move || accept_loop(listener, accept_queues));

    let mut bitmap = vec![0u8; (width * height * 3) as usize];
    let mut total_chunks = 0usize;
    let mut completed_chunks = 0usize;
    let mut frame = 0u32;
    let mut last_dump = Instant::now();

    loop {
        // Generate the next frame's work once the previous one is done.
        if total_chunks == 0 {
            log::info!("generating work for frame {frame}");
            completed_chunks = 0;
            let chunks = generate_chunks(width, height, camera, CHUNK_WIDTH, CHUNK_HEIGHT);
            total_chunks = chunks.len();
            queues.submit(chunks);
        }

        // Composite whatever the workers finished.
        for completed in queues.take_finished() {
            completed.chunk.blit_into(&mut bitmap);
            completed_chunks += 1;
            log::debug!(
                "chunk ({}, {}) from \"{}\" ({completed_chunks}/{total_chunks})",
                completed.chunk.chunk_x,
                completed.chunk.chunk_y,
                completed.worker
            );
        }

        // Flush the partial frame now and then.
        if last_dump.elapsed() > DUMP_INTERVAL {
            write_frame(Path::new("anim/frame_dump.raw"), &bitmap)?;
            last_dump = Instant::now();
            log::info!("saved partial frame ({completed_chunks}/{total_chunks} chunks)");
        }

        if completed_chunks == total_chunks {
            let path = frame_path(frame);
            write_frame(&path, &bitmap)?;
            log::info!("frame {frame} complete, wrote {}", path.display());

            bitmap.fill(0);
            total_chunks = 0;
            frame += 1;
            continue;
        }

        thread::sleep(Duration::from_millis(100));
    }
}

fn frame_path(frame: u32) -> PathBuf {
    Path::new("anim").join(format!("dump_{frame:05}.raw"))
}

fn write_frame(path: &Path, bitmap: &[u8]) -> Result<()> {
    fs::write(path, bitmap).with_context(|| format!("writing {}", path.display()))
}
