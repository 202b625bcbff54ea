//! Render worker: loads the scene locally, then serves render orders from
//! the master until stopped.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use lumen_cli::{default_lights, init_logging, DEFAULT_PORT};
use lumen_core::{load_obj, Scene};
use lumen_net::worker;

fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        bail!(
            "usage: worker <name> <master-address> <scene.obj>\n\
             note: names longer than 8 characters are truncated"
        );
    }
    let name = &args[1];
    let mut master_addr = args[2].clone();
    if !master_addr.contains(':') {
        master_addr = format!("{master_addr}:{DEFAULT_PORT}");
    }
    let scene_path = PathBuf::from(&args[3]);

    let mut scene = Scene::new();
    load_obj(&mut scene, &scene_path)
        .with_context(|| format!("loading {}", scene_path.display()))?;
    scene.lights = default_lights();
    scene.finalize();

    log::info!("worker \"{name}\" ready, {} primitives", scene.tree.len());
    worker::run(&master_addr, name, &scene)
}
