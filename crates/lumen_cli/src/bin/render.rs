//! Local single-process renderer: loads an OBJ scene and renders an
//! orbiting-camera animation to raw RGB frames under anim/.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use lumen_cli::{default_lights, init_logging};
use lumen_core::{load_obj, Scene};
use lumen_math::Vec3;
use lumen_renderer::{render_image, Camera};

fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 && args.len() != 4 {
        bail!("usage: render <scene.obj> [width height]");
    }
    let scene_path = PathBuf::from(&args[1]);
    let (width, height) = if args.len() == 4 {
        (
            args[2].parse().context("bad width")?,
            args[3].parse().context("bad height")?,
        )
    } else {
        (480u32, 270u32)
    };

    fs::create_dir_all("anim").context("creating anim/ directory")?;
    log::info!("resolution: {width} x {height}");

    let mut scene = Scene::new();
    load_obj(&mut scene, &scene_path)
        .with_context(|| format!("loading {}", scene_path.display()))?;
    scene.lights = default_lights();
    scene.finalize();

    let bounds = scene.tree.bounds();
    log::info!("scene bounds: {:?} to {:?}", bounds.min, bounds.max);

    for (frame, angle) in (0..180).map(|f| (f, f as f64 * 2.0)) {
        let camera = Camera::new(Vec3::new(300.0, 107.0, 40.0), 30.0, angle + 90.0, 0.0, 110.0);
        let pixels = render_image(&scene, camera, width, height);

        let path = frame_path(frame);
        fs::write(&path, &pixels).with_context(|| format!("writing {}", path.display()))?;
        log::info!("wrote {}", path.display());
    }

    Ok(())
}

fn frame_path(frame: u32) -> PathBuf {
    Path::new("anim").join(format!("dump_{frame:05}.raw"))
}
