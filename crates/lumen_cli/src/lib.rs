//! Shared pieces of the lumen command line front-ends.

use lumen_core::Light;
use lumen_math::Vec3;
use lumen_renderer::Camera;

/// Default TCP port for master/worker rendering.
pub const DEFAULT_PORT: u16 = 12345;

/// Default frame resolution.
pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;

/// Install the logger for a binary: info level unless RUST_LOG overrides.
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}

/// The standard light rig: one bright white key light plus a row of dim
/// fills.
pub fn default_lights() -> Vec<Light> {
    let mut lights = vec![Light {
        position: Vec3::new(231.82174, 81.69966, -27.78259),
        ambient: Vec3::new(0.3, 0.3, 0.3),
        diffuse: Vec3::new(1.0, 1.0, 1.0),
        specular: Vec3::new(1.0, 1.0, 1.0),
    }];
    for z in [0.0, 80.0, 160.0] {
        lights.push(Light {
            position: Vec3::new(200.0, 80.0, z),
            ambient: Vec3::ZERO,
            diffuse: Vec3::new(0.3, 0.3, 0.3),
            specular: Vec3::new(0.3, 0.3, 0.3),
        });
    }
    lights
}

/// The camera position that frames the reference scene well.
pub fn default_camera() -> Camera {
    Camera::new(Vec3::new(300.0, 57.0, 160.0), 0.0, 180.0, 0.0, 110.0)
}
