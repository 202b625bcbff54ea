//! Recursive Whitted shading kernel.
//!
//! Phong illumination per light, shadow rays that step through transparent
//! surfaces, mirror reflection and refraction. Recursion is bounded by
//! `MAX_RECURSION_LEVEL` and a reflection-contribution cutoff.

use lumen_core::{Scene, SurfaceHit};
use lumen_math::{Ray, Vec3};

/// Maximum depth of the reflection/refraction recursion.
pub const MAX_RECURSION_LEVEL: u32 = 5;

/// Offset along a secondary ray direction when leaving a surface.
const REFLECTION_EPSILON: f64 = 1e-4;
/// Offset along the light direction when starting a shadow ray.
const SHADOW_EPSILON: f64 = 1e-5;
/// Offset used to step a shadow ray past a transparent surface.
const SHADOW_ADVANCE_EPSILON: f64 = 1e-7;
/// Shadow traversal stops once every light-power channel drops this low.
const LIGHT_POWER_CUTOFF: f64 = 1e-3;
/// Reflection recursion stops once the accumulated coefficient drops
/// below this.
const REFLECTION_CUTOFF: f64 = 0.01;

/// Per-pixel debug info captured by the top-level trace.
#[derive(Debug, Clone, Copy)]
pub struct PixelTrace {
    /// Source line of the primitive that was hit, -1 on a miss.
    pub source_line: i32,
    /// World-space hit point, NaN on a miss.
    pub point: Vec3,
}

impl Default for PixelTrace {
    fn default() -> Self {
        Self {
            source_line: -1,
            point: Vec3::splat(f64::NAN),
        }
    }
}

/// Trace a primary ray and return the color seen along it.
pub fn trace_ray(scene: &Scene, ray: &Ray) -> Vec3 {
    trace_ray_traced(scene, ray, None)
}

/// Trace a primary ray, optionally capturing per-pixel debug info.
pub fn trace_ray_traced(scene: &Scene, ray: &Ray, debug: Option<&mut PixelTrace>) -> Vec3 {
    trace_ray_worker(scene, ray, 0, false, 1.0, debug)
}

fn trace_ray_worker(
    scene: &Scene,
    ray: &Ray,
    level: u32,
    in_object: bool,
    reflection_coef: f64,
    debug: Option<&mut PixelTrace>,
) -> Vec3 {
    let hit = match scene.tree.intersect_ray(ray) {
        Some(hit) => hit,
        None => {
            if let Some(debug) = debug {
                *debug = PixelTrace::default();
            }
            // Background color.
            return Vec3::ZERO;
        }
    };

    if let Some(debug) = debug {
        debug.source_line = hit.primitive.source_line() as i32;
        debug.point = hit.point;
    }

    let towards_camera = -ray.direction;
    let mut normal = hit.primitive.normal_at(hit.point);
    let mut normal_dot = normal.dot(towards_camera);
    if normal_dot < 0.0 {
        normal = -normal;
        normal_dot = normal.dot(towards_camera);
    }

    // Without material information the normal-ray angle is all we can
    // show.
    let material = match hit.primitive.material() {
        Some(material) => material.clone(),
        None => {
            let shade = (normal_dot + 1.0) * 0.5;
            return Vec3::splat(shade);
        }
    };

    let mut surface_color = material.ambient;
    if let Some(ref texture) = material.texture {
        let uvw = hit.primitive.uvw_at(hit.point);
        surface_color *= texture.sample(uvw.x, uvw.y);
    }

    let reflected_direction = ray.direction - normal * (2.0 * ray.direction.dot(normal));
    let reflected_ray = Ray::new(
        hit.point + reflected_direction * REFLECTION_EPSILON,
        reflected_direction,
    );

    let mut color = Vec3::ZERO;

    for light in &scene.lights {
        let light_direction = (light.position - hit.point).normalize();

        // Ambient light always applies.
        color += light.ambient * surface_color;

        let (light_power, in_shadow) = shadow_light_power(scene, &hit, light_direction, light.position);

        // Light that made it through is never dimmer than the light's own
        // ambient term.
        let light_power = light_power.max(light.ambient);

        color += material.diffuse
            * surface_color
            * light_direction.dot(normal)
            * light.diffuse
            * light_power;

        if !in_shadow {
            let refl_dot = reflected_direction.dot(towards_camera);
            if refl_dot > 0.0 {
                color += material.specular
                    * surface_color
                    * refl_dot.powf(material.specular_exp)
                    * light.specular;
            }
        }
    }

    // Mirror reflection.
    if level < MAX_RECURSION_LEVEL
        && material.reflectance > 0.0
        && reflection_coef > REFLECTION_CUTOFF
        && !in_object
    {
        color += trace_ray_worker(
            scene,
            &reflected_ray,
            level + 1,
            in_object,
            reflection_coef * material.reflectance,
            None,
        ) * material.reflectance;
    }

    // Refraction.
    if level < MAX_RECURSION_LEVEL && material.transparency > 0.0 {
        if let Some(refracted_direction) =
            refract(ray.direction, normal, material.refraction_index, in_object)
        {
            let refracted_ray = Ray::new(
                hit.point + refracted_direction * SHADOW_EPSILON,
                refracted_direction,
            );
            color += trace_ray_worker(
                scene,
                &refracted_ray,
                level + 1,
                !in_object,
                reflection_coef,
                None,
            ) * material.transmission_filter
                * material.transparency;
        }
    }

    color
}

/// How much of the light reaches the hit point, stepping through
/// transparent surfaces. Returns the per-channel light power and whether
/// the point ended up in shadow.
fn shadow_light_power(
    scene: &Scene,
    hit: &SurfaceHit,
    light_direction: Vec3,
    light_position: Vec3,
) -> (Vec3, bool) {
    let mut light_power = Vec3::ONE;
    let mut traversing_through_object = false;

    let mut start_point = hit.point;
    loop {
        let shadow_ray = Ray::new(start_point + light_direction * SHADOW_EPSILON, light_direction);
        let light_distance = start_point.distance(light_position);

        let shadow_hit = match scene.tree.intersect_ray(&shadow_ray) {
            Some(shadow_hit) => shadow_hit,
            // Nothing between the point and the light.
            None => break,
        };

        if shadow_hit.distance > light_distance {
            // The blocker is behind the light source.
            break;
        }

        // A missing material means a plain opaque surface.
        let transparency = shadow_hit
            .primitive
            .material()
            .map_or(0.0, |m| m.transparency);
        if transparency == 0.0 {
            return (Vec3::ZERO, true);
        }

        // Attenuate once per object, on the entry surface.
        if !traversing_through_object {
            let filter = shadow_hit
                .primitive
                .material()
                .map_or(Vec3::ONE, |m| m.transmission_filter);
            light_power *= filter * transparency;
        }
        traversing_through_object = !traversing_through_object;

        start_point = shadow_hit.point + light_direction * SHADOW_ADVANCE_EPSILON;

        // The stepped start can end up beyond the light; no more shadow
        // opportunities there.
        if hit.point.distance_squared(start_point) > hit.point.distance_squared(light_position) {
            break;
        }

        if light_power.x <= LIGHT_POWER_CUTOFF
            && light_power.y <= LIGHT_POWER_CUTOFF
            && light_power.z <= LIGHT_POWER_CUTOFF
        {
            return (Vec3::ZERO, true);
        }
    }

    (light_power, false)
}

/// Snell refraction of `direction` at a surface with the given normal.
///
/// `normal` faces the incoming ray. Entering an object bends with
/// `eta = 1/index`, leaving with `eta = index`; an index of zero (absent
/// from the material file) is treated as 1. Returns `None` on total
/// internal reflection.
fn refract(direction: Vec3, normal: Vec3, refraction_index: f64, in_object: bool) -> Option<Vec3> {
    let index = if refraction_index <= f64::EPSILON {
        1.0
    } else {
        refraction_index
    };
    let eta = if in_object { index } else { 1.0 / index };

    let cos_incident = (-direction).dot(normal).min(1.0);
    let radicand = 1.0 - eta * eta * (1.0 - cos_incident * cos_incident);
    if radicand < 0.0 {
        return None;
    }

    let refracted = direction * eta + normal * (eta * cos_incident - radicand.sqrt());
    Some(refracted.normalize())
}

/// Convert a color to 8-bit RGB: clamp each channel to [0, 1] and scale.
pub fn color_to_rgb(color: Vec3) -> [u8; 3] {
    let channel = |c: f64| -> u8 {
        if c > 1.0 {
            255
        } else if c < 0.0 {
            0
        } else {
            (c * 255.0) as u8
        }
    };
    [channel(color.x), channel(color.y), channel(color.z)]
}
