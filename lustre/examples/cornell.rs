//! Renders a Cornell box on the CPU and saves the accumulated image.
//!
//! Usage: cargo run --example cornell [frames] [output.png]

use std::env;
use std::f32::consts::PI;

use glam::{uvec2, vec2, vec3, UVec2, Vec3};
use lustre::{
    Camera, CpuBackend, Engine, Lens, RenderOutcome, Settings, TraceTargets,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SIZE: UVec2 = UVec2::new(256, 256);

const LIGHT_MIN: Vec3 = Vec3::new(-0.25, 1.99, -0.25);
const LIGHT_MAX: Vec3 = Vec3::new(0.25, 1.99, 0.25);
const LIGHT_EMISSION: f32 = 12.0;

const SPHERE_CENTER: Vec3 = Vec3::new(0.35, 0.4, -0.3);
const SPHERE_RADIUS: f32 = 0.4;

struct Hit {
    t: f32,
    normal: Vec3,
    base_color: Vec3,
}

fn intersect_sphere(origin: Vec3, dir: Vec3) -> Option<f32> {
    let oc = origin - SPHERE_CENTER;
    let b = oc.dot(dir);
    let c = oc.length_squared() - SPHERE_RADIUS * SPHERE_RADIUS;
    let disc = b * b - c;

    if disc < 0.0 {
        return None;
    }

    let t = -b - disc.sqrt();

    (t > 1e-3).then_some(t)
}

fn intersect(origin: Vec3, dir: Vec3) -> Option<Hit> {
    // (axis, position, inward normal, base color)
    let walls = [
        (1, 0.0, Vec3::Y, vec3(0.75, 0.75, 0.75)),
        (1, 2.0, Vec3::NEG_Y, vec3(0.75, 0.75, 0.75)),
        (2, -1.0, Vec3::Z, vec3(0.75, 0.75, 0.75)),
        (0, -1.0, Vec3::X, vec3(0.75, 0.15, 0.15)),
        (0, 1.0, Vec3::NEG_X, vec3(0.15, 0.75, 0.15)),
    ];

    let mut closest: Option<Hit> = None;

    for (axis, position, normal, base_color) in walls {
        if dir[axis].abs() < 1e-6 {
            continue;
        }

        let t = (position - origin[axis]) / dir[axis];
        let point = origin + dir * t;

        let is_inside = point.x.abs() <= 1.001
            && (-0.001..=2.001).contains(&point.y)
            && (-1.001..=1.001).contains(&point.z);

        if t > 1e-3 && is_inside && closest.as_ref().map_or(true, |h| t < h.t)
        {
            closest = Some(Hit {
                t,
                normal,
                base_color,
            });
        }
    }

    if let Some(t) = intersect_sphere(origin, dir) {
        if closest.as_ref().map_or(true, |hit| t < hit.t) {
            closest = Some(Hit {
                t,
                normal: (origin + dir * t - SPHERE_CENTER).normalize(),
                base_color: vec3(0.9, 0.9, 0.9),
            });
        }
    }

    closest
}

/// Direct lighting from the area light, estimated with a single sample.
fn shade(point: Vec3, hit: &Hit, rng: &mut StdRng) -> Vec3 {
    let light_point = LIGHT_MIN
        + (LIGHT_MAX - LIGHT_MIN) * vec3(rng.gen(), 0.0, rng.gen());

    let to_light = light_point - point;
    let distance = to_light.length();
    let dir = to_light / distance;

    let is_occluded = intersect_sphere(point + hit.normal * 1e-3, dir)
        .map_or(false, |t| t < distance);

    let ambient = hit.base_color * 0.03;

    if is_occluded {
        return ambient;
    }

    let area = (LIGHT_MAX.x - LIGHT_MIN.x) * (LIGHT_MAX.z - LIGHT_MIN.z);
    let cos_surface = hit.normal.dot(dir).max(0.0);
    let cos_light = (-dir.y).max(0.0);

    ambient
        + hit.base_color * LIGHT_EMISSION * cos_surface * cos_light * area
            / (PI * distance * distance)
}

fn trace(targets: TraceTargets<'_>) {
    let lens = targets.lens;

    for y in 0..targets.size.y {
        for x in 0..targets.size.x {
            let idx = (y * targets.size.x + x) as usize;
            let state = &mut targets.prng_states[idx];

            let mut rng = StdRng::seed_from_u64(
                ((*state as u64) << 32) | (targets.frame.get() as u64),
            );

            *state = rng.gen();

            let uv = (uvec2(x, y).as_vec2() + vec2(rng.gen(), rng.gen()))
                / targets.size.as_vec2();

            // Textures are stored top-down, while the lens starts at the
            // bottom
            let uv = vec2(uv.x, 1.0 - uv.y);

            let origin = lens.origin();
            let dir = (lens.focus_point(uv) - origin).normalize();
            let pos = uvec2(x, y);

            let (color, normal, base_color) = match intersect(origin, dir) {
                Some(hit) => {
                    let point = origin + dir * hit.t;

                    let color = if point.y > 1.98
                        && point.x.abs() < LIGHT_MAX.x
                        && point.z.abs() < LIGHT_MAX.z
                    {
                        Vec3::splat(LIGHT_EMISSION)
                    } else {
                        shade(point, &hit, &mut rng)
                    };

                    (color, hit.normal, hit.base_color)
                }

                None => (Vec3::ZERO, Vec3::ZERO, Vec3::ZERO),
            };

            targets.color.write(pos, color.extend(1.0));
            targets.normal.write(pos, normal.extend(0.0));
            targets.base_color.write(pos, base_color.extend(1.0));
        }
    }
}

fn main() -> lustre::Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);

    let frames = args
        .next()
        .and_then(|frames| frames.parse().ok())
        .unwrap_or(32u32);

    let output = args.next().unwrap_or_else(|| "cornell.png".into());

    let settings = Settings {
        progressive_frame_cap: Some(frames),
        ..Default::default()
    };

    let mut engine = Engine::new(CpuBackend::new(trace), settings)?;

    let lens = Lens::looking_at(
        vec3(0.0, 1.0, 3.2),
        vec3(0.0, 1.0, 0.0),
        Vec3::Y,
        40f32.to_radians(),
        (SIZE.x as f32) / (SIZE.y as f32),
        0.0,
    );

    let camera = engine.create_camera(Camera::new(SIZE, lens));

    while let RenderOutcome::Rendered { frame, .. } =
        engine.render_camera(camera)?
    {
        log::info!("Rendered frame {}", frame.get());
    }

    if let Some(image) = engine.backend().presented() {
        image.save(&output)?;

        log::info!("Saved {}", output);
    }

    Ok(())
}
