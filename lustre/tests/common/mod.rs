#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use glam::{uvec2, vec3, UVec2, Vec3, Vec4};
use lustre::{
    Camera, CameraHandle, CpuBackend, CpuTexture, Engine, HistoryRole, Lens,
    Settings, TraceTargets,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const SIZE: UVec2 = UVec2::new(16, 16);

/// Synthetic scene: a flat wall facing the camera, lit so that every pixel
/// converges to `base_color * radiance`, plus uniform noise.
#[derive(Clone, Debug)]
pub struct Wall {
    pub normal: Vec3,
    pub base_color: Rc<Cell<Vec3>>,
    pub radiance: f32,
    pub noise: f32,
}

impl Default for Wall {
    fn default() -> Self {
        Self {
            normal: Vec3::Z,
            base_color: Rc::new(Cell::new(vec3(0.8, 0.6, 0.4))),
            radiance: 1.0,
            noise: 0.5,
        }
    }
}

impl Wall {
    pub fn tracer(&self) -> impl FnMut(TraceTargets<'_>) + 'static {
        let wall = self.clone();

        move |targets: TraceTargets<'_>| {
            let base_color = wall.base_color.get();

            for y in 0..targets.size.y {
                for x in 0..targets.size.x {
                    let idx = (y * targets.size.x + x) as usize;
                    let state = &mut targets.prng_states[idx];

                    let mut rng = StdRng::seed_from_u64(
                        ((*state as u64) << 32)
                            | (targets.frame.get() as u64),
                    );

                    *state = rng.gen();

                    let sample = 1.0 + wall.noise * (rng.gen::<f32>() - 0.5);
                    let color = base_color * wall.radiance * sample;
                    let pos = uvec2(x, y);

                    targets.color.write(pos, color.extend(1.0));
                    targets.normal.write(pos, wall.normal.extend(0.0));
                    targets.base_color.write(pos, base_color.extend(1.0));
                }
            }
        }
    }

    pub fn backend(&self) -> CpuBackend {
        CpuBackend::new(self.tracer())
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn lens() -> Lens {
    Lens::looking_at(
        vec3(0.0, 0.0, 5.0),
        Vec3::ZERO,
        Vec3::Y,
        45f32.to_radians(),
        1.0,
        0.0,
    )
}

pub fn camera() -> Camera {
    Camera::new(SIZE, lens())
}

pub fn engine(wall: &Wall, settings: Settings) -> Engine<CpuBackend> {
    init_logger();

    Engine::new(wall.backend(), settings).unwrap()
}

pub fn history<'a>(
    engine: &'a Engine<CpuBackend>,
    camera: CameraHandle,
    role: HistoryRole,
) -> &'a CpuTexture {
    let texture = engine.history().get(camera, role).unwrap();

    engine.backend().texture(texture.handle()).unwrap()
}

pub fn mean(texels: &[Vec4]) -> Vec4 {
    texels.iter().copied().sum::<Vec4>() / (texels.len() as f32)
}

/// Returns the variance of the red channel.
pub fn variance(texels: &[Vec4]) -> f32 {
    let mean = mean(texels).x;

    texels
        .iter()
        .map(|texel| (texel.x - mean).powi(2))
        .sum::<f32>()
        / (texels.len() as f32)
}
