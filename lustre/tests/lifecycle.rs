mod common;

use std::cell::Cell;
use std::rc::Rc;

use glam::uvec2;
use lustre::{
    Backend, BufferDescriptor, BufferHandle, Camera, CameraKind, Commands,
    CpuBackend, Engine, Error, HistoryRole, RenderOutcome, Settings,
    TextureDescriptor, TextureHandle,
};

use self::common::*;

#[test]
fn resize() {
    let wall = Wall::default();
    let mut engine = engine(&wall, Settings::default());
    let camera = engine.create_camera(common::camera());

    for _ in 0..3 {
        engine.render_camera(camera).unwrap();
    }

    engine
        .update_camera(camera, Camera::new(uvec2(8, 4), lens()))
        .unwrap();

    engine.render_camera(camera).unwrap();

    for role in HistoryRole::ALL {
        assert_eq!(
            uvec2(8, 4),
            engine.history().get(camera, role).unwrap().size()
        );
    }

    assert_eq!(Some(uvec2(8, 4)), engine.transients().size());

    // Reallocated history starts from scratch
    assert!(common::history(&engine, camera, HistoryRole::Count)
        .texels()
        .iter()
        .all(|texel| texel.x == 1.0));

    // Old buffers are gone: 4 history textures + 7 transients
    assert_eq!(11, engine.backend().live_textures());
    assert_eq!(1, engine.backend().live_buffers());
}

#[test]
fn update_without_resize_keeps_history() {
    let wall = Wall::default();
    let mut engine = engine(&wall, Settings::default());
    let camera = engine.create_camera(common::camera());

    engine.render_camera(camera).unwrap();

    let mut moved = common::camera();

    if let Some(lens) = &mut moved.lens {
        lens.aperture = 0.1;
    }

    engine.update_camera(camera, moved).unwrap();
    engine.render_camera(camera).unwrap();

    assert!(common::history(&engine, camera, HistoryRole::Count)
        .texels()
        .iter()
        .all(|texel| texel.x == 2.0));
}

#[test]
fn delete() {
    let wall = Wall::default();
    let mut engine = engine(&wall, Settings::default());
    let camera1 = engine.create_camera(common::camera());
    let camera2 = engine.create_camera(common::camera());

    engine.render_camera(camera1).unwrap();
    engine.render_camera(camera2).unwrap();

    assert_eq!(8, engine.history().len());

    engine.delete_camera(camera1).unwrap();

    assert!(!engine.history().contains(camera1));
    assert!(engine.history().contains(camera2));
    assert_eq!(4, engine.history().len());
    assert_eq!(11, engine.backend().live_textures());
    assert_eq!(1, engine.backend().live_buffers());

    assert!(matches!(
        engine.render_camera(camera1),
        Err(Error::UnknownCamera(_))
    ));

    assert!(matches!(
        engine.delete_camera(camera1),
        Err(Error::UnknownCamera(_))
    ));

    // Handles are never reused
    let camera3 = engine.create_camera(common::camera());

    assert_ne!(camera1, camera3);
}

#[test]
fn allocation_failure() {
    init_logger();

    let wall = Wall::default();
    let backend = wall.backend().with_memory_limit(4096);
    let mut engine = Engine::new(backend, Settings::default()).unwrap();
    let camera = engine.create_camera(common::camera());

    assert!(matches!(
        engine.render_camera(camera),
        Err(Error::Allocation { .. })
    ));

    // Nothing partial is kept around, and the frame doesn't count
    assert!(!engine.history().contains(camera));
    assert_eq!(0, engine.backend().memory_used());
    assert_eq!(0, engine.backend().submissions());
    assert_eq!(0, engine.frame().get());

    // Smaller cameras still fit
    engine
        .update_camera(camera, Camera::new(uvec2(4, 4), lens()))
        .unwrap();

    engine.render_camera(camera).unwrap();

    assert_eq!(1, engine.frame().get());
}

#[test]
fn transient_allocation_failure() {
    init_logger();

    // 16x16 history (38 bytes per pixel) fits, transients (82 bytes per
    // pixel) don't
    let wall = Wall::default();
    let backend = wall.backend().with_memory_limit(256 * 38 + 256 * 40);
    let mut engine = Engine::new(backend, Settings::default()).unwrap();
    let camera = engine.create_camera(common::camera());

    assert!(matches!(
        engine.render_camera(camera),
        Err(Error::Allocation { .. })
    ));

    assert_eq!(None, engine.transients().size());
    assert_eq!(0, engine.backend().submissions());
    assert_eq!(0, engine.frame().get());
}

#[test]
fn unrenderable_cameras() {
    let wall = Wall::default();
    let mut engine = engine(&wall, Settings::default());

    let no_lens = engine.create_camera(Camera {
        viewport: uvec2(16, 16),
        ..Default::default()
    });

    let empty = engine.create_camera(Camera::new(uvec2(0, 16), lens()));

    assert!(matches!(
        engine.render_camera(no_lens),
        Err(Error::MissingLens(_))
    ));

    assert!(matches!(
        engine.render_camera(empty),
        Err(Error::EmptyViewport(_))
    ));

    assert!(engine.history().is_empty());
    assert_eq!(0, engine.frame().get());
}

#[test]
fn only_game_cameras_advance_frames() {
    let wall = Wall::default();
    let mut engine = engine(&wall, Settings::default());

    let game = engine.create_camera(common::camera());

    let preview = engine
        .create_camera(common::camera().with_kind(CameraKind::Preview));

    let scene_view = engine
        .create_camera(common::camera().with_kind(CameraKind::SceneView));

    engine.render_camera(preview).unwrap();
    engine.render_camera(scene_view).unwrap();

    assert_eq!(0, engine.frame().get());

    engine.render_camera(game).unwrap();
    engine.render_camera(preview).unwrap();

    assert_eq!(1, engine.frame().get());
}

#[test]
fn progressive_cap() {
    let wall = Wall::default();

    let settings = Settings {
        progressive_frame_cap: Some(2),
        ..Default::default()
    };

    let mut engine = engine(&wall, settings);
    let camera = engine.create_camera(common::camera());

    engine.render_camera(camera).unwrap();
    engine.render_camera(camera).unwrap();

    assert_eq!(2, engine.frame().get());

    let history = common::history(&engine, camera, HistoryRole::Color)
        .texels()
        .to_vec();

    let submissions = engine.backend().submissions();

    assert_eq!(
        RenderOutcome::Converged,
        engine.render_camera(camera).unwrap()
    );

    // Converged frames re-present the history and don't touch it
    assert_eq!(2, engine.frame().get());
    assert_eq!(submissions + 1, engine.backend().submissions());

    assert_eq!(
        Some(&history[..]),
        engine.backend().presented().map(|tex| tex.texels())
    );

    assert_eq!(
        &history[..],
        common::history(&engine, camera, HistoryRole::Color).texels()
    );

    // Lifting the cap resumes accumulation
    engine.set_settings(Settings::default()).unwrap();

    assert!(matches!(
        engine.render_camera(camera).unwrap(),
        RenderOutcome::Rendered { .. }
    ));

    assert!(common::history(&engine, camera, HistoryRole::Count)
        .texels()
        .iter()
        .all(|texel| texel.x == 3.0));
}

#[test]
fn invalid_settings() {
    let wall = Wall::default();

    let mut settings = Settings::default();

    settings.reprojection.max_sample_count = 0;

    assert!(matches!(
        Engine::new(wall.backend(), settings.clone()),
        Err(Error::InvalidSettings(_))
    ));

    let mut engine = engine(&wall, Settings::default());

    assert!(matches!(
        engine.set_settings(settings),
        Err(Error::InvalidSettings(_))
    ));

    assert_eq!(&Settings::default(), engine.settings());
}

/// Backend counting its live resources, so that they can be observed after
/// the engine (which owns the backend) is gone.
struct Tracked {
    inner: CpuBackend,
    live: Rc<Cell<usize>>,
}

impl Backend for Tracked {
    fn create_texture(
        &mut self,
        desc: &TextureDescriptor,
    ) -> lustre::Result<TextureHandle> {
        let handle = self.inner.create_texture(desc)?;

        self.live.set(self.live.get() + 1);

        Ok(handle)
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        self.live.set(self.live.get() - 1);
        self.inner.release_texture(texture);
    }

    fn create_buffer(
        &mut self,
        desc: &BufferDescriptor,
    ) -> lustre::Result<BufferHandle> {
        let handle = self.inner.create_buffer(desc)?;

        self.live.set(self.live.get() + 1);

        Ok(handle)
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        self.live.set(self.live.get() - 1);
        self.inner.release_buffer(buffer);
    }

    fn submit(&mut self, commands: Commands) -> lustre::Result<()> {
        self.inner.submit(commands)
    }
}

#[test]
fn drop_releases_everything() {
    init_logger();

    let wall = Wall::default();
    let live = Rc::new(Cell::new(0));

    let backend = Tracked {
        inner: wall.backend(),
        live: live.clone(),
    };

    let mut engine = Engine::new(backend, Settings::default()).unwrap();
    let camera1 = engine.create_camera(common::camera());
    let camera2 = engine.create_camera(common::camera());

    engine.render_camera(camera1).unwrap();
    engine.render_camera(camera2).unwrap();

    // 2 * (4 history textures + PRNG states) + 7 transients
    assert_eq!(17, live.get());

    drop(engine);

    assert_eq!(0, live.get());
}
