//! Temporal accumulation and denoising pipeline of a progressive ray tracer.
//!
//! Each rendered frame goes through:
//!
//! - ray tracing (done by an external dispatch, see [`CpuTracer`] and
//!   [`WgpuTracer`]), which yields noisy color plus normals and base colors,
//! - spatial denoising (a couple of à-trous passes),
//! - temporal reprojection, blending the frame with camera's history,
//! - presentation, which also commits the frame into the history.

mod backend;
mod backends;
mod buffers;
mod camera;
mod cameras;
mod error;
mod history;
mod passes;
mod sequencer;
mod settings;
mod transients;
mod utils;

use log::{debug, info, trace, warn};
pub use lustre_gpu as gpu;

pub use self::backend::*;
pub use self::backends::*;
pub use self::buffers::*;
pub use self::camera::*;
pub use self::cameras::*;
pub use self::error::*;
pub use self::history::*;
pub use self::passes::*;
pub use self::sequencer::*;
pub use self::settings::*;
pub use self::transients::*;
pub(crate) use self::utils::*;

#[derive(Debug)]
pub struct Engine<B>
where
    B: Backend,
{
    backend: B,
    settings: Settings,
    passes: FramePasses,
    cameras: Cameras,
    history: HistoryStore,
    transients: Transients,
    sequencer: FrameSequencer,
}

impl<B> Engine<B>
where
    B: Backend,
{
    pub fn new(backend: B, settings: Settings) -> Result<Self> {
        info!("Initializing");

        settings.validate()?;

        Ok(Self {
            backend,
            passes: FramePasses::new(&settings),
            sequencer: FrameSequencer::new(settings.progressive_frame_cap),
            settings,
            cameras: Default::default(),
            history: Default::default(),
            transients: Default::default(),
        })
    }

    pub fn create_camera(&mut self, camera: Camera) -> CameraHandle {
        info!("Creating camera: {}", camera.describe());

        self.cameras.add(camera)
    }

    pub fn update_camera(
        &mut self,
        handle: CameraHandle,
        camera: Camera,
    ) -> Result<()> {
        let prev = self.cameras.get_mut(handle)?;

        if prev.is_invalidated_by(&camera) {
            debug!(
                "Camera {:?} got resized; its history will be reallocated: \
                 {} -> {}",
                handle,
                prev.describe(),
                camera.describe()
            );
        }

        *prev = camera;

        Ok(())
    }

    /// Deletes the camera, releasing all of its history buffers.
    pub fn delete_camera(&mut self, handle: CameraHandle) -> Result<()> {
        let camera = self.cameras.remove(handle)?;

        info!("Deleting camera: {}", camera.describe());

        self.history.remove(&mut self.backend, handle);

        Ok(())
    }

    pub fn camera(&self, handle: CameraHandle) -> Result<&Camera> {
        self.cameras.get(handle)
    }

    pub fn cameras(&self) -> &Cameras {
        &self.cameras
    }

    /// Allocates camera's history buffers, if they haven't been allocated
    /// yet (or if the camera got resized since).
    ///
    /// Rendering does this on its own, so calling this function is never
    /// required; it's useful to pay the allocation cost up front, though.
    pub fn prepare_camera(
        &mut self,
        handle: CameraHandle,
    ) -> Result<EnsuredHistory> {
        let camera = self.cameras.get(handle)?;

        if camera.viewport.x == 0 || camera.viewport.y == 0 {
            warn!("Camera {:?} has an empty viewport, skipping it", handle);

            return Err(Error::EmptyViewport(handle));
        }

        self.history
            .ensure(&mut self.backend, handle, camera.viewport)
    }

    /// Renders a single frame of given camera and commits it into camera's
    /// history.
    ///
    /// Failed frames leave the history untouched.
    pub fn render_camera(
        &mut self,
        handle: CameraHandle,
    ) -> Result<RenderOutcome> {
        let camera = self.cameras.get(handle)?;
        let kind = camera.kind;
        let size = camera.viewport;

        let Some(lens) = camera.lens else {
            warn!("Camera {:?} has no lens, skipping it", handle);

            return Err(Error::MissingLens(handle));
        };

        let history = self.prepare_camera(handle)?;

        if kind.advances_frames()
            && self.sequencer.is_converged()
            && !history.is_fresh
        {
            trace!("Camera {:?} has converged, re-presenting it", handle);

            let mut commands = Commands::default();

            self.passes
                .presenting
                .run_converged(&history.bindings, &mut commands);

            self.backend.submit(commands)?;

            return Ok(RenderOutcome::Converged);
        }

        let buffers = self.transients.ensure(&mut self.backend, size)?;
        let frame = self.sequencer.current();

        trace!("Rendering camera {:?}; frame={}", handle, frame.get());

        let mut commands = Commands::default();

        self.passes.tracing.run(
            frame,
            &lens,
            history.prng_states,
            buffers,
            &mut commands,
        );

        let denoised = self.passes.denoising.run(buffers, &mut commands);

        self.passes.reprojection.run(
            denoised,
            buffers,
            &history.bindings,
            &mut commands,
        );

        self.passes
            .presenting
            .run(buffers, &history.bindings, &mut commands);

        let output = buffers.temporal.handle();
        let backend = &mut self.backend;

        measure("render_camera", || backend.submit(commands))?;

        self.history.mark_committed(handle);

        if kind.advances_frames() && !self.sequencer.is_converged() {
            self.sequencer.advance();
        }

        Ok(RenderOutcome::Rendered {
            frame,
            denoised,
            output,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replaces the settings; invalid settings are rejected and leave the
    /// engine as it was.
    pub fn set_settings(&mut self, settings: Settings) -> Result<()> {
        settings.validate()?;

        if settings != self.settings {
            debug!("Rebuilding passes");

            self.passes = FramePasses::new(&settings);
            self.sequencer.set_cap(settings.progressive_frame_cap);
            self.settings = settings;
        }

        Ok(())
    }

    /// Returns the index of the next frame.
    pub fn frame(&self) -> gpu::Frame {
        self.sequencer.current()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn transients(&self) -> &Transients {
        &self.transients
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B> Drop for Engine<B>
where
    B: Backend,
{
    fn drop(&mut self) {
        self.history.release_all(&mut self.backend);
        self.transients.release(&mut self.backend);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Camera has been traced, denoised and accumulated
    Rendered {
        /// Index the frame has been traced with
        frame: gpu::Frame,

        /// Output of the spatial denoiser
        denoised: TextureHandle,

        /// Output of the temporal reprojection, i.e. what's been presented
        output: TextureHandle,
    },

    /// Progressive cap has been reached; camera's history has been
    /// re-presented as it was
    Converged,
}
