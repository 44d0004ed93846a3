//! Reference backend, executing everything on the host.

mod texture;
mod tracer;

use derivative::Derivative;
use fxhash::FxHashMap;
use glam::{uvec2, UVec2, Vec4};
use log::{trace, warn};

pub use self::texture::*;
pub use self::tracer::*;
use crate::{
    gpu, Backend, BufferDescriptor, BufferHandle, Command, Commands, Error,
    HistoryBindings, Result, TextureDescriptor, TextureHandle, TraceRequest,
};

/// Backend running the per-pixel kernels on the CPU.
///
/// It's slow, but it's deterministic and lets everything it executes be
/// inspected afterwards, which makes it the backend of choice for tests and
/// headless renders.
#[derive(Derivative, Default)]
#[derivative(Debug)]
pub struct CpuBackend {
    textures: FxHashMap<TextureHandle, CpuTexture>,
    buffers: FxHashMap<BufferHandle, CpuBuffer>,

    #[derivative(Debug = "ignore")]
    tracer: Option<Box<dyn CpuTracer>>,

    presented: Option<CpuTexture>,
    memory_limit: Option<usize>,
    memory_used: usize,
    next_id: u32,
    submissions: usize,
}

impl CpuBackend {
    pub fn new(tracer: impl CpuTracer + 'static) -> Self {
        Self::default().with_tracer(tracer)
    }

    pub fn with_tracer(mut self, tracer: impl CpuTracer + 'static) -> Self {
        self.tracer = Some(Box::new(tracer));
        self
    }

    /// Makes allocations fail once they'd exceed given number of bytes.
    pub fn with_memory_limit(mut self, limit: usize) -> Self {
        self.memory_limit = Some(limit);
        self
    }

    /// Returns the most recently presented image.
    pub fn presented(&self) -> Option<&CpuTexture> {
        self.presented.as_ref()
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&CpuTexture> {
        self.textures.get(&handle)
    }

    pub fn texture_mut(
        &mut self,
        handle: TextureHandle,
    ) -> Option<&mut CpuTexture> {
        self.textures.get_mut(&handle)
    }

    pub fn buffer(&self, handle: BufferHandle) -> Option<&[u32]> {
        self.buffers.get(&handle).map(|buffer| &buffer.words[..])
    }

    pub fn contains_buffer(&self, handle: BufferHandle) -> bool {
        self.buffers.contains_key(&handle)
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Number of bytes taken by all live textures and buffers.
    pub fn memory_used(&self) -> usize {
        self.memory_used
    }

    /// Number of successfully executed submissions.
    pub fn submissions(&self) -> usize {
        self.submissions
    }

    fn allocate(&mut self, label: &str, size: usize) -> Result<u32> {
        if let Some(limit) = self.memory_limit {
            if self.memory_used + size > limit {
                return Err(Error::Allocation {
                    label: label.into(),
                    reason: format!(
                        "out of memory ({} bytes requested, {} of {} bytes \
                         in use)",
                        size, self.memory_used, limit
                    ),
                });
            }
        }

        let id = self.next_id;

        self.memory_used += size;
        self.next_id += 1;

        Ok(id)
    }

    fn get(&self, handle: TextureHandle) -> Result<&CpuTexture> {
        self.textures
            .get(&handle)
            .ok_or(Error::UnknownTexture(handle))
    }

    fn take(&mut self, handle: TextureHandle) -> Result<CpuTexture> {
        self.textures
            .remove(&handle)
            .ok_or(Error::UnknownTexture(handle))
    }

    fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Trace(req) => self.trace(&req),

            Command::Denoise {
                params,
                input,
                original,
                normal,
                base_color,
                output,
            } => self.denoise(
                &params,
                [input, original],
                [normal, base_color],
                output,
            ),

            Command::Reproject {
                params,
                color,
                normal,
                base_color,
                history,
                output_color,
                output_count,
            } => self.reproject(
                &params,
                [color, normal, base_color],
                &history,
                [output_color, output_count],
            ),

            Command::Copy { src, dst } => {
                let mut dst_tex = self.take(dst)?;

                dst_tex.copy_from(self.get(src)?);
                self.textures.insert(dst, dst_tex);

                Ok(())
            }

            Command::Present { src } => {
                self.presented = Some(self.get(src)?.clone());

                Ok(())
            }
        }
    }

    fn trace(&mut self, req: &TraceRequest) -> Result<()> {
        let tracer = self.tracer.as_mut().ok_or_else(no_tracer)?;

        let prng_states = self
            .buffers
            .get_mut(&req.prng_states)
            .ok_or(Error::UnknownBuffer(req.prng_states))?;

        let mut take = |handle: TextureHandle| {
            self.textures
                .remove(&handle)
                .ok_or(Error::UnknownTexture(handle))
        };

        let mut color = take(req.color)?;
        let mut normal = take(req.normal)?;
        let mut base_color = take(req.base_color)?;

        tracer.trace(TraceTargets {
            frame: req.frame,
            lens: req.lens,
            size: req.size,
            prng_states: &mut prng_states.words,
            color: &mut color,
            normal: &mut normal,
            base_color: &mut base_color,
        });

        self.textures.insert(req.color, color);
        self.textures.insert(req.normal, normal);
        self.textures.insert(req.base_color, base_color);

        Ok(())
    }

    fn denoise(
        &mut self,
        params: &gpu::DenoisingPassParams,
        [input, original]: [TextureHandle; 2],
        [normal, base_color]: [TextureHandle; 2],
        output: TextureHandle,
    ) -> Result<()> {
        let mut output_tex = self.take(output)?;

        let denoiser = gpu::SpatialDenoiser {
            params,
            surface_map: gpu::SurfaceMap::new(
                self.get(normal)?,
                self.get(base_color)?,
            ),
            input: self.get(input)?,
            original: self.get(original)?,
        };

        for pos in pixels(output_tex.size()) {
            output_tex.write(pos, denoiser.run(pos));
        }

        self.textures.insert(output, output_tex);

        Ok(())
    }

    fn reproject(
        &mut self,
        params: &gpu::ReprojectionPassParams,
        [color, normal, base_color]: [TextureHandle; 3],
        history: &HistoryBindings,
        [output_color, output_count]: [TextureHandle; 2],
    ) -> Result<()> {
        use crate::gpu::Image;

        let mut output_color_tex = self.take(output_color)?;
        let mut output_count_tex = self.take(output_count)?;

        let color = self.get(color)?;
        let surface_map =
            gpu::SurfaceMap::new(self.get(normal)?, self.get(base_color)?);

        let history_color = self.get(history.color)?;
        let history_count = self.get(history.count)?;
        let history_surface_map = gpu::SurfaceMap::new(
            self.get(history.normal)?,
            self.get(history.base_color)?,
        );

        let reprojector = gpu::TemporalReprojector { params };

        for pos in pixels(output_color_tex.size()) {
            let history = gpu::History {
                color: history_color.read(pos),
                surface: history_surface_map.get(pos),
                sample_count: history_count.read(pos).x,
            };

            let out = reprojector.run(
                color.read(pos),
                &surface_map.get(pos),
                &history,
            );

            output_color_tex.write(pos, out.color);
            output_count_tex.write(pos, Vec4::splat(out.sample_count));
        }

        self.textures.insert(output_color, output_color_tex);
        self.textures.insert(output_count, output_count_tex);

        Ok(())
    }
}

impl Backend for CpuBackend {
    fn create_texture(
        &mut self,
        desc: &TextureDescriptor,
    ) -> Result<TextureHandle> {
        let id = self.allocate(&desc.label, desc.size_in_bytes())?;
        let handle = TextureHandle::new(id);

        trace!("Created texture `{}`: {:?}", desc.label, handle);

        self.textures.insert(handle, CpuTexture::new(desc.clone()));

        Ok(handle)
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        if let Some(tex) = self.textures.remove(&texture) {
            self.memory_used -= tex.desc().size_in_bytes();
        } else {
            warn!("Tried to release unknown texture: {:?}", texture);
        }
    }

    fn create_buffer(
        &mut self,
        desc: &BufferDescriptor,
    ) -> Result<BufferHandle> {
        let id = self.allocate(desc.label, desc.contents.len())?;
        let handle = BufferHandle::new(id);

        trace!("Created buffer `{}`: {:?}", desc.label, handle);

        self.buffers.insert(handle, CpuBuffer::new(desc.contents));

        Ok(handle)
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        if let Some(buf) = self.buffers.remove(&buffer) {
            self.memory_used -= buf.len;
        } else {
            warn!("Tried to release unknown buffer: {:?}", buffer);
        }
    }

    fn submit(&mut self, commands: Commands) -> Result<()> {
        commands.validate(
            |handle| self.textures.get(&handle).map(|tex| tex.desc()),
            |handle| self.buffers.contains_key(&handle),
        )?;

        let traces = commands
            .iter()
            .any(|command| matches!(command, Command::Trace(_)));

        if traces && self.tracer.is_none() {
            return Err(no_tracer());
        }

        for command in commands {
            self.execute(command)?;
        }

        self.submissions += 1;

        Ok(())
    }
}

#[derive(Clone, Debug)]
struct CpuBuffer {
    words: Vec<u32>,
    len: usize,
}

impl CpuBuffer {
    fn new(contents: &[u8]) -> Self {
        let words = contents
            .chunks(4)
            .map(|chunk| {
                let mut word = [0; 4];

                word[..chunk.len()].copy_from_slice(chunk);
                u32::from_ne_bytes(word)
            })
            .collect();

        Self {
            words,
            len: contents.len(),
        }
    }
}

fn pixels(size: UVec2) -> impl Iterator<Item = UVec2> {
    (0..size.y).flat_map(move |y| (0..size.x).map(move |x| uvec2(x, y)))
}

fn no_tracer() -> Error {
    Error::Device("no ray tracer has been configured".into())
}
