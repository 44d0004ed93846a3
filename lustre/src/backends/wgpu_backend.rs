//! Backend executing the kernels as WGSL compute shaders.

mod pipelines;
mod tracer;

use std::sync::{mpsc, Arc};

use derivative::Derivative;
use fxhash::FxHashMap;
use glam::{vec4, UVec2, Vec4};
use half::f16;
use log::{info, trace, warn};
use wgpu::util::DeviceExt;

use self::pipelines::*;
pub use self::tracer::*;
use crate::{
    Backend, BufferDescriptor, BufferHandle, Command, Commands, Error, Result,
    TextureDescriptor, TextureFormat, TextureHandle,
};

#[derive(Derivative)]
#[derivative(Debug)]
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipelines: Pipelines,
    textures: FxHashMap<TextureHandle, WgpuTexture>,
    buffers: FxHashMap<BufferHandle, wgpu::Buffer>,

    #[derivative(Debug = "ignore")]
    tracer: Option<Box<dyn WgpuTracer>>,

    output: Option<wgpu::Texture>,
    next_id: u32,
}

impl WgpuBackend {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        info!("Initializing wgpu backend");

        let pipelines = Pipelines::new(&device);

        Self {
            device,
            queue,
            pipelines,
            textures: Default::default(),
            buffers: Default::default(),
            tracer: None,
            output: None,
            next_id: 0,
        }
    }

    /// Creates a backend on the default adapter, without any surface.
    pub fn headless() -> Result<Self> {
        pollster::block_on(async {
            let instance =
                wgpu::Instance::new(wgpu::InstanceDescriptor::default());

            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions::default())
                .await
                .ok_or_else(|| Error::Device("no suitable adapter".into()))?;

            let (device, queue) = adapter
                .request_device(
                    &wgpu::DeviceDescriptor {
                        label: Some("lustre_device"),
                        features: wgpu::Features::empty(),
                        limits: wgpu::Limits::default(),
                    },
                    None,
                )
                .await
                .map_err(|err| Error::Device(err.to_string()))?;

            Ok(Self::new(Arc::new(device), Arc::new(queue)))
        })
    }

    pub fn with_tracer(mut self, tracer: impl WgpuTracer + 'static) -> Self {
        self.tracer = Some(Box::new(tracer));
        self
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    /// Sets the texture `Command::Present` copies into.
    ///
    /// The texture must be `Rgba32Float` and allow being copied into; its size
    /// must match the size of what's presented.
    pub fn set_output(&mut self, output: wgpu::Texture) -> Result<()> {
        if output.format() != wgpu::TextureFormat::Rgba32Float {
            return Err(Error::Device(format!(
                "output texture must be Rgba32Float, got {:?}",
                output.format()
            )));
        }

        if !output.usage().contains(wgpu::TextureUsages::COPY_DST) {
            return Err(Error::Device(
                "output texture must have the COPY_DST usage".into(),
            ));
        }

        self.output = Some(output);

        Ok(())
    }

    pub fn output(&self) -> Option<&wgpu::Texture> {
        self.output.as_ref()
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&wgpu::Texture> {
        self.textures.get(&handle).map(|tex| &tex.texture)
    }

    /// Uploads texels into given texture, row-major.
    pub fn write_texture(
        &self,
        handle: TextureHandle,
        texels: &[Vec4],
    ) -> Result<()> {
        let tex = self.get(handle)?;
        let size = tex.desc.size;

        assert_eq!((size.x * size.y) as usize, texels.len());

        let bytes: Vec<u8> = texels
            .iter()
            .flat_map(|texel| encode(tex.desc.format, *texel))
            .collect();

        self.queue.write_texture(
            tex.texture.as_image_copy(),
            &bytes,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(size.x * texel_size(tex.desc.format)),
                rows_per_image: Some(size.y),
            },
            extent(size),
        );

        Ok(())
    }

    /// Downloads texels of given texture, row-major.
    ///
    /// Blocks until the GPU finishes all of the work submitted so far.
    pub fn read_texture(&self, handle: TextureHandle) -> Result<Vec<Vec4>> {
        let tex = self.get(handle)?;
        let size = tex.desc.size;
        let texel_size = texel_size(tex.desc.format);

        let unpadded_bytes_per_row = size.x * texel_size;

        let padded_bytes_per_row = {
            let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

            (unpadded_bytes_per_row + align - 1) / align * align
        };

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lustre_readback"),
            size: (padded_bytes_per_row * size.y) as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder =
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("lustre_readback"),
                });

        encoder.copy_texture_to_buffer(
            tex.texture.as_image_copy(),
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(size.y),
                },
            },
            extent(size),
        );

        self.queue.submit([encoder.finish()]);

        let slice = buffer.slice(..);
        let (tx, rx) = mpsc::channel();

        slice.map_async(wgpu::MapMode::Read, move |result| {
            _ = tx.send(result);
        });

        self.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|err| Error::Device(err.to_string()))?
            .map_err(|err| Error::Device(err.to_string()))?;

        let texels = {
            let data = slice.get_mapped_range();

            data.chunks(padded_bytes_per_row as usize)
                .flat_map(|row| {
                    row[..unpadded_bytes_per_row as usize]
                        .chunks(texel_size as usize)
                        .map(|texel| decode(tex.desc.format, texel))
                })
                .collect()
        };

        buffer.unmap();

        Ok(texels)
    }

    fn get(&self, handle: TextureHandle) -> Result<&WgpuTexture> {
        self.textures
            .get(&handle)
            .ok_or(Error::UnknownTexture(handle))
    }

    fn view(&self, handle: TextureHandle) -> Result<wgpu::BindingResource<'_>> {
        self.get(handle)
            .map(|tex| wgpu::BindingResource::TextureView(&tex.view))
    }

    fn uniform(&self, label: &str, contents: &[u8]) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::UNIFORM,
            })
    }

    fn record(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        command: Command,
    ) -> Result<()> {
        match command {
            Command::Trace(req) => {
                let tracer = self.tracer.as_mut().ok_or_else(no_tracer)?;

                let texture = |handle: TextureHandle| {
                    self.textures
                        .get(&handle)
                        .map(|tex| &tex.texture)
                        .ok_or(Error::UnknownTexture(handle))
                };

                let prng_states = self
                    .buffers
                    .get(&req.prng_states)
                    .ok_or(Error::UnknownBuffer(req.prng_states))?;

                tracer.trace(WgpuTraceTargets {
                    device: &self.device,
                    encoder,
                    frame: req.frame,
                    lens: req.lens,
                    size: req.size,
                    prng_states,
                    color: texture(req.color)?,
                    normal: texture(req.normal)?,
                    base_color: texture(req.base_color)?,
                });
            }

            Command::Denoise {
                params,
                input,
                original,
                normal,
                base_color,
                output,
            } => {
                let params = self.uniform(
                    "lustre_denoising_params",
                    bytemuck::bytes_of(&params),
                );

                self.pipelines.denoising.run(
                    &self.device,
                    encoder,
                    self.get(input)?.desc.size,
                    [
                        params.as_entire_binding(),
                        self.view(input)?,
                        self.view(original)?,
                        self.view(normal)?,
                        self.view(base_color)?,
                        self.view(output)?,
                    ],
                );
            }

            Command::Reproject {
                params,
                color,
                normal,
                base_color,
                history,
                output_color,
                output_count,
            } => {
                let params = self.uniform(
                    "lustre_reprojection_params",
                    bytemuck::bytes_of(&params),
                );

                self.pipelines.reprojection.run(
                    &self.device,
                    encoder,
                    self.get(color)?.desc.size,
                    [
                        params.as_entire_binding(),
                        self.view(color)?,
                        self.view(normal)?,
                        self.view(base_color)?,
                        self.view(history.color)?,
                        self.view(history.normal)?,
                        self.view(history.base_color)?,
                        self.view(history.count)?,
                        self.view(output_color)?,
                        self.view(output_count)?,
                    ],
                );
            }

            Command::Copy { src, dst } => {
                let src = self.get(src)?;

                encoder.copy_texture_to_texture(
                    src.texture.as_image_copy(),
                    self.get(dst)?.texture.as_image_copy(),
                    extent(src.desc.size),
                );
            }

            Command::Present { src } => {
                let src = self.get(src)?;
                let output = self.output.as_ref().ok_or(Error::NoOutputTarget)?;

                encoder.copy_texture_to_texture(
                    src.texture.as_image_copy(),
                    output.as_image_copy(),
                    extent(src.desc.size),
                );
            }
        }

        Ok(())
    }
}

impl Backend for WgpuBackend {
    fn create_texture(
        &mut self,
        desc: &TextureDescriptor,
    ) -> Result<TextureHandle> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size: extent(desc.size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(desc.format),
            usage: desc.usage,
            view_formats: &[],
        });

        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(Error::Allocation {
                label: desc.label.clone(),
                reason: err.to_string(),
            });
        }

        let view = texture.create_view(&Default::default());
        let handle = TextureHandle::new(self.next_id);

        trace!("Created texture `{}`: {:?}", desc.label, handle);

        self.next_id += 1;

        self.textures.insert(
            handle,
            WgpuTexture {
                desc: desc.clone(),
                texture,
                view,
            },
        );

        Ok(handle)
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        if let Some(tex) = self.textures.remove(&texture) {
            tex.texture.destroy();
        } else {
            warn!("Tried to release unknown texture: {:?}", texture);
        }
    }

    fn create_buffer(
        &mut self,
        desc: &BufferDescriptor,
    ) -> Result<BufferHandle> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let buffer =
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(desc.label),
                    contents: desc.contents,
                    usage: wgpu::BufferUsages::STORAGE
                        | wgpu::BufferUsages::COPY_SRC
                        | wgpu::BufferUsages::COPY_DST,
                });

        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(Error::Allocation {
                label: desc.label.into(),
                reason: err.to_string(),
            });
        }

        let handle = BufferHandle::new(self.next_id);

        trace!("Created buffer `{}`: {:?}", desc.label, handle);

        self.next_id += 1;
        self.buffers.insert(handle, buffer);

        Ok(handle)
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        if let Some(buf) = self.buffers.remove(&buffer) {
            buf.destroy();
        } else {
            warn!("Tried to release unknown buffer: {:?}", buffer);
        }
    }

    fn submit(&mut self, commands: Commands) -> Result<()> {
        commands.validate(
            |handle| self.textures.get(&handle).map(|tex| &tex.desc),
            |handle| self.buffers.contains_key(&handle),
        )?;

        for command in commands.iter() {
            match command {
                Command::Trace(_) if self.tracer.is_none() => {
                    return Err(no_tracer());
                }

                Command::Present { src } => {
                    let output =
                        self.output.as_ref().ok_or(Error::NoOutputTarget)?;

                    let output_size =
                        UVec2::new(output.width(), output.height());
                    let src_size = self.get(*src)?.desc.size;

                    if output_size != src_size {
                        return Err(Error::SizeMismatch {
                            texture: *src,
                            expected: output_size,
                            actual: src_size,
                        });
                    }
                }

                _ => (),
            }
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let mut encoder =
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("lustre_frame"),
                });

        let recorded = commands
            .into_iter()
            .try_for_each(|command| self.record(&mut encoder, command));

        let command_buffer = encoder.finish();
        let scope = pollster::block_on(self.device.pop_error_scope());

        // Nothing reaches the queue unless the whole frame got recorded
        // cleanly, so a failed frame leaves the history as it was
        recorded?;

        if let Some(err) = scope {
            return Err(Error::Device(err.to_string()));
        }

        self.queue.submit([command_buffer]);

        Ok(())
    }
}

#[derive(Debug)]
struct WgpuTexture {
    desc: TextureDescriptor,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// Maps our formats into wgpu's ones.
///
/// `R16Float` cannot be bound as a storage texture, so counts are kept as
/// `R32Float` on the GPU; both represent all supported counts exactly.
fn texture_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
        TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        TextureFormat::R16Float => wgpu::TextureFormat::R32Float,
    }
}

fn texel_size(format: TextureFormat) -> u32 {
    match format {
        TextureFormat::Rgba32Float => 16,
        TextureFormat::Rgba16Float => 8,
        TextureFormat::R16Float => 4,
    }
}

fn encode(format: TextureFormat, texel: Vec4) -> Vec<u8> {
    match format {
        TextureFormat::Rgba32Float => texel
            .to_array()
            .into_iter()
            .flat_map(f32::to_le_bytes)
            .collect(),

        TextureFormat::Rgba16Float => texel
            .to_array()
            .into_iter()
            .flat_map(|value| f16::from_f32(value).to_le_bytes())
            .collect(),

        TextureFormat::R16Float => texel.x.to_le_bytes().to_vec(),
    }
}

fn decode(format: TextureFormat, bytes: &[u8]) -> Vec4 {
    let f32_at = |idx: usize| {
        f32::from_le_bytes([
            bytes[4 * idx],
            bytes[4 * idx + 1],
            bytes[4 * idx + 2],
            bytes[4 * idx + 3],
        ])
    };

    let f16_at = |idx: usize| {
        f16::from_le_bytes([bytes[2 * idx], bytes[2 * idx + 1]]).to_f32()
    };

    match format {
        TextureFormat::Rgba32Float => {
            vec4(f32_at(0), f32_at(1), f32_at(2), f32_at(3))
        }

        TextureFormat::Rgba16Float => {
            vec4(f16_at(0), f16_at(1), f16_at(2), f16_at(3))
        }

        TextureFormat::R16Float => vec4(f32_at(0), 0.0, 0.0, 0.0),
    }
}

fn extent(size: UVec2) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.x,
        height: size.y,
        depth_or_array_layers: 1,
    }
}

fn no_tracer() -> Error {
    Error::Device("no ray tracer has been configured".into())
}
