//! Contract between the renderer and whatever executes its work.

use std::slice;

use glam::UVec2;

use crate::{gpu, Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(u32);

impl TextureHandle {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(u32);

impl BufferHandle {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// Four 32-bit floats; used for colors
    Rgba32Float,

    /// Four 16-bit floats; used for normals and base colors
    Rgba16Float,

    /// One 16-bit float; used for sample counts
    R16Float,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgba32Float => 16,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::R16Float => 2,
        }
    }

    pub fn channels(self) -> usize {
        match self {
            TextureFormat::Rgba32Float | TextureFormat::Rgba16Float => 4,
            TextureFormat::R16Float => 1,
        }
    }

    pub fn is_half(self) -> bool {
        matches!(self, TextureFormat::Rgba16Float | TextureFormat::R16Float)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub label: String,
    pub size: UVec2,
    pub format: TextureFormat,
    pub usage: wgpu::TextureUsages,
}

impl TextureDescriptor {
    pub fn size_in_bytes(&self) -> usize {
        (self.size.x as usize)
            * (self.size.y as usize)
            * self.format.bytes_per_pixel()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BufferDescriptor<'a> {
    pub label: &'a str,
    pub contents: &'a [u8],
}

/// Parameters of the (external) ray tracing dispatch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceRequest {
    pub frame: gpu::Frame,
    pub lens: gpu::Lens,
    pub size: UVec2,

    /// Per-pixel states of the random number generator
    pub prng_states: BufferHandle,

    /// Radiance (`Rgba32Float`)
    pub color: TextureHandle,

    /// World-space normal of the primary hit (`Rgba16Float`)
    pub normal: TextureHandle,

    /// Base color (albedo) of the primary hit (`Rgba16Float`)
    pub base_color: TextureHandle,
}

/// History a frame gets reprojected against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryBindings {
    pub color: TextureHandle,
    pub normal: TextureHandle,
    pub base_color: TextureHandle,
    pub count: TextureHandle,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Runs the ray tracing dispatch.
    Trace(TraceRequest),

    /// Runs a single pass of the spatial denoiser.
    Denoise {
        params: gpu::DenoisingPassParams,
        input: TextureHandle,

        /// Unfiltered color the high-pass blend is relative to
        original: TextureHandle,

        normal: TextureHandle,
        base_color: TextureHandle,
        output: TextureHandle,
    },

    /// Blends current frame with history.
    Reproject {
        params: gpu::ReprojectionPassParams,
        color: TextureHandle,
        normal: TextureHandle,
        base_color: TextureHandle,
        history: HistoryBindings,
        output_color: TextureHandle,
        output_count: TextureHandle,
    },

    /// Copies a texture into another texture of the same size and format.
    Copy {
        src: TextureHandle,
        dst: TextureHandle,
    },

    /// Shows given texture on the output.
    Present { src: TextureHandle },
}

/// Ordered sequence of commands, submitted at once.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Commands {
    items: Vec<Command>,
}

impl Commands {
    pub fn push(&mut self, command: Command) {
        log::trace!("Recording command: {:?}", command);

        self.items.push(command);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Command> {
        self.items.iter()
    }

    /// Checks that every command refers to live resources of expected sizes
    /// and formats.
    ///
    /// Backends call this before executing anything, so that a rejected
    /// submission doesn't leave half of its work done.
    pub fn validate<'a>(
        &self,
        texture: impl Fn(TextureHandle) -> Option<&'a TextureDescriptor>,
        buffer_exists: impl Fn(BufferHandle) -> bool,
    ) -> Result<()> {
        use TextureFormat::*;

        let check = |handle: TextureHandle,
                     format: Option<TextureFormat>,
                     size: Option<UVec2>|
         -> Result<UVec2> {
            let desc = texture(handle).ok_or(Error::UnknownTexture(handle))?;

            if let Some(format) = format {
                if desc.format != format {
                    return Err(Error::FormatMismatch {
                        texture: handle,
                        expected: format,
                        actual: desc.format,
                    });
                }
            }

            if let Some(size) = size {
                if desc.size != size {
                    return Err(Error::SizeMismatch {
                        texture: handle,
                        expected: size,
                        actual: desc.size,
                    });
                }
            }

            Ok(desc.size)
        };

        let check_aliasing = |output: TextureHandle,
                              inputs: &[TextureHandle]|
         -> Result<()> {
            if inputs.contains(&output) {
                Err(Error::Aliasing(output))
            } else {
                Ok(())
            }
        };

        for command in self.iter() {
            match command {
                Command::Trace(req) => {
                    if !buffer_exists(req.prng_states) {
                        return Err(Error::UnknownBuffer(req.prng_states));
                    }

                    check(req.color, Some(Rgba32Float), Some(req.size))?;
                    check(req.normal, Some(Rgba16Float), Some(req.size))?;
                    check(req.base_color, Some(Rgba16Float), Some(req.size))?;
                    check_aliasing(req.normal, &[req.base_color])?;
                }

                Command::Denoise {
                    input,
                    original,
                    normal,
                    base_color,
                    output,
                    ..
                } => {
                    let size = check(*input, Some(Rgba32Float), None)?;

                    check(*original, Some(Rgba32Float), Some(size))?;
                    check(*normal, Some(Rgba16Float), Some(size))?;
                    check(*base_color, Some(Rgba16Float), Some(size))?;
                    check(*output, Some(Rgba32Float), Some(size))?;

                    check_aliasing(
                        *output,
                        &[*input, *original, *normal, *base_color],
                    )?;
                }

                Command::Reproject {
                    color,
                    normal,
                    base_color,
                    history,
                    output_color,
                    output_count,
                    ..
                } => {
                    let size = check(*color, Some(Rgba32Float), None)?;

                    check(*normal, Some(Rgba16Float), Some(size))?;
                    check(*base_color, Some(Rgba16Float), Some(size))?;
                    check(history.color, Some(Rgba32Float), Some(size))?;
                    check(history.normal, Some(Rgba16Float), Some(size))?;
                    check(history.base_color, Some(Rgba16Float), Some(size))?;
                    check(history.count, Some(R16Float), Some(size))?;
                    check(*output_color, Some(Rgba32Float), Some(size))?;
                    check(*output_count, Some(R16Float), Some(size))?;

                    let inputs = [
                        *color,
                        *normal,
                        *base_color,
                        history.color,
                        history.normal,
                        history.base_color,
                        history.count,
                    ];

                    check_aliasing(*output_color, &inputs)?;
                    check_aliasing(*output_count, &inputs)?;
                }

                Command::Copy { src, dst } => {
                    let src_desc =
                        texture(*src).ok_or(Error::UnknownTexture(*src))?;

                    check(*dst, Some(src_desc.format), Some(src_desc.size))?;
                    check_aliasing(*dst, &[*src])?;
                }

                Command::Present { src } => {
                    check(*src, Some(Rgba32Float), None)?;
                }
            }
        }

        Ok(())
    }
}

impl IntoIterator for Commands {
    type Item = Command;
    type IntoIter = std::vec::IntoIter<Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// GPU execution engine the renderer records its work for.
///
/// Implementations own the actual resources; the renderer refers to them only
/// through handles.
pub trait Backend {
    fn create_texture(
        &mut self,
        desc: &TextureDescriptor,
    ) -> Result<TextureHandle>;

    fn release_texture(&mut self, texture: TextureHandle);

    fn create_buffer(
        &mut self,
        desc: &BufferDescriptor,
    ) -> Result<BufferHandle>;

    fn release_buffer(&mut self, buffer: BufferHandle);

    /// Executes given commands in order.
    ///
    /// If this function returns an error, none of the commands that follow
    /// the failing one have been executed.
    fn submit(&mut self, commands: Commands) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use fxhash::FxHashMap;
    use glam::uvec2;

    use super::*;

    fn textures() -> FxHashMap<TextureHandle, TextureDescriptor> {
        let desc = |label: &str, size, format| TextureDescriptor {
            label: label.into(),
            size,
            format,
            usage: wgpu::TextureUsages::STORAGE_BINDING,
        };

        [
            desc("color", uvec2(4, 4), TextureFormat::Rgba32Float),
            desc("denoised", uvec2(4, 4), TextureFormat::Rgba32Float),
            desc("normal", uvec2(4, 4), TextureFormat::Rgba16Float),
            desc("base_color", uvec2(4, 4), TextureFormat::Rgba16Float),
            desc("small", uvec2(2, 2), TextureFormat::Rgba32Float),
            desc("filtered", uvec2(4, 4), TextureFormat::Rgba32Float),
        ]
        .into_iter()
        .enumerate()
        .map(|(id, desc)| (TextureHandle::new(id as u32), desc))
        .collect()
    }

    fn denoise(input: u32, output: u32) -> Command {
        Command::Denoise {
            params: Default::default(),
            input: TextureHandle::new(input),
            original: TextureHandle::new(5),
            normal: TextureHandle::new(2),
            base_color: TextureHandle::new(3),
            output: TextureHandle::new(output),
        }
    }

    fn validate(command: Command) -> Result<()> {
        let textures = textures();
        let mut commands = Commands::default();

        commands.push(command);
        commands.validate(|handle| textures.get(&handle), |_| true)
    }

    #[test]
    fn validation() {
        assert!(validate(denoise(0, 1)).is_ok());

        assert!(matches!(
            validate(denoise(0, 0)),
            Err(Error::Aliasing(_))
        ));

        assert!(matches!(
            validate(denoise(0, 4)),
            Err(Error::SizeMismatch { .. })
        ));

        assert!(matches!(
            validate(denoise(0, 2)),
            Err(Error::FormatMismatch { .. })
        ));

        assert!(matches!(
            validate(denoise(0, 5)),
            Err(Error::Aliasing(_))
        ));

        assert!(matches!(
            validate(denoise(0, 123)),
            Err(Error::UnknownTexture(_))
        ));

        assert!(matches!(
            validate(Command::Copy {
                src: TextureHandle::new(0),
                dst: TextureHandle::new(2),
            }),
            Err(Error::FormatMismatch { .. })
        ));

        assert!(validate(Command::Present {
            src: TextureHandle::new(4),
        })
        .is_ok());
    }
}
