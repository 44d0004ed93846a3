use glam::UVec2;
use log::debug;

use crate::{
    Backend, Error, Result, TextureDescriptor, TextureFormat, TextureHandle,
};

/// Texture allocated through a [`Backend`].
///
/// Textures are never resized in place - when the size changes, the old one
/// gets released and a new one gets allocated.
#[derive(Debug, PartialEq, Eq)]
pub struct Texture {
    handle: TextureHandle,
    desc: TextureDescriptor,
}

impl Texture {
    pub fn builder(label: impl AsRef<str>) -> TextureBuilder {
        TextureBuilder::new(label)
    }

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    pub fn label(&self) -> &str {
        &self.desc.label
    }

    pub fn size(&self) -> UVec2 {
        self.desc.size
    }

    pub fn format(&self) -> TextureFormat {
        self.desc.format
    }

    pub fn release<B>(self, backend: &mut B)
    where
        B: Backend + ?Sized,
    {
        debug!("Releasing texture `{}`", self.desc.label);

        backend.release_texture(self.handle);
    }
}

#[derive(Clone, Debug)]
pub struct TextureBuilder {
    label: String,
    size: UVec2,
    format: TextureFormat,
    usage: wgpu::TextureUsages,
}

impl TextureBuilder {
    pub fn new(label: impl AsRef<str>) -> Self {
        Self {
            label: format!("lustre_{}", label.as_ref()),
            size: UVec2::ONE,
            format: TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
        }
    }

    pub fn with_size(mut self, size: UVec2) -> Self {
        self.size = size;
        self
    }

    pub fn with_format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_usage(mut self, usage: wgpu::TextureUsages) -> Self {
        self.usage |= usage;
        self
    }

    pub fn build<B>(self, backend: &mut B) -> Result<Texture>
    where
        B: Backend + ?Sized,
    {
        debug!(
            "Allocating texture `{}`; size={:?}, format={:?}",
            self.label, self.size, self.format
        );

        if self.size.x == 0 || self.size.y == 0 {
            return Err(Error::Allocation {
                label: self.label,
                reason: format!("texture cannot be empty (size={})", self.size),
            });
        }

        let desc = TextureDescriptor {
            label: self.label,
            size: self.size,
            format: self.format,
            usage: self.usage,
        };

        let handle = backend.create_texture(&desc)?;

        Ok(Texture { handle, desc })
    }

    /// Builds all textures or none of them - if any allocation fails, the
    /// textures allocated so far get released.
    pub fn build_all<B, const N: usize>(
        builders: [Self; N],
        backend: &mut B,
    ) -> Result<[Texture; N]>
    where
        B: Backend + ?Sized,
    {
        let mut textures = Vec::with_capacity(N);

        for builder in builders {
            match builder.build(backend) {
                Ok(texture) => {
                    textures.push(texture);
                }

                Err(err) => {
                    for texture in textures {
                        texture.release(backend);
                    }

                    return Err(err);
                }
            }
        }

        Ok(textures
            .try_into()
            .unwrap_or_else(|_: Vec<Texture>| unreachable!()))
    }
}

#[cfg(test)]
mod tests {
    use glam::uvec2;

    use super::*;
    use crate::CpuBackend;

    #[test]
    fn build() {
        let mut backend = CpuBackend::default();

        let texture = Texture::builder("color")
            .with_size(uvec2(4, 2))
            .with_format(TextureFormat::Rgba16Float)
            .build(&mut backend)
            .unwrap();

        assert_eq!("lustre_color", texture.label());
        assert_eq!(uvec2(4, 2), texture.size());
        assert_eq!(64, backend.memory_used());

        texture.release(&mut backend);

        assert_eq!(0, backend.live_textures());
    }

    #[test]
    fn build_empty() {
        let mut backend = CpuBackend::default();

        for size in [uvec2(0, 4), uvec2(4, 0)] {
            let result =
                Texture::builder("color").with_size(size).build(&mut backend);

            assert!(matches!(result, Err(Error::Allocation { .. })));
        }

        assert_eq!(0, backend.live_textures());
    }

    #[test]
    fn build_all() {
        // Room for the first texture (4 * 4 * 16 bytes), but not for both
        let mut backend = CpuBackend::default().with_memory_limit(300);

        let result = TextureBuilder::build_all(
            [Texture::builder("a"), Texture::builder("b")]
                .map(|builder| builder.with_size(uvec2(4, 4))),
            &mut backend,
        );

        assert!(matches!(result, Err(Error::Allocation { .. })));
        assert_eq!(0, backend.live_textures());
        assert_eq!(0, backend.memory_used());
    }
}
