use std::path::Path;

use glam::{vec4, UVec2, Vec4};
use half::f16;
use image::{DynamicImage, Rgba, Rgba32FImage};

use crate::{gpu, Result, TextureDescriptor, TextureFormat};

/// Texture living in the host memory.
///
/// Texels are kept as `Vec4` regardless of the format, but every write gets
/// quantized to what the format can represent, so reading a half-float
/// texture yields exactly what a GPU would've read.
#[derive(Clone, Debug, PartialEq)]
pub struct CpuTexture {
    desc: TextureDescriptor,
    texels: Vec<Vec4>,
}

impl CpuTexture {
    /// Creates a zeroed texture.
    pub fn new(desc: TextureDescriptor) -> Self {
        let len = (desc.size.x as usize) * (desc.size.y as usize);

        Self {
            desc,
            texels: vec![Vec4::ZERO; len],
        }
    }

    pub fn desc(&self) -> &TextureDescriptor {
        &self.desc
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

    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    pub fn write(&mut self, pos: UVec2, texel: Vec4) {
        let idx = self.index(pos);

        self.texels[idx] = quantize(self.desc.format, texel);
    }

    pub fn fill(&mut self, texel: Vec4) {
        let texel = quantize(self.desc.format, texel);

        self.texels.fill(texel);
    }

    /// Overwrites this texture with `other`'s texels; both textures must have
    /// the same size and format.
    pub fn copy_from(&mut self, other: &Self) {
        assert_eq!(self.desc.size, other.desc.size);
        assert_eq!(self.desc.format, other.desc.format);

        self.texels.copy_from_slice(&other.texels);
    }

    pub fn to_image(&self) -> Rgba32FImage {
        Rgba32FImage::from_fn(self.desc.size.x, self.desc.size.y, |x, y| {
            let texel = self.texels[self.index(UVec2::new(x, y))];

            Rgba(texel.to_array())
        })
    }

    /// Saves the texture as an 8-bit sRGB image; the format is guessed from
    /// the path's extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut image = self.to_image();

        for pixel in image.pixels_mut() {
            for channel in &mut pixel.0[0..3] {
                *channel = channel.max(0.0).powf(1.0 / 2.2);
            }

            pixel.0[3] = 1.0;
        }

        DynamicImage::ImageRgba32F(image).into_rgba8().save(path)?;

        Ok(())
    }

    fn index(&self, pos: UVec2) -> usize {
        assert!(pos.x < self.desc.size.x && pos.y < self.desc.size.y);

        (pos.y * self.desc.size.x + pos.x) as usize
    }
}

impl gpu::Image for CpuTexture {
    fn size(&self) -> UVec2 {
        self.desc.size
    }

    fn read(&self, pos: UVec2) -> Vec4 {
        self.texels[self.index(pos)]
    }
}

fn quantize(format: TextureFormat, texel: Vec4) -> Vec4 {
    let half = |value: f32| f16::from_f32(value).to_f32();

    match format {
        TextureFormat::Rgba32Float => texel,

        TextureFormat::Rgba16Float => {
            vec4(half(texel.x), half(texel.y), half(texel.z), half(texel.w))
        }

        TextureFormat::R16Float => vec4(half(texel.x), 0.0, 0.0, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use glam::uvec2;

    use super::*;
    use crate::gpu::Image;

    fn texture(format: TextureFormat) -> CpuTexture {
        CpuTexture::new(TextureDescriptor {
            label: "test".into(),
            size: uvec2(3, 2),
            format,
            usage: wgpu::TextureUsages::STORAGE_BINDING,
        })
    }

    #[test]
    fn new() {
        let target = texture(TextureFormat::Rgba32Float);

        assert_eq!(6, target.texels().len());
        assert!(target.texels().iter().all(|texel| *texel == Vec4::ZERO));
    }

    #[test]
    fn quantization() {
        let value = vec4(0.1, 0.2, 0.3, 0.4);

        // Case 1: Full-precision floats are kept as they are

        let mut target = texture(TextureFormat::Rgba32Float);

        target.write(uvec2(2, 1), value);

        assert_eq!(value, target.read(uvec2(2, 1)));

        // ---
        // Case 2: Half-precision floats lose some precision

        let mut target = texture(TextureFormat::Rgba16Float);

        target.write(uvec2(2, 1), value);

        let texel = target.read(uvec2(2, 1));

        assert_ne!(value, texel);
        assert!((value - texel).abs().max_element() < 1e-3);

        // ---
        // Case 3: Single-channel formats drop the other channels

        let mut target = texture(TextureFormat::R16Float);

        target.fill(vec4(256.0, 1.0, 1.0, 1.0));

        assert_eq!(vec4(256.0, 0.0, 0.0, 0.0), target.read(uvec2(0, 0)));

        // Counts up to 2048 are represented exactly
        target.write(uvec2(1, 1), Vec4::splat(2047.0));

        assert_eq!(2047.0, target.read(uvec2(1, 1)).x);
    }

    #[test]
    fn to_image() {
        let mut target = texture(TextureFormat::Rgba32Float);

        target.write(uvec2(1, 0), vec4(1.0, 2.0, 3.0, 4.0));

        let image = target.to_image();

        assert_eq!((3, 2), image.dimensions());
        assert_eq!(&Rgba([1.0, 2.0, 3.0, 4.0]), image.get_pixel(1, 0));
        assert_eq!(&Rgba([0.0, 0.0, 0.0, 0.0]), image.get_pixel(0, 1));
    }
}
