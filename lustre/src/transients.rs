use glam::UVec2;
use log::debug;

use crate::{
    Backend, Result, Texture, TextureBuilder, TextureFormat, TextureHandle,
};

/// Kind of a buffer that lives only for the duration of a single frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransientRole {
    /// Raw ray-traced radiance; stays intact throughout the frame, so that
    /// the denoiser can blend its output back toward it
    Color,
    Normal,
    BaseColor,

    /// Sample count produced by the reprojection
    Count,

    /// First half of the denoiser's ping-pong pair
    Denoised,

    /// Second half of the denoiser's ping-pong pair
    Filtered,

    /// Output of the reprojection; what gets presented
    Temporal,
}

/// Buffers shared by all cameras rendered by an engine.
#[derive(Debug)]
pub struct TransientBuffers {
    pub color: Texture,
    pub normal: Texture,
    pub base_color: Texture,
    pub count: Texture,
    pub denoised: Texture,
    pub filtered: Texture,
    pub temporal: Texture,
}

impl TransientBuffers {
    fn new<B>(backend: &mut B, size: UVec2) -> Result<Self>
    where
        B: Backend + ?Sized,
    {
        debug!("Initializing transient buffers; size={size:?}");

        let [color, normal, base_color, count, denoised, filtered, temporal] =
            TextureBuilder::build_all(
                [
                    Texture::builder("color")
                        .with_format(TextureFormat::Rgba32Float),
                    Texture::builder("normal")
                        .with_format(TextureFormat::Rgba16Float),
                    Texture::builder("base_color")
                        .with_format(TextureFormat::Rgba16Float),
                    Texture::builder("count")
                        .with_format(TextureFormat::R16Float),
                    Texture::builder("denoised")
                        .with_format(TextureFormat::Rgba32Float),
                    Texture::builder("filtered")
                        .with_format(TextureFormat::Rgba32Float),
                    Texture::builder("temporal")
                        .with_format(TextureFormat::Rgba32Float),
                ]
                .map(|builder| builder.with_size(size)),
                backend,
            )?;

        Ok(Self {
            color,
            normal,
            base_color,
            count,
            denoised,
            filtered,
            temporal,
        })
    }

    pub fn size(&self) -> UVec2 {
        self.color.size()
    }

    pub fn get(&self, role: TransientRole) -> &Texture {
        match role {
            TransientRole::Color => &self.color,
            TransientRole::Normal => &self.normal,
            TransientRole::BaseColor => &self.base_color,
            TransientRole::Count => &self.count,
            TransientRole::Denoised => &self.denoised,
            TransientRole::Filtered => &self.filtered,
            TransientRole::Temporal => &self.temporal,
        }
    }

    fn release<B>(self, backend: &mut B)
    where
        B: Backend + ?Sized,
    {
        for texture in [
            self.color,
            self.normal,
            self.base_color,
            self.count,
            self.denoised,
            self.filtered,
            self.temporal,
        ] {
            texture.release(backend);
        }
    }
}

/// Pool of [`TransientBuffers`], sized after the camera that's being
/// rendered.
#[derive(Debug, Default)]
pub struct Transients {
    buffers: Option<TransientBuffers>,
}

impl Transients {
    /// Returns buffers of given size, reallocating them if the size changed
    /// since the last call.
    pub fn ensure<B>(
        &mut self,
        backend: &mut B,
        size: UVec2,
    ) -> Result<&TransientBuffers>
    where
        B: Backend + ?Sized,
    {
        let buffers = match self.buffers.take() {
            Some(buffers) if buffers.size() == size => buffers,

            buffers => {
                if let Some(buffers) = buffers {
                    debug!(
                        "Transient buffers got resized: {:?} -> {:?}",
                        buffers.size(),
                        size
                    );

                    buffers.release(backend);
                }

                TransientBuffers::new(backend, size)?
            }
        };

        Ok(self.buffers.insert(buffers))
    }

    pub fn buffers(&self) -> Option<&TransientBuffers> {
        self.buffers.as_ref()
    }

    pub fn get(&self, role: TransientRole) -> Option<TextureHandle> {
        self.buffers
            .as_ref()
            .map(|buffers| buffers.get(role).handle())
    }

    pub fn size(&self) -> Option<UVec2> {
        self.buffers.as_ref().map(|buffers| buffers.size())
    }

    pub fn release<B>(&mut self, backend: &mut B)
    where
        B: Backend + ?Sized,
    {
        if let Some(buffers) = self.buffers.take() {
            buffers.release(backend);
        }
    }
}
