use log::debug;

use crate::{
    gpu, Command, Commands, DoubleBuffered, Settings, TextureHandle,
    TransientBuffers,
};

/// Runs the à-trous passes, ping-ponging between the denoised and the
/// filtered buffer.
///
/// The first pass reads the raw color, which stays intact, so that the last
/// pass can blend its output back toward it.
#[derive(Debug)]
pub struct DenoisingPass {
    passes: Vec<gpu::DenoisingPassParams>,
}

impl DenoisingPass {
    pub fn new(settings: &Settings) -> Self {
        let passes: Vec<_> = (0..settings.denoising.passes)
            .map(|nth| settings.denoising.pass_params(nth))
            .collect();

        debug!(
            "Initializing denoising pass; strides={:?}",
            passes.iter().map(|pass| pass.stride).collect::<Vec<_>>()
        );

        Self { passes }
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Records the passes and returns the buffer holding their output.
    ///
    /// After an odd number of passes that's the denoised buffer, after an
    /// even one it's the filtered buffer. With no passes at all, the raw
    /// color gets forwarded as-is.
    pub fn run(
        &self,
        buffers: &TransientBuffers,
        commands: &mut Commands,
    ) -> TextureHandle {
        let original = buffers.color.handle();
        let mut input = original;

        let mut targets = DoubleBuffered::new(
            buffers.filtered.handle(),
            buffers.denoised.handle(),
        );

        for params in &self.passes {
            commands.push(Command::Denoise {
                params: *params,
                input,
                original,
                normal: buffers.normal.handle(),
                base_color: buffers.base_color.handle(),
                output: *targets.dst(),
            });

            targets.swap();
            input = *targets.src();
        }

        input
    }
}
