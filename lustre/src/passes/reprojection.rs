use crate::{
    gpu, Command, Commands, HistoryBindings, Settings, TextureHandle,
    TransientBuffers,
};

#[derive(Debug)]
pub struct ReprojectionPass {
    params: gpu::ReprojectionPassParams,
}

impl ReprojectionPass {
    pub fn new(settings: &Settings) -> Self {
        Self {
            params: settings.reprojection.params(),
        }
    }

    pub fn params(&self) -> &gpu::ReprojectionPassParams {
        &self.params
    }

    /// Blends `input` (the denoised color) with the history into the
    /// temporal and count buffers.
    pub fn run(
        &self,
        input: TextureHandle,
        buffers: &TransientBuffers,
        history: &HistoryBindings,
        commands: &mut Commands,
    ) {
        commands.push(Command::Reproject {
            params: self.params,
            color: input,
            normal: buffers.normal.handle(),
            base_color: buffers.base_color.handle(),
            history: *history,
            output_color: buffers.temporal.handle(),
            output_count: buffers.count.handle(),
        });
    }
}
