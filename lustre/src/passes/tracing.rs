use crate::{
    gpu, BufferHandle, Command, Commands, Lens, Settings, TraceRequest,
    TransientBuffers,
};

#[derive(Debug)]
pub struct TracingPass;

impl TracingPass {
    pub fn new(_: &Settings) -> Self {
        Self
    }

    pub fn run(
        &self,
        frame: gpu::Frame,
        lens: &Lens,
        prng_states: BufferHandle,
        buffers: &TransientBuffers,
        commands: &mut Commands,
    ) {
        commands.push(Command::Trace(TraceRequest {
            frame,
            lens: lens.serialize(),
            size: buffers.size(),
            prng_states,
            color: buffers.color.handle(),
            normal: buffers.normal.handle(),
            base_color: buffers.base_color.handle(),
        }));
    }
}
