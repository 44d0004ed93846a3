use glam::UVec2;

use crate::gpu;

/// Everything the ray tracing dispatch gets to see and write.
pub struct WgpuTraceTargets<'a> {
    pub device: &'a wgpu::Device,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub frame: gpu::Frame,
    pub lens: gpu::Lens,
    pub size: UVec2,

    /// `u32` per pixel, row-major
    pub prng_states: &'a wgpu::Buffer,

    /// `Rgba32Float`
    pub color: &'a wgpu::Texture,

    /// `Rgba16Float`
    pub normal: &'a wgpu::Texture,

    /// `Rgba16Float`
    pub base_color: &'a wgpu::Texture,
}

/// Ray tracing dispatch executed by [`crate::WgpuBackend`].
///
/// It's expected to record its work into the provided encoder, which then
/// gets submitted together with the rest of the frame.
pub trait WgpuTracer {
    fn trace(&mut self, targets: WgpuTraceTargets<'_>);
}

impl<F> WgpuTracer for F
where
    F: FnMut(WgpuTraceTargets<'_>),
{
    fn trace(&mut self, targets: WgpuTraceTargets<'_>) {
        self(targets)
    }
}
