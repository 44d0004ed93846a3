use glam::UVec2;

use crate::{gpu, CpuTexture};

/// Everything the ray tracing dispatch gets to see and write.
#[derive(Debug)]
pub struct TraceTargets<'a> {
    pub frame: gpu::Frame,
    pub lens: gpu::Lens,
    pub size: UVec2,

    /// One state per pixel, row-major
    pub prng_states: &'a mut [u32],

    pub color: &'a mut CpuTexture,
    pub normal: &'a mut CpuTexture,
    pub base_color: &'a mut CpuTexture,
}

/// Ray tracing dispatch executed by [`crate::CpuBackend`].
///
/// Implemented for closures, so that the simplest tracer is just a function
/// filling the targets.
pub trait CpuTracer {
    fn trace(&mut self, targets: TraceTargets<'_>);
}

impl<F> CpuTracer for F
where
    F: FnMut(TraceTargets<'_>),
{
    fn trace(&mut self, targets: TraceTargets<'_>) {
        self(targets)
    }
}
