mod cpu;
mod wgpu_backend;

pub use self::cpu::*;
pub use self::wgpu_backend::*;
