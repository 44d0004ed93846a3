//! Common structs and per-pixel algorithms shared by Lustre's renderer and its
//! backends.
//!
//! Everything in here is a plain function of texels, so the very same code
//! drives the CPU backend and acts as the reference the WGSL kernels are
//! checked against.

#![allow(clippy::manual_range_contains)]

mod denoiser;
mod frame;
mod image;
mod lens;
mod passes;
mod reprojector;
mod surface;

pub use self::denoiser::*;
pub use self::frame::*;
pub use self::image::*;
pub use self::lens::*;
pub use self::passes::*;
pub use self::reprojector::*;
pub use self::surface::*;
