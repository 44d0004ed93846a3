use glam::{UVec2, Vec3, Vec4, Vec4Swizzles};

use crate::Image;

/// Geometric and material description of what's visible through a pixel, as
/// reported by the ray tracing dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Surface {
    pub normal: Vec3,
    pub base_color: Vec3,
}

impl Surface {
    pub fn new(normal: Vec3, base_color: Vec3) -> Self {
        Self { normal, base_color }
    }

    pub fn deserialize(normal: Vec4, base_color: Vec4) -> Self {
        Self {
            normal: normal.xyz(),
            base_color: base_color.xyz(),
        }
    }

    /// Returns the cosine between both surfaces' normals.
    ///
    /// Zero-length normals (e.g. pixels that haven't been written to yet)
    /// yield `0.0`.
    pub fn normal_similarity(&self, other: &Self) -> f32 {
        self.normal.dot(other.normal)
    }

    pub fn base_color_distance(&self, other: &Self) -> f32 {
        self.base_color.distance(other.base_color)
    }
}

/// Pair of images describing the visible surfaces; see: [`Surface`].
#[derive(Clone, Copy, Debug)]
pub struct SurfaceMap<I> {
    pub normals: I,
    pub base_colors: I,
}

impl<I> SurfaceMap<I>
where
    I: Image,
{
    pub fn new(normals: I, base_colors: I) -> Self {
        Self {
            normals,
            base_colors,
        }
    }

    pub fn get(&self, pos: UVec2) -> Surface {
        Surface::deserialize(self.normals.read(pos), self.base_colors.read(pos))
    }
}
