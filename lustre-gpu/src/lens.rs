use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4, Vec4Swizzles};

/// Thin-lens camera, as consumed by the ray tracing dispatch.
///
/// Rays start on a disk of radius `half_aperture` around `origin` and converge
/// on the focus plane spanned by `left_bottom_corner`, `right`, `up` and
/// `size`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Lens {
    /// x, y, z - left-bottom corner of the focus plane (world-space)
    /// w - half of the aperture
    pub d0: Vec4,

    /// x, y, z - camera's right vector
    pub d1: Vec4,

    /// x, y, z - camera's up vector
    pub d2: Vec4,

    /// x, y - size of the focus plane
    pub d3: Vec4,

    /// x, y, z - camera's position (world-space)
    pub d4: Vec4,
}

impl Lens {
    pub fn left_bottom_corner(&self) -> Vec3 {
        self.d0.xyz()
    }

    pub fn origin(&self) -> Vec3 {
        self.d4.xyz()
    }

    pub fn half_aperture(&self) -> f32 {
        self.d0.w
    }

    pub fn right(&self) -> Vec3 {
        self.d1.xyz()
    }

    pub fn up(&self) -> Vec3 {
        self.d2.xyz()
    }

    pub fn size(&self) -> Vec2 {
        self.d3.xy()
    }

    /// Given normalized sensor coordinates (`0..1` on both axes, starting at
    /// the bottom-left corner), returns the matching point on the focus plane.
    pub fn focus_point(&self, uv: Vec2) -> Vec3 {
        let size = self.size();

        self.left_bottom_corner()
            + self.right() * (uv.x * size.x)
            + self.up() * (uv.y * size.y)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{vec2, vec3, vec4};

    use super::*;

    #[test]
    fn focus_point() {
        let target = Lens {
            d0: vec4(-2.0, -1.0, 5.0, 0.25),
            d1: vec4(1.0, 0.0, 0.0, 0.0),
            d2: vec4(0.0, 1.0, 0.0, 0.0),
            d3: vec4(4.0, 2.0, 0.0, 0.0),
            d4: vec4(0.0, 0.0, 10.0, 0.0),
        };

        assert_eq!(0.25, target.half_aperture());
        assert_eq!(vec3(0.0, 0.0, 10.0), target.origin());

        assert_relative_eq!(
            vec3(-2.0, -1.0, 5.0),
            target.focus_point(vec2(0.0, 0.0))
        );

        assert_relative_eq!(
            vec3(0.0, 0.0, 5.0),
            target.focus_point(vec2(0.5, 0.5))
        );

        assert_relative_eq!(
            vec3(2.0, 1.0, 5.0),
            target.focus_point(vec2(1.0, 1.0))
        );
    }
}
