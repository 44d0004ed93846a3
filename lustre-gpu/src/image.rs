use glam::{IVec2, UVec2, Vec4};

/// Read-only two-dimensional array of texels.
pub trait Image {
    fn size(&self) -> UVec2;

    fn read(&self, pos: UVec2) -> Vec4;

    /// Returns whether given point lays inside the image.
    fn contains(&self, pos: IVec2) -> bool {
        let size = self.size().as_ivec2();

        pos.x >= 0 && pos.y >= 0 && pos.x < size.x && pos.y < size.y
    }
}

/// Borrowed row-major image.
#[derive(Clone, Copy, Debug)]
pub struct ImageRef<'a> {
    size: UVec2,
    texels: &'a [Vec4],
}

impl<'a> ImageRef<'a> {
    pub fn new(size: UVec2, texels: &'a [Vec4]) -> Self {
        assert_eq!((size.x * size.y) as usize, texels.len());

        Self { size, texels }
    }
}

impl Image for ImageRef<'_> {
    fn size(&self) -> UVec2 {
        self.size
    }

    fn read(&self, pos: UVec2) -> Vec4 {
        self.texels[(pos.y * self.size.x + pos.x) as usize]
    }
}

impl<T> Image for &T
where
    T: Image + ?Sized,
{
    fn size(&self) -> UVec2 {
        T::size(self)
    }

    fn read(&self, pos: UVec2) -> Vec4 {
        T::read(self, pos)
    }
}

#[cfg(test)]
mod tests {
    use glam::{ivec2, uvec2, vec4};

    use super::*;

    #[test]
    fn read() {
        let texels = [
            vec4(0.0, 0.0, 0.0, 0.0),
            vec4(1.0, 0.0, 0.0, 0.0),
            vec4(2.0, 0.0, 0.0, 0.0),
            vec4(3.0, 0.0, 0.0, 0.0),
            vec4(4.0, 0.0, 0.0, 0.0),
            vec4(5.0, 0.0, 0.0, 0.0),
        ];

        let target = ImageRef::new(uvec2(3, 2), &texels);

        assert_eq!(1.0, target.read(uvec2(1, 0)).x);
        assert_eq!(5.0, target.read(uvec2(2, 1)).x);
    }

    #[test]
    fn contains() {
        let texels = [Vec4::ZERO; 6];
        let target = ImageRef::new(uvec2(3, 2), &texels);

        assert!(target.contains(ivec2(0, 0)));
        assert!(target.contains(ivec2(2, 1)));
        assert!(!target.contains(ivec2(-1, 0)));
        assert!(!target.contains(ivec2(3, 0)));
        assert!(!target.contains(ivec2(0, 2)));
    }
}
