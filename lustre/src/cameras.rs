use fxhash::FxHashMap;

use crate::{Camera, CameraHandle, Error, Result};

#[derive(Debug, Default)]
pub struct Cameras {
    cameras: FxHashMap<CameraHandle, Camera>,
    next_id: usize,
}

impl Cameras {
    pub fn add(&mut self, camera: Camera) -> CameraHandle {
        let handle = CameraHandle::new(self.next_id);

        self.cameras.insert(handle, camera);
        self.next_id += 1;

        handle
    }

    pub fn get(&self, handle: CameraHandle) -> Result<&Camera> {
        self.cameras.get(&handle).ok_or(Error::UnknownCamera(handle))
    }

    pub fn get_mut(&mut self, handle: CameraHandle) -> Result<&mut Camera> {
        self.cameras
            .get_mut(&handle)
            .ok_or(Error::UnknownCamera(handle))
    }

    pub fn remove(&mut self, handle: CameraHandle) -> Result<Camera> {
        self.cameras
            .remove(&handle)
            .ok_or(Error::UnknownCamera(handle))
    }

    pub fn handles(&self) -> impl Iterator<Item = CameraHandle> + '_ {
        self.cameras.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use glam::uvec2;

    use super::*;

    #[test]
    fn lifecycle() {
        let mut target = Cameras::default();

        let a = target.add(Camera {
            viewport: uvec2(8, 8),
            ..Default::default()
        });

        let b = target.add(Camera::default());

        assert_ne!(a, b);
        assert_eq!(2, target.len());
        assert_eq!(uvec2(8, 8), target.get(a).unwrap().viewport);

        target.get_mut(b).unwrap().viewport = uvec2(4, 4);

        assert_eq!(uvec2(4, 4), target.remove(b).unwrap().viewport);
        assert!(matches!(target.get(b), Err(Error::UnknownCamera(_))));
        assert!(matches!(target.remove(b), Err(Error::UnknownCamera(_))));

        // Handles are never reused
        let c = target.add(Camera::default());

        assert_ne!(b, c);
        assert_eq!(2, target.len());
    }
}
