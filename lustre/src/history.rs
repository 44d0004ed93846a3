use fxhash::{FxHashMap, FxHashSet};
use glam::UVec2;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{
    Backend, BufferHandle, CameraHandle, HistoryBindings, Result,
    StorageBuffer, Texture, TextureFormat, TextureHandle,
};

/// Kind of a per-camera buffer that survives across frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HistoryRole {
    Color,
    Normal,
    BaseColor,
    Count,
}

impl HistoryRole {
    pub const ALL: [Self; 4] = [
        HistoryRole::Color,
        HistoryRole::Normal,
        HistoryRole::BaseColor,
        HistoryRole::Count,
    ];

    pub fn format(self) -> TextureFormat {
        match self {
            HistoryRole::Color => TextureFormat::Rgba32Float,
            HistoryRole::Normal | HistoryRole::BaseColor => {
                TextureFormat::Rgba16Float
            }
            HistoryRole::Count => TextureFormat::R16Float,
        }
    }

    fn label(self) -> &'static str {
        match self {
            HistoryRole::Color => "history_color",
            HistoryRole::Normal => "history_normal",
            HistoryRole::BaseColor => "history_base_color",
            HistoryRole::Count => "history_count",
        }
    }
}

/// What [`HistoryStore::ensure()`] hands to a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnsuredHistory {
    pub bindings: HistoryBindings,
    pub prng_states: BufferHandle,

    /// Whether the history holds no accumulated samples, i.e. whether no
    /// frame has been committed since the buffers got (re)allocated
    pub is_fresh: bool,
}

/// Per-camera buffers that persist across frames.
///
/// Buffers are allocated lazily, on the first frame a camera renders, and are
/// reallocated whenever the camera's resolution changes; reallocating resets
/// the history, since newly allocated buffers are zeroed.
#[derive(Debug, Default)]
pub struct HistoryStore {
    textures: FxHashMap<(CameraHandle, HistoryRole), Texture>,
    prng_states: FxHashMap<CameraHandle, StorageBuffer>,
    committed: FxHashSet<CameraHandle>,
}

impl HistoryStore {
    /// Returns the buffer for given role, allocating it if it doesn't exist
    /// yet or if its size doesn't match `size`.
    pub fn get_or_create<B>(
        &mut self,
        backend: &mut B,
        camera: CameraHandle,
        role: HistoryRole,
        size: UVec2,
    ) -> Result<TextureHandle>
    where
        B: Backend + ?Sized,
    {
        self.acquire(backend, camera, role, size)
            .map(|(handle, _)| handle)
    }

    /// Makes sure all of camera's history buffers exist and match `size`.
    ///
    /// If any of the allocations fails, all of camera's buffers get released,
    /// so that the store never keeps a partial history around.
    pub fn ensure<B>(
        &mut self,
        backend: &mut B,
        camera: CameraHandle,
        size: UVec2,
    ) -> Result<EnsuredHistory>
    where
        B: Backend + ?Sized,
    {
        match self.try_ensure(backend, camera, size) {
            Ok(history) => Ok(history),

            Err(err) => {
                self.remove(backend, camera);
                Err(err)
            }
        }
    }

    fn try_ensure<B>(
        &mut self,
        backend: &mut B,
        camera: CameraHandle,
        size: UVec2,
    ) -> Result<EnsuredHistory>
    where
        B: Backend + ?Sized,
    {
        let mut is_reallocated = false;
        let mut handles = [TextureHandle::new(0); 4];

        for (role, handle) in HistoryRole::ALL.into_iter().zip(&mut handles) {
            let (role_handle, created) =
                self.acquire(backend, camera, role, size)?;

            *handle = role_handle;
            is_reallocated |= created;
        }

        let [color, normal, base_color, count] = handles;

        let prng_states =
            self.acquire_prng_states(backend, camera, size, is_reallocated)?;

        if is_reallocated {
            self.committed.remove(&camera);
        }

        Ok(EnsuredHistory {
            bindings: HistoryBindings {
                color,
                normal,
                base_color,
                count,
            },
            prng_states,
            is_fresh: !self.committed.contains(&camera),
        })
    }

    fn acquire<B>(
        &mut self,
        backend: &mut B,
        camera: CameraHandle,
        role: HistoryRole,
        size: UVec2,
    ) -> Result<(TextureHandle, bool)>
    where
        B: Backend + ?Sized,
    {
        let key = (camera, role);

        if let Some(texture) = self.textures.get(&key) {
            if texture.size() == size {
                return Ok((texture.handle(), false));
            }

            debug!(
                "History buffer `{}` of {:?} got resized: {:?} -> {:?}",
                texture.label(),
                camera,
                texture.size(),
                size
            );

            if let Some(texture) = self.textures.remove(&key) {
                texture.release(backend);
            }
        }

        let texture = Texture::builder(format!(
            "{}_{}",
            role.label(),
            camera.id()
        ))
        .with_size(size)
        .with_format(role.format())
        .build(backend)?;

        let handle = texture.handle();

        self.textures.insert(key, texture);

        Ok((handle, true))
    }

    fn acquire_prng_states<B>(
        &mut self,
        backend: &mut B,
        camera: CameraHandle,
        size: UVec2,
        is_reallocated: bool,
    ) -> Result<BufferHandle>
    where
        B: Backend + ?Sized,
    {
        let len = (size.x as usize) * (size.y as usize);

        // States follow the textures: whenever any of them gets reallocated,
        // so do the states (even if their length would match)
        if let Some(buffer) = self.prng_states.get(&camera) {
            if !is_reallocated && buffer.len() == len * 4 {
                return Ok(buffer.handle());
            }
        }

        if let Some(buffer) = self.prng_states.remove(&camera) {
            buffer.release(backend);
        }

        let mut rng = StdRng::seed_from_u64(camera.id() as u64);
        let states: Vec<u32> = (0..len).map(|_| rng.gen()).collect();

        let buffer = StorageBuffer::new(
            backend,
            format!("prng_states_{}", camera.id()),
            &states,
        )?;

        let handle = buffer.handle();

        self.prng_states.insert(camera, buffer);

        Ok(handle)
    }

    /// Marks camera's history as holding accumulated samples; called once a
    /// frame has been committed into it.
    pub fn mark_committed(&mut self, camera: CameraHandle) {
        if self.contains(camera) {
            self.committed.insert(camera);
        }
    }

    pub fn get(
        &self,
        camera: CameraHandle,
        role: HistoryRole,
    ) -> Option<&Texture> {
        self.textures.get(&(camera, role))
    }

    pub fn prng_states(&self, camera: CameraHandle) -> Option<&StorageBuffer> {
        self.prng_states.get(&camera)
    }

    pub fn contains(&self, camera: CameraHandle) -> bool {
        HistoryRole::ALL
            .into_iter()
            .any(|role| self.textures.contains_key(&(camera, role)))
            || self.prng_states.contains_key(&camera)
    }

    /// Releases all buffers of given camera.
    pub fn remove<B>(&mut self, backend: &mut B, camera: CameraHandle)
    where
        B: Backend + ?Sized,
    {
        for role in HistoryRole::ALL {
            if let Some(texture) = self.textures.remove(&(camera, role)) {
                texture.release(backend);
            }
        }

        if let Some(buffer) = self.prng_states.remove(&camera) {
            buffer.release(backend);
        }

        self.committed.remove(&camera);
    }

    pub fn release_all<B>(&mut self, backend: &mut B)
    where
        B: Backend + ?Sized,
    {
        for (_, texture) in self.textures.drain() {
            texture.release(backend);
        }

        for (_, buffer) in self.prng_states.drain() {
            buffer.release(backend);
        }

        self.committed.clear();
    }

    /// Number of live history textures, across all cameras.
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty() && self.prng_states.is_empty()
    }
}
