use bytemuck::Pod;
use log::debug;

use crate::{Backend, BufferDescriptor, BufferHandle, Result};

/// Buffer allocated through a [`Backend`], filled with initial data.
#[derive(Debug, PartialEq, Eq)]
pub struct StorageBuffer {
    handle: BufferHandle,
    label: String,
    len: usize,
}

impl StorageBuffer {
    pub fn new<B, T>(
        backend: &mut B,
        label: impl AsRef<str>,
        contents: &[T],
    ) -> Result<Self>
    where
        B: Backend + ?Sized,
        T: Pod,
    {
        let label = format!("lustre_{}", label.as_ref());
        let contents: &[u8] = bytemuck::cast_slice(contents);

        debug!(
            "Allocating storage buffer `{label}`; size={}",
            contents.len()
        );

        let handle = backend.create_buffer(&BufferDescriptor {
            label: &label,
            contents,
        })?;

        Ok(Self {
            handle,
            label,
            len: contents.len(),
        })
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Size of the buffer, in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn release<B>(self, backend: &mut B)
    where
        B: Backend + ?Sized,
    {
        debug!("Releasing storage buffer `{}`", self.label);

        backend.release_buffer(self.handle);
    }
}
