use bytemuck::{Pod, Zeroable};

/// Index of a progressively accumulated frame.
///
/// Handed to the ray tracing dispatch so that each frame draws a different set
/// of samples, while staying reproducible across runs.
#[repr(C)]
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Pod,
    Zeroable,
)]
pub struct Frame(u32);

impl Frame {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next() {
        assert_eq!(Frame::new(1), Frame::default().next());
        assert_eq!(Frame::new(u32::MAX), Frame::new(u32::MAX).next());
    }
}
