use crate::gpu;

/// Progressive frame index, shared by all cameras of an engine.
///
/// The index is handed to the ray tracing dispatch as a seed, so it only
/// moves forward when a game camera renders; rendering previews in between
/// doesn't change the sequence of samples the game camera sees.
#[derive(Clone, Debug, Default)]
pub struct FrameSequencer {
    frame: gpu::Frame,
    cap: Option<u32>,
}

impl FrameSequencer {
    pub fn new(cap: Option<u32>) -> Self {
        Self {
            frame: Default::default(),
            cap,
        }
    }

    pub fn current(&self) -> gpu::Frame {
        self.frame
    }

    pub fn advance(&mut self) {
        self.frame = self.frame.next();
    }

    /// Returns whether the progressive cap has been reached, i.e. whether
    /// there's no point in tracing more samples.
    pub fn is_converged(&self) -> bool {
        self.cap.map_or(false, |cap| self.frame.get() >= cap)
    }

    pub fn cap(&self) -> Option<u32> {
        self.cap
    }

    pub fn set_cap(&mut self, cap: Option<u32>) {
        self.cap = cap;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance() {
        let mut target = FrameSequencer::default();

        assert_eq!(0, target.current().get());

        target.advance();
        target.advance();

        assert_eq!(2, target.current().get());
        assert!(!target.is_converged());
    }

    #[test]
    fn cap() {
        let mut target = FrameSequencer::new(Some(2));

        assert!(!target.is_converged());

        target.advance();

        assert!(!target.is_converged());

        target.advance();

        assert!(target.is_converged());

        target.set_cap(Some(3));

        assert!(!target.is_converged());

        target.set_cap(None);

        assert!(!target.is_converged());
    }
}
