use crate::{Command, Commands, HistoryBindings, Settings, TransientBuffers};

/// Presents the frame and commits it into the history.
#[derive(Debug)]
pub struct PresentingPass;

impl PresentingPass {
    pub fn new(_: &Settings) -> Self {
        Self
    }

    pub fn run(
        &self,
        buffers: &TransientBuffers,
        history: &HistoryBindings,
        commands: &mut Commands,
    ) {
        commands.push(Command::Present {
            src: buffers.temporal.handle(),
        });

        for (src, dst) in [
            (&buffers.temporal, history.color),
            (&buffers.normal, history.normal),
            (&buffers.count, history.count),
            (&buffers.base_color, history.base_color),
        ] {
            commands.push(Command::Copy {
                src: src.handle(),
                dst,
            });
        }
    }

    /// Re-presents what's been accumulated so far, without touching the
    /// history.
    pub fn run_converged(
        &self,
        history: &HistoryBindings,
        commands: &mut Commands,
    ) {
        commands.push(Command::Present { src: history.color });
    }
}
