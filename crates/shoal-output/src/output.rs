//! The closed set of output writers.

use shoal_core::Trigger;

use crate::checkpoint::{Checkpointable, Checkpointer};
use crate::error::OutputError;
use crate::segmented::SegmentedWriter;

/// One scheduled output writer.
pub enum OutputWriter {
    /// Field snapshots split across part files.
    Segmented(SegmentedWriter),
    /// Resumable checkpoints.
    Checkpoint(Checkpointer),
}

impl OutputWriter {
    /// Short kind name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Segmented(_) => "segmented",
            Self::Checkpoint(_) => "checkpoint",
        }
    }

    /// This writer's schedule.
    pub fn trigger_mut(&mut self) -> &mut Trigger {
        match self {
            Self::Segmented(w) => w.trigger_mut(),
            Self::Checkpoint(c) => c.trigger_mut(),
        }
    }

    /// Write now, ignoring the schedule. Returns the bytes written.
    pub fn write(&mut self, state: &dyn Checkpointable) -> Result<u64, OutputError> {
        match self {
            Self::Segmented(w) => w.write(state),
            Self::Checkpoint(c) => c.write(state),
        }
    }

    /// Write if the trigger fires. Returns the bytes written, if any.
    pub fn run_if_scheduled(
        &mut self,
        state: &dyn Checkpointable,
    ) -> Result<Option<u64>, OutputError> {
        match self {
            Self::Segmented(w) => w.run_if_scheduled(state),
            Self::Checkpoint(c) => c.run_if_scheduled(state),
        }
    }
}

impl From<SegmentedWriter> for OutputWriter {
    fn from(w: SegmentedWriter) -> Self {
        Self::Segmented(w)
    }
}

impl From<Checkpointer> for OutputWriter {
    fn from(c: Checkpointer) -> Self {
        Self::Checkpoint(c)
    }
}
