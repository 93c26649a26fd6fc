//! Persistence for Shoal simulations: archives, segmented output, and
//! checkpoints.
//!
//! # Architecture
//!
//! - [`Archive`], [`Group`], [`Value`]: a hierarchical key/value tree
//! - [`ArchiveWriter`]: appends records to a file, one write session per handle
//! - [`SegmentedWriter`]: scheduled field snapshots in size-bounded part files
//! - [`OutputReader`]: reads all parts of a segmented output as one
//! - [`Checkpointer`]: resumable snapshots of the full model state
//! - [`compare_states`]: trajectory comparison within a tolerance
//! - All I/O uses a custom binary codec (no serde dependency)
//!
//! # Format
//!
//! ```text
//! [MAGIC "SHOL"] [VERSION u8]
//! [Record 1] [Record 2] ... [Record N]
//! ```
//!
//! Each record is a `/`-separated path, a value tag, and a payload.
//! Files are append-only: a later record for the same path replaces an
//! earlier one when read.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod archive;
pub mod checkpoint;
pub mod codec;
pub mod compare;
pub mod error;
pub mod hash;
pub mod output;
pub mod reader;
pub mod sections;
pub mod segmented;
pub mod writer;

pub use archive::{Archive, Array, Group, Node, Value};
pub use checkpoint::{
    latest_checkpoint, Checkpointable, CheckpointRecord, Checkpointer, CheckpointerBuilder,
};
pub use compare::{compare_states, DivergenceReport, FieldDivergence};
pub use error::{ArchiveError, CheckpointError, OutputError};
pub use hash::fields_hash;
pub use output::OutputWriter;
pub use reader::OutputReader;
pub use sections::Section;
pub use segmented::{
    InitHook, OutputFn, SegmentedWriter, SegmentedWriterBuilder, DEFAULT_EXTENSION,
};
pub use writer::ArchiveWriter;

/// Magic bytes at the start of every archive file.
pub const MAGIC: [u8; 4] = *b"SHOL";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;
