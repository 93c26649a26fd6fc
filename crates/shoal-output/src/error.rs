//! Error types for archives, writers, and checkpoints.

use std::fmt;
use std::io;
use std::path::PathBuf;

use shoal_core::ScheduleError;
use shoal_field::FieldError;
use shoal_model::ModelError;

/// Errors reading or writing the binary archive format.
#[derive(Debug)]
pub enum ArchiveError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// The file does not start with the expected `b"SHOL"` magic bytes.
    InvalidMagic,
    /// The format version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the file.
        found: u8,
    },
    /// A record could not be decoded (truncated or corrupt data).
    MalformedRecord {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A value type tag is not recognized.
    UnknownValueTag {
        /// The unrecognized tag.
        tag: u8,
    },
    /// No value is stored at the requested path.
    MissingKey {
        /// The requested path.
        path: String,
    },
    /// The value at the path has a different type than requested.
    TypeMismatch {
        /// The requested path.
        path: String,
        /// The requested type.
        expected: &'static str,
    },
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"SHOL\")"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported format version {found}")
            }
            Self::MalformedRecord { detail } => write!(f, "malformed record: {detail}"),
            Self::UnknownValueTag { tag } => write!(f, "unknown value tag {tag}"),
            Self::MissingKey { path } => write!(f, "no value at '{path}'"),
            Self::TypeMismatch { path, expected } => {
                write!(f, "value at '{path}' is not {expected}")
            }
        }
    }
}

impl std::error::Error for ArchiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ArchiveError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Errors from output writers and the output reader.
#[derive(Debug)]
pub enum OutputError {
    /// A filesystem operation failed.
    Io(io::Error),
    /// The archive layer failed.
    Archive(ArchiveError),
    /// A target file already exists and overwriting was not requested.
    PathExists {
        /// The existing file.
        path: PathBuf,
    },
    /// A requested field is not readable from the state.
    Field(FieldError),
    /// A schedule could not be built.
    Schedule(ScheduleError),
    /// A writer was configured inconsistently.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
    /// No parts were found for a prefix.
    NoParts {
        /// Directory searched.
        dir: PathBuf,
        /// Prefix searched for.
        prefix: String,
    },
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Archive(e) => write!(f, "archive: {e}"),
            Self::PathExists { path } => write!(
                f,
                "{} already exists (set force to overwrite)",
                path.display()
            ),
            Self::Field(e) => write!(f, "{e}"),
            Self::Schedule(e) => write!(f, "schedule: {e}"),
            Self::InvalidConfig { reason } => write!(f, "invalid output writer: {reason}"),
            Self::NoParts { dir, prefix } => {
                write!(f, "no '{prefix}' output parts in {}", dir.display())
            }
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Archive(e) => Some(e),
            Self::Field(e) => Some(e),
            Self::Schedule(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for OutputError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ArchiveError> for OutputError {
    fn from(e: ArchiveError) -> Self {
        Self::Archive(e)
    }
}

impl From<FieldError> for OutputError {
    fn from(e: FieldError) -> Self {
        Self::Field(e)
    }
}

impl From<ScheduleError> for OutputError {
    fn from(e: ScheduleError) -> Self {
        Self::Schedule(e)
    }
}

/// Errors restoring a model from a checkpoint.
#[derive(Debug)]
pub enum CheckpointError {
    /// The checkpoint file could not be read or decoded.
    Archive(ArchiveError),
    /// The stored field data hash does not match the data.
    ChecksumMismatch {
        /// Hash recorded in the file.
        stored: u64,
        /// Hash of the data actually read.
        computed: u64,
    },
    /// A stored value is out of range or inconsistent.
    InvalidRecord {
        /// Description of the problem.
        detail: String,
    },
    /// The model could not be rebuilt from the record.
    Model(ModelError),
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archive(e) => write!(f, "checkpoint archive: {e}"),
            Self::ChecksumMismatch { stored, computed } => write!(
                f,
                "checkpoint checksum mismatch: stored={stored:#018x}, computed={computed:#018x}"
            ),
            Self::InvalidRecord { detail } => write!(f, "invalid checkpoint: {detail}"),
            Self::Model(e) => write!(f, "checkpoint model: {e}"),
        }
    }
}

impl std::error::Error for CheckpointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Archive(e) => Some(e),
            Self::Model(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArchiveError> for CheckpointError {
    fn from(e: ArchiveError) -> Self {
        Self::Archive(e)
    }
}

impl From<io::Error> for CheckpointError {
    fn from(e: io::Error) -> Self {
        Self::Archive(ArchiveError::Io(e))
    }
}

impl From<ModelError> for CheckpointError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}
