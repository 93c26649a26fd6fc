//! Reading segmented output back.

use std::path::{Path, PathBuf};

use crate::archive::{Archive, Array};
use crate::error::{ArchiveError, OutputError};
use crate::segmented::existing_parts;

/// All parts of one segmented output, decoded.
///
/// Parts are held in part-number order. Lookups search every part, so
/// callers never need to know where a rollover happened.
#[derive(Debug)]
pub struct OutputReader {
    parts: Vec<(u32, PathBuf, Archive)>,
}

impl OutputReader {
    /// Decode every `<dir>/<prefix>_part<N>.<ext>`.
    pub fn open(dir: impl AsRef<Path>, prefix: &str, extension: &str) -> Result<Self, OutputError> {
        let dir = dir.as_ref();
        let found = existing_parts(dir, prefix, extension)?;
        if found.is_empty() {
            return Err(OutputError::NoParts {
                dir: dir.to_path_buf(),
                prefix: prefix.to_string(),
            });
        }
        let parts = found
            .into_iter()
            .map(|(n, path)| {
                let archive = Archive::read_file(&path)?;
                Ok((n, path, archive))
            })
            .collect::<Result<Vec<_>, ArchiveError>>()?;
        Ok(Self { parts })
    }

    /// Number of parts.
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Decoded parts, in order.
    pub fn parts(&self) -> impl Iterator<Item = &Archive> {
        self.parts.iter().map(|(_, _, a)| a)
    }

    /// Part files, in order.
    pub fn part_paths(&self) -> impl Iterator<Item = &Path> {
        self.parts.iter().map(|(_, p, _)| p.as_path())
    }

    /// The array written for output `name` at `iteration`.
    pub fn read(&self, name: &str, iteration: u64) -> Result<&Array, OutputError> {
        let path = format!("timeseries/{name}/{iteration}");
        self.parts
            .iter()
            .find(|(_, _, a)| a.contains(&path))
            .map(|(_, _, a)| a.array(&path))
            .unwrap_or(Err(ArchiveError::MissingKey { path }))
            .map_err(OutputError::from)
    }

    /// Iterations at which output `name` was written, ascending.
    pub fn iterations(&self, name: &str) -> Vec<u64> {
        let group = format!("timeseries/{name}");
        let mut iterations: Vec<u64> = self
            .parts()
            .filter_map(|a| a.group(&group))
            .flat_map(|g| g.keys().filter_map(|k| k.parse().ok()).collect::<Vec<_>>())
            .collect();
        iterations.sort_unstable();
        iterations.dedup();
        iterations
    }

    /// Model time recorded for `iteration`.
    pub fn time(&self, iteration: u64) -> Option<f64> {
        let path = format!("timeseries/t/{iteration}");
        self.parts().find_map(|a| a.root().f64(&path).ok())
    }
}
