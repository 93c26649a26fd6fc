//! Resumable checkpoints of the full model state.
//!
//! A checkpoint is an archive holding the model configuration, the
//! clock, every prognostic field and both tendency buffers, plus an
//! FNV-1a checksum over the clock, the configuration and all field bits. Restoring it yields a model that
//! continues the original trajectory with a multistep step.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use shoal_core::{Clock, Trigger};
use shoal_field::{Backend, Field, StateView};
use shoal_model::{Model, ModelConfig};

use crate::archive::{Archive, Array, Group};
use crate::error::{CheckpointError, OutputError};
use crate::hash::Fnv1a;
use crate::sections::{
    read_closure, read_clock, read_grid, read_tracers, write_closure, write_clock, write_grid,
    write_tracers,
};
use crate::segmented::DEFAULT_EXTENSION;
use crate::writer::ArchiveWriter;

/// State that can be captured into a checkpoint.
pub trait Checkpointable: StateView {
    /// Configuration needed to rebuild the model.
    fn model_config(&self) -> &ModelConfig;

    /// Accessor names of every field needed to resume bit-for-bit.
    fn checkpoint_fields(&self) -> Vec<&str>;
}

impl Checkpointable for Model {
    fn model_config(&self) -> &ModelConfig {
        self.config()
    }

    fn checkpoint_fields(&self) -> Vec<&str> {
        self.state_names().iter().map(String::as_str).collect()
    }
}

/// Everything stored in one checkpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckpointRecord {
    /// Model configuration.
    pub config: ModelConfig,
    /// Clock at capture.
    pub clock: Clock,
    /// Prognostic fields and tendency buffers, by accessor name.
    pub fields: IndexMap<String, Field>,
}

impl CheckpointRecord {
    /// Copy the state out of a live model.
    pub fn capture(state: &dyn Checkpointable) -> Result<Self, OutputError> {
        let fields = state
            .checkpoint_fields()
            .into_iter()
            .map(|name| Ok((name.to_string(), state.require_field(name)?.clone())))
            .collect::<Result<IndexMap<_, _>, OutputError>>()?;
        Ok(Self {
            config: state.model_config().clone(),
            clock: state.clock(),
            fields,
        })
    }

    /// FNV-1a hash of the clock, the configuration and every field in
    /// record order.
    pub fn checksum(&self) -> u64 {
        let mut hasher = Fnv1a::default();
        hasher.write_u64(self.clock.iteration);
        hasher.write_f64(self.clock.time);

        let config = &self.config;
        let grid = &config.grid;
        for a in 0..3 {
            hasher.write_u64(grid.size()[a] as u64);
            hasher.write_u64(grid.halo()[a] as u64);
            hasher.write_f64(grid.extent()[a]);
        }
        hasher.write_f64(config.closure.viscosity);
        hasher.write_f64(config.closure.diffusivity);
        hasher.write_f64(config.coriolis);
        hasher.write_f64(config.ab2_chi);
        hasher.write_u64(config.tracers.len() as u64);
        for tracer in &config.tracers {
            hasher.write_str(tracer);
        }
        hasher.write_str(config.backend.name());

        hasher.write_fields(self.fields.iter().map(|(n, f)| (n.as_str(), f)));
        hasher.finish()
    }

    /// Archive layout of this record.
    pub fn to_group(&self) -> Group {
        let mut root = Group::new();
        let config = &self.config;
        write_grid(&mut root, &config.grid);
        write_closure(&mut root, &config.closure);
        write_clock(&mut root, &self.clock);
        write_tracers(&mut root, config.tracers.iter().map(String::as_str).collect());
        root.insert("model/coriolis", config.coriolis);
        root.insert("model/ab2_chi", config.ab2_chi);
        root.insert("model/backend", config.backend.name());
        root.insert("checkpoint/field_count", self.fields.len() as u64);
        for (name, field) in &self.fields {
            root.insert(&format!("fields/{name}"), Array::from_field(field));
        }
        root.insert("checkpoint/checksum", self.checksum());
        root
    }

    /// Decode and verify a record.
    pub fn from_archive(archive: &Archive) -> Result<Self, CheckpointError> {
        let root = archive.root();
        let grid = read_grid(root)?;
        let backend_name = root.str("model/backend")?;
        let backend = Backend::from_name(backend_name).ok_or_else(|| {
            CheckpointError::InvalidRecord {
                detail: format!("unknown backend '{backend_name}'"),
            }
        })?;
        let config = ModelConfig {
            closure: read_closure(root)?,
            coriolis: root.f64("model/coriolis")?,
            ab2_chi: root.f64("model/ab2_chi")?,
            tracers: read_tracers(root)?,
            backend,
            grid,
        };
        let clock = read_clock(root)?;

        let expected_count = root.u64("checkpoint/field_count")?;
        let stored_fields = archive
            .group("fields")
            .ok_or_else(|| CheckpointError::InvalidRecord {
                detail: "no fields group".into(),
            })?;
        let mut fields = IndexMap::new();
        for name in stored_fields.keys() {
            let array = stored_fields.array(name)?;
            if array.shape.as_slice() != config.grid.total_size() {
                return Err(CheckpointError::InvalidRecord {
                    detail: format!(
                        "field '{name}' has shape {:?}, grid needs {:?}",
                        array.shape,
                        config.grid.total_size()
                    ),
                });
            }
            let field = Field::from_data(&config.grid, array.data.clone()).map_err(|e| {
                CheckpointError::InvalidRecord {
                    detail: format!("field '{name}': {e}"),
                }
            })?;
            fields.insert(name.to_string(), field);
        }
        if fields.len() as u64 != expected_count {
            return Err(CheckpointError::InvalidRecord {
                detail: format!(
                    "expected {expected_count} fields, found {}",
                    fields.len()
                ),
            });
        }

        let record = Self {
            config,
            clock,
            fields,
        };
        let stored = root.u64("checkpoint/checksum")?;
        let computed = record.checksum();
        if stored != computed {
            return Err(CheckpointError::ChecksumMismatch { stored, computed });
        }
        Ok(record)
    }

    /// Build a live model from this record.
    pub fn into_model(self) -> Result<Model, CheckpointError> {
        Ok(Model::from_parts(self.config, self.clock, self.fields)?)
    }
}

/// Builder for [`Checkpointer`].
pub struct CheckpointerBuilder {
    dir: PathBuf,
    prefix: String,
    extension: String,
    period: Option<u64>,
    force: bool,
}

impl CheckpointerBuilder {
    /// Checkpoint every `period` iterations.
    pub fn every(mut self, period: u64) -> Self {
        self.period = Some(period);
        self
    }

    /// File name prefix. Default: `checkpoint`.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// File extension, without the dot.
    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.extension = ext.into();
        self
    }

    /// Overwrite existing checkpoint files instead of failing.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Validate and create the output directory.
    pub fn build(self) -> Result<Checkpointer, OutputError> {
        let period = self.period.ok_or_else(|| OutputError::InvalidConfig {
            reason: "checkpointer needs an iteration period".into(),
        })?;
        let trigger = Trigger::iterations(period)?;
        if self.prefix.is_empty() || self.prefix.contains(['/', '\\']) {
            return Err(OutputError::InvalidConfig {
                reason: format!("invalid checkpoint prefix '{}'", self.prefix),
            });
        }
        fs::create_dir_all(&self.dir)?;
        Ok(Checkpointer {
            dir: self.dir,
            prefix: self.prefix,
            extension: self.extension,
            trigger,
            force: self.force,
        })
    }
}

fn write_record(path: &Path, record: &CheckpointRecord) -> Result<u64, OutputError> {
    let mut w = ArchiveWriter::create(path)?;
    w.write_group("", &record.to_group())?;
    Ok(w.finish()?)
}

/// Writes checkpoints on an iteration schedule.
#[derive(Debug)]
pub struct Checkpointer {
    dir: PathBuf,
    prefix: String,
    extension: String,
    trigger: Trigger,
    force: bool,
}

impl Checkpointer {
    /// Start configuring a checkpointer writing into `dir`.
    pub fn builder(dir: impl Into<PathBuf>) -> CheckpointerBuilder {
        CheckpointerBuilder {
            dir: dir.into(),
            prefix: "checkpoint".to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            period: None,
            force: false,
        }
    }

    /// Schedule.
    pub fn trigger_mut(&mut self) -> &mut Trigger {
        &mut self.trigger
    }

    /// `<dir>/<prefix><iteration>.<ext>`.
    pub fn path_for(&self, iteration: u64) -> PathBuf {
        self.dir
            .join(format!("{}{iteration}.{}", self.prefix, self.extension))
    }

    /// Write if the trigger fires. Returns the bytes written, if any.
    pub fn run_if_scheduled(
        &mut self,
        state: &dyn Checkpointable,
    ) -> Result<Option<u64>, OutputError> {
        if !self.trigger.should_fire(&state.clock()) {
            return Ok(None);
        }
        self.write(state).map(Some)
    }

    /// Checkpoint now. Returns the bytes written.
    ///
    /// The record is written to a temporary file and renamed into
    /// place, so a crash mid-write never leaves a truncated checkpoint
    /// under the final name.
    pub fn write(&self, state: &dyn Checkpointable) -> Result<u64, OutputError> {
        let iteration = state.clock().iteration;
        let path = self.path_for(iteration);
        if path.exists() && !self.force {
            return Err(OutputError::PathExists { path });
        }
        let record = CheckpointRecord::capture(state)?;
        let tmp = path.with_extension(format!("{}.tmp", self.extension));
        let written = write_record(&tmp, &record).and_then(|bytes| {
            fs::rename(&tmp, &path)?;
            Ok(bytes)
        });
        let bytes = match written {
            Ok(bytes) => bytes,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&tmp) {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        log::warn!("could not remove {}: {cleanup}", tmp.display());
                    }
                }
                return Err(e);
            }
        };
        log::info!(
            "checkpoint at iteration {iteration} written to {} ({bytes} bytes)",
            path.display()
        );
        Ok(bytes)
    }

    /// The highest-iteration checkpoint in this checkpointer's directory.
    pub fn latest(&self) -> Result<Option<(u64, PathBuf)>, OutputError> {
        latest_checkpoint(&self.dir, &self.prefix, &self.extension)
    }

    /// Rebuild a model from a checkpoint file.
    pub fn restore(path: impl AsRef<Path>) -> Result<Model, CheckpointError> {
        let path = path.as_ref();
        let archive = Archive::read_file(path)?;
        let model = CheckpointRecord::from_archive(&archive)?.into_model()?;
        log::info!(
            "restored checkpoint {} at {}",
            path.display(),
            model.clock()
        );
        Ok(model)
    }

    /// Like [`restore`](Self::restore), then switch the reduction backend.
    pub fn restore_with_backend(
        path: impl AsRef<Path>,
        backend: Backend,
    ) -> Result<Model, CheckpointError> {
        let mut model = Self::restore(path)?;
        model.set_backend(backend);
        Ok(model)
    }
}

/// Find `<dir>/<prefix><N>.<ext>` with the largest `N`.
pub fn latest_checkpoint(
    dir: impl AsRef<Path>,
    prefix: &str,
    extension: &str,
) -> Result<Option<(u64, PathBuf)>, OutputError> {
    let entries = match fs::read_dir(dir.as_ref()) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let suffix = format!(".{extension}");
    let mut latest: Option<(u64, PathBuf)> = None;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let iteration = name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(&suffix))
            .and_then(|n| n.parse::<u64>().ok());
        if let Some(it) = iteration {
            if latest.as_ref().is_none_or(|(best, _)| it > *best) {
                latest = Some((it, entry.path()));
            }
        }
    }
    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_field::FieldAccess;
    use shoal_test_utils::fixtures::spun_up_model;

    #[test]
    fn record_round_trips_through_group() {
        let model = spun_up_model(3, 0.05);
        let record = CheckpointRecord::capture(&model).unwrap();
        assert_eq!(record.fields.len(), 15);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.shoal");
        let mut w = ArchiveWriter::create(&path).unwrap();
        w.write_group("", &record.to_group()).unwrap();
        w.finish().unwrap();

        let decoded = CheckpointRecord::from_archive(&Archive::read_file(&path).unwrap()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn corrupted_field_fails_checksum() {
        let model = spun_up_model(2, 0.05);
        let record = CheckpointRecord::capture(&model).unwrap();
        let mut group = record.to_group();
        let mut tampered = Array::from_field(model.field("T").unwrap());
        tampered.data[10] += 1e-9;
        group.insert("fields/T", tampered);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.shoal");
        let mut w = ArchiveWriter::create(&path).unwrap();
        w.write_group("", &group).unwrap();
        w.finish().unwrap();

        let err = Checkpointer::restore(&path).unwrap_err();
        assert!(matches!(err, CheckpointError::ChecksumMismatch { .. }));
    }

    fn write_tampered(dir: &Path, key: &str, value: impl Into<crate::archive::Value>) -> PathBuf {
        let model = spun_up_model(2, 0.05);
        let mut group = CheckpointRecord::capture(&model).unwrap().to_group();
        group.insert(key, value);
        let path = dir.join("tampered.shoal");
        let mut w = ArchiveWriter::create(&path).unwrap();
        w.write_group("", &group).unwrap();
        w.finish().unwrap();
        path
    }

    #[test]
    fn corrupted_metadata_fails_checksum() {
        let dir = tempfile::tempdir().unwrap();
        for (key, value) in [
            ("clock/time", 1e300),
            ("model/coriolis", 1e-4),
            ("model/ab2_chi", 0.5),
            ("closure/viscosity", 3.0),
        ] {
            let path = write_tampered(dir.path(), key, value);
            let err = Checkpointer::restore(&path).unwrap_err();
            assert!(
                matches!(err, CheckpointError::ChecksumMismatch { .. }),
                "{key}: {err}"
            );
        }
        let path = write_tampered(dir.path(), "clock/iteration", 7u64);
        assert!(matches!(
            Checkpointer::restore(&path),
            Err(CheckpointError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn oversized_stored_grid_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tampered(dir.path(), "grid/nx", u64::MAX);
        assert!(matches!(
            Checkpointer::restore(&path),
            Err(CheckpointError::Archive(_))
        ));
    }

    #[test]
    fn failed_write_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let model = spun_up_model(1, 0.05);
        let cp = Checkpointer::builder(dir.path())
            .every(1)
            .force(true)
            .build()
            .unwrap();
        // A non-empty directory under the final name makes the rename fail.
        let target = cp.path_for(1);
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"x").unwrap();

        assert!(cp.write(&model).is_err());
        assert!(!target.with_extension("shoal.tmp").exists());
        assert!(target.join("keep").exists());
    }

    #[test]
    fn existing_checkpoint_needs_force() {
        let dir = tempfile::tempdir().unwrap();
        let model = spun_up_model(1, 0.05);
        let cp = Checkpointer::builder(dir.path()).every(1).build().unwrap();
        cp.write(&model).unwrap();
        assert!(matches!(
            cp.write(&model),
            Err(OutputError::PathExists { .. })
        ));
        let forced = Checkpointer::builder(dir.path())
            .every(1)
            .force(true)
            .build()
            .unwrap();
        assert!(forced.write(&model).is_ok());
    }

    #[test]
    fn latest_picks_highest_iteration() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["checkpoint5.shoal", "checkpoint40.shoal", "checkpoint7.shoal", "other90.shoal"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let (it, path) = latest_checkpoint(dir.path(), "checkpoint", "shoal")
            .unwrap()
            .unwrap();
        assert_eq!(it, 40);
        assert!(path.ends_with("checkpoint40.shoal"));
        assert!(latest_checkpoint(dir.path().join("nope"), "checkpoint", "shoal")
            .unwrap()
            .is_none());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Checkpointer::restore(dir.path().join("checkpoint1.shoal")),
            Err(CheckpointError::Archive(_))
        ));
    }

    #[test]
    fn zero_period_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Checkpointer::builder(dir.path()).every(0).build(),
            Err(OutputError::Schedule(_))
        ));
        assert!(matches!(
            Checkpointer::builder(dir.path()).build(),
            Err(OutputError::InvalidConfig { .. })
        ));
    }
}
