//! Segmented output: scheduled field snapshots split across part files.
//!
//! Each part is a complete archive named `<prefix>_part<N>.<ext>`, with
//! `N` counting up from 1. A new part starts on the write after the
//! current part grows past the size budget, and every part carries its
//! own copy of the structural metadata so it can be read in isolation.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use shoal_core::Trigger;
use shoal_field::StateView;

use crate::archive::{Array, Group, Value};
use crate::error::OutputError;
use crate::sections::Section;
use crate::writer::ArchiveWriter;

/// Default file extension for output parts and checkpoints.
pub const DEFAULT_EXTENSION: &str = "shoal";

/// Injects extra top-level sections into every new part.
pub type InitHook = Box<dyn Fn(&mut Group, &dyn StateView) + Send>;

/// Computes an output array from the state.
pub type OutputFn = Box<dyn Fn(&dyn StateView) -> Result<Array, OutputError> + Send>;

enum Source {
    Field(String),
    Computed(OutputFn),
}

impl Source {
    fn evaluate(&self, state: &dyn StateView) -> Result<Array, OutputError> {
        match self {
            Self::Field(name) => Ok(Array::from_field(state.require_field(name)?)),
            Self::Computed(f) => f(state),
        }
    }
}

/// Builder for [`SegmentedWriter`].
///
/// # Examples
///
/// ```no_run
/// use shoal_core::Trigger;
/// use shoal_output::{Section, SegmentedWriter};
/// # fn demo(model: &shoal_model::Model) -> Result<(), shoal_output::OutputError> {
/// let writer = SegmentedWriter::builder("out", "fields")
///     .output("u")
///     .output("T")
///     .schedule(Trigger::iterations(10)?)
///     .max_filesize(64 << 20)
///     .including(Section::ALL)
///     .build(model)?;
/// assert_eq!(writer.current_part(), 1);
/// # Ok(())
/// # }
/// ```
pub struct SegmentedWriterBuilder {
    dir: PathBuf,
    prefix: String,
    extension: String,
    outputs: IndexMap<String, Source>,
    trigger: Option<Trigger>,
    max_filesize: u64,
    init: Option<InitHook>,
    including: Vec<Section>,
    force: bool,
}

impl SegmentedWriterBuilder {
    /// Write the named field on every fire.
    pub fn output(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.outputs.insert(name.clone(), Source::Field(name));
        self
    }

    /// Write a computed array under `name` on every fire.
    pub fn output_with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&dyn StateView) -> Result<Array, OutputError> + Send + 'static,
    {
        self.outputs.insert(name.into(), Source::Computed(Box::new(f)));
        self
    }

    /// When to write.
    pub fn schedule(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Size budget per part, in bytes. Default: unlimited.
    pub fn max_filesize(mut self, bytes: u64) -> Self {
        self.max_filesize = bytes;
        self
    }

    /// Hook run on every new part to inject extra sections.
    pub fn init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Group, &dyn StateView) + Send + 'static,
    {
        self.init = Some(Box::new(hook));
        self
    }

    /// Structural sections replicated into every part.
    pub fn including(mut self, sections: impl IntoIterator<Item = Section>) -> Self {
        for section in sections {
            if !self.including.contains(&section) {
                self.including.push(section);
            }
        }
        self
    }

    /// Remove existing parts for this prefix instead of failing.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// File extension, without the dot. Default: [`DEFAULT_EXTENSION`].
    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.extension = ext.into();
        self
    }

    /// Validate, clear or refuse existing parts, and initialise part 1.
    pub fn build(self, state: &dyn StateView) -> Result<SegmentedWriter, OutputError> {
        let trigger = self.trigger.ok_or_else(|| OutputError::InvalidConfig {
            reason: "segmented writer needs a schedule".into(),
        })?;
        if self.prefix.is_empty() || self.prefix.contains(['/', '\\']) {
            return Err(OutputError::InvalidConfig {
                reason: format!("invalid file prefix '{}'", self.prefix),
            });
        }
        if self.max_filesize == 0 {
            return Err(OutputError::InvalidConfig {
                reason: "max_filesize must be positive".into(),
            });
        }
        if let Some(bad) = self
            .outputs
            .keys()
            .find(|n| n.is_empty() || n.contains('/') || n.as_str() == TIME_KEY)
        {
            return Err(OutputError::InvalidConfig {
                reason: format!("invalid output name '{bad}'"),
            });
        }

        let existing = existing_parts(&self.dir, &self.prefix, &self.extension)?;
        if let Some((_, path)) = existing.first() {
            if !self.force {
                return Err(OutputError::PathExists { path: path.clone() });
            }
            for (_, path) in &existing {
                log::info!("removing existing output part {}", path.display());
                fs::remove_file(path)?;
            }
        }
        fs::create_dir_all(&self.dir)?;

        let mut writer = SegmentedWriter {
            dir: self.dir,
            prefix: self.prefix,
            extension: self.extension,
            outputs: self.outputs,
            trigger,
            max_filesize: self.max_filesize,
            init: self.init,
            including: self.including,
            part: 1,
            rollover_pending: false,
        };
        writer.initialise_part(state, 1)?;
        Ok(writer)
    }
}

const TIME_KEY: &str = "t";

/// Writes scheduled snapshots to size-bounded part files.
pub struct SegmentedWriter {
    dir: PathBuf,
    prefix: String,
    extension: String,
    outputs: IndexMap<String, Source>,
    trigger: Trigger,
    max_filesize: u64,
    init: Option<InitHook>,
    including: Vec<Section>,
    part: u32,
    rollover_pending: bool,
}

impl SegmentedWriter {
    /// Start configuring a writer for `<dir>/<prefix>_part<N>.<ext>`.
    pub fn builder(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> SegmentedWriterBuilder {
        SegmentedWriterBuilder {
            dir: dir.into(),
            prefix: prefix.into(),
            extension: DEFAULT_EXTENSION.to_string(),
            outputs: IndexMap::new(),
            trigger: None,
            max_filesize: u64::MAX,
            init: None,
            including: Vec::new(),
            force: false,
        }
    }

    /// Schedule.
    pub fn trigger_mut(&mut self) -> &mut Trigger {
        &mut self.trigger
    }

    /// Number of the part currently being written.
    pub fn current_part(&self) -> u32 {
        self.part
    }

    /// Path of part `n`.
    pub fn part_path(&self, n: u32) -> PathBuf {
        part_path(&self.dir, &self.prefix, &self.extension, n)
    }

    /// Paths of every part created so far, in order.
    pub fn part_paths(&self) -> Vec<PathBuf> {
        (1..=self.part).map(|n| self.part_path(n)).collect()
    }

    /// Names of the written outputs.
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    /// Write if the trigger fires. Returns the bytes written, if any.
    pub fn run_if_scheduled(&mut self, state: &dyn StateView) -> Result<Option<u64>, OutputError> {
        if !self.trigger.should_fire(&state.clock()) {
            return Ok(None);
        }
        self.write(state).map(Some)
    }

    /// Write every output for the current iteration now.
    ///
    /// All outputs are evaluated before the file is opened, so a failing
    /// output leaves the part untouched. Returns the bytes written.
    ///
    /// A pending rollover only advances the part number once the new
    /// part has been created, so a failed rollover is retried on the
    /// next write.
    pub fn write(&mut self, state: &dyn StateView) -> Result<u64, OutputError> {
        let clock = state.clock();
        let arrays = self
            .outputs
            .iter()
            .map(|(name, source)| Ok((name, source.evaluate(state)?)))
            .collect::<Result<Vec<_>, OutputError>>()?;

        let mut bytes = 0;
        if self.rollover_pending {
            bytes += self.initialise_part(state, self.part + 1)?;
            self.part += 1;
            self.rollover_pending = false;
        }

        let path = self.part_path(self.part);
        let mut w = ArchiveWriter::append(&path)?;
        for (name, array) in arrays {
            w.write(
                &format!("timeseries/{name}/{}", clock.iteration),
                &Value::Array(array),
            )?;
        }
        w.write(
            &format!("timeseries/{TIME_KEY}/{}", clock.iteration),
            &Value::F64(clock.time),
        )?;
        bytes += w.finish()?;

        let size = fs::metadata(&path)?.len();
        log::debug!(
            "wrote iteration {} to {} ({size} bytes)",
            clock.iteration,
            path.display()
        );
        if size > self.max_filesize {
            log::info!(
                "{} is {size} bytes, over the {} byte budget; next write starts part {}",
                path.display(),
                self.max_filesize,
                self.part + 1
            );
            self.rollover_pending = true;
        }
        Ok(bytes)
    }

    fn initialise_part(&self, state: &dyn StateView, part: u32) -> Result<u64, OutputError> {
        let path = self.part_path(part);
        if path.exists() {
            return Err(OutputError::PathExists { path });
        }
        let mut root = Group::new();
        root.insert("metadata/part", u64::from(part));
        root.insert("metadata/prefix", self.prefix.as_str());
        if let Some(hook) = &self.init {
            hook(&mut root, state);
        }
        for section in &self.including {
            section.write(&mut root, state);
        }
        let written = ArchiveWriter::create(&path).and_then(|mut w| {
            w.write_group("", &root)?;
            w.finish()
        });
        match written {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                // A half-written header would block every retry.
                if let Err(cleanup) = fs::remove_file(&path) {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        log::warn!("could not remove {}: {cleanup}", path.display());
                    }
                }
                Err(e.into())
            }
        }
    }
}

/// `<dir>/<prefix>_part<n>.<ext>`.
pub fn part_path(dir: &Path, prefix: &str, extension: &str, n: u32) -> PathBuf {
    dir.join(format!("{prefix}_part{n}.{extension}"))
}

/// Existing parts for `prefix` in `dir`, sorted by part number. A
/// missing directory has no parts.
pub fn existing_parts(
    dir: &Path,
    prefix: &str,
    extension: &str,
) -> Result<Vec<(u32, PathBuf)>, OutputError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let stem = format!("{prefix}_part");
    let suffix = format!(".{extension}");
    let mut parts = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let number = name
            .strip_prefix(&stem)
            .and_then(|rest| rest.strip_suffix(&suffix))
            .and_then(|n| n.parse::<u32>().ok());
        if let Some(n) = number {
            parts.push((n, entry.path()));
        }
    }
    parts.sort_by_key(|(n, _)| *n);
    Ok(parts)
}
