//! The diagnostics runner.

use shoal_core::{Clock, Registry, RegistryError};
use shoal_field::StateView;

use crate::diagnostic::Diagnostic;
use crate::error::DiagnosticError;

/// Ordered, optionally keyed collection of diagnostics.
///
/// Diagnostics run in registration order. Replacing one by index or key
/// keeps its position.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Registry<Diagnostic>,
}

impl Diagnostics {
    /// An empty runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an unkeyed diagnostic; returns its index.
    pub fn push(&mut self, diagnostic: impl Into<Diagnostic>) -> usize {
        self.entries.push(diagnostic.into())
    }

    /// Append a keyed diagnostic. Fails if `key` is taken.
    pub fn push_keyed(
        &mut self,
        key: impl Into<String>,
        diagnostic: impl Into<Diagnostic>,
    ) -> Result<usize, RegistryError> {
        self.entries.push_keyed(key, diagnostic.into())
    }

    /// Insert or replace by key; returns the replaced diagnostic.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        diagnostic: impl Into<Diagnostic>,
    ) -> Option<Diagnostic> {
        self.entries.insert(key, diagnostic.into())
    }

    /// Replace by index, keeping any key.
    pub fn set(
        &mut self,
        index: usize,
        diagnostic: impl Into<Diagnostic>,
    ) -> Result<Diagnostic, RegistryError> {
        self.entries.set(index, diagnostic.into())
    }

    /// Diagnostic at `index`.
    pub fn get(&self, index: usize) -> Option<&Diagnostic> {
        self.entries.get(index)
    }

    /// Diagnostic registered under `key`.
    pub fn get_by_key(&self, key: &str) -> Option<&Diagnostic> {
        self.entries.get_by_key(key)
    }

    /// Mutable diagnostic registered under `key`.
    pub fn get_by_key_mut(&mut self, key: &str) -> Option<&mut Diagnostic> {
        self.entries.get_by_key_mut(key)
    }

    /// Number of registered diagnostics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if none are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Run every diagnostic whose trigger fires at the state's clock.
    ///
    /// A fatal error stops the loop and is returned. Recoverable errors
    /// are logged and the remaining diagnostics still run. Returns the
    /// number of diagnostics that ran successfully.
    pub fn run_scheduled(&mut self, state: &dyn StateView) -> Result<usize, DiagnosticError> {
        let mut ran = 0;
        for (index, diagnostic) in self.entries.iter_mut().enumerate() {
            match diagnostic.run_if_scheduled(state) {
                Ok(true) => ran += 1,
                Ok(false) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::warn!(
                        "diagnostic #{index} ({}) failed at {}: {e}",
                        diagnostic.kind(),
                        state.clock()
                    );
                }
            }
        }
        Ok(ran)
    }

    /// Run every diagnostic now, ignoring schedules. Stops at the first error.
    pub fn run_all(&mut self, state: &dyn StateView) -> Result<(), DiagnosticError> {
        self.entries.iter_mut().try_for_each(|d| d.run(state))
    }

    /// Re-anchor every time-interval trigger to `clock`.
    pub fn reset_triggers(&mut self, clock: &Clock) {
        for diagnostic in self.entries.iter_mut() {
            diagnostic.trigger_mut().reset_to(clock);
        }
    }
}
