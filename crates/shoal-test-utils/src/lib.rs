//! Test utilities and mock types for Shoal development.
//!
//! Provides [`MockState`], a hand-assembled implementation of
//! [`StateView`] for exercising diagnostics and writers without a model,
//! plus [`fixtures`] that build common grids and models.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use indexmap::IndexMap;
use shoal_core::Clock;
use shoal_field::{Backend, Closure, Field, FieldAccess, RegularGrid, StateView};

/// Mock implementation of [`StateView`].
///
/// Backed by an `IndexMap<String, Field>` so field order is stable.
/// Fields are added with [`with_field`](MockState::with_field) or
/// [`set_with`](MockState::set_with); the clock is moved by hand.
#[derive(Clone, Debug)]
pub struct MockState {
    grid: RegularGrid,
    clock: Clock,
    fields: IndexMap<String, Field>,
    closure: Closure,
    backend: Backend,
    tracers: Vec<String>,
}

impl MockState {
    pub fn new(grid: RegularGrid) -> Self {
        Self {
            grid,
            clock: Clock::new(),
            fields: IndexMap::new(),
            closure: Closure::default(),
            backend: Backend::Serial,
            tracers: Vec::new(),
        }
    }

    /// Add a zero field named `name`.
    pub fn with_field(mut self, name: &str) -> Self {
        self.fields
            .insert(name.to_string(), Field::zeros(&self.grid));
        self
    }

    /// Add a field and register it as a tracer.
    pub fn with_tracer(mut self, name: &str) -> Self {
        self.tracers.push(name.to_string());
        self.with_field(name)
    }

    pub fn with_closure(mut self, viscosity: f64, diffusivity: f64) -> Self {
        self.closure = Closure {
            viscosity,
            diffusivity,
        };
        self
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Set (or add) a field from a function of cell-centre position.
    pub fn set_with<F>(&mut self, name: &str, f: F)
    where
        F: Fn(f64, f64, f64) -> f64,
    {
        let grid = self.grid.clone();
        self.fields
            .entry(name.to_string())
            .or_insert_with(|| Field::zeros(&grid))
            .set_with(&grid, f);
    }

    /// Mutable access to a field for poking individual cells.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.get_mut(name)
    }

    pub fn set_clock(&mut self, iteration: u64, time: f64) {
        self.clock = Clock::restored(iteration, time);
    }

    /// Advance the clock as a model step of `dt` would.
    pub fn tick(&mut self, dt: f64) {
        self.clock.tick(dt);
    }
}

impl FieldAccess for MockState {
    fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }
}

impl StateView for MockState {
    fn clock(&self) -> Clock {
        self.clock
    }

    fn grid(&self) -> &RegularGrid {
        &self.grid
    }

    fn backend(&self) -> Backend {
        self.backend
    }

    fn closure(&self) -> Closure {
        self.closure
    }

    fn tracer_names(&self) -> Vec<&str> {
        self.tracers.iter().map(String::as_str).collect()
    }
}
