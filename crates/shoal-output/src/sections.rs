//! Self-describing sections replicated into every output file.

use shoal_core::Clock;
use shoal_field::{Closure, RegularGrid, StateView};

use crate::archive::{Array, Group};
use crate::error::ArchiveError;

/// Structural metadata a writer can replicate into each file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Section {
    /// Grid sizes, halos, extents and node coordinates, under `grid/`.
    Grid,
    /// Closure coefficients, under `closure/`.
    Closure,
    /// Iteration and time when the file was created, under `clock/`.
    Clock,
    /// Tracer names, under `tracers/`.
    Tracers,
}

impl Section {
    /// Every section, in write order.
    pub const ALL: [Section; 4] = [Self::Grid, Self::Closure, Self::Clock, Self::Tracers];

    /// Top-level group name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::Closure => "closure",
            Self::Clock => "clock",
            Self::Tracers => "tracers",
        }
    }

    /// Write this section for `state` into `root`.
    pub fn write(self, root: &mut Group, state: &dyn StateView) {
        match self {
            Self::Grid => write_grid(root, state.grid()),
            Self::Closure => write_closure(root, &state.closure()),
            Self::Clock => write_clock(root, &state.clock()),
            Self::Tracers => write_tracers(root, state.tracer_names()),
        }
    }
}

const AXES: [&str; 3] = ["x", "y", "z"];

/// Write `grid/` for `grid`.
pub fn write_grid(root: &mut Group, grid: &RegularGrid) {
    let size = grid.size();
    let halo = grid.halo();
    let extent = grid.extent();
    for (a, axis) in AXES.iter().enumerate() {
        root.insert(&format!("grid/n{axis}"), size[a] as u64);
        root.insert(&format!("grid/h{axis}"), halo[a] as u64);
        root.insert(&format!("grid/L{axis}"), extent[a]);
    }
    let nodes = |n: usize, f: &dyn Fn(isize) -> f64| {
        Array::vector((0..n as isize).map(f).collect())
    };
    root.insert("grid/xnode", nodes(size[0], &|i| grid.xnode(i)));
    root.insert("grid/ynode", nodes(size[1], &|j| grid.ynode(j)));
    root.insert("grid/znode", nodes(size[2], &|k| grid.znode(k)));
}

/// Rebuild a grid from `grid/`.
pub fn read_grid(root: &Group) -> Result<RegularGrid, ArchiveError> {
    let mut size = [0usize; 3];
    let mut halo = [0usize; 3];
    let mut extent = [0f64; 3];
    for (a, axis) in AXES.iter().enumerate() {
        size[a] = root.u64(&format!("grid/n{axis}"))? as usize;
        halo[a] = root.u64(&format!("grid/h{axis}"))? as usize;
        extent[a] = root.f64(&format!("grid/L{axis}"))?;
    }
    RegularGrid::new(size, extent, halo).map_err(|e| ArchiveError::MalformedRecord {
        detail: format!("stored grid is invalid: {e}"),
    })
}

/// Write `closure/`.
pub fn write_closure(root: &mut Group, closure: &Closure) {
    root.insert("closure/viscosity", closure.viscosity);
    root.insert("closure/diffusivity", closure.diffusivity);
}

/// Rebuild closure coefficients from `closure/`.
pub fn read_closure(root: &Group) -> Result<Closure, ArchiveError> {
    Ok(Closure {
        viscosity: root.f64("closure/viscosity")?,
        diffusivity: root.f64("closure/diffusivity")?,
    })
}

/// Write `clock/`.
pub fn write_clock(root: &mut Group, clock: &Clock) {
    root.insert("clock/iteration", clock.iteration);
    root.insert("clock/time", clock.time);
}

/// Rebuild a clock from `clock/`.
pub fn read_clock(root: &Group) -> Result<Clock, ArchiveError> {
    Ok(Clock::restored(
        root.u64("clock/iteration")?,
        root.f64("clock/time")?,
    ))
}

/// Write `tracers/count` and `tracers/<n>`.
pub fn write_tracers(root: &mut Group, names: Vec<&str>) {
    root.insert("tracers/count", names.len() as u64);
    for (n, name) in names.into_iter().enumerate() {
        root.insert(&format!("tracers/{n}"), name);
    }
}

/// Tracer names from `tracers/`, in order.
pub fn read_tracers(root: &Group) -> Result<Vec<String>, ArchiveError> {
    let count = root.u64("tracers/count")?;
    (0..count)
        .map(|n| root.str(&format!("tracers/{n}")).map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_test_utils::fixtures::small_grid;
    use shoal_test_utils::MockState;

    #[test]
    fn grid_section_rebuilds_grid() {
        let grid = RegularGrid::new([6, 5, 3], [2.0, 1.0, 0.5], [2, 1, 1]).unwrap();
        let mut root = Group::new();
        write_grid(&mut root, &grid);
        assert_eq!(read_grid(&root).unwrap(), grid);
        assert_eq!(root.array("grid/znode").unwrap().data.len(), 3);
    }

    #[test]
    fn every_section_lands_under_its_name() {
        let mut state = MockState::new(small_grid())
            .with_closure(1e-3, 2e-3)
            .with_tracer("T")
            .with_tracer("S");
        state.set_clock(40, 4.0);
        let mut root = Group::new();
        for section in Section::ALL {
            section.write(&mut root, &state);
            assert!(root.contains(section.name()));
        }
        assert_eq!(read_tracers(&root).unwrap(), ["T", "S"]);
        assert_eq!(read_clock(&root).unwrap(), Clock::restored(40, 4.0));
        assert_eq!(read_closure(&root).unwrap().diffusivity, 2e-3);
    }
}
