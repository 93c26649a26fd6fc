//! Dense `f64` field storage including halo cells.
//!
//! Layout is x-fastest: the storage offset of `(i, j, k)` is
//! `((k + hz) * Ny + (j + hy)) * Nx + (i + hx)` where `N*` are the
//! halo-inclusive sizes. Indices are signed so that halo cells can be
//! addressed as `-1`, `n`, and so on.

use crate::error::FieldError;
use crate::grid::RegularGrid;

/// A scalar field on a [`RegularGrid`], halos included.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    size: [usize; 3],
    halo: [usize; 3],
    total: [usize; 3],
    data: Vec<f64>,
}

impl Field {
    /// A zero-filled field on `grid`.
    pub fn zeros(grid: &RegularGrid) -> Self {
        Self {
            size: grid.size(),
            halo: grid.halo(),
            total: grid.total_size(),
            data: vec![0.0; grid.total_len()],
        }
    }

    /// Wrap existing halo-inclusive data, checking its length.
    pub fn from_data(grid: &RegularGrid, data: Vec<f64>) -> Result<Self, FieldError> {
        if data.len() != grid.total_len() {
            return Err(FieldError::ShapeMismatch {
                expected: grid.total_len(),
                found: data.len(),
            });
        }
        Ok(Self {
            size: grid.size(),
            halo: grid.halo(),
            total: grid.total_size(),
            data,
        })
    }

    /// Interior size `[nx, ny, nz]`.
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    /// Halo-inclusive storage shape.
    pub fn shape(&self) -> [usize; 3] {
        self.total
    }

    /// Halo widths.
    pub fn halo(&self) -> [usize; 3] {
        self.halo
    }

    /// Full storage, halos included.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable full storage, halos included.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Number of interior cells.
    pub fn interior_len(&self) -> usize {
        self.size.iter().product()
    }

    /// Storage offset of `(i, j, k)`.
    #[inline]
    pub fn offset(&self, i: isize, j: isize, k: isize) -> usize {
        let ii = (i + self.halo[0] as isize) as usize;
        let jj = (j + self.halo[1] as isize) as usize;
        let kk = (k + self.halo[2] as isize) as usize;
        (kk * self.total[1] + jj) * self.total[0] + ii
    }

    /// Storage offset of the `n`-th interior cell in x-fastest order.
    #[inline]
    pub fn interior_offset(&self, n: usize) -> usize {
        let [nx, ny, _] = self.size;
        let i = (n % nx) as isize;
        let j = ((n / nx) % ny) as isize;
        let k = (n / (nx * ny)) as isize;
        self.offset(i, j, k)
    }

    /// Value at `(i, j, k)`.
    #[inline]
    pub fn get(&self, i: isize, j: isize, k: isize) -> f64 {
        self.data[self.offset(i, j, k)]
    }

    /// Set the value at `(i, j, k)`.
    #[inline]
    pub fn set(&mut self, i: isize, j: isize, k: isize, value: f64) {
        let o = self.offset(i, j, k);
        self.data[o] = value;
    }

    /// Overwrite every stored value, halos included.
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Interior values in x-fastest order.
    pub fn interior(&self) -> Vec<f64> {
        (0..self.interior_len())
            .map(|n| self.data[self.interior_offset(n)])
            .collect()
    }

    /// Fill halo cells: periodic in `x` and `y`, zero-gradient in `z`.
    ///
    /// Axes are filled in order `x`, `y`, `z` so corner halos end up
    /// consistent with both neighbouring faces.
    pub fn fill_halo_regions(&mut self) {
        let [nx, ny, nz] = self.size.map(|n| n as isize);
        let [hx, hy, hz] = self.halo.map(|h| h as isize);

        for k in 0..nz {
            for j in 0..ny {
                for h in 1..=hx {
                    let west = self.get((nx - h).rem_euclid(nx), j, k);
                    let east = self.get((h - 1).rem_euclid(nx), j, k);
                    self.set(-h, j, k, west);
                    self.set(nx - 1 + h, j, k, east);
                }
            }
        }
        for k in 0..nz {
            for i in -hx..nx + hx {
                for h in 1..=hy {
                    let south = self.get(i, (ny - h).rem_euclid(ny), k);
                    let north = self.get(i, (h - 1).rem_euclid(ny), k);
                    self.set(i, -h, k, south);
                    self.set(i, ny - 1 + h, k, north);
                }
            }
        }
        for j in -hy..ny + hy {
            for i in -hx..nx + hx {
                let bottom = self.get(i, j, 0);
                let top = self.get(i, j, nz - 1);
                for h in 1..=hz {
                    self.set(i, j, -h, bottom);
                    self.set(i, j, nz - 1 + h, top);
                }
            }
        }
    }

    /// Set every interior cell from a function of its centre coordinates,
    /// then refresh the halos.
    pub fn set_with<F>(&mut self, grid: &RegularGrid, f: F)
    where
        F: Fn(f64, f64, f64) -> f64,
    {
        let [nx, ny, nz] = self.size.map(|n| n as isize);
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let v = f(grid.xnode(i), grid.ynode(j), grid.znode(k));
                    self.set(i, j, k, v);
                }
            }
        }
        self.fill_halo_regions();
    }
}
