//! Uniformly spaced rectilinear grid with halo regions.
//!
//! The grid is periodic in `x` and `y` and bounded in `z`, with the
//! vertical coordinate running from `-Lz` at the bottom to `0` at the
//! surface. Interior cells are indexed `0..n` along each axis; halo cells
//! sit at negative indices and at indices `>= n`.

use std::fmt;

use crate::error::GridError;

/// A spatial axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Zonal (periodic).
    X,
    /// Meridional (periodic).
    Y,
    /// Vertical (bounded).
    Z,
}

impl Axis {
    /// All three axes in storage order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => write!(f, "x"),
            Self::Y => write!(f, "y"),
            Self::Z => write!(f, "z"),
        }
    }
}

/// A regular grid: interior size, physical extent, and halo width per axis.
///
/// # Examples
///
/// ```
/// use shoal_field::RegularGrid;
///
/// let grid = RegularGrid::new([16, 16, 8], [1.0, 1.0, 0.5], [1, 1, 1]).unwrap();
/// assert_eq!(grid.dx(), 1.0 / 16.0);
/// assert_eq!(grid.total_size(), [18, 18, 10]);
/// assert!((grid.znode(0) - (-0.5 + 0.5 * grid.dz())).abs() < 1e-15);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RegularGrid {
    size: [usize; 3],
    extent: [f64; 3],
    halo: [usize; 3],
}

impl RegularGrid {
    /// Create a grid, validating every axis.
    pub fn new(size: [usize; 3], extent: [f64; 3], halo: [usize; 3]) -> Result<Self, GridError> {
        for axis in Axis::ALL {
            let a = axis.index();
            if size[a] == 0 {
                return Err(GridError::ZeroSize { axis });
            }
            if !extent[a].is_finite() || extent[a] <= 0.0 {
                return Err(GridError::InvalidExtent {
                    axis,
                    value: extent[a],
                });
            }
            if halo[a] == 0 {
                return Err(GridError::ZeroHalo { axis });
            }
        }
        let total = (0..3).try_fold(1usize, |len, a| {
            halo[a]
                .checked_mul(2)
                .and_then(|h| h.checked_add(size[a]))
                .and_then(|n| n.checked_mul(len))
        });
        if total.is_none_or(|len| len > isize::MAX as usize / size_of::<f64>()) {
            return Err(GridError::TooLarge { size, halo });
        }
        Ok(Self { size, extent, halo })
    }

    /// Interior cell counts `[nx, ny, nz]`.
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    /// Physical extents `[Lx, Ly, Lz]`.
    pub fn extent(&self) -> [f64; 3] {
        self.extent
    }

    /// Halo widths `[hx, hy, hz]`.
    pub fn halo(&self) -> [usize; 3] {
        self.halo
    }

    /// Storage size including halos on both sides of each axis.
    pub fn total_size(&self) -> [usize; 3] {
        [
            self.size[0] + 2 * self.halo[0],
            self.size[1] + 2 * self.halo[1],
            self.size[2] + 2 * self.halo[2],
        ]
    }

    /// Number of interior cells.
    pub fn interior_len(&self) -> usize {
        self.size.iter().product()
    }

    /// Number of stored values per field, halos included.
    pub fn total_len(&self) -> usize {
        self.total_size().iter().product()
    }

    /// Interior cells along `x`.
    pub fn nx(&self) -> usize {
        self.size[0]
    }

    /// Interior cells along `y`.
    pub fn ny(&self) -> usize {
        self.size[1]
    }

    /// Interior cells along `z`.
    pub fn nz(&self) -> usize {
        self.size[2]
    }

    /// Cell width along `axis`.
    pub fn spacing(&self, axis: Axis) -> f64 {
        let a = axis.index();
        self.extent[a] / self.size[a] as f64
    }

    /// Cell width along `x`.
    pub fn dx(&self) -> f64 {
        self.spacing(Axis::X)
    }

    /// Cell width along `y`.
    pub fn dy(&self) -> f64 {
        self.spacing(Axis::Y)
    }

    /// Cell width along `z`.
    pub fn dz(&self) -> f64 {
        self.spacing(Axis::Z)
    }

    /// Smallest cell width over all axes.
    pub fn min_spacing(&self) -> f64 {
        self.dx().min(self.dy()).min(self.dz())
    }

    /// Cell-centre `x` coordinate of column `i`.
    pub fn xnode(&self, i: isize) -> f64 {
        (i as f64 + 0.5) * self.dx()
    }

    /// Cell-centre `y` coordinate of row `j`.
    pub fn ynode(&self, j: isize) -> f64 {
        (j as f64 + 0.5) * self.dy()
    }

    /// Cell-centre `z` coordinate of level `k`.
    pub fn znode(&self, k: isize) -> f64 {
        -self.extent[2] + (k as f64 + 0.5) * self.dz()
    }

    /// `z` coordinate of the lower face of level `k`.
    pub fn zface(&self, k: isize) -> f64 {
        -self.extent[2] + k as f64 * self.dz()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_size() {
        assert_eq!(
            RegularGrid::new([4, 0, 4], [1.0; 3], [1; 3]),
            Err(GridError::ZeroSize { axis: Axis::Y })
        );
    }

    #[test]
    fn rejects_bad_extent() {
        assert!(matches!(
            RegularGrid::new([4; 3], [1.0, 1.0, f64::NAN], [1; 3]),
            Err(GridError::InvalidExtent { axis: Axis::Z, .. })
        ));
    }

    #[test]
    fn rejects_zero_halo() {
        assert_eq!(
            RegularGrid::new([4; 3], [1.0; 3], [1, 1, 0]),
            Err(GridError::ZeroHalo { axis: Axis::Z })
        );
    }

    #[test]
    fn rejects_sizes_that_overflow_storage() {
        assert!(matches!(
            RegularGrid::new([usize::MAX, 1, 1], [1.0; 3], [1; 3]),
            Err(GridError::TooLarge { .. })
        ));
        assert!(matches!(
            RegularGrid::new([1 << 22, 1 << 22, 1 << 22], [1.0; 3], [1; 3]),
            Err(GridError::TooLarge { .. })
        ));
        assert!(RegularGrid::new([64, 64, 64], [1.0; 3], [3; 3]).is_ok());
    }

    #[test]
    fn vertical_nodes_span_depth() {
        let grid = RegularGrid::new([2, 2, 4], [1.0, 1.0, 2.0], [1; 3]).unwrap();
        assert!((grid.zface(0) + 2.0).abs() < 1e-15);
        assert!(grid.zface(4).abs() < 1e-15);
        assert!((grid.znode(3) + 0.25).abs() < 1e-15);
    }

    #[test]
    fn lengths_account_for_halos() {
        let grid = RegularGrid::new([3, 4, 5], [1.0; 3], [2, 1, 1]).unwrap();
        assert_eq!(grid.interior_len(), 60);
        assert_eq!(grid.total_len(), 7 * 6 * 7);
    }
}
