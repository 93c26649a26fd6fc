//! Right-hand-side (tendency) evaluation.
//!
//! Velocities live on a C-grid: `u(i, j, k)` on the west face of cell
//! `(i, j, k)`, `v` on the south face and `w` on the bottom face. Tracers
//! are cell-centred. All stencils read halos, so callers must fill halo
//! regions before evaluating tendencies.

use shoal_field::{Field, RegularGrid};

/// Second-order Laplacian of `c` at `(i, j, k)`.
#[inline]
pub fn laplacian(c: &Field, grid: &RegularGrid, i: isize, j: isize, k: isize) -> f64 {
    let centre = c.get(i, j, k);
    let dx2 = grid.dx() * grid.dx();
    let dy2 = grid.dy() * grid.dy();
    let dz2 = grid.dz() * grid.dz();
    (c.get(i + 1, j, k) - 2.0 * centre + c.get(i - 1, j, k)) / dx2
        + (c.get(i, j + 1, k) - 2.0 * centre + c.get(i, j - 1, k)) / dy2
        + (c.get(i, j, k + 1) - 2.0 * centre + c.get(i, j, k - 1)) / dz2
}

/// Zero `w` on the bottom face and in every vertical halo cell.
///
/// The domain is closed at top and bottom, so no flow crosses `k = 0`
/// or `k = nz`.
pub fn impose_no_penetration(w: &mut Field) {
    let [nx, ny, nz] = w.size().map(|n| n as isize);
    let [hx, hy, hz] = w.halo().map(|h| h as isize);
    for j in -hy..ny + hy {
        for i in -hx..nx + hx {
            w.set(i, j, 0, 0.0);
            for h in 1..=hz {
                w.set(i, j, -h, 0.0);
                w.set(i, j, nz - 1 + h, 0.0);
            }
        }
    }
}

/// Velocity tendencies: viscous diffusion plus Coriolis rotation.
pub struct VelocityTendencies<'a> {
    /// Grid geometry.
    pub grid: &'a RegularGrid,
    /// Kinematic viscosity.
    pub viscosity: f64,
    /// Coriolis parameter.
    pub coriolis: f64,
}

impl VelocityTendencies<'_> {
    /// Fill `gu`, `gv`, `gw` at every interior point.
    pub fn evaluate(
        &self,
        u: &Field,
        v: &Field,
        w: &Field,
        gu: &mut Field,
        gv: &mut Field,
        gw: &mut Field,
    ) {
        let [nx, ny, nz] = self.grid.size().map(|n| n as isize);
        let nu = self.viscosity;
        let f = self.coriolis;
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let v_at_u = 0.25
                        * (v.get(i - 1, j, k)
                            + v.get(i, j, k)
                            + v.get(i - 1, j + 1, k)
                            + v.get(i, j + 1, k));
                    let u_at_v = 0.25
                        * (u.get(i, j - 1, k)
                            + u.get(i + 1, j - 1, k)
                            + u.get(i, j, k)
                            + u.get(i + 1, j, k));
                    gu.set(i, j, k, nu * laplacian(u, self.grid, i, j, k) + f * v_at_u);
                    gv.set(i, j, k, nu * laplacian(v, self.grid, i, j, k) - f * u_at_v);
                    let gw_ijk = if k == 0 {
                        0.0
                    } else {
                        nu * laplacian(w, self.grid, i, j, k)
                    };
                    gw.set(i, j, k, gw_ijk);
                }
            }
        }
    }
}

/// Tracer tendency: centred advection by the velocity plus diffusion.
pub struct TracerTendency<'a> {
    /// Grid geometry.
    pub grid: &'a RegularGrid,
    /// Tracer diffusivity.
    pub diffusivity: f64,
}

impl TracerTendency<'_> {
    /// Fill `gc` at every interior point.
    pub fn evaluate(&self, c: &Field, u: &Field, v: &Field, w: &Field, gc: &mut Field) {
        let [nx, ny, nz] = self.grid.size().map(|n| n as isize);
        let (dx, dy, dz) = (self.grid.dx(), self.grid.dy(), self.grid.dz());
        let kappa = self.diffusivity;
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let uc = 0.5 * (u.get(i, j, k) + u.get(i + 1, j, k));
                    let vc = 0.5 * (v.get(i, j, k) + v.get(i, j + 1, k));
                    let wc = 0.5 * (w.get(i, j, k) + w.get(i, j, k + 1));
                    let advection = uc * (c.get(i + 1, j, k) - c.get(i - 1, j, k)) / (2.0 * dx)
                        + vc * (c.get(i, j + 1, k) - c.get(i, j - 1, k)) / (2.0 * dy)
                        + wc * (c.get(i, j, k + 1) - c.get(i, j, k - 1)) / (2.0 * dz);
                    gc.set(
                        i,
                        j,
                        k,
                        kappa * laplacian(c, self.grid, i, j, k) - advection,
                    );
                }
            }
        }
    }
}
