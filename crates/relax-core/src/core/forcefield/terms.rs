//! Term calculators: index-only interaction terms over a shared position
//! array.
//!
//! Every term holds local atom indices and precomputed scalar coefficients,
//! never a reference to live structure data. `energies` returns the
//! potential and its first two derivatives with respect to the term's
//! internal coordinate; `add_forces` adds the analytic Cartesian gradient
//! into a shared force array, scaling each atom's contribution by its entry
//! in a per-atom weight array (1.0 for mobile atoms, 0.0 for padding, or a
//! continuous boundary-softening value).

use super::params::{CoulombForm, GlobalParams};
use super::potentials;
use nalgebra::{Point3, Vector3};

/// One periodic dihedral component with the phase already in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicCoeff {
    pub barrier: f64,
    pub periodicity: u32,
    pub phase: f64,
}

/// Harmonic bond stretch between atoms `i` and `j`.
#[derive(Debug, Clone, PartialEq)]
pub struct StretchTerm {
    pub i: usize,
    pub j: usize,
    /// Force constant in kcal/(mol·Å²).
    pub k: f64,
    /// Equilibrium length in Angstroms.
    pub r0: f64,
}

impl StretchTerm {
    pub fn energies(&self, positions: &[Point3<f64>]) -> [f64; 3] {
        let r = (positions[self.i] - positions[self.j]).norm();
        potentials::harmonic(r, self.r0, self.k)
    }

    pub fn add_forces(
        &self,
        positions: &[Point3<f64>],
        forces: &mut [Vector3<f64>],
        weights: &[f64],
    ) {
        let rij = positions[self.i] - positions[self.j];
        let r = rij.norm();
        let [_, d1, _] = potentials::harmonic(r, self.r0, self.k);
        let gradient = d1 * (rij / r);
        forces[self.i] -= gradient * weights[self.i];
        forces[self.j] += gradient * weights[self.j];
    }
}

/// Harmonic angle bend `i - j - k` with `j` central.
#[derive(Debug, Clone, PartialEq)]
pub struct BendTerm {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    /// Force constant in kcal/(mol·rad²).
    pub k_force: f64,
    /// Equilibrium angle in radians.
    pub theta0: f64,
}

impl BendTerm {
    pub fn energies(&self, positions: &[Point3<f64>]) -> [f64; 3] {
        let (theta, _) = bend_geometry(
            &positions[self.i],
            &positions[self.j],
            &positions[self.k],
        );
        potentials::harmonic(theta, self.theta0, self.k_force)
    }

    pub fn add_forces(
        &self,
        positions: &[Point3<f64>],
        forces: &mut [Vector3<f64>],
        weights: &[f64],
    ) {
        let (theta, gradients) = bend_geometry(
            &positions[self.i],
            &positions[self.j],
            &positions[self.k],
        );
        let [_, d1, _] = potentials::harmonic(theta, self.theta0, self.k_force);
        for (idx, g) in [self.i, self.j, self.k].into_iter().zip(gradients) {
            forces[idx] -= d1 * g * weights[idx];
        }
    }
}

/// Proper torsion over the bonded chain `i - j - k - l`: a Fourier sum of up
/// to four periodic components.
#[derive(Debug, Clone, PartialEq)]
pub struct TorsionTerm {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub l: usize,
    pub terms: Vec<PeriodicCoeff>,
}

impl TorsionTerm {
    pub fn energies(&self, positions: &[Point3<f64>]) -> [f64; 3] {
        let (phi, _) = dihedral_geometry(
            &positions[self.i],
            &positions[self.j],
            &positions[self.k],
            &positions[self.l],
        );
        sum_periodic(phi, &self.terms)
    }

    pub fn add_forces(
        &self,
        positions: &[Point3<f64>],
        forces: &mut [Vector3<f64>],
        weights: &[f64],
    ) {
        add_dihedral_forces(
            [self.i, self.j, self.k, self.l],
            &self.terms,
            positions,
            forces,
            weights,
        );
    }
}

/// Improper torsion keeping apex atom `i` in the plane of its three
/// neighbors `j`, `k`, `l`; the dihedral is evaluated over the atoms in
/// listed order with a single periodic component.
#[derive(Debug, Clone, PartialEq)]
pub struct ImproperTerm {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub l: usize,
    pub term: PeriodicCoeff,
}

impl ImproperTerm {
    pub fn energies(&self, positions: &[Point3<f64>]) -> [f64; 3] {
        let (phi, _) = dihedral_geometry(
            &positions[self.i],
            &positions[self.j],
            &positions[self.k],
            &positions[self.l],
        );
        potentials::periodic(phi, self.term.barrier, self.term.periodicity, self.term.phase)
    }

    pub fn add_forces(
        &self,
        positions: &[Point3<f64>],
        forces: &mut [Vector3<f64>],
        weights: &[f64],
    ) {
        add_dihedral_forces(
            [self.i, self.j, self.k, self.l],
            std::slice::from_ref(&self.term),
            positions,
            forces,
            weights,
        );
    }
}

/// Van der Waals plus Coulomb interaction between atoms `i` and `j`, with
/// all mixing applied at construction time.
#[derive(Debug, Clone, PartialEq)]
pub struct NonBondedTerm {
    pub i: usize,
    pub j: usize,
    /// Pair equilibrium distance: the sum of the two atomic radii.
    pub r_eq: f64,
    /// Mixed, scaled well-depth coefficient.
    pub v: f64,
    /// Precomputed Coulomb coefficient (includes charges, scaling, and the
    /// dielectric).
    pub c: f64,
    pub coulomb_form: CoulombForm,
    /// Magnitude of the steepest admissible radial derivative; zero when the
    /// pair has no van der Waals component.
    pub limiting_slope: f64,
}

impl NonBondedTerm {
    /// Builds the pair term from the two atoms' parameters.
    ///
    /// The pair radius is deliberately the *sum* of the two atomic radii
    /// (not their mean), and the well depth is `sqrt((ε₁+ε₂)·unit)` rather
    /// than the geometric mean of the depths. The parameter sets consumed
    /// here are fitted against this convention; replacing it with the
    /// Lorentz-Berthelot rules changes every published energy.
    ///
    /// A negative Coulomb scale is an already-inverted exclusion divisor
    /// (`-1.2` divides the interaction by 1.2).
    ///
    /// Returns `None` when the combined radius is zero: such a pair cannot
    /// interact and is never enumerated.
    #[allow(clippy::too_many_arguments)]
    pub fn from_mixing(
        i: usize,
        j: usize,
        radii: (f64, f64),
        well_depths: (f64, f64),
        charges: (f64, f64),
        vdw_scale: f64,
        coulomb_scale: f64,
        globals: &GlobalParams,
    ) -> Option<Self> {
        let r_eq = radii.0 + radii.1;
        if r_eq == 0.0 {
            return None;
        }

        let v = ((well_depths.0 + well_depths.1) * globals.unit_conversion).sqrt() * vdw_scale;

        let coulomb_factor = if coulomb_scale < 0.0 {
            -1.0 / coulomb_scale
        } else {
            coulomb_scale
        };
        let c = potentials::COULOMB_CONSTANT * charges.0 * charges.1 * coulomb_factor
            / globals.dielectric_constant;

        let limiting_slope = if v > 0.0 {
            potentials::vdw_limiting_slope(r_eq, v)
        } else {
            0.0
        };

        Some(Self {
            i,
            j,
            r_eq,
            v,
            c,
            coulomb_form: globals.coulomb_form,
            limiting_slope,
        })
    }

    fn radial_derivatives(&self, r: f64) -> [f64; 3] {
        let lj = potentials::lennard_jones(r, self.r_eq, self.v);
        let coul = match self.coulomb_form {
            CoulombForm::InverseR => potentials::coulomb_inverse_r(r, self.c),
            CoulombForm::InverseRSquared => potentials::coulomb_inverse_r_squared(r, self.c),
        };
        [lj[0] + coul[0], lj[1] + coul[1], lj[2] + coul[2]]
    }

    /// Raw (unclamped) derivatives, so diagnostics see the true values.
    pub fn energies(&self, positions: &[Point3<f64>]) -> [f64; 3] {
        let r = (positions[self.i] - positions[self.j]).norm();
        self.radial_derivatives(r)
    }

    /// The (van der Waals, Coulomb) energy split, for per-class reporting.
    pub fn energy_components(&self, positions: &[Point3<f64>]) -> (f64, f64) {
        let r = (positions[self.i] - positions[self.j]).norm();
        let vdw = potentials::lennard_jones(r, self.r_eq, self.v)[0];
        let coulomb = match self.coulomb_form {
            CoulombForm::InverseR => potentials::coulomb_inverse_r(r, self.c)[0],
            CoulombForm::InverseRSquared => potentials::coulomb_inverse_r_squared(r, self.c)[0],
        };
        (vdw, coulomb)
    }

    pub fn add_forces(
        &self,
        positions: &[Point3<f64>],
        forces: &mut [Vector3<f64>],
        weights: &[f64],
    ) {
        let rij = positions[self.i] - positions[self.j];
        let r = rij.norm();
        let [_, mut d1, _] = self.radial_derivatives(r);
        // Bound only the repulsive extreme; the attractive branch never
        // exceeds the limiting slope on its own.
        if self.limiting_slope > 0.0 {
            d1 = d1.max(-self.limiting_slope);
        }
        let gradient = d1 * (rij / r);
        forces[self.i] -= gradient * weights[self.i];
        forces[self.j] += gradient * weights[self.j];
    }
}

fn sum_periodic(phi: f64, terms: &[PeriodicCoeff]) -> [f64; 3] {
    let mut acc = [0.0; 3];
    for t in terms {
        let part = potentials::periodic(phi, t.barrier, t.periodicity, t.phase);
        acc[0] += part[0];
        acc[1] += part[1];
        acc[2] += part[2];
    }
    acc
}

fn add_dihedral_forces(
    indices: [usize; 4],
    terms: &[PeriodicCoeff],
    positions: &[Point3<f64>],
    forces: &mut [Vector3<f64>],
    weights: &[f64],
) {
    let (phi, gradients) = dihedral_geometry(
        &positions[indices[0]],
        &positions[indices[1]],
        &positions[indices[2]],
        &positions[indices[3]],
    );
    let [_, d1, _] = sum_periodic(phi, terms);
    for (idx, g) in indices.into_iter().zip(gradients) {
        forces[idx] -= d1 * g * weights[idx];
    }
}

/// Unsigned angle at `j` and the gradient of the angle with respect to each
/// atom, built from the plane normal. Collinear arms make the normal
/// unnormalizable and propagate NaN, which the diagnostics pass reports.
fn bend_geometry(
    p_i: &Point3<f64>,
    p_j: &Point3<f64>,
    p_k: &Point3<f64>,
) -> (f64, [Vector3<f64>; 3]) {
    let u = p_i - p_j;
    let v = p_k - p_j;
    let u_len = u.norm();
    let v_len = v.norm();

    let normal = u.cross(&v);
    let theta = normal.norm().atan2(u.dot(&v));
    let n_hat = normal / normal.norm();

    let g_i = (u / u_len).cross(&n_hat) / u_len;
    let g_k = n_hat.cross(&(v / v_len)) / v_len;
    let g_j = -(g_i + g_k);
    (theta, [g_i, g_j, g_k])
}

/// Signed dihedral over the chain `i - j - k - l` and the gradient of the
/// angle with respect to each atom.
///
/// End-atom gradients point along the two plane normals scaled by
/// `|b₂|/|m|²`; the middle-atom gradients are reconstructed from the end
/// gradients through the bond-projection coefficients, which keeps the total
/// force and torque exactly zero and stays well-behaved near φ = 0 and π.
fn dihedral_geometry(
    p_i: &Point3<f64>,
    p_j: &Point3<f64>,
    p_k: &Point3<f64>,
    p_l: &Point3<f64>,
) -> (f64, [Vector3<f64>; 4]) {
    let b1 = p_j - p_i;
    let b2 = p_k - p_j;
    let b3 = p_l - p_k;

    let m = b1.cross(&b2);
    let n = b2.cross(&b3);
    let b2_len = b2.norm();

    let phi = (m.cross(&n).dot(&b2) / b2_len).atan2(m.dot(&n));

    let g_i = -(b2_len / m.norm_squared()) * m;
    let g_l = (b2_len / n.norm_squared()) * n;

    let proj_1 = b1.dot(&b2) / b2.norm_squared();
    let proj_3 = b3.dot(&b2) / b2.norm_squared();
    let g_j = (proj_1 - 1.0) * g_i - proj_3 * g_l;
    let g_k = (proj_3 - 1.0) * g_l - proj_1 * g_i;

    (phi, [g_i, g_j, g_k, g_l])
}
