//! Pure functional forms of the force field.
//!
//! Every function returns the triple `[E, E', E'']` of the potential and its
//! first two derivatives with respect to the internal coordinate (a distance,
//! an angle in radians, or a dihedral in radians). There is no guarding of
//! degenerate geometry here: a zero distance yields infinities or NaNs, which
//! the diagnostics task reports instead of masking.

/// Conversion factor for electrostatic energies, in kcal·Å/(mol·e²).
pub(crate) const COULOMB_CONSTANT: f64 = 332.0637;

/// Harmonic potential `E = k(x - x0)²`.
#[inline]
pub fn harmonic(x: f64, x0: f64, k: f64) -> [f64; 3] {
    let d = x - x0;
    [k * d * d, 2.0 * k * d, 2.0 * k]
}

/// One periodic term `E = (V/2)(1 + cos(nφ - γ))`.
#[inline]
pub fn periodic(phi: f64, barrier: f64, periodicity: u32, phase: f64) -> [f64; 3] {
    let n = periodicity as f64;
    let arg = n * phi - phase;
    let half_v = barrier / 2.0;
    [
        half_v * (1.0 + arg.cos()),
        -half_v * n * arg.sin(),
        -half_v * n * n * arg.cos(),
    ]
}

/// Lennard-Jones form `E = v(x¹² - 2x⁶)` with `x = r_eq / r`.
///
/// `r_eq` is the pairwise equilibrium distance (the sum of the two atomic
/// radii) and `v` the mixed well-depth coefficient. The minimum is `-v` at
/// `r = r_eq`.
#[inline]
pub fn lennard_jones(r: f64, r_eq: f64, v: f64) -> [f64; 3] {
    let x = r_eq / r;
    let x6 = x.powi(6);
    let x12 = x6 * x6;
    [
        v * (x12 - 2.0 * x6),
        -(12.0 * v / r) * (x12 - x6),
        (v / (r * r)) * (156.0 * x12 - 84.0 * x6),
    ]
}

/// Coulomb potential `E = c/r` for a precomputed pair coefficient `c`.
#[inline]
pub fn coulomb_inverse_r(r: f64, c: f64) -> [f64; 3] {
    [c / r, -c / (r * r), 2.0 * c / (r * r * r)]
}

/// Coulomb potential `E = c/r²` (distance-dependent dielectric form).
#[inline]
pub fn coulomb_inverse_r_squared(r: f64, c: f64) -> [f64; 3] {
    let r2 = r * r;
    [c / r2, -2.0 * c / (r2 * r), 6.0 * c / (r2 * r2)]
}

/// The magnitude of the Lennard-Jones slope at its inflection point,
/// `(12v/r_eq)·(6/13)·(7/13)^(7/6)`.
///
/// This is the steepest physically meaningful gradient of the pair
/// potential: beyond it (toward overlap) the combined derivative is clamped
/// so near-coincident atoms cannot produce runaway forces. Only the
/// repulsive extreme is ever clamped; the attractive branch never exceeds
/// this slope on its own.
#[inline]
pub fn vdw_limiting_slope(r_eq: f64, v: f64) -> f64 {
    (12.0 * v / r_eq) * (6.0 / 13.0) * (7.0f64 / 13.0).powf(7.0 / 6.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn harmonic_is_zero_at_equilibrium() {
        let [e, d1, d2] = harmonic(1.54, 1.54, 300.0);
        assert!(f64_approx_equal(e, 0.0));
        assert!(f64_approx_equal(d1, 0.0));
        assert!(f64_approx_equal(d2, 600.0));
    }

    #[test]
    fn harmonic_value_and_slope_away_from_equilibrium() {
        let [e, d1, _] = harmonic(2.0, 1.5, 100.0);
        assert!(f64_approx_equal(e, 25.0));
        assert!(f64_approx_equal(d1, 100.0));
    }

    #[test]
    fn periodic_is_periodic_in_two_pi_over_n() {
        let phi = 0.73;
        for n in 1..=4u32 {
            let period = 2.0 * std::f64::consts::PI / n as f64;
            let a = periodic(phi, 2.5, n, 0.4);
            let b = periodic(phi + period, 2.5, n, 0.4);
            assert!(f64_approx_equal(a[0], b[0]));
            assert!(f64_approx_equal(a[1], b[1]));
        }
    }

    #[test]
    fn periodic_maximum_at_zero_offset() {
        let [e, d1, d2] = periodic(0.0, 4.0, 2, 0.0);
        assert!(f64_approx_equal(e, 4.0));
        assert!(f64_approx_equal(d1, 0.0));
        assert!(d2 < 0.0);
    }

    #[test]
    fn lennard_jones_minimum_at_equilibrium_distance() {
        let [e, d1, d2] = lennard_jones(3.4, 3.4, 0.1);
        assert!(f64_approx_equal(e, -0.1));
        assert!(f64_approx_equal(d1, 0.0));
        assert!(d2 > 0.0);
    }

    #[test]
    fn lennard_jones_repulsive_slope_is_negative_inside_equilibrium() {
        let [e, d1, _] = lennard_jones(2.0, 3.4, 0.1);
        assert!(e > 0.0);
        assert!(d1 < 0.0);
    }

    #[test]
    fn lennard_jones_slope_matches_limiting_slope_at_inflection() {
        let r_eq = 3.0;
        let v = 0.2;
        let r_inflection = r_eq * (13.0f64 / 7.0).powf(1.0 / 6.0);
        let [_, d1, d2] = lennard_jones(r_inflection, r_eq, v);
        assert!(d2.abs() < 1e-9);
        assert!((d1 - vdw_limiting_slope(r_eq, v)).abs() < 1e-9);
    }

    #[test]
    fn coulomb_inverse_r_values_and_derivatives() {
        let [e, d1, d2] = coulomb_inverse_r(2.0, 8.0);
        assert!(f64_approx_equal(e, 4.0));
        assert!(f64_approx_equal(d1, -2.0));
        assert!(f64_approx_equal(d2, 2.0));
    }

    #[test]
    fn coulomb_inverse_r_squared_values_and_derivatives() {
        let [e, d1, d2] = coulomb_inverse_r_squared(2.0, 8.0);
        assert!(f64_approx_equal(e, 2.0));
        assert!(f64_approx_equal(d1, -2.0));
        assert!(f64_approx_equal(d2, 3.0));
    }

    #[test]
    fn zero_distance_produces_non_finite_values_instead_of_guards() {
        let [e, d1, _] = lennard_jones(0.0, 3.4, 0.1);
        assert!(!e.is_finite() || e.is_nan());
        assert!(!d1.is_finite() || d1.is_nan());
        let [e, _, _] = coulomb_inverse_r(0.0, 1.0);
        assert!(!e.is_finite());
    }
}
