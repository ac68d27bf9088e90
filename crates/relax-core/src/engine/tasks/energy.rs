//! Per-class energy totals over a whole evaluation context.

use crate::core::forcefield::energy::EnergyBreakdown;
use crate::engine::context::EvaluationContext;
use nalgebra::Point3;
use tracing::instrument;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[instrument(skip_all, name = "energy_task")]
pub(crate) fn run(ctx: &EvaluationContext) -> EnergyBreakdown {
    let positions = ctx.positions();
    let terms = ctx.terms();

    let mut breakdown = EnergyBreakdown {
        stretch: class_energy(&terms.stretches, |t| t.energies(positions)[0]),
        bend: class_energy(&terms.bends, |t| t.energies(positions)[0]),
        torsion: class_energy(&terms.torsions, |t| t.energies(positions)[0]),
        improper: class_energy(&terms.impropers, |t| t.energies(positions)[0]),
        ..Default::default()
    };

    let (vdw, coulomb) = non_bonded_energy(ctx, positions);
    breakdown.vdw = vdw;
    breakdown.coulomb = coulomb;
    breakdown
}

fn class_energy<T, F>(terms: &[T], energy: F) -> f64
where
    T: Sync,
    F: Fn(&T) -> f64 + Send + Sync,
{
    #[cfg(feature = "parallel")]
    {
        terms.par_iter().map(energy).sum()
    }
    #[cfg(not(feature = "parallel"))]
    {
        terms.iter().map(energy).sum()
    }
}

fn non_bonded_energy(ctx: &EvaluationContext, positions: &[Point3<f64>]) -> (f64, f64) {
    let pair = |t: &crate::core::forcefield::terms::NonBondedTerm| t.energy_components(positions);

    #[cfg(feature = "parallel")]
    {
        ctx.terms()
            .non_bonded
            .par_iter()
            .map(pair)
            .reduce(|| (0.0, 0.0), |a, b| (a.0 + b.0, a.1 + b.1))
    }
    #[cfg(not(feature = "parallel"))]
    {
        ctx.terms()
            .non_bonded
            .iter()
            .map(pair)
            .fold((0.0, 0.0), |a, b| (a.0 + b.0, a.1 + b.1))
    }
}
