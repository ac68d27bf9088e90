//! Force accumulation over the enabled term classes.
//!
//! Every term adds its analytic gradient into a shared per-atom force array.
//! In the parallel build each worker folds into its own buffer and the
//! buffers are summed afterwards, so no two threads ever write the same
//! array; floating-point summation order is therefore not identical between
//! the parallel and sequential paths, only equivalent within tolerance.

use crate::engine::config::TermClasses;
use crate::engine::context::EvaluationContext;
use nalgebra::Vector3;
use tracing::instrument;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[instrument(skip_all, name = "forces_task")]
pub(crate) fn run(ctx: &EvaluationContext, classes: &TermClasses) -> Vec<Vector3<f64>> {
    let n = ctx.n_atoms();
    let positions = ctx.positions();
    let weights = ctx.force_weights();
    let terms = ctx.terms();

    let mut forces = vec![Vector3::zeros(); n];

    if classes.stretch {
        accumulate_class(
            n,
            &terms.stretches,
            |t, buf| t.add_forces(positions, buf, weights),
            &mut forces,
        );
    }
    if classes.bend {
        accumulate_class(
            n,
            &terms.bends,
            |t, buf| t.add_forces(positions, buf, weights),
            &mut forces,
        );
    }
    if classes.torsion {
        accumulate_class(
            n,
            &terms.torsions,
            |t, buf| t.add_forces(positions, buf, weights),
            &mut forces,
        );
    }
    if classes.improper {
        accumulate_class(
            n,
            &terms.impropers,
            |t, buf| t.add_forces(positions, buf, weights),
            &mut forces,
        );
    }
    if classes.non_bonded {
        accumulate_class(
            n,
            &terms.non_bonded,
            |t, buf| t.add_forces(positions, buf, weights),
            &mut forces,
        );
    }

    forces
}

/// Adds one term class into `total`. The parallel path gives every worker a
/// private buffer and reduces the buffers sequentially afterwards.
fn accumulate_class<T, F>(n: usize, terms: &[T], apply: F, total: &mut [Vector3<f64>])
where
    T: Sync,
    F: Fn(&T, &mut [Vector3<f64>]) + Send + Sync,
{
    debug_assert_eq!(total.len(), n);

    #[cfg(feature = "parallel")]
    {
        let partial = terms
            .par_iter()
            .fold(
                || vec![Vector3::zeros(); n],
                |mut buffer, term| {
                    apply(term, &mut buffer);
                    buffer
                },
            )
            .reduce(
                || vec![Vector3::zeros(); n],
                |mut a, b| {
                    for (x, y) in a.iter_mut().zip(b) {
                        *x += y;
                    }
                    a
                },
            );
        for (t, p) in total.iter_mut().zip(partial) {
            *t += p;
        }
    }

    #[cfg(not(feature = "parallel"))]
    for term in terms {
        apply(term, total);
    }
}
