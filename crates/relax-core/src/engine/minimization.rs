//! The position stepper: a single clamped steepest-descent update.

use super::context::EvaluationContext;
use super::error::EngineError;
use nalgebra::Vector3;

/// Moves every atom by `force · step_size`, first rescaling the step
/// uniformly so the largest single-atom displacement never exceeds
/// `max_step`. Padding atoms carry zero force (their weight is zero), so
/// only mobile atoms move.
///
/// This is one descent step, not a minimizer: callers loop, and rebuild or
/// re-evaluate the context as the geometry changes. The stepped positions
/// live in the context until
/// [`EvaluationContext::apply_positions`] writes them back.
///
/// Returns the largest displacement actually applied.
pub fn take_step(
    ctx: &mut EvaluationContext,
    forces: &[Vector3<f64>],
    step_size: f64,
    max_step: f64,
) -> Result<f64, EngineError> {
    if forces.len() != ctx.n_atoms() {
        return Err(EngineError::ForceArrayMismatch {
            expected: ctx.n_atoms(),
            found: forces.len(),
        });
    }

    let largest = forces.iter().map(|f| f.norm()).fold(0.0f64, f64::max) * step_size;
    let effective_step = if largest > max_step {
        step_size * max_step / largest
    } else {
        step_size
    };

    for (position, force) in ctx.positions_mut().iter_mut().zip(forces) {
        *position += force * effective_step;
    }

    Ok(largest.min(max_step))
}
