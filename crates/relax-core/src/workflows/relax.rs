//! The end-to-end relaxation workflow: parameterize, build the evaluation
//! context, and iterate clamped steepest-descent steps for the configured
//! number of iterations, reporting progress along the way.

use crate::core::forcefield::energy::EnergyBreakdown;
use crate::core::forcefield::parameterization::Parameterizer;
use crate::core::forcefield::params::Parameters;
use crate::core::models::system::MolecularSystem;
use crate::engine::config::{RelaxConfig, TermClasses};
use crate::engine::context::EvaluationContext;
use crate::engine::error::EngineError;
use crate::engine::minimization;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{info, instrument};

/// Summary of one relaxation run.
#[derive(Debug, Clone, PartialEq)]
pub struct RelaxOutcome {
    pub iterations_run: usize,
    pub final_energy: EnergyBreakdown,
    /// Largest single-atom displacement of the final step, in Å.
    pub last_max_displacement: f64,
    /// Bonded type tuples with no parameter entry, summed over classes.
    pub unmatched_terms: usize,
    /// Numerically invalid terms found in the starting geometry.
    pub invalid_terms: usize,
}

/// Runs `config.iterations` descent steps over the configured mobile region
/// and writes the relaxed positions back into `system`.
///
/// The evaluation context is built once and optionally rebuilt every
/// `config.rebuild_interval` iterations to refresh the non-bonded pair list
/// as atoms move. Numerically invalid terms in the starting geometry are
/// reported but do not abort the run; the caller decides whether the count
/// warrants fixing the structure first.
#[instrument(skip_all, name = "relax_workflow")]
pub fn run(
    system: &mut MolecularSystem,
    params: &Parameters,
    config: &RelaxConfig,
    reporter: &ProgressReporter<'_>,
) -> Result<RelaxOutcome, EngineError> {
    let unresolved = Parameterizer::new(params).parameterize_system(system);
    if unresolved > 0 {
        info!("{unresolved} atoms have no atomic parameters; their van der Waals pairs are skipped");
    }

    reporter.report(Progress::RelaxStart {
        iterations: config.iterations,
    });

    let classes = TermClasses::all();
    let mut ctx = EvaluationContext::build(system, &config.region, params)?;

    let invalid_terms = ctx.invalid_terms().count();
    if invalid_terms > 0 {
        reporter.report(Progress::Message(format!(
            "{invalid_terms} numerically invalid terms in the starting geometry"
        )));
    }
    let unmatched_terms = ctx.unmatched().total();

    let mut last_max_displacement = 0.0;
    for iteration in 0..config.iterations {
        if config.rebuild_interval > 0 && iteration > 0 && iteration % config.rebuild_interval == 0
        {
            ctx.apply_positions(system);
            ctx = EvaluationContext::build(system, &config.region, params)?;
        }

        let forces = ctx.compute_forces(&classes);
        last_max_displacement =
            minimization::take_step(&mut ctx, &forces, config.step_size, config.max_step)?;

        if reporter.is_active() {
            reporter.report(Progress::Iteration {
                index: iteration,
                max_displacement: last_max_displacement,
                total_energy: ctx.energy_breakdown().total(),
            });
        }
    }

    ctx.apply_positions(system);
    let final_energy = ctx.energy_breakdown();
    reporter.report(Progress::RelaxFinish);

    Ok(RelaxOutcome {
        iterations_run: config.iterations,
        final_energy,
        last_max_displacement,
        unmatched_terms,
        invalid_terms,
    })
}
