//! Term enumeration: walking the local adjacency list to emit canonical,
//! deduplicated bonded terms and cutoff-filtered non-bonded pairs.
//!
//! Only mobile atoms originate terms; padding atoms participate as partners.
//! Because mobile atoms always occupy the lower local indices, the
//! `i mobile, j > i` loops cover every pair that involves at least one
//! mobile atom exactly once.

use super::context::EvaluationContext;
use crate::core::forcefield::params::Parameters;
use crate::core::forcefield::terms::{
    BendTerm, ImproperTerm, NonBondedTerm, PeriodicCoeff, StretchTerm, TorsionTerm,
};
use itertools::Itertools;
use tracing::debug;

/// The torsion Fourier sum carries at most this many periodic components.
const MAX_TORSION_COMPONENTS: usize = 4;

/// All terms produced for one evaluation context, grouped by class.
#[derive(Debug, Clone, Default)]
pub struct TermLists {
    pub stretches: Vec<StretchTerm>,
    pub bends: Vec<BendTerm>,
    pub torsions: Vec<TorsionTerm>,
    pub impropers: Vec<ImproperTerm>,
    pub non_bonded: Vec<NonBondedTerm>,
}

impl TermLists {
    pub fn total(&self) -> usize {
        self.stretches.len()
            + self.bends.len()
            + self.torsions.len()
            + self.impropers.len()
            + self.non_bonded.len()
    }
}

/// How many bonded queries found no matching parameter entry. Dropped terms
/// are expected for sparse parameter coverage (padding especially) and are
/// never fatal; callers can surface these counts to judge reliability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnmatchedCounts {
    pub stretch: usize,
    pub bend: usize,
    /// Counted once per `(i, j, k)` triple that had chain candidates but no
    /// matching entry.
    pub torsion: usize,
    /// Counted once per apex atom with no matching neighbor permutation.
    pub improper: usize,
}

impl UnmatchedCounts {
    pub fn total(&self) -> usize {
        self.stretch + self.bend + self.torsion + self.improper
    }
}

pub(crate) fn enumerate(
    ctx: &EvaluationContext,
    params: &Parameters,
) -> (TermLists, UnmatchedCounts) {
    let mut terms = TermLists::default();
    let mut unmatched = UnmatchedCounts::default();

    let n = ctx.n_atoms();
    let types = ctx.types();
    let positions = ctx.positions();
    let charges = ctx.charges();
    let cutoff_sq = params.globals.cutoff_distance * params.globals.cutoff_distance;

    for i in 0..n {
        if !ctx.is_mobile(i) {
            continue;
        }

        enumerate_stretches(ctx, params, i, types, &mut terms, &mut unmatched);
        enumerate_bends(ctx, params, i, types, &mut terms, &mut unmatched);
        enumerate_torsions(ctx, params, i, types, &mut terms, &mut unmatched);
        enumerate_impropers(ctx, params, i, types, &mut terms, &mut unmatched);

        // Non-bonded pairs: everything above `i` within the cutoff.
        let within_three_bonds = ctx.bonded_distances(i);
        for j in (i + 1)..n {
            let dist_sq = (positions[i] - positions[j]).norm_squared();
            if dist_sq >= cutoff_sq {
                continue;
            }
            let class = within_three_bonds.get(&j).copied().unwrap_or(0) as usize;
            if let Some(term) = NonBondedTerm::from_mixing(
                i,
                j,
                (ctx.radius(i), ctx.radius(j)),
                (ctx.well_depth(i), ctx.well_depth(j)),
                (charges[i], charges[j]),
                params.scaling.vdw[class],
                params.scaling.coulomb[class],
                &params.globals,
            ) {
                terms.non_bonded.push(term);
            }
        }
    }

    (terms, unmatched)
}

fn enumerate_stretches(
    ctx: &EvaluationContext,
    params: &Parameters,
    i: usize,
    types: &[String],
    terms: &mut TermLists,
    unmatched: &mut UnmatchedCounts,
) {
    for &j in ctx.neighbors(i) {
        if j <= i {
            continue;
        }
        match params.stretch([types[i].as_str(), types[j].as_str()]) {
            Some(p) => terms.stretches.push(StretchTerm {
                i,
                j,
                k: p.k,
                r0: p.r0,
            }),
            None => {
                unmatched.stretch += 1;
                debug!(
                    "No stretch parameters for ({}, {}); term dropped",
                    types[i], types[j]
                );
            }
        }
    }
}

fn enumerate_bends(
    ctx: &EvaluationContext,
    params: &Parameters,
    i: usize,
    types: &[String],
    terms: &mut TermLists,
    unmatched: &mut UnmatchedCounts,
) {
    for &j in ctx.neighbors(i) {
        for &k in ctx.neighbors(j) {
            if k == i || k <= i {
                continue;
            }
            match params.bend([types[i].as_str(), types[j].as_str(), types[k].as_str()]) {
                Some(p) => terms.bends.push(BendTerm {
                    i,
                    j,
                    k,
                    k_force: p.k,
                    theta0: p.theta0.to_radians(),
                }),
                None => {
                    unmatched.bend += 1;
                    debug!(
                        "No bend parameters for ({}, {}, {}); term dropped",
                        types[i], types[j], types[k]
                    );
                }
            }
        }
    }
}

fn enumerate_torsions(
    ctx: &EvaluationContext,
    params: &Parameters,
    i: usize,
    types: &[String],
    terms: &mut TermLists,
    unmatched: &mut UnmatchedCounts,
) {
    for &j in ctx.neighbors(i) {
        for &k in ctx.neighbors(j) {
            if k == i {
                continue;
            }
            let mut had_candidate = false;
            let mut matched = false;
            for &l in ctx.neighbors(k) {
                if l == j || l <= i {
                    continue;
                }
                had_candidate = true;
                if let Some(p) = params.torsion([
                    types[i].as_str(),
                    types[j].as_str(),
                    types[k].as_str(),
                    types[l].as_str(),
                ]) {
                    terms.torsions.push(TorsionTerm {
                        i,
                        j,
                        k,
                        l,
                        terms: periodic_coeffs(p),
                    });
                    matched = true;
                    // Deliberate single-winner policy: the dihedral around
                    // the (i, j, k) chain is represented by one term; the
                    // first matching fourth atom wins and the search stops.
                    break;
                }
            }
            if had_candidate && !matched {
                unmatched.torsion += 1;
                debug!(
                    "No torsion parameters around ({}, {}, {}); triple dropped",
                    types[i], types[j], types[k]
                );
            }
        }
    }
}

fn enumerate_impropers(
    ctx: &EvaluationContext,
    params: &Parameters,
    i: usize,
    types: &[String],
    terms: &mut TermLists,
    unmatched: &mut UnmatchedCounts,
) {
    // Improper apexes are atoms with exactly three neighbors; every
    // assignment of the neighbors to the three planar roles is tried, and
    // all matches are kept.
    if ctx.neighbors(i).len() != 3 {
        return;
    }
    let mut matched_any = false;
    for perm in ctx.neighbors(i).iter().copied().permutations(3) {
        let (j, k, l) = (perm[0], perm[1], perm[2]);
        if let Some(p) = params.improper([
            types[i].as_str(),
            types[j].as_str(),
            types[k].as_str(),
            types[l].as_str(),
        ]) {
            terms.impropers.push(ImproperTerm {
                i,
                j,
                k,
                l,
                term: PeriodicCoeff {
                    barrier: p.term.barrier,
                    periodicity: p.term.periodicity,
                    phase: p.term.phase.to_radians(),
                },
            });
            matched_any = true;
        }
    }
    if !matched_any {
        unmatched.improper += 1;
        debug!("No improper parameters for apex type {}", types[i]);
    }
}

fn periodic_coeffs(params: &crate::core::forcefield::params::TorsionParams) -> Vec<PeriodicCoeff> {
    if params.terms.len() > MAX_TORSION_COMPONENTS {
        debug!(
            "Torsion entry for {:?} has {} components; keeping the first {}",
            params.types,
            params.terms.len(),
            MAX_TORSION_COMPONENTS
        );
    }
    params
        .terms
        .iter()
        .take(MAX_TORSION_COMPONENTS)
        .map(|t| PeriodicCoeff {
            barrier: t.barrier,
            periodicity: t.periodicity,
            phase: t.phase.to_radians(),
        })
        .collect()
}
