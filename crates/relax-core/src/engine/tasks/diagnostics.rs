//! Numeric-instability diagnostics.
//!
//! Re-evaluates every term's internal-coordinate derivatives and yields the
//! ones that are NaN or infinite (coincident atoms, collinear bend arms, and
//! similar degenerate geometry). Nothing is corrected here: the caller
//! decides whether to reject the evaluation and repair the structure.

use crate::engine::context::EvaluationContext;
use std::fmt;

/// Which class of interaction term a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    Stretch,
    Bend,
    Torsion,
    Improper,
    NonBonded,
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Stretch => "stretch",
                Self::Bend => "bend",
                Self::Torsion => "torsion",
                Self::Improper => "improper",
                Self::NonBonded => "non-bonded",
            }
        )
    }
}

/// One numerically invalid term: its kind, the local indices of its member
/// atoms, and the offending derivative triple.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidTerm {
    pub kind: TermKind,
    pub atoms: Vec<usize>,
    pub derivatives: [f64; 3],
}

pub(crate) fn run(ctx: &EvaluationContext) -> impl Iterator<Item = InvalidTerm> + '_ {
    let positions = ctx.positions();
    let terms = ctx.terms();

    let stretches = terms
        .stretches
        .iter()
        .filter_map(move |t| check(TermKind::Stretch, vec![t.i, t.j], t.energies(positions)));
    let bends = terms
        .bends
        .iter()
        .filter_map(move |t| check(TermKind::Bend, vec![t.i, t.j, t.k], t.energies(positions)));
    let torsions = terms.torsions.iter().filter_map(move |t| {
        check(
            TermKind::Torsion,
            vec![t.i, t.j, t.k, t.l],
            t.energies(positions),
        )
    });
    let impropers = terms.impropers.iter().filter_map(move |t| {
        check(
            TermKind::Improper,
            vec![t.i, t.j, t.k, t.l],
            t.energies(positions),
        )
    });
    let non_bonded = terms
        .non_bonded
        .iter()
        .filter_map(move |t| check(TermKind::NonBonded, vec![t.i, t.j], t.energies(positions)));

    stretches
        .chain(bends)
        .chain(torsions)
        .chain(impropers)
        .chain(non_bonded)
}

fn check(kind: TermKind, atoms: Vec<usize>, derivatives: [f64; 3]) -> Option<InvalidTerm> {
    if derivatives.iter().any(|d| !d.is_finite()) {
        Some(InvalidTerm {
            kind,
            atoms,
            derivatives,
        })
    } else {
        None
    }
}
