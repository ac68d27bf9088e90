use super::config::{RelaxationRegion, TermClasses};
use super::enumeration::{self, TermLists, UnmatchedCounts};
use super::error::EngineError;
use super::tasks;
use crate::core::forcefield::energy::EnergyBreakdown;
use crate::core::forcefield::params::Parameters;
use crate::core::models::atom::CachedAtomicParams;
use crate::core::models::ids::{AtomId, ResidueId};
use crate::core::models::system::MolecularSystem;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::{Point3, Vector3};
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument, warn};

/// One evaluation's working state: a snapshot of the selected region in a
/// dense local index space, plus the interaction terms enumerated over it.
///
/// Local indices are assigned mobile residues first (sorted by chain id and
/// residue number), then padding residues, with atoms in residue insertion
/// order. The layout is deterministic for a fixed structure and selection,
/// and indices stay valid for the lifetime of the context only.
///
/// A context belongs to one evaluation session; the parameter database it
/// was built from may be shared freely, the context itself may not.
#[derive(Debug)]
pub struct EvaluationContext {
    positions: Vec<Point3<f64>>,
    types: Vec<String>,
    charges: Vec<f64>,
    radii: Vec<f64>,
    well_depths: Vec<f64>,
    mobile: Vec<bool>,
    force_weights: Vec<f64>,
    adjacency: Vec<Vec<usize>>,
    atom_ids: Vec<AtomId>,
    terms: TermLists,
    unmatched: UnmatchedCounts,
}

impl EvaluationContext {
    /// Builds the context: resolves the mobile residue set, collects padding
    /// residues within the non-bonded cutoff of any mobile atom, snapshots
    /// the working arrays, and enumerates all interaction terms.
    #[instrument(skip_all, name = "context_build")]
    pub fn build(
        system: &MolecularSystem,
        region: &RelaxationRegion,
        params: &Parameters,
    ) -> Result<Self, EngineError> {
        let mobile_residues = resolve_region(system, region)?;
        if mobile_residues.is_empty() {
            return Err(EngineError::EmptySelection);
        }

        let mut mobile_sorted: Vec<ResidueId> = mobile_residues.iter().copied().collect();
        mobile_sorted.sort_by_key(|&id| residue_sort_key(system, id));

        let padding_sorted = if matches!(region, RelaxationRegion::All) {
            Vec::new()
        } else {
            find_padding_residues(system, &mobile_sorted, &mobile_residues, params)?
        };

        let mut ctx = Self {
            positions: Vec::new(),
            types: Vec::new(),
            charges: Vec::new(),
            radii: Vec::new(),
            well_depths: Vec::new(),
            mobile: Vec::new(),
            force_weights: Vec::new(),
            adjacency: Vec::new(),
            atom_ids: Vec::new(),
            terms: TermLists::default(),
            unmatched: UnmatchedCounts::default(),
        };

        let mut index_map: HashMap<AtomId, usize> = HashMap::new();
        for (residues, is_mobile) in [(&mobile_sorted, true), (&padding_sorted, false)] {
            for &residue_id in residues.iter() {
                let residue = system.residue(residue_id).unwrap();
                for &atom_id in residue.atoms() {
                    let atom = system.atom(atom_id).unwrap();
                    index_map.insert(atom_id, ctx.positions.len());
                    ctx.positions.push(atom.position);
                    ctx.types.push(atom.force_field_type.clone());
                    ctx.charges.push(atom.partial_charge);
                    let (radius, well_depth) = match atom.non_bonded {
                        CachedAtomicParams::Resolved {
                            radius, well_depth, ..
                        } => (radius, well_depth),
                        CachedAtomicParams::None => (0.0, 0.0),
                    };
                    ctx.radii.push(radius);
                    ctx.well_depths.push(well_depth);
                    ctx.mobile.push(is_mobile);
                    ctx.force_weights.push(if is_mobile { 1.0 } else { 0.0 });
                    ctx.atom_ids.push(atom_id);
                }
            }
        }

        let mut dropped_neighbors = 0usize;
        for &atom_id in ctx.atom_ids.iter() {
            let mut neighbors = Vec::new();
            if let Some(bonded) = system.get_bonded_neighbors(atom_id) {
                for &neighbor_id in bonded {
                    match index_map.get(&neighbor_id) {
                        Some(&local) => neighbors.push(local),
                        None => {
                            dropped_neighbors += 1;
                            debug!(
                                "Bonded neighbor of atom {:?} lies outside the working set; \
                                 the bond is ignored for this evaluation",
                                atom_id
                            );
                        }
                    }
                }
            }
            ctx.adjacency.push(neighbors);
        }
        if dropped_neighbors > 0 {
            warn!(
                "{dropped_neighbors} bonded neighbors fall outside the working set; their \
                 bonded terms are dropped for this evaluation"
            );
        }

        let (terms, unmatched) = enumeration::enumerate(&ctx, params);
        ctx.terms = terms;
        ctx.unmatched = unmatched;
        debug!(
            atoms = ctx.positions.len(),
            terms = ctx.terms.total(),
            unmatched = ctx.unmatched.total(),
            "Evaluation context built"
        );

        Ok(ctx)
    }

    pub fn n_atoms(&self) -> usize {
        self.positions.len()
    }

    pub fn is_mobile(&self, index: usize) -> bool {
        self.mobile[index]
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub(crate) fn positions_mut(&mut self) -> &mut [Point3<f64>] {
        &mut self.positions
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn charges(&self) -> &[f64] {
        &self.charges
    }

    pub(crate) fn radius(&self, index: usize) -> f64 {
        self.radii[index]
    }

    pub(crate) fn well_depth(&self, index: usize) -> f64 {
        self.well_depths[index]
    }

    pub fn atom_id(&self, index: usize) -> AtomId {
        self.atom_ids[index]
    }

    pub fn neighbors(&self, index: usize) -> &[usize] {
        &self.adjacency[index]
    }

    pub fn force_weights(&self) -> &[f64] {
        &self.force_weights
    }

    /// Overrides the force multiplier of one atom, e.g. to soften the
    /// mobile/padding boundary with fractional weights.
    pub fn set_force_weight(&mut self, index: usize, weight: f64) {
        self.force_weights[index] = weight;
    }

    pub fn terms(&self) -> &TermLists {
        &self.terms
    }

    pub fn unmatched(&self) -> &UnmatchedCounts {
        &self.unmatched
    }

    /// Bonded graph distance between two atoms: 1, 2, or 3 bonds, 0 for the
    /// atom itself, or -1 when no path of three bonds or fewer exists. Used
    /// to pick the non-bonded exclusion/scaling class.
    pub fn graph_distance(&self, i: usize, j: usize) -> i32 {
        if i == j {
            return 0;
        }
        self.bonded_distances(i)
            .get(&j)
            .map(|&d| d as i32)
            .unwrap_or(-1)
    }

    /// Every atom within three bonds of `start`, with its bond distance.
    pub(crate) fn bonded_distances(&self, start: usize) -> HashMap<usize, u8> {
        let mut distances: HashMap<usize, u8> = HashMap::new();
        distances.insert(start, 0);
        let mut frontier = vec![start];
        for depth in 1..=3u8 {
            let mut next = Vec::new();
            for &a in &frontier {
                for &b in &self.adjacency[a] {
                    if !distances.contains_key(&b) {
                        distances.insert(b, depth);
                        next.push(b);
                    }
                }
            }
            frontier = next;
        }
        distances.remove(&start);
        distances
    }

    /// Total forces over the enabled term classes.
    pub fn compute_forces(&self, classes: &TermClasses) -> Vec<Vector3<f64>> {
        tasks::forces::run(self, classes)
    }

    /// Per-class energy totals for the whole context.
    pub fn energy_breakdown(&self) -> EnergyBreakdown {
        tasks::energy::run(self)
    }

    /// Lazily re-evaluates every term and yields the numerically invalid
    /// ones (NaN or infinite derivatives), for the caller to act on.
    pub fn invalid_terms(&self) -> impl Iterator<Item = tasks::diagnostics::InvalidTerm> + '_ {
        tasks::diagnostics::run(self)
    }

    /// Writes the context's (possibly stepped) positions back to the
    /// structure the snapshot was taken from.
    pub fn apply_positions(&self, system: &mut MolecularSystem) {
        for (local, &atom_id) in self.atom_ids.iter().enumerate() {
            if let Some(atom) = system.atom_mut(atom_id) {
                atom.position = self.positions[local];
            }
        }
    }
}

fn residue_sort_key(system: &MolecularSystem, residue_id: ResidueId) -> (char, isize) {
    let residue = system.residue(residue_id).unwrap();
    let chain_char = system.chain(residue.chain_id).map(|c| c.id).unwrap_or('\0');
    (chain_char, residue.residue_number)
}

fn resolve_region(
    system: &MolecularSystem,
    region: &RelaxationRegion,
) -> Result<HashSet<ResidueId>, EngineError> {
    match region {
        RelaxationRegion::All => Ok(system.residues_iter().map(|(id, _)| id).collect()),
        RelaxationRegion::Residues { include, exclude } => {
            let mut ids: HashSet<ResidueId> = if include.is_empty() && !exclude.is_empty() {
                system.residues_iter().map(|(id, _)| id).collect()
            } else {
                let mut set = HashSet::new();
                for spec in include {
                    let chain_id = system
                        .find_chain_by_id(spec.chain_id)
                        .ok_or(EngineError::ResidueNotFound { spec: *spec })?;
                    let residue_id = system
                        .find_residue_by_id(chain_id, spec.residue_number)
                        .ok_or(EngineError::ResidueNotFound { spec: *spec })?;
                    set.insert(residue_id);
                }
                set
            };

            for spec in exclude {
                if let Some(chain_id) = system.find_chain_by_id(spec.chain_id) {
                    if let Some(residue_id) =
                        system.find_residue_by_id(chain_id, spec.residue_number)
                    {
                        ids.remove(&residue_id);
                    }
                }
            }
            Ok(ids)
        }
    }
}

/// Residues outside the mobile set with any atom within the non-bonded
/// cutoff of any mobile atom, sorted into the deterministic index order.
fn find_padding_residues(
    system: &MolecularSystem,
    mobile_sorted: &[ResidueId],
    mobile_residues: &HashSet<ResidueId>,
    params: &Parameters,
) -> Result<Vec<ResidueId>, EngineError> {
    let mut mobile_positions: Vec<[f64; 3]> = Vec::new();
    for &residue_id in mobile_sorted {
        let residue = system.residue(residue_id).unwrap();
        for &atom_id in residue.atoms() {
            let p = system.atom(atom_id).unwrap().position;
            mobile_positions.push([p.x, p.y, p.z]);
        }
    }
    if mobile_positions.is_empty() {
        return Err(EngineError::EmptySelection);
    }

    let kdtree: KdTree<f64, 3> = (&mobile_positions).into();
    let cutoff_sq = params.globals.cutoff_distance * params.globals.cutoff_distance;

    let mut padding: Vec<ResidueId> = Vec::new();
    for (residue_id, residue) in system.residues_iter() {
        if mobile_residues.contains(&residue_id) {
            continue;
        }
        let near = residue.atoms().iter().any(|&atom_id| {
            let p = system.atom(atom_id).unwrap().position;
            kdtree
                .nearest_one::<SquaredEuclidean>(&[p.x, p.y, p.z])
                .distance
                <= cutoff_sq
        });
        if near {
            padding.push(residue_id);
        }
    }
    padding.sort_by_key(|&id| residue_sort_key(system, id));
    Ok(padding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::{GlobalParams, NonBondedScaling};
    use crate::core::models::atom::Atom;
    use crate::core::models::chain::ChainType;
    use crate::core::models::topology::BondOrder;
    use crate::engine::config::ResidueSpecifier;

    fn bare_params(cutoff: f64) -> Parameters {
        Parameters::new(
            GlobalParams {
                cutoff_distance: cutoff,
                ..Default::default()
            },
            NonBondedScaling::default(),
        )
    }

    /// A-B-C-D bonded chain plus one disconnected atom E, all in one residue.
    fn chain_with_stray() -> MolecularSystem {
        let mut system = MolecularSystem::new();
        let chain_id = system.add_chain('A', ChainType::Other);
        let residue_id = system.add_residue(chain_id, 1, "CHN").unwrap();

        let mut ids = Vec::new();
        for (idx, name) in ["A", "B", "C", "D", "E"].iter().enumerate() {
            let atom = Atom::new(name, residue_id, Point3::new(idx as f64 * 1.5, 0.0, 0.0));
            ids.push(system.add_atom_to_residue(residue_id, atom).unwrap());
        }
        for w in 0..3 {
            system.add_bond(ids[w], ids[w + 1], BondOrder::Single).unwrap();
        }
        system
    }

    #[test]
    fn graph_distance_on_a_linear_chain() {
        let system = chain_with_stray();
        let ctx =
            EvaluationContext::build(&system, &RelaxationRegion::All, &bare_params(9.0)).unwrap();

        assert_eq!(ctx.graph_distance(0, 1), 1);
        assert_eq!(ctx.graph_distance(0, 2), 2);
        assert_eq!(ctx.graph_distance(0, 3), 3);
        assert_eq!(ctx.graph_distance(0, 4), -1);
        assert_eq!(ctx.graph_distance(2, 2), 0);
        // Symmetric by construction of the adjacency list.
        assert_eq!(ctx.graph_distance(3, 0), 3);
    }

    #[test]
    fn all_region_makes_every_atom_mobile() {
        let system = chain_with_stray();
        let ctx =
            EvaluationContext::build(&system, &RelaxationRegion::All, &bare_params(9.0)).unwrap();

        assert_eq!(ctx.n_atoms(), 5);
        assert!((0..5).all(|i| ctx.is_mobile(i)));
        assert!(ctx.force_weights().iter().all(|&w| w == 1.0));
    }

    fn three_residue_system() -> MolecularSystem {
        let mut system = MolecularSystem::new();
        let chain_id = system.add_chain('A', ChainType::Protein);

        // Residue 1 at the origin, residue 2 a few Angstroms away, residue 3
        // far outside any reasonable cutoff.
        for (number, offset) in [(1, 0.0), (2, 3.0), (3, 100.0)] {
            let residue_id = system.add_residue(chain_id, number, "RES").unwrap();
            for idx in 0..2 {
                let atom = Atom::new(
                    &format!("X{idx}"),
                    residue_id,
                    Point3::new(offset + idx as f64, 0.0, 0.0),
                );
                system.add_atom_to_residue(residue_id, atom).unwrap();
            }
        }
        system
    }

    #[test]
    fn padding_includes_only_residues_within_the_cutoff() {
        let system = three_residue_system();
        let region = RelaxationRegion::Residues {
            include: vec![ResidueSpecifier {
                chain_id: 'A',
                residue_number: 1,
            }],
            exclude: vec![],
        };
        let ctx = EvaluationContext::build(&system, &region, &bare_params(5.0)).unwrap();

        // Residue 1 (mobile) + residue 2 (padding); residue 3 is excluded.
        assert_eq!(ctx.n_atoms(), 4);
        assert!(ctx.is_mobile(0) && ctx.is_mobile(1));
        assert!(!ctx.is_mobile(2) && !ctx.is_mobile(3));
        assert_eq!(ctx.force_weights()[2], 0.0);
    }

    #[test]
    fn mobile_atoms_always_occupy_the_lowest_indices() {
        let system = three_residue_system();
        let region = RelaxationRegion::Residues {
            include: vec![ResidueSpecifier {
                chain_id: 'A',
                residue_number: 2,
            }],
            exclude: vec![],
        };
        let ctx = EvaluationContext::build(&system, &region, &bare_params(5.0)).unwrap();

        // Mobile residue 2 first, then padding residue 1 (3 Å away).
        assert_eq!(ctx.n_atoms(), 4);
        let first_padding = ctx.mobile.iter().position(|&m| !m).unwrap();
        assert!(ctx.mobile[..first_padding].iter().all(|&m| m));
        assert!(ctx.mobile[first_padding..].iter().all(|&m| !m));
    }

    #[test]
    fn unknown_residue_specifier_is_fatal() {
        let system = three_residue_system();
        let region = RelaxationRegion::Residues {
            include: vec![ResidueSpecifier {
                chain_id: 'B',
                residue_number: 1,
            }],
            exclude: vec![],
        };
        let result = EvaluationContext::build(&system, &region, &bare_params(5.0));
        assert!(matches!(
            result,
            Err(EngineError::ResidueNotFound { .. })
        ));
    }

    #[test]
    fn empty_selection_is_rejected() {
        let system = three_residue_system();
        let region = RelaxationRegion::Residues {
            include: vec![],
            exclude: vec![],
        };
        let result = EvaluationContext::build(&system, &region, &bare_params(5.0));
        assert!(matches!(result, Err(EngineError::EmptySelection)));
    }

    #[test]
    fn index_assignment_is_deterministic_across_builds() {
        let system = three_residue_system();
        let region = RelaxationRegion::Residues {
            include: vec![ResidueSpecifier {
                chain_id: 'A',
                residue_number: 1,
            }],
            exclude: vec![],
        };
        let ctx_a = EvaluationContext::build(&system, &region, &bare_params(5.0)).unwrap();
        let ctx_b = EvaluationContext::build(&system, &region, &bare_params(5.0)).unwrap();

        assert_eq!(ctx_a.atom_ids, ctx_b.atom_ids);
        assert_eq!(ctx_a.positions, ctx_b.positions);
    }

    #[test]
    fn neighbors_outside_the_working_set_are_dropped() {
        let mut system = three_residue_system();
        // Bond an atom of residue 1 to an atom of far-away residue 3.
        let chain_id = system.find_chain_by_id('A').unwrap();
        let res1 = system.find_residue_by_id(chain_id, 1).unwrap();
        let res3 = system.find_residue_by_id(chain_id, 3).unwrap();
        let a1 = system.residue(res1).unwrap().atoms()[0];
        let a3 = system.residue(res3).unwrap().atoms()[0];
        system.add_bond(a1, a3, BondOrder::Single).unwrap();

        let region = RelaxationRegion::Residues {
            include: vec![ResidueSpecifier {
                chain_id: 'A',
                residue_number: 1,
            }],
            exclude: vec![],
        };
        let ctx = EvaluationContext::build(&system, &region, &bare_params(5.0)).unwrap();

        // Residue 3 is beyond the cutoff, so the bond partner is missing and
        // the adjacency entry stays empty.
        assert_eq!(ctx.n_atoms(), 4);
        assert!(ctx.neighbors(0).is_empty());
    }

    #[test]
    fn apply_positions_writes_back_to_the_system() {
        let mut system = chain_with_stray();
        let mut ctx =
            EvaluationContext::build(&system, &RelaxationRegion::All, &bare_params(9.0)).unwrap();

        ctx.positions_mut()[0] = Point3::new(-1.0, 2.0, 3.0);
        ctx.apply_positions(&mut system);

        let moved = system.atom(ctx.atom_id(0)).unwrap();
        assert_eq!(moved.position, Point3::new(-1.0, 2.0, 3.0));
    }
}
