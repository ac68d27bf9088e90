use super::params::Parameters;
use crate::core::models::atom::CachedAtomicParams;
use crate::core::models::system::MolecularSystem;
use std::collections::HashSet;
use tracing::warn;

/// Resolves every atom's force-field type against the parameter database and
/// caches the atomic parameters on the atom, so repeated evaluation-context
/// builds never re-query the database.
///
/// Sparse coverage is expected for padding atoms: an atom whose type has no
/// entry (and no `*` fallback) is left unresolved, which later suppresses
/// its van der Waals pairs instead of failing the whole evaluation.
pub struct Parameterizer<'a> {
    params: &'a Parameters,
}

impl<'a> Parameterizer<'a> {
    pub fn new(params: &'a Parameters) -> Self {
        Self { params }
    }

    /// Caches parameters on every atom, returning the number of atoms left
    /// unresolved.
    pub fn parameterize_system(&self, system: &mut MolecularSystem) -> usize {
        let mut unresolved = 0;
        let mut warned_types: HashSet<String> = HashSet::new();

        for (_, atom) in system.atoms_iter_mut() {
            if atom.force_field_type.is_empty() {
                atom.non_bonded = CachedAtomicParams::None;
                unresolved += 1;
                continue;
            }

            match self.params.atomic(&atom.force_field_type) {
                Ok(p) => {
                    atom.non_bonded = CachedAtomicParams::Resolved {
                        radius: p.radius,
                        well_depth: p.well_depth,
                        mass: p.mass,
                    };
                }
                Err(_) => {
                    if warned_types.insert(atom.force_field_type.clone()) {
                        warn!(
                            "No atomic parameters for force field type '{}'; its atoms will not \
                             form van der Waals pairs",
                            atom.force_field_type
                        );
                    }
                    atom.non_bonded = CachedAtomicParams::None;
                    unresolved += 1;
                }
            }
        }

        unresolved
    }
}
