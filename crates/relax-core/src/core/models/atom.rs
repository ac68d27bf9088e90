use super::ids::ResidueId;
use nalgebra::Point3;

/// Cached per-atom non-bonded parameters, resolved once from the parameter
/// database so that repeated context builds do not re-query it.
///
/// Atoms whose force-field type has no database entry stay `None`; the
/// enumerator then treats them as having zero radius and well depth, which
/// suppresses their van der Waals pairs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CachedAtomicParams {
    Resolved {
        /// Van der Waals radius in Angstroms.
        radius: f64,
        /// Well depth (epsilon) in kcal/mol.
        well_depth: f64,
        /// Atomic mass in amu.
        mass: f64,
    },
    #[default]
    None,
}

/// An atom in a molecular structure.
///
/// Carries exactly what the evaluation engine reads from the topology
/// collaborator: a position, an assigned force-field type, a partial charge,
/// and (via [`crate::core::models::system::MolecularSystem`]) a bonded
/// neighbor list.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom within its residue (e.g., "CA", "N").
    pub name: String,
    /// The ID of the parent residue.
    pub residue_id: ResidueId,
    /// The force-field atom type assigned by an external classification step.
    pub force_field_type: String,
    /// The partial atomic charge in elementary charge units.
    pub partial_charge: f64,
    /// The 3D coordinates in Angstroms.
    pub position: Point3<f64>,
    /// Non-bonded parameters cached by the parameterization pass.
    pub non_bonded: CachedAtomicParams,
}

impl Atom {
    /// Creates an atom with empty type, zero charge, and no cached
    /// parameters; callers fill those in afterwards.
    pub fn new(name: &str, residue_id: ResidueId, position: Point3<f64>) -> Self {
        Self {
            name: name.to_string(),
            residue_id,
            position,
            force_field_type: String::new(),
            partial_charge: 0.0,
            non_bonded: CachedAtomicParams::None,
        }
    }
}
