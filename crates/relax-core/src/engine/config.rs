/// Identifies one residue by chain letter and sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResidueSpecifier {
    pub chain_id: char,
    pub residue_number: isize,
}

/// Which residues are mobile during an evaluation.
///
/// Atoms of residues outside the mobile set but within the non-bonded
/// cutoff of a mobile residue are included as static padding; everything
/// else is ignored entirely.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RelaxationRegion {
    /// Every residue is mobile; no padding is needed.
    #[default]
    All,
    /// An explicit include list, optionally trimmed by an exclude list.
    Residues {
        include: Vec<ResidueSpecifier>,
        exclude: Vec<ResidueSpecifier>,
    },
}

/// Toggles for the term classes included in a force evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermClasses {
    pub stretch: bool,
    pub bend: bool,
    pub torsion: bool,
    pub improper: bool,
    pub non_bonded: bool,
}

impl TermClasses {
    pub fn all() -> Self {
        Self {
            stretch: true,
            bend: true,
            torsion: true,
            improper: true,
            non_bonded: true,
        }
    }

    pub fn none() -> Self {
        Self {
            stretch: false,
            bend: false,
            torsion: false,
            improper: false,
            non_bonded: false,
        }
    }
}

impl Default for TermClasses {
    fn default() -> Self {
        Self::all()
    }
}

/// Settings for the steepest-descent relaxation workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct RelaxConfig {
    pub region: RelaxationRegion,
    /// Number of descent steps to take.
    pub iterations: usize,
    /// Step size multiplying the force vector, in Å²·mol/kcal.
    pub step_size: f64,
    /// Upper bound on any single atom's displacement per step, in Å.
    pub max_step: f64,
    /// Rebuild the evaluation context (refreshing the non-bonded pair list)
    /// every this many iterations; 0 builds it once.
    pub rebuild_interval: usize,
}

impl Default for RelaxConfig {
    fn default() -> Self {
        Self {
            region: RelaxationRegion::All,
            iterations: 20,
            step_size: 1e-3,
            max_step: 0.2,
            rebuild_interval: 0,
        }
    }
}
