use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Type string that matches any force-field type in a parameter entry.
pub const WILDCARD_TYPE: &str = "*";

/// Tie-break policy when several wildcard entries match the same type tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// Prefer the entry with the fewest wildcards; registration order breaks
    /// remaining ties.
    #[default]
    MostSpecific,
    /// The first registered matching entry wins regardless of specificity.
    FirstRegistered,
}

/// Functional form of the electrostatic term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoulombForm {
    /// `E = c / r`.
    #[default]
    InverseR,
    /// `E = c / r²` (distance-dependent dielectric).
    InverseRSquared,
}

/// Global constants shared by every non-bonded term of an evaluation.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct GlobalParams {
    pub dielectric_constant: f64,
    #[serde(default)]
    pub coulomb_form: CoulombForm,
    /// Unit conversion applied inside the well-depth mixing rule.
    #[serde(default = "default_unit_conversion")]
    pub unit_conversion: f64,
    /// Non-bonded interaction cutoff in Angstroms; also the padding radius
    /// around the mobile region.
    pub cutoff_distance: f64,
}

fn default_unit_conversion() -> f64 {
    1.0
}

impl Default for GlobalParams {
    fn default() -> Self {
        Self {
            dielectric_constant: 1.0,
            coulomb_form: CoulombForm::default(),
            unit_conversion: 1.0,
            cutoff_distance: 9.0,
        }
    }
}

/// Scale factors for non-bonded interactions, indexed by bonded graph
/// distance: slot 0 is "unrelated" (no path of three bonds or fewer),
/// slots 1 to 3 are atoms separated by that many bonds.
///
/// A negative Coulomb scale is an already-inverted exclusion divisor:
/// `-1.2` means the interaction is divided by 1.2.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct NonBondedScaling {
    pub vdw: [f64; 4],
    pub coulomb: [f64; 4],
}

impl Default for NonBondedScaling {
    fn default() -> Self {
        Self {
            vdw: [1.0, 0.0, 0.0, 1.0],
            coulomb: [1.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Per-type atomic parameters.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct AtomicParams {
    /// Van der Waals radius in Angstroms.
    pub radius: f64,
    /// Well depth (epsilon) in kcal/mol.
    pub well_depth: f64,
    /// Atomic mass in amu.
    #[serde(default)]
    pub mass: f64,
}

/// One periodic component `(V/2)(1 + cos(nφ - γ))` of a torsion or improper.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct PeriodicTerm {
    /// Barrier height V in kcal/mol.
    pub barrier: f64,
    /// Periodicity n.
    pub periodicity: u32,
    /// Phase offset γ in degrees.
    #[serde(default)]
    pub phase: f64,
}

/// Harmonic bond-stretch entry for an ordered pair of types.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StretchParams {
    pub types: [String; 2],
    /// Equilibrium bond length in Angstroms.
    pub r0: f64,
    /// Force constant in kcal/(mol·Å²).
    pub k: f64,
}

/// Harmonic angle-bend entry for an ordered triple of types.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BendParams {
    pub types: [String; 3],
    /// Equilibrium angle in degrees.
    pub theta0: f64,
    /// Force constant in kcal/(mol·rad²).
    pub k: f64,
}

/// Proper torsion entry: up to four periodic components.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TorsionParams {
    pub types: [String; 4],
    pub terms: Vec<PeriodicTerm>,
}

/// Improper torsion entry: a single periodic component, queried with the
/// apex type first.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ImproperParams {
    pub types: [String; 4],
    pub term: PeriodicTerm,
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParameterLookupError {
    #[error("No atomic parameters registered for force field type '{0}'")]
    UnknownType(String),
}

#[derive(Debug, Deserialize)]
struct ParametersFile {
    globals: GlobalParams,
    #[serde(default)]
    scaling: NonBondedScaling,
    #[serde(default)]
    match_policy: MatchPolicy,
    #[serde(default)]
    atoms: HashMap<String, AtomicParams>,
    #[serde(default)]
    stretch: Vec<StretchParams>,
    #[serde(default)]
    bend: Vec<BendParams>,
    #[serde(default)]
    torsion: Vec<TorsionParams>,
    #[serde(default)]
    improper: Vec<ImproperParams>,
}

/// The force-field parameter database.
///
/// Bonded entries are kept in registration order because the tie-break
/// policy may depend on it. All lookup methods are read-only, so one
/// database can be shared by any number of concurrent evaluations.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    pub globals: GlobalParams,
    pub scaling: NonBondedScaling,
    atoms: HashMap<String, AtomicParams>,
    stretches: Vec<StretchParams>,
    bends: Vec<BendParams>,
    torsions: Vec<TorsionParams>,
    impropers: Vec<ImproperParams>,
    match_policy: MatchPolicy,
}

impl Parameters {
    pub fn new(globals: GlobalParams, scaling: NonBondedScaling) -> Self {
        Self {
            globals,
            scaling,
            ..Default::default()
        }
    }

    /// Loads a parameter database from a TOML document.
    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let file: ParametersFile = toml::from_str(&content).map_err(|e| ParamLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        Ok(Self {
            globals: file.globals,
            scaling: file.scaling,
            atoms: file.atoms,
            stretches: file.stretch,
            bends: file.bend,
            torsions: file.torsion,
            impropers: file.improper,
            match_policy: file.match_policy,
        })
    }

    pub fn match_policy(&self) -> MatchPolicy {
        self.match_policy
    }

    pub fn set_match_policy(&mut self, policy: MatchPolicy) {
        self.match_policy = policy;
    }

    pub fn register_atom(&mut self, ff_type: &str, params: AtomicParams) {
        self.atoms.insert(ff_type.to_string(), params);
    }

    pub fn register_stretch(&mut self, params: StretchParams) {
        self.stretches.push(params);
    }

    pub fn register_bend(&mut self, params: BendParams) {
        self.bends.push(params);
    }

    pub fn register_torsion(&mut self, params: TorsionParams) {
        self.torsions.push(params);
    }

    pub fn register_improper(&mut self, params: ImproperParams) {
        self.impropers.push(params);
    }

    /// Atomic parameters for a type, falling back to the `*` entry.
    pub fn atomic(&self, ff_type: &str) -> Result<&AtomicParams, ParameterLookupError> {
        self.atoms
            .get(ff_type)
            .or_else(|| self.atoms.get(WILDCARD_TYPE))
            .ok_or_else(|| ParameterLookupError::UnknownType(ff_type.to_string()))
    }

    pub fn stretch(&self, query: [&str; 2]) -> Option<&StretchParams> {
        select_entry(&self.stretches, |e| &e.types, &query, self.match_policy)
    }

    pub fn bend(&self, query: [&str; 3]) -> Option<&BendParams> {
        select_entry(&self.bends, |e| &e.types, &query, self.match_policy)
    }

    pub fn torsion(&self, query: [&str; 4]) -> Option<&TorsionParams> {
        select_entry(&self.torsions, |e| &e.types, &query, self.match_policy)
    }

    pub fn improper(&self, query: [&str; 4]) -> Option<&ImproperParams> {
        select_entry(&self.impropers, |e| &e.types, &query, self.match_policy)
    }
}

/// Returns the entry's wildcard count if it matches the query read forwards
/// or reversed; `None` otherwise. Either side being `*` at a position counts
/// as a match for that position.
fn tuple_match<const N: usize>(entry: &[String; N], query: &[&str; N]) -> Option<usize> {
    let position_matches =
        |e: &str, q: &str| e == WILDCARD_TYPE || q == WILDCARD_TYPE || e == q;

    let forward = entry
        .iter()
        .zip(query.iter())
        .all(|(e, q)| position_matches(e, q));
    let reverse = entry
        .iter()
        .rev()
        .zip(query.iter())
        .all(|(e, q)| position_matches(e, q));

    if forward || reverse {
        Some(entry.iter().filter(|t| t.as_str() == WILDCARD_TYPE).count())
    } else {
        None
    }
}

fn select_entry<'a, T, F, const N: usize>(
    entries: &'a [T],
    types_of: F,
    query: &[&str; N],
    policy: MatchPolicy,
) -> Option<&'a T>
where
    F: Fn(&T) -> &[String; N],
{
    let mut best: Option<(&T, usize)> = None;
    for entry in entries {
        let Some(wildcards) = tuple_match(types_of(entry), query) else {
            continue;
        };
        match policy {
            MatchPolicy::FirstRegistered => return Some(entry),
            MatchPolicy::MostSpecific => {
                // Strict comparison keeps the first-registered entry on ties.
                if best.map_or(true, |(_, w)| wildcards < w) {
                    best = Some((entry, wildcards));
                }
            }
        }
    }
    best.map(|(entry, _)| entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn stretch(t1: &str, t2: &str, k: f64) -> StretchParams {
        StretchParams {
            types: [t1.to_string(), t2.to_string()],
            r0: 1.5,
            k,
        }
    }

    #[test]
    fn exact_tuple_matches_forward_and_reversed() {
        let mut params = Parameters::default();
        params.register_stretch(stretch("C_3", "N_3", 100.0));

        assert!(params.stretch(["C_3", "N_3"]).is_some());
        assert!(params.stretch(["N_3", "C_3"]).is_some());
        assert!(params.stretch(["C_3", "O_3"]).is_none());
    }

    #[test]
    fn wildcard_matches_forward_and_reversed() {
        let mut params = Parameters::default();
        params.register_stretch(stretch("*", "Y", 1.0));

        assert!(params.stretch(["X", "Y"]).is_some());
        // Reverse-stored form: the query (X, Y) against stored (Y, *).
        let mut reversed = Parameters::default();
        reversed.register_stretch(stretch("Y", "*", 1.0));
        assert!(reversed.stretch(["X", "Y"]).is_some());
    }

    #[test]
    fn most_specific_entry_wins_over_wilder_one() {
        let mut params = Parameters::default();
        params.register_stretch(stretch("*", "C_3", 1.0));
        params.register_stretch(stretch("C_3", "C_3", 2.0));

        let found = params.stretch(["C_3", "C_3"]).unwrap();
        assert_eq!(found.k, 2.0);
    }

    #[test]
    fn equally_specific_entries_tie_break_by_registration_order() {
        let mut params = Parameters::default();
        params.register_stretch(stretch("*", "C_3", 1.0));
        params.register_stretch(stretch("C_3", "*", 2.0));

        let found = params.stretch(["C_3", "C_3"]).unwrap();
        assert_eq!(found.k, 1.0);
    }

    #[test]
    fn first_registered_policy_ignores_specificity() {
        let mut params = Parameters::default();
        params.set_match_policy(MatchPolicy::FirstRegistered);
        params.register_stretch(stretch("*", "C_3", 1.0));
        params.register_stretch(stretch("C_3", "C_3", 2.0));

        let found = params.stretch(["C_3", "C_3"]).unwrap();
        assert_eq!(found.k, 1.0);
    }

    #[test]
    fn bend_tuple_matches_reversed() {
        let mut params = Parameters::default();
        params.register_bend(BendParams {
            types: ["H_".to_string(), "C_3".to_string(), "N_3".to_string()],
            theta0: 109.5,
            k: 50.0,
        });

        assert!(params.bend(["N_3", "C_3", "H_"]).is_some());
        assert!(params.bend(["H_", "C_3", "N_3"]).is_some());
        assert!(params.bend(["H_", "N_3", "C_3"]).is_none());
    }

    #[test]
    fn torsion_tuple_matches_reversed_with_wildcard_ends() {
        let mut params = Parameters::default();
        params.register_torsion(TorsionParams {
            types: [
                "*".to_string(),
                "C_3".to_string(),
                "C_2".to_string(),
                "*".to_string(),
            ],
            terms: vec![PeriodicTerm {
                barrier: 2.0,
                periodicity: 3,
                phase: 0.0,
            }],
        });

        assert!(params.torsion(["H_", "C_3", "C_2", "O_3"]).is_some());
        assert!(params.torsion(["O_3", "C_2", "C_3", "H_"]).is_some());
        assert!(params.torsion(["H_", "C_2", "C_3", "O_3"]).is_none());
    }

    #[test]
    fn atomic_lookup_prefers_exact_type_over_wildcard() {
        let mut params = Parameters::default();
        params.register_atom(
            "C_3",
            AtomicParams {
                radius: 1.7,
                well_depth: 0.1,
                mass: 12.011,
            },
        );
        params.register_atom(
            "*",
            AtomicParams {
                radius: 1.5,
                well_depth: 0.05,
                mass: 0.0,
            },
        );

        assert_eq!(params.atomic("C_3").unwrap().radius, 1.7);
        assert_eq!(params.atomic("Zz").unwrap().radius, 1.5);
    }

    #[test]
    fn atomic_lookup_fails_for_unknown_type_without_wildcard() {
        let params = Parameters::default();
        assert_eq!(
            params.atomic("C_3"),
            Err(ParameterLookupError::UnknownType("C_3".to_string()))
        );
    }

    #[test]
    fn load_succeeds_with_valid_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("forcefield.toml");
        fs::write(
            &file_path,
            r#"
            match_policy = "most-specific"

            [globals]
            dielectric_constant = 2.5
            coulomb_form = "inverse-r-squared"
            unit_conversion = 1.0
            cutoff_distance = 8.0

            [scaling]
            vdw = [1.0, 0.0, 0.0, 0.5]
            coulomb = [1.0, 0.0, 0.0, -1.2]

            [atoms.C_3]
            radius = 1.7
            well_depth = 0.1
            mass = 12.011

            [atoms."*"]
            radius = 1.5
            well_depth = 0.05

            [[stretch]]
            types = ["C_3", "C_3"]
            r0 = 1.54
            k = 300.0

            [[bend]]
            types = ["C_3", "C_3", "*"]
            theta0 = 109.5
            k = 50.0

            [[torsion]]
            types = ["*", "C_3", "C_3", "*"]
            terms = [{ barrier = 1.4, periodicity = 3, phase = 0.0 }]

            [[improper]]
            types = ["C_R", "*", "*", "*"]
            term = { barrier = 2.0, periodicity = 2, phase = 180.0 }
            "#,
        )
        .unwrap();

        let params = Parameters::load(&file_path).unwrap();
        assert_eq!(params.globals.dielectric_constant, 2.5);
        assert_eq!(params.globals.coulomb_form, CoulombForm::InverseRSquared);
        assert_eq!(params.scaling.coulomb[3], -1.2);
        assert_eq!(params.atomic("C_3").unwrap().mass, 12.011);
        assert_eq!(params.stretch(["C_3", "C_3"]).unwrap().r0, 1.54);
        assert!(params.bend(["C_3", "C_3", "H_"]).is_some());
        assert_eq!(
            params.torsion(["H_", "C_3", "C_3", "H_"]).unwrap().terms[0].periodicity,
            3
        );
        assert_eq!(
            params.improper(["C_R", "O_2", "H_", "H_"]).unwrap().term.phase,
            180.0
        );
    }

    #[test]
    fn load_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let result = Parameters::load(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ParamLoadError::Io { .. })));
    }

    #[test]
    fn load_fails_for_malformed_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("malformed.toml");
        fs::write(&file_path, "this is not toml").unwrap();
        let result = Parameters::load(&file_path);
        assert!(matches!(result, Err(ParamLoadError::Toml { .. })));
    }
}
