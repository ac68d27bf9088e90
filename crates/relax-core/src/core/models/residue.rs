use super::ids::{AtomId, ChainId};
use std::collections::HashMap;

/// A residue: a named group of atoms with a sequence number within a chain.
///
/// Residues are the granularity at which the mobile region and its padding
/// are selected; the engine never needs to know anything chemical about them
/// beyond which atoms they own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residue {
    /// Residue sequence number from the source structure.
    pub residue_number: isize,
    /// Residue name (e.g., "ALA", "LIG").
    pub name: String,
    /// ID of the parent chain.
    pub chain_id: ChainId,
    pub(crate) atoms: Vec<AtomId>,
    atom_name_map: HashMap<String, AtomId>,
}

impl Residue {
    pub(crate) fn new(residue_number: isize, name: &str, chain_id: ChainId) -> Self {
        Self {
            residue_number,
            name: name.to_string(),
            chain_id,
            atoms: Vec::new(),
            atom_name_map: HashMap::new(),
        }
    }

    pub(crate) fn add_atom(&mut self, atom_name: &str, atom_id: AtomId) {
        self.atoms.push(atom_id);
        self.atom_name_map.insert(atom_name.to_string(), atom_id);
    }

    /// Atom IDs in insertion order. This order is part of the engine's
    /// deterministic local-index assignment.
    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    pub fn get_atom_id_by_name(&self, name: &str) -> Option<AtomId> {
        self.atom_name_map.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn dummy_atom_id(n: u64) -> AtomId {
        AtomId::from(KeyData::from_ffi(n))
    }

    fn dummy_chain_id(n: u64) -> ChainId {
        ChainId::from(KeyData::from_ffi(n))
    }

    #[test]
    fn new_residue_initializes_fields_correctly() {
        let residue = Residue::new(10, "GLY", dummy_chain_id(1));
        assert_eq!(residue.residue_number, 10);
        assert_eq!(residue.name, "GLY");
        assert!(residue.atoms().is_empty());
        assert!(residue.get_atom_id_by_name("CA").is_none());
    }

    #[test]
    fn add_atom_preserves_insertion_order_and_maps_name() {
        let mut residue = Residue::new(5, "ALA", dummy_chain_id(2));
        let n = dummy_atom_id(1);
        let ca = dummy_atom_id(2);
        residue.add_atom("N", n);
        residue.add_atom("CA", ca);
        assert_eq!(residue.atoms(), &[n, ca]);
        assert_eq!(residue.get_atom_id_by_name("CA"), Some(ca));
    }
}
