use super::ids::ResidueId;
use std::fmt;
use std::str::FromStr;

/// Broad classification of a chain, used only for bookkeeping when a
/// structure is assembled; the evaluation engine treats all chains alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainType {
    Protein,
    Ligand,
    Water,
    Other,
}

impl FromStr for ChainType {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "protein" => ChainType::Protein,
            "ligand" => ChainType::Ligand,
            "water" => ChainType::Water,
            _ => ChainType::Other,
        })
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ChainType::Protein => "Protein",
                ChainType::Ligand => "Ligand",
                ChainType::Water => "Water",
                ChainType::Other => "Other",
            }
        )
    }
}

/// A named chain holding an ordered list of residues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub id: char,
    pub chain_type: ChainType,
    pub(crate) residues: Vec<ResidueId>,
}

impl Chain {
    pub(crate) fn new(id: char, chain_type: ChainType) -> Self {
        Self {
            id,
            chain_type,
            residues: Vec::new(),
        }
    }

    pub fn residues(&self) -> &[ResidueId] {
        &self.residues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_type_from_str_is_lenient() {
        assert_eq!("Protein".parse::<ChainType>().unwrap(), ChainType::Protein);
        assert_eq!("WATER".parse::<ChainType>().unwrap(), ChainType::Water);
        assert_eq!("solvent".parse::<ChainType>().unwrap(), ChainType::Other);
    }

    #[test]
    fn new_chain_starts_empty() {
        let chain = Chain::new('A', ChainType::Protein);
        assert_eq!(chain.id, 'A');
        assert!(chain.residues().is_empty());
    }
}
