use thiserror::Error;

use super::config::ResidueSpecifier;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Residue not found in system: {spec:?}")]
    ResidueNotFound { spec: ResidueSpecifier },

    #[error("The mobile region selection matched no atoms")]
    EmptySelection,

    #[error("Force array length {found} does not match the context's {expected} atoms")]
    ForceArrayMismatch { expected: usize, found: usize },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
