//! # Core Module
//!
//! The stateless foundation of the library: molecular data models and the
//! force-field mathematics used to evaluate them.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, residues, chains,
//!   bonds, and the system container the engine reads from.
//! - **Energy Calculations** ([`forcefield`]) - Parameter database with
//!   wildcard type matching, pure potential forms, and per-term
//!   energy/force calculators.
//!
//! Everything here is free of evaluation state; the stateful orchestration
//! lives in [`crate::engine`].

pub mod forcefield;
pub mod models;
