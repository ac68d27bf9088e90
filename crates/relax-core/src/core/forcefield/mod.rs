//! # Force Field Module
//!
//! Classical molecular-mechanics energy and force computation: the parameter
//! database, the pure potential functions, and the per-term calculators the
//! evaluation engine aggregates.
//!
//! ## Overview
//!
//! Bonded interactions (harmonic stretches and bends, Fourier torsions and
//! impropers) and non-bonded interactions (Lennard-Jones van der Waals plus
//! Coulomb electrostatics with graph-distance scaling) are evaluated by
//! small, immutable term calculators that hold nothing but local atom
//! indices and precomputed coefficients. Parameter lookup supports `*`
//! wildcards with order-symmetric matching and an explicit tie-break policy.
//!
//! ## Key Components
//!
//! - [`params`] - Parameter database, wildcard type matching, TOML loading
//! - [`potentials`] - Pure functional forms with first and second derivatives
//! - [`terms`] - The five term calculators (stretch, bend, torsion, improper, non-bonded)
//! - [`energy`] - Per-class energy breakdown aggregation
//! - [`parameterization`] - Caching per-atom non-bonded parameters onto a system

pub mod energy;
pub mod parameterization;
pub mod params;
pub mod potentials;
pub mod terms;
