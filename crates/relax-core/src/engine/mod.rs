//! # Engine Module
//!
//! The stateful evaluation layer: everything between a molecular structure
//! and the forces that relax it.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Mobile-region selection, term-class
//!   toggles, and relaxation settings
//! - **Evaluation Context** ([`context`]) - The local index space over the
//!   mobile region and its padding, with enumerated interaction terms
//! - **Term Enumeration** ([`enumeration`]) - Canonical bonded terms and
//!   cutoff-filtered non-bonded pairs resolved against the parameter database
//! - **Tasks** ([`tasks`]) - Force accumulation, energy breakdowns, and
//!   numeric diagnostics over a context
//! - **Stepping** ([`minimization`]) - The clamped steepest-descent position
//!   update
//! - **Progress Monitoring** ([`progress`]) - Callback-based reporting
//! - **Error Handling** ([`error`]) - Engine-specific error types
//!
//! Force evaluation is data-parallel over each term list when the `parallel`
//! feature is enabled (the default); workers accumulate into private buffers
//! that are reduced afterwards, so results match the sequential path within
//! floating-point tolerance.

pub mod config;
pub mod context;
pub mod enumeration;
pub mod error;
pub mod minimization;
pub mod progress;
pub(crate) mod tasks;

pub use tasks::diagnostics::{InvalidTerm, TermKind};
