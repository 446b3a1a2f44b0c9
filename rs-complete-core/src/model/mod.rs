//! Top-level module for the statistical completion engine.
//!
//! This module provides:
//! - Fixed-order word chains with next-word and prefix-completion tables (`Chain`)
//! - Multi-order ensembles with configurable fallback (`ChainEnsemble`)
//! - Frozen, ranked transition tables (`TransitionTable`)
//! - Internal per-context counters used during construction (`State`)

/// Fixed-order chain (`n >= 1`).
///
/// Handles corpus counting, probability normalization
/// and ranked top-k retrieval.
pub mod chain;

/// Chains of orders `1..=N` queried with a fallback policy.
pub mod ensemble;

/// Immutable context → distribution tables and weighted sampling.
pub mod table;

/// Raw transition counts of one context.
/// This module is not exposed publicly.
mod state;

pub use chain::{Chain, SUGGESTION_LIMIT, Suggestion};
pub use ensemble::{ChainEnsemble, EnsembleOptions, Fallback, OrderPreference};
pub use table::{Transition, TransitionTable};
