//! N-gram based text completion library.
//!
//! This crate provides the statistical engine behind an autocomplete editor:
//! - Word-level chains predicting the next word from the previous `n` words
//! - Character-level prefix chains completing the word currently being typed
//! - Multi-order ensembles falling back from long to short contexts
//! - Corpus preparation (raw text cleanup, JSON exchange format, binary cache)
//! - Editor-session bookkeeping turning typed text into suggestions
//!
//! Chains are built once from an in-memory corpus and are read-only afterwards,
//! so a built ensemble can be shared between threads without locking.

/// Transition tables, chains and multi-order ensembles.
pub mod model;

/// Corpus loading and text preparation.
pub mod corpus;

/// Editor-session state (text, cursor) and suggestion rendering helpers.
pub mod session;

/// Error type shared by the whole crate.
pub mod error;

pub use error::{CompleteError, Result};
