use std::collections::HashMap;

use rand::Rng;
use serde::Serialize;

use super::state::State;

/// Ordered tuple of context elements used as a lookup key.
pub type Context = Vec<String>;

/// One outgoing edge of a context: the next-state and its probability.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Transition {
	pub state: String,
	pub probability: f64,
}

/// Mutable accumulator of raw counts, only alive while a chain is built.
#[derive(Debug, Default)]
pub(crate) struct TableBuilder {
	states: HashMap<Context, State>,
}

impl TableBuilder {
	/// Records one observation of `context → next`.
	pub fn add(&mut self, context: Context, next: String) {
		self.states.entry(context).or_default().add_transition(next);
	}

	/// Merges counts collected by another builder.
	pub fn merge(&mut self, other: Self) {
		for (context, state) in other.states {
			match self.states.get_mut(&context) {
				Some(existing) => existing.merge(state),
				None => {
					self.states.insert(context, state);
				}
			}
		}
	}

	/// Normalizes every context and freezes the result.
	pub fn freeze(self) -> TransitionTable {
		let rows = self
			.states
			.into_iter()
			.map(|(context, state)| (context, state.freeze()))
			.collect();
		TransitionTable { rows }
	}
}

/// Immutable mapping from a context to its ranked next-state distribution.
///
/// # Invariants
/// - Every context holds at least one transition
/// - The probabilities of a context sum to 1.0 (up to rounding)
/// - Transitions are sorted by probability descending, ties by next-state
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TransitionTable {
	rows: HashMap<Context, Box<[Transition]>>,
}

impl TransitionTable {
	/// Returns the ranked distribution for `context`, or an empty slice.
	pub fn get(&self, context: &[String]) -> &[Transition] {
		self.rows.get(context).map(|row| &**row).unwrap_or(&[])
	}

	/// Number of distinct contexts.
	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	/// Iterates over all stored contexts (unspecified order).
	pub fn contexts(&self) -> impl Iterator<Item = &[String]> {
		self.rows.keys().map(Vec::as_slice)
	}
}

/// Picks a transition at random, weighted by probability.
///
/// Returns `None` for an empty distribution.
pub fn sample<'a, R: Rng>(transitions: &'a [Transition], rng: &mut R) -> Option<&'a Transition> {
	let last = transitions.last()?;

	let mut r: f64 = rng.random_range(0.0..1.0);
	for transition in transitions {
		if r < transition.probability {
			return Some(transition);
		}
		r -= transition.probability;
	}

	// Rounding left a sliver past the last bucket.
	Some(last)
}
