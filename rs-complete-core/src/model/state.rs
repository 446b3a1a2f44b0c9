use std::collections::HashMap;

use super::table::Transition;

/// Raw transition counts observed from a single context.
///
/// A `State` is the construction-time view of one row of a transition table:
/// every time the context is followed by some next-state (a word, or the
/// remaining suffix of a word), that next-state's count goes up by one.
///
/// ## Invariants
/// - Each recorded count is strictly positive
/// - `freeze` yields probabilities in (0, 1] summing to 1.0
#[derive(Clone, Debug, Default)]
pub(crate) struct State {
	/// Example: { "cat" => 42, "dog" => 3 }
	transitions: HashMap<String, usize>,
}

impl State {
	/// Records one more occurrence of `next`.
	pub fn add_transition(&mut self, next: String) {
		*self.transitions.entry(next).or_insert(0) += 1;
	}

	/// Merges the counts of another state observed for the same context.
	///
	/// Used to combine partial counts built on separate corpus chunks.
	pub fn merge(&mut self, other: Self) {
		for (next, occurrence) in other.transitions {
			*self.transitions.entry(next).or_insert(0) += occurrence;
		}
	}

	/// Converts raw counts into a normalized, ranked distribution.
	///
	/// Entries are sorted by probability descending, then by next-state
	/// ascending, so ties always come out in the same order no matter how
	/// the counts were accumulated.
	pub fn freeze(self) -> Box<[Transition]> {
		let total: usize = self.transitions.values().sum();

		let mut ranked: Vec<(String, usize)> = self.transitions.into_iter().collect();
		ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

		ranked
			.into_iter()
			.map(|(state, occurrence)| Transition {
				state,
				probability: occurrence as f64 / total as f64,
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn freeze_normalizes_and_ranks() {
		let mut state = State::default();
		for next in ["dog", "cat", "cat", "cat"] {
			state.add_transition(next.to_owned());
		}

		let frozen = state.freeze();
		assert_eq!(frozen.len(), 2);
		assert_eq!(frozen[0].state, "cat");
		assert!((frozen[0].probability - 0.75).abs() < 1e-12);
		assert_eq!(frozen[1].state, "dog");
		assert!((frozen[1].probability - 0.25).abs() < 1e-12);
	}

	#[test]
	fn ties_are_ordered_lexicographically() {
		let mut state = State::default();
		for next in ["zebra", "apple", "mango"] {
			state.add_transition(next.to_owned());
		}

		let order: Vec<_> = state.freeze().iter().map(|t| t.state.clone()).collect();
		assert_eq!(order, vec!["apple", "mango", "zebra"]);
	}

	#[test]
	fn merge_sums_counts() {
		let mut left = State::default();
		left.add_transition("cat".to_owned());
		let mut right = State::default();
		right.add_transition("cat".to_owned());
		right.add_transition("dog".to_owned());

		left.merge(right);
		let frozen = left.freeze();
		assert_eq!(frozen[0].state, "cat");
		assert!((frozen[0].probability - 2.0 / 3.0).abs() < 1e-12);
	}
}
