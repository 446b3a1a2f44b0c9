use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::seq::IteratorRandom;
use serde::{Deserialize, Serialize};

use super::chain::{Chain, SUGGESTION_LIMIT, Suggestion, lower_case, normalize};
use super::table::{Transition, sample};
use crate::corpus::Sentence;
use crate::error::{CompleteError, Result};

/// Which order of an ensemble is asked first.
///
/// Results of the first orders fill the suggestion list first, so this decides
/// which chain dominates once the list is truncated.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OrderPreference {
	/// Longest context first (most specific wins).
	#[default]
	Descending,
	/// Order 1 first.
	Ascending,
}

/// How results of successive orders are combined.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Fallback {
	/// Append every order's results, skipping repeats, then truncate.
	#[default]
	Concatenate,
	/// Return the results of the first order that has any.
	FirstHit,
}

impl FromStr for OrderPreference {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"descending" | "desc" => Ok(Self::Descending),
			"ascending" | "asc" => Ok(Self::Ascending),
			other => Err(format!("Unknown order preference '{other}' (expected 'descending' or 'ascending')")),
		}
	}
}

impl fmt::Display for OrderPreference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Descending => write!(f, "descending"),
			Self::Ascending => write!(f, "ascending"),
		}
	}
}

impl FromStr for Fallback {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"concatenate" => Ok(Self::Concatenate),
			"first-hit" | "first_hit" => Ok(Self::FirstHit),
			other => Err(format!("Unknown fallback '{other}' (expected 'concatenate' or 'first-hit')")),
		}
	}
}

impl fmt::Display for Fallback {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Concatenate => write!(f, "concatenate"),
			Self::FirstHit => write!(f, "first-hit"),
		}
	}
}

/// Construction parameters of a [`ChainEnsemble`].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct EnsembleOptions {
	/// Highest chain order; chains of orders `1..=max_order` are built.
	pub max_order: usize,
	pub preference: OrderPreference,
	pub fallback: Fallback,
}

impl Default for EnsembleOptions {
	fn default() -> Self {
		Self {
			max_order: 3,
			preference: OrderPreference::default(),
			fallback: Fallback::default(),
		}
	}
}

/// Chains of several orders built from the same corpus.
///
/// Queries take the words typed so far in the current sentence. Each chain is
/// asked with as many trailing words as its order needs; chains needing more
/// words than available are skipped. Results are combined following the
/// ensemble's [`Fallback`], in the order fixed by its [`OrderPreference`].
///
/// # Invariants
/// - `chains` are stored in query order
/// - The ensemble is immutable once built
#[derive(Clone, Debug)]
pub struct ChainEnsemble {
	chains: Vec<Chain>,
	preference: OrderPreference,
	fallback: Fallback,
}

impl ChainEnsemble {
	/// Builds one chain per order `1..=options.max_order`.
	///
	/// # Errors
	/// Returns `InvalidOrder` if `max_order == 0`.
	pub fn build(corpus: &[Sentence], options: EnsembleOptions) -> Result<Self> {
		if options.max_order == 0 {
			return Err(CompleteError::InvalidOrder(0));
		}

		let lowered = lower_case(corpus);
		let chains: Vec<Chain> = (1..=options.max_order)
			.map(|order| Chain::from_lower_case(&lowered, order))
			.collect();

		log::info!(
			"Built ensemble of {} chains from {} sentences ({}, {})",
			chains.len(),
			corpus.len(),
			options.preference,
			options.fallback
		);

		Self::from_chains(chains, options.preference, options.fallback)
	}

	/// Assembles an ensemble from already built chains.
	///
	/// # Errors
	/// Returns `InvalidArgument` if `chains` is empty or holds two chains of
	/// the same order.
	pub fn from_chains(mut chains: Vec<Chain>, preference: OrderPreference, fallback: Fallback) -> Result<Self> {
		if chains.is_empty() {
			return Err(CompleteError::InvalidArgument("An ensemble needs at least one chain".to_owned()));
		}

		match preference {
			OrderPreference::Descending => chains.sort_by_key(|chain| Reverse(chain.order())),
			OrderPreference::Ascending => chains.sort_by_key(Chain::order),
		}

		if chains.windows(2).any(|pair| pair[0].order() == pair[1].order()) {
			return Err(CompleteError::InvalidArgument("Duplicate chain order".to_owned()));
		}

		Ok(Self { chains, preference, fallback })
	}

	/// Chains in the order they are queried.
	pub fn chains(&self) -> &[Chain] {
		&self.chains
	}

	pub fn preference(&self) -> OrderPreference {
		self.preference
	}

	pub fn fallback(&self) -> Fallback {
		self.fallback
	}

	/// Highest order held by the ensemble.
	pub fn max_order(&self) -> usize {
		self.chains.iter().map(Chain::order).max().unwrap_or(0)
	}

	/// Suggests the word following `history` (the words typed so far).
	pub fn next_words<S: AsRef<str>>(&self, history: &[S]) -> Vec<Suggestion> {
		let key = normalize(history);
		self.merge(|chain| trailing(&key, chain.order()).map(|k| chain.word_transitions(k)))
	}

	/// Suggests suffixes completing `partial`, the word being typed after
	/// `history`.
	pub fn completions<S: AsRef<str>>(&self, history: &[S], partial: &str) -> Vec<Suggestion> {
		if partial.is_empty() {
			return Vec::new();
		}

		let mut key = normalize(history);
		key.push(partial.to_lowercase());
		self.merge(|chain| trailing(&key, chain.order()).map(|k| chain.prefix_transitions(k)))
	}

	/// The most likely suffix of `partial`, shown ahead of the cursor.
	pub fn ghost_completion<S: AsRef<str>>(&self, history: &[S], partial: &str) -> Option<String> {
		self.completions(history, partial).into_iter().next().map(|s| s.text)
	}

	/// Random walk over the word tables.
	///
	/// Starts from `seed` (or from a random known word when `seed` is empty)
	/// and appends up to `max_words` words. Each step samples from the most
	/// specific order that knows the trailing words; the walk stops early
	/// when no order does. Returns the seed followed by the generated words.
	pub fn generate<S: AsRef<str>, R: Rng>(&self, seed: &[S], max_words: usize, rng: &mut R) -> Vec<String> {
		let mut words = normalize(seed);
		if words.is_empty() {
			let start = self
				.chains
				.iter()
				.find(|chain| chain.order() == 1)
				.and_then(|chain| chain.words().contexts().choose(rng))
				.map(|context| context[0].clone());
			match start {
				Some(word) => words.push(word),
				None => return words,
			}
		}

		let mut by_specificity: Vec<&Chain> = self.chains.iter().collect();
		by_specificity.sort_by_key(|chain| Reverse(chain.order()));

		let target = words.len().saturating_add(max_words);
		while words.len() < target {
			let next = by_specificity.iter().find_map(|chain| {
				let key = trailing(&words, chain.order())?;
				sample(chain.word_transitions(key), rng).map(|t| t.state.clone())
			});
			match next {
				Some(word) => words.push(word),
				None => break,
			}
		}

		words
	}

	/// Combines per-chain lookups following the fallback policy.
	fn merge<'a, F>(&'a self, lookup: F) -> Vec<Suggestion>
	where
		F: Fn(&'a Chain) -> Option<&'a [Transition]>,
	{
		let mut merged: Vec<Suggestion> = Vec::with_capacity(SUGGESTION_LIMIT);

		for chain in &self.chains {
			let transitions = match lookup(chain) {
				Some(t) if !t.is_empty() => t,
				_ => continue,
			};

			if self.fallback == Fallback::FirstHit {
				return transitions.iter().take(SUGGESTION_LIMIT).map(Suggestion::from).collect();
			}

			for transition in transitions {
				if merged.len() == SUGGESTION_LIMIT {
					break;
				}
				if !merged.iter().any(|s| s.text == transition.state) {
					merged.push(Suggestion::from(transition));
				}
			}
			if merged.len() == SUGGESTION_LIMIT {
				break;
			}
		}

		merged
	}
}

/// The last `order` elements of `key`, or `None` if there are fewer.
fn trailing(key: &[String], order: usize) -> Option<&[String]> {
	key.len().checked_sub(order).map(|start| &key[start..])
}

#[cfg(test)]
mod tests {
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	use super::*;

	fn corpus(sentences: &[&[&str]]) -> Vec<Sentence> {
		sentences
			.iter()
			.map(|s| s.iter().map(|w| (*w).to_owned()).collect())
			.collect()
	}

	/// ("a", "b") → {c, d}; ("b",) → {e, f} dominate, then {c, d}.
	fn layered() -> Vec<Sentence> {
		let mut sentences = corpus(&[&["a", "b", "c"], &["a", "b", "d"]]);
		for _ in 0..3 {
			sentences.extend(corpus(&[&["x", "b", "e"], &["y", "b", "f"]]));
		}
		sentences
	}

	fn ensemble(sentences: &[Sentence], max_order: usize, preference: OrderPreference, fallback: Fallback) -> ChainEnsemble {
		ChainEnsemble::build(sentences, EnsembleOptions { max_order, preference, fallback }).unwrap()
	}

	fn texts(suggestions: &[Suggestion]) -> Vec<&str> {
		suggestions.iter().map(|s| s.text.as_str()).collect()
	}

	#[test]
	fn concatenate_puts_higher_order_first() {
		let ensemble = ensemble(&layered(), 2, OrderPreference::Descending, Fallback::Concatenate);
		assert_eq!(texts(&ensemble.next_words(&["a", "b"])), vec!["c", "d", "e"]);
	}

	#[test]
	fn first_hit_stops_at_first_order_with_data() {
		let ensemble = ensemble(&layered(), 2, OrderPreference::Descending, Fallback::FirstHit);
		assert_eq!(texts(&ensemble.next_words(&["a", "b"])), vec!["c", "d"]);
	}

	#[test]
	fn first_hit_falls_back_on_a_miss() {
		let ensemble = ensemble(&layered(), 2, OrderPreference::Descending, Fallback::FirstHit);
		assert_eq!(texts(&ensemble.next_words(&["zzz", "b"])), vec!["e", "f", "c"]);
	}

	#[test]
	fn ascending_preference_lets_order_one_dominate() {
		let ensemble = ensemble(&layered(), 2, OrderPreference::Ascending, Fallback::Concatenate);
		assert_eq!(texts(&ensemble.next_words(&["a", "b"])), vec!["e", "f", "c"]);
		assert_eq!(ensemble.chains()[0].order(), 1);
	}

	#[test]
	fn short_history_skips_higher_orders() {
		let ensemble = ensemble(&layered(), 3, OrderPreference::Descending, Fallback::Concatenate);
		assert_eq!(texts(&ensemble.next_words(&["b"])), vec!["e", "f", "c"]);
		assert!(ensemble.next_words::<&str>(&[]).is_empty());
	}

	#[test]
	fn long_history_uses_only_trailing_words() {
		let ensemble = ensemble(&layered(), 2, OrderPreference::Descending, Fallback::Concatenate);
		assert_eq!(
			ensemble.next_words(&["we", "said", "a", "b"]),
			ensemble.next_words(&["a", "b"])
		);
	}

	#[test]
	fn concatenate_does_not_repeat_words() {
		let sentences = corpus(&[&["a", "b", "c"], &["x", "b", "c"], &["x", "b", "d"]]);
		let ensemble = ensemble(&sentences, 2, OrderPreference::Descending, Fallback::Concatenate);
		assert_eq!(texts(&ensemble.next_words(&["a", "b"])), vec!["c", "d"]);
	}

	#[test]
	fn completions_and_ghost_text() {
		let sentences = corpus(&[&["the", "cat", "sat"], &["the", "cow", "ran"], &["a", "car", "ran"]]);
		let ensemble = ensemble(&sentences, 2, OrderPreference::Descending, Fallback::Concatenate);

		// Order 2 knows "the c..." → {at, ow}; order 1 adds "ar".
		assert_eq!(texts(&ensemble.completions(&["the"], "c")), vec!["at", "ow", "ar"]);
		assert_eq!(ensemble.ghost_completion(&["the"], "c").as_deref(), Some("at"));
		assert_eq!(ensemble.ghost_completion::<&str>(&[], "t").as_deref(), Some("he"));
		assert!(ensemble.ghost_completion(&["the"], "").is_none());
		assert!(ensemble.ghost_completion(&["the"], "q").is_none());
	}

	#[test]
	fn history_case_is_ignored() {
		let ensemble = ensemble(&layered(), 2, OrderPreference::Descending, Fallback::Concatenate);
		assert_eq!(ensemble.next_words(&["A", "B"]), ensemble.next_words(&["a", "b"]));
		assert_eq!(ensemble.completions(&["X"], "B"), ensemble.completions(&["x"], "b"));
	}

	#[test]
	fn generate_follows_deterministic_chains() {
		let sentences = corpus(&[&["the", "cat", "sat", "down"]]);
		let ensemble = ensemble(&sentences, 2, OrderPreference::Descending, Fallback::Concatenate);
		let mut rng = StdRng::seed_from_u64(3);

		assert_eq!(ensemble.generate(&["the"], 10, &mut rng), vec!["the", "cat", "sat", "down"]);
		assert_eq!(ensemble.generate(&["the"], 1, &mut rng), vec!["the", "cat"]);
		assert!(ensemble.generate(&["unknown"], 5, &mut rng) == vec!["unknown"]);
	}

	#[test]
	fn generate_accepts_an_unbounded_word_count() {
		let sentences = corpus(&[&["the", "cat", "sat", "down"]]);
		let ensemble = ensemble(&sentences, 2, OrderPreference::Descending, Fallback::Concatenate);
		let mut rng = StdRng::seed_from_u64(3);

		assert_eq!(ensemble.generate(&["cat"], usize::MAX, &mut rng), vec!["cat", "sat", "down"]);
	}

	#[test]
	fn mixed_case_corpus_matches_lower_case_chains() {
		let sentences = corpus(&[&["The", "Cat", "SAT"], &["the", "cow", "ran"]]);
		let ensemble = ensemble(&sentences, 2, OrderPreference::Descending, Fallback::Concatenate);

		for chain in ensemble.chains() {
			let direct = Chain::build(&sentences, chain.order()).unwrap();
			assert_eq!(chain.words(), direct.words());
			assert_eq!(chain.prefixes(), direct.prefixes());
		}
		assert_eq!(texts(&ensemble.next_words(&["the", "cat"])), vec!["sat"]);
	}

	#[test]
	fn generate_without_seed_starts_from_a_known_word() {
		let sentences = corpus(&[&["ping", "pong"]]);
		let ensemble = ensemble(&sentences, 1, OrderPreference::Descending, Fallback::Concatenate);
		let mut rng = StdRng::seed_from_u64(11);
		assert_eq!(ensemble.generate::<&str, _>(&[], 3, &mut rng), vec!["ping", "pong"]);
	}

	#[test]
	fn invalid_constructions_are_rejected() {
		let options = EnsembleOptions { max_order: 0, ..Default::default() };
		assert!(matches!(ChainEnsemble::build(&layered(), options), Err(CompleteError::InvalidOrder(0))));
		assert!(ChainEnsemble::from_chains(Vec::new(), OrderPreference::Descending, Fallback::Concatenate).is_err());

		let chains = vec![Chain::build(&layered(), 1).unwrap(), Chain::build(&layered(), 1).unwrap()];
		assert!(ChainEnsemble::from_chains(chains, OrderPreference::Descending, Fallback::Concatenate).is_err());
	}

	#[test]
	fn options_parse_from_strings() {
		assert_eq!("descending".parse::<OrderPreference>().unwrap(), OrderPreference::Descending);
		assert_eq!("ASC".parse::<OrderPreference>().unwrap(), OrderPreference::Ascending);
		assert_eq!("first-hit".parse::<Fallback>().unwrap(), Fallback::FirstHit);
		assert!("sideways".parse::<Fallback>().is_err());
	}
}
