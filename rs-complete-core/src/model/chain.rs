use std::sync::mpsc;
use std::thread;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::table::{Context, TableBuilder, Transition, TransitionTable, sample};
use crate::corpus::Sentence;
use crate::error::{CompleteError, Result};

/// Maximum number of suggestions returned by a query.
pub const SUGGESTION_LIMIT: usize = 3;

/// Number of corpus chunks counted in parallel per CPU.
const CHUNK_FACTOR: usize = 8;

/// A ranked continuation: a next word, or the remaining suffix of a word.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Suggestion {
	pub text: String,
	pub probability: f64,
}

impl From<&Transition> for Suggestion {
	fn from(transition: &Transition) -> Self {
		Self {
			text: transition.state.clone(),
			probability: transition.probability,
		}
	}
}

/// A fixed-order Markov chain over words.
///
/// A chain of order `n` owns two tables built in the same corpus pass:
/// - `words`: the previous `n` words → next word
/// - `prefixes`: the previous `n-1` words plus the first characters of the
///   `n`-th word → remaining characters of that word
///
/// # Invariants
/// - `order >= 1`
/// - All keys and next-states are lower-case
/// - Tables are never modified after `build` returns
#[derive(Clone, Debug)]
pub struct Chain {
	order: usize,
	words: TransitionTable,
	prefixes: TransitionTable,
}

impl Chain {
	/// Builds a chain of order `order` from a tokenized corpus.
	///
	/// Sentences too short to hold a full window are skipped. An empty corpus
	/// gives an empty chain which answers every query with no suggestions.
	///
	/// # Errors
	/// Returns `InvalidOrder` if `order == 0`.
	pub fn build(corpus: &[Sentence], order: usize) -> Result<Self> {
		if order == 0 {
			return Err(CompleteError::InvalidOrder(order));
		}
		Ok(Self::from_lower_case(&lower_case(corpus), order))
	}

	/// Builds from a corpus already passed through [`lower_case`].
	///
	/// `order` must be at least 1.
	pub(crate) fn from_lower_case(corpus: &[Sentence], order: usize) -> Self {
		let words = count_windows(corpus, order + 1, |window, table| {
			table.add(window[..order].to_vec(), window[order].clone());
		});

		let prefixes = count_windows(corpus, order + 1, |window, table| {
			let last = &window[order - 1];
			// Every split leaving at least one character on each side.
			for (k, _) in last.char_indices().skip(1) {
				let mut context = window[..order - 1].to_vec();
				context.push(last[..k].to_owned());
				table.add(context, last[k..].to_owned());
			}
		});

		log::info!(
			"Built order-{} chain: {} word contexts, {} prefix contexts",
			order,
			words.len(),
			prefixes.len()
		);

		Self { order, words, prefixes }
	}

	/// Number of context elements a query must supply.
	pub fn order(&self) -> usize {
		self.order
	}

	/// The word-transition table.
	pub fn words(&self) -> &TransitionTable {
		&self.words
	}

	/// The prefix-completion table.
	pub fn prefixes(&self) -> &TransitionTable {
		&self.prefixes
	}

	/// Top suggestions for the word following `context`.
	///
	/// # Errors
	/// Returns `InvalidArity` if `context.len() != order`.
	pub fn next_words<S: AsRef<str>>(&self, context: &[S]) -> Result<Vec<Suggestion>> {
		self.top_next_words(context, SUGGESTION_LIMIT)
	}

	/// Like [`Chain::next_words`] with a caller-chosen limit.
	pub fn top_next_words<S: AsRef<str>>(&self, context: &[S], limit: usize) -> Result<Vec<Suggestion>> {
		let key = self.key(context)?;
		Ok(rank(self.word_transitions(&key), limit))
	}

	/// Top completions of a partially typed word.
	///
	/// `context` holds the previous `order - 1` words followed by the partial
	/// word. Each suggestion text is the missing suffix.
	///
	/// # Errors
	/// Returns `InvalidArity` if `context.len() != order`.
	pub fn completions<S: AsRef<str>>(&self, context: &[S]) -> Result<Vec<Suggestion>> {
		self.top_completions(context, SUGGESTION_LIMIT)
	}

	/// Like [`Chain::completions`] with a caller-chosen limit.
	pub fn top_completions<S: AsRef<str>>(&self, context: &[S], limit: usize) -> Result<Vec<Suggestion>> {
		let key = self.key(context)?;
		Ok(rank(self.prefix_transitions(&key), limit))
	}

	/// Draws a next word at random, weighted by its probability.
	///
	/// # Errors
	/// Returns `InvalidArity` if `context.len() != order`.
	pub fn sample_next_word<S: AsRef<str>, R: Rng>(&self, context: &[S], rng: &mut R) -> Result<Option<String>> {
		let key = self.key(context)?;
		Ok(sample(self.word_transitions(&key), rng).map(|t| t.state.clone()))
	}

	/// Raw lookup with an already normalized key of the right arity.
	pub(crate) fn word_transitions(&self, key: &[String]) -> &[Transition] {
		self.words.get(key)
	}

	pub(crate) fn prefix_transitions(&self, key: &[String]) -> &[Transition] {
		self.prefixes.get(key)
	}

	fn key<S: AsRef<str>>(&self, context: &[S]) -> Result<Context> {
		if context.len() != self.order {
			return Err(CompleteError::InvalidArity {
				expected: self.order,
				got: context.len(),
			});
		}
		Ok(normalize(context))
	}
}

/// Lower-cases every element of a context.
pub(crate) fn normalize<S: AsRef<str>>(context: &[S]) -> Context {
	context.iter().map(|s| s.as_ref().to_lowercase()).collect()
}

fn rank(transitions: &[Transition], limit: usize) -> Vec<Suggestion> {
	transitions.iter().take(limit).map(Suggestion::from).collect()
}

/// Lower-cases every token of a corpus.
pub(crate) fn lower_case(corpus: &[Sentence]) -> Vec<Sentence> {
	corpus.iter().map(|sentence| normalize(sentence)).collect()
}

/// Counts every `width`-token window of a lower-cased corpus into a frozen table.
///
/// `extract` decides which `(context, next)` pairs a window contributes. The
/// corpus is split into chunks counted on scoped threads; partial counts are
/// merged before normalization so the result matches a sequential pass.
fn count_windows<E>(corpus: &[Sentence], width: usize, extract: E) -> TransitionTable
where
	E: Fn(&[String], &mut TableBuilder) + Sync,
{
	let chunks = num_cpus::get() * CHUNK_FACTOR;
	let chunk_size = corpus.len().div_ceil(chunks).max(1);

	let mut builder = TableBuilder::default();
	thread::scope(|scope| {
		let (tx, rx) = mpsc::channel();
		for chunk in corpus.chunks(chunk_size) {
			let tx = tx.clone();
			let extract = &extract;
			scope.spawn(move || {
				let mut partial = TableBuilder::default();
				for sentence in chunk {
					for window in sentence.windows(width) {
						extract(window, &mut partial);
					}
				}
				// The receiver lives until every sender is gone.
				let _ = tx.send(partial);
			});
		}
		drop(tx);

		for partial in rx {
			builder.merge(partial);
		}
	});

	builder.freeze()
}
