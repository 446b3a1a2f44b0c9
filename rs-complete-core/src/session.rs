//! Editor-session bookkeeping.
//!
//! An [`EditorSession`] holds the text being edited and the cursor position.
//! It decides which question to ask the [`ChainEnsemble`] (next word, or
//! completion of the word under the cursor) and applies accepted suggestions
//! back to the text. The ensemble itself never sees any of this state.

use serde::{Deserialize, Serialize};

use crate::corpus::parser::{TERMINATORS, clean_word, tokenize};
use crate::model::{ChainEnsemble, Suggestion};

/// What the user is doing at the cursor.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SuggestionMode {
	/// A word was just finished (or nothing typed yet).
	NextWord,
	/// A word is being typed; `partial` is the text typed so far.
	Completion { partial: String },
}

/// Everything a front end needs to render suggestions.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SuggestionState {
	pub mode: SuggestionMode,
	/// Whole words to offer, best first.
	pub suggestions: Vec<Suggestion>,
	/// Most likely end of the word being typed, shown ahead of the cursor.
	pub ghost: Option<String>,
}

/// Text plus cursor, with the cursor counted in characters.
///
/// # Invariants
/// - `cursor <= text.chars().count()`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EditorSession {
	text: String,
	cursor: usize,
}

impl EditorSession {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a session with the cursor at the end of `text`.
	pub fn with_text(text: impl Into<String>) -> Self {
		let text = text.into();
		let cursor = text.chars().count();
		Self { text, cursor }
	}

	pub fn text(&self) -> &str {
		&self.text
	}

	pub fn cursor(&self) -> usize {
		self.cursor
	}

	/// Replaces the whole text; the cursor is clamped to the text length.
	pub fn set_text(&mut self, text: impl Into<String>, cursor: usize) {
		self.text = text.into();
		self.set_cursor(cursor);
	}

	pub fn set_cursor(&mut self, cursor: usize) {
		self.cursor = cursor.min(self.text.chars().count());
	}

	/// Inserts `s` at the cursor and moves the cursor after it.
	pub fn insert(&mut self, s: &str) {
		let at = self.byte_cursor();
		self.text.insert_str(at, s);
		self.cursor += s.chars().count();
	}

	/// Computes the suggestions for the current cursor position.
	///
	/// Only the current sentence (after the last `.`, `?` or `!`) before the
	/// cursor is used as history.
	pub fn suggest(&self, ensemble: &ChainEnsemble) -> SuggestionState {
		let (head, partial) = split_partial(self.before_cursor());
		let sentence = head.rsplit(TERMINATORS).next().unwrap_or_default();
		let history = tokenize(sentence);

		if partial.is_empty() {
			return SuggestionState {
				mode: SuggestionMode::NextWord,
				suggestions: ensemble.next_words(&history),
				ghost: None,
			};
		}

		let completions = ensemble.completions(&history, &clean_word(partial));
		let ghost = completions.first().map(|s| s.text.clone());
		let suggestions = completions
			.into_iter()
			.map(|s| Suggestion {
				text: format!("{partial}{}", s.text),
				probability: s.probability,
			})
			.collect();

		SuggestionState {
			mode: SuggestionMode::Completion { partial: partial.to_owned() },
			suggestions,
			ghost,
		}
	}

	/// Applies a chosen suggestion.
	///
	/// After whitespace (or at the start) the word is inserted; in the middle
	/// of a word it replaces the part typed so far. The cursor ends up right
	/// after the word.
	pub fn accept(&mut self, word: &str) {
		let end = self.byte_cursor();
		let (head, _) = split_partial(&self.text[..end]);
		let start = head.len();

		self.text.replace_range(start..end, word);
		self.cursor = self.text[..start].chars().count() + word.chars().count();
	}

	/// Inserts the ghost completion, if there is one.
	pub fn accept_ghost(&mut self, ensemble: &ChainEnsemble) -> bool {
		match self.suggest(ensemble).ghost {
			Some(ghost) => {
				self.insert(&ghost);
				true
			}
			None => false,
		}
	}

	fn byte_cursor(&self) -> usize {
		self.text
			.char_indices()
			.nth(self.cursor)
			.map_or(self.text.len(), |(i, _)| i)
	}

	fn before_cursor(&self) -> &str {
		&self.text[..self.byte_cursor()]
	}
}

/// Splits `before` into everything up to the word being typed, and that word.
///
/// The word is empty when `before` ends with whitespace or a terminator.
fn split_partial(before: &str) -> (&str, &str) {
	let head = before.trim_end_matches(|c: char| !c.is_whitespace() && !TERMINATORS.contains(&c));
	(head, &before[head.len()..])
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::corpus::Corpus;
	use crate::model::EnsembleOptions;

	fn ensemble() -> ChainEnsemble {
		let corpus = Corpus::from_text("The cat sat on the mat.\nThe cat ran home.\nThe dog sat down.");
		ChainEnsemble::build(corpus.sentences(), EnsembleOptions::default()).unwrap()
	}

	fn words(state: &SuggestionState) -> Vec<&str> {
		state.suggestions.iter().map(|s| s.text.as_str()).collect()
	}

	#[test]
	fn empty_text_has_nothing_to_suggest() {
		let state = EditorSession::new().suggest(&ensemble());
		assert_eq!(state.mode, SuggestionMode::NextWord);
		assert!(state.suggestions.is_empty());
	}

	#[test]
	fn trailing_space_asks_for_next_word() {
		let state = EditorSession::with_text("The cat ").suggest(&ensemble());
		assert_eq!(state.mode, SuggestionMode::NextWord);
		assert_eq!(words(&state), vec!["ran", "sat"]);
		assert!(state.ghost.is_none());
	}

	#[test]
	fn history_restarts_at_sentence_end() {
		let ensemble = ensemble();
		let fresh = EditorSession::with_text("The dog ").suggest(&ensemble);
		let after_sentence = EditorSession::with_text("I ran. The dog ").suggest(&ensemble);
		assert_eq!(fresh, after_sentence);
	}

	#[test]
	fn partial_word_gets_completions_and_ghost() {
		let state = EditorSession::with_text("The cat s").suggest(&ensemble());
		assert_eq!(state.mode, SuggestionMode::Completion { partial: "s".to_owned() });
		assert_eq!(state.ghost.as_deref(), Some("at"));
		assert_eq!(words(&state)[0], "sat");
	}

	#[test]
	fn completions_keep_typed_case() {
		let state = EditorSession::with_text("Th").suggest(&ensemble());
		assert_eq!(words(&state), vec!["The"]);
	}

	#[test]
	fn only_text_before_cursor_counts() {
		let mut session = EditorSession::with_text("The cat sat");
		session.set_cursor(8);
		let state = session.suggest(&ensemble());
		assert_eq!(state.mode, SuggestionMode::NextWord);
		assert_eq!(words(&state), vec!["ran", "sat"]);
	}

	#[test]
	fn accept_replaces_partial_word() {
		let mut session = EditorSession::with_text("The ca");
		session.accept("cat");
		assert_eq!(session.text(), "The cat");
		assert_eq!(session.cursor(), 7);
	}

	#[test]
	fn accept_inserts_after_whitespace() {
		let mut session = EditorSession::with_text("The  tail");
		session.set_cursor(4);
		session.accept("cat");
		assert_eq!(session.text(), "The cat tail");
		assert_eq!(session.cursor(), 7);
	}

	#[test]
	fn accept_ghost_completes_the_word() {
		let ensemble = ensemble();
		let mut session = EditorSession::with_text("The d");
		assert!(session.accept_ghost(&ensemble));
		assert_eq!(session.text(), "The dog");

		let mut nothing = EditorSession::with_text("The q");
		assert!(!nothing.accept_ghost(&ensemble));
		assert_eq!(nothing.text(), "The q");
	}

	#[test]
	fn cursor_is_clamped_and_counted_in_chars() {
		let mut session = EditorSession::new();
		session.set_text("é", 10);
		assert_eq!(session.cursor(), 1);
		session.insert("t");
		assert_eq!(session.text(), "ét");
		assert_eq!(session.cursor(), 2);
	}

	#[test]
	fn state_serializes_with_mode_tag() {
		let state = EditorSession::with_text("The c").suggest(&ensemble());
		let json = serde_json::to_value(&state).unwrap();
		assert_eq!(json["mode"]["mode"], "completion");
		assert_eq!(json["mode"]["partial"], "c");
		assert_eq!(json["ghost"], "at");
	}
}
