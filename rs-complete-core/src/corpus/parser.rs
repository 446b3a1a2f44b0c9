//! Raw text → tokenized sentences.
//!
//! The pipeline lower-cases the text, expands English contractions, drops
//! every character that is not a letter, whitespace or sentence terminator,
//! then splits into sentences and whitespace-separated words.

use super::Sentence;

/// Characters ending a sentence.
pub const TERMINATORS: [char; 3] = ['.', '?', '!'];

/// Contractions as `(head, tail, expansion)` around the apostrophe, tried in
/// this order.
///
/// `head` is the end of the word before the apostrophe that the expansion
/// replaces. A non-empty head must be the whole word, so irregular negations
/// come before the generic `n't` rule.
const CONTRACTIONS: [(&str, &str, &str); 9] = [
	("won", "t", "will not"),
	("can", "t", "can not"),
	("n", "t", " not"),
	("", "re", " are"),
	("", "s", " is"),
	("", "d", " would"),
	("", "ll", " will"),
	("", "ve", " have"),
	("", "m", " am"),
];

/// Splits a block of text into tokenized sentences.
///
/// Sentences left without any word are dropped.
pub fn prepare_text(text: &str) -> Vec<Sentence> {
	clean(text)
		.split(TERMINATORS)
		.map(split_words)
		.filter(|sentence| !sentence.is_empty())
		.collect()
}

/// Tokenizes a sentence fragment (no sentence splitting).
///
/// Terminators are treated like any other dropped character.
pub fn tokenize(fragment: &str) -> Sentence {
	split_words(&clean(fragment).replace(TERMINATORS, " "))
}

/// Keeps only the letters of a single word, lower-cased.
pub fn clean_word(word: &str) -> String {
	word.chars()
		.filter(char::is_ascii_alphabetic)
		.map(|c| c.to_ascii_lowercase())
		.collect()
}

fn clean(text: &str) -> String {
	let text = expand_contractions(&text.to_lowercase().replace('\u{2019}', "'"));

	text.chars()
		.filter_map(|c| match c {
			c if c.is_ascii_alphabetic() || TERMINATORS.contains(&c) => Some(c),
			c if c.is_whitespace() => Some(' '),
			_ => None,
		})
		.collect()
}

/// Expands contractions whose apostrophe sits between letters.
///
/// Quotes around a word (`'sorry'`) are left alone.
fn expand_contractions(text: &str) -> String {
	let mut expanded = String::with_capacity(text.len());
	let mut rest = text;

	while let Some(pos) = rest.find('\'') {
		let (before, after) = (&rest[..pos], &rest[pos + 1..]);
		let previous = before.chars().next_back().or_else(|| expanded.chars().next_back());
		let found = if is_letter(previous) { contraction_at(before, after) } else { None };
		match found {
			Some((head, tail, expansion)) => {
				expanded.push_str(&before[..before.len() - head.len()]);
				expanded.push_str(expansion);
				rest = &after[tail.len()..];
			}
			None => {
				expanded.push_str(before);
				expanded.push('\'');
				rest = after;
			}
		}
	}

	expanded.push_str(rest);
	expanded
}

fn is_letter(c: Option<char>) -> bool {
	c.is_some_and(|c| c.is_ascii_alphabetic())
}

fn contraction_at(before: &str, after: &str) -> Option<(&'static str, &'static str, &'static str)> {
	CONTRACTIONS.into_iter().find(|(head, tail, _)| {
		let whole_head = match before.strip_suffix(head) {
			Some(start) => head.len() <= 1 || !is_letter(start.chars().next_back()),
			None => false,
		};
		let whole_tail = match after.strip_prefix(tail) {
			Some(end) => !is_letter(end.chars().next()),
			None => false,
		};
		whole_head && whole_tail
	})
}

fn split_words(sentence: &str) -> Sentence {
	sentence.split_whitespace().map(str::to_owned).collect()
}
