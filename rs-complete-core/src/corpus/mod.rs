use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CompleteError, Result};

/// Raw text → tokenized sentences.
pub mod parser;

/// An ordered sequence of lower-case alphabetic tokens.
pub type Sentence = Vec<String>;

/// File extensions recognized as corpus sources.
pub const CORPUS_EXTENSIONS: [&str; 2] = ["json", "txt"];

/// A tokenized, sentence-segmented training corpus.
///
/// Serializes as a plain list of lists of strings, which is also the JSON
/// exchange format read by [`Corpus::load`].
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct Corpus {
	sentences: Vec<Sentence>,
}

impl Corpus {
	pub fn new(sentences: Vec<Sentence>) -> Self {
		Self { sentences }
	}

	/// Prepares raw text, one line at a time.
	///
	/// Each line is an independent block: a sentence never spans two lines.
	pub fn from_text(text: &str) -> Self {
		Self::new(text.lines().flat_map(parser::prepare_text).collect())
	}

	/// Parses the JSON exchange format (`[["the", "cat"], ...]`).
	pub fn from_json(json: &str) -> Result<Self> {
		Ok(serde_json::from_str(json)?)
	}

	pub fn sentences(&self) -> &[Sentence] {
		&self.sentences
	}

	pub fn len(&self) -> usize {
		self.sentences.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sentences.is_empty()
	}

	/// Appends the sentences of another corpus.
	pub fn extend(&mut self, other: Corpus) {
		self.sentences.extend(other.sentences);
	}

	/// Loads a corpus file.
	///
	/// - `.json`: the exchange format, read as-is
	/// - `.bin`: a binary cache written by an earlier load
	/// - anything else: raw text, prepared then cached next to the input as
	///   `<stem>.bin` (reused while it is newer than the text)
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		match path.extension().and_then(OsStr::to_str) {
			Some("json") => return Self::from_json(&fs::read_to_string(path)?),
			Some("bin") => return Ok(postcard::from_bytes(&fs::read(path)?)?),
			_ => (),
		}

		let cache = cache_path(path);
		if is_fresh(&cache, path) {
			log::debug!("Loading cached corpus {}", cache.display());
			return Ok(postcard::from_bytes(&fs::read(&cache)?)?);
		}

		log::debug!("Preparing corpus {}", path.display());
		let corpus = Self::from_text(&fs::read_to_string(path)?);
		fs::write(&cache, postcard::to_stdvec(&corpus)?)?;
		Ok(corpus)
	}

	/// Loads the corpus called `name` from `folder` (`name.json`, else `name.txt`).
	///
	/// # Errors
	/// Returns `InvalidArgument` if the name is not a plain file stem or if
	/// no matching file exists.
	pub fn load_named<P: AsRef<Path>>(folder: P, name: &str) -> Result<Self> {
		if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
			return Err(CompleteError::InvalidArgument(format!("Invalid corpus name '{name}'")));
		}

		CORPUS_EXTENSIONS
			.iter()
			.map(|ext| folder.as_ref().join(format!("{name}.{ext}")))
			.find(|path| path.is_file())
			.ok_or_else(|| CompleteError::InvalidArgument(format!("Corpus '{name}' not found")))
			.and_then(Self::load)
	}

	/// Names of the corpora available in `folder`, sorted and deduplicated.
	pub fn available<P: AsRef<Path>>(folder: P) -> Result<Vec<String>> {
		let mut names = Vec::new();
		for entry in fs::read_dir(folder)? {
			let path = entry?.path();
			if path.is_file() {
				names.extend(corpus_stem(&path));
			}
		}
		names.sort();
		names.dedup();
		Ok(names)
	}

	/// Loads and concatenates every corpus available in `folder`.
	pub fn load_folder<P: AsRef<Path>>(folder: P) -> Result<Self> {
		let mut corpus = Corpus::default();
		for name in Self::available(&folder)? {
			corpus.extend(Self::load_named(&folder, &name)?);
		}
		log::info!("Loaded {} sentences from {}", corpus.len(), folder.as_ref().display());
		Ok(corpus)
	}

	/// Writes the corpus in the JSON exchange format.
	pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		fs::write(path, serde_json::to_string_pretty(self)?)?;
		Ok(())
	}
}

impl AsRef<[Sentence]> for Corpus {
	fn as_ref(&self) -> &[Sentence] {
		&self.sentences
	}
}

/// Binary cache written next to a raw text corpus (`chat.txt` → `chat.bin`).
fn cache_path(source: &Path) -> PathBuf {
	source.with_extension("bin")
}

/// The corpus name of `path` if its extension is a corpus source.
fn corpus_stem(path: &Path) -> Option<String> {
	let extension = path.extension().and_then(OsStr::to_str)?;
	if !CORPUS_EXTENSIONS.contains(&extension) {
		return None;
	}
	path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
}

/// Whether `cache` exists and was written after `source` last changed.
fn is_fresh(cache: &Path, source: &Path) -> bool {
	let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
	match (modified(cache), modified(source)) {
		(Some(cache), Some(source)) => cache >= source,
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn scratch(test: &str) -> PathBuf {
		let dir = std::env::temp_dir().join(format!("rs-complete-corpus-{test}-{}", std::process::id()));
		let _ = fs::remove_dir_all(&dir);
		fs::create_dir_all(&dir).unwrap();
		dir
	}

	#[test]
	fn json_round_trip_is_a_list_of_lists() {
		let corpus = Corpus::from_json(r#"[["the", "cat"], ["a", "dog"]]"#).unwrap();
		assert_eq!(corpus.len(), 2);
		assert_eq!(corpus.sentences()[1], vec!["a".to_owned(), "dog".to_owned()]);
		assert_eq!(serde_json::to_string(&corpus).unwrap(), r#"[["the","cat"],["a","dog"]]"#);
	}

	#[test]
	fn malformed_json_is_an_error() {
		assert!(matches!(Corpus::from_json(r#"{"not": "a corpus"}"#), Err(CompleteError::Json(_))));
	}

	#[test]
	fn text_lines_are_prepared_independently() {
		let corpus = Corpus::from_text("The cat sat\non the mat. It's warm");
		assert_eq!(corpus.len(), 3);
		assert_eq!(corpus.sentences()[2], vec!["it".to_owned(), "is".to_owned(), "warm".to_owned()]);
	}

	#[test]
	fn text_load_writes_and_reuses_cache() {
		let dir = scratch("cache");
		let source = dir.join("chat.txt");
		fs::write(&source, "Hello world. Hello there.").unwrap();

		let first = Corpus::load(&source).unwrap();
		assert!(dir.join("chat.bin").is_file());

		let second = Corpus::load(&source).unwrap();
		assert_eq!(first, second);
		assert_eq!(Corpus::load(dir.join("chat.bin")).unwrap(), first);

		fs::remove_dir_all(&dir).unwrap();
	}

	#[test]
	fn cache_sits_next_to_the_source() {
		assert_eq!(cache_path(Path::new("data/chat.txt")), PathBuf::from("data/chat.bin"));
		assert_eq!(cache_path(Path::new("notes")), PathBuf::from("notes.bin"));
	}

	#[test]
	fn only_corpus_sources_are_listed() {
		let dir = scratch("listing");
		for name in ["b.txt", "a.json", "b.json", "c.bin", "d.md"] {
			fs::write(dir.join(name), "[]").unwrap();
		}
		fs::create_dir_all(dir.join("e.txt")).unwrap();

		assert_eq!(Corpus::available(&dir).unwrap(), vec!["a".to_owned(), "b".to_owned()]);
		assert_eq!(corpus_stem(Path::new("x/reviews.json")).as_deref(), Some("reviews"));
		assert_eq!(corpus_stem(Path::new("x/reviews.bin")), None);

		fs::remove_dir_all(&dir).unwrap();
	}

	#[test]
	fn folder_loading_by_name() {
		let dir = scratch("folder");
		fs::write(dir.join("a.txt"), "one two").unwrap();
		Corpus::new(vec![vec!["three".to_owned(), "four".to_owned()]])
			.save_json(dir.join("b.json"))
			.unwrap();

		assert_eq!(Corpus::available(&dir).unwrap(), vec!["a".to_owned(), "b".to_owned()]);
		assert_eq!(Corpus::load_named(&dir, "b").unwrap().len(), 1);
		assert_eq!(Corpus::load_folder(&dir).unwrap().len(), 2);

		assert!(Corpus::load_named(&dir, "missing").is_err());
		assert!(Corpus::load_named(&dir, "../a").is_err());

		fs::remove_dir_all(&dir).unwrap();
	}
}
