use thiserror::Error;

/// Errors surfaced by the completion engine.
///
/// A context with no recorded data is a normal lookup miss and never shows up
/// here. Only caller contract violations and I/O problems do.
#[derive(Error, Debug)]
pub enum CompleteError {
	#[error("Invalid order: {0} (must be >= 1)")]
	InvalidOrder(usize),

	#[error("Invalid context arity: expected {expected}, got {got}")]
	InvalidArity { expected: usize, got: usize },

	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Binary cache error: {0}")]
	Cache(#[from] postcard::Error),
}

pub type Result<T> = std::result::Result<T, CompleteError>;
