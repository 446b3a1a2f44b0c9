use std::path::PathBuf;

use clap::Parser;
use rs_complete_core::model::{EnsembleOptions, Fallback, OrderPreference};
use serde::{Deserialize, Serialize};

/// Command-line flags. Every flag overrides the matching config-file entry.
#[derive(Parser, Debug, Default)]
#[command(name = "rs-complete-server")]
#[command(about = "HTTP next-word and word-completion service")]
#[command(version)]
pub struct Args {
	/// Address to bind
	#[arg(long)]
	pub host: Option<String>,

	/// Port to listen on
	#[arg(short, long)]
	pub port: Option<u16>,

	/// Folder holding the corpus files (.txt, .json)
	#[arg(short, long)]
	pub data_dir: Option<PathBuf>,

	/// Highest chain order
	#[arg(long)]
	pub max_order: Option<usize>,

	/// Order queried first: descending or ascending
	#[arg(long)]
	pub preference: Option<OrderPreference>,

	/// How orders are combined: concatenate or first-hit
	#[arg(long)]
	pub fallback: Option<Fallback>,

	/// Comma-separated corpus names loaded at startup (default: all)
	#[arg(long, value_delimiter = ',')]
	pub corpora: Option<Vec<String>>,

	/// Ignore the config file
	#[arg(long)]
	pub no_config: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
	pub host: String,
	pub port: u16,
	pub data_dir: PathBuf,
	/// Corpora loaded at startup; empty means every corpus in `data_dir`.
	pub corpora: Vec<String>,
	pub ensemble: EnsembleOptions,
	/// Upper bound for `max_words` on `/v1/generate`.
	pub max_generated_words: usize,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			host: "127.0.0.1".to_owned(),
			port: 5000,
			data_dir: PathBuf::from("./data"),
			corpora: Vec::new(),
			ensemble: EnsembleOptions::default(),
			max_generated_words: 100,
		}
	}
}

impl ServerConfig {
	/// Reads the config file from the user config directory.
	///
	/// Falls back to defaults when the file cannot be read.
	pub fn load() -> Self {
		match confy::load("rs-complete", Some("server")) {
			Ok(config) => config,
			Err(err) => {
				log::warn!("Failed to load config, using defaults: {err}");
				Self::default()
			}
		}
	}

	/// Resolves the effective configuration from the file and the flags.
	pub fn from_args(args: Args) -> Self {
		let base = if args.no_config { Self::default() } else { Self::load() };
		base.with_args(args)
	}

	pub fn with_args(mut self, args: Args) -> Self {
		if let Some(host) = args.host {
			self.host = host;
		}
		if let Some(port) = args.port {
			self.port = port;
		}
		if let Some(data_dir) = args.data_dir {
			self.data_dir = data_dir;
		}
		if let Some(max_order) = args.max_order {
			self.ensemble.max_order = max_order;
		}
		if let Some(preference) = args.preference {
			self.ensemble.preference = preference;
		}
		if let Some(fallback) = args.fallback {
			self.ensemble.fallback = fallback;
		}
		if let Some(corpora) = args.corpora {
			self.corpora = corpora;
		}
		self
	}
}
