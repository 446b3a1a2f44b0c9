use std::path::Path;
use std::sync::{Arc, RwLock};

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, put, web};
use clap::Parser;
use serde::Deserialize;

use rs_complete_core::CompleteError;
use rs_complete_core::corpus::Corpus;
use rs_complete_core::corpus::parser::{clean_word, tokenize};
use rs_complete_core::model::{ChainEnsemble, EnsembleOptions};
use rs_complete_core::session::EditorSession;

mod config;

use config::{Args, ServerConfig};

/// Query parameters for `/v1/next_words` and `/v1/completions`.
#[derive(Deserialize)]
struct ContextQuery {
	/// Words typed so far, space separated.
	context: Option<String>,
	/// Word being typed (completions only).
	partial: Option<String>,
}

/// Query parameters for `/v1/suggest`.
#[derive(Deserialize)]
struct SuggestQuery {
	text: Option<String>,
	/// Cursor position in characters; defaults to the end of `text`.
	cursor: Option<usize>,
}

/// Query parameters for `/v1/generate`.
#[derive(Deserialize)]
struct GenerateParams {
	seed: Option<String>,
	max_words: Option<usize>,
}

#[derive(Deserialize)]
struct CorporaQuery {
	names: Option<String>,
}

impl GenerateParams {
	/// Validates `max_words` against the configured bound.
	fn max_words(&self, bound: usize) -> Result<usize, String> {
		match self.max_words {
			None => Ok(bound.min(20)),
			Some(0) => Err("max_words must be at least 1".into()),
			Some(n) if n > bound => Err(format!("max_words must be at most {bound}")),
			Some(n) => Ok(n),
		}
	}
}

/// An ensemble together with the names of the corpora it was built from.
struct Loaded {
	ensemble: ChainEnsemble,
	names: Vec<String>,
}

impl Loaded {
	/// Loads the named corpora from `folder` and builds a fresh ensemble.
	fn build(folder: &Path, names: Vec<String>, options: EnsembleOptions) -> Result<Self, CompleteError> {
		let mut corpus = Corpus::default();
		for name in &names {
			corpus.extend(Corpus::load_named(folder, name)?);
		}
		let ensemble = ChainEnsemble::build(corpus.sentences(), options)?;
		Ok(Self { ensemble, names })
	}
}

/// State shared by every worker.
///
/// The ensemble is never modified: reloading builds a new one and swaps the
/// `Arc`, so requests already holding the old one finish undisturbed.
struct SharedData {
	current: RwLock<Arc<Loaded>>,
	config: ServerConfig,
}

impl SharedData {
	fn new(loaded: Loaded, config: ServerConfig) -> Self {
		Self { current: RwLock::new(Arc::new(loaded)), config }
	}

	fn current(&self) -> Result<Arc<Loaded>, HttpResponse> {
		match self.current.read() {
			Ok(current) => Ok(current.clone()),
			Err(_) => Err(HttpResponse::InternalServerError().body("Model lock failed")),
		}
	}

	fn swap(&self, loaded: Loaded) -> Result<(), HttpResponse> {
		match self.current.write() {
			Ok(mut current) => {
				*current = Arc::new(loaded);
				Ok(())
			}
			Err(_) => Err(HttpResponse::InternalServerError().body("Model lock failed")),
		}
	}
}

/// HTTP GET endpoint `/v1/next_words`
///
/// Returns the ranked next words for `context` as JSON.
#[get("/v1/next_words")]
async fn get_next_words(data: web::Data<SharedData>, query: web::Query<ContextQuery>) -> impl Responder {
	let current = match data.current() {
		Ok(current) => current,
		Err(response) => return response,
	};

	let history = tokenize(query.context.as_deref().unwrap_or_default());
	HttpResponse::Ok().json(current.ensemble.next_words(&history))
}

/// HTTP GET endpoint `/v1/completions`
///
/// Returns the ranked suffixes completing `partial` after `context` as JSON.
#[get("/v1/completions")]
async fn get_completions(data: web::Data<SharedData>, query: web::Query<ContextQuery>) -> impl Responder {
	let partial = match query.partial.as_deref().map(clean_word) {
		Some(p) if !p.is_empty() => p,
		_ => return HttpResponse::BadRequest().body("Missing or empty partial word"),
	};

	let current = match data.current() {
		Ok(current) => current,
		Err(response) => return response,
	};

	let history = tokenize(query.context.as_deref().unwrap_or_default());
	HttpResponse::Ok().json(current.ensemble.completions(&history, &partial))
}

/// HTTP GET endpoint `/v1/suggest`
///
/// Runs the editor-session logic on `text` and returns the suggestion state.
#[get("/v1/suggest")]
async fn get_suggest(data: web::Data<SharedData>, query: web::Query<SuggestQuery>) -> impl Responder {
	let current = match data.current() {
		Ok(current) => current,
		Err(response) => return response,
	};

	let mut session = EditorSession::with_text(query.text.clone().unwrap_or_default());
	if let Some(cursor) = query.cursor {
		session.set_cursor(cursor);
	}
	HttpResponse::Ok().json(session.suggest(&current.ensemble))
}

/// HTTP GET endpoint `/v1/generate`
///
/// Random walk from `seed`; returns the produced text.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<SharedData>, query: web::Query<GenerateParams>) -> impl Responder {
	let max_words = match query.max_words(data.config.max_generated_words) {
		Ok(n) => n,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};

	let current = match data.current() {
		Ok(current) => current,
		Err(response) => return response,
	};

	let seed = tokenize(query.seed.as_deref().unwrap_or_default());
	let words = current.ensemble.generate(&seed, max_words, &mut rand::rng());
	HttpResponse::Ok().body(words.join(" "))
}

#[get("/v1/corpora")]
async fn get_corpora(data: web::Data<SharedData>) -> impl Responder {
	match Corpus::available(&data.config.data_dir) {
		Ok(names) => HttpResponse::Ok().body(names.join("\n")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list corpora"),
	}
}

#[get("/v1/loaded_corpora")]
async fn get_loaded_corpora(data: web::Data<SharedData>) -> impl Responder {
	match data.current() {
		Ok(current) => HttpResponse::Ok().body(current.names.join("\n")),
		Err(response) => response,
	}
}

#[put("/v1/load_corpora")]
async fn put_corpora(data: web::Data<SharedData>, query: web::Query<CorporaQuery>) -> impl Responder {
	let query_names = match &query.names {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty corpus name"),
	};

	let names: Vec<String> = query_names
		.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(str::to_owned)
		.collect();

	let folder = data.config.data_dir.clone();
	let options = data.config.ensemble;
	let loaded = match web::block(move || Loaded::build(&folder, names, options)).await {
		Ok(Ok(loaded)) => loaded,
		Ok(Err(CompleteError::InvalidArgument(e))) => return HttpResponse::BadRequest().body(e),
		Ok(Err(e)) => return HttpResponse::InternalServerError().body(format!("Failed to load corpora: {e}")),
		Err(e) => return HttpResponse::InternalServerError().body(format!("Failed to load corpora: {e}")),
	};

	log::info!("Loaded corpora: {}", loaded.names.join(", "));
	match data.swap(loaded) {
		Ok(()) => HttpResponse::Ok().body("Corpora loaded successfully"),
		Err(response) => response,
	}
}

fn routes(cfg: &mut web::ServiceConfig) {
	cfg.service(get_next_words)
		.service(get_completions)
		.service(get_suggest)
		.service(get_generated)
		.service(get_corpora)
		.service(get_loaded_corpora)
		.service(put_corpora);
}

/// Corpora loaded at startup: the configured ones, else every available one.
fn startup_corpora(config: &ServerConfig) -> Vec<String> {
	if !config.corpora.is_empty() {
		return config.corpora.clone();
	}
	match Corpus::available(&config.data_dir) {
		Ok(names) => names,
		Err(e) => {
			log::warn!("Cannot list {}: {e}; starting with an empty model", config.data_dir.display());
			Vec::new()
		}
	}
}

/// Main entry point for the server.
///
/// Builds the ensemble from the startup corpora, shares it between workers
/// and starts an Actix-web HTTP server.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let config = ServerConfig::from_args(Args::parse());
	let loaded = Loaded::build(&config.data_dir, startup_corpora(&config), config.ensemble)
		.map_err(|e| std::io::Error::other(format!("Failed to build model: {e}")))?;

	log::info!("Listening on {}:{}", config.host, config.port);
	let bind = (config.host.clone(), config.port);
	let shared_data = web::Data::new(SharedData::new(loaded, config));

	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared_data.clone())
			.configure(routes)
	})
		.bind(bind)?
		.run()
		.await
}
