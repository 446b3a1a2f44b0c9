use std::path::PathBuf;

use clap::Parser;
use rs_complete_core::corpus::Corpus;
use rs_complete_core::model::{ChainEnsemble, EnsembleOptions, Fallback, OrderPreference};
use rs_complete_core::session::{EditorSession, SuggestionMode};

#[derive(Parser, Debug)]
#[command(name = "rs-complete-demo")]
#[command(about = "Walkthrough of next-word prediction and word completion")]
struct Args {
    /// Folder holding the corpus files (.txt, .json)
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Highest chain order
    #[arg(long, default_value_t = 3)]
    max_order: usize,

    /// Text typed so far (quote it; a trailing space asks for the next word)
    #[arg(short, long, default_value = "I think the ")]
    text: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    // Load every .txt / .json corpus of the folder.
    // Raw text is cleaned up once and cached next to it as .bin
    let corpus = Corpus::load_folder(&args.data_dir)?;
    println!("Loaded {} sentences from {}", corpus.len(), args.data_dir.display());

    // One chain per order, longest context asked first,
    // every order contributing until 3 suggestions are found
    let options = EnsembleOptions {
        max_order: args.max_order,
        preference: OrderPreference::Descending,
        fallback: Fallback::Concatenate,
    };
    let ensemble = ChainEnsemble::build(corpus.sentences(), options)?;

    // Ask the way an editor would, from the text before the cursor
    let mut session = EditorSession::with_text(args.text.as_str());
    let state = session.suggest(&ensemble);
    match &state.mode {
        SuggestionMode::NextWord => println!("Next word after {:?}:", session.text()),
        SuggestionMode::Completion { partial } => println!("Completions of {partial:?}:"),
    }
    for suggestion in &state.suggestions {
        println!("  {:<16} {:.3}", suggestion.text, suggestion.probability);
    }
    if let Some(ghost) = &state.ghost {
        println!("Ghost text: {}[{}]", session.text(), ghost);
    }

    // Accept the best suggestion and look one word further
    if let Some(best) = state.suggestions.first() {
        session.accept(&best.text);
        session.insert(" ");
        let next = session.suggest(&ensemble);
        let words: Vec<&str> = next.suggestions.iter().map(|s| s.text.as_str()).collect();
        println!("After accepting {:?}: {}", best.text, words.join(", "));
    }

    // The same question with "first hit" fallback: only the most specific order answers
    let first_hit = ChainEnsemble::build(
        corpus.sentences(),
        EnsembleOptions { fallback: Fallback::FirstHit, ..options },
    )?;
    let words: Vec<String> = first_hit
        .next_words(&["i", "think"])
        .into_iter()
        .map(|s| s.text)
        .collect();
    println!("First-hit after \"i think\": {}", words.join(", "));

    // Random walks weighted by the learned probabilities
    for i in 0..5 {
        let words = ensemble.generate(&["the"], 8, &mut rand::rng());
        println!("Generated sentence {}: {}", i + 1, words.join(" "));
    }

    Ok(())
}
