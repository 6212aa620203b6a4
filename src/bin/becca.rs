//! becca CLI tool
//!
//! Loads a JSON array of change events into a note index and runs one search query against it.
//!
//! ```text
//! becca --events notes.json "#book and not(#archived)"
//! becca --events notes.json --ancestor books --debug "tolkien orderby note.title"
//! ```

use becca_core::{
    becca::Becca,
    config::{BeccaConfig, ConfigProvider, TomlConfigProvider},
    event::read_events,
    query::{DepthFilter, SearchOptions},
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "becca")]
#[command(author, version, about = "Search a note tree loaded from change events", long_about = None)]
struct Cli {
    /// JSON file holding an array of change events
    #[arg(short, long)]
    events: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only return descendants of this note
    #[arg(short, long)]
    ancestor: Option<String>,

    /// Depth restriction below the ancestor: eqN, ltN or gtN
    #[arg(long, requires = "ancestor")]
    depth: Option<DepthFilter>,

    /// Include archived notes
    #[arg(long)]
    include_archived: bool,

    /// Include the hidden subtree
    #[arg(long)]
    include_hidden: bool,

    /// Match bare words against titles and attributes only
    #[arg(long)]
    fast: bool,

    /// Maximum number of results
    #[arg(short, long)]
    limit: Option<usize>,

    /// Print the evaluated expression tree as JSON
    #[arg(long)]
    debug: bool,

    /// The search query
    query: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TomlConfigProvider::new(path).get_config()?,
        None => BeccaConfig::default(),
    };
    let mut options = SearchOptions::from_defaults(&config.search);
    options.ancestor_note_id = cli.ancestor;
    options.ancestor_depth = cli.depth;
    options.include_archived |= cli.include_archived;
    options.include_hidden |= cli.include_hidden;
    options.fast_search |= cli.fast;
    if cli.limit.is_some() {
        options.limit = cli.limit;
    }

    let events = read_events(&cli.events)?;
    tracing::info!("Loading {} change events from {:?}", events.len(), cli.events);
    let becca = Becca::from_events(config, events);
    tracing::info!(
        "Loaded {} notes, {} branches, {} attributes",
        becca.note_count(),
        becca.branch_count(),
        becca.attribute_count()
    );

    let outcome = becca.search_with_debug(&cli.query, &options)?;
    if cli.debug {
        println!("{}", serde_json::to_string_pretty(&outcome.expression)?);
    }
    for note_id in &outcome.note_ids {
        let title = becca
            .get_note(note_id)
            .map(|note| note.title.as_str())
            .unwrap_or_default();
        println!("{note_id}\t{title}");
    }
    tracing::info!("{} results", outcome.note_ids.len());

    Ok(())
}
