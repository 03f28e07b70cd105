//! Command line argument parsing using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::catalog::{Layer, Pitaka};
use crate::query::SearchMode;
use crate::search::{DocumentFilter, SearchRequest};

/// tipitaka-search - wildcard, regex, phrase and proximity search over the Pali canon
#[derive(Parser, Debug, Clone)]
#[command(name = "tipitaka-search")]
#[command(about = "Wildcard, regex, phrase and proximity search over the Pali canon")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct TipitakaArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Corpus file (JSON array of books)
    #[arg(short = 'c', long, env = "TIPITAKA_CORPUS", value_name = "CORPUS_FILE")]
    pub corpus: PathBuf,

    /// Configuration file (JSON)
    #[arg(long, env = "TIPITAKA_CONFIG", value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl TipitakaArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n + 1,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Search the corpus
    Search(SearchArgs),

    /// Print one document with the hits of a search highlighted
    Highlight(HighlightArgs),

    /// Show the index terms a query word expands to
    Terms(TermsArgs),
}

/// Category selection. Without any flag every category is searched.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Pitakas to search (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub pitaka: Vec<Pitaka>,

    /// Commentary layers to search (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub layer: Vec<Layer>,

    /// Include the extra-canonical books
    #[arg(long)]
    pub other: bool,

    /// Search every category
    #[arg(long, conflicts_with_all = ["pitaka", "layer", "other"])]
    pub all: bool,
}

impl FilterArgs {
    /// Build the document filter.
    pub fn to_filter(&self) -> DocumentFilter {
        if self.all || (self.pitaka.is_empty() && self.layer.is_empty() && !self.other) {
            return DocumentFilter::all();
        }
        let mut filter = DocumentFilter::none();
        for &pitaka in &self.pitaka {
            filter = filter.with_pitaka(pitaka);
        }
        for &layer in &self.layer {
            filter = filter.with_layer(layer);
        }
        if self.other {
            filter = filter.with_other();
        }
        filter
    }
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Query string; quote it to search a phrase
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Search mode
    #[arg(short = 'm', long, default_value = "exact")]
    pub mode: SearchMode,

    /// Match the words as a phrase
    #[arg(short, long)]
    pub phrase: bool,

    /// Context distance in tokens (0 = configured default)
    #[arg(short, long, default_value = "0")]
    pub distance: u32,

    #[command(flatten)]
    pub filter: FilterArgs,
}

impl SearchArgs {
    /// Build the search request.
    pub fn to_request(&self) -> SearchRequest {
        SearchRequest::new(self.query.as_str())
            .mode(self.mode)
            .phrase(self.phrase)
            .proximity_distance(self.distance)
            .filter(self.filter.to_filter())
    }
}

/// Arguments for highlighting
#[derive(Parser, Debug, Clone)]
pub struct HighlightArgs {
    #[command(flatten)]
    pub search: SearchArgs,

    /// Id of the document to print
    #[arg(long, value_name = "ID")]
    pub document: u64,
}

/// Arguments for term expansion
#[derive(Parser, Debug, Clone)]
pub struct TermsArgs {
    /// Query word(s)
    #[arg(value_name = "WORD")]
    pub word: String,

    /// Search mode
    #[arg(short = 'm', long, default_value = "wildcard")]
    pub mode: SearchMode,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
