//! Command implementations for the CLI.

use anyhow::Context;

use crate::cancel::CancellationToken;
use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::SearchConfig;
use crate::corpus::Corpus;
use crate::error::{Result, SearchError};
use crate::search::SearchService;

/// Execute a CLI command.
pub fn execute_command(args: TipitakaArgs) -> Result<()> {
    let config = load_config(&args)?;
    let corpus = Corpus::from_file(&config.field, &args.corpus)
        .with_context(|| format!("loading corpus {}", args.corpus.display()))?;
    let service = SearchService::from_corpus(&corpus, config);

    match &args.command {
        Command::Search(search_args) => search(&service, search_args, &args),
        Command::Highlight(highlight_args) => highlight(&service, &corpus, highlight_args, &args),
        Command::Terms(terms_args) => terms(&service, terms_args, &args),
    }
}

fn load_config(args: &TipitakaArgs) -> Result<SearchConfig> {
    match &args.config {
        Some(path) => {
            if args.verbosity() > 2 {
                println!("Loading configuration from: {}", path.display());
            }
            Ok(SearchConfig::from_file(path)
                .with_context(|| format!("loading configuration {}", path.display()))?)
        }
        None => Ok(SearchConfig::default()),
    }
}

/// Search the corpus.
fn search(service: &SearchService, args: &SearchArgs, cli_args: &TipitakaArgs) -> Result<()> {
    let response = service.search(&args.to_request(), &CancellationToken::new())?;
    let results = SearchResults::from_response(&args.query, &response, service.catalog());
    output_result("Search completed", &results, cli_args)
}

/// Highlight one document with the hits of a search.
fn highlight(
    service: &SearchService,
    corpus: &Corpus,
    args: &HighlightArgs,
    cli_args: &TipitakaArgs,
) -> Result<()> {
    let catalog = service.catalog();
    let document_index = catalog.document_index(args.document).ok_or_else(|| {
        SearchError::catalog(format!("no document with id {}", args.document))
    })?;
    let markup = corpus.markup(document_index).ok_or_else(|| {
        SearchError::catalog(format!("no markup stored for document {}", args.document))
    })?;

    let response = service.search(&args.search.to_request(), &CancellationToken::new())?;
    let highlighted = service.highlight(&response, document_index, markup)?;
    if highlighted.hit_count == 0 {
        log::warn!("'{}' has no hits in document {}", args.search.query, args.document);
    }

    let result = HighlightResult {
        document_id: args.document,
        name: catalog
            .entry(document_index)
            .map(|e| e.name.clone())
            .unwrap_or_default(),
        hit_count: highlighted.hit_count,
        markup: highlighted.markup,
    };
    output_result("Highlight completed", &result, cli_args)
}

/// Show the terms each query word expands to.
fn terms(service: &SearchService, args: &TermsArgs, cli_args: &TipitakaArgs) -> Result<()> {
    let expanded = service.expand(&args.word, args.mode, &CancellationToken::new())?;
    let result = TermsResult {
        words: expanded
            .into_iter()
            .map(|(word, terms)| WordTerms { word, terms })
            .collect(),
    };
    output_result("Term expansion completed", &result, cli_args)
}
