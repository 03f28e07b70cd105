//! Search service: the request/response surface over the pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::catalog::DocumentCatalog;
use crate::config::SearchConfig;
use crate::corpus::Corpus;
use crate::error::{Result, SearchError};
use crate::highlight::{HighlightedDocument, Highlighter, spans_for_document};
use crate::index::TermIndex;
use crate::query::{CompiledQuery, QueryCompiler, SearchMode};
use crate::search::aggregate::{MergedMatch, ResultAggregator};
use crate::search::filter::DocumentFilter;
use crate::search::proximity::{Alignment, ProximityMatcher};
use crate::search::resolver::TermResolver;
use crate::search::types::TermMatch;

/// A search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query_text: String,
    #[serde(default)]
    pub mode: SearchMode,
    #[serde(default = "DocumentFilter::all")]
    pub filter: DocumentFilter,
    /// Context distance; 0 uses the configured default.
    #[serde(default)]
    pub proximity_distance: u32,
    #[serde(default)]
    pub is_phrase: bool,
}

impl SearchRequest {
    /// Exact search over every category.
    pub fn new<S: Into<String>>(query_text: S) -> Self {
        SearchRequest {
            query_text: query_text.into(),
            mode: SearchMode::Exact,
            filter: DocumentFilter::all(),
            proximity_distance: 0,
            is_phrase: false,
        }
    }

    pub fn mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn filter(mut self, filter: DocumentFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn proximity_distance(mut self, distance: u32) -> Self {
        self.proximity_distance = distance;
        self
    }

    pub fn phrase(mut self, is_phrase: bool) -> Self {
        self.is_phrase = is_phrase;
        self
    }
}

/// Search response.
///
/// A cancelled search carries no combinations and zero totals.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    /// Matches sorted by their literal terms.
    pub combinations: Vec<TermMatch>,
    pub total_combination_count: usize,
    pub total_occurrence_count: usize,
    /// Distinct documents across all combinations.
    pub total_document_count: usize,
    pub duration: Duration,
    /// Mode used after degrading to exact.
    pub effective_mode: SearchMode,
    pub is_phrase: bool,
    pub cancelled: bool,
}

impl SearchResponse {
    fn cancelled(query: &CompiledQuery, duration: Duration) -> Self {
        SearchResponse {
            combinations: Vec::new(),
            total_combination_count: 0,
            total_occurrence_count: 0,
            total_document_count: 0,
            duration,
            effective_mode: query.mode,
            is_phrase: query.is_phrase,
            cancelled: true,
        }
    }

    /// Display keys of the combinations, in response order.
    pub fn keys(&self) -> Vec<String> {
        self.combinations
            .iter()
            .map(|m| m.key(self.is_phrase))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }
}

/// Executes searches against a read-only index and catalog.
#[derive(Debug, Clone)]
pub struct SearchService {
    index: Arc<dyn TermIndex>,
    catalog: Arc<dyn DocumentCatalog>,
    config: SearchConfig,
    compiler: QueryCompiler,
    highlighter: Highlighter,
}

impl SearchService {
    pub fn new(
        index: Arc<dyn TermIndex>,
        catalog: Arc<dyn DocumentCatalog>,
        config: SearchConfig,
    ) -> Self {
        SearchService {
            index,
            catalog,
            compiler: QueryCompiler::new(config.lowercase_queries),
            highlighter: Highlighter::new(config.highlight.clone()),
            config,
        }
    }

    /// Service over a loaded corpus.
    pub fn from_corpus(corpus: &Corpus, config: SearchConfig) -> Self {
        Self::new(corpus.index(), corpus.catalog(), config)
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn catalog(&self) -> &dyn DocumentCatalog {
        self.catalog.as_ref()
    }

    /// Run a search.
    ///
    /// Validation failures (bad patterns, empty query, distance over the
    /// maximum) are returned before the index is touched. Cancellation is
    /// not an error: the response comes back with `cancelled` set.
    pub fn search(
        &self,
        request: &SearchRequest,
        token: &CancellationToken,
    ) -> Result<SearchResponse> {
        let started = Instant::now();
        let query = self
            .compiler
            .compile(&request.query_text, request.mode, request.is_phrase)?;

        let alignment = if !query.is_multi_word {
            None
        } else if query.is_phrase {
            Some(Alignment::Phrase)
        } else {
            let distance = self.config.proximity_distance(request.proximity_distance)?;
            Some(Alignment::Context { distance })
        };

        let combinations = match self.execute(&query, alignment, &request.filter, token) {
            Ok(combinations) => combinations,
            Err(e) if e.is_cancelled() => {
                log::info!("Search '{}' cancelled", request.query_text);
                return Ok(SearchResponse::cancelled(&query, started.elapsed()));
            }
            Err(e) => return Err(e),
        };

        let totals = ResultAggregator::new(self.index.as_ref()).totals(&combinations);
        let duration = started.elapsed();
        log::info!(
            "Search '{}' ({:?}{}): {} combinations, {} occurrences in {} documents, {:?}",
            request.query_text,
            query.mode,
            if query.is_phrase { ", phrase" } else { "" },
            totals.combinations,
            totals.occurrences,
            totals.documents,
            duration
        );

        Ok(SearchResponse {
            combinations,
            total_combination_count: totals.combinations,
            total_occurrence_count: totals.occurrences,
            total_document_count: totals.documents,
            duration,
            effective_mode: query.mode,
            is_phrase: query.is_phrase,
            cancelled: false,
        })
    }

    fn execute(
        &self,
        query: &CompiledQuery,
        alignment: Option<Alignment>,
        filter: &DocumentFilter,
        token: &CancellationToken,
    ) -> Result<Vec<TermMatch>> {
        let field = self.config.field.as_str();
        let eligible = filter.eligible(self.catalog.as_ref());
        if eligible.none() {
            log::warn!("No categories selected, nothing to search");
        }

        let candidates = TermResolver::new(self.index.as_ref(), field).resolve_all(query, token)?;
        let matcher =
            ProximityMatcher::new(self.index.as_ref(), self.catalog.as_ref(), field, &eligible);

        let mut matches: Vec<TermMatch> = match alignment {
            Some(alignment) => matcher
                .match_multi(&candidates, alignment, token)?
                .into_iter()
                .map(TermMatch::Multi)
                .collect(),
            None => {
                let terms = candidates.first().map(Vec::as_slice).unwrap_or_default();
                matcher
                    .match_single(terms, token)?
                    .into_iter()
                    .map(TermMatch::Single)
                    .collect()
            }
        };

        ResultAggregator::new(self.index.as_ref()).sort(&mut matches);
        Ok(matches)
    }

    /// Merge the selected combinations of a response into one view.
    pub fn merge(&self, response: &SearchResponse, selected: &[usize]) -> Result<MergedMatch> {
        let hits = selected
            .iter()
            .map(|&i| {
                response.combinations.get(i).ok_or_else(|| {
                    SearchError::query(format!(
                        "combination {i} out of range ({} combinations)",
                        response.combinations.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ResultAggregator::new(self.index.as_ref()).merge(&hits))
    }

    /// Highlight one document with every combination of a response.
    pub fn highlight(
        &self,
        response: &SearchResponse,
        document_index: usize,
        markup: &str,
    ) -> Result<HighlightedDocument> {
        let all: Vec<usize> = (0..response.combinations.len()).collect();
        let merged = self.merge(response, &all)?;
        let spans = spans_for_document(&merged, document_index);
        self.highlighter.highlight(markup, &spans)
    }

    /// Candidate terms of every word of `text`, paired with the word.
    pub fn expand(
        &self,
        text: &str,
        mode: SearchMode,
        token: &CancellationToken,
    ) -> Result<Vec<(String, Vec<String>)>> {
        let query = self.compiler.compile(text, mode, false)?;
        let candidates =
            TermResolver::new(self.index.as_ref(), &self.config.field).resolve_all(&query, token)?;
        Ok(query
            .words
            .into_iter()
            .map(|w| w.literal)
            .zip(candidates)
            .collect())
    }
}

/// Hands out cancellation tokens, superseding the in-flight search.
#[derive(Debug, Default)]
pub struct SearchSession {
    current: Mutex<Option<CancellationToken>>,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for a new search. The previous token, if any, is cancelled.
    pub fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = self.current.lock().replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Cancel the in-flight search, if any.
    pub fn cancel(&self) {
        if let Some(current) = self.current.lock().take() {
            current.cancel();
        }
    }
}
