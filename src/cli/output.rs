//! Output formatting for CLI commands.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::DocumentCatalog;
use crate::cli::args::{OutputFormat, TipitakaArgs};
use crate::error::Result;
use crate::query::SearchMode;
use crate::search::{SearchResponse, TermMatchResult};

/// One document of a combination.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document_index: usize,
    pub document_id: Option<u64>,
    pub name: String,
    pub occurrence_count: usize,
    /// Anchor positions.
    pub positions: Vec<u32>,
}

/// One combination of literal terms.
#[derive(Debug, Serialize, Deserialize)]
pub struct CombinationSummary {
    pub key: String,
    pub terms: Vec<String>,
    pub occurrence_count: usize,
    pub documents: Vec<DocumentSummary>,
}

/// Result structure for search operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub effective_mode: SearchMode,
    pub is_phrase: bool,
    pub combinations: Vec<CombinationSummary>,
    pub total_combination_count: usize,
    pub total_occurrence_count: usize,
    pub total_document_count: usize,
    pub duration_ms: u64,
    pub cancelled: bool,
}

impl SearchResults {
    /// Summarize a response, resolving document names through the catalog.
    pub fn from_response(
        query: &str,
        response: &SearchResponse,
        catalog: &dyn DocumentCatalog,
    ) -> Self {
        let combinations = response
            .combinations
            .iter()
            .map(|hit| CombinationSummary {
                key: hit.key(response.is_phrase),
                terms: hit.literal_terms().into_iter().map(String::from).collect(),
                occurrence_count: hit.total_occurrences(),
                documents: hit
                    .documents()
                    .iter()
                    .map(|(&document_index, positions)| {
                        let entry = catalog.entry(document_index);
                        DocumentSummary {
                            document_index,
                            document_id: entry.map(|e| e.doc_id),
                            name: entry.map(|e| e.name.clone()).unwrap_or_default(),
                            occurrence_count: hit.occurrence_count(document_index),
                            positions: positions
                                .values()
                                .filter(|p| p.is_first_term)
                                .map(|p| p.position)
                                .collect(),
                        }
                    })
                    .collect(),
            })
            .collect();

        SearchResults {
            query: query.to_string(),
            effective_mode: response.effective_mode,
            is_phrase: response.is_phrase,
            combinations,
            total_combination_count: response.total_combination_count,
            total_occurrence_count: response.total_occurrence_count,
            total_document_count: response.total_document_count,
            duration_ms: response.duration.as_millis() as u64,
            cancelled: response.cancelled,
        }
    }
}

impl fmt::Display for SearchResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cancelled {
            return writeln!(f, "Search cancelled.");
        }
        writeln!(f, "Search Results:")?;
        writeln!(f, "═══════════════")?;
        for combination in &self.combinations {
            writeln!(f)?;
            writeln!(
                f,
                "{} ({} occurrences in {} documents)",
                combination.key,
                combination.occurrence_count,
                combination.documents.len()
            )?;
            for document in &combination.documents {
                let id = document
                    .document_id
                    .map_or_else(|| "?".to_string(), |id| id.to_string());
                writeln!(f, "  [{id}] {}: {}", document.name, document.occurrence_count)?;
            }
        }
        writeln!(f)?;
        writeln!(
            f,
            "Total: {} combinations, {} occurrences in {} documents",
            self.total_combination_count, self.total_occurrence_count, self.total_document_count
        )?;
        write!(f, "Search time: {}ms", self.duration_ms)
    }
}

/// Result structure for highlighting.
#[derive(Debug, Serialize, Deserialize)]
pub struct HighlightResult {
    pub document_id: u64,
    pub name: String,
    pub hit_count: usize,
    pub markup: String,
}

impl fmt::Display for HighlightResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}] {} ({} hits)", self.document_id, self.name, self.hit_count)?;
        writeln!(f, "────────────")?;
        write!(f, "{}", self.markup)
    }
}

/// Candidate terms of one query word.
#[derive(Debug, Serialize, Deserialize)]
pub struct WordTerms {
    pub word: String,
    pub terms: Vec<String>,
}

/// Result structure for term expansion.
#[derive(Debug, Serialize, Deserialize)]
pub struct TermsResult {
    pub words: Vec<WordTerms>,
}

impl fmt::Display for TermsResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, word) in self.words.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{} ({} terms)", word.word, word.terms.len())?;
            for term in &word.terms {
                writeln!(f, "  {term}")?;
            }
        }
        Ok(())
    }
}

/// Output a result in the specified format.
pub fn output_result<T>(message: &str, result: &T, args: &TipitakaArgs) -> Result<()>
where
    T: Serialize + fmt::Display,
{
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: fmt::Display>(message: &str, result: &T, args: &TipitakaArgs) -> Result<()> {
    if args.verbosity() > 1 {
        println!("{message}");
        println!();
    }
    println!("{result}");
    Ok(())
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &TipitakaArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}
