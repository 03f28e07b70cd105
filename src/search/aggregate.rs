//! Ordering, merging and totals over discovered matches.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::index::TermIndex;
use crate::search::types::{DocumentHits, TermMatch, TermMatchResult, merge_positions};

/// Compare two literal term lists element by element; on a common prefix the
/// shorter list sorts first.
pub fn compare_term_lists<F>(a: &[&str], b: &[&str], compare: F) -> Ordering
where
    F: Fn(&str, &str) -> Ordering,
{
    for (x, y) in a.iter().zip(b) {
        match compare(*x, *y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

/// Several matches united into one per-document view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergedMatch {
    /// Literal terms of every merged match, in merge order.
    pub combinations: Vec<Vec<String>>,
    pub documents: DocumentHits,
}

impl TermMatchResult for MergedMatch {
    fn literal_terms(&self) -> Vec<&str> {
        self.combinations
            .iter()
            .flatten()
            .map(String::as_str)
            .collect()
    }

    fn documents(&self) -> &DocumentHits {
        &self.documents
    }
}

/// Response totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchTotals {
    pub combinations: usize,
    pub occurrences: usize,
    /// Distinct documents across all matches.
    pub documents: usize,
}

/// Sorts and merges matches using the index's literal order.
pub struct ResultAggregator<'a> {
    index: &'a dyn TermIndex,
}

impl<'a> ResultAggregator<'a> {
    pub fn new(index: &'a dyn TermIndex) -> Self {
        ResultAggregator { index }
    }

    /// Order two matches by their literal terms.
    pub fn compare(&self, a: &TermMatch, b: &TermMatch) -> Ordering {
        compare_term_lists(&a.literal_terms(), &b.literal_terms(), |x, y| {
            self.index.compare_terms(x, y)
        })
    }

    /// Sort matches in place.
    pub fn sort(&self, matches: &mut [TermMatch]) {
        matches.sort_by(|a, b| self.compare(a, b));
    }

    /// Union the per-document position maps of the selected matches.
    ///
    /// A position claimed by several matches keeps its anchor entry, so the
    /// merged count is the number of distinct anchor positions rather than
    /// the sum of the individual counts.
    pub fn merge(&self, selected: &[&TermMatch]) -> MergedMatch {
        let mut merged = MergedMatch::default();
        for hit in selected {
            merged
                .combinations
                .push(hit.literal_terms().into_iter().map(String::from).collect());
            for (document_index, positions) in hit.documents() {
                merge_positions(merged.documents.entry(*document_index).or_default(), positions);
            }
        }
        merged
    }

    /// Totals over a set of matches.
    pub fn totals(&self, matches: &[TermMatch]) -> SearchTotals {
        let documents: BTreeSet<usize> = matches
            .iter()
            .flat_map(|m| m.documents().keys().copied())
            .collect();
        SearchTotals {
            combinations: matches.len(),
            occurrences: matches.iter().map(TermMatchResult::total_occurrences).sum(),
            documents: documents.len(),
        }
    }
}
