//! Result types shared by the matcher, the aggregator and the highlighter.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde::{Deserialize, Serialize};

/// One matched term occurrence inside a document.
///
/// The literal text is materialized so results stay valid after the term
/// lists they were built from are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermPosition {
    /// Which candidate term of its query word produced this occurrence.
    pub word_index: usize,
    /// Token ordinal within the document.
    pub position: u32,
    /// Ordinal of this occurrence among the term's occurrences in the document.
    pub position_index: usize,
    /// Anchor (first query word) rather than context occurrence.
    pub is_first_term: bool,
    pub start_offset: usize,
    pub end_offset: usize,
    pub word: String,
}

impl Ord for TermPosition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position
            .cmp(&other.position)
            .then_with(|| other.is_first_term.cmp(&self.is_first_term))
            .then_with(|| self.word.cmp(&other.word))
    }
}

impl PartialOrd for TermPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Position-keyed occurrences of one match in one document.
pub type PositionMap = BTreeMap<u32, TermPosition>;

/// Insert an occurrence, letting anchors win over context claims.
///
/// An existing anchor is never replaced. A context occurrence only fills a
/// vacant position. An anchor replaces a context entry at its position.
pub fn claim_position(map: &mut PositionMap, term_position: TermPosition) {
    match map.entry(term_position.position) {
        Entry::Vacant(slot) => {
            slot.insert(term_position);
        }
        Entry::Occupied(mut slot) => {
            if term_position.is_first_term && !slot.get().is_first_term {
                slot.insert(term_position);
            }
        }
    }
}

/// Merge one position map into another with anchor precedence.
pub fn merge_positions(into: &mut PositionMap, from: &PositionMap) {
    for term_position in from.values() {
        claim_position(into, term_position.clone());
    }
}

/// Number of anchor entries; context entries are never counted.
pub fn anchor_count(map: &PositionMap) -> usize {
    map.values().filter(|p| p.is_first_term).count()
}

/// Per-document position maps keyed by dense document index.
pub type DocumentHits = BTreeMap<usize, PositionMap>;

/// Common result shape of single and multi-word matches.
pub trait TermMatchResult {
    /// Matched literal terms in query order.
    fn literal_terms(&self) -> Vec<&str>;

    /// Position maps by dense document index.
    fn documents(&self) -> &DocumentHits;

    /// Occurrences counted in one document.
    fn occurrence_count(&self, document_index: usize) -> usize {
        self.documents()
            .get(&document_index)
            .map(anchor_count)
            .unwrap_or(0)
    }

    /// Occurrences across all documents.
    fn total_occurrences(&self) -> usize {
        self.documents().values().map(anchor_count).sum()
    }

    /// Number of documents with at least one occurrence.
    fn document_count(&self) -> usize {
        self.documents().len()
    }
}

/// Matches of a single literal term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleTermMatch {
    pub term: String,
    pub documents: DocumentHits,
}

impl SingleTermMatch {
    pub fn new<S: Into<String>>(term: S) -> Self {
        SingleTermMatch {
            term: term.into(),
            documents: DocumentHits::new(),
        }
    }
}

impl TermMatchResult for SingleTermMatch {
    fn literal_terms(&self) -> Vec<&str> {
        vec![self.term.as_str()]
    }

    fn documents(&self) -> &DocumentHits {
        &self.documents
    }
}

/// Aligned matches of one combination of literal terms, one per query word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiTermMatch {
    pub terms: Vec<String>,
    pub documents: DocumentHits,
}

impl MultiTermMatch {
    pub fn new(terms: Vec<String>) -> Self {
        MultiTermMatch {
            terms,
            documents: DocumentHits::new(),
        }
    }

    /// Record one complete alignment: the anchor and its context occurrences.
    pub fn add_alignment(
        &mut self,
        document_index: usize,
        anchor: TermPosition,
        context: Vec<TermPosition>,
    ) {
        let map = self.documents.entry(document_index).or_default();
        claim_position(map, anchor);
        for term_position in context {
            claim_position(map, term_position);
        }
    }
}

impl TermMatchResult for MultiTermMatch {
    fn literal_terms(&self) -> Vec<&str> {
        self.terms.iter().map(String::as_str).collect()
    }

    fn documents(&self) -> &DocumentHits {
        &self.documents
    }
}

/// A discovered match, single or multi-word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TermMatch {
    Single(SingleTermMatch),
    Multi(MultiTermMatch),
}

impl TermMatchResult for TermMatch {
    fn literal_terms(&self) -> Vec<&str> {
        match self {
            TermMatch::Single(m) => m.literal_terms(),
            TermMatch::Multi(m) => m.literal_terms(),
        }
    }

    fn documents(&self) -> &DocumentHits {
        match self {
            TermMatch::Single(m) => m.documents(),
            TermMatch::Multi(m) => m.documents(),
        }
    }
}

impl TermMatch {
    /// Display key, see [`combination_key`].
    pub fn key(&self, phrase: bool) -> String {
        combination_key(&self.literal_terms(), phrase)
    }
}

/// Terms joined by a space for phrases, `", "` otherwise.
pub fn combination_key<S: AsRef<str>>(terms: &[S], phrase: bool) -> String {
    let separator = if phrase { " " } else { ", " };
    let mut key = String::new();
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            key.push_str(separator);
        }
        key.push_str(term.as_ref());
    }
    key
}
