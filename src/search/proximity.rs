//! Positional matching of single and multi-word queries.
//!
//! The index only answers "which documents and positions hold this literal
//! term", so wildcard expansion combined with phrase or proximity constraints
//! is assembled here:
//!
//! 1. every query word gets a coverage bit-set, the union of its candidate
//!    terms' document sets restricted to the eligible set;
//! 2. the coverage sets are intersected into the candidate documents;
//! 3. candidate terms that occur in none of those documents are pruned;
//! 4. in each candidate document every anchor occurrence (first query word)
//!    is aligned against the other words, position by position.
//!
//! Only complete alignments are reported.

use ahash::AHashMap;
use bit_vec::BitVec;
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::catalog::DocumentCatalog;
use crate::error::{Result, SearchError};
use crate::index::TermIndex;
use crate::index::posting::{Posting, PostingIterator};
use crate::search::types::{
    MultiTermMatch, PositionMap, SingleTermMatch, TermPosition, combination_key,
};

/// How context words must sit relative to the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Alignment {
    /// The k-th context word must be exactly at `anchor + k`.
    Phrase,
    /// Every context word within `distance` tokens of the anchor, either side.
    Context { distance: u32 },
}

impl Alignment {
    fn is_phrase(self) -> bool {
        matches!(self, Alignment::Phrase)
    }
}

/// A candidate literal term with its postings and document set.
#[derive(Debug, Clone)]
struct CandidateTerm {
    term: String,
    /// Ordinal among the candidates of its query word.
    ordinal: usize,
    postings: PostingIterator,
    documents: BitVec,
}

/// Computes matches over the eligible documents of one request.
pub struct ProximityMatcher<'a> {
    index: &'a dyn TermIndex,
    catalog: &'a dyn DocumentCatalog,
    field: &'a str,
    eligible: &'a BitVec,
}

impl<'a> ProximityMatcher<'a> {
    pub fn new(
        index: &'a dyn TermIndex,
        catalog: &'a dyn DocumentCatalog,
        field: &'a str,
        eligible: &'a BitVec,
    ) -> Self {
        ProximityMatcher {
            index,
            catalog,
            field,
            eligible,
        }
    }

    /// One match per candidate term, counting every occurrence in each
    /// eligible document.
    pub fn match_single(
        &self,
        candidates: &[String],
        token: &CancellationToken,
    ) -> Result<Vec<SingleTermMatch>> {
        let mut matches = Vec::new();

        for (ordinal, term) in candidates.iter().enumerate() {
            token.check()?;
            let mut postings = self.index.postings(self.field, term)?;
            let mut hit = SingleTermMatch::new(term.as_str());
            let mut previous: Option<u64> = None;

            while let Some(posting) = postings.next() {
                if previous == Some(posting.doc_id) {
                    continue;
                }
                previous = Some(posting.doc_id);

                let document_index = self.document_index(posting.doc_id)?;
                if !self.is_eligible(document_index) {
                    continue;
                }
                if posting.occurrences().is_empty() && posting.frequency() > 0 {
                    return Err(SearchError::index(format!(
                        "posting of '{term}' in document {} has frequency {} but no positions",
                        posting.doc_id,
                        posting.frequency()
                    )));
                }
                let map = anchor_positions(posting, ordinal, term)
                    .into_iter()
                    .map(|p| (p.position, p))
                    .collect::<PositionMap>();
                if !map.is_empty() {
                    hit.documents.insert(document_index, map);
                }
            }

            if !hit.documents.is_empty() {
                matches.push(hit);
            }
        }

        Ok(matches)
    }

    /// Aligned matches for two or more query words.
    ///
    /// `candidates[w]` holds the candidate terms of query word `w`. An empty
    /// list for any word, or an empty candidate-document intersection, yields
    /// no matches.
    pub fn match_multi(
        &self,
        candidates: &[Vec<String>],
        alignment: Alignment,
        token: &CancellationToken,
    ) -> Result<Vec<MultiTermMatch>> {
        if candidates.len() < 2 {
            return Err(SearchError::query("multi-word matching needs at least two words"));
        }
        if candidates.iter().any(Vec::is_empty) {
            log::debug!("a query word has no candidate terms");
            return Ok(Vec::new());
        }

        let mut words = self.load_candidates(candidates, token)?;

        let mut candidate_documents = BitVec::from_elem(self.catalog.count(), true);
        for word in &words {
            candidate_documents.and(&coverage(self.catalog.count(), word));
        }
        if candidate_documents.none() {
            log::debug!("no document contains every query word");
            return Ok(Vec::new());
        }

        for word in &mut words {
            word.retain(|candidate| intersects(&candidate.documents, &candidate_documents));
        }
        log::debug!(
            "{} candidate documents, surviving terms per word: {:?}",
            candidate_documents.iter().filter(|b| *b).count(),
            words.iter().map(Vec::len).collect::<Vec<_>>()
        );

        let phrase = alignment.is_phrase();
        let mut combinations: AHashMap<String, MultiTermMatch> = AHashMap::new();
        let mut alignments = 0usize;

        for (document_index, present) in candidate_documents.iter().enumerate() {
            if !present {
                continue;
            }
            token.check()?;

            let doc_id = self.catalog.document_id(document_index).ok_or_else(|| {
                SearchError::catalog(format!("no document at index {document_index}"))
            })?;

            let mut anchors: Vec<TermPosition> = words[0]
                .iter()
                .filter_map(|c| {
                    c.postings
                        .posting_for(doc_id)
                        .map(|posting| anchor_positions(posting, c.ordinal, &c.term))
                })
                .flatten()
                .collect();
            anchors.sort_by_key(|p| p.position);

            let lookups: Vec<AHashMap<u32, TermPosition>> = words[1..]
                .iter()
                .map(|word| context_lookup(word, doc_id))
                .collect();

            for anchor in anchors {
                let Some(context) = align(&anchor, &lookups, alignment) else {
                    continue;
                };
                alignments += 1;

                let mut terms = Vec::with_capacity(context.len() + 1);
                terms.push(anchor.word.clone());
                terms.extend(context.iter().map(|p| p.word.clone()));

                combinations
                    .entry(combination_key(&terms, phrase))
                    .or_insert_with(|| MultiTermMatch::new(terms))
                    .add_alignment(document_index, anchor, context);
            }
        }

        log::debug!(
            "{alignments} alignments in {} combinations",
            combinations.len()
        );
        Ok(combinations.into_values().collect())
    }

    /// Load postings and eligible document sets for every candidate term.
    fn load_candidates(
        &self,
        candidates: &[Vec<String>],
        token: &CancellationToken,
    ) -> Result<Vec<Vec<CandidateTerm>>> {
        let mut loaded: AHashMap<&str, (PostingIterator, BitVec)> = AHashMap::new();
        let mut words = Vec::with_capacity(candidates.len());

        for terms in candidates {
            let mut word = Vec::with_capacity(terms.len());
            for (ordinal, term) in terms.iter().enumerate() {
                token.check()?;
                if !loaded.contains_key(term.as_str()) {
                    let postings = self.index.postings(self.field, term)?;
                    let documents = self.document_bits(&postings)?;
                    loaded.insert(term.as_str(), (postings, documents));
                }
                let (postings, documents) = &loaded[term.as_str()];
                word.push(CandidateTerm {
                    term: term.clone(),
                    ordinal,
                    postings: postings.clone(),
                    documents: documents.clone(),
                });
            }
            words.push(word);
        }

        Ok(words)
    }

    /// Eligible documents in which a term occurs.
    ///
    /// A repeated document id advances the cursor and is skipped.
    fn document_bits(&self, postings: &PostingIterator) -> Result<BitVec> {
        let mut bits = BitVec::from_elem(self.catalog.count(), false);
        let mut cursor = postings.clone();
        cursor.reset();
        let mut previous: Option<u64> = None;

        while let Some(posting) = cursor.next() {
            if previous == Some(posting.doc_id) {
                continue;
            }
            previous = Some(posting.doc_id);
            let document_index = self.document_index(posting.doc_id)?;
            if self.is_eligible(document_index) {
                bits.set(document_index, true);
            }
        }

        Ok(bits)
    }

    fn document_index(&self, doc_id: u64) -> Result<usize> {
        self.catalog.document_index(doc_id).ok_or_else(|| {
            SearchError::catalog(format!("posting references unknown document id {doc_id}"))
        })
    }

    fn is_eligible(&self, document_index: usize) -> bool {
        self.eligible.get(document_index).unwrap_or(false)
    }
}

/// Union of the document sets of one word's candidate terms.
fn coverage(count: usize, word: &[CandidateTerm]) -> BitVec {
    let mut bits = BitVec::from_elem(count, false);
    for candidate in word {
        bits.or(&candidate.documents);
    }
    bits
}

fn intersects(a: &BitVec, b: &BitVec) -> bool {
    let mut both = a.clone();
    both.and(b);
    both.any()
}

/// Anchor entries for every occurrence of a term in one posting.
fn anchor_positions(posting: &Posting, ordinal: usize, term: &str) -> Vec<TermPosition> {
    posting
        .occurrences()
        .iter()
        .enumerate()
        .map(|(position_index, occurrence)| TermPosition {
            word_index: ordinal,
            position: occurrence.position,
            position_index,
            is_first_term: true,
            start_offset: occurrence.start_offset,
            end_offset: occurrence.end_offset,
            word: term.to_string(),
        })
        .collect()
}

/// Position lookup over every occurrence of a context word in one document.
fn context_lookup(word: &[CandidateTerm], doc_id: u64) -> AHashMap<u32, TermPosition> {
    let mut lookup = AHashMap::new();
    for candidate in word {
        let Some(posting) = candidate.postings.posting_for(doc_id) else {
            continue;
        };
        for (position_index, occurrence) in posting.occurrences().iter().enumerate() {
            lookup
                .entry(occurrence.position)
                .or_insert_with(|| TermPosition {
                    word_index: candidate.ordinal,
                    position: occurrence.position,
                    position_index,
                    is_first_term: false,
                    start_offset: occurrence.start_offset,
                    end_offset: occurrence.end_offset,
                    word: candidate.term.clone(),
                });
        }
    }
    lookup
}

/// Resolve every context word for one anchor, in query order.
///
/// Returns `None` as soon as one word cannot be placed.
fn align(
    anchor: &TermPosition,
    lookups: &[AHashMap<u32, TermPosition>],
    alignment: Alignment,
) -> Option<Vec<TermPosition>> {
    let origin = anchor.position;
    let mut context = Vec::with_capacity(lookups.len());

    for (k, lookup) in lookups.iter().enumerate() {
        let found = match alignment {
            Alignment::Phrase => origin
                .checked_add(k as u32 + 1)
                .and_then(|target| lookup.get(&target)),
            Alignment::Context { distance } => (1..=distance).find_map(|i| {
                origin
                    .checked_add(i)
                    .and_then(|after| lookup.get(&after))
                    .or_else(|| origin.checked_sub(i).and_then(|before| lookup.get(&before)))
            }),
        }?;
        context.push(found.clone());
    }

    Some(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogEntry, Layer, MemoryCatalog, Pitaka};
    use crate::index::{MemoryTermIndex, Token};
    use crate::search::types::TermMatchResult;

    fn token(text: &str, position: u32) -> Token {
        Token {
            text: text.to_string(),
            position,
            start_offset: position as usize * 10,
            end_offset: position as usize * 10 + text.chars().count(),
        }
    }

    /// Build an index and catalog from `(doc_id, [(term, position)])`.
    fn fixture(docs: &[(u64, &[(&str, u32)])]) -> (MemoryTermIndex, MemoryCatalog) {
        let mut builder = MemoryTermIndex::builder("text");
        let mut entries = Vec::new();
        for (doc_id, tokens) in docs {
            for (text, position) in tokens.iter() {
                builder.add_token(*doc_id, token(text, *position));
            }
            entries.push(
                CatalogEntry::new(*doc_id, format!("doc-{doc_id}"))
                    .pitaka(Pitaka::Sutta)
                    .layer(Layer::Mula),
            );
        }
        (builder.build(), MemoryCatalog::new(entries).unwrap())
    }

    fn all(count: usize) -> BitVec {
        BitVec::from_elem(count, true)
    }

    fn terms(words: &[&[&str]]) -> Vec<Vec<String>> {
        words
            .iter()
            .map(|w| w.iter().map(|t| t.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_single_word_counts() {
        let (index, catalog) = fixture(&[
            (10, &[("dhamma", 5), ("dhamma", 12)]),
            (20, &[("dhamma", 2)]),
            (30, &[("vinaya", 1)]),
        ]);
        let eligible = all(3);
        let matcher = ProximityMatcher::new(&index, &catalog, "text", &eligible);

        let matches = matcher
            .match_single(&["dhamma".to_string()], &CancellationToken::new())
            .unwrap();
        assert_eq!(matches.len(), 1);
        let hit = &matches[0];
        assert_eq!(hit.occurrence_count(0), 2);
        assert_eq!(hit.occurrence_count(1), 1);
        assert_eq!(hit.document_count(), 2);
        let positions: Vec<u32> = hit.documents[&0].keys().copied().collect();
        assert_eq!(positions, vec![5, 12]);
    }

    #[test]
    fn test_single_word_respects_eligible_set() {
        let (index, catalog) = fixture(&[(10, &[("dhamma", 5)]), (20, &[("dhamma", 2)])]);
        let mut eligible = all(2);
        eligible.set(0, false);
        let matcher = ProximityMatcher::new(&index, &catalog, "text", &eligible);

        let matches = matcher
            .match_single(&["dhamma".to_string(), "missing".to_string()], &CancellationToken::new())
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].documents.keys().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_context_within_distance() {
        let (index, catalog) = fixture(&[
            (1, &[("buddha", 10), ("dhamma", 12)]),
            (2, &[("buddha", 10), ("dhamma", 20)]),
        ]);
        let eligible = all(2);
        let matcher = ProximityMatcher::new(&index, &catalog, "text", &eligible);

        let matches = matcher
            .match_multi(
                &terms(&[&["buddha"], &["dhamma"]]),
                Alignment::Context { distance: 3 },
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].terms, vec!["buddha", "dhamma"]);
        assert_eq!(matches[0].occurrence_count(0), 1);
        assert!(!matches[0].documents.contains_key(&1));
    }

    #[test]
    fn test_context_prefers_after_before_before() {
        let (index, catalog) = fixture(&[(1, &[("a", 5), ("b", 3), ("b", 7)])]);
        let eligible = all(1);
        let matcher = ProximityMatcher::new(&index, &catalog, "text", &eligible);

        let matches = matcher
            .match_multi(
                &terms(&[&["a"], &["b"]]),
                Alignment::Context { distance: 2 },
                &CancellationToken::new(),
            )
            .unwrap();
        let map = &matches[0].documents[&0];
        assert!(map.contains_key(&7));
        assert!(!map.contains_key(&3));
    }

    #[test]
    fn test_context_accepts_either_order() {
        let (index, catalog) = fixture(&[(1, &[("b", 4), ("a", 6)])]);
        let eligible = all(1);
        let matcher = ProximityMatcher::new(&index, &catalog, "text", &eligible);

        let matches = matcher
            .match_multi(
                &terms(&[&["a"], &["b"]]),
                Alignment::Context { distance: 2 },
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].documents[&0].len(), 2);
    }

    #[test]
    fn test_phrase_requires_exact_offset() {
        let (index, catalog) = fixture(&[
            (1, &[("evam", 7), ("me", 8)]),
            (2, &[("evam", 7), ("me", 9)]),
        ]);
        let eligible = all(2);
        let matcher = ProximityMatcher::new(&index, &catalog, "text", &eligible);

        let matches = matcher
            .match_multi(
                &terms(&[&["evam"], &["me"]]),
                Alignment::Phrase,
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].documents.keys().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_phrase_three_words_rejects_partial() {
        let (index, catalog) = fixture(&[(
            1,
            &[("evam", 1), ("me", 2), ("sutam", 3), ("evam", 10), ("me", 11)],
        )]);
        let eligible = all(1);
        let matcher = ProximityMatcher::new(&index, &catalog, "text", &eligible);

        let matches = matcher
            .match_multi(
                &terms(&[&["evam"], &["me"], &["sutam"]]),
                Alignment::Phrase,
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(matches.len(), 1);
        let map = &matches[0].documents[&0];
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(matches[0].occurrence_count(0), 1);
    }

    #[test]
    fn test_wildcard_candidates_form_combinations() {
        let (index, catalog) = fixture(&[
            (1, &[("dhamma", 1), ("desana", 2), ("dhammo", 8), ("desana", 9)]),
            (2, &[("dhammassa", 4), ("vinaya", 5)]),
        ]);
        let eligible = all(2);
        let matcher = ProximityMatcher::new(&index, &catalog, "text", &eligible);

        let mut matches = matcher
            .match_multi(
                &terms(&[&["dhamma", "dhammassa", "dhammo"], &["desana"]]),
                Alignment::Phrase,
                &CancellationToken::new(),
            )
            .unwrap();
        matches.sort_by(|a, b| a.terms.cmp(&b.terms));
        let keys: Vec<Vec<String>> = matches.iter().map(|m| m.terms.clone()).collect();
        assert_eq!(
            keys,
            vec![
                vec!["dhamma".to_string(), "desana".to_string()],
                vec!["dhammo".to_string(), "desana".to_string()],
            ]
        );
        // "dhammassa" only occurs in a document without "desana"
        assert!(matches.iter().all(|m| m.document_count() == 1));
        assert_eq!(matches[1].documents[&0][&8].word_index, 2);
    }

    #[test]
    fn test_anchor_claim_beats_context_claim() {
        // "a a" phrase: position 2 is context for the anchor at 1 and an
        // anchor itself.
        let (index, catalog) = fixture(&[(1, &[("a", 1), ("a", 2), ("a", 3)])]);
        let eligible = all(1);
        let matcher = ProximityMatcher::new(&index, &catalog, "text", &eligible);

        let matches = matcher
            .match_multi(
                &terms(&[&["a"], &["a"]]),
                Alignment::Phrase,
                &CancellationToken::new(),
            )
            .unwrap();
        let map = &matches[0].documents[&0];
        assert!(map[&1].is_first_term);
        assert!(map[&2].is_first_term);
        assert!(!map[&3].is_first_term);
        assert_eq!(matches[0].occurrence_count(0), 2);
    }

    #[test]
    fn test_empty_candidates_and_intersection() {
        let (index, catalog) = fixture(&[(1, &[("a", 1)]), (2, &[("b", 1)])]);
        let eligible = all(2);
        let matcher = ProximityMatcher::new(&index, &catalog, "text", &eligible);
        let token = CancellationToken::new();

        let none = matcher
            .match_multi(&terms(&[&["a"], &[]]), Alignment::Phrase, &token)
            .unwrap();
        assert!(none.is_empty());

        let disjoint = matcher
            .match_multi(&terms(&[&["a"], &["b"]]), Alignment::Context { distance: 5 }, &token)
            .unwrap();
        assert!(disjoint.is_empty());
    }

    #[test]
    fn test_cancelled_between_documents() {
        let (index, catalog) = fixture(&[(1, &[("a", 1), ("b", 2)])]);
        let eligible = all(1);
        let matcher = ProximityMatcher::new(&index, &catalog, "text", &eligible);
        let token = CancellationToken::new();
        token.cancel();

        let err = matcher
            .match_multi(&terms(&[&["a"], &["b"]]), Alignment::Phrase, &token)
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_unknown_document_is_an_error() {
        let mut builder = MemoryTermIndex::builder("text");
        builder.add_token(99, token("a", 1));
        let index = builder.build();
        let catalog = MemoryCatalog::new(vec![CatalogEntry::new(1, "one").other()]).unwrap();
        let eligible = all(1);
        let matcher = ProximityMatcher::new(&index, &catalog, "text", &eligible);

        let err = matcher
            .match_single(&["a".to_string()], &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, SearchError::Catalog(_)));
    }
}
