//! Posting lists with token positions and character offsets.
//!
//! A posting records every occurrence of one term in one document: the
//! token ordinal used for alignment and the character span used for
//! highlighting.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One occurrence of a term inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenOccurrence {
    /// Token ordinal within the document.
    pub position: u32,
    /// Character offset of the first character of the token.
    pub start_offset: usize,
    /// Character offset one past the last character of the token.
    pub end_offset: usize,
}

impl TokenOccurrence {
    /// Create a new occurrence.
    pub fn new(position: u32, start_offset: usize, end_offset: usize) -> Self {
        TokenOccurrence {
            position,
            start_offset,
            end_offset,
        }
    }
}

/// A single posting in a posting list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    /// Document ID (catalog id, not the dense index).
    pub doc_id: u64,
    /// Term frequency in the document.
    pub frequency: u32,
    /// Occurrences in position order.
    pub occurrences: Vec<TokenOccurrence>,
}

impl Posting {
    /// Create a posting from its occurrences.
    pub fn with_occurrences(doc_id: u64, mut occurrences: Vec<TokenOccurrence>) -> Self {
        occurrences.sort_by_key(|o| o.position);
        Posting {
            doc_id,
            frequency: occurrences.len() as u32,
            occurrences,
        }
    }

    /// Add an occurrence, keeping position order.
    pub fn add_occurrence(&mut self, occurrence: TokenOccurrence) {
        let at = self
            .occurrences
            .partition_point(|o| o.position < occurrence.position);
        self.occurrences.insert(at, occurrence);
        self.frequency = self.occurrences.len() as u32;
    }

    /// Get the term frequency.
    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Get the occurrences.
    pub fn occurrences(&self) -> &[TokenOccurrence] {
        &self.occurrences
    }
}

/// A posting list for a specific term.
#[derive(Debug, Clone, Default)]
pub struct PostingList {
    /// The term this posting list represents.
    pub term: String,
    /// The postings in this list, sorted by doc_id.
    pub postings: Vec<Posting>,
}

impl PostingList {
    /// Create a new empty posting list.
    pub fn new(term: String) -> Self {
        PostingList {
            term,
            postings: Vec::new(),
        }
    }

    /// Add a posting to this list.
    pub fn add_posting(&mut self, posting: Posting) {
        // Insert in sorted order by doc_id
        match self
            .postings
            .binary_search_by_key(&posting.doc_id, |p| p.doc_id)
        {
            Ok(pos) => {
                let existing = &mut self.postings[pos];
                for occurrence in posting.occurrences {
                    existing.add_occurrence(occurrence);
                }
            }
            Err(pos) => {
                self.postings.insert(pos, posting);
            }
        }
    }

    /// Record a single occurrence of the term in a document.
    pub fn add_occurrence(&mut self, doc_id: u64, occurrence: TokenOccurrence) {
        self.add_posting(Posting::with_occurrences(doc_id, vec![occurrence]));
    }
}

/// Cursor over a shared posting list.
///
/// Cloning the underlying list is avoided; the index hands out an `Arc`
/// and each request walks it with its own cursor.
#[derive(Debug, Clone)]
pub struct PostingIterator {
    list: Arc<PostingList>,
    position: usize,
}

impl PostingIterator {
    /// Create a new posting iterator.
    pub fn new(list: Arc<PostingList>) -> Self {
        PostingIterator { list, position: 0 }
    }

    /// Create an empty iterator for a term with no postings.
    pub fn empty(term: &str) -> Self {
        PostingIterator {
            list: Arc::new(PostingList::new(term.to_string())),
            position: 0,
        }
    }

    /// Advance to the next posting.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&Posting> {
        if self.position < self.list.postings.len() {
            let posting = &self.list.postings[self.position];
            self.position += 1;
            Some(posting)
        } else {
            None
        }
    }

    /// Rewind to the first posting.
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Get the total number of postings.
    pub fn len(&self) -> usize {
        self.list.postings.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.list.postings.is_empty()
    }

    /// Find the posting for a document without moving the cursor.
    pub fn posting_for(&self, doc_id: u64) -> Option<&Posting> {
        self.list
            .postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .ok()
            .map(|i| &self.list.postings[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posting_keeps_position_order() {
        let mut posting = Posting::with_occurrences(3, vec![TokenOccurrence::new(12, 60, 66)]);
        posting.add_occurrence(TokenOccurrence::new(5, 20, 26));

        assert_eq!(posting.frequency(), 2);
        let positions: Vec<u32> = posting.occurrences().iter().map(|o| o.position).collect();
        assert_eq!(positions, vec![5, 12]);
    }

    #[test]
    fn test_posting_list_merges_same_document() {
        let mut list = PostingList::new("dhamma".to_string());
        list.add_occurrence(7, TokenOccurrence::new(2, 8, 14));
        list.add_occurrence(1, TokenOccurrence::new(4, 10, 16));
        list.add_occurrence(7, TokenOccurrence::new(9, 40, 46));

        assert_eq!(list.postings.len(), 2);
        assert_eq!(list.postings[0].doc_id, 1);
        assert_eq!(list.postings[1].frequency(), 2);
    }

    #[test]
    fn test_posting_iterator() {
        let mut list = PostingList::new("sila".to_string());
        for doc_id in [2, 4, 9] {
            list.add_occurrence(doc_id, TokenOccurrence::new(0, 0, 4));
        }
        let mut iter = PostingIterator::new(Arc::new(list));

        assert_eq!(iter.len(), 3);
        assert_eq!(iter.next().map(|p| p.doc_id), Some(2));
        assert!(iter.posting_for(4).is_some());
        assert!(iter.posting_for(5).is_none());
        iter.next();
        iter.next();
        assert!(iter.next().is_none());
        iter.reset();
        assert_eq!(iter.next().map(|p| p.doc_id), Some(2));

        assert!(PostingIterator::empty("x").is_empty());
    }
}
