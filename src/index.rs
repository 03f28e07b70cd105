//! Read-only term index: sorted term enumeration and positional postings.
//!
//! The index is opened once at startup and shared by every request. Nothing
//! in the search pipeline writes to it.

pub mod memory;
pub mod posting;
pub mod terms;

use std::cmp::Ordering;
use std::fmt::Debug;

use crate::error::Result;
use crate::index::posting::PostingIterator;
use crate::index::terms::TermsEnum;

pub use memory::{MemoryTermIndex, MemoryTermIndexBuilder, Token, tokenize_markup};
pub use posting::{Posting, PostingList, TokenOccurrence};

/// Compare two literal terms in the corpus's literal order.
///
/// Literals are compared by their UTF-8 bytes, which for the romanized Pali
/// terms of the corpus is the same order the in-memory index stores them in.
pub fn compare_literals(a: &str, b: &str) -> Ordering {
    a.as_bytes().cmp(b.as_bytes())
}

/// Access to the inverted index.
///
/// # Preconditions
///
/// [`terms`](TermIndex::terms) must enumerate in exactly the order defined by
/// [`compare_terms`](TermIndex::compare_terms), and that order must keep every
/// prefix family contiguous. Prefix resolution stops at the first non-match
/// after a run of matches; if enumeration order and literal order diverge,
/// prefix queries silently under- or over-match.
pub trait TermIndex: Send + Sync + Debug {
    /// Enumerate the terms of `field` in literal order.
    fn terms(&self, field: &str) -> Result<Box<dyn TermsEnum + '_>>;

    /// Postings of `term` in `field`. Unknown terms yield an empty iterator.
    ///
    /// Every posting with a non-zero frequency must carry its occurrences;
    /// positions are the alignment coordinate and offsets drive highlighting.
    fn postings(&self, field: &str, term: &str) -> Result<PostingIterator>;

    /// The literal order used by [`terms`](TermIndex::terms).
    fn compare_terms(&self, a: &str, b: &str) -> Ordering {
        compare_literals(a, b)
    }
}
