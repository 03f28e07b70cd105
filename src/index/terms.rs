//! Term dictionary enumeration API.
//!
//! Terms are enumerated in the index's literal order. Prefix resolution
//! relies on that order being contiguous for every prefix family, see
//! [`TermIndex`](crate::index::TermIndex).

use std::sync::Arc;

use crate::error::Result;
use crate::index::compare_literals;
use crate::index::posting::PostingList;

/// Iterator over terms in a field's term dictionary, in sorted order.
pub trait TermsEnum: Send {
    /// Advance to the next term in the enumeration.
    ///
    /// Returns `None` when there are no more terms.
    fn next(&mut self) -> Result<Option<String>>;

    /// Seek to the first term greater than or equal to the target.
    ///
    /// Returns `true` if an exact match was found. The next call to
    /// [`next`](TermsEnum::next) yields the term the cursor was placed on.
    fn seek(&mut self, target: &str) -> Result<bool>;
}

impl<T: TermsEnum + ?Sized> TermsEnum for Box<T> {
    fn next(&mut self) -> Result<Option<String>> {
        (**self).next()
    }

    fn seek(&mut self, target: &str) -> Result<bool> {
        (**self).seek(target)
    }
}

/// Terms enum over a sorted slice of `(term, postings)` entries.
pub struct SliceTermsEnum<'a> {
    terms: &'a [(String, Arc<PostingList>)],
    position: usize,
}

impl<'a> SliceTermsEnum<'a> {
    /// Create a new terms enum. `terms` must already be sorted.
    pub fn new(terms: &'a [(String, Arc<PostingList>)]) -> Self {
        SliceTermsEnum { terms, position: 0 }
    }
}

impl TermsEnum for SliceTermsEnum<'_> {
    fn next(&mut self) -> Result<Option<String>> {
        let Some((term, _)) = self.terms.get(self.position) else {
            return Ok(None);
        };
        self.position += 1;
        Ok(Some(term.clone()))
    }

    fn seek(&mut self, target: &str) -> Result<bool> {
        match self
            .terms
            .binary_search_by(|(term, _)| compare_literals(term, target))
        {
            Ok(index) => {
                self.position = index;
                Ok(true)
            }
            Err(index) => {
                self.position = index;
                Ok(false)
            }
        }
    }
}
