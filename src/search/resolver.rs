//! Expansion of query-word predicates into candidate index terms.

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::index::TermIndex;
use crate::index::terms::TermsEnum;
use crate::query::{CompiledQuery, MatchPredicate};

/// Resolves predicates against one field of a [`TermIndex`].
pub struct TermResolver<'a> {
    index: &'a dyn TermIndex,
    field: &'a str,
}

impl<'a> TermResolver<'a> {
    pub fn new(index: &'a dyn TermIndex, field: &'a str) -> Self {
        TermResolver { index, field }
    }

    /// Candidate literal terms for one predicate, in enumeration order.
    ///
    /// Exact words resolve to themselves without touching the index; a
    /// missing word shows up later as empty postings. Prefix predicates seek
    /// to the prefix and stop at the first non-matching term after a run of
    /// matches, which relies on the [`TermIndex`] ordering precondition.
    /// Wildcard and regex predicates scan the whole term space. An empty
    /// result is valid.
    pub fn resolve(
        &self,
        predicate: &MatchPredicate,
        token: &CancellationToken,
    ) -> Result<Vec<String>> {
        let mut terms = match predicate {
            MatchPredicate::Word(literal) => return Ok(vec![literal.clone()]),
            MatchPredicate::StartsWith(prefix) => {
                let mut terms = self.index.terms(self.field)?;
                terms.seek(prefix)?;
                terms
            }
            _ => self.index.terms(self.field)?,
        };

        let early_exit = matches!(predicate, MatchPredicate::StartsWith(_));
        let mut candidates = Vec::new();
        let mut scanned = 0usize;

        while let Some(term) = terms.next()? {
            token.check()?;
            scanned += 1;
            if predicate.matches(&term) {
                candidates.push(term);
            } else if early_exit && !candidates.is_empty() {
                break;
            }
        }

        log::debug!(
            "{predicate:?}: {} candidates after scanning {scanned} terms",
            candidates.len()
        );
        Ok(candidates)
    }

    /// Candidates for every word of a compiled query, in query order.
    pub fn resolve_all(
        &self,
        query: &CompiledQuery,
        token: &CancellationToken,
    ) -> Result<Vec<Vec<String>>> {
        query
            .words
            .iter()
            .map(|word| self.resolve(&word.predicate, token))
            .collect()
    }
}
