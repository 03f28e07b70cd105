//! In-memory term index built from document markup.
//!
//! Tags are skipped; every text run between tags is split on Unicode word
//! boundaries (UAX #29). Each word becomes a lowercased token with a
//! document-wide ordinal position and character offsets into the raw markup,
//! so highlighting can work directly on the stored document.

use std::sync::Arc;

use ahash::AHashMap;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Result, SearchError};
use crate::index::TermIndex;
use crate::index::posting::{PostingIterator, PostingList, TokenOccurrence};
use crate::index::terms::{SliceTermsEnum, TermsEnum};

/// A token produced from document markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lowercased token text.
    pub text: String,
    /// Ordinal position within the document.
    pub position: u32,
    /// Character offset of the token in the raw markup.
    pub start_offset: usize,
    /// Character offset one past the token in the raw markup.
    pub end_offset: usize,
}

/// Split markup into word tokens, skipping everything between `<` and `>`.
///
/// Offsets count characters, not bytes.
pub fn tokenize_markup(markup: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut position = 0u32;
    let mut chars_before = 0usize;
    let mut rest = markup;

    while !rest.is_empty() {
        let (run, tail) = match rest.find('<') {
            Some(i) => rest.split_at(i),
            None => (rest, ""),
        };

        // Word offsets are byte offsets into `run`; convert incrementally.
        let mut byte_cursor = 0usize;
        let mut char_cursor = chars_before;
        for (byte_offset, word) in run.unicode_word_indices() {
            char_cursor += run[byte_cursor..byte_offset].chars().count();
            let len = word.chars().count();
            tokens.push(Token {
                text: word.to_lowercase(),
                position,
                start_offset: char_cursor,
                end_offset: char_cursor + len,
            });
            position += 1;
            char_cursor += len;
            byte_cursor = byte_offset + word.len();
        }
        chars_before += run.chars().count();

        // Skip the tag. An unterminated tag swallows the rest of the input.
        let tag_len = match tail.find('>') {
            Some(end) => end + 1,
            None => tail.len(),
        };
        chars_before += tail[..tag_len].chars().count();
        rest = &tail[tag_len..];
    }

    tokens
}

/// Builder collecting postings before the index is frozen.
#[derive(Debug)]
pub struct MemoryTermIndexBuilder {
    field: String,
    postings: AHashMap<String, PostingList>,
}

impl MemoryTermIndexBuilder {
    /// Create a builder for a single indexed field.
    pub fn new<S: Into<String>>(field: S) -> Self {
        MemoryTermIndexBuilder {
            field: field.into(),
            postings: AHashMap::new(),
        }
    }

    /// Tokenize and index a document's markup.
    pub fn add_document(&mut self, doc_id: u64, markup: &str) -> &mut Self {
        for token in tokenize_markup(markup) {
            self.add_token(doc_id, token);
        }
        self
    }

    /// Index a pre-tokenized occurrence.
    pub fn add_token(&mut self, doc_id: u64, token: Token) -> &mut Self {
        let occurrence = TokenOccurrence::new(token.position, token.start_offset, token.end_offset);
        self.postings
            .entry(token.text.clone())
            .or_insert_with(|| PostingList::new(token.text))
            .add_occurrence(doc_id, occurrence);
        self
    }

    /// Freeze the index, sorting terms in literal order.
    pub fn build(self) -> MemoryTermIndex {
        let mut terms: Vec<(String, Arc<PostingList>)> = self
            .postings
            .into_iter()
            .map(|(term, list)| (term, Arc::new(list)))
            .collect();
        terms.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

        log::debug!("built in-memory index with {} terms", terms.len());
        MemoryTermIndex {
            field: self.field,
            terms,
        }
    }
}

/// Immutable in-memory index over one field.
#[derive(Debug)]
pub struct MemoryTermIndex {
    field: String,
    terms: Vec<(String, Arc<PostingList>)>,
}

impl MemoryTermIndex {
    /// Start building an index for `field`.
    pub fn builder<S: Into<String>>(field: S) -> MemoryTermIndexBuilder {
        MemoryTermIndexBuilder::new(field)
    }

    /// The indexed field.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Number of distinct terms.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    fn check_field(&self, field: &str) -> Result<()> {
        if field == self.field {
            Ok(())
        } else {
            Err(SearchError::index(format!(
                "field '{field}' is not indexed (indexed field: '{}')",
                self.field
            )))
        }
    }
}

impl TermIndex for MemoryTermIndex {
    fn terms(&self, field: &str) -> Result<Box<dyn TermsEnum + '_>> {
        self.check_field(field)?;
        Ok(Box::new(SliceTermsEnum::new(&self.terms)))
    }

    fn postings(&self, field: &str, term: &str) -> Result<PostingIterator> {
        self.check_field(field)?;
        match self
            .terms
            .binary_search_by(|(t, _)| t.as_bytes().cmp(term.as_bytes()))
        {
            Ok(i) => Ok(PostingIterator::new(Arc::clone(&self.terms[i].1))),
            Err(_) => Ok(PostingIterator::empty(term)),
        }
    }
}
