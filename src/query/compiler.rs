//! Query compilation: raw text to ordered per-word predicates.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::query::predicate::MatchPredicate;

/// Characters that make a word a wildcard pattern.
pub const WILDCARD_METACHARACTERS: &[char] = &['*', '?'];

/// Characters that make a word a regular expression.
pub const REGEX_METACHARACTERS: &[char] = &[
    '\\', '^', '$', '.', '|', '?', '*', '+', '(', ')', '[', ']', '{', '}',
];

/// Quotation marks recognized around phrases and stripped from queries.
pub const QUOTATION_MARKS: &[char] = &[
    '"', '\u{201C}', '\u{201D}', '\u{201E}', '\u{201F}', '\u{00AB}', '\u{00BB}', '\u{300C}',
    '\u{300D}',
];

/// Requested interpretation of query words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Exact,
    Wildcard,
    Regex,
}

/// A query word and the predicate it compiled to.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryWord {
    pub literal: String,
    pub predicate: MatchPredicate,
}

/// The compiled form of a query.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    /// Words in query order.
    pub words: Vec<QueryWord>,
    /// Mode actually used, after degrading to exact.
    pub mode: SearchMode,
    pub is_phrase: bool,
    pub is_multi_word: bool,
}

impl CompiledQuery {
    /// Number of query words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Always false for a successfully compiled query.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Turns raw query text into [`CompiledQuery`] values.
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    lowercase: bool,
}

impl Default for QueryCompiler {
    fn default() -> Self {
        QueryCompiler { lowercase: true }
    }
}

impl QueryCompiler {
    /// Create a compiler. `lowercase` folds non-regex words to lowercase.
    pub fn new(lowercase: bool) -> Self {
        QueryCompiler { lowercase }
    }

    /// Compile `text` in the requested mode.
    ///
    /// A leading or trailing quotation mark requests phrase matching, as does
    /// `phrase`. Phrase and multi-word flags are only set for two or more
    /// words. Invalid patterns fail here, before the index is touched.
    pub fn compile(&self, text: &str, mode: SearchMode, phrase: bool) -> Result<CompiledQuery> {
        let trimmed = text.trim();
        let quoted = trimmed.starts_with(QUOTATION_MARKS) || trimmed.ends_with(QUOTATION_MARKS);

        let unquoted: String = trimmed
            .chars()
            .filter(|c| !QUOTATION_MARKS.contains(c))
            .collect();
        let raw_words: Vec<&str> = unquoted.split_whitespace().collect();
        if raw_words.is_empty() {
            return Err(SearchError::query("query is empty"));
        }

        let effective = effective_mode(&unquoted, mode);
        if effective != mode {
            log::debug!("no {mode:?} metacharacters in '{unquoted}', searching exact");
        }

        let words = raw_words
            .into_iter()
            .map(|raw| {
                let keep_case = effective == SearchMode::Regex && is_regex_word(raw);
                let literal = if self.lowercase && !keep_case {
                    raw.to_lowercase()
                } else {
                    raw.to_string()
                };
                let predicate = compile_word(&literal, effective)?;
                Ok(QueryWord { literal, predicate })
            })
            .collect::<Result<Vec<_>>>()?;

        let is_multi_word = words.len() > 1;
        Ok(CompiledQuery {
            is_phrase: is_multi_word && (phrase || quoted),
            is_multi_word,
            mode: effective,
            words,
        })
    }
}

/// Degrade wildcard or regex mode to exact when no metacharacter is present.
pub fn effective_mode(text: &str, mode: SearchMode) -> SearchMode {
    match mode {
        SearchMode::Wildcard if !text.contains(WILDCARD_METACHARACTERS) => SearchMode::Exact,
        SearchMode::Regex if !text.contains(REGEX_METACHARACTERS) => SearchMode::Exact,
        other => other,
    }
}

fn is_regex_word(word: &str) -> bool {
    word.contains(REGEX_METACHARACTERS)
}

fn compile_word(literal: &str, mode: SearchMode) -> Result<MatchPredicate> {
    match mode {
        SearchMode::Exact => Ok(MatchPredicate::word(literal)),
        SearchMode::Wildcard => {
            if !literal.contains(WILDCARD_METACHARACTERS) {
                return Ok(MatchPredicate::word(literal));
            }
            match literal.strip_suffix('*') {
                Some(prefix)
                    if !prefix.is_empty()
                        && !prefix.contains(WILDCARD_METACHARACTERS)
                        && !prefix.contains('\\') =>
                {
                    Ok(MatchPredicate::starts_with(prefix))
                }
                _ => MatchPredicate::wildcard(literal),
            }
        }
        SearchMode::Regex => {
            if is_regex_word(literal) {
                MatchPredicate::regex(literal)
            } else {
                Ok(MatchPredicate::word(literal))
            }
        }
    }
}
