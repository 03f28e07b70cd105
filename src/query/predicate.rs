//! Per-word match predicates.

use std::fmt;

use regex::Regex;

use crate::error::{Result, SearchError};

/// The rule a single query word uses to select index terms.
#[derive(Clone)]
pub enum MatchPredicate {
    /// Exact literal.
    Word(String),
    /// Literal prefix, from a wildcard word whose only metacharacter is a
    /// trailing `*`.
    StartsWith(String),
    /// General wildcard pattern (`*` any run, `?` one character).
    Wildcard { pattern: String, regex: Regex },
    /// Regular expression matched against the whole term.
    Regex { pattern: String, regex: Regex },
}

impl MatchPredicate {
    /// Exact literal predicate.
    pub fn word<S: Into<String>>(literal: S) -> Self {
        MatchPredicate::Word(literal.into())
    }

    /// Prefix predicate.
    pub fn starts_with<S: Into<String>>(prefix: S) -> Self {
        MatchPredicate::StartsWith(prefix.into())
    }

    /// Wildcard predicate.
    pub fn wildcard<S: Into<String>>(pattern: S) -> Result<Self> {
        let pattern = pattern.into();
        let regex = compile_wildcard(&pattern)?;
        Ok(MatchPredicate::Wildcard { pattern, regex })
    }

    /// Regex predicate, anchored to the whole term.
    pub fn regex<S: Into<String>>(pattern: S) -> Result<Self> {
        let pattern = pattern.into();
        let regex = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|e| SearchError::invalid_pattern(pattern.clone(), e.to_string()))?;
        Ok(MatchPredicate::Regex { pattern, regex })
    }

    /// Check whether an index term satisfies the predicate.
    pub fn matches(&self, term: &str) -> bool {
        match self {
            MatchPredicate::Word(literal) => term == literal,
            MatchPredicate::StartsWith(prefix) => term.starts_with(prefix.as_str()),
            MatchPredicate::Wildcard { regex, .. } | MatchPredicate::Regex { regex, .. } => {
                regex.is_match(term)
            }
        }
    }

    /// The literal or pattern text.
    pub fn text(&self) -> &str {
        match self {
            MatchPredicate::Word(s) | MatchPredicate::StartsWith(s) => s,
            MatchPredicate::Wildcard { pattern, .. } | MatchPredicate::Regex { pattern, .. } => {
                pattern
            }
        }
    }

    /// Short name of the predicate kind.
    pub fn kind(&self) -> &'static str {
        match self {
            MatchPredicate::Word(_) => "word",
            MatchPredicate::StartsWith(_) => "starts-with",
            MatchPredicate::Wildcard { .. } => "wildcard",
            MatchPredicate::Regex { .. } => "regex",
        }
    }
}

impl fmt::Debug for MatchPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.kind(), self.text())
    }
}

impl PartialEq for MatchPredicate {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.text() == other.text()
    }
}

/// Compile a wildcard pattern into an anchored regex.
///
/// `\*` and `\?` match literal `*` and `?`; every other regex
/// metacharacter is escaped.
fn compile_wildcard(pattern: &str) -> Result<Regex> {
    let mut regex_pattern = String::with_capacity(pattern.len() + 8);
    regex_pattern.push('^');

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => regex_pattern.push_str(&regex::escape(&escaped.to_string())),
                None => regex_pattern.push_str("\\\\"),
            },
            '*' => regex_pattern.push_str(".*"),
            '?' => regex_pattern.push('.'),
            c => regex_pattern.push_str(&regex::escape(&c.to_string())),
        }
    }

    regex_pattern.push('$');

    Regex::new(&regex_pattern)
        .map_err(|e| SearchError::invalid_pattern(pattern, format!("invalid wildcard: {e}")))
}
