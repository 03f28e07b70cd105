//! Error types for the search engine.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`SearchError`] enum. Cancellation travels through the same channel as
//! [`SearchError::OperationCancelled`] but is not a failure: the search
//! service turns it into a response with `cancelled` set.
//!
//! # Examples
//!
//! ```
//! use tipitaka_search::error::{Result, SearchError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(SearchError::query("empty query"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for search operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// I/O errors (corpus and config files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A wildcard or regex query word failed to compile.
    #[error("Invalid pattern '{word}': {reason}")]
    InvalidPattern { word: String, reason: String },

    /// Query-related errors (empty query, bad distance, ...)
    #[error("Query error: {0}")]
    Query(String),

    /// Term index errors
    #[error("Index error: {0}")]
    Index(String),

    /// Document catalog errors
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Highlighting errors (offsets outside the document, inside a tag)
    #[error("Highlight error: {0}")]
    Highlight(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation cancelled
    #[error("Operation cancelled: {0}")]
    OperationCancelled(String),

    /// Errors with added context from the command line layer
    #[error("{0:#}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with SearchError.
pub type Result<T> = std::result::Result<T, SearchError>;

impl SearchError {
    /// Create a new invalid pattern error.
    pub fn invalid_pattern<W: Into<String>, R: Into<String>>(word: W, reason: R) -> Self {
        SearchError::InvalidPattern {
            word: word.into(),
            reason: reason.into(),
        }
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        SearchError::Query(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        SearchError::Index(msg.into())
    }

    /// Create a new catalog error.
    pub fn catalog<S: Into<String>>(msg: S) -> Self {
        SearchError::Catalog(msg.into())
    }

    /// Create a new highlight error.
    pub fn highlight<S: Into<String>>(msg: S) -> Self {
        SearchError::Highlight(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        SearchError::Config(msg.into())
    }

    /// Create a new cancelled error.
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        SearchError::OperationCancelled(msg.into())
    }

    /// Whether this error is the cancellation status rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SearchError::OperationCancelled(_))
    }

    /// Whether this error is a request validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, SearchError::InvalidPattern { .. } | SearchError::Query(_))
    }
}
