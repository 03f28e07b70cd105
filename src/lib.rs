//! # tipitaka-search
//!
//! Full-text search over a pre-indexed, multilingual Pali canon corpus.
//!
//! ## Features
//!
//! - Exact, wildcard and regex query words, expanded against the term index
//! - Phrase and bounded-distance context matching across wildcard expansions
//! - Category filtering by pitaka, commentary layer and extra-canonical books
//! - Cooperative cancellation of superseded searches
//! - Hit highlighting in stored markup with numbered, navigable hits
//!
//! ```
//! use tipitaka_search::cancel::CancellationToken;
//! use tipitaka_search::catalog::{CatalogEntry, Layer, Pitaka};
//! use tipitaka_search::config::SearchConfig;
//! use tipitaka_search::corpus::{Corpus, CorpusDocument};
//! use tipitaka_search::search::{SearchRequest, SearchService};
//!
//! let corpus = Corpus::from_documents(
//!     "text",
//!     vec![CorpusDocument::new(
//!         CatalogEntry::new(1, "Dīghanikāya").pitaka(Pitaka::Sutta).layer(Layer::Mula),
//!         "<p>evaṃ me sutaṃ</p>",
//!     )],
//! )?;
//! let service = SearchService::from_corpus(&corpus, SearchConfig::default());
//! let response = service.search(&SearchRequest::new("\"evaṃ me\""), &CancellationToken::new())?;
//! assert_eq!(response.total_occurrence_count, 1);
//! # Ok::<(), tipitaka_search::error::SearchError>(())
//! ```

pub mod cancel;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod highlight;
pub mod index;
pub mod query;
pub mod search;

pub mod prelude {
    pub use crate::cancel::CancellationToken;
    pub use crate::catalog::{CatalogEntry, DocumentCatalog, Layer, Pitaka};
    pub use crate::config::SearchConfig;
    pub use crate::corpus::{Corpus, CorpusDocument};
    pub use crate::error::{Result, SearchError};
    pub use crate::highlight::{HighlightConfig, HighlightSpan, Highlighter};
    pub use crate::index::TermIndex;
    pub use crate::query::SearchMode;
    pub use crate::search::{
        DocumentFilter, SearchRequest, SearchResponse, SearchService, SearchSession, TermMatch,
        TermMatchResult,
    };
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
