//! The search pipeline: resolve, filter, match, aggregate.

pub mod aggregate;
pub mod engine;
pub mod filter;
pub mod proximity;
pub mod resolver;
pub mod types;

pub use aggregate::{MergedMatch, ResultAggregator, SearchTotals};
pub use engine::{SearchRequest, SearchResponse, SearchService, SearchSession};
pub use filter::DocumentFilter;
pub use proximity::{Alignment, ProximityMatcher};
pub use resolver::TermResolver;
pub use types::{
    DocumentHits, MultiTermMatch, PositionMap, SingleTermMatch, TermMatch, TermMatchResult,
    TermPosition,
};
