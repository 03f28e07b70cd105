//! Query compilation and per-word match predicates.

pub mod compiler;
pub mod predicate;

pub use compiler::{CompiledQuery, QueryCompiler, QueryWord, SearchMode, effective_mode};
pub use predicate::MatchPredicate;
