//! Corpus loading: builds the term index and the catalog in one pass.
//!
//! A corpus file is a JSON array of books:
//!
//! ```json
//! [
//!   { "id": 1, "name": "Dīghanikāya", "pitaka": "sutta", "layer": "mula",
//!     "markup": "<p>evaṃ me sutaṃ</p>" }
//! ]
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogEntry, DocumentCatalog, MemoryCatalog};
use crate::error::{Result, SearchError};
use crate::index::{MemoryTermIndex, TermIndex};

/// One book as stored in a corpus file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusDocument {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    /// Document markup; tags are not indexed.
    pub markup: String,
}

impl CorpusDocument {
    /// Create a document from its catalog entry and markup.
    pub fn new<S: Into<String>>(entry: CatalogEntry, markup: S) -> Self {
        CorpusDocument {
            entry,
            markup: markup.into(),
        }
    }
}

/// A loaded corpus: immutable index, catalog and stored markup.
#[derive(Debug, Clone)]
pub struct Corpus {
    index: Arc<MemoryTermIndex>,
    catalog: Arc<MemoryCatalog>,
    markup: Arc<Vec<String>>,
}

impl Corpus {
    /// Index documents into `field`. Document order defines the dense index.
    pub fn from_documents(field: &str, documents: Vec<CorpusDocument>) -> Result<Self> {
        let mut builder = MemoryTermIndex::builder(field);
        let mut entries = Vec::with_capacity(documents.len());
        let mut markup = Vec::with_capacity(documents.len());

        for document in documents {
            builder.add_document(document.entry.doc_id, &document.markup);
            entries.push(document.entry);
            markup.push(document.markup);
        }

        let catalog = MemoryCatalog::new(entries)?;
        let index = builder.build();
        log::info!(
            "loaded corpus: {} documents, {} terms",
            catalog.count(),
            index.term_count()
        );

        Ok(Corpus {
            index: Arc::new(index),
            catalog: Arc::new(catalog),
            markup: Arc::new(markup),
        })
    }

    /// Parse a JSON corpus.
    pub fn from_json_str(field: &str, json: &str) -> Result<Self> {
        let documents: Vec<CorpusDocument> = serde_json::from_str(json)?;
        Self::from_documents(field, documents)
    }

    /// Load a JSON corpus file.
    pub fn from_file<P: AsRef<Path>>(field: &str, path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            SearchError::index(format!("cannot read corpus {}: {e}", path.display()))
        })?;
        Self::from_json_str(field, &json)
    }

    /// The shared term index.
    pub fn index(&self) -> Arc<dyn TermIndex> {
        self.index.clone()
    }

    /// The shared catalog.
    pub fn catalog(&self) -> Arc<dyn DocumentCatalog> {
        self.catalog.clone()
    }

    /// Stored markup by dense document index.
    pub fn markup(&self, document_index: usize) -> Option<&str> {
        self.markup.get(document_index).map(String::as_str)
    }
}
