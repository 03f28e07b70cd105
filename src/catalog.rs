//! Document catalog: dense document indexes and classification bit-sets.
//!
//! Every book of the corpus has a stable dense index (`0..count`) that
//! addresses all per-request bit-sets, and a catalog id used by the term
//! index postings. Books are classified along two axes, the pitaka and the
//! commentary layer, plus an "other" flag for extra-canonical texts. The
//! classification sets are computed once when the catalog is loaded.

use std::fmt::{self, Debug};
use std::str::FromStr;

use ahash::AHashMap;
use bit_vec::BitVec;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

/// First classification axis: the basket a book belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pitaka {
    Vinaya,
    Sutta,
    Abhidhamma,
}

impl Pitaka {
    /// All pitakas in canonical order.
    pub const ALL: [Pitaka; 3] = [Pitaka::Vinaya, Pitaka::Sutta, Pitaka::Abhidhamma];

    fn ordinal(self) -> usize {
        self as usize
    }
}

/// Second classification axis: root text or commentary level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Mula,
    Atthakatha,
    Tika,
}

impl Layer {
    /// All layers in canonical order.
    pub const ALL: [Layer; 3] = [Layer::Mula, Layer::Atthakatha, Layer::Tika];

    fn ordinal(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Pitaka {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Pitaka::Vinaya => "vinaya",
            Pitaka::Sutta => "sutta",
            Pitaka::Abhidhamma => "abhidhamma",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::Mula => "mula",
            Layer::Atthakatha => "atthakatha",
            Layer::Tika => "tika",
        };
        f.write_str(name)
    }
}

impl FromStr for Pitaka {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "vinaya" => Ok(Pitaka::Vinaya),
            "sutta" => Ok(Pitaka::Sutta),
            "abhidhamma" => Ok(Pitaka::Abhidhamma),
            other => Err(SearchError::catalog(format!("unknown pitaka '{other}'"))),
        }
    }
}

impl FromStr for Layer {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mula" => Ok(Layer::Mula),
            "atthakatha" | "attha" => Ok(Layer::Atthakatha),
            "tika" => Ok(Layer::Tika),
            other => Err(SearchError::catalog(format!("unknown layer '{other}'"))),
        }
    }
}

/// Catalog record for one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Id used by the term index postings.
    #[serde(alias = "id")]
    pub doc_id: u64,
    /// Display name.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pitaka: Option<Pitaka>,
    #[serde(default)]
    pub layer: Option<Layer>,
    /// Extra-canonical book.
    #[serde(default)]
    pub other: bool,
}

impl CatalogEntry {
    /// Create an entry with no classification.
    pub fn new<S: Into<String>>(doc_id: u64, name: S) -> Self {
        CatalogEntry {
            doc_id,
            name: name.into(),
            pitaka: None,
            layer: None,
            other: false,
        }
    }

    /// Set the pitaka.
    pub fn pitaka(mut self, pitaka: Pitaka) -> Self {
        self.pitaka = Some(pitaka);
        self
    }

    /// Set the commentary layer.
    pub fn layer(mut self, layer: Layer) -> Self {
        self.layer = Some(layer);
        self
    }

    /// Mark the book as extra-canonical.
    pub fn other(mut self) -> Self {
        self.other = true;
        self
    }

    /// Whether some filter selection can reach the book.
    pub fn is_classified(&self) -> bool {
        self.other || (self.pitaka.is_some() && self.layer.is_some())
    }
}

/// Read-only access to the document catalog.
///
/// Implementations are loaded once at startup and never mutated afterwards.
/// Returned bit-sets are `count()` bits long and indexed by dense index.
pub trait DocumentCatalog: Send + Sync + Debug {
    /// Number of documents.
    fn count(&self) -> usize;

    /// Dense index of a document id.
    fn document_index(&self, doc_id: u64) -> Option<usize>;

    /// Document id at a dense index.
    fn document_id(&self, index: usize) -> Option<u64>;

    /// Catalog record at a dense index.
    fn entry(&self, index: usize) -> Option<&CatalogEntry>;

    /// Documents belonging to a pitaka.
    fn pitaka_bits(&self, pitaka: Pitaka) -> &BitVec;

    /// Documents belonging to a commentary layer.
    fn layer_bits(&self, layer: Layer) -> &BitVec;

    /// Extra-canonical documents.
    fn other_bits(&self) -> &BitVec;
}

/// In-memory catalog table.
pub struct MemoryCatalog {
    entries: Vec<CatalogEntry>,
    by_id: AHashMap<u64, usize>,
    pitaka_bits: [BitVec; 3],
    layer_bits: [BitVec; 3],
    other_bits: BitVec,
}

impl Debug for MemoryCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCatalog")
            .field("count", &self.entries.len())
            .finish()
    }
}

impl MemoryCatalog {
    /// Build the catalog. Entry order defines the dense index.
    ///
    /// A canonical book must carry both a pitaka and a layer; only books
    /// marked `other` may leave an axis unset.
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self> {
        let count = entries.len();
        let empty = || BitVec::from_elem(count, false);
        let mut by_id = AHashMap::with_capacity(count);
        let mut pitaka_bits = [empty(), empty(), empty()];
        let mut layer_bits = [empty(), empty(), empty()];
        let mut other_bits = empty();

        for (index, entry) in entries.iter().enumerate() {
            if by_id.insert(entry.doc_id, index).is_some() {
                return Err(SearchError::catalog(format!(
                    "duplicate document id {}",
                    entry.doc_id
                )));
            }
            if !entry.is_classified() {
                return Err(SearchError::catalog(format!(
                    "document {} ('{}') needs both a pitaka and a layer, or the other flag",
                    entry.doc_id, entry.name
                )));
            }
            if let Some(pitaka) = entry.pitaka {
                pitaka_bits[pitaka.ordinal()].set(index, true);
            }
            if let Some(layer) = entry.layer {
                layer_bits[layer.ordinal()].set(index, true);
            }
            if entry.other {
                other_bits.set(index, true);
            }
        }

        Ok(MemoryCatalog {
            entries,
            by_id,
            pitaka_bits,
            layer_bits,
            other_bits,
        })
    }
}

impl DocumentCatalog for MemoryCatalog {
    fn count(&self) -> usize {
        self.entries.len()
    }

    fn document_index(&self, doc_id: u64) -> Option<usize> {
        self.by_id.get(&doc_id).copied()
    }

    fn document_id(&self, index: usize) -> Option<u64> {
        self.entries.get(index).map(|e| e.doc_id)
    }

    fn entry(&self, index: usize) -> Option<&CatalogEntry> {
        self.entries.get(index)
    }

    fn pitaka_bits(&self, pitaka: Pitaka) -> &BitVec {
        &self.pitaka_bits[pitaka.ordinal()]
    }

    fn layer_bits(&self, layer: Layer) -> &BitVec {
        &self.layer_bits[layer.ordinal()]
    }

    fn other_bits(&self) -> &BitVec {
        &self.other_bits
    }
}
