//! Category selections to the eligible-document bit-set.

use bit_vec::BitVec;
use serde::{Deserialize, Serialize};

use crate::catalog::{DocumentCatalog, Layer, Pitaka};

/// Caller's category selection.
///
/// Within an axis the selected categories are united; two constraining axes
/// are intersected; "other" books are added afterwards and are never subject
/// to the axis intersection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFilter {
    #[serde(default)]
    pub vinaya: bool,
    #[serde(default)]
    pub sutta: bool,
    #[serde(default)]
    pub abhidhamma: bool,
    #[serde(default)]
    pub mula: bool,
    #[serde(default)]
    pub atthakatha: bool,
    #[serde(default)]
    pub tika: bool,
    #[serde(default)]
    pub other: bool,
}

impl DocumentFilter {
    /// Nothing selected: the eligible set is empty.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every category selected.
    pub fn all() -> Self {
        DocumentFilter {
            vinaya: true,
            sutta: true,
            abhidhamma: true,
            mula: true,
            atthakatha: true,
            tika: true,
            other: true,
        }
    }

    /// Select a pitaka.
    pub fn with_pitaka(mut self, pitaka: Pitaka) -> Self {
        match pitaka {
            Pitaka::Vinaya => self.vinaya = true,
            Pitaka::Sutta => self.sutta = true,
            Pitaka::Abhidhamma => self.abhidhamma = true,
        }
        self
    }

    /// Select a commentary layer.
    pub fn with_layer(mut self, layer: Layer) -> Self {
        match layer {
            Layer::Mula => self.mula = true,
            Layer::Atthakatha => self.atthakatha = true,
            Layer::Tika => self.tika = true,
        }
        self
    }

    /// Select the extra-canonical books.
    pub fn with_other(mut self) -> Self {
        self.other = true;
        self
    }

    fn selected_pitakas(&self) -> Vec<Pitaka> {
        let flags = [self.vinaya, self.sutta, self.abhidhamma];
        Pitaka::ALL
            .into_iter()
            .zip(flags)
            .filter_map(|(p, on)| on.then_some(p))
            .collect()
    }

    fn selected_layers(&self) -> Vec<Layer> {
        let flags = [self.mula, self.atthakatha, self.tika];
        Layer::ALL
            .into_iter()
            .zip(flags)
            .filter_map(|(l, on)| on.then_some(l))
            .collect()
    }

    /// Materialize a fresh eligible set for this request.
    pub fn eligible(&self, catalog: &dyn DocumentCatalog) -> BitVec {
        let count = catalog.count();

        let pitakas = self.selected_pitakas();
        let layers = self.selected_layers();
        let pitaka_bits = union_of(count, pitakas.iter().map(|&p| catalog.pitaka_bits(p)));
        let layer_bits = union_of(count, layers.iter().map(|&l| catalog.layer_bits(l)));

        let mut result = match (pitaka_bits, layer_bits) {
            (Some(mut a), Some(b)) => {
                a.and(&b);
                a
            }
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => BitVec::from_elem(count, false),
        };

        if self.other {
            result.or(catalog.other_bits());
        }
        result
    }
}

/// OR of the given sets, or `None` when nothing was selected on the axis.
fn union_of<'a>(count: usize, sets: impl Iterator<Item = &'a BitVec>) -> Option<BitVec> {
    let mut acc: Option<BitVec> = None;
    for bits in sets {
        match acc.as_mut() {
            Some(acc) => {
                acc.or(bits);
            }
            None => {
                let mut fresh = BitVec::from_elem(count, false);
                fresh.or(bits);
                acc = Some(fresh);
            }
        }
    }
    acc
}
