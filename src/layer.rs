//! Layer universe and membership encodings used to filter interactions.

use alloc::string::String;
use hashbrown::{HashMap, HashSet};
use rustc_hash::FxBuildHasher;

/// Largest layer count that still fits the bitmask encoding.
const MASK_LIMIT: usize = 30;

/// Interned layer identifiers, indexed in first-appearance order.
///
/// The universe is defined by the layers segments carry; interaction
/// filtering only ever compares against a segment's layer, so identifiers
/// that no segment uses cannot affect any decision.
pub(crate) struct LayerTable {
    index: HashMap<String, u32, FxBuildHasher>,
}

impl LayerTable {
    pub fn from_segment_layers<'a, I>(ids: I) -> Self
    where
        I: Iterator<Item = &'a str>,
    {
        let mut index = HashMap::with_hasher(FxBuildHasher::default());
        for id in ids {
            let next = index.len() as u32;
            index.entry_ref(id).or_insert(next);
        }
        LayerTable { index }
    }

    pub fn get(&self, id: &str) -> Option<u32> {
        self.index.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True while every layer fits in a 32-bit mask with room to spare.
    pub fn fits_mask(&self) -> bool {
        self.index.len() <= MASK_LIMIT
    }
}

/// A point's layer membership.
///
/// Compact bitmask for small universes, hashed set beyond that. Both
/// encodings answer `contains` identically.
pub(crate) enum LayerSet {
    Mask(u32),
    Set(HashSet<u32, FxBuildHasher>),
}

impl LayerSet {
    /// Build membership from declared identifiers, ignoring unknown ones.
    pub fn build(table: &LayerTable, ids: &[String]) -> Self {
        if table.fits_mask() {
            let mut mask = 0u32;
            for id in ids {
                if let Some(layer) = table.get(id) {
                    mask |= 1 << layer;
                }
            }
            LayerSet::Mask(mask)
        } else {
            let mut set = HashSet::with_hasher(FxBuildHasher::default());
            for id in ids {
                if let Some(layer) = table.get(id) {
                    set.insert(layer);
                }
            }
            LayerSet::Set(set)
        }
    }

    pub fn contains(&self, layer: u32) -> bool {
        match self {
            LayerSet::Mask(mask) => mask & (1 << layer) != 0,
            LayerSet::Set(set) => set.contains(&layer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;

    #[test]
    fn first_appearance_indexing() {
        let ids = ["signal", "power", "signal", "ground"];
        let table = LayerTable::from_segment_layers(ids.iter().copied());
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("signal"), Some(0));
        assert_eq!(table.get("power"), Some(1));
        assert_eq!(table.get("ground"), Some(2));
        assert_eq!(table.get("absent"), None);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let table = LayerTable::from_segment_layers(["a", "b"].iter().copied());
        let set = LayerSet::build(&table, &["a".to_string(), "zzz".to_string()]);
        assert!(set.contains(0));
        assert!(!set.contains(1));
    }

    #[test]
    fn mask_and_set_agree() {
        // 40 layers forces the set encoding; rebuild a small slice of the
        // universe with the mask encoding and compare decisions.
        let many: Vec<String> = (0..40).map(|i| format!("l{i}")).collect();
        let big = LayerTable::from_segment_layers(many.iter().map(|s| s.as_str()));
        assert!(!big.fits_mask());
        let small = LayerTable::from_segment_layers(["l0", "l1", "l2"].iter().copied());
        assert!(small.fits_mask());

        let member = vec!["l0".to_string(), "l2".to_string()];
        let as_set = LayerSet::build(&big, &member);
        let as_mask = LayerSet::build(&small, &member);
        for layer in 0..3 {
            assert_eq!(as_set.contains(layer), as_mask.contains(layer));
        }
        assert!(matches!(as_set, LayerSet::Set(_)));
        assert!(matches!(as_mask, LayerSet::Mask(_)));
    }
}
