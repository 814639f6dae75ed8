//! Heir sets: which gene leaves descend from a node.

use crate::model::gene_tree::{GeneIndex, GeneTree};
use crate::model::network::{Network, NodeIndex};

const WORD_BITS: usize = u64::BITS as usize;

/// Fixed-capacity bitset over gene node indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeirSet {
    words: Vec<u64>,
}

impl HeirSet {
    /// Creates an empty set able to hold indices below `capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
        }
    }

    /// Adds `index` to the set.
    #[inline]
    pub fn insert(&mut self, index: usize) {
        self.words[index / WORD_BITS] |= 1u64 << (index % WORD_BITS);
    }

    /// Returns `true` if `index` is in the set.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.words[index / WORD_BITS] & (1u64 << (index % WORD_BITS)) != 0
    }

    /// Adds every element of `other`.
    #[inline]
    pub fn union_with(&mut self, other: &HeirSet) {
        for (word, other_word) in self.words.iter_mut().zip(&other.words) {
            *word |= *other_word;
        }
    }

    /// Returns `true` if every element of `other` is in this set.
    #[inline]
    pub fn is_superset_of(&self, other: &HeirSet) -> bool {
        self.words.iter().zip(&other.words).all(|(word, other_word)| other_word & !word == 0)
    }

    /// Removes all elements.
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|word| *word = 0);
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }
}

/// Gene leaves below each gene node, indexed by gene node.
pub fn gene_tree_heirs(gene_tree: &GeneTree) -> Vec<HeirSet> {
    let capacity = gene_tree.num_nodes();
    let mut heirs = vec![HeirSet::new(capacity); capacity];

    for node in gene_tree.post_order_iter() {
        let index = node.index();
        match node.children() {
            None => heirs[index].insert(index),
            Some((left, right)) => {
                let mut merged = heirs[left].clone();
                merged.union_with(&heirs[right]);
                heirs[index] = merged;
            }
        }
    }

    heirs
}

/// Gene leaves sampled below each network node, indexed by network node.
///
/// # Arguments
/// * `tips` - Every gene leaf paired with the network leaf it was sampled from
pub fn network_heirs(network: &Network, num_gene_nodes: usize, tips: &[(GeneIndex, NodeIndex)]) -> Vec<HeirSet> {
    let mut heirs = vec![HeirSet::new(num_gene_nodes); network.num_nodes()];

    for &(gene_leaf, species) in tips {
        heirs[species].insert(gene_leaf);
    }

    for &index in network.post_order() {
        let node = network.node(index);
        for slot in 0..node.num_children() {
            if let Some(child) = node.child(slot) {
                let below = heirs[child.node].clone();
                heirs[index].union_with(&below);
            }
        }
    }

    heirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_superset() {
        let mut big = HeirSet::new(130);
        let mut small = HeirSet::new(130);
        big.insert(3);
        big.insert(129);
        small.insert(129);
        assert!(big.is_superset_of(&small));
        assert!(!small.is_superset_of(&big));
        assert_eq!(big.len(), 2);

        small.insert(64);
        assert!(!big.is_superset_of(&small));
        big.union_with(&small);
        assert!(big.is_superset_of(&small));
        assert!(big.contains(64));
    }

    #[test]
    fn test_empty_set_is_subset_of_everything() {
        let empty = HeirSet::new(10);
        let other = HeirSet::new(10);
        assert!(other.is_superset_of(&empty));
        assert!(empty.is_empty());
    }
}
