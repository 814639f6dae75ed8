//! Stochastic reconstruction of gene tree embeddings.
//!
//! A gene lineage that reaches a network node from above has to continue into one of
//! the node's child branches. A child branch is *compatible* if every gene leaf below
//! the lineage was sampled below that branch. With one compatible child the choice is
//! forced; with two (possible only below reticulations) it is made uniformly at random
//! and counted. The number of such choices determines the proposal density
//! `2^-choices` of an embedding, and hence the Hastings ratio of re-embedding.

use crate::embedding::heirs::{gene_tree_heirs, network_heirs, HeirSet};
use crate::embedding::table::{EmbeddingTable, Traversal};
use crate::model::gene_tree::{GeneIndex, GeneTree};
use crate::model::network::{Network, NodeIndex};
use rand::Rng;
use std::f64::consts::LN_2;
use tracing::{debug, trace};

/// Whether a rebuild draws a fresh embedding or only audits the existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildMode {
    /// Follow the table as it is and count the points with two compatible children.
    /// The table is not modified.
    CountOnly,
    /// Draw a new embedding, recording every traversal in the table.
    Commit,
}

/// Log Hastings ratio of replacing an embedding with `old_choices` random choices by one
/// with `new_choices`: `(new - old) * ln 2`.
pub fn hastings_log_ratio(old_choices: usize, new_choices: usize) -> f64 {
    (new_choices as f64 - old_choices as f64) * LN_2
}

// =#========================================================================#=
// EMBEDDING REBUILDER
// =#========================================================================#=
/// Draws and audits embeddings of one gene tree in a network.
///
/// Heir sets depend on topology only, which is fixed for the lifetime of the network
/// and gene tree, so they are computed once at construction.
#[derive(Debug, Clone)]
pub struct EmbeddingRebuilder {
    gene_heirs: Vec<HeirSet>,
    species_heirs: Vec<HeirSet>,
}

impl EmbeddingRebuilder {
    /// Prepares heir sets for embedding `gene_tree` in `network`.
    ///
    /// # Arguments
    /// * `tips` - Every gene leaf paired with the network leaf it was sampled from
    pub fn new(network: &Network, gene_tree: &GeneTree, tips: &[(GeneIndex, NodeIndex)]) -> Self {
        Self {
            gene_heirs: gene_tree_heirs(gene_tree),
            species_heirs: network_heirs(network, gene_tree.num_nodes(), tips),
        }
    }

    /// Rebuilds or audits the embedding in `table`.
    ///
    /// # Returns
    /// * `Some(choices)` - Number of points where both children were compatible
    /// * `None` - No valid embedding (commit) or the table is not a valid embedding (count only).
    ///   A failed commit leaves the table partially written; roll back with
    ///   [Checkpoint::restore](crate::checkpoint::Checkpoint::restore).
    pub fn rebuild_embedding<R: Rng + ?Sized>(
        &self,
        network: &Network,
        gene_tree: &GeneTree,
        table: &mut EmbeddingTable,
        mode: RebuildMode,
        rng: &mut R,
    ) -> Option<usize> {
        match mode {
            RebuildMode::CountOnly => self.count_choices(network, gene_tree, table),
            RebuildMode::Commit => self.rebuild(network, gene_tree, table, rng),
        }
    }

    /// Counts the random choices of the embedding stored in `table`, without modifying it.
    ///
    /// # Returns
    /// `None` if the stored traversals do not form a valid embedding.
    pub fn count_choices(&self, network: &Network, gene_tree: &GeneTree, table: &EmbeddingTable) -> Option<usize> {
        debug_assert!(network.is_valid(), "Network invariants violated");

        let mut choices = 0;
        let walk = Walk { network, gene_tree, rebuilder: self };
        walk.audit(table, gene_tree.root_index(), network.root_index(), &mut choices)
            .then_some(choices)
    }

    /// Draws a new embedding into `table`.
    ///
    /// # Returns
    /// `None` if the gene tree cannot be embedded with the current heights.
    pub fn rebuild<R: Rng + ?Sized>(
        &self,
        network: &Network,
        gene_tree: &GeneTree,
        table: &mut EmbeddingTable,
        rng: &mut R,
    ) -> Option<usize> {
        debug_assert!(network.is_valid(), "Network invariants violated");

        table.clear();
        let mut choices = 0;
        let walk = Walk { network, gene_tree, rebuilder: self };
        let valid = walk.draw(table, rng, gene_tree.root_index(), network.root_index(), &mut choices);

        trace!(valid, choices, "rebuilt embedding");
        valid.then_some(choices)
    }

    /// Replaces the embedding in `table` by a freshly drawn one.
    ///
    /// # Returns
    /// The log Hastings ratio of the move, or negative infinity if no valid embedding
    /// exists (then `table` must be restored by the caller).
    ///
    /// # Panics
    /// Panics if the current table is not a valid embedding of `gene_tree`. Callers
    /// must only propose from an accepted state, so this is an invariant violation;
    /// audit with [EmbeddingRebuilder::count_choices] first when unsure.
    pub fn reembed<R: Rng + ?Sized>(
        &self,
        network: &Network,
        gene_tree: &GeneTree,
        table: &mut EmbeddingTable,
        rng: &mut R,
    ) -> f64 {
        let Some(old_choices) = self.count_choices(network, gene_tree, table) else {
            panic!("Current embedding is not valid");
        };

        match self.rebuild(network, gene_tree, table, rng) {
            Some(new_choices) => hastings_log_ratio(old_choices, new_choices),
            None => {
                debug!("no valid embedding after proposal");
                f64::NEG_INFINITY
            }
        }
    }
}

/// Shared state of one recursive pass.
struct Walk<'a> {
    network: &'a Network,
    gene_tree: &'a GeneTree,
    rebuilder: &'a EmbeddingRebuilder,
}

impl Walk<'_> {
    /// Child slots of `node` whose heirs contain all heirs of `gene`.
    fn compatible_slots(&self, gene: GeneIndex, node: NodeIndex) -> [bool; 2] {
        let required = &self.rebuilder.gene_heirs[gene];
        let mut compatible = [false; 2];
        for (slot, is_compatible) in compatible.iter_mut().enumerate() {
            if let Some(child) = self.network.child_branch(node, slot) {
                *is_compatible = self.rebuilder.species_heirs[child.node].is_superset_of(required);
            }
        }
        compatible
    }

    fn draw<R: Rng + ?Sized>(
        &self,
        table: &mut EmbeddingTable,
        rng: &mut R,
        gene: GeneIndex,
        node: NodeIndex,
        choices: &mut usize,
    ) -> bool {
        if self.gene_tree.height(gene) < self.network.height(node) {
            let slot = match self.compatible_slots(gene, node) {
                [true, true] => {
                    *choices += 1;
                    if rng.gen_bool(0.5) { 0 } else { 1 }
                }
                [true, false] => 0,
                [false, true] => 1,
                [false, false] => return false,
            };
            table.set(node, gene, Traversal::from_slot(slot));

            match self.network.child_branch(node, slot) {
                Some(child) => self.draw(table, rng, gene, child.node, choices),
                None => false,
            }
        } else if let Some((left, right)) = self.gene_tree.children_of(gene) {
            self.draw(table, rng, left, node, choices) && self.draw(table, rng, right, node, choices)
        } else {
            true
        }
    }

    fn audit(&self, table: &EmbeddingTable, gene: GeneIndex, node: NodeIndex, choices: &mut usize) -> bool {
        if self.gene_tree.height(gene) < self.network.height(node) {
            let compatible = self.compatible_slots(gene, node);
            let Some(slot) = table.get(node, gene).slot() else {
                return false;
            };
            if !compatible[slot] {
                return false;
            }
            if compatible == [true, true] {
                *choices += 1;
            }

            match self.network.child_branch(node, slot) {
                Some(child) => self.audit(table, gene, child.node, choices),
                None => false,
            }
        } else if let Some((left, right)) = self.gene_tree.children_of(gene) {
            self.audit(table, left, node, choices) && self.audit(table, right, node, choices)
        } else {
            true
        }
    }
}
