//! Embedding table of one gene tree in a network.

use crate::checkpoint::{Checkpoint, Epoch, EpochClock, Journaled};
use crate::model::gene_tree::{GeneIndex, GeneTree};
use crate::model::network::{Network, NodeIndex};

/// Child slot of a network node taken by a gene lineage passing through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Traversal {
    /// The lineage does not pass through the node
    Unset,
    /// Slot 0: left child of a speciation node, or the only child of a reticulation
    Left,
    /// Slot 1: right child of a speciation node
    Right,
}

impl Traversal {
    /// Traversal through child slot `slot`.
    pub fn from_slot(slot: usize) -> Self {
        match slot {
            0 => Traversal::Left,
            1 => Traversal::Right,
            _ => Traversal::Unset,
        }
    }

    /// Returns the child slot, or `None` if unset.
    pub fn slot(self) -> Option<usize> {
        match self {
            Traversal::Unset => None,
            Traversal::Left => Some(0),
            Traversal::Right => Some(1),
        }
    }

    /// Integer encoding: `-1` unset, `0` left, `1` right.
    pub fn as_i8(self) -> i8 {
        match self {
            Traversal::Unset => -1,
            Traversal::Left => 0,
            Traversal::Right => 1,
        }
    }
}

// =#========================================================================#=
// EMBEDDING TABLE
// =#========================================================================#=
/// For every non-leaf network node and every gene node, the child slot taken by the
/// lineage of that gene node when it passes the network node going tipward.
///
/// Rows are the network's traversal rows (see [Network::traversal_row]), columns
/// are gene node indices. The table fully determines where each gene lineage runs
/// through the reticulations of the network.
#[derive(Debug, Clone)]
pub struct EmbeddingTable {
    row_of: Vec<Option<usize>>,
    num_columns: usize,
    values: Journaled<Traversal>,
    clock: EpochClock,
}

impl EmbeddingTable {
    /// Creates an all-[Traversal::Unset] table sized for `network` and `gene_tree`.
    pub fn new(network: &Network, gene_tree: &GeneTree) -> Self {
        let row_of = (0..network.num_nodes()).map(|i| network.traversal_row(i)).collect();
        let num_columns = gene_tree.num_nodes();
        Self {
            row_of,
            num_columns,
            values: Journaled::filled(Traversal::Unset, network.num_traversal_rows() * num_columns),
            clock: EpochClock::new(),
        }
    }

    /// Returns the number of rows (non-leaf network nodes).
    pub fn num_rows(&self) -> usize {
        self.values.len() / self.num_columns.max(1)
    }

    /// Returns the number of columns (gene nodes).
    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    /// Returns the traversal of `gene` through `node`; leaves are always unset.
    #[inline]
    pub fn get(&self, node: NodeIndex, gene: GeneIndex) -> Traversal {
        match self.row_of[node] {
            Some(row) => self.values[row * self.num_columns + gene],
            None => Traversal::Unset,
        }
    }

    /// Records the traversal of `gene` through non-leaf `node`.
    ///
    /// # Panics
    /// Panics if `node` is a leaf.
    pub fn set(&mut self, node: NodeIndex, gene: GeneIndex, traversal: Traversal) {
        let row = self.row_of[node].unwrap_or_else(|| panic!("Network leaf {node} has no embedding row"));
        let position = row * self.num_columns + gene;
        if self.values[position] != traversal {
            self.values.set(position, traversal);
            self.clock.advance();
        }
    }

    /// Resets every entry to [Traversal::Unset].
    pub fn clear(&mut self) {
        let mut changed = false;
        for position in 0..self.values.len() {
            if self.values[position] != Traversal::Unset {
                self.values.set(position, Traversal::Unset);
                changed = true;
            }
        }
        if changed {
            self.clock.advance();
        }
    }

    /// Returns the epoch of the current table contents.
    pub fn epoch(&self) -> Epoch {
        self.clock.current()
    }
}

impl Checkpoint for EmbeddingTable {
    fn store(&mut self) {
        self.values.store();
        self.clock.store();
    }

    fn restore(&mut self) {
        self.values.restore();
        self.clock.restore();
    }
}
