//! Gene tree representation.
//!
//! - [GeneTree]: binary, time-calibrated tree of sampled gene copies, stored as an arena
//!   of [GeneNode]s with journaled heights.
//! - [GeneIndex] is used to index nodes.

use crate::checkpoint::{Checkpoint, Epoch, EpochClock, Journaled};
use crate::model::gene_node::GeneNode;
use crate::model::taxon_map::LabelIndex;

/// Index of a node in a gene tree (arena).
pub type GeneIndex = usize;

/// *During construction only*, index for unset root.
const NO_ROOT_SET_INDEX: GeneIndex = usize::MAX;

// =#========================================================================#=
// GENE TREE
// =#========================================================================#=
/// A binary gene tree with node heights, using the arena pattern on [GeneNode].
///
/// # Structure
/// - All nodes (root, internal, and leaves) are stored in the arena; no assumption on
///   the order of indices is made
/// - Leaves reference their label by [LabelIndex] in a shared
///   [TaxonMap](crate::model::taxon_map::TaxonMap)
/// - Heights are measured backwards from the present; a parent is never below its children
///
/// # Construction
/// Specify the number of leaves, then add nodes bottom-up. Test validity with
/// [GeneTree::is_valid].
///
/// # Example
/// ```
/// use reticulate::model::gene_tree::GeneTree;
/// use reticulate::model::taxon_map::TaxonMap;
///
/// // ((a1:0.5,a2:0.5):1.0,b1:1.5);
/// let mut taxa = TaxonMap::new(3);
/// let mut tree = GeneTree::new(3);
/// let a1 = tree.add_leaf(0.0, taxa.get_or_insert("a1"));
/// let a2 = tree.add_leaf(0.0, taxa.get_or_insert("a2"));
/// let b1 = tree.add_leaf(0.0, taxa.get_or_insert("b1"));
/// let internal = tree.add_internal_node((a1, a2), 0.5);
/// tree.add_root((internal, b1), 1.5);
///
/// assert!(tree.is_valid());
/// assert_eq!(tree.tree_height(), 1.5);
/// ```
#[derive(Debug, Clone)]
pub struct GeneTree {
    num_leaves_init: usize,
    nodes: Vec<GeneNode>,
    heights: Journaled<f64>,
    root_index: GeneIndex,
    name: Option<String>,
    clock: EpochClock,
}

// ============================================================================
// New, Construction (pub)
// ============================================================================
impl GeneTree {
    /// Creates a new gene tree with capacity for `num_leaves` leaves.
    ///
    /// # Arguments
    /// `num_leaves` - number of leaves of the new binary tree; must be at least two
    ///
    /// # Panics
    /// Panics if `num_leaves < 2`. The Newick reader checks this and returns
    /// [ModelError::InvalidGeneTree](crate::ModelError::InvalidGeneTree) instead.
    pub fn new(num_leaves: usize) -> Self {
        assert!(num_leaves > 1, "A gene tree needs at least two leaves");
        let capacity = 2 * num_leaves - 1;
        GeneTree {
            num_leaves_init: num_leaves,
            nodes: Vec::with_capacity(capacity),
            heights: Journaled::new(Vec::with_capacity(capacity)),
            root_index: NO_ROOT_SET_INDEX,
            name: None,
            clock: EpochClock::new(),
        }
    }

    /// Attaches a name to this tree.
    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    /// Adds a leaf, assigning a unique index, which gets returned.
    ///
    /// # Arguments
    /// * `height` - Sampling time of the gene copy, usually `0.0`
    /// * `label_index` - Index of the leaf's label in the shared taxon map
    pub fn add_leaf(&mut self, height: f64, label_index: LabelIndex) -> GeneIndex {
        let index = self.nodes.len();
        self.nodes.push(GeneNode::new_leaf(index, label_index));
        self.heights.push(height);
        index
    }

    /// Adds an internal node above `children`, assigning a unique index, which gets returned.
    ///
    /// # Panics
    /// Panics if a child index does not exist or the child is the root.
    pub fn add_internal_node(&mut self, children: (GeneIndex, GeneIndex), height: f64) -> GeneIndex {
        let index = self.nodes.len();
        self.nodes.push(GeneNode::new_internal(index, children));
        self.heights.push(height);

        self.nodes[children.0].set_parent(index);
        self.nodes[children.1].set_parent(index);

        index
    }

    /// Adds the root above `children`, assigning a unique index, which gets returned.
    ///
    /// # Panics
    /// Panics if a child index does not exist or the child is the root.
    pub fn add_root(&mut self, children: (GeneIndex, GeneIndex), height: f64) -> GeneIndex {
        let index = self.nodes.len();
        self.nodes.push(GeneNode::new_root(index, children));
        self.heights.push(height);

        self.root_index = index;
        self.nodes[children.0].set_parent(index);
        self.nodes[children.1].set_parent(index);

        index
    }

    /// Validates the tree structure, all index references and heights.
    ///
    /// Checks:
    /// - Root index is set and points to the only Root node
    /// - All node indices match their position in the arena
    /// - There are exactly the announced number of leaves
    /// - Children point back to their parent and parents list their children
    /// - Heights are finite, non-negative and no child is above its parent
    ///
    /// # Returns
    /// `true` if tree is valid, `false` otherwise
    pub fn is_valid(&self) -> bool {
        if self.root_index == NO_ROOT_SET_INDEX || self.root_index >= self.nodes.len() {
            return false;
        }
        if !self.nodes[self.root_index].is_root() {
            return false;
        }

        let mut leaf_count = 0;
        for (index, node) in self.nodes.iter().enumerate() {
            if node.index() != index {
                return false;
            }
            if node.is_root() && index != self.root_index {
                return false;
            }

            let height = self.heights[index];
            if !height.is_finite() || height < 0.0 {
                return false;
            }

            match node.children() {
                Some((left, right)) => {
                    if left >= self.nodes.len() || right >= self.nodes.len() || left == right {
                        return false;
                    }
                    for child in [left, right] {
                        if self.nodes[child].parent_index() != Some(index) {
                            return false;
                        }
                        if self.heights[child] > height {
                            return false;
                        }
                    }
                }
                None => leaf_count += 1,
            }

            if !node.is_root() {
                match node.parent_index() {
                    None => return false,
                    Some(parent) => {
                        if parent >= self.nodes.len() {
                            return false;
                        }
                        match self.nodes[parent].children() {
                            Some((left, right)) if left == index || right == index => {}
                            _ => return false,
                        }
                    }
                }
            }
        }

        leaf_count == self.num_leaves_init
    }
}

// ============================================================================
// Getters / Accessors (pub)
// ============================================================================
impl GeneTree {
    /// Returns reference to name of this tree, or `None` if not set.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns whether the root has been set.
    pub fn is_root_set(&self) -> bool {
        self.root_index != NO_ROOT_SET_INDEX
    }

    /// Returns the root node.
    ///
    /// # Panics
    /// Panics if the root hasn't been set yet.
    pub fn root(&self) -> &GeneNode {
        &self.nodes[self.root_index]
    }

    /// Returns the arena index of the root.
    pub fn root_index(&self) -> GeneIndex {
        self.root_index
    }

    /// Returns the node at `index`.
    pub fn node(&self, index: GeneIndex) -> &GeneNode {
        &self.nodes[index]
    }

    /// Returns the height of node `index`.
    #[inline]
    pub fn height(&self, index: GeneIndex) -> f64 {
        self.heights[index]
    }

    /// Returns the parent of node `index`, or `None` for the root.
    #[inline]
    pub fn parent_of(&self, index: GeneIndex) -> Option<GeneIndex> {
        self.nodes[index].parent_index()
    }

    /// Returns the children of node `index`, or `None` for a leaf.
    #[inline]
    pub fn children_of(&self, index: GeneIndex) -> Option<(GeneIndex, GeneIndex)> {
        self.nodes[index].children()
    }

    /// Returns the number of leaves this tree was initialized to hold.
    pub fn num_leaves(&self) -> usize {
        self.num_leaves_init
    }

    /// Returns the number of nodes in this tree.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns an iterator over the indices of all leaves.
    pub fn leaf_indices(&self) -> impl Iterator<Item = GeneIndex> + '_ {
        self.nodes.iter().filter(|n| n.is_leaf()).map(|n| n.index())
    }

    /// Returns the height of the root.
    pub fn tree_height(&self) -> f64 {
        self.heights[self.root_index]
    }

    /// Returns the sum of all branch durations.
    pub fn total_length(&self) -> f64 {
        self.nodes
            .iter()
            .filter_map(|n| n.parent_index().map(|p| self.heights[p] - self.heights[n.index()]))
            .sum()
    }

    /// Returns the epoch of the current state of this tree.
    pub fn epoch(&self) -> Epoch {
        self.clock.current()
    }

    /// Returns an iterator over the tree in post-order (children before parents).
    pub fn post_order_iter(&self) -> PostOrderIter<'_> {
        PostOrderIter::new(self)
    }

    /// Returns an iterator over the tree in pre-order (parents before children).
    pub fn pre_order_iter(&self) -> PreOrderIter<'_> {
        PreOrderIter::new(self)
    }
}

// ============================================================================
// Mutation (pub)
// ============================================================================
impl GeneTree {
    /// Moves node `index` to `height` and advances the epoch of this tree.
    pub fn set_height(&mut self, index: GeneIndex, height: f64) {
        debug_assert!(height.is_finite() && height >= 0.0, "Invalid height {height}");
        self.heights.set(index, height);
        self.clock.advance();
    }

    /// Multiplies the height of every non-leaf node by `factor`.
    ///
    /// # Returns
    /// The number of scaled nodes.
    pub fn scale(&mut self, factor: f64) -> usize {
        let mut count = 0;
        for index in 0..self.nodes.len() {
            if !self.nodes[index].is_leaf() {
                let height = self.heights[index];
                self.heights.set(index, height * factor);
                count += 1;
            }
        }
        self.clock.advance();
        count
    }
}

impl Checkpoint for GeneTree {
    fn store(&mut self) {
        self.heights.store();
        self.clock.store();
    }

    fn restore(&mut self) {
        self.heights.restore();
        self.clock.restore();
    }
}

impl std::ops::Index<GeneIndex> for GeneTree {
    type Output = GeneNode;

    fn index(&self, index: GeneIndex) -> &Self::Output {
        &self.nodes[index]
    }
}

// =#========================================================================#=
// ITERATORS
// =#========================================================================#=
/// Iterator for post-order traversal (children before parents).
///
/// Stack-based, each node is visited after all its descendants.
pub struct PostOrderIter<'a> {
    tree: &'a GeneTree,
    stack: Vec<(GeneIndex, bool)>, // (index, children_visited)
}

impl<'a> PostOrderIter<'a> {
    fn new(tree: &'a GeneTree) -> Self {
        let mut stack = Vec::new();
        if tree.is_root_set() {
            stack.push((tree.root_index, false));
        }
        PostOrderIter { tree, stack }
    }
}

impl<'a> Iterator for PostOrderIter<'a> {
    type Item = &'a GeneNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((index, children_visited)) = self.stack.pop() {
            let node = &self.tree.nodes[index];

            match node.children() {
                Some((left, right)) if !children_visited => {
                    self.stack.push((index, true));
                    // Right first, so left is processed first
                    self.stack.push((right, false));
                    self.stack.push((left, false));
                }
                _ => return Some(node),
            }
        }
        None
    }
}

/// Iterator for pre-order traversal (parents before children).
pub struct PreOrderIter<'a> {
    tree: &'a GeneTree,
    stack: Vec<GeneIndex>,
}

impl<'a> PreOrderIter<'a> {
    fn new(tree: &'a GeneTree) -> Self {
        let mut stack = Vec::new();
        if tree.is_root_set() {
            stack.push(tree.root_index);
        }
        PreOrderIter { tree, stack }
    }
}

impl<'a> Iterator for PreOrderIter<'a> {
    type Item = &'a GeneNode;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let node = &self.tree.nodes[index];

        if let Some((left, right)) = node.children() {
            self.stack.push(right);
            self.stack.push(left);
        }

        Some(node)
    }
}
