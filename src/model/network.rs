//! Species network representation.
//!
//! - [Network]: arena of [NetworkNode]s with stable branch numbering.
//! - [NodeIndex] indexes nodes, [BranchIndex] indexes branches.
//!
//! Networks are assembled with [NetworkBuilder](crate::model::network_builder::NetworkBuilder)
//! or read from extended Newick with [parse_network](crate::newick::parse_network).

use crate::checkpoint::{Checkpoint, Epoch, EpochClock, Journaled};
use crate::model::network_node::{BranchRef, NetworkNode, Side};
use std::collections::HashMap;
use std::fmt;

/// Index of a node in a network (arena).
pub type NodeIndex = usize;

/// Index of a branch in a network.
pub type BranchIndex = usize;

// =#========================================================================#=
// NETWORK
// =#========================================================================#=
/// A rooted, time-calibrated species network stored in an arena of [NetworkNode]s.
///
/// # Branches
/// Every node except reticulations owns the single branch above it; a reticulation owns
/// two (left and right parent edge). Branch numbers are fixed at construction: non-root
/// nodes are numbered in arena order, the root branch comes last and reaches up to
/// infinity. Thus `branch_count() == num_nodes() + num_reticulations()`.
///
/// # Traversal rows
/// Every non-leaf node has a row in the embedding table of each gene tree,
/// see [Network::traversal_row].
///
/// # Mutation
/// Topology is fixed after construction. Heights and inheritance probabilities are
/// mutable; every mutation advances the network [Epoch] and stamps the touched nodes,
/// and all of it can be rolled back through [Checkpoint].
#[derive(Debug, Clone)]
pub struct Network {
    nodes: Journaled<NetworkNode>,
    root_index: NodeIndex,

    leaf_indices: Vec<NodeIndex>,
    internal_indices: Vec<NodeIndex>,
    reticulation_indices: Vec<NodeIndex>,

    /// First branch number of each node
    branch_offsets: Vec<BranchIndex>,
    /// Inverse of the branch numbering
    branches: Vec<BranchRef>,
    traversal_rows: Vec<Option<usize>>,
    num_traversal_rows: usize,
    /// Every node once, children before parents
    post_order: Vec<NodeIndex>,
    labels: HashMap<String, NodeIndex>,

    clock: EpochClock,
    node_epochs: Journaled<Epoch>,
}

// ============================================================================
// Construction (crate)
// ============================================================================
impl Network {
    /// Wraps fully linked nodes. The builder is responsible for structural validation.
    pub(crate) fn from_linked_nodes(nodes: Vec<NetworkNode>, root_index: NodeIndex) -> Self {
        let num_nodes = nodes.len();

        let mut leaf_indices = Vec::new();
        let mut internal_indices = Vec::new();
        let mut reticulation_indices = Vec::new();
        let mut traversal_rows = vec![None; num_nodes];
        let mut branch_offsets = vec![0; num_nodes];
        let mut branches = Vec::with_capacity(num_nodes + num_nodes / 2);
        let mut labels = HashMap::new();

        for node in &nodes {
            let index = node.index();
            if let Some(label) = node.label() {
                labels.insert(label.to_string(), index);
            }

            if node.is_leaf() {
                leaf_indices.push(index);
            } else {
                traversal_rows[index] = Some(internal_indices.len());
                internal_indices.push(index);
            }
            if node.is_reticulation() {
                reticulation_indices.push(index);
            }

            if index != root_index {
                branch_offsets[index] = branches.len();
                branches.push(BranchRef::new(index, Side::Left));
                if node.is_reticulation() {
                    branches.push(BranchRef::new(index, Side::Right));
                }
            }
        }
        branch_offsets[root_index] = branches.len();
        branches.push(BranchRef::above(root_index));

        let num_traversal_rows = internal_indices.len();
        let post_order = Self::compute_post_order(&nodes, root_index);

        Network {
            nodes: Journaled::new(nodes),
            root_index,
            leaf_indices,
            internal_indices,
            reticulation_indices,
            branch_offsets,
            branches,
            traversal_rows,
            num_traversal_rows,
            post_order,
            labels,
            clock: EpochClock::new(),
            node_epochs: Journaled::filled(Epoch::INITIAL, num_nodes),
        }
    }

    fn compute_post_order(nodes: &[NetworkNode], root_index: NodeIndex) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(nodes.len());
        let mut visited = vec![false; nodes.len()];
        let mut stack = vec![(root_index, false)];

        while let Some((index, children_visited)) = stack.pop() {
            if children_visited {
                order.push(index);
                continue;
            }
            if visited[index] {
                continue;
            }
            visited[index] = true;
            stack.push((index, true));

            let node = &nodes[index];
            for slot in (0..node.num_children()).rev() {
                if let Some(child) = node.child(slot) {
                    if !visited[child.node] {
                        stack.push((child.node, false));
                    }
                }
            }
        }

        order
    }
}

// ============================================================================
// Getters / Accessors (pub)
// ============================================================================
impl Network {
    /// Returns the root node.
    pub fn root(&self) -> &NetworkNode {
        &self.nodes[self.root_index]
    }

    /// Returns the arena index of the root.
    pub fn root_index(&self) -> NodeIndex {
        self.root_index
    }

    /// Returns the node at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn node(&self, index: NodeIndex) -> &NetworkNode {
        &self.nodes[index]
    }

    /// Returns the height of node `index`.
    #[inline]
    pub fn height(&self, index: NodeIndex) -> f64 {
        self.nodes[index].height()
    }

    /// Returns the number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of leaves.
    pub fn num_leaves(&self) -> usize {
        self.leaf_indices.len()
    }

    /// Returns the number of reticulation nodes.
    pub fn num_reticulations(&self) -> usize {
        self.reticulation_indices.len()
    }

    /// Returns an iterator over all nodes in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = &NetworkNode> {
        self.nodes.iter()
    }

    /// Returns an iterator over the leaves in arena order.
    pub fn leaf_nodes(&self) -> impl Iterator<Item = &NetworkNode> {
        self.leaf_indices.iter().map(|&i| &self.nodes[i])
    }

    /// Returns an iterator over all non-leaf nodes (speciations, reticulations and root).
    pub fn internal_nodes(&self) -> impl Iterator<Item = &NetworkNode> {
        self.internal_indices.iter().map(|&i| &self.nodes[i])
    }

    /// Returns an iterator over the reticulation nodes.
    pub fn reticulation_nodes(&self) -> impl Iterator<Item = &NetworkNode> {
        self.reticulation_indices.iter().map(|&i| &self.nodes[i])
    }

    /// Returns the arena indices of the leaves.
    pub fn leaf_indices(&self) -> &[NodeIndex] {
        &self.leaf_indices
    }

    /// Returns the index of the node carrying `label`, if any.
    pub fn node_by_label(&self, label: &str) -> Option<NodeIndex> {
        self.labels.get(label).copied()
    }

    /// Returns all nodes once each, children before parents.
    pub fn post_order(&self) -> &[NodeIndex] {
        &self.post_order
    }

    /// Returns the parent reached from `branch.node` along `branch.side`,
    /// or `None` for the root branch.
    #[inline]
    pub fn parent_of(&self, branch: BranchRef) -> Option<NodeIndex> {
        self.nodes[branch.node].parent(branch.side)
    }

    /// Returns the child edge of `node` in traversal slot `slot`.
    #[inline]
    pub fn child_branch(&self, node: NodeIndex, slot: usize) -> Option<BranchRef> {
        self.nodes[node].child(slot)
    }

    /// Returns the embedding-table row of a non-leaf node, `None` for leaves.
    #[inline]
    pub fn traversal_row(&self, node: NodeIndex) -> Option<usize> {
        self.traversal_rows[node]
    }

    /// Returns the number of embedding-table rows, i.e. the number of non-leaf nodes.
    pub fn num_traversal_rows(&self) -> usize {
        self.num_traversal_rows
    }
}

// ============================================================================
// Branches (pub)
// ============================================================================
impl Network {
    /// Returns the total number of branches, including the root branch.
    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// Returns the number of the root branch (always the last).
    pub fn root_branch(&self) -> BranchIndex {
        self.branches.len() - 1
    }

    /// Returns the number of a branch.
    #[inline]
    pub fn branch_index(&self, branch: BranchRef) -> BranchIndex {
        self.branch_offsets[branch.node] + branch.side.offset()
    }

    /// Returns the branch with number `index`.
    #[inline]
    pub fn branch(&self, index: BranchIndex) -> BranchRef {
        self.branches[index]
    }

    /// Returns the height of the tipward end of a branch.
    #[inline]
    pub fn branch_bottom(&self, index: BranchIndex) -> f64 {
        self.nodes[self.branches[index].node].height()
    }

    /// Returns the height of the rootward end of a branch; infinite for the root branch.
    #[inline]
    pub fn branch_top(&self, index: BranchIndex) -> f64 {
        match self.parent_of(self.branches[index]) {
            Some(parent) => self.nodes[parent].height(),
            None => f64::INFINITY,
        }
    }

    /// Returns the inheritance probability of a branch: γ or `1 - γ` for reticulation
    /// edges, `1` otherwise.
    pub fn inheritance_probability(&self, index: BranchIndex) -> f64 {
        let branch = self.branches[index];
        match (self.nodes[branch.node].gamma(), branch.side) {
            (Some(gamma), Side::Left) => gamma,
            (Some(gamma), Side::Right) => 1.0 - gamma,
            (None, _) => 1.0,
        }
    }

    /// Returns the sum of all branch durations, excluding the root branch.
    pub fn network_length(&self) -> f64 {
        (0..self.root_branch())
            .map(|b| self.branch_top(b) - self.branch_bottom(b))
            .sum()
    }

    /// Returns the number of branches alive at `time`, i.e. with `bottom <= time < top`.
    pub fn branch_count_at(&self, time: f64) -> usize {
        (0..self.branch_count())
            .filter(|&b| self.branch_bottom(b) <= time && time < self.branch_top(b))
            .count()
    }
}

// ============================================================================
// Mutation & Versioning (pub)
// ============================================================================
impl Network {
    /// Returns the epoch of the current network state.
    pub fn epoch(&self) -> Epoch {
        self.clock.current()
    }

    /// Returns the epoch at which node `index` or the top of one of its branches last moved.
    pub fn node_epoch(&self, index: NodeIndex) -> Epoch {
        self.node_epochs[index]
    }

    /// Moves node `index` to `height`.
    ///
    /// Stamps the node and its children with a new epoch, since the children's
    /// branches change length as well. Validity of the new height is the caller's
    /// responsibility, see [Network::check_invariants].
    pub fn set_height(&mut self, index: NodeIndex, height: f64) {
        debug_assert!(height.is_finite() && height >= 0.0, "Invalid height {height}");

        let epoch = self.clock.advance();
        self.nodes.get_mut(index).set_height(height);
        self.node_epochs.set(index, epoch);

        for slot in 0..self.nodes[index].num_children() {
            if let Some(child) = self.nodes[index].child(slot) {
                self.node_epochs.set(child.node, epoch);
            }
        }
    }

    /// Sets the inheritance probability of the left parent edge of reticulation `index`.
    ///
    /// # Panics
    /// Panics if `index` is not a reticulation node.
    pub fn set_gamma(&mut self, index: NodeIndex, value: f64) {
        debug_assert!(value > 0.0 && value < 1.0, "Inheritance probability {value} not in (0,1)");

        let epoch = self.clock.advance();
        match self.nodes.get_mut(index) {
            NetworkNode::Reticulation { gamma, .. } => *gamma = value,
            other => panic!("Node {} is not a reticulation", other.index()),
        }
        self.node_epochs.set(index, epoch);
    }

    /// Multiplies the height of every non-leaf node by `factor`.
    ///
    /// # Returns
    /// The number of scaled nodes.
    pub fn scale(&mut self, factor: f64) -> usize {
        debug_assert!(factor > 0.0 && factor.is_finite());

        let epoch = self.clock.advance();
        for position in 0..self.internal_indices.len() {
            let index = self.internal_indices[position];
            let height = self.nodes[index].height();
            self.nodes.get_mut(index).set_height(height * factor);
        }
        for index in 0..self.nodes.len() {
            self.node_epochs.set(index, epoch);
        }

        self.internal_indices.len()
    }

    /// Recursively checks the network below `index`.
    ///
    /// Checks, for every reachable node:
    /// - the arena index matches its position
    /// - every child edge points back to this node through the referenced side
    /// - every child is strictly lower than its parent and no height is negative or non-finite
    /// - reticulation edges carry a probability in `(0, 1)`
    ///
    /// # Returns
    /// `true` if all checks pass, `false` otherwise
    pub fn check_invariants(&self, index: NodeIndex) -> bool {
        let node = &self.nodes[index];
        let height = node.height();

        if node.index() != index || !height.is_finite() || height < 0.0 {
            return false;
        }
        if let Some(gamma) = node.gamma() {
            if !(gamma > 0.0 && gamma < 1.0) {
                return false;
            }
        }

        for child in node.children() {
            if child.node >= self.nodes.len() {
                return false;
            }
            if self.parent_of(child) != Some(index) {
                return false;
            }
            if self.nodes[child.node].height() >= height {
                return false;
            }
            if !self.check_invariants(child.node) {
                return false;
            }
        }

        true
    }

    /// Returns `true` if the root satisfies [Network::check_invariants]
    /// and every node is reachable from it.
    pub fn is_valid(&self) -> bool {
        self.root().is_root()
            && self.post_order.len() == self.nodes.len()
            && self.check_invariants(self.root_index)
    }
}

impl Checkpoint for Network {
    fn store(&mut self) {
        self.nodes.store();
        self.node_epochs.store();
        self.clock.store();
    }

    fn restore(&mut self) {
        self.nodes.restore();
        self.node_epochs.restore();
        self.clock.restore();
    }
}

impl std::ops::Index<NodeIndex> for Network {
    type Output = NetworkNode;

    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index]
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "Network with {} leaves, {} reticulations ({} nodes, {} branches):",
            self.num_leaves(),
            self.num_reticulations(),
            self.num_nodes(),
            self.branch_count()
        )?;
        for node in self.nodes.iter() {
            let kind = match node {
                NetworkNode::Leaf { .. } => "Leaf",
                NetworkNode::Speciation { parent: None, .. } => "Root",
                NetworkNode::Speciation { .. } => "Speciation",
                NetworkNode::Reticulation { .. } => "Reticulation",
            };
            write!(f, "  [{}] {} height {:.4}", node.index(), kind, node.height())?;
            if let Some(label) = node.label() {
                write!(f, " \"{label}\"")?;
            }
            if let Some(gamma) = node.gamma() {
                write!(f, " gamma {gamma:.4}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
