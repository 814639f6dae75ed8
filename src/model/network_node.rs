//! Node and branch addressing types of a species network.

use crate::model::network::NodeIndex;

// =#========================================================================#=
// SIDE & BRANCH REFERENCE
// =#========================================================================#=
/// Which of the (at most two) parent edges of a node a branch is.
///
/// Nodes with a single parent only have a [Side::Left] branch. Reticulation nodes
/// have both: the left branch carries inheritance probability γ, the right one `1 - γ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Returns `0` for [Side::Left] and `1` for [Side::Right].
    pub fn offset(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

/// A branch of the network, named by its tipward node and the parent edge taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BranchRef {
    /// Tipward end of the branch
    pub node: NodeIndex,
    /// Parent edge of `node` this branch runs along
    pub side: Side,
}

impl BranchRef {
    /// Creates a branch reference.
    pub fn new(node: NodeIndex, side: Side) -> Self {
        Self { node, side }
    }

    /// Reference to the only branch above a node with a single parent.
    pub fn above(node: NodeIndex) -> Self {
        Self { node, side: Side::Left }
    }
}

// =#========================================================================#=
// NETWORK NODE
// =#========================================================================#=
/// A node of a species network.
///
/// - **Leaf**: an extant species; one parent, no children
/// - **Speciation**: two children and one parent, or no parent for the root
/// - **Reticulation**: a hybridization; one child and two parents
///
/// # Invariants
/// - `index` is the position in the network arena
/// - `height` is finite and non-negative, and strictly below the height of every parent
/// - children are referenced through the [BranchRef] of the child edge,
///   so a child with two parents knows which of its edges leads here
/// - `gamma` of a reticulation lies in `(0, 1)` and belongs to the left parent edge
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkNode {
    /// Extant species
    Leaf {
        index: NodeIndex,
        label: String,
        height: f64,
        parent: NodeIndex,
    },
    /// Bifurcation; the root is the unique speciation node without parent
    Speciation {
        index: NodeIndex,
        label: Option<String>,
        height: f64,
        parent: Option<NodeIndex>,
        children: (BranchRef, BranchRef),
    },
    /// Hybridization
    Reticulation {
        index: NodeIndex,
        label: Option<String>,
        height: f64,
        gamma: f64,
        parents: (NodeIndex, NodeIndex),
        child: BranchRef,
    },
}

impl NetworkNode {
    /// Returns the index of this node in the network arena.
    pub fn index(&self) -> NodeIndex {
        match self {
            NetworkNode::Leaf { index, .. }
            | NetworkNode::Speciation { index, .. }
            | NetworkNode::Reticulation { index, .. } => *index,
        }
    }

    /// Returns the height (time before present) of this node.
    #[inline]
    pub fn height(&self) -> f64 {
        match self {
            NetworkNode::Leaf { height, .. }
            | NetworkNode::Speciation { height, .. }
            | NetworkNode::Reticulation { height, .. } => *height,
        }
    }

    pub(crate) fn set_height(&mut self, new_height: f64) {
        match self {
            NetworkNode::Leaf { height, .. }
            | NetworkNode::Speciation { height, .. }
            | NetworkNode::Reticulation { height, .. } => *height = new_height,
        }
    }

    /// Returns the label, if any. Leaves always have one.
    pub fn label(&self) -> Option<&str> {
        match self {
            NetworkNode::Leaf { label, .. } => Some(label),
            NetworkNode::Speciation { label, .. } | NetworkNode::Reticulation { label, .. } => {
                label.as_deref()
            }
        }
    }

    /// Returns the inheritance probability of the left parent edge for reticulations.
    pub fn gamma(&self) -> Option<f64> {
        match self {
            NetworkNode::Reticulation { gamma, .. } => Some(*gamma),
            _ => None,
        }
    }

    /// Returns `true` if this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, NetworkNode::Leaf { .. })
    }

    /// Returns `true` if this node is a reticulation.
    pub fn is_reticulation(&self) -> bool {
        matches!(self, NetworkNode::Reticulation { .. })
    }

    /// Returns `true` if this node is a speciation node, including the root.
    pub fn is_speciation(&self) -> bool {
        matches!(self, NetworkNode::Speciation { .. })
    }

    /// Returns `true` if this node has no parent.
    pub fn is_root(&self) -> bool {
        matches!(self, NetworkNode::Speciation { parent: None, .. })
    }

    /// Returns the number of child edges (0, 1 or 2).
    pub fn num_children(&self) -> usize {
        match self {
            NetworkNode::Leaf { .. } => 0,
            NetworkNode::Speciation { .. } => 2,
            NetworkNode::Reticulation { .. } => 1,
        }
    }

    /// Returns the child edge in traversal slot `slot` (0 = left, 1 = right).
    pub fn child(&self, slot: usize) -> Option<BranchRef> {
        match (self, slot) {
            (NetworkNode::Speciation { children, .. }, 0) => Some(children.0),
            (NetworkNode::Speciation { children, .. }, 1) => Some(children.1),
            (NetworkNode::Reticulation { child, .. }, 0) => Some(*child),
            _ => None,
        }
    }

    /// Returns an iterator over the child edges in slot order.
    pub fn children(&self) -> impl Iterator<Item = BranchRef> + '_ {
        (0..self.num_children()).filter_map(move |slot| self.child(slot))
    }

    /// Returns the parent reached through the given parent edge, if there is one.
    pub fn parent(&self, side: Side) -> Option<NodeIndex> {
        match (self, side) {
            (NetworkNode::Leaf { parent, .. }, Side::Left) => Some(*parent),
            (NetworkNode::Speciation { parent, .. }, Side::Left) => *parent,
            (NetworkNode::Reticulation { parents, .. }, Side::Left) => Some(parents.0),
            (NetworkNode::Reticulation { parents, .. }, Side::Right) => Some(parents.1),
            _ => None,
        }
    }

    /// Returns the number of parent edges (0, 1 or 2).
    pub fn num_parents(&self) -> usize {
        match self {
            NetworkNode::Speciation { parent: None, .. } => 0,
            NetworkNode::Reticulation { .. } => 2,
            _ => 1,
        }
    }
}
