//! Node type of a gene tree.

use crate::model::gene_tree::GeneIndex;
use crate::model::taxon_map::LabelIndex;

/// During construction, internal nodes and leaves might not have a parent yet.
pub(crate) const NO_PARENT_SET: GeneIndex = usize::MAX;

// =#========================================================================#=
// GENE NODE
// =#========================================================================#=
/// Topology of a node in a binary gene tree. Heights live in the tree, since they
/// change during sampling while topology does not.
///
/// - **Root**: two children, no parent
/// - **Internal**: two children and a parent
/// - **Leaf**: a sampled gene copy; label (via index into a shared
///   [TaxonMap](crate::model::taxon_map::TaxonMap)) and parent
#[derive(PartialEq, Debug, Clone)]
pub enum GeneNode {
    Root {
        index: GeneIndex,
        children: (GeneIndex, GeneIndex),
    },
    Internal {
        index: GeneIndex,
        parent: GeneIndex,
        children: (GeneIndex, GeneIndex),
    },
    Leaf {
        index: GeneIndex,
        label_index: LabelIndex,
        parent: GeneIndex,
    },
}

impl GeneNode {
    pub(crate) fn new_root(index: GeneIndex, children: (GeneIndex, GeneIndex)) -> Self {
        GeneNode::Root { index, children }
    }

    pub(crate) fn new_internal(index: GeneIndex, children: (GeneIndex, GeneIndex)) -> Self {
        GeneNode::Internal {
            index,
            parent: NO_PARENT_SET,
            children,
        }
    }

    pub(crate) fn new_leaf(index: GeneIndex, label_index: LabelIndex) -> Self {
        GeneNode::Leaf {
            index,
            label_index,
            parent: NO_PARENT_SET,
        }
    }

    /// Returns the index of this node.
    pub fn index(&self) -> GeneIndex {
        match self {
            GeneNode::Root { index, .. }
            | GeneNode::Internal { index, .. }
            | GeneNode::Leaf { index, .. } => *index,
        }
    }

    /// Returns the label index if this is a leaf, else `None`.
    pub fn label_index(&self) -> Option<LabelIndex> {
        match self {
            GeneNode::Leaf { label_index, .. } => Some(*label_index),
            _ => None,
        }
    }

    /// Returns `true` if this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, GeneNode::Leaf { .. })
    }

    /// Returns `true` if this node is internal (neither root nor leaf).
    pub fn is_internal(&self) -> bool {
        matches!(self, GeneNode::Internal { .. })
    }

    /// Returns `true` if this node is the root.
    pub fn is_root(&self) -> bool {
        matches!(self, GeneNode::Root { .. })
    }

    /// Returns the children, or `None` for a leaf.
    #[inline]
    pub fn children(&self) -> Option<(GeneIndex, GeneIndex)> {
        match self {
            GeneNode::Root { children, .. } | GeneNode::Internal { children, .. } => Some(*children),
            GeneNode::Leaf { .. } => None,
        }
    }

    /// Returns the parent, or `None` for the root and for nodes not yet attached.
    #[inline]
    pub fn parent_index(&self) -> Option<GeneIndex> {
        match self {
            GeneNode::Internal { parent, .. } | GeneNode::Leaf { parent, .. } => {
                if *parent == NO_PARENT_SET {
                    None
                } else {
                    Some(*parent)
                }
            }
            GeneNode::Root { .. } => None,
        }
    }

    /// Sets the parent of a non-root node.
    ///
    /// # Panics
    /// Panics if called on the root.
    pub(crate) fn set_parent(&mut self, parent: GeneIndex) {
        match self {
            GeneNode::Root { .. } => panic!("Cannot set parent on root node"),
            GeneNode::Internal { parent: p, .. } | GeneNode::Leaf { parent: p, .. } => *p = parent,
        }
    }
}
