//! Bottom-up construction of a [Network].

use crate::error::ModelError;
use crate::model::network::{Network, NodeIndex};
use crate::model::network_node::{BranchRef, NetworkNode, Side};
use std::collections::HashSet;

#[derive(Debug, Clone)]
enum PendingKind {
    Leaf,
    Speciation((BranchRef, BranchRef)),
    Reticulation { child: BranchRef, gamma: f64 },
}

#[derive(Debug, Clone)]
struct PendingNode {
    label: Option<String>,
    height: f64,
    kind: PendingKind,
    parents: Vec<NodeIndex>,
}

// =#========================================================================#=
// NETWORK BUILDER
// =#========================================================================#=
/// Assembles a [Network] bottom-up, children before parents.
///
/// The first parent attached to a node becomes its [Side::Left] edge, the second its
/// [Side::Right] edge. Only reticulation nodes may receive a second parent, and the
/// inheritance probability γ of a reticulation belongs to its left edge.
/// Structural problems are reported by [NetworkBuilder::build].
///
/// # Example
/// ```
/// use reticulate::model::network_builder::NetworkBuilder;
///
/// // Leaf B hybridizes between the lineages of A and C
/// let mut builder = NetworkBuilder::new();
/// let a = builder.add_leaf("A", 0.0);
/// let b = builder.add_leaf("B", 0.0);
/// let c = builder.add_leaf("C", 0.0);
/// let h = builder.add_reticulation(b, 0.7, 0.4);
/// let p1 = builder.add_speciation((a, h), 1.0);
/// let p2 = builder.add_speciation((h, c), 2.0);
/// builder.add_speciation((p1, p2), 3.0);
///
/// let network = builder.build().unwrap();
/// assert_eq!(network.num_reticulations(), 1);
/// assert_eq!(network.branch_count(), 8);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NetworkBuilder {
    nodes: Vec<PendingNode>,
}

impl NetworkBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Returns the number of nodes added so far.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Adds a leaf (extant species) and returns its index.
    pub fn add_leaf(&mut self, label: &str, height: f64) -> NodeIndex {
        self.push(PendingNode {
            label: Some(label.to_string()),
            height,
            kind: PendingKind::Leaf,
            parents: Vec::new(),
        })
    }

    /// Adds a speciation node above `children` and returns its index.
    ///
    /// The node without any parent after all additions becomes the root.
    ///
    /// # Panics
    /// Panics if a child index has not been added yet.
    pub fn add_speciation(&mut self, children: (NodeIndex, NodeIndex), height: f64) -> NodeIndex {
        let index = self.nodes.len();
        let left = self.attach(children.0, index);
        let right = self.attach(children.1, index);
        self.push(PendingNode {
            label: None,
            height,
            kind: PendingKind::Speciation((left, right)),
            parents: Vec::new(),
        })
    }

    /// Adds a reticulation node above `child` and returns its index.
    ///
    /// # Arguments
    /// * `child` - The single child of the reticulation
    /// * `height` - Height of the hybridization event
    /// * `gamma` - Inheritance probability of the left (first attached) parent edge
    ///
    /// # Panics
    /// Panics if `child` has not been added yet.
    pub fn add_reticulation(&mut self, child: NodeIndex, height: f64, gamma: f64) -> NodeIndex {
        let index = self.nodes.len();
        let child = self.attach(child, index);
        self.push(PendingNode {
            label: None,
            height,
            kind: PendingKind::Reticulation { child, gamma },
            parents: Vec::new(),
        })
    }

    /// Attaches a label to an already added node.
    pub fn set_label(&mut self, index: NodeIndex, label: &str) {
        self.nodes[index].label = Some(label.to_string());
    }

    /// Replaces the inheritance probability of the left edge of reticulation `index`.
    ///
    /// # Panics
    /// Panics if `index` is not a reticulation.
    pub fn set_gamma(&mut self, index: NodeIndex, value: f64) {
        match &mut self.nodes[index].kind {
            PendingKind::Reticulation { gamma, .. } => *gamma = value,
            _ => panic!("Node {index} is not a reticulation"),
        }
    }

    /// Returns the parents attached to `index` so far, in attachment order.
    pub fn parents_of(&self, index: NodeIndex) -> &[NodeIndex] {
        &self.nodes[index].parents
    }

    /// Validates the added nodes and links them into a [Network].
    ///
    /// # Errors
    /// [ModelError::InvalidNetwork] if:
    /// - there are no nodes, or not exactly one parentless speciation node
    /// - a leaf or speciation node has more than one parent, or a reticulation not exactly two
    /// - a height is negative or non-finite, or a child is not strictly below its parent
    /// - a γ lies outside `(0, 1)`
    /// - leaf labels are empty or repeated, or a node is unreachable from the root
    pub fn build(self) -> Result<Network, ModelError> {
        if self.nodes.is_empty() {
            return Err(invalid("network has no nodes"));
        }

        let mut root = None;
        let mut leaf_labels = HashSet::new();

        for (index, pending) in self.nodes.iter().enumerate() {
            if !pending.height.is_finite() || pending.height < 0.0 {
                return Err(invalid(&format!("node {index} has invalid height {}", pending.height)));
            }

            match &pending.kind {
                PendingKind::Leaf => {
                    if pending.parents.len() != 1 {
                        return Err(invalid(&format!("leaf {index} must have exactly one parent")));
                    }
                    let label = pending.label.as_deref().unwrap_or_default();
                    if label.is_empty() || !leaf_labels.insert(label) {
                        return Err(invalid(&format!("leaf {index} has missing or repeated label '{label}'")));
                    }
                }
                PendingKind::Speciation(_) => match pending.parents.len() {
                    0 if root.is_some() => return Err(invalid("more than one root")),
                    0 => root = Some(index),
                    1 => {}
                    _ => return Err(invalid(&format!("speciation node {index} has more than one parent"))),
                },
                PendingKind::Reticulation { gamma, .. } => {
                    if pending.parents.len() != 2 {
                        return Err(invalid(&format!("reticulation {index} must have exactly two parents")));
                    }
                    if !(*gamma > 0.0 && *gamma < 1.0) {
                        return Err(invalid(&format!("reticulation {index} has gamma {gamma} outside (0,1)")));
                    }
                }
            }

            for &parent in &pending.parents {
                if self.nodes[parent].height <= pending.height {
                    return Err(invalid(&format!("node {index} is not below its parent {parent}")));
                }
            }
        }

        let Some(root_index) = root else {
            return Err(invalid("no root (speciation node without parent)"));
        };

        let nodes = self.nodes.into_iter().enumerate().map(|(index, pending)| {
            let PendingNode { label, height, kind, parents } = pending;
            match kind {
                PendingKind::Leaf => NetworkNode::Leaf {
                    index,
                    label: label.unwrap_or_default(),
                    height,
                    parent: parents[0],
                },
                PendingKind::Speciation(children) => NetworkNode::Speciation {
                    index,
                    label,
                    height,
                    parent: parents.first().copied(),
                    children,
                },
                PendingKind::Reticulation { child, gamma } => NetworkNode::Reticulation {
                    index,
                    label,
                    height,
                    gamma,
                    parents: (parents[0], parents[1]),
                    child,
                },
            }
        });

        let network = Network::from_linked_nodes(nodes.collect(), root_index);
        if !network.is_valid() {
            return Err(invalid("not every node is reachable from the root"));
        }

        Ok(network)
    }

    fn push(&mut self, node: PendingNode) -> NodeIndex {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Registers `parent` as the next parent of `child` and returns the child edge.
    fn attach(&mut self, child: NodeIndex, parent: NodeIndex) -> BranchRef {
        let parents = &mut self.nodes[child].parents;
        let side = if parents.is_empty() { Side::Left } else { Side::Right };
        parents.push(parent);
        BranchRef::new(child, side)
    }
}

fn invalid(msg: &str) -> ModelError {
    ModelError::InvalidNetwork(msg.to_string())
}
