//! Gene leaf labels and their species.
//!
//! - [TaxonMap]: shared storage of gene leaf labels, each assigned to a leaf of the network.

use crate::error::ModelError;
use crate::model::gene_tree::{GeneIndex, GeneTree};
use crate::model::network::{Network, NodeIndex};
use std::collections::HashMap;
use std::fmt;

/// Index of a gene leaf label in a [TaxonMap].
pub type LabelIndex = usize;

// =#========================================================================#=
// TAXON MAP
// =#========================================================================#=
/// Maps gene leaf labels to compact indices and assigns each to a species.
///
/// All gene trees of an analysis share one map; their leaves reference labels by
/// [LabelIndex]. Several gene labels may belong to the same species (several sampled
/// individuals or alleles), but each gene label belongs to at most one.
///
/// # Example
/// ```
/// use reticulate::model::network_builder::NetworkBuilder;
/// use reticulate::model::taxon_map::TaxonMap;
///
/// let mut builder = NetworkBuilder::new();
/// let a = builder.add_leaf("A", 0.0);
/// let b = builder.add_leaf("B", 0.0);
/// builder.add_speciation((a, b), 1.0);
/// let network = builder.build().unwrap();
///
/// let mut taxa = TaxonMap::new(3);
/// taxa.assign("a1", "A", &network).unwrap();
/// taxa.assign("a2", "A", &network).unwrap();
/// let b1 = taxa.assign("b1", "B", &network).unwrap();
///
/// assert_eq!(taxa.species_of(b1), Some(b));
/// assert!(taxa.assign("c1", "C", &network).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct TaxonMap {
    /// Expected number of unique labels
    num_leaves: usize,
    /// List of unique labels
    labels: Vec<String>,
    /// Map from label to its index
    map: HashMap<String, LabelIndex>,
    /// Network leaf of each label, if assigned
    species: Vec<Option<NodeIndex>>,
}

impl TaxonMap {
    /// Creates a new TaxonMap with pre-allocated capacity.
    ///
    /// # Arguments
    /// * `num_leaves` - Expected number of unique gene leaf labels
    pub fn new(num_leaves: usize) -> Self {
        TaxonMap {
            num_leaves,
            labels: Vec::with_capacity(num_leaves),
            map: HashMap::with_capacity(num_leaves),
            species: Vec::with_capacity(num_leaves),
        }
    }

    /// Builds a map from `(gene label, species label)` pairs.
    ///
    /// # Errors
    /// See [TaxonMap::assign].
    pub fn from_assignments(assignments: &[(&str, &str)], network: &Network) -> Result<Self, ModelError> {
        let mut map = Self::new(assignments.len());
        for (gene_label, species_label) in assignments {
            map.assign(gene_label, species_label, network)?;
        }
        Ok(map)
    }

    /// Gets the index for a label, inserting it (unassigned) if it doesn't exist.
    ///
    /// # Arguments
    /// * `s` - The label string to look up or insert
    ///
    /// # Returns
    /// The index associated with this label
    pub fn get_or_insert(&mut self, s: &str) -> LabelIndex {
        if let Some(&index) = self.map.get(s) {
            index
        } else {
            let index = self.labels.len();
            self.labels.push(s.to_string());
            self.map.insert(s.to_string(), index);
            self.species.push(None);
            index
        }
    }

    /// Assigns gene label `gene_label` to the network leaf labelled `species_label`.
    ///
    /// # Returns
    /// The index of `gene_label`
    ///
    /// # Errors
    /// - [ModelError::UnknownSpecies] if no leaf of `network` carries `species_label`
    /// - [ModelError::DuplicateAssignment] if `gene_label` already belongs to another species
    pub fn assign(&mut self, gene_label: &str, species_label: &str, network: &Network) -> Result<LabelIndex, ModelError> {
        let species = network
            .node_by_label(species_label)
            .filter(|&index| network.node(index).is_leaf())
            .ok_or_else(|| ModelError::UnknownSpecies(species_label.to_string()))?;

        let index = self.get_or_insert(gene_label);
        match self.species[index] {
            Some(existing) if existing != species => Err(ModelError::DuplicateAssignment(gene_label.to_string())),
            _ => {
                self.species[index] = Some(species);
                Ok(index)
            }
        }
    }

    /// Retrieves the index for a given label.
    pub fn get_index(&self, s: &str) -> Option<LabelIndex> {
        self.map.get(s).copied()
    }

    /// Retrieves the label for a given index.
    pub fn get_label(&self, index: LabelIndex) -> Option<&str> {
        self.labels.get(index).map(|s| s.as_str())
    }

    /// Checks if a label exists in the map.
    pub fn contains_label(&self, label: &str) -> bool {
        self.map.contains_key(label)
    }

    /// Returns the network leaf the label belongs to, if assigned.
    pub fn species_of(&self, index: LabelIndex) -> Option<NodeIndex> {
        self.species.get(index).copied().flatten()
    }

    /// Returns the number of labels currently stored.
    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    /// Returns reference to the labels in this map.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Pairs every leaf of `gene_tree` with its network leaf.
    ///
    /// # Errors
    /// [ModelError::UnassignedGeneLeaf] if a leaf label has no species.
    pub fn tip_species(&self, gene_tree: &GeneTree) -> Result<Vec<(GeneIndex, NodeIndex)>, ModelError> {
        gene_tree
            .leaf_indices()
            .map(|leaf| {
                let label_index = gene_tree.node(leaf).label_index().unwrap_or(usize::MAX);
                self.species_of(label_index)
                    .map(|species| (leaf, species))
                    .ok_or_else(|| {
                        let label = self.get_label(label_index).unwrap_or("?");
                        ModelError::UnassignedGeneLeaf(label.to_string())
                    })
            })
            .collect()
    }
}

impl fmt::Display for TaxonMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "TaxonMap ({}/{} labels):", self.labels.len(), self.num_leaves)?;
        for (index, label) in self.labels.iter().enumerate() {
            match self.species[index] {
                Some(species) => writeln!(f, "  [{index}] {label} -> species {species}")?,
                None => writeln!(f, "  [{index}] {label} (unassigned)")?,
            }
        }
        Ok(())
    }
}

impl std::ops::Index<LabelIndex> for TaxonMap {
    type Output = str;

    fn index(&self, index: LabelIndex) -> &Self::Output {
        &self.labels[index]
    }
}
