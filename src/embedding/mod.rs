//! Embeddings of gene trees in a species network.
//!
//! An embedding records, for every gene lineage and every network node it passes on its
//! way tipward, which child branch it enters. Only the choices below reticulations are
//! genuinely free; everything else is forced by where the gene leaves were sampled.

/// Bitsets of gene leaves below gene and network nodes
pub mod heirs;
/// Random (re)construction of embeddings and Hastings ratios
pub mod rebuild;
/// Per-gene-tree table of traversal choices
pub mod table;
