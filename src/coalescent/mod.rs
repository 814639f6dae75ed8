//! Coalescent statistics of embedded gene trees.
//!
//! For every network branch `b` and gene tree, the multispecies coalescent needs the
//! number `N` of lineages entering `b` from below and the times of the `k`
//! coalescences inside `b`. [branch_statistics] extracts them from an embedding.

/// Leaf-upward extraction
pub mod extractor;
/// Per-branch and per-gene statistics
pub mod statistics;

#[cfg(test)]
mod top_down;

pub use extractor::branch_statistics;
pub use statistics::{BranchStatistics, GeneStatistics};
