//! Per-branch coalescent statistics of an embedded gene tree.

use crate::model::gene_tree::GeneIndex;
use crate::model::network::BranchIndex;

/// What one gene tree does inside one network branch.
///
/// `times` is bracketed: `times[0]` is the branch bottom, `times[k + 1]` the branch top
/// (infinite for the root branch) and `times[1..=k]` the sorted coalescence times of
/// the `k` coalescences inside the branch.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchStatistics {
    /// Number of lineages entering the branch from below
    pub lineage_count: usize,
    /// Bottom, sorted coalescence times, top
    pub times: Vec<f64>,
}

impl BranchStatistics {
    /// Statistics of a branch between `bottom` and `top` that no lineage enters.
    pub fn empty(bottom: f64, top: f64) -> Self {
        Self {
            lineage_count: 0,
            times: vec![bottom, top],
        }
    }

    /// Returns the number of coalescences `k` inside the branch.
    #[inline]
    pub fn event_count(&self) -> usize {
        self.times.len() - 2
    }

    /// Returns the branch bottom.
    pub fn bottom(&self) -> f64 {
        self.times[0]
    }

    /// Returns the branch top.
    pub fn top(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Returns the sorted coalescence times, without brackets.
    pub fn coalescence_times(&self) -> &[f64] {
        &self.times[1..self.times.len() - 1]
    }
}

/// Everything the likelihood needs to know about one embedded gene tree.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneStatistics {
    /// Statistics per network branch, indexed by [BranchIndex]
    pub branches: Vec<BranchStatistics>,
    /// Total gene lineage time spent in each branch (root branch: up to the gene root)
    pub occupancy: Vec<f64>,
    /// Branch containing each internal gene node, `None` for leaves
    pub assignment: Vec<Option<BranchIndex>>,
    /// Sum over lineages entering reticulation edges of `ln γ` or `ln(1 - γ)`
    pub log_gamma_sum: f64,
}

impl GeneStatistics {
    /// Returns the branch containing gene node `gene`, if it is internal.
    pub fn branch_of(&self, gene: GeneIndex) -> Option<BranchIndex> {
        self.assignment[gene]
    }

    /// Returns the sum of all branch occupancies.
    pub fn total_occupancy(&self) -> f64 {
        self.occupancy.iter().sum()
    }
}
