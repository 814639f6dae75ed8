//! Effective population sizes changing linearly along each branch.

use crate::checkpoint::{Checkpoint, Epoch};
use crate::coalescent::statistics::BranchStatistics;
use crate::error::ModelError;
use crate::model::network::{BranchIndex, Network, NodeIndex};
use crate::model::network_node::BranchRef;
use crate::population::{
    constant_log_p, is_degenerate, is_valid_size, pairs, sanitize, PopulationModel, PopulationSizes,
};

/// Size differences below this are treated as constant within an interval.
const CONSTANT_SIZE_TOLERANCE: f64 = 1e-10;

/// Log-probability of the coalescences in one branch whose size changes linearly from
/// `bottom_size` at the branch bottom to `top_size` at the branch top.
///
/// Both sizes are multiplied by each gene's ploidy. Every coalescence contributes the
/// negative log size at its time, every interval `-C(n, 2) ∫ dt / size(t)`.
///
/// # Panics
/// Panics in debug builds if a branch top is infinite; the root branch has no top size.
pub fn linear_log_p(top_size: f64, bottom_size: f64, ploidies: &[f64], stats: &[&BranchStatistics]) -> f64 {
    if !is_valid_size(top_size) || !is_valid_size(bottom_size) || is_degenerate(stats) {
        return f64::NEG_INFINITY;
    }

    let mut log_p = 0.0;
    for (branch, &ploidy) in stats.iter().zip(ploidies) {
        if branch.lineage_count == 0 {
            continue;
        }
        log_p += linear_gene_log_p(top_size * ploidy, bottom_size * ploidy, branch);
    }

    sanitize(log_p)
}

fn linear_gene_log_p(top_size: f64, bottom_size: f64, branch: &BranchStatistics) -> f64 {
    let times = &branch.times;
    let k = branch.event_count();
    debug_assert!(times[k + 1].is_finite(), "Linear sizes need a finite branch top");

    let span = times[k + 1] - times[0];
    let size_difference = top_size - bottom_size;
    let gradient = size_difference / span;
    let size_at = |time: f64| bottom_size + (time - times[0]) * gradient;

    let mut log_p = 0.0;
    for i in 0..=k {
        let lower_size = size_at(times[i]);
        let upper_size = size_at(times[i + 1]);
        if i < k {
            log_p -= upper_size.ln();
        }

        let remaining = branch.lineage_count.saturating_sub(i);
        if remaining > 1 {
            let interval_area = if size_difference.abs() < CONSTANT_SIZE_TOLERANCE {
                (times[i + 1] - times[i]) / lower_size
            } else {
                (upper_size / lower_size).ln() / gradient
            };
            log_p -= pairs(remaining) * interval_area;
        }
    }

    log_p
}

// =#========================================================================#=
// LINEAR POPULATION
// =#========================================================================#=
/// Linear sizes on all non-root branches, constant size on the root branch.
///
/// Parameters:
/// - `top_sizes`: size at the top of every non-root branch, indexed by [BranchIndex]
/// - `tip_sizes`: size at the bottom of every leaf branch, in the order of
///   [Network::leaf_indices]
///
/// The size at the bottom of a branch above a non-leaf node is the sum of the top sizes
/// of the node's child branches; both edges above a reticulation start from the top size
/// of its single child branch. The root branch uses the constant kernel with the size at
/// its bottom.
#[derive(Debug, Clone)]
pub struct LinearPopulation {
    top_sizes: PopulationSizes,
    tip_sizes: PopulationSizes,
    leaf_positions: Vec<Option<usize>>,
}

impl LinearPopulation {
    /// Creates the model.
    ///
    /// # Errors
    /// [ModelError::DimensionMismatch] if `top_sizes` does not have `branch_count() - 1`
    /// entries or `tip_sizes` not `num_leaves()` entries.
    pub fn new(network: &Network, top_sizes: Vec<f64>, tip_sizes: Vec<f64>) -> Result<Self, ModelError> {
        if top_sizes.len() != network.root_branch() {
            return Err(ModelError::DimensionMismatch {
                expected: network.root_branch(),
                actual: top_sizes.len(),
            });
        }
        if tip_sizes.len() != network.num_leaves() {
            return Err(ModelError::DimensionMismatch {
                expected: network.num_leaves(),
                actual: tip_sizes.len(),
            });
        }

        let mut leaf_positions = vec![None; network.num_nodes()];
        for (position, &leaf) in network.leaf_indices().iter().enumerate() {
            leaf_positions[leaf] = Some(position);
        }

        Ok(Self {
            top_sizes: PopulationSizes::new(top_sizes),
            tip_sizes: PopulationSizes::new(tip_sizes),
            leaf_positions,
        })
    }

    /// Creates the model with all top and tip sizes equal to `size`.
    pub fn uniform(network: &Network, size: f64) -> Self {
        let mut leaf_positions = vec![None; network.num_nodes()];
        for (position, &leaf) in network.leaf_indices().iter().enumerate() {
            leaf_positions[leaf] = Some(position);
        }
        Self {
            top_sizes: PopulationSizes::filled(size, network.root_branch()),
            tip_sizes: PopulationSizes::filled(size, network.num_leaves()),
            leaf_positions,
        }
    }

    /// Returns the top sizes of the non-root branches.
    pub fn top_sizes(&self) -> &PopulationSizes {
        &self.top_sizes
    }

    /// Returns the top sizes for mutation.
    pub fn top_sizes_mut(&mut self) -> &mut PopulationSizes {
        &mut self.top_sizes
    }

    /// Returns the tip sizes of the leaf branches.
    pub fn tip_sizes(&self) -> &PopulationSizes {
        &self.tip_sizes
    }

    /// Returns the tip sizes for mutation.
    pub fn tip_sizes_mut(&mut self) -> &mut PopulationSizes {
        &mut self.tip_sizes
    }

    /// Size at the bottom of every branch above `node`.
    pub fn bottom_size(&self, network: &Network, node: NodeIndex) -> f64 {
        match self.leaf_positions[node] {
            Some(position) => self.tip_sizes.get(position),
            None => network
                .node(node)
                .children()
                .map(|child| self.top_sizes.get(network.branch_index(child)))
                .sum(),
        }
    }

    fn bottom_dependencies(&self, network: &Network, node: NodeIndex, dependencies: &mut Vec<Epoch>) {
        match self.leaf_positions[node] {
            Some(position) => dependencies.push(self.tip_sizes.epoch(position)),
            None => {
                for child in network.node(node).children() {
                    dependencies.push(self.top_sizes.epoch(network.branch_index(child)));
                }
            }
        }
    }
}

impl PopulationModel for LinearPopulation {
    fn branch_log_p(&self, network: &Network, branch: BranchIndex, ploidies: &[f64], stats: &[&BranchStatistics]) -> f64 {
        let bottom_size = self.bottom_size(network, network.branch(branch).node);
        if branch == network.root_branch() {
            constant_log_p(bottom_size, ploidies, stats)
        } else {
            linear_log_p(self.top_sizes.get(branch), bottom_size, ploidies, stats)
        }
    }

    fn branch_dependencies(&self, network: &Network, branch: BranchIndex, dependencies: &mut Vec<Epoch>) {
        let BranchRef { node, .. } = network.branch(branch);
        self.bottom_dependencies(network, node, dependencies);
        if branch != network.root_branch() {
            dependencies.push(self.top_sizes.epoch(branch));
        }
    }

    fn population_size(&self, network: &Network, branch: BranchIndex) -> f64 {
        if branch == network.root_branch() {
            self.bottom_size(network, network.root_index())
        } else {
            self.top_sizes.get(branch)
        }
    }
}

impl Checkpoint for LinearPopulation {
    fn store(&mut self) {
        self.top_sizes.store();
        self.tip_sizes.store();
    }

    fn restore(&mut self) {
        self.top_sizes.restore();
        self.tip_sizes.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_sizes_match_constant() {
        let stats = BranchStatistics {
            lineage_count: 3,
            times: vec![0.0, 0.5, 0.8, 2.0],
        };
        let linear = linear_log_p(1.7, 1.7, &[2.0], &[&stats]);
        let constant = constant_log_p(1.7, &[2.0], &[&stats]);
        assert!((linear - constant).abs() < 1e-12);
    }

    #[test]
    fn test_growing_size() {
        // Size grows from 1 to 3 over [0, 2], coalescence at 1 where the size is 2
        let stats = BranchStatistics {
            lineage_count: 2,
            times: vec![0.0, 1.0, 2.0],
        };
        let log_p = linear_log_p(3.0, 1.0, &[1.0], &[&stats]);
        assert!((log_p + 2.0 * 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_sizes_give_negative_infinity() {
        let stats = BranchStatistics {
            lineage_count: 2,
            times: vec![0.0, 1.0, 2.0],
        };
        assert_eq!(linear_log_p(-1.0, 1.0, &[1.0], &[&stats]), f64::NEG_INFINITY);
        assert_eq!(linear_log_p(1.0, f64::NAN, &[1.0], &[&stats]), f64::NEG_INFINITY);
    }
}
