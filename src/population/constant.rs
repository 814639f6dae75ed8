//! Constant effective population size per branch.

use crate::checkpoint::{Checkpoint, Epoch};
use crate::coalescent::statistics::BranchStatistics;
use crate::error::ModelError;
use crate::model::network::{BranchIndex, Network};
use crate::population::{is_degenerate, is_valid_size, pair_time, sanitize, PopulationModel, PopulationSizes};

/// Log-probability of the coalescences in one branch with constant size `pop_size`.
///
/// With `Q` coalescences in total and `Γ = Σ_j pair_time_j / ploidy_j`:
/// `log P = -Σ_j k_j ln(ploidy_j) - Q ln(pop_size) - Γ / pop_size`.
pub fn constant_log_p(pop_size: f64, ploidies: &[f64], stats: &[&BranchStatistics]) -> f64 {
    if !is_valid_size(pop_size) || is_degenerate(stats) {
        return f64::NEG_INFINITY;
    }

    let mut scaled_pair_time = 0.0;
    let mut log_ploidy_sum = 0.0;
    let mut events = 0;

    for (branch, &ploidy) in stats.iter().zip(ploidies) {
        let k = branch.event_count();
        events += k;
        log_ploidy_sum += k as f64 * ploidy.ln();
        scaled_pair_time += pair_time(branch) / ploidy;
    }

    sanitize(-log_ploidy_sum - events as f64 * pop_size.ln() - scaled_pair_time / pop_size)
}

// =#========================================================================#=
// CONSTANT POPULATION
// =#========================================================================#=
/// One constant effective population size per network branch, indexed by [BranchIndex].
#[derive(Debug, Clone)]
pub struct ConstantPopulation {
    sizes: PopulationSizes,
}

impl ConstantPopulation {
    /// Creates the model from one size per branch of `network`.
    ///
    /// # Errors
    /// [ModelError::DimensionMismatch] if `sizes` does not have `branch_count()` entries.
    pub fn new(network: &Network, sizes: Vec<f64>) -> Result<Self, ModelError> {
        if sizes.len() != network.branch_count() {
            return Err(ModelError::DimensionMismatch {
                expected: network.branch_count(),
                actual: sizes.len(),
            });
        }
        Ok(Self { sizes: PopulationSizes::new(sizes) })
    }

    /// Creates the model with the same size on every branch.
    pub fn uniform(network: &Network, size: f64) -> Self {
        Self {
            sizes: PopulationSizes::filled(size, network.branch_count()),
        }
    }

    /// Returns the branch sizes.
    pub fn sizes(&self) -> &PopulationSizes {
        &self.sizes
    }

    /// Returns the branch sizes for mutation.
    pub fn sizes_mut(&mut self) -> &mut PopulationSizes {
        &mut self.sizes
    }
}

impl PopulationModel for ConstantPopulation {
    fn branch_log_p(&self, _network: &Network, branch: BranchIndex, ploidies: &[f64], stats: &[&BranchStatistics]) -> f64 {
        constant_log_p(self.sizes.get(branch), ploidies, stats)
    }

    fn branch_dependencies(&self, _network: &Network, branch: BranchIndex, dependencies: &mut Vec<Epoch>) {
        dependencies.push(self.sizes.epoch(branch));
    }

    fn population_size(&self, _network: &Network, branch: BranchIndex) -> f64 {
        self.sizes.get(branch)
    }
}

impl Checkpoint for ConstantPopulation {
    fn store(&mut self) {
        self.sizes.store();
    }

    fn restore(&mut self) {
        self.sizes.restore();
    }
}
