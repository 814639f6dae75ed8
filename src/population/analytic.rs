//! Constant population sizes integrated out under an inverse-gamma prior.

use crate::checkpoint::{Checkpoint, Epoch};
use crate::coalescent::statistics::BranchStatistics;
use crate::model::network::{BranchIndex, Network};
use crate::population::{is_degenerate, pair_time, sanitize, PopulationModel, PopulationSizes};

const SHAPE: usize = 0;
const MEAN: usize = 1;

/// Log marginal probability of the coalescences in one branch, with the branch's
/// constant size drawn from an inverse-gamma distribution with shape `alpha` and the
/// given `mean` (scale `β = mean · (α - 1)`).
///
/// With `Q` coalescences in total and `Γ = Σ_j pair_time_j / ploidy_j`:
/// `log P = -Σ_j k_j ln(ploidy_j) + α ln β - (α + Q) ln(β + Γ) + Σ_{i<Q} ln(α + i)`.
pub fn analytic_log_p(alpha: f64, mean: f64, ploidies: &[f64], stats: &[&BranchStatistics]) -> f64 {
    let beta = mean * (alpha - 1.0);
    if !(beta > 0.0 && beta.is_finite()) || is_degenerate(stats) {
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

    let rising: f64 = (0..events).map(|i| (alpha + i as f64).ln()).sum();
    sanitize(
        -log_ploidy_sum + alpha * beta.ln() - (alpha + events as f64) * (beta + scaled_pair_time).ln() + rising,
    )
}

// =#========================================================================#=
// ANALYTIC POPULATION
// =#========================================================================#=
/// Branch sizes integrated out analytically; every branch shares the same prior.
#[derive(Debug, Clone)]
pub struct AnalyticPopulation {
    parameters: PopulationSizes,
}

impl AnalyticPopulation {
    /// Creates the model from the prior's shape (must exceed 1) and mean.
    pub fn new(shape: f64, mean: f64) -> Self {
        Self {
            parameters: PopulationSizes::new(vec![shape, mean]),
        }
    }

    /// Returns the prior's shape α.
    pub fn shape(&self) -> f64 {
        self.parameters.get(SHAPE)
    }

    /// Returns the prior's mean.
    pub fn mean(&self) -> f64 {
        self.parameters.get(MEAN)
    }

    /// Sets the prior's shape α.
    pub fn set_shape(&mut self, shape: f64) {
        self.parameters.set(SHAPE, shape);
    }

    /// Sets the prior's mean.
    pub fn set_mean(&mut self, mean: f64) {
        self.parameters.set(MEAN, mean);
    }
}

impl PopulationModel for AnalyticPopulation {
    fn branch_log_p(&self, _network: &Network, _branch: BranchIndex, ploidies: &[f64], stats: &[&BranchStatistics]) -> f64 {
        analytic_log_p(self.shape(), self.mean(), ploidies, stats)
    }

    fn branch_dependencies(&self, _network: &Network, _branch: BranchIndex, dependencies: &mut Vec<Epoch>) {
        dependencies.push(self.parameters.epoch(SHAPE));
        dependencies.push(self.parameters.epoch(MEAN));
    }

    fn population_size(&self, _network: &Network, _branch: BranchIndex) -> f64 {
        self.mean()
    }
}

impl Checkpoint for AnalyticPopulation {
    fn store(&mut self) {
        self.parameters.store();
    }

    fn restore(&mut self) {
        self.parameters.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_coalescence() -> BranchStatistics {
        BranchStatistics {
            lineage_count: 2,
            times: vec![0.0, 1.0, f64::INFINITY],
        }
    }

    #[test]
    fn test_single_coalescence() {
        // α = 3, β = 2, Γ = 1, Q = 1: 3 ln 2 - 4 ln 3 + ln 3
        let log_p = analytic_log_p(3.0, 1.0, &[1.0], &[&one_coalescence()]);
        let expected = 3.0 * 2f64.ln() - 3.0 * 3f64.ln();
        assert!((log_p - expected).abs() < 1e-12);
    }

    #[test]
    fn test_shape_at_most_one_gives_negative_infinity() {
        assert_eq!(analytic_log_p(1.0, 1.0, &[1.0], &[&one_coalescence()]), f64::NEG_INFINITY);
        assert_eq!(analytic_log_p(0.5, 1.0, &[1.0], &[&one_coalescence()]), f64::NEG_INFINITY);
    }

    #[test]
    fn test_parameter_epochs_restore() {
        let mut model = AnalyticPopulation::new(3.0, 1.0);
        model.store();
        model.set_mean(2.0);
        assert_eq!(model.mean(), 2.0);
        model.restore();
        assert_eq!(model.mean(), 1.0);
    }
}
