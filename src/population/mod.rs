//! Demographic models of network branches.
//!
//! A [PopulationModel] turns the coalescent statistics of all gene trees inside one
//! branch into a log-probability. Three models are provided:
//! - [ConstantPopulation]: one constant effective size per branch
//! - [LinearPopulation]: sizes changing linearly along each branch, constant above the root
//! - [AnalyticPopulation]: constant sizes integrated out under an inverse-gamma prior
//!
//! Ploidy scales the effective size seen by each gene.
//! Numerically impossible inputs (non-positive or non-finite sizes, lineages in a branch
//! of zero duration) give negative infinity, never NaN.

/// Inverse-gamma integrated population sizes
pub mod analytic;
/// Constant population sizes
pub mod constant;
/// Linear population sizes with a constant root
pub mod linear;

pub use analytic::{analytic_log_p, AnalyticPopulation};
pub use constant::{constant_log_p, ConstantPopulation};
pub use linear::{linear_log_p, LinearPopulation};

use crate::checkpoint::{Checkpoint, Epoch, EpochClock, Journaled};
use crate::coalescent::statistics::BranchStatistics;
use crate::model::network::{BranchIndex, Network};

// =#========================================================================#=
// POPULATION MODEL (Trait)
// =#========================================================================#=
/// Per-branch coalescent density under some demographic model.
pub trait PopulationModel: Checkpoint {
    /// Log-probability of the coalescences of all gene trees inside `branch`.
    ///
    /// # Arguments
    /// * `network` - The network the statistics were extracted from
    /// * `branch` - The branch to evaluate
    /// * `ploidies` - Ploidy of each gene tree, aligned with `stats`
    /// * `stats` - Statistics of each gene tree in `branch`
    fn branch_log_p(
        &self,
        network: &Network,
        branch: BranchIndex,
        ploidies: &[f64],
        stats: &[&BranchStatistics],
    ) -> f64;

    /// Appends the epochs of every parameter [PopulationModel::branch_log_p] reads for `branch`.
    fn branch_dependencies(&self, network: &Network, branch: BranchIndex, dependencies: &mut Vec<Epoch>);

    /// Effective population size of `branch`, for reporting.
    fn population_size(&self, network: &Network, branch: BranchIndex) -> f64;
}

// =#========================================================================#=
// POPULATION SIZES
// =#========================================================================#=
/// A vector of positive reals with per-entry epochs and checkpointing.
#[derive(Debug, Clone)]
pub struct PopulationSizes {
    values: Journaled<f64>,
    epochs: Journaled<Epoch>,
    clock: EpochClock,
}

impl PopulationSizes {
    /// Wraps `values`.
    pub fn new(values: Vec<f64>) -> Self {
        let len = values.len();
        Self {
            values: Journaled::new(values),
            epochs: Journaled::filled(Epoch::INITIAL, len),
            clock: EpochClock::new(),
        }
    }

    /// Creates `len` entries equal to `value`.
    pub fn filled(value: f64, len: usize) -> Self {
        Self::new(vec![value; len])
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns entry `index`.
    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        self.values[index]
    }

    /// Overwrites entry `index` and gives it a new epoch.
    pub fn set(&mut self, index: usize, value: f64) {
        let epoch = self.clock.advance();
        self.values.set(index, value);
        self.epochs.set(index, epoch);
    }

    /// Returns the epoch at which entry `index` last changed.
    #[inline]
    pub fn epoch(&self, index: usize) -> Epoch {
        self.epochs[index]
    }

    /// Returns all entries.
    pub fn as_slice(&self) -> &[f64] {
        self.values.as_slice()
    }
}

impl Checkpoint for PopulationSizes {
    fn store(&mut self) {
        self.values.store();
        self.epochs.store();
        self.clock.store();
    }

    fn restore(&mut self) {
        self.values.restore();
        self.epochs.restore();
        self.clock.restore();
    }
}

// =#========================================================================#=
// SHARED HELPERS
// =#========================================================================#=
/// Number of lineage pairs among `n` lineages.
#[inline]
pub(crate) fn pairs(n: usize) -> f64 {
    (n * n.saturating_sub(1)) as f64 / 2.0
}

/// `Σ_i C(N - i, 2) · (t_{i+1} - t_i)` over the intervals of one branch.
///
/// The last interval only counts while at least two lineages remain, which keeps the
/// unbounded root interval out of the sum.
pub(crate) fn pair_time(stats: &BranchStatistics) -> f64 {
    let mut total = 0.0;
    for i in 0..=stats.event_count() {
        let remaining = stats.lineage_count.saturating_sub(i);
        if remaining > 1 {
            total += pairs(remaining) * (stats.times[i + 1] - stats.times[i]);
        }
    }
    total
}

/// Returns `true` if some gene has lineages in a branch of zero (or negative) duration.
pub(crate) fn is_degenerate(stats: &[&BranchStatistics]) -> bool {
    stats.iter().any(|s| s.lineage_count > 0 && !(s.top() - s.bottom() > 0.0))
}

/// Maps NaN to negative infinity.
#[inline]
pub(crate) fn sanitize(log_p: f64) -> f64 {
    if log_p.is_nan() { f64::NEG_INFINITY } else { log_p }
}

/// Returns `true` for finite, strictly positive sizes.
#[inline]
pub(crate) fn is_valid_size(size: f64) -> bool {
    size.is_finite() && size > 0.0
}
