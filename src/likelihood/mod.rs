//! Log-likelihood of gene trees under the multispecies network coalescent.
//!
//! The likelihood of a set of embedded gene trees factorizes into
//! - the inheritance term of every gene: `ln γ` or `ln(1 - γ)` per lineage entering a
//!   reticulation edge, and
//! - one term per network branch, computed by a [PopulationModel] from the statistics
//!   of all genes inside that branch.
//!
//! [total_log_likelihood] evaluates this from scratch. [MultispeciesCoalescent] owns the
//! network, the loci and the model and re-evaluates only what changed since the last
//! call, with full [Checkpoint] support.

/// Cached, checkpointable evaluation
pub mod aggregator;

pub use aggregator::{MultispeciesCoalescent, MultispeciesCoalescentBuilder};

use crate::checkpoint::{Checkpoint, Epoch, EpochClock, Memo};
use crate::coalescent::{branch_statistics, BranchStatistics, GeneStatistics};
use crate::embedding::rebuild::{EmbeddingRebuilder, RebuildMode};
use crate::embedding::table::EmbeddingTable;
use crate::model::gene_tree::{GeneIndex, GeneTree};
use crate::model::network::{Network, NodeIndex};
use crate::population::{sanitize, PopulationModel};
use rand::Rng;
use std::rc::Rc;

/// Ploidy of a locus when none is given (diploid).
pub const DEFAULT_PLOIDY: f64 = 2.0;

// =#========================================================================#=
// LOCUS STATISTICS
// =#========================================================================#=
/// Statistics of one locus, with a version per network branch.
///
/// A branch version only changes when the statistics of that branch did, so branch
/// terms whose inputs are unchanged are not recomputed.
#[derive(Debug, Clone)]
pub struct LocusStatistics {
    /// `None` if the gene tree is incompatible with its embedding
    pub stats: Option<GeneStatistics>,
    /// Version of each branch's statistics, indexed by branch
    pub branch_versions: Vec<Epoch>,
}

// =#========================================================================#=
// GENE LOCUS
// =#========================================================================#=
/// One gene tree together with everything needed to evaluate it in a network.
#[derive(Debug, Clone)]
pub struct GeneLocus {
    gene_tree: GeneTree,
    tips: Vec<(GeneIndex, NodeIndex)>,
    table: EmbeddingTable,
    rebuilder: EmbeddingRebuilder,
    ploidy: f64,
    statistics: Memo<LocusStatistics>,
    versions: EpochClock,
}

impl GeneLocus {
    /// Creates a locus with an empty embedding.
    ///
    /// # Arguments
    /// * `tips` - Every gene leaf paired with the network leaf it was sampled from,
    ///   see [TaxonMap::tip_species](crate::model::taxon_map::TaxonMap::tip_species)
    pub fn new(network: &Network, gene_tree: GeneTree, tips: Vec<(GeneIndex, NodeIndex)>, ploidy: f64) -> Self {
        let table = EmbeddingTable::new(network, &gene_tree);
        let rebuilder = EmbeddingRebuilder::new(network, &gene_tree, &tips);
        Self {
            gene_tree,
            tips,
            table,
            rebuilder,
            ploidy,
            statistics: Memo::new(),
            versions: EpochClock::new(),
        }
    }

    /// Returns the gene tree.
    pub fn gene_tree(&self) -> &GeneTree {
        &self.gene_tree
    }

    /// Returns the gene tree for height changes.
    pub fn gene_tree_mut(&mut self) -> &mut GeneTree {
        &mut self.gene_tree
    }

    /// Returns the gene leaves with their species.
    pub fn tips(&self) -> &[(GeneIndex, NodeIndex)] {
        &self.tips
    }

    /// Returns the embedding table.
    pub fn table(&self) -> &EmbeddingTable {
        &self.table
    }

    /// Returns the embedding table for direct edits.
    pub fn table_mut(&mut self) -> &mut EmbeddingTable {
        &mut self.table
    }

    /// Returns the ploidy.
    pub fn ploidy(&self) -> f64 {
        self.ploidy
    }

    /// Rebuilds or audits the embedding, see [EmbeddingRebuilder::rebuild_embedding].
    pub fn rebuild_embedding<R: Rng + ?Sized>(&mut self, network: &Network, mode: RebuildMode, rng: &mut R) -> Option<usize> {
        self.rebuilder
            .rebuild_embedding(network, &self.gene_tree, &mut self.table, mode, rng)
    }

    /// Draws a new embedding and returns the log Hastings ratio, see [EmbeddingRebuilder::reembed].
    pub fn reembed<R: Rng + ?Sized>(&mut self, network: &Network, rng: &mut R) -> f64 {
        self.rebuilder.reembed(network, &self.gene_tree, &mut self.table, rng)
    }

    /// Extracts the statistics of this locus without touching any cache.
    pub fn extract(&self, network: &Network) -> Option<GeneStatistics> {
        branch_statistics(network, &self.gene_tree, &self.tips, &self.table)
    }

    /// Returns the statistics for the current state, extracting them only if the
    /// network, gene tree or table changed since the last call.
    pub fn statistics(&mut self, network: &Network) -> Rc<LocusStatistics> {
        let dependencies = [network.epoch(), self.gene_tree.epoch(), self.table.epoch()];
        if let Some(cached) = self.statistics.get(&dependencies) {
            return Rc::clone(cached);
        }

        let stats = self.extract(network);
        let branch_versions = match (&stats, self.statistics.latest()) {
            (Some(fresh), Some(previous)) => match &previous.stats {
                Some(old) => {
                    let version = self.versions.advance();
                    fresh
                        .branches
                        .iter()
                        .zip(&old.branches)
                        .zip(&previous.branch_versions)
                        .map(|((new, old), &kept)| if new == old { kept } else { version })
                        .collect()
                }
                None => vec![self.versions.advance(); network.branch_count()],
            },
            (None, Some(previous)) => previous.branch_versions.clone(),
            (_, None) => vec![self.versions.advance(); network.branch_count()],
        };

        let value = Rc::new(LocusStatistics { stats, branch_versions });
        self.statistics.put(&dependencies, Rc::clone(&value));
        value
    }
}

impl Checkpoint for GeneLocus {
    fn store(&mut self) {
        self.gene_tree.store();
        self.table.store();
        self.statistics.store();
        self.versions.store();
    }

    fn restore(&mut self) {
        self.gene_tree.restore();
        self.table.restore();
        self.statistics.restore();
        self.versions.restore();
    }
}

// =#========================================================================#=
// PURE EVALUATION
// =#========================================================================#=
/// Log-likelihood of all `loci` in `network` under `model`, computed from scratch.
///
/// # Returns
/// Negative infinity if any gene tree is incompatible with its embedding, otherwise
/// the sum of every gene's inheritance term and every branch term.
pub fn total_log_likelihood<P: PopulationModel + ?Sized>(network: &Network, loci: &[GeneLocus], model: &P) -> f64 {
    let mut genes = Vec::with_capacity(loci.len());
    for locus in loci {
        match locus.extract(network) {
            Some(stats) => genes.push(stats),
            None => return f64::NEG_INFINITY,
        }
    }

    let ploidies: Vec<f64> = loci.iter().map(GeneLocus::ploidy).collect();
    let mut log_p: f64 = genes.iter().map(|gene| gene.log_gamma_sum).sum();

    let mut branch_stats: Vec<&BranchStatistics> = Vec::with_capacity(genes.len());
    for b in 0..network.branch_count() {
        branch_stats.clear();
        branch_stats.extend(genes.iter().map(|gene| &gene.branches[b]));
        log_p += model.branch_log_p(network, b, &ploidies, &branch_stats);
    }

    sanitize(log_p)
}
