//! Incremental evaluation of the multispecies network coalescent.

use crate::checkpoint::{Checkpoint, Epoch, Journaled};
use crate::coalescent::{BranchStatistics, GeneStatistics};
use crate::embedding::rebuild::RebuildMode;
use crate::error::ModelError;
use crate::likelihood::{total_log_likelihood, GeneLocus, DEFAULT_PLOIDY};
use crate::model::gene_tree::GeneTree;
use crate::model::network::{BranchIndex, Network};
use crate::model::taxon_map::TaxonMap;
use crate::population::{sanitize, PopulationModel};
use rand::Rng;
use tracing::{debug, trace};

/// Cached term of one branch and the epochs it was computed from.
#[derive(Debug, Clone)]
struct BranchEntry {
    dependencies: Vec<Epoch>,
    log_p: f64,
}

// =#========================================================================#=
// MULTISPECIES COALESCENT
// =#========================================================================#=
/// A network, its gene loci and a population model, evaluated incrementally.
///
/// Mutate the parts through [MultispeciesCoalescent::network_mut],
/// [MultispeciesCoalescent::locus_mut] and [MultispeciesCoalescent::model_mut]; every
/// change is picked up by epoch on the next [MultispeciesCoalescent::log_likelihood].
/// After a proposal call [Checkpoint::store] to accept or [Checkpoint::restore] to
/// reject it.
///
/// A branch term is recomputed only if one of these changed:
/// - a model parameter it reads,
/// - the node the branch belongs to,
/// - the statistics of any gene inside the branch.
#[derive(Debug, Clone)]
pub struct MultispeciesCoalescent<P: PopulationModel> {
    network: Network,
    loci: Vec<GeneLocus>,
    model: P,
    branch_cache: Journaled<Option<BranchEntry>>,
    branch_sum: Option<f64>,
    stored_branch_sum: Option<f64>,
}

impl<P: PopulationModel> MultispeciesCoalescent<P> {
    /// Returns the network.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Returns the network for height and inheritance changes.
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    /// Returns the number of loci.
    pub fn num_loci(&self) -> usize {
        self.loci.len()
    }

    /// Returns all loci.
    pub fn loci(&self) -> &[GeneLocus] {
        &self.loci
    }

    /// Returns locus `index`.
    pub fn locus(&self, index: usize) -> &GeneLocus {
        &self.loci[index]
    }

    /// Returns locus `index` for gene tree or embedding changes.
    pub fn locus_mut(&mut self, index: usize) -> &mut GeneLocus {
        &mut self.loci[index]
    }

    /// Returns the population model.
    pub fn model(&self) -> &P {
        &self.model
    }

    /// Returns the population model for parameter changes.
    pub fn model_mut(&mut self) -> &mut P {
        &mut self.model
    }

    /// Rebuilds or audits the embedding of locus `index` in the current network.
    pub fn rebuild_embedding<R: Rng + ?Sized>(&mut self, index: usize, mode: RebuildMode, rng: &mut R) -> Option<usize> {
        self.loci[index].rebuild_embedding(&self.network, mode, rng)
    }

    /// Draws a new embedding for locus `index`; returns the log Hastings ratio.
    pub fn reembed<R: Rng + ?Sized>(&mut self, index: usize, rng: &mut R) -> f64 {
        self.loci[index].reembed(&self.network, rng)
    }

    /// Evaluates the log-likelihood from scratch, ignoring every cache.
    pub fn recompute_log_likelihood(&self) -> f64 {
        total_log_likelihood(&self.network, &self.loci, &self.model)
    }

    /// Evaluates the log-likelihood, recomputing only the terms whose inputs changed.
    ///
    /// # Returns
    /// Negative infinity if any gene tree is incompatible with its embedding. Branch
    /// caches are left untouched in that case.
    pub fn log_likelihood(&mut self) -> f64 {
        let locus_stats: Vec<_> = self
            .loci
            .iter_mut()
            .map(|locus| locus.statistics(&self.network))
            .collect();

        let mut genes: Vec<&GeneStatistics> = Vec::with_capacity(locus_stats.len());
        for (index, stats) in locus_stats.iter().enumerate() {
            match &stats.stats {
                Some(gene) => genes.push(gene),
                None => {
                    debug!(locus = index, "gene tree incompatible with embedding");
                    return f64::NEG_INFINITY;
                }
            }
        }

        let ploidies: Vec<f64> = self.loci.iter().map(GeneLocus::ploidy).collect();
        let mut dependencies = Vec::new();
        let mut branch_stats: Vec<&BranchStatistics> = Vec::with_capacity(genes.len());
        let mut resum = self.branch_sum.is_none();
        let mut recomputed = 0;

        for b in 0..self.network.branch_count() {
            dependencies.clear();
            self.branch_dependencies(b, &mut dependencies);
            dependencies.extend(locus_stats.iter().map(|stats| stats.branch_versions[b]));

            let old_log_p = match &self.branch_cache[b] {
                Some(entry) if entry.dependencies == dependencies => continue,
                Some(entry) => Some(entry.log_p),
                None => None,
            };

            branch_stats.clear();
            branch_stats.extend(genes.iter().map(|gene| &gene.branches[b]));
            let log_p = self.model.branch_log_p(&self.network, b, &ploidies, &branch_stats);
            recomputed += 1;

            match (self.branch_sum, old_log_p) {
                (Some(sum), Some(old)) if !resum && sum.is_finite() && old.is_finite() && log_p.is_finite() => {
                    self.branch_sum = Some(sum + log_p - old);
                }
                _ => resum = true,
            }

            self.branch_cache.set(
                b,
                Some(BranchEntry {
                    dependencies: dependencies.clone(),
                    log_p,
                }),
            );
        }

        if resum {
            let sum = self.branch_cache.iter().flatten().map(|entry| entry.log_p).sum();
            self.branch_sum = Some(sum);
        }

        let log_gamma_sum: f64 = genes.iter().map(|gene| gene.log_gamma_sum).sum();
        let branch_sum = self.branch_sum.unwrap_or(f64::NEG_INFINITY);
        trace!(recomputed, resum, "evaluated branch terms");

        sanitize(log_gamma_sum + branch_sum)
    }

    fn branch_dependencies(&self, b: BranchIndex, dependencies: &mut Vec<Epoch>) {
        self.model.branch_dependencies(&self.network, b, dependencies);
        dependencies.push(self.network.node_epoch(self.network.branch(b).node));
    }
}

impl<P: PopulationModel> Checkpoint for MultispeciesCoalescent<P> {
    fn store(&mut self) {
        self.network.store();
        for locus in &mut self.loci {
            locus.store();
        }
        self.model.store();
        self.branch_cache.store();
        self.stored_branch_sum = self.branch_sum;
    }

    fn restore(&mut self) {
        self.network.restore();
        for locus in &mut self.loci {
            locus.restore();
        }
        self.model.restore();
        self.branch_cache.restore();
        self.branch_sum = self.stored_branch_sum;
    }
}

// =#========================================================================#=
// BUILDER
// =#========================================================================#=
/// Builder for [MultispeciesCoalescent].
///
/// Gene leaves are mapped to species through a [TaxonMap], which must be set before
/// building. Every locus gets an initial random embedding.
///
/// # Example
/// ```
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use reticulate::likelihood::MultispeciesCoalescentBuilder;
/// use reticulate::model::gene_tree::GeneTree;
/// use reticulate::model::network_builder::NetworkBuilder;
/// use reticulate::model::taxon_map::TaxonMap;
/// use reticulate::population::ConstantPopulation;
///
/// let mut builder = NetworkBuilder::new();
/// let a = builder.add_leaf("A", 0.0);
/// let b = builder.add_leaf("B", 0.0);
/// builder.add_speciation((a, b), 1.0);
/// let network = builder.build().unwrap();
///
/// let taxa = TaxonMap::from_assignments(&[("a1", "A"), ("b1", "B")], &network).unwrap();
/// let mut tree = GeneTree::new(2);
/// let a1 = tree.add_leaf(0.0, taxa.get_index("a1").unwrap());
/// let b1 = tree.add_leaf(0.0, taxa.get_index("b1").unwrap());
/// tree.add_root((a1, b1), 1.5);
///
/// let model = ConstantPopulation::uniform(&network, 1.0);
/// let mut msc = MultispeciesCoalescentBuilder::new(network, model)
///     .with_taxon_map(taxa)
///     .with_locus(tree)
///     .build(&mut StdRng::seed_from_u64(1))
///     .unwrap();
/// assert!(msc.log_likelihood().is_finite());
/// ```
#[derive(Debug)]
pub struct MultispeciesCoalescentBuilder<P: PopulationModel> {
    network: Network,
    model: P,
    taxa: Option<TaxonMap>,
    gene_trees: Vec<(GeneTree, Option<f64>)>,
    default_ploidy: f64,
}

impl<P: PopulationModel> MultispeciesCoalescentBuilder<P> {
    /// Starts a builder for `network` evaluated under `model`.
    pub fn new(network: Network, model: P) -> Self {
        Self {
            network,
            model,
            taxa: None,
            gene_trees: Vec::new(),
            default_ploidy: DEFAULT_PLOIDY,
        }
    }

    /// Sets the map from gene leaf labels to species.
    pub fn with_taxon_map(mut self, taxa: TaxonMap) -> Self {
        self.taxa = Some(taxa);
        self
    }

    /// Adds a locus with the default ploidy.
    pub fn with_locus(mut self, gene_tree: GeneTree) -> Self {
        self.gene_trees.push((gene_tree, None));
        self
    }

    /// Adds a locus with its own ploidy.
    pub fn with_locus_ploidy(mut self, gene_tree: GeneTree, ploidy: f64) -> Self {
        self.gene_trees.push((gene_tree, Some(ploidy)));
        self
    }

    /// Sets the ploidy of loci added without one (default 2).
    pub fn with_default_ploidy(mut self, ploidy: f64) -> Self {
        self.default_ploidy = ploidy;
        self
    }

    /// Replaces the population model.
    pub fn with_population_model(mut self, model: P) -> Self {
        self.model = model;
        self
    }

    /// Validates the inputs and draws an initial embedding for every locus.
    ///
    /// # Errors
    /// - [ModelError::InvalidParameter] without a taxon map or with a non-positive ploidy
    /// - [ModelError::InvalidGeneTree] if a gene tree is incomplete or not time-consistent
    /// - [ModelError::UnassignedGeneLeaf] if a gene leaf has no species
    /// - [ModelError::NoValidEmbedding] if a gene tree cannot be embedded
    pub fn build<R: Rng + ?Sized>(self, rng: &mut R) -> Result<MultispeciesCoalescent<P>, ModelError> {
        let taxa = self
            .taxa
            .ok_or_else(|| ModelError::InvalidParameter("No taxon map set".to_string()))?;

        let mut loci = Vec::with_capacity(self.gene_trees.len());
        for (index, (gene_tree, ploidy)) in self.gene_trees.into_iter().enumerate() {
            let ploidy = ploidy.unwrap_or(self.default_ploidy);
            if !(ploidy.is_finite() && ploidy > 0.0) {
                return Err(ModelError::InvalidParameter(format!(
                    "Ploidy of locus {index} must be positive, got {ploidy}"
                )));
            }
            if !gene_tree.is_valid() {
                return Err(ModelError::InvalidGeneTree(format!(
                    "Gene tree of locus {index} is incomplete or heights decrease towards the root"
                )));
            }

            let tips = taxa.tip_species(&gene_tree)?;
            let mut locus = GeneLocus::new(&self.network, gene_tree, tips, ploidy);
            let choices = locus
                .rebuild_embedding(&self.network, RebuildMode::Commit, rng)
                .ok_or(ModelError::NoValidEmbedding(index))?;
            debug!(locus = index, choices, "initial embedding");
            loci.push(locus);
        }

        let branch_cache = Journaled::filled(None, self.network.branch_count());
        Ok(MultispeciesCoalescent {
            network: self.network,
            loci,
            model: self.model,
            branch_cache,
            branch_sum: None,
            stored_branch_sum: None,
        })
    }
}
