//! Reticulate is a library to evaluate gene trees under the multispecies network
//! coalescent.
//!
//! Given a species network with reticulation (hybridization) nodes and a set of gene
//! trees, one per locus, this crate computes the probability of the gene trees and
//! maintains a stochastic embedding of every gene lineage through the network.
//! Core functionality provided:
//! - Models: [Network](model::network::Network) built with
//!   [NetworkBuilder](model::network_builder::NetworkBuilder),
//!   [GeneTree](model::gene_tree::GeneTree) and the shared
//!   [TaxonMap](model::taxon_map::TaxonMap) from gene leaves to species.
//!   All use the arena pattern, so only indices are stored, no references.
//! - Embedding: [EmbeddingTable](embedding::table::EmbeddingTable) records which
//!   child each gene lineage takes at every network node;
//!   [EmbeddingRebuilder](embedding::rebuild::EmbeddingRebuilder) draws new
//!   embeddings uniformly among the compatible choices and reports Hastings ratios.
//! - Statistics: [branch_statistics](coalescent::branch_statistics) extracts lineage
//!   counts and coalescence times per network branch.
//! - Demography: [PopulationModel](population::PopulationModel) with constant,
//!   linear and analytically integrated population sizes.
//! - Likelihood: [total_log_likelihood](likelihood::total_log_likelihood) evaluates
//!   from scratch; [MultispeciesCoalescent](likelihood::MultispeciesCoalescent)
//!   re-evaluates only what changed and supports store/restore checkpoints.
//! - Reading: Newick gene trees and extended Newick networks, see [crate::newick].
//!
//! Limitations:
//! - Gene trees are binary; network nodes have at most two children and two parents
//! - Topologies are fixed after construction; heights, γ and population sizes change
//! - Single-threaded; randomness is injected as a [rand::Rng]
//!
//! # Example
//! ```
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use reticulate::checkpoint::Checkpoint;
//! use reticulate::likelihood::MultispeciesCoalescentBuilder;
//! use reticulate::model::taxon_map::TaxonMap;
//! use reticulate::newick::{parse_gene_tree, parse_network};
//! use reticulate::population::ConstantPopulation;
//!
//! let network = parse_network("((A:1,(B:0.4)#H1[&gamma=0.3]:0.6):2,(#H1:1.6,C:2):1);").unwrap();
//! let mut taxa = TaxonMap::from_assignments(&[("a", "A"), ("b", "B"), ("c", "C")], &network).unwrap();
//! let gene_tree = parse_gene_tree("((a:1.5,b:1.5):2,c:3.5);", &mut taxa).unwrap();
//!
//! let model = ConstantPopulation::uniform(&network, 0.5);
//! let mut msc = MultispeciesCoalescentBuilder::new(network, model)
//!     .with_taxon_map(taxa)
//!     .with_locus(gene_tree)
//!     .build(&mut StdRng::seed_from_u64(7))
//!     .unwrap();
//!
//! let log_p = msc.log_likelihood();
//! msc.store();
//! let root = msc.network().root_index();
//! msc.network_mut().set_height(root, 2.5);
//! assert_ne!(msc.log_likelihood(), log_p);
//! msc.restore();
//! assert_eq!(msc.log_likelihood(), log_p);
//! ```

pub mod checkpoint;
pub mod coalescent;
pub mod embedding;
pub mod error;
pub mod likelihood;
pub mod model;
pub mod newick;
pub mod parser;
pub mod population;

pub use error::ModelError;
