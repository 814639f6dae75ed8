//! Root-downward extraction, used to cross-check [branch_statistics](super::branch_statistics).
//!
//! Every gene lineage is followed from its parent down through the table to its own
//! node, counting it in every branch whose bottom it crosses.

use crate::coalescent::extractor::bracket;
use crate::coalescent::statistics::GeneStatistics;
use crate::embedding::table::EmbeddingTable;
use crate::model::gene_tree::{GeneIndex, GeneTree};
use crate::model::network::{BranchIndex, Network};
use crate::model::network_node::BranchRef;

struct Accumulator {
    lineage_counts: Vec<usize>,
    events: Vec<Vec<f64>>,
    occupancy: Vec<f64>,
    assignment: Vec<Option<BranchIndex>>,
    log_gamma_sum: f64,
}

pub(crate) fn branch_statistics_top_down(
    network: &Network,
    gene_tree: &GeneTree,
    table: &EmbeddingTable,
) -> Option<GeneStatistics> {
    let num_branches = network.branch_count();
    let mut acc = Accumulator {
        lineage_counts: vec![0; num_branches],
        events: vec![Vec::new(); num_branches],
        occupancy: vec![0.0; num_branches],
        assignment: vec![None; gene_tree.num_nodes()],
        log_gamma_sum: 0.0,
    };

    let root = gene_tree.root_index();
    let root_branch = BranchRef::above(network.root_index());
    if !descend(network, gene_tree, table, &mut acc, root, root_branch, gene_tree.height(root)) {
        return None;
    }

    let branches = acc
        .events
        .into_iter()
        .enumerate()
        .map(|(b, mut times)| bracket(network, b, acc.lineage_counts[b], &mut times))
        .collect();

    Some(GeneStatistics {
        branches,
        occupancy: acc.occupancy,
        assignment: acc.assignment,
        log_gamma_sum: acc.log_gamma_sum,
    })
}

/// Follows the lineage of `gene` down `branch`, where it is present from `upper` downward.
fn descend(
    network: &Network,
    gene_tree: &GeneTree,
    table: &EmbeddingTable,
    acc: &mut Accumulator,
    gene: GeneIndex,
    branch: BranchRef,
    upper: f64,
) -> bool {
    let b = network.branch_index(branch);
    let bottom = network.height(branch.node);
    let height = gene_tree.height(gene);
    let is_gene_root = gene == gene_tree.root_index();

    if height < bottom {
        // Above its own node the gene root has no lineage
        if !is_gene_root {
            acc.occupancy[b] += upper - bottom;
            acc.lineage_counts[b] += 1;
        }

        let Some(slot) = table.get(branch.node, gene).slot() else {
            return false;
        };
        let Some(child) = network.child_branch(branch.node, slot) else {
            return false;
        };
        if !is_gene_root && network.node(branch.node).is_reticulation() {
            acc.log_gamma_sum += network.inheritance_probability(b).ln();
        }
        let child_upper = if is_gene_root { upper } else { bottom };
        return descend(network, gene_tree, table, acc, gene, child, child_upper);
    }

    if !is_gene_root {
        acc.occupancy[b] += upper - height;
    }

    match gene_tree.children_of(gene) {
        None => {
            acc.lineage_counts[b] += 1;
            true
        }
        Some((left, right)) => {
            acc.assignment[gene] = Some(b);
            acc.events[b].push(height);
            descend(network, gene_tree, table, acc, left, branch, height)
                && descend(network, gene_tree, table, acc, right, branch, height)
        }
    }
}
