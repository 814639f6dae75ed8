//! Extraction of per-branch coalescent statistics from an embedding.
//!
//! Every gene leaf is followed upward from the network leaf it was sampled in. A
//! lineage stays in its network branch until its parent gene node is reached or the
//! branch ends. When the branch ends at a reticulation node, the embedding table tells
//! which parent edge the lineage continues in. When the parent gene node is reached,
//! that coalescence is assigned to the current branch; the first lineage to arrive
//! continues upward from it, the second one stops.

use crate::coalescent::statistics::{BranchStatistics, GeneStatistics};
use crate::embedding::table::EmbeddingTable;
use crate::model::gene_tree::{GeneIndex, GeneTree};
use crate::model::network::{BranchIndex, Network, NodeIndex};
use crate::model::network_node::{BranchRef, Side};
use tracing::trace;

/// Extracts lineage counts, coalescence times, occupancies and the inheritance
/// term of `gene_tree` as embedded by `table`.
///
/// # Arguments
/// * `tips` - Every gene leaf paired with the network leaf it was sampled from
///
/// # Returns
/// * `Some(GeneStatistics)` - The statistics of a compatible embedding
/// * `None` - The gene tree is incompatible with the network under this table:
///   two lineages meeting at a coalescence arrive in different branches, or a lineage
///   finds no traversal at a reticulation
pub fn branch_statistics(
    network: &Network,
    gene_tree: &GeneTree,
    tips: &[(GeneIndex, NodeIndex)],
    table: &EmbeddingTable,
) -> Option<GeneStatistics> {
    debug_assert!(network.is_valid(), "Network invariants violated");

    let num_branches = network.branch_count();
    let mut lineage_counts = vec![0usize; num_branches];
    let mut events: Vec<Vec<f64>> = vec![Vec::new(); num_branches];
    let mut occupancy = vec![0.0; num_branches];
    let mut assignment: Vec<Option<BranchIndex>> = vec![None; gene_tree.num_nodes()];
    let mut log_gamma_sum = 0.0;

    for &(leaf, species) in tips {
        let mut lineage = leaf;
        let mut branch = BranchRef::above(species);
        let mut entered = gene_tree.height(leaf).max(network.height(species));
        lineage_counts[network.branch_index(branch)] += 1;

        while let Some(coalescence) = gene_tree.parent_of(lineage) {
            let coalescence_height = gene_tree.height(coalescence);
            let current = network.branch_index(branch);

            match network.parent_of(branch) {
                Some(parent) if coalescence_height >= network.height(parent) => {
                    let parent_height = network.height(parent);
                    occupancy[current] += parent_height - entered;
                    entered = parent_height;

                    let side = if network.node(parent).is_reticulation() {
                        match incoming_side(network, gene_tree, table, parent, lineage) {
                            Some(side) => side,
                            None => {
                                trace!(gene = lineage, reticulation = parent, "no traversal at reticulation");
                                return None;
                            }
                        }
                    } else {
                        Side::Left
                    };

                    branch = BranchRef::new(parent, side);
                    let next = network.branch_index(branch);
                    lineage_counts[next] += 1;
                    if network.node(parent).is_reticulation() {
                        log_gamma_sum += network.inheritance_probability(next).ln();
                    }
                }
                _ => {
                    occupancy[current] += coalescence_height - entered;
                    match assignment[coalescence] {
                        None => {
                            assignment[coalescence] = Some(current);
                            events[current].push(coalescence_height);
                            lineage = coalescence;
                            entered = coalescence_height;
                        }
                        Some(existing) if existing == current => break,
                        Some(_) => {
                            trace!(gene = coalescence, "lineages meet in different branches");
                            return None;
                        }
                    }
                }
            }
        }
    }

    let branches = events
        .into_iter()
        .enumerate()
        .map(|(b, mut times)| bracket(network, b, lineage_counts[b], &mut times))
        .collect();

    Some(GeneStatistics {
        branches,
        occupancy,
        assignment,
        log_gamma_sum,
    })
}

/// Sorts the coalescence times of branch `b` and brackets them with the branch ends.
pub(crate) fn bracket(network: &Network, b: BranchIndex, lineage_count: usize, events: &mut Vec<f64>) -> BranchStatistics {
    events.sort_by(f64::total_cmp);

    let mut times = Vec::with_capacity(events.len() + 2);
    times.push(network.branch_bottom(b));
    times.append(events);
    times.push(network.branch_top(b));

    BranchStatistics { lineage_count, times }
}

/// Finds the parent edge of `reticulation` that the lineage of `lineage` enters.
///
/// For each parent `p`, the gene node spanning `p`'s height on the way up from
/// `lineage` is the one whose traversal through `p` is recorded in the table.
fn incoming_side(
    network: &Network,
    gene_tree: &GeneTree,
    table: &EmbeddingTable,
    reticulation: NodeIndex,
    lineage: GeneIndex,
) -> Option<Side> {
    for side in [Side::Left, Side::Right] {
        let edge = BranchRef::new(reticulation, side);
        let Some(parent) = network.parent_of(edge) else {
            continue;
        };
        let parent_height = network.height(parent);

        let mut spanning = lineage;
        while let Some(up) = gene_tree.parent_of(spanning) {
            if gene_tree.height(up) >= parent_height {
                break;
            }
            spanning = up;
        }

        let taken = table.get(parent, spanning).slot().and_then(|slot| network.child_branch(parent, slot));
        if taken == Some(edge) {
            return Some(side);
        }
    }

    None
}
