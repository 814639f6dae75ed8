use rand::SeedableRng;
use rand::rngs::StdRng;
use reticulate::coalescent::{BranchStatistics, branch_statistics};
use reticulate::embedding::rebuild::EmbeddingRebuilder;
use reticulate::embedding::table::{EmbeddingTable, Traversal};
use reticulate::model::gene_tree::{GeneIndex, GeneTree};
use reticulate::model::network::{Network, NodeIndex};
use reticulate::model::network_builder::NetworkBuilder;
use reticulate::model::network_node::{BranchRef, Side};
use reticulate::model::taxon_map::TaxonMap;

const TOLERANCE: f64 = 1e-12;

fn hybrid_network() -> Network {
    let mut builder = NetworkBuilder::new();
    let a = builder.add_leaf("A", 0.0);
    let b = builder.add_leaf("B", 0.0);
    let c = builder.add_leaf("C", 0.0);
    let h = builder.add_reticulation(b, 0.7, 0.4);
    let p1 = builder.add_speciation((a, h), 1.0);
    let p2 = builder.add_speciation((h, c), 2.0);
    builder.add_speciation((p1, p2), 3.0);
    builder.build().unwrap()
}

/// `(((b1,b2):0.5,a):1.5,c):3.5` embedded in [hybrid_network].
fn embedded_gene_tree(network: &Network) -> (GeneTree, Vec<(GeneIndex, NodeIndex)>, EmbeddingTable) {
    let mut taxa = TaxonMap::from_assignments(&[("a", "A"), ("b1", "B"), ("b2", "B"), ("c", "C")], network).unwrap();
    let mut tree = GeneTree::new(4);
    let b1 = tree.add_leaf(0.0, taxa.get_or_insert("b1"));
    let b2 = tree.add_leaf(0.0, taxa.get_or_insert("b2"));
    let a = tree.add_leaf(0.0, taxa.get_or_insert("a"));
    let c = tree.add_leaf(0.0, taxa.get_or_insert("c"));
    let bb = tree.add_internal_node((b1, b2), 0.5);
    let bba = tree.add_internal_node((bb, a), 1.5);
    tree.add_root((bba, c), 3.5);

    let tips = taxa.tip_species(&tree).unwrap();
    let mut table = EmbeddingTable::new(network, &tree);
    let rebuilder = EmbeddingRebuilder::new(network, &tree, &tips);
    rebuilder
        .rebuild(network, &tree, &mut table, &mut StdRng::seed_from_u64(1))
        .unwrap();
    (tree, tips, table)
}

fn branch(network: &Network, node: NodeIndex, side: Side) -> usize {
    network.branch_index(BranchRef::new(node, side))
}

// ============= Statistics Tests =============
#[test]
fn test_statistics_of_forced_embedding() {
    let network = hybrid_network();
    let (tree, tips, table) = embedded_gene_tree(&network);
    let stats = branch_statistics(&network, &tree, &tips, &table).unwrap();

    let expect = |b: usize, lineage_count: usize, times: &[f64]| {
        assert_eq!(
            stats.branches[b],
            BranchStatistics {
                lineage_count,
                times: times.to_vec()
            },
            "branch {b}"
        );
    };

    expect(branch(&network, 0, Side::Left), 1, &[0.0, 1.0]);
    expect(branch(&network, 1, Side::Left), 2, &[0.0, 0.5, 0.7]);
    expect(branch(&network, 2, Side::Left), 1, &[0.0, 2.0]);
    expect(branch(&network, 3, Side::Left), 1, &[0.7, 1.0]);
    expect(branch(&network, 3, Side::Right), 0, &[0.7, 2.0]);
    expect(branch(&network, 4, Side::Left), 2, &[1.0, 1.5, 3.0]);
    expect(branch(&network, 5, Side::Left), 1, &[2.0, 3.0]);
    expect(network.root_branch(), 2, &[3.0, 3.5, f64::INFINITY]);

    assert!((stats.log_gamma_sum - 0.4f64.ln()).abs() < TOLERANCE);
}

#[test]
fn test_assignment_of_coalescences() {
    let network = hybrid_network();
    let (tree, tips, table) = embedded_gene_tree(&network);
    let stats = branch_statistics(&network, &tree, &tips, &table).unwrap();

    assert_eq!(stats.branch_of(4), Some(branch(&network, 1, Side::Left)));
    assert_eq!(stats.branch_of(5), Some(branch(&network, 4, Side::Left)));
    assert_eq!(stats.branch_of(6), Some(network.root_branch()));
    assert_eq!(stats.branch_of(0), None);
}

#[test]
fn test_occupancy_sums_to_tree_length() {
    let network = hybrid_network();
    let (tree, tips, table) = embedded_gene_tree(&network);
    let stats = branch_statistics(&network, &tree, &tips, &table).unwrap();

    assert!((stats.total_occupancy() - tree.total_length()).abs() < TOLERANCE);
    assert!((stats.occupancy[branch(&network, 4, Side::Left)] - 2.5).abs() < TOLERANCE);
    assert_eq!(stats.occupancy[branch(&network, 3, Side::Right)], 0.0);
}

#[test]
fn test_extraction_is_idempotent() {
    let network = hybrid_network();
    let (tree, tips, table) = embedded_gene_tree(&network);

    let first = branch_statistics(&network, &tree, &tips, &table).unwrap();
    let second = branch_statistics(&network, &tree, &tips, &table).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_event_counts_sum_to_internal_nodes() {
    let network = hybrid_network();
    let (tree, tips, table) = embedded_gene_tree(&network);
    let stats = branch_statistics(&network, &tree, &tips, &table).unwrap();

    let events: usize = stats.branches.iter().map(BranchStatistics::event_count).sum();
    assert_eq!(events, tree.num_leaves() - 1);
    for branch in &stats.branches {
        assert!(branch.coalescence_times().windows(2).all(|w| w[0] <= w[1]));
        assert!(branch.coalescence_times().iter().all(|&t| t >= branch.bottom() && t <= branch.top()));
    }
}

// ============= Incompatibility Tests =============
#[test]
fn test_incompatible_after_height_change() {
    let network = hybrid_network();
    let (mut tree, tips, table) = embedded_gene_tree(&network);

    // a and the B lineage would have to meet below P1
    tree.set_height(5, 0.9);
    assert_eq!(branch_statistics(&network, &tree, &tips, &table), None);
}

#[test]
fn test_incompatible_without_traversal_at_reticulation() {
    let network = hybrid_network();
    let (tree, tips, mut table) = embedded_gene_tree(&network);

    // The B lineage no longer records entering H from P1
    table.set(4, 4, Traversal::Left);
    assert_eq!(branch_statistics(&network, &tree, &tips, &table), None);
}

#[test]
fn test_coalescence_at_node_height_belongs_to_parent_branch() {
    let network = hybrid_network();
    let (mut tree, tips, table) = embedded_gene_tree(&network);

    // (b1,b2,a) exactly at P1
    tree.set_height(5, 1.0);
    let stats = branch_statistics(&network, &tree, &tips, &table).unwrap();
    assert_eq!(stats.branch_of(5), Some(branch(&network, 4, Side::Left)));
    assert_eq!(stats.branches[branch(&network, 4, Side::Left)].times, vec![1.0, 1.0, 3.0]);
}
