use reticulate::checkpoint::Checkpoint;
use reticulate::model::gene_tree::GeneTree;
use reticulate::model::taxon_map::TaxonMap;

/// `((a1:0.5,a2:0.5):1.0,b1:1.5);` with arena indices a1 0, a2 1, b1 2, internal 3, root 4.
fn small_tree(taxa: &mut TaxonMap) -> GeneTree {
    let mut tree = GeneTree::new(3);
    let a1 = tree.add_leaf(0.0, taxa.get_or_insert("a1"));
    let a2 = tree.add_leaf(0.0, taxa.get_or_insert("a2"));
    let b1 = tree.add_leaf(0.0, taxa.get_or_insert("b1"));
    let internal = tree.add_internal_node((a1, a2), 0.5);
    tree.add_root((internal, b1), 1.5);
    tree
}

// ============= Construction Tests =============
#[test]
fn test_small_tree_structure() {
    let mut taxa = TaxonMap::new(3);
    let tree = small_tree(&mut taxa);

    assert!(tree.is_valid());
    assert_eq!(tree.num_leaves(), 3);
    assert_eq!(tree.num_nodes(), 5);
    assert_eq!(tree.root_index(), 4);
    assert!(tree.root().is_root());
    assert!(tree.node(3).is_internal());

    assert_eq!(tree.parent_of(0), Some(3));
    assert_eq!(tree.parent_of(2), Some(4));
    assert_eq!(tree.parent_of(4), None);
    assert_eq!(tree.children_of(3), Some((0, 1)));
    assert_eq!(tree.children_of(2), None);
    assert_eq!(tree.leaf_indices().collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(tree.node(2).label_index(), taxa.get_index("b1"));
}

#[test]
fn test_lengths() {
    let mut taxa = TaxonMap::new(3);
    let tree = small_tree(&mut taxa);

    assert_eq!(tree.tree_height(), 1.5);
    // 0.5 + 0.5 + 1.0 + 1.5
    assert_eq!(tree.total_length(), 3.5);
}

#[test]
fn test_missing_root_is_invalid() {
    let mut taxa = TaxonMap::new(3);
    let mut tree = GeneTree::new(3);
    let a1 = tree.add_leaf(0.0, taxa.get_or_insert("a1"));
    let a2 = tree.add_leaf(0.0, taxa.get_or_insert("a2"));
    tree.add_leaf(0.0, taxa.get_or_insert("b1"));
    tree.add_internal_node((a1, a2), 0.5);

    assert!(!tree.is_root_set());
    assert!(!tree.is_valid());
}

#[test]
fn test_missing_leaf_is_invalid() {
    let mut taxa = TaxonMap::new(3);
    let mut tree = GeneTree::new(3);
    let a1 = tree.add_leaf(0.0, taxa.get_or_insert("a1"));
    let a2 = tree.add_leaf(0.0, taxa.get_or_insert("a2"));
    tree.add_root((a1, a2), 0.5);

    assert!(!tree.is_valid());
}

#[test]
fn test_child_above_parent_is_invalid() {
    let mut taxa = TaxonMap::new(3);
    let mut tree = small_tree(&mut taxa);
    tree.set_height(3, 2.0);
    assert!(!tree.is_valid());
}

#[test]
#[should_panic]
fn test_single_leaf_panics() {
    GeneTree::new(1);
}

// ============= Traversal Tests =============
#[test]
fn test_post_order() {
    let mut taxa = TaxonMap::new(3);
    let tree = small_tree(&mut taxa);
    let order: Vec<_> = tree.post_order_iter().map(|n| n.index()).collect();
    assert_eq!(order, vec![0, 1, 3, 2, 4]);
}

#[test]
fn test_pre_order() {
    let mut taxa = TaxonMap::new(3);
    let tree = small_tree(&mut taxa);
    let order: Vec<_> = tree.pre_order_iter().map(|n| n.index()).collect();
    assert_eq!(order, vec![4, 3, 0, 1, 2]);
}

// ============= Mutation Tests =============
#[test]
fn test_set_height_advances_epoch() {
    let mut taxa = TaxonMap::new(3);
    let mut tree = small_tree(&mut taxa);
    let before = tree.epoch();

    tree.set_height(3, 0.8);
    assert_eq!(tree.height(3), 0.8);
    assert_ne!(tree.epoch(), before);
    assert!(tree.is_valid());
}

#[test]
fn test_store_restore() {
    let mut taxa = TaxonMap::new(3);
    let mut tree = small_tree(&mut taxa);
    tree.store();
    let stored = tree.epoch();

    tree.set_height(4, 3.0);
    tree.set_height(3, 1.0);
    tree.restore();

    assert_eq!(tree.height(4), 1.5);
    assert_eq!(tree.height(3), 0.5);
    assert_eq!(tree.epoch(), stored);
}

#[test]
fn test_scale() {
    let mut taxa = TaxonMap::new(3);
    let mut tree = small_tree(&mut taxa);

    assert_eq!(tree.scale(2.0), 2);
    assert_eq!(tree.tree_height(), 3.0);
    assert_eq!(tree.height(3), 1.0);
    assert_eq!(tree.height(0), 0.0);
    assert_eq!(tree.total_length(), 7.0);
}
