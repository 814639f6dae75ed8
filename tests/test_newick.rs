use rand::SeedableRng;
use rand::rngs::StdRng;
use reticulate::ModelError;
use reticulate::likelihood::MultispeciesCoalescentBuilder;
use reticulate::model::network::Network;
use reticulate::model::network_node::{BranchRef, Side};
use reticulate::model::taxon_map::TaxonMap;
use reticulate::newick::{NewickParser, parse_gene_tree, parse_gene_tree_file, parse_network};
use reticulate::parser::byte_parser::ByteParser;
use reticulate::parser::parsing_error::ParsingErrorType;
use reticulate::population::ConstantPopulation;
use std::path::Path;

const TOLERANCE: f64 = 1e-12;
const HYBRID_NETWORK: &str = "((A:1,(B:0.4)#H1[&gamma=0.3]:0.6):2,(#H1:1.6,C:2):1);";

/// γ of the edge from the speciation above leaf `A` into the reticulation.
fn gamma_from_a_side(network: &Network) -> f64 {
    let a = network.node_by_label("A").unwrap();
    let hybrid = network.reticulation_nodes().next().unwrap().index();
    for side in [Side::Left, Side::Right] {
        let branch = BranchRef::new(hybrid, side);
        let parent = network.parent_of(branch).unwrap();
        let below_parent: Vec<_> = network.node(parent).children().map(|child| child.node).collect();
        if below_parent.contains(&a) {
            return network.inheritance_probability(network.branch_index(branch));
        }
    }
    panic!("no parent of the reticulation lies above A");
}

fn parsing_error_kind(error: ModelError) -> ParsingErrorType {
    match error {
        ModelError::Parsing(e) => e.kind().clone(),
        other => panic!("expected a parsing error, got {other:?}"),
    }
}

// ============= Network Tests =============
#[test]
fn test_parse_hybrid_network() {
    let network = parse_network(HYBRID_NETWORK).unwrap();

    assert!(network.is_valid());
    assert_eq!(network.num_leaves(), 3);
    assert_eq!(network.num_reticulations(), 1);
    assert_eq!(network.num_nodes(), 7);
    assert_eq!(network.branch_count(), 8);

    assert_eq!(network.height(network.root_index()), 3.0);
    let hybrid = network.reticulation_nodes().next().unwrap().index();
    assert!((network.height(hybrid) - 0.4).abs() < TOLERANCE);
    for label in ["A", "B", "C"] {
        let leaf = network.node_by_label(label).unwrap();
        assert!(network.node(leaf).is_leaf());
        assert!(network.height(leaf).abs() < TOLERANCE);
    }

    assert!((gamma_from_a_side(&network) - 0.3).abs() < TOLERANCE);
    assert!((network.network_length() - 8.6).abs() < 1e-9);
}

#[test]
fn test_gamma_follows_first_occurrence_in_any_order() {
    let reversed = parse_network("((#H1:1.6,C:2):1,(A:1,(B:0.4)#H1[&gamma=0.3]:0.6):2);").unwrap();
    assert!(reversed.is_valid());
    assert!((gamma_from_a_side(&reversed) - 0.3).abs() < TOLERANCE);
}

#[test]
fn test_gamma_from_second_occurrence() {
    let network = parse_network("((A:1,(B:0.4)#H1:0.6):2,(#H1[&gamma=0.8]:1.6,C:2):1);").unwrap();
    assert!((gamma_from_a_side(&network) - 0.2).abs() < TOLERANCE);
}

#[test]
fn test_gamma_after_branch_length() {
    let network = parse_network("((A:1,(B:0.4)#H1:0.6[&gamma=0.35]):2,(#H1:1.6,C:2):1);").unwrap();
    assert!((gamma_from_a_side(&network) - 0.35).abs() < TOLERANCE);
}

#[test]
fn test_default_gamma() {
    let newick = "((A:1,(B:0.4)#H1:0.6):2,(#H1:1.6,C:2):1);";
    let network = parse_network(newick).unwrap();
    assert!((gamma_from_a_side(&network) - 0.5).abs() < TOLERANCE);

    let mut parser = NewickParser::new().with_default_gamma(0.9);
    let network = parser.parse_network(&mut ByteParser::from_str(newick)).unwrap();
    assert!((gamma_from_a_side(&network) - 0.9).abs() < TOLERANCE);
}

#[test]
fn test_network_with_comments_and_other_annotations() {
    let newick = "[Stilts] ((A:1, (B:0.4)#H1[&gamma=0.3,source=pied]:0.6) [P1] :2 ,\n\t(#H1:1.6,C:2):1);";
    let network = parse_network(newick).unwrap();
    assert_eq!(network.num_reticulations(), 1);
    assert!((gamma_from_a_side(&network) - 0.3).abs() < TOLERANCE);
}

#[test]
fn test_tree_shaped_network() {
    let network = parse_network("((Kiwi:1.5,Kakapo:1.5)Palaeognathae:2,Kea:3.5);").unwrap();
    assert!(network.is_valid());
    assert_eq!(network.num_reticulations(), 0);
    assert_eq!(network.branch_count(), 5);
    assert_eq!(network.height(network.root_index()), 3.5);

    let inner = network.node_by_label("Palaeognathae").unwrap();
    assert_eq!(network.height(inner), 1.5);
}

// ============= Gene Tree Tests =============
#[test]
fn test_parse_gene_tree() {
    let mut taxa = TaxonMap::new(3);
    let tree = parse_gene_tree("((a1:0.5,a2:0.5):1,b1:1.5);", &mut taxa).unwrap();

    assert!(tree.is_valid());
    assert_eq!(tree.num_leaves(), 3);
    assert_eq!(tree.num_nodes(), 5);
    assert_eq!(tree.tree_height(), 1.5);
    assert!((tree.total_length() - 3.0).abs() < TOLERANCE);

    assert_eq!(taxa.num_labels(), 3);
    let a1 = taxa.get_index("a1").unwrap();
    let leaf = tree
        .leaf_indices()
        .find(|&leaf| tree.node(leaf).label_index() == Some(a1))
        .unwrap();
    let cherry = tree.parent_of(leaf).unwrap();
    assert_eq!(tree.height(cherry), 0.5);
    assert_eq!(tree.parent_of(cherry), Some(tree.root_index()));
}

#[test]
fn test_gene_tree_labels_shared_across_trees() {
    let mut taxa = TaxonMap::new(3);
    parse_gene_tree("((a1:0.5,a2:0.5):1,b1:1.5);", &mut taxa).unwrap();
    parse_gene_tree("(b1:2,(a2:1,c1:1):1);", &mut taxa).unwrap();

    assert_eq!(taxa.num_labels(), 4);
    assert!(taxa.contains_label("c1"));
}

#[test]
fn test_gene_tree_quoted_labels_and_scientific_notation() {
    let mut taxa = TaxonMap::new(2);
    let tree = parse_gene_tree("('Rock wren':2.5e-1,'Wilson''s storm-petrel':0.25);", &mut taxa).unwrap();

    assert_eq!(tree.num_leaves(), 2);
    assert_eq!(tree.tree_height(), 0.25);
    assert!(taxa.contains_label("Rock wren"));
    assert!(taxa.contains_label("Wilson's storm-petrel"));
}

#[test]
fn test_gene_tree_with_comments() {
    let mut taxa = TaxonMap::new(3);
    let newick = "[locus 17]((a1:0.5[first],a2:0.5):1 [cherry] ,\n b1 : 1.5 );";
    let tree = parse_gene_tree(newick, &mut taxa).unwrap();
    assert_eq!(tree.num_leaves(), 3);
    assert_eq!(tree.tree_height(), 1.5);
}

#[test]
fn test_gene_tree_root_branch_is_ignored() {
    let mut taxa = TaxonMap::new(2);
    let tree = parse_gene_tree("(a1:1,b1:1):4;", &mut taxa).unwrap();
    assert_eq!(tree.tree_height(), 1.0);
}

// ============= Error Tests =============
#[test]
fn test_gene_tree_must_be_binary() {
    let mut taxa = TaxonMap::new(3);
    let result = parse_gene_tree("(a1:1,a2:1,b1:1);", &mut taxa);
    assert!(matches!(result, Err(ModelError::InvalidGeneTree(_))));
}

#[test]
fn test_gene_tree_needs_two_distinct_leaves() {
    let mut taxa = TaxonMap::new(2);
    assert!(matches!(
        parse_gene_tree("(a1:1);", &mut taxa),
        Err(ModelError::InvalidGeneTree(_))
    ));
    assert!(matches!(
        parse_gene_tree("(a1:1,a1:1);", &mut taxa),
        Err(ModelError::InvalidGeneTree(_))
    ));
}

#[test]
fn test_missing_semicolon() {
    let mut taxa = TaxonMap::new(2);
    let error = parse_gene_tree("(a1:1,b1:1)", &mut taxa).unwrap_err();
    assert!(matches!(parsing_error_kind(error), ParsingErrorType::InvalidNewickString(_)));
}

#[test]
fn test_missing_comma() {
    let mut taxa = TaxonMap::new(2);
    let error = parse_gene_tree("(a1:1 b1:1);", &mut taxa).unwrap_err();
    assert!(matches!(parsing_error_kind(error), ParsingErrorType::InvalidNewickString(_)));
}

#[test]
fn test_missing_branch_length() {
    let error = parse_network("((A:1,B:1),C:2);").unwrap_err();
    assert_eq!(parsing_error_kind(error), ParsingErrorType::MissingBranchLength);
}

#[test]
fn test_unclosed_comment() {
    let mut taxa = TaxonMap::new(3);
    let error = parse_gene_tree("((a1:1,a2:1):1[oops,b1:2);", &mut taxa).unwrap_err();
    assert_eq!(parsing_error_kind(error), ParsingErrorType::UnclosedComment);
}

#[test]
fn test_invalid_gamma_annotation() {
    let error = parse_network("((A:1,(B:0.4)#H1[&gamma=lots]:0.6):2,(#H1:1.6,C:2):1);").unwrap_err();
    assert!(matches!(parsing_error_kind(error), ParsingErrorType::InvalidAnnotation(_)));
}

#[test]
fn test_empty_input() {
    let error = parse_network("  [nothing here] ").unwrap_err();
    assert_eq!(parsing_error_kind(error), ParsingErrorType::UnexpectedEOF);
}

#[test]
fn test_hybrid_occurring_once() {
    let result = parse_network("((A:1,(B:0.4)#H1:0.6):2,C:3);");
    assert!(matches!(result, Err(ModelError::InvalidNetwork(_))));
}

#[test]
fn test_hybrid_without_child() {
    let result = parse_network("((A:1,#H1:0.6):2,(#H1:1.6,C:2):1);");
    assert!(matches!(result, Err(ModelError::InvalidNetwork(_))));
}

#[test]
fn test_hybrid_with_two_children() {
    // D would otherwise vanish below the reticulation
    let result = parse_network("((A:1,(B:0.4,D:0.4)#H1:0.6):2,(#H1:1.6,C:2):1);");
    assert!(matches!(result, Err(ModelError::InvalidNetwork(_))));

    let result = parse_network("((A:1,#H1:0.6):2,((B:0.4,D:0.4)#H1:1.6,C:2):1);");
    assert!(matches!(result, Err(ModelError::InvalidNetwork(_))));
}

#[test]
fn test_multifurcating_network() {
    let result = parse_network("(A:1,B:1,C:1);");
    assert!(matches!(result, Err(ModelError::InvalidNetwork(_))));
}

// ============= File Tests =============
#[test]
fn test_parse_gene_tree_file() {
    let path = Path::new("tests").join("fixtures").join("gene_trees_t3_n4.nwk");
    let mut taxa = TaxonMap::new(4);
    let trees = parse_gene_tree_file(&path, &mut taxa).unwrap();

    assert_eq!(trees.len(), 3);
    assert!(trees.iter().all(|tree| tree.is_valid() && tree.num_leaves() == 4));
    assert_eq!(taxa.num_labels(), 4);
    assert_eq!(trees[0].tree_height(), 3.5);
    assert!((trees[1].tree_height() - 3.7).abs() < TOLERANCE);
    assert_eq!(trees[2].tree_height(), 4.0);
}

#[test]
fn test_parse_missing_file() {
    let mut taxa = TaxonMap::new(4);
    let error = parse_gene_tree_file("tests/fixtures/no_such_file.nwk", &mut taxa).unwrap_err();
    assert!(matches!(parsing_error_kind(error), ParsingErrorType::IoError(_)));
}

#[test]
fn test_parsed_data_gives_finite_likelihood() {
    let network = parse_network(HYBRID_NETWORK).unwrap();
    let mut taxa = TaxonMap::new(4);
    let trees = parse_gene_tree_file(Path::new("tests").join("fixtures").join("gene_trees_t3_n4.nwk"), &mut taxa).unwrap();
    for (gene, species) in [("kaki_1", "A"), ("kaki_2", "A"), ("pied_1", "B"), ("black_1", "C")] {
        taxa.assign(gene, species, &network).unwrap();
    }

    let model = ConstantPopulation::uniform(&network, 1.5);
    let mut builder = MultispeciesCoalescentBuilder::new(network, model).with_taxon_map(taxa);
    for tree in trees {
        builder = builder.with_locus(tree);
    }
    let mut msc = builder.build(&mut StdRng::seed_from_u64(17)).unwrap();

    let log_likelihood = msc.log_likelihood();
    assert!(log_likelihood.is_finite());
    assert!((log_likelihood - msc.recompute_log_likelihood()).abs() < 1e-9);
}
