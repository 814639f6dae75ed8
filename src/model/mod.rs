/// Species network structure and operations
pub mod network;
/// Species network node types (leaf, speciation, reticulation) and branch addressing
pub mod network_node;
/// Bottom-up network construction
pub mod network_builder;
/// Gene tree structure and operations
pub mod gene_tree;
/// Gene tree node types (root, internal, leaf)
pub mod gene_node;
/// Gene leaf labels and their assignment to species
pub mod taxon_map;
