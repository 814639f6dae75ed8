//! Newick readers for gene trees and extended-Newick readers for networks.
//!
//! This module provides [NewickParser] to read Newick strings into [GeneTree]s and
//! extended Newick strings into [Network]s. Heights are derived from branch lengths.
//!
//! # Quick API
//! For simple use cases with default settings:
//! * [`parse_network`] - parses a single network string
//! * [`parse_gene_tree`] - parses a single gene tree string
//! * [`parse_gene_tree_file`] - parses all gene trees in a file
//!
//! # Full API
//! For more control, configure a [NewickParser] and provide data via a [ByteParser]:
//! * [`NewickParser::parse_network`] - parse a single network
//! * [`NewickParser::parse_gene_tree`] - parse a single gene tree
//! * [`NewickParser::parse_all_gene_trees`] - parse all gene trees until EOF
//!
//! # Format
//! * `tree ::= vertex ';'`
//! * `vertex ::= ['(' vertex (',' vertex)* ')'] [label] [annotation] [':' number]`
//! * `annotation ::= '[&' key '=' value (',' key '=' value)* ']'`
//!
//! Furthermore:
//! * Whitespace can occur between elements,
//!   just not within an unquoted label or a branch length
//! * Comments are square brackets without `&` and can occur anywhere where
//!   whitespace is allowed
//! * Gene trees must be binary
//! * Network vertices have zero (leaf), one (reticulation occurrence) or two
//!   (speciation) children; reticulation labels contain `#H`, e.g.
//!   `((A:1,(B:0.4)#H1[&gamma=0.3]:0.6):2,(#H1:1.6,C:2):1);`

mod defs;
pub mod parser;

pub use parser::NewickParser;

use crate::error::ModelError;
use crate::model::gene_tree::GeneTree;
use crate::model::network::Network;
use crate::model::taxon_map::TaxonMap;
use crate::parser::byte_parser::ByteParser;
use crate::parser::byte_source::InMemoryByteSource;
use crate::parser::ParsingError;
use std::path::Path;

// ============================================================================
// QUICK PARSING API (pub)
// ============================================================================
/// Parses a single extended Newick string into a [Network].
///
/// # Example
/// ```
/// use reticulate::newick::parse_network;
///
/// let network = parse_network("((A:1,(B:0.4)#H1[&gamma=0.3]:0.6):2,(#H1:1.6,C:2):1);").unwrap();
/// assert_eq!(network.num_leaves(), 3);
/// assert_eq!(network.branch_count(), 8);
/// ```
pub fn parse_network<S: AsRef<str>>(newick: S) -> Result<Network, ModelError> {
    let mut byte_parser = ByteParser::from_str(newick.as_ref());
    NewickParser::new().parse_network(&mut byte_parser)
}

/// Parses a single Newick string into a [GeneTree], registering its leaf labels in `taxa`.
///
/// # Example
/// ```
/// use reticulate::model::taxon_map::TaxonMap;
/// use reticulate::newick::parse_gene_tree;
///
/// let mut taxa = TaxonMap::new(3);
/// let tree = parse_gene_tree("((a1:0.5,a2:0.5):1,b1:1.5);", &mut taxa).unwrap();
/// assert_eq!(tree.num_leaves(), 3);
/// assert_eq!(tree.tree_height(), 1.5);
/// ```
pub fn parse_gene_tree<S: AsRef<str>>(newick: S, taxa: &mut TaxonMap) -> Result<GeneTree, ModelError> {
    let mut byte_parser = ByteParser::from_str(newick.as_ref());
    NewickParser::new().parse_gene_tree(&mut byte_parser, taxa)
}

/// Parses a file of semicolon-terminated Newick gene trees.
///
/// # Arguments
/// * `path` - Path to the file (accepting `&str`, `String`, `Path`, or `PathBuf`)
/// * `taxa` - Map the leaf labels of all trees are registered in
///
/// # Errors
/// [ModelError::Parsing] if the file cannot be read or is not valid Newick, otherwise
/// see [NewickParser::parse_gene_tree].
pub fn parse_gene_tree_file<P: AsRef<Path>>(path: P, taxa: &mut TaxonMap) -> Result<Vec<GeneTree>, ModelError> {
    let source = InMemoryByteSource::from_file(path).map_err(ParsingError::from)?;
    let mut byte_parser = ByteParser::new(source);
    NewickParser::new().parse_all_gene_trees(&mut byte_parser, taxa)
}
