//! Configurable reader for Newick gene trees and extended-Newick networks.

use crate::error::ModelError;
use crate::model::gene_tree::{GeneIndex, GeneTree};
use crate::model::network::{Network, NodeIndex};
use crate::model::network_builder::NetworkBuilder;
use crate::model::taxon_map::TaxonMap;
use crate::newick::defs::{
    DEFAULT_GAMMA, DEFAULT_HEIGHT_TOLERANCE, GAMMA_KEY, HYBRID_MARKER, NEWICK_LABEL_DELIMITERS,
};
use crate::parser::byte_parser::ByteParser;
use crate::parser::byte_source::ByteSource;
use crate::parser::parsing_error::ParsingError;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// One vertex as written in the Newick string, before interpretation.
#[derive(Debug, Clone)]
struct ParsedVertex {
    label: Option<String>,
    gamma: Option<f64>,
    branch_length: Option<f64>,
    children: Vec<usize>,
}

impl ParsedVertex {
    /// Returns the hybrid key (`#H1` of `name#H1`), if this vertex is a reticulation occurrence.
    fn hybrid_key(&self) -> Option<&str> {
        let label = self.label.as_deref()?;
        label.find(HYBRID_MARKER).map(|start| &label[start..])
    }
}

// =#========================================================================#=
// NEWICK PARSER
// =#========================================================================#=
/// Parser (configuration) for gene trees in Newick and networks in extended Newick.
///
/// Node heights are derived from branch lengths: the vertex farthest from the root
/// gets height zero. Every vertex except the root needs a branch length.
///
/// # Networks
/// A reticulation node appears twice, marked with the same hybrid label `#H<n>`
/// (optionally prefixed by a name). One occurrence carries the single child, the
/// other is empty. The parent of the occurrence written first owns the left edge.
/// An annotation `[&gamma=x]` on an occurrence gives the inheritance probability of
/// that occurrence's edge; without one, the configured default is used.
///
/// # Configuration
/// * `with_default_gamma(gamma)` - Inheritance probability of unannotated reticulations (0.5)
/// * `with_height_tolerance(tolerance)` - Allowed height disagreement between the two
///   occurrences of a reticulation before a warning is logged
///
/// # Example
/// ```
/// use reticulate::newick::NewickParser;
/// use reticulate::parser::ByteParser;
///
/// let mut parser = NewickParser::new().with_default_gamma(0.3);
/// let mut bytes = ByteParser::from_str("((A:1,(B:0.4)#H1:0.6):2,(#H1:1.6,C:2):1);");
/// let network = parser.parse_network(&mut bytes).unwrap();
/// assert_eq!(network.num_reticulations(), 1);
/// assert_eq!(network.height(network.root_index()), 3.0);
/// ```
#[derive(Debug, Clone)]
pub struct NewickParser {
    default_gamma: f64,
    height_tolerance: f64,
    vertices: Vec<ParsedVertex>,
}

impl Default for NewickParser {
    fn default() -> Self {
        Self::new()
    }
}

impl NewickParser {
    /// Creates a new `NewickParser` with default settings.
    pub fn new() -> Self {
        Self {
            default_gamma: DEFAULT_GAMMA,
            height_tolerance: DEFAULT_HEIGHT_TOLERANCE,
            vertices: Vec::new(),
        }
    }

    /// Sets the inheritance probability used for reticulations without annotation.
    pub fn with_default_gamma(mut self, gamma: f64) -> Self {
        self.default_gamma = gamma;
        self
    }

    /// Sets how far the heights of the two occurrences of a reticulation may differ.
    pub fn with_height_tolerance(mut self, tolerance: f64) -> Self {
        self.height_tolerance = tolerance;
        self
    }

    /// Parses one network terminated by `;`.
    ///
    /// # Errors
    /// * [ModelError::Parsing] - If the string is not valid extended Newick
    /// * [ModelError::InvalidNetwork] - If it does not describe a valid network
    pub fn parse_network<S: ByteSource>(&mut self, parser: &mut ByteParser<S>) -> Result<Network, ModelError> {
        let root = self.parse_tree(parser)?;
        let heights = self.heights(root);
        let network = NetworkAssembly::new(&self.vertices, &heights, self.height_tolerance)
            .assemble(root, self.default_gamma)?;
        debug!(
            nodes = network.num_nodes(),
            reticulations = network.num_reticulations(),
            "parsed network"
        );
        Ok(network)
    }

    /// Parses one binary gene tree terminated by `;`, registering its leaf labels in `taxa`.
    ///
    /// # Errors
    /// * [ModelError::Parsing] - If the string is not valid Newick
    /// * [ModelError::InvalidGeneTree] - If the tree is not binary, has fewer than two
    ///   leaves or repeats a leaf label
    pub fn parse_gene_tree<S: ByteSource>(
        &mut self,
        parser: &mut ByteParser<S>,
        taxa: &mut TaxonMap,
    ) -> Result<GeneTree, ModelError> {
        let root = self.parse_tree(parser)?;
        let heights = self.heights(root);

        let num_leaves = self.vertices.iter().filter(|v| v.children.is_empty()).count();
        if num_leaves < 2 {
            return Err(ModelError::InvalidGeneTree(format!("{num_leaves} leaves, need at least two")));
        }

        let mut tree = GeneTree::new(num_leaves);
        let mut gene_index: Vec<GeneIndex> = Vec::with_capacity(self.vertices.len());
        let mut seen = HashSet::with_capacity(num_leaves);

        for (v, vertex) in self.vertices.iter().enumerate() {
            let index = match vertex.children.as_slice() {
                [] => {
                    let label = vertex.label.as_deref().unwrap_or_default();
                    if label.is_empty() || !seen.insert(label) {
                        return Err(ModelError::InvalidGeneTree(format!(
                            "leaf label '{label}' missing or repeated"
                        )));
                    }
                    tree.add_leaf(heights[v], taxa.get_or_insert(label))
                }
                &[left, right] => {
                    let children = (gene_index[left], gene_index[right]);
                    if v == root {
                        tree.add_root(children, heights[v])
                    } else {
                        tree.add_internal_node(children, heights[v])
                    }
                }
                other => {
                    return Err(ModelError::InvalidGeneTree(format!(
                        "vertex with {} children, gene trees must be binary",
                        other.len()
                    )));
                }
            };
            gene_index.push(index);
        }

        Ok(tree)
    }

    /// Parses gene trees until the end of input.
    ///
    /// # Errors
    /// See [NewickParser::parse_gene_tree].
    pub fn parse_all_gene_trees<S: ByteSource>(
        &mut self,
        parser: &mut ByteParser<S>,
        taxa: &mut TaxonMap,
    ) -> Result<Vec<GeneTree>, ModelError> {
        let mut trees = Vec::new();
        loop {
            parser.skip_comment_and_whitespace()?;
            if parser.is_eof() {
                break;
            }
            trees.push(self.parse_gene_tree(parser, taxa)?);
        }
        debug!(count = trees.len(), "parsed gene trees");
        Ok(trees)
    }
}

// ============================================================================
// Syntax
// ============================================================================
impl NewickParser {
    /// Parses one `vertex ';'` into the vertex arena (children before parents) and
    /// returns the index of the root.
    fn parse_tree<S: ByteSource>(&mut self, parser: &mut ByteParser<S>) -> Result<usize, ParsingError> {
        self.vertices.clear();

        parser.skip_comment_and_whitespace()?;
        if parser.is_eof() {
            return Err(ParsingError::unexpected_eof(parser));
        }
        let root = self.parse_vertex(parser, true)?;

        parser.skip_comment_and_whitespace()?;
        if !parser.consume_if(b';') {
            let next_char = parser.peek().map(char::from);
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected ';' at end of tree but found {:?}", next_char),
            ));
        }

        Ok(root)
    }

    /// Parses `['(' vertex (',' vertex)* ')'] [label] [annotation] [':' length [annotation]]`.
    fn parse_vertex<S: ByteSource>(&mut self, parser: &mut ByteParser<S>, is_root: bool) -> Result<usize, ParsingError> {
        parser.skip_comment_and_whitespace()?;

        let mut children = Vec::new();
        if parser.consume_if(b'(') {
            loop {
                children.push(self.parse_vertex(parser, false)?);
                parser.skip_comment_and_whitespace()?;
                if parser.consume_if(b',') {
                    continue;
                }
                if parser.consume_if(b')') {
                    break;
                }
                return Err(match parser.peek() {
                    None => ParsingError::unexpected_eof(parser),
                    Some(b) => ParsingError::invalid_newick_string(
                        parser,
                        format!("Expected ',' or ')' after child but found {:?}", char::from(b)),
                    ),
                });
            }
        }

        let label = self.parse_vertex_label(parser)?;
        let mut gamma = self.parse_annotations(parser)?;
        let branch_length = self.parse_branch_length(parser)?;
        if branch_length.is_some() {
            gamma = self.parse_annotations(parser)?.or(gamma);
        }

        if branch_length.is_none() && !is_root {
            return Err(ParsingError::missing_branch_length(parser));
        }

        self.vertices.push(ParsedVertex {
            label,
            gamma,
            branch_length,
            children,
        });
        Ok(self.vertices.len() - 1)
    }

    /// Parses an optional (quoted or unquoted) label directly after a leaf start or `)`.
    fn parse_vertex_label<S: ByteSource>(&mut self, parser: &mut ByteParser<S>) -> Result<Option<String>, ParsingError> {
        parser.skip_whitespace();
        let label = if parser.peek() == Some(b'\'') {
            parser.parse_quoted_label()?
        } else {
            parser.parse_unquoted_label(NEWICK_LABEL_DELIMITERS)
        };
        Ok((!label.is_empty()).then_some(label))
    }

    /// Parses an annotation block `[&key=value,...]` if present and returns its γ.
    ///
    /// Keys other than `gamma` are accepted and ignored. A `[` without `&` is a
    /// regular comment and left for the caller to skip.
    fn parse_annotations<S: ByteSource>(&mut self, parser: &mut ByteParser<S>) -> Result<Option<f64>, ParsingError> {
        parser.skip_whitespace();
        if !parser.consume_if_sequence(b"[&") {
            return Ok(None);
        }

        let mut gamma = None;
        loop {
            let key = parser.parse_unquoted_label(b"=,]");
            if key.is_empty() {
                return Err(ParsingError::invalid_annotation(parser, "Empty annotation key".to_string()));
            }
            if !parser.consume_if(b'=') {
                return Err(ParsingError::invalid_annotation(parser, format!("Expected '=' after key '{key}'")));
            }

            let value = parser.parse_unquoted_label(b",]");
            if key.trim().eq_ignore_ascii_case(GAMMA_KEY) {
                let parsed: f64 = value.trim().parse().map_err(|_| {
                    ParsingError::invalid_annotation(parser, format!("Invalid inheritance probability: {value}"))
                })?;
                gamma = Some(parsed);
            }

            if parser.consume_if(b',') {
                continue;
            }
            if parser.consume_if(b']') {
                break;
            }
            return Err(ParsingError::unclosed_comment(parser));
        }

        Ok(gamma)
    }

    /// Parses optional branch length `[:number]`:
    /// - Skips comments/whitespace before and after `:`
    /// - Supports scientific notation (e.g., `1.5e-10`)
    fn parse_branch_length<S: ByteSource>(&mut self, parser: &mut ByteParser<S>) -> Result<Option<f64>, ParsingError> {
        parser.skip_comment_and_whitespace()?;
        if !parser.consume_if(b':') {
            return Ok(None);
        }
        parser.skip_comment_and_whitespace()?;

        let mut branch_length_str = String::new();
        while let Some(b) = parser.peek() {
            if b.is_ascii_digit() || b == b'.' || b == b'-' || b == b'+' || b == b'e' || b == b'E' {
                branch_length_str.push(b as char);
                parser.next_byte();
            } else {
                break;
            }
        }

        let value: f64 = branch_length_str.parse().map_err(|_| {
            ParsingError::invalid_newick_string(parser, format!("Invalid branch length: {}", branch_length_str))
        })?;
        if !(value.is_finite() && value >= 0.0) {
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Branch length must be finite and non-negative: {value}"),
            ));
        }
        Ok(Some(value))
    }

    /// Heights of all parsed vertices; the deepest vertex sits at zero.
    fn heights(&self, root: usize) -> Vec<f64> {
        let mut depths = vec![0.0; self.vertices.len()];
        // Parents come after their children in the arena
        for v in (0..=root).rev() {
            for &child in &self.vertices[v].children {
                depths[child] = depths[v] + self.vertices[child].branch_length.unwrap_or_default();
            }
        }

        let max_depth = depths.iter().copied().fold(0.0, f64::max);
        depths.into_iter().map(|depth| max_depth - depth).collect()
    }
}

// =#========================================================================#=
// NETWORK ASSEMBLY
// =#========================================================================#=
/// Both occurrences of one hybrid label, in string order.
#[derive(Debug, Clone, Copy)]
struct HybridOccurrences {
    first: usize,
    second: usize,
}

/// Turns the vertex arena of an extended Newick string into a [Network].
struct NetworkAssembly<'a> {
    vertices: &'a [ParsedVertex],
    heights: &'a [f64],
    height_tolerance: f64,
    builder: NetworkBuilder,
    hybrids: HashMap<&'a str, HybridOccurrences>,
    parse_parent: Vec<Option<usize>>,
    built: Vec<Option<NodeIndex>>,
    in_progress: HashSet<&'a str>,
}

impl<'a> NetworkAssembly<'a> {
    fn new(vertices: &'a [ParsedVertex], heights: &'a [f64], height_tolerance: f64) -> Self {
        let mut parse_parent = vec![None; vertices.len()];
        for (v, vertex) in vertices.iter().enumerate() {
            for &child in &vertex.children {
                parse_parent[child] = Some(v);
            }
        }

        Self {
            vertices,
            heights,
            height_tolerance,
            builder: NetworkBuilder::new(),
            hybrids: HashMap::new(),
            parse_parent,
            built: vec![None; vertices.len()],
            in_progress: HashSet::new(),
        }
    }

    fn assemble(mut self, root: usize, default_gamma: f64) -> Result<Network, ModelError> {
        self.collect_hybrids()?;
        self.build(root)?;

        let hybrids: Vec<_> = self.hybrids.values().copied().collect();
        for HybridOccurrences { first, second } in hybrids {
            let first_gamma = match (self.vertices[first].gamma, self.vertices[second].gamma) {
                (Some(gamma), Some(other)) if (gamma + other - 1.0).abs() > 1e-6 => {
                    warn!(first = gamma, second = other, "inheritance probabilities do not sum to one");
                    gamma
                }
                (Some(gamma), _) => gamma,
                (None, Some(other)) => 1.0 - other,
                (None, None) => default_gamma,
            };

            let Some(reticulation) = self.built[first] else {
                return Err(invalid("reticulation not reachable from the root"));
            };
            let first_parent = self.parse_parent[first].and_then(|parent| self.built[parent]);
            let left_parent = self.builder.parents_of(reticulation).first().copied();
            let gamma = if first_parent == left_parent { first_gamma } else { 1.0 - first_gamma };
            self.builder.set_gamma(reticulation, gamma);
        }

        self.builder.build()
    }

    /// Pairs up the occurrences of every hybrid label.
    fn collect_hybrids(&mut self) -> Result<(), ModelError> {
        let vertices = self.vertices;
        let mut occurrences: HashMap<&'a str, Vec<usize>> = HashMap::new();
        for (v, vertex) in vertices.iter().enumerate() {
            if let Some(key) = vertex.hybrid_key() {
                occurrences.entry(key).or_default().push(v);
            }
        }

        for (key, found) in occurrences {
            let &[first, second] = found.as_slice() else {
                return Err(invalid(&format!("hybrid {key} occurs {} times, expected twice", found.len())));
            };
            let filled: Vec<usize> = [first, second]
                .into_iter()
                .filter(|&v| !vertices[v].children.is_empty())
                .collect();
            let &[filled] = filled.as_slice() else {
                return Err(invalid(&format!("exactly one occurrence of hybrid {key} must have a child")));
            };
            if vertices[filled].children.len() != 1 {
                return Err(invalid(&format!(
                    "hybrid {key} has {} children, expected one",
                    vertices[filled].children.len()
                )));
            }

            let difference = (self.heights[first] - self.heights[second]).abs();
            if difference > self.height_tolerance {
                warn!(hybrid = key, difference, "occurrences of hybrid disagree on height");
            }
            self.hybrids.insert(key, HybridOccurrences { first, second });
        }

        Ok(())
    }

    /// Adds vertex `v` and everything below it to the builder.
    fn build(&mut self, v: usize) -> Result<NodeIndex, ModelError> {
        if let Some(index) = self.built[v] {
            return Ok(index);
        }

        let vertices = self.vertices;
        let vertex = &vertices[v];
        let index = match vertex.hybrid_key() {
            Some(key) => self.build_reticulation(key)?,
            None => match vertex.children.as_slice() {
                [] => {
                    let label = vertex.label.as_deref().unwrap_or_default();
                    self.builder.add_leaf(label, self.heights[v])
                }
                &[left, right] => {
                    let children = (self.build(left)?, self.build(right)?);
                    let index = self.builder.add_speciation(children, self.heights[v]);
                    if let Some(label) = &vertex.label {
                        self.builder.set_label(index, label);
                    }
                    index
                }
                other => {
                    return Err(invalid(&format!(
                        "vertex with {} children is neither leaf, speciation nor reticulation",
                        other.len()
                    )));
                }
            },
        };

        self.built[v] = Some(index);
        Ok(index)
    }

    fn build_reticulation(&mut self, key: &'a str) -> Result<NodeIndex, ModelError> {
        let HybridOccurrences { first, second } = self.hybrids[key];
        if let Some(index) = self.built[first].or(self.built[second]) {
            return Ok(index);
        }
        if !self.in_progress.insert(key) {
            return Err(invalid(&format!("hybrid {key} lies below itself")));
        }

        let vertices = self.vertices;
        let filled = if vertices[first].children.is_empty() { second } else { first };
        let child = self.build(vertices[filled].children[0])?;
        let index = self.builder.add_reticulation(child, self.heights[first], DEFAULT_GAMMA);
        if let Some(label) = &vertices[first].label {
            self.builder.set_label(index, label);
        }

        self.built[first] = Some(index);
        self.built[second] = Some(index);
        self.in_progress.remove(key);
        Ok(index)
    }
}

fn invalid(msg: &str) -> ModelError {
    ModelError::InvalidNetwork(msg.to_string())
}
