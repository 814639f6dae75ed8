//! Constants of the (extended) Newick format.

/// Newick label delimiters: parentheses, brackets, comma, colon, semicolon, whitespace
pub(crate) const NEWICK_LABEL_DELIMITERS: &[u8] = b"()[],:; \n\t\r";

/// Marker of reticulation labels, e.g. `#H1` or `name#H1`
pub(crate) const HYBRID_MARKER: &str = "#H";

/// Annotation key of the inheritance probability
pub(crate) const GAMMA_KEY: &str = "gamma";

/// Inheritance probability of reticulations without annotation
pub(crate) const DEFAULT_GAMMA: f64 = 0.5;

/// Largest height disagreement between the two occurrences of a reticulation
/// that is accepted silently
pub(crate) const DEFAULT_HEIGHT_TOLERANCE: f64 = 1e-8;
