//! Errors raised while assembling a model.
//!
//! Evaluation itself never returns errors: incompatible embeddings surface as `None`
//! or a log-likelihood of negative infinity, and broken invariants panic.

use crate::parser::parsing_error::ParsingError;
use thiserror::Error;

/// Errors raised while constructing networks, gene trees, taxon maps and likelihoods.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    #[error("Invalid gene tree: {0}")]
    InvalidGeneTree(String),

    #[error("Unknown species '{0}'")]
    UnknownSpecies(String),

    #[error("Gene leaf '{0}' is not assigned to a species")]
    UnassignedGeneLeaf(String),

    #[error("Gene leaf '{0}' is assigned to two species")]
    DuplicateAssignment(String),

    #[error("Gene tree {0} cannot be embedded in the network")]
    NoValidEmbedding(usize),

    #[error("Expected {expected} population sizes, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Parsing(#[from] ParsingError),
}
