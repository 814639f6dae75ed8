//! Basic low-level byte parser functionality.
//!
//! The Newick readers in [crate::newick] are built on [ByteParser]; syntax errors are
//! reported as [ParsingError] with position and context.

pub mod byte_parser;
pub mod byte_source;
pub mod parsing_error;

pub use byte_parser::ByteParser;
pub use byte_source::{ByteSource, InMemoryByteSource};
pub use parsing_error::{ParsingError, ParsingErrorType};
