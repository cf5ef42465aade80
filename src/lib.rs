//! Query and transform YAML and JSON documents with path expressions such as
//! `.a.b[2] | select(. == "cat")`.
//!
//! Documents are loaded into an [`document::Arena`]; expressions are parsed once
//! with [`query::parse_path`] and evaluated against any number of documents with
//! [`query::evaluate`]. Every result is a [`document::Candidate`] that remembers
//! which document and which path it was found at.

pub mod document;
pub mod error;
pub mod format;
pub mod output;
pub mod parser;
pub mod query;
