pub mod json;
pub mod yaml;

use crate::document::{Arena, NodeId};
use crate::error::TreeqError;
use crate::format::Format;

/// Parse input text into the arena, returning one document node per document
/// in the input.
pub fn parse(input: &str, format: Format, arena: &mut Arena) -> Result<Vec<NodeId>, TreeqError> {
    match format {
        Format::Yaml => yaml::parse(input, arena),
        Format::Json => json::parse(input, arena),
    }
}
