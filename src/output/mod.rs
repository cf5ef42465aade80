pub mod json;
pub mod yaml;

use crate::document::{Arena, NodeId};
use crate::error::TreeqError;
use crate::format::Format;

/// Format a node as a string in the given format. YAML output always ends with
/// a newline; JSON output never does.
pub fn format_node(arena: &Arena, node: NodeId, format: Format, compact: bool) -> Result<String, TreeqError> {
    match format {
        Format::Json => format_json(arena, node, compact),
        Format::Yaml => yaml::to_yaml(arena, node),
    }
}

fn format_json(arena: &Arena, node: NodeId, compact: bool) -> Result<String, TreeqError> {
    let value = json::to_value(arena, node)?;
    let result = if compact {
        serde_json::to_string(&value)
    } else {
        serde_json::to_string_pretty(&value)
    };
    result.map_err(|e| TreeqError::DocumentParse(e.to_string()))
}
