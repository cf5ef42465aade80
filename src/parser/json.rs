use serde_json::Value;

use crate::document::node::{TAG_FLOAT, TAG_INT};
use crate::document::{Arena, NodeId};
use crate::error::TreeqError;

/// Parse a JSON stream into the arena. Several top-level values separated by
/// whitespace become several documents.
pub fn parse(input: &str, arena: &mut Arena) -> Result<Vec<NodeId>, TreeqError> {
    let mut documents = Vec::new();
    for value in serde_json::Deserializer::from_str(input).into_iter::<Value>() {
        let value = value.map_err(|e| TreeqError::DocumentParse(e.to_string()))?;
        let root = load_value(&value, arena);
        documents.push(arena.document(root));
    }
    Ok(documents)
}

fn load_value(value: &Value, arena: &mut Arena) -> NodeId {
    match value {
        Value::Null => arena.null(),
        Value::Bool(b) => arena.boolean(*b),
        Value::Number(n) if n.is_i64() || n.is_u64() => arena.scalar(TAG_INT, n.to_string()),
        Value::Number(n) => arena.scalar(TAG_FLOAT, n.to_string()),
        Value::String(s) => arena.string(s.as_str()),
        Value::Array(items) => {
            let items = items.iter().map(|item| load_value(item, arena)).collect();
            arena.sequence(items)
        }
        Value::Object(map) => {
            let pairs = map
                .iter()
                .map(|(k, v)| {
                    let key = arena.string(k.as_str());
                    (key, load_value(v, arena))
                })
                .collect();
            arena.mapping(pairs)
        }
    }
}
