use std::collections::HashSet;

use serde_json::{Map, Number, Value};

use crate::document::node::{TAG_BOOL, TAG_FLOAT, TAG_INT, TAG_NULL};
use crate::document::{Arena, NodeId, NodeKind};
use crate::error::TreeqError;

/// Convert a node to a JSON value. Aliases are expanded in place; an alias that
/// leads back into its own ancestry is an `AliasCycle`.
pub fn to_value(arena: &Arena, id: NodeId) -> Result<Value, TreeqError> {
    convert(arena, id, &mut HashSet::new())
}

fn convert(arena: &Arena, id: NodeId, on_path: &mut HashSet<NodeId>) -> Result<Value, TreeqError> {
    let node = arena.get(id);
    match &node.kind {
        NodeKind::Document(root) => convert(arena, *root, on_path),
        NodeKind::Alias(target) => {
            if !on_path.insert(id) {
                return Err(TreeqError::AliasCycle(id.to_string()));
            }
            let value = convert(arena, *target, on_path);
            on_path.remove(&id);
            value
        }
        NodeKind::Scalar(text) => Ok(scalar_value(&node.tag, text)),
        NodeKind::Sequence(items) => {
            if !on_path.insert(id) {
                return Err(TreeqError::AliasCycle(id.to_string()));
            }
            let mut values = Vec::with_capacity(items.len());
            for &item in items {
                values.push(convert(arena, item, on_path)?);
            }
            on_path.remove(&id);
            Ok(Value::Array(values))
        }
        NodeKind::Mapping(pairs) => {
            if !on_path.insert(id) {
                return Err(TreeqError::AliasCycle(id.to_string()));
            }
            let mut map = Map::new();
            for &(key, value) in pairs {
                let key = match convert(arena, key, on_path)? {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                map.insert(key, convert(arena, value, on_path)?);
            }
            on_path.remove(&id);
            Ok(Value::Object(map))
        }
    }
}

fn scalar_value(tag: &str, text: &str) -> Value {
    match tag {
        TAG_NULL => Value::Null,
        TAG_BOOL => Value::Bool(text.eq_ignore_ascii_case("true")),
        TAG_INT => parse_int(text)
            .map(|n| Value::Number(n.into()))
            .unwrap_or_else(|| Value::String(text.to_string())),
        TAG_FLOAT => text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(text.to_string())),
        _ => Value::String(text.to_string()),
    }
}

fn parse_int(text: &str) -> Option<i64> {
    if let Some(hex) = text.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Some(octal) = text.strip_prefix("0o") {
        return i64::from_str_radix(octal, 8).ok();
    }
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Node, NodeKind};
    use serde_json::json;

    #[test]
    fn scalars_follow_tags() {
        let mut arena = Arena::new();
        let items = vec![
            arena.integer(5),
            arena.scalar(TAG_INT, "0x10"),
            arena.scalar(TAG_FLOAT, "1.5"),
            arena.boolean(true),
            arena.null(),
            arena.string("5"),
        ];
        let seq = arena.sequence(items);
        assert_eq!(
            to_value(&arena, seq).unwrap(),
            json!([5, 16, 1.5, true, null, "5"])
        );
    }

    #[test]
    fn aliases_are_expanded() {
        let mut arena = Arena::new();
        let x = arena.string("x");
        let one = arena.integer(1);
        let base = arena.mapping(vec![(x, one)]);
        let alias = arena.alloc(Node::new(NodeKind::Alias(base), ""));
        let k1 = arena.string("base");
        let k2 = arena.string("copy");
        let root = arena.mapping(vec![(k1, base), (k2, alias)]);
        assert_eq!(
            to_value(&arena, root).unwrap(),
            json!({"base": {"x": 1}, "copy": {"x": 1}})
        );
    }

    #[test]
    fn self_referencing_alias_is_a_cycle() {
        let mut arena = Arena::new();
        let key = arena.string("me");
        let map = arena.mapping(vec![]);
        let alias = arena.alloc(Node::new(NodeKind::Alias(map), ""));
        if let NodeKind::Mapping(pairs) = &mut arena.get_mut(map).kind {
            pairs.push((key, alias));
        }
        assert!(matches!(to_value(&arena, map), Err(TreeqError::AliasCycle(_))));
    }
}
