//! Structural merge (`lhs * rhs`).
//!
//! The right-hand tree is walked and every leaf it holds is written onto the
//! same path under the left-hand node, creating missing keys and extending
//! sequences along the way. Where the two trees disagree on the kind of a node,
//! the right-hand side wins.

use log::debug;

use crate::document::node::TAG_STR;
use crate::document::{Arena, NodeId, NodeKind, ResultSet};
use crate::error::TreeqError;

use super::ast::Expr;
use super::navigator::Navigator;
use super::traverse::Mode;

pub(crate) fn multiply(
    nav: &mut Navigator<'_>,
    input: &ResultSet,
    lhs: &Expr,
    rhs: &Expr,
) -> Result<ResultSet, TreeqError> {
    let max_depth = nav.options().max_depth;
    for candidate in input.iter() {
        let targets = nav.eval_one(candidate, lhs, Mode::Write)?;
        let sources = nav.eval_one(candidate, rhs, Mode::Read)?;
        let arena = nav.arena_mut();
        for target in targets.iter() {
            for source in sources.iter() {
                let target = arena.resolve(target.node)?;
                let source = arena.resolve(source.node)?;
                check_compatible(arena, target, source)?;
                debug!("merging {} into {}", source, target);
                merge_into(arena, target, source, 0, max_depth)?;
            }
        }
    }
    Ok(input.clone())
}

fn check_compatible(arena: &Arena, target: NodeId, source: NodeId) -> Result<(), TreeqError> {
    let lhs = arena.get(target);
    let rhs = arena.get(source);
    match (&lhs.kind, &rhs.kind) {
        (NodeKind::Mapping(_), NodeKind::Mapping(_)) | (NodeKind::Sequence(_), NodeKind::Sequence(_)) => {
            Ok(())
        }
        _ => Err(TreeqError::IncompatibleMerge {
            lhs: lhs.kind_name().to_string(),
            rhs: rhs.kind_name().to_string(),
        }),
    }
}

fn same_container_kind(arena: &Arena, a: NodeId, b: NodeId) -> bool {
    matches!(
        (&arena.get(a).kind, &arena.get(b).kind),
        (NodeKind::Mapping(_), NodeKind::Mapping(_)) | (NodeKind::Sequence(_), NodeKind::Sequence(_))
    )
}

/// Overlay `source` onto `target`. Both are already resolved past aliases.
fn merge_into(
    arena: &mut Arena,
    target: NodeId,
    source: NodeId,
    depth: usize,
    max_depth: usize,
) -> Result<(), TreeqError> {
    if depth > max_depth {
        return Err(TreeqError::DepthExceeded(max_depth));
    }
    if target == source {
        return Ok(());
    }
    if !same_container_kind(arena, target, source) {
        arena.overwrite(target, source);
        return Ok(());
    }

    match arena.get(source).kind.clone() {
        NodeKind::Mapping(pairs) => {
            for (key, value) in pairs {
                let text = arena.get(key).scalar_value().unwrap_or_default().to_string();
                let child = mapping_child(arena, target, &text);
                let value = arena.resolve(value)?;
                let child_content = arena.resolve(child)?;
                merge_into(arena, child_content, value, depth + 1, max_depth)?;
            }
        }
        NodeKind::Sequence(items) => {
            for (index, item) in items.into_iter().enumerate() {
                let child = sequence_child(arena, target, index);
                let item = arena.resolve(item)?;
                let child_content = arena.resolve(child)?;
                merge_into(arena, child_content, item, depth + 1, max_depth)?;
            }
        }
        _ => arena.overwrite(target, source),
    }
    Ok(())
}

/// Value under `key` in a mapping, appending `key: null` if it is missing.
fn mapping_child(arena: &mut Arena, map: NodeId, key: &str) -> NodeId {
    if let NodeKind::Mapping(pairs) = &arena.get(map).kind {
        let existing = pairs
            .iter()
            .find(|(k, _)| arena.get(*k).scalar_value() == Some(key))
            .map(|&(_, v)| v);
        if let Some(value) = existing {
            return value;
        }
    }
    let key_node = arena.scalar(TAG_STR, key);
    let value = arena.null();
    if let NodeKind::Mapping(pairs) = &mut arena.get_mut(map).kind {
        pairs.push((key_node, value));
    }
    value
}

/// Element `index` of a sequence, padding with nulls if it is short.
fn sequence_child(arena: &mut Arena, seq: NodeId, index: usize) -> NodeId {
    let length = match &arena.get(seq).kind {
        NodeKind::Sequence(items) => items.len(),
        _ => 0,
    };
    let fillers: Vec<NodeId> = (length..=index).map(|_| arena.null()).collect();
    match &mut arena.get_mut(seq).kind {
        NodeKind::Sequence(items) => {
            items.extend(fillers);
            items[index]
        }
        _ => seq,
    }
}
