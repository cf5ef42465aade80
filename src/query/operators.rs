//! Operator implementations dispatched by the navigator.

use std::collections::HashSet;

use log::debug;

use crate::document::node::TAG_NULL;
use crate::document::{Candidate, CandidateKey, NodeId, NodeKind, PathSegment, ResultSet, Style};
use crate::error::TreeqError;

use super::ast::Expr;
use super::merge;
use super::navigator::Navigator;
use super::operator::{BinaryOp, NullaryOp, UnaryOp};
use super::traverse::{traverse, Glob, Mode, Segment};

pub(crate) fn nullary(
    nav: &mut Navigator<'_>,
    input: &ResultSet,
    op: NullaryOp,
) -> Result<ResultSet, TreeqError> {
    match op {
        NullaryOp::Length => length(nav, input),
        NullaryOp::Not => not(nav, input),
        NullaryOp::RecursiveDescent => recursive_descent(nav, input),
        NullaryOp::GetStyle => get_style(nav, input),
        NullaryOp::DocumentFilter(index) => Ok(input
            .iter()
            .filter(|c| c.document == index)
            .cloned()
            .collect()),
    }
}

pub(crate) fn unary(
    nav: &mut Navigator<'_>,
    input: &ResultSet,
    op: UnaryOp,
    rhs: &Expr,
) -> Result<ResultSet, TreeqError> {
    match op {
        UnaryOp::Select => select(nav, input, rhs),
        UnaryOp::Count => count(nav, input, rhs),
        UnaryOp::Collect => collect(nav, input, rhs),
    }
}

pub(crate) fn binary(
    nav: &mut Navigator<'_>,
    input: &ResultSet,
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
) -> Result<ResultSet, TreeqError> {
    match op {
        BinaryOp::Or => boolean(nav, input, lhs, rhs, |l, r| l || r),
        BinaryOp::And => boolean(nav, input, lhs, rhs, |l, r| l && r),
        BinaryOp::Equals => equals(nav, input, lhs, rhs),
        BinaryOp::Assign => assign(nav, input, lhs, rhs),
        BinaryOp::AssignStyle => assign_style(nav, input, lhs, rhs),
        BinaryOp::DeleteChild => delete_child(nav, input, lhs, rhs),
        BinaryOp::CreateMap => create_map(nav, input, lhs, rhs),
        BinaryOp::Multiply => merge::multiply(nav, input, lhs, rhs),
        // composition operators are evaluated by the navigator itself
        BinaryOp::Pipe | BinaryOp::Union => Err(TreeqError::MalformedExpression(format!(
            "{op:?} reached the operator library"
        ))),
    }
}

fn length(nav: &mut Navigator<'_>, input: &ResultSet) -> Result<ResultSet, TreeqError> {
    let mut output = ResultSet::new();
    for candidate in input.iter() {
        let arena = nav.arena_mut();
        let node = arena.get(arena.resolve(candidate.node)?);
        let size = match &node.kind {
            NodeKind::Mapping(pairs) => pairs.len(),
            NodeKind::Sequence(items) => items.len(),
            NodeKind::Scalar(_) if node.tag == TAG_NULL => 0,
            NodeKind::Scalar(value) => value.chars().count(),
            NodeKind::Document(_) | NodeKind::Alias(_) => 0,
        };
        let result = arena.integer(size as i64);
        output.insert(candidate.derive(result));
    }
    Ok(output)
}

fn not(nav: &mut Navigator<'_>, input: &ResultSet) -> Result<ResultSet, TreeqError> {
    let mut output = ResultSet::new();
    for candidate in input.iter() {
        let arena = nav.arena_mut();
        let truthy = arena.is_truthy(candidate.node)?;
        let result = arena.boolean(!truthy);
        output.insert(candidate.derive(result));
    }
    Ok(output)
}

fn recursive_descent(nav: &mut Navigator<'_>, input: &ResultSet) -> Result<ResultSet, TreeqError> {
    let mut output = ResultSet::new();
    let mut on_path = HashSet::new();
    for candidate in input.iter() {
        descend(nav, candidate, &mut on_path, &mut output, 0)?;
    }
    Ok(output)
}

/// Pre-order walk. Alias nodes are emitted but not entered.
fn descend(
    nav: &mut Navigator<'_>,
    candidate: &Candidate,
    on_path: &mut HashSet<NodeId>,
    output: &mut ResultSet,
    depth: usize,
) -> Result<(), TreeqError> {
    let max_depth = nav.options().max_depth;
    if depth > max_depth {
        return Err(TreeqError::DepthExceeded(max_depth));
    }
    let arena = nav.arena();
    let node = arena.unwrap_document(candidate.node);
    let current = candidate.with_node(node);
    output.insert(current.clone());

    let children: Vec<Candidate> = match &arena.get(node).kind {
        NodeKind::Mapping(pairs) => pairs
            .iter()
            .map(|&(key, value)| {
                let text = arena.get(key).scalar_value().unwrap_or_default().to_string();
                current.child(value, PathSegment::Key(text))
            })
            .collect(),
        NodeKind::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, &item)| current.child(item, PathSegment::Index(i)))
            .collect(),
        _ => return Ok(()),
    };

    if !on_path.insert(node) {
        return Err(TreeqError::AliasCycle(node.to_string()));
    }
    for child in &children {
        descend(nav, child, on_path, output, depth + 1)?;
    }
    on_path.remove(&node);
    Ok(())
}

fn get_style(nav: &mut Navigator<'_>, input: &ResultSet) -> Result<ResultSet, TreeqError> {
    let mut output = ResultSet::new();
    for candidate in input.iter() {
        let arena = nav.arena_mut();
        let style = arena.get(arena.unwrap_document(candidate.node)).style;
        let result = arena.string(style.name());
        output.insert(candidate.derive(result));
    }
    Ok(output)
}

fn select(nav: &mut Navigator<'_>, input: &ResultSet, rhs: &Expr) -> Result<ResultSet, TreeqError> {
    let mut output = ResultSet::new();
    for candidate in input.iter() {
        let decision = nav.eval_one(candidate, rhs, Mode::Read)?;
        let keep = match decision.first() {
            Some(first) => nav.arena().is_truthy(first.node)?,
            None => false,
        };
        if keep {
            output.insert(candidate.clone());
        }
    }
    Ok(output)
}

fn count(nav: &mut Navigator<'_>, input: &ResultSet, rhs: &Expr) -> Result<ResultSet, TreeqError> {
    let mut output = ResultSet::new();
    for candidate in input.iter() {
        let matches = nav.eval_one(candidate, rhs, Mode::Read)?;
        let result = nav.arena_mut().integer(matches.len() as i64);
        output.insert(candidate.derive(result));
    }
    Ok(output)
}

/// The candidate a manufactured collection is reported at: the first input, or
/// the root of document 0 when there is no input.
fn anchor_for(input: &ResultSet, node: NodeId) -> Candidate {
    match input.first() {
        Some(first) => first.derive(node),
        None => Candidate::root(node, 0).derive(node),
    }
}

fn collect(nav: &mut Navigator<'_>, input: &ResultSet, rhs: &Expr) -> Result<ResultSet, TreeqError> {
    let collected = nav.eval(input, rhs, Mode::Read)?;
    let arena = nav.arena_mut();
    let items = collected
        .iter()
        .map(|c| arena.unwrap_document(c.node))
        .collect();
    let sequence = arena.sequence(items);
    Ok(ResultSet::singleton(anchor_for(input, sequence)))
}

fn create_map(
    nav: &mut Navigator<'_>,
    input: &ResultSet,
    lhs: &Expr,
    rhs: &Expr,
) -> Result<ResultSet, TreeqError> {
    let keys = nav.eval(input, lhs, Mode::Read)?;
    let values = nav.eval(input, rhs, Mode::Read)?;
    let arena = nav.arena_mut();
    let mut fragments = Vec::with_capacity(keys.len() * values.len());
    for key in keys.iter() {
        for value in values.iter() {
            let pair = (arena.unwrap_document(key.node), arena.unwrap_document(value.node));
            fragments.push(arena.mapping(vec![pair]));
        }
    }
    let sequence = arena.sequence(fragments);
    Ok(ResultSet::singleton(anchor_for(input, sequence)))
}

fn boolean(
    nav: &mut Navigator<'_>,
    input: &ResultSet,
    lhs: &Expr,
    rhs: &Expr,
    combine: fn(bool, bool) -> bool,
) -> Result<ResultSet, TreeqError> {
    let mut output = ResultSet::new();
    for candidate in input.iter() {
        let left = nav.eval_one(candidate, lhs, Mode::Read)?;
        let right = nav.eval_one(candidate, rhs, Mode::Read)?;
        for l in left.iter() {
            let l_truthy = nav.arena().is_truthy(l.node)?;
            for r in right.iter() {
                let r_truthy = nav.arena().is_truthy(r.node)?;
                let result = nav.arena_mut().boolean(combine(l_truthy, r_truthy));
                output.insert(candidate.derive(result));
            }
        }
    }
    Ok(output)
}

/// Text a scalar is compared by. Nulls compare as `null` whatever their spelling.
fn comparable_text(nav: &Navigator<'_>, node: NodeId) -> Option<String> {
    let node = nav.arena().get(node);
    if node.is_null() {
        return Some("null".to_string());
    }
    node.scalar_value().map(str::to_string)
}

fn equals(
    nav: &mut Navigator<'_>,
    input: &ResultSet,
    lhs: &Expr,
    rhs: &Expr,
) -> Result<ResultSet, TreeqError> {
    let mut output = ResultSet::new();
    for candidate in input.iter() {
        let left = nav.eval_one(candidate, lhs, Mode::Read)?;
        let right = nav.eval_one(candidate, rhs, Mode::Read)?;

        let mut patterns = Vec::with_capacity(right.len());
        for pattern in right.iter() {
            let resolved = nav.arena().resolve(pattern.node)?;
            patterns.extend(comparable_text(nav, resolved));
        }

        let mut values = Vec::new();
        for value in left.iter() {
            let resolved = nav.arena().resolve(value.node)?;
            match &nav.arena().get(resolved).kind {
                NodeKind::Scalar(_) => values.extend(comparable_text(nav, resolved)),
                NodeKind::Mapping(pairs) => {
                    for &(_, child) in pairs {
                        let child = nav.arena().resolve(child)?;
                        values.extend(comparable_text(nav, child));
                    }
                }
                NodeKind::Sequence(items) => {
                    for &item in items {
                        let item = nav.arena().resolve(item)?;
                        values.extend(comparable_text(nav, item));
                    }
                }
                NodeKind::Document(_) | NodeKind::Alias(_) => {}
            }
        }

        let globs = patterns
            .iter()
            .map(|pattern| Glob::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        let matched = values
            .iter()
            .any(|value| globs.iter().any(|glob| glob.is_match(value)));
        let result = nav.arena_mut().boolean(matched);
        output.insert(candidate.derive(result));
    }
    Ok(output)
}

fn assign(
    nav: &mut Navigator<'_>,
    input: &ResultSet,
    lhs: &Expr,
    rhs: &Expr,
) -> Result<ResultSet, TreeqError> {
    let targets = nav.eval(input, lhs, Mode::Write)?;
    for target in targets.iter() {
        let replacement = nav.eval_one(target, rhs, Mode::Read)?;
        let Some(source) = replacement.first() else {
            continue;
        };
        let arena = nav.arena_mut();
        let destination = arena.unwrap_document(target.node);
        let source = arena.unwrap_document(source.node);
        if destination != source {
            arena.overwrite(destination, source);
        }
    }
    Ok(input.clone())
}

fn assign_style(
    nav: &mut Navigator<'_>,
    input: &ResultSet,
    lhs: &Expr,
    rhs: &Expr,
) -> Result<ResultSet, TreeqError> {
    let targets = nav.eval(input, lhs, Mode::Write)?;
    for target in targets.iter() {
        let names = nav.eval_one(target, rhs, Mode::Read)?;
        let Some(first) = names.first() else {
            continue;
        };
        let arena = nav.arena_mut();
        let name = arena
            .get(arena.resolve(first.node)?)
            .scalar_value()
            .unwrap_or_default()
            .to_string();
        let style = Style::from_name(&name)?;
        let node = arena.unwrap_document(target.node);
        arena.get_mut(node).style = style;
    }
    Ok(input.clone())
}

fn delete_child(
    nav: &mut Navigator<'_>,
    input: &ResultSet,
    lhs: &Expr,
    rhs: &Expr,
) -> Result<ResultSet, TreeqError> {
    let containers = nav.eval(input, lhs, Mode::Read)?;
    let follow_aliases = nav.options().follow_aliases;
    for container in containers.iter() {
        let children = traverse(nav.arena_mut(), container, Segment::Splat, Mode::Read, follow_aliases)?;
        if children.is_empty() {
            continue;
        }
        let splatted: ResultSet = children.iter().cloned().collect();
        let doomed: HashSet<CandidateKey> = nav
            .eval(&splatted, rhs, Mode::Read)?
            .iter()
            .map(Candidate::key)
            .collect();
        if doomed.is_empty() {
            continue;
        }

        let arena = nav.arena_mut();
        let keep: Vec<bool> = children.iter().map(|c| !doomed.contains(&c.key())).collect();
        let node = arena.resolve(container.node)?;
        debug!(
            "deleting {} of {} children of {}",
            keep.iter().filter(|k| !**k).count(),
            keep.len(),
            node
        );
        match &mut arena.get_mut(node).kind {
            NodeKind::Mapping(pairs) if pairs.len() == keep.len() => {
                let mut flags = keep.iter();
                pairs.retain(|_| flags.next().copied().unwrap_or(true));
            }
            NodeKind::Sequence(items) if items.len() == keep.len() => {
                let mut flags = keep.iter();
                items.retain(|_| flags.next().copied().unwrap_or(true));
            }
            _ => {}
        }
    }
    Ok(input.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::node::TAG_BOOL;
    use crate::document::Arena;
    use crate::query::parse_path;

    fn key(arena: &mut Arena, k: &str) -> NodeId {
        arena.string(k)
    }

    /// `{a: frog, b: [cat, goat, dog], c: {d: 1, e: 2}}`
    fn sample(arena: &mut Arena) -> ResultSet {
        let a = key(arena, "a");
        let frog = arena.string("frog");
        let b = key(arena, "b");
        let items = ["cat", "goat", "dog"].iter().map(|w| arena.string(*w)).collect();
        let list = arena.sequence(items);
        let c = key(arena, "c");
        let d = key(arena, "d");
        let one = arena.integer(1);
        let e = key(arena, "e");
        let two = arena.integer(2);
        let inner = arena.mapping(vec![(d, one), (e, two)]);
        let map = arena.mapping(vec![(a, frog), (b, list), (c, inner)]);
        let root = arena.document(map);
        ResultSet::singleton(Candidate::root(root, 0))
    }

    fn run(arena: &mut Arena, input: &ResultSet, expr: &str) -> Result<ResultSet, TreeqError> {
        Navigator::new(arena).evaluate(input, &parse_path(expr)?)
    }

    fn texts(arena: &Arena, set: &ResultSet) -> Vec<String> {
        set.iter()
            .map(|c| arena.get(c.node).scalar_value().unwrap_or("<node>").to_string())
            .collect()
    }

    #[test]
    fn length_of_each_kind() {
        let mut arena = Arena::new();
        let input = sample(&mut arena);
        let out = run(&mut arena, &input, "(.a, .b, .c, .missing) | length").unwrap();
        assert_eq!(texts(&arena, &out), vec!["4", "3", "2"]);
    }

    #[test]
    fn not_inverts_truthiness() {
        let mut arena = Arena::new();
        let input = sample(&mut arena);
        let out = run(&mut arena, &input, ".a | not").unwrap();
        assert_eq!(texts(&arena, &out), vec!["false"]);
        assert_eq!(arena.get(out.first().unwrap().node).tag, TAG_BOOL);
    }

    #[test]
    fn select_filters_by_glob() {
        let mut arena = Arena::new();
        let input = sample(&mut arena);
        let out = run(&mut arena, &input, r#".b[] | select(. == "*at")"#).unwrap();
        assert_eq!(texts(&arena, &out), vec!["cat", "goat"]);
        let paths: Vec<_> = out.iter().map(|c| c.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                vec![PathSegment::Key("b".into()), PathSegment::Index(0)],
                vec![PathSegment::Key("b".into()), PathSegment::Index(1)],
            ]
        );
    }

    #[test]
    fn equals_splats_containers_one_level() {
        let mut arena = Arena::new();
        let input = sample(&mut arena);
        let out = run(&mut arena, &input, ".b == dog").unwrap();
        assert_eq!(texts(&arena, &out), vec!["true"]);
        let out = run(&mut arena, &input, ".b == fish").unwrap();
        assert_eq!(texts(&arena, &out), vec!["false"]);
    }

    #[test]
    fn or_and_cross_product() {
        let mut arena = Arena::new();
        let input = sample(&mut arena);
        let out = run(&mut arena, &input, "(.a == frog) or (.a == toad)").unwrap();
        assert_eq!(texts(&arena, &out), vec!["true"]);
        let out = run(&mut arena, &input, "(.a == frog) and (.a == toad)").unwrap();
        assert_eq!(texts(&arena, &out), vec!["false"]);
        let out = run(&mut arena, &input, "(true, false) and (true, true)").unwrap();
        assert_eq!(texts(&arena, &out), vec!["true", "true", "false", "false"]);
    }

    #[test]
    fn count_matches() {
        let mut arena = Arena::new();
        let input = sample(&mut arena);
        let out = run(&mut arena, &input, "count(.b[])").unwrap();
        assert_eq!(texts(&arena, &out), vec!["3"]);
    }

    #[test]
    fn collect_wraps_results() {
        let mut arena = Arena::new();
        let input = sample(&mut arena);
        let out = run(&mut arena, &input, "[.a, .c.d]").unwrap();
        assert_eq!(out.len(), 1);
        let seq = out.first().unwrap().node;
        let NodeKind::Sequence(items) = &arena.get(seq).kind else {
            panic!("expected a sequence");
        };
        let values: Vec<_> = items.iter().map(|i| arena.get(*i).scalar_value()).collect();
        assert_eq!(values, vec![Some("frog"), Some("1")]);
    }

    #[test]
    fn create_map_cross_product() {
        let mut arena = Arena::new();
        let input = sample(&mut arena);
        let out = run(&mut arena, &input, "(x, y): .a").unwrap();
        let seq = out.first().unwrap().node;
        let NodeKind::Sequence(fragments) = &arena.get(seq).kind else {
            panic!("expected a sequence");
        };
        assert_eq!(fragments.len(), 2);
        let NodeKind::Mapping(pairs) = &arena.get(fragments[1]).kind else {
            panic!("expected a mapping");
        };
        assert_eq!(arena.get(pairs[0].0).scalar_value(), Some("y"));
        assert_eq!(arena.get(pairs[0].1).scalar_value(), Some("frog"));
    }

    #[test]
    fn assign_overwrites_in_place() {
        let mut arena = Arena::new();
        let input = sample(&mut arena);
        let out = run(&mut arena, &input, r#".c.d |= "new""#).unwrap();
        assert_eq!(out, input);
        let check = run(&mut arena, &input, ".c.d").unwrap();
        assert_eq!(texts(&arena, &check), vec!["new"]);
    }

    #[test]
    fn assign_can_reference_target() {
        let mut arena = Arena::new();
        let input = sample(&mut arena);
        run(&mut arena, &input, ".c |= .e").unwrap();
        let check = run(&mut arena, &input, ".c").unwrap();
        assert_eq!(texts(&arena, &check), vec!["2"]);
    }

    #[test]
    fn assign_vivifies_missing_path() {
        let mut arena = Arena::new();
        let input = sample(&mut arena);
        run(&mut arena, &input, ".x.y[1] |= 5").unwrap();
        let check = run(&mut arena, &input, ".x.y[]").unwrap();
        assert_eq!(texts(&arena, &check), vec!["null", "5"]);
        let keys = run(&mut arena, &input, ".x | length").unwrap();
        assert_eq!(texts(&arena, &keys), vec!["1"]);
    }

    #[test]
    fn style_get_and_set() {
        let mut arena = Arena::new();
        let input = sample(&mut arena);
        run(&mut arena, &input, r#".a style = "double""#).unwrap();
        let out = run(&mut arena, &input, ".a | style").unwrap();
        assert_eq!(texts(&arena, &out), vec!["double"]);
        let untouched = run(&mut arena, &input, ".b | style").unwrap();
        assert_eq!(texts(&arena, &untouched), vec![""]);
    }

    #[test]
    fn unknown_style_is_fatal() {
        let mut arena = Arena::new();
        let input = sample(&mut arena);
        let err = run(&mut arena, &input, r#".a style = "fancy""#).unwrap_err();
        assert!(matches!(err, TreeqError::UnknownStyle(ref s) if s == "fancy"));
    }

    #[test]
    fn delete_child_by_value() {
        let mut arena = Arena::new();
        let input = sample(&mut arena);
        run(&mut arena, &input, ".c .- select(. == 1)").unwrap();
        let out = run(&mut arena, &input, ".c[]").unwrap();
        assert_eq!(texts(&arena, &out), vec!["2"]);
    }

    #[test]
    fn delete_child_by_selection_keeps_order() {
        let mut arena = Arena::new();
        let input = sample(&mut arena);
        run(&mut arena, &input, r#".b .- select(. == "goat")"#).unwrap();
        let out = run(&mut arena, &input, ".b[]").unwrap();
        assert_eq!(texts(&arena, &out), vec!["cat", "dog"]);
    }

    #[test]
    fn delete_child_reports_alias_cycle() {
        let mut arena = Arena::new();
        let looped = arena.null();
        arena.get_mut(looped).kind = NodeKind::Alias(looped);
        let k = key(&mut arena, "loop");
        let map = arena.mapping(vec![(k, looped)]);
        let input = ResultSet::singleton(Candidate::root(map, 0));
        let err = run(&mut arena, &input, ".loop .- select(. == 1)").unwrap_err();
        assert!(matches!(err, TreeqError::AliasCycle(_)));
    }

    #[test]
    fn recursive_descent_pre_order() {
        let mut arena = Arena::new();
        let input = sample(&mut arena);
        let out = run(&mut arena, &input, ".c | ..").unwrap();
        assert_eq!(texts(&arena, &out), vec!["<node>", "1", "2"]);
    }

    #[test]
    fn document_filter() {
        let mut arena = Arena::new();
        let first = arena.string("first");
        let second = arena.string("second");
        let input: ResultSet = vec![Candidate::root(first, 0), Candidate::root(second, 1)]
            .into_iter()
            .collect();
        let out = run(&mut arena, &input, "d1").unwrap();
        assert_eq!(texts(&arena, &out), vec!["second"]);
    }
}
