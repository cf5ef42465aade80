//! Leaf traversal: applying one path segment to one candidate.
//!
//! Dispatch is on the runtime kind of the candidate's node, so the same segment
//! works on whatever the document happens to contain at that point.

use std::collections::HashSet;

use log::debug;
use regex::Regex;

use crate::document::node::{NodeKind, TAG_STR};
use crate::document::{Arena, Candidate, NodeId, PathSegment};
use crate::error::TreeqError;

/// Write-mode indexing never grows a sequence to this many elements or more.
pub const MAX_EXTENDED_LENGTH: usize = 1 << 24;

/// Whether a traversal may create what it does not find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
}

/// A path segment as seen by the traverser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Key(&'a str),
    Index(i64),
    Splat,
    Append,
}

impl Segment<'_> {
    fn wants_sequence(&self) -> bool {
        matches!(self, Segment::Index(_) | Segment::Append)
    }
}

/// A key or value pattern compiled once: `*` matches any run of characters and
/// `?` any single character. Patterns with neither compare exactly.
#[derive(Debug, Clone)]
pub enum Glob<'a> {
    Exact(&'a str),
    Any,
    Pattern(Regex),
}

impl<'a> Glob<'a> {
    pub fn new(pattern: &'a str) -> Result<Self, TreeqError> {
        if !pattern.contains(['*', '?']) {
            return Ok(Glob::Exact(pattern));
        }
        if pattern.chars().all(|c| c == '*') {
            return Ok(Glob::Any);
        }
        let mut re = String::with_capacity(pattern.len() + 8);
        re.push_str("(?s)^");
        for c in pattern.chars() {
            match c {
                '*' => re.push_str(".*"),
                '?' => re.push('.'),
                other => re.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        re.push('$');
        Regex::new(&re)
            .map(Glob::Pattern)
            .map_err(|e| TreeqError::MalformedExpression(format!("pattern {pattern:?}: {e}")))
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Glob::Exact(expected) => *expected == text,
            Glob::Any => true,
            Glob::Pattern(re) => re.is_match(text),
        }
    }

    /// True when the pattern names exactly one key.
    pub fn is_exact(&self) -> bool {
        matches!(self, Glob::Exact(_))
    }
}

/// Text of a mapping key node; non-scalar keys have none.
fn key_text(arena: &Arena, key: NodeId) -> String {
    arena.get(key).scalar_value().unwrap_or_default().to_string()
}

/// Apply `segment` to `candidate`, returning one candidate per matched child.
pub fn traverse(
    arena: &mut Arena,
    candidate: &Candidate,
    segment: Segment<'_>,
    mode: Mode,
    follow_aliases: bool,
) -> Result<Vec<Candidate>, TreeqError> {
    let mut current = candidate.node;
    let mut seen = HashSet::new();
    loop {
        match arena.get(current).kind {
            NodeKind::Document(root) => {
                if !seen.insert(current) {
                    return Err(TreeqError::AliasCycle(current.to_string()));
                }
                current = root;
            }
            NodeKind::Alias(target) => {
                if !follow_aliases {
                    return Ok(Vec::new());
                }
                if !seen.insert(current) {
                    return Err(TreeqError::AliasCycle(current.to_string()));
                }
                current = target;
            }
            NodeKind::Scalar(_) => {
                if mode == Mode::Write && arena.get(current).is_null() && segment != Segment::Splat {
                    debug!(
                        "vivifying {} at {}",
                        if segment.wants_sequence() { "sequence" } else { "mapping" },
                        current
                    );
                    arena.vivify_container(current, segment.wants_sequence());
                    continue;
                }
                return Ok(Vec::new());
            }
            NodeKind::Mapping(_) => return traverse_mapping(arena, candidate, current, segment, mode),
            NodeKind::Sequence(_) => return traverse_sequence(arena, candidate, current, segment, mode),
        }
    }
}

fn traverse_mapping(
    arena: &mut Arena,
    candidate: &Candidate,
    map: NodeId,
    segment: Segment<'_>,
    mode: Mode,
) -> Result<Vec<Candidate>, TreeqError> {
    let index_key;
    let pattern = match segment {
        Segment::Splat => "*",
        Segment::Key(key) => key,
        Segment::Index(index) => {
            index_key = index.to_string();
            index_key.as_str()
        }
        Segment::Append => return Ok(Vec::new()),
    };

    let glob = Glob::new(pattern)?;
    let NodeKind::Mapping(pairs) = &arena.get(map).kind else {
        return Ok(Vec::new());
    };
    let matches: Vec<Candidate> = pairs
        .iter()
        .filter_map(|&(key, value)| {
            let text = key_text(arena, key);
            glob.is_match(&text).then(|| candidate.child(value, PathSegment::Key(text)))
        })
        .collect();

    if !matches.is_empty() || mode == Mode::Read || !glob.is_exact() {
        return Ok(matches);
    }

    debug!("creating key {:?} under {}", pattern, map);
    let key = arena.scalar(TAG_STR, pattern);
    let value = arena.null();
    if let NodeKind::Mapping(pairs) = &mut arena.get_mut(map).kind {
        pairs.push((key, value));
    }
    Ok(vec![candidate.child(value, PathSegment::Key(pattern.to_string()))])
}

fn traverse_sequence(
    arena: &mut Arena,
    candidate: &Candidate,
    seq: NodeId,
    segment: Segment<'_>,
    mode: Mode,
) -> Result<Vec<Candidate>, TreeqError> {
    let NodeKind::Sequence(items) = &arena.get(seq).kind else {
        return Ok(Vec::new());
    };
    let length = items.len();

    match segment {
        Segment::Splat | Segment::Key("*") => Ok(items
            .iter()
            .enumerate()
            .map(|(i, &item)| candidate.child(item, PathSegment::Index(i)))
            .collect()),
        Segment::Key(_) => Ok(Vec::new()),
        Segment::Index(index) if index < 0 => {
            let resolved = length as i64 + index;
            if resolved < 0 {
                return Err(TreeqError::IndexOutOfRange { index, length });
            }
            let position = resolved as usize;
            Ok(vec![candidate.child(items[position], PathSegment::Index(position))])
        }
        Segment::Index(index) => {
            let position = index as usize;
            if position < length {
                return Ok(vec![candidate.child(items[position], PathSegment::Index(position))]);
            }
            if mode == Mode::Read {
                return Ok(Vec::new());
            }
            if position >= MAX_EXTENDED_LENGTH {
                return Err(TreeqError::ExtensionLimit {
                    index,
                    limit: MAX_EXTENDED_LENGTH,
                });
            }
            debug!("extending {} from {} to {} elements", seq, length, position + 1);
            let item = extend_sequence(arena, seq, position + 1);
            Ok(vec![candidate.child(item, PathSegment::Index(position))])
        }
        Segment::Append => {
            if mode == Mode::Read {
                return Ok(Vec::new());
            }
            if length >= MAX_EXTENDED_LENGTH {
                return Err(TreeqError::ExtensionLimit {
                    index: length as i64,
                    limit: MAX_EXTENDED_LENGTH,
                });
            }
            let item = extend_sequence(arena, seq, length + 1);
            Ok(vec![candidate.child(item, PathSegment::Index(length))])
        }
    }
}

/// Pad a sequence with null placeholders up to `new_length`; returns the last element.
fn extend_sequence(arena: &mut Arena, seq: NodeId, new_length: usize) -> NodeId {
    let current = match &arena.get(seq).kind {
        NodeKind::Sequence(items) => items.len(),
        _ => 0,
    };
    let fillers: Vec<NodeId> = (current..new_length).map(|_| arena.null()).collect();
    let mut last = fillers.last().copied();
    if let NodeKind::Sequence(items) = &mut arena.get_mut(seq).kind {
        items.extend(fillers);
        last = last.or_else(|| items.last().copied());
    }
    last.unwrap_or(seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::node::{Node, TAG_NULL};

    fn sample(arena: &mut Arena) -> Candidate {
        let cat_key = arena.string("cat");
        let cat = arena.string("meow");
        let car_key = arena.string("car");
        let car = arena.string("vroom");
        let dog_key = arena.string("dog");
        let dog = arena.string("woof");
        let map = arena.mapping(vec![(cat_key, cat), (car_key, car), (dog_key, dog)]);
        let doc = arena.document(map);
        Candidate::root(doc, 0)
    }

    fn list(arena: &mut Arena, words: &[&str]) -> Candidate {
        let items = words.iter().map(|w| arena.string(*w)).collect();
        let seq = arena.sequence(items);
        Candidate::root(seq, 0)
    }

    fn values(arena: &Arena, found: &[Candidate]) -> Vec<String> {
        found
            .iter()
            .map(|c| arena.get(c.node).scalar_value().unwrap_or("?").to_string())
            .collect()
    }

    #[test]
    fn glob_patterns() {
        let matches = |pattern: &str, text: &str| Glob::new(pattern).unwrap().is_match(text);
        assert!(matches("*at", "cat"));
        assert!(matches("c?t", "cat"));
        assert!(!matches("c?t", "coat"));
        assert!(matches("a.b", "a.b"));
        assert!(!matches("a.b", "axb"));
        assert!(matches("(x)+*", "(x)+yz"));
        assert!(matches("*", ""));
        assert!(matches!(Glob::new("**").unwrap(), Glob::Any));
        assert!(Glob::new("plain").unwrap().is_exact());
    }

    #[test]
    fn mapping_exact_key() {
        let mut arena = Arena::new();
        let root = sample(&mut arena);
        let found = traverse(&mut arena, &root, Segment::Key("dog"), Mode::Read, true).unwrap();
        assert_eq!(values(&arena, &found), vec!["woof"]);
        assert_eq!(found[0].path, vec![PathSegment::Key("dog".into())]);
    }

    #[test]
    fn mapping_glob_key_in_document_order() {
        let mut arena = Arena::new();
        let root = sample(&mut arena);
        let found = traverse(&mut arena, &root, Segment::Key("ca*"), Mode::Read, true).unwrap();
        assert_eq!(values(&arena, &found), vec!["meow", "vroom"]);
    }

    #[test]
    fn mapping_missing_key_read_is_empty() {
        let mut arena = Arena::new();
        let root = sample(&mut arena);
        let before = arena.len();
        let found = traverse(&mut arena, &root, Segment::Key("fish"), Mode::Read, true).unwrap();
        assert!(found.is_empty());
        assert_eq!(arena.len(), before);
    }

    #[test]
    fn mapping_missing_key_write_creates_null() {
        let mut arena = Arena::new();
        let root = sample(&mut arena);
        let found = traverse(&mut arena, &root, Segment::Key("fish"), Mode::Write, true).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(arena.get(found[0].node).tag, TAG_NULL);
        let again = traverse(&mut arena, &root, Segment::Key("fish"), Mode::Read, true).unwrap();
        assert_eq!(again[0].node, found[0].node);
    }

    #[test]
    fn sequence_splat_and_indices() {
        let mut arena = Arena::new();
        let root = list(&mut arena, &["one", "two", "three"]);
        let all = traverse(&mut arena, &root, Segment::Splat, Mode::Read, true).unwrap();
        assert_eq!(values(&arena, &all), vec!["one", "two", "three"]);
        assert_eq!(all[2].path, vec![PathSegment::Index(2)]);

        let last = traverse(&mut arena, &root, Segment::Index(-1), Mode::Read, true).unwrap();
        assert_eq!(values(&arena, &last), vec!["three"]);
        assert_eq!(last[0].path, vec![PathSegment::Index(2)]);

        let first = traverse(&mut arena, &root, Segment::Index(-3), Mode::Read, true).unwrap();
        assert_eq!(values(&arena, &first), vec!["one"]);
    }

    #[test]
    fn sequence_negative_out_of_range() {
        let mut arena = Arena::new();
        let root = list(&mut arena, &["one", "two", "three"]);
        let err = traverse(&mut arena, &root, Segment::Index(-4), Mode::Read, true).unwrap_err();
        assert!(matches!(err, TreeqError::IndexOutOfRange { index: -4, length: 3 }));
    }

    #[test]
    fn sequence_past_end() {
        let mut arena = Arena::new();
        let root = list(&mut arena, &["one"]);
        assert!(traverse(&mut arena, &root, Segment::Index(3), Mode::Read, true)
            .unwrap()
            .is_empty());
        let found = traverse(&mut arena, &root, Segment::Index(3), Mode::Write, true).unwrap();
        assert_eq!(found[0].path, vec![PathSegment::Index(3)]);
        let all = traverse(&mut arena, &root, Segment::Splat, Mode::Read, true).unwrap();
        assert_eq!(values(&arena, &all), vec!["one", "null", "null", "null"]);
    }

    #[test]
    fn append_only_in_write_mode() {
        let mut arena = Arena::new();
        let root = list(&mut arena, &["one"]);
        assert!(traverse(&mut arena, &root, Segment::Append, Mode::Read, true)
            .unwrap()
            .is_empty());
        let found = traverse(&mut arena, &root, Segment::Append, Mode::Write, true).unwrap();
        assert_eq!(found[0].path, vec![PathSegment::Index(1)]);
    }

    #[test]
    fn scalar_has_no_children() {
        let mut arena = Arena::new();
        let word = arena.string("apple");
        let root = Candidate::root(word, 0);
        assert!(traverse(&mut arena, &root, Segment::Key("a"), Mode::Write, true)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn huge_write_index_is_rejected() {
        let mut arena = Arena::new();
        let root = list(&mut arena, &["a"]);
        let err = traverse(&mut arena, &root, Segment::Index(4_000_000_000_000_000_000), Mode::Write, true)
            .unwrap_err();
        assert!(matches!(
            err,
            TreeqError::ExtensionLimit { index: 4_000_000_000_000_000_000, limit: MAX_EXTENDED_LENGTH }
        ));
        let all = traverse(&mut arena, &root, Segment::Splat, Mode::Read, true).unwrap();
        assert_eq!(values(&arena, &all), vec!["a"]);
    }

    #[test]
    fn null_vivifies_in_write_mode() {
        let mut arena = Arena::new();
        let null = arena.null();
        let root = Candidate::root(null, 0);
        traverse(&mut arena, &root, Segment::Index(0), Mode::Write, true).unwrap();
        assert!(matches!(arena.get(null).kind, NodeKind::Sequence(ref items) if items.len() == 1));
    }

    #[test]
    fn aliases_followed_unless_disabled() {
        let mut arena = Arena::new();
        let key = arena.string("a");
        let value = arena.string("x");
        let anchored = arena.mapping(vec![(key, value)]);
        let alias = arena.alloc(Node::new(NodeKind::Alias(anchored), ""));
        let root = Candidate::root(alias, 0);
        let found = traverse(&mut arena, &root, Segment::Key("a"), Mode::Read, true).unwrap();
        assert_eq!(found.len(), 1);
        let skipped = traverse(&mut arena, &root, Segment::Key("a"), Mode::Read, false).unwrap();
        assert!(skipped.is_empty());
    }

    #[test]
    fn index_on_mapping_uses_decimal_key() {
        let mut arena = Arena::new();
        let key = arena.scalar(crate::document::node::TAG_INT, "1");
        let value = arena.string("one");
        let map = arena.mapping(vec![(key, value)]);
        let root = Candidate::root(map, 0);
        let found = traverse(&mut arena, &root, Segment::Index(1), Mode::Read, true).unwrap();
        assert_eq!(values(&arena, &found), vec!["one"]);
    }
}
