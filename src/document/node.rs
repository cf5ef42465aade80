//! Arena-backed document nodes.
//!
//! Every node parsed from a document, or manufactured during evaluation, lives in a
//! single [`Arena`] and is addressed by a copyable [`NodeId`]. Containers hold child
//! handles rather than owned children, so a mutation through one handle is visible
//! to every candidate that refers to it.

use std::collections::HashSet;

use crate::error::TreeqError;

pub const TAG_MAP: &str = "!!map";
pub const TAG_SEQ: &str = "!!seq";
pub const TAG_STR: &str = "!!str";
pub const TAG_INT: &str = "!!int";
pub const TAG_FLOAT: &str = "!!float";
pub const TAG_BOOL: &str = "!!bool";
pub const TAG_NULL: &str = "!!null";

/// Stable handle to a node in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Formatting style stamped on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Style {
    #[default]
    Default,
    Tagged,
    Double,
    Single,
    Literal,
    Folded,
    Flow,
}

impl Style {
    pub fn name(self) -> &'static str {
        match self {
            Style::Default => "",
            Style::Tagged => "tagged",
            Style::Double => "double",
            Style::Single => "single",
            Style::Literal => "literal",
            Style::Folded => "folded",
            Style::Flow => "flow",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, TreeqError> {
        match name {
            "" => Ok(Style::Default),
            "tagged" => Ok(Style::Tagged),
            "double" => Ok(Style::Double),
            "single" => Ok(Style::Single),
            "literal" => Ok(Style::Literal),
            "folded" => Ok(Style::Folded),
            "flow" => Ok(Style::Flow),
            other => Err(TreeqError::UnknownStyle(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Wraps the single root node of a parsed document.
    Document(NodeId),
    /// Key/value pairs in document order.
    Mapping(Vec<(NodeId, NodeId)>),
    Sequence(Vec<NodeId>),
    /// Raw scalar text; its meaning comes from the node tag.
    Scalar(String),
    /// Non-owning reference to an anchored node.
    Alias(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub tag: String,
    pub style: Style,
    pub anchor: Option<String>,
}

impl Node {
    pub fn new(kind: NodeKind, tag: impl Into<String>) -> Self {
        Node {
            kind,
            tag: tag.into(),
            style: Style::Default,
            anchor: None,
        }
    }

    pub fn scalar_value(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, NodeKind::Scalar(_)) && self.tag == TAG_NULL
    }

    /// Short name of the node kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Document(_) => "document",
            NodeKind::Mapping(_) => "mapping",
            NodeKind::Sequence(_) => "sequence",
            NodeKind::Scalar(_) => "scalar",
            NodeKind::Alias(_) => "alias",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn new() -> Self {
        Arena { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn scalar(&mut self, tag: &str, value: impl Into<String>) -> NodeId {
        self.alloc(Node::new(NodeKind::Scalar(value.into()), tag))
    }

    pub fn string(&mut self, value: impl Into<String>) -> NodeId {
        self.scalar(TAG_STR, value)
    }

    pub fn null(&mut self) -> NodeId {
        self.scalar(TAG_NULL, "null")
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.scalar(TAG_BOOL, if value { "true" } else { "false" })
    }

    pub fn integer(&mut self, value: i64) -> NodeId {
        self.scalar(TAG_INT, value.to_string())
    }

    pub fn mapping(&mut self, pairs: Vec<(NodeId, NodeId)>) -> NodeId {
        self.alloc(Node::new(NodeKind::Mapping(pairs), TAG_MAP))
    }

    pub fn sequence(&mut self, items: Vec<NodeId>) -> NodeId {
        self.alloc(Node::new(NodeKind::Sequence(items), TAG_SEQ))
    }

    pub fn document(&mut self, root: NodeId) -> NodeId {
        self.alloc(Node::new(NodeKind::Document(root), ""))
    }

    /// Follow document wrappers and alias chains until reaching a content node.
    ///
    /// Fails with `AliasCycle` if the chain revisits a node.
    pub fn resolve(&self, id: NodeId) -> Result<NodeId, TreeqError> {
        let mut current = id;
        let mut seen = HashSet::new();
        loop {
            match self.get(current).kind {
                NodeKind::Document(next) | NodeKind::Alias(next) => {
                    if !seen.insert(current) {
                        return Err(TreeqError::AliasCycle(current.to_string()));
                    }
                    current = next;
                }
                _ => return Ok(current),
            }
        }
    }

    /// Unwrap a document node to its root; any other node is returned as is.
    pub fn unwrap_document(&self, id: NodeId) -> NodeId {
        match self.get(id).kind {
            NodeKind::Document(root) => root,
            _ => id,
        }
    }

    /// Copy a subtree into fresh nodes. Aliases are copied as aliases and keep
    /// pointing at their original anchor.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let node = self.get(id).clone();
        let kind = match node.kind {
            NodeKind::Document(root) => NodeKind::Document(self.deep_copy(root)),
            NodeKind::Mapping(pairs) => NodeKind::Mapping(
                pairs
                    .into_iter()
                    .map(|(k, v)| (self.deep_copy(k), self.deep_copy(v)))
                    .collect(),
            ),
            NodeKind::Sequence(items) => {
                NodeKind::Sequence(items.into_iter().map(|i| self.deep_copy(i)).collect())
            }
            other => other,
        };
        self.alloc(Node { kind, ..node })
    }

    /// Overwrite `target` with the content of `source` in place. The target keeps
    /// its anchor and style; kind, tag and children come from a copy of the source.
    pub fn overwrite(&mut self, target: NodeId, source: NodeId) {
        let copy = self.deep_copy(source);
        let copied = self.get(copy).clone();
        let node = self.get_mut(target);
        node.kind = copied.kind;
        node.tag = copied.tag;
    }

    /// Turn a null scalar into an empty mapping or sequence so that children can be
    /// created under it.
    pub fn vivify_container(&mut self, id: NodeId, as_sequence: bool) {
        let node = self.get_mut(id);
        if as_sequence {
            node.kind = NodeKind::Sequence(Vec::new());
            node.tag = TAG_SEQ.to_string();
        } else {
            node.kind = NodeKind::Mapping(Vec::new());
            node.tag = TAG_MAP.to_string();
        }
    }

    /// Whether a node counts as true in boolean contexts.
    pub fn is_truthy(&self, id: NodeId) -> Result<bool, TreeqError> {
        let node = self.get(self.resolve(id)?);
        Ok(match &node.kind {
            NodeKind::Scalar(value) => match node.tag.as_str() {
                TAG_BOOL => !value.eq_ignore_ascii_case("false"),
                TAG_NULL => false,
                _ => true,
            },
            NodeKind::Mapping(pairs) => !pairs.is_empty(),
            NodeKind::Sequence(items) => !items.is_empty(),
            NodeKind::Document(_) | NodeKind::Alias(_) => true,
        })
    }
}
