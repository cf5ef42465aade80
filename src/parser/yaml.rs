use std::collections::HashMap;

use log::trace;
use yaml_rust2::parser::{Event, EventReceiver, Parser};
use yaml_rust2::scanner::{Scanner, TScalarStyle, Token, TokenType};

use crate::document::node::{TAG_BOOL, TAG_FLOAT, TAG_INT, TAG_NULL, TAG_STR};
use crate::document::{Arena, Node, NodeId, NodeKind, Style};
use crate::error::TreeqError;

const CORE_SCHEMA_PREFIX: &str = "tag:yaml.org,2002:";

/// Parse a YAML stream into the arena, returning one document node per
/// `---`-separated document.
pub fn parse(input: &str, arena: &mut Arena) -> Result<Vec<NodeId>, TreeqError> {
    let mut loader = Loader {
        arena,
        anchor_names: anchor_names(input),
        anchors: HashMap::new(),
        stack: Vec::new(),
        documents: Vec::new(),
        error: None,
    };
    let mut parser = Parser::new_from_str(input);
    parser
        .load(&mut loader, true)
        .map_err(|e| TreeqError::DocumentParse(e.to_string()))?;
    if let Some(err) = loader.error {
        return Err(err);
    }
    trace!("loaded {} YAML documents", loader.documents.len());
    Ok(loader.documents)
}

enum Frame {
    Sequence(NodeId),
    Mapping { node: NodeId, pending_key: Option<NodeId> },
}

struct Loader<'a> {
    arena: &'a mut Arena,
    anchor_names: Vec<String>,
    anchors: HashMap<usize, NodeId>,
    stack: Vec<Frame>,
    documents: Vec<NodeId>,
    error: Option<TreeqError>,
}

impl EventReceiver for Loader<'_> {
    fn on_event(&mut self, ev: Event) {
        if self.error.is_some() {
            return;
        }
        match ev {
            Event::Scalar(value, style, anchor_id, tag) => {
                let explicit = tag.map(|t| tag_name(&t.handle, &t.suffix));
                let (tag, node_style) = match explicit {
                    Some(tag) => (tag, Style::Tagged),
                    None => match style {
                        TScalarStyle::Plain => (resolve_plain(&value).to_string(), Style::Default),
                        TScalarStyle::SingleQuoted => (TAG_STR.to_string(), Style::Single),
                        TScalarStyle::DoubleQuoted => (TAG_STR.to_string(), Style::Double),
                        TScalarStyle::Literal => (TAG_STR.to_string(), Style::Literal),
                        TScalarStyle::Folded => (TAG_STR.to_string(), Style::Folded),
                        #[allow(unreachable_patterns)]
                        _ => (TAG_STR.to_string(), Style::Default),
                    },
                };
                let mut node = Node::new(NodeKind::Scalar(value), tag);
                node.style = node_style;
                let id = self.arena.alloc(node);
                self.register_anchor(anchor_id, id);
                self.attach(id);
            }
            Event::SequenceStart(anchor_id, tag) => {
                let id = self.arena.sequence(Vec::new());
                self.apply_tag(id, tag.map(|t| tag_name(&t.handle, &t.suffix)));
                self.register_anchor(anchor_id, id);
                self.attach(id);
                self.stack.push(Frame::Sequence(id));
            }
            Event::MappingStart(anchor_id, tag) => {
                let id = self.arena.mapping(Vec::new());
                self.apply_tag(id, tag.map(|t| tag_name(&t.handle, &t.suffix)));
                self.register_anchor(anchor_id, id);
                self.attach(id);
                self.stack.push(Frame::Mapping {
                    node: id,
                    pending_key: None,
                });
            }
            Event::SequenceEnd | Event::MappingEnd => {
                self.stack.pop();
            }
            Event::Alias(anchor_id) => match self.anchors.get(&anchor_id) {
                Some(&target) => {
                    let id = self.arena.alloc(Node::new(NodeKind::Alias(target), ""));
                    self.attach(id);
                }
                None => {
                    self.error = Some(TreeqError::DocumentParse(format!(
                        "alias refers to unknown anchor {anchor_id}"
                    )));
                }
            },
            _ => {}
        }
    }
}

impl Loader<'_> {
    fn apply_tag(&mut self, id: NodeId, tag: Option<String>) {
        if let Some(tag) = tag {
            let node = self.arena.get_mut(id);
            node.tag = tag;
            node.style = Style::Tagged;
        }
    }

    fn register_anchor(&mut self, anchor_id: usize, id: NodeId) {
        if anchor_id == 0 {
            return;
        }
        let name = self
            .anchor_names
            .get(anchor_id - 1)
            .cloned()
            .unwrap_or_else(|| format!("anchor{anchor_id}"));
        self.arena.get_mut(id).anchor = Some(name);
        self.anchors.insert(anchor_id, id);
    }

    /// Hang a finished node under the innermost open container, or start a new
    /// document when nothing is open.
    fn attach(&mut self, id: NodeId) {
        match self.stack.last_mut() {
            None => {
                let document = self.arena.document(id);
                self.documents.push(document);
            }
            Some(Frame::Sequence(seq)) => {
                let seq = *seq;
                if let NodeKind::Sequence(items) = &mut self.arena.get_mut(seq).kind {
                    items.push(id);
                }
            }
            Some(Frame::Mapping { node, pending_key }) => match pending_key.take() {
                None => *pending_key = Some(id),
                Some(key) => {
                    let map = *node;
                    if let NodeKind::Mapping(pairs) = &mut self.arena.get_mut(map).kind {
                        pairs.push((key, id));
                    }
                }
            },
        }
    }
}

/// `!!str` for the core schema, the tag as written otherwise.
fn tag_name(handle: &str, suffix: &str) -> String {
    if handle == "!!" || handle == CORE_SCHEMA_PREFIX {
        format!("!!{suffix}")
    } else {
        format!("{handle}{suffix}")
    }
}

/// Resolve the tag of an untagged plain scalar with the YAML 1.2 core schema.
fn resolve_plain(value: &str) -> &'static str {
    match value {
        "" | "~" | "null" | "Null" | "NULL" => return TAG_NULL,
        "true" | "True" | "TRUE" | "false" | "False" | "FALSE" => return TAG_BOOL,
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" | "-.inf" | "-.Inf" | "-.INF"
        | ".nan" | ".NaN" | ".NAN" => return TAG_FLOAT,
        _ => {}
    }
    if value.parse::<i64>().is_ok() || is_radix_int(value) {
        return TAG_INT;
    }
    let numeric_chars = value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if numeric_chars && value.chars().any(|c| c.is_ascii_digit()) && value.parse::<f64>().is_ok() {
        return TAG_FLOAT;
    }
    TAG_STR
}

fn is_radix_int(value: &str) -> bool {
    if let Some(hex) = value.strip_prefix("0x") {
        return !hex.is_empty() && i64::from_str_radix(hex, 16).is_ok();
    }
    if let Some(octal) = value.strip_prefix("0o") {
        return !octal.is_empty() && i64::from_str_radix(octal, 8).is_ok();
    }
    false
}

/// Anchor names in order of definition, read from the scanner's token stream.
/// The parser numbers anchors from 1 in the same order, so the name of anchor
/// `n` is entry `n - 1`.
fn anchor_names(input: &str) -> Vec<String> {
    Scanner::new(input.chars())
        .filter_map(|Token(_, token)| match token {
            TokenType::Anchor(name) => Some(name),
            _ => None,
        })
        .collect()
}
