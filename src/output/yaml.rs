use std::collections::HashSet;

use crate::document::node::{TAG_MAP, TAG_SEQ, TAG_STR};
use crate::document::{Arena, Node, NodeId, NodeKind, Style};
use crate::error::TreeqError;

const INDENT: usize = 2;

/// Render a node as block-style YAML, honouring the styles, tags and anchors
/// stamped on each node. The result ends with a newline.
pub fn to_yaml(arena: &Arena, id: NodeId) -> Result<String, TreeqError> {
    let mut writer = Writer {
        arena,
        out: String::new(),
        expanding: HashSet::new(),
    };
    let root = arena.unwrap_document(id);
    if writer.is_block(root) {
        let props = writer.properties(arena.get(root));
        if !props.is_empty() {
            writer.out.push_str(&props);
            writer.out.push('\n');
        }
        writer.write_block(root, 0)?;
    } else if writer.is_block_scalar(root) {
        writer.write_block_scalar(root, 0)?;
    } else {
        let line = writer.inline(root)?;
        writer.out.push_str(&line);
        writer.out.push('\n');
    }
    Ok(writer.out)
}

struct Writer<'a> {
    arena: &'a Arena,
    out: String,
    /// Alias targets currently being expanded inline.
    expanding: HashSet<NodeId>,
}

impl Writer<'_> {
    fn is_block(&self, id: NodeId) -> bool {
        let node = self.arena.get(id);
        node.style != Style::Flow
            && match &node.kind {
                NodeKind::Mapping(pairs) => !pairs.is_empty(),
                NodeKind::Sequence(items) => !items.is_empty(),
                _ => false,
            }
    }

    fn is_block_scalar(&self, id: NodeId) -> bool {
        let node = self.arena.get(id);
        matches!(node.kind, NodeKind::Scalar(_)) && matches!(node.style, Style::Literal | Style::Folded)
    }

    /// Anchor and tag prefix of a node, e.g. `&base !!map`.
    fn properties(&self, node: &Node) -> String {
        let mut props = Vec::new();
        if let Some(anchor) = &node.anchor {
            props.push(format!("&{anchor}"));
        }
        let custom_tag = !node.tag.is_empty() && !node.tag.starts_with("!!");
        let container_default = node.tag == TAG_MAP || node.tag == TAG_SEQ;
        if custom_tag || (node.style == Style::Tagged && !container_default) {
            props.push(node.tag.clone());
        }
        props.join(" ")
    }

    fn write_block(&mut self, id: NodeId, indent: usize) -> Result<(), TreeqError> {
        let arena = self.arena;
        match &arena.get(id).kind {
            NodeKind::Mapping(pairs) => {
                for &(key, value) in pairs {
                    let key = self.inline(key)?;
                    self.out.push_str(&" ".repeat(indent));
                    self.out.push_str(&key);
                    self.out.push(':');
                    self.write_entry(value, indent)?;
                }
            }
            NodeKind::Sequence(items) => {
                for &item in items {
                    self.write_sequence_item(item, indent)?;
                }
            }
            _ => {
                let line = self.inline(id)?;
                self.out.push_str(&" ".repeat(indent));
                self.out.push_str(&line);
                self.out.push('\n');
            }
        }
        Ok(())
    }

    /// Write the value half of `key: value` or `- value`; the cursor sits right
    /// after the colon or dash.
    fn write_entry(&mut self, value: NodeId, indent: usize) -> Result<(), TreeqError> {
        if self.is_block(value) {
            let props = self.properties(self.arena.get(value));
            if !props.is_empty() {
                self.out.push(' ');
                self.out.push_str(&props);
            }
            self.out.push('\n');
            self.write_block(value, indent + INDENT)
        } else if self.is_block_scalar(value) {
            self.out.push(' ');
            self.write_block_scalar(value, indent + INDENT)
        } else {
            let line = self.inline(value)?;
            self.out.push(' ');
            self.out.push_str(&line);
            self.out.push('\n');
            Ok(())
        }
    }

    fn write_sequence_item(&mut self, item: NodeId, indent: usize) -> Result<(), TreeqError> {
        let node = self.arena.get(item);
        // a plain block container starts on the dash line: `- key: value`
        if self.is_block(item) && self.properties(node).is_empty() {
            let mut nested = Writer {
                arena: self.arena,
                out: String::new(),
                expanding: std::mem::take(&mut self.expanding),
            };
            let result = nested.write_block(item, indent + INDENT);
            self.expanding = nested.expanding;
            result?;
            let body = nested.out;
            let first_line_body = &body[(indent + INDENT).min(body.len())..];
            self.out.push_str(&" ".repeat(indent));
            self.out.push_str("- ");
            self.out.push_str(first_line_body);
            return Ok(());
        }
        self.out.push_str(&" ".repeat(indent));
        self.out.push('-');
        self.write_entry(item, indent)
    }

    fn write_block_scalar(&mut self, id: NodeId, indent: usize) -> Result<(), TreeqError> {
        let node = self.arena.get(id);
        let value = node.scalar_value().unwrap_or_default();
        let props = self.properties(node);
        if !props.is_empty() {
            self.out.push_str(&props);
            self.out.push(' ');
        }
        let content = value.trim_end_matches('\n');
        let trailing = value.len() - content.len();
        let chomp = match trailing {
            0 => "-",
            1 => "",
            _ => "+",
        };
        let indicator = if node.style == Style::Folded { '>' } else { '|' };
        self.out.push(indicator);
        self.out.push_str(chomp);
        self.out.push('\n');

        let pad = " ".repeat(indent);
        let lines: Vec<&str> = content.split('\n').collect();
        for (i, line) in lines.iter().enumerate() {
            if node.style == Style::Folded && i > 0 {
                self.out.push('\n');
            }
            if !line.is_empty() {
                self.out.push_str(&pad);
                self.out.push_str(line);
            }
            self.out.push('\n');
        }
        for _ in 1..trailing {
            self.out.push('\n');
        }
        Ok(())
    }

    /// Single-line rendering used for scalars, keys and flow collections.
    fn inline(&mut self, id: NodeId) -> Result<String, TreeqError> {
        let arena = self.arena;
        let node = arena.get(id);
        let props = self.properties(node);
        let body = match &node.kind {
            NodeKind::Document(root) => return self.inline(*root),
            NodeKind::Alias(target) => {
                let target = *target;
                if let Some(anchor) = &arena.get(target).anchor {
                    return Ok(format!("*{anchor}"));
                }
                if !self.expanding.insert(target) {
                    return Err(TreeqError::AliasCycle(target.to_string()));
                }
                let expanded = self.inline(target);
                self.expanding.remove(&target);
                return expanded;
            }
            NodeKind::Scalar(value) => scalar_text(node, value)?,
            NodeKind::Mapping(pairs) => {
                let mut parts = Vec::with_capacity(pairs.len());
                for &(key, value) in pairs {
                    parts.push(format!("{}: {}", self.inline(key)?, self.inline(value)?));
                }
                format!("{{{}}}", parts.join(", "))
            }
            NodeKind::Sequence(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for &item in items {
                    parts.push(self.inline(item)?);
                }
                format!("[{}]", parts.join(", "))
            }
        };
        if props.is_empty() {
            Ok(body)
        } else {
            Ok(format!("{props} {body}"))
        }
    }
}

fn double_quoted(value: &str) -> Result<String, TreeqError> {
    serde_json::to_string(value).map_err(|e| TreeqError::DocumentParse(e.to_string()))
}

fn scalar_text(node: &Node, value: &str) -> Result<String, TreeqError> {
    match node.style {
        Style::Double => double_quoted(value),
        Style::Single if !value.contains('\n') => Ok(format!("'{}'", value.replace('\'', "''"))),
        Style::Single | Style::Literal | Style::Folded => double_quoted(value),
        Style::Default | Style::Tagged | Style::Flow => {
            if node.tag != TAG_STR {
                return Ok(value.to_string());
            }
            if value.contains('\n') {
                return double_quoted(value);
            }
            // serde_yaml knows which plain strings would read back as something else
            let rendered =
                serde_yaml::to_string(value).map_err(|e| TreeqError::DocumentParse(e.to_string()))?;
            Ok(rendered.trim_end_matches('\n').to_string())
        }
    }
}
