use crate::error::TreeqError;

use super::operator::{BinaryOp, NullaryOp, Operator, UnaryOp};
use super::postfix::PathElement;

/// Literal value written in an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    /// Source text of a float literal, already checked to be finite.
    Float(String),
    Bool(bool),
    Null,
    String(String),
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Float(raw) => f.write_str(raw),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Null => f.write_str("null"),
            Literal::String(s) => f.write_str(s),
        }
    }
}

/// Operand positions of an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    /// Map key, possibly containing glob characters: `.foo`, `."a b"`, `.ca*`
    PathKey(String),
    /// Sequence index: `[N]`, `.[N]`
    ArrayIndex(i64),
    /// Every child: `[]`, `.[]`, `[*]`
    Splat,
    /// One past the end of a sequence: `[+]`
    Append,
    /// Identity: `.`
    SelfReference,
    Value(Literal),
}

impl std::fmt::Display for Leaf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Leaf::PathKey(key) => f.write_str(key),
            Leaf::ArrayIndex(index) => write!(f, "[{index}]"),
            Leaf::Splat => f.write_str("[]"),
            Leaf::Append => f.write_str("[+]"),
            Leaf::SelfReference => f.write_str("."),
            Leaf::Value(literal) => write!(f, "{literal}"),
        }
    }
}

/// Expression tree. The operand count is fixed by the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Leaf(Leaf),
    Nullary(NullaryOp),
    /// Prefix operator applied to its operand: `select(rhs)`, `[rhs]`
    Unary(UnaryOp, Box<Expr>),
    /// `lhs op rhs`
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Leaf(leaf) => write!(f, "{leaf}"),
            Expr::Nullary(op) => write!(f, "{}", Operator::Nullary(*op)),
            Expr::Unary(op, rhs) => write!(f, "{}({rhs})", Operator::Unary(*op)),
            Expr::Binary(op, lhs, rhs) => write!(f, "{}({lhs}, {rhs})", Operator::Binary(*op)),
        }
    }
}

/// Build an expression tree from postfix elements.
pub fn build_tree(postfix: &[PathElement]) -> Result<Expr, TreeqError> {
    let mut stack: Vec<Expr> = Vec::new();

    for element in postfix {
        let node = match element {
            PathElement::Leaf(leaf) => Expr::Leaf(leaf.clone()),
            PathElement::Operator(Operator::Nullary(op)) => Expr::Nullary(*op),
            PathElement::Operator(Operator::Unary(op)) => {
                let rhs = pop_operand(&mut stack, Operator::Unary(*op))?;
                Expr::Unary(*op, Box::new(rhs))
            }
            PathElement::Operator(Operator::Binary(op)) => {
                let rhs = pop_operand(&mut stack, Operator::Binary(*op))?;
                let lhs = pop_operand(&mut stack, Operator::Binary(*op))?;
                Expr::Binary(*op, Box::new(lhs), Box::new(rhs))
            }
        };
        stack.push(node);
    }

    match (stack.pop(), stack.is_empty()) {
        (Some(root), true) => Ok(root),
        (None, _) => Err(TreeqError::MalformedExpression("empty expression".to_string())),
        (Some(_), false) => Err(TreeqError::MalformedExpression(format!(
            "{} operands were never consumed",
            stack.len() + 1
        ))),
    }
}

fn pop_operand(stack: &mut Vec<Expr>, op: Operator) -> Result<Expr, TreeqError> {
    stack
        .pop()
        .ok_or_else(|| TreeqError::MalformedExpression(format!("{op} is missing an operand")))
}
