use log::trace;

use crate::error::TreeqError;

use super::ast::Leaf;
use super::lexer::{Token, TokenKind};
use super::operator::{Operator, UnaryOp};

/// One element of a postfix (reverse Polish) expression.
#[derive(Debug, Clone, PartialEq)]
pub enum PathElement {
    Leaf(Leaf),
    Operator(Operator),
}

impl std::fmt::Display for PathElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathElement::Leaf(leaf) => write!(f, "{leaf}"),
            PathElement::Operator(op) => write!(f, "{op}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bracket {
    Sentinel,
    Paren,
    Collect,
}

#[derive(Debug)]
enum StackEntry {
    Open(Bracket),
    Op(Operator),
}

/// Shunting-yard conversion of an infix token stream into postfix order.
pub fn to_postfix(tokens: &[Token]) -> Result<Vec<PathElement>, TreeqError> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut stack = vec![StackEntry::Open(Bracket::Sentinel)];

    for token in tokens {
        match &token.kind {
            TokenKind::Leaf(leaf) => output.push(PathElement::Leaf(leaf.clone())),
            // nullary operators are operands as far as grouping is concerned
            TokenKind::Operator(op @ Operator::Nullary(_)) => {
                output.push(PathElement::Operator(*op))
            }
            TokenKind::Operator(op) => {
                while let Some(StackEntry::Op(top)) = stack.last() {
                    if top.precedence() < op.precedence() {
                        break;
                    }
                    output.push(PathElement::Operator(*top));
                    stack.pop();
                }
                stack.push(StackEntry::Op(*op));
            }
            TokenKind::OpenBracket => stack.push(StackEntry::Open(Bracket::Paren)),
            TokenKind::OpenCollect => stack.push(StackEntry::Open(Bracket::Collect)),
            TokenKind::CloseBracket => close(&mut stack, &mut output, Bracket::Paren)?,
            TokenKind::CloseCollect => {
                close(&mut stack, &mut output, Bracket::Collect)?;
                output.push(PathElement::Operator(Operator::Unary(UnaryOp::Collect)));
            }
        }
    }

    close(&mut stack, &mut output, Bracket::Sentinel)?;
    if !stack.is_empty() {
        return Err(TreeqError::UnbalancedBrackets);
    }

    trace!(
        "postfix: {}",
        output.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(" ")
    );
    Ok(output)
}

/// Pop operators to the output until the matching open bracket is found.
fn close(
    stack: &mut Vec<StackEntry>,
    output: &mut Vec<PathElement>,
    expected: Bracket,
) -> Result<(), TreeqError> {
    loop {
        match stack.pop() {
            Some(StackEntry::Op(op)) => output.push(PathElement::Operator(op)),
            Some(StackEntry::Open(bracket)) if bracket == expected => return Ok(()),
            _ => return Err(TreeqError::UnbalancedBrackets),
        }
    }
}
