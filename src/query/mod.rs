pub mod ast;
pub mod lexer;
mod merge;
pub mod navigator;
pub mod operator;
mod operators;
pub mod postfix;
pub mod traverse;

use log::debug;

use crate::document::{Arena, Candidate, NodeId, ResultSet};
use crate::error::TreeqError;

pub use ast::Expr;
pub use navigator::{Navigator, NavigatorOptions};

/// Parse an expression into a tree that can be evaluated any number of times.
pub fn parse_path(expression: &str) -> Result<Expr, TreeqError> {
    let mut lex = lexer::Lexer::new(expression);
    lex.tokenize()?;
    let postfix = postfix::to_postfix(&lex.tokens)?;
    let expr = ast::build_tree(&postfix)?;
    debug!("parsed {:?} as {}", expression, expr);
    Ok(expr)
}

/// Evaluate a parsed expression against a set of starting candidates.
pub fn evaluate(arena: &mut Arena, roots: &[Candidate], expr: &Expr) -> Result<Vec<Candidate>, TreeqError> {
    evaluate_with_options(arena, roots, expr, NavigatorOptions::default())
}

pub fn evaluate_with_options(
    arena: &mut Arena,
    roots: &[Candidate],
    expr: &Expr,
    options: NavigatorOptions,
) -> Result<Vec<Candidate>, TreeqError> {
    let input: ResultSet = roots.iter().cloned().collect();
    let mut navigator = Navigator::with_options(arena, options);
    Ok(navigator.evaluate(&input, expr)?.into_vec())
}

/// Parse `expression` and evaluate it against every document, numbering the
/// documents from 0 in the order given.
pub fn query(arena: &mut Arena, documents: &[NodeId], expression: &str) -> Result<Vec<Candidate>, TreeqError> {
    let expr = parse_path(expression)?;
    let roots: Vec<Candidate> = documents
        .iter()
        .enumerate()
        .map(|(index, &doc)| Candidate::root(doc, index))
        .collect();
    evaluate(arena, &roots, &expr)
}
