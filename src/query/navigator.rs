use log::debug;

use crate::document::node::TAG_FLOAT;
use crate::document::{path_to_string, Arena, Candidate, NodeId, ResultSet};
use crate::error::TreeqError;

use super::ast::{Expr, Leaf, Literal};
use super::operator::BinaryOp;
use super::operators;
use super::traverse::{traverse, Mode, Segment};

/// Evaluation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigatorOptions {
    /// Dereference alias nodes during traversal. When off, aliases are leaves.
    pub follow_aliases: bool,
    /// Bound on evaluator, recursive descent and merge nesting.
    pub max_depth: usize,
}

impl Default for NavigatorOptions {
    fn default() -> Self {
        NavigatorOptions {
            follow_aliases: true,
            max_depth: 512,
        }
    }
}

/// Walks an expression tree against a set of candidates, mutating the arena
/// in place for assignment-like operators.
pub struct Navigator<'a> {
    arena: &'a mut Arena,
    options: NavigatorOptions,
    depth: usize,
}

impl<'a> Navigator<'a> {
    pub fn new(arena: &'a mut Arena) -> Self {
        Self::with_options(arena, NavigatorOptions::default())
    }

    pub fn with_options(arena: &'a mut Arena, options: NavigatorOptions) -> Self {
        Navigator {
            arena,
            options,
            depth: 0,
        }
    }

    pub fn arena(&self) -> &Arena {
        &*self.arena
    }

    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut *self.arena
    }

    pub fn options(&self) -> NavigatorOptions {
        self.options
    }

    /// Evaluate `expr` against `input` in read mode.
    pub fn evaluate(&mut self, input: &ResultSet, expr: &Expr) -> Result<ResultSet, TreeqError> {
        self.eval(input, expr, Mode::Read)
    }

    pub(crate) fn eval(
        &mut self,
        input: &ResultSet,
        expr: &Expr,
        mode: Mode,
    ) -> Result<ResultSet, TreeqError> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            self.depth -= 1;
            return Err(TreeqError::DepthExceeded(self.options.max_depth));
        }
        let result = self.dispatch(input, expr, mode);
        self.depth -= 1;
        result
    }

    /// Evaluate `expr` against a single candidate.
    pub(crate) fn eval_one(
        &mut self,
        candidate: &Candidate,
        expr: &Expr,
        mode: Mode,
    ) -> Result<ResultSet, TreeqError> {
        self.eval(&ResultSet::singleton(candidate.clone()), expr, mode)
    }

    fn dispatch(&mut self, input: &ResultSet, expr: &Expr, mode: Mode) -> Result<ResultSet, TreeqError> {
        match expr {
            Expr::Leaf(Leaf::SelfReference) => Ok(input.clone()),
            Expr::Leaf(Leaf::Value(literal)) => Ok(input
                .iter()
                .map(|candidate| candidate.derive(self.literal_node(literal)))
                .collect()),
            Expr::Leaf(Leaf::PathKey(key)) => self.traverse_all(input, Segment::Key(key), mode),
            Expr::Leaf(Leaf::ArrayIndex(index)) => self.traverse_all(input, Segment::Index(*index), mode),
            Expr::Leaf(Leaf::Splat) => self.traverse_all(input, Segment::Splat, mode),
            Expr::Leaf(Leaf::Append) => self.traverse_all(input, Segment::Append, mode),
            Expr::Nullary(op) => {
                debug!("{:?} over {} candidates", op, input.len());
                operators::nullary(self, input, *op)
            }
            Expr::Unary(op, rhs) => {
                debug!("{:?} over {} candidates", op, input.len());
                operators::unary(self, input, *op, rhs)
            }
            Expr::Binary(BinaryOp::Pipe, lhs, rhs) => {
                let left = self.eval(input, lhs, mode)?;
                self.eval(&left, rhs, mode)
            }
            Expr::Binary(BinaryOp::Union, lhs, rhs) => {
                let left = self.eval(input, lhs, mode)?;
                let right = self.eval(input, rhs, mode)?;
                Ok(left.union(right))
            }
            Expr::Binary(op, lhs, rhs) => {
                debug!("{:?} over {} candidates", op, input.len());
                operators::binary(self, input, *op, lhs, rhs)
            }
        }
    }

    fn traverse_all(
        &mut self,
        input: &ResultSet,
        segment: Segment<'_>,
        mode: Mode,
    ) -> Result<ResultSet, TreeqError> {
        let mut output = ResultSet::new();
        for candidate in input.iter() {
            let found = traverse(self.arena, candidate, segment, mode, self.options.follow_aliases)?;
            if found.is_empty() {
                debug!("{:?} matched nothing at {}", segment, path_to_string(&candidate.path));
            }
            output.extend(found);
        }
        Ok(output)
    }

    fn literal_node(&mut self, literal: &Literal) -> NodeId {
        match literal {
            Literal::Int(n) => self.arena.integer(*n),
            Literal::Float(raw) => self.arena.scalar(TAG_FLOAT, raw.as_str()),
            Literal::Bool(b) => self.arena.boolean(*b),
            Literal::Null => self.arena.null(),
            Literal::String(s) => self.arena.string(s.as_str()),
        }
    }
}
