//! Operator shapes and their precedence table.
//!
//! Arity is carried by the variant an operator lives in, so the tree builder can
//! never produce a node with the wrong number of operands.

/// Operators that take no operand sub-tree and work on the input set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullaryOp {
    Length,
    Not,
    RecursiveDescent,
    GetStyle,
    DocumentFilter(usize),
}

/// Prefix operators whose single operand becomes the right-hand sub-tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Select,
    Count,
    Collect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Pipe,
    Union,
    Or,
    And,
    Equals,
    Assign,
    AssignStyle,
    DeleteChild,
    CreateMap,
    Multiply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Nullary(NullaryOp),
    Unary(UnaryOp),
    Binary(BinaryOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorDescriptor {
    pub name: &'static str,
    pub precedence: u8,
    pub arity: u8,
}

const fn describe(name: &'static str, precedence: u8, arity: u8) -> OperatorDescriptor {
    OperatorDescriptor {
        name,
        precedence,
        arity,
    }
}

impl Operator {
    pub const fn descriptor(&self) -> OperatorDescriptor {
        match self {
            Operator::Binary(BinaryOp::Union) => describe("UNION", 10, 2),
            Operator::Binary(BinaryOp::Or) => describe("OR", 20, 2),
            Operator::Binary(BinaryOp::And) => describe("AND", 20, 2),
            Operator::Binary(BinaryOp::CreateMap) => describe("CREATE_MAP", 30, 2),
            Operator::Binary(BinaryOp::Equals) => describe("EQUALS", 40, 2),
            Operator::Binary(BinaryOp::Assign) => describe("ASSIGN", 40, 2),
            Operator::Binary(BinaryOp::AssignStyle) => describe("ASSIGN_STYLE", 40, 2),
            Operator::Binary(BinaryOp::DeleteChild) => describe("DELETE_CHILD", 40, 2),
            Operator::Binary(BinaryOp::Multiply) => describe("MULTIPLY", 42, 2),
            Operator::Binary(BinaryOp::Pipe) => describe("PIPE", 45, 2),
            Operator::Unary(UnaryOp::Select) => describe("SELECT", 50, 1),
            Operator::Unary(UnaryOp::Count) => describe("COUNT", 50, 1),
            Operator::Unary(UnaryOp::Collect) => describe("COLLECT", 50, 1),
            Operator::Nullary(NullaryOp::Length) => describe("LENGTH", 50, 0),
            Operator::Nullary(NullaryOp::Not) => describe("NOT", 50, 0),
            Operator::Nullary(NullaryOp::RecursiveDescent) => describe("RECURSIVE_DESCENT", 50, 0),
            Operator::Nullary(NullaryOp::GetStyle) => describe("GET_STYLE", 50, 0),
            Operator::Nullary(NullaryOp::DocumentFilter(_)) => describe("DOCUMENT_FILTER", 50, 0),
        }
    }

    pub const fn precedence(&self) -> u8 {
        self.descriptor().precedence
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Nullary(NullaryOp::DocumentFilter(index)) => write!(f, "DOCUMENT_FILTER({index})"),
            other => f.write_str(other.descriptor().name),
        }
    }
}
