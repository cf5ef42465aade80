use thiserror::Error;

/// Which stage of the pipeline an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The expression text could not be tokenized.
    Lex,
    /// The token stream could not be arranged into a tree.
    Parse,
    /// Evaluation against a document failed.
    Eval,
    /// Reading, decoding or encoding documents failed.
    Input,
}

#[derive(Error, Debug)]
pub enum TreeqError {
    #[error("lex error at position {position}: unrecognized input '{fragment}'")]
    Lex { position: usize, fragment: String },

    #[error("lex error at position {position}: invalid number literal '{literal}'")]
    InvalidNumber { position: usize, literal: String },

    #[error("bad expression, unbalanced brackets")]
    UnbalancedBrackets,

    #[error("bad expression: {0}")]
    MalformedExpression(String),

    #[error("index [{index}] out of range, array size is {length}")]
    IndexOutOfRange { index: i64, length: usize },

    #[error("index [{index}] is too large to extend a sequence to (limit {limit} elements)")]
    ExtensionLimit { index: i64, limit: usize },

    #[error("cannot multiply {lhs} with {rhs}")]
    IncompatibleMerge { lhs: String, rhs: String },

    #[error("unknown style: '{0}'")]
    UnknownStyle(String),

    #[error("alias cycle detected at {0}")]
    AliasCycle(String),

    #[error("maximum evaluation depth of {0} exceeded")]
    DepthExceeded(usize),

    #[error("parse error: {0}")]
    DocumentParse(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("cannot detect format: no file extension")]
    NoExtension,

    #[error("unknown file extension: .{0}")]
    UnknownExtension(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TreeqError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TreeqError::Lex { .. } | TreeqError::InvalidNumber { .. } => ErrorKind::Lex,
            TreeqError::UnbalancedBrackets | TreeqError::MalformedExpression(_) => {
                ErrorKind::Parse
            }
            TreeqError::IndexOutOfRange { .. }
            | TreeqError::ExtensionLimit { .. }
            | TreeqError::IncompatibleMerge { .. }
            | TreeqError::UnknownStyle(_)
            | TreeqError::AliasCycle(_)
            | TreeqError::DepthExceeded(_) => ErrorKind::Eval,
            TreeqError::DocumentParse(_)
            | TreeqError::UnsupportedFormat(_)
            | TreeqError::NoExtension
            | TreeqError::UnknownExtension(_)
            | TreeqError::Io(_) => ErrorKind::Input,
        }
    }
}
