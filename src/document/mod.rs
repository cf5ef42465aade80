pub mod candidate;
pub mod node;

pub use candidate::{path_to_string, Candidate, CandidateKey, PathSegment, ResultSet};
pub use node::{Arena, Node, NodeId, NodeKind, Style};
