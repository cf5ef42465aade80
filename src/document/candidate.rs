use indexmap::IndexMap;

use super::node::NodeId;

/// One step from a node to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{key}"),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Render a path the way it is shown in debug output: `[a, b, 0]`.
pub fn path_to_string(path: &[PathSegment]) -> String {
    let parts: Vec<String> = path.iter().map(|p| p.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

/// A matched location: a node handle plus the document and path it was reached by.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub node: NodeId,
    pub document: usize,
    pub path: Vec<PathSegment>,
    /// Set for values manufactured by an operator rather than found by traversal.
    pub detached: bool,
}

/// De-duplication key of a candidate within a [`ResultSet`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CandidateKey {
    Located(usize, Vec<PathSegment>),
    Detached(NodeId),
}

impl Candidate {
    pub fn root(node: NodeId, document: usize) -> Self {
        Candidate {
            node,
            document,
            path: Vec::new(),
            detached: false,
        }
    }

    /// A candidate for a child of this one, reached through `segment`.
    pub fn child(&self, node: NodeId, segment: PathSegment) -> Self {
        let mut path = self.path.clone();
        path.push(segment);
        Candidate {
            node,
            document: self.document,
            path,
            detached: self.detached,
        }
    }

    /// The same location, now pointing at a different node.
    pub fn with_node(&self, node: NodeId) -> Self {
        Candidate {
            node,
            ..self.clone()
        }
    }

    /// A freshly manufactured value produced on behalf of this candidate.
    pub fn derive(&self, node: NodeId) -> Self {
        Candidate {
            node,
            document: self.document,
            path: self.path.clone(),
            detached: true,
        }
    }

    pub fn key(&self) -> CandidateKey {
        if self.detached {
            CandidateKey::Detached(self.node)
        } else {
            CandidateKey::Located(self.document, self.path.clone())
        }
    }
}

/// Ordered, key de-duplicated collection of candidates. The first candidate seen
/// for a key wins and keeps its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    entries: IndexMap<CandidateKey, Candidate>,
}

impl ResultSet {
    pub fn new() -> Self {
        ResultSet {
            entries: IndexMap::new(),
        }
    }

    pub fn singleton(candidate: Candidate) -> Self {
        let mut set = ResultSet::new();
        set.insert(candidate);
        set
    }

    /// Returns false if a candidate with the same key was already present.
    pub fn insert(&mut self, candidate: Candidate) -> bool {
        let key = candidate.key();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, candidate);
        true
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = Candidate>) {
        for candidate in other {
            self.insert(candidate);
        }
    }

    /// Concatenation of both sets, de-duplicated, in first-seen order.
    pub fn union(mut self, other: ResultSet) -> ResultSet {
        self.extend(other);
        self
    }

    pub fn contains_key(&self, key: &CandidateKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn first(&self) -> Option<&Candidate> {
        self.entries.values().next()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Candidate> {
        self.entries.into_values().collect()
    }
}

impl FromIterator<Candidate> for ResultSet {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        let mut set = ResultSet::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for ResultSet {
    type Item = Candidate;
    type IntoIter = indexmap::map::IntoValues<CandidateKey, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}
