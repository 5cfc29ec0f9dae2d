use std::collections::HashMap;
use std::sync::RwLock;

/// Wraps a raw tag in the client-facing angle-bracket form, e.g. `<V3>`.
pub fn bracketed(tag: &str) -> String {
    format!("<{}>", tag)
}

/// Outcome of validating a client token against the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extension {
    /// The token resolved to a recorded head (or carried no dependency); a
    /// fresh tag was issued and the chain grew by one edge.
    Extended { token: String },
    /// The token does not resolve to anything this node has seen. The owner
    /// of the target shard rejects; a non-owner escalates to forwarding,
    /// since the owning shard may still validate it.
    Unknown,
}

/// The cluster-wide causal history: a parent-to-child mapping of version
/// tags, global across all shards.
///
/// Each tag has at most one recorded child, so the map is a forest of linear
/// chains. Every accepted write anywhere in the cluster eventually adds
/// exactly one edge on every node, via the selfish broadcast; convergence
/// relies on replication, not on globally unique tag allocation.
#[derive(Default)]
pub struct VersionChain {
    edges: RwLock<HashMap<String, String>>,
}

impl VersionChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follows parent-to-child pointers from `tag` until no child is
    /// recorded; the result is the tag's current causal head.
    pub fn resolve(&self, tag: &str) -> String {
        let edges = self.edges.read().unwrap_or_else(|e| e.into_inner());
        let mut head = tag;
        while let Some(next) = edges.get(head) {
            head = next;
        }
        head.to_string()
    }

    /// A token is a known head when some write has already built on it,
    /// i.e. it appears among the recorded children, or when the chain is
    /// still empty and the token carries no dependency.
    pub fn is_known_head(&self, token: &str) -> bool {
        let edges = self.edges.read().unwrap_or_else(|e| e.into_inner());
        edges.values().any(|child| child == token) || (edges.is_empty() && token.is_empty())
    }

    /// Inserts the edge `parent -> child`. Idempotent when already present.
    pub fn record(&self, parent: &str, child: &str) {
        let mut edges = self.edges.write().unwrap_or_else(|e| e.into_inner());
        edges.insert(parent.to_string(), child.to_string());
    }

    pub fn len(&self) -> usize {
        self.edges.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validates a client-supplied causal token and, on acceptance, extends
    /// the chain by one edge and issues the new tag. Runs as a single
    /// critical section so resolve and record cannot interleave with a
    /// concurrent validation.
    ///
    /// An empty token means "no dependency" and always validates: on an
    /// empty chain the edge `V0 -> V1` is recorded, otherwise a fresh edge
    /// past the current length (tag numbers may skip; replication converges
    /// all nodes to the same chain regardless). A non-empty token is
    /// stripped of its brackets and resolved to its head, which must be a
    /// recorded child unless the chain is still empty.
    pub fn validate_and_extend(&self, token: &str) -> Extension {
        let mut edges = self.edges.write().unwrap_or_else(|e| e.into_inner());

        if token.is_empty() {
            let (parent, child) = if edges.is_empty() {
                ("V0".to_string(), "V1".to_string())
            } else {
                (
                    format!("V{}", edges.len() + 1),
                    format!("V{}", edges.len() + 2),
                )
            };
            edges.insert(parent, child.clone());
            return Extension::Extended { token: child };
        }

        let tag = token.trim_start_matches('<').trim_end_matches('>');
        let mut head = tag;
        while let Some(next) = edges.get(head) {
            head = next;
        }
        let head = head.to_string();

        if edges.values().any(|child| child == &head) || edges.is_empty() {
            let child = format!("V{}", edges.len() + 1);
            edges.insert(head, child.clone());
            Extension::Extended { token: child }
        } else {
            Extension::Unknown
        }
    }

    /// Full copy of the chain, for anti-entropy transfers.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.edges
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replaces the whole chain with a peer's snapshot.
    pub fn replace(&self, edges: HashMap<String, String>) {
        *self.edges.write().unwrap_or_else(|e| e.into_inner()) = edges;
    }
}
