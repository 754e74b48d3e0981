//! Arena-backed namespace trie.
//!
//! ```text
//! FqnCache
//! └── nodes: Vec<Node>         index 0 is the root
//!     └── Node { name, parent, children (insertion order), payload }
//!
//! "a.B.C" ─add─▶ root ─▶ a ─▶ B ─▶ C(payload)
//! ```
//!
//! Nodes are addressed by [`NodeId`]; a removed subtree's slots are recycled
//! by later insertions. Iteration follows insertion order so that anything
//! generated from a walk is deterministic.

use std::fmt;

use rustc_hash::FxHashMap;

/// Index of a node inside an [`FqnCache`].
pub type NodeId = usize;

/// Segment sanitizer applied to every inserted and looked-up segment.
pub type Sanitizer = fn(&str) -> String;

const ROOT: NodeId = 0;

struct Node<T> {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    lookup: FxHashMap<String, NodeId>,
    payload: Option<T>,
}

impl<T> Node<T> {
    fn new(name: String, parent: Option<NodeId>, payload: Option<T>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            lookup: FxHashMap::default(),
            payload,
        }
    }
}

/// A tree keyed by dot-separated name segments.
pub struct FqnCache<T> {
    nodes: Vec<Node<T>>,
    free: Vec<NodeId>,
    sanitizer: Option<Sanitizer>,
}

impl<T> Default for FqnCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FqnCache<T> {
    /// Create an empty cache that stores segments verbatim.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(String::new(), None, None)],
            free: Vec::new(),
            sanitizer: None,
        }
    }

    /// Create an empty cache that sanitizes every segment with `sanitizer`.
    pub fn with_sanitizer(sanitizer: Sanitizer) -> Self {
        Self {
            sanitizer: Some(sanitizer),
            ..Self::new()
        }
    }

    fn clean(&self, segment: &str) -> String {
        match self.sanitizer {
            Some(sanitize) => sanitize(segment),
            None => segment.to_string(),
        }
    }

    fn segments<'a>(fqn: &'a str) -> impl Iterator<Item = &'a str> {
        fqn.split('.').filter(|s| !s.is_empty())
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Insert `fqn`, creating intermediate nodes, and set its payload.
    ///
    /// Returns the previous payload of the final node.
    pub fn add(&mut self, fqn: &str, payload: T) -> Option<T> {
        let id = self.ensure(fqn);
        self.nodes[id].payload.replace(payload)
    }

    /// Insert `fqn` without a payload. Existing payloads are kept.
    pub fn add_name(&mut self, fqn: &str) -> NodeId {
        self.ensure(fqn)
    }

    fn ensure(&mut self, fqn: &str) -> NodeId {
        let mut current = ROOT;
        for segment in Self::segments(fqn) {
            let segment = self.clean(segment);
            current = match self.nodes[current].lookup.get(&segment) {
                Some(&child) => child,
                None => self.alloc(current, segment),
            };
        }
        current
    }

    fn alloc(&mut self, parent: NodeId, name: String) -> NodeId {
        let node = Node::new(name.clone(), Some(parent), None);
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        let parent_node = &mut self.nodes[parent];
        parent_node.children.push(id);
        parent_node.lookup.insert(name, id);
        id
    }

    /// Remove `fqn` and its whole subtree.
    ///
    /// Returns `false` if the name was not present.
    pub fn remove(&mut self, fqn: &str) -> bool {
        let Some(id) = self.find(fqn) else {
            return false;
        };
        if id == ROOT {
            self.clear();
            return true;
        }
        if let Some(parent) = self.nodes[id].parent {
            let name = self.nodes[id].name.clone();
            let parent_node = &mut self.nodes[parent];
            parent_node.lookup.remove(&name);
            parent_node.children.retain(|&c| c != id);
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let node = &mut self.nodes[next];
            stack.append(&mut node.children);
            node.lookup.clear();
            node.payload = None;
            node.parent = None;
            self.free.push(next);
        }
        true
    }

    /// Remove payload-less leaves at and above `fqn`.
    pub fn prune(&mut self, fqn: &str) {
        let mut current = fqn;
        while !current.is_empty() {
            let removable = self
                .node(current)
                .is_some_and(|node| node.is_leaf() && node.payload().is_none());
            if !removable {
                break;
            }
            self.remove(current);
            current = current.rsplit_once('.').map_or("", |(parent, _)| parent);
        }
    }

    /// Take the payload of `fqn`, leaving the node in place.
    pub fn take(&mut self, fqn: &str) -> Option<T> {
        let id = self.find(fqn)?;
        self.nodes[id].payload.take()
    }

    /// Drop every node.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[ROOT] = Node::new(String::new(), None, None);
        self.free.clear();
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    fn find(&self, fqn: &str) -> Option<NodeId> {
        let mut current = ROOT;
        for segment in Self::segments(fqn) {
            current = *self.nodes[current].lookup.get(&self.clean(segment))?;
        }
        Some(current)
    }

    /// The node for `fqn`; the empty name is the root.
    pub fn node(&self, fqn: &str) -> Option<NodeRef<'_, T>> {
        self.find(fqn).map(|id| NodeRef { cache: self, id })
    }

    /// The root node.
    pub fn root(&self) -> NodeRef<'_, T> {
        NodeRef {
            cache: self,
            id: ROOT,
        }
    }

    /// Payload stored at `fqn`.
    pub fn get(&self, fqn: &str) -> Option<&T> {
        self.find(fqn).and_then(|id| self.nodes[id].payload.as_ref())
    }

    /// Mutable payload stored at `fqn`.
    pub fn get_mut(&mut self, fqn: &str) -> Option<&mut T> {
        let id = self.find(fqn)?;
        self.nodes[id].payload.as_mut()
    }

    /// Whether a node exists for `fqn`.
    pub fn contains(&self, fqn: &str) -> bool {
        self.find(fqn).is_some()
    }

    /// Whether the cache holds no names.
    pub fn is_empty(&self) -> bool {
        self.nodes[ROOT].children.is_empty()
    }

    /// All leaf names, depth first in insertion order.
    pub fn fqns(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_leaves(ROOT, &mut String::new(), &mut names);
        names
    }

    fn collect_leaves(&self, id: NodeId, prefix: &mut String, out: &mut Vec<String>) {
        for &child in &self.nodes[id].children {
            let mark = prefix.len();
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(&self.nodes[child].name);
            if self.nodes[child].children.is_empty() {
                out.push(prefix.clone());
            } else {
                self.collect_leaves(child, prefix, out);
            }
            prefix.truncate(mark);
        }
    }

    /// Every `(fqn, payload)` pair, depth first in insertion order.
    pub fn entries(&self) -> Vec<(String, &T)> {
        let mut out = Vec::new();
        self.root().visit_depth_first(&mut |node| {
            if let Some(payload) = node.payload() {
                out.push((node.fqn(), payload));
            }
            true
        });
        out
    }
}

impl<T: fmt::Debug> fmt::Debug for FqnCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}

// =============================================================================
// NodeRef
// =============================================================================

/// Borrowed view of a node.
pub struct NodeRef<'a, T> {
    cache: &'a FqnCache<T>,
    id: NodeId,
}

impl<T> Clone for NodeRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeRef<'_, T> {}

impl<'a, T> NodeRef<'a, T> {
    fn node(&self) -> &'a Node<T> {
        &self.cache.nodes[self.id]
    }

    /// Arena index of the node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Last segment (empty for the root).
    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    /// Payload, if one was stored.
    pub fn payload(&self) -> Option<&'a T> {
        self.node().payload.as_ref()
    }

    /// A node is a leaf iff it has no children.
    pub fn is_leaf(&self) -> bool {
        self.node().children.is_empty()
    }

    /// Direct child named `segment` (sanitized like insertions).
    pub fn child(&self, segment: &str) -> Option<NodeRef<'a, T>> {
        let id = *self.node().lookup.get(&self.cache.clean(segment))?;
        Some(NodeRef {
            cache: self.cache,
            id,
        })
    }

    /// Children in insertion order.
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a, T>> + 'a {
        let cache = self.cache;
        self.node()
            .children
            .iter()
            .map(move |&id| NodeRef { cache, id })
    }

    /// Walk a dotted relative name from this node.
    pub fn descend(&self, relative: &str) -> Option<NodeRef<'a, T>> {
        let mut current = *self;
        for segment in FqnCache::<T>::segments(relative) {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// Reconstruct the dotted name of this node.
    pub fn fqn(&self) -> String {
        let mut parts = Vec::new();
        let mut current = Some(self.id);
        while let Some(id) = current {
            let node = &self.cache.nodes[id];
            if node.parent.is_some() {
                parts.push(node.name.as_str());
            }
            current = node.parent;
        }
        parts.reverse();
        parts.join(".")
    }

    /// Visit this subtree depth first, children before the node itself.
    ///
    /// Stops early and returns `false` once `visitor` returns `false`.
    pub fn visit_depth_first(&self, visitor: &mut impl FnMut(NodeRef<'a, T>) -> bool) -> bool {
        for child in self.children() {
            if !child.visit_depth_first(visitor) {
                return false;
            }
        }
        visitor(*self)
    }
}

impl<T> fmt::Debug for NodeRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("fqn", &self.fqn())
            .field("leaf", &self.is_leaf())
            .finish()
    }
}
