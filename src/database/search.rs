//! Filtered search, depth-first traversal and shape statistics.

use super::ReflectionDatabase;
use crate::declaration::Declaration;
use crate::types::DeclKind;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    Exact(String),
    Prefix(String),
    Contains(String),
}

impl NameMatch {
    fn matches(&self, name: &str) -> bool {
        match self {
            NameMatch::Exact(expected) => name == expected,
            NameMatch::Prefix(prefix) => name.starts_with(prefix.as_str()),
            NameMatch::Contains(part) => name.contains(part.as_str()),
        }
    }
}

/// Declaration filter. An empty query matches every declaration except the
/// global namespace.
#[derive(Debug, Clone, Default)]
pub struct DeclQuery {
    kinds: Vec<DeclKind>,
    name: Option<NameMatch>,
    limit: Option<usize>,
}

impl DeclQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `kind`; may be called repeatedly.
    pub fn kind(mut self, kind: DeclKind) -> Self {
        self.kinds.push(kind);
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(NameMatch::Exact(name.to_string()));
        self
    }

    pub fn name_prefix(mut self, prefix: &str) -> Self {
        self.name = Some(NameMatch::Prefix(prefix.to_string()));
        self
    }

    pub fn name_contains(mut self, part: &str) -> Self {
        self.name = Some(NameMatch::Contains(part.to_string()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, decl: &Declaration) -> bool {
        (self.kinds.is_empty() || self.kinds.contains(&decl.kind()))
            && self
                .name
                .as_ref()
                .is_none_or(|pattern| pattern.matches(decl.name()))
    }
}

/// Callbacks for [`ReflectionDatabase::walk`].
///
/// `index` is the position among the parent's children; the start node has
/// depth 0 and index 0. Returning `false` from `enter` skips the subtree,
/// `leave` is still called for that node.
pub trait DeclVisitor {
    fn enter(&mut self, decl: &Declaration, depth: usize, index: usize) -> bool {
        let _ = (decl, depth, index);
        true
    }

    fn leave(&mut self, decl: &Declaration, depth: usize, index: usize) {
        let _ = (decl, depth, index);
    }
}

/// Shape of a frozen graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Declarations excluding the global namespace.
    pub declarations: usize,
    pub max_children: usize,
    /// Deepest nesting; top-level declarations have depth 1.
    pub max_depth: usize,
    pub by_kind: BTreeMap<String, usize>,
}

impl DeclVisitor for GraphStats {
    fn enter(&mut self, decl: &Declaration, depth: usize, _index: usize) -> bool {
        self.max_children = self.max_children.max(decl.children().len());
        if depth > 0 {
            self.declarations += 1;
            self.max_depth = self.max_depth.max(depth);
            *self.by_kind.entry(decl.kind().to_string()).or_default() += 1;
        }
        true
    }
}

impl ReflectionDatabase {
    /// Declarations matching `query`, in depth-first declaration order.
    pub fn search(&self, query: &DeclQuery) -> Vec<&Declaration> {
        let limit = query.limit.unwrap_or(usize::MAX);
        self.arena()
            .preorder()
            .into_iter()
            .skip(1)
            .map(|id| self.arena().node(id))
            .filter(|decl| query.matches(decl))
            .take(limit)
            .collect()
    }

    /// Depth-first walk of the subtree rooted at `start`.
    pub fn walk<V: DeclVisitor + ?Sized>(&self, start: &Declaration, visitor: &mut V) {
        self.walk_from(start, 0, 0, visitor);
    }

    fn walk_from<V: DeclVisitor + ?Sized>(
        &self,
        decl: &Declaration,
        depth: usize,
        index: usize,
        visitor: &mut V,
    ) {
        if visitor.enter(decl, depth, index) {
            for (child_index, child) in self.children_of(decl).enumerate() {
                self.walk_from(child, depth + 1, child_index, visitor);
            }
        }
        visitor.leave(decl, depth, index);
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats::default();
        self.walk(self.root(), &mut stats);
        stats
    }
}
