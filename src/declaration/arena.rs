use super::{Declaration, DeclFacts, NamespaceFacts};
use crate::types::{DeclCounter, DeclId, DeclKind};
use std::collections::HashMap;

/// Owning storage for one declaration tree.
///
/// Nodes are addressed by [`DeclId`]; the first node is always the global
/// namespace. Qualified names are unique inside an arena, so `by_qualified`
/// is the merge key index.
#[derive(Debug, Clone)]
pub struct DeclArena {
    nodes: Vec<Declaration>,
    counter: DeclCounter,
    by_qualified: HashMap<String, DeclId>,
    by_name: HashMap<String, Vec<DeclId>>,
}

impl DeclArena {
    pub fn new() -> Self {
        let mut arena = Self {
            nodes: Vec::new(),
            counter: DeclCounter::new(),
            by_qualified: HashMap::new(),
            by_name: HashMap::new(),
        };
        let root = Declaration::new(
            DeclKind::Namespace,
            "",
            "",
            DeclFacts::Namespace(NamespaceFacts::default()),
        );
        arena.push(root);
        arena
    }

    fn push(&mut self, mut decl: Declaration) -> DeclId {
        let id = self.counter.next_id();
        decl.id = id;
        self.by_qualified
            .entry(decl.qualified_name.clone())
            .or_insert(id);
        if !decl.name.is_empty() {
            self.by_name.entry(decl.name.to_string()).or_default().push(id);
        }
        self.nodes.push(decl);
        id
    }

    /// The global namespace.
    pub fn root(&self) -> DeclId {
        DeclId(1)
    }

    /// Append `decl` as the last child of `parent` and derive its qualified name.
    pub fn alloc(&mut self, parent: DeclId, mut decl: Declaration) -> DeclId {
        decl.qualified_name = join_qualified(&self.node(parent).qualified_name, &decl.segment);
        decl.parent = Some(parent);
        let id = self.push(decl);
        self.node_mut(parent).children.push(id);
        id
    }

    pub fn get(&self, id: DeclId) -> Option<&Declaration> {
        if id.0 == 0 {
            return None;
        }
        self.nodes.get(id.index())
    }

    /// Node lookup for ids handed out by this arena.
    pub fn node(&self, id: DeclId) -> &Declaration {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: DeclId) -> &mut Declaration {
        &mut self.nodes[id.index()]
    }

    pub fn lookup(&self, qualified_name: &str) -> Option<DeclId> {
        self.by_qualified.get(qualified_name).copied()
    }

    /// All declarations with this simple name, in creation order.
    pub fn with_name(&self, name: &str) -> &[DeclId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn children(&self, id: DeclId) -> &[DeclId] {
        &self.node(id).children
    }

    /// Child of `parent` whose qualified-name segment is `segment`.
    pub fn child_by_segment(&self, parent: DeclId, segment: &str) -> Option<DeclId> {
        let qualified = join_qualified(&self.node(parent).qualified_name, segment);
        self.lookup(&qualified)
            .filter(|id| self.node(*id).parent == Some(parent))
    }

    /// Parent chain of `id`, nearest first, ending with the global namespace.
    pub fn ancestors(&self, id: DeclId) -> impl Iterator<Item = DeclId> + '_ {
        std::iter::successors(self.node(id).parent, move |current| {
            self.node(*current).parent
        })
    }

    /// Resolve `name` as seen from `scope`: try `scope`, then each enclosing scope.
    pub fn resolve_in_scope(&self, scope: DeclId, name: &str) -> Option<DeclId> {
        let name = name.trim_start_matches("::");
        std::iter::once(scope)
            .chain(self.ancestors(scope))
            .find_map(|candidate| {
                let qualified = join_qualified(&self.node(candidate).qualified_name, name);
                self.lookup(&qualified)
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.nodes.iter()
    }

    /// Ids in depth-first pre-order starting at the global namespace.
    pub fn preorder(&self) -> Vec<DeclId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        order
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for DeclArena {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn join_qualified(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}::{segment}")
    }
}
