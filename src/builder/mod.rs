//! Per-unit declaration graph builder.
//!
//! Walks the front-end tree of one translation unit and creates one
//! [`Declaration`] per semantic entity, computing qualified names, folding
//! redeclarations and out-of-line definitions into the first node with the
//! same key. Malformed nodes are reported as [`BuildError`]s and skipped.

pub mod merge;

pub use merge::{DeclarationGraph, merge_units};

use crate::declaration::{
    AccessMarker, AggregateFacts, AggregateKey, Argument, CallableFacts, DeclArena, DeclFacts,
    Declaration, FieldFacts, MethodFacts, NamespaceFacts, VariableFacts,
    template::render_arguments,
};
use crate::error::{BuildError, BuildErrorCode};
use crate::frontend::{NodeKind, SourceNode, StorageSpecifier, TemplateClause, TranslationUnit};
use crate::types::{DeclId, DeclKind, TypeDescriptor, UnitId};

/// Largest accepted bitfield width.
const MAX_BIT_WIDTH: u32 = 64;

/// The declaration tree of one translation unit.
#[derive(Debug, Clone)]
pub struct UnitTree {
    pub(crate) id: UnitId,
    pub(crate) name: String,
    pub(crate) arena: DeclArena,
}

impl UnitTree {
    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arena(&self) -> &DeclArena {
        &self.arena
    }

    pub(crate) fn arena_mut(&mut self) -> &mut DeclArena {
        &mut self.arena
    }

    pub fn find(&self, qualified_name: &str) -> Option<&Declaration> {
        self.arena
            .lookup(qualified_name)
            .map(|id| self.arena.node(id))
    }
}

/// Build the declaration tree of `unit`.
pub fn build_unit(id: UnitId, unit: &TranslationUnit) -> (UnitTree, Vec<BuildError>) {
    UnitBuilder::new(id, &unit.name).build(&unit.nodes)
}

pub struct UnitBuilder<'a> {
    unit: UnitId,
    unit_name: &'a str,
    debug: bool,
    arena: DeclArena,
    errors: Vec<BuildError>,
}

impl<'a> UnitBuilder<'a> {
    pub fn new(unit: UnitId, unit_name: &'a str) -> Self {
        Self {
            unit,
            unit_name,
            debug: crate::config::is_global_debug_enabled(),
            arena: DeclArena::new(),
            errors: Vec::new(),
        }
    }

    pub fn build(mut self, nodes: &[SourceNode]) -> (UnitTree, Vec<BuildError>) {
        let root = self.arena.root();
        for node in nodes {
            self.build_node(node, root);
        }

        debug_print!(
            self,
            "unit {} built: {} declarations, {} errors",
            self.unit_name,
            self.arena.len(),
            self.errors.len()
        );

        let tree = UnitTree {
            id: self.unit,
            name: self.unit_name.to_string(),
            arena: self.arena,
        };
        (tree, self.errors)
    }

    fn error(&mut self, node: &SourceNode, code: BuildErrorCode, detail: impl Into<String>) {
        self.errors
            .push(BuildError::new(node.location.clone(), code, detail));
    }

    fn build_node(&mut self, node: &SourceNode, parent: DeclId) {
        match node.kind {
            NodeKind::Namespace => self.build_namespace(node, parent),
            NodeKind::Class | NodeKind::Struct | NodeKind::Union => {
                self.build_aggregate(node, parent, None);
            }
            NodeKind::Function | NodeKind::Method | NodeKind::Constructor => {
                self.build_callable(node, parent)
            }
            NodeKind::Field => self.build_field(node, parent),
            NodeKind::Variable => self.build_variable(node, parent),
            NodeKind::AccessSpecifier => self.record_access_marker(node, parent),
            NodeKind::TypeAlias => self.build_alias(node, parent),
            NodeKind::Unsupported => {
                self.error(node, BuildErrorCode::UnsupportedNode, "node kind not modeled");
            }
        }
    }

    fn build_namespace(&mut self, node: &SourceNode, parent: DeclId) {
        if !matches!(self.arena.node(parent).facts, DeclFacts::Namespace(_)) {
            self.error(
                node,
                BuildErrorCode::UnsupportedNode,
                "namespace outside namespace scope",
            );
            return;
        }

        // `namespace a::b {}` opens each enclosing level first
        let mut scope = parent;
        for segment in &node.scope {
            let draft = self.namespace_draft(node, segment, segment, false);
            match self.place(scope, draft, node, false) {
                Some(id) => scope = id,
                None => return,
            }
        }

        let draft = match node.declared_name() {
            Some(name) => self.namespace_draft(node, name, name, false),
            None => {
                let segment = format!("(anonymous namespace@{})", self.unit_name);
                self.namespace_draft(node, "", &segment, true)
            }
        };

        if let Some(id) = self.place(scope, draft, node, false) {
            for child in &node.children {
                self.build_node(child, id);
            }
        }
    }

    fn namespace_draft(
        &self,
        node: &SourceNode,
        name: &str,
        segment: &str,
        anonymous: bool,
    ) -> Declaration {
        self.draft(
            node,
            DeclKind::Namespace,
            name,
            segment,
            DeclFacts::Namespace(NamespaceFacts {
                internal_linkage: anonymous,
            }),
        )
    }

    /// Build an aggregate under `parent`. `alias` names an unnamed aggregate
    /// from an enclosing `typedef`.
    fn build_aggregate(
        &mut self,
        node: &SourceNode,
        parent: DeclId,
        alias: Option<&str>,
    ) -> Option<DeclId> {
        let key = match node.kind {
            NodeKind::Class => AggregateKey::Class,
            NodeKind::Union => AggregateKey::Union,
            _ => AggregateKey::Struct,
        };
        let scope = self.resolve_scope(node, parent)?;
        let clause = node.template.as_ref();

        let (kind, name, segment) = match clause.and_then(|c| c.specializes.as_deref()) {
            Some(primary) => (
                specialization_kind(clause),
                primary.to_string(),
                specialization_segment(primary, clause),
            ),
            None => {
                let kind = if clause.is_some_and(|c| !c.parameters.is_empty()) {
                    DeclKind::TemplateClass
                } else {
                    match key {
                        AggregateKey::Class => DeclKind::Class,
                        AggregateKey::Struct => DeclKind::Struct,
                        AggregateKey::Union => DeclKind::Union,
                    }
                };
                match alias.or(node.declared_name()) {
                    Some(name) => (kind, name.to_string(), name.to_string()),
                    None => (
                        kind,
                        String::new(),
                        format!(
                            "(anonymous {} at {}:{})",
                            key.keyword(),
                            node.location.line,
                            node.location.column
                        ),
                    ),
                }
            }
        };

        let mut draft = self.draft(
            node,
            kind,
            &name,
            &segment,
            DeclFacts::Aggregate(AggregateFacts::new(key, node.is_definition)),
        );
        attach_template_clause(&mut draft, clause);

        let id = self.place(scope, draft, node, !node.scope.is_empty())?;
        for child in &node.children {
            self.build_node(child, id);
        }

        // An unnamed member aggregate with no declarator promotes its members
        if name.is_empty() && self.arena.node(scope).is_aggregate() {
            self.mark_anonymous(id);
            self.add_anonymous_field(node, scope, id);
        }

        Some(id)
    }

    fn mark_anonymous(&mut self, aggregate: DeclId) {
        if let DeclFacts::Aggregate(facts) = &mut self.arena.node_mut(aggregate).facts {
            facts.is_anonymous = true;
        }
        for member in self.arena.children(aggregate).to_vec() {
            if let DeclFacts::Field(facts) = &mut self.arena.node_mut(member).facts {
                facts.is_anonymous = true;
                facts.is_promoted = true;
            }
        }
    }

    fn add_anonymous_field(&mut self, node: &SourceNode, parent: DeclId, aggregate: DeclId) {
        let segment = format!(
            "(anonymous field at {}:{})",
            node.location.line, node.location.column
        );
        let ty = TypeDescriptor::named(self.arena.node(aggregate).segment());
        let mut facts = FieldFacts::new(ty);
        facts.is_anonymous = true;

        let mut draft = self.draft(node, DeclKind::Field, "", &segment, DeclFacts::Field(facts));
        // Documentation belongs to the aggregate
        draft.pending.raw_comments.clear();
        self.place(parent, draft, node, false);
    }

    fn build_callable(&mut self, node: &SourceNode, parent: DeclId) {
        let Some(scope) = self.resolve_scope(node, parent) else {
            return;
        };
        let Some(name) = node.declared_name() else {
            self.error(node, BuildErrorCode::MissingName, "function without a name");
            return;
        };

        let in_aggregate = self.arena.node(scope).is_aggregate();
        let clause = node.template.as_ref();
        let specializes = clause.and_then(|c| c.specializes.as_deref());

        let kind = if specializes.is_some() {
            specialization_kind(clause)
        } else if clause.is_some_and(|c| !c.parameters.is_empty()) {
            DeclKind::TemplateFunction
        } else if node.kind == NodeKind::Constructor
            || (in_aggregate && name == self.arena.node(scope).name())
        {
            DeclKind::Constructor
        } else if in_aggregate {
            DeclKind::Method
        } else {
            DeclKind::Function
        };

        let arguments = normalize_arguments(&node.arguments);
        let method = MethodFacts {
            result_type: if kind == DeclKind::Constructor {
                None
            } else {
                node.ty.clone()
            },
            is_const: node.specifiers.is_const,
            is_virtual: node.specifiers.is_virtual || node.specifiers.is_pure_virtual,
            is_pure_virtual: node.specifiers.is_pure_virtual,
            is_static: in_aggregate && node.specifiers.storage == Some(StorageSpecifier::Static),
            arguments,
        };

        let name = specializes.unwrap_or(name);
        let base = match specializes {
            Some(primary) => specialization_segment(primary, clause),
            None => name.to_string(),
        };
        let segment = signature_segment(&base, &method);

        let mut draft = self.draft(
            node,
            kind,
            name,
            &segment,
            DeclFacts::Callable(CallableFacts {
                method,
                is_definition: node.is_definition,
                storage: None,
            }),
        );
        draft.pending.storage_specifier = node.specifiers.storage;
        attach_template_clause(&mut draft, clause);

        if let Some(id) = self.place(scope, draft, node, !node.scope.is_empty()) {
            for child in &node.children {
                self.build_node(child, id);
            }
        }
    }

    fn build_field(&mut self, node: &SourceNode, parent: DeclId) {
        if node.specifiers.storage == Some(StorageSpecifier::Static) {
            // Static data member
            self.build_variable(node, parent);
            return;
        }
        if !self.arena.node(parent).is_aggregate() {
            self.error(node, BuildErrorCode::UnsupportedNode, "field outside aggregate");
            return;
        }

        // `struct {..} s;` declares the aggregate next to the field
        let nested = node
            .children
            .iter()
            .find(|child| child.is_aggregate())
            .and_then(|child| self.build_aggregate_for_field(child, parent));

        let ty = match (&node.ty, nested) {
            (Some(ty), Some(nested)) => ty.rebased(self.arena.node(nested).segment()),
            (None, Some(nested)) => TypeDescriptor::named(self.arena.node(nested).segment()),
            (Some(ty), None) => ty.clone(),
            (None, None) => {
                self.error(node, BuildErrorCode::UnsupportedNode, "field without a type");
                return;
            }
        };

        if let Some(width) = node.bit_width {
            if width > MAX_BIT_WIDTH {
                self.error(
                    node,
                    BuildErrorCode::InvalidBitWidth,
                    format!("width {width} exceeds {MAX_BIT_WIDTH} bits"),
                );
                return;
            }
            if width == 0 && node.declared_name().is_some() {
                self.error(
                    node,
                    BuildErrorCode::InvalidBitWidth,
                    "named bitfield with zero width",
                );
                return;
            }
        }

        let nested_unnamed = nested.is_some_and(|id| self.arena.node(id).name().is_empty());
        let (name, segment, is_anonymous) = match node.declared_name() {
            Some(name) => (name.to_string(), name.to_string(), false),
            None if node.bit_width.is_some() => (
                String::new(),
                format!(
                    "(unnamed bitfield at {}:{})",
                    node.location.line, node.location.column
                ),
                false,
            ),
            None if nested_unnamed => (
                String::new(),
                format!(
                    "(anonymous field at {}:{})",
                    node.location.line, node.location.column
                ),
                true,
            ),
            None => {
                self.error(node, BuildErrorCode::MissingName, "field without a name");
                return;
            }
        };

        if is_anonymous && let Some(nested) = nested {
            self.mark_anonymous(nested);
        }

        let mut facts = FieldFacts::new(ty);
        facts.is_mutable = node.specifiers.is_mutable;
        facts.is_bitfield = node.bit_width.is_some();
        facts.bit_width = node.bit_width;
        facts.is_anonymous = is_anonymous;

        let mut draft = self.draft(node, DeclKind::Field, &name, &segment, DeclFacts::Field(facts));
        draft.pending.type_layout = node.type_layout;
        self.place(parent, draft, node, false);
    }

    /// Aggregate written inside a field declaration; never anonymous by itself.
    fn build_aggregate_for_field(&mut self, node: &SourceNode, parent: DeclId) -> Option<DeclId> {
        let mut inline = node.clone();
        inline.is_anonymous = false;
        let scope = self.resolve_scope(&inline, parent)?;
        let key = match inline.kind {
            NodeKind::Class => AggregateKey::Class,
            NodeKind::Union => AggregateKey::Union,
            _ => AggregateKey::Struct,
        };
        let kind = match key {
            AggregateKey::Class => DeclKind::Class,
            AggregateKey::Struct => DeclKind::Struct,
            AggregateKey::Union => DeclKind::Union,
        };
        let (name, segment) = match inline.declared_name() {
            Some(name) => (name.to_string(), name.to_string()),
            None => (
                String::new(),
                format!(
                    "(anonymous {} at {}:{})",
                    key.keyword(),
                    inline.location.line,
                    inline.location.column
                ),
            ),
        };
        let draft = self.draft(
            &inline,
            kind,
            &name,
            &segment,
            DeclFacts::Aggregate(AggregateFacts::new(key, inline.is_definition)),
        );
        let id = self.place(scope, draft, &inline, false)?;
        for child in &inline.children {
            self.build_node(child, id);
        }
        Some(id)
    }

    fn build_variable(&mut self, node: &SourceNode, parent: DeclId) {
        let Some(scope) = self.resolve_scope(node, parent) else {
            return;
        };
        let Some(name) = node.declared_name() else {
            self.error(node, BuildErrorCode::MissingName, "variable without a name");
            return;
        };
        let Some(ty) = node.ty.clone() else {
            self.error(node, BuildErrorCode::UnsupportedNode, "variable without a type");
            return;
        };

        let local = self.arena.node(scope).is_callable();
        let mut draft = self.draft(
            node,
            DeclKind::Variable,
            name,
            name,
            DeclFacts::Variable(VariableFacts {
                ty,
                is_definition: node.is_definition,
                storage: None,
            }),
        );
        draft.pending.storage_specifier = node.specifiers.storage;

        if local {
            let segment = self.unique_local_segment(scope, name);
            draft.segment = segment.into();
            self.arena.alloc(scope, draft);
        } else {
            self.place(scope, draft, node, !node.scope.is_empty());
        }
    }

    fn unique_local_segment(&self, scope: DeclId, name: &str) -> String {
        if self.arena.child_by_segment(scope, name).is_none() {
            return name.to_string();
        }
        (2u32..)
            .map(|n| format!("{name}#{n}"))
            .find(|candidate| self.arena.child_by_segment(scope, candidate).is_none())
            .unwrap_or_else(|| name.to_string())
    }

    fn record_access_marker(&mut self, node: &SourceNode, parent: DeclId) {
        let Some(access) = node.specifiers.access else {
            self.error(
                node,
                BuildErrorCode::MisplacedAccessSpecifier,
                "access specifier without a level",
            );
            return;
        };
        if !self.arena.node(parent).is_aggregate() {
            self.error(
                node,
                BuildErrorCode::MisplacedAccessSpecifier,
                "access specifier outside aggregate",
            );
            return;
        }
        let before_child = self.arena.children(parent).len();
        if let DeclFacts::Aggregate(facts) = &mut self.arena.node_mut(parent).facts {
            facts.access_markers.push(AccessMarker {
                before_child,
                access,
                location: node.location.clone(),
            });
        }
    }

    fn build_alias(&mut self, node: &SourceNode, parent: DeclId) {
        let Some(aggregate) = node.children.iter().find(|child| child.is_aggregate()) else {
            debug_print!(self, "skipping type alias {:?}", node.name);
            return;
        };
        match (aggregate.declared_name(), node.declared_name()) {
            (None, Some(alias)) => {
                self.build_aggregate(aggregate, parent, Some(alias));
            }
            _ => {
                self.build_aggregate(aggregate, parent, None);
            }
        }
    }

    /// Scope a node lands in: its lexical parent, or the target of its
    /// qualifier path for out-of-line definitions.
    fn resolve_scope(&mut self, node: &SourceNode, parent: DeclId) -> Option<DeclId> {
        if node.scope.is_empty() || node.kind == NodeKind::Namespace {
            return Some(parent);
        }
        let path = node.scope.join("::");
        let target = self
            .arena
            .resolve_in_scope(parent, &path)
            .filter(|id| {
                matches!(
                    self.arena.node(*id).facts,
                    DeclFacts::Namespace(_) | DeclFacts::Aggregate(_)
                )
            });
        if target.is_none() {
            self.error(
                node,
                BuildErrorCode::UnresolvedQualifier,
                format!("qualifier '{path}' does not name a namespace or class"),
            );
        }
        target
    }

    fn draft(
        &self,
        node: &SourceNode,
        kind: DeclKind,
        name: &str,
        segment: &str,
        facts: DeclFacts,
    ) -> Declaration {
        let mut decl = Declaration::new(kind, name, segment, facts);
        decl.range = node.range();
        decl.unit = Some(self.unit);
        decl.pending.raw_comments = node.comments.clone();
        decl
    }

    /// Insert `draft` under `parent`, or fold it into an existing node with
    /// the same qualified-name segment.
    fn place(
        &mut self,
        parent: DeclId,
        draft: Declaration,
        node: &SourceNode,
        out_of_line: bool,
    ) -> Option<DeclId> {
        match self.arena.child_by_segment(parent, &draft.segment) {
            Some(existing) => self.fold(existing, draft, node),
            None if out_of_line && self.arena.node(parent).is_aggregate() => {
                let message = format!(
                    "no member '{}' declared in '{}'",
                    draft.segment,
                    self.arena.node(parent).qualified_name()
                );
                self.error(node, BuildErrorCode::UnresolvedQualifier, message);
                None
            }
            None => Some(self.arena.alloc(parent, draft)),
        }
    }

    fn fold(
        &mut self,
        existing: DeclId,
        incoming: Declaration,
        node: &SourceNode,
    ) -> Option<DeclId> {
        let current = self.arena.node(existing);
        if current.kind != incoming.kind {
            let message = format!(
                "'{}' redeclared as {} (previously {})",
                current.qualified_name(),
                incoming.kind,
                current.kind
            );
            self.error(node, BuildErrorCode::ConflictingRedeclaration, message);
            return None;
        }
        if current.kind == DeclKind::Namespace {
            return Some(existing);
        }

        match (current.is_definition(), incoming.is_definition()) {
            (true, true) => {
                let message = format!(
                    "'{}' already defined at {}",
                    current.qualified_name(),
                    current.location()
                );
                self.error(node, BuildErrorCode::Redefinition, message);
                None
            }
            (false, true) => {
                let target = self.arena.node_mut(existing);
                adopt_definition(target, incoming);
                Some(existing)
            }
            (_, false) => {
                let target = self.arena.node_mut(existing);
                if target.pending.raw_comments.is_empty() {
                    target.pending.raw_comments = incoming.pending.raw_comments;
                }
                Some(existing)
            }
        }
    }
}

/// Fold a definition into an earlier declaration of the same entity.
fn adopt_definition(target: &mut Declaration, incoming: Declaration) {
    let Declaration {
        range,
        facts,
        mut pending,
        ..
    } = incoming;

    let facts = match (&target.facts, facts) {
        // Out-of-line definitions do not repeat in-class specifiers
        (DeclFacts::Callable(previous), DeclFacts::Callable(mut next)) => {
            next.method.is_virtual |= previous.method.is_virtual;
            next.method.is_pure_virtual |= previous.method.is_pure_virtual;
            next.method.is_static |= previous.method.is_static;
            DeclFacts::Callable(next)
        }
        (_, facts) => facts,
    };

    if !target.pending.raw_comments.is_empty() {
        pending.raw_comments = std::mem::take(&mut target.pending.raw_comments);
    }
    if pending.storage_specifier.is_none() {
        pending.storage_specifier = target.pending.storage_specifier;
    }
    if pending.template_parameters.is_empty() {
        pending.template_parameters = std::mem::take(&mut target.pending.template_parameters);
    }

    target.range = range;
    target.facts = facts;
    target.pending = pending;
}

fn attach_template_clause(decl: &mut Declaration, clause: Option<&TemplateClause>) {
    if let Some(clause) = clause {
        decl.pending.template_parameters = clause.parameters.clone();
        decl.pending.specializes = clause.specializes.as_deref().map(Into::into);
        decl.pending.template_arguments = clause.arguments.clone();
    }
}

/// `template<>` introduces a full specialization; any parameter makes it partial.
fn specialization_segment(primary: &str, clause: Option<&TemplateClause>) -> String {
    render_arguments(primary, clause.map(|c| c.arguments.as_slice()).unwrap_or_default())
}

fn specialization_kind(clause: Option<&TemplateClause>) -> DeclKind {
    if clause.is_some_and(|c| !c.parameters.is_empty()) {
        DeclKind::TemplatePartialSpecialization
    } else {
        DeclKind::TemplateFullSpecialization
    }
}

/// `(void)` declares no parameters.
fn normalize_arguments(arguments: &[Argument]) -> Vec<Argument> {
    match arguments {
        [only] if only.ty.is_void() && only.name.is_none() && !only.ty.is_reference() => Vec::new(),
        _ => arguments.to_vec(),
    }
}

/// `name(T1, T2) const`, with top-level parameter qualifiers dropped.
pub(crate) fn signature_segment(name: &str, method: &MethodFacts) -> String {
    let parameters: Vec<String> = method
        .arguments
        .iter()
        .map(|argument| argument.ty.without_top_level_qualifiers().to_string())
        .collect();
    let mut segment = format!("{name}({})", parameters.join(", "));
    if method.is_const {
        segment.push_str(" const");
    }
    segment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{TemplateArgument, TemplateParameter};
    use crate::declaration::TemplateParameterKind;
    use crate::types::{AccessSpecifier, SourceLocation};

    fn loc(line: u32, column: u32) -> SourceLocation {
        SourceLocation::new("unit.cpp", line, column)
    }

    fn node(kind: NodeKind, name: &str, line: u32) -> SourceNode {
        let name = if name.is_empty() { None } else { Some(name) };
        SourceNode::new(kind, name, loc(line, 1))
    }

    fn field(name: &str, ty: &str, line: u32) -> SourceNode {
        let mut n = node(NodeKind::Field, name, line);
        n.ty = Some(TypeDescriptor::named(ty));
        n
    }

    fn build(nodes: Vec<SourceNode>) -> (UnitTree, Vec<BuildError>) {
        let unit = TranslationUnit::new("unit.cpp", nodes);
        build_unit(UnitId(1), &unit)
    }

    #[test]
    fn test_nested_qualified_names() {
        let mut ns = node(NodeKind::Namespace, "outer", 1);
        let mut class = node(NodeKind::Class, "c1", 2);
        class.children.push(field("m1", "int", 3));
        ns.children.push(class);

        let (tree, errors) = build(vec![ns]);
        assert!(errors.is_empty());
        let m1 = tree.find("outer::c1::m1").unwrap();
        assert_eq!(m1.kind(), DeclKind::Field);
        assert_eq!(tree.find("outer::c1").unwrap().kind(), DeclKind::Class);
    }

    #[test]
    fn test_overloads_get_signature_segments() {
        let mut class = node(NodeKind::Class, "c1", 1);
        let mut a = node(NodeKind::Method, "f", 2);
        a.arguments = vec![Argument::new(
            TypeDescriptor::named("int").with_qualifiers(crate::types::Qualifiers::CONST),
            Some("x"),
        )];
        let mut b = node(NodeKind::Method, "f", 3);
        b.specifiers.is_const = true;
        b.arguments = vec![Argument::new(TypeDescriptor::named("void"), None)];
        class.children.extend([a, b]);

        let (tree, errors) = build(vec![class]);
        assert!(errors.is_empty());
        assert!(tree.find("c1::f(int)").is_some());
        let b = tree.find("c1::f() const").unwrap();
        assert!(b.method_facts().unwrap().arguments.is_empty());
    }

    #[test]
    fn test_out_of_line_definition_folds_into_member() {
        let mut class = node(NodeKind::Class, "c1", 1);
        let mut decl = node(NodeKind::Method, "f1", 2);
        decl.is_definition = false;
        decl.specifiers.is_virtual = true;
        decl.comments = vec![crate::frontend::RawComment::preceding("// in class")];
        class.children.push(decl);

        let mut def = node(NodeKind::Function, "f1", 10);
        def.scope = vec!["c1".to_string()];

        let (tree, errors) = build(vec![class, def]);
        assert!(errors.is_empty(), "{errors:?}");
        let c1 = tree.find("c1").unwrap();
        assert_eq!(c1.children().len(), 1);

        let f1 = tree.find("c1::f1()").unwrap();
        assert_eq!(f1.kind(), DeclKind::Method);
        assert!(f1.is_definition());
        assert!(f1.method_facts().unwrap().is_virtual);
        assert_eq!(f1.location().line, 10);
        assert_eq!(f1.pending.raw_comments[0].text, "// in class");
    }

    #[test]
    fn test_out_of_line_without_declaration_is_unresolved() {
        let class = node(NodeKind::Class, "c1", 1);
        let mut def = node(NodeKind::Function, "missing", 4);
        def.scope = vec!["c1".to_string()];
        let mut stray = node(NodeKind::Function, "g", 6);
        stray.scope = vec!["nowhere".to_string()];

        let (tree, errors) = build(vec![class, def, stray]);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.code == BuildErrorCode::UnresolvedQualifier));
        assert!(tree.find("c1").unwrap().children().is_empty());
    }

    #[test]
    fn test_double_definition_is_redefinition() {
        let a = node(NodeKind::Function, "f", 1);
        let b = node(NodeKind::Function, "f", 2);
        let (tree, errors) = build(vec![a, b]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, BuildErrorCode::Redefinition);
        assert_eq!(tree.find("f()").unwrap().location().line, 1);
    }

    #[test]
    fn test_forward_declaration_then_definition() {
        let mut forward = node(NodeKind::Struct, "S", 1);
        forward.is_definition = false;
        let mut definition = node(NodeKind::Struct, "S", 3);
        definition.children.push(field("x", "int", 4));

        let (tree, errors) = build(vec![forward, definition]);
        assert!(errors.is_empty());
        let s = tree.find("S").unwrap();
        assert!(s.is_definition());
        assert_eq!(s.children().len(), 1);
        assert_eq!(tree.arena().len(), 3);
    }

    #[test]
    fn test_anonymous_member_aggregate_gets_implicit_field() {
        let mut outer = node(NodeKind::Union, "u1", 1);
        let mut inner = SourceNode::new(NodeKind::Struct, None, loc(2, 5));
        inner.is_anonymous = true;
        inner.children.push(field("i", "int", 3));
        outer.children.push(inner);

        let (tree, errors) = build(vec![outer]);
        assert!(errors.is_empty());

        let inner = tree.find("u1::(anonymous struct at 2:5)").unwrap();
        assert!(inner.aggregate_facts().unwrap().is_anonymous);
        let field = tree.find("u1::(anonymous field at 2:5)").unwrap();
        let facts = field.field_facts().unwrap();
        assert!(facts.is_anonymous);
        assert!(!facts.is_promoted);
        assert_eq!(facts.ty.base_name(), "(anonymous struct at 2:5)");

        let promoted = tree.find("u1::(anonymous struct at 2:5)::i").unwrap();
        let facts = promoted.field_facts().unwrap();
        assert!(facts.is_anonymous && facts.is_promoted);
    }

    #[test]
    fn test_unnamed_aggregate_with_declarator_is_not_anonymous() {
        let mut outer = node(NodeKind::Union, "u1", 1);
        let mut s2 = node(NodeKind::Field, "s2", 2);
        let mut inner = SourceNode::new(NodeKind::Struct, None, loc(2, 3));
        inner.children.push(field("i", "int", 3));
        s2.children.push(inner);
        outer.children.push(s2);

        let (tree, errors) = build(vec![outer]);
        assert!(errors.is_empty());
        let s2 = tree.find("u1::s2").unwrap();
        assert!(!s2.field_facts().unwrap().is_anonymous);
        assert_eq!(
            s2.field_facts().unwrap().ty.base_name(),
            "(anonymous struct at 2:3)"
        );
        let inner = tree.find("u1::(anonymous struct at 2:3)").unwrap();
        assert!(!inner.aggregate_facts().unwrap().is_anonymous);
    }

    #[test]
    fn test_access_markers_record_child_positions() {
        let mut class = node(NodeKind::Class, "c1", 1);
        class.children.push(field("a", "int", 2));
        let mut marker = node(NodeKind::AccessSpecifier, "", 3);
        marker.specifiers.access = Some(AccessSpecifier::Public);
        class.children.push(marker);
        class.children.push(field("b", "int", 4));

        let (tree, _) = build(vec![class]);
        let markers = &tree.find("c1").unwrap().aggregate_facts().unwrap().access_markers;
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].before_child, 1);
        assert_eq!(markers[0].access, AccessSpecifier::Public);
    }

    #[test]
    fn test_misplaced_access_specifier() {
        let mut marker = node(NodeKind::AccessSpecifier, "", 1);
        marker.specifiers.access = Some(AccessSpecifier::Public);
        let (_, errors) = build(vec![marker]);
        assert_eq!(errors[0].code, BuildErrorCode::MisplacedAccessSpecifier);
    }

    #[test]
    fn test_repeated_local_names_are_numbered() {
        let mut function = node(NodeKind::Function, "f", 1);
        let mut i = node(NodeKind::Variable, "i", 2);
        i.ty = Some(TypeDescriptor::named("int"));
        function.children.extend([i.clone(), i.clone(), i]);

        let (tree, errors) = build(vec![function]);
        assert!(errors.is_empty());
        assert!(tree.find("f()::i").is_some());
        assert!(tree.find("f()::i#2").is_some());
        assert!(tree.find("f()::i#3").is_some());
    }

    #[test]
    fn test_anonymous_namespace_segment_names_the_unit() {
        let mut ns = node(NodeKind::Namespace, "", 1);
        let mut v = node(NodeKind::Variable, "hidden", 2);
        v.ty = Some(TypeDescriptor::named("int"));
        ns.children.push(v);

        let (tree, _) = build(vec![ns]);
        assert!(tree.find("(anonymous namespace@unit.cpp)::hidden").is_some());
    }

    #[test]
    fn test_typedef_names_unnamed_struct() {
        let mut alias = node(NodeKind::TypeAlias, "point_t", 1);
        let mut inner = SourceNode::new(NodeKind::Struct, None, loc(1, 9));
        inner.children.push(field("x", "int", 2));
        alias.children.push(inner);

        let (tree, errors) = build(vec![alias]);
        assert!(errors.is_empty());
        assert_eq!(tree.find("point_t").unwrap().kind(), DeclKind::Struct);
        assert!(tree.find("point_t::x").is_some());
    }

    #[test]
    fn test_specialization_segments_render_arguments() {
        let mut primary = node(NodeKind::Class, "C1", 1);
        primary.template = Some(TemplateClause {
            parameters: vec![
                TemplateParameter::new(TemplateParameterKind::Type, "T"),
                TemplateParameter::new(TemplateParameterKind::NonTypeInteger, "N"),
            ],
            ..Default::default()
        });
        let mut full = node(NodeKind::Class, "C1", 5);
        full.template = Some(TemplateClause {
            parameters: vec![],
            specializes: Some("C1".into()),
            arguments: vec![
                TemplateArgument::Type(TypeDescriptor::named("int")),
                TemplateArgument::Integer(5),
            ],
        });
        let mut partial = node(NodeKind::Class, "C1", 9);
        partial.template = Some(TemplateClause {
            parameters: vec![TemplateParameter::new(
                TemplateParameterKind::NonTypeInteger,
                "N",
            )],
            specializes: Some("C1".into()),
            arguments: vec![
                TemplateArgument::Type(TypeDescriptor::named("float")),
                TemplateArgument::unbound("N"),
            ],
        });

        let (tree, errors) = build(vec![primary, full, partial]);
        assert!(errors.is_empty());
        assert_eq!(tree.find("C1").unwrap().kind(), DeclKind::TemplateClass);
        assert_eq!(
            tree.find("C1<int, 5>").unwrap().kind(),
            DeclKind::TemplateFullSpecialization
        );
        assert_eq!(
            tree.find("C1<float, N>").unwrap().kind(),
            DeclKind::TemplatePartialSpecialization
        );
    }

    #[test]
    fn test_invalid_bit_widths() {
        let mut s = node(NodeKind::Struct, "s", 1);
        let mut zero = field("named", "int", 2);
        zero.bit_width = Some(0);
        let mut wide = field("wide", "long", 3);
        wide.bit_width = Some(65);
        let mut pad = SourceNode::new(NodeKind::Field, None, loc(4, 5));
        pad.ty = Some(TypeDescriptor::named("int"));
        pad.bit_width = Some(0);
        s.children.extend([zero, wide, pad]);

        let (tree, errors) = build(vec![s]);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.code == BuildErrorCode::InvalidBitWidth));
        assert!(tree.find("s::(unnamed bitfield at 4:5)").is_some());
    }

    #[test]
    fn test_unsupported_node_does_not_stop_the_unit() {
        let unsupported = node(NodeKind::Unsupported, "", 1);
        let f = node(NodeKind::Function, "f", 2);
        let (tree, errors) = build(vec![unsupported, f]);
        assert_eq!(errors[0].code, BuildErrorCode::UnsupportedNode);
        assert!(tree.find("f()").is_some());
    }
}
