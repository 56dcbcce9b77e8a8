//! The frozen, read-only declaration graph and its query API.
//!
//! A [`ReflectionDatabase`] is cheap to clone and safe to share across
//! threads; no query mutates it.

mod search;

pub use search::{DeclQuery, DeclVisitor, GraphStats, NameMatch};

use crate::declaration::{
    CommentBlock, DeclArena, Declaration, MethodFacts, StorageFacts, TemplateArgument,
    TemplateFacts, TemplateParameter,
};
use crate::error::{QueryError, QueryResult};
use crate::layout::AggregateLayout;
use crate::types::{AccessSpecifier, DeclId};
use serde::Serialize;
use std::sync::Arc;

/// Placement of one field inside its nearest named aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldLayout {
    pub byte_offset: u64,
    pub bit_width: Option<u32>,
    pub bit_offset: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ReflectionDatabase {
    arena: Arc<DeclArena>,
}

impl ReflectionDatabase {
    pub(crate) fn new(arena: DeclArena) -> Self {
        Self {
            arena: Arc::new(arena),
        }
    }

    /// The global namespace.
    pub fn root(&self) -> &Declaration {
        self.arena.node(self.arena.root())
    }

    pub fn get(&self, id: DeclId) -> Option<&Declaration> {
        self.arena.get(id)
    }

    pub fn parent_of(&self, decl: &Declaration) -> Option<&Declaration> {
        decl.parent.and_then(|id| self.arena.get(id))
    }

    pub fn children_of<'a>(
        &'a self,
        decl: &'a Declaration,
    ) -> impl Iterator<Item = &'a Declaration> {
        decl.children.iter().filter_map(|id| self.arena.get(*id))
    }

    /// Number of declarations, the global namespace included.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.len() <= 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.arena.iter()
    }

    /// Look up a declaration by qualified name.
    ///
    /// A function may also be named without its parameter list when exactly
    /// one overload carries that name.
    pub fn find_declaration(&self, qualified_name: &str) -> Option<&Declaration> {
        let qualified_name = qualified_name.trim().trim_start_matches("::");
        if let Some(id) = self.arena.lookup(qualified_name) {
            return self.arena.get(id);
        }

        let (scope, segment) = split_last_segment(qualified_name);
        if segment.contains('(') {
            return None;
        }
        let scope = match scope {
            Some(path) => self.arena.lookup(path)?,
            None => self.arena.root(),
        };

        let mut overloads = self
            .arena
            .children(scope)
            .iter()
            .map(|id| self.arena.node(*id))
            .filter(|decl| decl.is_callable() && signature_stem(decl.segment()) == segment);
        match (overloads.next(), overloads.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }

    /// Direct members of an aggregate in declaration order.
    ///
    /// An anonymous struct/union contributes its implicit field followed by
    /// its promoted members; the anonymous aggregate itself is not listed.
    pub fn list_members(&self, aggregate: &Declaration) -> QueryResult<Vec<&Declaration>> {
        if !aggregate.is_aggregate() {
            return Err(wrong_kind(aggregate, "class, struct or union"));
        }
        let mut members = Vec::new();
        self.collect_members(aggregate, &mut members);
        Ok(members)
    }

    fn collect_members<'a>(&'a self, aggregate: &Declaration, members: &mut Vec<&'a Declaration>) {
        for &child in &aggregate.children {
            let decl = self.arena.node(child);
            if decl.aggregate_facts().is_some_and(|facts| facts.is_anonymous) {
                continue;
            }
            members.push(decl);

            let Some(field) = decl.field_facts().filter(|facts| facts.is_anonymous) else {
                continue;
            };
            if let Some(nested) = self
                .arena
                .resolve_in_scope(aggregate.id, field.ty.base_name())
                .map(|id| self.arena.node(id))
                .filter(|nested| {
                    nested
                        .aggregate_facts()
                        .is_some_and(|facts| facts.is_anonymous)
                })
            {
                self.collect_members(nested, members);
            }
        }
    }

    /// Effective access of an aggregate member.
    pub fn access_of(&self, decl: &Declaration) -> QueryResult<AccessSpecifier> {
        decl.access
            .ok_or_else(|| wrong_kind(decl, "member of a class, struct or union"))
    }

    pub fn layout_of(&self, field: &Declaration) -> QueryResult<FieldLayout> {
        let facts = field
            .field_facts()
            .ok_or_else(|| wrong_kind(field, "field"))?;
        let byte_offset = facts
            .byte_offset
            .ok_or_else(|| QueryError::LayoutUnavailable(field.qualified_name.clone()))?;
        Ok(FieldLayout {
            byte_offset,
            bit_width: facts.bit_width,
            bit_offset: facts.bit_offset,
        })
    }

    pub fn size_of(&self, aggregate: &Declaration) -> QueryResult<AggregateLayout> {
        let facts = aggregate
            .aggregate_facts()
            .ok_or_else(|| wrong_kind(aggregate, "class, struct or union"))?;
        match (facts.size, facts.align) {
            (Some(size), Some(align)) => Ok(AggregateLayout { size, align }),
            _ => Err(QueryError::LayoutUnavailable(
                aggregate.qualified_name.clone(),
            )),
        }
    }

    pub fn signature_of<'a>(&self, decl: &'a Declaration) -> QueryResult<&'a MethodFacts> {
        decl.method_facts()
            .ok_or_else(|| wrong_kind(decl, "function, method or constructor"))
    }

    pub fn storage_of(&self, decl: &Declaration) -> QueryResult<StorageFacts> {
        decl.storage_facts()
            .copied()
            .ok_or_else(|| wrong_kind(decl, "variable or non-member function"))
    }

    pub fn documentation_of<'a>(&self, decl: &'a Declaration) -> Option<&'a CommentBlock> {
        decl.comment.as_ref()
    }

    /// Parameters a template or partial specialization introduces.
    pub fn template_parameters<'a>(
        &self,
        decl: &'a Declaration,
    ) -> QueryResult<&'a [TemplateParameter]> {
        decl.template
            .as_ref()
            .map(TemplateFacts::parameters)
            .ok_or_else(|| QueryError::NotATemplate(decl.qualified_name.clone()))
    }

    /// Parameter count of a primary, or argument count of a specialization.
    pub fn template_arity(&self, decl: &Declaration) -> QueryResult<usize> {
        match &decl.template {
            Some(TemplateFacts::Primary { parameters }) => Ok(parameters.len()),
            Some(TemplateFacts::Specialization { binding, .. }) => Ok(binding.arity()),
            None => Err(QueryError::NotATemplate(decl.qualified_name.clone())),
        }
    }

    pub fn template_argument_at<'a>(
        &self,
        decl: &'a Declaration,
        index: usize,
    ) -> QueryResult<&'a TemplateArgument> {
        let binding = match &decl.template {
            Some(TemplateFacts::Specialization { binding, .. }) => binding,
            Some(TemplateFacts::Primary { .. }) => {
                return Err(wrong_kind(decl, "template specialization"));
            }
            None => return Err(QueryError::NotATemplate(decl.qualified_name.clone())),
        };

        let argument = binding
            .arguments
            .get(index)
            .ok_or_else(|| QueryError::IndexOutOfRange {
                name: decl.qualified_name.clone(),
                index,
                arity: binding.arity(),
            })?;
        match argument.parameter() {
            Some(parameter) => Err(QueryError::UnboundParameter {
                specialization: decl.qualified_name.clone(),
                index,
                parameter: parameter.to_string(),
            }),
            None => Ok(argument),
        }
    }

    /// Every declaration as a JSON array, in creation order.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let declarations: Vec<&Declaration> = self.arena.iter().collect();
        serde_json::to_string_pretty(&declarations)
    }

    pub(crate) fn arena(&self) -> &DeclArena {
        &self.arena
    }
}

fn wrong_kind(decl: &Declaration, expected: &'static str) -> QueryError {
    QueryError::WrongKind {
        name: decl.qualified_name.clone(),
        actual: decl.kind,
        expected,
    }
}

/// Split `a::b::c` into `(Some("a::b"), "c")`, ignoring `::` nested in
/// template argument or parameter lists.
fn split_last_segment(path: &str) -> (Option<&str>, &str) {
    let bytes = path.as_bytes();
    let mut depth = 0i32;
    let mut split = None;
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'<' | b'(' => depth += 1,
            b'>' | b')' => depth -= 1,
            b':' if depth == 0 && bytes.get(index + 1) == Some(&b':') => {
                split = Some(index);
                index += 1;
            }
            _ => {}
        }
        index += 1;
    }
    match split {
        Some(at) => (Some(&path[..at]), &path[at + 2..]),
        None => (None, path),
    }
}

/// Function segment without its parameter list: `f1<int, 5>(int)` -> `f1<int, 5>`.
fn signature_stem(segment: &str) -> &str {
    let mut depth = 0i32;
    for (index, ch) in segment.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth -= 1,
            '(' if depth == 0 => return &segment[..index],
            _ => {}
        }
    }
    segment
}
