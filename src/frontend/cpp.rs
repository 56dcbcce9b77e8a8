//! C++ front-end backed by tree-sitter.
//!
//! Lowers a `tree-sitter-cpp` syntax tree into [`SourceNode`]s. Types are
//! spelled syntactically; nothing here resolves typedefs or looks at other
//! translation units.

use super::{
    CommentPlacement, NodeKind, RawComment, SourceNode, Specifiers, StorageSpecifier,
    TemplateClause, TranslationUnit,
};
use crate::config::Settings;
use crate::declaration::template::render_arguments;
use crate::declaration::{Argument, TemplateArgument, TemplateParameter, TemplateParameterKind};
use crate::error::FrontendError;
use crate::types::{AccessSpecifier, Qualifiers, SourceLocation, SourceRange, TypeDescriptor};
use std::path::Path;
use tree_sitter::{Node, Parser};

pub struct CppFrontend {
    parser: Parser,
}

impl std::fmt::Debug for CppFrontend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CppFrontend")
            .field("language", &"C++")
            .finish()
    }
}

impl CppFrontend {
    pub fn new() -> Result<Self, FrontendError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_cpp::LANGUAGE.into())
            .map_err(|e| FrontendError::ParserInit {
                language: "C++".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { parser })
    }

    /// Whether `path` has one of the configured C++ extensions.
    pub fn accepts(path: &Path, settings: &Settings) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                settings
                    .frontend
                    .extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }

    /// Parse `code` as the translation unit `name`.
    pub fn parse_unit(&mut self, name: &str, code: &str) -> Result<TranslationUnit, FrontendError> {
        let tree = self
            .parser
            .parse(code, None)
            .ok_or_else(|| FrontendError::SyntaxTree {
                unit: name.to_string(),
            })?;
        let root = tree.root_node();
        if root.has_error() {
            tracing::warn!(unit = name, "syntax errors in unit, lowering what parsed");
        }

        let lowering = Lowering { code, file: name };
        let nodes = lowering.namespace_items(root);
        tracing::debug!(unit = name, nodes = nodes.len(), "lowered syntax tree");
        Ok(TranslationUnit::new(name, nodes))
    }

    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> Result<TranslationUnit, FrontendError> {
        let path = path.as_ref();
        let code = std::fs::read_to_string(path).map_err(|source| FrontendError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_unit(&path.to_string_lossy(), &code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Namespace,
    Class,
    Block,
}

/// Everything a declarator chain says about one declared entity.
#[derive(Default)]
struct Declarator<'t> {
    name: Option<Node<'t>>,
    function: Option<Node<'t>>,
    /// Index into `pointers` where the function declarator was met.
    function_at: Option<usize>,
    pointers: Vec<Qualifiers>,
    is_reference: bool,
    dims: Vec<u64>,
    has_initializer: bool,
}

impl Declarator<'_> {
    fn is_function(&self) -> bool {
        self.function.is_some() && !self.is_function_pointer()
    }

    fn is_function_pointer(&self) -> bool {
        self.function_at.is_some_and(|at| self.pointers.len() > at)
    }
}

/// A possibly qualified declarator or type name.
struct NamePath<'t> {
    scope: Vec<String>,
    name: String,
    arguments: Option<Node<'t>>,
    /// The qualifier was a class template named with its own parameters,
    /// so the enclosing template clause belongs to the class.
    scope_uses_clause: bool,
}

struct Lowering<'a> {
    code: &'a str,
    file: &'a str,
}

impl Lowering<'_> {
    fn text(&self, node: Node) -> &str {
        &self.code[node.byte_range()]
    }

    fn spelling(&self, node: Node) -> String {
        normalize_spelling(self.text(node))
    }

    fn location(&self, node: Node) -> SourceLocation {
        let point = node.start_position();
        SourceLocation::new(self.file, point.row as u32 + 1, point.column as u32 + 1)
    }

    fn end_location(&self, node: Node) -> SourceLocation {
        let point = node.end_position();
        SourceLocation::new(self.file, point.row as u32 + 1, point.column as u32 + 1)
    }

    fn node(&self, kind: NodeKind, name: Option<&str>, syntax: Node) -> SourceNode {
        let mut node = SourceNode::new(kind, name, self.location(syntax));
        node.end = Some(self.end_location(syntax));
        node
    }

    fn unsupported(&self, syntax: Node) -> SourceNode {
        let name = syntax
            .child_by_field_name("name")
            .map(|name| self.text(name).to_string());
        self.node(NodeKind::Unsupported, name.as_deref(), syntax)
    }

    fn namespace_items(&self, container: Node) -> Vec<SourceNode> {
        let mut items = Vec::new();
        for child in named_children(container) {
            self.namespace_item(child, &mut items);
        }
        items
    }

    fn namespace_item(&self, child: Node, items: &mut Vec<SourceNode>) {
        match child.kind() {
            "namespace_definition" => items.push(self.namespace(child)),
            "class_specifier" | "struct_specifier" | "union_specifier" => {
                items.extend(self.aggregate(child, child, None));
            }
            "enum_specifier" => items.push(self.unsupported(child)),
            "function_definition" => {
                items.extend(self.function_definition(child, child, None, Scope::Namespace));
            }
            "declaration" => items.extend(self.declaration(child, child, None, Scope::Namespace)),
            "template_declaration" => items.extend(self.template(child, Scope::Namespace)),
            "type_definition" => items.extend(self.type_definition(child)),
            "linkage_specification" => {
                if let Some(body) = child.child_by_field_name("body") {
                    if body.kind() == "declaration_list" {
                        items.extend(self.namespace_items(body));
                    } else {
                        self.namespace_item(body, items);
                    }
                }
            }
            kind if kind.starts_with("preproc_if") || kind.starts_with("preproc_el") => {
                items.extend(self.namespace_items(child));
            }
            _ => {}
        }
    }

    fn namespace(&self, syntax: Node) -> SourceNode {
        let mut node = self.node(NodeKind::Namespace, None, syntax);
        node.comments = self.comments_for(syntax);
        match syntax.child_by_field_name("name") {
            // `namespace a::b` opens `a` first
            Some(name) => {
                let mut segments: Vec<String> = self
                    .text(name)
                    .split("::")
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                node.name = segments.pop();
                node.scope = segments;
            }
            None => node.is_anonymous = true,
        }
        if let Some(body) = syntax.child_by_field_name("body") {
            node.children = self.namespace_items(body);
        }
        node
    }

    fn class_members(&self, body: Node) -> Vec<SourceNode> {
        let mut members = Vec::new();
        for child in named_children(body) {
            match child.kind() {
                "access_specifier" => {
                    let mut node = self.node(NodeKind::AccessSpecifier, None, child);
                    node.specifiers.access = self
                        .text(child)
                        .trim()
                        .trim_end_matches(':')
                        .trim()
                        .parse::<AccessSpecifier>()
                        .ok();
                    members.push(node);
                }
                "field_declaration" | "declaration" => {
                    members.extend(self.declaration(child, child, None, Scope::Class));
                }
                "class_specifier" | "struct_specifier" | "union_specifier" => {
                    members.extend(self.aggregate(child, child, None));
                }
                "enum_specifier" => members.push(self.unsupported(child)),
                "function_definition" => {
                    members.extend(self.function_definition(child, child, None, Scope::Class));
                }
                "template_declaration" => members.extend(self.template(child, Scope::Class)),
                "type_definition" => members.extend(self.type_definition(child)),
                kind if kind.starts_with("preproc_if") || kind.starts_with("preproc_el") => {
                    members.extend(self.class_members(child));
                }
                _ => {}
            }
        }
        members
    }

    fn aggregate(
        &self,
        spec: Node,
        anchor: Node,
        clause: Option<TemplateClause>,
    ) -> Option<SourceNode> {
        let kind = match spec.kind() {
            "class_specifier" => NodeKind::Class,
            "struct_specifier" => NodeKind::Struct,
            "union_specifier" => NodeKind::Union,
            _ => return None,
        };
        let mut node = self.node(kind, None, spec);
        node.comments = self.comments_for(anchor);
        let mut clause = clause;

        match spec.child_by_field_name("name") {
            Some(name) => {
                let parameters = clause_parameters(clause.as_ref());
                let path = self.name_path(name, &parameters)?;
                if let Some(arguments) = path.arguments {
                    let clause = clause.get_or_insert_with(TemplateClause::default);
                    clause.specializes = Some(path.name.clone());
                    clause.arguments = self.template_arguments(arguments, &parameters);
                }
                node.name = Some(path.name);
                node.scope = path.scope;
            }
            None => node.is_anonymous = true,
        }
        node.template = clause;

        match spec.child_by_field_name("body") {
            Some(body) => node.children = self.class_members(body),
            None => node.is_definition = false,
        }
        Some(node)
    }

    fn type_definition(&self, syntax: Node) -> Vec<SourceNode> {
        let Some(ty) = syntax
            .child_by_field_name("type")
            .filter(|ty| is_aggregate_specifier(*ty))
        else {
            return Vec::new();
        };
        let alias = syntax
            .child_by_field_name("declarator")
            .filter(|d| d.kind() == "type_identifier")
            .map(|d| self.text(d).to_string());

        let mut node = self.node(NodeKind::TypeAlias, alias.as_deref(), syntax);
        node.children.extend(self.aggregate(ty, syntax, None));
        vec![node]
    }

    fn template(&self, syntax: Node, scope: Scope) -> Vec<SourceNode> {
        let parameters = syntax
            .child_by_field_name("parameters")
            .map(|list| self.template_parameters(list))
            .unwrap_or_default();
        let clause = TemplateClause {
            parameters,
            ..TemplateClause::default()
        };

        for child in named_children(syntax) {
            match child.kind() {
                "class_specifier" | "struct_specifier" | "union_specifier" => {
                    return self.aggregate(child, syntax, Some(clause)).into_iter().collect();
                }
                "function_definition" => {
                    return self
                        .function_definition(child, syntax, Some(clause), scope)
                        .into_iter()
                        .collect();
                }
                "declaration" | "field_declaration" => {
                    return self.declaration(child, syntax, Some(clause), scope);
                }
                "template_declaration" => return self.template(child, scope),
                _ => {}
            }
        }
        Vec::new()
    }

    fn template_parameters(&self, list: Node) -> Vec<TemplateParameter> {
        let mut parameters = Vec::new();
        for child in named_children(list) {
            match child.kind() {
                "type_parameter_declaration" => {
                    if let Some(name) = named_children(child)
                        .into_iter()
                        .find(|n| n.kind() == "type_identifier")
                    {
                        parameters.push(TemplateParameter::new(
                            TemplateParameterKind::Type,
                            self.text(name),
                        ));
                    }
                }
                "optional_type_parameter_declaration" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        let mut parameter =
                            TemplateParameter::new(TemplateParameterKind::Type, self.text(name));
                        if let Some(default) = child.child_by_field_name("default_type") {
                            parameter = parameter.with_default(TemplateArgument::Type(
                                TypeDescriptor::named(&self.spelling(default)),
                            ));
                        }
                        parameters.push(parameter);
                    }
                }
                "parameter_declaration" | "optional_parameter_declaration" => {
                    let declarator = self.declarator(child.child_by_field_name("declarator"));
                    let Some(name) = declarator.name else {
                        continue;
                    };
                    let kind = match child.child_by_field_name("type").map(|t| self.text(t)) {
                        Some("bool") => TemplateParameterKind::NonTypeBool,
                        _ => TemplateParameterKind::NonTypeInteger,
                    };
                    let mut parameter = TemplateParameter::new(kind, self.text(name));
                    if let Some(default) = child.child_by_field_name("default_value") {
                        parameter = parameter.with_default(self.literal_argument(default));
                    }
                    parameters.push(parameter);
                }
                other => {
                    tracing::debug!(kind = other, "skipping template parameter form");
                }
            }
        }
        parameters
    }

    fn template_arguments(
        &self,
        list: Node,
        parameters: &[TemplateParameter],
    ) -> Vec<TemplateArgument> {
        let is_parameter = |spelled: &str| parameters.iter().any(|p| &*p.name == spelled);
        named_children(list)
            .into_iter()
            .filter(|child| child.kind() != "comment")
            .map(|child| {
                let spelled = self.spelling(child);
                match child.kind() {
                    _ if is_parameter(&spelled) => TemplateArgument::unbound(&spelled),
                    "type_descriptor" => TemplateArgument::Type(self.type_descriptor(child)),
                    _ => self.literal_argument(child),
                }
            })
            .collect()
    }

    fn literal_argument(&self, node: Node) -> TemplateArgument {
        let text = self.text(node).trim();
        match text {
            "true" => TemplateArgument::Bool(true),
            "false" => TemplateArgument::Bool(false),
            _ => match self.constant(node).or_else(|| parse_integer(text)) {
                Some(value) => TemplateArgument::Integer(value),
                None => TemplateArgument::Type(TypeDescriptor::named(&normalize_spelling(text))),
            },
        }
    }

    fn type_descriptor(&self, node: Node) -> TypeDescriptor {
        let Some(ty) = node.child_by_field_name("type") else {
            return TypeDescriptor::named(&self.spelling(node));
        };
        let declarator = self.declarator(node.child_by_field_name("declarator"));
        self.value_type(node, &self.spelling(ty), &declarator)
    }

    /// `declaration` or `field_declaration`, in any scope.
    fn declaration(
        &self,
        syntax: Node,
        anchor: Node,
        clause: Option<TemplateClause>,
        scope: Scope,
    ) -> Vec<SourceNode> {
        let comments = self.comments_for(anchor);
        let ty = syntax.child_by_field_name("type");
        let declarators = {
            let mut cursor = syntax.walk();
            syntax
                .children_by_field_name("declarator", &mut cursor)
                .collect::<Vec<_>>()
        };
        let mut out = Vec::new();

        // An aggregate defined as part of the declaration
        let mut nested = None;
        let mut base = String::new();
        if let Some(ty) = ty {
            let has_body = ty.child_by_field_name("body").is_some();
            if is_aggregate_specifier(ty) && declarators.is_empty() {
                // Definition or forward declaration
                if scope != Scope::Block {
                    out.extend(self.aggregate(ty, anchor, clause));
                }
                return out;
            }
            if is_aggregate_specifier(ty) && has_body {
                if let Some(aggregate) = self.aggregate(ty, ty, None) {
                    base = aggregate
                        .declared_name()
                        .map(str::to_string)
                        .unwrap_or_else(|| anonymous_segment(&aggregate));
                    if scope != Scope::Block {
                        nested = Some(aggregate);
                    }
                }
            } else if ty.kind() == "enum_specifier" && declarators.is_empty() {
                out.push(self.unsupported(ty));
                return out;
            } else if let Some(name) = ty
                .child_by_field_name("name")
                .filter(|_| is_aggregate_specifier(ty))
            {
                // `struct s *p;` refers to `s`
                base = self.spelling(name);
            } else {
                base = self.spelling(ty);
            }
        }

        if declarators.is_empty() {
            // `int : 0;`
            if scope == Scope::Class && ty.is_some() {
                if let Some(width) = self.bit_width(syntax) {
                    let mut field = self.node(NodeKind::Field, None, syntax);
                    field.ty = Some(
                        TypeDescriptor::named(&base).with_qualifiers(self.qualifiers(syntax)),
                    );
                    field.bit_width = Some(width);
                    out.push(field);
                }
            }
            return out;
        }

        if scope == Scope::Namespace {
            if let Some(mut aggregate) = nested.take() {
                aggregate.comments = comments.clone();
                out.push(aggregate);
            }
        }

        let storage = self.storage(syntax);
        for declarator in declarators {
            let info = self.declarator(Some(declarator));
            if info.is_function() {
                out.extend(self.callable(syntax, &info, comments.clone(), clause.clone(), scope));
                continue;
            }
            if ty.is_none() {
                continue;
            }
            let Some(path) = info.name.and_then(|name| self.name_path(name, &[])) else {
                continue;
            };
            let value_type = self.value_type(syntax, &base, &info);

            let mut node = if scope == Scope::Class {
                let mut field = self.node(NodeKind::Field, Some(&path.name), syntax);
                field.children.extend(nested.take());
                field.specifiers.is_mutable = self.is_mutable(syntax);
                // In-class static data members are declarations only
                field.is_definition = storage != Some(StorageSpecifier::Static);
                field.bit_width = self.bit_width(syntax);
                field
            } else {
                let mut variable = self.node(NodeKind::Variable, Some(&path.name), syntax);
                variable.scope = path.scope;
                variable.is_definition =
                    storage != Some(StorageSpecifier::Extern) || info.has_initializer;
                variable
            };
            node.ty = Some(value_type);
            node.specifiers.storage = storage;
            node.comments = comments.clone();
            out.push(node);
        }
        out
    }

    fn function_definition(
        &self,
        syntax: Node,
        anchor: Node,
        clause: Option<TemplateClause>,
        scope: Scope,
    ) -> Option<SourceNode> {
        let info = self.declarator(syntax.child_by_field_name("declarator"));
        if !info.is_function() {
            return None;
        }
        self.callable(syntax, &info, self.comments_for(anchor), clause, scope)
    }

    fn callable(
        &self,
        syntax: Node,
        info: &Declarator,
        comments: Vec<RawComment>,
        clause: Option<TemplateClause>,
        scope: Scope,
    ) -> Option<SourceNode> {
        let function = info.function?;
        let parameters = clause_parameters(clause.as_ref());
        let path = self.name_path(info.name?, &parameters)?;
        let ty = syntax.child_by_field_name("type");

        let kind = match ty {
            None => NodeKind::Constructor,
            Some(_) if scope == Scope::Class => NodeKind::Method,
            Some(_) => NodeKind::Function,
        };
        let mut node = self.node(kind, Some(&path.name), syntax);
        node.scope = path.scope;
        node.comments = comments;
        node.ty = ty.map(|ty| self.value_type(syntax, &self.spelling(ty), info));
        node.arguments = function
            .child_by_field_name("parameters")
            .map(|list| self.parameters(list))
            .unwrap_or_default();
        node.specifiers = Specifiers {
            is_const: self.qualifiers(function).contains(Qualifiers::CONST),
            is_virtual: has_child_kind(syntax, "virtual"),
            is_pure_virtual: self.is_pure_virtual(syntax, function),
            storage: self.storage(syntax),
            ..Specifiers::default()
        };
        node.is_definition = syntax.kind() == "function_definition";

        let mut clause = if path.scope_uses_clause { None } else { clause };
        if let Some(arguments) = path.arguments {
            let clause = clause.get_or_insert_with(TemplateClause::default);
            clause.specializes = Some(path.name.clone());
            clause.arguments = self.template_arguments(arguments, &parameters);
        }
        node.template = clause;

        if let Some(body) = syntax.child_by_field_name("body") {
            self.collect_locals(body, &mut node.children);
        }
        Some(node)
    }

    fn parameters(&self, list: Node) -> Vec<Argument> {
        named_children(list)
            .into_iter()
            .filter(|p| {
                matches!(
                    p.kind(),
                    "parameter_declaration" | "optional_parameter_declaration"
                )
            })
            .filter_map(|parameter| {
                let ty = parameter.child_by_field_name("type")?;
                let declarator = parameter.child_by_field_name("declarator");
                // `f(void)` takes no arguments
                if declarator.is_none() && self.text(ty) == "void" {
                    return None;
                }
                let info = self.declarator(declarator);
                let ty = self.value_type(parameter, &self.spelling(ty), &info);
                let name = info.name.map(|name| self.text(name));
                Some(Argument::new(ty, name))
            })
            .collect()
    }

    /// Block-scope variables anywhere inside a function body.
    fn collect_locals(&self, node: Node, out: &mut Vec<SourceNode>) {
        for child in named_children(node) {
            match child.kind() {
                "declaration" => out.extend(self.declaration(child, child, None, Scope::Block)),
                "for_range_loop" => {
                    if let (Some(ty), Some(declarator)) = (
                        child.child_by_field_name("type"),
                        child.child_by_field_name("declarator"),
                    ) {
                        let info = self.declarator(Some(declarator));
                        if let Some(name) = info.name {
                            let mut variable =
                                self.node(NodeKind::Variable, Some(self.text(name)), child);
                            variable.ty = Some(self.value_type(child, &self.spelling(ty), &info));
                            out.push(variable);
                        }
                    }
                    if let Some(body) = child.child_by_field_name("body") {
                        self.collect_locals(body, out);
                    }
                }
                "lambda_expression" | "class_specifier" | "struct_specifier"
                | "union_specifier" | "enum_specifier" => {}
                _ => self.collect_locals(child, out),
            }
        }
    }

    fn declarator<'t>(&self, node: Option<Node<'t>>) -> Declarator<'t> {
        let mut info = Declarator::default();
        let mut dims = Vec::new();
        let mut current = node;
        while let Some(node) = current {
            current = match node.kind() {
                "init_declarator" => {
                    info.has_initializer = true;
                    node.child_by_field_name("declarator")
                }
                "pointer_declarator" | "abstract_pointer_declarator" => {
                    info.pointers.push(self.qualifiers(node));
                    node.child_by_field_name("declarator")
                }
                "reference_declarator" | "abstract_reference_declarator" => {
                    info.is_reference = true;
                    named_children(node).pop()
                }
                "array_declarator" | "abstract_array_declarator" => {
                    let extent = match node.child_by_field_name("size") {
                        None => 0,
                        Some(size) => self
                            .constant(size)
                            .and_then(|n| u64::try_from(n).ok())
                            .filter(|n| *n != TypeDescriptor::UNKNOWN_EXTENT)
                            .unwrap_or(TypeDescriptor::UNKNOWN_EXTENT),
                    };
                    dims.push(extent);
                    node.child_by_field_name("declarator")
                }
                "function_declarator" | "abstract_function_declarator" => {
                    if info.function.is_none() {
                        info.function = Some(node);
                        info.function_at = Some(info.pointers.len());
                    }
                    node.child_by_field_name("declarator")
                }
                "parenthesized_declarator"
                | "abstract_parenthesized_declarator"
                | "attributed_declarator" => named_children(node)
                    .into_iter()
                    .find(|child| child.kind() != "type_qualifier"),
                _ => {
                    info.name = Some(node);
                    None
                }
            };
        }
        // Extents are written outermost first
        dims.reverse();
        info.dims = dims;
        info
    }

    fn value_type(&self, decl: Node, base: &str, info: &Declarator) -> TypeDescriptor {
        let mut ty = TypeDescriptor::named(base).with_qualifiers(self.qualifiers(decl));
        let split = info.function_at.unwrap_or(info.pointers.len());
        for qualifiers in &info.pointers[..split] {
            ty = ty.pointer(*qualifiers);
        }
        if info.is_function_pointer() {
            let parameters = info
                .function
                .and_then(|f| f.child_by_field_name("parameters"))
                .map(|p| self.spelling(p))
                .unwrap_or_else(|| "()".to_string());
            ty = TypeDescriptor::named(&format!("{ty} {parameters}"));
            for qualifiers in &info.pointers[split..] {
                ty = ty.pointer(*qualifiers);
            }
        }
        if info.is_reference {
            ty = ty.reference();
        }
        if !info.dims.is_empty() {
            ty = ty.array(&info.dims);
        }
        ty
    }

    fn name_path<'t>(
        &self,
        node: Node<'t>,
        parameters: &[TemplateParameter],
    ) -> Option<NamePath<'t>> {
        let mut path = NamePath {
            scope: Vec::new(),
            name: String::new(),
            arguments: None,
            scope_uses_clause: false,
        };
        let mut current = node;
        loop {
            match current.kind() {
                "qualified_identifier" | "qualified_type_identifier" => {
                    if let Some(scope) = current.child_by_field_name("scope") {
                        let (segment, uses_clause) = self.scope_segment(scope, parameters);
                        path.scope_uses_clause |= uses_clause;
                        path.scope.push(segment);
                    }
                    current = current.child_by_field_name("name")?;
                }
                "identifier" | "field_identifier" | "type_identifier" | "namespace_identifier" => {
                    path.name = self.text(current).to_string();
                    return Some(path);
                }
                "template_type" | "template_function" => {
                    path.name = self.text(current.child_by_field_name("name")?).to_string();
                    path.arguments = current.child_by_field_name("arguments");
                    return Some(path);
                }
                // Destructors, operators and conversions are not modeled
                _ => return None,
            }
        }
    }

    fn scope_segment(&self, scope: Node, parameters: &[TemplateParameter]) -> (String, bool) {
        if scope.kind() == "template_type" {
            if let (Some(name), Some(arguments)) = (
                scope.child_by_field_name("name"),
                scope.child_by_field_name("arguments"),
            ) {
                let name = self.text(name);
                let arguments = self.template_arguments(arguments, parameters);
                // `C1<T>::m` names a member of the primary template
                if !arguments.is_empty() && arguments.iter().all(TemplateArgument::is_unbound) {
                    return (name.to_string(), true);
                }
                return (render_arguments(name, &arguments), false);
            }
        }
        (self.spelling(scope), false)
    }

    fn qualifiers(&self, node: Node) -> Qualifiers {
        named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "type_qualifier")
            .fold(Qualifiers::empty(), |acc, child| match self.text(child) {
                "const" => acc | Qualifiers::CONST,
                "volatile" => acc | Qualifiers::VOLATILE,
                _ => acc,
            })
    }

    fn is_mutable(&self, node: Node) -> bool {
        named_children(node).into_iter().any(|child| {
            matches!(child.kind(), "type_qualifier" | "storage_class_specifier")
                && self.text(child) == "mutable"
        })
    }

    fn storage(&self, node: Node) -> Option<StorageSpecifier> {
        named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "storage_class_specifier")
            .find_map(|child| match self.text(child) {
                "static" => Some(StorageSpecifier::Static),
                "extern" => Some(StorageSpecifier::Extern),
                "register" => Some(StorageSpecifier::Register),
                _ => None,
            })
    }

    fn is_pure_virtual(&self, syntax: Node, function: Node) -> bool {
        syntax
            .child_by_field_name("default_value")
            .is_some_and(|value| self.text(value).trim() == "0")
            || has_child_kind(syntax, "pure_virtual_clause")
            || has_child_kind(function, "pure_virtual_clause")
    }

    fn bit_width(&self, node: Node) -> Option<u32> {
        let clause = named_children(node)
            .into_iter()
            .find(|child| child.kind() == "bitfield_clause")?;
        let width = named_children(clause)
            .into_iter()
            .next()
            .and_then(|expr| self.constant(expr))
            .and_then(|n| u32::try_from(n).ok())
            // Unparseable widths are reported by the builder
            .unwrap_or(u32::MAX);
        Some(width)
    }

    /// Integral constant expression built from literals and arithmetic.
    fn constant(&self, node: Node) -> Option<i64> {
        match node.kind() {
            "number_literal" => parse_integer(self.text(node)),
            "parenthesized_expression" => self.constant(named_children(node).pop()?),
            "unary_expression" => {
                let value = self.constant(node.child_by_field_name("argument")?)?;
                match self.text(node.child_by_field_name("operator")?) {
                    "-" => value.checked_neg(),
                    "+" => Some(value),
                    "~" => Some(!value),
                    _ => None,
                }
            }
            "binary_expression" => {
                let left = self.constant(node.child_by_field_name("left")?)?;
                let right = self.constant(node.child_by_field_name("right")?)?;
                let shift = || u32::try_from(right).ok();
                match self.text(node.child_by_field_name("operator")?) {
                    "+" => left.checked_add(right),
                    "-" => left.checked_sub(right),
                    "*" => left.checked_mul(right),
                    "/" => left.checked_div(right),
                    "%" => left.checked_rem(right),
                    "<<" => left.checked_shl(shift()?),
                    ">>" => left.checked_shr(shift()?),
                    "&" => Some(left & right),
                    "|" => Some(left | right),
                    "^" => Some(left ^ right),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Adjacent comments: the run right above `anchor`, and one that starts
    /// on the line where `anchor` ends.
    fn comments_for(&self, anchor: Node) -> Vec<RawComment> {
        let mut preceding = Vec::new();
        let mut expected_row = anchor.start_position().row;
        let mut current = anchor.prev_sibling();
        while let Some(node) = current {
            if node.kind() != "comment"
                || node.end_position().row + 1 < expected_row
                || is_trailing_comment(node)
            {
                break;
            }
            preceding.push(self.comment(node, CommentPlacement::Preceding));
            expected_row = node.start_position().row;
            current = node.prev_sibling();
        }
        preceding.reverse();

        let mut next = anchor.next_sibling();
        while let Some(node) = next.filter(|n| !n.is_named() && self.text(*n) == ";") {
            next = node.next_sibling();
        }
        if let Some(node) = next.filter(|n| {
            n.kind() == "comment" && n.start_position().row == anchor.end_position().row
        }) {
            preceding.push(self.comment(node, CommentPlacement::Trailing));
        }
        preceding
    }

    fn comment(&self, node: Node, placement: CommentPlacement) -> RawComment {
        RawComment {
            text: self.text(node).trim_end().to_string(),
            range: SourceRange::new(self.location(node), self.end_location(node)),
            placement,
        }
    }
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn has_child_kind(node: Node, kind: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|child| child.kind() == kind)
}

fn is_aggregate_specifier(node: Node) -> bool {
    matches!(
        node.kind(),
        "class_specifier" | "struct_specifier" | "union_specifier"
    )
}

/// A comment that shares its first line with the end of a preceding
/// declaration documents that declaration, not the next one.
fn is_trailing_comment(comment: Node) -> bool {
    let mut previous = comment.prev_sibling();
    while let Some(node) = previous.filter(|n| !n.is_named() && n.kind() == ";") {
        previous = node.prev_sibling();
        if previous.is_none() {
            return node.end_position().row == comment.start_position().row;
        }
    }
    previous.is_some_and(|node| {
        node.kind() != "comment" && node.end_position().row == comment.start_position().row
    })
}

fn clause_parameters(clause: Option<&TemplateClause>) -> Vec<TemplateParameter> {
    clause.map(|c| c.parameters.clone()).unwrap_or_default()
}

/// Name the builder gives an unnamed aggregate.
fn anonymous_segment(aggregate: &SourceNode) -> String {
    let keyword = match aggregate.kind {
        NodeKind::Class => "class",
        NodeKind::Union => "union",
        _ => "struct",
    };
    format!(
        "(anonymous {keyword} at {}:{})",
        aggregate.location.line, aggregate.location.column
    )
}

/// Collapse whitespace and settle spacing around punctuation, so
/// `C< int,5 >` and `C<int, 5>` spell the same.
pub(crate) fn normalize_spelling(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(collapsed.len());
    for ch in collapsed.chars() {
        match ch {
            ',' => {
                out.truncate(out.trim_end().len());
                out.push_str(", ");
            }
            '>' | ')' | ']' => {
                out.truncate(out.trim_end().len());
                out.push(ch);
            }
            ' ' if out.is_empty() || out.ends_with(['<', '(', '[', ' ']) => {}
            _ => out.push(ch),
        }
    }
    out.truncate(out.trim_end().len());
    out
}

/// C++ integer literal: decimal, hex, binary or octal, with optional sign,
/// digit separators and `u`/`l` suffixes.
pub(crate) fn parse_integer(text: &str) -> Option<i64> {
    let cleaned = text.trim().replace('\'', "");
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest.trim()),
        None => (false, cleaned.as_str()),
    };
    let digits = digits.trim_end_matches(['u', 'U', 'l', 'L']);
    if digits.is_empty() {
        return None;
    }

    let value = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = digits
        .strip_prefix("0b")
        .or_else(|| digits.strip_prefix("0B"))
    {
        i64::from_str_radix(bin, 2).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse().ok()?
    };
    Some(if negative { -value } else { value })
}
