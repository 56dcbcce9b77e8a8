//! The boundary between a C++ front-end and the declaration engine.
//!
//! A front-end lowers one translation unit into a tree of [`SourceNode`]s.
//! The engine never parses source text itself; [`cpp::CppFrontend`] is the
//! bundled tree-sitter adapter, and any other producer can hand over the same
//! tree as JSON through [`TranslationUnit::from_json`].

pub mod cpp;

pub use cpp::CppFrontend;

use crate::config::TypeLayoutSpec;
use crate::declaration::{Argument, TemplateArgument, TemplateParameter};
use crate::error::FrontendError;
use crate::types::{AccessSpecifier, SourceLocation, SourceRange, TypeDescriptor};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One translation unit as produced by a front-end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<SourceNode>,
}

impl TranslationUnit {
    pub fn new(name: impl Into<String>, nodes: Vec<SourceNode>) -> Self {
        Self {
            name: name.into(),
            nodes,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, FrontendError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, FrontendError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| FrontendError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, FrontendError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Namespace,
    Class,
    Struct,
    Union,
    Function,
    Method,
    Constructor,
    Field,
    Variable,
    AccessSpecifier,
    /// `typedef struct {..} name;` style alias; only meaningful when it names
    /// an unnamed aggregate child.
    TypeAlias,
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageSpecifier {
    Static,
    Extern,
    Register,
    Auto,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Specifiers {
    /// Method const qualifier.
    pub is_const: bool,
    pub is_virtual: bool,
    pub is_pure_virtual: bool,
    pub is_mutable: bool,
    pub storage: Option<StorageSpecifier>,
    /// Payload of an `AccessSpecifier` node.
    pub access: Option<AccessSpecifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentPlacement {
    /// Ends on a line before the declaration, with nothing else between.
    Preceding,
    /// Starts on the line where the declaration ends.
    Trailing,
}

/// A comment the front-end found adjacent to a declaration, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawComment {
    pub text: String,
    #[serde(default)]
    pub range: SourceRange,
    pub placement: CommentPlacement,
}

impl RawComment {
    pub fn preceding(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            range: SourceRange::default(),
            placement: CommentPlacement::Preceding,
        }
    }

    pub fn trailing(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            range: SourceRange::default(),
            placement: CommentPlacement::Trailing,
        }
    }
}

/// Template header of a node: its own parameters, and for specializations the
/// primary's name plus the written argument list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateClause {
    pub parameters: Vec<TemplateParameter>,
    pub specializes: Option<String>,
    pub arguments: Vec<TemplateArgument>,
}

fn default_true() -> bool {
    true
}

/// A declaration-like node of the front-end tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceNode {
    pub kind: NodeKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: SourceLocation,
    #[serde(default)]
    pub end: Option<SourceLocation>,
    /// Qualifier path of an out-of-line definition, `["c1"]` for `c1::f1`.
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub children: Vec<SourceNode>,
    #[serde(default)]
    pub specifiers: Specifiers,
    /// Field/variable type, or function result type.
    #[serde(default, rename = "type")]
    pub ty: Option<TypeDescriptor>,
    #[serde(default)]
    pub arguments: Vec<Argument>,
    #[serde(default)]
    pub bit_width: Option<u32>,
    #[serde(default)]
    pub template: Option<TemplateClause>,
    #[serde(default)]
    pub comments: Vec<RawComment>,
    #[serde(default = "default_true")]
    pub is_definition: bool,
    /// Unnamed struct/union with no declarator.
    #[serde(default)]
    pub is_anonymous: bool,
    /// Size and alignment the front-end already knows for `ty`.
    #[serde(default)]
    pub type_layout: Option<TypeLayoutSpec>,
}

impl SourceNode {
    pub fn new(kind: NodeKind, name: Option<&str>, location: SourceLocation) -> Self {
        Self {
            kind,
            name: name.map(str::to_string),
            location,
            end: None,
            scope: Vec::new(),
            children: Vec::new(),
            specifiers: Specifiers::default(),
            ty: None,
            arguments: Vec::new(),
            bit_width: None,
            template: None,
            comments: Vec::new(),
            is_definition: true,
            is_anonymous: false,
            type_layout: None,
        }
    }

    /// Name if present and non-empty.
    pub fn declared_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.kind, NodeKind::Class | NodeKind::Struct | NodeKind::Union)
    }

    pub fn range(&self) -> SourceRange {
        SourceRange::new(
            self.location.clone(),
            self.end.clone().unwrap_or_else(|| self.location.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_unit_from_minimal_json() {
        let json = r#"{
            "name": "unit.cpp",
            "nodes": [
                {
                    "kind": "Class",
                    "name": "c1",
                    "location": { "line": 3, "column": 7 },
                    "children": [
                        { "kind": "Field", "name": "m1", "location": { "line": 4, "column": 9 },
                          "type": { "base": "int" } },
                        { "kind": "AccessSpecifier", "specifiers": { "access": "public" } }
                    ]
                },
                { "kind": "StaticAssert" }
            ]
        }"#;

        let unit = TranslationUnit::from_json(json).unwrap();
        assert_eq!(unit.name, "unit.cpp");
        assert_eq!(unit.nodes.len(), 2);

        let class = &unit.nodes[0];
        assert_eq!(class.kind, NodeKind::Class);
        assert!(class.is_definition);
        assert_eq!(class.children[0].ty, Some(TypeDescriptor::named("int")));
        assert_eq!(
            class.children[1].specifiers.access,
            Some(AccessSpecifier::Public)
        );
        assert_eq!(unit.nodes[1].kind, NodeKind::Unsupported);
    }

    #[test]
    fn test_invalid_json_is_frontend_error() {
        let err = TranslationUnit::from_json("{ not json").unwrap_err();
        assert!(matches!(err, FrontendError::Json(_)));
    }

    #[test]
    fn test_declared_name_ignores_empty() {
        let node = SourceNode::new(NodeKind::Struct, Some(""), SourceLocation::at(1, 1));
        assert!(node.declared_name().is_none());
        assert!(node.is_aggregate());
    }
}
