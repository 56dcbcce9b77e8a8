mod decl_counter;
pub mod descriptor;

pub use decl_counter::DeclCounter;
pub use descriptor::{Qualifiers, TypeDescriptor};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl DeclId {
    pub fn new(value: u32) -> Option<Self> {
        if value == 0 { None } else { Some(Self(value)) }
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Position of this declaration inside its arena's node table.
    pub(crate) fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl UnitId {
    pub fn new(value: u32) -> Option<Self> {
        if value == 0 { None } else { Some(Self(value)) }
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

/// A 1-based line/column position inside a named source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    #[serde(default)]
    pub file: CompactString,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: &str, line: u32, column: u32) -> Self {
        Self {
            file: compact_string(file),
            line,
            column,
        }
    }

    /// Location with no file attached, handy for synthetic nodes.
    pub fn at(line: u32, column: u32) -> Self {
        Self::new("", line, column)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file.is_empty() {
            write!(f, "{}:{}", self.line, self.column)
        } else {
            write!(f, "{}:{}:{}", self.file, self.line, self.column)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl SourceRange {
    pub fn new(start: SourceLocation, end: SourceLocation) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, line: u32, column: u32) -> bool {
        if line < self.start.line || line > self.end.line {
            return false;
        }

        if line == self.start.line && column < self.start.column {
            return false;
        }

        if line == self.end.line && column > self.end.column {
            return false;
        }

        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclKind {
    Namespace,
    Class,
    Struct,
    Union,
    Function,
    Method,
    Constructor,
    Field,
    Variable,
    TemplateFunction,
    TemplateClass,
    TemplatePartialSpecialization,
    TemplateFullSpecialization,
}

impl DeclKind {
    pub const ALL: [DeclKind; 13] = [
        DeclKind::Namespace,
        DeclKind::Class,
        DeclKind::Struct,
        DeclKind::Union,
        DeclKind::Function,
        DeclKind::Method,
        DeclKind::Constructor,
        DeclKind::Field,
        DeclKind::Variable,
        DeclKind::TemplateFunction,
        DeclKind::TemplateClass,
        DeclKind::TemplatePartialSpecialization,
        DeclKind::TemplateFullSpecialization,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeclKind::Namespace => "Namespace",
            DeclKind::Class => "Class",
            DeclKind::Struct => "Struct",
            DeclKind::Union => "Union",
            DeclKind::Function => "Function",
            DeclKind::Method => "Method",
            DeclKind::Constructor => "Constructor",
            DeclKind::Field => "Field",
            DeclKind::Variable => "Variable",
            DeclKind::TemplateFunction => "TemplateFunction",
            DeclKind::TemplateClass => "TemplateClass",
            DeclKind::TemplatePartialSpecialization => "TemplatePartialSpecialization",
            DeclKind::TemplateFullSpecialization => "TemplateFullSpecialization",
        }
    }

    pub fn is_specialization(&self) -> bool {
        matches!(
            self,
            DeclKind::TemplatePartialSpecialization | DeclKind::TemplateFullSpecialization
        )
    }

    pub fn is_template(&self) -> bool {
        matches!(self, DeclKind::TemplateFunction | DeclKind::TemplateClass)
            || self.is_specialization()
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeclKind {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeclKind::ALL
            .iter()
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or("Unknown declaration kind")
    }
}

/// Effective member access inside an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessSpecifier {
    Public,
    Protected,
    Private,
}

impl AccessSpecifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessSpecifier::Public => "public",
            AccessSpecifier::Protected => "protected",
            AccessSpecifier::Private => "private",
        }
    }
}

impl FromStr for AccessSpecifier {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(AccessSpecifier::Public),
            "protected" => Ok(AccessSpecifier::Protected),
            "private" => Ok(AccessSpecifier::Private),
            _ => Err("Unknown access specifier"),
        }
    }
}

impl fmt::Display for AccessSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type CompactString = Box<str>;

pub fn compact_string(s: &str) -> CompactString {
    s.into()
}
