//! The declaration node and its kind-specific fact payloads.
//!
//! Every node lives in a [`DeclArena`]; parent links are arena ids, never
//! owning references. Facts are a closed enum so each pass matches
//! exhaustively on what it annotates.

mod arena;
pub(crate) mod template;

pub use arena::DeclArena;
pub use template::{
    TemplateArgument, TemplateBinding, TemplateFacts, TemplateParameter, TemplateParameterKind,
};

use crate::config::TypeLayoutSpec;
use crate::frontend::{RawComment, StorageSpecifier};
use crate::types::{
    AccessSpecifier, CompactString, DeclId, DeclKind, SourceLocation, SourceRange, TypeDescriptor,
    UnitId,
};
use serde::{Deserialize, Serialize};

/// A node in the declaration graph.
#[derive(Debug, Clone, Serialize)]
pub struct Declaration {
    pub(crate) id: DeclId,
    pub(crate) kind: DeclKind,
    pub(crate) name: CompactString,
    /// Last component of the qualified name; differs from `name` for
    /// unnamed entities, specializations and function signatures.
    pub(crate) segment: CompactString,
    pub(crate) qualified_name: String,
    pub(crate) range: SourceRange,
    pub(crate) unit: Option<UnitId>,
    pub(crate) parent: Option<DeclId>,
    pub(crate) children: Vec<DeclId>,
    pub(crate) access: Option<AccessSpecifier>,
    pub(crate) facts: DeclFacts,
    pub(crate) template: Option<TemplateFacts>,
    pub(crate) comment: Option<CommentBlock>,
    #[serde(skip)]
    pub(crate) pending: Pending,
    #[serde(skip)]
    pub(crate) rejected: bool,
}

/// Front-end facts consumed by the annotation passes; cleared on merge.
#[derive(Debug, Clone, Default)]
pub(crate) struct Pending {
    pub storage_specifier: Option<StorageSpecifier>,
    pub raw_comments: Vec<RawComment>,
    pub specializes: Option<CompactString>,
    pub template_parameters: Vec<TemplateParameter>,
    pub template_arguments: Vec<TemplateArgument>,
    pub type_layout: Option<TypeLayoutSpec>,
}

impl Declaration {
    pub(crate) fn new(kind: DeclKind, name: &str, segment: &str, facts: DeclFacts) -> Self {
        Self {
            id: DeclId(0),
            kind,
            name: name.into(),
            segment: segment.into(),
            qualified_name: String::new(),
            range: SourceRange::default(),
            unit: None,
            parent: None,
            children: Vec::new(),
            access: None,
            facts,
            template: None,
            comment: None,
            pending: Pending::default(),
            rejected: false,
        }
    }

    pub fn id(&self) -> DeclId {
        self.id
    }

    pub fn kind(&self) -> DeclKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn location(&self) -> &SourceLocation {
        &self.range.start
    }

    pub fn range(&self) -> &SourceRange {
        &self.range
    }

    pub fn unit(&self) -> Option<UnitId> {
        self.unit
    }

    pub fn parent(&self) -> Option<DeclId> {
        self.parent
    }

    pub fn children(&self) -> &[DeclId] {
        &self.children
    }

    pub fn access(&self) -> Option<AccessSpecifier> {
        self.access
    }

    pub fn facts(&self) -> &DeclFacts {
        &self.facts
    }

    pub fn template(&self) -> Option<&TemplateFacts> {
        self.template.as_ref()
    }

    pub fn comment(&self) -> Option<&CommentBlock> {
        self.comment.as_ref()
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.facts, DeclFacts::Aggregate(_))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.facts, DeclFacts::Callable(_))
    }

    pub fn is_definition(&self) -> bool {
        match &self.facts {
            DeclFacts::Namespace(_) | DeclFacts::Field(_) => true,
            DeclFacts::Aggregate(facts) => facts.is_definition,
            DeclFacts::Callable(facts) => facts.is_definition,
            DeclFacts::Variable(facts) => facts.is_definition,
        }
    }

    pub fn aggregate_facts(&self) -> Option<&AggregateFacts> {
        match &self.facts {
            DeclFacts::Aggregate(facts) => Some(facts),
            _ => None,
        }
    }

    pub fn method_facts(&self) -> Option<&MethodFacts> {
        match &self.facts {
            DeclFacts::Callable(facts) => Some(&facts.method),
            _ => None,
        }
    }

    pub fn field_facts(&self) -> Option<&FieldFacts> {
        match &self.facts {
            DeclFacts::Field(facts) => Some(facts),
            _ => None,
        }
    }

    pub fn storage_facts(&self) -> Option<&StorageFacts> {
        match &self.facts {
            DeclFacts::Callable(facts) => facts.storage.as_ref(),
            DeclFacts::Variable(facts) => facts.storage.as_ref(),
            _ => None,
        }
    }

    /// The declared type of a field or variable.
    pub fn value_type(&self) -> Option<&TypeDescriptor> {
        match &self.facts {
            DeclFacts::Field(facts) => Some(&facts.ty),
            DeclFacts::Variable(facts) => Some(&facts.ty),
            _ => None,
        }
    }
}

/// Kind-specific payload of a declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DeclFacts {
    Namespace(NamespaceFacts),
    Aggregate(AggregateFacts),
    Callable(CallableFacts),
    Field(FieldFacts),
    Variable(VariableFacts),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NamespaceFacts {
    /// Set for anonymous namespaces.
    pub internal_linkage: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateKey {
    Class,
    Struct,
    Union,
}

impl AggregateKey {
    pub fn default_access(&self) -> AccessSpecifier {
        match self {
            AggregateKey::Class => AccessSpecifier::Private,
            AggregateKey::Struct | AggregateKey::Union => AccessSpecifier::Public,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            AggregateKey::Class => "class",
            AggregateKey::Struct => "struct",
            AggregateKey::Union => "union",
        }
    }
}

/// An access section boundary: `access` applies from child `before_child` on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessMarker {
    pub before_child: usize,
    pub access: AccessSpecifier,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateFacts {
    pub key: AggregateKey,
    pub is_definition: bool,
    /// Unnamed aggregate whose members are promoted into the enclosing one.
    pub is_anonymous: bool,
    pub size: Option<u64>,
    pub align: Option<u64>,
    pub access_markers: Vec<AccessMarker>,
}

impl AggregateFacts {
    pub fn new(key: AggregateKey, is_definition: bool) -> Self {
        Self {
            key,
            is_definition,
            is_anonymous: false,
            size: None,
            align: None,
            access_markers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Argument {
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    #[serde(default)]
    pub name: Option<CompactString>,
}

impl Argument {
    pub fn new(ty: TypeDescriptor, name: Option<&str>) -> Self {
        Self {
            ty,
            name: name.map(Into::into),
        }
    }
}

/// Signature facts of functions, methods and constructors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MethodFacts {
    pub arguments: Vec<Argument>,
    /// Absent for constructors.
    pub result_type: Option<TypeDescriptor>,
    pub is_const: bool,
    pub is_virtual: bool,
    pub is_pure_virtual: bool,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallableFacts {
    pub method: MethodFacts,
    pub is_definition: bool,
    /// Resolved for non-member functions only.
    pub storage: Option<StorageFacts>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldFacts {
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    pub is_mutable: bool,
    pub is_bitfield: bool,
    pub bit_width: Option<u32>,
    /// Offset inside the nearest non-anonymous enclosing aggregate.
    pub byte_offset: Option<u64>,
    /// Offset inside the directly enclosing aggregate.
    pub local_offset: Option<u64>,
    /// First bit inside the storage unit, for bitfields.
    pub bit_offset: Option<u32>,
    /// The field introduces an anonymous struct/union, or is promoted out of one.
    pub is_anonymous: bool,
    /// Member of an anonymous struct/union, visible from the enclosing aggregate.
    pub is_promoted: bool,
}

impl FieldFacts {
    pub fn new(ty: TypeDescriptor) -> Self {
        Self {
            ty,
            is_mutable: false,
            is_bitfield: false,
            bit_width: None,
            byte_offset: None,
            local_offset: None,
            bit_offset: None,
            is_anonymous: false,
            is_promoted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableFacts {
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    pub is_definition: bool,
    pub storage: Option<StorageFacts>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageClass {
    None,
    Static,
    Extern,
    Register,
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    External,
    Internal,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct StorageFacts {
    pub storage_class: StorageClass,
    pub linkage: Linkage,
    pub is_volatile: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CommentStyle {
    PrecedingBlock,
    PrecedingLine,
    Trailing,
}

/// Documentation attached to exactly one declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentBlock {
    pub raw_text: String,
    pub brief_text: String,
    pub style: CommentStyle,
}
