use crate::types::{CompactString, TypeDescriptor};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateParameterKind {
    Type,
    NonTypeInteger,
    NonTypeBool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateParameter {
    pub kind: TemplateParameterKind,
    pub name: CompactString,
    #[serde(default)]
    pub default: Option<TemplateArgument>,
}

impl TemplateParameter {
    pub fn new(kind: TemplateParameterKind, name: &str) -> Self {
        Self {
            kind,
            name: name.into(),
            default: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: TemplateArgument) -> Self {
        self.default = Some(default);
        self
    }
}

/// One slot of a template argument list.
///
/// `Unbound` names the specialization's own parameter that fills the slot.
/// `Dependent` is a written argument that mentions one of those parameters,
/// such as `T*` or `N + 1`. Either one makes a specialization partial.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateArgument {
    Type(TypeDescriptor),
    Integer(i64),
    Bool(bool),
    Unbound {
        parameter: CompactString,
    },
    Dependent {
        spelling: TypeDescriptor,
        parameter: CompactString,
    },
}

impl TemplateArgument {
    pub fn unbound(parameter: &str) -> Self {
        TemplateArgument::Unbound {
            parameter: parameter.into(),
        }
    }

    pub fn is_unbound(&self) -> bool {
        matches!(self, TemplateArgument::Unbound { .. })
    }

    /// True when the slot is not fixed until the specialization is instantiated.
    pub fn is_dependent(&self) -> bool {
        matches!(
            self,
            TemplateArgument::Unbound { .. } | TemplateArgument::Dependent { .. }
        )
    }

    /// The own parameter this slot waits on, if any.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            TemplateArgument::Unbound { parameter }
            | TemplateArgument::Dependent { parameter, .. } => Some(parameter.as_ref()),
            _ => None,
        }
    }

    /// Reclassify a written argument that mentions one of `parameters`.
    ///
    /// Non-type expressions the front-end could not fold arrive as named
    /// types, so both `T*` and `N + 1` are caught here.
    #[must_use]
    pub fn depending_on(self, parameters: &[TemplateParameter]) -> TemplateArgument {
        let TemplateArgument::Type(ty) = &self else {
            return self;
        };
        let mentioned = ty
            .base_name()
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .find_map(|token| parameters.iter().find(|p| *p.name == *token));
        match mentioned {
            Some(parameter) => TemplateArgument::Dependent {
                spelling: ty.clone(),
                parameter: parameter.name.clone(),
            },
            None => self,
        }
    }

    /// Convert this argument to fit a parameter of `kind`, if the two agree.
    ///
    /// Integral values and `bool` convert into each other; types never match
    /// non-type parameters. Unbound and dependent slots fit any parameter.
    pub fn coerce_to(&self, kind: TemplateParameterKind) -> Option<TemplateArgument> {
        match (self, kind) {
            (TemplateArgument::Unbound { .. } | TemplateArgument::Dependent { .. }, _) => {
                Some(self.clone())
            }
            (TemplateArgument::Type(_), TemplateParameterKind::Type) => Some(self.clone()),
            (TemplateArgument::Integer(_), TemplateParameterKind::NonTypeInteger) => {
                Some(self.clone())
            }
            (TemplateArgument::Bool(b), TemplateParameterKind::NonTypeInteger) => {
                Some(TemplateArgument::Integer(i64::from(*b)))
            }
            (TemplateArgument::Bool(_), TemplateParameterKind::NonTypeBool) => Some(self.clone()),
            (TemplateArgument::Integer(n), TemplateParameterKind::NonTypeBool) => {
                Some(TemplateArgument::Bool(*n != 0))
            }
            _ => None,
        }
    }
}

impl fmt::Display for TemplateArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateArgument::Type(ty) => write!(f, "{ty}"),
            TemplateArgument::Integer(n) => write!(f, "{n}"),
            TemplateArgument::Bool(b) => write!(f, "{b}"),
            TemplateArgument::Unbound { parameter } => f.write_str(parameter),
            TemplateArgument::Dependent { spelling, .. } => write!(f, "{spelling}"),
        }
    }
}

/// The argument list of a specialization after checking it against its primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateBinding {
    pub arguments: Vec<TemplateArgument>,
    pub is_partial: bool,
}

impl TemplateBinding {
    pub fn new(arguments: Vec<TemplateArgument>) -> Self {
        let is_partial = arguments.iter().any(TemplateArgument::is_dependent);
        Self {
            arguments,
            is_partial,
        }
    }

    pub fn arity(&self) -> usize {
        self.arguments.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TemplateFacts {
    Primary {
        parameters: Vec<TemplateParameter>,
    },
    Specialization {
        /// Qualified name of the primary template.
        primary: String,
        binding: TemplateBinding,
        /// Parameters the specialization itself introduces (partial only).
        parameters: Vec<TemplateParameter>,
    },
}

impl TemplateFacts {
    pub fn binding(&self) -> Option<&TemplateBinding> {
        match self {
            TemplateFacts::Specialization { binding, .. } => Some(binding),
            TemplateFacts::Primary { .. } => None,
        }
    }

    pub fn parameters(&self) -> &[TemplateParameter] {
        match self {
            TemplateFacts::Primary { parameters } => parameters,
            TemplateFacts::Specialization { parameters, .. } => parameters,
        }
    }
}

/// Render `name<a, b>` the way specializations are spelled in qualified names.
pub(crate) fn render_arguments(name: &str, arguments: &[TemplateArgument]) -> String {
    let rendered: Vec<String> = arguments.iter().map(ToString::to_string).collect();
    format!("{name}<{}>", rendered.join(", "))
}
