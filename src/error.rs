//! Error types for the declaration reflection engine
//!
//! Build-time problems are collected as [`Diagnostic`]s and never abort a unit;
//! only a [`MergeConflict`] keeps the graph from being frozen. Query-time
//! signals live in [`QueryError`].

use crate::types::{DeclKind, SourceLocation};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Reason codes for a front-end node the builder could not turn into a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BuildErrorCode {
    MissingName,
    UnsupportedNode,
    UnresolvedQualifier,
    InvalidBitWidth,
    MisplacedAccessSpecifier,
    ConflictingRedeclaration,
    Redefinition,
    InvalidTemplateClause,
}

impl BuildErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingName => "missing name",
            Self::UnsupportedNode => "unsupported node",
            Self::UnresolvedQualifier => "unresolved qualifier",
            Self::InvalidBitWidth => "invalid bit width",
            Self::MisplacedAccessSpecifier => "misplaced access specifier",
            Self::ConflictingRedeclaration => "conflicting redeclaration",
            Self::Redefinition => "redefinition",
            Self::InvalidTemplateClause => "invalid template clause",
        }
    }
}

impl std::fmt::Display for BuildErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A malformed or unsupported front-end node. The rest of the unit still builds.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{location}: {code}: {detail}")]
pub struct BuildError {
    pub location: SourceLocation,
    pub code: BuildErrorCode,
    pub detail: String,
}

impl BuildError {
    pub fn new(location: SourceLocation, code: BuildErrorCode, detail: impl Into<String>) -> Self {
        Self {
            location,
            code,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConflictKind {
    /// The units declare different kinds of entity under one name.
    Kind { first: DeclKind, second: DeclKind },
    /// Both units define the aggregate, with different data members.
    Layout,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictKind::Kind { first, second } => {
                write!(f, "declared as {first} and as {second}")
            }
            ConflictKind::Layout => f.write_str("defined with different data members"),
        }
    }
}

/// Two translation units disagree about one entity. Fatal for the merge.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("Merge conflict for '{qualified_name}': {kind} (first at {first}, then at {second})")]
pub struct MergeConflict {
    pub qualified_name: String,
    pub kind: ConflictKind,
    pub first: SourceLocation,
    pub second: SourceLocation,
}

/// Problems binding a specialization to its primary template.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum TemplateError {
    #[error(
        "{location}: specialization '{specialization}' does not match its primary template: expected {expected} arguments, {reason}"
    )]
    SpecializationArityMismatch {
        specialization: String,
        location: SourceLocation,
        expected: usize,
        reason: String,
    },

    #[error(
        "{location}: no primary template '{primary}' found for specialization '{specialization}'"
    )]
    MissingPrimary {
        specialization: String,
        primary: String,
        location: SourceLocation,
    },
}

/// Aggregates whose layout could not be computed keep no offsets.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum LayoutError {
    #[error("{location}: cannot size type '{type_name}' of member '{member}'")]
    UnresolvedType {
        member: String,
        type_name: String,
        location: SourceLocation,
    },

    #[error("{location}: aggregate '{aggregate}' contains itself by value")]
    RecursiveAggregate {
        aggregate: String,
        location: SourceLocation,
    },

    #[error("{location}: array extent of member '{member}' is not a constant ('{type_name}')")]
    UnknownExtent {
        member: String,
        type_name: String,
        location: SourceLocation,
    },

    #[error("{location}: size of aggregate '{aggregate}' does not fit in 64 bits")]
    SizeOverflow {
        aggregate: String,
        location: SourceLocation,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Warning,
    Error,
}

/// A recoverable problem recorded while building and annotating one unit.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum Diagnostic {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::Build(e) if e.code == BuildErrorCode::UnsupportedNode => Severity::Warning,
            Diagnostic::Layout(_) => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Get a stable status code for this diagnostic.
    pub fn status_code(&self) -> &'static str {
        match self {
            Diagnostic::Build(_) => "BUILD_ERROR",
            Diagnostic::Template(TemplateError::SpecializationArityMismatch { .. }) => {
                "SPECIALIZATION_ARITY_MISMATCH"
            }
            Diagnostic::Template(TemplateError::MissingPrimary { .. }) => {
                "MISSING_PRIMARY_TEMPLATE"
            }
            Diagnostic::Layout(_) => "LAYOUT_UNAVAILABLE",
        }
    }
}

/// Query-time signals. None of these indicate a broken graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Declaration '{0}' not found")]
    NotFound(String),

    #[error("'{name}' is a {actual}, expected {expected}")]
    WrongKind {
        name: String,
        actual: DeclKind,
        expected: &'static str,
    },

    #[error("Template argument {index} of '{specialization}' is unbound (parameter '{parameter}')")]
    UnboundParameter {
        specialization: String,
        index: usize,
        parameter: String,
    },

    #[error("Template argument index {index} out of range for '{name}' with {arity} parameters")]
    IndexOutOfRange {
        name: String,
        index: usize,
        arity: usize,
    },

    #[error("No layout available for '{0}'")]
    LayoutUnavailable(String),

    #[error("'{0}' is not a template or template specialization")]
    NotATemplate(String),
}

/// Errors raised by front-end adapters before the engine sees a tree.
#[derive(Error, Debug)]
pub enum FrontendError {
    #[error("Failed to initialize {language} parser: {reason}")]
    ParserInit { language: String, reason: String },

    #[error("Failed to produce a syntax tree for '{unit}'")]
    SyntaxTree { unit: String },

    #[error("Failed to read file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid translation unit JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top level error for a pipeline run
#[derive(Error, Debug)]
pub enum ReflectError {
    #[error(transparent)]
    Merge(#[from] MergeConflict),

    #[error("Build cancelled before merge")]
    Cancelled,

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error(transparent)]
    Frontend(#[from] FrontendError),
}

impl ReflectError {
    /// Get a stable status code for this error type.
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::Merge(_) => "MERGE_CONFLICT",
            Self::Cancelled => "CANCELLED",
            Self::ThreadPool(_) => "THREAD_POOL_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Frontend(_) => "FRONTEND_ERROR",
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Merge(_) => vec![
                "Check that every unit sees the same definition of the conflicting entity",
                "Build the disagreeing units separately to inspect each definition",
            ],
            Self::Cancelled => vec!["Run the build again; no graph was modified"],
            Self::ThreadPool(_) => vec!["Lower build.parallel_threads in the settings file"],
            Self::Config(_) => vec![
                "Check .declgraph/settings.toml for typos",
                "Unset DG_* environment variables that override the file",
            ],
            Self::Frontend(_) => vec!["Check that the input file exists and is valid C++ or JSON"],
        }
    }
}

/// Result type alias for single-node build operations
pub type BuildResult<T> = Result<T, BuildError>;

/// Result type alias for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Result type alias for pipeline operations
pub type ReflectResult<T> = Result<T, ReflectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_error_display_carries_location_and_code() {
        let err = BuildError::new(
            SourceLocation::new("a.cpp", 4, 2),
            BuildErrorCode::MissingName,
            "field without a name",
        );
        assert_eq!(err.to_string(), "a.cpp:4:2: missing name: field without a name");
    }

    #[test]
    fn test_diagnostic_status_codes() {
        let diag: Diagnostic = TemplateError::SpecializationArityMismatch {
            specialization: "C1<int>".into(),
            location: SourceLocation::at(1, 1),
            expected: 2,
            reason: "found 1".into(),
        }
        .into();
        assert_eq!(diag.status_code(), "SPECIALIZATION_ARITY_MISMATCH");
        assert_eq!(diag.severity(), Severity::Error);
    }

    #[test]
    fn test_merge_conflict_mentions_both_locations() {
        let conflict = MergeConflict {
            qualified_name: "ns::S".into(),
            kind: ConflictKind::Kind {
                first: DeclKind::Struct,
                second: DeclKind::Union,
            },
            first: SourceLocation::new("a.cpp", 1, 1),
            second: SourceLocation::new("b.cpp", 2, 1),
        };
        let message = conflict.to_string();
        assert!(message.contains("a.cpp:1:1"));
        assert!(message.contains("b.cpp:2:1"));
        assert!(message.contains("declared as Struct and as Union"));
    }

    #[test]
    fn test_reflect_error_suggestions() {
        assert_eq!(ReflectError::Cancelled.status_code(), "CANCELLED");
        assert!(!ReflectError::Cancelled.recovery_suggestions().is_empty());
    }
}
