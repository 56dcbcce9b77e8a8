/// The main library module for declgraph
// Debug macro for consistent debug output
#[macro_export]
macro_rules! debug_print {
    ($self:expr, $($arg:tt)*) => {
        if $self.debug {
            eprintln!("DEBUG: {}", format!($($arg)*));
        }
    };
}

pub mod annotate;
pub mod builder;
pub mod config;
pub mod database;
pub mod declaration;
pub mod docs;
pub mod error;
pub mod frontend;
pub mod layout;
pub mod logging;
pub mod pipeline;
pub mod resolution;
pub mod templates;
pub mod types;

// Explicit exports for better API clarity
pub use annotate::{AnnotationPass, annotate_unit, default_passes};
pub use builder::{DeclarationGraph, UnitTree, build_unit, merge_units};
pub use config::Settings;
pub use database::{DeclQuery, DeclVisitor, FieldLayout, GraphStats, ReflectionDatabase};
pub use declaration::{
    AggregateKey, Argument, CommentBlock, CommentStyle, DeclFacts, Declaration, Linkage,
    MethodFacts, StorageClass, StorageFacts, TemplateArgument, TemplateFacts, TemplateParameter,
    TemplateParameterKind,
};
pub use error::{
    BuildError, BuildErrorCode, Diagnostic, MergeConflict, QueryError, QueryResult, ReflectError,
    ReflectResult,
};
pub use frontend::{CppFrontend, SourceNode, TranslationUnit};
pub use layout::AggregateLayout;
pub use logging::init_logging;
pub use pipeline::{BuildOutput, CancellationToken, ReflectionPipeline};
pub use types::{AccessSpecifier, DeclId, DeclKind, SourceLocation, TypeDescriptor, UnitId};
