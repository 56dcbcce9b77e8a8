//! Annotation passes run over one unit tree after it is built.

use crate::builder::UnitTree;
use crate::config::Settings;
use crate::docs::DocumentationBinder;
use crate::error::Diagnostic;
use crate::layout::LayoutEngine;
use crate::resolution::{AccessResolver, StorageResolver};
use crate::templates::TemplateResolver;

/// One annotation step over a unit tree.
///
/// Passes only write facts they own and never change the tree shape, so the
/// order between independent passes does not matter. Each returns the
/// recoverable problems it found.
pub trait AnnotationPass: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn annotate(&self, tree: &mut UnitTree) -> Vec<Diagnostic>;
}

/// The standard pass list in pipeline order.
pub fn default_passes(settings: &Settings) -> Vec<Box<dyn AnnotationPass>> {
    vec![
        Box::new(AccessResolver),
        Box::new(StorageResolver),
        Box::new(LayoutEngine::new(&settings.layout)),
        Box::new(TemplateResolver),
        Box::new(DocumentationBinder::new(&settings.documentation)),
    ]
}

/// Run `passes` over `tree` in order and collect their diagnostics.
pub fn annotate_unit(tree: &mut UnitTree, passes: &[Box<dyn AnnotationPass>]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for pass in passes {
        let found = pass.annotate(tree);
        if !found.is_empty() {
            tracing::debug!(
                unit = tree.name(),
                pass = pass.name(),
                count = found.len(),
                "pass reported diagnostics"
            );
        }
        diagnostics.extend(found);
    }
    diagnostics
}
