//! End-to-end build: per-unit build and annotation, then merge and freeze.
//!
//! Units are independent until the merge, so they are built on a rayon pool
//! when there is more than one of them. The merge itself runs on the calling
//! thread in input order, which keeps the resulting graph deterministic.

use crate::annotate::{AnnotationPass, annotate_unit, default_passes};
use crate::builder::{UnitTree, build_unit, merge_units};
use crate::config::{Settings, set_global_debug};
use crate::database::ReflectionDatabase;
use crate::error::{Diagnostic, ReflectError, ReflectResult, Severity};
use crate::frontend::TranslationUnit;
use crate::types::UnitId;
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Shared flag that aborts a running build before its merge.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A diagnostic together with the unit that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDiagnostic {
    pub unit: String,
    pub diagnostic: Diagnostic,
}

pub struct BuildOutput {
    pub database: ReflectionDatabase,
    pub diagnostics: Vec<UnitDiagnostic>,
}

impl BuildOutput {
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.diagnostic.severity() == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.len() - self.error_count()
    }
}

pub struct ReflectionPipeline {
    settings: Arc<Settings>,
    passes: Vec<Box<dyn AnnotationPass>>,
    cancel: CancellationToken,
}

impl ReflectionPipeline {
    pub fn new(settings: Arc<Settings>) -> Self {
        let passes = default_passes(&settings);
        Self::with_passes(settings, passes)
    }

    /// Use a custom pass list instead of the standard one.
    pub fn with_passes(settings: Arc<Settings>, passes: Vec<Box<dyn AnnotationPass>>) -> Self {
        set_global_debug(settings.debug);
        Self {
            settings,
            passes,
            cancel: CancellationToken::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Token that cancels [`ReflectionPipeline::run`] from another thread.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Build, annotate, merge and freeze `units`.
    ///
    /// Per-unit problems come back as diagnostics; only a merge conflict,
    /// a cancellation or a failure to start the worker pool is an error.
    pub fn run(&self, units: Vec<TranslationUnit>) -> ReflectResult<BuildOutput> {
        let start = Instant::now();
        let threads = self.settings.build.parallel_threads.max(1);
        tracing::info!(units = units.len(), threads, "starting reflection build");

        let processed: Vec<Option<(UnitTree, Vec<Diagnostic>)>> =
            if threads > 1 && units.len() > 1 {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|index| format!("declgraph-build-{index}"))
                    .build()
                    .map_err(|e| ReflectError::ThreadPool(e.to_string()))?;
                pool.install(|| {
                    units
                        .par_iter()
                        .enumerate()
                        .map(|(index, unit)| self.process_unit(index, unit))
                        .collect()
                })
            } else {
                units
                    .iter()
                    .enumerate()
                    .map(|(index, unit)| self.process_unit(index, unit))
                    .collect()
            };

        if self.cancel.is_cancelled() {
            tracing::warn!("build cancelled before merge, discarding unit trees");
            return Err(ReflectError::Cancelled);
        }

        let mut trees = Vec::with_capacity(processed.len());
        let mut diagnostics = Vec::new();
        for entry in processed {
            let Some((tree, found)) = entry else {
                return Err(ReflectError::Cancelled);
            };
            diagnostics.extend(found.into_iter().map(|diagnostic| UnitDiagnostic {
                unit: tree.name().to_string(),
                diagnostic,
            }));
            trees.push(tree);
        }

        let graph = merge_units(&trees)?;
        let database = graph.freeze();
        tracing::info!(
            declarations = database.len(),
            diagnostics = diagnostics.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "merge committed"
        );

        Ok(BuildOutput {
            database,
            diagnostics,
        })
    }

    fn process_unit(
        &self,
        index: usize,
        unit: &TranslationUnit,
    ) -> Option<(UnitTree, Vec<Diagnostic>)> {
        if self.cancel.is_cancelled() {
            return None;
        }

        let id = UnitId(index as u32 + 1);
        let (mut tree, errors) = build_unit(id, unit);
        tracing::debug!(
            unit = %unit.name,
            declarations = tree.arena().len(),
            errors = errors.len(),
            "unit built"
        );

        let mut diagnostics: Vec<Diagnostic> = errors.into_iter().map(Diagnostic::from).collect();
        diagnostics.extend(annotate_unit(&mut tree, &self.passes));
        tracing::debug!(unit = %unit.name, diagnostics = diagnostics.len(), "unit annotated");

        Some((tree, diagnostics))
    }
}
