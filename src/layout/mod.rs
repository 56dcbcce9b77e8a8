//! Aggregate layout: field offsets, bitfield packing, sizes and alignments.
//!
//! Members are placed in declaration order. Consecutive bitfields of the same
//! declared type share a storage unit of that type's size while they fit; any
//! other member, a zero-width bitfield or a type change closes the unit. Union
//! members all start at offset 0. Members of anonymous aggregates get two
//! offsets: `local_offset` inside the anonymous aggregate and `byte_offset`
//! inside the nearest named one.

mod target;

pub use target::TargetModel;

use crate::annotate::AnnotationPass;
use crate::builder::UnitTree;
use crate::config::{LayoutConfig, TypeLayoutSpec};
use crate::declaration::{AggregateKey, DeclArena, DeclFacts, Declaration};
use crate::error::{BuildError, BuildErrorCode, Diagnostic, LayoutError};
use crate::types::{DeclId, DeclKind, TypeDescriptor};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Size and alignment of a laid-out aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AggregateLayout {
    pub size: u64,
    pub align: u64,
}

pub struct LayoutEngine {
    target: TargetModel,
    reserve_vptr: bool,
}

impl LayoutEngine {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            target: TargetModel::new(config),
            reserve_vptr: config.reserve_vptr,
        }
    }

    pub fn target(&self) -> &TargetModel {
        &self.target
    }
}

impl AnnotationPass for LayoutEngine {
    fn name(&self) -> &'static str {
        "layout"
    }

    fn annotate(&self, tree: &mut UnitTree) -> Vec<Diagnostic> {
        let order = tree.arena().preorder();

        let mut run = LayoutRun {
            engine: self,
            arena: tree.arena(),
            results: HashMap::new(),
            in_progress: HashSet::new(),
            diagnostics: Vec::new(),
        };
        for &id in &order {
            if run.arena.node(id).is_aggregate() {
                run.aggregate(id);
            }
        }
        let LayoutRun {
            results,
            diagnostics,
            ..
        } = run;

        let arena = tree.arena_mut();
        write_local(arena, &results);
        for id in order {
            let named_root = arena
                .node(id)
                .aggregate_facts()
                .is_some_and(|facts| !facts.is_anonymous);
            if named_root {
                write_effective(arena, &results, id, 0);
            }
        }
        diagnostics
    }
}

#[derive(Debug, Clone)]
struct Placement {
    field: DeclId,
    offset: u64,
    bit_offset: Option<u32>,
    /// Anonymous aggregate introduced by this field.
    nested: Option<DeclId>,
}

#[derive(Debug, Clone)]
struct Computed {
    layout: AggregateLayout,
    placements: Vec<Placement>,
}

/// An open bitfield storage unit.
struct StorageUnit {
    ty: TypeDescriptor,
    start: u64,
    size: u64,
    bits_used: u32,
    capacity: u32,
}

impl StorageUnit {
    fn end(&self) -> Option<u64> {
        self.start.checked_add(self.size)
    }
}

struct LayoutRun<'a> {
    engine: &'a LayoutEngine,
    arena: &'a DeclArena,
    results: HashMap<DeclId, Option<Computed>>,
    in_progress: HashSet<DeclId>,
    diagnostics: Vec<Diagnostic>,
}

impl LayoutRun<'_> {
    /// Memoized layout of aggregate `id`; `None` when it has no layout.
    fn aggregate(&mut self, id: DeclId) -> Option<AggregateLayout> {
        if let Some(result) = self.results.get(&id) {
            return result.as_ref().map(|computed| computed.layout);
        }
        if !self.in_progress.insert(id) {
            return None;
        }
        let computed = self.compute(id);
        self.in_progress.remove(&id);

        let layout = computed.as_ref().map(|c| c.layout);
        self.results.insert(id, computed);
        layout
    }

    fn compute(&mut self, id: DeclId) -> Option<Computed> {
        let arena = self.arena;
        let decl = arena.node(id);
        let facts = decl.aggregate_facts()?;
        if !facts.is_definition || is_dependent(arena, decl) {
            return None;
        }

        let is_union = facts.key == AggregateKey::Union;
        let mut cursor = 0u64;
        let mut max_align = 1u64;
        let mut union_size = 0u64;
        let mut open: Option<StorageUnit> = None;
        let mut placements = Vec::new();

        if self.engine.reserve_vptr && !is_union && is_polymorphic(arena, id) {
            let pointer = self.engine.target.pointer();
            cursor = pointer.size;
            max_align = pointer.align;
        }

        for &child in arena.children(id) {
            let member = arena.node(child);
            let Some(field) = member.field_facts() else {
                continue;
            };

            let layout = match self.type_layout(id, member, &field.ty) {
                Ok(layout) => layout,
                Err(error) => {
                    self.diagnostics.push(error.into());
                    return None;
                }
            };
            let align = layout.align.max(1);
            max_align = max_align.max(align);

            if is_union {
                cursor = 0;
                open = None;
            }

            let nested = if field.is_anonymous {
                arena
                    .resolve_in_scope(id, field.ty.base_name())
                    .filter(|nested| is_anonymous_aggregate(arena.node(*nested)))
            } else {
                None
            };

            let Some(width) = field.bit_width else {
                if let Some(unit) = open.take() {
                    cursor = self.checked(unit.end(), decl, member)?;
                }
                cursor = self.checked(align_up(cursor, align), decl, member)?;
                placements.push(Placement {
                    field: child,
                    offset: cursor,
                    bit_offset: None,
                    nested,
                });
                cursor = self.checked(cursor.checked_add(layout.size), decl, member)?;
                union_size = union_size.max(cursor);
                continue;
            };

            let capacity = layout.size.saturating_mul(8);
            if u64::from(width) > capacity {
                self.diagnostics.push(
                    BuildError::new(
                        member.location().clone(),
                        BuildErrorCode::InvalidBitWidth,
                        format!(
                            "width {width} of '{}' exceeds its {capacity}-bit type",
                            member.qualified_name()
                        ),
                    )
                    .into(),
                );
                return None;
            }

            if width == 0 {
                if let Some(unit) = open.take() {
                    cursor = self.checked(unit.end(), decl, member)?;
                }
                placements.push(Placement {
                    field: child,
                    offset: cursor,
                    bit_offset: Some(0),
                    nested: None,
                });
                continue;
            }

            let unit_type = field.ty.without_top_level_qualifiers();
            match open.as_mut() {
                Some(unit) if unit.ty == unit_type && unit.bits_used + width <= unit.capacity => {
                    placements.push(Placement {
                        field: child,
                        offset: unit.start,
                        bit_offset: Some(unit.bits_used),
                        nested: None,
                    });
                    unit.bits_used += width;
                }
                _ => {
                    if let Some(unit) = open.take() {
                        cursor = self.checked(unit.end(), decl, member)?;
                    }
                    cursor = self.checked(align_up(cursor, align), decl, member)?;
                    placements.push(Placement {
                        field: child,
                        offset: cursor,
                        bit_offset: Some(0),
                        nested: None,
                    });
                    let unit = StorageUnit {
                        ty: unit_type,
                        start: cursor,
                        size: layout.size,
                        bits_used: width,
                        capacity: capacity as u32,
                    };
                    union_size = union_size.max(self.checked(unit.end(), decl, member)?);
                    open = Some(unit);
                }
            }
        }

        if let Some(unit) = open.take() {
            cursor = cursor.max(self.checked(unit.end(), decl, decl)?);
        }
        let raw = if is_union { union_size } else { cursor };
        let size = if raw == 0 {
            1
        } else {
            self.checked(align_up(raw, max_align), decl, decl)?
        };

        Some(Computed {
            layout: AggregateLayout {
                size,
                align: max_align,
            },
            placements,
        })
    }

    /// Pass an offset computation through, reporting `aggregate` when it overflowed.
    fn checked(
        &mut self,
        value: Option<u64>,
        aggregate: &Declaration,
        at: &Declaration,
    ) -> Option<u64> {
        if value.is_none() {
            self.diagnostics.push(
                LayoutError::SizeOverflow {
                    aggregate: aggregate.qualified_name().to_string(),
                    location: at.location().clone(),
                }
                .into(),
            );
        }
        value
    }

    /// Size and alignment of a member type as seen from aggregate `scope`.
    fn type_layout(
        &mut self,
        scope: DeclId,
        member: &Declaration,
        ty: &TypeDescriptor,
    ) -> Result<TypeLayoutSpec, LayoutError> {
        if let Some(hint) = member.pending.type_layout {
            return Ok(hint);
        }

        if ty.has_unknown_extent() {
            return Err(LayoutError::UnknownExtent {
                member: member.qualified_name().to_string(),
                type_name: ty.to_string(),
                location: member.location().clone(),
            });
        }
        let arena = self.arena;
        let overflow = || LayoutError::SizeOverflow {
            aggregate: arena.node(scope).qualified_name().to_string(),
            location: member.location().clone(),
        };
        let count = ty.element_count().ok_or_else(overflow)?;
        if ty.is_pointer() || ty.is_reference() {
            let pointer = self.engine.target.pointer();
            return Ok(TypeLayoutSpec {
                size: pointer.size.checked_mul(count).ok_or_else(overflow)?,
                align: pointer.align,
            });
        }

        let unresolved = || LayoutError::UnresolvedType {
            member: member.qualified_name().to_string(),
            type_name: ty.to_string(),
            location: member.location().clone(),
        };

        let base = strip_elaborated(ty.base_name());
        let element = match self.engine.target.builtin(base) {
            Some(layout) => layout,
            None => {
                let Some(aggregate) = self
                    .arena
                    .resolve_in_scope(scope, base)
                    .filter(|id| self.arena.node(*id).is_aggregate())
                else {
                    return Err(unresolved());
                };
                if self.in_progress.contains(&aggregate) {
                    let decl = self.arena.node(aggregate);
                    return Err(LayoutError::RecursiveAggregate {
                        aggregate: decl.qualified_name().to_string(),
                        location: member.location().clone(),
                    });
                }
                let Some(layout) = self.aggregate(aggregate) else {
                    return Err(unresolved());
                };
                TypeLayoutSpec {
                    size: layout.size,
                    align: layout.align,
                }
            }
        };

        Ok(TypeLayoutSpec {
            size: element.size.checked_mul(count).ok_or_else(overflow)?,
            align: element.align,
        })
    }
}

fn align_up(value: u64, align: u64) -> Option<u64> {
    if align <= 1 {
        Some(value)
    } else {
        value.checked_next_multiple_of(align)
    }
}

fn strip_elaborated(name: &str) -> &str {
    ["struct ", "class ", "union "]
        .iter()
        .find_map(|keyword| name.strip_prefix(keyword))
        .unwrap_or(name)
        .trim()
}

fn is_anonymous_aggregate(decl: &Declaration) -> bool {
    decl.aggregate_facts().is_some_and(|facts| facts.is_anonymous)
}

fn is_polymorphic(arena: &DeclArena, aggregate: DeclId) -> bool {
    arena.children(aggregate).iter().any(|child| {
        arena
            .node(*child)
            .method_facts()
            .is_some_and(|method| method.is_virtual)
    })
}

/// Aggregates whose members may depend on unbound template parameters.
fn is_dependent(arena: &DeclArena, decl: &Declaration) -> bool {
    let dependent = |kind: DeclKind| {
        matches!(
            kind,
            DeclKind::TemplateClass
                | DeclKind::TemplatePartialSpecialization
                | DeclKind::TemplateFunction
        )
    };
    dependent(decl.kind) || arena.ancestors(decl.id).any(|id| dependent(arena.node(id).kind))
}

fn write_local(arena: &mut DeclArena, results: &HashMap<DeclId, Option<Computed>>) {
    for (&id, computed) in results {
        let Some(computed) = computed else {
            continue;
        };
        if let DeclFacts::Aggregate(facts) = &mut arena.node_mut(id).facts {
            facts.size = Some(computed.layout.size);
            facts.align = Some(computed.layout.align);
        }
        for placement in &computed.placements {
            if let DeclFacts::Field(field) = &mut arena.node_mut(placement.field).facts {
                field.local_offset = Some(placement.offset);
                field.bit_offset = placement.bit_offset;
            }
        }
    }
}

fn write_effective(
    arena: &mut DeclArena,
    results: &HashMap<DeclId, Option<Computed>>,
    aggregate: DeclId,
    base: u64,
) {
    let Some(Some(computed)) = results.get(&aggregate) else {
        return;
    };
    for placement in &computed.placements {
        let offset = base + placement.offset;
        if let DeclFacts::Field(field) = &mut arena.node_mut(placement.field).facts {
            field.byte_offset = Some(offset);
        }
        if let Some(nested) = placement.nested {
            write_effective(arena, results, nested, offset);
        }
    }
}
