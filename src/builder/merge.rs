//! Merge of annotated unit trees into one declaration graph.
//!
//! Units are merged in the order given, keyed by qualified name. The first
//! definition of an entity supplies its facts; later units only contribute
//! members and documentation that are still missing.

use super::UnitTree;
use crate::database::ReflectionDatabase;
use crate::declaration::{DeclArena, DeclFacts, Declaration, Pending};
use crate::error::{ConflictKind, MergeConflict};
use crate::types::DeclId;

/// The merged, still mutable graph. Call [`DeclarationGraph::freeze`] to
/// obtain the read-only database.
#[derive(Debug, Clone, Default)]
pub struct DeclarationGraph {
    arena: DeclArena,
}

/// Merge `units` in order. Rejected specializations are left out.
pub fn merge_units(units: &[UnitTree]) -> Result<DeclarationGraph, MergeConflict> {
    let mut graph = DeclarationGraph::new();
    for unit in units {
        graph.merge_unit(unit)?;
    }
    Ok(graph)
}

impl DeclarationGraph {
    pub fn new() -> Self {
        Self {
            arena: DeclArena::new(),
        }
    }

    pub fn arena(&self) -> &DeclArena {
        &self.arena
    }

    pub fn merge_unit(&mut self, unit: &UnitTree) -> Result<(), MergeConflict> {
        let root = self.arena.root();
        self.merge_children(unit, unit.arena.root(), root)
    }

    fn merge_children(
        &mut self,
        unit: &UnitTree,
        from: DeclId,
        into: DeclId,
    ) -> Result<(), MergeConflict> {
        for &child in unit.arena.children(from) {
            let incoming = unit.arena.node(child);
            if incoming.rejected {
                continue;
            }

            let target = match self.arena.child_by_segment(into, incoming.segment()) {
                Some(existing) => {
                    self.merge_into(existing, unit, child)?;
                    existing
                }
                None => self.arena.alloc(into, detached_copy(incoming)),
            };
            self.merge_children(unit, child, target)?;
        }
        Ok(())
    }

    fn merge_into(
        &mut self,
        existing: DeclId,
        unit: &UnitTree,
        incoming_id: DeclId,
    ) -> Result<(), MergeConflict> {
        let incoming = unit.arena.node(incoming_id);
        let current = self.arena.node(existing);

        if current.kind != incoming.kind {
            return Err(MergeConflict {
                qualified_name: current.qualified_name.clone(),
                kind: ConflictKind::Kind {
                    first: current.kind,
                    second: incoming.kind,
                },
                first: current.location().clone(),
                second: incoming.location().clone(),
            });
        }
        if matches!(current.facts, DeclFacts::Namespace(_)) {
            return Ok(());
        }

        match (current.is_definition(), incoming.is_definition()) {
            (true, true) => {
                if current.is_aggregate()
                    && data_members(&self.arena, existing) != data_members(&unit.arena, incoming_id)
                {
                    return Err(MergeConflict {
                        qualified_name: current.qualified_name.clone(),
                        kind: ConflictKind::Layout,
                        first: current.location().clone(),
                        second: incoming.location().clone(),
                    });
                }
                let target = self.arena.node_mut(existing);
                if target.comment.is_none() {
                    target.comment = incoming.comment.clone();
                }
            }
            (false, true) => {
                let target = self.arena.node_mut(existing);
                target.range = incoming.range.clone();
                target.unit = incoming.unit;
                target.facts = incoming.facts.clone();
                target.template = incoming.template.clone();
                target.access = target.access.or(incoming.access);
                if target.comment.is_none() {
                    target.comment = incoming.comment.clone();
                }
            }
            (_, false) => {
                let target = self.arena.node_mut(existing);
                if target.comment.is_none() {
                    target.comment = incoming.comment.clone();
                }
            }
        }
        Ok(())
    }

    /// Seal the graph into the read-only query database.
    pub fn freeze(self) -> ReflectionDatabase {
        ReflectionDatabase::new(self.arena)
    }
}

/// Copy of a unit node without its unit-local links and front-end leftovers.
fn detached_copy(decl: &Declaration) -> Declaration {
    let mut copy = decl.clone();
    copy.children.clear();
    copy.parent = None;
    copy.pending = Pending::default();
    copy
}

/// Identity of an aggregate's data members: name, type spelling, bit width.
fn data_members(arena: &DeclArena, aggregate: DeclId) -> Vec<(String, String, Option<u32>)> {
    arena
        .children(aggregate)
        .iter()
        .map(|id| arena.node(*id))
        .filter_map(|decl| {
            decl.field_facts().map(|facts| {
                (
                    decl.segment().to_string(),
                    facts.ty.to_string(),
                    facts.bit_width,
                )
            })
        })
        .collect()
}
