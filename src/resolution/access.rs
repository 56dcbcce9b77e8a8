use crate::annotate::AnnotationPass;
use crate::builder::UnitTree;
use crate::declaration::{DeclArena, DeclFacts};
use crate::error::Diagnostic;
use crate::types::{AccessSpecifier, DeclId};

/// Stamps every direct child of an aggregate with its effective access.
///
/// The aggregate key sets the initial level (class: private, struct and
/// union: public); each access marker switches the level for the children
/// that follow it. Members promoted out of an anonymous struct/union take the
/// level in effect where the anonymous aggregate appears.
pub struct AccessResolver;

impl AnnotationPass for AccessResolver {
    fn name(&self) -> &'static str {
        "access"
    }

    fn annotate(&self, tree: &mut UnitTree) -> Vec<Diagnostic> {
        let arena = tree.arena_mut();
        for id in arena.preorder() {
            let DeclFacts::Aggregate(facts) = &arena.node(id).facts else {
                continue;
            };
            if facts.is_anonymous && is_member_scope(arena, id) {
                continue;
            }

            let mut markers = facts.access_markers.clone();
            markers.sort_by_key(|marker| marker.before_child);
            let mut current = facts.key.default_access();
            let mut pending = markers.iter().peekable();

            let children = arena.children(id).to_vec();
            for (index, child) in children.into_iter().enumerate() {
                while let Some(marker) = pending.next_if(|marker| marker.before_child <= index) {
                    current = marker.access;
                }
                arena.node_mut(child).access = Some(current);
                if is_anonymous_aggregate(arena, child) {
                    stamp_promoted(arena, child, current);
                }
            }
        }
        Vec::new()
    }
}

fn is_anonymous_aggregate(arena: &DeclArena, id: DeclId) -> bool {
    arena
        .node(id)
        .aggregate_facts()
        .is_some_and(|facts| facts.is_anonymous)
}

fn is_member_scope(arena: &DeclArena, id: DeclId) -> bool {
    arena
        .node(id)
        .parent
        .is_some_and(|parent| arena.node(parent).is_aggregate())
}

fn stamp_promoted(arena: &mut DeclArena, anonymous: DeclId, access: AccessSpecifier) {
    for child in arena.children(anonymous).to_vec() {
        arena.node_mut(child).access = Some(access);
        if is_anonymous_aggregate(arena, child) {
            stamp_promoted(arena, child, access);
        }
    }
}
