use crate::annotate::AnnotationPass;
use crate::builder::UnitTree;
use crate::declaration::{DeclArena, DeclFacts, Linkage, StorageClass, StorageFacts};
use crate::error::Diagnostic;
use crate::frontend::StorageSpecifier;
use crate::types::{DeclId, DeclKind};

/// Computes storage class, linkage and volatility for variables and
/// non-member functions.
pub struct StorageResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Namespace,
    Member,
    Block,
}

impl AnnotationPass for StorageResolver {
    fn name(&self) -> &'static str {
        "storage"
    }

    fn annotate(&self, tree: &mut UnitTree) -> Vec<Diagnostic> {
        let arena = tree.arena_mut();
        for id in arena.preorder() {
            let Some(storage) = resolve(arena, id) else {
                continue;
            };
            match &mut arena.node_mut(id).facts {
                DeclFacts::Variable(facts) => facts.storage = Some(storage),
                DeclFacts::Callable(facts) => facts.storage = Some(storage),
                _ => {}
            }
        }
        Vec::new()
    }
}

fn resolve(arena: &DeclArena, id: DeclId) -> Option<StorageFacts> {
    let decl = arena.node(id);
    let parent = arena.node(decl.parent?);
    let scope = match &parent.facts {
        DeclFacts::Namespace(_) => Scope::Namespace,
        DeclFacts::Aggregate(_) => Scope::Member,
        DeclFacts::Callable(_) => Scope::Block,
        _ => return None,
    };

    let is_variable = match &decl.facts {
        DeclFacts::Variable(_) => true,
        DeclFacts::Callable(_) if scope != Scope::Member && !is_member_kind(decl.kind) => false,
        _ => return None,
    };

    let specifier = decl.pending.storage_specifier;
    let in_anonymous_namespace = arena.ancestors(id).any(|ancestor| {
        matches!(
            &arena.node(ancestor).facts,
            DeclFacts::Namespace(ns) if ns.internal_linkage
        )
    });
    let is_const_variable = is_variable && decl.value_type().is_some_and(|ty| ty.is_const());

    let storage_class = match (specifier, scope) {
        (Some(StorageSpecifier::Static), _) => StorageClass::Static,
        (Some(StorageSpecifier::Extern), _) => StorageClass::Extern,
        (Some(StorageSpecifier::Register), _) => StorageClass::Register,
        (Some(StorageSpecifier::Auto), _) => StorageClass::Automatic,
        (None, Scope::Member) => StorageClass::Static,
        (None, Scope::Block) if is_variable => StorageClass::Automatic,
        (None, _) => StorageClass::None,
    };

    let linkage = match scope {
        Scope::Namespace | Scope::Member if in_anonymous_namespace => Linkage::Internal,
        Scope::Namespace if storage_class == StorageClass::Static => Linkage::Internal,
        // Namespace-scope const objects are internal unless declared extern
        Scope::Namespace if is_const_variable && storage_class != StorageClass::Extern => {
            Linkage::Internal
        }
        Scope::Namespace | Scope::Member => Linkage::External,
        Scope::Block if !is_variable || storage_class == StorageClass::Extern => Linkage::External,
        Scope::Block => Linkage::None,
    };

    let is_volatile = decl.value_type().is_some_and(|ty| ty.is_volatile());

    Some(StorageFacts {
        storage_class,
        linkage,
        is_volatile,
    })
}

fn is_member_kind(kind: DeclKind) -> bool {
    matches!(kind, DeclKind::Method | DeclKind::Constructor)
}
