//! Template parameter lists and specialization bindings.
//!
//! Primaries get their ordered parameter list. Every specialization is bound
//! to the primary it names: missing trailing arguments come from parameter
//! defaults, each argument must fit its parameter's kind, and the result
//! decides whether the specialization is partial or full. Specializations that
//! cannot be bound are marked rejected and never reach the merged graph.

use crate::annotate::AnnotationPass;
use crate::builder::UnitTree;
use crate::declaration::{
    DeclArena, Declaration, TemplateArgument, TemplateBinding, TemplateFacts, TemplateParameter,
};
use crate::error::{Diagnostic, TemplateError};
use crate::types::{DeclId, DeclKind};

pub struct TemplateResolver;

impl AnnotationPass for TemplateResolver {
    fn name(&self) -> &'static str {
        "templates"
    }

    fn annotate(&self, tree: &mut UnitTree) -> Vec<Diagnostic> {
        let arena = tree.arena_mut();
        let order = arena.preorder();
        let mut diagnostics = Vec::new();

        // Primaries first, so specializations can read their parameter lists
        for &id in &order {
            let decl = arena.node_mut(id);
            if matches!(decl.kind, DeclKind::TemplateClass | DeclKind::TemplateFunction) {
                let parameters = std::mem::take(&mut decl.pending.template_parameters);
                decl.template = Some(TemplateFacts::Primary { parameters });
            }
        }

        for &id in &order {
            if !arena.node(id).kind.is_specialization() {
                continue;
            }
            match bind(arena, id) {
                Ok((kind, facts)) => {
                    let decl = arena.node_mut(id);
                    decl.kind = kind;
                    decl.template = Some(facts);
                }
                Err(error) => {
                    tracing::debug!(error = %error, "rejecting specialization");
                    arena.node_mut(id).rejected = true;
                    diagnostics.push(error.into());
                }
            }
        }
        diagnostics
    }
}

fn bind(arena: &DeclArena, id: DeclId) -> Result<(DeclKind, TemplateFacts), TemplateError> {
    let decl = arena.node(id);
    let primary_name = decl
        .pending
        .specializes
        .as_deref()
        .unwrap_or(decl.name());
    let written = &decl.pending.template_arguments;

    let Some(primary) = find_primary(arena, decl, primary_name, written.len()) else {
        return Err(TemplateError::MissingPrimary {
            specialization: decl.qualified_name().to_string(),
            primary: primary_name.to_string(),
            location: decl.location().clone(),
        });
    };
    let parameters = primary
        .template
        .as_ref()
        .map(TemplateFacts::parameters)
        .unwrap_or_default();

    let mismatch = |reason: String| TemplateError::SpecializationArityMismatch {
        specialization: decl.qualified_name().to_string(),
        location: decl.location().clone(),
        expected: parameters.len(),
        reason,
    };

    if written.len() > parameters.len() {
        return Err(mismatch(format!("found {}", written.len())));
    }

    let own = own_parameters(decl);
    let mut arguments = Vec::with_capacity(parameters.len());
    for (index, parameter) in parameters.iter().enumerate() {
        let argument = match (written.get(index), &parameter.default) {
            (Some(argument), _) => argument.clone().depending_on(&own),
            (None, Some(default)) => default.clone(),
            (None, None) => {
                return Err(mismatch(format!(
                    "found {} and parameter '{}' has no default",
                    written.len(),
                    parameter.name
                )));
            }
        };
        let Some(coerced) = argument.coerce_to(parameter.kind) else {
            return Err(mismatch(format!(
                "argument {index} ('{argument}') does not fit {:?} parameter '{}'",
                parameter.kind, parameter.name
            )));
        };
        arguments.push(coerced);
    }

    let binding = TemplateBinding::new(arguments);
    if decl.kind == DeclKind::TemplateFullSpecialization && binding.is_partial {
        let unbound = binding
            .arguments
            .iter()
            .position(TemplateArgument::is_dependent)
            .unwrap_or_default();
        return Err(mismatch(format!(
            "full specialization leaves argument {unbound} unbound"
        )));
    }

    // A specialization with its own parameter list is never full
    let kind = if binding.is_partial || !own.is_empty() {
        DeclKind::TemplatePartialSpecialization
    } else {
        DeclKind::TemplateFullSpecialization
    };
    Ok((
        kind,
        TemplateFacts::Specialization {
            primary: primary.qualified_name().to_string(),
            binding,
            parameters: own,
        },
    ))
}

/// The specialization's own template parameters, as written.
fn own_parameters(decl: &Declaration) -> Vec<TemplateParameter> {
    decl.pending.template_parameters.clone()
}

/// Primary template `name` visible from the specialization's scope, preferring
/// one whose parameter count fits the written arguments.
fn find_primary<'a>(
    arena: &'a DeclArena,
    decl: &Declaration,
    name: &str,
    written: usize,
) -> Option<&'a Declaration> {
    let is_callable = decl.is_callable();
    let parent = decl.parent?;

    std::iter::once(parent)
        .chain(arena.ancestors(parent))
        .find_map(|scope| {
            let candidates: Vec<&Declaration> = arena
                .children(scope)
                .iter()
                .map(|id| arena.node(*id))
                .filter(|candidate| {
                    candidate.name() == name
                        && candidate.is_callable() == is_callable
                        && matches!(
                            candidate.kind,
                            DeclKind::TemplateClass | DeclKind::TemplateFunction
                        )
                })
                .collect();
            candidates
                .iter()
                .find(|candidate| {
                    candidate
                        .template
                        .as_ref()
                        .is_some_and(|facts| facts.parameters().len() >= written)
                })
                .or(candidates.first())
                .copied()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_unit;
    use crate::declaration::{Argument, TemplateParameterKind};
    use crate::frontend::{NodeKind, SourceNode, TemplateClause, TranslationUnit};
    use crate::types::{Qualifiers, SourceLocation, TypeDescriptor, UnitId};

    fn int() -> TemplateArgument {
        TemplateArgument::Type(TypeDescriptor::named("int"))
    }

    fn parameters() -> Vec<TemplateParameter> {
        vec![
            TemplateParameter::new(TemplateParameterKind::Type, "T"),
            TemplateParameter::new(TemplateParameterKind::NonTypeInteger, "N"),
            TemplateParameter::new(TemplateParameterKind::NonTypeBool, "B"),
        ]
    }

    fn function(clause: TemplateClause, line: u32) -> SourceNode {
        let mut node = SourceNode::new(NodeKind::Function, Some("f1"), SourceLocation::at(line, 1));
        node.arguments = vec![Argument::new(TypeDescriptor::named("int"), Some("a"))];
        node.template = Some(clause);
        node
    }

    fn specialization(arguments: Vec<TemplateArgument>) -> TemplateClause {
        TemplateClause {
            parameters: vec![],
            specializes: Some("f1".into()),
            arguments,
        }
    }

    fn resolve(nodes: Vec<SourceNode>) -> (UnitTree, Vec<Diagnostic>) {
        let (mut tree, errors) = build_unit(UnitId(1), &TranslationUnit::new("t.cpp", nodes));
        assert!(errors.is_empty(), "{errors:?}");
        let diagnostics = TemplateResolver.annotate(&mut tree);
        (tree, diagnostics)
    }

    #[test]
    fn test_primary_gets_ordered_parameters() {
        let primary = function(
            TemplateClause {
                parameters: parameters(),
                ..Default::default()
            },
            1,
        );
        let (tree, diagnostics) = resolve(vec![primary]);
        assert!(diagnostics.is_empty());

        let f1 = tree.find("f1(int)").unwrap();
        assert_eq!(f1.kind(), DeclKind::TemplateFunction);
        let names: Vec<_> = f1
            .template()
            .unwrap()
            .parameters()
            .iter()
            .map(|p| p.name.to_string())
            .collect();
        assert_eq!(names, ["T", "N", "B"]);
    }

    #[test]
    fn test_full_specialization_binding() {
        let primary = function(
            TemplateClause {
                parameters: parameters(),
                ..Default::default()
            },
            1,
        );
        let full = function(
            specialization(vec![int(), TemplateArgument::Integer(5), TemplateArgument::Bool(true)]),
            5,
        );
        let negative = function(
            specialization(vec![
                TemplateArgument::Type(TypeDescriptor::named("float")),
                TemplateArgument::Integer(-10),
                TemplateArgument::Bool(false),
            ]),
            9,
        );

        let (tree, diagnostics) = resolve(vec![primary, full, negative]);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");

        let full = tree.find("f1<int, 5, true>(int)").unwrap();
        assert_eq!(full.kind(), DeclKind::TemplateFullSpecialization);
        let binding = full.template().unwrap().binding().unwrap();
        assert!(!binding.is_partial);
        assert_eq!(
            binding.arguments,
            vec![int(), TemplateArgument::Integer(5), TemplateArgument::Bool(true)]
        );

        let negative = tree.find("f1<float, -10, false>(int)").unwrap();
        assert_eq!(
            negative.template().unwrap().binding().unwrap().arguments[1],
            TemplateArgument::Integer(-10)
        );
    }

    #[test]
    fn test_defaults_fill_missing_arguments() {
        let mut params = parameters();
        params[2] = params[2].clone().with_default(TemplateArgument::Bool(false));
        let primary = function(
            TemplateClause {
                parameters: params,
                ..Default::default()
            },
            1,
        );
        let short = function(specialization(vec![int(), TemplateArgument::Integer(1)]), 4);

        let (tree, diagnostics) = resolve(vec![primary, short]);
        assert!(diagnostics.is_empty());
        let binding = tree
            .find("f1<int, 1>(int)")
            .unwrap()
            .template()
            .unwrap()
            .binding()
            .unwrap()
            .clone();
        assert_eq!(binding.arity(), 3);
        assert_eq!(binding.arguments[2], TemplateArgument::Bool(false));
    }

    #[test]
    fn test_partial_specialization_keeps_unbound_slot() {
        let mut primary = SourceNode::new(NodeKind::Class, Some("C1"), SourceLocation::at(1, 1));
        primary.template = Some(TemplateClause {
            parameters: parameters()[..2].to_vec(),
            ..Default::default()
        });
        let mut partial = SourceNode::new(NodeKind::Class, Some("C1"), SourceLocation::at(5, 1));
        partial.template = Some(TemplateClause {
            parameters: vec![TemplateParameter::new(TemplateParameterKind::NonTypeInteger, "N")],
            specializes: Some("C1".into()),
            arguments: vec![
                TemplateArgument::Type(TypeDescriptor::named("float")),
                TemplateArgument::unbound("N"),
            ],
        });

        let (tree, diagnostics) = resolve(vec![primary, partial]);
        assert!(diagnostics.is_empty());
        let partial = tree.find("C1<float, N>").unwrap();
        assert_eq!(partial.kind(), DeclKind::TemplatePartialSpecialization);
        let facts = partial.template().unwrap();
        assert!(facts.binding().unwrap().is_partial);
        assert_eq!(facts.parameters().len(), 1);
        assert!(matches!(facts, TemplateFacts::Specialization { primary, .. } if primary == "C1"));
    }

    #[test]
    fn test_argument_built_from_own_parameter_stays_partial() {
        let mut primary = SourceNode::new(NodeKind::Class, Some("C1"), SourceLocation::at(1, 1));
        primary.template = Some(TemplateClause {
            parameters: parameters()[..2].to_vec(),
            ..Default::default()
        });
        let mut pointers = SourceNode::new(NodeKind::Class, Some("C1"), SourceLocation::at(4, 1));
        pointers.template = Some(TemplateClause {
            parameters: vec![TemplateParameter::new(TemplateParameterKind::Type, "T")],
            specializes: Some("C1".into()),
            arguments: vec![
                TemplateArgument::Type(TypeDescriptor::named("T").pointer(Qualifiers::empty())),
                TemplateArgument::Integer(3),
            ],
        });

        let (tree, diagnostics) = resolve(vec![primary, pointers]);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let partial = tree.find("C1<T *, 3>").unwrap();
        assert_eq!(partial.kind(), DeclKind::TemplatePartialSpecialization);
        let binding = partial.template().unwrap().binding().unwrap();
        assert!(binding.is_partial);
        assert_eq!(binding.arguments[0].parameter(), Some("T"));
        assert_eq!(binding.arguments[1], TemplateArgument::Integer(3));
    }

    #[test]
    fn test_arity_and_kind_mismatches_reject() {
        let primary = function(
            TemplateClause {
                parameters: parameters(),
                ..Default::default()
            },
            1,
        );
        let too_few = function(specialization(vec![int()]), 3);
        let wrong_kind = function(
            specialization(vec![int(), int(), TemplateArgument::Bool(true)]),
            5,
        );

        let (tree, diagnostics) = resolve(vec![primary, too_few, wrong_kind]);
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.status_code() == "SPECIALIZATION_ARITY_MISMATCH"));
        assert!(tree.find("f1<int>(int)").unwrap().rejected);
        assert!(tree.find("f1<int, int, true>(int)").unwrap().rejected);
    }

    #[test]
    fn test_explicit_specialization_with_unbound_slot_rejects() {
        let primary = function(
            TemplateClause {
                parameters: parameters(),
                ..Default::default()
            },
            1,
        );
        let bogus = function(
            specialization(vec![
                int(),
                TemplateArgument::unbound("N"),
                TemplateArgument::Bool(true),
            ]),
            3,
        );

        let (tree, diagnostics) = resolve(vec![primary, bogus]);
        assert_eq!(diagnostics.len(), 1);
        let decl = tree.find("f1<int, N, true>(int)").unwrap();
        assert_eq!(decl.kind(), DeclKind::TemplateFullSpecialization);
        assert!(decl.rejected);
    }

    #[test]
    fn test_missing_primary_rejects() {
        let orphan = function(specialization(vec![int()]), 1);
        let (tree, diagnostics) = resolve(vec![orphan]);
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(
            &diagnostics[0],
            Diagnostic::Template(TemplateError::MissingPrimary { primary, .. }) if primary == "f1"
        ));
        assert!(tree.find("f1<int>(int)").unwrap().rejected);
    }
}
