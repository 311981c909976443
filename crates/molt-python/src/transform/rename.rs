//! Scope-safe identifier renaming.
//!
//! Replaces binding+access groups with shorter synthetic names. The
//! decision pass walks the scope model, never the tree: each (scope,
//! name) binding group is either skipped for one of the eligibility
//! reasons below or renamed as a unit, covering the binding occurrences
//! and every access that resolves to them — including `global`/`nonlocal`
//! declaration lists and accesses from nested scopes, so a `nonlocal`
//! chain is renamed consistently with its outer binding.
//!
//! A group is skipped when:
//! - a configured selector excludes the identifier;
//! - the name is declared `global` anywhere in the module;
//! - any binding is part of import syntax (`from m import name` — the
//!   name *is* the imported identifier), or sits in a class body
//!   (attribute);
//! - in local-only mode, any binding is outside function-local scope or
//!   is a parameter (parameters are an external contract);
//! - the binding is at module scope and the import graph is unknown or
//!   reports the name as imported elsewhere;
//! - any resolved access sits inside a type annotation (fail-closed:
//!   abandon rather than partially rewrite);
//! - no legal candidate is strictly shorter than the original.
//!
//! Whole modules observed to call `globals()` or `locals()` are left
//! untouched. A fresh name is accepted only if it is unmentioned in every
//! scope visible from the binding scope *and* was not introduced there by
//! this pass for a different original name; both checks together make a
//! second run over renamed output a no-op.

use std::collections::{HashMap, HashSet};

use molt_core::{any_matches_identifier, QualifiedName};
use molt_python_cst::nodes::{Name, NodeId, NodeIdGen};
use molt_python_cst::rewrite::{rewrite_tree, Rewrite};
use molt_python_cst::Module;
use serde::Deserialize;

use crate::analysis::scope::{BindingKind, ScopeAnalysis, ScopeId, ScopeKind};
use crate::analysis::ImportGraph;
use crate::names::NameRegistry;

/// Options for the rename pass.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenameOptions {
    /// Rename only function-local, non-parameter bindings.
    pub only_rename_locals: bool,
    /// Selectors for modules/identifiers to leave alone.
    pub excludes: Vec<QualifiedName>,
}

impl Default for RenameOptions {
    fn default() -> Self {
        RenameOptions {
            only_rename_locals: true,
            excludes: Vec::new(),
        }
    }
}

/// Rename eligible bindings in one module tree.
pub fn apply(
    options: &RenameOptions,
    module_name: &str,
    tree: Module,
    scopes: &ScopeAnalysis,
    graph: &ImportGraph,
) -> Module {
    let renames = decide(options, module_name, scopes, graph);
    if renames.is_empty() {
        return tree;
    }
    let mut applier = ApplyRenames {
        ids: tree.id_gen(),
        renames,
    };
    rewrite_tree(&mut applier, tree)
}

fn decide(
    options: &RenameOptions,
    module_name: &str,
    scopes: &ScopeAnalysis,
    graph: &ImportGraph,
) -> HashMap<NodeId, String> {
    let flags = scopes.flags();
    if flags.uses_globals_builtin || flags.uses_locals_builtin {
        return HashMap::new();
    }

    let mut registry = NameRegistry::new();
    let mut introduced: HashMap<ScopeId, HashSet<String>> = HashMap::new();
    let mut renames: HashMap<NodeId, String> = HashMap::new();

    for scope_id in scopes.scope_ids() {
        let scope = scopes.scope(scope_id);
        if matches!(scope.kind, ScopeKind::Builtin | ScopeKind::Class) {
            continue;
        }
        for (name, assignments) in &scope.assignments {
            if name.len() <= 1 {
                continue;
            }
            if any_matches_identifier(&options.excludes, module_name, name) {
                continue;
            }
            if scopes.is_global_declared(name) {
                continue;
            }
            if assignments.iter().any(|a| {
                a.kind == BindingKind::Import || scopes.is_attribute(a.node)
            }) {
                continue;
            }
            if options.only_rename_locals
                && !assignments.iter().all(|a| scopes.is_in_local_scope(a.node))
            {
                continue;
            }
            if scope.kind == ScopeKind::Module
                && graph.name_imported(module_name, name) != Some(false)
            {
                continue;
            }
            let accesses = scopes.accesses_resolving_to(scope_id, name);
            if accesses.iter().any(|n| scopes.is_type_annotation(*n)) {
                continue;
            }

            let candidate = loop {
                let candidate = registry.generate_name_for_scope(scope_id);
                if candidate.len() >= name.len() {
                    break None;
                }
                if !conflicts(scopes, &introduced, scope_id, &candidate) {
                    break Some(candidate);
                }
            };
            let Some(candidate) = candidate else {
                registry.reset(scope_id);
                continue;
            };

            registry.register_name_for_scope(scope_id, candidate.clone());
            introduced
                .entry(scope_id)
                .or_default()
                .insert(candidate.clone());
            for assignment in assignments {
                renames.insert(assignment.node, candidate.clone());
            }
            for access in accesses {
                renames.insert(access, candidate.clone());
            }
        }
    }
    renames
}

/// A candidate collides if it is mentioned anywhere visible from `scope`
/// (by original name) or was introduced in a visible scope by this pass
/// (by new name).
fn conflicts(
    scopes: &ScopeAnalysis,
    introduced: &HashMap<ScopeId, HashSet<String>>,
    scope: ScopeId,
    candidate: &str,
) -> bool {
    scopes
        .visible_scopes(scope)
        .into_iter()
        .any(|id| {
            introduced
                .get(&id)
                .is_some_and(|names| names.contains(candidate))
        })
        || scopes.name_in_scope_tree(scope, candidate)
}

struct ApplyRenames {
    ids: NodeIdGen,
    renames: HashMap<NodeId, String>,
}

impl Rewrite for ApplyRenames {
    fn ids(&mut self) -> &mut NodeIdGen {
        &mut self.ids
    }

    fn rewrite_name(&mut self, name: Name) -> Name {
        match self.renames.get(&name.id) {
            Some(new) => Name {
                id: name.id,
                value: new.clone(),
            },
            None => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ModuleGraph;
    use crate::asset::PythonModule;
    use molt_python_cst::parse_module;

    fn run(options: &RenameOptions, graph: &ImportGraph, source: &str) -> String {
        let tree = parse_module(source).unwrap();
        let scopes = ScopeAnalysis::analyze(&tree);
        apply(options, "m", tree, &scopes, graph).to_source()
    }

    fn run_local(source: &str) -> String {
        run(&RenameOptions::default(), &ImportGraph::Unknown, source)
    }

    fn whole_program(options: RenameOptions, source: &str) -> String {
        let modules = vec![PythonModule::parse("m", false, source).unwrap()];
        let graph = ImportGraph::Known(ModuleGraph::build(&modules));
        run(&options, &graph, source)
    }

    mod local_mode {
        use super::*;

        #[test]
        fn renames_local_binding_and_accesses() {
            let out = run_local("def f():\n    value = 1\n    return value\n");
            assert_eq!(out, "def f():\n    a = 1\n    return a\n");
        }

        #[test]
        fn distinct_locals_get_distinct_names() {
            let out = run_local(
                "def f():\n    first = 1\n    second = 2\n    return first + second\n",
            );
            assert_eq!(out, "def f():\n    a = 1\n    b = 2\n    return a + b\n");
        }

        #[test]
        fn candidate_skips_names_used_in_scope() {
            let out = run_local("def f():\n    a = 1\n    value = 2\n    return a + value\n");
            assert_eq!(out, "def f():\n    a = 1\n    b = 2\n    return a + b\n");
        }

        #[test]
        fn parameters_are_never_renamed() {
            let source = "def f(param):\n    return param\n";
            assert_eq!(run_local(source), source);
        }

        #[test]
        fn module_scope_is_untouched_in_local_mode() {
            let source = "value = 1\nprint(value)\n";
            assert_eq!(run_local(source), source);
        }

        #[test]
        fn one_char_names_are_already_minimal() {
            let source = "def f():\n    x = 1\n    return x\n";
            assert_eq!(run_local(source), source);
        }

        #[test]
        fn comprehension_targets_are_renamed() {
            let out = run_local("def f(xs):\n    return [item * 2 for item in xs]\n");
            assert_eq!(out, "def f(xs):\n    return [a * 2 for a in xs]\n");
        }

        #[test]
        fn except_names_are_renamed() {
            let out = run_local(
                "def f():\n    try:\n        pass\n    except ValueError as error:\n        return error\n",
            );
            assert!(out.contains("except ValueError as a:"));
            assert!(out.contains("return a"));
        }
    }

    mod eligibility {
        use super::*;

        #[test]
        fn global_declared_names_are_skipped() {
            let source = "def f():\n    global shared\n    shared = 1\n";
            assert_eq!(run_local(source), source);
        }

        #[test]
        fn globals_builtin_freezes_the_module() {
            let source = "def f():\n    value = 1\n    return value, globals()\n";
            assert_eq!(run_local(source), source);
        }

        #[test]
        fn locals_builtin_freezes_the_module() {
            let source = "def f():\n    value = 1\n    return locals()\n";
            assert_eq!(run_local(source), source);
        }

        #[test]
        fn class_attributes_are_skipped() {
            let source = "class C:\n    attribute = 1\n";
            assert_eq!(
                run(
                    &RenameOptions {
                        only_rename_locals: false,
                        excludes: Vec::new()
                    },
                    &ImportGraph::Unknown,
                    source
                ),
                source
            );
        }

        #[test]
        fn annotation_access_abandons_the_candidate() {
            let source = "def f():\n    MyAlias = int\n    value: MyAlias = 1\n    return value\n";
            let out = run_local(source);
            // MyAlias is used in an annotation, so it stays; value renames
            assert!(out.contains("MyAlias = int"));
            assert!(out.contains("a: MyAlias = 1"));
        }

        #[test]
        fn excluded_identifier_is_kept() {
            let options = RenameOptions {
                only_rename_locals: true,
                excludes: vec!["m:keep_me".parse().unwrap()],
            };
            let out = run(
                &options,
                &ImportGraph::Unknown,
                "def f():\n    keep_me = 1\n    other = 2\n    return keep_me + other\n",
            );
            assert!(out.contains("keep_me = 1"));
            assert!(out.contains("a = 2"));
        }

        #[test]
        fn import_bound_names_are_never_renamed() {
            let source = "def f():\n    from json import dumps\n    return dumps\n";
            assert_eq!(run_local(source), source);
        }

        #[test]
        fn import_aliases_are_renameable_locals() {
            let out = run_local("def f():\n    import json as serializer\n    return serializer\n");
            assert_eq!(out, "def f():\n    import json as a\n    return a\n");
        }
    }

    mod whole_program_mode {
        use super::*;

        fn full() -> RenameOptions {
            RenameOptions {
                only_rename_locals: false,
                excludes: Vec::new(),
            }
        }

        #[test]
        fn module_scope_renames_with_known_unimported_name() {
            let out = whole_program(full(), "helper = 1\nprint(helper)\n");
            assert_eq!(out, "a = 1\nprint(a)\n");
        }

        #[test]
        fn module_scope_kept_when_graph_unknown() {
            let source = "helper = 1\nprint(helper)\n";
            assert_eq!(run(&full(), &ImportGraph::Unknown, source), source);
        }

        #[test]
        fn imported_names_are_kept() {
            let modules = vec![
                PythonModule::parse("m", false, "exported = 1\ninternal = 2\n").unwrap(),
                PythonModule::parse("app", false, "from m import exported\n").unwrap(),
            ];
            let graph = ImportGraph::Known(ModuleGraph::build(&modules));
            let out = run(&full(), &graph, "exported = 1\ninternal = 2\n");
            assert!(out.contains("exported = 1"));
            assert!(out.contains("a = 2"));
        }

        #[test]
        fn parameters_are_renameable_outside_local_mode() {
            let out = whole_program(full(), "def f(value):\n    return value\n");
            assert!(out.contains("def"));
            assert!(out.contains("(a)"));
        }
    }

    mod scope_boundaries {
        use super::*;

        #[test]
        fn nonlocal_chain_renames_consistently() {
            let out = run_local(
                "def outer():\n    counter = 0\n    def inner():\n        nonlocal counter\n        counter = counter + 1\n    return inner\n",
            );
            assert!(out.contains("a = 0"));
            assert!(out.contains("nonlocal a"));
            assert!(out.contains("a = a + 1"));
            assert!(!out.contains("counter"));
        }

        #[test]
        fn class_attribute_shadowing_local_is_untouched() {
            let out = run_local(
                "class C:\n    shared = 1\n    def m(self):\n        shared = 2\n        return shared\n",
            );
            // the class attribute keeps its name, the method local renames
            assert!(out.contains("    shared = 1"));
            assert!(out.contains("        a = 2"));
            assert!(out.contains("        return a"));
        }

        #[test]
        fn shadowed_outer_binding_keeps_inner_untouched() {
            let out = run_local(
                "def outer():\n    value = 1\n    def g(value):\n        return value\n    return value, g\n",
            );
            // outer local renames, the shadowing parameter does not
            assert!(out.contains("a = 1"));
            assert!(out.contains("def g(value):"));
            assert!(out.contains("return value"));
            assert!(out.contains("return a, g"));
        }

        #[test]
        fn nested_scopes_avoid_each_others_new_names() {
            let out = run_local(
                "def f():\n    outer_value = 1\n    def g():\n        inner_value = 2\n        return inner_value + outer_value\n    return g\n",
            );
            // outer_value -> a; inner must not also take a
            assert!(out.contains("a = 1"));
            assert!(out.contains("b = 2"));
            assert!(out.contains("return b + a"));
        }

        #[test]
        fn sibling_scopes_may_reuse_names() {
            let out = run_local(
                "def f():\n    first = 1\n    return first\ndef g():\n    second = 2\n    return second\n",
            );
            assert!(out.contains("def f():\n    a = 1\n    return a\n"));
            assert!(out.contains("def g():\n    a = 2\n    return a\n"));
        }
    }

    mod properties {
        use super::*;

        #[test]
        fn rename_is_idempotent() {
            let source = "def f():\n    value = 1\n    other = value\n    return other\n";
            let once = run_local(source);
            let twice = run_local(&once);
            assert_eq!(once, twice);
        }

        #[test]
        fn output_never_grows() {
            let sources = [
                "def f():\n    value = 1\n    return value\n",
                "def f(param):\n    return param\n",
                "x = 1\n",
            ];
            for source in sources {
                let out = run_local(source);
                assert!(out.len() <= source.len(), "grew: {source:?}");
            }
        }

        #[test]
        fn output_reparses() {
            let out = run_local(
                "def outer():\n    counter = 0\n    def inner():\n        nonlocal counter\n        counter = 1\n    return inner\n",
            );
            parse_module(&out).unwrap();
        }
    }
}
