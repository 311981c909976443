//! Reference-based dead-code removal.
//!
//! Deletes function, class, single-name-assignment, and import bindings
//! that provably have no use: no access resolves to the binding, and —
//! for module-scope bindings — the whole-program import graph is known
//! and reports no importer of the name. When the graph is unknown,
//! module-scope bindings are kept, but function-local bindings are still
//! removable because local names cannot be imported elsewhere.
//!
//! Conservative exclusions: class-body bindings (attributes), multi-target
//! and non-plain-name assignment targets, augmented assignments, star
//! imports, and whole modules observed to call `globals()`/`locals()`.
//!
//! Removal runs decide → rebuild → re-analyze to a fixpoint within one
//! invocation, so cascades (a function referenced only by another dead
//! function) are fully resolved and a second pipeline run sees no change.

use std::collections::HashSet;

use molt_core::{any_matches_identifier, QualifiedName};
use molt_python_cst::nodes::*;
use molt_python_cst::rewrite::{
    rewrite_small_statement_default, rewrite_statement_default, rewrite_tree, Rewrite, Transform,
};
use molt_python_cst::visitor::{walk_module, VisitResult, Visitor};
use serde::Deserialize;

use crate::analysis::scope::ScopeAnalysis;
use crate::analysis::{Analyses, ImportGraph};

/// Options for the dead-code pass.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeadCodeOptions {
    /// Selectors for modules/identifiers to leave alone.
    pub excludes: Vec<QualifiedName>,
}

/// Remove unreferenced bindings from one module tree.
pub fn apply(
    options: &DeadCodeOptions,
    module_name: &str,
    mut tree: Module,
    analyses: &Analyses,
    graph: &ImportGraph,
) -> Module {
    let mut reanalyzed: Option<ScopeAnalysis> = None;
    loop {
        let decisions = {
            let scopes = reanalyzed.as_ref().unwrap_or_else(|| analyses.scope());
            decide(options, module_name, &tree, scopes, graph)
        };
        if decisions.is_empty() {
            return tree;
        }
        let mut rewriter = DeadCodeRewriter {
            ids: tree.id_gen(),
            decisions,
        };
        tree = rewrite_tree(&mut rewriter, tree);
        reanalyzed = Some(ScopeAnalysis::analyze(&tree));
    }
}

#[derive(Debug, Default)]
struct Decisions {
    /// Whole statements to drop (defs, classes, assignments).
    statements: HashSet<NodeId>,
    /// Individual import aliases to drop.
    aliases: HashSet<NodeId>,
}

impl Decisions {
    fn is_empty(&self) -> bool {
        self.statements.is_empty() && self.aliases.is_empty()
    }
}

fn decide(
    options: &DeadCodeOptions,
    module_name: &str,
    tree: &Module,
    scopes: &ScopeAnalysis,
    graph: &ImportGraph,
) -> Decisions {
    let flags = scopes.flags();
    if flags.uses_globals_builtin || flags.uses_locals_builtin {
        return Decisions::default();
    }
    let mut collector = Collector {
        options,
        module_name,
        scopes,
        graph,
        decisions: Decisions::default(),
    };
    walk_module(&mut collector, tree);
    collector.decisions
}

struct Collector<'a> {
    options: &'a DeadCodeOptions,
    module_name: &'a str,
    scopes: &'a ScopeAnalysis,
    graph: &'a ImportGraph,
    decisions: Decisions,
}

impl Collector<'_> {
    /// True if the binding introduced by `name` has no remaining use.
    fn unreferenced(&self, name: &Name) -> bool {
        if any_matches_identifier(&self.options.excludes, self.module_name, &name.value) {
            return false;
        }
        if self.scopes.is_attribute(name.id) {
            return false;
        }
        let Some(scope) = self.scopes.scope_of(name.id) else {
            return false;
        };
        if !self
            .scopes
            .accesses_resolving_to(scope, &name.value)
            .is_empty()
        {
            return false;
        }
        if scope == self.scopes.module_scope() {
            // only a known graph with zero importers of the name allows
            // removing module-level bindings
            return self.graph.name_imported(self.module_name, &name.value) == Some(false);
        }
        true
    }
}

impl Visitor for Collector<'_> {
    fn visit_function_def(&mut self, node: &FunctionDef) -> VisitResult {
        if self.unreferenced(&node.name) {
            self.decisions.statements.insert(node.id);
        }
        VisitResult::Continue
    }

    fn visit_class_def(&mut self, node: &ClassDef) -> VisitResult {
        if self.unreferenced(&node.name) {
            self.decisions.statements.insert(node.id);
        }
        VisitResult::Continue
    }

    fn visit_assign(&mut self, node: &Assign) -> VisitResult {
        // single plain-name targets only; anything else needs type
        // information to reason about
        if node.targets.len() == 1 {
            if let Expression::Name(name) = &node.targets[0].target {
                if self.unreferenced(name) {
                    self.decisions.statements.insert(node.id);
                }
            }
        }
        VisitResult::Continue
    }

    fn visit_ann_assign(&mut self, node: &AnnAssign) -> VisitResult {
        if let Expression::Name(name) = &node.target {
            if self.unreferenced(name) {
                self.decisions.statements.insert(node.id);
            }
        }
        VisitResult::Continue
    }

    fn visit_import(&mut self, node: &Import) -> VisitResult {
        for alias in &node.names {
            let bound = match &alias.asname {
                Some(asname) => asname,
                None => match alias.name.parts.first() {
                    Some(first) => first,
                    None => continue,
                },
            };
            if self.unreferenced(bound) {
                self.decisions.aliases.insert(alias.id);
            }
        }
        VisitResult::Continue
    }

    fn visit_import_from(&mut self, node: &ImportFrom) -> VisitResult {
        // star imports bind unknowable names and stay untouched
        if let ImportNames::Aliases(aliases) = &node.names {
            for alias in aliases {
                let bound = alias.asname.as_ref().unwrap_or(&alias.name);
                if self.unreferenced(bound) {
                    self.decisions.aliases.insert(alias.id);
                }
            }
        }
        VisitResult::Continue
    }
}

struct DeadCodeRewriter {
    ids: NodeIdGen,
    decisions: Decisions,
}

impl Rewrite for DeadCodeRewriter {
    fn ids(&mut self) -> &mut NodeIdGen {
        &mut self.ids
    }

    fn rewrite_statement(&mut self, statement: Statement) -> Transform<Statement> {
        match &statement {
            Statement::Compound(CompoundStatement::FunctionDef(node))
                if self.decisions.statements.contains(&node.id) =>
            {
                Transform::Remove
            }
            Statement::Compound(CompoundStatement::ClassDef(node))
                if self.decisions.statements.contains(&node.id) =>
            {
                Transform::Remove
            }
            _ => rewrite_statement_default(self, statement),
        }
    }

    fn rewrite_small_statement(&mut self, statement: SmallStatement) -> Transform<SmallStatement> {
        match statement {
            SmallStatement::Assign(node) if self.decisions.statements.contains(&node.id) => {
                Transform::Remove
            }
            SmallStatement::AnnAssign(node) if self.decisions.statements.contains(&node.id) => {
                Transform::Remove
            }
            SmallStatement::Import(node) => {
                let Import { id, names } = node;
                let names: Vec<ImportAlias> = names
                    .into_iter()
                    .filter(|alias| !self.decisions.aliases.contains(&alias.id))
                    .collect();
                if names.is_empty() {
                    Transform::Remove
                } else {
                    Transform::Keep(SmallStatement::Import(Import { id, names }))
                }
            }
            SmallStatement::ImportFrom(node) => {
                let ImportFrom {
                    id,
                    relative,
                    module,
                    names,
                } = node;
                match names {
                    ImportNames::Star => Transform::Keep(SmallStatement::ImportFrom(ImportFrom {
                        id,
                        relative,
                        module,
                        names: ImportNames::Star,
                    })),
                    ImportNames::Aliases(aliases) => {
                        let aliases: Vec<ImportFromAlias> = aliases
                            .into_iter()
                            .filter(|alias| !self.decisions.aliases.contains(&alias.id))
                            .collect();
                        if aliases.is_empty() {
                            Transform::Remove
                        } else {
                            Transform::Keep(SmallStatement::ImportFrom(ImportFrom {
                                id,
                                relative,
                                module,
                                names: ImportNames::Aliases(aliases),
                            }))
                        }
                    }
                }
            }
            other => Transform::Keep(rewrite_small_statement_default(self, other)),
        }
    }
}
