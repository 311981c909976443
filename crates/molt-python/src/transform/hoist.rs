//! Literal hoisting.
//!
//! Replaces repeated string literals with a reference to a single
//! binding. For each distinct literal value with two or more hoistable
//! occurrences, either an existing safe preceding assignment is reused
//! (when every occurrence sits in that assignment's scope), or a fresh
//! module-level identifier is synthesized and the value is added to one
//! compound assignment statement inserted after any `__future__` imports
//! and leading docstring.
//!
//! An invented binding must pay for itself: with `L` the literal text
//! length, `N` the occurrence count, and `I` the identifier length, the
//! value is hoisted only if `L*N > (L + 1 + I) + 2*I`; otherwise the
//! speculatively reserved identifier is released. A reused binding never
//! rewrites its own right-hand side.

use std::collections::HashMap;

use molt_core::QualifiedName;
use molt_python_cst::nodes::*;
use molt_python_cst::rewrite::{
    rewrite_expression_default, rewrite_module_default, rewrite_tree, Rewrite,
};
use serde::Deserialize;

use crate::analysis::literals::LiteralAnalysis;
use crate::analysis::scope::ScopeAnalysis;
use crate::names::NameRegistry;

/// Options for the hoist pass.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HoistOptions {
    /// Selectors for modules to leave alone.
    pub excludes: Vec<QualifiedName>,
}

/// Hoist repeated literals in one module tree.
pub fn apply(
    _options: &HoistOptions,
    tree: Module,
    scopes: &ScopeAnalysis,
    literals: &LiteralAnalysis,
) -> Module {
    let plan = decide(&tree, scopes, literals);
    if plan.replacements.is_empty() {
        return tree;
    }
    let mut rewriter = HoistRewriter {
        ids: tree.id_gen(),
        plan,
    };
    rewrite_tree(&mut rewriter, tree)
}

#[derive(Debug, Default)]
struct HoistPlan {
    /// Literal node -> identifier that replaces it.
    replacements: HashMap<NodeId, String>,
    /// Invented bindings in discovery order: (identifier, literal text).
    bindings: Vec<(String, String)>,
    /// Module-body index where the compound assignment goes.
    insert_at: usize,
}

fn decide(tree: &Module, scopes: &ScopeAnalysis, literals: &LiteralAnalysis) -> HoistPlan {
    let mut plan = HoistPlan {
        insert_at: insertion_index(&tree.body),
        ..HoistPlan::default()
    };
    let module_scope = scopes.module_scope();
    let mut registry = NameRegistry::new();

    for value in literals.values() {
        let occurrences = literals.occurrences_of(value);
        if occurrences.len() < 2 {
            continue;
        }

        // reuse an existing binding when every occurrence lives in its scope
        let occurrence_scopes: Vec<_> = occurrences
            .iter()
            .filter_map(|n| scopes.scope_of(*n))
            .collect();
        if let Some(&first_scope) = occurrence_scopes.first() {
            if occurrence_scopes.iter().all(|s| *s == first_scope) {
                if let Some(preceding) = literals.preceding_assignment(first_scope, value) {
                    if preceding.identifier.len() < value.len() {
                        for node in occurrences {
                            if *node != preceding.value_node {
                                plan.replacements
                                    .insert(*node, preceding.identifier.clone());
                            }
                        }
                    }
                    continue;
                }
            }
        }

        let identifier = loop {
            let candidate = registry.generate_name_for_scope(module_scope);
            if !scopes.name_in_scope_tree(module_scope, &candidate) {
                break candidate;
            }
        };
        let literal_len = value.len();
        let identifier_len = identifier.len();
        let inline_cost = literal_len * occurrences.len();
        let hoisted_cost = (literal_len + 1 + identifier_len) + 2 * identifier_len;
        if inline_cost <= hoisted_cost {
            registry.reset(module_scope);
            continue;
        }
        registry.register_name_for_scope(module_scope, identifier.clone());
        for node in occurrences {
            plan.replacements.insert(*node, identifier.clone());
        }
        plan.bindings.push((identifier, value.to_string()));
    }
    plan
}

/// Index of the first module statement that is neither a `__future__`
/// import nor a leading bare string expression.
fn insertion_index(body: &[Statement]) -> usize {
    body.iter()
        .take_while(|statement| is_future_import_line(statement) || is_docstring_line(statement))
        .count()
}

fn is_future_import_line(statement: &Statement) -> bool {
    let Statement::Simple(line) = statement else {
        return false;
    };
    !line.body.is_empty()
        && line.body.iter().all(|small| match small {
            SmallStatement::ImportFrom(import) => {
                import.relative == 0
                    && import
                        .module
                        .as_ref()
                        .is_some_and(|m| m.dotted() == "__future__")
            }
            _ => false,
        })
}

fn is_docstring_line(statement: &Statement) -> bool {
    let Statement::Simple(line) = statement else {
        return false;
    };
    !line.body.is_empty()
        && line.body.iter().all(|small| {
            matches!(
                small,
                SmallStatement::Expr(expr) if matches!(
                    expr.value,
                    Expression::SimpleString(_) | Expression::ConcatenatedString(_)
                )
            )
        })
}

struct HoistRewriter {
    ids: NodeIdGen,
    plan: HoistPlan,
}

impl Rewrite for HoistRewriter {
    fn ids(&mut self) -> &mut NodeIdGen {
        &mut self.ids
    }

    fn rewrite_expression(&mut self, expression: Expression) -> Expression {
        if let Expression::SimpleString(s) = &expression {
            if let Some(identifier) = self.plan.replacements.get(&s.id) {
                let identifier = identifier.clone();
                let id = self.ids.fresh();
                return Expression::Name(Name::new(id, identifier));
            }
        }
        rewrite_expression_default(self, expression)
    }

    fn rewrite_module(&mut self, module: Module) -> Module {
        let mut module = rewrite_module_default(self, module);
        if self.plan.bindings.is_empty() {
            return module;
        }
        let assignments = std::mem::take(&mut self.plan.bindings)
            .into_iter()
            .map(|(identifier, text)| {
                SmallStatement::Assign(Assign {
                    id: self.ids.fresh(),
                    targets: vec![AssignTarget {
                        id: self.ids.fresh(),
                        target: Expression::Name(Name::new(self.ids.fresh(), identifier)),
                    }],
                    value: Expression::SimpleString(SimpleString {
                        id: self.ids.fresh(),
                        value: text,
                    }),
                })
            })
            .collect();
        let line = Statement::Simple(SimpleStatementLine {
            id: self.ids.fresh(),
            body: assignments,
        });
        let index = self.plan.insert_at.min(module.body.len());
        module.body.insert(index, line);
        module
    }
}
