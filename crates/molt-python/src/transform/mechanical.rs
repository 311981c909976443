//! Mechanical statement-level passes.
//!
//! These are the batchable transformers: they need no analyses and no
//! whole-program state, only local statement context, so any enabled
//! subset runs as one fused traversal.
//!
//! - remove-pass drops `pass` statements; a suite left empty is refilled
//!   with a single `pass`, which keeps a suite's last `pass` in place.
//! - remove-assertions drops `assert` statements entirely.

use molt_core::QualifiedName;
use molt_python_cst::nodes::{Module, NodeIdGen, SmallStatement};
use molt_python_cst::rewrite::{
    rewrite_small_statement_default, rewrite_tree, Rewrite, Transform,
};
use serde::Deserialize;

/// Options shared by the mechanical passes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MechanicalOptions {
    /// Selectors for modules to leave alone.
    pub excludes: Vec<QualifiedName>,
}

/// Run the enabled mechanical passes in one traversal.
pub fn apply(remove_pass: bool, remove_assertions: bool, tree: Module) -> Module {
    if !remove_pass && !remove_assertions {
        return tree;
    }
    let mut rewriter = MechanicalRewriter {
        ids: tree.id_gen(),
        remove_pass,
        remove_assertions,
    };
    rewrite_tree(&mut rewriter, tree)
}

struct MechanicalRewriter {
    ids: NodeIdGen,
    remove_pass: bool,
    remove_assertions: bool,
}

impl Rewrite for MechanicalRewriter {
    fn ids(&mut self) -> &mut NodeIdGen {
        &mut self.ids
    }

    fn rewrite_small_statement(&mut self, statement: SmallStatement) -> Transform<SmallStatement> {
        match statement {
            SmallStatement::Pass(_) if self.remove_pass => Transform::Remove,
            SmallStatement::Assert(_) if self.remove_assertions => Transform::Remove,
            other => Transform::Keep(rewrite_small_statement_default(self, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use molt_python_cst::parse_module;

    fn run(remove_pass: bool, remove_assertions: bool, source: &str) -> String {
        let tree = parse_module(source).unwrap();
        apply(remove_pass, remove_assertions, tree).to_source()
    }

    #[test]
    fn pass_is_dropped_next_to_other_statements() {
        let out = run(true, false, "def f():\n    pass\n    return 1\n");
        assert_eq!(out, "def f():\n    return 1\n");
    }

    #[test]
    fn a_suites_last_pass_survives() {
        let source = "def f():\n    pass\n";
        assert_eq!(run(true, false, source), source);
    }

    #[test]
    fn module_level_pass_is_dropped_entirely() {
        let out = run(true, false, "pass\nx = 1\n");
        assert_eq!(out, "x = 1\n");
    }

    #[test]
    fn assertions_are_dropped() {
        let out = run(false, true, "def f(x):\n    assert x > 0, 'positive'\n    return x\n");
        assert_eq!(out, "def f(x):\n    return x\n");
    }

    #[test]
    fn assert_only_suite_is_refilled_with_pass() {
        let out = run(false, true, "def f(x):\n    assert x\n");
        assert_eq!(out, "def f(x):\n    pass\n");
    }

    #[test]
    fn fused_run_applies_both() {
        let out = run(true, true, "def f(x):\n    assert x\n    pass\n    return x\n");
        assert_eq!(out, "def f(x):\n    return x\n");
    }

    #[test]
    fn disabled_passes_change_nothing() {
        let source = "def f():\n    pass\nassert x\n";
        assert_eq!(run(false, false, source), source);
    }

    #[test]
    fn removal_is_idempotent() {
        let once = run(true, true, "def f(x):\n    assert x\n    pass\n");
        let twice = run(true, true, &once);
        assert_eq!(once, twice);
    }
}
