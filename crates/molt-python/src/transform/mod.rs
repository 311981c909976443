//! Tree-rewriting transform passes.
//!
//! Transformers are a closed set of tagged variants dispatched by pattern
//! match; whether a pass is batchable is a property of the variant, not a
//! type hierarchy. Every pass runs in two phases: a read-only decision
//! pass over the tree and its analyses produces a `NodeId`-keyed decision
//! map, and a pure rebuild applies it. A pass that finds nothing to do
//! returns the tree unchanged, so re-running any pass (or the whole
//! pipeline) on its own output is a no-op.
//!
//! Non-batchable passes (rename, hoist, dead-code removal) each take
//! their own traversal and may consult the whole-program import graph.
//! Batchable passes (the mechanical statement-level ones) are fused into
//! a single traversal by [`run_batch`] and never touch bundle-wide state.

pub mod dead_code;
pub mod hoist;
pub mod mechanical;
pub mod rename;

use molt_core::{any_matches_module, QualifiedName};
use molt_python_cst::Module;

use crate::analysis::{Analyses, AnalyzerKind, ImportGraph};

pub use dead_code::DeadCodeOptions;
pub use hoist::HoistOptions;
pub use mechanical::MechanicalOptions;
pub use rename::RenameOptions;

/// The closed set of transformer kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformerKind {
    RenameIdentifiers,
    HoistLiterals,
    RemoveUnreferencedCode,
    RemovePass,
    RemoveAssertions,
}

impl TransformerKind {
    /// The name this kind goes by in configuration and logs.
    pub fn config_name(&self) -> &'static str {
        match self {
            TransformerKind::RenameIdentifiers => "rename_identifiers",
            TransformerKind::HoistLiterals => "hoist_literals",
            TransformerKind::RemoveUnreferencedCode => "remove_unreferenced_code",
            TransformerKind::RemovePass => "remove_pass",
            TransformerKind::RemoveAssertions => "remove_assertions",
        }
    }
}

/// A configured transformer instance.
#[derive(Debug, Clone)]
pub enum Transformer {
    RenameIdentifiers(RenameOptions),
    HoistLiterals(HoistOptions),
    RemoveUnreferencedCode(DeadCodeOptions),
    RemovePass(MechanicalOptions),
    RemoveAssertions(MechanicalOptions),
}

impl Transformer {
    pub fn kind(&self) -> TransformerKind {
        match self {
            Transformer::RenameIdentifiers(_) => TransformerKind::RenameIdentifiers,
            Transformer::HoistLiterals(_) => TransformerKind::HoistLiterals,
            Transformer::RemoveUnreferencedCode(_) => TransformerKind::RemoveUnreferencedCode,
            Transformer::RemovePass(_) => TransformerKind::RemovePass,
            Transformer::RemoveAssertions(_) => TransformerKind::RemoveAssertions,
        }
    }

    pub fn config_name(&self) -> &'static str {
        self.kind().config_name()
    }

    /// Batchable passes have no dependency on whole-program state and are
    /// fused into one traversal in the parallel lane.
    pub fn batchable(&self) -> bool {
        matches!(
            self,
            Transformer::RemovePass(_) | Transformer::RemoveAssertions(_)
        )
    }

    /// The analyses this pass queries, resolved by the orchestrator
    /// against the current tree revision.
    pub fn required_analyzers(&self) -> &'static [AnalyzerKind] {
        match self {
            Transformer::RenameIdentifiers(_) => &[AnalyzerKind::Scope],
            Transformer::HoistLiterals(_) => &[AnalyzerKind::Scope, AnalyzerKind::Literals],
            Transformer::RemoveUnreferencedCode(_) => &[AnalyzerKind::Scope],
            Transformer::RemovePass(_) | Transformer::RemoveAssertions(_) => &[],
        }
    }

    fn excludes(&self) -> &[QualifiedName] {
        match self {
            Transformer::RenameIdentifiers(o) => &o.excludes,
            Transformer::HoistLiterals(o) => &o.excludes,
            Transformer::RemoveUnreferencedCode(o) => &o.excludes,
            Transformer::RemovePass(o) => &o.excludes,
            Transformer::RemoveAssertions(o) => &o.excludes,
        }
    }

    /// True if a configured selector excludes the whole module.
    pub fn excludes_module(&self, module_name: &str) -> bool {
        any_matches_module(self.excludes(), module_name)
    }

    /// Apply this pass to one tree. Unsafe rewrite candidates are skipped
    /// inside each pass (fail-closed), so this never errors; a panic is a
    /// bug and is caught at the orchestrator boundary.
    pub fn apply(
        &self,
        module_name: &str,
        tree: Module,
        analyses: &Analyses,
        graph: &ImportGraph,
    ) -> Module {
        match self {
            Transformer::RenameIdentifiers(options) => {
                rename::apply(options, module_name, tree, analyses.scope(), graph)
            }
            Transformer::HoistLiterals(options) => {
                hoist::apply(options, tree, analyses.scope(), analyses.literals())
            }
            Transformer::RemoveUnreferencedCode(options) => {
                dead_code::apply(options, module_name, tree, analyses, graph)
            }
            Transformer::RemovePass(_) => mechanical::apply(true, false, tree),
            Transformer::RemoveAssertions(_) => mechanical::apply(false, true, tree),
        }
    }
}

/// Run every batchable transformer applicable to `module_name` in one
/// fused traversal. Non-batchable transformers in the slice are ignored.
pub fn run_batch(transformers: &[Transformer], module_name: &str, tree: Module) -> Module {
    let mut remove_pass = false;
    let mut remove_assertions = false;
    for transformer in transformers {
        if transformer.excludes_module(module_name) {
            continue;
        }
        match transformer {
            Transformer::RemovePass(_) => remove_pass = true,
            Transformer::RemoveAssertions(_) => remove_assertions = true,
            _ => {}
        }
    }
    mechanical::apply(remove_pass, remove_assertions, tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use molt_python_cst::parse_module;

    #[test]
    fn batchable_tags_match_the_contract() {
        assert!(Transformer::RemovePass(MechanicalOptions::default()).batchable());
        assert!(Transformer::RemoveAssertions(MechanicalOptions::default()).batchable());
        assert!(!Transformer::RenameIdentifiers(RenameOptions::default()).batchable());
        assert!(!Transformer::HoistLiterals(HoistOptions::default()).batchable());
        assert!(!Transformer::RemoveUnreferencedCode(DeadCodeOptions::default()).batchable());
    }

    #[test]
    fn config_names_are_stable() {
        assert_eq!(
            Transformer::RenameIdentifiers(RenameOptions::default()).config_name(),
            "rename_identifiers"
        );
        assert_eq!(
            Transformer::RemoveUnreferencedCode(DeadCodeOptions::default()).config_name(),
            "remove_unreferenced_code"
        );
    }

    #[test]
    fn run_batch_fuses_enabled_passes() {
        let transformers = vec![
            Transformer::RemovePass(MechanicalOptions::default()),
            Transformer::RemoveAssertions(MechanicalOptions::default()),
        ];
        let tree = parse_module("def f():\n    assert x\n    pass\n    return x\n").unwrap();
        let result = run_batch(&transformers, "m", tree);
        assert_eq!(result.to_source(), "def f():\n    return x\n");
    }

    #[test]
    fn run_batch_honors_module_excludes() {
        let options = MechanicalOptions {
            excludes: vec!["m".parse().unwrap()],
        };
        let transformers = vec![Transformer::RemovePass(options)];
        let tree = parse_module("pass\nx = 1\n").unwrap();
        let result = run_batch(&transformers, "m", tree);
        assert_eq!(result.to_source(), "pass\nx = 1\n");
    }
}
