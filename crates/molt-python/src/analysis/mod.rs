//! Per-module analyses.
//!
//! Analyzers are a closed set ([`AnalyzerKind`]); an [`Analyses`] value is
//! the immutable snapshot of the analyses one transformer invocation
//! requested, resolved against one tree revision. Transformers declare
//! their requirements, the orchestrator resolves them, and the snapshot is
//! shared read-only for the duration of the invocation. The whole-program
//! import graph is not part of this container: it is bundle-wide state,
//! built once by the loader and passed separately.

pub mod imports;
pub mod literals;
pub mod scope;

use molt_python_cst::Module;

pub use imports::{collect_imports, ImportGraph, ImportRecord, ModuleGraph};
pub use literals::{LiteralAnalysis, PrecedingAssignment};
pub use scope::{Access, Assignment, BindingKind, Scope, ScopeAnalysis, ScopeId, ScopeKind};

/// The closed set of per-module analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerKind {
    Scope,
    Literals,
}

/// Immutable analysis snapshot for one tree revision.
#[derive(Debug)]
pub struct Analyses {
    scope: Option<ScopeAnalysis>,
    literals: Option<LiteralAnalysis>,
}

impl Analyses {
    /// Resolve the requested analyses against `tree`. Literal analysis
    /// implies scope analysis (it resolves literal scopes through it).
    pub fn resolve(tree: &Module, kinds: &[AnalyzerKind]) -> Analyses {
        let need_scope =
            kinds.contains(&AnalyzerKind::Scope) || kinds.contains(&AnalyzerKind::Literals);
        let scope = need_scope.then(|| ScopeAnalysis::analyze(tree));
        let literals = if kinds.contains(&AnalyzerKind::Literals) {
            scope
                .as_ref()
                .map(|scopes| LiteralAnalysis::analyze(tree, scopes))
        } else {
            None
        };
        Analyses { scope, literals }
    }

    /// The scope analysis. Panics if it was not requested; transformers
    /// declare their requirements statically, so this is unreachable for
    /// any registered transformer.
    pub fn scope(&self) -> &ScopeAnalysis {
        self.scope
            .as_ref()
            .expect("scope analysis was not resolved for this invocation")
    }

    /// The literal-duplication analysis. Panics if not requested.
    pub fn literals(&self) -> &LiteralAnalysis {
        self.literals
            .as_ref()
            .expect("literal analysis was not resolved for this invocation")
    }
}
