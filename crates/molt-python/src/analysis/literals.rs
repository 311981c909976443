//! Literal duplication analysis.
//!
//! For every plain string literal in a module this analysis answers:
//! - how many interchangeable occurrences of the same literal text exist
//!   (token text including prefix and quotes, so `'a'` and `"a"` are
//!   distinct values);
//! - whether a node is excluded from hoisting because it participates in
//!   implicit adjacent-string concatenation or sits in docstring
//!   position;
//! - per scope, whether an earlier, unconditional, single-target
//!   assignment already binds an identifier to that exact literal value
//!   ("preceding assignment"), reusable instead of inventing a binding.
//!
//! A preceding assignment is invalidated when its identifier is
//! re-assigned afterwards, and never recorded when the literal value was
//! already referenced earlier in the scope — both rules prevent unsound
//! substitution. Only statements directly in the scope body qualify as
//! candidates; statements nested in conditionals are not unconditional.

use std::collections::{HashMap, HashSet};

use molt_python_cst::nodes::*;
use molt_python_cst::visitor::{walk_expression, walk_module, VisitResult, Visitor};

use super::scope::{ScopeAnalysis, ScopeId};

/// A reusable earlier assignment of a literal value.
#[derive(Debug, Clone)]
pub struct PrecedingAssignment {
    /// The bound identifier.
    pub identifier: String,
    /// The assignment statement node.
    pub statement: NodeId,
    /// The literal node on the assignment's right-hand side.
    pub value_node: NodeId,
}

/// Immutable literal-duplication analysis for one module tree.
#[derive(Debug)]
pub struct LiteralAnalysis {
    /// Distinct literal values in first-occurrence order.
    values: Vec<String>,
    /// Hoistable occurrences per value, in source order.
    occurrences: HashMap<String, Vec<NodeId>>,
    /// Concatenation parts and docstrings.
    excluded: HashSet<NodeId>,
    /// Safe preceding assignment per (scope, value).
    preceding: HashMap<(ScopeId, String), PrecedingAssignment>,
}

impl LiteralAnalysis {
    pub fn analyze(module: &Module, scopes: &ScopeAnalysis) -> LiteralAnalysis {
        let mut excluded = HashSet::new();
        collect_docstrings(&module.body, &mut excluded);

        let mut collector = OccurrenceCollector {
            values: Vec::new(),
            occurrences: HashMap::new(),
            excluded: &mut excluded,
        };
        walk_module(&mut collector, module);
        let values = collector.values;
        let occurrences = collector.occurrences;

        let mut scanner = PrecedingScanner {
            scopes,
            preceding: HashMap::new(),
        };
        scanner.scan_scope(&module.body, scopes.module_scope());

        LiteralAnalysis {
            values,
            occurrences,
            excluded,
            preceding: scanner.preceding,
        }
    }

    /// Distinct literal values in discovery order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str)
    }

    /// Hoistable occurrences of a value, in source order.
    pub fn occurrences_of(&self, value: &str) -> &[NodeId] {
        self.occurrences.get(value).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if the node cannot be hoisted (concatenation part or
    /// docstring).
    pub fn is_excluded(&self, node: NodeId) -> bool {
        self.excluded.contains(&node)
    }

    /// The safe preceding assignment for `value` in `scope`, if any.
    pub fn preceding_assignment(
        &self,
        scope: ScopeId,
        value: &str,
    ) -> Option<&PrecedingAssignment> {
        self.preceding.get(&(scope, value.to_string()))
    }
}

// ============================================================================
// Occurrence collection
// ============================================================================

struct OccurrenceCollector<'a> {
    values: Vec<String>,
    occurrences: HashMap<String, Vec<NodeId>>,
    excluded: &'a mut HashSet<NodeId>,
}

impl Visitor for OccurrenceCollector<'_> {
    fn visit_concatenated_string(&mut self, node: &ConcatenatedString) -> VisitResult {
        // hoisting a part would change concatenation semantics
        for part in &node.parts {
            if let Expression::SimpleString(s) = part {
                self.excluded.insert(s.id);
            }
        }
        VisitResult::Continue
    }

    fn visit_simple_string(&mut self, node: &SimpleString) -> VisitResult {
        if self.excluded.contains(&node.id) {
            return VisitResult::Continue;
        }
        let entry = self.occurrences.entry(node.value.clone()).or_default();
        if entry.is_empty() {
            self.values.push(node.value.clone());
        }
        entry.push(node.id);
        VisitResult::Continue
    }
}

/// Mark docstring-position strings: the first statement of a module,
/// function, or class body when it is a bare string expression.
fn collect_docstrings(body: &[Statement], excluded: &mut HashSet<NodeId>) {
    if let Some(Statement::Simple(line)) = body.first() {
        if let Some(SmallStatement::Expr(expr)) = line.body.first() {
            match &expr.value {
                Expression::SimpleString(s) => {
                    excluded.insert(s.id);
                }
                Expression::ConcatenatedString(_) => {
                    // parts are excluded by the concatenation rule
                }
                _ => {}
            }
        }
    }
    for statement in body {
        if let Statement::Compound(compound) = statement {
            match compound {
                CompoundStatement::FunctionDef(f) => collect_docstrings(&f.body, excluded),
                CompoundStatement::ClassDef(c) => collect_docstrings(&c.body, excluded),
                CompoundStatement::If(i) => {
                    collect_docstrings_in_if(i, excluded);
                }
                CompoundStatement::For(f) => {
                    collect_docstrings(&f.body, excluded);
                    if let Some(orelse) = &f.orelse {
                        collect_docstrings(orelse, excluded);
                    }
                }
                CompoundStatement::While(w) => {
                    collect_docstrings(&w.body, excluded);
                    if let Some(orelse) = &w.orelse {
                        collect_docstrings(orelse, excluded);
                    }
                }
                CompoundStatement::With(w) => collect_docstrings(&w.body, excluded),
                CompoundStatement::Try(t) => {
                    collect_docstrings(&t.body, excluded);
                    for handler in &t.handlers {
                        collect_docstrings(&handler.body, excluded);
                    }
                    if let Some(orelse) = &t.orelse {
                        collect_docstrings(orelse, excluded);
                    }
                    if let Some(finalbody) = &t.finalbody {
                        collect_docstrings(finalbody, excluded);
                    }
                }
            }
        }
    }
}

fn collect_docstrings_in_if(node: &If, excluded: &mut HashSet<NodeId>) {
    collect_docstrings(&node.body, excluded);
    match &node.orelse {
        Some(ElseBranch::Elif(elif)) => collect_docstrings_in_if(elif, excluded),
        Some(ElseBranch::Else(body)) => collect_docstrings(body, excluded),
        None => {}
    }
}

// Note: docstring detection deliberately looks only at the *first*
// statement of def/class/module bodies; the recursion above only exists
// to find nested definitions.

// ============================================================================
// Preceding-assignment scanning
// ============================================================================

#[derive(Debug)]
struct CandidateEntry {
    value: String,
    identifier: String,
    statement: NodeId,
    value_node: NodeId,
    alive: bool,
}

#[derive(Debug, Default)]
struct BlockState {
    candidates: Vec<CandidateEntry>,
    /// Literal values already referenced in this scope.
    seen: HashSet<String>,
}

impl BlockState {
    fn invalidate(&mut self, identifier: &str) {
        for entry in &mut self.candidates {
            if entry.identifier == identifier {
                entry.alive = false;
            }
        }
    }
}

struct PrecedingScanner<'a> {
    scopes: &'a ScopeAnalysis,
    preceding: HashMap<(ScopeId, String), PrecedingAssignment>,
}

impl PrecedingScanner<'_> {
    fn scan_scope(&mut self, body: &[Statement], scope: ScopeId) {
        let mut state = BlockState::default();
        self.scan_block(body, scope, &mut state, true);
        for entry in state.candidates {
            if !entry.alive {
                continue;
            }
            self.preceding
                .entry((scope, entry.value.clone()))
                .or_insert(PrecedingAssignment {
                    identifier: entry.identifier,
                    statement: entry.statement,
                    value_node: entry.value_node,
                });
        }
    }

    fn scan_block(
        &mut self,
        body: &[Statement],
        scope: ScopeId,
        state: &mut BlockState,
        unconditional: bool,
    ) {
        for statement in body {
            match statement {
                Statement::Simple(line) => {
                    for small in &line.body {
                        self.scan_small(small, state, unconditional);
                    }
                }
                Statement::Compound(compound) => {
                    self.scan_compound(compound, scope, state);
                }
            }
        }
    }

    fn scan_compound(
        &mut self,
        compound: &CompoundStatement,
        scope: ScopeId,
        state: &mut BlockState,
    ) {
        match compound {
            CompoundStatement::FunctionDef(f) => {
                for decorator in &f.decorators {
                    note_strings(&decorator.expression, state);
                }
                for param in f.params.iter() {
                    if let Some(annotation) = &param.annotation {
                        note_strings(annotation, state);
                    }
                    if let Some(default) = &param.default {
                        note_strings(default, state);
                    }
                }
                if let Some(returns) = &f.returns {
                    note_strings(returns, state);
                }
                state.invalidate(&f.name.value);
                if let Some(child) = self.scopes.scope_created_by(f.id) {
                    self.scan_scope(&f.body, child);
                }
            }
            CompoundStatement::ClassDef(c) => {
                for decorator in &c.decorators {
                    note_strings(&decorator.expression, state);
                }
                for base in &c.bases {
                    note_strings(&base.value, state);
                }
                state.invalidate(&c.name.value);
                if let Some(child) = self.scopes.scope_created_by(c.id) {
                    self.scan_scope(&c.body, child);
                }
            }
            CompoundStatement::If(i) => self.scan_if(i, scope, state),
            CompoundStatement::For(f) => {
                note_strings(&f.iter, state);
                invalidate_target(&f.target, state);
                self.scan_block(&f.body, scope, state, false);
                if let Some(orelse) = &f.orelse {
                    self.scan_block(orelse, scope, state, false);
                }
            }
            CompoundStatement::While(w) => {
                note_strings(&w.test, state);
                self.scan_block(&w.body, scope, state, false);
                if let Some(orelse) = &w.orelse {
                    self.scan_block(orelse, scope, state, false);
                }
            }
            CompoundStatement::With(w) => {
                for item in &w.items {
                    note_strings(&item.item, state);
                    if let Some(asname) = &item.asname {
                        invalidate_target(asname, state);
                    }
                }
                // the body runs unconditionally, but candidates stay
                // restricted to scope-level statements
                self.scan_block(&w.body, scope, state, false);
            }
            CompoundStatement::Try(t) => {
                self.scan_block(&t.body, scope, state, false);
                for handler in &t.handlers {
                    if let Some(etype) = &handler.etype {
                        note_strings(etype, state);
                    }
                    if let Some(name) = &handler.name {
                        state.invalidate(&name.value);
                    }
                    self.scan_block(&handler.body, scope, state, false);
                }
                if let Some(orelse) = &t.orelse {
                    self.scan_block(orelse, scope, state, false);
                }
                if let Some(finalbody) = &t.finalbody {
                    self.scan_block(finalbody, scope, state, false);
                }
            }
        }
    }

    fn scan_if(&mut self, node: &If, scope: ScopeId, state: &mut BlockState) {
        note_strings(&node.test, state);
        self.scan_block(&node.body, scope, state, false);
        match &node.orelse {
            Some(ElseBranch::Elif(elif)) => self.scan_if(elif, scope, state),
            Some(ElseBranch::Else(body)) => self.scan_block(body, scope, state, false),
            None => {}
        }
    }

    fn scan_small(&mut self, small: &SmallStatement, state: &mut BlockState, unconditional: bool) {
        match small {
            SmallStatement::Assign(assign) => {
                // candidate form: unconditional, single plain-name target,
                // plain string literal value
                if unconditional && assign.targets.len() == 1 {
                    if let (Expression::Name(target), Expression::SimpleString(literal)) =
                        (&assign.targets[0].target, &assign.value)
                    {
                        state.invalidate(&target.value);
                        if !state.seen.contains(&literal.value) {
                            state.candidates.push(CandidateEntry {
                                value: literal.value.clone(),
                                identifier: target.value.clone(),
                                statement: assign.id,
                                value_node: literal.id,
                                alive: true,
                            });
                        }
                        state.seen.insert(literal.value.clone());
                        return;
                    }
                }
                for target in &assign.targets {
                    invalidate_target(&target.target, state);
                }
                note_strings(&assign.value, state);
            }
            SmallStatement::AnnAssign(assign) => {
                invalidate_target(&assign.target, state);
                note_strings(&assign.annotation, state);
                if let Some(value) = &assign.value {
                    note_strings(value, state);
                }
            }
            SmallStatement::AugAssign(assign) => {
                invalidate_target(&assign.target, state);
                note_strings(&assign.value, state);
            }
            SmallStatement::Del(del) => {
                for target in &del.targets {
                    invalidate_target(target, state);
                }
            }
            SmallStatement::Import(import) => {
                for alias in &import.names {
                    match &alias.asname {
                        Some(asname) => state.invalidate(&asname.value),
                        None => {
                            if let Some(first) = alias.name.parts.first() {
                                state.invalidate(&first.value);
                            }
                        }
                    }
                }
            }
            SmallStatement::ImportFrom(import) => {
                if let ImportNames::Aliases(aliases) = &import.names {
                    for alias in aliases {
                        let bound = alias.asname.as_ref().unwrap_or(&alias.name);
                        state.invalidate(&bound.value);
                    }
                }
            }
            SmallStatement::Expr(expr) => note_strings(&expr.value, state),
            SmallStatement::Return(ret) => {
                if let Some(value) = &ret.value {
                    note_strings(value, state);
                }
            }
            SmallStatement::Assert(assert) => {
                note_strings(&assert.test, state);
                if let Some(msg) = &assert.msg {
                    note_strings(msg, state);
                }
            }
            SmallStatement::Raise(raise) => {
                if let Some(exc) = &raise.exc {
                    note_strings(exc, state);
                }
                if let Some(cause) = &raise.cause {
                    note_strings(cause, state);
                }
            }
            SmallStatement::Pass(_)
            | SmallStatement::Break(_)
            | SmallStatement::Continue(_)
            | SmallStatement::Global(_)
            | SmallStatement::Nonlocal(_) => {}
        }
    }
}

/// Record every string literal value inside `expr` as referenced.
fn note_strings(expr: &Expression, state: &mut BlockState) {
    struct Strings<'a> {
        seen: &'a mut HashSet<String>,
    }
    impl Visitor for Strings<'_> {
        fn visit_simple_string(&mut self, node: &SimpleString) -> VisitResult {
            self.seen.insert(node.value.clone());
            VisitResult::Continue
        }
    }
    let mut visitor = Strings {
        seen: &mut state.seen,
    };
    walk_expression(&mut visitor, expr);
}

/// A rebinding of any name invalidates that identifier's candidates.
fn invalidate_target(target: &Expression, state: &mut BlockState) {
    match target {
        Expression::Name(name) => state.invalidate(&name.value),
        Expression::Tuple(t) => {
            for element in &t.elements {
                invalidate_target(element, state);
            }
        }
        Expression::List(l) => {
            for element in &l.elements {
                invalidate_target(element, state);
            }
        }
        Expression::Starred(s) => invalidate_target(&s.value, state),
        other => note_strings(other, state),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use molt_python_cst::parse_module;

    fn analyze(source: &str) -> (LiteralAnalysis, ScopeAnalysis) {
        let module = parse_module(source).unwrap();
        let scopes = ScopeAnalysis::analyze(&module);
        let literals = LiteralAnalysis::analyze(&module, &scopes);
        (literals, scopes)
    }

    mod occurrences {
        use super::*;

        #[test]
        fn counts_identical_values_across_the_module() {
            let (literals, _) = analyze("a = 'x'\ndef f():\n    return 'x'\nb = 'y'\n");
            assert_eq!(literals.occurrences_of("'x'").len(), 2);
            assert_eq!(literals.occurrences_of("'y'").len(), 1);
        }

        #[test]
        fn quote_style_distinguishes_values() {
            let (literals, _) = analyze("a = 'x'\nb = \"x\"\n");
            assert_eq!(literals.occurrences_of("'x'").len(), 1);
            assert_eq!(literals.occurrences_of("\"x\"").len(), 1);
        }

        #[test]
        fn values_are_in_discovery_order() {
            let (literals, _) = analyze("a = 'first'\nb = 'second'\nc = 'first'\n");
            let values: Vec<&str> = literals.values().collect();
            assert_eq!(values, vec!["'first'", "'second'"]);
        }

        #[test]
        fn concatenation_parts_are_excluded() {
            let (literals, _) = analyze("a = 'x' 'y'\nb = 'x'\n");
            assert_eq!(literals.occurrences_of("'x'").len(), 1);
            assert_eq!(literals.occurrences_of("'y'").len(), 0);
        }

        #[test]
        fn docstrings_are_excluded() {
            let (literals, _) = analyze("'''doc'''\ndef f():\n    'doc2'\n    return 'doc2'\n");
            assert_eq!(literals.occurrences_of("'''doc'''").len(), 0);
            // the docstring position is excluded, the return value is not
            assert_eq!(literals.occurrences_of("'doc2'").len(), 1);
        }
    }

    mod preceding_assignments {
        use super::*;

        #[test]
        fn simple_preceding_assignment_is_recorded() {
            let (literals, scopes) = analyze("name = 'val'\nprint('val')\n");
            let pre = literals
                .preceding_assignment(scopes.module_scope(), "'val'")
                .expect("preceding assignment");
            assert_eq!(pre.identifier, "name");
        }

        #[test]
        fn reassigned_identifier_invalidates_candidate() {
            let (literals, scopes) = analyze("name = 'val'\nname = other\nprint('val')\n");
            assert!(literals
                .preceding_assignment(scopes.module_scope(), "'val'")
                .is_none());
        }

        #[test]
        fn earlier_reference_prevents_candidate() {
            let (literals, scopes) = analyze("print('val')\nname = 'val'\n");
            assert!(literals
                .preceding_assignment(scopes.module_scope(), "'val'")
                .is_none());
        }

        #[test]
        fn conditional_assignment_is_not_a_candidate() {
            let (literals, scopes) = analyze("if cond:\n    name = 'val'\nprint('val')\n");
            assert!(literals
                .preceding_assignment(scopes.module_scope(), "'val'")
                .is_none());
        }

        #[test]
        fn nested_reassignment_invalidates() {
            let (literals, scopes) =
                analyze("name = 'val'\nif cond:\n    name = other\nprint('val')\n");
            assert!(literals
                .preceding_assignment(scopes.module_scope(), "'val'")
                .is_none());
        }

        #[test]
        fn function_scopes_track_their_own_candidates() {
            let (literals, scopes) = analyze(
                "def f():\n    msg = 'hello'\n    print('hello')\n",
            );
            let function_scope = scopes
                .scope_ids()
                .find(|id| scopes.scope(*id).name.as_deref() == Some("f"))
                .unwrap();
            let pre = literals
                .preceding_assignment(function_scope, "'hello'")
                .expect("function-scope candidate");
            assert_eq!(pre.identifier, "msg");
            assert!(literals
                .preceding_assignment(scopes.module_scope(), "'hello'")
                .is_none());
        }

        #[test]
        fn multi_target_assignment_is_not_a_candidate() {
            let (literals, scopes) = analyze("a = b = 'val'\nprint('val')\n");
            assert!(literals
                .preceding_assignment(scopes.module_scope(), "'val'")
                .is_none());
        }
    }
}
