//! Scope analysis.
//!
//! Builds the lexical scope model for one module tree: a scope arena
//! rooted in a builtin scope, with the module scope below it and one scope
//! per class, function, lambda, and comprehension. Every binding
//! occurrence (assignment) and use occurrence (access) of a name is
//! recorded against a scope, together with the predicates the transform
//! passes depend on (`is_attribute`, `is_in_local_scope`,
//! `is_type_annotation`, `is_keyword_argument_name`) and the whole-module
//! conservatism flags.
//!
//! # Binding rules
//!
//! Plain name targets, unpacking targets, `for`/`with`/`except` targets,
//! parameters, `def`/`class` names, import bindings, and walrus targets
//! are assignments; every other name load is an access. `global` and
//! `nonlocal` redirect the binding scope to the module scope or the
//! nearest enclosing function scope at construction time, so an
//! [`Assignment`] is always recorded against the scope that owns the
//! binding. Access resolution walks the scope chain with the standard
//! exceptions: class scopes are invisible to nested scopes, and
//! comprehension scopes chain to their enclosing scope.
//!
//! Construction never fails. Constructs the model cannot represent
//! exactly (star imports, `globals()`/`locals()` observation) set module
//! flags that force conservative behavior downstream.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use molt_python_cst::nodes::*;
use molt_python_cst::visitor::{
    walk_arg, walk_expression, walk_module, walk_statements, VisitResult, Visitor,
};

/// Identity of a scope within one analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

/// The kind of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// Root scope holding builtins; parent of the module scope.
    Builtin,
    /// Module (global) scope.
    Module,
    /// Class body scope.
    Class,
    /// Function or method body scope.
    Function,
    /// Lambda expression scope.
    Lambda,
    /// Comprehension or generator expression scope.
    Comprehension,
}

impl ScopeKind {
    /// True for scopes whose bindings are function-local.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ScopeKind::Function | ScopeKind::Lambda | ScopeKind::Comprehension
        )
    }
}

/// The kind of binding an assignment introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Function,
    Class,
    Parameter,
    Variable,
    /// `import foo` / `from m import name` (the bound name is part of the
    /// import syntax itself and cannot be rewritten independently).
    Import,
    /// `import foo as alias` / `from m import name as alias`.
    ImportAlias,
}

/// A binding occurrence: the `Name` node that binds, and the statement
/// it belongs to (for attribution).
#[derive(Debug, Clone)]
pub struct Assignment {
    pub node: NodeId,
    pub statement: Option<NodeId>,
    pub kind: BindingKind,
}

/// A use occurrence of a name.
#[derive(Debug, Clone)]
pub struct Access {
    pub node: NodeId,
}

/// One lexical scope.
#[derive(Debug)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Name of the function or class that created this scope.
    pub name: Option<String>,
    /// Binding occurrences per name, in source order.
    pub assignments: BTreeMap<String, Vec<Assignment>>,
    /// Use occurrences per name, in source order.
    pub accesses: BTreeMap<String, Vec<Access>>,
    /// Names declared `global` in this scope.
    pub globals: BTreeSet<String>,
    /// Names declared `nonlocal` in this scope.
    pub nonlocals: BTreeSet<String>,
}

impl Scope {
    fn new(id: ScopeId, kind: ScopeKind, parent: Option<ScopeId>, name: Option<String>) -> Self {
        Scope {
            id,
            kind,
            parent,
            name,
            assignments: BTreeMap::new(),
            accesses: BTreeMap::new(),
            globals: BTreeSet::new(),
            nonlocals: BTreeSet::new(),
        }
    }
}

/// Whole-module conservatism flags.
#[derive(Debug, Default, Clone)]
pub struct ModuleFlags {
    pub uses_global_statement: bool,
    pub uses_nonlocal_statement: bool,
    pub uses_globals_builtin: bool,
    pub uses_locals_builtin: bool,
    /// `from m import *` binds names the model cannot see.
    pub has_star_import: bool,
}

/// Immutable scope analysis for one module tree.
#[derive(Debug)]
pub struct ScopeAnalysis {
    scopes: Vec<Scope>,
    children: Vec<Vec<ScopeId>>,
    /// Containing scope for accesses and strings; binding scope for
    /// assignment nodes (post `global`/`nonlocal` redirection).
    scope_of: HashMap<NodeId, ScopeId>,
    /// Containing scope of candidate statements (defs, assigns, imports).
    statement_scopes: HashMap<NodeId, ScopeId>,
    /// def/class/lambda/comprehension node -> the scope it created.
    created_by: HashMap<NodeId, ScopeId>,
    attributes: HashSet<NodeId>,
    annotations: HashSet<NodeId>,
    keyword_args: HashSet<NodeId>,
    parameters: HashSet<NodeId>,
    global_declared: BTreeSet<String>,
    flags: ModuleFlags,
}

impl ScopeAnalysis {
    /// Build the scope model for a module tree. Always succeeds.
    pub fn analyze(module: &Module) -> ScopeAnalysis {
        let mut builder = ScopeBuilder::new();
        walk_module(&mut builder, module);
        builder.finish()
    }

    /// The builtin root scope.
    pub fn builtin_scope(&self) -> ScopeId {
        ScopeId(0)
    }

    /// The module (global) scope.
    pub fn module_scope(&self) -> ScopeId {
        ScopeId(1)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    /// All scope ids in creation order (parents before children).
    pub fn scope_ids(&self) -> impl Iterator<Item = ScopeId> + '_ {
        (0..self.scopes.len() as u32).map(ScopeId)
    }

    /// Scope recorded for a node (see field docs for which scope that is).
    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.scope_of.get(&node).copied()
    }

    /// Containing scope of a candidate statement.
    pub fn statement_scope(&self, node: NodeId) -> Option<ScopeId> {
        self.statement_scopes.get(&node).copied()
    }

    /// The scope created by a def/class/lambda/comprehension node.
    pub fn scope_created_by(&self, node: NodeId) -> Option<ScopeId> {
        self.created_by.get(&node).copied()
    }

    /// True if the node is an attribute name or a class-body binding.
    pub fn is_attribute(&self, node: NodeId) -> bool {
        self.attributes.contains(&node)
    }

    /// True if the node sits inside a type annotation.
    pub fn is_type_annotation(&self, node: NodeId) -> bool {
        self.annotations.contains(&node)
    }

    /// True if the node is a keyword-argument name at a call site.
    pub fn is_keyword_argument_name(&self, node: NodeId) -> bool {
        self.keyword_args.contains(&node)
    }

    /// True if the node binds a parameter.
    pub fn is_parameter(&self, node: NodeId) -> bool {
        self.parameters.contains(&node)
    }

    /// True only for function-body, non-parameter bindings.
    pub fn is_in_local_scope(&self, node: NodeId) -> bool {
        if self.parameters.contains(&node) {
            return false;
        }
        match self.scope_of(node) {
            Some(scope) => self.scope(scope).kind.is_local(),
            None => false,
        }
    }

    /// True if `name` is declared `global` anywhere in the module.
    pub fn is_global_declared(&self, name: &str) -> bool {
        self.global_declared.contains(name)
    }

    pub fn flags(&self) -> &ModuleFlags {
        &self.flags
    }

    /// Resolve an access of `name` occurring in `from` to its binding
    /// scope, or `None` for builtins/unknown.
    pub fn resolve_access(&self, from: ScopeId, name: &str) -> Option<ScopeId> {
        let scope = self.scope(from);
        if scope.globals.contains(name) {
            return Some(self.module_scope());
        }
        if scope.nonlocals.contains(name) {
            return self.find_nonlocal_binding(from, name);
        }
        let mut current = Some(from);
        let mut is_starting_scope = true;
        while let Some(id) = current {
            let scope = self.scope(id);
            // class scopes are invisible except to code directly in the body
            let visible = is_starting_scope || scope.kind != ScopeKind::Class;
            if visible && scope.assignments.contains_key(name) {
                return Some(id);
            }
            is_starting_scope = false;
            current = scope.parent;
        }
        None
    }

    fn find_nonlocal_binding(&self, from: ScopeId, name: &str) -> Option<ScopeId> {
        let mut current = self.scope(from).parent;
        while let Some(id) = current {
            let scope = self.scope(id);
            match scope.kind {
                ScopeKind::Function | ScopeKind::Lambda => {
                    if scope.assignments.contains_key(name) {
                        return Some(id);
                    }
                }
                ScopeKind::Module | ScopeKind::Builtin => return None,
                _ => {}
            }
            current = scope.parent;
        }
        None
    }

    /// Every scope visible from `scope`: its ancestors (including itself)
    /// and all of its descendants, in deterministic order.
    pub fn visible_scopes(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut result = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            result.push(id);
            current = self.scope(id).parent;
        }
        let mut pending: Vec<ScopeId> = self.children[scope.0 as usize].clone();
        while let Some(id) = pending.pop() {
            result.push(id);
            pending.extend(self.children[id.0 as usize].iter().copied());
        }
        result
    }

    /// True if `name` occurs (as assignment or access) in `scope`, any of
    /// its ancestors, or any of its descendants. This is the conservative
    /// visibility test used when picking fresh identifiers.
    pub fn name_in_scope_tree(&self, scope: ScopeId, name: &str) -> bool {
        self.visible_scopes(scope)
            .into_iter()
            .any(|id| self.scope_mentions(id, name))
    }

    fn scope_mentions(&self, scope: ScopeId, name: &str) -> bool {
        let scope = self.scope(scope);
        scope.assignments.contains_key(name)
            || scope.accesses.contains_key(name)
            || scope.globals.contains(name)
            || scope.nonlocals.contains(name)
    }

    /// Every access node of `name` (in any scope) that resolves to the
    /// binding in `binding_scope`, in deterministic order.
    pub fn accesses_resolving_to(&self, binding_scope: ScopeId, name: &str) -> Vec<NodeId> {
        let mut result = Vec::new();
        for id in self.scope_ids() {
            let scope = self.scope(id);
            if let Some(accesses) = scope.accesses.get(name) {
                if self.resolve_access(id, name) == Some(binding_scope) {
                    result.extend(accesses.iter().map(|a| a.node));
                }
            }
        }
        result
    }
}

// ============================================================================
// Builder
// ============================================================================

struct ScopeBuilder {
    scopes: Vec<Scope>,
    stack: Vec<ScopeId>,
    scope_of: HashMap<NodeId, ScopeId>,
    statement_scopes: HashMap<NodeId, ScopeId>,
    created_by: HashMap<NodeId, ScopeId>,
    attributes: HashSet<NodeId>,
    annotations: HashSet<NodeId>,
    keyword_args: HashSet<NodeId>,
    parameters: HashSet<NodeId>,
    global_declared: BTreeSet<String>,
    flags: ModuleFlags,
    annotation_depth: u32,
}

impl ScopeBuilder {
    fn new() -> Self {
        let builtin = Scope::new(ScopeId(0), ScopeKind::Builtin, None, None);
        ScopeBuilder {
            scopes: vec![builtin],
            stack: vec![ScopeId(0)],
            scope_of: HashMap::new(),
            statement_scopes: HashMap::new(),
            created_by: HashMap::new(),
            attributes: HashSet::new(),
            annotations: HashSet::new(),
            keyword_args: HashSet::new(),
            parameters: HashSet::new(),
            global_declared: BTreeSet::new(),
            flags: ModuleFlags::default(),
            annotation_depth: 0,
        }
    }

    fn finish(self) -> ScopeAnalysis {
        let mut children: Vec<Vec<ScopeId>> = vec![Vec::new(); self.scopes.len()];
        for scope in &self.scopes {
            if let Some(parent) = scope.parent {
                children[parent.0 as usize].push(scope.id);
            }
        }
        ScopeAnalysis {
            scopes: self.scopes,
            children,
            scope_of: self.scope_of,
            statement_scopes: self.statement_scopes,
            created_by: self.created_by,
            attributes: self.attributes,
            annotations: self.annotations,
            keyword_args: self.keyword_args,
            parameters: self.parameters,
            global_declared: self.global_declared,
            flags: self.flags,
        }
    }

    fn current(&self) -> ScopeId {
        *self.stack.last().expect("scope stack is never empty")
    }

    fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    fn push_scope(&mut self, kind: ScopeKind, name: Option<&str>, creator: NodeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        let parent = self.current();
        self.scopes
            .push(Scope::new(id, kind, Some(parent), name.map(str::to_string)));
        self.stack.push(id);
        self.created_by.insert(creator, id);
        id
    }

    fn pop_scope(&mut self) {
        self.stack.pop();
    }

    /// Record a binding occurrence, honoring `global`/`nonlocal`
    /// redirection declared in the current scope.
    fn bind(&mut self, name: &Name, kind: BindingKind, statement: Option<NodeId>) {
        let current = self.current();
        let target = {
            let scope = &self.scopes[current.0 as usize];
            if scope.globals.contains(&name.value) {
                ScopeId(1)
            } else if scope.nonlocals.contains(&name.value) {
                self.nonlocal_target(current, &name.value)
            } else {
                current
            }
        };
        self.record_binding(target, name, kind, statement);
    }

    /// Walrus targets bind in the nearest enclosing non-comprehension
    /// scope.
    fn bind_walrus(&mut self, name: &Name) {
        let target = self
            .stack
            .iter()
            .rev()
            .copied()
            .find(|id| self.scopes[id.0 as usize].kind != ScopeKind::Comprehension)
            .unwrap_or_else(|| self.current());
        self.record_binding(target, name, BindingKind::Variable, None);
    }

    fn record_binding(
        &mut self,
        target: ScopeId,
        name: &Name,
        kind: BindingKind,
        statement: Option<NodeId>,
    ) {
        if self.scopes[target.0 as usize].kind == ScopeKind::Class {
            self.attributes.insert(name.id);
        }
        if kind == BindingKind::Parameter {
            self.parameters.insert(name.id);
        }
        self.scope_of.insert(name.id, target);
        self.scope_mut(target)
            .assignments
            .entry(name.value.clone())
            .or_default()
            .push(Assignment {
                node: name.id,
                statement,
                kind,
            });
    }

    /// Best-effort target for a binding under a `nonlocal` declaration.
    fn nonlocal_target(&self, from: ScopeId, name: &str) -> ScopeId {
        let mut fallback = None;
        let mut current = self.scopes[from.0 as usize].parent;
        while let Some(id) = current {
            let scope = &self.scopes[id.0 as usize];
            match scope.kind {
                ScopeKind::Function | ScopeKind::Lambda => {
                    if scope.assignments.contains_key(name) {
                        return id;
                    }
                    if fallback.is_none() {
                        fallback = Some(id);
                    }
                }
                ScopeKind::Module | ScopeKind::Builtin => break,
                _ => {}
            }
            current = scope.parent;
        }
        fallback.unwrap_or(from)
    }

    /// Record a use occurrence in the current scope.
    fn access(&mut self, name: &Name) {
        let current = self.current();
        self.scope_of.insert(name.id, current);
        if self.annotation_depth > 0 {
            self.annotations.insert(name.id);
        }
        match name.value.as_str() {
            "globals" => self.flags.uses_globals_builtin = true,
            "locals" => self.flags.uses_locals_builtin = true,
            _ => {}
        }
        self.scope_mut(current)
            .accesses
            .entry(name.value.clone())
            .or_default()
            .push(Access { node: name.id });
    }

    /// Classify a target expression: names bind, everything else is
    /// loads (attribute/subscript targets cannot be tracked and stay
    /// conservative).
    fn bind_target(&mut self, target: &Expression, statement: Option<NodeId>) {
        match target {
            Expression::Name(name) => self.bind(name, BindingKind::Variable, statement),
            Expression::Tuple(t) => {
                for element in &t.elements {
                    self.bind_target(element, statement);
                }
            }
            Expression::List(l) => {
                for element in &l.elements {
                    self.bind_target(element, statement);
                }
            }
            Expression::Starred(s) => self.bind_target(&s.value, statement),
            other => {
                walk_expression(self, other);
            }
        }
    }

    fn walk_annotation(&mut self, annotation: &Expression) {
        self.annotation_depth += 1;
        walk_expression(self, annotation);
        self.annotation_depth -= 1;
    }

    /// Shared body for the four comprehension forms: the first iterable
    /// evaluates in the enclosing scope, everything else inside the
    /// comprehension scope.
    fn handle_comprehension(&mut self, creator: NodeId, generators: &[CompFor], elts: &[&Expression]) {
        if let Some(first) = generators.first() {
            walk_expression(self, &first.iter);
        }
        self.push_scope(ScopeKind::Comprehension, None, creator);
        for (index, clause) in generators.iter().enumerate() {
            if index > 0 {
                walk_expression(self, &clause.iter);
            }
            self.bind_target(&clause.target, None);
            for condition in &clause.ifs {
                walk_expression(self, condition);
            }
        }
        for elt in elts {
            walk_expression(self, elt);
        }
        self.pop_scope();
    }
}

impl Visitor for ScopeBuilder {
    fn visit_module(&mut self, node: &Module) -> VisitResult {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes
            .push(Scope::new(id, ScopeKind::Module, Some(ScopeId(0)), None));
        self.stack.push(id);
        self.created_by.insert(node.id, id);
        VisitResult::Continue
    }

    fn leave_module(&mut self, _node: &Module) {
        self.pop_scope();
    }

    fn visit_function_def(&mut self, node: &FunctionDef) -> VisitResult {
        self.statement_scopes.insert(node.id, self.current());
        self.bind(&node.name, BindingKind::Function, Some(node.id));
        for decorator in &node.decorators {
            walk_expression(self, &decorator.expression);
        }
        // annotations and defaults evaluate in the enclosing scope
        for param in node.params.iter() {
            if let Some(annotation) = &param.annotation {
                self.walk_annotation(annotation);
            }
            if let Some(default) = &param.default {
                walk_expression(self, default);
            }
        }
        if let Some(returns) = &node.returns {
            self.walk_annotation(returns);
        }
        self.push_scope(ScopeKind::Function, Some(&node.name.value), node.id);
        for param in node.params.iter() {
            self.bind(&param.name, BindingKind::Parameter, Some(node.id));
        }
        walk_statements(self, &node.body);
        self.pop_scope();
        VisitResult::SkipChildren
    }

    fn visit_class_def(&mut self, node: &ClassDef) -> VisitResult {
        self.statement_scopes.insert(node.id, self.current());
        self.bind(&node.name, BindingKind::Class, Some(node.id));
        for decorator in &node.decorators {
            walk_expression(self, &decorator.expression);
        }
        for base in &node.bases {
            walk_arg(self, base);
        }
        self.push_scope(ScopeKind::Class, Some(&node.name.value), node.id);
        walk_statements(self, &node.body);
        self.pop_scope();
        VisitResult::SkipChildren
    }

    fn visit_lambda(&mut self, node: &Lambda) -> VisitResult {
        for param in node.params.iter() {
            if let Some(default) = &param.default {
                walk_expression(self, default);
            }
        }
        self.push_scope(ScopeKind::Lambda, None, node.id);
        for param in node.params.iter() {
            self.bind(&param.name, BindingKind::Parameter, None);
        }
        walk_expression(self, &node.body);
        self.pop_scope();
        VisitResult::SkipChildren
    }

    fn visit_list_comp(&mut self, node: &ListComp) -> VisitResult {
        self.handle_comprehension(node.id, &node.generators, &[&node.elt]);
        VisitResult::SkipChildren
    }

    fn visit_set_comp(&mut self, node: &SetComp) -> VisitResult {
        self.handle_comprehension(node.id, &node.generators, &[&node.elt]);
        VisitResult::SkipChildren
    }

    fn visit_dict_comp(&mut self, node: &DictComp) -> VisitResult {
        self.handle_comprehension(node.id, &node.generators, &[&node.key, &node.value]);
        VisitResult::SkipChildren
    }

    fn visit_generator_exp(&mut self, node: &GeneratorExp) -> VisitResult {
        self.handle_comprehension(node.id, &node.generators, &[&node.elt]);
        VisitResult::SkipChildren
    }

    fn visit_assign(&mut self, node: &Assign) -> VisitResult {
        self.statement_scopes.insert(node.id, self.current());
        walk_expression(self, &node.value);
        for target in &node.targets {
            self.bind_target(&target.target, Some(node.id));
        }
        VisitResult::SkipChildren
    }

    fn visit_ann_assign(&mut self, node: &AnnAssign) -> VisitResult {
        self.statement_scopes.insert(node.id, self.current());
        self.walk_annotation(&node.annotation);
        if let Some(value) = &node.value {
            walk_expression(self, value);
        }
        self.bind_target(&node.target, Some(node.id));
        VisitResult::SkipChildren
    }

    fn visit_aug_assign(&mut self, node: &AugAssign) -> VisitResult {
        self.statement_scopes.insert(node.id, self.current());
        walk_expression(self, &node.value);
        // the target is read and rebound
        if let Expression::Name(name) = &node.target {
            self.access(name);
            self.bind(name, BindingKind::Variable, Some(node.id));
        } else {
            walk_expression(self, &node.target);
        }
        VisitResult::SkipChildren
    }

    fn visit_named_expr(&mut self, node: &NamedExpr) -> VisitResult {
        walk_expression(self, &node.value);
        if let Expression::Name(name) = &*node.target {
            self.bind_walrus(name);
        }
        VisitResult::SkipChildren
    }

    fn visit_for(&mut self, node: &For) -> VisitResult {
        walk_expression(self, &node.iter);
        self.bind_target(&node.target, Some(node.id));
        walk_statements(self, &node.body);
        if let Some(orelse) = &node.orelse {
            walk_statements(self, orelse);
        }
        VisitResult::SkipChildren
    }

    fn visit_with(&mut self, node: &With) -> VisitResult {
        for item in &node.items {
            walk_expression(self, &item.item);
            if let Some(asname) = &item.asname {
                self.bind_target(asname, Some(node.id));
            }
        }
        walk_statements(self, &node.body);
        VisitResult::SkipChildren
    }

    fn visit_except_handler(&mut self, node: &ExceptHandler) -> VisitResult {
        if let Some(etype) = &node.etype {
            walk_expression(self, etype);
        }
        if let Some(name) = &node.name {
            self.bind(name, BindingKind::Variable, Some(node.id));
        }
        walk_statements(self, &node.body);
        VisitResult::SkipChildren
    }

    fn visit_global(&mut self, node: &Global) -> VisitResult {
        self.flags.uses_global_statement = true;
        let current = self.current();
        for name in &node.names {
            self.global_declared.insert(name.value.clone());
            self.scope_mut(current).globals.insert(name.value.clone());
        }
        // the declared names are rewritten together with their binding
        for name in &node.names {
            self.access(name);
        }
        VisitResult::SkipChildren
    }

    fn visit_nonlocal(&mut self, node: &Nonlocal) -> VisitResult {
        self.flags.uses_nonlocal_statement = true;
        let current = self.current();
        for name in &node.names {
            self.scope_mut(current).nonlocals.insert(name.value.clone());
        }
        for name in &node.names {
            self.access(name);
        }
        VisitResult::SkipChildren
    }

    fn visit_import(&mut self, node: &Import) -> VisitResult {
        self.statement_scopes.insert(node.id, self.current());
        for alias in &node.names {
            match &alias.asname {
                Some(asname) => self.bind(asname, BindingKind::ImportAlias, Some(node.id)),
                None => {
                    // `import a.b` binds `a`
                    if let Some(first) = alias.name.parts.first() {
                        self.bind(first, BindingKind::Import, Some(node.id));
                    }
                }
            }
        }
        VisitResult::SkipChildren
    }

    fn visit_import_from(&mut self, node: &ImportFrom) -> VisitResult {
        self.statement_scopes.insert(node.id, self.current());
        match &node.names {
            ImportNames::Star => self.flags.has_star_import = true,
            ImportNames::Aliases(aliases) => {
                for alias in aliases {
                    match &alias.asname {
                        Some(asname) => {
                            self.bind(asname, BindingKind::ImportAlias, Some(node.id))
                        }
                        None => self.bind(&alias.name, BindingKind::Import, Some(node.id)),
                    }
                }
            }
        }
        VisitResult::SkipChildren
    }

    fn visit_attribute(&mut self, node: &Attribute) -> VisitResult {
        self.attributes.insert(node.attr.id);
        walk_expression(self, &node.value);
        VisitResult::SkipChildren
    }

    fn visit_arg(&mut self, node: &Arg) -> VisitResult {
        if let Some(keyword) = &node.keyword {
            self.keyword_args.insert(keyword.id);
        }
        VisitResult::Continue
    }

    fn visit_name(&mut self, node: &Name) -> VisitResult {
        self.access(node);
        VisitResult::Continue
    }

    fn visit_simple_string(&mut self, node: &SimpleString) -> VisitResult {
        self.scope_of.insert(node.id, self.current());
        VisitResult::Continue
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use molt_python_cst::parse_module;

    fn analyze(source: &str) -> ScopeAnalysis {
        let module = parse_module(source).unwrap();
        ScopeAnalysis::analyze(&module)
    }

    fn scope_by_name<'a>(analysis: &'a ScopeAnalysis, name: &str) -> &'a Scope {
        analysis
            .scope_ids()
            .map(|id| analysis.scope(id))
            .find(|s| s.name.as_deref() == Some(name))
            .unwrap_or_else(|| panic!("no scope named {name}"))
    }

    mod construction {
        use super::*;

        #[test]
        fn module_scope_sits_under_builtin() {
            let analysis = analyze("x = 1\n");
            let module = analysis.scope(analysis.module_scope());
            assert_eq!(module.kind, ScopeKind::Module);
            assert_eq!(module.parent, Some(analysis.builtin_scope()));
        }

        #[test]
        fn nested_functions_form_a_chain() {
            let analysis = analyze("def outer():\n    def inner():\n        pass\n");
            let outer = scope_by_name(&analysis, "outer");
            let inner = scope_by_name(&analysis, "inner");
            assert_eq!(inner.parent, Some(outer.id));
            assert_eq!(outer.parent, Some(analysis.module_scope()));
        }

        #[test]
        fn comprehensions_get_their_own_scope() {
            let analysis = analyze("xs = [i for i in range(3)]\n");
            let comp = analysis
                .scope_ids()
                .map(|id| analysis.scope(id))
                .find(|s| s.kind == ScopeKind::Comprehension)
                .expect("comprehension scope");
            assert!(comp.assignments.contains_key("i"));
            // `range` is accessed in the enclosing scope (first iterable)
            let module = analysis.scope(analysis.module_scope());
            assert!(module.accesses.contains_key("range"));
        }

        #[test]
        fn lambda_parameters_bind_in_lambda_scope() {
            let analysis = analyze("f = lambda x: x + 1\n");
            let lambda = analysis
                .scope_ids()
                .map(|id| analysis.scope(id))
                .find(|s| s.kind == ScopeKind::Lambda)
                .expect("lambda scope");
            assert!(lambda.assignments.contains_key("x"));
            assert!(lambda.accesses.contains_key("x"));
        }
    }

    mod binding_classification {
        use super::*;

        #[test]
        fn def_name_binds_in_enclosing_scope() {
            let analysis = analyze("def f():\n    pass\n");
            let module = analysis.scope(analysis.module_scope());
            assert_eq!(module.assignments["f"].len(), 1);
            assert_eq!(module.assignments["f"][0].kind, BindingKind::Function);
        }

        #[test]
        fn parameters_are_marked() {
            let analysis = analyze("def f(a, *rest, **kw):\n    return a\n");
            let f = scope_by_name(&analysis, "f");
            for name in ["a", "rest", "kw"] {
                let assignment = &f.assignments[name][0];
                assert_eq!(assignment.kind, BindingKind::Parameter);
                assert!(analysis.is_parameter(assignment.node));
                assert!(!analysis.is_in_local_scope(assignment.node));
            }
        }

        #[test]
        fn local_variables_are_in_local_scope() {
            let analysis = analyze("def f():\n    local = 1\n    return local\n");
            let f = scope_by_name(&analysis, "f");
            let assignment = &f.assignments["local"][0];
            assert!(analysis.is_in_local_scope(assignment.node));
        }

        #[test]
        fn module_variables_are_not_local() {
            let analysis = analyze("x = 1\n");
            let module = analysis.scope(analysis.module_scope());
            assert!(!analysis.is_in_local_scope(module.assignments["x"][0].node));
        }

        #[test]
        fn unpacking_targets_bind_each_name() {
            let analysis = analyze("a, (b, *c) = value\n");
            let module = analysis.scope(analysis.module_scope());
            for name in ["a", "b", "c"] {
                assert!(module.assignments.contains_key(name), "missing {name}");
            }
        }

        #[test]
        fn for_with_except_targets_bind() {
            let analysis = analyze(
                "for i in xs:\n    pass\nwith open(p) as h:\n    pass\ntry:\n    pass\nexcept E as e:\n    pass\n",
            );
            let module = analysis.scope(analysis.module_scope());
            for name in ["i", "h", "e"] {
                assert!(module.assignments.contains_key(name), "missing {name}");
            }
        }

        #[test]
        fn import_bindings_distinguish_aliases() {
            let analysis = analyze("import os.path\nimport json as j\nfrom x import a, b as c\n");
            let module = analysis.scope(analysis.module_scope());
            assert_eq!(module.assignments["os"][0].kind, BindingKind::Import);
            assert_eq!(module.assignments["j"][0].kind, BindingKind::ImportAlias);
            assert_eq!(module.assignments["a"][0].kind, BindingKind::Import);
            assert_eq!(module.assignments["c"][0].kind, BindingKind::ImportAlias);
        }

        #[test]
        fn walrus_binds_outside_comprehension() {
            let analysis = analyze("xs = [y for y in data if (m := f(y))]\n");
            let module = analysis.scope(analysis.module_scope());
            assert!(module.assignments.contains_key("m"));
        }

        #[test]
        fn aug_assign_is_both_access_and_binding() {
            let analysis = analyze("x = 0\nx += 1\n");
            let module = analysis.scope(analysis.module_scope());
            assert_eq!(module.assignments["x"].len(), 2);
            assert!(module.accesses.contains_key("x"));
        }
    }

    mod predicates {
        use super::*;

        #[test]
        fn attribute_names_are_attributes() {
            let analysis = analyze("value = obj.field\n");
            let module = analysis.scope(analysis.module_scope());
            // `obj` is a normal access, `field` is not recorded as one
            assert!(module.accesses.contains_key("obj"));
            assert!(!module.accesses.contains_key("field"));
        }

        #[test]
        fn class_body_bindings_are_attributes() {
            let analysis = analyze("class C:\n    attr = 1\n");
            let class_scope = scope_by_name(&analysis, "C");
            let assignment = &class_scope.assignments["attr"][0];
            assert!(analysis.is_attribute(assignment.node));
        }

        #[test]
        fn annotation_names_are_marked() {
            let analysis = analyze("def f(a: MyType) -> Other:\n    return a\n");
            let module = analysis.scope(analysis.module_scope());
            for name in ["MyType", "Other"] {
                let access = &module.accesses[name][0];
                assert!(analysis.is_type_annotation(access.node));
            }
        }

        #[test]
        fn keyword_argument_names_are_not_accesses() {
            let analysis = analyze("f(key=value)\n");
            let module = analysis.scope(analysis.module_scope());
            assert!(!module.accesses.contains_key("key"));
            assert!(module.accesses.contains_key("value"));
        }

        #[test]
        fn globals_builtin_sets_flag() {
            assert!(analyze("print(globals())\n").flags().uses_globals_builtin);
            assert!(analyze("print(locals())\n").flags().uses_locals_builtin);
            assert!(!analyze("print(x)\n").flags().uses_globals_builtin);
        }

        #[test]
        fn star_import_sets_flag() {
            assert!(analyze("from os import *\n").flags().has_star_import);
            assert!(!analyze("from os import path\n").flags().has_star_import);
        }
    }

    mod resolution {
        use super::*;

        #[test]
        fn access_resolves_to_nearest_binding() {
            let analysis = analyze(
                "x = 1\ndef outer():\n    x = 2\n    def inner():\n        return x\n",
            );
            let inner = scope_by_name(&analysis, "inner");
            let outer = scope_by_name(&analysis, "outer");
            assert_eq!(analysis.resolve_access(inner.id, "x"), Some(outer.id));
        }

        #[test]
        fn class_scope_is_invisible_to_methods() {
            let analysis = analyze(
                "x = 1\nclass C:\n    x = 2\n    def m(self):\n        return x\n",
            );
            let method = scope_by_name(&analysis, "m");
            assert_eq!(
                analysis.resolve_access(method.id, "x"),
                Some(analysis.module_scope())
            );
        }

        #[test]
        fn class_body_sees_its_own_bindings() {
            let analysis = analyze("class C:\n    x = 1\n    y = x\n");
            let class_scope = scope_by_name(&analysis, "C");
            assert_eq!(
                analysis.resolve_access(class_scope.id, "x"),
                Some(class_scope.id)
            );
        }

        #[test]
        fn global_declaration_redirects_bindings() {
            let analysis = analyze("x = 1\ndef f():\n    global x\n    x = 2\n");
            let f = scope_by_name(&analysis, "f");
            assert!(!f.assignments.contains_key("x"));
            let module = analysis.scope(analysis.module_scope());
            assert_eq!(module.assignments["x"].len(), 2);
            assert!(analysis.is_global_declared("x"));
            assert_eq!(analysis.resolve_access(f.id, "x"), Some(analysis.module_scope()));
        }

        #[test]
        fn nonlocal_declaration_redirects_bindings() {
            let analysis = analyze(
                "def outer():\n    x = 1\n    def inner():\n        nonlocal x\n        x = 2\n    return inner\n",
            );
            let outer = scope_by_name(&analysis, "outer");
            let inner = scope_by_name(&analysis, "inner");
            assert!(!inner.assignments.contains_key("x"));
            assert_eq!(outer.assignments["x"].len(), 2);
            assert_eq!(analysis.resolve_access(inner.id, "x"), Some(outer.id));
        }

        #[test]
        fn unresolved_names_fall_through_to_builtin() {
            let analysis = analyze("print(len(xs))\n");
            assert_eq!(analysis.resolve_access(analysis.module_scope(), "len"), None);
        }

        #[test]
        fn comprehension_accesses_reach_enclosing_function() {
            let analysis = analyze(
                "def f():\n    factor = 2\n    return [x * factor for x in data]\n",
            );
            let f = scope_by_name(&analysis, "f");
            let comp = analysis
                .scope_ids()
                .map(|id| analysis.scope(id))
                .find(|s| s.kind == ScopeKind::Comprehension)
                .unwrap();
            assert_eq!(analysis.resolve_access(comp.id, "factor"), Some(f.id));
        }
    }

    mod visibility {
        use super::*;

        #[test]
        fn name_in_scope_tree_sees_ancestors_and_descendants() {
            let analysis = analyze(
                "top = 1\ndef f():\n    mid = 2\n    def g():\n        low = 3\n",
            );
            let f = scope_by_name(&analysis, "f");
            assert!(analysis.name_in_scope_tree(f.id, "top"));
            assert!(analysis.name_in_scope_tree(f.id, "mid"));
            assert!(analysis.name_in_scope_tree(f.id, "low"));
            assert!(!analysis.name_in_scope_tree(f.id, "absent"));
        }

        #[test]
        fn sibling_scopes_do_not_leak() {
            let analysis = analyze("def a():\n    only_a = 1\ndef b():\n    only_b = 2\n");
            let a = scope_by_name(&analysis, "a");
            assert!(!analysis.name_in_scope_tree(a.id, "only_b"));
        }

        #[test]
        fn accesses_resolving_to_collects_all_use_sites() {
            let analysis = analyze(
                "x = 1\ndef f():\n    return x\ndef g():\n    return x + x\n",
            );
            let sites = analysis.accesses_resolving_to(analysis.module_scope(), "x");
            assert_eq!(sites.len(), 3);
        }
    }
}
