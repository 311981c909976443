//! Read-only visitor traversal.
//!
//! [`Visitor`] exposes `visit_*`/`leave_*` hooks for the node kinds the
//! analysis layer cares about; the `walk_*` functions drive a depth-first
//! traversal and honor [`VisitResult`]. A visitor that needs a custom
//! child order (scope construction, for instance, where parameter defaults
//! evaluate in the enclosing scope) returns [`VisitResult::SkipChildren`]
//! and drives the public `walk_*` functions itself.
//!
//! Two deliberate asymmetries keep identifier classification honest:
//! - `Attribute.attr` names and `Arg.keyword` names are *not* reported via
//!   [`Visitor::visit_name`]; they are only reachable through
//!   [`Visitor::visit_attribute`] / [`Visitor::visit_arg`].
//! - `global`/`nonlocal` name lists are reported only via their statement
//!   hooks.

use crate::nodes::*;

/// Result of visiting a node; controls traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VisitResult {
    /// Continue into children; `leave_*` fires afterwards where defined.
    #[default]
    Continue,
    /// Skip children; `leave_*` still fires where defined.
    SkipChildren,
    /// Abort the whole traversal.
    Stop,
}

macro_rules! visit_hooks {
    ($($visit:ident($ty:ty);)*) => {
        $(fn $visit(&mut self, _node: &$ty) -> VisitResult {
            VisitResult::Continue
        })*
    };
}

/// Read-only visitor over a module tree. All hooks default to
/// [`VisitResult::Continue`] / no-op.
pub trait Visitor {
    fn visit_module(&mut self, _node: &Module) -> VisitResult {
        VisitResult::Continue
    }
    fn leave_module(&mut self, _node: &Module) {}

    fn visit_function_def(&mut self, _node: &FunctionDef) -> VisitResult {
        VisitResult::Continue
    }
    fn leave_function_def(&mut self, _node: &FunctionDef) {}

    fn visit_class_def(&mut self, _node: &ClassDef) -> VisitResult {
        VisitResult::Continue
    }
    fn leave_class_def(&mut self, _node: &ClassDef) {}

    fn visit_lambda(&mut self, _node: &Lambda) -> VisitResult {
        VisitResult::Continue
    }
    fn leave_lambda(&mut self, _node: &Lambda) {}

    fn visit_list_comp(&mut self, _node: &ListComp) -> VisitResult {
        VisitResult::Continue
    }
    fn leave_list_comp(&mut self, _node: &ListComp) {}

    fn visit_set_comp(&mut self, _node: &SetComp) -> VisitResult {
        VisitResult::Continue
    }
    fn leave_set_comp(&mut self, _node: &SetComp) {}

    fn visit_dict_comp(&mut self, _node: &DictComp) -> VisitResult {
        VisitResult::Continue
    }
    fn leave_dict_comp(&mut self, _node: &DictComp) {}

    fn visit_generator_exp(&mut self, _node: &GeneratorExp) -> VisitResult {
        VisitResult::Continue
    }
    fn leave_generator_exp(&mut self, _node: &GeneratorExp) {}

    visit_hooks! {
        visit_statement(Statement);
        visit_simple_line(SimpleStatementLine);
        visit_assign(Assign);
        visit_ann_assign(AnnAssign);
        visit_aug_assign(AugAssign);
        visit_named_expr(NamedExpr);
        visit_for(For);
        visit_while(While);
        visit_if(If);
        visit_with(With);
        visit_try(Try);
        visit_except_handler(ExceptHandler);
        visit_global(Global);
        visit_nonlocal(Nonlocal);
        visit_del(Del);
        visit_import(Import);
        visit_import_from(ImportFrom);
        visit_name(Name);
        visit_attribute(Attribute);
        visit_call(Call);
        visit_arg(Arg);
        visit_param(Param);
        visit_simple_string(SimpleString);
        visit_concatenated_string(ConcatenatedString);
        visit_formatted_string(FormattedString);
        visit_comp_for(CompFor);
    }
}

/// Walk a module; returns false if the traversal was stopped.
pub fn walk_module<V: Visitor + ?Sized>(visitor: &mut V, module: &Module) -> bool {
    match visitor.visit_module(module) {
        VisitResult::Stop => return false,
        VisitResult::SkipChildren => {
            visitor.leave_module(module);
            return true;
        }
        VisitResult::Continue => {}
    }
    let ok = walk_statements(visitor, &module.body);
    visitor.leave_module(module);
    ok
}

/// Walk a statement list in order.
pub fn walk_statements<V: Visitor + ?Sized>(visitor: &mut V, body: &[Statement]) -> bool {
    for statement in body {
        if !walk_statement(visitor, statement) {
            return false;
        }
    }
    true
}

pub fn walk_statement<V: Visitor + ?Sized>(visitor: &mut V, statement: &Statement) -> bool {
    match visitor.visit_statement(statement) {
        VisitResult::Stop => return false,
        VisitResult::SkipChildren => return true,
        VisitResult::Continue => {}
    }
    match statement {
        Statement::Simple(line) => {
            match visitor.visit_simple_line(line) {
                VisitResult::Stop => return false,
                VisitResult::SkipChildren => return true,
                VisitResult::Continue => {}
            }
            for small in &line.body {
                if !walk_small_statement(visitor, small) {
                    return false;
                }
            }
            true
        }
        Statement::Compound(compound) => walk_compound_statement(visitor, compound),
    }
}

pub fn walk_small_statement<V: Visitor + ?Sized>(
    visitor: &mut V,
    statement: &SmallStatement,
) -> bool {
    match statement {
        SmallStatement::Assign(node) => {
            match visitor.visit_assign(node) {
                VisitResult::Stop => return false,
                VisitResult::SkipChildren => return true,
                VisitResult::Continue => {}
            }
            for target in &node.targets {
                if !walk_expression(visitor, &target.target) {
                    return false;
                }
            }
            walk_expression(visitor, &node.value)
        }
        SmallStatement::AnnAssign(node) => {
            match visitor.visit_ann_assign(node) {
                VisitResult::Stop => return false,
                VisitResult::SkipChildren => return true,
                VisitResult::Continue => {}
            }
            if !walk_expression(visitor, &node.target) {
                return false;
            }
            if !walk_expression(visitor, &node.annotation) {
                return false;
            }
            match &node.value {
                Some(value) => walk_expression(visitor, value),
                None => true,
            }
        }
        SmallStatement::AugAssign(node) => {
            match visitor.visit_aug_assign(node) {
                VisitResult::Stop => return false,
                VisitResult::SkipChildren => return true,
                VisitResult::Continue => {}
            }
            if !walk_expression(visitor, &node.target) {
                return false;
            }
            walk_expression(visitor, &node.value)
        }
        SmallStatement::Expr(node) => walk_expression(visitor, &node.value),
        SmallStatement::Return(node) => match &node.value {
            Some(value) => walk_expression(visitor, value),
            None => true,
        },
        SmallStatement::Pass(_) | SmallStatement::Break(_) | SmallStatement::Continue(_) => true,
        SmallStatement::Import(node) => {
            !matches!(visitor.visit_import(node), VisitResult::Stop)
        }
        SmallStatement::ImportFrom(node) => {
            !matches!(visitor.visit_import_from(node), VisitResult::Stop)
        }
        SmallStatement::Global(node) => !matches!(visitor.visit_global(node), VisitResult::Stop),
        SmallStatement::Nonlocal(node) => {
            !matches!(visitor.visit_nonlocal(node), VisitResult::Stop)
        }
        SmallStatement::Del(node) => {
            match visitor.visit_del(node) {
                VisitResult::Stop => return false,
                VisitResult::SkipChildren => return true,
                VisitResult::Continue => {}
            }
            for target in &node.targets {
                if !walk_expression(visitor, target) {
                    return false;
                }
            }
            true
        }
        SmallStatement::Assert(node) => {
            if !walk_expression(visitor, &node.test) {
                return false;
            }
            match &node.msg {
                Some(msg) => walk_expression(visitor, msg),
                None => true,
            }
        }
        SmallStatement::Raise(node) => {
            if let Some(exc) = &node.exc {
                if !walk_expression(visitor, exc) {
                    return false;
                }
            }
            match &node.cause {
                Some(cause) => walk_expression(visitor, cause),
                None => true,
            }
        }
    }
}

fn walk_compound_statement<V: Visitor + ?Sized>(
    visitor: &mut V,
    statement: &CompoundStatement,
) -> bool {
    match statement {
        CompoundStatement::FunctionDef(node) => walk_function_def(visitor, node),
        CompoundStatement::ClassDef(node) => walk_class_def(visitor, node),
        CompoundStatement::If(node) => walk_if(visitor, node),
        CompoundStatement::For(node) => {
            match visitor.visit_for(node) {
                VisitResult::Stop => return false,
                VisitResult::SkipChildren => return true,
                VisitResult::Continue => {}
            }
            if !walk_expression(visitor, &node.target) {
                return false;
            }
            if !walk_expression(visitor, &node.iter) {
                return false;
            }
            if !walk_statements(visitor, &node.body) {
                return false;
            }
            match &node.orelse {
                Some(orelse) => walk_statements(visitor, orelse),
                None => true,
            }
        }
        CompoundStatement::While(node) => {
            match visitor.visit_while(node) {
                VisitResult::Stop => return false,
                VisitResult::SkipChildren => return true,
                VisitResult::Continue => {}
            }
            if !walk_expression(visitor, &node.test) {
                return false;
            }
            if !walk_statements(visitor, &node.body) {
                return false;
            }
            match &node.orelse {
                Some(orelse) => walk_statements(visitor, orelse),
                None => true,
            }
        }
        CompoundStatement::With(node) => {
            match visitor.visit_with(node) {
                VisitResult::Stop => return false,
                VisitResult::SkipChildren => return true,
                VisitResult::Continue => {}
            }
            for item in &node.items {
                if !walk_expression(visitor, &item.item) {
                    return false;
                }
                if let Some(asname) = &item.asname {
                    if !walk_expression(visitor, asname) {
                        return false;
                    }
                }
            }
            walk_statements(visitor, &node.body)
        }
        CompoundStatement::Try(node) => {
            match visitor.visit_try(node) {
                VisitResult::Stop => return false,
                VisitResult::SkipChildren => return true,
                VisitResult::Continue => {}
            }
            if !walk_statements(visitor, &node.body) {
                return false;
            }
            for handler in &node.handlers {
                match visitor.visit_except_handler(handler) {
                    VisitResult::Stop => return false,
                    VisitResult::SkipChildren => continue,
                    VisitResult::Continue => {}
                }
                if let Some(etype) = &handler.etype {
                    if !walk_expression(visitor, etype) {
                        return false;
                    }
                }
                if !walk_statements(visitor, &handler.body) {
                    return false;
                }
            }
            if let Some(orelse) = &node.orelse {
                if !walk_statements(visitor, orelse) {
                    return false;
                }
            }
            match &node.finalbody {
                Some(finalbody) => walk_statements(visitor, finalbody),
                None => true,
            }
        }
    }
}

fn walk_if<V: Visitor + ?Sized>(visitor: &mut V, node: &If) -> bool {
    match visitor.visit_if(node) {
        VisitResult::Stop => return false,
        VisitResult::SkipChildren => return true,
        VisitResult::Continue => {}
    }
    if !walk_expression(visitor, &node.test) {
        return false;
    }
    if !walk_statements(visitor, &node.body) {
        return false;
    }
    match &node.orelse {
        Some(ElseBranch::Elif(elif)) => walk_if(visitor, elif),
        Some(ElseBranch::Else(body)) => walk_statements(visitor, body),
        None => true,
    }
}

pub fn walk_function_def<V: Visitor + ?Sized>(visitor: &mut V, node: &FunctionDef) -> bool {
    match visitor.visit_function_def(node) {
        VisitResult::Stop => return false,
        VisitResult::SkipChildren => {
            visitor.leave_function_def(node);
            return true;
        }
        VisitResult::Continue => {}
    }
    for decorator in &node.decorators {
        if !walk_expression(visitor, &decorator.expression) {
            return false;
        }
    }
    if !walk_parameters(visitor, &node.params) {
        return false;
    }
    if let Some(returns) = &node.returns {
        if !walk_expression(visitor, returns) {
            return false;
        }
    }
    let ok = walk_statements(visitor, &node.body);
    visitor.leave_function_def(node);
    ok
}

pub fn walk_class_def<V: Visitor + ?Sized>(visitor: &mut V, node: &ClassDef) -> bool {
    match visitor.visit_class_def(node) {
        VisitResult::Stop => return false,
        VisitResult::SkipChildren => {
            visitor.leave_class_def(node);
            return true;
        }
        VisitResult::Continue => {}
    }
    for decorator in &node.decorators {
        if !walk_expression(visitor, &decorator.expression) {
            return false;
        }
    }
    for base in &node.bases {
        if !walk_arg(visitor, base) {
            return false;
        }
    }
    let ok = walk_statements(visitor, &node.body);
    visitor.leave_class_def(node);
    ok
}

/// Walk a parameter list: each `visit_param`, then its annotation and
/// default.
pub fn walk_parameters<V: Visitor + ?Sized>(visitor: &mut V, params: &Parameters) -> bool {
    for param in params.iter() {
        match visitor.visit_param(param) {
            VisitResult::Stop => return false,
            VisitResult::SkipChildren => continue,
            VisitResult::Continue => {}
        }
        if let Some(annotation) = &param.annotation {
            if !walk_expression(visitor, annotation) {
                return false;
            }
        }
        if let Some(default) = &param.default {
            if !walk_expression(visitor, default) {
                return false;
            }
        }
    }
    true
}

pub fn walk_arg<V: Visitor + ?Sized>(visitor: &mut V, arg: &Arg) -> bool {
    match visitor.visit_arg(arg) {
        VisitResult::Stop => return false,
        VisitResult::SkipChildren => return true,
        VisitResult::Continue => {}
    }
    // the keyword name is not an expression and is never reported as a Name
    walk_expression(visitor, &arg.value)
}

/// Walk one comprehension clause: target, iter, conditions.
pub fn walk_comp_for<V: Visitor + ?Sized>(visitor: &mut V, clause: &CompFor) -> bool {
    match visitor.visit_comp_for(clause) {
        VisitResult::Stop => return false,
        VisitResult::SkipChildren => return true,
        VisitResult::Continue => {}
    }
    if !walk_expression(visitor, &clause.target) {
        return false;
    }
    if !walk_expression(visitor, &clause.iter) {
        return false;
    }
    for condition in &clause.ifs {
        if !walk_expression(visitor, condition) {
            return false;
        }
    }
    true
}

pub fn walk_expression<V: Visitor + ?Sized>(visitor: &mut V, expression: &Expression) -> bool {
    match expression {
        Expression::Name(node) => !matches!(visitor.visit_name(node), VisitResult::Stop),
        Expression::Attribute(node) => {
            match visitor.visit_attribute(node) {
                VisitResult::Stop => return false,
                VisitResult::SkipChildren => return true,
                VisitResult::Continue => {}
            }
            // `attr` is not reported as a Name
            walk_expression(visitor, &node.value)
        }
        Expression::Call(node) => {
            match visitor.visit_call(node) {
                VisitResult::Stop => return false,
                VisitResult::SkipChildren => return true,
                VisitResult::Continue => {}
            }
            if !walk_expression(visitor, &node.func) {
                return false;
            }
            for arg in &node.args {
                if !walk_arg(visitor, arg) {
                    return false;
                }
            }
            true
        }
        Expression::Subscript(node) => {
            if !walk_expression(visitor, &node.value) {
                return false;
            }
            walk_expression(visitor, &node.index)
        }
        Expression::Slice(node) => {
            for part in [&node.lower, &node.upper, &node.step].into_iter().flatten() {
                if !walk_expression(visitor, part) {
                    return false;
                }
            }
            true
        }
        Expression::SimpleString(node) => {
            !matches!(visitor.visit_simple_string(node), VisitResult::Stop)
        }
        Expression::ConcatenatedString(node) => {
            match visitor.visit_concatenated_string(node) {
                VisitResult::Stop => return false,
                VisitResult::SkipChildren => return true,
                VisitResult::Continue => {}
            }
            for part in &node.parts {
                if !walk_expression(visitor, part) {
                    return false;
                }
            }
            true
        }
        Expression::FormattedString(node) => {
            match visitor.visit_formatted_string(node) {
                VisitResult::Stop => return false,
                VisitResult::SkipChildren => return true,
                VisitResult::Continue => {}
            }
            walk_fstring_parts(visitor, &node.parts)
        }
        Expression::Integer(_) | Expression::Float(_) | Expression::Constant(_) => true,
        Expression::Tuple(node) => walk_expressions(visitor, &node.elements),
        Expression::List(node) => walk_expressions(visitor, &node.elements),
        Expression::Set(node) => walk_expressions(visitor, &node.elements),
        Expression::Dict(node) => {
            for element in &node.elements {
                let ok = match element {
                    DictElement::Pair(pair) => {
                        walk_expression(visitor, &pair.key)
                            && walk_expression(visitor, &pair.value)
                    }
                    DictElement::Unpack(unpack) => walk_expression(visitor, &unpack.value),
                };
                if !ok {
                    return false;
                }
            }
            true
        }
        Expression::BinaryOperation(node) => {
            walk_expression(visitor, &node.left) && walk_expression(visitor, &node.right)
        }
        Expression::UnaryOperation(node) => walk_expression(visitor, &node.operand),
        Expression::BooleanOperation(node) => {
            walk_expression(visitor, &node.left) && walk_expression(visitor, &node.right)
        }
        Expression::Comparison(node) => {
            if !walk_expression(visitor, &node.left) {
                return false;
            }
            for target in &node.comparisons {
                if !walk_expression(visitor, &target.comparator) {
                    return false;
                }
            }
            true
        }
        Expression::IfExp(node) => {
            walk_expression(visitor, &node.body)
                && walk_expression(visitor, &node.test)
                && walk_expression(visitor, &node.orelse)
        }
        Expression::Lambda(node) => {
            match visitor.visit_lambda(node) {
                VisitResult::Stop => return false,
                VisitResult::SkipChildren => {
                    visitor.leave_lambda(node);
                    return true;
                }
                VisitResult::Continue => {}
            }
            if !walk_parameters(visitor, &node.params) {
                return false;
            }
            let ok = walk_expression(visitor, &node.body);
            visitor.leave_lambda(node);
            ok
        }
        Expression::NamedExpr(node) => {
            match visitor.visit_named_expr(node) {
                VisitResult::Stop => return false,
                VisitResult::SkipChildren => return true,
                VisitResult::Continue => {}
            }
            if !walk_expression(visitor, &node.target) {
                return false;
            }
            walk_expression(visitor, &node.value)
        }
        Expression::Starred(node) => walk_expression(visitor, &node.value),
        Expression::Yield(node) => match &node.value {
            Some(value) => walk_expression(visitor, value),
            None => true,
        },
        Expression::Await(node) => walk_expression(visitor, &node.value),
        Expression::ListComp(node) => {
            match visitor.visit_list_comp(node) {
                VisitResult::Stop => return false,
                VisitResult::SkipChildren => {
                    visitor.leave_list_comp(node);
                    return true;
                }
                VisitResult::Continue => {}
            }
            let ok = walk_comp_clauses(visitor, &node.generators)
                && walk_expression(visitor, &node.elt);
            visitor.leave_list_comp(node);
            ok
        }
        Expression::SetComp(node) => {
            match visitor.visit_set_comp(node) {
                VisitResult::Stop => return false,
                VisitResult::SkipChildren => {
                    visitor.leave_set_comp(node);
                    return true;
                }
                VisitResult::Continue => {}
            }
            let ok = walk_comp_clauses(visitor, &node.generators)
                && walk_expression(visitor, &node.elt);
            visitor.leave_set_comp(node);
            ok
        }
        Expression::DictComp(node) => {
            match visitor.visit_dict_comp(node) {
                VisitResult::Stop => return false,
                VisitResult::SkipChildren => {
                    visitor.leave_dict_comp(node);
                    return true;
                }
                VisitResult::Continue => {}
            }
            let ok = walk_comp_clauses(visitor, &node.generators)
                && walk_expression(visitor, &node.key)
                && walk_expression(visitor, &node.value);
            visitor.leave_dict_comp(node);
            ok
        }
        Expression::GeneratorExp(node) => {
            match visitor.visit_generator_exp(node) {
                VisitResult::Stop => return false,
                VisitResult::SkipChildren => {
                    visitor.leave_generator_exp(node);
                    return true;
                }
                VisitResult::Continue => {}
            }
            let ok = walk_comp_clauses(visitor, &node.generators)
                && walk_expression(visitor, &node.elt);
            visitor.leave_generator_exp(node);
            ok
        }
    }
}

fn walk_expressions<V: Visitor + ?Sized>(visitor: &mut V, expressions: &[Expression]) -> bool {
    for expression in expressions {
        if !walk_expression(visitor, expression) {
            return false;
        }
    }
    true
}

fn walk_comp_clauses<V: Visitor + ?Sized>(visitor: &mut V, generators: &[CompFor]) -> bool {
    for clause in generators {
        if !walk_comp_for(visitor, clause) {
            return false;
        }
    }
    true
}

/// Walk f-string parts; expression holes descend into their expressions
/// and format specs.
pub fn walk_fstring_parts<V: Visitor + ?Sized>(visitor: &mut V, parts: &[FStringPart]) -> bool {
    for part in parts {
        if let FStringPart::Expression(hole) = part {
            if !walk_expression(visitor, &hole.expression) {
                return false;
            }
            if let Some(spec) = &hole.format_spec {
                if !walk_fstring_parts(visitor, spec) {
                    return false;
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;

    #[derive(Default)]
    struct NameCollector {
        names: Vec<String>,
        strings: Vec<String>,
    }

    impl Visitor for NameCollector {
        fn visit_name(&mut self, node: &Name) -> VisitResult {
            self.names.push(node.value.clone());
            VisitResult::Continue
        }

        fn visit_simple_string(&mut self, node: &SimpleString) -> VisitResult {
            self.strings.push(node.value.clone());
            VisitResult::Continue
        }
    }

    fn collect(source: &str) -> NameCollector {
        let module = parse_module(source).unwrap();
        let mut collector = NameCollector::default();
        walk_module(&mut collector, &module);
        collector
    }

    #[test]
    fn reports_names_but_not_attribute_attrs() {
        let collector = collect("x = obj.field\n");
        assert_eq!(collector.names, vec!["x", "obj"]);
    }

    #[test]
    fn reports_names_but_not_keyword_argument_names() {
        let collector = collect("f(a, key=b)\n");
        assert_eq!(collector.names, vec!["f", "a", "b"]);
    }

    #[test]
    fn reports_names_inside_fstring_holes() {
        let collector = collect("s = f'{value:{width}}'\n");
        assert!(collector.names.contains(&"value".to_string()));
        assert!(collector.names.contains(&"width".to_string()));
    }

    #[test]
    fn reports_strings_everywhere() {
        let collector = collect("a = 'x'\ndef f(p='y'):\n    return ['z']\n");
        assert_eq!(collector.strings, vec!["'x'", "'y'", "'z'"]);
    }

    #[test]
    fn skip_children_prunes_subtree() {
        struct SkipFunctions {
            names: Vec<String>,
        }
        impl Visitor for SkipFunctions {
            fn visit_function_def(&mut self, _node: &FunctionDef) -> VisitResult {
                VisitResult::SkipChildren
            }
            fn visit_name(&mut self, node: &Name) -> VisitResult {
                self.names.push(node.value.clone());
                VisitResult::Continue
            }
        }
        let module = parse_module("a = 1\ndef f():\n    b = 2\nc = 3\n").unwrap();
        let mut visitor = SkipFunctions { names: Vec::new() };
        walk_module(&mut visitor, &module);
        assert_eq!(visitor.names, vec!["a", "c"]);
    }

    #[test]
    fn stop_aborts_traversal() {
        struct StopAtFirst {
            count: usize,
        }
        impl Visitor for StopAtFirst {
            fn visit_name(&mut self, _node: &Name) -> VisitResult {
                self.count += 1;
                VisitResult::Stop
            }
        }
        let module = parse_module("a = b = c\n").unwrap();
        let mut visitor = StopAtFirst { count: 0 };
        assert!(!walk_module(&mut visitor, &module));
        assert_eq!(visitor.count, 1);
    }
}
