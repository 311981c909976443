//! Pure tree rebuilding.
//!
//! Transforms run in two phases: a read-only [`Visitor`](crate::visitor::Visitor)
//! pass computes a decision map keyed by [`NodeId`](crate::nodes::NodeId),
//! then a [`Rewrite`] pass rebuilds the tree bottom-up, consulting only
//! that map. The rebuild consumes the old tree and produces a new one —
//! nothing is mutated in place, and there is no order-dependent visitor
//! state.
//!
//! Kept nodes keep their ids; a rewriter that synthesizes nodes draws
//! fresh ids from [`Rewrite::ids`]. Statement positions use
//! [`Transform`] so a rewriter can drop or expand statements; a suite
//! that loses every statement is refilled with `pass` to stay parseable.
//!
//! Identifier occurrences funnel through [`Rewrite::rewrite_name`]:
//! name expressions, parameter names, function/class names,
//! `global`/`nonlocal` lists, `except ... as` names, and import aliases.
//! Attribute names, keyword-argument names, and imported (non-alias)
//! names are never passed through it.

use crate::nodes::*;

/// Result of rewriting a node that sits in a list position.
#[derive(Debug, Clone)]
pub enum Transform<T> {
    /// Keep the (rewritten) node.
    Keep(T),
    /// Drop the node.
    Remove,
    /// Replace the node with several nodes.
    Flatten(Vec<T>),
}

impl<T> Transform<T> {
    /// True if this is `Keep`.
    pub fn is_keep(&self) -> bool {
        matches!(self, Transform::Keep(_))
    }

    /// True if this is `Remove`.
    pub fn is_remove(&self) -> bool {
        matches!(self, Transform::Remove)
    }
}

/// A pure tree rewriter. Override the hooks you need; defaults rebuild
/// structurally.
pub trait Rewrite {
    /// Fresh-id allocator continuing the module's sequence.
    fn ids(&mut self) -> &mut NodeIdGen;

    fn rewrite_module(&mut self, module: Module) -> Module {
        rewrite_module_default(self, module)
    }

    fn rewrite_statement(&mut self, statement: Statement) -> Transform<Statement> {
        rewrite_statement_default(self, statement)
    }

    fn rewrite_small_statement(&mut self, statement: SmallStatement) -> Transform<SmallStatement> {
        Transform::Keep(rewrite_small_statement_default(self, statement))
    }

    fn rewrite_expression(&mut self, expression: Expression) -> Expression {
        rewrite_expression_default(self, expression)
    }

    fn rewrite_name(&mut self, name: Name) -> Name {
        name
    }
}

/// Rebuild a whole tree and refresh its id watermark.
pub fn rewrite_tree<R: Rewrite + ?Sized>(rewriter: &mut R, module: Module) -> Module {
    let mut module = rewriter.rewrite_module(module);
    module.set_next_id(rewriter.ids().next_value());
    module
}

/// Default module rebuild: statements in order, removals honored.
pub fn rewrite_module_default<R: Rewrite + ?Sized>(rewriter: &mut R, module: Module) -> Module {
    let Module { id, body, .. } = module;
    let next = rewriter.ids().next_value();
    let body = rewrite_statement_list(rewriter, body);
    Module::new(id, body, next)
}

/// Rewrite a statement list, honoring `Remove`/`Flatten`. May be empty.
pub fn rewrite_statement_list<R: Rewrite + ?Sized>(
    rewriter: &mut R,
    body: Vec<Statement>,
) -> Vec<Statement> {
    let mut result = Vec::with_capacity(body.len());
    for statement in body {
        match rewriter.rewrite_statement(statement) {
            Transform::Keep(s) => result.push(s),
            Transform::Remove => {}
            Transform::Flatten(v) => result.extend(v),
        }
    }
    result
}

/// Rewrite a suite; refills with `pass` when everything was removed.
pub fn rewrite_suite<R: Rewrite + ?Sized>(rewriter: &mut R, body: Vec<Statement>) -> Vec<Statement> {
    let body = rewrite_statement_list(rewriter, body);
    if !body.is_empty() {
        return body;
    }
    let line_id = rewriter.ids().fresh();
    let pass_id = rewriter.ids().fresh();
    vec![Statement::Simple(SimpleStatementLine {
        id: line_id,
        body: vec![SmallStatement::Pass(Pass { id: pass_id })],
    })]
}

/// Default statement rebuild.
pub fn rewrite_statement_default<R: Rewrite + ?Sized>(
    rewriter: &mut R,
    statement: Statement,
) -> Transform<Statement> {
    match statement {
        Statement::Simple(line) => {
            let SimpleStatementLine { id, body } = line;
            let mut result = Vec::with_capacity(body.len());
            for small in body {
                match rewriter.rewrite_small_statement(small) {
                    Transform::Keep(s) => result.push(s),
                    Transform::Remove => {}
                    Transform::Flatten(v) => result.extend(v),
                }
            }
            if result.is_empty() {
                Transform::Remove
            } else {
                Transform::Keep(Statement::Simple(SimpleStatementLine { id, body: result }))
            }
        }
        Statement::Compound(compound) => Transform::Keep(Statement::Compound(
            rewrite_compound_default(rewriter, compound),
        )),
    }
}

/// Default compound-statement rebuild.
pub fn rewrite_compound_default<R: Rewrite + ?Sized>(
    rewriter: &mut R,
    statement: CompoundStatement,
) -> CompoundStatement {
    match statement {
        CompoundStatement::FunctionDef(node) => {
            CompoundStatement::FunctionDef(rewrite_function_def(rewriter, node))
        }
        CompoundStatement::ClassDef(node) => {
            CompoundStatement::ClassDef(rewrite_class_def(rewriter, node))
        }
        CompoundStatement::If(node) => CompoundStatement::If(rewrite_if(rewriter, node)),
        CompoundStatement::For(node) => {
            let For {
                id,
                target,
                iter,
                body,
                orelse,
                is_async,
            } = node;
            CompoundStatement::For(For {
                id,
                target: rewriter.rewrite_expression(target),
                iter: rewriter.rewrite_expression(iter),
                body: rewrite_suite(rewriter, body),
                orelse: orelse.map(|b| rewrite_suite(rewriter, b)),
                is_async,
            })
        }
        CompoundStatement::While(node) => {
            let While {
                id,
                test,
                body,
                orelse,
            } = node;
            CompoundStatement::While(While {
                id,
                test: rewriter.rewrite_expression(test),
                body: rewrite_suite(rewriter, body),
                orelse: orelse.map(|b| rewrite_suite(rewriter, b)),
            })
        }
        CompoundStatement::With(node) => {
            let With {
                id,
                items,
                body,
                is_async,
            } = node;
            let items = items
                .into_iter()
                .map(|item| WithItem {
                    id: item.id,
                    item: rewriter.rewrite_expression(item.item),
                    asname: item.asname.map(|a| rewriter.rewrite_expression(a)),
                })
                .collect();
            CompoundStatement::With(With {
                id,
                items,
                body: rewrite_suite(rewriter, body),
                is_async,
            })
        }
        CompoundStatement::Try(node) => {
            let Try {
                id,
                body,
                handlers,
                orelse,
                finalbody,
            } = node;
            let handlers = handlers
                .into_iter()
                .map(|handler| ExceptHandler {
                    id: handler.id,
                    etype: handler.etype.map(|e| rewriter.rewrite_expression(e)),
                    name: handler.name.map(|n| rewriter.rewrite_name(n)),
                    body: rewrite_suite(rewriter, handler.body),
                })
                .collect();
            CompoundStatement::Try(Try {
                id,
                body: rewrite_suite(rewriter, body),
                handlers,
                orelse: orelse.map(|b| rewrite_suite(rewriter, b)),
                finalbody: finalbody.map(|b| rewrite_suite(rewriter, b)),
            })
        }
    }
}

fn rewrite_if<R: Rewrite + ?Sized>(rewriter: &mut R, node: If) -> If {
    let If {
        id,
        test,
        body,
        orelse,
    } = node;
    If {
        id,
        test: rewriter.rewrite_expression(test),
        body: rewrite_suite(rewriter, body),
        orelse: orelse.map(|branch| match branch {
            ElseBranch::Elif(elif) => ElseBranch::Elif(Box::new(rewrite_if(rewriter, *elif))),
            ElseBranch::Else(body) => ElseBranch::Else(rewrite_suite(rewriter, body)),
        }),
    }
}

/// Rebuild a function definition (used by the default compound rebuild and
/// by rewriters that keep a definition they matched on).
pub fn rewrite_function_def<R: Rewrite + ?Sized>(rewriter: &mut R, node: FunctionDef) -> FunctionDef {
    let FunctionDef {
        id,
        name,
        params,
        body,
        decorators,
        returns,
        is_async,
    } = node;
    FunctionDef {
        id,
        name: rewriter.rewrite_name(name),
        params: rewrite_parameters(rewriter, params),
        body: rewrite_suite(rewriter, body),
        decorators: rewrite_decorators(rewriter, decorators),
        returns: returns.map(|r| rewriter.rewrite_expression(r)),
        is_async,
    }
}

/// Rebuild a class definition.
pub fn rewrite_class_def<R: Rewrite + ?Sized>(rewriter: &mut R, node: ClassDef) -> ClassDef {
    let ClassDef {
        id,
        name,
        bases,
        body,
        decorators,
    } = node;
    ClassDef {
        id,
        name: rewriter.rewrite_name(name),
        bases: bases.into_iter().map(|a| rewrite_arg(rewriter, a)).collect(),
        body: rewrite_suite(rewriter, body),
        decorators: rewrite_decorators(rewriter, decorators),
    }
}

fn rewrite_decorators<R: Rewrite + ?Sized>(
    rewriter: &mut R,
    decorators: Vec<Decorator>,
) -> Vec<Decorator> {
    decorators
        .into_iter()
        .map(|d| Decorator {
            id: d.id,
            expression: rewriter.rewrite_expression(d.expression),
        })
        .collect()
}

fn rewrite_parameters<R: Rewrite + ?Sized>(rewriter: &mut R, params: Parameters) -> Parameters {
    let Parameters {
        id,
        posonly,
        params: plain,
        star_arg,
        kwonly,
        star_kwarg,
    } = params;
    Parameters {
        id,
        posonly: posonly.into_iter().map(|p| rewrite_param(rewriter, p)).collect(),
        params: plain.into_iter().map(|p| rewrite_param(rewriter, p)).collect(),
        star_arg: match star_arg {
            StarArg::Param(p) => StarArg::Param(Box::new(rewrite_param(rewriter, *p))),
            other => other,
        },
        kwonly: kwonly.into_iter().map(|p| rewrite_param(rewriter, p)).collect(),
        star_kwarg: star_kwarg.map(|p| rewrite_param(rewriter, p)),
    }
}

fn rewrite_param<R: Rewrite + ?Sized>(rewriter: &mut R, param: Param) -> Param {
    let Param {
        id,
        name,
        annotation,
        default,
    } = param;
    Param {
        id,
        name: rewriter.rewrite_name(name),
        annotation: annotation.map(|a| rewriter.rewrite_expression(a)),
        default: default.map(|d| rewriter.rewrite_expression(d)),
    }
}

fn rewrite_arg<R: Rewrite + ?Sized>(rewriter: &mut R, arg: Arg) -> Arg {
    let Arg {
        id,
        value,
        keyword,
        star,
    } = arg;
    Arg {
        id,
        value: rewriter.rewrite_expression(value),
        // keyword-argument names are not identifier occurrences
        keyword,
        star,
    }
}

/// Default small-statement rebuild.
pub fn rewrite_small_statement_default<R: Rewrite + ?Sized>(
    rewriter: &mut R,
    statement: SmallStatement,
) -> SmallStatement {
    match statement {
        SmallStatement::Assign(node) => {
            let Assign { id, targets, value } = node;
            SmallStatement::Assign(Assign {
                id,
                targets: targets
                    .into_iter()
                    .map(|t| AssignTarget {
                        id: t.id,
                        target: rewriter.rewrite_expression(t.target),
                    })
                    .collect(),
                value: rewriter.rewrite_expression(value),
            })
        }
        SmallStatement::AnnAssign(node) => {
            let AnnAssign {
                id,
                target,
                annotation,
                value,
            } = node;
            SmallStatement::AnnAssign(AnnAssign {
                id,
                target: rewriter.rewrite_expression(target),
                annotation: rewriter.rewrite_expression(annotation),
                value: value.map(|v| rewriter.rewrite_expression(v)),
            })
        }
        SmallStatement::AugAssign(node) => {
            let AugAssign {
                id,
                target,
                op,
                value,
            } = node;
            SmallStatement::AugAssign(AugAssign {
                id,
                target: rewriter.rewrite_expression(target),
                op,
                value: rewriter.rewrite_expression(value),
            })
        }
        SmallStatement::Expr(node) => SmallStatement::Expr(ExprStatement {
            id: node.id,
            value: rewriter.rewrite_expression(node.value),
        }),
        SmallStatement::Return(node) => SmallStatement::Return(Return {
            id: node.id,
            value: node.value.map(|v| rewriter.rewrite_expression(v)),
        }),
        SmallStatement::Pass(_) | SmallStatement::Break(_) | SmallStatement::Continue(_) => {
            statement
        }
        SmallStatement::Import(node) => {
            let Import { id, names } = node;
            SmallStatement::Import(Import {
                id,
                names: names
                    .into_iter()
                    .map(|alias| ImportAlias {
                        id: alias.id,
                        name: alias.name,
                        asname: alias.asname.map(|a| rewriter.rewrite_name(a)),
                    })
                    .collect(),
            })
        }
        SmallStatement::ImportFrom(node) => {
            let ImportFrom {
                id,
                relative,
                module,
                names,
            } = node;
            let names = match names {
                ImportNames::Star => ImportNames::Star,
                ImportNames::Aliases(aliases) => ImportNames::Aliases(
                    aliases
                        .into_iter()
                        .map(|alias| ImportFromAlias {
                            id: alias.id,
                            name: alias.name,
                            asname: alias.asname.map(|a| rewriter.rewrite_name(a)),
                        })
                        .collect(),
                ),
            };
            SmallStatement::ImportFrom(ImportFrom {
                id,
                relative,
                module,
                names,
            })
        }
        SmallStatement::Global(node) => SmallStatement::Global(Global {
            id: node.id,
            names: node
                .names
                .into_iter()
                .map(|n| rewriter.rewrite_name(n))
                .collect(),
        }),
        SmallStatement::Nonlocal(node) => SmallStatement::Nonlocal(Nonlocal {
            id: node.id,
            names: node
                .names
                .into_iter()
                .map(|n| rewriter.rewrite_name(n))
                .collect(),
        }),
        SmallStatement::Del(node) => SmallStatement::Del(Del {
            id: node.id,
            targets: node
                .targets
                .into_iter()
                .map(|t| rewriter.rewrite_expression(t))
                .collect(),
        }),
        SmallStatement::Assert(node) => SmallStatement::Assert(Assert {
            id: node.id,
            test: rewriter.rewrite_expression(node.test),
            msg: node.msg.map(|m| rewriter.rewrite_expression(m)),
        }),
        SmallStatement::Raise(node) => SmallStatement::Raise(Raise {
            id: node.id,
            exc: node.exc.map(|e| rewriter.rewrite_expression(e)),
            cause: node.cause.map(|c| rewriter.rewrite_expression(c)),
        }),
    }
}

/// Default expression rebuild.
pub fn rewrite_expression_default<R: Rewrite + ?Sized>(
    rewriter: &mut R,
    expression: Expression,
) -> Expression {
    match expression {
        Expression::Name(name) => Expression::Name(rewriter.rewrite_name(name)),
        Expression::Attribute(node) => Expression::Attribute(Attribute {
            id: node.id,
            value: Box::new(rewriter.rewrite_expression(*node.value)),
            // attribute names are not identifier occurrences
            attr: node.attr,
        }),
        Expression::Call(node) => Expression::Call(Call {
            id: node.id,
            func: Box::new(rewriter.rewrite_expression(*node.func)),
            args: node
                .args
                .into_iter()
                .map(|a| rewrite_arg(rewriter, a))
                .collect(),
        }),
        Expression::Subscript(node) => Expression::Subscript(Subscript {
            id: node.id,
            value: Box::new(rewriter.rewrite_expression(*node.value)),
            index: Box::new(rewriter.rewrite_expression(*node.index)),
        }),
        Expression::Slice(node) => Expression::Slice(Slice {
            id: node.id,
            lower: node
                .lower
                .map(|e| Box::new(rewriter.rewrite_expression(*e))),
            upper: node
                .upper
                .map(|e| Box::new(rewriter.rewrite_expression(*e))),
            step: node.step.map(|e| Box::new(rewriter.rewrite_expression(*e))),
        }),
        Expression::SimpleString(_)
        | Expression::Integer(_)
        | Expression::Float(_)
        | Expression::Constant(_) => expression,
        Expression::ConcatenatedString(node) => {
            Expression::ConcatenatedString(ConcatenatedString {
                id: node.id,
                parts: node
                    .parts
                    .into_iter()
                    .map(|p| rewriter.rewrite_expression(p))
                    .collect(),
            })
        }
        Expression::FormattedString(node) => Expression::FormattedString(FormattedString {
            id: node.id,
            prefix: node.prefix,
            quote: node.quote,
            parts: rewrite_fstring_parts(rewriter, node.parts),
        }),
        Expression::Tuple(node) => Expression::Tuple(Tuple {
            id: node.id,
            elements: rewrite_expressions(rewriter, node.elements),
        }),
        Expression::List(node) => Expression::List(ListExpr {
            id: node.id,
            elements: rewrite_expressions(rewriter, node.elements),
        }),
        Expression::Set(node) => Expression::Set(SetExpr {
            id: node.id,
            elements: rewrite_expressions(rewriter, node.elements),
        }),
        Expression::Dict(node) => Expression::Dict(DictExpr {
            id: node.id,
            elements: node
                .elements
                .into_iter()
                .map(|element| match element {
                    DictElement::Pair(pair) => DictElement::Pair(DictPair {
                        id: pair.id,
                        key: rewriter.rewrite_expression(pair.key),
                        value: rewriter.rewrite_expression(pair.value),
                    }),
                    DictElement::Unpack(unpack) => DictElement::Unpack(DictUnpack {
                        id: unpack.id,
                        value: rewriter.rewrite_expression(unpack.value),
                    }),
                })
                .collect(),
        }),
        Expression::BinaryOperation(node) => Expression::BinaryOperation(BinaryOperation {
            id: node.id,
            left: Box::new(rewriter.rewrite_expression(*node.left)),
            op: node.op,
            right: Box::new(rewriter.rewrite_expression(*node.right)),
        }),
        Expression::UnaryOperation(node) => Expression::UnaryOperation(UnaryOperation {
            id: node.id,
            op: node.op,
            operand: Box::new(rewriter.rewrite_expression(*node.operand)),
        }),
        Expression::BooleanOperation(node) => Expression::BooleanOperation(BooleanOperation {
            id: node.id,
            left: Box::new(rewriter.rewrite_expression(*node.left)),
            op: node.op,
            right: Box::new(rewriter.rewrite_expression(*node.right)),
        }),
        Expression::Comparison(node) => Expression::Comparison(Comparison {
            id: node.id,
            left: Box::new(rewriter.rewrite_expression(*node.left)),
            comparisons: node
                .comparisons
                .into_iter()
                .map(|t| ComparisonTarget {
                    op: t.op,
                    comparator: rewriter.rewrite_expression(t.comparator),
                })
                .collect(),
        }),
        Expression::IfExp(node) => Expression::IfExp(IfExp {
            id: node.id,
            body: Box::new(rewriter.rewrite_expression(*node.body)),
            test: Box::new(rewriter.rewrite_expression(*node.test)),
            orelse: Box::new(rewriter.rewrite_expression(*node.orelse)),
        }),
        Expression::Lambda(node) => Expression::Lambda(Lambda {
            id: node.id,
            params: Box::new(rewrite_parameters(rewriter, *node.params)),
            body: Box::new(rewriter.rewrite_expression(*node.body)),
        }),
        Expression::NamedExpr(node) => Expression::NamedExpr(NamedExpr {
            id: node.id,
            target: Box::new(rewriter.rewrite_expression(*node.target)),
            value: Box::new(rewriter.rewrite_expression(*node.value)),
        }),
        Expression::Starred(node) => Expression::Starred(Starred {
            id: node.id,
            value: Box::new(rewriter.rewrite_expression(*node.value)),
        }),
        Expression::Yield(node) => Expression::Yield(Yield {
            id: node.id,
            value: node.value.map(|v| Box::new(rewriter.rewrite_expression(*v))),
            is_from: node.is_from,
        }),
        Expression::Await(node) => Expression::Await(Await {
            id: node.id,
            value: Box::new(rewriter.rewrite_expression(*node.value)),
        }),
        Expression::ListComp(node) => Expression::ListComp(ListComp {
            id: node.id,
            elt: Box::new(rewriter.rewrite_expression(*node.elt)),
            generators: rewrite_comp_clauses(rewriter, node.generators),
        }),
        Expression::SetComp(node) => Expression::SetComp(SetComp {
            id: node.id,
            elt: Box::new(rewriter.rewrite_expression(*node.elt)),
            generators: rewrite_comp_clauses(rewriter, node.generators),
        }),
        Expression::DictComp(node) => Expression::DictComp(DictComp {
            id: node.id,
            key: Box::new(rewriter.rewrite_expression(*node.key)),
            value: Box::new(rewriter.rewrite_expression(*node.value)),
            generators: rewrite_comp_clauses(rewriter, node.generators),
        }),
        Expression::GeneratorExp(node) => Expression::GeneratorExp(GeneratorExp {
            id: node.id,
            elt: Box::new(rewriter.rewrite_expression(*node.elt)),
            generators: rewrite_comp_clauses(rewriter, node.generators),
        }),
    }
}

fn rewrite_expressions<R: Rewrite + ?Sized>(
    rewriter: &mut R,
    expressions: Vec<Expression>,
) -> Vec<Expression> {
    expressions
        .into_iter()
        .map(|e| rewriter.rewrite_expression(e))
        .collect()
}

fn rewrite_comp_clauses<R: Rewrite + ?Sized>(
    rewriter: &mut R,
    generators: Vec<CompFor>,
) -> Vec<CompFor> {
    generators
        .into_iter()
        .map(|clause| CompFor {
            id: clause.id,
            target: rewriter.rewrite_expression(clause.target),
            iter: rewriter.rewrite_expression(clause.iter),
            ifs: rewrite_expressions(rewriter, clause.ifs),
            is_async: clause.is_async,
        })
        .collect()
}

fn rewrite_fstring_parts<R: Rewrite + ?Sized>(
    rewriter: &mut R,
    parts: Vec<FStringPart>,
) -> Vec<FStringPart> {
    parts
        .into_iter()
        .map(|part| match part {
            FStringPart::Text(text) => FStringPart::Text(text),
            FStringPart::Expression(hole) => FStringPart::Expression(FStringExpression {
                id: hole.id,
                expression: Box::new(rewriter.rewrite_expression(*hole.expression)),
                conversion: hole.conversion,
                format_spec: hole.format_spec.map(|s| rewrite_fstring_parts(rewriter, s)),
            }),
        })
        .collect()
}
