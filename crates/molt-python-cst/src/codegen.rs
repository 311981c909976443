//! Canonical code generation.
//!
//! The printer emits one canonical form per tree: four-space indentation,
//! single spaces around binary operators and after commas, minimal
//! parentheses decided by operator precedence. It deliberately does not
//! preserve incidental input formatting — printing is deterministic, so
//! `print(parse(print(tree)))` is a fixed point, which is what the
//! transform pipeline's idempotence and non-growth contracts are measured
//! against.
//!
//! String literals keep their original token text (prefix, quotes,
//! escapes), so values compare and print byte-for-byte.

use crate::nodes::*;

/// Accumulates generated source text.
#[derive(Debug, Default)]
pub struct CodegenState {
    output: String,
    indent: usize,
}

impl CodegenState {
    pub fn new() -> Self {
        CodegenState::default()
    }

    /// Finished source text.
    pub fn into_string(self) -> String {
        self.output
    }

    fn push(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn begin_line(&mut self) {
        for _ in 0..self.indent {
            self.output.push_str("    ");
        }
    }

    fn end_line(&mut self) {
        self.output.push('\n');
    }
}

/// Nodes that can print themselves.
pub trait Codegen {
    fn codegen(&self, state: &mut CodegenState);
}

impl Module {
    /// Render this tree to source text.
    pub fn to_source(&self) -> String {
        let mut state = CodegenState::new();
        self.codegen(&mut state);
        state.into_string()
    }
}

impl Codegen for Module {
    fn codegen(&self, state: &mut CodegenState) {
        for statement in &self.body {
            statement.codegen(state);
        }
    }
}

impl Codegen for Statement {
    fn codegen(&self, state: &mut CodegenState) {
        match self {
            Statement::Simple(line) => line.codegen(state),
            Statement::Compound(compound) => compound.codegen(state),
        }
    }
}

impl Codegen for SimpleStatementLine {
    fn codegen(&self, state: &mut CodegenState) {
        state.begin_line();
        for (i, small) in self.body.iter().enumerate() {
            if i > 0 {
                state.push("; ");
            }
            small.codegen(state);
        }
        state.end_line();
    }
}

impl Codegen for SmallStatement {
    fn codegen(&self, state: &mut CodegenState) {
        match self {
            SmallStatement::Assign(a) => {
                for target in &a.targets {
                    expr(&target.target, state, 0);
                    state.push(" = ");
                }
                expr(&a.value, state, 0);
            }
            SmallStatement::AnnAssign(a) => {
                expr(&a.target, state, TEST);
                state.push(": ");
                expr(&a.annotation, state, TEST);
                if let Some(value) = &a.value {
                    state.push(" = ");
                    expr(value, state, 0);
                }
            }
            SmallStatement::AugAssign(a) => {
                expr(&a.target, state, TEST);
                state.push(" ");
                state.push(a.op.as_str());
                state.push(" ");
                expr(&a.value, state, 0);
            }
            SmallStatement::Expr(e) => expr(&e.value, state, 0),
            SmallStatement::Return(r) => {
                state.push("return");
                if let Some(value) = &r.value {
                    state.push(" ");
                    expr(value, state, 0);
                }
            }
            SmallStatement::Pass(_) => state.push("pass"),
            SmallStatement::Break(_) => state.push("break"),
            SmallStatement::Continue(_) => state.push("continue"),
            SmallStatement::Import(i) => {
                state.push("import ");
                for (n, alias) in i.names.iter().enumerate() {
                    if n > 0 {
                        state.push(", ");
                    }
                    state.push(&alias.name.dotted());
                    if let Some(asname) = &alias.asname {
                        state.push(" as ");
                        state.push(&asname.value);
                    }
                }
            }
            SmallStatement::ImportFrom(f) => {
                state.push("from ");
                for _ in 0..f.relative {
                    state.push(".");
                }
                if let Some(module) = &f.module {
                    state.push(&module.dotted());
                }
                state.push(" import ");
                match &f.names {
                    ImportNames::Star => state.push("*"),
                    ImportNames::Aliases(aliases) => {
                        for (n, alias) in aliases.iter().enumerate() {
                            if n > 0 {
                                state.push(", ");
                            }
                            state.push(&alias.name.value);
                            if let Some(asname) = &alias.asname {
                                state.push(" as ");
                                state.push(&asname.value);
                            }
                        }
                    }
                }
            }
            SmallStatement::Global(g) => {
                state.push("global ");
                name_list(&g.names, state);
            }
            SmallStatement::Nonlocal(n) => {
                state.push("nonlocal ");
                name_list(&n.names, state);
            }
            SmallStatement::Del(d) => {
                state.push("del ");
                for (n, target) in d.targets.iter().enumerate() {
                    if n > 0 {
                        state.push(", ");
                    }
                    expr(target, state, TEST);
                }
            }
            SmallStatement::Assert(a) => {
                state.push("assert ");
                expr(&a.test, state, TEST);
                if let Some(msg) = &a.msg {
                    state.push(", ");
                    expr(msg, state, TEST);
                }
            }
            SmallStatement::Raise(r) => {
                state.push("raise");
                if let Some(exc) = &r.exc {
                    state.push(" ");
                    expr(exc, state, TEST);
                    if let Some(cause) = &r.cause {
                        state.push(" from ");
                        expr(cause, state, TEST);
                    }
                }
            }
        }
    }
}

impl Codegen for CompoundStatement {
    fn codegen(&self, state: &mut CodegenState) {
        match self {
            CompoundStatement::FunctionDef(f) => f.codegen(state),
            CompoundStatement::ClassDef(c) => c.codegen(state),
            CompoundStatement::If(i) => codegen_if(i, state, "if"),
            CompoundStatement::For(f) => {
                state.begin_line();
                if f.is_async {
                    state.push("async ");
                }
                state.push("for ");
                expr(&f.target, state, 0);
                state.push(" in ");
                expr(&f.iter, state, 0);
                state.push(":");
                state.end_line();
                suite(&f.body, state);
                if let Some(orelse) = &f.orelse {
                    state.begin_line();
                    state.push("else:");
                    state.end_line();
                    suite(orelse, state);
                }
            }
            CompoundStatement::While(w) => {
                state.begin_line();
                state.push("while ");
                expr(&w.test, state, TEST);
                state.push(":");
                state.end_line();
                suite(&w.body, state);
                if let Some(orelse) = &w.orelse {
                    state.begin_line();
                    state.push("else:");
                    state.end_line();
                    suite(orelse, state);
                }
            }
            CompoundStatement::With(w) => {
                state.begin_line();
                if w.is_async {
                    state.push("async ");
                }
                state.push("with ");
                for (n, item) in w.items.iter().enumerate() {
                    if n > 0 {
                        state.push(", ");
                    }
                    expr(&item.item, state, TEST);
                    if let Some(asname) = &item.asname {
                        state.push(" as ");
                        expr(asname, state, TEST);
                    }
                }
                state.push(":");
                state.end_line();
                suite(&w.body, state);
            }
            CompoundStatement::Try(t) => {
                state.begin_line();
                state.push("try:");
                state.end_line();
                suite(&t.body, state);
                for handler in &t.handlers {
                    state.begin_line();
                    state.push("except");
                    if let Some(etype) = &handler.etype {
                        state.push(" ");
                        expr(etype, state, TEST);
                        if let Some(name) = &handler.name {
                            state.push(" as ");
                            state.push(&name.value);
                        }
                    }
                    state.push(":");
                    state.end_line();
                    suite(&handler.body, state);
                }
                if let Some(orelse) = &t.orelse {
                    state.begin_line();
                    state.push("else:");
                    state.end_line();
                    suite(orelse, state);
                }
                if let Some(finalbody) = &t.finalbody {
                    state.begin_line();
                    state.push("finally:");
                    state.end_line();
                    suite(finalbody, state);
                }
            }
        }
    }
}

impl Codegen for FunctionDef {
    fn codegen(&self, state: &mut CodegenState) {
        decorators(&self.decorators, state);
        state.begin_line();
        if self.is_async {
            state.push("async ");
        }
        state.push("def ");
        state.push(&self.name.value);
        state.push("(");
        parameters(&self.params, state);
        state.push(")");
        if let Some(returns) = &self.returns {
            state.push(" -> ");
            expr(returns, state, TEST);
        }
        state.push(":");
        state.end_line();
        suite(&self.body, state);
    }
}

impl Codegen for ClassDef {
    fn codegen(&self, state: &mut CodegenState) {
        decorators(&self.decorators, state);
        state.begin_line();
        state.push("class ");
        state.push(&self.name.value);
        if !self.bases.is_empty() {
            state.push("(");
            call_args(&self.bases, state);
            state.push(")");
        }
        state.push(":");
        state.end_line();
        suite(&self.body, state);
    }
}

fn codegen_if(node: &If, state: &mut CodegenState, keyword: &str) {
    state.begin_line();
    state.push(keyword);
    state.push(" ");
    expr(&node.test, state, TEST);
    state.push(":");
    state.end_line();
    suite(&node.body, state);
    match &node.orelse {
        Some(ElseBranch::Elif(elif)) => codegen_if(elif, state, "elif"),
        Some(ElseBranch::Else(body)) => {
            state.begin_line();
            state.push("else:");
            state.end_line();
            suite(body, state);
        }
        None => {}
    }
}

fn suite(body: &[Statement], state: &mut CodegenState) {
    state.indent += 1;
    for statement in body {
        statement.codegen(state);
    }
    state.indent -= 1;
}

fn decorators(decorators: &[Decorator], state: &mut CodegenState) {
    for decorator in decorators {
        state.begin_line();
        state.push("@");
        expr(&decorator.expression, state, TEST);
        state.end_line();
    }
}

fn name_list(names: &[Name], state: &mut CodegenState) {
    for (n, name) in names.iter().enumerate() {
        if n > 0 {
            state.push(", ");
        }
        state.push(&name.value);
    }
}

fn parameters(params: &Parameters, state: &mut CodegenState) {
    let mut first = true;
    let mut sep = |state: &mut CodegenState| {
        if !first {
            state.push(", ");
        }
        first = false;
    };
    for param in &params.posonly {
        sep(state);
        codegen_param(param, state);
    }
    if !params.posonly.is_empty() {
        sep(state);
        state.push("/");
    }
    for param in &params.params {
        sep(state);
        codegen_param(param, state);
    }
    match &params.star_arg {
        StarArg::None => {}
        StarArg::Star => {
            sep(state);
            state.push("*");
        }
        StarArg::Param(p) => {
            sep(state);
            state.push("*");
            codegen_param(p, state);
        }
    }
    for param in &params.kwonly {
        sep(state);
        codegen_param(param, state);
    }
    if let Some(kwarg) = &params.star_kwarg {
        sep(state);
        state.push("**");
        codegen_param(kwarg, state);
    }
}

fn codegen_param(param: &Param, state: &mut CodegenState) {
    state.push(&param.name.value);
    if let Some(annotation) = &param.annotation {
        state.push(": ");
        expr(annotation, state, TEST);
        if let Some(default) = &param.default {
            state.push(" = ");
            expr(default, state, TEST);
        }
    } else if let Some(default) = &param.default {
        state.push("=");
        expr(default, state, TEST);
    }
}

fn call_args(args: &[Arg], state: &mut CodegenState) {
    for (n, arg) in args.iter().enumerate() {
        if n > 0 {
            state.push(", ");
        }
        match arg.star {
            StarKind::Star => state.push("*"),
            StarKind::DoubleStar => state.push("**"),
            StarKind::None => {}
        }
        if let Some(keyword) = &arg.keyword {
            state.push(&keyword.value);
            state.push("=");
        }
        expr(&arg.value, state, TEST);
    }
}

// ============================================================================
// Expressions
// ============================================================================

// Precedence levels, low to high. An expression is parenthesized when its
// own level is below what its context requires.
const TEST: u8 = 2; // lambda, ternary
const OR: u8 = 4;
const AND: u8 = 5;
const NOT: u8 = 6;
const COMPARISON: u8 = 7;
const BITOR: u8 = 8;
const BITXOR: u8 = 9;
const BITAND: u8 = 10;
const SHIFT: u8 = 11;
const ARITH: u8 = 12;
const TERM: u8 = 13;
const UNARY: u8 = 14;
const POWER: u8 = 15;
const AWAIT: u8 = 16;
const POSTFIX: u8 = 17;
const ATOM: u8 = 18;

fn precedence(e: &Expression) -> u8 {
    match e {
        Expression::Yield(_) => 0,
        Expression::Lambda(_) | Expression::IfExp(_) => TEST,
        Expression::BooleanOperation(b) => match b.op {
            BooleanOp::Or => OR,
            BooleanOp::And => AND,
        },
        Expression::UnaryOperation(u) => match u.op {
            UnaryOp::Not => NOT,
            _ => UNARY,
        },
        Expression::Comparison(_) => COMPARISON,
        Expression::BinaryOperation(b) => binary_precedence(b.op),
        Expression::Await(_) => AWAIT,
        Expression::Attribute(_) | Expression::Call(_) | Expression::Subscript(_) => POSTFIX,
        // starred and slice only occur where their context allows them
        Expression::Starred(_) | Expression::Slice(_) => TEST,
        _ => ATOM,
    }
}

fn binary_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::BitOr => BITOR,
        BinaryOp::BitXor => BITXOR,
        BinaryOp::BitAnd => BITAND,
        BinaryOp::LeftShift | BinaryOp::RightShift => SHIFT,
        BinaryOp::Add | BinaryOp::Subtract => ARITH,
        BinaryOp::Multiply
        | BinaryOp::Divide
        | BinaryOp::FloorDivide
        | BinaryOp::Modulo
        | BinaryOp::MatrixMultiply => TERM,
        BinaryOp::Power => POWER,
    }
}

/// Print `e`, parenthesizing when its precedence is below `min`.
fn expr(e: &Expression, state: &mut CodegenState, min: u8) {
    let needs_parens = precedence(e) < min;
    if needs_parens {
        state.push("(");
    }
    expr_inner(e, state);
    if needs_parens {
        state.push(")");
    }
}

fn expr_inner(e: &Expression, state: &mut CodegenState) {
    match e {
        Expression::Name(n) => state.push(&n.value),
        Expression::Attribute(a) => {
            // a numeric literal before `.` would lex as a float
            if matches!(*a.value, Expression::Integer(_) | Expression::Float(_)) {
                state.push("(");
                expr(&a.value, state, 0);
                state.push(")");
            } else {
                expr(&a.value, state, POSTFIX);
            }
            state.push(".");
            state.push(&a.attr.value);
        }
        Expression::Call(c) => {
            expr(&c.func, state, POSTFIX);
            state.push("(");
            call_args(&c.args, state);
            state.push(")");
        }
        Expression::Subscript(s) => {
            expr(&s.value, state, POSTFIX);
            state.push("[");
            match &*s.index {
                // `d[a, 1:2]` — a tuple index prints bare so slices stay legal
                Expression::Tuple(t) if !t.elements.is_empty() => {
                    for (n, element) in t.elements.iter().enumerate() {
                        if n > 0 {
                            state.push(", ");
                        }
                        expr(element, state, TEST);
                    }
                }
                index => expr(index, state, 0),
            }
            state.push("]");
        }
        Expression::Slice(s) => {
            if let Some(lower) = &s.lower {
                expr(lower, state, TEST);
            }
            state.push(":");
            if let Some(upper) = &s.upper {
                expr(upper, state, TEST);
            }
            if let Some(step) = &s.step {
                state.push(":");
                expr(step, state, TEST);
            }
        }
        Expression::SimpleString(s) => state.push(&s.value),
        Expression::ConcatenatedString(c) => {
            for (n, part) in c.parts.iter().enumerate() {
                if n > 0 {
                    state.push(" ");
                }
                expr(part, state, ATOM);
            }
        }
        Expression::FormattedString(f) => codegen_fstring(f, state),
        Expression::Integer(i) => state.push(&i.value),
        Expression::Float(f) => state.push(&f.value),
        Expression::Constant(c) => state.push(c.kind.as_str()),
        Expression::Tuple(t) => {
            state.push("(");
            for (n, element) in t.elements.iter().enumerate() {
                if n > 0 {
                    state.push(", ");
                }
                expr(element, state, TEST);
            }
            if t.elements.len() == 1 {
                state.push(",");
            }
            state.push(")");
        }
        Expression::List(l) => {
            state.push("[");
            for (n, element) in l.elements.iter().enumerate() {
                if n > 0 {
                    state.push(", ");
                }
                expr(element, state, TEST);
            }
            state.push("]");
        }
        Expression::Set(s) => {
            state.push("{");
            for (n, element) in s.elements.iter().enumerate() {
                if n > 0 {
                    state.push(", ");
                }
                expr(element, state, TEST);
            }
            state.push("}");
        }
        Expression::Dict(d) => {
            state.push("{");
            for (n, element) in d.elements.iter().enumerate() {
                if n > 0 {
                    state.push(", ");
                }
                match element {
                    DictElement::Pair(pair) => {
                        expr(&pair.key, state, TEST);
                        state.push(": ");
                        expr(&pair.value, state, TEST);
                    }
                    DictElement::Unpack(unpack) => {
                        state.push("**");
                        expr(&unpack.value, state, BITOR);
                    }
                }
            }
            state.push("}");
        }
        Expression::BinaryOperation(b) => {
            let prec = binary_precedence(b.op);
            if b.op == BinaryOp::Power {
                // right-associative; a unary left operand needs parens
                expr(&b.left, state, AWAIT);
                state.push("**");
                expr(&b.right, state, UNARY);
            } else {
                expr(&b.left, state, prec);
                state.push(" ");
                state.push(b.op.as_str());
                state.push(" ");
                expr(&b.right, state, prec + 1);
            }
        }
        Expression::UnaryOperation(u) => {
            state.push(u.op.as_str());
            if u.op == UnaryOp::Not {
                state.push(" ");
                expr(&u.operand, state, NOT);
            } else {
                expr(&u.operand, state, UNARY);
            }
        }
        Expression::BooleanOperation(b) => {
            let prec = precedence(e);
            expr(&b.left, state, prec);
            state.push(" ");
            state.push(b.op.as_str());
            state.push(" ");
            expr(&b.right, state, prec + 1);
        }
        Expression::Comparison(c) => {
            expr(&c.left, state, BITOR);
            for target in &c.comparisons {
                state.push(" ");
                state.push(target.op.as_str());
                state.push(" ");
                expr(&target.comparator, state, BITOR);
            }
        }
        Expression::IfExp(i) => {
            expr(&i.body, state, OR);
            state.push(" if ");
            expr(&i.test, state, OR);
            state.push(" else ");
            expr(&i.orelse, state, TEST);
        }
        Expression::Lambda(l) => {
            state.push("lambda");
            let has_params = l.params.iter().next().is_some()
                || !matches!(l.params.star_arg, StarArg::None);
            if has_params {
                state.push(" ");
                parameters(&l.params, state);
            }
            state.push(": ");
            expr(&l.body, state, TEST);
        }
        Expression::NamedExpr(n) => {
            // always parenthesized; legal in any expression position
            state.push("(");
            expr(&n.target, state, ATOM);
            state.push(" := ");
            expr(&n.value, state, TEST);
            state.push(")");
        }
        Expression::Starred(s) => {
            state.push("*");
            expr(&s.value, state, BITOR);
        }
        Expression::Yield(y) => {
            state.push("yield");
            if y.is_from {
                state.push(" from");
            }
            if let Some(value) = &y.value {
                state.push(" ");
                expr(value, state, TEST);
            }
        }
        Expression::Await(a) => {
            state.push("await ");
            expr(&a.value, state, POSTFIX);
        }
        Expression::ListComp(c) => {
            state.push("[");
            expr(&c.elt, state, TEST);
            comp_clauses(&c.generators, state);
            state.push("]");
        }
        Expression::SetComp(c) => {
            state.push("{");
            expr(&c.elt, state, TEST);
            comp_clauses(&c.generators, state);
            state.push("}");
        }
        Expression::DictComp(c) => {
            state.push("{");
            expr(&c.key, state, TEST);
            state.push(": ");
            expr(&c.value, state, TEST);
            comp_clauses(&c.generators, state);
            state.push("}");
        }
        Expression::GeneratorExp(g) => {
            state.push("(");
            expr(&g.elt, state, TEST);
            comp_clauses(&g.generators, state);
            state.push(")");
        }
    }
}

fn comp_clauses(generators: &[CompFor], state: &mut CodegenState) {
    for clause in generators {
        if clause.is_async {
            state.push(" async for ");
        } else {
            state.push(" for ");
        }
        expr(&clause.target, state, TEST);
        state.push(" in ");
        expr(&clause.iter, state, OR);
        for condition in &clause.ifs {
            state.push(" if ");
            expr(condition, state, OR);
        }
    }
}

fn codegen_fstring(f: &FormattedString, state: &mut CodegenState) {
    state.push(&f.prefix);
    state.push(&f.quote);
    fstring_parts(&f.parts, state);
    state.push(&f.quote);
}

fn fstring_parts(parts: &[FStringPart], state: &mut CodegenState) {
    for part in parts {
        match part {
            FStringPart::Text(text) => state.push(text),
            FStringPart::Expression(hole) => {
                state.push("{");
                let mut inner = CodegenState::new();
                expr(&hole.expression, &mut inner, TEST);
                let rendered = inner.into_string();
                // `{{`/`}}` would read as brace escapes
                if rendered.starts_with('{') {
                    state.push(" ");
                }
                state.push(&rendered);
                let ends_with_brace = rendered.ends_with('}');
                if ends_with_brace {
                    state.push(" ");
                }
                if let Some(conversion) = hole.conversion {
                    state.push("!");
                    state.push(conversion.encode_utf8(&mut [0u8; 4]));
                }
                if let Some(spec) = &hole.format_spec {
                    state.push(":");
                    fstring_parts(spec, state);
                }
                state.push("}");
            }
        }
    }
}
