//! Recursive-descent parser producing the owned syntax tree.
//!
//! The parser consumes the token stream from the tokenizer and covers the
//! statement and expression subset molt transforms: the full simple/compound
//! statement set, functions (including async, decorators, positional-only
//! and keyword-only parameters), classes, lambdas, comprehensions,
//! f-strings (holes are parsed recursively so the names inside them are
//! visible to analysis), and implicit string concatenation.
//!
//! Node ids are allocated in parse order from a single [`NodeIdGen`] that
//! ends up as the module's id watermark.

use crate::error::ParseError;
use crate::nodes::*;
use crate::tokenizer::{tokenize, tokenize_expression, StringToken, Token, TokenKind};

/// Parse a complete module.
pub fn parse_module(source: &str) -> Result<Module, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(&tokens, NodeIdGen::new(0));
    parser.module()
}

/// Parse a single expression (no trailing input allowed).
pub fn parse_expression(source: &str) -> Result<Expression, ParseError> {
    let tokens = tokenize_expression(source)?;
    let mut parser = Parser::new(&tokens, NodeIdGen::new(0));
    let expr = parser.testlist_star()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Names that may begin an expression; every other keyword-looking name
/// terminates an expression list.
const EXPRESSION_KEYWORDS: &[&str] = &["None", "True", "False", "await", "lambda", "not", "yield"];

/// Statement keywords that are never plain identifiers.
const RESERVED: &[&str] = &[
    "and", "as", "assert", "async", "break", "class", "continue", "def", "del", "elif", "else",
    "except", "finally", "for", "from", "global", "if", "import", "in", "is", "nonlocal", "or",
    "pass", "raise", "return", "try", "while", "with",
];

/// Names that cannot bind: statement keywords plus the expression keywords.
fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name) || EXPRESSION_KEYWORDS.contains(&name)
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    ids: NodeIdGen,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token], ids: NodeIdGen) -> Self {
        Parser {
            tokens,
            pos: 0,
            ids,
        }
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn bump(&mut self) -> &'t TokenKind {
        let tokens = self.tokens;
        let idx = self.pos.min(tokens.len() - 1);
        if self.pos < tokens.len() {
            self.pos += 1;
        }
        &tokens[idx].kind
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(self.peek(), TokenKind::Op(o) if *o == op)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.at_op(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &'static str) -> Result<(), ParseError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.error(format!("expected {op:?}")))
        }
    }

    fn at_kw(&self, kw: &str) -> bool {
        matches!(self.peek(), TokenKind::Name(n) if n == kw)
    }

    fn eat_kw(&mut self, kw: &str) -> bool {
        if self.at_kw(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_kw(&mut self, kw: &'static str) -> Result<(), ParseError> {
        if self.eat_kw(kw) {
            Ok(())
        } else {
            Err(self.error(format!("expected {kw:?}")))
        }
    }

    fn at_newline(&self) -> bool {
        matches!(self.peek(), TokenKind::Newline)
    }

    fn expect_newline(&mut self) -> Result<(), ParseError> {
        match self.bump() {
            TokenKind::Newline => Ok(()),
            TokenKind::EndMarker => Ok(()),
            _ => Err(self.error("expected end of line")),
        }
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            TokenKind::EndMarker => Ok(()),
            _ => Err(self.error("unexpected trailing input")),
        }
    }

    fn identifier(&mut self) -> Result<Name, ParseError> {
        match self.peek().clone() {
            TokenKind::Name(n) if !is_reserved(&n) => {
                self.pos += 1;
                Ok(Name::new(self.ids.fresh(), n))
            }
            _ => Err(self.error("expected identifier")),
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let tok = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        ParseError::syntax(message, tok.line, tok.col)
    }

    /// Whether the current token can begin an expression.
    fn starts_expression(&self) -> bool {
        match self.peek() {
            TokenKind::Name(n) => {
                !RESERVED.contains(&n.as_str()) || EXPRESSION_KEYWORDS.contains(&n.as_str())
            }
            TokenKind::Number(_) | TokenKind::Str(_) => true,
            TokenKind::Op(op) => matches!(*op, "(" | "[" | "{" | "-" | "+" | "~" | "..." | "*"),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Module and statements
    // ------------------------------------------------------------------

    fn module(&mut self) -> Result<Module, ParseError> {
        let id = self.ids.fresh();
        let mut body = Vec::new();
        while !matches!(self.peek(), TokenKind::EndMarker) {
            body.push(self.statement()?);
        }
        let next_id = self.ids.next_value();
        Ok(Module::new(id, body, next_id))
    }

    fn statement(&mut self) -> Result<Statement, ParseError> {
        if self.at_op("@") {
            let decorators = self.decorators()?;
            return self.decorated(decorators);
        }
        if let TokenKind::Name(kw) = self.peek() {
            match kw.as_str() {
                "if" => return Ok(Statement::Compound(CompoundStatement::If(self.if_stmt()?))),
                "while" => return self.while_stmt().map(CompoundStatement::While).map(Statement::Compound),
                "for" => return self.for_stmt(false).map(CompoundStatement::For).map(Statement::Compound),
                "try" => return self.try_stmt().map(CompoundStatement::Try).map(Statement::Compound),
                "with" => return self.with_stmt(false).map(CompoundStatement::With).map(Statement::Compound),
                "def" => {
                    return self
                        .function_def(Vec::new(), false)
                        .map(CompoundStatement::FunctionDef)
                        .map(Statement::Compound)
                }
                "class" => {
                    return self
                        .class_def(Vec::new())
                        .map(CompoundStatement::ClassDef)
                        .map(Statement::Compound)
                }
                "async" => return self.async_stmt(Vec::new()),
                _ => {}
            }
        }
        self.simple_line().map(Statement::Simple)
    }

    fn decorators(&mut self) -> Result<Vec<Decorator>, ParseError> {
        let mut decorators = Vec::new();
        while self.eat_op("@") {
            let id = self.ids.fresh();
            let expression = self.test()?;
            self.expect_newline()?;
            decorators.push(Decorator { id, expression });
        }
        Ok(decorators)
    }

    fn decorated(&mut self, decorators: Vec<Decorator>) -> Result<Statement, ParseError> {
        if self.at_kw("def") {
            return self
                .function_def(decorators, false)
                .map(CompoundStatement::FunctionDef)
                .map(Statement::Compound);
        }
        if self.at_kw("class") {
            return self
                .class_def(decorators)
                .map(CompoundStatement::ClassDef)
                .map(Statement::Compound);
        }
        if self.at_kw("async") {
            return self.async_stmt(decorators);
        }
        Err(self.error("expected def or class after decorators"))
    }

    fn async_stmt(&mut self, decorators: Vec<Decorator>) -> Result<Statement, ParseError> {
        self.expect_kw("async")?;
        if self.at_kw("def") {
            return self
                .function_def(decorators, true)
                .map(CompoundStatement::FunctionDef)
                .map(Statement::Compound);
        }
        if !decorators.is_empty() {
            return Err(self.error("decorators are only valid on def and class"));
        }
        if self.at_kw("for") {
            return self.for_stmt(true).map(CompoundStatement::For).map(Statement::Compound);
        }
        if self.at_kw("with") {
            return self.with_stmt(true).map(CompoundStatement::With).map(Statement::Compound);
        }
        Err(self.error("expected def, for, or with after async"))
    }

    fn simple_line(&mut self) -> Result<SimpleStatementLine, ParseError> {
        let id = self.ids.fresh();
        let mut body = vec![self.small_stmt()?];
        while self.eat_op(";") {
            if self.at_newline() || matches!(self.peek(), TokenKind::EndMarker) {
                break;
            }
            body.push(self.small_stmt()?);
        }
        self.expect_newline()?;
        Ok(SimpleStatementLine { id, body })
    }

    fn small_stmt(&mut self) -> Result<SmallStatement, ParseError> {
        if let TokenKind::Name(kw) = self.peek() {
            match kw.as_str() {
                "pass" => {
                    self.pos += 1;
                    return Ok(SmallStatement::Pass(Pass {
                        id: self.ids.fresh(),
                    }));
                }
                "break" => {
                    self.pos += 1;
                    return Ok(SmallStatement::Break(Break {
                        id: self.ids.fresh(),
                    }));
                }
                "continue" => {
                    self.pos += 1;
                    return Ok(SmallStatement::Continue(Continue {
                        id: self.ids.fresh(),
                    }));
                }
                "return" => return self.return_stmt(),
                "raise" => return self.raise_stmt(),
                "global" => return self.global_stmt(),
                "nonlocal" => return self.nonlocal_stmt(),
                "del" => return self.del_stmt(),
                "assert" => return self.assert_stmt(),
                "import" => return self.import_stmt(),
                "from" => return self.import_from_stmt(),
                _ => {}
            }
        }
        self.expr_stmt()
    }

    fn return_stmt(&mut self) -> Result<SmallStatement, ParseError> {
        self.expect_kw("return")?;
        let id = self.ids.fresh();
        let value = if self.starts_expression() {
            Some(self.testlist_star()?)
        } else {
            None
        };
        Ok(SmallStatement::Return(Return { id, value }))
    }

    fn raise_stmt(&mut self) -> Result<SmallStatement, ParseError> {
        self.expect_kw("raise")?;
        let id = self.ids.fresh();
        let mut exc = None;
        let mut cause = None;
        if self.starts_expression() {
            exc = Some(self.test()?);
            if self.eat_kw("from") {
                cause = Some(self.test()?);
            }
        }
        Ok(SmallStatement::Raise(Raise { id, exc, cause }))
    }

    fn global_stmt(&mut self) -> Result<SmallStatement, ParseError> {
        self.expect_kw("global")?;
        let id = self.ids.fresh();
        let names = self.name_list()?;
        Ok(SmallStatement::Global(Global { id, names }))
    }

    fn nonlocal_stmt(&mut self) -> Result<SmallStatement, ParseError> {
        self.expect_kw("nonlocal")?;
        let id = self.ids.fresh();
        let names = self.name_list()?;
        Ok(SmallStatement::Nonlocal(Nonlocal { id, names }))
    }

    fn name_list(&mut self) -> Result<Vec<Name>, ParseError> {
        let mut names = vec![self.identifier()?];
        while self.eat_op(",") {
            names.push(self.identifier()?);
        }
        Ok(names)
    }

    fn del_stmt(&mut self) -> Result<SmallStatement, ParseError> {
        self.expect_kw("del")?;
        let id = self.ids.fresh();
        let mut targets = vec![self.test()?];
        while self.eat_op(",") {
            if !self.starts_expression() {
                break;
            }
            targets.push(self.test()?);
        }
        Ok(SmallStatement::Del(Del { id, targets }))
    }

    fn assert_stmt(&mut self) -> Result<SmallStatement, ParseError> {
        self.expect_kw("assert")?;
        let id = self.ids.fresh();
        let test = self.test()?;
        let msg = if self.eat_op(",") {
            Some(self.test()?)
        } else {
            None
        };
        Ok(SmallStatement::Assert(Assert { id, test, msg }))
    }

    fn import_stmt(&mut self) -> Result<SmallStatement, ParseError> {
        self.expect_kw("import")?;
        let id = self.ids.fresh();
        let mut names = vec![self.import_alias()?];
        while self.eat_op(",") {
            names.push(self.import_alias()?);
        }
        Ok(SmallStatement::Import(Import { id, names }))
    }

    fn import_alias(&mut self) -> Result<ImportAlias, ParseError> {
        let id = self.ids.fresh();
        let name = self.dotted_name()?;
        let asname = if self.eat_kw("as") {
            Some(self.identifier()?)
        } else {
            None
        };
        Ok(ImportAlias { id, name, asname })
    }

    fn dotted_name(&mut self) -> Result<DottedName, ParseError> {
        let id = self.ids.fresh();
        let mut parts = vec![self.identifier()?];
        while self.at_op(".") {
            // `import a . b` is `a.b`; a dot not followed by a name belongs
            // to the caller
            if !matches!(self.peek_at(1), Some(TokenKind::Name(_))) {
                break;
            }
            self.pos += 1;
            parts.push(self.identifier()?);
        }
        Ok(DottedName { id, parts })
    }

    fn import_from_stmt(&mut self) -> Result<SmallStatement, ParseError> {
        self.expect_kw("from")?;
        let id = self.ids.fresh();
        let mut relative = 0u32;
        loop {
            if self.eat_op("...") {
                relative += 3;
            } else if self.eat_op(".") {
                relative += 1;
            } else {
                break;
            }
        }
        let module = if matches!(self.peek(), TokenKind::Name(n) if n != "import") {
            Some(self.dotted_name()?)
        } else {
            None
        };
        if relative == 0 && module.is_none() {
            return Err(self.error("expected module name after from"));
        }
        self.expect_kw("import")?;
        let names = if self.eat_op("*") {
            ImportNames::Star
        } else if self.eat_op("(") {
            let aliases = self.import_from_aliases(true)?;
            self.expect_op(")")?;
            ImportNames::Aliases(aliases)
        } else {
            ImportNames::Aliases(self.import_from_aliases(false)?)
        };
        Ok(SmallStatement::ImportFrom(ImportFrom {
            id,
            relative,
            module,
            names,
        }))
    }

    fn import_from_aliases(
        &mut self,
        parenthesized: bool,
    ) -> Result<Vec<ImportFromAlias>, ParseError> {
        let mut aliases = Vec::new();
        loop {
            let id = self.ids.fresh();
            let name = self.identifier()?;
            let asname = if self.eat_kw("as") {
                Some(self.identifier()?)
            } else {
                None
            };
            aliases.push(ImportFromAlias { id, name, asname });
            if !self.eat_op(",") {
                break;
            }
            if parenthesized && self.at_op(")") {
                break;
            }
        }
        Ok(aliases)
    }

    fn expr_stmt(&mut self) -> Result<SmallStatement, ParseError> {
        let first = if self.at_kw("yield") {
            self.yield_expr()?
        } else {
            self.testlist_star()?
        };

        if self.at_op(":") && !matches!(first, Expression::Tuple(_)) {
            self.pos += 1;
            let id = self.ids.fresh();
            let annotation = self.test()?;
            let value = if self.eat_op("=") {
                Some(self.testlist_star()?)
            } else {
                None
            };
            return Ok(SmallStatement::AnnAssign(AnnAssign {
                id,
                target: first,
                annotation,
                value,
            }));
        }

        if let TokenKind::Op(op) = self.peek() {
            if let Some(aug) = aug_op(op) {
                self.pos += 1;
                let id = self.ids.fresh();
                let value = if self.at_kw("yield") {
                    self.yield_expr()?
                } else {
                    self.testlist_star()?
                };
                return Ok(SmallStatement::AugAssign(AugAssign {
                    id,
                    target: first,
                    op: aug,
                    value,
                }));
            }
        }

        if self.at_op("=") {
            let id = self.ids.fresh();
            let mut exprs = vec![first];
            while self.eat_op("=") {
                let e = if self.at_kw("yield") {
                    self.yield_expr()?
                } else {
                    self.testlist_star()?
                };
                exprs.push(e);
            }
            let value = exprs.pop().expect("at least two expressions");
            let targets = exprs
                .into_iter()
                .map(|target| AssignTarget {
                    id: self.ids.fresh(),
                    target,
                })
                .collect();
            return Ok(SmallStatement::Assign(Assign { id, targets, value }));
        }

        Ok(SmallStatement::Expr(ExprStatement {
            id: self.ids.fresh(),
            value: first,
        }))
    }

    // ------------------------------------------------------------------
    // Compound statements
    // ------------------------------------------------------------------

    fn suite(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.expect_op(":")?;
        if self.at_newline() {
            self.pos += 1;
            match self.bump() {
                TokenKind::Indent => {}
                _ => return Err(self.error("expected indented block")),
            }
            let mut body = Vec::new();
            loop {
                match self.peek() {
                    TokenKind::Dedent => {
                        self.pos += 1;
                        break;
                    }
                    TokenKind::EndMarker => break,
                    _ => body.push(self.statement()?),
                }
            }
            if body.is_empty() {
                return Err(self.error("expected statement in block"));
            }
            Ok(body)
        } else {
            Ok(vec![Statement::Simple(self.simple_line()?)])
        }
    }

    fn if_stmt(&mut self) -> Result<If, ParseError> {
        // caller guarantees `if` or `elif`
        self.pos += 1;
        let id = self.ids.fresh();
        let test = self.namedexpr_test()?;
        let body = self.suite()?;
        let orelse = if self.at_kw("elif") {
            Some(ElseBranch::Elif(Box::new(self.if_stmt()?)))
        } else if self.eat_kw("else") {
            Some(ElseBranch::Else(self.suite()?))
        } else {
            None
        };
        Ok(If {
            id,
            test,
            body,
            orelse,
        })
    }

    fn while_stmt(&mut self) -> Result<While, ParseError> {
        self.expect_kw("while")?;
        let id = self.ids.fresh();
        let test = self.namedexpr_test()?;
        let body = self.suite()?;
        let orelse = if self.eat_kw("else") {
            Some(self.suite()?)
        } else {
            None
        };
        Ok(While {
            id,
            test,
            body,
            orelse,
        })
    }

    fn for_stmt(&mut self, is_async: bool) -> Result<For, ParseError> {
        self.expect_kw("for")?;
        let id = self.ids.fresh();
        let target = self.target_list()?;
        self.expect_kw("in")?;
        let iter = self.testlist_star()?;
        let body = self.suite()?;
        let orelse = if self.eat_kw("else") {
            Some(self.suite()?)
        } else {
            None
        };
        Ok(For {
            id,
            target,
            iter,
            body,
            orelse,
            is_async,
        })
    }

    fn with_stmt(&mut self, is_async: bool) -> Result<With, ParseError> {
        self.expect_kw("with")?;
        let id = self.ids.fresh();
        let mut items = vec![self.with_item()?];
        while self.eat_op(",") {
            items.push(self.with_item()?);
        }
        let body = self.suite()?;
        Ok(With {
            id,
            items,
            body,
            is_async,
        })
    }

    fn with_item(&mut self) -> Result<WithItem, ParseError> {
        let id = self.ids.fresh();
        let item = self.test()?;
        let asname = if self.eat_kw("as") {
            Some(self.target_atom()?)
        } else {
            None
        };
        Ok(WithItem { id, item, asname })
    }

    fn try_stmt(&mut self) -> Result<Try, ParseError> {
        self.expect_kw("try")?;
        let id = self.ids.fresh();
        let body = self.suite()?;
        let mut handlers = Vec::new();
        while self.at_kw("except") {
            self.pos += 1;
            let handler_id = self.ids.fresh();
            let mut etype = None;
            let mut name = None;
            if self.starts_expression() {
                etype = Some(self.test()?);
                if self.eat_kw("as") {
                    name = Some(self.identifier()?);
                }
            }
            let handler_body = self.suite()?;
            handlers.push(ExceptHandler {
                id: handler_id,
                etype,
                name,
                body: handler_body,
            });
        }
        let orelse = if self.eat_kw("else") {
            Some(self.suite()?)
        } else {
            None
        };
        let finalbody = if self.eat_kw("finally") {
            Some(self.suite()?)
        } else {
            None
        };
        if handlers.is_empty() && finalbody.is_none() {
            return Err(self.error("expected except or finally block"));
        }
        Ok(Try {
            id,
            body,
            handlers,
            orelse,
            finalbody,
        })
    }

    fn function_def(
        &mut self,
        decorators: Vec<Decorator>,
        is_async: bool,
    ) -> Result<FunctionDef, ParseError> {
        self.expect_kw("def")?;
        let id = self.ids.fresh();
        let name = self.identifier()?;
        self.expect_op("(")?;
        let params = self.parameters(true, ")")?;
        self.expect_op(")")?;
        let returns = if self.eat_op("->") {
            Some(self.test()?)
        } else {
            None
        };
        let body = self.suite()?;
        Ok(FunctionDef {
            id,
            name,
            params,
            body,
            decorators,
            returns,
            is_async,
        })
    }

    fn class_def(&mut self, decorators: Vec<Decorator>) -> Result<ClassDef, ParseError> {
        self.expect_kw("class")?;
        let id = self.ids.fresh();
        let name = self.identifier()?;
        let bases = if self.eat_op("(") {
            let args = self.call_args()?;
            self.expect_op(")")?;
            args
        } else {
            Vec::new()
        };
        let body = self.suite()?;
        Ok(ClassDef {
            id,
            name,
            bases,
            body,
            decorators,
        })
    }

    /// Parameter list for `def` (with annotations) or `lambda` (without).
    /// Stops before `end` without consuming it.
    fn parameters(&mut self, annotations: bool, end: &str) -> Result<Parameters, ParseError> {
        let id = self.ids.fresh();
        let mut result = Parameters::empty(id);
        let mut seen_star = false;
        loop {
            if self.at_op(end) {
                break;
            }
            if self.eat_op("/") {
                if seen_star || !result.posonly.is_empty() {
                    return Err(self.error("unexpected /"));
                }
                result.posonly = std::mem::take(&mut result.params);
            } else if self.eat_op("**") {
                result.star_kwarg = Some(self.param(annotations)?);
            } else if self.eat_op("*") {
                if seen_star {
                    return Err(self.error("unexpected *"));
                }
                seen_star = true;
                if !self.at_op(",") && !self.at_op(end) {
                    result.star_arg = StarArg::Param(Box::new(self.param(annotations)?));
                } else {
                    result.star_arg = StarArg::Star;
                }
            } else {
                let param = self.param(annotations)?;
                if seen_star {
                    result.kwonly.push(param);
                } else {
                    result.params.push(param);
                }
            }
            if !self.eat_op(",") {
                break;
            }
        }
        Ok(result)
    }

    fn param(&mut self, annotations: bool) -> Result<Param, ParseError> {
        let id = self.ids.fresh();
        let name = self.identifier()?;
        let annotation = if annotations && self.eat_op(":") {
            Some(self.test()?)
        } else {
            None
        };
        let default = if self.eat_op("=") {
            Some(self.test()?)
        } else {
            None
        };
        Ok(Param {
            id,
            name,
            annotation,
            default,
        })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// `test (',' test)* [',']` — produces a Tuple for more than one
    /// element or a trailing comma.
    fn testlist_star(&mut self) -> Result<Expression, ParseError> {
        let first = self.test_or_star()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let id = self.ids.fresh();
        let mut elements = vec![first];
        while self.eat_op(",") {
            if !self.starts_expression() {
                break;
            }
            elements.push(self.test_or_star()?);
        }
        Ok(Expression::Tuple(Tuple { id, elements }))
    }

    /// `for` targets and similar: like `testlist_star` but each element is
    /// a target expression.
    fn target_list(&mut self) -> Result<Expression, ParseError> {
        let first = self.test_or_star()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let id = self.ids.fresh();
        let mut elements = vec![first];
        while self.eat_op(",") {
            if !self.starts_expression() {
                break;
            }
            elements.push(self.test_or_star()?);
        }
        Ok(Expression::Tuple(Tuple { id, elements }))
    }

    /// A single target (after `as`): name, attribute, subscript, or a
    /// parenthesized/bracketed target list.
    fn target_atom(&mut self) -> Result<Expression, ParseError> {
        self.test()
    }

    fn test_or_star(&mut self) -> Result<Expression, ParseError> {
        if self.eat_op("*") {
            let id = self.ids.fresh();
            let value = Box::new(self.bitor()?);
            return Ok(Expression::Starred(Starred { id, value }));
        }
        self.test()
    }

    /// Test with walrus allowed (`if`/`while` conditions, call args,
    /// parenthesized contexts, comprehension conditions).
    fn namedexpr_test(&mut self) -> Result<Expression, ParseError> {
        let expr = self.test()?;
        if self.at_op(":=") {
            if !matches!(expr, Expression::Name(_)) {
                return Err(self.error("assignment expression target must be a name"));
            }
            self.pos += 1;
            let id = self.ids.fresh();
            let value = Box::new(self.test()?);
            return Ok(Expression::NamedExpr(NamedExpr {
                id,
                target: Box::new(expr),
                value,
            }));
        }
        Ok(expr)
    }

    fn test(&mut self) -> Result<Expression, ParseError> {
        if self.at_kw("lambda") {
            return self.lambda();
        }
        let expr = self.or_test()?;
        if self.at_kw("if") {
            self.pos += 1;
            let id = self.ids.fresh();
            let test = Box::new(self.or_test()?);
            self.expect_kw("else")?;
            let orelse = Box::new(self.test()?);
            return Ok(Expression::IfExp(IfExp {
                id,
                body: Box::new(expr),
                test,
                orelse,
            }));
        }
        Ok(expr)
    }

    fn lambda(&mut self) -> Result<Expression, ParseError> {
        self.expect_kw("lambda")?;
        let id = self.ids.fresh();
        let params = self.parameters(false, ":")?;
        self.expect_op(":")?;
        let body = Box::new(self.test()?);
        Ok(Expression::Lambda(Lambda {
            id,
            params: Box::new(params),
            body,
        }))
    }

    fn yield_expr(&mut self) -> Result<Expression, ParseError> {
        self.expect_kw("yield")?;
        let id = self.ids.fresh();
        if self.eat_kw("from") {
            let value = Some(Box::new(self.test()?));
            return Ok(Expression::Yield(Yield {
                id,
                value,
                is_from: true,
            }));
        }
        let value = if self.starts_expression() {
            Some(Box::new(self.testlist_star()?))
        } else {
            None
        };
        Ok(Expression::Yield(Yield {
            id,
            value,
            is_from: false,
        }))
    }

    fn or_test(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.and_test()?;
        while self.at_kw("or") {
            self.pos += 1;
            let id = self.ids.fresh();
            let right = self.and_test()?;
            left = Expression::BooleanOperation(BooleanOperation {
                id,
                left: Box::new(left),
                op: BooleanOp::Or,
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn and_test(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.not_test()?;
        while self.at_kw("and") {
            self.pos += 1;
            let id = self.ids.fresh();
            let right = self.not_test()?;
            left = Expression::BooleanOperation(BooleanOperation {
                id,
                left: Box::new(left),
                op: BooleanOp::And,
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn not_test(&mut self) -> Result<Expression, ParseError> {
        if self.at_kw("not") {
            self.pos += 1;
            let id = self.ids.fresh();
            let operand = Box::new(self.not_test()?);
            return Ok(Expression::UnaryOperation(UnaryOperation {
                id,
                op: UnaryOp::Not,
                operand,
            }));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expression, ParseError> {
        let left = self.bitor()?;
        let mut comparisons = Vec::new();
        loop {
            let op = if self.at_op("==") {
                CompOp::Equal
            } else if self.at_op("!=") {
                CompOp::NotEqual
            } else if self.at_op("<=") {
                CompOp::LessThanEqual
            } else if self.at_op(">=") {
                CompOp::GreaterThanEqual
            } else if self.at_op("<") {
                CompOp::LessThan
            } else if self.at_op(">") {
                CompOp::GreaterThan
            } else if self.at_kw("in") {
                CompOp::In
            } else if self.at_kw("not") && matches!(self.peek_at(1), Some(TokenKind::Name(n)) if n == "in")
            {
                self.pos += 1;
                CompOp::NotIn
            } else if self.at_kw("is") {
                if matches!(self.peek_at(1), Some(TokenKind::Name(n)) if n == "not") {
                    self.pos += 1;
                    CompOp::IsNot
                } else {
                    CompOp::Is
                }
            } else {
                break;
            };
            self.pos += 1;
            let comparator = self.bitor()?;
            comparisons.push(ComparisonTarget { op, comparator });
        }
        if comparisons.is_empty() {
            return Ok(left);
        }
        Ok(Expression::Comparison(Comparison {
            id: self.ids.fresh(),
            left: Box::new(left),
            comparisons,
        }))
    }

    fn bitor(&mut self) -> Result<Expression, ParseError> {
        self.binary_chain(&[("|", BinaryOp::BitOr)], Self::bitxor)
    }

    fn bitxor(&mut self) -> Result<Expression, ParseError> {
        self.binary_chain(&[("^", BinaryOp::BitXor)], Self::bitand)
    }

    fn bitand(&mut self) -> Result<Expression, ParseError> {
        self.binary_chain(&[("&", BinaryOp::BitAnd)], Self::shift)
    }

    fn shift(&mut self) -> Result<Expression, ParseError> {
        self.binary_chain(
            &[("<<", BinaryOp::LeftShift), (">>", BinaryOp::RightShift)],
            Self::arith,
        )
    }

    fn arith(&mut self) -> Result<Expression, ParseError> {
        self.binary_chain(
            &[("+", BinaryOp::Add), ("-", BinaryOp::Subtract)],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Expression, ParseError> {
        self.binary_chain(
            &[
                ("*", BinaryOp::Multiply),
                ("/", BinaryOp::Divide),
                ("//", BinaryOp::FloorDivide),
                ("%", BinaryOp::Modulo),
                ("@", BinaryOp::MatrixMultiply),
            ],
            Self::unary,
        )
    }

    fn binary_chain(
        &mut self,
        ops: &[(&str, BinaryOp)],
        next: fn(&mut Self) -> Result<Expression, ParseError>,
    ) -> Result<Expression, ParseError> {
        let mut left = next(self)?;
        'outer: loop {
            for (text, op) in ops {
                if self.at_op(text) {
                    self.pos += 1;
                    let id = self.ids.fresh();
                    let right = next(self)?;
                    left = Expression::BinaryOperation(BinaryOperation {
                        id,
                        left: Box::new(left),
                        op: *op,
                        right: Box::new(right),
                    });
                    continue 'outer;
                }
            }
            break;
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expression, ParseError> {
        let op = if self.at_op("-") {
            Some(UnaryOp::Minus)
        } else if self.at_op("+") {
            Some(UnaryOp::Plus)
        } else if self.at_op("~") {
            Some(UnaryOp::BitInvert)
        } else {
            None
        };
        if let Some(op) = op {
            self.pos += 1;
            let id = self.ids.fresh();
            let operand = Box::new(self.unary()?);
            return Ok(Expression::UnaryOperation(UnaryOperation {
                id,
                op,
                operand,
            }));
        }
        if self.at_kw("await") {
            self.pos += 1;
            let id = self.ids.fresh();
            let value = Box::new(self.unary()?);
            return Ok(Expression::Await(Await { id, value }));
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expression, ParseError> {
        let base = self.postfix()?;
        if self.eat_op("**") {
            let id = self.ids.fresh();
            let right = Box::new(self.unary()?);
            return Ok(Expression::BinaryOperation(BinaryOperation {
                id,
                left: Box::new(base),
                op: BinaryOp::Power,
                right,
            }));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.atom()?;
        loop {
            if self.at_op(".") {
                self.pos += 1;
                let id = self.ids.fresh();
                let attr = self.identifier()?;
                expr = Expression::Attribute(Attribute {
                    id,
                    value: Box::new(expr),
                    attr,
                });
            } else if self.eat_op("(") {
                let id = self.ids.fresh();
                let args = self.call_args()?;
                self.expect_op(")")?;
                expr = Expression::Call(Call {
                    id,
                    func: Box::new(expr),
                    args,
                });
            } else if self.eat_op("[") {
                let id = self.ids.fresh();
                let index = Box::new(self.subscript_list()?);
                self.expect_op("]")?;
                expr = Expression::Subscript(Subscript {
                    id,
                    value: Box::new(expr),
                    index,
                });
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn call_args(&mut self) -> Result<Vec<Arg>, ParseError> {
        let mut args = Vec::new();
        while !self.at_op(")") {
            let id = self.ids.fresh();
            let arg = if self.eat_op("**") {
                Arg {
                    id,
                    value: self.test()?,
                    keyword: None,
                    star: StarKind::DoubleStar,
                }
            } else if self.eat_op("*") {
                Arg {
                    id,
                    value: self.test()?,
                    keyword: None,
                    star: StarKind::Star,
                }
            } else if matches!(self.peek(), TokenKind::Name(n) if !is_reserved(n))
                && matches!(self.peek_at(1), Some(TokenKind::Op("=")))
            {
                let keyword = Some(self.identifier()?);
                self.expect_op("=")?;
                Arg {
                    id,
                    value: self.test()?,
                    keyword,
                    star: StarKind::None,
                }
            } else {
                let value = self.namedexpr_test()?;
                if args.is_empty() && self.at_kw("for") {
                    let gen_id = self.ids.fresh();
                    let generators = self.comp_clauses()?;
                    let value = Expression::GeneratorExp(GeneratorExp {
                        id: gen_id,
                        elt: Box::new(value),
                        generators,
                    });
                    args.push(Arg {
                        id,
                        value,
                        keyword: None,
                        star: StarKind::None,
                    });
                    break;
                }
                Arg {
                    id,
                    value,
                    keyword: None,
                    star: StarKind::None,
                }
            };
            args.push(arg);
            if !self.eat_op(",") {
                break;
            }
        }
        Ok(args)
    }

    fn subscript_list(&mut self) -> Result<Expression, ParseError> {
        let first = self.subscript()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let id = self.ids.fresh();
        let mut elements = vec![first];
        while self.eat_op(",") {
            if self.at_op("]") {
                break;
            }
            elements.push(self.subscript()?);
        }
        Ok(Expression::Tuple(Tuple { id, elements }))
    }

    fn subscript(&mut self) -> Result<Expression, ParseError> {
        let lower = if self.at_op(":") {
            None
        } else {
            Some(self.test()?)
        };
        if !self.at_op(":") {
            return lower.ok_or_else(|| self.error("expected subscript"));
        }
        self.pos += 1;
        let id = self.ids.fresh();
        let upper = if self.starts_expression() {
            Some(Box::new(self.test()?))
        } else {
            None
        };
        let step = if self.eat_op(":") {
            if self.starts_expression() {
                Some(Box::new(self.test()?))
            } else {
                None
            }
        } else {
            None
        };
        Ok(Expression::Slice(Slice {
            id,
            lower: lower.map(Box::new),
            upper,
            step,
        }))
    }

    fn comp_clauses(&mut self) -> Result<Vec<CompFor>, ParseError> {
        let mut clauses = Vec::new();
        loop {
            let is_async = if self.at_kw("async")
                && matches!(self.peek_at(1), Some(TokenKind::Name(n)) if n == "for")
            {
                self.pos += 1;
                true
            } else {
                false
            };
            if !self.eat_kw("for") {
                break;
            }
            let id = self.ids.fresh();
            let target = self.target_list()?;
            self.expect_kw("in")?;
            let iter = self.or_test()?;
            let mut ifs = Vec::new();
            while self.at_kw("if") {
                self.pos += 1;
                ifs.push(self.or_test()?);
            }
            clauses.push(CompFor {
                id,
                target,
                iter,
                ifs,
                is_async,
            });
        }
        if clauses.is_empty() {
            return Err(self.error("expected for clause"));
        }
        Ok(clauses)
    }

    fn atom(&mut self) -> Result<Expression, ParseError> {
        match self.peek().clone() {
            TokenKind::Name(n) => match n.as_str() {
                "None" => self.constant(ConstantKind::None),
                "True" => self.constant(ConstantKind::True),
                "False" => self.constant(ConstantKind::False),
                "lambda" => self.lambda(),
                "yield" => self.yield_expr(),
                _ if RESERVED.contains(&n.as_str()) => Err(self.error(format!(
                    "keyword {n:?} cannot be used as an expression"
                ))),
                _ => {
                    self.pos += 1;
                    Ok(Expression::Name(Name::new(self.ids.fresh(), n)))
                }
            },
            TokenKind::Number(text) => {
                self.pos += 1;
                let id = self.ids.fresh();
                if is_integer_literal(&text) {
                    Ok(Expression::Integer(Integer { id, value: text }))
                } else {
                    Ok(Expression::Float(Float { id, value: text }))
                }
            }
            TokenKind::Str(_) => self.string_group(),
            TokenKind::Op("(") => self.paren_atom(),
            TokenKind::Op("[") => self.list_atom(),
            TokenKind::Op("{") => self.brace_atom(),
            TokenKind::Op("...") => self.constant(ConstantKind::Ellipsis),
            _ => Err(self.error("expected expression")),
        }
    }

    fn constant(&mut self, kind: ConstantKind) -> Result<Expression, ParseError> {
        self.pos += 1;
        Ok(Expression::Constant(Constant {
            id: self.ids.fresh(),
            kind,
        }))
    }

    /// One or more adjacent string tokens.
    fn string_group(&mut self) -> Result<Expression, ParseError> {
        let mut parts = Vec::new();
        while let TokenKind::Str(tok) = self.peek().clone() {
            self.pos += 1;
            if tok.is_fstring() {
                parts.push(Expression::FormattedString(self.fstring(&tok)?));
            } else {
                parts.push(Expression::SimpleString(SimpleString {
                    id: self.ids.fresh(),
                    value: tok.text.clone(),
                }));
            }
        }
        if parts.len() == 1 {
            return Ok(parts.pop().expect("one part"));
        }
        Ok(Expression::ConcatenatedString(ConcatenatedString {
            id: self.ids.fresh(),
            parts,
        }))
    }

    fn fstring(&mut self, tok: &StringToken) -> Result<FormattedString, ParseError> {
        let id = self.ids.fresh();
        let parts = self.fstring_parts(&tok.body)?;
        Ok(FormattedString {
            id,
            prefix: tok.prefix.clone(),
            quote: tok.quote.clone(),
            parts,
        })
    }

    fn fstring_parts(&mut self, body: &str) -> Result<Vec<FStringPart>, ParseError> {
        let chars: Vec<char> = body.chars().collect();
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if (c == '{' || c == '}') && chars.get(i + 1) == Some(&c) {
                text.push(c);
                text.push(c);
                i += 2;
                continue;
            }
            if c == '}' {
                return Err(self.error("single '}' in f-string"));
            }
            if c != '{' {
                text.push(c);
                i += 1;
                continue;
            }
            if !text.is_empty() {
                parts.push(FStringPart::Text(std::mem::take(&mut text)));
            }
            i += 1;
            let (expr_src, conversion, spec_src, consumed) = scan_fstring_hole(&chars[i..])
                .ok_or_else(|| self.error("unterminated expression in f-string"))?;
            i += consumed;

            let hole_id = self.ids.fresh();
            let expression = Box::new(self.parse_fragment(&expr_src)?);
            let format_spec = match spec_src {
                Some(src) => Some(self.fstring_parts(&src)?),
                None => None,
            };
            parts.push(FStringPart::Expression(FStringExpression {
                id: hole_id,
                expression,
                conversion,
                format_spec,
            }));
        }
        if !text.is_empty() {
            parts.push(FStringPart::Text(text));
        }
        Ok(parts)
    }

    /// Parse an f-string hole's expression source, sharing this parser's id
    /// allocator.
    fn parse_fragment(&mut self, source: &str) -> Result<Expression, ParseError> {
        let tokens = tokenize_expression(source)?;
        let mut sub = Parser::new(&tokens, self.ids.clone());
        let expr = sub.testlist_star()?;
        sub.expect_end()?;
        self.ids = sub.ids;
        Ok(expr)
    }

    fn paren_atom(&mut self) -> Result<Expression, ParseError> {
        self.expect_op("(")?;
        if self.at_op(")") {
            self.pos += 1;
            return Ok(Expression::Tuple(Tuple {
                id: self.ids.fresh(),
                elements: Vec::new(),
            }));
        }
        if self.at_kw("yield") {
            let expr = self.yield_expr()?;
            self.expect_op(")")?;
            return Ok(expr);
        }
        let first = if self.at_op("*") {
            self.test_or_star()?
        } else {
            self.namedexpr_test()?
        };
        if self.at_kw("for") || self.at_kw("async") {
            let id = self.ids.fresh();
            let generators = self.comp_clauses()?;
            self.expect_op(")")?;
            return Ok(Expression::GeneratorExp(GeneratorExp {
                id,
                elt: Box::new(first),
                generators,
            }));
        }
        if !self.at_op(",") {
            self.expect_op(")")?;
            return Ok(first);
        }
        let id = self.ids.fresh();
        let mut elements = vec![first];
        while self.eat_op(",") {
            if self.at_op(")") {
                break;
            }
            elements.push(self.test_or_star()?);
        }
        self.expect_op(")")?;
        Ok(Expression::Tuple(Tuple { id, elements }))
    }

    fn list_atom(&mut self) -> Result<Expression, ParseError> {
        self.expect_op("[")?;
        let id = self.ids.fresh();
        if self.at_op("]") {
            self.pos += 1;
            return Ok(Expression::List(ListExpr {
                id,
                elements: Vec::new(),
            }));
        }
        let first = if self.at_op("*") {
            self.test_or_star()?
        } else {
            self.namedexpr_test()?
        };
        if self.at_kw("for") || self.at_kw("async") {
            let generators = self.comp_clauses()?;
            self.expect_op("]")?;
            return Ok(Expression::ListComp(ListComp {
                id,
                elt: Box::new(first),
                generators,
            }));
        }
        let mut elements = vec![first];
        while self.eat_op(",") {
            if self.at_op("]") {
                break;
            }
            elements.push(self.test_or_star()?);
        }
        self.expect_op("]")?;
        Ok(Expression::List(ListExpr { id, elements }))
    }

    fn brace_atom(&mut self) -> Result<Expression, ParseError> {
        self.expect_op("{")?;
        let id = self.ids.fresh();
        if self.at_op("}") {
            self.pos += 1;
            return Ok(Expression::Dict(DictExpr {
                id,
                elements: Vec::new(),
            }));
        }
        if self.eat_op("**") {
            // dict with leading unpack
            let unpack = DictElement::Unpack(DictUnpack {
                id: self.ids.fresh(),
                value: self.bitor()?,
            });
            return self.dict_tail(id, unpack);
        }
        let first = if self.at_op("*") {
            self.test_or_star()?
        } else {
            self.namedexpr_test()?
        };
        if self.at_op(":") {
            self.pos += 1;
            let value = self.test()?;
            if self.at_kw("for") || self.at_kw("async") {
                let generators = self.comp_clauses()?;
                self.expect_op("}")?;
                return Ok(Expression::DictComp(DictComp {
                    id,
                    key: Box::new(first),
                    value: Box::new(value),
                    generators,
                }));
            }
            let pair = DictElement::Pair(DictPair {
                id: self.ids.fresh(),
                key: first,
                value,
            });
            return self.dict_tail(id, pair);
        }
        if self.at_kw("for") || self.at_kw("async") {
            let generators = self.comp_clauses()?;
            self.expect_op("}")?;
            return Ok(Expression::SetComp(SetComp {
                id,
                elt: Box::new(first),
                generators,
            }));
        }
        let mut elements = vec![first];
        while self.eat_op(",") {
            if self.at_op("}") {
                break;
            }
            elements.push(self.test_or_star()?);
        }
        self.expect_op("}")?;
        Ok(Expression::Set(SetExpr { id, elements }))
    }

    fn dict_tail(
        &mut self,
        id: NodeId,
        first: DictElement,
    ) -> Result<Expression, ParseError> {
        let mut elements = vec![first];
        while self.eat_op(",") {
            if self.at_op("}") {
                break;
            }
            if self.eat_op("**") {
                elements.push(DictElement::Unpack(DictUnpack {
                    id: self.ids.fresh(),
                    value: self.bitor()?,
                }));
            } else {
                let pair_id = self.ids.fresh();
                let key = self.test()?;
                self.expect_op(":")?;
                let value = self.test()?;
                elements.push(DictElement::Pair(DictPair {
                    id: pair_id,
                    key,
                    value,
                }));
            }
        }
        self.expect_op("}")?;
        Ok(Expression::Dict(DictExpr { id, elements }))
    }
}

fn aug_op(op: &str) -> Option<AugOp> {
    Some(match op {
        "+=" => AugOp::Add,
        "-=" => AugOp::Subtract,
        "*=" => AugOp::Multiply,
        "/=" => AugOp::Divide,
        "//=" => AugOp::FloorDivide,
        "%=" => AugOp::Modulo,
        "**=" => AugOp::Power,
        "@=" => AugOp::MatrixMultiply,
        "<<=" => AugOp::LeftShift,
        ">>=" => AugOp::RightShift,
        "&=" => AugOp::BitAnd,
        "|=" => AugOp::BitOr,
        "^=" => AugOp::BitXor,
        _ => return None,
    })
}

fn is_integer_literal(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    if lower.starts_with("0x") || lower.starts_with("0o") || lower.starts_with("0b") {
        return true;
    }
    !lower.contains('.') && !lower.contains('e') && !lower.ends_with('j')
}

/// Scan one f-string hole starting just past `{`. Returns the expression
/// source, conversion char, raw format spec, and the number of chars
/// consumed including the closing `}`.
fn scan_fstring_hole(chars: &[char]) -> Option<(String, Option<char>, Option<String>, usize)> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut expr = String::new();
    let mut conversion = None;
    let mut spec: Option<String> = None;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            if c == '\\' {
                expr.push(c);
                i += 1;
                if i < chars.len() {
                    expr.push(chars[i]);
                    i += 1;
                }
                continue;
            }
            if c == q {
                quote = None;
            }
            push_part(&mut expr, &mut spec, c);
            i += 1;
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                push_part(&mut expr, &mut spec, c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                push_part(&mut expr, &mut spec, c);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                push_part(&mut expr, &mut spec, c);
            }
            '}' => {
                if depth == 0 {
                    return Some((expr, conversion, spec, i + 1));
                }
                depth -= 1;
                push_part(&mut expr, &mut spec, c);
            }
            '!' if depth == 0
                && spec.is_none()
                && matches!(chars.get(i + 1), Some('s') | Some('r') | Some('a'))
                && matches!(chars.get(i + 2), Some(':') | Some('}')) =>
            {
                conversion = chars.get(i + 1).copied();
                i += 2;
                continue;
            }
            ':' if depth == 0 && spec.is_none() => {
                spec = Some(String::new());
            }
            _ => push_part(&mut expr, &mut spec, c),
        }
        i += 1;
    }
    None
}

fn push_part(expr: &mut String, spec: &mut Option<String>, c: char) {
    match spec {
        Some(s) => s.push(c),
        None => expr.push(c),
    }
}
