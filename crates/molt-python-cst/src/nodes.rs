//! Syntax tree node definitions.
//!
//! The tree is an owned tagged union: statements split into simple and
//! compound forms, expressions are one large enum. Every node struct carries
//! a [`NodeId`] that is unique within its module tree and stable across
//! rebuilds — a transform that keeps a node keeps its id, and only
//! synthesized nodes receive fresh ids from the module's allocator. Analyses
//! key their per-node tables by `NodeId`, so two syntactically equal nodes at
//! different positions are always distinct entities.
//!
//! Trees are never mutated in place. A transform consumes the old tree and
//! produces a new one (see the `rewrite` module); the old tree stays valid
//! until its owner drops it.

use serde::Serialize;

/// Identity of a node within one module tree.
///
/// Ids are dense and allocated in parse order; synthesized nodes continue
/// the sequence via [`NodeIdGen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

/// Allocator for fresh node ids.
///
/// Obtained from [`Module::id_gen`] by transforms that synthesize nodes,
/// and handed back via [`Module::set_next_id`] so a later pass continues
/// the sequence.
#[derive(Debug, Clone)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    /// Start allocating at `next`.
    pub fn new(next: u32) -> Self {
        NodeIdGen { next }
    }

    /// Allocate a fresh id.
    pub fn fresh(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// The next unallocated id value.
    pub fn next_value(&self) -> u32 {
        self.next
    }
}

// ============================================================================
// Module
// ============================================================================

/// A parsed module: the root of one tree.
#[derive(Debug, Clone)]
pub struct Module {
    pub id: NodeId,
    pub body: Vec<Statement>,
    /// First id value not used by any node in this tree.
    next_id: u32,
}

impl Module {
    /// Create a module from a body and the id watermark produced by parsing
    /// or rebuilding it.
    pub fn new(id: NodeId, body: Vec<Statement>, next_id: u32) -> Self {
        Module { id, body, next_id }
    }

    /// Allocator continuing this tree's id sequence.
    pub fn id_gen(&self) -> NodeIdGen {
        NodeIdGen::new(self.next_id)
    }

    /// Record the id watermark after synthesizing nodes.
    pub fn set_next_id(&mut self, next_id: u32) {
        self.next_id = next_id;
    }
}

// ============================================================================
// Statements
// ============================================================================

/// A statement: either one logical line of small statements or a compound
/// (block-introducing) statement.
#[derive(Debug, Clone)]
pub enum Statement {
    Simple(SimpleStatementLine),
    Compound(CompoundStatement),
}

/// One logical line holding semicolon-joined small statements.
#[derive(Debug, Clone)]
pub struct SimpleStatementLine {
    pub id: NodeId,
    pub body: Vec<SmallStatement>,
}

/// Statements that fit on one logical line.
#[derive(Debug, Clone)]
pub enum SmallStatement {
    Assign(Assign),
    AnnAssign(AnnAssign),
    AugAssign(AugAssign),
    Expr(ExprStatement),
    Return(Return),
    Pass(Pass),
    Break(Break),
    Continue(Continue),
    Import(Import),
    ImportFrom(ImportFrom),
    Global(Global),
    Nonlocal(Nonlocal),
    Del(Del),
    Assert(Assert),
    Raise(Raise),
}

/// `a = b = value` — one target per `=`.
#[derive(Debug, Clone)]
pub struct Assign {
    pub id: NodeId,
    pub targets: Vec<AssignTarget>,
    pub value: Expression,
}

/// A single assignment target (the part left of one `=`).
#[derive(Debug, Clone)]
pub struct AssignTarget {
    pub id: NodeId,
    pub target: Expression,
}

/// `target: annotation` or `target: annotation = value`.
#[derive(Debug, Clone)]
pub struct AnnAssign {
    pub id: NodeId,
    pub target: Expression,
    pub annotation: Expression,
    pub value: Option<Expression>,
}

/// `target op= value`.
#[derive(Debug, Clone)]
pub struct AugAssign {
    pub id: NodeId,
    pub target: Expression,
    pub op: AugOp,
    pub value: Expression,
}

/// An expression used as a statement.
#[derive(Debug, Clone)]
pub struct ExprStatement {
    pub id: NodeId,
    pub value: Expression,
}

#[derive(Debug, Clone)]
pub struct Return {
    pub id: NodeId,
    pub value: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct Pass {
    pub id: NodeId,
}

#[derive(Debug, Clone)]
pub struct Break {
    pub id: NodeId,
}

#[derive(Debug, Clone)]
pub struct Continue {
    pub id: NodeId,
}

/// `import a.b as c, d`.
#[derive(Debug, Clone)]
pub struct Import {
    pub id: NodeId,
    pub names: Vec<ImportAlias>,
}

#[derive(Debug, Clone)]
pub struct ImportAlias {
    pub id: NodeId,
    pub name: DottedName,
    pub asname: Option<Name>,
}

/// `from ..pkg.mod import x as y, z` or `from mod import *`.
#[derive(Debug, Clone)]
pub struct ImportFrom {
    pub id: NodeId,
    /// Number of leading relative dots.
    pub relative: u32,
    pub module: Option<DottedName>,
    pub names: ImportNames,
}

#[derive(Debug, Clone)]
pub enum ImportNames {
    Star,
    Aliases(Vec<ImportFromAlias>),
}

#[derive(Debug, Clone)]
pub struct ImportFromAlias {
    pub id: NodeId,
    pub name: Name,
    pub asname: Option<Name>,
}

/// A dotted module path, `a.b.c`.
#[derive(Debug, Clone)]
pub struct DottedName {
    pub id: NodeId,
    pub parts: Vec<Name>,
}

impl DottedName {
    /// The path joined with dots.
    pub fn dotted(&self) -> String {
        self.parts
            .iter()
            .map(|n| n.value.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Debug, Clone)]
pub struct Global {
    pub id: NodeId,
    pub names: Vec<Name>,
}

#[derive(Debug, Clone)]
pub struct Nonlocal {
    pub id: NodeId,
    pub names: Vec<Name>,
}

#[derive(Debug, Clone)]
pub struct Del {
    pub id: NodeId,
    pub targets: Vec<Expression>,
}

#[derive(Debug, Clone)]
pub struct Assert {
    pub id: NodeId,
    pub test: Expression,
    pub msg: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct Raise {
    pub id: NodeId,
    pub exc: Option<Expression>,
    pub cause: Option<Expression>,
}

// ============================================================================
// Compound statements
// ============================================================================

#[derive(Debug, Clone)]
pub enum CompoundStatement {
    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
    If(If),
    For(For),
    While(While),
    With(With),
    Try(Try),
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub id: NodeId,
    pub name: Name,
    pub params: Parameters,
    pub body: Vec<Statement>,
    pub decorators: Vec<Decorator>,
    pub returns: Option<Expression>,
    pub is_async: bool,
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub id: NodeId,
    pub name: Name,
    /// Base classes and class keywords (e.g. `metaclass=`), as call arguments.
    pub bases: Vec<Arg>,
    pub body: Vec<Statement>,
    pub decorators: Vec<Decorator>,
}

#[derive(Debug, Clone)]
pub struct Decorator {
    pub id: NodeId,
    pub expression: Expression,
}

#[derive(Debug, Clone)]
pub struct If {
    pub id: NodeId,
    pub test: Expression,
    pub body: Vec<Statement>,
    pub orelse: Option<ElseBranch>,
}

#[derive(Debug, Clone)]
pub enum ElseBranch {
    Elif(Box<If>),
    Else(Vec<Statement>),
}

#[derive(Debug, Clone)]
pub struct For {
    pub id: NodeId,
    pub target: Expression,
    pub iter: Expression,
    pub body: Vec<Statement>,
    pub orelse: Option<Vec<Statement>>,
    pub is_async: bool,
}

#[derive(Debug, Clone)]
pub struct While {
    pub id: NodeId,
    pub test: Expression,
    pub body: Vec<Statement>,
    pub orelse: Option<Vec<Statement>>,
}

#[derive(Debug, Clone)]
pub struct With {
    pub id: NodeId,
    pub items: Vec<WithItem>,
    pub body: Vec<Statement>,
    pub is_async: bool,
}

#[derive(Debug, Clone)]
pub struct WithItem {
    pub id: NodeId,
    pub item: Expression,
    pub asname: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct Try {
    pub id: NodeId,
    pub body: Vec<Statement>,
    pub handlers: Vec<ExceptHandler>,
    pub orelse: Option<Vec<Statement>>,
    pub finalbody: Option<Vec<Statement>>,
}

#[derive(Debug, Clone)]
pub struct ExceptHandler {
    pub id: NodeId,
    pub etype: Option<Expression>,
    pub name: Option<Name>,
    pub body: Vec<Statement>,
}

// ============================================================================
// Parameters
// ============================================================================

/// A full parameter list: positional-only, regular, `*args`/bare `*`,
/// keyword-only, `**kwargs`.
#[derive(Debug, Clone)]
pub struct Parameters {
    pub id: NodeId,
    pub posonly: Vec<Param>,
    pub params: Vec<Param>,
    pub star_arg: StarArg,
    pub kwonly: Vec<Param>,
    pub star_kwarg: Option<Param>,
}

impl Parameters {
    /// Empty parameter list.
    pub fn empty(id: NodeId) -> Self {
        Parameters {
            id,
            posonly: Vec::new(),
            params: Vec::new(),
            star_arg: StarArg::None,
            kwonly: Vec::new(),
            star_kwarg: None,
        }
    }

    /// Iterate all named parameters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.posonly
            .iter()
            .chain(self.params.iter())
            .chain(match &self.star_arg {
                StarArg::Param(p) => Some(p.as_ref()),
                _ => None,
            })
            .chain(self.kwonly.iter())
            .chain(self.star_kwarg.iter())
    }
}

#[derive(Debug, Clone)]
pub enum StarArg {
    /// No star entry.
    None,
    /// Bare `*` separator before keyword-only parameters.
    Star,
    /// `*args`.
    Param(Box<Param>),
}

#[derive(Debug, Clone)]
pub struct Param {
    pub id: NodeId,
    pub name: Name,
    pub annotation: Option<Expression>,
    pub default: Option<Expression>,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone)]
pub enum Expression {
    Name(Name),
    Attribute(Attribute),
    Call(Call),
    Subscript(Subscript),
    Slice(Slice),
    SimpleString(SimpleString),
    ConcatenatedString(ConcatenatedString),
    FormattedString(FormattedString),
    Integer(Integer),
    Float(Float),
    Constant(Constant),
    Tuple(Tuple),
    List(ListExpr),
    Set(SetExpr),
    Dict(DictExpr),
    BinaryOperation(BinaryOperation),
    UnaryOperation(UnaryOperation),
    BooleanOperation(BooleanOperation),
    Comparison(Comparison),
    IfExp(IfExp),
    Lambda(Lambda),
    NamedExpr(NamedExpr),
    Starred(Starred),
    Yield(Yield),
    Await(Await),
    ListComp(ListComp),
    SetComp(SetComp),
    DictComp(DictComp),
    GeneratorExp(GeneratorExp),
}

impl Expression {
    /// The node id of this expression.
    pub fn node_id(&self) -> NodeId {
        match self {
            Expression::Name(n) => n.id,
            Expression::Attribute(n) => n.id,
            Expression::Call(n) => n.id,
            Expression::Subscript(n) => n.id,
            Expression::Slice(n) => n.id,
            Expression::SimpleString(n) => n.id,
            Expression::ConcatenatedString(n) => n.id,
            Expression::FormattedString(n) => n.id,
            Expression::Integer(n) => n.id,
            Expression::Float(n) => n.id,
            Expression::Constant(n) => n.id,
            Expression::Tuple(n) => n.id,
            Expression::List(n) => n.id,
            Expression::Set(n) => n.id,
            Expression::Dict(n) => n.id,
            Expression::BinaryOperation(n) => n.id,
            Expression::UnaryOperation(n) => n.id,
            Expression::BooleanOperation(n) => n.id,
            Expression::Comparison(n) => n.id,
            Expression::IfExp(n) => n.id,
            Expression::Lambda(n) => n.id,
            Expression::NamedExpr(n) => n.id,
            Expression::Starred(n) => n.id,
            Expression::Yield(n) => n.id,
            Expression::Await(n) => n.id,
            Expression::ListComp(n) => n.id,
            Expression::SetComp(n) => n.id,
            Expression::DictComp(n) => n.id,
            Expression::GeneratorExp(n) => n.id,
        }
    }
}

/// An identifier occurrence.
#[derive(Debug, Clone)]
pub struct Name {
    pub id: NodeId,
    pub value: String,
}

impl Name {
    pub fn new(id: NodeId, value: impl Into<String>) -> Self {
        Name {
            id,
            value: value.into(),
        }
    }
}

/// `value.attr`.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub id: NodeId,
    pub value: Box<Expression>,
    pub attr: Name,
}

/// `func(args...)`.
#[derive(Debug, Clone)]
pub struct Call {
    pub id: NodeId,
    pub func: Box<Expression>,
    pub args: Vec<Arg>,
}

/// One call argument.
#[derive(Debug, Clone)]
pub struct Arg {
    pub id: NodeId,
    pub value: Expression,
    /// `name=value` keyword, exclusive with `star`.
    pub keyword: Option<Name>,
    pub star: StarKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarKind {
    None,
    /// `*iterable`.
    Star,
    /// `**mapping`.
    DoubleStar,
}

/// `value[index]`.
#[derive(Debug, Clone)]
pub struct Subscript {
    pub id: NodeId,
    pub value: Box<Expression>,
    pub index: Box<Expression>,
}

/// `lower:upper:step` inside a subscript.
#[derive(Debug, Clone)]
pub struct Slice {
    pub id: NodeId,
    pub lower: Option<Box<Expression>>,
    pub upper: Option<Box<Expression>>,
    pub step: Option<Box<Expression>>,
}

/// A plain (or bytes/raw) string literal. `value` is the full token text
/// including prefix and quotes, so equal values are textually
/// interchangeable.
#[derive(Debug, Clone)]
pub struct SimpleString {
    pub id: NodeId,
    pub value: String,
}

/// Adjacent string literals that concatenate implicitly.
#[derive(Debug, Clone)]
pub struct ConcatenatedString {
    pub id: NodeId,
    /// `SimpleString` or `FormattedString` parts, in order.
    pub parts: Vec<Expression>,
}

/// An f-string. Text parts keep their raw source form; expression holes are
/// parsed so the names inside them are visible to analysis.
#[derive(Debug, Clone)]
pub struct FormattedString {
    pub id: NodeId,
    /// Prefix as written, e.g. `f` or `rf`.
    pub prefix: String,
    /// Quote characters, e.g. `"` or `'''`.
    pub quote: String,
    pub parts: Vec<FStringPart>,
}

#[derive(Debug, Clone)]
pub enum FStringPart {
    /// Literal text, raw (brace escapes still doubled).
    Text(String),
    Expression(FStringExpression),
}

/// One `{expression!conversion:format_spec}` hole.
#[derive(Debug, Clone)]
pub struct FStringExpression {
    pub id: NodeId,
    pub expression: Box<Expression>,
    pub conversion: Option<char>,
    /// Format spec after `:`, if any. Specs may contain holes themselves
    /// (`f"{v:{width}}"`), so they are part lists too.
    pub format_spec: Option<Vec<FStringPart>>,
}

/// Integer literal, textual form preserved.
#[derive(Debug, Clone)]
pub struct Integer {
    pub id: NodeId,
    pub value: String,
}

/// Float or imaginary literal, textual form preserved.
#[derive(Debug, Clone)]
pub struct Float {
    pub id: NodeId,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct Constant {
    pub id: NodeId,
    pub kind: ConstantKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantKind {
    None,
    True,
    False,
    Ellipsis,
}

impl ConstantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstantKind::None => "None",
            ConstantKind::True => "True",
            ConstantKind::False => "False",
            ConstantKind::Ellipsis => "...",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tuple {
    pub id: NodeId,
    pub elements: Vec<Expression>,
}

#[derive(Debug, Clone)]
pub struct ListExpr {
    pub id: NodeId,
    pub elements: Vec<Expression>,
}

#[derive(Debug, Clone)]
pub struct SetExpr {
    pub id: NodeId,
    pub elements: Vec<Expression>,
}

#[derive(Debug, Clone)]
pub struct DictExpr {
    pub id: NodeId,
    pub elements: Vec<DictElement>,
}

#[derive(Debug, Clone)]
pub enum DictElement {
    Pair(DictPair),
    /// `**mapping` unpacking.
    Unpack(DictUnpack),
}

#[derive(Debug, Clone)]
pub struct DictPair {
    pub id: NodeId,
    pub key: Expression,
    pub value: Expression,
}

#[derive(Debug, Clone)]
pub struct DictUnpack {
    pub id: NodeId,
    pub value: Expression,
}

#[derive(Debug, Clone)]
pub struct BinaryOperation {
    pub id: NodeId,
    pub left: Box<Expression>,
    pub op: BinaryOp,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct UnaryOperation {
    pub id: NodeId,
    pub op: UnaryOp,
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct BooleanOperation {
    pub id: NodeId,
    pub left: Box<Expression>,
    pub op: BooleanOp,
    pub right: Box<Expression>,
}

/// `left op1 c1 op2 c2 ...` comparison chain.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub id: NodeId,
    pub left: Box<Expression>,
    pub comparisons: Vec<ComparisonTarget>,
}

#[derive(Debug, Clone)]
pub struct ComparisonTarget {
    pub op: CompOp,
    pub comparator: Expression,
}

/// `body if test else orelse`.
#[derive(Debug, Clone)]
pub struct IfExp {
    pub id: NodeId,
    pub body: Box<Expression>,
    pub test: Box<Expression>,
    pub orelse: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct Lambda {
    pub id: NodeId,
    pub params: Box<Parameters>,
    pub body: Box<Expression>,
}

/// `target := value` (walrus).
#[derive(Debug, Clone)]
pub struct NamedExpr {
    pub id: NodeId,
    pub target: Box<Expression>,
    pub value: Box<Expression>,
}

/// `*value` in unpacking contexts.
#[derive(Debug, Clone)]
pub struct Starred {
    pub id: NodeId,
    pub value: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct Yield {
    pub id: NodeId,
    pub value: Option<Box<Expression>>,
    /// `yield from value`.
    pub is_from: bool,
}

#[derive(Debug, Clone)]
pub struct Await {
    pub id: NodeId,
    pub value: Box<Expression>,
}

/// One `for target in iter [if cond]*` clause of a comprehension.
#[derive(Debug, Clone)]
pub struct CompFor {
    pub id: NodeId,
    pub target: Expression,
    pub iter: Expression,
    pub ifs: Vec<Expression>,
    pub is_async: bool,
}

#[derive(Debug, Clone)]
pub struct ListComp {
    pub id: NodeId,
    pub elt: Box<Expression>,
    pub generators: Vec<CompFor>,
}

#[derive(Debug, Clone)]
pub struct SetComp {
    pub id: NodeId,
    pub elt: Box<Expression>,
    pub generators: Vec<CompFor>,
}

#[derive(Debug, Clone)]
pub struct DictComp {
    pub id: NodeId,
    pub key: Box<Expression>,
    pub value: Box<Expression>,
    pub generators: Vec<CompFor>,
}

#[derive(Debug, Clone)]
pub struct GeneratorExp {
    pub id: NodeId,
    pub elt: Box<Expression>,
    pub generators: Vec<CompFor>,
}

// ============================================================================
// Operators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    FloorDivide,
    Modulo,
    Power,
    MatrixMultiply,
    LeftShift,
    RightShift,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::FloorDivide => "//",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "**",
            BinaryOp::MatrixMultiply => "@",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    BitInvert,
    Not,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::BitInvert => "~",
            UnaryOp::Not => "not",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    And,
    Or,
}

impl BooleanOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BooleanOp::And => "and",
            BooleanOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CompOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompOp::Equal => "==",
            CompOp::NotEqual => "!=",
            CompOp::LessThan => "<",
            CompOp::LessThanEqual => "<=",
            CompOp::GreaterThan => ">",
            CompOp::GreaterThanEqual => ">=",
            CompOp::In => "in",
            CompOp::NotIn => "not in",
            CompOp::Is => "is",
            CompOp::IsNot => "is not",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AugOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    FloorDivide,
    Modulo,
    Power,
    MatrixMultiply,
    LeftShift,
    RightShift,
    BitAnd,
    BitOr,
    BitXor,
}

impl AugOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AugOp::Add => "+=",
            AugOp::Subtract => "-=",
            AugOp::Multiply => "*=",
            AugOp::Divide => "/=",
            AugOp::FloorDivide => "//=",
            AugOp::Modulo => "%=",
            AugOp::Power => "**=",
            AugOp::MatrixMultiply => "@=",
            AugOp::LeftShift => "<<=",
            AugOp::RightShift => ">>=",
            AugOp::BitAnd => "&=",
            AugOp::BitOr => "|=",
            AugOp::BitXor => "^=",
        }
    }
}

/// Python keywords, including the soft constants. Used to keep generated
/// identifiers legal.
pub const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue",
    "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import",
    "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while",
    "with", "yield",
];

/// True if `name` is a Python keyword.
pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.binary_search(&name).is_ok()
}
