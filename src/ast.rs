// program   ::= moduledoc? toplevel*
// moduledoc ::= '@' None DOC_TEXT
// toplevel  ::= pragma | stmt
// pragma    ::= '@' ID '=' ID
// stmt      ::= [const] type ID ['=' expr]
//             | ID '=' expr
//             | if expr block [else (if ... | block)]
//             | while expr block
//             | repeat '(' expr [',' ID] ')' block
//             | func ID '(' [type ID (',' type ID)*] ')' ['->' rtype] block
//             | return [expr]
//             | break
//             | continue
//             | call
// block     ::= '{' stmt* '}'
// expr      ::= expr (or | and) expr
//             | expr ('==' | '!=' | '<' | '<=' | '>' | '>=') expr
//             | expr ('+' | '-' | '*' | '/') expr
//             | '-' expr
//             | '(' expr ')'
//             | call
//             | ID
//             | integer
//             | float
//             | string
// call      ::= [(ID | out) '.'] ID '(' [expr (',' expr)*] ')'
// type      ::= int | float | str
// rtype     ::= type | None

// Precedence
//
// call
// - (unary)
// * /
// + -
// == != < <= > >=
// and
// or

use std::fmt::Debug;

use crate::{
    builtins::BuiltinId,
    token::Span,
    types::{ExprType, Type},
    util::intern::Symbol,
};

/// Describes the annotations a tree carries. The parser produces
/// [`Untyped`] trees, which the type checker turns into [`Typed`] ones.
pub trait Info {
    /// Annotation of every expression.
    type Expr: Debug + PartialEq;
    /// Annotation of every call site.
    type Call: Debug + PartialEq;
    /// Annotation of every variable read or write.
    type Var: Debug + PartialEq;
}

#[derive(Debug, PartialEq)]
pub struct Untyped;

impl Info for Untyped {
    type Expr = ();
    type Call = ();
    type Var = ();
}

#[derive(Debug, PartialEq)]
pub struct Typed;

impl Info for Typed {
    type Expr = ExprType;
    type Call = Callee;
    type Var = Hops;
}

/// What a call site resolved to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Callee {
    Builtin(BuiltinId),
    /// A user function, declared the given number of scopes up.
    Function(Hops),
}

/// Number of scopes between a use of a name and its declaration. Zero is the
/// innermost scope of the use.
///
/// Scopes are created identically by the checker and the evaluator, so a
/// name is found at the same distance in both.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Hops(pub usize);

#[derive(Debug, PartialEq)]
pub struct Program<I: Info> {
    pub doc: Option<ModuleDoc>,
    pub body: Vec<Stmt<I>>,
}

/// The `@None <text>` header. Documentary only.
#[derive(Debug, PartialEq)]
pub struct ModuleDoc {
    pub text: Box<str>,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub struct Stmt<I: Info> {
    pub kind: StmtKind<I>,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum StmtKind<I: Info> {
    Pragma(Pragma),
    VarDecl(VarDecl<I>),
    Assign {
        target: Ident,
        hops: I::Var,
        value: Expr<I>,
    },
    If {
        cond: Expr<I>,
        then_block: Block<I>,
        /// An `else if` chain is stored as an else block holding a single
        /// `if` statement.
        else_block: Option<Block<I>>,
    },
    While {
        cond: Expr<I>,
        body: Block<I>,
    },
    Repeat {
        count: Expr<I>,
        counter: Option<Ident>,
        body: Block<I>,
    },
    Func(FunctionDecl<I>),
    Return(Option<Expr<I>>),
    Break,
    Continue,
    /// A call whose result is discarded.
    Expr(Expr<I>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pragma {
    Debug(bool),
}

#[derive(Debug, PartialEq)]
pub struct VarDecl<I: Info> {
    pub constant: bool,
    pub ty: TypeName,
    pub name: Ident,
    pub init: Option<Expr<I>>,
}

#[derive(Debug, PartialEq)]
pub struct FunctionDecl<I: Info> {
    pub name: Ident,
    pub params: Vec<Param>,
    /// Absent when the function returns `None`.
    pub ret: Option<TypeName>,
    pub body: Block<I>,
}

impl<I: Info> FunctionDecl<I> {
    pub fn return_type(&self) -> Type {
        self.ret.map_or(Type::None, |ret| ret.ty)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Param {
    pub ty: TypeName,
    pub name: Ident,
}

#[derive(Debug, PartialEq)]
pub struct Block<I: Info> {
    pub stmts: Vec<Stmt<I>>,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub struct Expr<I: Info> {
    pub kind: ExprKind<I>,
    pub span: Span,
    pub info: I::Expr,
}

#[derive(Debug, PartialEq)]
pub enum ExprKind<I: Info> {
    Int(i64),
    Float(f64),
    Str(Box<str>),
    Id(Ident, I::Var),
    Paren(Box<Expr<I>>),
    Unary {
        op: UnaryOperator,
        expr: Box<Expr<I>>,
    },
    Binary {
        op: BinaryOperator,
        lhs: Box<Expr<I>>,
        rhs: Box<Expr<I>>,
    },
    Logical {
        op: LogicalOperator,
        lhs: Box<Expr<I>>,
        rhs: Box<Expr<I>>,
    },
    Call(Call<I>),
}

#[derive(Debug, PartialEq)]
pub struct Call<I: Info> {
    /// The `out` in `out.Info(...)`, or the `math` in `math.pow(...)`.
    pub receiver: Option<Ident>,
    pub name: Ident,
    pub args: Vec<Expr<I>>,
    pub callee: I::Call,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
    Neg,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOperator {
    pub fn is_comparison(self) -> bool {
        !matches!(
            self,
            BinaryOperator::Add | BinaryOperator::Sub | BinaryOperator::Mul | BinaryOperator::Div
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TypeName {
    pub ty: Type,
    pub span: Span,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    pub name: Symbol,
    pub span: Span,
}

impl From<Ident> for Symbol {
    fn from(value: Ident) -> Self {
        value.name
    }
}

impl From<&Ident> for Symbol {
    fn from(value: &Ident) -> Self {
        value.name
    }
}
