#![allow(clippy::items_after_statements)]

use std::fmt::{self, Formatter};

use crate::{
    eval, lexer, parser,
    token::{Spanned, TokenKind},
    type_checker,
    util::fmt::{Context, Show},
};

fn write_span_prefix<T>(f: &mut Formatter<'_>, spanned: &Spanned<T>) -> fmt::Result {
    if f.alternate() {
        write!(f, "{}: ", spanned.span)?;
    }
    Ok(())
}

fn show_lexer_error(f: &mut Formatter<'_>, error: lexer::Error) -> fmt::Result {
    use lexer::Error::*;
    match error {
        UnexpectedChar(c) => write!(f, "unexpected character `{c}`"),
        UnclosedString => write!(f, "unterminated string literal"),
        UnknownEscape(c) => write!(f, "unknown escape sequence `\\{c}`"),
        UnclosedComment => write!(f, "unterminated block comment"),
        UnopenedComment => write!(f, "unexpected block comment end `#Y`"),
        MalformedFloat => write!(f, "malformed number, expected a digit after `.`"),
        InvalidNumberSuffix => write!(f, "malformed number, unexpected letters after digits"),
    }
}

fn show_one_of(f: &mut Formatter<'_>, expected: &[TokenKind]) -> fmt::Result {
    let Some((last, rest)) = expected.split_last() else {
        return write!(f, "nothing");
    };
    if rest.is_empty() {
        return write!(f, "{last}");
    }
    f.write_str("one of ")?;
    for (i, kind) in rest.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{kind}")?;
    }
    write!(f, " or {last}")
}

impl Show for Spanned<parser::Error> {
    fn show(&self, f: &mut Formatter<'_>, ctx: &Context<'_>) -> fmt::Result {
        let i = ctx.interner;
        write_span_prefix(f, self)?;

        use parser::Error::*;
        match &self.inner {
            Lexer(error) => show_lexer_error(f, *error),
            UnexpectedTokenInExpr { token } => write!(f, "unexpected {token} in expression"),
            UnexpectedTokenInStmt { token } => {
                write!(f, "unexpected {token} at the start of a statement")
            }
            Unexpected { actual, expected } => {
                write!(f, "expected {expected}, but got {actual}")
            }
            UnexpectedAny { actual, expected } => {
                f.write_str("expected ")?;
                show_one_of(f, expected)?;
                write!(f, ", but got {actual}")
            }
            UnexpectedOperator { actual } => write!(f, "expected an operator, but got {actual}"),
            ExpectedType { actual, allow_none } => {
                if *allow_none {
                    write!(
                        f,
                        "expected a type (`int`, `float`, `str` or `None`), but got {actual}"
                    )
                } else {
                    write!(
                        f,
                        "expected a type (`int`, `float` or `str`), but got {actual}"
                    )
                }
            }
            InvalidCallTarget => write!(f, "only named functions can be called"),
            ExprStmtNotCall => write!(f, "only calls can be used as statements"),
            ConstWithoutInitializer(name) => {
                write!(f, "constant `{}` must be initialized", i.get(*name))
            }
            MisplacedModuleDoc => write!(f, "the module description must come first"),
            UnknownDirective(name) => write!(f, "unknown directive `{}`", i.get(*name)),
            InvalidDirectiveValue(value) => write!(
                f,
                "invalid value `{}` for directive, expected `true` or `false`",
                i.get(*value)
            ),
            IntOutOfRange => write!(f, "integer literal out of range"),
            InvalidFloat => write!(f, "invalid float literal"),
            TooDeeplyNested => write!(
                f,
                "nesting is too deep (the limit is {} levels)",
                parser::MAX_NESTING
            ),
        }
    }
}

impl Show for Spanned<type_checker::Error> {
    fn show(&self, f: &mut Formatter<'_>, ctx: &Context<'_>) -> fmt::Result {
        let i = ctx.interner;
        write_span_prefix(f, self)?;

        use type_checker::Error::*;
        match &self.inner {
            UndefinedName(name) => write!(f, "`{}` is not defined", i.get(*name)),
            UndefinedFunction(name) => write!(f, "function `{}` is not defined", i.get(*name)),
            UnknownBuiltin { receiver, name } => {
                let receiver = i.get(*receiver);
                let name = i.get(*name);
                write!(f, "unknown built-in `{receiver}.{name}`")
            }
            NotAFunction(name) => write!(f, "`{}` is not a function", i.get(*name)),
            NotAVariable(name) => {
                write!(f, "`{}` is a function, not a variable", i.get(*name))
            }
            Redeclaration {
                name,
                other_definition_span,
            } => {
                let name = i.get(*name);
                write!(f, "`{name}` is already defined at {other_definition_span}")
            }
            Mismatch { expected, actual } => {
                write!(f, "expected type {expected}, but got {actual}")
            }
            ConstAssignment(name) => write!(f, "cannot assign to constant `{}`", i.get(*name)),
            InvalidOperands { op, lhs, rhs } => {
                write!(f, "invalid operands for {op:?}: {lhs} and {rhs}")
            }
            InvalidNegation(ty) => write!(f, "cannot negate a value of type {ty}"),
            ExpectedCondition(ty) => write!(f, "expected a condition, but got {ty}"),
            ConditionAsValue => write!(f, "a comparison is not a value"),
            ArityMismatch { expected, actual } => {
                write!(f, "expected {expected} arguments, but got {actual}")
            }
            ArgumentMismatch {
                position,
                expected,
                actual,
            } => write!(
                f,
                "argument {position}: expected {expected}, but got {actual}"
            ),
            ReturnOutsideFunction => write!(f, "`return` outside of a function"),
            BreakOutsideLoop => write!(f, "`break` outside of a loop"),
            ContinueOutsideLoop => write!(f, "`continue` outside of a loop"),
            MissingReturn(name) => write!(
                f,
                "function `{}` may finish without returning a value",
                i.get(*name)
            ),
        }
    }
}

impl Show for Spanned<type_checker::Warning> {
    fn show(&self, f: &mut Formatter<'_>, ctx: &Context<'_>) -> fmt::Result {
        write_span_prefix(f, self)?;
        match self.inner {
            type_checker::Warning::Unused(name) => {
                write!(f, "`{}` is defined but not used", ctx.interner.get(name))
            }
        }
    }
}

impl Show for Spanned<eval::Error> {
    fn show(&self, f: &mut Formatter<'_>, ctx: &Context<'_>) -> fmt::Result {
        write_span_prefix(f, self)?;

        use eval::Error::*;
        match &self.inner {
            DivisionByZero => write!(f, "division by zero"),
            Overflow => write!(f, "integer overflow"),
            NegativeRepeatCount(n) => {
                write!(f, "cannot repeat a negative number of times ({n})")
            }
            NegativeExponent(n) => write!(f, "negative exponent {n} in an integer power"),
            NegativeSqrt => write!(f, "square root of a negative number"),
            EndOfInput => write!(f, "no more input to read"),
            InvalidNumber { text, ty } => {
                write!(f, "cannot convert {text:?} to {}", ty.name())
            }
            Io(kind) => write!(f, "input/output failure: {kind}"),
            UnresolvedName(name) => {
                write!(f, "`{}` is not bound at runtime", ctx.interner.get(*name))
            }
            DanglingClosure => write!(f, "function called after its scope ended"),
            StackOverflow => write!(
                f,
                "maximum call depth of {} exceeded",
                eval::MAX_CALL_DEPTH
            ),
        }
    }
}
