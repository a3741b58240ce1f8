use std::fmt;

use crate::token::TokenKind;

/// The static types of FAP. The set is closed: programs can't define types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Float,
    Str,
    /// The type of statements and of calls which produce no value.
    None,
}

impl Type {
    pub fn from_token_kind(kind: TokenKind) -> Option<Type> {
        let ty = match kind {
            TokenKind::Int => Type::Int,
            TokenKind::Float => Type::Float,
            TokenKind::Str => Type::Str,
            TokenKind::None => Type::None,
            _ => return None,
        };
        Some(ty)
    }

    pub fn name(self) -> &'static str {
        match self {
            Type::Int => "int",
            Type::Float => "float",
            Type::Str => "str",
            Type::None => "None",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    /// Whether a value of type `actual` may be stored where `self` is
    /// expected. Besides equal types, `int` widens to `float`; the reverse
    /// never holds.
    pub fn accepts(self, actual: Type) -> bool {
        self == actual || (self == Type::Float && actual == Type::Int)
    }

    /// The type both operands of an arithmetic operation are widened to, or
    /// `None` if either operand isn't numeric.
    pub fn numeric_join(self, other: Type) -> Option<Type> {
        match (self, other) {
            (Type::Int, Type::Int) => Some(Type::Int),
            (Type::Int | Type::Float, Type::Int | Type::Float) => Some(Type::Float),
            _ => None,
        }
    }

    /// The type operands of a comparison are compared at, if they are
    /// comparable at all.
    pub fn comparison_join(self, other: Type) -> Option<Type> {
        match (self, other) {
            (Type::Str, Type::Str) => Some(Type::Str),
            _ => self.numeric_join(other),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What an expression evaluates to: a value of some type, or a condition.
///
/// Conditions (comparisons and their `and`/`or` combinations) are not
/// first-class values; they may only appear in `if` and `while` heads.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExprType {
    Value(Type),
    Condition,
}

impl ExprType {
    pub fn value(self) -> Option<Type> {
        match self {
            ExprType::Value(ty) => Some(ty),
            ExprType::Condition => None,
        }
    }
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprType::Value(ty) => ty.fmt(f),
            ExprType::Condition => f.write_str("condition"),
        }
    }
}
