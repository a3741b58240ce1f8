use log::debug;

use crate::{
    ast::{
        BinaryOperator, Block, Call, Expr, ExprKind, FunctionDecl, Ident, LogicalOperator,
        ModuleDoc, Param, Pragma, Program, Stmt, StmtKind, TypeName, UnaryOperator, Untyped,
        VarDecl,
    },
    lexer::{self, extract, Lexer},
    token::{Span, Spanned, Token, TokenKind},
    types::Type,
    util::{
        self,
        intern::{Interner, Symbol},
    },
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// How deeply blocks and expressions may nest. Every operator application
/// counts as one level, so this also bounds long operator chains.
pub const MAX_NESTING: usize = 512;

pub fn parse_program(src: &str, interner: &mut Interner) -> Result<Program<Untyped>> {
    let mut p = Parser::new(src, interner)?;
    let program = p.parse_program()?;
    debug!(
        "parsed {} top-level statements from {} tokens",
        program.body.len(),
        p.tokens_seen
    );
    Ok(program)
}

/// Parses a single expression, which must span the whole input.
pub fn parse_expr(src: &str, interner: &mut Interner) -> Result<Expr<Untyped>> {
    let mut p = Parser::new(src, interner)?;
    let expr = p.parse_expr()?;
    p.consume(TokenKind::Eof)?;
    Ok(expr)
}

struct Parser<'src, 'ident> {
    src: &'src str,
    lexer: Lexer<'src>,
    /// The single lookahead token. Never an error token.
    current: Token,
    interner: &'ident mut Interner,
    tokens_seen: usize,
    /// Current nesting level, see [`MAX_NESTING`].
    depth: usize,
}

/// Things introduced by `@`.
enum Directive {
    Doc(ModuleDoc),
    Pragma(Stmt<Untyped>),
}

impl Parser<'_, '_> {
    fn parse_program(&mut self) -> Result<Program<Untyped>> {
        let mut doc = None;
        let mut body = Vec::with_capacity(16);

        if self.is(TokenKind::At) {
            match self.parse_directive(true)? {
                Directive::Doc(parsed) => doc = Some(parsed),
                Directive::Pragma(stmt) => body.push(stmt),
            }
        }
        while !self.is(TokenKind::Eof) {
            body.push(self.parse_stmt()?);
        }
        Ok(Program { doc, body })
    }

    /// Parses `@None <text>` (only if `allow_doc`) or `@name=value`.
    fn parse_directive(&mut self, allow_doc: bool) -> Result<Directive> {
        let at = self.consume(TokenKind::At)?;

        if self.is(TokenKind::None) {
            let none = self.advance()?;
            if !allow_doc {
                return Err(at.span().to(none.span()).wrap(Error::MisplacedModuleDoc));
            }
            let text = self.consume(TokenKind::DocText)?;
            return Ok(Directive::Doc(ModuleDoc {
                text: extract::doc_text(text, self.src),
                span: at.span().to(text.span()),
            }));
        }

        let name = self.parse_ident()?;
        self.consume(TokenKind::Assign)?;
        let value = self.parse_ident()?;
        let span = at.span().to(value.span);

        if self.interner.get(name) != "debug" {
            return Err(name.span.wrap(Error::UnknownDirective(name.name)));
        }
        let enabled = match self.interner.get(value) {
            "true" => true,
            "false" => false,
            _ => return Err(value.span.wrap(Error::InvalidDirectiveValue(value.name))),
        };
        let kind = StmtKind::Pragma(Pragma::Debug(enabled));
        Ok(Directive::Pragma(Stmt { kind, span }))
    }

    fn parse_stmt(&mut self) -> Result<Stmt<Untyped>> {
        let token = self.current;
        match token.kind {
            TokenKind::At => match self.parse_directive(false)? {
                Directive::Pragma(stmt) => Ok(stmt),
                Directive::Doc(_) => unreachable!("docs are rejected past the header"),
            },
            TokenKind::Const | TokenKind::Int | TokenKind::Float | TokenKind::Str => {
                self.parse_var_decl()
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => {
                self.advance()?;
                let cond = self.parse_expr()?;
                let body = self.parse_block()?;
                let span = token.span().to(body.span);
                Ok(Stmt {
                    kind: StmtKind::While { cond, body },
                    span,
                })
            }
            TokenKind::Repeat => self.parse_repeat(),
            TokenKind::Func => self.parse_func(),
            TokenKind::Return => {
                self.advance()?;
                if starts_expr(self.current.kind) {
                    let value = self.parse_expr()?;
                    let span = token.span().to(value.span);
                    Ok(Stmt {
                        kind: StmtKind::Return(Some(value)),
                        span,
                    })
                } else {
                    Ok(Stmt {
                        kind: StmtKind::Return(None),
                        span: token.span(),
                    })
                }
            }
            TokenKind::Break => {
                self.advance()?;
                Ok(Stmt {
                    kind: StmtKind::Break,
                    span: token.span(),
                })
            }
            TokenKind::Continue => {
                self.advance()?;
                Ok(Stmt {
                    kind: StmtKind::Continue,
                    span: token.span(),
                })
            }
            TokenKind::Identifier => {
                self.advance()?;
                if self.take(TokenKind::Assign)? {
                    let target = self.ident_of(token);
                    let value = self.parse_expr()?;
                    let span = token.span().to(value.span);
                    return Ok(Stmt {
                        kind: StmtKind::Assign {
                            target,
                            hops: (),
                            value,
                        },
                        span,
                    });
                }
                let expr = self.parse_expr_bp_from(token, 0)?;
                Self::expr_stmt(expr)
            }
            kind if starts_expr(kind) => {
                let expr = self.parse_expr()?;
                Self::expr_stmt(expr)
            }
            other => Err(token
                .span()
                .wrap(Error::UnexpectedTokenInStmt { token: other })),
        }
    }

    fn expr_stmt(expr: Expr<Untyped>) -> Result<Stmt<Untyped>> {
        if !matches!(expr.kind, ExprKind::Call(_)) {
            return Err(expr.span.wrap(Error::ExprStmtNotCall));
        }
        let span = expr.span;
        Ok(Stmt {
            kind: StmtKind::Expr(expr),
            span,
        })
    }

    fn parse_var_decl(&mut self) -> Result<Stmt<Untyped>> {
        let start = self.current.span();
        let constant = self.take(TokenKind::Const)?;
        let ty = self.parse_type(false)?;
        let name = self.parse_ident()?;

        let init = if self.take(TokenKind::Assign)? {
            Some(self.parse_expr()?)
        } else if constant {
            return Err(name.span.wrap(Error::ConstWithoutInitializer(name.name)));
        } else {
            None
        };

        let end = init.as_ref().map_or(name.span, |init| init.span);
        let decl = VarDecl {
            constant,
            ty,
            name,
            init,
        };
        Ok(Stmt {
            kind: StmtKind::VarDecl(decl),
            span: start.to(end),
        })
    }

    fn parse_if(&mut self) -> Result<Stmt<Untyped>> {
        let depth = self.depth;
        let stmt = self.parse_if_at_depth();
        self.depth = depth;
        stmt
    }

    fn parse_if_at_depth(&mut self) -> Result<Stmt<Untyped>> {
        self.descend(self.current.span())?;
        let if_token = self.consume(TokenKind::If)?;
        let cond = self.parse_expr()?;
        let then_block = self.parse_block()?;

        let else_block = if self.take(TokenKind::Else)? {
            if self.is(TokenKind::If) {
                // `else if` is sugar for an else block with a single `if`.
                let nested = self.parse_if()?;
                let span = nested.span;
                Some(Block {
                    stmts: vec![nested],
                    span,
                })
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        let end = else_block.as_ref().map_or(then_block.span, |b| b.span);
        let kind = StmtKind::If {
            cond,
            then_block,
            else_block,
        };
        Ok(Stmt {
            kind,
            span: if_token.span().to(end),
        })
    }

    fn parse_repeat(&mut self) -> Result<Stmt<Untyped>> {
        let repeat = self.consume(TokenKind::Repeat)?;
        self.consume(TokenKind::LParen)?;
        let count = self.parse_expr()?;
        let counter = if self.take(TokenKind::Comma)? {
            Some(self.parse_ident()?)
        } else {
            None
        };
        self.consume(TokenKind::RParen)?;
        let body = self.parse_block()?;

        let span = repeat.span().to(body.span);
        let kind = StmtKind::Repeat {
            count,
            counter,
            body,
        };
        Ok(Stmt { kind, span })
    }

    fn parse_func(&mut self) -> Result<Stmt<Untyped>> {
        let func = self.consume(TokenKind::Func)?;
        let name = self.parse_ident()?;

        self.consume(TokenKind::LParen)?;
        let params = self.parse_list(TokenKind::RParen, TokenKind::Comma, |p| {
            let ty = p.parse_type(false)?;
            let name = p.parse_ident()?;
            Ok(Param { ty, name })
        })?;
        self.consume(TokenKind::RParen)?;

        let ret = if self.take(TokenKind::Arrow)? {
            Some(self.parse_type(true)?)
        } else {
            None
        };
        let body = self.parse_block()?;

        let span = func.span().to(body.span);
        let decl = FunctionDecl {
            name,
            params,
            ret,
            body,
        };
        Ok(Stmt {
            kind: StmtKind::Func(decl),
            span,
        })
    }

    fn parse_block(&mut self) -> Result<Block<Untyped>> {
        let depth = self.depth;
        let block = util::grow_stack(|| self.parse_block_at_depth());
        self.depth = depth;
        block
    }

    fn parse_block_at_depth(&mut self) -> Result<Block<Untyped>> {
        self.descend(self.current.span())?;
        let open = self.consume(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.is(TokenKind::RBrace) {
            if self.is(TokenKind::Eof) {
                return Err(self.unexpected(TokenKind::RBrace));
            }
            stmts.push(self.parse_stmt()?);
        }
        let close = self.consume(TokenKind::RBrace)?;
        Ok(Block {
            stmts,
            span: open.span().to(close.span()),
        })
    }

    /// Parses one of the value types, or also `None` if `allow_none`.
    fn parse_type(&mut self, allow_none: bool) -> Result<TypeName> {
        let token = self.current;
        match Type::from_token_kind(token.kind) {
            Some(ty) if ty != Type::None || allow_none => {
                self.advance()?;
                Ok(TypeName {
                    ty,
                    span: token.span(),
                })
            }
            _ => Err(token.span().wrap(Error::ExpectedType {
                actual: token.kind,
                allow_none,
            })),
        }
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.consume(TokenKind::Identifier)?;
        Ok(self.ident_of(token))
    }

    fn ident_of(&mut self, token: Token) -> Ident {
        Ident {
            name: self.interner.intern(extract::ident(token, self.src)),
            span: token.span(),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr<Untyped>> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr<Untyped>> {
        let lhs_token = self.advance()?;
        self.parse_expr_bp_from(lhs_token, min_bp)
    }

    /// Continues an expression whose first token was already consumed.
    fn parse_expr_bp_from(&mut self, lhs_token: Token, min_bp: u8) -> Result<Expr<Untyped>> {
        let depth = self.depth;
        let expr = util::grow_stack(|| self.parse_expr_chain(lhs_token, min_bp));
        self.depth = depth;
        expr
    }

    fn parse_expr_chain(&mut self, lhs_token: Token, min_bp: u8) -> Result<Expr<Untyped>> {
        self.descend(lhs_token.span())?;
        let mut lhs = self.parse_nud(lhs_token)?;

        loop {
            let op_token = self.current;

            if let Some((lbp, rbp)) = Self::infix_binding_power(op_token.kind) {
                if lbp < min_bp {
                    // Operator binds less tightly than the minimum required
                    break;
                }

                self.advance()?; // Operator
                // The new node holds `lhs`, one level down.
                self.descend(op_token.span())?;
                lhs = self.parse_led(op_token, lhs, rbp)?;
            } else {
                break;
            }
        }

        Ok(lhs)
    }

    /// nud: Parses tokens that start an expression
    /// (prefix operators, literals, grouping)
    fn parse_nud(&mut self, token: Token) -> Result<Expr<Untyped>> {
        let (kind, span) = match token.kind {
            TokenKind::Identifier => (ExprKind::Id(self.ident_of(token), ()), token.span()),
            TokenKind::IntLiteral => {
                let Ok(parsed) = extract::int(token, self.src) else {
                    return Err(token.span().wrap(Error::IntOutOfRange));
                };
                (ExprKind::Int(parsed), token.span())
            }
            TokenKind::FloatLiteral => {
                let Ok(parsed) = extract::float(token, self.src) else {
                    return Err(token.span().wrap(Error::InvalidFloat));
                };
                (ExprKind::Float(parsed), token.span())
            }
            TokenKind::String => (
                ExprKind::Str(extract::string(token, self.src)),
                token.span(),
            ),
            TokenKind::EscapedString => (
                ExprKind::Str(extract::escaped_string(token, self.src)),
                token.span(),
            ),

            // Grouping: ( expr )
            TokenKind::LParen => {
                let expr = self.parse_expr()?;
                let end = self.consume(TokenKind::RParen)?;
                (ExprKind::Paren(Box::new(expr)), token.span().to(end.span()))
            }

            // The `out` receiver is a keyword, hence it is not parsed as an
            // identifier.
            TokenKind::Out => {
                let receiver = Ident {
                    name: self.interner.intern("out"),
                    span: token.span(),
                };
                self.consume(TokenKind::Dot)?;
                let name = self.parse_ident()?;
                self.consume(TokenKind::LParen)?;
                let (call, end) = self.parse_call(Some(receiver), name)?;
                (ExprKind::Call(call), token.span().to(end))
            }

            TokenKind::Minus => {
                // SAFETY: Should have prefix due to above match
                let ((), rbp) = Self::prefix_binding_power(token.kind).unwrap();
                let expr = self.parse_expr_bp(rbp)?;
                let span = token.span().to(expr.span);
                let unary = ExprKind::Unary {
                    op: UnaryOperator::Neg,
                    expr: Box::new(expr),
                };
                (unary, span)
            }

            other => {
                let error = Error::UnexpectedTokenInExpr { token: other };
                return Err(token.span().wrap(error));
            }
        };

        Ok(Expr {
            kind,
            span,
            info: (),
        })
    }

    /// led: Parses tokens that follow a left-hand-side expression
    /// (infix operators and calls)
    fn parse_led(&mut self, op_token: Token, lhs: Expr<Untyped>, rbp: u8) -> Result<Expr<Untyped>> {
        let (kind, span) = match op_token.kind {
            TokenKind::And | TokenKind::Or => {
                let op = if op_token.kind == TokenKind::And {
                    LogicalOperator::And
                } else {
                    LogicalOperator::Or
                };
                let rhs = self.parse_expr_bp(rbp)?;
                let span = lhs.span.to(rhs.span);
                let logical = ExprKind::Logical {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                };
                (logical, span)
            }

            kind @ (TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::EqEq
            | TokenKind::NotEq
            | TokenKind::Less
            | TokenKind::LessEq
            | TokenKind::Greater
            | TokenKind::GreaterEq) => {
                let op = match kind {
                    TokenKind::Plus => BinaryOperator::Add,
                    TokenKind::Minus => BinaryOperator::Sub,
                    TokenKind::Star => BinaryOperator::Mul,
                    TokenKind::Slash => BinaryOperator::Div,
                    TokenKind::EqEq => BinaryOperator::Eq,
                    TokenKind::NotEq => BinaryOperator::Ne,
                    TokenKind::Less => BinaryOperator::Lt,
                    TokenKind::LessEq => BinaryOperator::Le,
                    TokenKind::Greater => BinaryOperator::Gt,
                    TokenKind::GreaterEq => BinaryOperator::Ge,
                    _ => unreachable!(),
                };
                // Parse right operand with correct precedence
                let rhs = self.parse_expr_bp(rbp)?;

                let span = lhs.span.to(rhs.span);
                let binary = ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                };
                (binary, span)
            }

            // Qualified call: ID . ID ( [expr [, expr]*] )
            TokenKind::Dot => {
                let ExprKind::Id(receiver, ()) = lhs.kind else {
                    return Err(lhs.span.wrap(Error::InvalidCallTarget));
                };
                let name = self.parse_ident()?;
                self.consume(TokenKind::LParen)?;
                let (call, end) = self.parse_call(Some(receiver), name)?;
                (ExprKind::Call(call), lhs.span.to(end))
            }

            // Plain call: ID ( [expr [, expr]*] )
            TokenKind::LParen => {
                let ExprKind::Id(name, ()) = lhs.kind else {
                    return Err(lhs.span.wrap(Error::InvalidCallTarget));
                };
                let (call, end) = self.parse_call(None, name)?;
                (ExprKind::Call(call), lhs.span.to(end))
            }

            other => {
                let error = Error::UnexpectedOperator { actual: other };
                return Err(op_token.span().wrap(error));
            }
        };

        Ok(Expr {
            kind,
            span,
            info: (),
        })
    }

    /// Parses the arguments of a call whose opening parenthesis was already
    /// consumed. Returns the span of the closing parenthesis as well.
    fn parse_call(&mut self, receiver: Option<Ident>, name: Ident) -> Result<(Call<Untyped>, Span)> {
        let args = self.parse_list(TokenKind::RParen, TokenKind::Comma, Parser::parse_expr)?;
        let end = self.consume(TokenKind::RParen)?;
        let call = Call {
            receiver,
            name,
            args,
            callee: (),
        };
        Ok((call, end.span()))
    }

    /// Parses `item (delim item)*` until `end_delim` is found. Does **NOT**
    /// consume the end delimiter.
    fn parse_list<T>(
        &mut self,
        end_delim: TokenKind,
        separator: TokenKind,
        parse_item: impl Fn(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        debug_assert_ne!(end_delim, separator);

        let mut items = Vec::new();
        while !self.is(end_delim) && !self.is(TokenKind::Eof) {
            items.push(parse_item(self)?);

            // After consuming an item, we must consume the separator, unless
            // the list is over.
            if !self.take(separator)? {
                if self.is(end_delim) {
                    break;
                }
                let c = self.current;
                return Err(c.span().wrap(Error::UnexpectedAny {
                    actual: c.kind,
                    expected: Box::from([separator, end_delim]),
                }));
            }
        }
        Ok(items)
    }

    fn infix_binding_power(kind: TokenKind) -> Option<(u8, u8)> {
        let bp = match kind {
            TokenKind::Or => (1, 2),
            TokenKind::And => (3, 4),

            // Comparisons (left-associative)
            TokenKind::EqEq
            | TokenKind::NotEq
            | TokenKind::Less
            | TokenKind::LessEq
            | TokenKind::Greater
            | TokenKind::GreaterEq => (5, 6),

            TokenKind::Plus | TokenKind::Minus => (7, 8),
            TokenKind::Star | TokenKind::Slash => (9, 10),

            // Calls, qualified or not.
            TokenKind::Dot | TokenKind::LParen => (13, 14),

            _ => return None,
        };
        Some(bp)
    }

    fn prefix_binding_power(kind: TokenKind) -> Option<((), u8)> {
        let bp = match kind {
            // Arithmetic negation binds tighter than `*`, looser than calls.
            TokenKind::Minus => ((), 11),
            _ => return None,
        };
        Some(bp)
    }
}

impl<'src, 'ident> Parser<'src, 'ident> {
    fn new(src: &'src str, interner: &'ident mut Interner) -> Result<Parser<'src, 'ident>> {
        let mut p = Parser {
            src,
            lexer: Lexer::new(src),
            current: Token::eof_for(src),
            interner,
            tokens_seen: 0,
            depth: 0,
        };
        p.bump()?;
        Ok(p)
    }
}

impl Parser<'_, '_> {
    /// Loads the next token from the lexer. Lexical errors surface here, so
    /// that they are reported in source order with the parse errors.
    fn bump(&mut self) -> Result<()> {
        let next = self.lexer.next().unwrap_or_else(|| Token::eof_for(self.src));
        if let TokenKind::Error(error) = next.kind {
            return Err(next.span().wrap(Error::Lexer(error)));
        }
        self.tokens_seen += 1;
        self.current = next;
        Ok(())
    }

    /// Returns the current token and advances.
    fn advance(&mut self) -> Result<Token> {
        let c = self.current;
        if !c.is_eof() {
            self.bump()?;
        }
        Ok(c)
    }

    /// Checks whether the current token matches the given one.
    fn is(&self, expect: TokenKind) -> bool {
        self.current.kind == expect
    }

    /// Advances if the current token matches the provided one, returning true.
    /// If not, returns false and doesn't advance.
    fn take(&mut self, expect: TokenKind) -> Result<bool> {
        if self.is(expect) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Advances if the current token matches the provided one. If not,
    /// fails.
    fn consume(&mut self, expect: TokenKind) -> Result<Token> {
        if self.is(expect) {
            self.advance()
        } else {
            Err(self.unexpected(expect))
        }
    }

    /// Enters one more nesting level. Callers restore `depth` once done.
    fn descend(&mut self, span: Span) -> Result<()> {
        if self.depth >= MAX_NESTING {
            return Err(span.wrap(Error::TooDeeplyNested));
        }
        self.depth += 1;
        Ok(())
    }

    fn unexpected(&self, expected: TokenKind) -> Spanned<Error> {
        let c = self.current;
        c.span().wrap(Error::Unexpected {
            actual: c.kind,
            expected,
        })
    }
}

fn starts_expr(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Identifier
            | TokenKind::Out
            | TokenKind::IntLiteral
            | TokenKind::FloatLiteral
            | TokenKind::String
            | TokenKind::EscapedString
            | TokenKind::LParen
            | TokenKind::Minus
    )
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// An invalid token produced by the lexer.
    Lexer(lexer::Error),
    UnexpectedTokenInExpr {
        token: TokenKind,
    },
    UnexpectedTokenInStmt {
        token: TokenKind,
    },
    Unexpected {
        actual: TokenKind,
        expected: TokenKind,
    },
    UnexpectedAny {
        actual: TokenKind,
        expected: Box<[TokenKind]>,
    },
    UnexpectedOperator {
        actual: TokenKind,
    },
    ExpectedType {
        actual: TokenKind,
        allow_none: bool,
    },
    InvalidCallTarget,
    ExprStmtNotCall,
    ConstWithoutInitializer(Symbol),
    MisplacedModuleDoc,
    UnknownDirective(Symbol),
    InvalidDirectiveValue(Symbol),
    IntOutOfRange,
    InvalidFloat,
    /// Past [`MAX_NESTING`].
    TooDeeplyNested,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_utils::{format_errors, tree_tests};

    tree_tests!(
        use parser;

        fn test_simple_expression() {
            let expr = "(1 * 2 + 3) - (1 + 2 * 3)";
            let tree_ok = "
                binary Sub (0..25)
                  paren (0..11)
                    binary Add (1..10)
                      binary Mul (1..6)
                        int 1 (1..2)
                        int 2 (5..6)
                      int 3 (9..10)
                  paren (14..25)
                    binary Add (15..24)
                      int 1 (15..16)
                      binary Mul (19..24)
                        int 2 (19..20)
                        int 3 (23..24)
            ";
        }

        fn test_literals() {
            let expr = r#"f(12345, 2.5, "hello world", 'it\'s')"#;
            let tree_ok = r#"
                call f (0..37)
                  int 12345 (2..7)
                  float 2.5 (9..12)
                  string "hello world" (14..27)
                  string "it's" (29..36)
            "#;
        }

        fn test_unary_negation_binds_tighter_than_mul() {
            let expr = "-a * -f(b)";
            let tree_ok = "
                binary Mul (0..10)
                  unary Neg (0..2)
                    ident a (1..2)
                  unary Neg (5..10)
                    call f (6..10)
                      ident b (8..9)
            ";
        }

        fn test_left_associativity() {
            let expr = "a - b - c / d / e";
            let tree_ok = "
                binary Sub (0..17)
                  binary Sub (0..5)
                    ident a (0..1)
                    ident b (4..5)
                  binary Div (8..17)
                    binary Div (8..13)
                      ident c (8..9)
                      ident d (12..13)
                    ident e (16..17)
            ";
        }

        fn test_logical_precedence() {
            let expr = "a < b or c == d and e >= 1";
            let tree_ok = "
                logical Or (0..26)
                  binary Lt (0..5)
                    ident a (0..1)
                    ident b (4..5)
                  logical And (9..26)
                    binary Eq (9..15)
                      ident c (9..10)
                      ident d (14..15)
                    binary Ge (20..26)
                      ident e (20..21)
                      int 1 (25..26)
            ";
        }

        fn test_qualified_calls() {
            let expr = "math.pow(out.Info(), x + 1)";
            let tree_ok = "
                call math.pow (0..27)
                  call out.Info (9..19)
                  binary Add (21..26)
                    ident x (21..22)
                    int 1 (25..26)
            ";
        }

        fn test_hello_world() {
            let program = "@None My First FAP Program\nout.Info(\"Hello, World!\")";
            let tree_ok = r#"
                doc "My First FAP Program" (0..26)
                call out.Info (27..52)
                  string "Hello, World!" (36..51)
            "#;
        }

        fn test_declarations_and_assignment() {
            let program = "
                int x = 5
                const float y = x
                str s
                x = x + 1
            ";
            let tree_ok = "
                var int x (17..26)
                  int 5 (25..26)
                const float y (43..60)
                  ident x (59..60)
                var str s (77..82)
                assign x (99..108)
                  binary Add (103..108)
                    ident x (103..104)
                    int 1 (107..108)
            ";
        }

        fn test_if_else_if_chain() {
            let program = "if a < 1 { f() } else if a < 2 { g() } else { h() }";
            let tree_ok = "
                if (0..51)
                  binary Lt (3..8)
                    ident a (3..4)
                    int 1 (7..8)
                  block (9..16)
                    call f (11..14)
                  block (22..51)
                    if (22..51)
                      binary Lt (25..30)
                        ident a (25..26)
                        int 2 (29..30)
                      block (31..38)
                        call g (33..36)
                      block (44..51)
                        call h (46..49)
            ";
        }

        fn test_loops() {
            let program = "while n > 0 { n = n - 1 continue } repeat (3, i) { break }";
            let tree_ok = "
                while (0..34)
                  binary Gt (6..11)
                    ident n (6..7)
                    int 0 (10..11)
                  block (12..34)
                    assign n (14..23)
                      binary Sub (18..23)
                        ident n (18..19)
                        int 1 (22..23)
                    continue (24..32)
                repeat i (35..58)
                  int 3 (43..44)
                  block (49..58)
                    break (51..56)
            ";
        }

        fn test_function_declaration() {
            let program = "func add(int a, float b) -> float { return a + b } func hi() { return }";
            let tree_ok = "
                func add(int a, float b) -> float (0..50)
                  block (34..50)
                    return (36..48)
                      binary Add (43..48)
                        ident a (43..44)
                        ident b (47..48)
                func hi() -> None (51..71)
                  block (61..71)
                    return (63..69)
            ";
        }

        fn test_debug_pragma() {
            let program = "@debug=true\nint x = 1\n@debug=false";
            let tree_ok = "
                pragma debug=true (0..11)
                var int x (12..21)
                  int 1 (20..21)
                pragma debug=false (22..34)
            ";
        }

        fn test_error_lexer_unclosed_string() {
            let program = r#"out.Info("unterminated"#;
            let expected_errors = &["9..22: unterminated string literal"];
        }

        fn test_error_lexer_error_comes_first_in_source_order() {
            let program = "int x = 1 $ x = ";
            let expected_errors = &["10..11: unexpected character `$`"];
        }

        fn test_error_parse_int_too_large() {
            let expr = "999999999999999999999999999999";
            let expected_errors = &["0..30: integer literal out of range"];
        }

        fn test_error_unexpected_token_in_expr() {
            let expr = "1 + )";
            let expected_errors = &["4..5: unexpected `)` in expression"];
        }

        fn test_error_unmatched_paren_open() {
            let expr = "(1 + 2";
            let expected_errors = &["6..6: expected `)`, but got end of file"];
        }

        fn test_error_expression_statement_must_be_a_call() {
            let program = "x + 1";
            let expected_errors = &["0..5: only calls can be used as statements"];
        }

        fn test_error_invalid_call_target() {
            let expr = "(f)(1)";
            let expected_errors = &["0..3: only named functions can be called"];
        }

        fn test_error_const_needs_initializer() {
            let program = "const int x";
            let expected_errors = &["10..11: constant `x` must be initialized"];
        }

        fn test_error_misplaced_module_doc() {
            let program = "int x = 1\n@None late";
            let expected_errors = &["10..15: the module description must come first"];
        }

        fn test_error_unknown_directive() {
            let program = "@trace=true";
            let expected_errors = &["1..6: unknown directive `trace`"];
        }

        fn test_error_invalid_directive_value() {
            let program = "@debug=yes";
            let expected_errors = &["7..10: invalid value `yes` for directive, expected `true` or `false`"];
        }

        fn test_error_variable_of_type_none() {
            let program = "None x = 1";
            let expected_errors = &["0..4: unexpected `None` at the start of a statement"];
        }

        fn test_error_parameter_of_type_none() {
            let program = "func f(None x) {}";
            let expected_errors = &["7..11: expected a type (`int`, `float` or `str`), but got `None`"];
        }

        fn test_error_unclosed_block() {
            let program = "while a < b { f()";
            let expected_errors = &["17..17: expected `}`, but got end of file"];
        }

        fn test_error_missing_argument_separator() {
            let expr = "f(a b)";
            let expected_errors = &["4..5: expected one of `,` or `)`, but got identifier"];
        }
    );

    fn nesting_errors(src: &str) -> Vec<String> {
        let mut interner = Interner::with_capacity(8);
        match parse_program(src, &mut interner) {
            Ok(_) => vec![],
            Err(error) => format_errors(&interner, &[error]),
        }
    }

    #[test]
    fn test_deeply_nested_parentheses_are_rejected() {
        let depth = 20_000;
        let src = format!("int x = {}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(
            nesting_errors(&src),
            ["520..521: nesting is too deep (the limit is 512 levels)"]
        );
    }

    #[test]
    fn test_deeply_nested_blocks_are_rejected() {
        let depth = 600;
        let src = format!("{}{}", "while a { ".repeat(depth), "}".repeat(depth));
        assert_eq!(
            nesting_errors(&src),
            ["5126..5127: nesting is too deep (the limit is 512 levels)"]
        );
    }

    #[test]
    fn test_long_operator_chains_within_the_limit() {
        let src = format!("int x = 1{}", " + 1".repeat(299));
        assert_eq!(nesting_errors(&src), Vec::<String>::new());
    }
}
