use std::{collections::HashMap, mem};

use log::{debug, trace};

use crate::{
    ast::{
        BinaryOperator, Block, Call, Callee, Expr, ExprKind, FunctionDecl, Hops, Ident, Param,
        Program, Stmt, StmtKind, Typed, UnaryOperator, Untyped, VarDecl,
    },
    builtins::{self, Params},
    token::{Span, Spanned},
    types::{ExprType, Type},
    util::{
        self,
        intern::{Interner, Symbol},
    },
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

pub struct Checker<'ident> {
    interner: &'ident Interner,
    scopes: Vec<HashMap<Symbol, Entry>>,
    warnings: Vec<Spanned<Warning>>,
    /// Number of loops enclosing the current statement, within the current
    /// function.
    loop_depth: usize,
    /// Return type of the function being checked, if any.
    function: Option<Type>,
}

#[derive(Clone, Debug)]
enum Entry {
    Var {
        ty: Type,
        constant: bool,
        span: Span,
        read: bool,
        /// Whether to warn if the variable is never read. Parameters and
        /// loop counters are exempt.
        warn_unused: bool,
    },
    Func {
        params: Box<[Type]>,
        ret: Type,
        span: Span,
    },
}

impl Entry {
    fn span(&self) -> Span {
        match self {
            Entry::Var { span, .. } | Entry::Func { span, .. } => *span,
        }
    }
}

impl<'ident> Checker<'ident> {
    pub fn with_capacity(interner: &'ident Interner, capacity: usize) -> Checker<'ident> {
        let mut scopes = Vec::with_capacity(8);
        scopes.push(HashMap::with_capacity(capacity));
        Checker {
            interner,
            scopes,
            warnings: Vec::new(),
            loop_depth: 0,
            function: None,
        }
    }

    /// Checks the whole program, producing its typed version along with any
    /// warnings, sorted by position. Stops at the first error.
    pub fn check(
        mut self,
        program: Program<Untyped>,
    ) -> Result<(Program<Typed>, Vec<Spanned<Warning>>)> {
        debug!("type checking {} top-level statements", program.body.len());
        let body = self.check_stmts(program.body)?;
        self.pop_scope();
        debug_assert!(self.scopes.is_empty());

        self.warnings.sort_by_key(|w| w.span.lo);
        debug!("type check done with {} warnings", self.warnings.len());
        let program = Program {
            doc: program.doc,
            body,
        };
        Ok((program, self.warnings))
    }

    fn check_stmts(&mut self, stmts: Vec<Stmt<Untyped>>) -> Result<Vec<Stmt<Typed>>> {
        stmts.into_iter().map(|s| self.check_stmt(s)).collect()
    }

    fn check_block(&mut self, block: Block<Untyped>) -> Result<Block<Typed>> {
        self.push_scope();
        let stmts = self.check_stmts(block.stmts)?;
        self.pop_scope();
        Ok(Block {
            stmts,
            span: block.span,
        })
    }

    fn check_stmt(&mut self, stmt: Stmt<Untyped>) -> Result<Stmt<Typed>> {
        util::grow_stack(|| self.check_stmt_kind(stmt))
    }

    fn check_stmt_kind(&mut self, stmt: Stmt<Untyped>) -> Result<Stmt<Typed>> {
        let span = stmt.span;
        let kind = match stmt.kind {
            StmtKind::Pragma(pragma) => StmtKind::Pragma(pragma),
            StmtKind::VarDecl(decl) => StmtKind::VarDecl(self.check_var_decl(decl)?),
            StmtKind::Assign {
                target,
                hops: (),
                value,
            } => {
                let value = self.check_value(value)?;
                let actual = value_type(&value);
                let hops = match self.lookup(target.name) {
                    None => return Err(target.span.wrap(Error::UndefinedName(target.name))),
                    Some((_, Entry::Func { .. })) => {
                        return Err(target.span.wrap(Error::NotAVariable(target.name)));
                    }
                    Some((_, &Entry::Var { constant: true, .. })) => {
                        return Err(span.wrap(Error::ConstAssignment(target.name)));
                    }
                    Some((_, &Entry::Var { ty, .. })) if !ty.accepts(actual) => {
                        return Err(span.wrap(Error::Mismatch {
                            expected: ty,
                            actual,
                        }));
                    }
                    Some((hops, Entry::Var { .. })) => hops,
                };
                StmtKind::Assign {
                    target,
                    hops,
                    value,
                }
            }
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => StmtKind::If {
                cond: self.check_cond(cond)?,
                then_block: self.check_block(then_block)?,
                else_block: else_block.map(|b| self.check_block(b)).transpose()?,
            },
            StmtKind::While { cond, body } => {
                let cond = self.check_cond(cond)?;
                self.loop_depth += 1;
                let body = self.check_block(body)?;
                self.loop_depth -= 1;
                StmtKind::While { cond, body }
            }
            StmtKind::Repeat {
                count,
                counter,
                body,
            } => {
                let count = self.check_value(count)?;
                let actual = value_type(&count);
                if actual != Type::Int {
                    return Err(count.span.wrap(Error::Mismatch {
                        expected: Type::Int,
                        actual,
                    }));
                }
                self.push_scope();
                if let Some(counter) = counter {
                    self.declare_var(counter, Type::Int, true, false)?;
                }
                self.loop_depth += 1;
                let body = self.check_block(body)?;
                self.loop_depth -= 1;
                self.pop_scope();
                StmtKind::Repeat {
                    count,
                    counter,
                    body,
                }
            }
            StmtKind::Func(decl) => StmtKind::Func(self.check_function(decl)?),
            StmtKind::Return(value) => StmtKind::Return(self.check_return(span, value)?),
            StmtKind::Break if self.loop_depth == 0 => {
                return Err(span.wrap(Error::BreakOutsideLoop));
            }
            StmtKind::Continue if self.loop_depth == 0 => {
                return Err(span.wrap(Error::ContinueOutsideLoop));
            }
            StmtKind::Break => StmtKind::Break,
            StmtKind::Continue => StmtKind::Continue,
            StmtKind::Expr(expr) => StmtKind::Expr(self.check_value(expr)?),
        };
        Ok(Stmt { kind, span })
    }

    fn check_var_decl(&mut self, decl: VarDecl<Untyped>) -> Result<VarDecl<Typed>> {
        let VarDecl {
            constant,
            ty,
            name,
            init,
        } = decl;

        // The initializer is checked before the name is declared, so that it
        // refers to any outer binding of the same name.
        let init = init.map(|init| self.check_value(init)).transpose()?;
        if let Some(init) = &init {
            let actual = value_type(init);
            if !ty.ty.accepts(actual) {
                return Err(init.span.wrap(Error::Mismatch {
                    expected: ty.ty,
                    actual,
                }));
            }
        }
        self.declare_var(name, ty.ty, constant, true)?;

        Ok(VarDecl {
            constant,
            ty,
            name,
            init,
        })
    }

    fn check_function(&mut self, decl: FunctionDecl<Untyped>) -> Result<FunctionDecl<Typed>> {
        let ret = decl.return_type();
        let FunctionDecl {
            name,
            params,
            ret: ret_name,
            body,
        } = decl;

        // Declared before the body is checked, so that it may call itself.
        let entry = Entry::Func {
            params: params.iter().map(|p| p.ty.ty).collect(),
            ret,
            span: name.span,
        };
        self.declare(name, entry)?;

        // Parameters and the top-level statements of the body share a scope.
        self.push_scope();
        for &Param { ty, name } in &params {
            self.declare_var(name, ty.ty, false, false)?;
        }
        let saved_loop_depth = mem::take(&mut self.loop_depth);
        let saved_function = self.function.replace(ret);
        let stmts = self.check_stmts(body.stmts)?;
        self.loop_depth = saved_loop_depth;
        self.function = saved_function;
        self.pop_scope();

        if ret != Type::None && !always_returns(&stmts) {
            return Err(name.span.wrap(Error::MissingReturn(name.name)));
        }

        Ok(FunctionDecl {
            name,
            params,
            ret: ret_name,
            body: Block {
                stmts,
                span: body.span,
            },
        })
    }

    fn check_return(
        &mut self,
        span: Span,
        value: Option<Expr<Untyped>>,
    ) -> Result<Option<Expr<Typed>>> {
        let Some(expected) = self.function else {
            return Err(span.wrap(Error::ReturnOutsideFunction));
        };
        let Some(value) = value else {
            if expected != Type::None {
                return Err(span.wrap(Error::Mismatch {
                    expected,
                    actual: Type::None,
                }));
            }
            return Ok(None);
        };
        let value = self.check_value(value)?;
        let actual = value_type(&value);
        if !expected.accepts(actual) {
            return Err(value.span.wrap(Error::Mismatch { expected, actual }));
        }
        Ok(Some(value))
    }

    /// Checks an expression which must produce a value.
    fn check_value(&mut self, expr: Expr<Untyped>) -> Result<Expr<Typed>> {
        let expr = self.check_expr(expr)?;
        match expr.info {
            ExprType::Value(_) => Ok(expr),
            ExprType::Condition => Err(expr.span.wrap(Error::ConditionAsValue)),
        }
    }

    /// Checks an expression which must produce a condition.
    fn check_cond(&mut self, expr: Expr<Untyped>) -> Result<Expr<Typed>> {
        let expr = self.check_expr(expr)?;
        match expr.info {
            ExprType::Condition => Ok(expr),
            ExprType::Value(ty) => Err(expr.span.wrap(Error::ExpectedCondition(ty))),
        }
    }

    fn check_expr(&mut self, expr: Expr<Untyped>) -> Result<Expr<Typed>> {
        util::grow_stack(|| self.check_expr_kind(expr))
    }

    fn check_expr_kind(&mut self, expr: Expr<Untyped>) -> Result<Expr<Typed>> {
        let span = expr.span;
        let (kind, info) = match expr.kind {
            ExprKind::Int(i) => (ExprKind::Int(i), ExprType::Value(Type::Int)),
            ExprKind::Float(f) => (ExprKind::Float(f), ExprType::Value(Type::Float)),
            ExprKind::Str(s) => (ExprKind::Str(s), ExprType::Value(Type::Str)),
            ExprKind::Id(ident, ()) => {
                let (ty, hops) = self.read_var(ident)?;
                (ExprKind::Id(ident, hops), ExprType::Value(ty))
            }
            ExprKind::Paren(inner) => {
                let inner = self.check_expr(*inner)?;
                let info = inner.info;
                (ExprKind::Paren(Box::new(inner)), info)
            }
            ExprKind::Unary {
                op: UnaryOperator::Neg,
                expr: inner,
            } => {
                let inner = self.check_value(*inner)?;
                let ty = value_type(&inner);
                if !ty.is_numeric() {
                    return Err(span.wrap(Error::InvalidNegation(ty)));
                }
                let kind = ExprKind::Unary {
                    op: UnaryOperator::Neg,
                    expr: Box::new(inner),
                };
                (kind, ExprType::Value(ty))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.check_value(*lhs)?;
                let rhs = self.check_value(*rhs)?;
                let (l, r) = (value_type(&lhs), value_type(&rhs));
                let info = if op.is_comparison() {
                    l.comparison_join(r).map(|_| ExprType::Condition)
                } else if op == BinaryOperator::Add && (l, r) == (Type::Str, Type::Str) {
                    Some(ExprType::Value(Type::Str))
                } else {
                    l.numeric_join(r).map(ExprType::Value)
                };
                let Some(info) = info else {
                    return Err(span.wrap(Error::InvalidOperands { op, lhs: l, rhs: r }));
                };
                let kind = ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                };
                (kind, info)
            }
            ExprKind::Logical { op, lhs, rhs } => {
                let kind = ExprKind::Logical {
                    op,
                    lhs: Box::new(self.check_cond(*lhs)?),
                    rhs: Box::new(self.check_cond(*rhs)?),
                };
                (kind, ExprType::Condition)
            }
            ExprKind::Call(call) => {
                let (call, ty) = self.check_call(span, call)?;
                (ExprKind::Call(call), ExprType::Value(ty))
            }
        };
        Ok(Expr { kind, span, info })
    }

    fn check_call(&mut self, span: Span, call: Call<Untyped>) -> Result<(Call<Typed>, Type)> {
        let Call {
            receiver,
            name,
            args,
            callee: (),
        } = call;
        let args = args
            .into_iter()
            .map(|arg| self.check_value(arg))
            .collect::<Result<Vec<_>>>()?;

        let (callee, ret) = if let Some(receiver) = receiver {
            let Some(id) = builtins::lookup(self.interner.get(receiver), self.interner.get(name))
            else {
                let error = Error::UnknownBuiltin {
                    receiver: receiver.name,
                    name: name.name,
                };
                return Err(receiver.span.to(name.span).wrap(error));
            };
            let builtin = id.get();
            match builtin.params {
                Params::Variadic(kind) => {
                    for (position, arg) in args.iter().enumerate() {
                        let actual = value_type(arg);
                        if !kind.accepts(actual) {
                            return Err(arg_mismatch(arg, position, kind.describe(), actual));
                        }
                    }
                }
                Params::Fixed(kinds) => {
                    check_arity(span, kinds.len(), args.len())?;
                    for (position, (arg, kind)) in args.iter().zip(kinds).enumerate() {
                        let actual = value_type(arg);
                        if !kind.accepts(actual) {
                            return Err(arg_mismatch(arg, position, kind.describe(), actual));
                        }
                    }
                }
            }
            let ret = builtin.returns.resolve(args.iter().map(value_type));
            (Callee::Builtin(id), ret)
        } else {
            let (hops, params, ret) = match self.lookup(name.name) {
                None => return Err(name.span.wrap(Error::UndefinedFunction(name.name))),
                Some((_, Entry::Var { .. })) => {
                    return Err(name.span.wrap(Error::NotAFunction(name.name)));
                }
                Some((hops, Entry::Func { params, ret, .. })) => (hops, params.clone(), *ret),
            };
            check_arity(span, params.len(), args.len())?;
            for (position, (arg, &param)) in args.iter().zip(params.iter()).enumerate() {
                let actual = value_type(arg);
                if !param.accepts(actual) {
                    return Err(arg_mismatch(arg, position, param.name(), actual));
                }
            }
            (Callee::Function(hops), ret)
        };

        let call = Call {
            receiver,
            name,
            args,
            callee,
        };
        Ok((call, ret))
    }

    /// Resolves a variable read, marking it as used.
    fn read_var(&mut self, ident: Ident) -> Result<(Type, Hops)> {
        let entry = self
            .scopes
            .iter_mut()
            .rev()
            .enumerate()
            .find_map(|(hops, scope)| Some((Hops(hops), scope.get_mut(&ident.name)?)));
        match entry {
            None => Err(ident.span.wrap(Error::UndefinedName(ident.name))),
            Some((_, Entry::Func { .. })) => {
                Err(ident.span.wrap(Error::NotAVariable(ident.name)))
            }
            Some((hops, Entry::Var { ty, read, .. })) => {
                *read = true;
                Ok((*ty, hops))
            }
        }
    }
}

impl Checker<'_> {
    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Drops the innermost scope, warning about its unread variables.
    fn pop_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };
        for (name, entry) in scope {
            if let Entry::Var {
                span,
                read: false,
                warn_unused: true,
                ..
            } = entry
            {
                self.warnings.push(span.wrap(Warning::Unused(name)));
            }
        }
    }

    /// Finds the innermost declaration of `name`, along with how many scopes
    /// up it lives.
    fn lookup(&self, name: Symbol) -> Option<(Hops, &Entry)> {
        self.scopes
            .iter()
            .rev()
            .enumerate()
            .find_map(|(hops, scope)| Some((Hops(hops), scope.get(&name)?)))
    }

    fn declare_var(
        &mut self,
        name: Ident,
        ty: Type,
        constant: bool,
        warn_unused: bool,
    ) -> Result<()> {
        let entry = Entry::Var {
            ty,
            constant,
            span: name.span,
            read: false,
            warn_unused,
        };
        self.declare(name, entry)
    }

    /// Declares `name` in the innermost scope. Shadowing outer scopes is
    /// fine; redeclaring within the same scope isn't.
    fn declare(&mut self, name: Ident, entry: Entry) -> Result<()> {
        trace!("declare {}: {entry:?}", self.interner.get(name));
        let scope = self
            .scopes
            .last_mut()
            .expect("there is always an enclosing scope");
        if let Some(other) = scope.get(&name.name) {
            let error = Error::Redeclaration {
                name: name.name,
                other_definition_span: other.span(),
            };
            return Err(name.span.wrap(error));
        }
        scope.insert(name.name, entry);
        Ok(())
    }
}

fn value_type(expr: &Expr<Typed>) -> Type {
    expr.info
        .value()
        .expect("expression was checked to produce a value")
}

fn check_arity(span: Span, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(span.wrap(Error::ArityMismatch { expected, actual }))
    }
}

fn arg_mismatch(
    arg: &Expr<Typed>,
    position: usize,
    expected: &'static str,
    actual: Type,
) -> Spanned<Error> {
    arg.span.wrap(Error::ArgumentMismatch {
        position: position + 1,
        expected,
        actual,
    })
}

/// Whether every path through `stmts` ends in a `return`.
fn always_returns(stmts: &[Stmt<Typed>]) -> bool {
    stmts.iter().any(|stmt| match &stmt.kind {
        StmtKind::Return(_) => true,
        StmtKind::If {
            then_block,
            else_block: Some(else_block),
            ..
        } => always_returns(&then_block.stmts) && always_returns(&else_block.stmts),
        _ => false,
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    UndefinedName(Symbol),
    UndefinedFunction(Symbol),
    UnknownBuiltin {
        receiver: Symbol,
        name: Symbol,
    },
    NotAFunction(Symbol),
    NotAVariable(Symbol),
    Redeclaration {
        name: Symbol,
        other_definition_span: Span,
    },
    Mismatch {
        expected: Type,
        actual: Type,
    },
    ConstAssignment(Symbol),
    InvalidOperands {
        op: BinaryOperator,
        lhs: Type,
        rhs: Type,
    },
    InvalidNegation(Type),
    ExpectedCondition(Type),
    ConditionAsValue,
    ArityMismatch {
        expected: usize,
        actual: usize,
    },
    ArgumentMismatch {
        /// One-based.
        position: usize,
        expected: &'static str,
        actual: Type,
    },
    ReturnOutsideFunction,
    BreakOutsideLoop,
    ContinueOutsideLoop,
    MissingReturn(Symbol),
}

/// Non-fatal findings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Warning {
    Unused(Symbol),
}
