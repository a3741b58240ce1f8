use std::{cmp::Ordering, io, mem, rc::Rc};

use log::debug;

use crate::{
    ast::{
        BinaryOperator, Block, Call, Callee, Expr, ExprKind, Hops, LogicalOperator, Pragma,
        Program, Stmt, StmtKind, Typed, UnaryOperator, VarDecl,
    },
    builtins,
    env::{Binding, Scope},
    host::Host,
    token::{Span, Spanned},
    types::Type,
    util::{
        self,
        intern::{Interner, Symbol},
    },
    value::{Closure, Value},
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Nesting limit for user function calls.
pub const MAX_CALL_DEPTH: usize = 256;

/// Tree-walking interpreter over a checked program.
pub struct Evaluator<'p, 'h> {
    interner: &'h Interner,
    host: &'h mut dyn Host,
    scope: Rc<Scope<'p>>,
    /// Set by `@debug=true`; sends `[ENV]` lines to the host.
    debug: bool,
    produced_output: bool,
    depth: usize,
}

/// How a statement completed.
enum Flow<'p> {
    Normal,
    Break,
    Continue,
    Return(Value<'p>),
}

impl<'p, 'h> Evaluator<'p, 'h> {
    pub fn new(interner: &'h Interner, host: &'h mut dyn Host) -> Evaluator<'p, 'h> {
        Evaluator {
            interner,
            host,
            scope: Scope::root(),
            debug: false,
            produced_output: false,
            depth: 0,
        }
    }

    pub fn run(&mut self, program: &'p Program<Typed>) -> Result<()> {
        debug!("evaluating {} top-level statements", program.body.len());
        self.exec_stmts(&program.body)?;
        debug!("evaluation finished (output: {})", self.produced_output);
        Ok(())
    }

    /// Whether any output built-in ran.
    pub fn produced_output(&self) -> bool {
        self.produced_output
    }

    fn exec_stmts(&mut self, stmts: &'p [Stmt<Typed>]) -> Result<Flow<'p>> {
        for stmt in stmts {
            let flow = self.exec_stmt(stmt)?;
            if !matches!(flow, Flow::Normal) {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    /// Runs `block` in a fresh child of the current scope.
    fn exec_block(&mut self, block: &'p Block<Typed>) -> Result<Flow<'p>> {
        let inner = Scope::child(&self.scope);
        let outer = mem::replace(&mut self.scope, inner);
        let flow = self.exec_stmts(&block.stmts);
        self.scope = outer;
        flow
    }

    fn exec_stmt(&mut self, stmt: &'p Stmt<Typed>) -> Result<Flow<'p>> {
        util::grow_stack(|| self.exec_stmt_kind(stmt))
    }

    fn exec_stmt_kind(&mut self, stmt: &'p Stmt<Typed>) -> Result<Flow<'p>> {
        match &stmt.kind {
            StmtKind::Pragma(Pragma::Debug(on)) => {
                debug!("environment tracing {}", if *on { "on" } else { "off" });
                self.debug = *on;
            }
            StmtKind::VarDecl(decl) => self.exec_var_decl(decl)?,
            StmtKind::Assign {
                target,
                hops,
                value,
            } => {
                let value = self.eval_value(value)?;
                let Some(stored) = self.scope.assign(*hops, target.name, value) else {
                    return Err(target.span.wrap(Error::UnresolvedName(target.name)));
                };
                if self.debug {
                    let line = format!("assign {} = {stored}", self.interner.get(target));
                    self.trace(&line);
                }
            }
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                if self.eval_cond(cond)? {
                    return self.exec_block(then_block);
                } else if let Some(else_block) = else_block {
                    return self.exec_block(else_block);
                }
            }
            StmtKind::While { cond, body } => {
                while self.eval_cond(cond)? {
                    match self.exec_block(body)? {
                        Flow::Normal | Flow::Continue => (),
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            StmtKind::Repeat {
                count,
                counter,
                body,
            } => {
                let n = match self.eval_value(count)? {
                    Value::Int(n) if n < 0 => {
                        return Err(count.span.wrap(Error::NegativeRepeatCount(n)));
                    }
                    Value::Int(n) => n,
                    other => unreachable!("repeat count checked to be int, got {other:?}"),
                };
                for i in 1..=n {
                    let inner = Scope::child(&self.scope);
                    if let Some(counter) = counter {
                        let binding = Binding {
                            ty: Type::Int,
                            value: Value::Int(i),
                            constant: true,
                        };
                        inner.define(counter.name, binding);
                    }
                    let outer = mem::replace(&mut self.scope, inner);
                    let flow = self.exec_block(body);
                    self.scope = outer;
                    match flow? {
                        Flow::Normal | Flow::Continue => (),
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            StmtKind::Func(decl) => {
                let closure = Closure {
                    decl,
                    scope: Rc::downgrade(&self.scope),
                };
                let binding = Binding {
                    ty: decl.return_type(),
                    value: Value::Function(closure),
                    constant: true,
                };
                self.scope.define(decl.name.name, binding);
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(value) => self.eval_value(value)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Expr(expr) => {
                self.eval_value(expr)?;
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_var_decl(&mut self, decl: &'p VarDecl<Typed>) -> Result<()> {
        let ty = decl.ty.ty;
        let value = match &decl.init {
            Some(init) => self.eval_value(init)?.widen_to(ty),
            None => zero_value(ty),
        };
        if self.debug {
            let line = format!("define {} = {value}", self.interner.get(decl.name));
            self.trace(&line);
        }
        let binding = Binding {
            ty,
            value,
            constant: decl.constant,
        };
        self.scope.define(decl.name.name, binding);
        Ok(())
    }

    fn eval_value(&mut self, expr: &'p Expr<Typed>) -> Result<Value<'p>> {
        util::grow_stack(|| self.eval_value_kind(expr))
    }

    fn eval_value_kind(&mut self, expr: &'p Expr<Typed>) -> Result<Value<'p>> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Int(i) => Ok(Value::Int(*i)),
            ExprKind::Float(f) => Ok(Value::Float(*f)),
            ExprKind::Str(s) => Ok(Value::str(s)),
            ExprKind::Id(ident, hops) => self
                .scope
                .get(*hops, ident.name)
                .ok_or_else(|| ident.span.wrap(Error::UnresolvedName(ident.name))),
            ExprKind::Paren(inner) => self.eval_value(inner),
            ExprKind::Unary {
                op: UnaryOperator::Neg,
                expr: inner,
            } => match self.eval_value(inner)? {
                Value::Int(i) => i
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or(span.wrap(Error::Overflow)),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => unreachable!("negation operand was type checked, got {other:?}"),
            },
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.eval_value(lhs)?;
                let rhs = self.eval_value(rhs)?;
                arith(*op, &lhs, &rhs).map_err(|e| span.wrap(e))
            }
            ExprKind::Logical { .. } => unreachable!("conditions are not values"),
            ExprKind::Call(call) => self.eval_call(span, call),
        }
    }

    fn eval_cond(&mut self, expr: &'p Expr<Typed>) -> Result<bool> {
        util::grow_stack(|| self.eval_cond_kind(expr))
    }

    fn eval_cond_kind(&mut self, expr: &'p Expr<Typed>) -> Result<bool> {
        match &expr.kind {
            ExprKind::Paren(inner) => self.eval_cond(inner),
            ExprKind::Logical { op, lhs, rhs } => Ok(match op {
                LogicalOperator::And => self.eval_cond(lhs)? && self.eval_cond(rhs)?,
                LogicalOperator::Or => self.eval_cond(lhs)? || self.eval_cond(rhs)?,
            }),
            ExprKind::Binary { op, lhs, rhs } if op.is_comparison() => {
                let lhs = self.eval_value(lhs)?;
                let rhs = self.eval_value(rhs)?;
                Ok(compare(*op, &lhs, &rhs))
            }
            _ => unreachable!("values are not conditions"),
        }
    }

    fn eval_call(&mut self, span: Span, call: &'p Call<Typed>) -> Result<Value<'p>> {
        let args = call
            .args
            .iter()
            .map(|arg| self.eval_value(arg))
            .collect::<Result<Vec<_>>>()?;

        let id = match call.callee {
            Callee::Builtin(id) => id,
            Callee::Function(hops) => return self.call_function(span, call, hops, args),
        };
        let value = builtins::call(id, &args, &mut *self.host).map_err(|e| span.wrap(e))?;
        if builtins::produces_output(id) {
            self.produced_output = true;
        }
        Ok(value)
    }

    fn call_function(
        &mut self,
        span: Span,
        call: &'p Call<Typed>,
        hops: Hops,
        args: Vec<Value<'p>>,
    ) -> Result<Value<'p>> {
        let name = call.name;
        let Some(Value::Function(closure)) = self.scope.get(hops, name.name) else {
            return Err(name.span.wrap(Error::UnresolvedName(name.name)));
        };
        let Some(parent) = closure.scope.upgrade() else {
            return Err(span.wrap(Error::DanglingClosure));
        };
        if self.depth >= MAX_CALL_DEPTH {
            return Err(span.wrap(Error::StackOverflow));
        }
        if self.debug {
            let line = format!("call {}", self.interner.get(name));
            self.trace(&line);
        }

        let decl = closure.decl;
        let frame = Scope::child(&parent);
        for (param, value) in decl.params.iter().zip(args) {
            let binding = Binding {
                ty: param.ty.ty,
                value,
                constant: false,
            };
            frame.define(param.name.name, binding);
        }

        let caller = mem::replace(&mut self.scope, frame);
        self.depth += 1;
        let flow = self.exec_stmts(&decl.body.stmts);
        self.depth -= 1;
        self.scope = caller;

        let value = match flow? {
            Flow::Return(value) => value,
            _ => Value::None,
        };
        Ok(value.widen_to(decl.return_type()))
    }

    fn trace(&mut self, line: &str) {
        self.host.trace(&format!("[ENV] {line}"));
    }
}

/// The value of a variable declared without an initializer.
fn zero_value<'p>(ty: Type) -> Value<'p> {
    match ty {
        Type::Int => Value::Int(0),
        Type::Float => Value::Float(0.0),
        Type::Str => Value::str(""),
        Type::None => Value::None,
    }
}

fn arith<'p>(op: BinaryOperator, lhs: &Value<'p>, rhs: &Value<'p>) -> Result<Value<'p>, Error> {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) if op == BinaryOperator::Add => {
            let mut s = String::with_capacity(a.len() + b.len());
            s.push_str(a);
            s.push_str(b);
            Ok(Value::Str(Rc::from(s)))
        }
        (&Value::Int(a), &Value::Int(b)) => {
            let result = match op {
                BinaryOperator::Add => a.checked_add(b),
                BinaryOperator::Sub => a.checked_sub(b),
                BinaryOperator::Mul => a.checked_mul(b),
                BinaryOperator::Div if b == 0 => return Err(Error::DivisionByZero),
                BinaryOperator::Div => a.checked_div(b),
                _ => unreachable!("{op:?} is not arithmetic"),
            };
            result.map(Value::Int).ok_or(Error::Overflow)
        }
        _ => {
            let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) else {
                unreachable!("arithmetic operands were type checked");
            };
            let result = match op {
                BinaryOperator::Add => a + b,
                BinaryOperator::Sub => a - b,
                BinaryOperator::Mul => a * b,
                BinaryOperator::Div if b == 0.0 => return Err(Error::DivisionByZero),
                BinaryOperator::Div => a / b,
                _ => unreachable!("{op:?} is not arithmetic"),
            };
            Ok(Value::Float(result))
        }
    }
}

fn compare(op: BinaryOperator, lhs: &Value<'_>, rhs: &Value<'_>) -> bool {
    let ordering = match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        _ => lhs
            .as_f64()
            .zip(rhs.as_f64())
            .and_then(|(a, b)| a.partial_cmp(&b)),
    };
    match op {
        BinaryOperator::Eq => ordering == Some(Ordering::Equal),
        BinaryOperator::Ne => ordering != Some(Ordering::Equal),
        BinaryOperator::Lt => ordering == Some(Ordering::Less),
        BinaryOperator::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        BinaryOperator::Gt => ordering == Some(Ordering::Greater),
        BinaryOperator::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        _ => unreachable!("{op:?} is not a comparison"),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    DivisionByZero,
    Overflow,
    NegativeRepeatCount(i64),
    NegativeExponent(i64),
    NegativeSqrt,
    /// `st.getInputFor` and friends found no more input.
    EndOfInput,
    /// Text which does not spell a number of the wanted type.
    InvalidNumber {
        text: Box<str>,
        ty: Type,
    },
    Io(io::ErrorKind),
    /// A name the checker resolved is missing at runtime.
    UnresolvedName(Symbol),
    DanglingClosure,
    StackOverflow,
}

impl Error {
    pub fn io(error: io::Error) -> Error {
        Error::Io(error.kind())
    }
}
