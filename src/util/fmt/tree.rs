use std::io::Write;

use crate::{ast::*, types::ExprType, util::intern::Interner};

const INDENT_WIDTH: usize = 2;

pub fn print_program_string<I: InfoWriter>(idents: &Interner, program: &Program<I>) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_program(&mut buf, idents, program).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_expr_string<I: InfoWriter>(idents: &Interner, expr: &Expr<I>) -> String {
    let mut buf = Vec::with_capacity(512);
    print_expr(&mut buf, idents, 0, expr).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_program<I: InfoWriter>(
    w: &mut impl Write,
    idents: &Interner,
    program: &Program<I>,
) -> std::io::Result<()> {
    if let Some(doc) = &program.doc {
        writeln!(w, "doc {:?} ({})", doc.text, doc.span)?;
    }
    for stmt in &program.body {
        print_stmt(w, idents, 0, stmt)?;
    }
    Ok(())
}

fn print_block<I: InfoWriter>(
    w: &mut impl Write,
    idents: &Interner,
    i: usize,
    block: &Block<I>,
) -> std::io::Result<()> {
    sp(w, i)?;
    writeln!(w, "block ({})", block.span)?;
    for stmt in &block.stmts {
        print_stmt(w, idents, i + 1, stmt)?;
    }
    Ok(())
}

fn print_stmt<I: InfoWriter>(
    w: &mut impl Write,
    idents: &Interner,
    i: usize,
    stmt: &Stmt<I>,
) -> std::io::Result<()> {
    let span = stmt.span;
    if let StmtKind::Expr(expr) = &stmt.kind {
        return print_expr(w, idents, i, expr);
    }

    sp(w, i)?;
    match &stmt.kind {
        StmtKind::Pragma(Pragma::Debug(on)) => writeln!(w, "pragma debug={on} ({span})")?,
        StmtKind::VarDecl(VarDecl {
            constant,
            ty,
            name,
            init,
        }) => {
            let keyword = if *constant { "const" } else { "var" };
            writeln!(w, "{keyword} {} {} ({span})", ty.ty, idents.get(name))?;
            if let Some(init) = init {
                print_expr(w, idents, i + 1, init)?;
            }
        }
        StmtKind::Assign { target, value, .. } => {
            writeln!(w, "assign {} ({span})", idents.get(target))?;
            print_expr(w, idents, i + 1, value)?;
        }
        StmtKind::If {
            cond,
            then_block,
            else_block,
        } => {
            writeln!(w, "if ({span})")?;
            print_expr(w, idents, i + 1, cond)?;
            print_block(w, idents, i + 1, then_block)?;
            if let Some(else_block) = else_block {
                print_block(w, idents, i + 1, else_block)?;
            }
        }
        StmtKind::While { cond, body } => {
            writeln!(w, "while ({span})")?;
            print_expr(w, idents, i + 1, cond)?;
            print_block(w, idents, i + 1, body)?;
        }
        StmtKind::Repeat {
            count,
            counter,
            body,
        } => {
            write!(w, "repeat")?;
            if let Some(counter) = counter {
                write!(w, " {}", idents.get(counter))?;
            }
            writeln!(w, " ({span})")?;
            print_expr(w, idents, i + 1, count)?;
            print_block(w, idents, i + 1, body)?;
        }
        StmtKind::Func(decl) => {
            write!(w, "func {}(", idents.get(decl.name))?;
            for (idx, param) in decl.params.iter().enumerate() {
                if idx > 0 {
                    write!(w, ", ")?;
                }
                write!(w, "{} {}", param.ty.ty, idents.get(param.name))?;
            }
            writeln!(w, ") -> {} ({span})", decl.return_type())?;
            print_block(w, idents, i + 1, &decl.body)?;
        }
        StmtKind::Return(value) => {
            writeln!(w, "return ({span})")?;
            if let Some(value) = value {
                print_expr(w, idents, i + 1, value)?;
            }
        }
        StmtKind::Break => writeln!(w, "break ({span})")?,
        StmtKind::Continue => writeln!(w, "continue ({span})")?,
        StmtKind::Expr(_) => unreachable!(),
    }
    Ok(())
}

pub fn print_expr<I: InfoWriter>(
    w: &mut impl Write,
    idents: &Interner,
    i: usize,
    expr: &Expr<I>,
) -> std::io::Result<()> {
    sp(w, i)?;
    let info = expr.info.annotation(); // inferred type, for typed ASTs
    let span = expr.span;
    match &expr.kind {
        ExprKind::Int(int) => writeln!(w, "int {int} ({span}{info})")?,
        ExprKind::Float(float) => writeln!(w, "float {float} ({span}{info})")?,
        ExprKind::Str(s) => writeln!(w, "string {s:?} ({span}{info})")?,
        ExprKind::Id(ident, _) => writeln!(w, "ident {} ({span}{info})", idents.get(ident))?,
        ExprKind::Paren(inner) => {
            writeln!(w, "paren ({span}{info})")?;
            print_expr(w, idents, i + 1, inner)?;
        }
        ExprKind::Unary { op, expr } => {
            writeln!(w, "unary {op:?} ({span}{info})")?;
            print_expr(w, idents, i + 1, expr)?;
        }
        ExprKind::Binary { op, lhs, rhs } => {
            writeln!(w, "binary {op:?} ({span}{info})")?;
            print_expr(w, idents, i + 1, lhs)?;
            print_expr(w, idents, i + 1, rhs)?;
        }
        ExprKind::Logical { op, lhs, rhs } => {
            writeln!(w, "logical {op:?} ({span}{info})")?;
            print_expr(w, idents, i + 1, lhs)?;
            print_expr(w, idents, i + 1, rhs)?;
        }
        ExprKind::Call(call) => {
            write!(w, "call ")?;
            if let Some(receiver) = call.receiver {
                write!(w, "{}.", idents.get(receiver))?;
            }
            writeln!(w, "{} ({span}{info})", idents.get(call.name))?;
            for arg in &call.args {
                print_expr(w, idents, i + 1, arg)?;
            }
        }
    }
    Ok(())
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:1$}", "", i * INDENT_WIDTH)
}

pub trait InfoWriter: Info<Expr: AnnotationWriter> {}

impl<I> InfoWriter for I
where
    I: Info,
    I::Expr: AnnotationWriter,
{
}

pub trait AnnotationWriter {
    fn annotation(&self) -> impl std::fmt::Display;
}

impl AnnotationWriter for () {
    fn annotation(&self) -> impl std::fmt::Display {
        ""
    }
}

impl AnnotationWriter for ExprType {
    fn annotation(&self) -> impl std::fmt::Display {
        struct TypeWriter(ExprType);

        impl std::fmt::Display for TypeWriter {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, " %: {}", self.0)
            }
        }

        TypeWriter(*self)
    }
}
