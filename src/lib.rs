//! FAP: a small statically typed scripting language.
//!
//! Source text goes through [`lexer`], [`parser`], [`type_checker`] and
//! finally [`eval`]. Every stage stops at its first error, which [`run_with`]
//! reports as a [`Diagnostic`].

use log::debug;

/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into an AST.
pub mod parser;

/// The type checker takes an untyped AST, checks the soundness of its types,
/// and maps it into a typed AST.
pub mod type_checker;

/// The evaluator walks a typed AST, running it against a [`host::Host`].
pub mod eval;

pub mod ast;
pub mod builtins;
pub mod diagnostic;
pub mod env;
pub mod host;
pub mod token;
pub mod types;
pub mod util;
pub mod value;

pub use diagnostic::{Diagnostic, DiagnosticKind, Position, Severity};
pub use host::{BufferHost, Channel, Host, StdHost};

use crate::{
    diagnostic::LineIndex,
    eval::Evaluator,
    type_checker::Checker,
    util::{fmt::Context, intern::Interner},
};

/// A completed run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    /// Type checker warnings, in source order.
    pub warnings: Vec<Diagnostic>,
    /// Whether any `out.*` built-in was called.
    pub produced_output: bool,
}

pub type RunResult = Result<Outcome, Diagnostic>;

/// Runs `src` against the process' standard streams.
pub fn run(src: &str) -> RunResult {
    run_with(src, &mut StdHost)
}

/// Runs `src` against the given host.
pub fn run_with<H: Host>(src: &str, host: &mut H) -> RunResult {
    let index = LineIndex::new(src);
    let mut interner = Interner::with_capacity(128);

    let program = match parser::parse_program(src, &mut interner) {
        Ok(program) => program,
        Err(error) => {
            let kind = if matches!(error.inner, parser::Error::Lexer(_)) {
                DiagnosticKind::Lex
            } else {
                DiagnosticKind::Parse
            };
            let ctx = Context {
                interner: &interner,
            };
            return Err(Diagnostic::new(kind, Severity::Error, &error, &ctx, &index));
        }
    };

    let ctx = Context {
        interner: &interner,
    };
    let (program, warnings) = Checker::with_capacity(&interner, 128)
        .check(program)
        .map_err(|e| Diagnostic::new(DiagnosticKind::Type, Severity::Error, &e, &ctx, &index))?;
    let warnings = warnings
        .iter()
        .map(|w| Diagnostic::new(DiagnosticKind::Type, Severity::Warning, w, &ctx, &index))
        .collect::<Vec<_>>();

    let mut evaluator = Evaluator::new(&interner, host);
    evaluator.run(&program).map_err(|e| {
        Diagnostic::new(DiagnosticKind::Runtime, Severity::Error, &e, &ctx, &index)
    })?;
    let produced_output = evaluator.produced_output();
    debug!("run finished with {} warnings", warnings.len());

    Ok(Outcome {
        warnings,
        produced_output,
    })
}
