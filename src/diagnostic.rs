use std::fmt;

use crate::{
    token::{Span, Spanned},
    util::fmt::{Context, Show},
};

/// The pipeline stage which produced a diagnostic.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    Lex,
    Parse,
    Type,
    Runtime,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticKind::Lex => "lex",
            DiagnosticKind::Parse => "parse",
            DiagnosticKind::Type => "type",
            DiagnosticKind::Runtime => "runtime",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

/// One-based line and column. Columns count characters, not bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A fully rendered error or warning, detached from the run which produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub position: Position,
}

impl Diagnostic {
    pub fn new<E>(
        kind: DiagnosticKind,
        severity: Severity,
        error: &Spanned<E>,
        ctx: &Context<'_>,
        index: &LineIndex<'_>,
    ) -> Diagnostic
    where
        Spanned<E>: Show,
    {
        Diagnostic {
            kind,
            severity,
            message: error.display(ctx).to_string(),
            span: error.span,
            position: index.position(error.span.lo),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{}: {} {severity}: {}",
            self.position, self.kind, self.message
        )
    }
}

impl std::error::Error for Diagnostic {}

/// Maps byte offsets of a source into line/column positions.
pub struct LineIndex<'src> {
    src: &'src str,
    /// Byte offset at which each line starts. The first line starts at 0.
    line_starts: Vec<usize>,
}

impl<'src> LineIndex<'src> {
    pub fn new(src: &'src str) -> LineIndex<'src> {
        let line_starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        LineIndex { src, line_starts }
    }

    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.src.len());
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let start = self.line_starts[line - 1];
        let column = self
            .src
            .get(start..offset)
            .map_or(offset - start, |prefix| prefix.chars().count());
        Position {
            line,
            column: column + 1,
        }
    }
}
