use crate::{
    parser,
    token::Spanned,
    type_checker::Checker,
    util::{
        self,
        fmt::{tree, Show},
        intern::Interner,
    },
};

pub fn format_errors<E>(i: &Interner, e: &[Spanned<E>]) -> Vec<String>
where
    Spanned<E>: Show,
{
    let ctx = util::fmt::Context { interner: i };
    e.iter().map(|e| format!("{:#}", e.display(&ctx))).collect()
}

/// Each variant contains the input.
pub enum Test {
    ParserProgram(&'static str),
    ParserExpr(&'static str),
    CheckerProgram(&'static str),
    CheckerExpr(&'static str),
}

pub enum Assertion {
    TreeOk(&'static str),
    ExpectedErrors(&'static [&'static str]),
    ExpectedWarnings(&'static [&'static str]),
}

/// What a pipeline run produced. Stages stop at the first error, so `tree` is
/// empty whenever `errors` isn't.
#[derive(Default)]
pub struct Outcome {
    pub tree: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[track_caller]
pub fn run_pipeline(test: Test) -> Outcome {
    let interner = &mut Interner::with_capacity(128);

    match test {
        Test::ParserProgram(input) => match parser::parse_program(input, interner) {
            Ok(prog) => Outcome {
                tree: tree::print_program_string(interner, &prog),
                ..Outcome::default()
            },
            Err(error) => Outcome {
                errors: format_errors(interner, &[error]),
                ..Outcome::default()
            },
        },
        Test::ParserExpr(input) => match parser::parse_expr(input, interner) {
            Ok(expr) => Outcome {
                tree: tree::print_expr_string(interner, &expr),
                ..Outcome::default()
            },
            Err(error) => Outcome {
                errors: format_errors(interner, &[error]),
                ..Outcome::default()
            },
        },
        Test::CheckerProgram(input) => {
            let prog = match parser::parse_program(input, interner) {
                Ok(prog) => prog,
                Err(error) => {
                    return Outcome {
                        errors: format_errors(interner, &[error]),
                        ..Outcome::default()
                    }
                }
            };
            match Checker::with_capacity(interner, 128).check(prog) {
                Ok((prog, warnings)) => Outcome {
                    tree: tree::print_program_string(interner, &prog),
                    errors: vec![],
                    warnings: format_errors(interner, &warnings),
                },
                Err(error) => Outcome {
                    errors: format_errors(interner, &[error]),
                    ..Outcome::default()
                },
            }
        }
        Test::CheckerExpr(input) => {
            // Checked as a lone expression statement. Only the expression is
            // printed.
            let expr = match parser::parse_expr(input, interner) {
                Ok(expr) => expr,
                Err(error) => {
                    return Outcome {
                        errors: format_errors(interner, &[error]),
                        ..Outcome::default()
                    }
                }
            };
            let prog = crate::ast::Program {
                doc: None,
                body: vec![crate::ast::Stmt {
                    span: expr.span,
                    kind: crate::ast::StmtKind::Expr(expr),
                }],
            };
            match Checker::with_capacity(interner, 128).check(prog) {
                Ok((mut prog, warnings)) => {
                    let Some(crate::ast::StmtKind::Expr(expr)) =
                        prog.body.pop().map(|stmt| stmt.kind)
                    else {
                        unreachable!("the checker keeps statements as they are");
                    };
                    Outcome {
                        tree: tree::print_expr_string(interner, &expr),
                        errors: vec![],
                        warnings: format_errors(interner, &warnings),
                    }
                }
                Err(error) => Outcome {
                    errors: format_errors(interner, &[error]),
                    ..Outcome::default()
                },
            }
        }
    }
}

#[track_caller]
pub fn run_assertion(assertion: Assertion, outcome: &Outcome) {
    match assertion {
        Assertion::TreeOk(expected_tree) => {
            let expected_errors: &[&str] = &[];
            ::pretty_assertions::assert_eq!(outcome.errors, expected_errors);
            ::pretty_assertions::assert_eq!(outcome.tree.trim(), expected_tree.trim());
        }
        Assertion::ExpectedErrors(expected_errors) => {
            ::pretty_assertions::assert_eq!(outcome.errors, expected_errors);
        }
        Assertion::ExpectedWarnings(expected_warnings) => {
            ::pretty_assertions::assert_eq!(outcome.warnings, expected_warnings);
        }
    }
}

macro_rules! tree_tests {
    (
        use $test_kind:ident;

        $(
            fn $test_name:ident() {
                let $source_kind:ident = $source:expr;
                $($assertions_tt:tt)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let test: crate::util::test_utils::Test =
                    tree_tests!(@@get_test($test_kind, $source_kind), $source);
                let outcome = crate::util::test_utils::run_pipeline(test);
                tree_tests!(@@expand_assertions, &outcome, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $outcome:expr, []) => {};
    (@@expand_assertions, $outcome:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            tree_tests!(@@assertion, $assertion, $assertion_expected),
            $outcome,
        );
        tree_tests!(@@expand_assertions, $outcome, [$($rest_assertions_tt)*]);
    };

    (@@assertion, tree_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, expected_errors, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedErrors($expected)
    };
    (@@assertion, expected_warnings, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedWarnings($expected)
    };

    (@@get_test(parser, program), $source:expr) => {
        crate::util::test_utils::Test::ParserProgram($source)
    };
    (@@get_test(parser, expr), $source:expr) => {
        crate::util::test_utils::Test::ParserExpr($source)
    };
    (@@get_test(checker, program), $source:expr) => {
        crate::util::test_utils::Test::CheckerProgram($source)
    };
    (@@get_test(checker, expr), $source:expr) => {
        crate::util::test_utils::Test::CheckerExpr($source)
    };
}
pub(crate) use tree_tests;
