use fap::{run_with, BufferHost, Channel, DiagnosticKind, Position, RunResult, Severity};
use indoc::indoc;
use pretty_assertions::assert_eq;

fn run(src: &str) -> (RunResult, BufferHost) {
    let mut host = BufferHost::new();
    let result = run_with(src, &mut host);
    (result, host)
}

#[track_caller]
fn info(src: &str) -> Vec<String> {
    let (result, host) = run(src);
    if let Err(diagnostic) = result {
        panic!("unexpected failure: {diagnostic}");
    }
    let lines = host.output(Channel::Info);
    lines.into_iter().map(String::from).collect()
}

#[track_caller]
fn failure(src: &str) -> fap::Diagnostic {
    run(src).0.expect_err("the run should fail")
}

#[test]
fn scenario_a_hello_world() {
    let (result, host) = run("@None My First FAP Program\nout.Info(\"Hello, World!\")");
    let outcome = result.unwrap();
    assert!(outcome.produced_output);
    assert!(outcome.warnings.is_empty());
    assert_eq!(host.output(Channel::Info), ["Hello, World!"]);
    assert!(host.output(Channel::Warn).is_empty());
    assert!(host.output(Channel::Error).is_empty());
}

#[test]
fn scenario_b_assignment_type_error() {
    let (result, host) = run("int x = 5\nx = \"oops\"");
    let diagnostic = result.unwrap_err();
    assert_eq!(diagnostic.kind, DiagnosticKind::Type);
    assert_eq!(diagnostic.severity, Severity::Error);
    assert_eq!(diagnostic.position, Position { line: 2, column: 1 });
    assert_eq!(
        diagnostic.to_string(),
        "2:1: type error: expected type int, but got str"
    );
    assert!(host.lines.is_empty());
}

#[test]
fn scenario_c_argument_types() {
    let diagnostic = failure("func f(int a, int b) { }\nf(1, 2.0)");
    assert_eq!(diagnostic.kind, DiagnosticKind::Type);
    assert_eq!(diagnostic.position, Position { line: 2, column: 6 });

    let out = info(indoc! {"
        func g(float a) -> float { return a / 2 }
        out.Info(g(3))
    "});
    assert_eq!(out, ["1.5"]);
}

#[test]
fn scenario_d_unterminated_string() {
    let (result, host) = run("out.Info(\"unterminated");
    let diagnostic = result.unwrap_err();
    assert_eq!(diagnostic.kind, DiagnosticKind::Lex);
    assert_eq!(diagnostic.message, "unterminated string literal");
    assert_eq!(diagnostic.position, Position { line: 1, column: 10 });
    assert!(host.lines.is_empty());
}

#[test]
fn parse_errors_are_reported_as_such() {
    let diagnostic = failure("int x = (1 + 2");
    assert_eq!(diagnostic.kind, DiagnosticKind::Parse);
    assert_eq!(diagnostic.message, "expected `)`, but got end of file");
}

#[test]
fn runtime_errors_stop_the_run() {
    let (result, host) = run(indoc! {"
        out.Info(\"before\")
        int zero = 0
        out.Info(1 / zero)
        out.Info(\"after\")
    "});
    let diagnostic = result.unwrap_err();
    assert_eq!(diagnostic.kind, DiagnosticKind::Runtime);
    assert_eq!(diagnostic.message, "division by zero");
    assert_eq!(diagnostic.position, Position { line: 3, column: 10 });
    assert_eq!(host.output(Channel::Info), ["before"]);
}

#[test]
fn runs_are_deterministic() {
    let src = include_str!("../fixtures/primes.fap");
    let (first, first_host) = run(src);
    let (second, second_host) = run(src);
    assert_eq!(first, second);
    assert_eq!(first_host.lines, second_host.lines);
}

#[test]
fn fixtures() {
    assert_eq!(info(include_str!("../fixtures/hello.fap")), ["Hello, World!"]);

    let primes = info(include_str!("../fixtures/primes.fap"));
    assert_eq!(primes.len(), 18);
    assert_eq!(primes[0], "2 is prime");
    assert_eq!(primes[14], "47 is prime");
    assert_eq!(primes[15], "found 15 primes below 50");
    assert_eq!(primes[16], "ratio: 0.3");
    assert_eq!(primes[17], "sqrt of limit: 7.0710678118654755");

    assert_eq!(
        info(include_str!("../fixtures/closures.fap")),
        [
            "total (after repeat): 10",
            "10! = 3628800",
            "2^10 = 1024, |-7| = 7",
        ]
    );
}

#[test]
fn control_flow() {
    let out = info(indoc! {"
        while 1 > 2 {
            out.Info(\"never\")
        }
        if 1 < 2 {
            out.Info(\"then\")
        } else {
            out.Info(\"else\")
        }
        int n = 3
        if n == 1 {
            out.Info(\"one\")
        } else if n == 3 {
            out.Info(\"three\")
        } else {
            out.Info(\"many\")
        }
    "});
    assert_eq!(out, ["then", "three"]);
}

#[test]
fn break_continue_and_repeat() {
    let out = info(indoc! {"
        int sum = 0
        repeat (10, i) {
            if i == 3 {
                continue
            }
            if i > 5 {
                break
            }
            sum = sum + i
        }
        out.Info(sum)
        repeat (2) {
            out.Info(\"twice\")
        }
    "});
    assert_eq!(out, ["12", "twice", "twice"]);
}

#[test]
fn nested_loops_break_only_the_innermost() {
    let out = info(indoc! {"
        repeat (2, outer) {
            repeat (5, inner) {
                if inner == 2 {
                    break
                }
                out.Info(outer, \"/\", inner)
            }
        }
    "});
    assert_eq!(out, ["1/1", "2/1"]);
}

#[test]
fn recursion_and_closures() {
    let out = info(indoc! {"
        func fib(int n) -> int {
            if n < 2 {
                return n
            }
            return fib(n - 1) + fib(n - 2)
        }
        out.Info(fib(20))

        int calls = 0
        func counted() -> int {
            calls = calls + 1
            return calls
        }
        counted()
        counted()
        out.Info(counted(), \" calls\")

        func outer(int base) -> int {
            func inner(int x) -> int {
                return base + x
            }
            return inner(10)
        }
        out.Info(outer(5))
    "});
    assert_eq!(out, ["6765", "3 calls", "15"]);
}

#[test]
fn constants_cannot_be_reassigned() {
    let diagnostic = failure("const float pi = 3.14\npi = 3");
    assert_eq!(diagnostic.kind, DiagnosticKind::Type);
    assert_eq!(diagnostic.message, "cannot assign to constant `pi`");

    assert_eq!(info("const float pi = 3\nout.Info(pi)"), ["3.0"]);
}

#[test]
fn builtins() {
    let mut host = BufferHost::with_input(["world"]);
    let src = indoc! {"
        str who = st.getInputFor(\"who? \")
        out.Info(\"hello \", who)
        out.Warn(\"pow: \", math.pow(2, 0.5))
        out.Error(\"cbrt: \", math.cbrt(27), \" abs: \", math.abs(-2.5))
    "};
    let outcome = run_with(src, &mut host).unwrap();
    assert!(outcome.produced_output);
    assert_eq!(host.prompts, ["who? "]);
    assert_eq!(host.output(Channel::Info), ["hello world"]);
    assert_eq!(host.output(Channel::Warn), ["pow: 1.4142135623730951"]);
    assert_eq!(host.output(Channel::Error), ["cbrt: 3.0 abs: 2.5"]);
}

#[test]
fn reading_past_the_end_of_input_fails() {
    let diagnostic = failure("str line = st.getInputFor(\"> \")\nout.Info(line)");
    assert_eq!(diagnostic.kind, DiagnosticKind::Runtime);
    assert_eq!(diagnostic.message, "no more input to read");
}

#[test]
fn silent_programs_produce_no_output() {
    let (result, host) = run("int x = 1\nx = x + 1\nint y = x");
    let outcome = result.unwrap();
    assert!(!outcome.produced_output);
    assert!(host.lines.is_empty());
}

#[test]
fn unused_variables_are_warned_about() {
    let (result, host) = run(indoc! {"
        int used = 1
        str unused = \"x\"
        func f(int ignored_param) { }
        f(used)
        const int also_unused = 2
    "});
    let outcome = result.unwrap();
    let warnings: Vec<_> = outcome.warnings.iter().map(ToString::to_string).collect();
    assert_eq!(
        warnings,
        [
            "2:5: type warning: `unused` is defined but not used",
            "5:11: type warning: `also_unused` is defined but not used",
        ]
    );
    assert!(outcome.warnings.iter().all(|w| !w.is_error()));
    assert!(host.lines.is_empty());
}

#[test]
fn debug_pragma_traces_the_environment() {
    let (result, host) = run(indoc! {"
        @debug=true
        int x = 1
        x = x + 1
        @debug=false
        x = 10
        out.Info(x)
    "});
    result.unwrap();
    assert_eq!(host.traces, ["[ENV] define x = 1", "[ENV] assign x = 2"]);
    assert_eq!(host.output(Channel::Info), ["10"]);
}

#[test]
fn integer_overflow_is_an_error() {
    let diagnostic = failure("int big = 9223372036854775807\nint bigger = big * 2");
    assert_eq!(diagnostic.kind, DiagnosticKind::Runtime);
    assert_eq!(diagnostic.message, "integer overflow");
    assert_eq!(diagnostic.position, Position { line: 2, column: 14 });
}

#[test]
fn runaway_recursion_is_an_error() {
    let diagnostic =
        failure("func forever(int n) -> int {\n    return forever(n + 1)\n}\nforever(0)");
    assert_eq!(diagnostic.kind, DiagnosticKind::Runtime);
    assert_eq!(diagnostic.position, Position { line: 2, column: 12 });
    assert!(diagnostic.message.starts_with("maximum call depth"));
}

#[test]
fn deep_nesting_is_a_parse_error() {
    let src = format!("int x = {}1{}", "(".repeat(20_000), ")".repeat(20_000));
    let (result, host) = run(&src);
    let diagnostic = result.unwrap_err();
    assert_eq!(diagnostic.kind, DiagnosticKind::Parse);
    assert_eq!(diagnostic.position, Position { line: 1, column: 521 });
    assert!(diagnostic.message.starts_with("nesting is too deep"));
    assert!(host.lines.is_empty());
}

#[test]
fn scoping_is_lexical() {
    let out = info(indoc! {"
        int x = 1
        if x > 0 {
            func show() -> int {
                out.Info(x)
                return x + 1
            }
            str x = \"shadow\"
            out.Info(show(), x)
        }
    "});
    assert_eq!(out, ["1", "2shadow"]);
}

#[test]
fn numeric_input_is_converted() {
    let mut host = BufferHost::with_input(["21", "oops"]);
    let src = indoc! {"
        int n = st.getIntFor(\"number: \")
        out.Info(n * 2)
        float f = st.getFloatFor(\"another: \")
    "};
    let diagnostic = run_with(src, &mut host).unwrap_err();
    assert_eq!(host.output(Channel::Info), ["42"]);
    assert_eq!(diagnostic.kind, DiagnosticKind::Runtime);
    assert_eq!(diagnostic.position, Position { line: 3, column: 11 });
    assert_eq!(diagnostic.message, "cannot convert \"oops\" to float");
}

#[test]
fn stray_block_comment_end_is_a_lex_error() {
    let diagnostic = failure("int x = 1\n#Y\nout.Info(x)");
    assert_eq!(diagnostic.kind, DiagnosticKind::Lex);
    assert_eq!(diagnostic.position, Position { line: 2, column: 1 });
    assert_eq!(diagnostic.message, "unexpected block comment end `#Y`");
}
