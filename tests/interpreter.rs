mod common;

use pretty_assertions::assert_eq;

use std::io::{self, Write};

use common::{run, Session};
use rox::parser::Parser;
use rox::report::CollectingReporter;
use rox::resolver::Resolver;
use rox::scanner::scan_tokens;
use rox::{Lox, Status};

fn output_of(source: &str) -> String {
    let (status, output, diagnostics) = run(source);
    assert_eq!(diagnostics, Vec::<String>::new());
    assert_eq!(status, Status::Ok);
    output
}

// ───────────────────────────── expressions ─────────────────────────────

#[test]
fn arithmetic_and_concatenation() {
    let source = r#"
        print 1 + 2 * 3;
        print (1 + 2) * 3;
        print 7 / 2;
        print -4 - -1;
        print "lo" + "x";
    "#;

    assert_eq!(output_of(source), "7\n9\n3.5\n-3\nlox\n");
}

#[test]
fn printing_each_kind_of_value() {
    let source = r#"
        fun f() {}
        class K {}
        print nil;
        print true;
        print 2.50;
        print "text";
        print f;
        print clock;
        print K;
        print K();
    "#;

    assert_eq!(
        output_of(source),
        "nil\ntrue\n2.5\ntext\n<fn f>\n<native fn>\nK\nK instance\n"
    );
}

#[test]
fn equality_never_coerces() {
    let source = r#"
        fun f() {}
        class C {}
        var c = C();
        print nil == nil;
        print nil == false;
        print 1 == "1";
        print "a" == "a";
        print 0 == -0;
        print f == f;
        print C() == C();
        print c == c;
        print 1 != 2;
    "#;

    assert_eq!(
        output_of(source),
        "true\nfalse\nfalse\ntrue\ntrue\ntrue\nfalse\ntrue\ntrue\n"
    );
}

#[test]
fn truthiness_and_logical_operators() {
    let source = r#"
        print !nil;
        print !0;
        print !"";
        print nil or "yes";
        print 1 and 2;
        print false and undefined;
        print true or undefined;
    "#;

    assert_eq!(
        output_of(source),
        "true\nfalse\nfalse\nyes\n2\nfalse\ntrue\n"
    );
}

#[test]
fn division_by_zero_is_infinite() {
    assert_eq!(output_of("print 1 / 0 > 1000000;"), "true\n");
}

// ───────────────────────────── statements ─────────────────────────────

#[test]
fn block_shadowing_restores_outer_binding() {
    let source = "var a = 1; { var a = 2; print a; } print a;";

    assert_eq!(output_of(source), "2\n1\n");
}

#[test]
fn assignment_reaches_enclosing_scope() {
    let source = "var a = 1; { a = 2; } print a; print a = 3;";

    assert_eq!(output_of(source), "2\n3\n");
}

#[test]
fn uninitialized_variable_is_nil() {
    assert_eq!(output_of("var a; print a;"), "nil\n");
}

#[test]
fn control_flow() {
    let source = r#"
        if (1 < 2) print "then"; else print "else";
        if (nil) print "then"; else print "else";

        var i = 0;
        while (i < 3) { print i; i = i + 1; }

        var a = 0;
        var b = 1;
        for (var n = 0; n < 6; n = n + 1) {
            var next = a + b;
            a = b;
            b = next;
        }
        print a;
    "#;

    assert_eq!(output_of(source), "then\nelse\n0\n1\n2\n8\n");
}

// ───────────────────────────── functions ─────────────────────────────

#[test]
fn recursion() {
    let source = r#"
        fun fib(n) {
            if (n < 2) return n;
            return fib(n - 1) + fib(n - 2);
        }
        print fib(15);
    "#;

    assert_eq!(output_of(source), "610\n");
}

#[test]
fn return_unwinds_loops_and_defaults_to_nil() {
    let source = r#"
        fun first_square_over(limit) {
            var i = 0;
            while (true) {
                for (var j = 0; j < 3; j = j + 1) {
                    if (i * i > limit) return i;
                }
                i = i + 1;
            }
        }
        fun nothing() {}
        fun bare() { return; }

        print first_square_over(10);
        print nothing();
        print bare();
    "#;

    assert_eq!(output_of(source), "4\nnil\nnil\n");
}

#[test]
fn closures_share_captured_variables() {
    let source = r#"
        var inc;
        var get;
        fun make() {
            var n = 0;
            fun i() { n = n + 1; }
            fun g() { return n; }
            inc = i;
            get = g;
        }
        make();
        inc();
        inc();
        print get();
    "#;

    assert_eq!(output_of(source), "2\n");
}

#[test]
fn counters_are_independent() {
    let source = r#"
        fun counter() {
            var count = 0;
            fun next() {
                count = count + 1;
                return count;
            }
            return next;
        }
        var a = counter();
        var b = counter();
        a();
        a();
        print a();
        print b();
    "#;

    assert_eq!(output_of(source), "3\n1\n");
}

#[test]
fn closures_resolve_lexically() {
    let source = r#"
        var a = "global";
        {
            fun show() { print a; }
            show();
            var a = "block";
            show();
        }
    "#;

    assert_eq!(output_of(source), "global\nglobal\n");
}

#[test]
fn clock_returns_seconds() {
    assert_eq!(output_of("print clock() > 1000000000;"), "true\n");
}

// ───────────────────────────── classes ─────────────────────────────

#[test]
fn fields_and_bound_methods() {
    let source = r#"
        class Person {
            init(name) { this.name = name; }
            greet() { print "hi " + this.name; }
        }
        var p = Person("ada");
        var greet = p.greet;
        p.name = "grace";
        greet();
        p.greet = "shadowed";
        print p.greet;
    "#;

    assert_eq!(output_of(source), "hi grace\nshadowed\n");
}

#[test]
fn initializer_always_returns_instance() {
    let source = r#"
        class A {
            init() {
                this.x = 1;
                return;
            }
        }
        var a = A();
        print a.init() == a;
        print a.x;
    "#;

    assert_eq!(output_of(source), "true\n1\n");
}

#[test]
fn inherited_initializer_sets_arity() {
    let source = r#"
        class Base { init(a, b) { this.sum = a + b; } }
        class Derived < Base {}
        print Derived(2, 3).sum;
    "#;

    assert_eq!(output_of(source), "5\n");
}

#[test]
fn super_dispatch_uses_declaring_class() {
    let source = r#"
        class A { method() { print "A method"; } }
        class B < A {
            method() { print "B method"; }
            test() { super.method(); }
        }
        class C < B {}
        C().test();
    "#;

    assert_eq!(output_of(source), "A method\n");
}

#[test]
fn super_chain_across_three_levels() {
    let source = r#"
        class A { name() { return "A"; } }
        class B < A { name() { return "B" + super.name(); } }
        class C < B { name() { return "C" + super.name(); } }
        print C().name();
    "#;

    assert_eq!(output_of(source), "CBA\n");
}

#[test]
fn super_binds_this_to_the_receiver() {
    let source = r#"
        class Base { describe() { return this.label; } }
        class Derived < Base {
            init() { this.label = "derived"; }
            describe() { return "<" + super.describe() + ">"; }
        }
        print Derived().describe();
    "#;

    assert_eq!(output_of(source), "<derived>\n");
}

// ───────────────────────────── runtime errors ─────────────────────────────

fn runtime_error(source: &str) -> (String, String) {
    let (status, output, diagnostics) = run(source);
    assert_eq!(status, Status::RuntimeError);
    assert_eq!(diagnostics.len(), 1, "{:?}", diagnostics);
    (output, diagnostics[0].clone())
}

#[test]
fn runtime_error_messages() {
    let cases: &[(&str, &str)] = &[
        ("-\"x\";", "Operand must be a number."),
        ("\"a\" + 1;", "Operands must be two numbers or two strings."),
        ("1 < \"2\";", "Operands must be numbers."),
        ("print missing;", "Undefined variable 'missing'."),
        ("missing = 1;", "Undefined variable 'missing'."),
        ("nil();", "Can only call functions and classes."),
        ("var x = 1; x.y;", "Only instances have properties."),
        ("var x = 1; x.y = 2;", "Only instances have properties."),
        ("class A {} A().nope;", "Undefined property 'nope'."),
        ("var B = 1; class A < B {}", "Superclass must be a class."),
        ("clock(1);", "Expected 0 arguments but got 1."),
        ("class A { init(x) {} } A();", "Expected 1 arguments but got 0."),
    ];

    for (source, message) in cases {
        let (_, diagnostic) = runtime_error(source);
        assert_eq!(diagnostic, format!("{}\n[line 1]", message), "{}", source);
    }
}

#[test]
fn non_class_superclass_reports_its_own_line() {
    let (_, diagnostic) = runtime_error("var NotAClass = 1;\nclass A\n<\nNotAClass {}");

    assert_eq!(diagnostic, "Superclass must be a class.\n[line 4]");
}

#[test]
fn deep_recursion_below_the_limit_completes() {
    let source = r#"
        fun depth(n) {
            if (n == 0) return 0;
            return 1 + depth(n - 1);
        }
        print depth(2000);
    "#;

    assert_eq!(output_of(source), "2000\n");
}

#[test]
fn unbounded_recursion_is_a_runtime_error() {
    let (output, diagnostic) =
        runtime_error("fun depth(n) { return 1 + depth(n + 1); }\nprint depth(0);");

    assert_eq!(output, "");
    assert_eq!(diagnostic, "Stack overflow.\n[line 1]");
}

#[test]
fn session_recovers_after_stack_overflow() {
    let mut session = Session::new();

    assert_eq!(session.run("fun loop() { loop(); } loop();"), Status::RuntimeError);
    assert_eq!(
        session.run("fun once(n) { return n; } print once(7);"),
        Status::Ok
    );
    assert_eq!(session.output(), "7\n");
}

#[test]
fn arity_mismatch_skips_the_body() {
    let (output, diagnostic) = runtime_error("fun f(a, b) { print \"body\"; }\nf(1);");

    assert_eq!(output, "");
    assert_eq!(diagnostic, "Expected 2 arguments but got 1.\n[line 2]");
}

#[test]
fn output_before_runtime_error_is_kept() {
    let (output, diagnostic) = runtime_error("print 1;\nprint -nil;\nprint 2;");

    assert_eq!(output, "1\n");
    assert_eq!(diagnostic, "Operand must be a number.\n[line 2]");
}

// ───────────────────────────── static errors ─────────────────────────────

#[test]
fn lexical_error_prevents_execution() {
    let (status, output, diagnostics) = run("print 1;\n@");

    assert_eq!(status, Status::StaticError);
    assert_eq!(output, "");
    assert_eq!(diagnostics, vec!["[line 2] Error: Unexpected character: @"]);
}

#[test]
fn lexical_and_syntax_errors_surface_together() {
    let (status, _, diagnostics) = run("var s = \"open;\n");

    assert_eq!(status, Status::StaticError);
    assert_eq!(
        diagnostics,
        vec![
            "[line 2] Error: Unterminated string.",
            "[line 2] Error at end: Expect expression.",
        ]
    );
}

#[test]
fn parse_errors_are_all_reported_and_nothing_runs() {
    let (status, output, diagnostics) = run("print 1;\nvar = 2;\nprint (;\nprint 3;");

    assert_eq!(status, Status::StaticError);
    assert_eq!(output, "");
    assert_eq!(
        diagnostics,
        vec![
            "[line 2] Error at '=': Expect variable name.",
            "[line 3] Error at ';': Expect expression.",
        ]
    );
}

#[test]
fn self_referencing_initializer_prevents_execution() {
    let (status, output, diagnostics) = run("print \"before\";\nvar a = a;");

    assert_eq!(status, Status::StaticError);
    assert_eq!(output, "");
    assert_eq!(
        diagnostics,
        vec!["[line 2] Error at 'a': Can't read local variable in its own initializer."]
    );
}

#[test]
fn exit_codes() {
    assert_eq!(run("print 1;").0.exit_code(), 0);
    assert_eq!(run("print ;").0.exit_code(), 65);
    assert_eq!(run("print -nil;").0.exit_code(), 70);
}

// ───────────────────────────── sessions ─────────────────────────────

fn parse_and_resolve(source: &str) -> (Vec<rox::ast::Stmt>, rox::resolver::Bindings) {
    let scanned = scan_tokens(source);
    assert!(scanned.is_clean(), "{:?}", scanned.errors);

    let parsed = Parser::new(&scanned.value).parse();
    assert!(parsed.is_clean(), "{:?}", parsed.errors);

    let resolved = Resolver::new().resolve(&parsed.value);
    assert!(resolved.is_clean(), "{:?}", resolved.errors);

    (parsed.value, resolved.value)
}

#[test]
fn run_resolved_executes_prebuilt_program() {
    let (statements, bindings) = parse_and_resolve(
        "var g = \"global\"; fun show() { var l = \"local\"; { print l + \" \" + g; } } show();",
    );

    let mut session = Session::new();
    let status = session.lox.run_resolved(&statements, bindings);

    assert_eq!(status, Status::Ok);
    assert_eq!(session.output(), "local global\n");
    assert!(!session.lox.had_runtime_error());
}

#[test]
fn run_resolved_reports_runtime_errors() {
    let (statements, bindings) = parse_and_resolve("print \"start\";\nprint 1 + nil;");

    let mut session = Session::new();
    let status = session.lox.run_resolved(&statements, bindings);

    assert_eq!(status, Status::RuntimeError);
    assert_eq!(session.output(), "start\n");
    assert_eq!(
        session.diagnostics(),
        vec!["Operands must be two numbers or two strings.\n[line 2]"]
    );
    assert!(session.lox.had_runtime_error());
    assert!(!session.lox.had_error());
}

/// Sink that accepts writes but refuses to flush.
struct UnflushableSink;

impl Write for UnflushableSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "sink closed"))
    }
}

#[test]
fn runtime_error_is_reported_even_when_flush_fails() {
    let reports = std::rc::Rc::new(std::cell::RefCell::new(CollectingReporter::new()));
    let mut lox = Lox::with_io(
        Box::new(UnflushableSink),
        Box::new(std::rc::Rc::clone(&reports)),
    );

    assert_eq!(lox.run("print 1;\nprint -nil;"), Status::RuntimeError);
    assert_eq!(
        reports.borrow().messages,
        vec!["Operand must be a number.\n[line 2]"]
    );
}

#[test]
fn globals_persist_across_runs() {
    let mut session = Session::new();

    assert_eq!(session.run("var a = 1; fun add(x) { return a + x; }"), Status::Ok);
    assert_eq!(session.run("a = 10;"), Status::Ok);
    assert_eq!(session.run("print add(5);"), Status::Ok);

    assert_eq!(session.output(), "15\n");
}

#[test]
fn locals_resolve_correctly_in_later_runs() {
    let mut session = Session::new();

    session.run("fun outer() { var x = \"first\"; { print x; } }");
    session.run("fun other() { var y = \"second\"; fun inner() { print y; } inner(); }");
    session.run("outer(); other();");

    assert_eq!(session.output(), "first\nsecond\n");
    assert!(session.diagnostics().is_empty());
}

#[test]
fn error_flags_track_and_reset() {
    let mut session = Session::new();

    session.run("print ;");
    assert!(session.lox.had_error());
    assert!(!session.lox.had_runtime_error());

    session.lox.reset_errors();
    session.run("print -nil;");
    assert!(!session.lox.had_error());
    assert!(session.lox.had_runtime_error());

    session.lox.reset_errors();
    assert_eq!(session.run("print \"ok\";"), Status::Ok);
    assert!(!session.lox.had_error());
    assert!(!session.lox.had_runtime_error());
}
