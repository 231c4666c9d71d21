use pretty_assertions::assert_eq;

use rox::ast::{Expr, LiteralValue, Stmt};
use rox::error::PhaseOutput;
use rox::parser::Parser;
use rox::scanner::scan_tokens;
use rox::token::TokenType;

fn parse(source: &str) -> PhaseOutput<Vec<Stmt>> {
    let scanned = scan_tokens(source);
    assert!(scanned.is_clean(), "scan errors: {:?}", scanned.errors);

    Parser::new(&scanned.value).parse()
}

fn messages(out: &PhaseOutput<Vec<Stmt>>) -> Vec<String> {
    out.errors.iter().map(ToString::to_string).collect()
}

#[test]
fn factor_binds_tighter_than_term() {
    let out = parse("1 + 2 * 3;");
    assert!(out.is_clean());

    let Stmt::Expression(Expr::Binary {
        left,
        operator,
        right,
    }) = &out.value[0]
    else {
        panic!("expected binary expression statement, got {:?}", out.value);
    };

    assert_eq!(operator.token_type, TokenType::PLUS);
    assert_eq!(**left, Expr::Literal(LiteralValue::Number(1.0)));
    assert!(matches!(
        &**right,
        Expr::Binary { operator, .. } if operator.token_type == TokenType::STAR
    ));
}

#[test]
fn assignment_is_right_associative() {
    let out = parse("a = b = 1;");
    assert!(out.is_clean());

    let Stmt::Expression(Expr::Assign { name, value, .. }) = &out.value[0] else {
        panic!("expected assignment, got {:?}", out.value);
    };
    assert_eq!(name.lexeme, "a");
    assert!(matches!(&**value, Expr::Assign { name, .. } if name.lexeme == "b"));
}

#[test]
fn property_assignment_becomes_set() {
    let out = parse("point.x = 3;");
    assert!(out.is_clean());
    assert!(matches!(
        &out.value[0],
        Stmt::Expression(Expr::Set { name, .. }) if name.lexeme == "x"
    ));
}

#[test]
fn invalid_assignment_target_is_reported_without_losing_statement() {
    let out = parse("1 + 2 = 3; print 4;");

    assert_eq!(
        messages(&out),
        vec!["[line 1] Error at '=': Invalid assignment target."]
    );
    assert_eq!(out.value.len(), 2);
}

#[test]
fn for_loop_desugars_into_block_and_while() {
    let out = parse("for (var i = 0; i < 3; i = i + 1) print i;");
    assert!(out.is_clean());

    let Stmt::Block(outer) = &out.value[0] else {
        panic!("expected block, got {:?}", out.value);
    };
    assert!(matches!(outer[0], Stmt::Var { .. }));

    let Stmt::While { body, .. } = &outer[1] else {
        panic!("expected while, got {:?}", outer[1]);
    };
    let Stmt::Block(inner) = &**body else {
        panic!("expected body block, got {:?}", body);
    };
    assert!(matches!(inner[0], Stmt::Print(_)));
    assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
}

#[test]
fn for_loop_without_condition_loops_on_true() {
    let out = parse("for (;;) print 1;");
    assert!(out.is_clean());

    assert!(matches!(
        &out.value[0],
        Stmt::While {
            condition: Expr::Literal(LiteralValue::True),
            ..
        }
    ));
}

#[test]
fn synchronize_reports_one_error_per_bad_statement() {
    let out = parse("var = 1;\nprint 2;\nvar b = ;\nprint 3;");

    assert_eq!(
        messages(&out),
        vec![
            "[line 1] Error at '=': Expect variable name.",
            "[line 3] Error at ';': Expect expression.",
        ]
    );
    // Both prints survive.
    assert_eq!(out.value.len(), 2);
    assert!(out.value.iter().all(|s| matches!(s, Stmt::Print(_))));
}

#[test]
fn missing_semicolon_at_end_reports_at_end() {
    let out = parse("print 1");

    assert_eq!(
        messages(&out),
        vec!["[line 1] Error at end: Expect ';' after value."]
    );
}

#[test]
fn class_with_superclass_and_methods() {
    let out = parse("class B < A { init(x) { this.x = x; } get() { return super.get(); } }");
    assert!(out.is_clean(), "{:?}", out.errors);

    let Stmt::Class {
        name,
        superclass,
        methods,
    } = &out.value[0]
    else {
        panic!("expected class, got {:?}", out.value);
    };

    assert_eq!(name.lexeme, "B");
    assert!(matches!(superclass, Some(Expr::Variable { name, .. }) if name.lexeme == "A"));

    let names: Vec<&str> = methods.iter().map(|m| m.name.lexeme.as_str()).collect();
    assert_eq!(names, vec!["init", "get"]);
    assert_eq!(methods[0].params.len(), 1);
}

#[test]
fn super_requires_method_name() {
    let out = parse("class B < A { m() { super; } }");

    assert_eq!(
        messages(&out),
        vec!["[line 1] Error at ';': Expect '.' after 'super'."]
    );
}

#[test]
fn identical_references_get_distinct_ids() {
    let out = parse("a; a;");
    assert!(out.is_clean());

    let ids: Vec<_> = out
        .value
        .iter()
        .map(|s| match s {
            Stmt::Expression(Expr::Variable { id, .. }) => *id,
            other => panic!("expected variable, got {:?}", other),
        })
        .collect();

    assert_ne!(ids[0], ids[1]);
}

#[test]
fn ids_start_where_the_session_left_off() {
    let scanned = scan_tokens("x;");
    let mut parser = Parser::with_first_id(&scanned.value, 40);
    let out = parser.parse();

    assert!(matches!(
        &out.value[0],
        Stmt::Expression(Expr::Variable { id, .. }) if id.0 == 40
    ));
    assert_eq!(parser.next_id(), 41);
}

#[test]
fn too_many_arguments_is_reported() {
    let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
    let out = parse(&format!("f({});", args.join(", ")));

    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].message(), "Can't have more than 255 arguments.");
    assert_eq!(out.value.len(), 1);
}
