use scheme_annotate::prelude::*;
use serde_json::{json, Value};

fn annotated(code: &str) -> Vec<ExprTag> {
    match Pipeline::default().analyze(ParsingMode::Annotated, code) {
        Ok(Analyzed::Annotated(exprs)) => exprs,
        other => panic!("expected annotated trees, got {:?}", other),
    }
}

fn param(name: &str, minor: usize) -> VarTag {
    VarTag::new(name, LexicalAddress::Param { minor })
}

#[test]
fn assigned_and_captured_parameter_is_boxed() {
    let exprs = annotated("(lambda (x) (set! x 1) (lambda () x))");

    let expected = ExprTag::Lambda {
        params: vec!["x".to_string()],
        kind: LambdaKind::Simple,
        body: Box::new(ExprTag::Seq(vec![
            ExprTag::Box(param("x", 0)),
            ExprTag::BoxSet {
                var: param("x", 0),
                val: Box::new(ExprTag::Const(SExp::integer(1))),
            },
            ExprTag::Lambda {
                params: vec![],
                kind: LambdaKind::Simple,
                body: Box::new(ExprTag::BoxGet(VarTag::new(
                    "x",
                    LexicalAddress::Bound { major: 0, minor: 0 },
                ))),
            },
        ])),
    };

    assert_eq!(exprs, vec![expected]);
}

#[test]
fn boxed_program_on_the_wire() {
    let wire = parse_scheme(ParsingMode::Annotated, "(lambda (x) (set! x 1) (lambda () x))").unwrap();

    let body = &wire["value"][0]["value"]["body"];
    assert_eq!(body["type"], "SeqTag");
    assert_eq!(body["value"]["exprs"]["value"][0]["type"], "BoxTag");
    assert_eq!(body["value"]["exprs"]["value"][1]["type"], "BoxSetTag");

    let inner = &body["value"]["exprs"]["value"][2]["value"]["body"];
    assert_eq!(
        *inner,
        json!({
            "type": "BoxGetTag",
            "value": {
                "var": {
                    "type": "VarTag",
                    "value": {
                        "name": "x",
                        "lexical_address": { "type": "Bound", "value": { "major": 0, "minor": 0 } }
                    }
                }
            }
        })
    );
}

#[test]
fn tail_calls_in_lambda_body() {
    let exprs = annotated("(lambda (f g) (f) (g))");

    let ExprTag::Lambda { body, .. } = &exprs[0] else {
        panic!("expected a lambda");
    };
    let ExprTag::Seq(calls) = &**body else {
        panic!("expected a sequence");
    };

    let kinds = calls
        .iter()
        .map(|call| match call {
            ExprTag::Applic { kind, .. } => *kind,
            other => panic!("expected an application, got {}", other),
        })
        .collect::<Vec<_>>();

    assert_eq!(kinds, vec![AppKind::NonTailCall, AppKind::TailCall]);
}

#[test]
fn values_mode_returns_raw_data() {
    let wire = parse_scheme(ParsingMode::Values, "#t x 1/2 \"s\" #\\a").unwrap();

    assert_eq!(
        wire,
        json!({
            "type": "List",
            "value": [
                { "type": "Boolean", "value": true },
                { "type": "Symbol", "value": "x" },
                { "type": "Rational", "value": { "numerator": 1, "denominator": 2 } },
                { "type": "String", "value": "s" },
                { "type": "Char", "value": "a" },
            ]
        })
    );
}

#[test]
fn unannotated_mode_parses_each_form() {
    let wire = parse_scheme(ParsingMode::Unannotated, "(define y 2) (if y 'a)").unwrap();
    let forms = wire["value"].as_array().unwrap();

    assert_eq!(forms.len(), 2);
    assert_eq!(forms[0]["type"], "VarDef");
    assert_eq!(forms[1]["type"], "If");
    assert_eq!(
        forms[1]["value"]["dit"],
        json!({ "type": "Const", "value": { "sexpr": { "type": "Symbol", "value": "a" } } })
    );
    assert_eq!(
        forms[1]["value"]["dif"],
        json!({ "type": "Const", "value": { "sexpr": { "type": "Void" } } })
    );
}

#[test]
fn malformed_source_is_a_syntax_error() {
    let response = Pipeline::default().handle(&json!({ "mode": "ANNOTATED", "code": "(define x" }));
    assert_eq!(response["type"], "SyntaxError");

    let response = Pipeline::default().handle(&json!({ "mode": "ANNOTATED", "code": "(if)" }));
    assert_eq!(response["type"], "SyntaxError");
}

#[test]
fn unknown_mode_fails_before_reading() {
    let response = Pipeline::default().handle(&json!({ "mode": "EVERYTHING", "code": "(" }));
    assert_eq!(response["type"], "LookupError");
}

#[test]
fn duplicate_parameters_are_an_analysis_error() {
    let response = Pipeline::default().handle(&json!({ "mode": "ANNOTATED", "code": "(lambda (x x) x)" }));
    assert_eq!(response["type"], "AnalysisError");

    // the expander alone accepts them
    let wire = parse_scheme(ParsingMode::Unannotated, "(lambda (x x) x)").unwrap();
    assert_eq!(wire["value"][0]["type"], "Lambda");
}

#[test]
fn concurrent_requests_are_independent() {
    let pipeline = Pipeline::default();
    let sources = [
        "(lambda (x) (set! x 1) (lambda () x))",
        "(let loop ((i 0)) (if (< i 10) (loop (+ i 1)) i))",
        "(lambda (x x) x)",
        "(define (f . args) args)",
        "(",
    ];

    let sequential = sources
        .iter()
        .map(|code| pipeline.handle(&json!({ "mode": "ANNOTATED", "code": code })))
        .collect::<Vec<Value>>();

    let concurrent = std::thread::scope(|scope| {
        let handles = sources
            .iter()
            .map(|code| {
                let pipeline = &pipeline;
                scope.spawn(move || pipeline.handle(&json!({ "mode": "ANNOTATED", "code": code })))
            })
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<Value>>()
    });

    assert_eq!(sequential, concurrent);
    assert_eq!(concurrent[2]["type"], "AnalysisError");
    assert_eq!(concurrent[4]["type"], "SyntaxError");
}

#[test]
fn every_tree_family_serializes() {
    let code = "(define (f a . rest)
                  (let* ((b a) (c (lambda () (set! b c) b)))
                    (cond ((null? rest) => car) (else (or a b `(1 ,c #(2)))))))
                (set! f 2.5)";

    for mode in ParsingMode::ALL {
        let analyzed = Pipeline::default().analyze(mode, code).unwrap();
        assert_eq!(analyzed.len(), 2);

        let wire = match &analyzed {
            Analyzed::Values(values) => serialize(values),
            Analyzed::Unannotated(exprs) => serialize(exprs),
            Analyzed::Annotated(exprs) => serialize(exprs),
        }
        .unwrap();
        assert_eq!(wire, analyzed.to_wire());
        assert_eq!(wire["type"], "List");
    }

    // wire values are not themselves trees
    assert!(matches!(
        serialize(&json!({ "k": 1 })),
        Err(ScmError::UnserializableType(_))
    ));
}
