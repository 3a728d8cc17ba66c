//! Box analysis.
//!
//! A lambda parameter that is written anywhere in the lambda's body and read
//! from inside a nested lambda is moved into a box: a `Box` statement is
//! prepended to the body, and every read and write of the parameter in the
//! body becomes `BoxGet`/`BoxSet`.
//!
//! Occurrences are matched by lexical address. At nesting depth 0 (the
//! lambda's own body) parameter `minor` is `Param { minor }`, at depth `d > 0`
//! it is `Bound { major: d - 1, minor }`.

use super::tree_il::{ExprTag, LambdaKind, LexicalAddress, VarTag};

fn refers_to(var: &VarTag, minor: usize, depth: usize) -> bool {
    match var.lexical_address {
        LexicalAddress::Param { minor: m } => depth == 0 && m == minor,
        LexicalAddress::Bound { major, minor: m } => depth == major + 1 && m == minor,
        LexicalAddress::Free => false,
    }
}

#[derive(Default, Clone, Copy)]
struct Usage {
    written: bool,
    read_in_closure: bool,
}

fn scan(expr: &ExprTag, minor: usize, depth: usize, usage: &mut Usage) {
    match expr {
        ExprTag::Const(_) | ExprTag::Box(_) | ExprTag::BoxGet(_) => {}
        ExprTag::VarGet(var) => {
            if depth > 0 && refers_to(var, minor, depth) {
                usage.read_in_closure = true;
            }
        }
        ExprTag::VarSet { var, val } => {
            if refers_to(var, minor, depth) {
                usage.written = true;
            }
            scan(val, minor, depth, usage);
        }
        ExprTag::VarDef { val, .. } | ExprTag::BoxSet { val, .. } => scan(val, minor, depth, usage),
        ExprTag::If { test, dit, dif } => {
            scan(test, minor, depth, usage);
            scan(dit, minor, depth, usage);
            scan(dif, minor, depth, usage);
        }
        ExprTag::Seq(exprs) | ExprTag::Or(exprs) => {
            for expr in exprs {
                scan(expr, minor, depth, usage);
            }
        }
        ExprTag::Lambda { body, .. } => scan(body, minor, depth + 1, usage),
        ExprTag::Applic {
            applicative,
            params,
            ..
        } => {
            scan(applicative, minor, depth, usage);
            for param in params {
                scan(param, minor, depth, usage);
            }
        }
    }
}

/// Whether parameter `minor` of the lambda owning `body` must be boxed.
pub fn should_box(body: &ExprTag, minor: usize) -> bool {
    let mut usage = Usage::default();
    scan(body, minor, 0, &mut usage);
    usage.written && usage.read_in_closure
}

fn is_boxed(var: &VarTag, boxed: &[usize], depth: usize) -> bool {
    boxed.iter().any(|&minor| refers_to(var, minor, depth))
}

fn rewrite_all(exprs: Vec<ExprTag>, boxed: &[usize], depth: usize) -> Vec<ExprTag> {
    exprs
        .into_iter()
        .map(|expr| rewrite(expr, boxed, depth))
        .collect()
}

/// Turns accesses of the boxed parameters into box accesses.
fn rewrite(expr: ExprTag, boxed: &[usize], depth: usize) -> ExprTag {
    match expr {
        ExprTag::VarGet(var) if is_boxed(&var, boxed, depth) => ExprTag::BoxGet(var),
        ExprTag::VarSet { var, val } if is_boxed(&var, boxed, depth) => ExprTag::BoxSet {
            var,
            val: Box::new(rewrite(*val, boxed, depth)),
        },

        leaf @ (ExprTag::Const(_) | ExprTag::VarGet(_) | ExprTag::Box(_) | ExprTag::BoxGet(_)) => {
            leaf
        }
        ExprTag::VarSet { var, val } => ExprTag::VarSet {
            var,
            val: Box::new(rewrite(*val, boxed, depth)),
        },
        ExprTag::VarDef { var, val } => ExprTag::VarDef {
            var,
            val: Box::new(rewrite(*val, boxed, depth)),
        },
        ExprTag::BoxSet { var, val } => ExprTag::BoxSet {
            var,
            val: Box::new(rewrite(*val, boxed, depth)),
        },
        ExprTag::If { test, dit, dif } => ExprTag::If {
            test: Box::new(rewrite(*test, boxed, depth)),
            dit: Box::new(rewrite(*dit, boxed, depth)),
            dif: Box::new(rewrite(*dif, boxed, depth)),
        },
        ExprTag::Seq(exprs) => ExprTag::Seq(rewrite_all(exprs, boxed, depth)),
        ExprTag::Or(exprs) => ExprTag::Or(rewrite_all(exprs, boxed, depth)),
        ExprTag::Lambda { params, kind, body } => ExprTag::Lambda {
            params,
            kind,
            body: Box::new(rewrite(*body, boxed, depth + 1)),
        },
        ExprTag::Applic {
            applicative,
            params,
            kind,
        } => ExprTag::Applic {
            applicative: Box::new(rewrite(*applicative, boxed, depth)),
            params: rewrite_all(params, boxed, depth),
            kind,
        },
    }
}

fn box_lambda(params: Vec<String>, kind: LambdaKind, body: ExprTag) -> ExprTag {
    // inner lambdas first
    let body = box_set(body);

    let binders = kind.binders(&params);
    let boxed = (0..binders.len())
        .filter(|&minor| should_box(&body, minor))
        .collect::<Vec<_>>();

    if boxed.is_empty() {
        return ExprTag::Lambda {
            params,
            kind,
            body: Box::new(body),
        };
    }

    for &minor in &boxed {
        log::trace!("boxing parameter {}", binders[minor]);
    }

    let mut stmts = boxed
        .iter()
        .map(|&minor| ExprTag::Box(VarTag::new(&binders[minor], LexicalAddress::Param { minor })))
        .collect::<Vec<_>>();

    match rewrite(body, &boxed, 0) {
        ExprTag::Seq(exprs) => stmts.extend(exprs),
        body => stmts.push(body),
    }

    ExprTag::Lambda {
        params,
        kind,
        body: Box::new(ExprTag::Seq(stmts)),
    }
}

fn box_set_all(exprs: Vec<ExprTag>) -> Vec<ExprTag> {
    exprs.into_iter().map(box_set).collect()
}

/// Boxes the mutable captured parameters of every lambda in the tree.
pub fn box_set(expr: ExprTag) -> ExprTag {
    match expr {
        ExprTag::Const(_)
        | ExprTag::VarGet(_)
        | ExprTag::Box(_)
        | ExprTag::BoxGet(_) => expr,
        ExprTag::VarSet { var, val } => ExprTag::VarSet {
            var,
            val: Box::new(box_set(*val)),
        },
        ExprTag::VarDef { var, val } => ExprTag::VarDef {
            var,
            val: Box::new(box_set(*val)),
        },
        ExprTag::BoxSet { var, val } => ExprTag::BoxSet {
            var,
            val: Box::new(box_set(*val)),
        },
        ExprTag::If { test, dit, dif } => ExprTag::If {
            test: Box::new(box_set(*test)),
            dit: Box::new(box_set(*dit)),
            dif: Box::new(box_set(*dif)),
        },
        ExprTag::Seq(exprs) => ExprTag::Seq(box_set_all(exprs)),
        ExprTag::Or(exprs) => ExprTag::Or(box_set_all(exprs)),
        ExprTag::Lambda { params, kind, body } => box_lambda(params, kind, *body),
        ExprTag::Applic {
            applicative,
            params,
            kind,
        } => ExprTag::Applic {
            applicative: Box::new(box_set(*applicative)),
            params: box_set_all(params),
            kind,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexical::annotate_lexical_addresses;
    use crate::compiler::sexpr::SExp;
    use crate::compiler::tree_il::{Expr, Var};

    fn lambda(params: &[&str], body: Expr) -> Expr {
        Expr::Lambda {
            params: params.iter().map(|p| p.to_string()).collect(),
            kind: LambdaKind::Simple,
            body: Box::new(body),
        }
    }

    fn get(name: &str) -> Expr {
        Expr::VarGet(Var::new(name))
    }

    fn set(name: &str, val: Expr) -> Expr {
        Expr::VarSet {
            var: Var::new(name),
            val: Box::new(val),
        }
    }

    fn one() -> Expr {
        Expr::Const(SExp::integer(1))
    }

    fn boxed(expr: &Expr) -> ExprTag {
        box_set(annotate_lexical_addresses(expr).unwrap())
    }

    fn param(name: &str, minor: usize) -> VarTag {
        VarTag::new(name, LexicalAddress::Param { minor })
    }

    #[test]
    fn set_and_captured_read_is_boxed() {
        // (lambda (x) (set! x 1) (lambda () x))
        let tree = lambda(&["x"], Expr::Seq(vec![set("x", one()), lambda(&[], get("x"))]));

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

        assert_eq!(boxed(&tree), expected);
    }

    #[test]
    fn mutated_but_not_captured_is_not_boxed() {
        // (lambda (x) (set! x 1) x)
        let tree = lambda(&["x"], Expr::Seq(vec![set("x", one()), get("x")]));
        let tagged = annotate_lexical_addresses(&tree).unwrap();
        assert_eq!(box_set(tagged.clone()), tagged);
    }

    #[test]
    fn captured_but_never_set_is_not_boxed() {
        // (lambda (x) (lambda () (lambda () x)))
        let tree = lambda(&["x"], lambda(&[], lambda(&[], get("x"))));
        let tagged = annotate_lexical_addresses(&tree).unwrap();
        assert_eq!(box_set(tagged.clone()), tagged);
    }

    #[test]
    fn set_in_closure_and_read_in_closure_is_boxed() {
        // (lambda (x) (lambda () (set! x 1)) (lambda () x))
        let tree = lambda(
            &["x"],
            Expr::Seq(vec![lambda(&[], set("x", one())), lambda(&[], get("x"))]),
        );

        let ExprTag::Lambda { body, .. } = boxed(&tree) else {
            panic!("expected a lambda");
        };
        let ExprTag::Seq(stmts) = *body else {
            panic!("expected a sequence");
        };

        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[0], ExprTag::Box(param("x", 0)));
        assert!(matches!(
            &stmts[1],
            ExprTag::Lambda { body, .. } if matches!(**body, ExprTag::BoxSet { .. })
        ));
        assert!(matches!(
            &stmts[2],
            ExprTag::Lambda { body, .. } if matches!(**body, ExprTag::BoxGet(_))
        ));
    }

    #[test]
    fn shadowed_inner_parameter_does_not_trigger_boxing() {
        // (lambda (x) (set! x 1) (lambda (x) x))
        let tree = lambda(&["x"], Expr::Seq(vec![set("x", one()), lambda(&["x"], get("x"))]));
        let tagged = annotate_lexical_addresses(&tree).unwrap();
        assert_eq!(box_set(tagged.clone()), tagged);
    }

    #[test]
    fn only_qualifying_parameters_are_boxed() {
        // (lambda (a b) (set! b a) (lambda () b))
        let tree = lambda(
            &["a", "b"],
            Expr::Seq(vec![set("b", get("a")), lambda(&[], get("b"))]),
        );

        let ExprTag::Lambda { body, .. } = boxed(&tree) else {
            panic!("expected a lambda");
        };
        let ExprTag::Seq(stmts) = *body else {
            panic!("expected a sequence");
        };

        assert_eq!(stmts[0], ExprTag::Box(param("b", 1)));
        assert_eq!(
            stmts[1],
            ExprTag::BoxSet {
                var: param("b", 1),
                val: Box::new(ExprTag::VarGet(param("a", 0))),
            }
        );
    }

    #[test]
    fn inner_lambdas_box_their_own_parameters() {
        // (lambda (x) (lambda (y) (set! y x) (lambda () y)))
        let tree = lambda(
            &["x"],
            lambda(
                &["y"],
                Expr::Seq(vec![set("y", get("x")), lambda(&[], get("y"))]),
            ),
        );

        let ExprTag::Lambda { body: outer_body, .. } = boxed(&tree) else {
            panic!("expected a lambda");
        };
        let ExprTag::Lambda { body, .. } = *outer_body else {
            panic!("expected a lambda");
        };

        assert_eq!(
            *body,
            ExprTag::Seq(vec![
                ExprTag::Box(param("y", 0)),
                ExprTag::BoxSet {
                    var: param("y", 0),
                    val: Box::new(ExprTag::VarGet(VarTag::new(
                        "x",
                        LexicalAddress::Bound { major: 0, minor: 0 }
                    ))),
                },
                ExprTag::Lambda {
                    params: vec![],
                    kind: LambdaKind::Simple,
                    body: Box::new(ExprTag::BoxGet(VarTag::new(
                        "y",
                        LexicalAddress::Bound { major: 0, minor: 0 }
                    ))),
                },
            ])
        );
    }

    #[test]
    fn boxing_is_idempotent() {
        let tree = lambda(&["x"], Expr::Seq(vec![set("x", one()), lambda(&[], get("x"))]));
        let once = boxed(&tree);
        assert_eq!(box_set(once.clone()), once);
    }
}
