//! Syntactic parser.
//!
//! Converts raw values into [`Expr`] trees. Core special forms map directly to
//! `Expr` variants, the standard derived forms (`let`, `let*`, `letrec`, `cond`,
//! `and`, `when`, `unless`, `quasiquote`) are rewritten into core forms here.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::sexpr::SExp;
use super::tree_il::{Expr, LambdaKind, Var};
use crate::error::{ScmError, ScmResult};

type Special = fn(&SExp) -> ScmResult<Expr>;

/// Words that can never name a variable.
pub const RESERVED_WORDS: &[&str] = &[
    "and",
    "begin",
    "cond",
    "define",
    "else",
    "if",
    "lambda",
    "let",
    "let*",
    "letrec",
    "or",
    "quasiquote",
    "quote",
    "set!",
    "unless",
    "unquote",
    "unquote-splicing",
    "when",
];

pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

static SPECIAL_FORMS: Lazy<HashMap<&'static str, Special>> = Lazy::new(|| {
    let mut env: HashMap<&'static str, Special> = HashMap::with_capacity(32);

    macro_rules! define_syntax {
        ($name: literal, $form: ident, $b: block) => {{
            fn stx($form: &SExp) -> ScmResult<Expr> {
                $b
            }

            env.insert($name, stx as Special);
        }};
    }

    define_syntax!("quote", form, {
        match form_args(form, "quote")?.as_slice() {
            [datum] => Ok(Expr::Const((*datum).clone())),
            _ => Err(illegal("quote", form)),
        }
    });

    define_syntax!("quasiquote", form, {
        match form_args(form, "quasiquote")?.as_slice() {
            [template] => expand(&quasiquote(template)?),
            _ => Err(illegal("quasiquote", form)),
        }
    });

    define_syntax!("if", form, {
        match form_args(form, "if")?.as_slice() {
            [test, dit] => Ok(Expr::If {
                test: Box::new(expand(test)?),
                dit: Box::new(expand(dit)?),
                dif: Box::new(Expr::Const(SExp::Void)),
            }),
            [test, dit, dif] => Ok(Expr::If {
                test: Box::new(expand(test)?),
                dit: Box::new(expand(dit)?),
                dif: Box::new(expand(dif)?),
            }),
            _ => Err(illegal("if", form)),
        }
    });

    define_syntax!("or", form, {
        let args = form_args(form, "or")?;

        match args.as_slice() {
            [] => Ok(Expr::Const(SExp::Boolean(false))),
            [single] => expand(single),
            _ => Ok(Expr::Or(expand_all(&args)?)),
        }
    });

    define_syntax!("and", form, {
        let args = form_args(form, "and")?;

        match args.split_first() {
            None => Ok(Expr::Const(SExp::Boolean(true))),
            Some((single, [])) => expand(single),
            Some((first, rest)) => {
                let rest = SExp::cons(SExp::symbol("and"), SExp::list(&owned(rest)));

                Ok(Expr::If {
                    test: Box::new(expand(first)?),
                    dit: Box::new(expand(&rest)?),
                    dif: Box::new(Expr::Const(SExp::Boolean(false))),
                })
            }
        }
    });

    define_syntax!("begin", form, {
        let args = form_args(form, "begin")?;
        Ok(make_seq(expand_all(&args)?))
    });

    define_syntax!("lambda", form, {
        let args = form_args(form, "lambda")?;

        match args.split_first() {
            Some((formals, body)) if !body.is_empty() => {
                let (params, kind) = parse_formals(formals, form)?;

                Ok(Expr::Lambda {
                    params,
                    kind,
                    body: Box::new(expand_body(body)?),
                })
            }
            _ => Err(illegal("lambda", form)),
        }
    });

    define_syntax!("define", form, {
        let (name, val) = define_binding(form)?;

        Ok(Expr::VarDef {
            var: Var::new(name),
            val: Box::new(val),
        })
    });

    define_syntax!("set!", form, {
        match form_args(form, "set!")?.as_slice() {
            [var, val] => Ok(Expr::VarSet {
                var: Var::new(variable_name(var, form, "set!")?),
                val: Box::new(expand(val)?),
            }),
            _ => Err(illegal("set!", form)),
        }
    });

    define_syntax!("let", form, {
        let args = form_args(form, "let")?;

        match args.as_slice() {
            // (let name ((var init) ...) body ...)
            [name, bindings, body @ ..] if name.as_symbol().is_some() && !body.is_empty() => {
                let name = variable_name(name, form, "named let")?;
                let bindings = parse_bindings(bindings, form)?;
                let (params, inits): (Vec<_>, Vec<_>) = bindings.into_iter().unzip();

                let proc = Expr::Lambda {
                    params,
                    kind: LambdaKind::Simple,
                    body: Box::new(expand_body(body)?),
                };
                let loop_ = make_letrec(
                    vec![(name.clone(), proc)],
                    Expr::VarGet(Var::new(name)),
                );

                Ok(Expr::Applic {
                    applicative: Box::new(loop_),
                    params: expand_all(&inits)?,
                })
            }

            [bindings, body @ ..] if !body.is_empty() => {
                let bindings = parse_bindings(bindings, form)?
                    .into_iter()
                    .map(|(name, init)| Ok((name, expand(init)?)))
                    .collect::<ScmResult<Vec<_>>>()?;

                Ok(make_let(bindings, expand_body(body)?))
            }

            _ => Err(illegal("let", form)),
        }
    });

    define_syntax!("let*", form, {
        let args = form_args(form, "let*")?;

        match args.as_slice() {
            [bindings, body @ ..] if !body.is_empty() => {
                let bindings = parse_bindings(bindings, form)?;
                expand_let_star(&bindings, body)
            }
            _ => Err(illegal("let*", form)),
        }
    });

    define_syntax!("letrec", form, {
        let args = form_args(form, "letrec")?;

        match args.as_slice() {
            [bindings, body @ ..] if !body.is_empty() => {
                let bindings = parse_bindings(bindings, form)?
                    .into_iter()
                    .map(|(name, init)| Ok((name, expand(init)?)))
                    .collect::<ScmResult<Vec<_>>>()?;

                Ok(make_letrec(bindings, expand_body(body)?))
            }
            _ => Err(illegal("letrec", form)),
        }
    });

    define_syntax!("cond", form, {
        let clauses = form_args(form, "cond")?;
        expand_cond(&clauses, form)
    });

    define_syntax!("when", form, {
        let args = form_args(form, "when")?;

        match args.split_first() {
            Some((test, body)) if !body.is_empty() => Ok(Expr::If {
                test: Box::new(expand(test)?),
                dit: Box::new(make_seq(expand_all(body)?)),
                dif: Box::new(Expr::Const(SExp::Void)),
            }),
            _ => Err(illegal("when", form)),
        }
    });

    define_syntax!("unless", form, {
        let args = form_args(form, "unless")?;

        match args.split_first() {
            Some((test, body)) if !body.is_empty() => Ok(Expr::If {
                test: Box::new(expand(test)?),
                dit: Box::new(Expr::Const(SExp::Void)),
                dif: Box::new(make_seq(expand_all(body)?)),
            }),
            _ => Err(illegal("unless", form)),
        }
    });

    env
});

fn illegal(what: &str, form: &SExp) -> ScmError {
    ScmError::Syntax(format!("illegal {}: {}", what, form))
}

fn owned(elems: &[&SExp]) -> Vec<SExp> {
    elems.iter().map(|elem| (*elem).clone()).collect()
}

/// Operands of a special form, which must be a proper list.
fn form_args<'a>(form: &'a SExp, what: &str) -> ScmResult<Vec<&'a SExp>> {
    form.cdr()
        .and_then(SExp::list_to_vec)
        .ok_or_else(|| illegal(what, form))
}

fn variable_name(x: &SExp, form: &SExp, what: &str) -> ScmResult<String> {
    match x.as_symbol() {
        Some(name) if !is_reserved_word(name) => Ok(name.to_string()),
        Some(name) => Err(ScmError::Syntax(format!(
            "reserved word {} used as a variable in {}: {}",
            name, what, form
        ))),
        None => Err(illegal(what, form)),
    }
}

fn expand_all(forms: &[&SExp]) -> ScmResult<Vec<Expr>> {
    forms.iter().map(|form| expand(form)).collect()
}

/// Sequence of expressions, splicing nested sequences.
pub fn make_seq(exprs: Vec<Expr>) -> Expr {
    let mut flat = Vec::with_capacity(exprs.len());

    for expr in exprs {
        match expr {
            Expr::Seq(inner) => flat.extend(inner),
            expr => flat.push(expr),
        }
    }

    match flat.len() {
        0 => Expr::Const(SExp::Void),
        1 => flat.pop().unwrap_or(Expr::Const(SExp::Void)),
        _ => Expr::Seq(flat),
    }
}

fn make_let(bindings: Vec<(String, Expr)>, body: Expr) -> Expr {
    let (params, inits): (Vec<_>, Vec<_>) = bindings.into_iter().unzip();

    Expr::Applic {
        applicative: Box::new(Expr::Lambda {
            params,
            kind: LambdaKind::Simple,
            body: Box::new(body),
        }),
        params: inits,
    }
}

/// `letrec` as a `let` of placeholders followed by assignments.
fn make_letrec(bindings: Vec<(String, Expr)>, body: Expr) -> Expr {
    let mut placeholders = Vec::with_capacity(bindings.len());
    let mut body_exprs = Vec::with_capacity(bindings.len() + 1);

    for (name, init) in bindings {
        placeholders.push((name.clone(), Expr::Const(SExp::symbol("whatever"))));
        body_exprs.push(Expr::VarSet {
            var: Var::new(name),
            val: Box::new(init),
        });
    }

    body_exprs.push(body);
    make_let(placeholders, make_seq(body_exprs))
}

fn expand_let_star(bindings: &[(String, &SExp)], body: &[&SExp]) -> ScmResult<Expr> {
    match bindings.split_first() {
        None => Ok(make_let(vec![], expand_body(body)?)),
        Some(((name, init), [])) => Ok(make_let(
            vec![(name.clone(), expand(init)?)],
            expand_body(body)?,
        )),
        Some(((name, init), rest)) => Ok(make_let(
            vec![(name.clone(), expand(init)?)],
            expand_let_star(rest, body)?,
        )),
    }
}

fn parse_bindings<'a>(bindings: &'a SExp, form: &SExp) -> ScmResult<Vec<(String, &'a SExp)>> {
    let bindings = bindings
        .list_to_vec()
        .ok_or_else(|| illegal("bindings", form))?;

    bindings
        .into_iter()
        .map(|binding| match binding.list_to_vec().as_deref() {
            Some([name, init]) => Ok((variable_name(name, form, "binding")?, *init)),
            _ => Err(illegal("binding", form)),
        })
        .collect()
}

fn parse_formals(formals: &SExp, form: &SExp) -> ScmResult<(Vec<String>, LambdaKind)> {
    let (required, rest) = formals.improper_list();

    let params = required
        .into_iter()
        .map(|param| variable_name(param, form, "formal parameter"))
        .collect::<ScmResult<Vec<_>>>()?;

    let kind = if rest.is_null() {
        LambdaKind::Simple
    } else {
        LambdaKind::Opt {
            opt: variable_name(rest, form, "rest parameter")?,
        }
    };

    Ok((params, kind))
}

/// Name and value of a `define` form, MIT-style procedure definitions included.
fn define_binding(form: &SExp) -> ScmResult<(String, Expr)> {
    let args = form_args(form, "define")?;

    match args.as_slice() {
        [name, val] if name.as_symbol().is_some() => {
            Ok((variable_name(name, form, "define")?, expand(val)?))
        }

        // (define (name . formals) body ...)
        [signature, body @ ..] if signature.is_pair() && !body.is_empty() => {
            let (name, formals) = signature.pair().ok_or_else(|| illegal("define", form))?;
            let (params, kind) = parse_formals(formals, form)?;

            Ok((
                variable_name(name, form, "define")?,
                Expr::Lambda {
                    params,
                    kind,
                    body: Box::new(expand_body(body)?),
                },
            ))
        }

        _ => Err(illegal("define", form)),
    }
}

fn is_definition(form: &SExp) -> bool {
    form.car().and_then(SExp::as_symbol) == Some("define")
}

/// Lambda and `let` bodies. Leading internal definitions become a `letrec`.
fn expand_body(body: &[&SExp]) -> ScmResult<Expr> {
    let split = body
        .iter()
        .position(|form| !is_definition(form))
        .unwrap_or(body.len());
    let (defines, exprs) = body.split_at(split);

    if defines.is_empty() {
        return Ok(make_seq(expand_all(exprs)?));
    }

    if exprs.is_empty() {
        return Err(ScmError::Syntax(format!(
            "body has no expression after definitions: {}",
            defines[defines.len() - 1]
        )));
    }

    let bindings = defines
        .iter()
        .map(|form| define_binding(form))
        .collect::<ScmResult<Vec<_>>>()?;

    Ok(make_letrec(bindings, make_seq(expand_all(exprs)?)))
}

fn expand_cond(clauses: &[&SExp], form: &SExp) -> ScmResult<Expr> {
    let Some((clause, rest)) = clauses.split_first() else {
        return Ok(Expr::Const(SExp::Void));
    };

    let parts = clause
        .list_to_vec()
        .filter(|parts| !parts.is_empty())
        .ok_or_else(|| illegal("cond clause", form))?;

    match parts.as_slice() {
        [test, body @ ..] if test.as_symbol() == Some("else") => {
            if !rest.is_empty() || body.is_empty() {
                return Err(illegal("cond else clause", form));
            }

            Ok(make_seq(expand_all(body)?))
        }

        [test, arrow, receiver] if arrow.as_symbol() == Some("=>") => {
            let value = Expr::VarGet(Var::new("value"));
            let thunk = |body: Expr| Expr::Lambda {
                params: vec![],
                kind: LambdaKind::Simple,
                body: Box::new(body),
            };
            let call = |callee: Expr, params: Vec<Expr>| Expr::Applic {
                applicative: Box::new(callee),
                params,
            };

            let mut bindings = vec![
                ("value".to_string(), expand(test)?),
                ("f".to_string(), thunk(expand(receiver)?)),
            ];

            let dif = if rest.is_empty() {
                Expr::Const(SExp::Void)
            } else {
                bindings.push(("rest".to_string(), thunk(expand_cond(rest, form)?)));
                call(Expr::VarGet(Var::new("rest")), vec![])
            };

            let body = Expr::If {
                test: Box::new(value.clone()),
                dit: Box::new(call(
                    call(Expr::VarGet(Var::new("f")), vec![]),
                    vec![value],
                )),
                dif: Box::new(dif),
            };

            Ok(make_let(bindings, body))
        }

        [test] => {
            let mut exprs = vec![expand(test)?];
            if !rest.is_empty() {
                exprs.push(expand_cond(rest, form)?);
            }

            Ok(match exprs.len() {
                1 => exprs.remove(0),
                _ => Expr::Or(exprs),
            })
        }

        [test, body @ ..] => Ok(Expr::If {
            test: Box::new(expand(test)?),
            dit: Box::new(make_seq(expand_all(body)?)),
            dif: Box::new(expand_cond(rest, form)?),
        }),

        [] => Err(illegal("cond clause", form)),
    }
}

/// `(tag x)` yields `x`.
fn tagged<'a>(x: &'a SExp, tag: &str) -> Option<&'a SExp> {
    let (head, rest) = x.pair()?;

    if head.as_symbol() != Some(tag) {
        return None;
    }

    match rest.list_to_vec()?.as_slice() {
        [arg] => Some(*arg),
        _ => None,
    }
}

/// Rewrites a quasiquote template into list-building code.
fn quasiquote(x: &SExp) -> ScmResult<SExp> {
    match x {
        SExp::Pair(pair) => {
            if let Some(arg) = tagged(x, "unquote") {
                return Ok(arg.clone());
            }

            if tagged(x, "unquote-splicing").is_some() {
                return Err(ScmError::Syntax(format!(
                    "unquote-splicing outside of a list: {}",
                    x
                )));
            }

            let (car, cdr) = (&pair.0, &pair.1);

            if let Some(spliced) = tagged(car, "unquote-splicing") {
                Ok(SExp::list(&[
                    SExp::symbol("append"),
                    spliced.clone(),
                    quasiquote(cdr)?,
                ]))
            } else {
                Ok(SExp::list(&[
                    SExp::symbol("cons"),
                    quasiquote(car)?,
                    quasiquote(cdr)?,
                ]))
            }
        }

        SExp::Symbol(_) | SExp::Nil => Ok(SExp::list(&[SExp::symbol("quote"), x.clone()])),

        SExp::Vector(elems) => Ok(SExp::list(&[
            SExp::symbol("list->vector"),
            quasiquote(&SExp::list(elems))?,
        ])),

        _ => Ok(x.clone()),
    }
}

fn expand_application(form: &SExp) -> ScmResult<Expr> {
    let elems = form
        .list_to_vec()
        .ok_or_else(|| illegal("application", form))?;

    let (proc, args) = elems
        .split_first()
        .ok_or_else(|| illegal("application", form))?;

    Ok(Expr::Applic {
        applicative: Box::new(expand(proc)?),
        params: expand_all(args)?,
    })
}

/// Parses one top-level form.
pub fn expand(form: &SExp) -> ScmResult<Expr> {
    match form {
        SExp::Void
        | SExp::Nil
        | SExp::Boolean(_)
        | SExp::Char(_)
        | SExp::String(_)
        | SExp::Rational { .. }
        | SExp::Float(_)
        | SExp::Vector(_) => Ok(Expr::Const(form.clone())),

        SExp::Symbol(name) => {
            if is_reserved_word(name) {
                Err(ScmError::Syntax(format!(
                    "reserved word {} used as a variable",
                    name
                )))
            } else {
                Ok(Expr::VarGet(Var::new(name.clone())))
            }
        }

        SExp::Pair(pair) => {
            if let Some(special) = pair.0.as_symbol().and_then(|name| SPECIAL_FORMS.get(name)) {
                return special(form);
            }

            expand_application(form)
        }
    }
}

/// Parses every top-level form of a program, in order.
pub fn expand_program(forms: &[SExp]) -> ScmResult<Vec<Expr>> {
    forms.iter().map(expand).collect()
}
