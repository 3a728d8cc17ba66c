//! Lexical addressing.
//!
//! Replaces every variable name with a [`VarTag`] carrying its binding
//! location. The scope chain is an explicit stack of parameter lists, outermost
//! first; it is pushed on entry to a lambda and popped on exit.

use indexmap::IndexSet;

use super::tree_il::{AppKind, Expr, ExprTag, LexicalAddress, VarTag};
use crate::error::{ScmError, ScmResult};

/// Resolves `name` against the scope chain, innermost binder first.
pub fn lookup(name: &str, scopes: &[Vec<String>]) -> LexicalAddress {
    let mut frames = scopes.iter().rev();

    if let Some(params) = frames.next() {
        if let Some(minor) = params.iter().position(|param| param == name) {
            return LexicalAddress::Param { minor };
        }
    }

    for (major, params) in frames.enumerate() {
        if let Some(minor) = params.iter().position(|param| param == name) {
            return LexicalAddress::Bound { major, minor };
        }
    }

    LexicalAddress::Free
}

fn tag_var(name: &str, scopes: &[Vec<String>]) -> VarTag {
    VarTag::new(name, lookup(name, scopes))
}

/// Binders of a lambda, rejecting a name bound twice.
fn lambda_frame(binders: Vec<String>) -> ScmResult<Vec<String>> {
    let mut seen = IndexSet::with_capacity(binders.len());

    for name in binders {
        if !seen.insert(name.clone()) {
            return Err(ScmError::Analysis(format!(
                "duplicate parameter {} in lambda",
                name
            )));
        }
    }

    Ok(seen.into_iter().collect())
}

fn annotate_all(exprs: &[Expr], scopes: &mut Vec<Vec<String>>) -> ScmResult<Vec<ExprTag>> {
    exprs.iter().map(|expr| annotate(expr, scopes)).collect()
}

fn annotate(expr: &Expr, scopes: &mut Vec<Vec<String>>) -> ScmResult<ExprTag> {
    Ok(match expr {
        Expr::Const(sexpr) => ExprTag::Const(sexpr.clone()),
        Expr::VarGet(var) => ExprTag::VarGet(tag_var(&var.name, scopes)),
        Expr::If { test, dit, dif } => ExprTag::If {
            test: Box::new(annotate(test, scopes)?),
            dit: Box::new(annotate(dit, scopes)?),
            dif: Box::new(annotate(dif, scopes)?),
        },
        Expr::Seq(exprs) => ExprTag::Seq(annotate_all(exprs, scopes)?),
        Expr::Or(exprs) => ExprTag::Or(annotate_all(exprs, scopes)?),
        Expr::VarSet { var, val } => ExprTag::VarSet {
            var: tag_var(&var.name, scopes),
            val: Box::new(annotate(val, scopes)?),
        },
        Expr::VarDef { var, val } => {
            let var = tag_var(&var.name, scopes);

            if var.lexical_address != LexicalAddress::Free {
                return Err(ScmError::Analysis(format!(
                    "define of lexically bound variable {}",
                    var.name
                )));
            }

            ExprTag::VarDef {
                var,
                val: Box::new(annotate(val, scopes)?),
            }
        }
        Expr::Lambda { params, kind, body } => {
            scopes.push(lambda_frame(kind.binders(params))?);
            let body = annotate(body, scopes);
            scopes.pop();

            ExprTag::Lambda {
                params: params.clone(),
                kind: kind.clone(),
                body: Box::new(body?),
            }
        }
        Expr::Applic {
            applicative,
            params,
        } => ExprTag::Applic {
            applicative: Box::new(annotate(applicative, scopes)?),
            params: annotate_all(params, scopes)?,
            // decided later by the tail call pass
            kind: AppKind::NonTailCall,
        },
    })
}

/// Annotates a top-level expression with lexical addresses.
pub fn annotate_lexical_addresses(expr: &Expr) -> ScmResult<ExprTag> {
    let mut scopes = Vec::new();
    annotate(expr, &mut scopes)
}
