//! Tail position classification.
//!
//! Marks every application with [`AppKind::TailCall`] or
//! [`AppKind::NonTailCall`]. The classification only reflects tree position
//! and never changes what the tree means.

use super::tree_il::{AppKind, ExprTag};

fn annotate_seq(exprs: Vec<ExprTag>, in_tail: bool) -> Vec<ExprTag> {
    let last = exprs.len().saturating_sub(1);

    exprs
        .into_iter()
        .enumerate()
        .map(|(i, expr)| annotate(expr, in_tail && i == last))
        .collect()
}

fn annotate(expr: ExprTag, in_tail: bool) -> ExprTag {
    match expr {
        ExprTag::Const(_) | ExprTag::VarGet(_) | ExprTag::Box(_) | ExprTag::BoxGet(_) => expr,
        ExprTag::VarSet { var, val } => ExprTag::VarSet {
            var,
            val: Box::new(annotate(*val, false)),
        },
        ExprTag::VarDef { var, val } => ExprTag::VarDef {
            var,
            val: Box::new(annotate(*val, false)),
        },
        ExprTag::BoxSet { var, val } => ExprTag::BoxSet {
            var,
            val: Box::new(annotate(*val, false)),
        },
        ExprTag::If { test, dit, dif } => ExprTag::If {
            test: Box::new(annotate(*test, false)),
            dit: Box::new(annotate(*dit, in_tail)),
            dif: Box::new(annotate(*dif, in_tail)),
        },
        ExprTag::Seq(exprs) => ExprTag::Seq(annotate_seq(exprs, in_tail)),
        ExprTag::Or(exprs) => ExprTag::Or(annotate_seq(exprs, in_tail)),
        ExprTag::Lambda { params, kind, body } => ExprTag::Lambda {
            params,
            kind,
            body: Box::new(annotate(*body, true)),
        },
        ExprTag::Applic {
            applicative,
            params,
            ..
        } => ExprTag::Applic {
            applicative: Box::new(annotate(*applicative, false)),
            params: params.into_iter().map(|param| annotate(param, false)).collect(),
            kind: if in_tail {
                AppKind::TailCall
            } else {
                AppKind::NonTailCall
            },
        },
    }
}

/// Classifies the applications of a top-level expression, which is itself in
/// tail position.
pub fn annotate_tail_calls(expr: ExprTag) -> ExprTag {
    annotate(expr, true)
}
