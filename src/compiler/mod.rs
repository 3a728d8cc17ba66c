//! Scheme front-end.
//!
//! # Passes
//!
//! 1. Reader: source text to raw values ([`sexpr::SExp`]), through `r7rs_parser`.
//! 2. Expander: raw values to [`tree_il::Expr`], desugaring derived forms.
//! 3. Lexical addressing: every variable gets a [`tree_il::LexicalAddress`].
//! 4. Box analysis: parameters that are assigned and captured by a closure are
//!    moved into boxes.
//! 5. Tail call classification: every application is marked as a tail call or not.
//!
//! Passes 3 to 5 only make sense in that order: boxing matches variables by
//! address, and tail classification must see the final shape of the tree.

pub mod boxing;
pub mod expand;
pub mod lexical;
pub mod reader;
pub mod sexpr;
pub mod tail_calls;
pub mod tree_il;

use crate::error::ScmResult;

use self::tree_il::{Expr, ExprTag};

/// Runs the analysis passes over one top-level expression.
pub fn annotate(expr: &Expr) -> ScmResult<ExprTag> {
    let addressed = lexical::annotate_lexical_addresses(expr)?;
    let boxed = boxing::box_set(addressed);
    Ok(tail_calls::annotate_tail_calls(boxed))
}

pub fn annotate_program(exprs: &[Expr]) -> ScmResult<Vec<ExprTag>> {
    exprs.iter().map(annotate).collect()
}
