//! Bridge to the external reading engine.
//!
//! Source text is read by `r7rs_parser` and every datum it yields is converted
//! into an [`SExp`]. The engine either returns the complete sequence of data
//! or fails; there are no partial results.

use num_traits::ToPrimitive;
use r7rs_parser::expr::{Expr, Interner, NoIntern};
use r7rs_parser::parser::{ParseError, Parser};

use super::sexpr::{sexp_cons, SExp};
use crate::error::{ScmError, ScmResult};

/// Turns source text into raw values.
pub trait SourceReader {
    fn read(&self, source: &str) -> ScmResult<Vec<SExp>>;
}

/// Reader backed by `r7rs_parser`.
#[derive(Debug, Clone, Copy, Default)]
pub struct R7rsReader {
    pub fold_case: bool,
}

impl R7rsReader {
    pub fn new(fold_case: bool) -> Self {
        Self { fold_case }
    }
}

impl SourceReader for R7rsReader {
    fn read(&self, source: &str) -> ScmResult<Vec<SExp>> {
        let mut no_intern = NoIntern;
        let mut parser = Parser::new(&mut no_intern, source, self.fold_case);
        let mut exprs = vec![];

        while !parser.finished() {
            match parser.parse(true) {
                Ok(expr) => {
                    let interner = NoIntern;
                    exprs.push(r7rs_expr_to_sexp(&interner, &expr)?);
                }

                Err(ParseError::Syntax(position, error)) => {
                    return Err(ScmError::Syntax(format!(
                        "syntax error at {:?}: {:?}",
                        position, error
                    )));
                }

                Err(ParseError::Lexical(position, error)) => {
                    return Err(ScmError::Syntax(format!(
                        "lexical error at {:?}: {}",
                        position, error
                    )));
                }
            }
        }

        log::trace!("read {} datum(s)", exprs.len());
        Ok(exprs)
    }
}

fn out_of_range() -> ScmError {
    ScmError::Syntax("unsupported datum: integer out of range".to_string())
}

pub fn r7rs_expr_to_sexp<I: Interner>(interner: &I, expr: &Expr<I>) -> ScmResult<SExp> {
    Ok(match expr {
        Expr::Null => SExp::Nil,
        Expr::Bool(x) => SExp::Boolean(*x),
        Expr::Char(x) => SExp::Char(*x),
        Expr::Str(x) => SExp::String(x.to_string()),
        Expr::Symbol(x) => SExp::Symbol(interner.description(x).to_string()),
        Expr::Fixnum(x) => SExp::integer(i64::from(*x)),
        Expr::BigInt(x) => SExp::integer(x.to_i64().ok_or_else(out_of_range)?),
        Expr::Rational(x) => SExp::rational(
            x.numer().to_i64().ok_or_else(out_of_range)?,
            x.denom().to_i64().ok_or_else(out_of_range)?,
        )?,
        Expr::BigRational(x) => SExp::rational(
            x.numer().to_i64().ok_or_else(out_of_range)?,
            x.denom().to_i64().ok_or_else(out_of_range)?,
        )?,
        Expr::Float(x) => SExp::Float(*x),
        Expr::Pair(car, cdr) => {
            let car = r7rs_expr_to_sexp(interner, car)?;
            let cdr = r7rs_expr_to_sexp(interner, cdr)?;

            sexp_cons(car, cdr)
        }

        Expr::ImmutableVector(vec) | Expr::GrowableVector(vec) => SExp::Vector(
            vec.iter()
                .map(|x| r7rs_expr_to_sexp(interner, x))
                .collect::<ScmResult<Vec<_>>>()?,
        ),

        Expr::Syntax(_, expr) => r7rs_expr_to_sexp(interner, expr)?,

        Expr::ByteVector(_) => {
            return Err(ScmError::Syntax("unsupported datum: bytevector".to_string()))
        }
        Expr::Complex(_) => {
            return Err(ScmError::Syntax("unsupported datum: complex number".to_string()))
        }

        #[allow(unreachable_patterns)]
        _ => return Err(ScmError::Syntax("unsupported datum".to_string())),
    })
}
