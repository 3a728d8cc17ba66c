//! S-expression definition.
//!
//! The raw value tree produced by the reader. Pairs and vectors own their
//! children, every other variant is an immutable leaf. Equality is structural,
//! and the three text roles (`Char`, `String`, `Symbol`) never compare equal to
//! one another even when their payloads match.

use num::Integer;
use pretty::{BoxAllocator, DocAllocator, DocBuilder};
use termcolor::{Color, ColorSpec, WriteColor};

use crate::error::{ScmError, ScmResult};

#[derive(Debug, Clone, PartialEq)]
pub enum SExp {
    Void,
    Nil,
    Boolean(bool),
    Char(char),
    String(String),
    Symbol(String),
    Rational { numerator: i64, denominator: i64 },
    Float(f64),
    Pair(Box<(SExp, SExp)>),
    Vector(Vec<SExp>),
}

pub fn sexp_cons(car: SExp, cdr: SExp) -> SExp {
    SExp::Pair(Box::new((car, cdr)))
}

impl SExp {
    pub fn cons(car: SExp, cdr: SExp) -> Self {
        sexp_cons(car, cdr)
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    pub fn string(text: impl Into<String>) -> Self {
        Self::String(text.into())
    }

    pub fn integer(n: i64) -> Self {
        Self::Rational {
            numerator: n,
            denominator: 1,
        }
    }

    /// Builds an exact rational in lowest terms with a positive denominator.
    pub fn rational(numerator: i64, denominator: i64) -> ScmResult<Self> {
        if denominator == 0 {
            return Err(ScmError::Syntax(format!(
                "division by zero in rational {}/{}",
                numerator, denominator
            )));
        }

        // widened so that i64::MIN can be negated
        let (n, d) = (i128::from(numerator), i128::from(denominator));
        let g = n.gcd(&d) * d.signum();
        let overflow = |_| {
            ScmError::Syntax(format!(
                "rational {}/{} out of range",
                numerator, denominator
            ))
        };

        Ok(Self::Rational {
            numerator: i64::try_from(n / g).map_err(overflow)?,
            denominator: i64::try_from(d / g).map_err(overflow)?,
        })
    }

    /// Builds a character from text that holds exactly one code point.
    pub fn char_from_text(text: &str) -> ScmResult<Self> {
        let mut chars = text.chars();

        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Self::Char(c)),
            _ => Err(ScmError::InvalidOperation(format!("{:?} is not a char", text))),
        }
    }

    /// Proper list from a slice of elements.
    pub fn list(elems: &[SExp]) -> Self {
        Self::list_star(elems, SExp::Nil)
    }

    pub fn list_star(elems: &[SExp], tail: SExp) -> Self {
        elems
            .iter()
            .rev()
            .fold(tail, |acc, elem| sexp_cons(elem.clone(), acc))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, Self::Pair(_))
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Self::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub fn pair(&self) -> Option<(&SExp, &SExp)> {
        match self {
            Self::Pair(pair) => Some((&pair.0, &pair.1)),
            _ => None,
        }
    }

    pub fn car(&self) -> Option<&SExp> {
        self.pair().map(|(car, _)| car)
    }

    pub fn cdr(&self) -> Option<&SExp> {
        self.pair().map(|(_, cdr)| cdr)
    }

    /// Length of a proper list, `None` for improper lists and non-lists.
    pub fn list_length(&self) -> Option<usize> {
        self.list_to_vec().map(|elems| elems.len())
    }

    pub fn is_list(&self) -> bool {
        self.list_length().is_some()
    }

    /// Elements of a proper list.
    pub fn list_to_vec(&self) -> Option<Vec<&SExp>> {
        let (elems, tail) = self.improper_list();
        if tail.is_null() {
            Some(elems)
        } else {
            None
        }
    }

    /// Splits a possibly improper list into its elements and the final cdr.
    pub fn improper_list(&self) -> (Vec<&SExp>, &SExp) {
        let mut elems = vec![];
        let mut ls = self;

        while let Some((car, cdr)) = ls.pair() {
            elems.push(car);
            ls = cdr;
        }

        (elems, ls)
    }

    /// In-place append on a text payload. Characters are immutable.
    pub fn append_text(&mut self, suffix: &str) -> ScmResult<()> {
        match self {
            Self::String(text) | Self::Symbol(text) => {
                text.push_str(suffix);
                Ok(())
            }
            Self::Char(_) => Err(ScmError::InvalidOperation(
                "in-place append is undefined for chars".to_string(),
            )),
            _ => Err(ScmError::InvalidOperation(format!(
                "in-place append is undefined for {}",
                self
            ))),
        }
    }

    /// In-place repetition on a text payload. Characters are immutable.
    pub fn repeat_text(&mut self, times: usize) -> ScmResult<()> {
        match self {
            Self::String(text) | Self::Symbol(text) => {
                *text = text.repeat(times);
                Ok(())
            }
            Self::Char(_) => Err(ScmError::InvalidOperation(
                "in-place repetition is undefined for chars".to_string(),
            )),
            _ => Err(ScmError::InvalidOperation(format!(
                "in-place repetition is undefined for {}",
                self
            ))),
        }
    }
}

impl SExp {
    pub fn pretty<'a, D>(&self, allocator: &'a D) -> DocBuilder<'a, D, ColorSpec>
    where
        D: DocAllocator<'a, ColorSpec>,
        D::Doc: Clone,
    {
        match self {
            Self::Void => allocator.text("#<void>"),
            Self::Nil => allocator.text("()"),
            Self::Boolean(b) => {
                if *b {
                    allocator.text("#t")
                } else {
                    allocator.text("#f")
                }
            }
            Self::Char(c) => allocator.text(format!("#\\{}", c)),
            Self::String(s) => allocator
                .text(format!("{:?}", s))
                .annotate(ColorSpec::new().set_fg(Some(Color::Green)).clone()),
            Self::Symbol(s) => allocator.text(s.clone()),
            Self::Rational {
                numerator,
                denominator,
            } => {
                if *denominator == 1 {
                    allocator.text(numerator.to_string())
                } else {
                    allocator.text(format!("{}/{}", numerator, denominator))
                }
            }
            Self::Float(f) => allocator.text(format!("{:?}", f)),

            Self::Pair(_) => {
                let (elems, tail) = self.improper_list();
                let mut doc = allocator.intersperse(
                    elems.iter().map(|elem| elem.pretty(allocator)),
                    allocator.line(),
                );

                if !tail.is_null() {
                    doc = doc
                        .append(allocator.text(" . "))
                        .append(tail.pretty(allocator));
                }

                doc.nest(1).group().parens()
            }

            Self::Vector(v) => {
                let elems =
                    allocator.intersperse(v.iter().map(|x| x.pretty(allocator)), allocator.line());

                allocator.text("#").append(elems.nest(2).group().parens())
            }
        }
    }

    pub fn pretty_print(&self, w: impl WriteColor) -> std::io::Result<()> {
        let allocator = BoxAllocator;
        let doc = self.pretty(&allocator);
        doc.render_colored(80, w)
    }
}

impl std::fmt::Display for SExp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let allocator = BoxAllocator;
        let doc = self.pretty(&allocator);
        let mut buf = Vec::new();
        let mut writer = termcolor::NoColor::new(&mut buf);
        doc.render(80, &mut writer).map_err(|_| std::fmt::Error)?;
        let s = String::from_utf8(buf).map_err(|_| std::fmt::Error)?;
        f.write_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_roles_are_distinct() {
        assert_ne!(SExp::Char('x'), SExp::string("x"));
        assert_ne!(SExp::string("x"), SExp::symbol("x"));
        assert_eq!(SExp::symbol("x"), SExp::symbol("x"));
    }

    #[test]
    fn structural_equality() {
        let a = SExp::list(&[SExp::integer(1), SExp::Vector(vec![SExp::Boolean(true)])]);
        let b = SExp::list(&[SExp::integer(1), SExp::Vector(vec![SExp::Boolean(true)])]);
        assert_eq!(a, b);
    }

    #[test]
    fn rationals_are_normalized() {
        assert_eq!(
            SExp::rational(2, -4).unwrap(),
            SExp::Rational {
                numerator: -1,
                denominator: 2
            }
        );
        assert!(SExp::rational(1, 0).is_err());
    }

    #[test]
    fn rational_extremes() {
        assert!(matches!(
            SExp::rational(i64::MIN, -1),
            Err(ScmError::Syntax(_))
        ));
        assert_eq!(
            SExp::rational(i64::MIN, i64::MIN).unwrap(),
            SExp::integer(1)
        );
        assert_eq!(
            SExp::rational(i64::MIN, 2).unwrap(),
            SExp::integer(i64::MIN / 2)
        );
        assert_eq!(
            SExp::rational(i64::MAX, -1).unwrap(),
            SExp::integer(-i64::MAX)
        );
    }

    #[test]
    fn list_helpers() {
        let ls = SExp::list(&[SExp::symbol("a"), SExp::symbol("b")]);
        assert_eq!(ls.list_length(), Some(2));

        let dotted = SExp::list_star(&[SExp::symbol("a")], SExp::symbol("b"));
        assert_eq!(dotted.list_length(), None);
        let (elems, tail) = dotted.improper_list();
        assert_eq!(elems.len(), 1);
        assert_eq!(tail, &SExp::symbol("b"));
    }

    #[test]
    fn chars_hold_one_code_point() {
        assert_eq!(SExp::char_from_text("λ").unwrap(), SExp::Char('λ'));
        assert!(matches!(
            SExp::char_from_text("ab"),
            Err(ScmError::InvalidOperation(_))
        ));
        assert!(SExp::char_from_text("").is_err());
    }

    #[test]
    fn chars_are_immutable() {
        let mut c = SExp::Char('a');
        assert!(matches!(c.append_text("b"), Err(ScmError::InvalidOperation(_))));
        assert!(matches!(c.repeat_text(2), Err(ScmError::InvalidOperation(_))));
        assert_eq!(c, SExp::Char('a'));

        let mut s = SExp::string("ab");
        s.append_text("c").unwrap();
        s.repeat_text(2).unwrap();
        assert_eq!(s, SExp::string("abcabc"));
    }

    #[test]
    fn display() {
        let ls = SExp::list_star(
            &[
                SExp::symbol("quote"),
                SExp::rational(1, 2).unwrap(),
                SExp::string("hi"),
                SExp::Char('c'),
            ],
            SExp::Boolean(false),
        );
        assert_eq!(ls.to_string(), "(quote 1/2 \"hi\" #\\c . #f)");
        assert_eq!(SExp::Vector(vec![SExp::integer(1), SExp::Nil]).to_string(), "#(1 ())");
    }
}
