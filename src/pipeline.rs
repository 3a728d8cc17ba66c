//! Request façade.
//!
//! A request names a stage and carries source text. The text is read by a
//! [`SourceReader`], expanded form by form, optionally run through the analysis
//! passes, and the result is handed to the serializer. Every request owns its
//! trees, so independent requests can run on separate threads with a shared
//! [`Pipeline`].

use std::io::Write;

use serde_json::Value;
use termcolor::WriteColor;

use crate::compiler::expand::expand_program;
use crate::compiler::reader::{R7rsReader, SourceReader};
use crate::compiler::sexpr::SExp;
use crate::compiler::tree_il::{Expr, ExprTag};
use crate::compiler::annotate_program;
use crate::error::{ScmError, ScmResult};
use crate::wire::ToWire;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParsingMode {
    Values,
    Unannotated,
    Annotated,
}

impl ParsingMode {
    pub const ALL: [ParsingMode; 3] = [Self::Values, Self::Unannotated, Self::Annotated];

    pub fn name(self) -> &'static str {
        match self {
            Self::Values => "VALUES",
            Self::Unannotated => "UNANNOTATED",
            Self::Annotated => "ANNOTATED",
        }
    }

    /// Finds a mode by its exact wire name.
    pub fn lookup(name: &str) -> ScmResult<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == name)
            .ok_or_else(|| ScmError::Lookup(format!("unknown parsing mode {}", name)))
    }
}

impl std::str::FromStr for ParsingMode {
    type Err = ScmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s)
    }
}

impl std::fmt::Display for ParsingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub mode: ParsingMode,
    pub code: String,
}

impl Request {
    pub fn new(mode: ParsingMode, code: impl Into<String>) -> Self {
        Self {
            mode,
            code: code.into(),
        }
    }

    /// Decodes an inbound `{"mode": ..., "code": ...}` mapping.
    pub fn from_json(value: &Value) -> ScmResult<Self> {
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .ok_or_else(|| ScmError::Lookup(format!("missing request field {}", name)))
        };

        let mode = ParsingMode::lookup(field("mode")?)?;
        let code = field("code")?;

        Ok(Self::new(mode, code))
    }
}

/// Result of one request, at the stage it asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Analyzed {
    Values(Vec<SExp>),
    Unannotated(Vec<Expr>),
    Annotated(Vec<ExprTag>),
}

impl Analyzed {
    pub fn len(&self) -> usize {
        match self {
            Self::Values(x) => x.len(),
            Self::Unannotated(x) => x.len(),
            Self::Annotated(x) => x.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders each top-level tree on its own line.
    pub fn pretty_print(&self, mut w: impl WriteColor) -> std::io::Result<()> {
        match self {
            Self::Values(values) => {
                for value in values {
                    value.pretty_print(&mut w)?;
                    writeln!(w)?;
                }
            }
            Self::Unannotated(exprs) => {
                for expr in exprs {
                    expr.pretty_print(&mut w)?;
                    writeln!(w)?;
                }
            }
            Self::Annotated(exprs) => {
                for expr in exprs {
                    expr.pretty_print(&mut w)?;
                    writeln!(w)?;
                }
            }
        }
        Ok(())
    }
}

impl ToWire for Analyzed {
    fn to_wire(&self) -> Value {
        match self {
            Self::Values(x) => x.to_wire(),
            Self::Unannotated(x) => x.to_wire(),
            Self::Annotated(x) => x.to_wire(),
        }
    }
}

pub struct Pipeline<R: SourceReader = R7rsReader> {
    reader: R,
}

impl Default for Pipeline<R7rsReader> {
    fn default() -> Self {
        Self::new(R7rsReader::default())
    }
}

impl<R: SourceReader> Pipeline<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn analyze(&self, mode: ParsingMode, code: &str) -> ScmResult<Analyzed> {
        let values = self.reader.read(code)?;
        log::debug!("{}: read {} top-level form(s)", mode, values.len());

        if mode == ParsingMode::Values {
            return Ok(Analyzed::Values(values));
        }

        let exprs = expand_program(&values)?;
        log::debug!("{}: expanded {} form(s)", mode, exprs.len());

        if mode == ParsingMode::Unannotated {
            return Ok(Analyzed::Unannotated(exprs));
        }

        let annotated = annotate_program(&exprs)?;
        log::debug!("{}: annotated {} form(s)", mode, annotated.len());

        Ok(Analyzed::Annotated(annotated))
    }

    pub fn run(&self, mode: ParsingMode, code: &str) -> ScmResult<Value> {
        self.analyze(mode, code).map(|analyzed| analyzed.to_wire())
    }

    pub fn run_request(&self, request: &Request) -> ScmResult<Value> {
        self.run(request.mode, &request.code)
    }

    /// Answers an inbound request body. Failures become the structured error
    /// value instead of a partial tree.
    pub fn handle(&self, body: &Value) -> Value {
        match Request::from_json(body).and_then(|request| self.run_request(&request)) {
            Ok(response) => response,
            Err(err) => {
                log::debug!("request failed: {}", err);
                err.to_wire()
            }
        }
    }
}

/// Runs one request against the `r7rs_parser` reader.
pub fn parse_scheme(mode: ParsingMode, code: &str) -> ScmResult<Value> {
    Pipeline::default().run(mode, code)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::compiler::tree_il::{AppKind, LexicalAddress};

    /// Reads whitespace separated symbols and integers; `!` is malformed.
    struct Tokens;

    impl SourceReader for Tokens {
        fn read(&self, source: &str) -> ScmResult<Vec<SExp>> {
            source
                .split_whitespace()
                .map(|token| match token.parse::<i64>() {
                    Ok(n) => Ok(SExp::integer(n)),
                    Err(_) if token == "!" => Err(ScmError::Syntax("bad token".to_string())),
                    Err(_) => Ok(SExp::symbol(token)),
                })
                .collect()
        }
    }

    struct Fixed(Vec<SExp>);

    impl SourceReader for Fixed {
        fn read(&self, _: &str) -> ScmResult<Vec<SExp>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn modes_by_exact_name() {
        assert_eq!(ParsingMode::lookup("VALUES").unwrap(), ParsingMode::Values);
        assert_eq!(
            "UNANNOTATED".parse::<ParsingMode>().unwrap(),
            ParsingMode::Unannotated
        );
        assert!(matches!(
            ParsingMode::lookup("annotated"),
            Err(ScmError::Lookup(_))
        ));
    }

    #[test]
    fn request_decoding() {
        let request = Request::from_json(&json!({ "mode": "ANNOTATED", "code": "x" })).unwrap();
        assert_eq!(request, Request::new(ParsingMode::Annotated, "x"));

        for body in [
            json!({ "mode": "NOPE", "code": "x" }),
            json!({ "code": "x" }),
            json!({ "mode": "VALUES" }),
            json!({ "mode": "VALUES", "code": 1 }),
        ] {
            assert!(matches!(Request::from_json(&body), Err(ScmError::Lookup(_))));
        }
    }

    #[test]
    fn values_stop_after_reading() {
        let pipeline = Pipeline::new(Tokens);
        assert_eq!(
            pipeline.run(ParsingMode::Values, "a 1").unwrap(),
            json!({
                "type": "List",
                "value": [
                    { "type": "Symbol", "value": "a" },
                    { "type": "Rational", "value": { "numerator": 1, "denominator": 1 } },
                ]
            })
        );
    }

    #[test]
    fn stages_are_cumulative() {
        // (f x)
        let call = SExp::list(&[SExp::symbol("f"), SExp::symbol("x")]);
        let pipeline = Pipeline::new(Fixed(vec![call]));

        let Analyzed::Unannotated(exprs) = pipeline.analyze(ParsingMode::Unannotated, "").unwrap()
        else {
            panic!("expected unannotated trees");
        };
        assert_eq!(exprs.len(), 1);
        assert!(matches!(exprs[0], Expr::Applic { .. }));

        let Analyzed::Annotated(exprs) = pipeline.analyze(ParsingMode::Annotated, "").unwrap()
        else {
            panic!("expected annotated trees");
        };
        let ExprTag::Applic {
            applicative, kind, ..
        } = &exprs[0]
        else {
            panic!("expected an application");
        };
        assert_eq!(*kind, AppKind::TailCall);
        assert!(matches!(
            &**applicative,
            ExprTag::VarGet(var) if var.lexical_address == LexicalAddress::Free
        ));
    }

    #[test]
    fn reader_failures_are_request_failures() {
        let pipeline = Pipeline::new(Tokens);
        assert!(matches!(
            pipeline.analyze(ParsingMode::Annotated, "a ! b"),
            Err(ScmError::Syntax(_))
        ));
        assert_eq!(
            pipeline.handle(&json!({ "mode": "VALUES", "code": "!" })),
            json!({ "type": "SyntaxError", "value": "bad token" })
        );
    }

    #[test]
    fn handle_reports_unknown_modes() {
        let response = Pipeline::new(Tokens).handle(&json!({ "mode": "FOO", "code": "a" }));
        assert_eq!(response["type"], "LookupError");
    }

    #[test]
    fn empty_source() {
        let analyzed = Pipeline::new(Tokens)
            .analyze(ParsingMode::Annotated, "   ")
            .unwrap();
        assert!(analyzed.is_empty());
        assert_eq!(analyzed.to_wire(), json!({ "type": "List", "value": [] }));
    }

    #[test]
    fn pretty_output_has_one_line_per_form() {
        let mut buf = Vec::new();
        Pipeline::new(Tokens)
            .analyze(ParsingMode::Values, "a b")
            .unwrap()
            .pretty_print(termcolor::NoColor::new(&mut buf))
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "a\nb\n");
    }
}
