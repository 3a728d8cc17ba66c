//! Expression trees.
//!
//! [`Expr`] is what the syntactic parser produces: variables are bare names.
//! [`ExprTag`] is what the analysis passes produce: every variable carries a
//! [`LexicalAddress`], mutable captured parameters are accessed through
//! `Box`/`BoxGet`/`BoxSet` nodes, and every application knows whether it is a
//! tail call.

use pretty::{BoxAllocator, DocAllocator, DocBuilder};
use termcolor::{Color, ColorSpec, WriteColor};

use super::sexpr::SExp;

#[derive(Debug, Clone, PartialEq)]
pub struct Var {
    pub name: String,
}

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LambdaKind {
    /// Fixed arity.
    Simple,
    /// Variadic, extra arguments are collected into `opt`.
    Opt { opt: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(SExp),
    VarGet(Var),
    If {
        test: Box<Expr>,
        dit: Box<Expr>,
        dif: Box<Expr>,
    },
    Seq(Vec<Expr>),
    Or(Vec<Expr>),
    VarSet {
        var: Var,
        val: Box<Expr>,
    },
    VarDef {
        var: Var,
        val: Box<Expr>,
    },
    Lambda {
        params: Vec<String>,
        kind: LambdaKind,
        body: Box<Expr>,
    },
    Applic {
        applicative: Box<Expr>,
        params: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexicalAddress {
    /// Not bound by any enclosing lambda.
    Free,
    /// Parameter `minor` of the nearest enclosing lambda.
    Param { minor: usize },
    /// Parameter `minor` of the lambda `major + 1` levels out.
    Bound { major: usize, minor: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarTag {
    pub name: String,
    pub lexical_address: LexicalAddress,
}

impl VarTag {
    pub fn new(name: impl Into<String>, lexical_address: LexicalAddress) -> Self {
        Self {
            name: name.into(),
            lexical_address,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppKind {
    TailCall,
    NonTailCall,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprTag {
    Const(SExp),
    VarGet(VarTag),
    If {
        test: Box<ExprTag>,
        dit: Box<ExprTag>,
        dif: Box<ExprTag>,
    },
    Seq(Vec<ExprTag>),
    Or(Vec<ExprTag>),
    VarSet {
        var: VarTag,
        val: Box<ExprTag>,
    },
    VarDef {
        var: VarTag,
        val: Box<ExprTag>,
    },
    Box(VarTag),
    BoxGet(VarTag),
    BoxSet {
        var: VarTag,
        val: Box<ExprTag>,
    },
    Lambda {
        params: Vec<String>,
        kind: LambdaKind,
        body: Box<ExprTag>,
    },
    Applic {
        applicative: Box<ExprTag>,
        params: Vec<ExprTag>,
        kind: AppKind,
    },
}

impl LambdaKind {
    /// All names bound by a lambda of this kind, the rest parameter last.
    pub fn binders(&self, params: &[String]) -> Vec<String> {
        let mut names = params.to_vec();
        if let Self::Opt { opt } = self {
            names.push(opt.clone());
        }
        names
    }
}

fn keyword<'a, D>(allocator: &'a D, name: &'static str) -> DocBuilder<'a, D, ColorSpec>
where
    D: DocAllocator<'a, ColorSpec>,
    D::Doc: Clone,
{
    allocator
        .text(name)
        .annotate(ColorSpec::new().set_fg(Some(Color::Blue)).clone())
}

fn node<'a, D>(
    allocator: &'a D,
    name: &'static str,
    children: impl IntoIterator<Item = DocBuilder<'a, D, ColorSpec>>,
) -> DocBuilder<'a, D, ColorSpec>
where
    D: DocAllocator<'a, ColorSpec>,
    D::Doc: Clone,
{
    let mut doc = keyword(allocator, name);

    for child in children {
        doc = doc.append(allocator.line()).append(child);
    }

    doc.nest(1).group().parens()
}

fn lambda_header<'a, D>(
    allocator: &'a D,
    params: &[String],
    kind: &LambdaKind,
) -> DocBuilder<'a, D, ColorSpec>
where
    D: DocAllocator<'a, ColorSpec>,
    D::Doc: Clone,
{
    let required = params.iter().map(|param| allocator.text(param.clone()));

    match kind {
        LambdaKind::Simple => allocator.intersperse(required, allocator.space()).parens(),
        LambdaKind::Opt { opt } if params.is_empty() => allocator.text(opt.clone()),
        LambdaKind::Opt { opt } => allocator
            .intersperse(required, allocator.space())
            .append(allocator.text(" . "))
            .append(allocator.text(opt.clone()))
            .parens(),
    }
}

impl Var {
    pub fn pretty<'a, D>(&self, allocator: &'a D) -> DocBuilder<'a, D, ColorSpec>
    where
        D: DocAllocator<'a, ColorSpec>,
        D::Doc: Clone,
    {
        allocator.text(self.name.clone())
    }
}

impl VarTag {
    pub fn pretty<'a, D>(&self, allocator: &'a D) -> DocBuilder<'a, D, ColorSpec>
    where
        D: DocAllocator<'a, ColorSpec>,
        D::Doc: Clone,
    {
        let address = match self.lexical_address {
            LexicalAddress::Free => "free".to_string(),
            LexicalAddress::Param { minor } => format!("param {}", minor),
            LexicalAddress::Bound { major, minor } => format!("bound {} {}", major, minor),
        };

        allocator
            .text(self.name.clone())
            .append(allocator.space())
            .append(
                allocator
                    .text(address)
                    .annotate(ColorSpec::new().set_fg(Some(Color::Magenta)).clone()),
            )
    }
}

impl Expr {
    pub fn pretty<'a, D>(&self, allocator: &'a D) -> DocBuilder<'a, D, ColorSpec>
    where
        D: DocAllocator<'a, ColorSpec>,
        D::Doc: Clone,
    {
        match self {
            Self::Const(sexpr) => node(allocator, "const", [sexpr.pretty(allocator)]),
            Self::VarGet(var) => node(allocator, "var-get", [var.pretty(allocator)]),
            Self::If { test, dit, dif } => node(
                allocator,
                "if",
                [
                    test.pretty(allocator),
                    dit.pretty(allocator),
                    dif.pretty(allocator),
                ],
            ),
            Self::Seq(exprs) => node(allocator, "seq", exprs.iter().map(|e| e.pretty(allocator))),
            Self::Or(exprs) => node(allocator, "or", exprs.iter().map(|e| e.pretty(allocator))),
            Self::VarSet { var, val } => node(
                allocator,
                "var-set",
                [var.pretty(allocator), val.pretty(allocator)],
            ),
            Self::VarDef { var, val } => node(
                allocator,
                "var-def",
                [var.pretty(allocator), val.pretty(allocator)],
            ),
            Self::Lambda { params, kind, body } => node(
                allocator,
                "lambda",
                [lambda_header(allocator, params, kind), body.pretty(allocator)],
            ),
            Self::Applic {
                applicative,
                params,
            } => node(
                allocator,
                "applic",
                std::iter::once(applicative.pretty(allocator))
                    .chain(params.iter().map(|e| e.pretty(allocator))),
            ),
        }
    }

    pub fn pretty_print(&self, writer: impl WriteColor) -> std::io::Result<()> {
        let allocator = BoxAllocator;
        let doc = self.pretty(&allocator);
        doc.render_colored(70, writer)
    }
}

impl ExprTag {
    pub fn pretty<'a, D>(&self, allocator: &'a D) -> DocBuilder<'a, D, ColorSpec>
    where
        D: DocAllocator<'a, ColorSpec>,
        D::Doc: Clone,
    {
        match self {
            Self::Const(sexpr) => node(allocator, "const", [sexpr.pretty(allocator)]),
            Self::VarGet(var) => node(allocator, "var-get", [var.pretty(allocator)]),
            Self::If { test, dit, dif } => node(
                allocator,
                "if",
                [
                    test.pretty(allocator),
                    dit.pretty(allocator),
                    dif.pretty(allocator),
                ],
            ),
            Self::Seq(exprs) => node(allocator, "seq", exprs.iter().map(|e| e.pretty(allocator))),
            Self::Or(exprs) => node(allocator, "or", exprs.iter().map(|e| e.pretty(allocator))),
            Self::VarSet { var, val } => node(
                allocator,
                "var-set",
                [var.pretty(allocator), val.pretty(allocator)],
            ),
            Self::VarDef { var, val } => node(
                allocator,
                "var-def",
                [var.pretty(allocator), val.pretty(allocator)],
            ),
            Self::Box(var) => node(allocator, "box", [var.pretty(allocator)]),
            Self::BoxGet(var) => node(allocator, "box-get", [var.pretty(allocator)]),
            Self::BoxSet { var, val } => node(
                allocator,
                "box-set",
                [var.pretty(allocator), val.pretty(allocator)],
            ),
            Self::Lambda { params, kind, body } => node(
                allocator,
                "lambda",
                [lambda_header(allocator, params, kind), body.pretty(allocator)],
            ),
            Self::Applic {
                applicative,
                params,
                kind,
            } => {
                let name = match kind {
                    AppKind::TailCall => "applic tail",
                    AppKind::NonTailCall => "applic",
                };

                node(
                    allocator,
                    name,
                    std::iter::once(applicative.pretty(allocator))
                        .chain(params.iter().map(|e| e.pretty(allocator))),
                )
            }
        }
    }

    pub fn pretty_print(&self, writer: impl WriteColor) -> std::io::Result<()> {
        let allocator = BoxAllocator;
        let doc = self.pretty(&allocator);
        doc.render_colored(70, writer)
    }
}

macro_rules! display_via_pretty {
    ($($ty: ty),*) => {$(
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let allocator = BoxAllocator;
                let doc = self.pretty(&allocator);
                let mut buf = Vec::new();
                let mut writer = termcolor::NoColor::new(&mut buf);
                doc.render(70, &mut writer).map_err(|_| std::fmt::Error)?;
                let s = String::from_utf8(buf).map_err(|_| std::fmt::Error)?;
                f.write_str(&s)
            }
        }
    )*};
}

display_via_pretty!(Expr, ExprTag);
