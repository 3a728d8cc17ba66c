//! Generic structural serializer.
//!
//! Every node becomes `{"type": <name>, "value": <payload>}`, `"value"` being
//! omitted for nodes that carry no data. Sequences become `List`, pairs become
//! `Pair` with `car`/`cdr`, enumerations carry their variant name, text roles
//! carry their raw text, and structured nodes map field names to serialized
//! fields. Bare numbers and strings pass through unchanged.

use std::any::Any;

use serde_json::{json, Map, Value};

use crate::compiler::sexpr::SExp;
use crate::compiler::tree_il::{AppKind, Expr, ExprTag, LambdaKind, LexicalAddress, Var, VarTag};
use crate::error::{ScmError, ScmResult};

pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
    json!({ "type": "List", "value": items.into_iter().collect::<Vec<_>>() })
}

pub fn pair(car: Value, cdr: Value) -> Value {
    json!({ "type": "Pair", "value": { "car": car, "cdr": cdr } })
}

pub fn enumerated(type_name: &str, variant: &str) -> Value {
    json!({ "type": type_name, "value": variant })
}

pub fn text(role: &str, text: &str) -> Value {
    json!({ "type": role, "value": text })
}

/// Tagged node with named fields.
pub fn node(type_name: &str, fields: Vec<(&str, Value)>) -> Value {
    let mut obj = Map::new();
    obj.insert("type".to_string(), Value::from(type_name));

    if !fields.is_empty() {
        let value = fields
            .into_iter()
            .map(|(name, field)| (name.to_string(), field))
            .collect::<Map<_, _>>();
        obj.insert("value".to_string(), Value::Object(value));
    }

    Value::Object(obj)
}

/// JSON numbers cannot hold NaN or the infinities, so those are written with
/// their Scheme spelling.
pub fn float(f: f64) -> Value {
    if f.is_nan() {
        Value::from("+nan.0")
    } else if f == f64::INFINITY {
        Value::from("+inf.0")
    } else if f == f64::NEG_INFINITY {
        Value::from("-inf.0")
    } else {
        Value::from(f)
    }
}

pub trait ToWire {
    fn to_wire(&self) -> Value;
}

impl<T: ToWire> ToWire for [T] {
    fn to_wire(&self) -> Value {
        list(self.iter().map(ToWire::to_wire))
    }
}

impl<T: ToWire> ToWire for Vec<T> {
    fn to_wire(&self) -> Value {
        self.as_slice().to_wire()
    }
}

impl<T: ToWire + ?Sized> ToWire for Box<T> {
    fn to_wire(&self) -> Value {
        (**self).to_wire()
    }
}

impl<A: ToWire, B: ToWire> ToWire for (A, B) {
    fn to_wire(&self) -> Value {
        pair(self.0.to_wire(), self.1.to_wire())
    }
}

macro_rules! primitive_to_wire {
    ($($ty: ty),*) => {$(
        impl ToWire for $ty {
            fn to_wire(&self) -> Value {
                Value::from(self.clone())
            }
        }
    )*};
}

primitive_to_wire!(String, i32, i64, u32, u64, usize, bool);

impl ToWire for f64 {
    fn to_wire(&self) -> Value {
        float(*self)
    }
}

impl ToWire for str {
    fn to_wire(&self) -> Value {
        Value::from(self)
    }
}

impl ToWire for SExp {
    fn to_wire(&self) -> Value {
        match self {
            Self::Void => node("Void", vec![]),
            Self::Nil => node("Nil", vec![]),
            Self::Boolean(b) => json!({ "type": "Boolean", "value": b }),
            Self::Char(c) => text("Char", &c.to_string()),
            Self::String(s) => text("String", s),
            Self::Symbol(s) => text("Symbol", s),
            Self::Rational {
                numerator,
                denominator,
            } => node(
                "Rational",
                vec![
                    ("numerator", numerator.to_wire()),
                    ("denominator", denominator.to_wire()),
                ],
            ),
            Self::Float(f) => json!({ "type": "Float", "value": float(*f) }),
            Self::Pair(p) => pair(p.0.to_wire(), p.1.to_wire()),
            Self::Vector(elems) => elems.to_wire(),
        }
    }
}

impl ToWire for Var {
    fn to_wire(&self) -> Value {
        node("Var", vec![("name", self.name.to_wire())])
    }
}

impl ToWire for LambdaKind {
    fn to_wire(&self) -> Value {
        match self {
            Self::Simple => node("Simple", vec![]),
            Self::Opt { opt } => node("Opt", vec![("opt", opt.to_wire())]),
        }
    }
}

impl ToWire for Expr {
    fn to_wire(&self) -> Value {
        match self {
            Self::Const(sexpr) => node("Const", vec![("sexpr", sexpr.to_wire())]),
            Self::VarGet(var) => node("VarGet", vec![("var", var.to_wire())]),
            Self::If { test, dit, dif } => node(
                "If",
                vec![
                    ("test", test.to_wire()),
                    ("dit", dit.to_wire()),
                    ("dif", dif.to_wire()),
                ],
            ),
            Self::Seq(exprs) => node("Seq", vec![("exprs", exprs.to_wire())]),
            Self::Or(exprs) => node("Or", vec![("exprs", exprs.to_wire())]),
            Self::VarSet { var, val } => {
                node("VarSet", vec![("var", var.to_wire()), ("val", val.to_wire())])
            }
            Self::VarDef { var, val } => {
                node("VarDef", vec![("var", var.to_wire()), ("val", val.to_wire())])
            }
            Self::Lambda { params, kind, body } => node(
                "Lambda",
                vec![
                    ("params", params.to_wire()),
                    ("kind", kind.to_wire()),
                    ("body", body.to_wire()),
                ],
            ),
            Self::Applic {
                applicative,
                params,
            } => node(
                "Applic",
                vec![
                    ("applicative", applicative.to_wire()),
                    ("params", params.to_wire()),
                ],
            ),
        }
    }
}

impl ToWire for LexicalAddress {
    fn to_wire(&self) -> Value {
        match self {
            Self::Free => node("Free", vec![]),
            Self::Param { minor } => node("Param", vec![("minor", minor.to_wire())]),
            Self::Bound { major, minor } => node(
                "Bound",
                vec![("major", major.to_wire()), ("minor", minor.to_wire())],
            ),
        }
    }
}

impl ToWire for VarTag {
    fn to_wire(&self) -> Value {
        node(
            "VarTag",
            vec![
                ("name", self.name.to_wire()),
                ("lexical_address", self.lexical_address.to_wire()),
            ],
        )
    }
}

impl ToWire for AppKind {
    fn to_wire(&self) -> Value {
        match self {
            Self::TailCall => enumerated("AppKind", "TailCall"),
            Self::NonTailCall => enumerated("AppKind", "NonTailCall"),
        }
    }
}

impl ToWire for ExprTag {
    fn to_wire(&self) -> Value {
        match self {
            Self::Const(sexpr) => node("Const", vec![("sexpr", sexpr.to_wire())]),
            Self::VarGet(var) => node("VarGetTag", vec![("var", var.to_wire())]),
            Self::If { test, dit, dif } => node(
                "IfTag",
                vec![
                    ("test", test.to_wire()),
                    ("dit", dit.to_wire()),
                    ("dif", dif.to_wire()),
                ],
            ),
            Self::Seq(exprs) => node("SeqTag", vec![("exprs", exprs.to_wire())]),
            Self::Or(exprs) => node("OrTag", vec![("exprs", exprs.to_wire())]),
            Self::VarSet { var, val } => node(
                "VarSetTag",
                vec![("var", var.to_wire()), ("val", val.to_wire())],
            ),
            Self::VarDef { var, val } => node(
                "VarDefTag",
                vec![("var", var.to_wire()), ("val", val.to_wire())],
            ),
            Self::Box(var) => node("BoxTag", vec![("var", var.to_wire())]),
            Self::BoxGet(var) => node("BoxGetTag", vec![("var", var.to_wire())]),
            Self::BoxSet { var, val } => node(
                "BoxSetTag",
                vec![("var", var.to_wire()), ("val", val.to_wire())],
            ),
            Self::Lambda { params, kind, body } => node(
                "LambdaTag",
                vec![
                    ("params", params.to_wire()),
                    ("kind", kind.to_wire()),
                    ("body", body.to_wire()),
                ],
            ),
            Self::Applic {
                applicative,
                params,
                kind,
            } => node(
                "ApplicTag",
                vec![
                    ("applicative", applicative.to_wire()),
                    ("params", params.to_wire()),
                    ("kind", kind.to_wire()),
                ],
            ),
        }
    }
}

impl ToWire for ScmError {
    fn to_wire(&self) -> Value {
        text(self.kind(), self.message())
    }
}

/// Serializes a value whose concrete type is only known at runtime.
///
/// Values outside the tree families and their primitives are rejected with
/// [`ScmError::UnserializableType`].
pub fn serialize<T: Any>(value: &T) -> ScmResult<Value> {
    let any = value as &dyn Any;

    macro_rules! try_serialize {
        ($($ty: ty),*) => {$(
            if let Some(value) = any.downcast_ref::<$ty>() {
                return Ok(value.to_wire());
            }
        )*};
    }

    try_serialize!(
        SExp,
        Expr,
        ExprTag,
        Var,
        VarTag,
        LambdaKind,
        LexicalAddress,
        AppKind,
        Vec<SExp>,
        Vec<Expr>,
        Vec<ExprTag>,
        Vec<String>,
        (SExp, SExp),
        String,
        i32,
        i64,
        u32,
        u64,
        usize,
        f64,
        bool
    );

    if let Some(value) = any.downcast_ref::<&'static str>() {
        return Ok(value.to_wire());
    }

    Err(ScmError::UnserializableType(
        std::any::type_name::<T>().to_string(),
    ))
}
