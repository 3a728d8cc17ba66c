//! Errors raised while reading, parsing, analyzing or serializing a request.
//!
//! Every error is local to the request that raised it and is reported to the
//! caller as a structured failure, never as a partially analyzed tree.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScmError {
    /// Unknown pipeline stage name, or a missing request field.
    Lookup(String),
    /// The reading engine or the syntactic parser rejected the source text.
    Syntax(String),
    /// An analysis invariant does not hold (e.g. duplicate lambda parameters).
    Analysis(String),
    /// A mutating operation was applied to an immutable text-role value.
    InvalidOperation(String),
    /// The serializer was handed a value outside the known tree families.
    UnserializableType(String),
}

impl ScmError {
    /// Name of the error kind as reported on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Lookup(_) => "LookupError",
            Self::Syntax(_) => "SyntaxError",
            Self::Analysis(_) => "AnalysisError",
            Self::InvalidOperation(_) => "InvalidOperation",
            Self::UnserializableType(_) => "UnserializableType",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Lookup(msg)
            | Self::Syntax(msg)
            | Self::Analysis(msg)
            | Self::InvalidOperation(msg)
            | Self::UnserializableType(msg) => msg,
        }
    }
}

impl fmt::Display for ScmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnserializableType(ty) => write!(f, "{}: unserializable type {}", self.kind(), ty),
            _ => write!(f, "{}: {}", self.kind(), self.message()),
        }
    }
}

impl std::error::Error for ScmError {}

pub type ScmResult<T> = Result<T, ScmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_display() {
        let err = ScmError::Lookup("unknown parsing mode FOO".to_string());
        assert_eq!(err.kind(), "LookupError");
        assert_eq!(err.to_string(), "LookupError: unknown parsing mode FOO");

        let err = ScmError::UnserializableType("std::collections::HashMap<u8, u8>".to_string());
        assert_eq!(err.kind(), "UnserializableType");
        assert!(err.to_string().contains("HashMap"));
    }
}
