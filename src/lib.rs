pub mod compiler;
pub mod error;
pub mod options;
pub mod pipeline;
pub mod wire;

pub mod prelude {
    pub use crate::compiler::reader::{R7rsReader, SourceReader};
    pub use crate::compiler::sexpr::SExp;
    pub use crate::compiler::tree_il::*;
    pub use crate::error::{ScmError, ScmResult};
    pub use crate::pipeline::{parse_scheme, Analyzed, ParsingMode, Pipeline, Request};
    pub use crate::wire::{serialize, ToWire};
}

pub use error::{ScmError, ScmResult};
