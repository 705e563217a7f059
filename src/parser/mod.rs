// Parser module for extracting raw declarations from Python source

pub mod ast;
pub mod classify;
mod python;

pub use ast::*;
pub use classify::{AttributeSource, Confidence, RelationshipKind};
pub use python::UnitExtractor;
