//! Debug info - Type layouts and typed values
//!
//! Provides the reflection half of the introspection API:
//! - Type layouts keyed by name (built-in or loaded from a layout file)
//! - Typed handles with field access, dereference and reinterpretation

pub mod layout;
pub mod registry;
pub mod value;

pub use layout::{template_argument, Enumerator, Field, TypeKind, TypeLayout};
pub use registry::TypeRegistry;
pub use value::{Inspector, Value};

use crate::core::memory::MemoryError;
use thiserror::Error;

/// Errors resolving types or members
#[derive(Error, Debug)]
pub enum TypeError {
    #[error("No type named {0}")]
    UnknownType(String),

    #[error("There is no member named {field} in {ty}")]
    NoSuchField { ty: String, field: String },

    #[error("Attempt to take contents of a non-pointer value of type {0}")]
    NotAPointer(String),

    #[error("Type {0} is not a structure")]
    NotAStruct(String),

    #[error("Type {0} is not an integer")]
    NotAnInteger(String),

    #[error("Type {0} has no template argument {1}")]
    NoTemplateArgument(String, usize),

    #[error("Typedef loop while resolving {0}")]
    TypedefLoop(String),

    #[error("Invalid layout file: {0}")]
    Layout(String),
}

/// Anything that can go wrong while reading a typed value
#[derive(Error, Debug)]
pub enum InspectError {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Type(#[from] TypeError),
}
