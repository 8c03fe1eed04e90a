//! Printers - Human-readable renderings of mongo core types
//!
//! Each printer wraps one typed value and knows how to summarize it and,
//! for containers, enumerate its children. The [`PrinterRegistry`] maps
//! type names to printers and the [`Renderer`] drives them.

pub mod bson_obj;
pub mod registry;
pub mod render;
pub mod status;
pub mod std_string;
pub mod string_data;
pub mod string_map;

#[cfg(test)]
mod tests;

pub use registry::{PrinterFactory, PrinterRegistry, RegisteredPrinter, TypePattern};
pub use render::{RenderOptions, Rendered, Renderer};

use crate::debuginfo::registry::STD_STRING;
use crate::debuginfo::{InspectError, Value};

/// How the debugger front end should lay out a rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayHint {
    /// Children alternate key, value
    Map,
    /// Summary is string contents and is shown quoted
    String,
}

/// A child's contents: either another typed value (rendered in turn) or
/// text that is already formatted
#[derive(Debug, Clone)]
pub enum ChildValue<'a> {
    Value(Value<'a>),
    Text(String),
}

/// A named child of a rendered value
#[derive(Debug, Clone)]
pub struct Child<'a> {
    pub name: String,
    pub value: ChildValue<'a>,
}

impl<'a> Child<'a> {
    pub fn value(name: impl Into<String>, value: Value<'a>) -> Self {
        Self {
            name: name.into(),
            value: ChildValue::Value(value),
        }
    }

    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: ChildValue::Text(text.into()),
        }
    }
}

/// Lazily produced children; a failed read ends the sequence with an error
pub type Children<'a> = Box<dyn Iterator<Item = Result<Child<'a>, InspectError>> + 'a>;

/// A pretty-printer bound to one value
pub trait Printer<'a> {
    /// One-line summary
    fn to_string(&self, renderer: &Renderer<'a>) -> Result<String, InspectError>;

    /// Child values, in display order
    fn children(&self, _renderer: &Renderer<'a>) -> Result<Children<'a>, InspectError> {
        Ok(Box::new(std::iter::empty()))
    }

    fn display_hint(&self) -> Option<DisplayHint> {
        None
    }

    /// Whether `to_string` stopped at a read limit before the end of the
    /// value
    fn is_capped(&self, _renderer: &Renderer<'a>) -> Result<bool, InspectError> {
        Ok(false)
    }
}

/// The default collection for mongo core types
pub fn mongo_printers() -> PrinterRegistry {
    let mut registry = PrinterRegistry::new("mongo");
    registry.add_printer(
        "StringMap",
        TypePattern::prefix("mongo::StringMap<"),
        string_map::StringMapPrinter::create,
    );
    registry.add_printer(
        "Status",
        TypePattern::exact("mongo::Status"),
        status::StatusPrinter::create,
    );
    registry.add_printer(
        "StringData",
        TypePattern::exact("mongo::StringData"),
        string_data::StringDataPrinter::create,
    );
    registry.add_printer(
        "BSONObj",
        TypePattern::exact("mongo::BSONObj"),
        bson_obj::BsonObjPrinter::create,
    );
    registry.add_printer(
        "std::string",
        TypePattern::exact("std::string"),
        std_string::StdStringPrinter::create,
    );
    registry.add_printer(
        "basic_string<char>",
        TypePattern::exact(STD_STRING),
        std_string::StdStringPrinter::create,
    );
    registry
}
