//! Printer registry
//!
//! An ordered list of (type pattern, printer) pairs. Registering a pattern
//! that is already present replaces the earlier printer in place.

use super::Printer;
use crate::debuginfo::layout::normalize_type_name;
use crate::debuginfo::Value;
use std::fmt;

/// Builds a printer for a value
pub type PrinterFactory = for<'a> fn(Value<'a>) -> Box<dyn Printer<'a> + 'a>;

/// Which type names a printer applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypePattern {
    /// The whole (normalized) name must match
    Exact(String),
    /// The name must start with this text (templated types)
    Prefix(String),
}

impl TypePattern {
    pub fn exact(name: &str) -> Self {
        Self::Exact(normalize_type_name(name))
    }

    pub fn prefix(prefix: &str) -> Self {
        Self::Prefix(prefix.trim().to_string())
    }

    pub fn matches(&self, type_name: &str) -> bool {
        match self {
            Self::Exact(name) => name == type_name,
            Self::Prefix(prefix) => type_name.starts_with(prefix.as_str()),
        }
    }
}

impl fmt::Display for TypePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => write!(f, "^{}$", name),
            Self::Prefix(prefix) => write!(f, "^{}", prefix),
        }
    }
}

/// One registered printer
#[derive(Clone)]
pub struct RegisteredPrinter {
    pub name: String,
    pub pattern: TypePattern,
    pub enabled: bool,
    factory: PrinterFactory,
}

impl RegisteredPrinter {
    /// Bind the printer to a value
    pub fn build<'a>(&self, value: Value<'a>) -> Box<dyn Printer<'a> + 'a> {
        (self.factory)(value)
    }
}

impl fmt::Debug for RegisteredPrinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredPrinter")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Named, ordered collection of printers
#[derive(Debug, Clone)]
pub struct PrinterRegistry {
    name: String,
    printers: Vec<RegisteredPrinter>,
}

impl PrinterRegistry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            printers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a printer. A printer already registered for an identical
    /// pattern is replaced and keeps its position.
    pub fn add_printer(&mut self, name: &str, pattern: TypePattern, factory: PrinterFactory) {
        let entry = RegisteredPrinter {
            name: name.to_string(),
            pattern,
            enabled: true,
            factory,
        };

        if let Some(existing) = self
            .printers
            .iter_mut()
            .find(|p| p.pattern == entry.pattern)
        {
            log::debug!(
                "{}: replacing printer {} for {} with {}",
                self.name,
                existing.name,
                entry.pattern,
                entry.name
            );
            *existing = entry;
        } else {
            log::debug!("{}: registered {} for {}", self.name, entry.name, entry.pattern);
            self.printers.push(entry);
        }
    }

    /// Register every printer of `other`, later registrations winning
    pub fn merge(&mut self, other: PrinterRegistry) {
        for printer in other.printers {
            let enabled = printer.enabled;
            let pattern = printer.pattern.clone();
            self.add_printer(&printer.name, printer.pattern, printer.factory);
            if !enabled {
                if let Some(p) = self.printers.iter_mut().find(|p| p.pattern == pattern) {
                    p.enabled = false;
                }
            }
        }
    }

    /// Enable or disable every printer called `name`; returns whether any
    /// printer matched
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        let mut found = false;
        for printer in self.printers.iter_mut().filter(|p| p.name == name) {
            printer.enabled = enabled;
            found = true;
        }
        found
    }

    pub fn printers(&self) -> impl Iterator<Item = &RegisteredPrinter> {
        self.printers.iter()
    }

    pub fn len(&self) -> usize {
        self.printers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.printers.is_empty()
    }

    /// First enabled printer whose pattern matches `type_name`
    pub fn lookup(&self, type_name: &str) -> Option<&RegisteredPrinter> {
        let type_name = normalize_type_name(type_name);
        self.printers
            .iter()
            .filter(|p| p.enabled)
            .find(|p| p.pattern.matches(&type_name))
    }

    /// Printer for a value: its declared type first, then with typedefs
    /// stripped
    pub fn lookup_value(&self, value: &Value<'_>) -> Option<&RegisteredPrinter> {
        self.lookup(value.type_name())
            .or_else(|| self.lookup(value.resolved_type_name()))
    }
}
