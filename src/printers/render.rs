//! Renderer - picks printers and formats values
//!
//! Values without a printer are formatted structurally (integers, enums,
//! pointers, nested structs) the way a debugger prints raw values.

use super::{ChildValue, DisplayHint, PrinterRegistry};
use crate::codec::DocumentCodec;
use crate::debuginfo::{InspectError, Inspector, TypeKind, Value};
use std::fmt;

/// Nested struct depth shown before eliding with `{...}`
const MAX_PLAIN_DEPTH: usize = 2;

/// Limits applied while rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Upper bound for any string read from the target
    pub max_string_len: usize,
    /// Upper bound for children (map elements count once per pair)
    pub max_children: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_string_len: 64 * 1024,
            max_children: 200,
        }
    }
}

/// Result of rendering one value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub type_name: String,
    pub summary: String,
    pub hint: Option<DisplayHint>,
    /// The summary stopped at `max_string_len`
    pub capped: bool,
    pub children: Vec<(String, String)>,
    /// More children existed than `max_children` allowed
    pub truncated: bool,
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hint {
            Some(DisplayHint::String) => write!(f, "{}", quote(&self.summary))?,
            _ => write!(f, "{}", self.summary)?,
        }
        if self.capped {
            write!(f, "...")?;
        }
        if self.children.is_empty() {
            return Ok(());
        }

        let items: Vec<String> = match self.hint {
            Some(DisplayHint::Map) => self
                .children
                .chunks(2)
                .map(|pair| match pair {
                    [(_, k), (_, v)] => format!("[{}] = {}", k, v),
                    [(_, k)] => format!("[{}]", k),
                    _ => String::new(),
                })
                .collect(),
            _ => self
                .children
                .iter()
                .map(|(name, text)| format!("{} = {}", name, text))
                .collect(),
        };
        write!(f, " = {{{}", items.join(", "))?;
        if self.truncated {
            write!(f, "...")?;
        }
        write!(f, "}}")
    }
}

/// Wrap text in double quotes, escaping like a debugger would
pub fn quote(text: &str) -> String {
    format!("\"{}\"", text.escape_debug())
}

/// Renders values through a printer registry
pub struct Renderer<'a> {
    inspector: Inspector<'a>,
    printers: &'a PrinterRegistry,
    codec: Option<&'a dyn DocumentCodec>,
    options: RenderOptions,
}

impl<'a> Renderer<'a> {
    pub fn new(inspector: Inspector<'a>, printers: &'a PrinterRegistry) -> Self {
        Self {
            inspector,
            printers,
            codec: None,
            options: RenderOptions::default(),
        }
    }

    pub fn with_codec(mut self, codec: Option<&'a dyn DocumentCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn inspector(&self) -> Inspector<'a> {
        self.inspector
    }

    pub fn codec(&self) -> Option<&'a dyn DocumentCodec> {
        self.codec
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render the object of type `type_name` at `address`
    pub fn render_at(&self, address: u64, type_name: &str) -> Result<Rendered, InspectError> {
        let value = self.inspector.value_at(address, type_name)?;
        self.render(&value)
    }

    /// Render a value with its printer, or structurally when none matches
    pub fn render(&self, value: &Value<'a>) -> Result<Rendered, InspectError> {
        let Some(entry) = self.printers.lookup_value(value) else {
            log::debug!("No printer for {}", value.type_name());
            return Ok(Rendered {
                type_name: value.type_name().to_string(),
                summary: self.format_plain(value, 0)?,
                hint: None,
                capped: false,
                children: Vec::new(),
                truncated: false,
            });
        };

        log::debug!("Rendering {:?} with {}", value, entry.name);
        let printer = entry.build(value.clone());
        let hint = printer.display_hint();
        let summary = printer.to_string(self)?;
        let capped = printer.is_capped(self)?;

        let limit = match hint {
            Some(DisplayHint::Map) => self.options.max_children.saturating_mul(2),
            _ => self.options.max_children,
        };
        let mut children = Vec::new();
        let mut truncated = false;
        for child in printer.children(self)? {
            if children.len() >= limit {
                log::debug!("{}: children cut at {}", value.type_name(), limit);
                truncated = true;
                break;
            }
            let child = child?;
            let text = match child.value {
                ChildValue::Value(v) => self.summarize(&v)?,
                ChildValue::Text(text) => text,
            };
            children.push((child.name, text));
        }

        Ok(Rendered {
            type_name: value.type_name().to_string(),
            summary,
            hint,
            capped,
            children,
            truncated,
        })
    }

    /// One-line text for a nested value: its printer's summary (quoted for
    /// strings, `...` when capped), otherwise the structural rendering
    pub fn summarize(&self, value: &Value<'a>) -> Result<String, InspectError> {
        self.summarize_at(value, 1)
    }

    fn summarize_at(&self, value: &Value<'a>, depth: usize) -> Result<String, InspectError> {
        match self.printers.lookup_value(value) {
            Some(entry) => {
                let printer = entry.build(value.clone());
                let text = printer.to_string(self)?;
                let mut text = match printer.display_hint() {
                    Some(DisplayHint::String) => quote(&text),
                    _ => text,
                };
                if printer.is_capped(self)? {
                    text.push_str("...");
                }
                Ok(text)
            }
            None => self.format_plain(value, depth),
        }
    }

    /// Whether a value counts as present: non-zero numbers, non-null
    /// pointers, non-empty printed strings
    pub fn is_truthy(&self, value: &Value<'a>) -> Result<bool, InspectError> {
        match &value.layout().kind {
            TypeKind::Int { .. } | TypeKind::Bool | TypeKind::Char | TypeKind::Enum { .. } => {
                Ok(value.as_u64()? != 0)
            }
            TypeKind::Pointer { .. } => Ok(!value.is_null()?),
            _ => match self.printers.lookup_value(value) {
                Some(entry) => Ok(!entry.build(value.clone()).to_string(self)?.is_empty()),
                None => Ok(true),
            },
        }
    }

    fn format_plain(&self, value: &Value<'a>, depth: usize) -> Result<String, InspectError> {
        let layout = value.layout();
        match &layout.kind {
            TypeKind::Bool => Ok(value.as_bool()?.to_string()),
            TypeKind::Char => {
                let raw = value.as_i64()?;
                Ok(format!("{} {:?}", raw, (raw as u8) as char))
            }
            TypeKind::Int { .. } => Ok(value.as_int()?.to_string()),
            TypeKind::Enum { .. } => value.enum_text(),
            TypeKind::Pointer { target } => {
                let address = value.pointer_value()?;
                let is_char = self
                    .inspector
                    .types()
                    .resolve(target)
                    .map(|t| t.kind == TypeKind::Char)
                    .unwrap_or(false);
                if address == 0 || !is_char {
                    return Ok(format!("{:#x}", address));
                }
                let text = match value.read_c_string(self.options.max_string_len) {
                    Ok(bytes) => quote(&String::from_utf8_lossy(&bytes)),
                    Err(e) => format!("<error: {}>", e),
                };
                Ok(format!("{:#x} {}", address, text))
            }
            TypeKind::Struct { fields } => {
                if depth > MAX_PLAIN_DEPTH {
                    return Ok("{...}".to_string());
                }
                let mut parts = Vec::with_capacity(fields.len());
                for field in fields {
                    let member = value.field(&field.name)?;
                    parts.push(format!(
                        "{} = {}",
                        field.name,
                        self.summarize_at(&member, depth + 1)?
                    ));
                }
                Ok(format!("{{{}}}", parts.join(", ")))
            }
            TypeKind::Array { element, count } => {
                let element_layout = self.inspector.types().resolve(element)?;
                if element_layout.size == 1
                    && matches!(element_layout.kind, TypeKind::Int { .. } | TypeKind::Char)
                {
                    let shown = (*count as usize).min(self.options.max_string_len);
                    let bytes = self.inspector.memory().read(value.address(), shown)?;
                    return Ok(format!("0x{}", hex::encode(bytes)));
                }
                let shown = (*count).min(self.options.max_children as u64);
                let mut parts = Vec::with_capacity(shown as usize);
                for index in 0..shown {
                    parts.push(self.summarize_at(&value.element(index)?, depth + 1)?);
                }
                if shown < *count {
                    parts.push("...".to_string());
                }
                Ok(format!("{{{}}}", parts.join(", ")))
            }
            TypeKind::Typedef { .. } | TypeKind::Opaque => {
                Ok(format!("<{} bytes>", layout.size))
            }
        }
    }
}
