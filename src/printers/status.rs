//! `mongo::Status`: null `_error` is success, otherwise an `ErrorInfo`
//! record with code, reason and location

use super::{Printer, Renderer};
use crate::debuginfo::{InspectError, TypeKind, Value};

/// `ErrorCodes::OK`
pub const OK: i64 = 0;

/// Rendering of a successful status
pub const OK_TEXT: &str = "Status::OK()";

pub struct StatusPrinter<'a> {
    value: Value<'a>,
}

impl StatusPrinter<'_> {
    pub fn create<'a>(value: Value<'a>) -> Box<dyn Printer<'a> + 'a> {
        Box::new(StatusPrinter { value })
    }
}

impl<'a> StatusPrinter<'a> {
    /// Numeric code; a null error record means OK
    pub fn code(&self) -> Result<i64, InspectError> {
        let error = self.value.field("_error")?;
        if error.is_null()? {
            return Ok(OK);
        }
        error.deref()?.field("code")?.as_i64()
    }
}

/// Text of an error code without its namespace (`mongo::ErrorCodes::BadValue`
/// becomes `BadValue`; codes outside the enum stay numeric)
fn code_name(code: &Value<'_>) -> Result<String, InspectError> {
    let text = match code.layout().kind {
        TypeKind::Enum { .. } => code.enum_text()?,
        _ => code.as_int()?.to_string(),
    };
    Ok(text.rsplit("::").next().unwrap_or_default().to_string())
}

impl<'a> Printer<'a> for StatusPrinter<'a> {
    fn to_string(&self, renderer: &Renderer<'a>) -> Result<String, InspectError> {
        if self.code()? == OK {
            return Ok(OK_TEXT.to_string());
        }

        let info = self.value.field("_error")?.deref()?;
        let code = code_name(&info.field("code")?)?;
        let reason = renderer.summarize(&info.field("reason")?)?;

        let location = if info.has_field("location") {
            let location = info.field("location")?;
            if renderer.is_truthy(&location)? {
                Some(renderer.summarize(&location)?)
            } else {
                None
            }
        } else {
            None
        };

        Ok(match location {
            Some(location) => format!("Status({}, {}, {})", code, reason, location),
            None => format!("Status({}, {})", code, reason),
        })
    }
}
