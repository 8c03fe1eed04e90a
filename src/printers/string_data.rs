//! `mongo::StringData`: pointer plus explicit length, or -1 when the data
//! is NUL-terminated

use super::{DisplayHint, Printer, Renderer};
use crate::debuginfo::{InspectError, Value};

/// `_size` value meaning "scan for the terminator"
pub const UNKNOWN_SIZE: i64 = -1;

pub struct StringDataPrinter<'a> {
    value: Value<'a>,
}

impl StringDataPrinter<'_> {
    pub fn create<'a>(value: Value<'a>) -> Box<dyn Printer<'a> + 'a> {
        Box::new(StringDataPrinter { value })
    }

    fn size(&self) -> Result<i64, InspectError> {
        self.value.field("_size")?.as_i64()
    }
}

impl<'a> Printer<'a> for StringDataPrinter<'a> {
    fn to_string(&self, renderer: &Renderer<'a>) -> Result<String, InspectError> {
        let max = renderer.options().max_string_len;
        let size = self.size()?;
        let data = self.value.field("_data")?;

        let bytes = if size == UNKNOWN_SIZE {
            data.read_c_string(max)?
        } else {
            // Embedded NULs are part of the view
            let len = (size as u64).min(max as u64) as usize;
            data.read_pointee_bytes(len)?
        };
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn display_hint(&self) -> Option<DisplayHint> {
        Some(DisplayHint::String)
    }

    fn is_capped(&self, renderer: &Renderer<'a>) -> Result<bool, InspectError> {
        let size = self.size()?;
        Ok(size != UNKNOWN_SIZE && size as u64 > renderer.options().max_string_len as u64)
    }
}
