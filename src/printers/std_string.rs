//! libstdc++ `std::string`

use super::{DisplayHint, Printer, Renderer};
use crate::debuginfo::{InspectError, Value};

pub struct StdStringPrinter<'a> {
    value: Value<'a>,
}

impl StdStringPrinter<'_> {
    pub fn create<'a>(value: Value<'a>) -> Box<dyn Printer<'a> + 'a> {
        Box::new(StdStringPrinter { value })
    }
}

impl<'a> Printer<'a> for StdStringPrinter<'a> {
    fn to_string(&self, renderer: &Renderer<'a>) -> Result<String, InspectError> {
        let data = self.value.field("_M_dataplus")?.field("_M_p")?;
        let length = self.value.field("_M_string_length")?.as_u64()?;
        let len = length.min(renderer.options().max_string_len as u64) as usize;

        let bytes = data.read_pointee_bytes(len)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn display_hint(&self) -> Option<DisplayHint> {
        Some(DisplayHint::String)
    }

    fn is_capped(&self, renderer: &Renderer<'a>) -> Result<bool, InspectError> {
        let length = self.value.field("_M_string_length")?.as_u64()?;
        Ok(length > renderer.options().max_string_len as u64)
    }
}
