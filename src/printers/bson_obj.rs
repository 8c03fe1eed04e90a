//! `mongo::BSONObj`: length-prefixed binary document
//!
//! The length prefix is sanity-checked before anything else is read since
//! the object may be uninitialized. Decoding is best effort: a bad document
//! is reported inside the summary and never fails the render.

use super::{Child, Children, Printer, Renderer};
use crate::codec::DecodedDocument;
use crate::debuginfo::{InspectError, Value};
use std::cell::OnceCell;

/// Name used for documents in summaries
pub const DOC_TYPE: &str = "BSONObj";

/// Length prefix plus terminating NUL
pub const MIN_DOC_SIZE: i32 = 5;

/// Largest length treated as plausible
pub const MAX_DOC_SIZE: i32 = 17 * 1024 * 1024;

/// What was found behind the data pointer
#[derive(Debug, Clone, PartialEq, Eq)]
enum Contents {
    /// Length outside the plausible range; probably not a live document
    Implausible(i32),
    Empty,
    Decoded(i32, DecodedDocument),
    Failed(i32, String),
    /// No codec available
    Undecoded(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Inspection {
    ownership: &'static str,
    address: u64,
    contents: Contents,
}

pub struct BsonObjPrinter<'a> {
    value: Value<'a>,
    inspection: OnceCell<Inspection>,
}

impl BsonObjPrinter<'_> {
    pub fn create<'a>(value: Value<'a>) -> Box<dyn Printer<'a> + 'a> {
        Box::new(BsonObjPrinter {
            value,
            inspection: OnceCell::new(),
        })
    }
}

impl<'a> BsonObjPrinter<'a> {
    fn inspection(&self, renderer: &Renderer<'a>) -> Result<&Inspection, InspectError> {
        if let Some(inspection) = self.inspection.get() {
            return Ok(inspection);
        }
        let inspection = self.inspect(renderer)?;
        Ok(self.inspection.get_or_init(|| inspection))
    }

    fn inspect(&self, renderer: &Renderer<'a>) -> Result<Inspection, InspectError> {
        let holder = self.value.field("_ownedBuffer")?.field("_holder")?;
        let ownership = if holder.is_null()? { "unowned" } else { "owned" };

        let data = self.value.field("_objdata")?;
        let address = data.pointer_value()?;
        let size = renderer.inspector().memory().read_i32(address)?;

        let contents = if !(MIN_DOC_SIZE..=MAX_DOC_SIZE).contains(&size) {
            Contents::Implausible(size)
        } else if size == MIN_DOC_SIZE {
            Contents::Empty
        } else {
            match renderer.codec() {
                None => Contents::Undecoded(size),
                Some(codec) => {
                    // Only the length prefix is trusted; a body running off
                    // mapped memory is a decode failure like any other
                    let decoded = data
                        .read_pointee_bytes(size as usize)
                        .map_err(|e| e.to_string())
                        .and_then(|bytes| codec.decode(&bytes).map_err(|e| e.to_string()));
                    match decoded {
                        Ok(document) => Contents::Decoded(size, document),
                        Err(cause) => {
                            log::warn!("Failed to decode {} @ {:#x}: {}", DOC_TYPE, address, cause);
                            Contents::Failed(size, cause)
                        }
                    }
                }
            }
        };

        Ok(Inspection {
            ownership,
            address,
            contents,
        })
    }
}

/// Hex rendering of a suspicious length; negative values keep their sign
fn hex_len(size: i32) -> String {
    if size < 0 {
        format!("-{:#x}", (size as i64).unsigned_abs())
    } else {
        format!("{:#x}", size)
    }
}

impl<'a> Printer<'a> for BsonObjPrinter<'a> {
    fn to_string(&self, renderer: &Renderer<'a>) -> Result<String, InspectError> {
        let Inspection {
            ownership,
            address,
            contents,
        } = self.inspection(renderer)?;

        Ok(match contents {
            Contents::Implausible(size) => format!(
                "{} {} {} bytes @ {:#x}",
                ownership,
                DOC_TYPE,
                hex_len(*size),
                address
            ),
            Contents::Empty => format!("{} empty {} @ {:#x}", ownership, DOC_TYPE, address),
            Contents::Decoded(size, document) => format!(
                "{} {} {} bytes @ {:#x}: {}",
                ownership, DOC_TYPE, size, address, document.text
            ),
            Contents::Failed(size, cause) => format!(
                "{} {} {} bytes @ {:#x}: error decoding ({})",
                ownership, DOC_TYPE, size, address, cause
            ),
            Contents::Undecoded(size) => {
                format!("{} {} {} bytes @ {:#x}", ownership, DOC_TYPE, size, address)
            }
        })
    }

    fn children(&self, renderer: &Renderer<'a>) -> Result<Children<'a>, InspectError> {
        let fields = match &self.inspection(renderer)?.contents {
            Contents::Decoded(_, document) => document.fields.clone(),
            _ => Vec::new(),
        };
        Ok(Box::new(
            fields
                .into_iter()
                .map(|(name, text)| Ok(Child::text(name, text))),
        ))
    }
}
