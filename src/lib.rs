//! mongo-printers - Pretty-printers for mongo core types
//!
//! Renders `mongo::StringMap<T>`, `mongo::Status`, `mongo::StringData` and
//! `mongo::BSONObj` (plus libstdc++ strings) from raw target memory:
//! - `core`: reads from a stopped process or a memory snapshot
//! - `debuginfo`: type layouts and typed values
//! - `codec`: binary document decoding
//! - `printers`: the printers, their registry and the renderer

pub mod codec;
pub mod core;
pub mod debuginfo;
pub mod printers;
pub mod ui;

pub use codec::{default_codec, DocumentCodec};
pub use crate::core::memory::{MemoryError, ProcessMemory, SnapshotMemory, TargetMemory};
pub use debuginfo::{InspectError, Inspector, TypeError, TypeRegistry, Value};
pub use printers::{mongo_printers, PrinterRegistry, RenderOptions, Rendered, Renderer};
