//! Shared helpers for building target memory images

#![allow(dead_code)]

use mongo_printers::core::memory::SnapshotMemory;
use mongo_printers::debuginfo::{Inspector, TypeRegistry};
use mongo_printers::printers::{mongo_printers, PrinterRegistry, RenderOptions, Renderer};
use mongo_printers::DocumentCodec;

/// Bump allocator over a snapshot; allocations never touch each other
pub struct Image {
    pub mem: SnapshotMemory,
    next: u64,
}

impl Image {
    pub fn new() -> Self {
        Self {
            mem: SnapshotMemory::new(),
            next: 0x10000,
        }
    }

    pub fn alloc(&mut self, bytes: &[u8]) -> u64 {
        let address = self.next;
        self.mem.map(address, bytes.to_vec());
        self.next += (bytes.len() as u64 + 15) / 16 * 16 + 0x100;
        address
    }

    /// libstdc++ string object bytes pointing at a fresh heap copy of `text`
    pub fn std_string(&mut self, text: &str) -> Vec<u8> {
        let mut data = text.as_bytes().to_vec();
        data.push(0);
        let ptr = self.alloc(&data);

        let mut out = Vec::with_capacity(32);
        out.extend_from_slice(&ptr.to_le_bytes());
        out.extend_from_slice(&(text.len() as u64).to_le_bytes());
        out.extend_from_slice(&[0u8; 16]);
        out
    }

    /// `mongo::Status::ErrorInfo` record
    pub fn error_info(&mut self, code: i32, reason: &str, location: i32) -> u64 {
        let mut info = Vec::with_capacity(48);
        info.extend_from_slice(&1u32.to_le_bytes());
        info.extend_from_slice(&code.to_le_bytes());
        let reason = self.std_string(reason);
        info.extend_from_slice(&reason);
        info.extend_from_slice(&location.to_le_bytes());
        info.extend_from_slice(&[0u8; 4]);
        self.alloc(&info)
    }

    /// `mongo::Status` whose `_error` is `error` (0 for OK)
    pub fn status(&mut self, error: u64) -> u64 {
        self.alloc(&error.to_le_bytes())
    }

    /// `mongo::StringData` viewing a fresh copy of `bytes`
    pub fn string_data(&mut self, bytes: &[u8], size: i64) -> u64 {
        let data = self.alloc(bytes);
        let mut view = Vec::with_capacity(16);
        view.extend_from_slice(&data.to_le_bytes());
        view.extend_from_slice(&size.to_le_bytes());
        self.alloc(&view)
    }

    /// `mongo::StringMap<T>` with one slot per element of `slots`, using
    /// the built-in layout: 8 byte slot header, 32 byte key, then the value
    /// zero-padded to `value_size` (the pair's tail including padding)
    pub fn string_map(
        &mut self,
        slots: &[Option<(&str, Vec<u8>)>],
        value_size: usize,
        reported_size: u32,
    ) -> u64 {
        let entry_size = 8 + 32 + value_size;
        let mut entries = Vec::with_capacity(slots.len() * entry_size);
        for slot in slots {
            let start = entries.len();
            if let Some((key, value)) = slot {
                entries.push(1u8);
                entries.extend_from_slice(&[0, 0, 0]);
                entries.extend_from_slice(&0x5eedu32.to_le_bytes());
                let key = self.std_string(key);
                entries.extend_from_slice(&key);
                entries.extend_from_slice(value);
            }
            entries.resize(start + entry_size, 0);
        }
        let entries = self.alloc(&entries);

        let mut map = Vec::with_capacity(24);
        map.extend_from_slice(&reported_size.to_le_bytes());
        map.extend_from_slice(&[0u8; 4]);
        map.extend_from_slice(&(slots.len() as i32).to_le_bytes());
        map.extend_from_slice(&0i32.to_le_bytes());
        map.extend_from_slice(&entries.to_le_bytes());
        self.alloc(&map)
    }

    /// `mongo::BSONObj` over `bytes`; an owned object gets a live holder
    pub fn bson_obj(&mut self, bytes: &[u8], owned: bool) -> (u64, u64) {
        let data = self.alloc(bytes);
        let holder = if owned {
            self.alloc(&1u32.to_le_bytes())
        } else {
            0
        };

        let mut obj = Vec::with_capacity(16);
        obj.extend_from_slice(&data.to_le_bytes());
        obj.extend_from_slice(&holder.to_le_bytes());
        (self.alloc(&obj), data)
    }
}

/// Everything a render borrows, owned in one place
pub struct Fixture {
    pub types: TypeRegistry,
    pub printers: PrinterRegistry,
    pub options: RenderOptions,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            types: TypeRegistry::builtin(),
            printers: mongo_printers(),
            options: RenderOptions::default(),
        }
    }

    pub fn renderer<'a>(
        &'a self,
        image: &'a Image,
        codec: Option<&'a dyn DocumentCodec>,
    ) -> Renderer<'a> {
        Renderer::new(Inspector::new(&image.mem, &self.types), &self.printers)
            .with_codec(codec)
            .with_options(self.options)
    }
}
