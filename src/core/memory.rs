//! Memory - Target memory reads
//!
//! Provides the read side of the introspection API: raw byte ranges,
//! little-endian primitives and C strings, from either a live process or
//! a snapshot of mapped regions.

use std::fs;
use std::path::Path;
use thiserror::Error;

/// Memory operation errors
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Failed to read memory at {address:#x}: {reason}")]
    ReadFailed { address: u64, reason: String },

    #[error("Short read at {address:#x}: wanted {wanted} bytes, got {got}")]
    ShortRead {
        address: u64,
        wanted: usize,
        got: usize,
    },

    #[error("Cannot access memory at address {address:#x}")]
    Unmapped { address: u64 },

    #[error("Failed to load snapshot {path}: {reason}")]
    Snapshot { path: String, reason: String },

    #[error("No process attached")]
    NoProcess,
}

/// Read access to the address space being inspected.
///
/// Implementors only provide [`TargetMemory::read_into`]; every other read
/// is built on top of it.
pub trait TargetMemory {
    /// Read up to `buffer.len()` bytes at `address`, returning how many
    /// bytes were actually available.
    fn read_into(&self, address: u64, buffer: &mut [u8]) -> Result<usize, MemoryError>;

    /// Short description of the target (shown in the CLI prompt)
    fn describe(&self) -> String;

    /// Read exactly `buffer.len()` bytes or fail
    fn read_exact(&self, address: u64, buffer: &mut [u8]) -> Result<(), MemoryError> {
        log::trace!("read {} bytes @ {:#x}", buffer.len(), address);
        let got = self.read_into(address, buffer)?;
        if got < buffer.len() {
            return Err(MemoryError::ShortRead {
                address,
                wanted: buffer.len(),
                got,
            });
        }
        Ok(())
    }

    /// Read `size` bytes into a fresh buffer
    fn read(&self, address: u64, size: usize) -> Result<Vec<u8>, MemoryError> {
        let mut buffer = vec![0u8; size];
        self.read_exact(address, &mut buffer)?;
        Ok(buffer)
    }

    /// Read bytes until a NUL terminator, reading at most `max_len` bytes.
    ///
    /// The terminator is not included. Hitting `max_len` is not an error.
    fn read_c_string(&self, address: u64, max_len: usize) -> Result<Vec<u8>, MemoryError> {
        const CHUNK: usize = 256;

        let mut out = Vec::new();
        let mut chunk = [0u8; CHUNK];
        while out.len() < max_len {
            let cursor = address + out.len() as u64;
            let want = CHUNK.min(max_len - out.len());
            let got = self.read_into(cursor, &mut chunk[..want])?;
            if got == 0 {
                return Err(MemoryError::Unmapped { address: cursor });
            }
            if let Some(nul) = chunk[..got].iter().position(|&b| b == 0) {
                out.extend_from_slice(&chunk[..nul]);
                return Ok(out);
            }
            out.extend_from_slice(&chunk[..got]);
        }
        Ok(out)
    }

    /// Read a little-endian unsigned integer of 1, 2, 4 or 8 bytes
    fn read_uint(&self, address: u64, size: usize) -> Result<u64, MemoryError> {
        let mut raw = [0u8; 8];
        let size = size.min(8);
        self.read_exact(address, &mut raw[..size])?;
        Ok(u64::from_le_bytes(raw))
    }

    fn read_u64(&self, address: u64) -> Result<u64, MemoryError> {
        self.read_uint(address, 8)
    }

    fn read_u32(&self, address: u64) -> Result<u32, MemoryError> {
        let mut raw = [0u8; 4];
        self.read_exact(address, &mut raw)?;
        Ok(u32::from_le_bytes(raw))
    }

    fn read_i32(&self, address: u64) -> Result<i32, MemoryError> {
        let mut raw = [0u8; 4];
        self.read_exact(address, &mut raw)?;
        Ok(i32::from_le_bytes(raw))
    }

    fn read_u8(&self, address: u64) -> Result<u8, MemoryError> {
        let mut raw = [0u8; 1];
        self.read_exact(address, &mut raw)?;
        Ok(raw[0])
    }
}

/// Memory of a live (stopped) process
pub struct ProcessMemory {
    /// Target process handle/PID
    #[cfg(target_os = "windows")]
    process_handle: Option<isize>,

    target_pid: Option<u32>,
}

impl ProcessMemory {
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "windows")]
            process_handle: None,
            target_pid: None,
        }
    }

    /// Open a process for memory reads
    #[cfg(target_os = "windows")]
    pub fn open_process(&mut self, pid: u32) -> Result<(), MemoryError> {
        use windows::Win32::System::Threading::{OpenProcess, PROCESS_VM_READ};

        let handle = unsafe {
            OpenProcess(PROCESS_VM_READ, false, pid).map_err(|e| MemoryError::ReadFailed {
                address: 0,
                reason: e.to_string(),
            })?
        };

        self.process_handle = Some(handle.0 as isize);
        self.target_pid = Some(pid);
        Ok(())
    }

    #[cfg(not(target_os = "windows"))]
    pub fn open_process(&mut self, pid: u32) -> Result<(), MemoryError> {
        self.target_pid = Some(pid);
        Ok(())
    }

    /// Get the opened process ID
    pub fn pid(&self) -> Option<u32> {
        self.target_pid
    }
}

impl TargetMemory for ProcessMemory {
    fn read_into(&self, address: u64, buffer: &mut [u8]) -> Result<usize, MemoryError> {
        #[cfg(target_os = "windows")]
        {
            self.read_windows(address, buffer)
        }

        #[cfg(not(target_os = "windows"))]
        {
            self.read_proc_mem(address, buffer)
        }
    }

    fn describe(&self) -> String {
        match self.target_pid {
            Some(pid) => format!("pid:{}", pid),
            None => "detached".to_string(),
        }
    }
}

// Windows-specific implementations
#[cfg(target_os = "windows")]
impl ProcessMemory {
    fn read_windows(&self, address: u64, buffer: &mut [u8]) -> Result<usize, MemoryError> {
        use windows::Win32::Foundation::HANDLE;
        use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;

        let handle_val = self.process_handle.ok_or(MemoryError::NoProcess)?;
        // SAFETY: HANDLE is repr(transparent) wrapper around isize
        let handle: HANDLE = unsafe { std::mem::transmute(handle_val) };
        let mut bytes_read = 0usize;

        unsafe {
            ReadProcessMemory(
                handle,
                address as *const std::ffi::c_void,
                buffer.as_mut_ptr() as *mut std::ffi::c_void,
                buffer.len(),
                Some(&mut bytes_read),
            )
            .map_err(|e| MemoryError::ReadFailed {
                address,
                reason: e.to_string(),
            })?;
        }

        Ok(bytes_read)
    }
}

// Linux-specific implementations
#[cfg(not(target_os = "windows"))]
impl ProcessMemory {
    fn read_proc_mem(&self, address: u64, buffer: &mut [u8]) -> Result<usize, MemoryError> {
        use std::fs::File;
        use std::io::{Read, Seek, SeekFrom};

        let pid = self.target_pid.ok_or(MemoryError::NoProcess)?;
        let mem_path = format!("/proc/{}/mem", pid);

        let mut file = File::open(&mem_path).map_err(|e| MemoryError::ReadFailed {
            address,
            reason: e.to_string(),
        })?;

        file.seek(SeekFrom::Start(address))
            .map_err(|e| MemoryError::ReadFailed {
                address,
                reason: e.to_string(),
            })?;

        let mut total = 0;
        while total < buffer.len() {
            match file.read(&mut buffer[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                // EIO on the first byte means the page is not mapped
                Err(_) if total == 0 => return Err(MemoryError::Unmapped { address }),
                Err(_) => break,
            }
        }

        Ok(total)
    }
}

impl Default for ProcessMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// A mapped region of a snapshot
#[derive(Debug, Clone)]
struct Region {
    base: u64,
    bytes: Vec<u8>,
}

impl Region {
    fn end(&self) -> u64 {
        self.base + self.bytes.len() as u64
    }
}

/// Memory built from raw byte regions (core excerpts, dumps, test images)
#[derive(Debug, Clone, Default)]
pub struct SnapshotMemory {
    /// Regions sorted by base address, non-overlapping
    regions: Vec<Region>,
}

impl SnapshotMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `bytes` at `base`, replacing any overlapping bytes already mapped
    pub fn map(&mut self, base: u64, bytes: impl Into<Vec<u8>>) -> &mut Self {
        let bytes = bytes.into();
        let end = base + bytes.len() as u64;

        let mut kept = Vec::with_capacity(self.regions.len() + 1);
        for region in self.regions.drain(..) {
            if region.end() <= base || region.base >= end {
                kept.push(region);
                continue;
            }
            // Keep whatever sticks out on either side of the new region
            if region.base < base {
                let head = (base - region.base) as usize;
                kept.push(Region {
                    base: region.base,
                    bytes: region.bytes[..head].to_vec(),
                });
            }
            if region.end() > end {
                let tail = (end - region.base) as usize;
                kept.push(Region {
                    base: end,
                    bytes: region.bytes[tail..].to_vec(),
                });
            }
        }
        kept.push(Region { base, bytes });
        kept.sort_by_key(|r| r.base);
        self.regions = kept;
        self
    }

    /// Map the contents of a raw dump file at `base`
    pub fn map_file<P: AsRef<Path>>(&mut self, path: P, base: u64) -> Result<&mut Self, MemoryError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| MemoryError::Snapshot {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        log::info!(
            "Mapped {} ({} bytes) @ {:#x}",
            path.display(),
            bytes.len(),
            base
        );
        Ok(self.map(base, bytes))
    }

    /// Number of mapped regions
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

impl TargetMemory for SnapshotMemory {
    fn read_into(&self, address: u64, buffer: &mut [u8]) -> Result<usize, MemoryError> {
        let idx = self.regions.partition_point(|r| r.end() <= address);
        let region = match self.regions.get(idx) {
            Some(r) if r.base <= address => r,
            _ => return Err(MemoryError::Unmapped { address }),
        };

        let mut total = 0;
        let mut current = region;
        let mut next_idx = idx;
        loop {
            let cursor = address + total as u64;
            let offset = (cursor - current.base) as usize;
            let n = (current.bytes.len() - offset).min(buffer.len() - total);
            buffer[total..total + n].copy_from_slice(&current.bytes[offset..offset + n]);
            total += n;

            // Continue into an adjacent region if the read runs past this one
            next_idx += 1;
            match self.regions.get(next_idx) {
                Some(next) if total < buffer.len() && next.base == current.end() => current = next,
                _ => break,
            }
        }
        Ok(total)
    }

    fn describe(&self) -> String {
        format!("snapshot:{}", self.regions.len())
    }
}
