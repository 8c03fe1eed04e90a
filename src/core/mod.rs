//! Core module - Target memory access
//!
//! This module contains the platform-specific process readers and the
//! snapshot reader used for offline inspection.

pub mod memory;
