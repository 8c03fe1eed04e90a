//! UI module - Command Line Interface
//!
//! Provides the reedline-based REPL and one-shot printing.

pub mod cli;
