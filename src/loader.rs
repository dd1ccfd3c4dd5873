//! The in-scope half of program loading (§4.9).
//!
//! Parsing an executable format is out of scope — that's the boundary
//! [`crate::hal::Loader`] trait's job. This module is the thin wrapper that
//! calls it and copies the resulting bytes into memory, one cell at a time,
//! surfacing the first write failure.

use crate::error::Result;
use crate::hal::{Loader, Memory};

/// Loads `name` via `loader` and writes its image into `mem`, returning the
/// load address (the new process's initial program counter).
pub fn load_program(loader: &dyn Loader, mem: &mut dyn Memory, name: &str) -> Result<i32> {
    let program = loader.load(name)?;
    for (offset, &byte) in program.bytes.iter().enumerate() {
        mem.write(program.load_address + offset as i32, byte)?;
    }
    log::debug!(
        "loaded '{}' at {:#06x} ({} words)",
        name,
        program.load_address,
        program.bytes.len()
    );
    Ok(program.load_address)
}
