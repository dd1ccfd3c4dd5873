//! A minimal reference harness implementing the boundary traits.
//!
//! This is not a CPU emulator — it's only enough of a stand-in for memory, an
//! I/O bus, and a program loader to drive [`crate::kernel::Kernel`] end to end
//! in tests and the bundled demo binary. Nothing here is part of the kernel
//! core; a real embedding supplies its own, usually backed by an actual
//! simulated CPU.

use std::collections::HashMap;

use crate::error::{KernelError, Result};
use crate::hal::{IoBus, LoadedProgram, Loader, Memory};

/// Flat, unbounded memory backed by a sparse map; unwritten cells read as 0.
#[derive(Default)]
pub struct FlatMemory(HashMap<i32, i32>);

impl FlatMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Memory for FlatMemory {
    fn read(&self, addr: i32) -> Result<i32> {
        if addr < 0 {
            return Err(KernelError::MemoryFault { addr });
        }
        Ok(*self.0.get(&addr).unwrap_or(&0))
    }

    fn write(&mut self, addr: i32, value: i32) -> Result<()> {
        if addr < 0 {
            return Err(KernelError::MemoryFault { addr });
        }
        self.0.insert(addr, value);
        Ok(())
    }
}

/// Every port the kernel touches, addressed the same way the real device bus
/// would: a sparse map from port number to last-written value, with the
/// clock's instruction counter driven externally by [`FakeBus::advance`].
#[derive(Default)]
pub struct FakeBus {
    ports: HashMap<i32, i32>,
    instructions: i64,
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the simulated instruction counter, as if `n` instructions of
    /// user code had run since the last kernel entry.
    pub fn advance(&mut self, n: i64) {
        self.instructions += n;
    }

    /// Convenience for tests: makes a terminal's keyboard report `byte`
    /// available.
    pub fn deliver_keystroke(&mut self, terminal: i32, byte: i32) {
        self.ports.insert(terminal + crate::hal::terminal_port::TECLADO, byte);
        self.ports.insert(terminal + crate::hal::terminal_port::TECLADO_OK, 1);
    }

    pub fn set_screen_ready(&mut self, terminal: i32, ready: bool) {
        self.ports.insert(terminal + crate::hal::terminal_port::TELA_OK, ready as i32);
    }
}

impl IoBus for FakeBus {
    fn read_port(&self, port: i32) -> Result<i32> {
        if port == crate::hal::clock_port::INSTRUCOES {
            return Ok(self.instructions as i32);
        }
        Ok(*self.ports.get(&port).unwrap_or(&0))
    }

    fn write_port(&mut self, port: i32, value: i32) -> Result<()> {
        self.ports.insert(port, value);
        Ok(())
    }
}

/// Treats a "file" as an in-memory named byte blob: the first 4 bytes are a
/// little-endian load address, the remainder is the image. Enough to drive
/// every scenario without inventing a real machine-code format.
#[derive(Default)]
pub struct ImageLoader {
    images: HashMap<String, Vec<u8>>,
}

impl ImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, load_address: i32, body: &[i32]) {
        let mut blob = Vec::with_capacity(4 + body.len());
        blob.extend_from_slice(&load_address.to_le_bytes());
        for &word in body {
            blob.push(word as u8);
        }
        self.images.insert(name.to_string(), blob);
    }
}

impl Loader for ImageLoader {
    fn load(&self, name: &str) -> Result<LoadedProgram> {
        let blob = self.images.get(name).ok_or_else(|| KernelError::LoadFailed { name: name.to_string() })?;
        if blob.len() < 4 {
            return Err(KernelError::LoadFailed { name: name.to_string() });
        }
        let load_address = i32::from_le_bytes([blob[0], blob[1], blob[2], blob[3]]);
        let bytes = blob[4..].iter().map(|&b| b as i32).collect();
        Ok(LoadedProgram { load_address, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_memory_round_trips_values() {
        let mut mem = FlatMemory::new();
        mem.write(42, 7).unwrap();
        assert_eq!(mem.read(42).unwrap(), 7);
        assert_eq!(mem.read(43).unwrap(), 0);
    }

    #[test]
    fn negative_address_is_a_fault() {
        let mem = FlatMemory::new();
        assert!(mem.read(-1).is_err());
    }

    #[test]
    fn image_loader_decodes_registered_blob() {
        let mut loader = ImageLoader::new();
        loader.register("init.maq", 100, &[10, 20, 30]);
        let program = loader.load("init.maq").unwrap();
        assert_eq!(program.load_address, 100);
        assert_eq!(program.bytes, vec![10, 20, 30]);
    }

    #[test]
    fn image_loader_rejects_unknown_name() {
        let loader = ImageLoader::new();
        assert!(loader.load("missing.maq").is_err());
    }

    #[test]
    fn bus_reports_delivered_keystroke() {
        let mut bus = FakeBus::new();
        bus.deliver_keystroke(4, 65);
        assert_eq!(bus.read_port(4 + crate::hal::terminal_port::TECLADO_OK).unwrap(), 1);
        assert_eq!(bus.read_port(4 + crate::hal::terminal_port::TECLADO).unwrap(), 65);
    }

    #[test]
    fn bus_tracks_instruction_counter() {
        let mut bus = FakeBus::new();
        bus.advance(50);
        assert_eq!(bus.read_port(crate::hal::clock_port::INSTRUCOES).unwrap(), 50);
    }
}
