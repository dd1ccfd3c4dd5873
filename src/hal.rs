//! Boundary traits for the host harness.
//!
//! The simulated CPU, its memory, the I/O bus, and the program loader are
//! explicitly out of scope for this crate — they're provided by whatever
//! embeds the kernel. This module names the interfaces the kernel needs from
//! them and nothing more. A reference implementation lives in [`crate::sim`]
//! for tests and the bundled demo binary; it is not part of the kernel core.

use crate::error::Result;

/// Fixed save-area addresses the CPU reads/writes on interrupt entry/return.
pub mod save_area {
    pub const PC: i32 = 0;
    pub const A: i32 = 1;
    pub const X: i32 = 2;
    pub const ERRO: i32 = 3;
    pub const MODO: i32 = 4;
}

/// Values written to [`save_area::MODO`].
pub mod mode {
    pub const SUPERVISOR: i32 = 0;
    pub const USER: i32 = 1;
}

/// Port offsets within one terminal's four-port block.
pub mod terminal_port {
    pub const TECLADO: i32 = 0;
    pub const TECLADO_OK: i32 = 1;
    pub const TELA: i32 = 2;
    pub const TELA_OK: i32 = 3;
}

/// Clock device ports (not terminal-relative).
pub mod clock_port {
    pub const TIMER: i32 = 1000;
    pub const INTERRUPCAO: i32 = 1001;
    pub const INSTRUCOES: i32 = 1002;
}

/// The byte-addressable memory the kernel reads/writes the save area and
/// spawn-argument strings through.
pub trait Memory {
    fn read(&self, addr: i32) -> Result<i32>;
    fn write(&mut self, addr: i32, value: i32) -> Result<()>;
}

/// The device/port bus: terminal keyboard/screen ports and the clock.
pub trait IoBus {
    fn read_port(&self, port: i32) -> Result<i32>;
    fn write_port(&mut self, port: i32, value: i32) -> Result<()>;
}

/// A program image ready to be copied into memory.
#[derive(Debug, Clone)]
pub struct LoadedProgram {
    pub load_address: i32,
    pub bytes: Vec<i32>,
}

/// The external program loader: turns a filename into bytes plus a load
/// address. Parsing the executable format itself is entirely out of scope;
/// the kernel only calls through this trait (see [`crate::loader`]).
pub trait Loader {
    fn load(&self, name: &str) -> Result<LoadedProgram>;
}

/// Terminal index owned by process `pid`, per the static partition in §5.
pub fn terminal_for_pid(pid: u32) -> i32 {
    4 * (pid as i32 % 4)
}

/// Reads a NUL-terminated string out of `mem` starting at `addr`, bounded at
/// `max_len` bytes (the spawn syscall's filename argument convention).
pub fn read_c_string(mem: &dyn Memory, addr: i32, max_len: usize) -> Result<Option<String>> {
    let mut bytes = Vec::with_capacity(max_len.min(64));
    for offset in 0..max_len {
        let value = mem.read(addr + offset as i32)?;
        if !(0..=255).contains(&value) {
            return Ok(None);
        }
        if value == 0 {
            return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()));
        }
        bytes.push(value as u8);
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeMem(HashMap<i32, i32>);

    impl Memory for FakeMem {
        fn read(&self, addr: i32) -> Result<i32> {
            Ok(*self.0.get(&addr).unwrap_or(&0))
        }
        fn write(&mut self, addr: i32, value: i32) -> Result<()> {
            self.0.insert(addr, value);
            Ok(())
        }
    }

    #[test]
    fn terminal_assignment_matches_formula() {
        assert_eq!(terminal_for_pid(1), 4);
        assert_eq!(terminal_for_pid(2), 8);
        assert_eq!(terminal_for_pid(4), 0);
        assert_eq!(terminal_for_pid(8), 0);
    }

    #[test]
    fn reads_nul_terminated_string() {
        let mut map = HashMap::new();
        for (i, b) in b"p.maq\0".iter().enumerate() {
            map.insert(100 + i as i32, *b as i32);
        }
        let mem = FakeMem(map);
        let s = read_c_string(&mem, 100, 100).unwrap();
        assert_eq!(s.as_deref(), Some("p.maq"));
    }

    #[test]
    fn string_without_terminator_within_bound_fails() {
        let mut map = HashMap::new();
        for i in 0..5 {
            map.insert(i, b'x' as i32);
        }
        let mem = FakeMem(map);
        assert_eq!(read_c_string(&mem, 0, 5).unwrap(), None);
    }
}
