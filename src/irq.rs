//! Interrupt kinds and syscall identifiers.
//!
//! Mirrors the fixed ABI the simulated CPU and the in-memory handler stub
//! agree on: an interrupt kind travels in a register, and for `Syscall` a
//! second id (also register-borne) selects which of the five syscalls ran.

/// The four IRQ kinds the kernel knows how to handle, plus a catch-all for
/// anything else the CPU might raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqKind {
    /// Raised exactly once, when the simulated CPU powers on.
    Reset,
    /// The timer device's countdown reached zero.
    Timer,
    /// The CPU detected a fault executing the current process's code.
    CpuError,
    /// User code executed the trap instruction requesting a syscall.
    Syscall,
    /// Anything the simulator defines that this kernel does not.
    Unknown(i32),
}

impl IrqKind {
    /// Stable index used for the per-IRQ-kind metrics counters and for the
    /// `n_interrupcoes` array shape in the persisted metrics file.
    pub const COUNT: usize = 4;

    pub fn index(self) -> usize {
        match self {
            IrqKind::Reset => 0,
            IrqKind::Timer => 1,
            IrqKind::CpuError => 2,
            IrqKind::Syscall => 3,
            IrqKind::Unknown(_) => 4,
        }
    }
}

impl From<i32> for IrqKind {
    fn from(value: i32) -> Self {
        match value {
            0 => IrqKind::Reset,
            1 => IrqKind::Syscall,
            2 => IrqKind::CpuError,
            3 => IrqKind::Timer,
            other => IrqKind::Unknown(other),
        }
    }
}

/// The five syscalls the kernel implements, identified by the value the
/// caller places in the save-area `A` register before trapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallId {
    Read,
    Write,
    Spawn,
    Kill,
    Wait,
}

impl TryFrom<i32> for SyscallId {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, i32> {
        match value {
            1 => Ok(SyscallId::Read),
            2 => Ok(SyscallId::Write),
            3 => Ok(SyscallId::Spawn),
            4 => Ok(SyscallId::Kill),
            5 => Ok(SyscallId::Wait),
            other => Err(other),
        }
    }
}
