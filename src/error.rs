//! Kernel error type.
//!
//! Three error kinds are distinguished per the error handling design:
//! bus/device errors, per-process faults, and loader failures. Syscall
//! argument errors (bad pid, bad filename, self-wait) are *not* represented
//! here — they never escape the kernel, surfacing instead as `A = -1` in the
//! caller's descriptor.

use thiserror::Error;

/// Everything that can go wrong crossing one of the boundary traits
/// (`Memory`, `IoBus`, `Loader`) or inside the phase driver itself.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum KernelError {
    /// A memory read or write at `addr` failed at the bus level.
    #[error("memory access to {addr:#06x} failed")]
    MemoryFault { addr: i32 },

    /// A device port read or write failed.
    #[error("device access to port {port} failed")]
    DeviceFault { port: i32 },

    /// The CPU reported a fault attributed to the running process.
    #[error("CPU error {code} in process {pid}")]
    CpuFault { pid: u32, code: i32 },

    /// The program loader could not load `name`.
    #[error("failed to load program '{name}'")]
    LoadFailed { name: String },

    /// No scheduler is configured for the requested selector.
    #[error("scheduler {0} is not implemented")]
    UnknownScheduler(i32),

    /// The scheduler could not make forward progress: no READY process and
    /// no BLOCKED process either, so idling would mean the machine is stuck.
    #[error("no ready or blocked process: the machine cannot make progress")]
    NoForwardProgress,

    /// An interrupt kind the dispatcher does not recognize.
    #[error("unhandled IRQ kind {0}")]
    UnknownIrq(i32),
}

pub type Result<T> = std::result::Result<T, KernelError>;
