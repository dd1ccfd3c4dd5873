//! Supervisor kernel for a didactic operating-system simulator.
//!
//! This crate implements the code that runs atop a simulated CPU: process
//! lifecycle, interrupt handling, the five syscalls, I/O blocking, and three
//! pluggable CPU schedulers. It is invoked exclusively through
//! [`kernel::Kernel::handle_interrupt`], called once per interrupt by
//! whatever in-memory handler stub lives on the simulated machine.
//!
//! # Architecture
//!
//! - `error`: the single error type crossing every boundary trait
//! - `irq`, `config`: interrupt/syscall identifiers and kernel-wide tunables
//! - `hal`: the boundary traits (`Memory`, `IoBus`, `Loader`) supplied by
//!   whatever embeds this kernel — the simulated CPU, bus, and loader are out
//!   of scope here
//! - `process`, `ready_queue`: the process table and its ready-to-run subset
//! - `scheduler`: the three selectable scheduling strategies
//! - `loader`: the in-scope half of program loading (copies bytes via `hal`)
//! - `metrics`: per-process and global counters, and the persisted report
//! - `kernel`: the entry point and five-phase driver tying everything together
//! - `sim`: a minimal reference implementation of the boundary traits, used
//!   by tests and the FFI shim below; not part of the kernel core
//! - `ffi`: the C ABI surface (`kernel_create`/`kernel_destroy`/`trata_interrupcao`)
//!
//! # Entry flow
//!
//! Each call to `handle_interrupt` runs five phases in order: save the
//! outgoing process's registers, handle the specific IRQ, sweep blocked
//! processes for unblock conditions, pick the next process to run, and
//! dispatch its registers back to the save area.

pub mod config;
pub mod error;
pub mod ffi;
pub mod hal;
pub mod irq;
pub mod kernel;
pub mod loader;
pub mod metrics;
pub mod process;
pub mod ready_queue;
pub mod scheduler;
pub mod sim;

pub use config::{Config, SchedulerKind};
pub use error::{KernelError, Result};
pub use irq::{IrqKind, SyscallId};
pub use kernel::{DispatchAction, Kernel};
