//! The kernel entry point and phase driver (§4.1).
//!
//! One owned value, no globals: every operation takes `&mut self`. The single
//! entry point a caller ever needs is [`Kernel::handle_interrupt`], which runs
//! the five phases in order: save, handle, sweep, schedule, dispatch.

use crate::config::Config;
use crate::error::{KernelError, Result};
use crate::hal::{mode, read_c_string, save_area, terminal_port, IoBus, Loader, Memory};
use crate::irq::{IrqKind, SyscallId};
use crate::loader::load_program;
use crate::metrics::GlobalMetrics;
use crate::process::{BlockReason, ProcessId, ProcessState, ProcessTable};
use crate::ready_queue::ReadyQueue;
use crate::scheduler::{self, Scheduler, Selection};

/// What the stub should do after the kernel returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchAction {
    Resume,
    Halt,
}

pub struct Kernel {
    config: Config,
    table: ProcessTable,
    ready: ReadyQueue,
    current: Option<ProcessId>,
    remaining_quantum: u32,
    last_clock: i64,
    global: GlobalMetrics,
    scheduler: Box<dyn Scheduler>,
    internal_error: bool,
    finalized: bool,
}

impl Kernel {
    pub fn new(config: Config) -> Self {
        Self {
            scheduler: scheduler::for_kind(config.scheduler, config.quantum),
            config,
            table: ProcessTable::new(),
            ready: ReadyQueue::new(),
            current: None,
            remaining_quantum: 0,
            last_clock: 0,
            global: GlobalMetrics::new(),
            internal_error: false,
            finalized: false,
        }
    }

    pub fn table(&self) -> &ProcessTable {
        &self.table
    }

    pub fn metrics(&self) -> &GlobalMetrics {
        &self.global
    }

    pub fn current(&self) -> Option<ProcessId> {
        self.current
    }

    /// True if `id` is sitting in the ready queue right now: READY and not
    /// the currently-dispatched process, which the scheduler holds outside
    /// the queue while it runs (P1, P2).
    pub fn is_ready_queued(&self, id: ProcessId) -> bool {
        self.ready.contains(id)
    }

    /// Number of descriptors currently in the ready queue (P1).
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// The sole entry point: save -> handle -> sweep -> schedule -> dispatch.
    pub fn handle_interrupt(
        &mut self,
        irq: IrqKind,
        mem: &mut dyn Memory,
        io: &mut dyn IoBus,
        loader: &dyn Loader,
    ) -> Result<DispatchAction> {
        self.global.record_irq(irq);
        self.save(mem)?;
        self.sample_clock(io)?;

        match self.handle_irq(irq, mem, io, loader) {
            Ok(()) => {}
            Err(err) => {
                log::error!("bus/device error handling {:?}: {}", irq, err);
                self.internal_error = true;
            }
        }

        self.sweep_pending(io)?;

        if self.table.all_dead() {
            self.finalize(io)?;
            return Ok(DispatchAction::Halt);
        }

        if self.internal_error {
            return Ok(DispatchAction::Halt);
        }

        self.schedule()?;
        self.dispatch(mem)?;
        Ok(DispatchAction::Resume)
    }

    fn save(&mut self, mem: &dyn Memory) -> Result<()> {
        if let Some(id) = self.current {
            if let Some(p) = self.table.get_mut(id) {
                p.regs.pc = mem.read(save_area::PC)?;
                p.regs.a = mem.read(save_area::A)?;
                p.regs.x = mem.read(save_area::X)?;
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, mem: &mut dyn Memory) -> Result<()> {
        if let Some(id) = self.current {
            if let Some(p) = self.table.get(id) {
                mem.write(save_area::PC, p.regs.pc)?;
                mem.write(save_area::A, p.regs.a)?;
                mem.write(save_area::X, p.regs.x)?;
            }
        }
        Ok(())
    }

    fn sample_clock(&mut self, io: &dyn IoBus) -> Result<()> {
        let now = io.read_port(crate::hal::clock_port::INSTRUCOES)? as i64;
        let delta = (now - self.last_clock).max(0);
        self.last_clock = now;
        let idle = self.current.is_none();
        self.global.accumulate(delta, idle);
        for p in self.table.iter_mut() {
            if p.state != ProcessState::Dead {
                p.accumulate_time(delta);
            }
        }
        Ok(())
    }

    fn handle_irq(
        &mut self,
        irq: IrqKind,
        mem: &mut dyn Memory,
        io: &mut dyn IoBus,
        loader: &dyn Loader,
    ) -> Result<()> {
        match irq {
            IrqKind::Reset => self.handle_reset(mem, loader),
            IrqKind::Timer => self.handle_timer(io),
            IrqKind::CpuError => self.handle_cpu_error(mem),
            IrqKind::Syscall => self.handle_syscall(mem, io, loader),
            IrqKind::Unknown(code) => {
                log::warn!("unhandled IRQ kind {}", code);
                self.internal_error = true;
                Ok(())
            }
        }
    }

    fn handle_reset(&mut self, mem: &mut dyn Memory, loader: &dyn Loader) -> Result<()> {
        let load_address = load_program(loader, mem, "init.maq")?;
        if load_address != 100 {
            log::error!("init.maq must load at 100, loaded at {}", load_address);
            self.internal_error = true;
            return Ok(());
        }
        let id = self.table.spawn(load_address);
        self.ready.push_back(id);
        mem.write(save_area::MODO, mode::USER)?;
        log::debug!("reset: spawned init as pid {}", id.0);
        Ok(())
    }

    fn handle_timer(&mut self, io: &mut dyn IoBus) -> Result<()> {
        io.write_port(crate::hal::clock_port::INTERRUPCAO, 0)?;
        io.write_port(crate::hal::clock_port::TIMER, self.config.timer_interval)?;
        if self.remaining_quantum > 0 {
            self.remaining_quantum -= 1;
        }
        Ok(())
    }

    fn handle_cpu_error(&mut self, mem: &dyn Memory) -> Result<()> {
        let code = mem.read(save_area::ERRO)?;
        if let Some(id) = self.current {
            log::error!("CPU error {} in process {}: killing it", code, id.0);
            self.kill_process(id);
        }
        Ok(())
    }

    fn handle_syscall(&mut self, mem: &mut dyn Memory, io: &mut dyn IoBus, loader: &dyn Loader) -> Result<()> {
        let Some(id) = self.current else {
            return Ok(());
        };
        let a = mem.read(save_area::A)?;
        let x = mem.read(save_area::X)?;
        let result = match SyscallId::try_from(a) {
            Ok(SyscallId::Read) => self.syscall_read(id, io)?,
            Ok(SyscallId::Write) => self.syscall_write(id, x, io)?,
            Ok(SyscallId::Spawn) => self.syscall_spawn(id, x, mem, loader)?,
            Ok(SyscallId::Kill) => self.syscall_kill(id, x),
            Ok(SyscallId::Wait) => self.syscall_wait(id, x),
            Err(unknown) => {
                log::warn!("unknown syscall id {} from pid {}", unknown, id.0);
                -1
            }
        };
        if let Some(p) = self.table.get_mut(id) {
            if p.state == ProcessState::Ready {
                p.regs.a = result;
            }
        }
        Ok(())
    }

    fn syscall_read(&mut self, id: ProcessId, io: &mut dyn IoBus) -> Result<i32> {
        let terminal = self.table.get(id).map(|p| p.terminal).unwrap_or(0);
        let ok = io.read_port(terminal + terminal_port::TECLADO_OK)?;
        if ok != 0 {
            let data = io.read_port(terminal + terminal_port::TECLADO)?;
            return Ok(data);
        }
        self.block(id, BlockReason::Reading);
        Ok(0)
    }

    fn syscall_write(&mut self, id: ProcessId, value: i32, io: &mut dyn IoBus) -> Result<i32> {
        let terminal = self.table.get(id).map(|p| p.terminal).unwrap_or(0);
        let ok = io.read_port(terminal + terminal_port::TELA_OK)?;
        if ok != 0 {
            io.write_port(terminal + terminal_port::TELA, value)?;
            return Ok(0);
        }
        self.block(id, BlockReason::Writing);
        Ok(0)
    }

    fn syscall_spawn(&mut self, caller: ProcessId, name_addr: i32, mem: &mut dyn Memory, loader: &dyn Loader) -> Result<i32> {
        let Some(name) = read_c_string(mem, name_addr, 100)? else {
            return Ok(-1);
        };
        match load_program(loader, mem, &name) {
            Ok(load_address) => {
                let id = self.table.spawn(load_address);
                self.ready.push_back(id);
                log::debug!("pid {} spawned '{}' as pid {}", caller.0, name, id.0);
                Ok(id.0 as i32)
            }
            Err(err) => {
                log::warn!("spawn('{}') by pid {} failed: {}", name, caller.0, err);
                Ok(-1)
            }
        }
    }

    fn syscall_kill(&mut self, caller: ProcessId, target: i32) -> i32 {
        let target_id = if target == 0 { caller } else { ProcessId(target as u32) };
        if self.table.get(target_id).is_none() {
            return -1;
        }
        self.kill_process(target_id);
        0
    }

    fn syscall_wait(&mut self, caller: ProcessId, target: i32) -> i32 {
        let target_id = ProcessId(target as u32);
        if target_id == caller {
            return -1;
        }
        let Some(target_state) = self.table.get(target_id).map(|p| p.state) else {
            return -1;
        };
        if target_state == ProcessState::Dead {
            // Design Note (iii): caller stays READY, no extra entry counted.
            if let Some(p) = self.table.get_mut(caller) {
                p.transition_to(ProcessState::Ready, BlockReason::None);
            }
            return 0;
        }
        self.block(caller, BlockReason::WaitingForDeath);
        0
    }

    fn kill_process(&mut self, id: ProcessId) {
        self.ready.remove(id);
        if let Some(p) = self.table.get_mut(id) {
            p.transition_to(ProcessState::Dead, BlockReason::None);
        }
        if self.current == Some(id) {
            self.current = None;
        }
    }

    /// Blocks `id` on `reason`, removing it from the ready queue and
    /// recomputing its priority from quantum usage (so.c calls
    /// `calcula_prioridade` at every blocking site, independent of which
    /// scheduler is active) before the transition clears its quantum state.
    fn block(&mut self, id: ProcessId, reason: BlockReason) {
        self.ready.remove(id);
        let remaining_quantum = self.remaining_quantum;
        let quantum = self.config.quantum;
        if let Some(p) = self.table.get_mut(id) {
            p.recompute_priority(remaining_quantum, quantum);
            p.transition_to(ProcessState::Blocked, reason);
        }
        if self.current == Some(id) {
            self.current = None;
        }
    }

    /// Re-examines every BLOCKED descriptor for an unblock condition (§4.5).
    fn sweep_pending(&mut self, io: &mut dyn IoBus) -> Result<()> {
        let ids: Vec<ProcessId> = self
            .table
            .iter()
            .filter(|p| p.state == ProcessState::Blocked)
            .map(|p| p.id)
            .collect();

        for id in ids {
            let (reason, terminal) = match self.table.get(id) {
                Some(p) => (p.reason, p.terminal),
                None => continue,
            };
            match reason {
                BlockReason::Reading => {
                    if io.read_port(terminal + terminal_port::TECLADO_OK)? != 0 {
                        let data = io.read_port(terminal + terminal_port::TECLADO)?;
                        if let Some(p) = self.table.get_mut(id) {
                            p.regs.a = data;
                            p.transition_to(ProcessState::Ready, BlockReason::None);
                        }
                        self.ready.push_back(id);
                    }
                }
                BlockReason::Writing => {
                    if io.read_port(terminal + terminal_port::TELA_OK)? != 0 {
                        let pending = self.table.get(id).map(|p| p.regs.x).unwrap_or(0);
                        io.write_port(terminal + terminal_port::TELA, pending)?;
                        if let Some(p) = self.table.get_mut(id) {
                            p.regs.a = 0;
                            p.transition_to(ProcessState::Ready, BlockReason::None);
                        }
                        self.ready.push_back(id);
                    }
                }
                BlockReason::WaitingForDeath => {
                    let target = self.table.get(id).map(|p| ProcessId(p.regs.x as u32));
                    let target_dead = target
                        .and_then(|t| self.table.get(t))
                        .map(|p| p.state == ProcessState::Dead)
                        .unwrap_or(false);
                    if target_dead {
                        if let Some(p) = self.table.get_mut(id) {
                            p.regs.a = 0;
                            p.transition_to(ProcessState::Ready, BlockReason::None);
                        }
                        self.ready.push_back(id);
                    }
                }
                BlockReason::None => {}
            }
        }
        Ok(())
    }

    fn schedule(&mut self) -> Result<()> {
        let (selection, quantum) =
            self.scheduler.select(&mut self.table, &mut self.ready, self.current, self.remaining_quantum);
        match selection {
            Selection::Run(id) => {
                self.current = Some(id);
                self.remaining_quantum = quantum;
            }
            Selection::Idle => {
                if !self.table.any_blocked() {
                    return Err(KernelError::NoForwardProgress);
                }
                self.current = None;
                self.remaining_quantum = 0;
            }
        }
        Ok(())
    }

    pub fn all_dead(&self) -> bool {
        self.table.all_dead()
    }

    fn finalize(&mut self, io: &mut dyn IoBus) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        io.write_port(crate::hal::clock_port::TIMER, 0)?;
        log::info!(
            "halting: {} processes, {} total ticks, {} idle ticks",
            self.table.len(),
            self.global.total_ticks,
            self.global.idle_ticks
        );
        self.finalized = true;
        Ok(())
    }

    pub fn write_metrics_file(&self, dir: &std::path::Path) -> std::io::Result<()> {
        crate::metrics::write_to_file(dir, self.config.scheduler as i32, &self.global, &self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerKind;
    use crate::hal::LoadedProgram;
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

    struct FakeIo(HashMap<i32, i32>);
    impl IoBus for FakeIo {
        fn read_port(&self, port: i32) -> Result<i32> {
            Ok(*self.0.get(&port).unwrap_or(&0))
        }
        fn write_port(&mut self, port: i32, value: i32) -> Result<()> {
            self.0.insert(port, value);
            Ok(())
        }
    }

    struct FakeLoader;
    impl Loader for FakeLoader {
        fn load(&self, name: &str) -> Result<LoadedProgram> {
            if name == "init.maq" {
                Ok(LoadedProgram { load_address: 100, bytes: vec![0; 4] })
            } else {
                Ok(LoadedProgram { load_address: 200, bytes: vec![0; 4] })
            }
        }
    }

    fn fresh() -> (Kernel, FakeMem, FakeIo, FakeLoader) {
        let kernel = Kernel::new(Config { scheduler: SchedulerKind::RoundRobin, ..Config::default() });
        (kernel, FakeMem(HashMap::new()), FakeIo(HashMap::new()), FakeLoader)
    }

    #[test]
    fn reset_spawns_init_as_pid_one() {
        let (mut k, mut mem, mut io, loader) = fresh();
        let action = k.handle_interrupt(IrqKind::Reset, &mut mem, &mut io, &loader).unwrap();
        assert_eq!(action, DispatchAction::Resume);
        let p = k.table().get(ProcessId(1)).unwrap();
        assert_eq!(p.regs.pc, 100);
        assert_eq!(p.terminal, 4);
        assert_eq!(mem.read(save_area::MODO).unwrap(), mode::USER);
    }

    #[test]
    fn read_with_no_data_blocks_caller_and_idles() {
        let (mut k, mut mem, mut io, loader) = fresh();
        k.handle_interrupt(IrqKind::Reset, &mut mem, &mut io, &loader).unwrap();
        mem.write(save_area::A, 1).unwrap(); // SO_LE
        io.write_port(terminal_port::TECLADO_OK, 0).unwrap();
        let action = k.handle_interrupt(IrqKind::Syscall, &mut mem, &mut io, &loader).unwrap();
        assert_eq!(action, DispatchAction::Resume);
        let p = k.table().get(ProcessId(1)).unwrap();
        assert_eq!(p.state, ProcessState::Blocked);
        assert_eq!(p.reason, BlockReason::Reading);
    }

    #[test]
    fn kill_self_then_halts() {
        let (mut k, mut mem, mut io, loader) = fresh();
        k.handle_interrupt(IrqKind::Reset, &mut mem, &mut io, &loader).unwrap();
        mem.write(save_area::A, 4).unwrap(); // SO_MATA_PROC
        mem.write(save_area::X, 0).unwrap();
        let action = k.handle_interrupt(IrqKind::Syscall, &mut mem, &mut io, &loader).unwrap();
        assert_eq!(action, DispatchAction::Halt);
        assert!(k.all_dead());
    }

    #[test]
    fn cpu_error_kills_only_faulting_process_not_the_machine() {
        let (mut k, mut mem, mut io, loader) = fresh();
        k.handle_interrupt(IrqKind::Reset, &mut mem, &mut io, &loader).unwrap();
        mem.write(save_area::ERRO, 7).unwrap();
        let action = k.handle_interrupt(IrqKind::CpuError, &mut mem, &mut io, &loader).unwrap();
        // The sole process dies, so the machine halts too, but via the
        // all-dead path, not an internal-error latch.
        assert_eq!(action, DispatchAction::Halt);
        assert_eq!(k.table().get(ProcessId(1)).unwrap().state, ProcessState::Dead);
    }

    #[test]
    fn wait_on_already_dead_target_stays_ready_with_zero() {
        let (mut k, mut mem, mut io, loader) = fresh();
        k.handle_interrupt(IrqKind::Reset, &mut mem, &mut io, &loader).unwrap();
        // spawn a second process then kill it
        mem.write(save_area::A, 3).unwrap();
        mem.write(save_area::X, 1000).unwrap();
        // name lookup isn't exercised by FakeMem's zeroed bytes; FakeLoader
        // ignores the name for non-init loads, so spawn still succeeds.
        k.handle_interrupt(IrqKind::Syscall, &mut mem, &mut io, &loader).unwrap();
        mem.write(save_area::A, 4).unwrap();
        mem.write(save_area::X, 2).unwrap();
        k.handle_interrupt(IrqKind::Syscall, &mut mem, &mut io, &loader).unwrap();
        let before = k.table().get(ProcessId(1)).unwrap().metrics.state_entries[0];
        mem.write(save_area::A, 5).unwrap();
        mem.write(save_area::X, 2).unwrap();
        k.handle_interrupt(IrqKind::Syscall, &mut mem, &mut io, &loader).unwrap();
        let after = k.table().get(ProcessId(1)).unwrap().metrics.state_entries[0];
        assert_eq!(before, after);
        assert_eq!(k.table().get(ProcessId(1)).unwrap().regs.a, 0);
    }
}
