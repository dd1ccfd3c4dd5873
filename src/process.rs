//! Process descriptors and their lifecycle.

use crate::hal::terminal_for_pid;

/// Stable process identifier, dense from 1, never reused (I5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub u32);

impl ProcessId {
    /// Index into the dense process table backing this id.
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Blocked,
    Dead,
}

/// Meaningful only while `state == Blocked` (I4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    None,
    Reading,
    Writing,
    WaitingForDeath,
}

/// The saved register snapshot copied to/from the save area on save/dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub pc: i32,
    pub a: i32,
    pub x: i32,
}

/// Per-process counters, updated on every kernel entry and on every state
/// transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessMetrics {
    /// Wall time accumulated since birth while not DEAD.
    pub turnaround: i64,
    pub preemptions: u32,
    /// Indexed by `ProcessState` via `state_index`.
    pub state_entries: [u32; 3],
    pub state_time: [i64; 3],
}

fn state_index(state: ProcessState) -> usize {
    match state {
        ProcessState::Ready => 0,
        ProcessState::Blocked => 1,
        ProcessState::Dead => 2,
    }
}

impl ProcessMetrics {
    fn new() -> Self {
        let mut m = Self::default();
        // A process is born READY; that first entry is counted at creation,
        // mirroring the reference implementation's initial n_estados[PRONTO] = 1.
        m.state_entries[state_index(ProcessState::Ready)] = 1;
        m
    }

    /// Adds `delta` simulated time to the accumulator for `state`, and to
    /// turnaround time unless the process is DEAD (I6).
    fn accumulate(&mut self, state: ProcessState, delta: i64) {
        if state != ProcessState::Dead {
            self.turnaround += delta;
        }
        self.state_time[state_index(state)] += delta;
    }

    fn record_entry(&mut self, state: ProcessState) {
        self.state_entries[state_index(state)] += 1;
    }

    /// Mean response time: accumulated READY time over READY entries.
    pub fn response_time(&self) -> f64 {
        let entries = self.state_entries[state_index(ProcessState::Ready)];
        if entries == 0 {
            0.0
        } else {
            self.state_time[state_index(ProcessState::Ready)] as f64 / entries as f64
        }
    }
}

/// A single process descriptor.
pub struct Process {
    pub id: ProcessId,
    pub regs: Registers,
    pub state: ProcessState,
    pub reason: BlockReason,
    pub terminal: i32,
    pub priority: f64,
    pub metrics: ProcessMetrics,
}

impl Process {
    pub fn new(id: ProcessId, pc: i32) -> Self {
        Self {
            id,
            regs: Registers { pc, a: 0, x: 0 },
            state: ProcessState::Ready,
            reason: BlockReason::None,
            terminal: terminal_for_pid(id.0),
            priority: 0.5,
            metrics: ProcessMetrics::new(),
        }
    }

    /// Transitions to `state`/`reason`, recording a state-entry count.
    ///
    /// A no-op if `state` already equals the current state: this guards
    /// against the reference implementation's bug of double-counting a
    /// READY→READY transition when `wait` targets an already-dead process
    /// (Design Note iii).
    pub fn transition_to(&mut self, state: ProcessState, reason: BlockReason) {
        if self.state == state {
            self.reason = reason;
            return;
        }
        self.state = state;
        self.reason = reason;
        self.metrics.record_entry(state);
    }

    /// Applies the elapsed-time delta to this process's metrics for its
    /// current state (§4.8).
    pub fn accumulate_time(&mut self, delta: i64) {
        self.metrics.accumulate(self.state, delta);
    }

    /// Recomputes priority from how much of `quantum` was consumed, mirroring
    /// so.c's `calcula_prioridade`: a process that used more of its quantum is
    /// penalized toward a higher (worse) numeric priority. Called both when a
    /// process is preempted by the priority scheduler and whenever it blocks
    /// on READ, WRITE, or WAIT, regardless of which scheduler is active.
    pub fn recompute_priority(&mut self, remaining_quantum: u32, quantum: u32) {
        if quantum == 0 {
            return;
        }
        let used = quantum as f64 - remaining_quantum as f64;
        self.priority = (self.priority + used / quantum as f64) / 2.0;
    }
}

/// The dense, append-only table of every process ever created.
///
/// Indexed by `id - 1`; a DEAD entry is never removed, only marked (I3), so
/// ids stay dense and lookups by id stay O(1).
#[derive(Default)]
pub struct ProcessTable {
    processes: Vec<Process>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self { processes: Vec::new() }
    }

    /// Creates and stores a new READY process at `pc`, returning its id.
    pub fn spawn(&mut self, pc: i32) -> ProcessId {
        let id = ProcessId(self.processes.len() as u32 + 1);
        self.processes.push(Process::new(id, pc));
        id
    }

    pub fn get(&self, id: ProcessId) -> Option<&Process> {
        self.processes.get(id.index())
    }

    pub fn get_mut(&mut self, id: ProcessId) -> Option<&mut Process> {
        self.processes.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.processes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Process> {
        self.processes.iter_mut()
    }

    /// True once every process in the table has reached DEAD (P8 trigger).
    pub fn all_dead(&self) -> bool {
        !self.processes.is_empty() && self.processes.iter().all(|p| p.state == ProcessState::Dead)
    }

    pub fn any_blocked(&self) -> bool {
        self.processes.iter().any(|p| p.state == ProcessState::Blocked)
    }
}
