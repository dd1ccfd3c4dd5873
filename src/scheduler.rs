//! The three pluggable CPU schedulers (§4.6).
//!
//! Selected once at [`crate::kernel::Kernel::new`] time from
//! [`crate::config::SchedulerKind`] and stored behind a trait object, mirroring
//! the teacher's pattern of a small interface with a handful of concrete
//! implementations chosen at construction rather than matched on every call.

use crate::config::SchedulerKind;
use crate::process::{ProcessId, ProcessState, ProcessTable};
use crate::ready_queue::ReadyQueue;

/// What the kernel should do with the CPU after a scheduling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Run this process; quantum (when applicable) has already been charged.
    Run(ProcessId),
    /// No READY process exists, but at least one is BLOCKED: let the CPU idle.
    Idle,
}

/// Common contract for all three strategies (§4.6).
///
/// `current` is the process that was running before this IRQ, if it is still
/// READY; `quantum` is its remaining quantum, meaningful only for RR and
/// priority. Implementations return the new selection and, when they keep or
/// replace `current`, the quantum the newly-selected process should run with.
pub trait Scheduler {
    fn select(
        &mut self,
        table: &mut ProcessTable,
        ready: &mut ReadyQueue,
        current: Option<ProcessId>,
        remaining_quantum: u32,
    ) -> (Selection, u32);
}

/// Builds the scheduler selected by `kind`, threading the configured quantum
/// into RR/priority (both need it; `Simple` ignores it).
pub fn for_kind(kind: SchedulerKind, quantum: u32) -> Box<dyn Scheduler> {
    match kind {
        SchedulerKind::Simple => Box::new(SimpleScheduler),
        SchedulerKind::RoundRobin => Box::new(RoundRobinScheduler { quantum }),
        SchedulerKind::Priority => Box::new(PriorityScheduler { quantum }),
    }
}

fn is_ready(table: &ProcessTable, id: ProcessId) -> bool {
    table.get(id).map(|p| p.state == ProcessState::Ready).unwrap_or(false)
}

/// The ready queue is empty here by construction (callers only reach this
/// after draining it). Whether idling is actually legal — i.e. whether a
/// BLOCKED process exists to eventually wake the CPU — is the kernel's call,
/// not the scheduler's; it checks `ProcessTable::any_blocked` itself and
/// turns a stuck idle into `KernelError::NoForwardProgress`.
fn idle_or_stuck(_ready: &ReadyQueue, _table: &ProcessTable) -> Selection {
    Selection::Idle
}

/// FCFS-like: keep the current process if it is still READY, else take the
/// lowest-indexed READY process in the table.
pub struct SimpleScheduler;

impl Scheduler for SimpleScheduler {
    fn select(
        &mut self,
        table: &mut ProcessTable,
        ready: &mut ReadyQueue,
        current: Option<ProcessId>,
        _remaining_quantum: u32,
    ) -> (Selection, u32) {
        if let Some(id) = current {
            if is_ready(table, id) {
                return (Selection::Run(id), 0);
            }
        }
        match table.iter().find(|p| p.state == ProcessState::Ready) {
            Some(p) => {
                ready.remove(p.id);
                (Selection::Run(p.id), 0)
            }
            None => (idle_or_stuck(ready, table), 0),
        }
    }
}

/// Round-robin with the configured quantum, preempting to the tail of the queue.
pub struct RoundRobinScheduler {
    quantum: u32,
}

impl Scheduler for RoundRobinScheduler {
    fn select(
        &mut self,
        table: &mut ProcessTable,
        ready: &mut ReadyQueue,
        current: Option<ProcessId>,
        remaining_quantum: u32,
    ) -> (Selection, u32) {
        if let Some(id) = current {
            if is_ready(table, id) {
                if remaining_quantum > 0 {
                    return (Selection::Run(id), remaining_quantum);
                }
                if let Some(p) = table.get_mut(id) {
                    p.metrics.preemptions += 1;
                }
                ready.remove(id);
                ready.push_back(id);
            }
        }
        match ready.pop_front() {
            Some(id) => (Selection::Run(id), self.quantum),
            None => (idle_or_stuck(ready, table), 0),
        }
    }
}

/// Priority with aging: the outgoing process's priority is updated from how
/// much of its quantum it actually used, then the ready queue is resorted.
pub struct PriorityScheduler {
    quantum: u32,
}

impl Scheduler for PriorityScheduler {
    fn select(
        &mut self,
        table: &mut ProcessTable,
        ready: &mut ReadyQueue,
        current: Option<ProcessId>,
        remaining_quantum: u32,
    ) -> (Selection, u32) {
        if let Some(id) = current {
            if is_ready(table, id) {
                if remaining_quantum > 0 {
                    return (Selection::Run(id), remaining_quantum);
                }
                if let Some(p) = table.get_mut(id) {
                    p.metrics.preemptions += 1;
                    p.recompute_priority(remaining_quantum, self.quantum);
                }
                ready.remove(id);
                ready.push_back(id);
            }
        }
        ready.sort_by_key(|id| table.get(id).map(|p| p.priority).unwrap_or(f64::MAX));
        match ready.pop_front() {
            Some(id) => (Selection::Run(id), self.quantum),
            None => (idle_or_stuck(ready, table), 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::BlockReason;

    fn setup(n: u32) -> (ProcessTable, ReadyQueue) {
        let mut table = ProcessTable::new();
        let mut ready = ReadyQueue::new();
        for i in 0..n {
            let id = table.spawn(100 + i as i32);
            ready.push_back(id);
        }
        (table, ready)
    }

    #[test]
    fn simple_keeps_current_while_ready() {
        let (mut table, mut ready) = setup(2);
        let mut sched = SimpleScheduler;
        let (sel, _) = sched.select(&mut table, &mut ready, Some(ProcessId(1)), 0);
        assert_eq!(sel, Selection::Run(ProcessId(1)));
    }

    #[test]
    fn simple_picks_lowest_id_when_current_gone() {
        let (mut table, mut ready) = setup(2);
        let mut sched = SimpleScheduler;
        let (sel, _) = sched.select(&mut table, &mut ready, None, 0);
        assert_eq!(sel, Selection::Run(ProcessId(1)));
    }

    #[test]
    fn round_robin_keeps_current_with_quantum_left() {
        let (mut table, mut ready) = setup(2);
        ready.remove(ProcessId(1));
        let mut sched = RoundRobinScheduler { quantum: 5 };
        let (sel, q) = sched.select(&mut table, &mut ready, Some(ProcessId(1)), 3);
        assert_eq!(sel, Selection::Run(ProcessId(1)));
        assert_eq!(q, 3);
    }

    #[test]
    fn round_robin_preempts_at_zero_quantum() {
        let (mut table, mut ready) = setup(2);
        ready.remove(ProcessId(1));
        let mut sched = RoundRobinScheduler { quantum: 5 };
        let (sel, q) = sched.select(&mut table, &mut ready, Some(ProcessId(1)), 0);
        assert_eq!(sel, Selection::Run(ProcessId(2)));
        assert_eq!(q, 5);
        assert_eq!(table.get(ProcessId(1)).unwrap().metrics.preemptions, 1);
        assert_eq!(ready.iter().collect::<Vec<_>>(), vec![ProcessId(1)]);
    }

    #[test]
    fn round_robin_honors_a_non_default_quantum() {
        let (mut table, mut ready) = setup(2);
        ready.remove(ProcessId(1));
        let mut sched = RoundRobinScheduler { quantum: 8 };
        let (_, q) = sched.select(&mut table, &mut ready, Some(ProcessId(1)), 0);
        assert_eq!(q, 8);
    }

    #[test]
    fn round_robin_goes_idle_with_blocked_process() {
        let mut table = ProcessTable::new();
        let id = table.spawn(100);
        table.get_mut(id).unwrap().transition_to(ProcessState::Blocked, BlockReason::Reading);
        let mut ready = ReadyQueue::new();
        let mut sched = RoundRobinScheduler { quantum: 5 };
        let (sel, _) = sched.select(&mut table, &mut ready, None, 0);
        assert_eq!(sel, Selection::Idle);
    }

    #[test]
    fn priority_reorders_after_preemption() {
        let (mut table, mut ready) = setup(2);
        ready.remove(ProcessId(1));
        table.get_mut(ProcessId(2)).unwrap().priority = 0.9;
        let mut sched = PriorityScheduler { quantum: 5 };
        // pid 1 used its whole quantum: priority worsens toward 1.0, so pid 2
        // (already worse) might still come out ahead depending on magnitude.
        let (sel, q) = sched.select(&mut table, &mut ready, Some(ProcessId(1)), 0);
        assert_eq!(q, 5);
        // pid 1's new priority is (0.5 + 5/5)/2 = 0.75, still better than 0.9.
        assert_eq!(sel, Selection::Run(ProcessId(1)));
    }

    #[test]
    fn priority_never_reaches_extremes_from_averaging() {
        let mut p = 0.5_f64;
        for _ in 0..50 {
            p = (p + 1.0) / 2.0;
        }
        assert!(p < 1.0);
    }
}
