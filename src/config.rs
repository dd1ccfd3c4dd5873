//! Kernel-wide configuration.
//!
//! Two tunables and a scheduler selector, bundled so `Kernel::new` takes one
//! value instead of three magic numbers.

/// Selects which [`crate::scheduler::Scheduler`] implementation the kernel
/// instantiates. Numeric values match the external ABI (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerKind {
    Simple = 0,
    RoundRobin = 1,
    Priority = 2,
}

impl TryFrom<i32> for SchedulerKind {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, i32> {
        match value {
            0 => Ok(SchedulerKind::Simple),
            1 => Ok(SchedulerKind::RoundRobin),
            2 => Ok(SchedulerKind::Priority),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Instructions between timer ticks.
    pub timer_interval: i32,
    /// Timer ticks per round-robin/priority quantum.
    pub quantum: u32,
    pub scheduler: SchedulerKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timer_interval: 50,
            quantum: 5,
            scheduler: SchedulerKind::RoundRobin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reference_values() {
        let cfg = Config::default();
        assert_eq!(cfg.timer_interval, 50);
        assert_eq!(cfg.quantum, 5);
    }

    #[test]
    fn scheduler_kind_rejects_out_of_range() {
        assert_eq!(SchedulerKind::try_from(3), Err(3));
    }

    #[test]
    fn non_default_quantum_reaches_the_round_robin_scheduler() {
        use crate::process::{ProcessId, ProcessTable};
        use crate::ready_queue::ReadyQueue;
        use crate::scheduler::{self, Selection};

        let mut table = ProcessTable::new();
        let a = table.spawn(100);
        let b = table.spawn(200);
        let mut ready = ReadyQueue::new();
        ready.push_back(b);

        let mut sched = scheduler::for_kind(SchedulerKind::RoundRobin, 9);
        let (sel, q) = sched.select(&mut table, &mut ready, Some(a), 0);
        assert_eq!(sel, Selection::Run(ProcessId(2)));
        assert_eq!(q, 9);
    }
}
