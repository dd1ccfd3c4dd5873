//! The ready queue: an ordered sequence of READY process handles.
//!
//! The process table owns every [`crate::process::Process`]; this queue only
//! ever holds lightweight [`ProcessId`] handles, which is how the kernel
//! avoids an ownership cycle between "the table" and "who's runnable".

use std::collections::VecDeque;

use crate::process::ProcessId;

#[derive(Debug, Default)]
pub struct ReadyQueue(VecDeque<ProcessId>);

impl ReadyQueue {
    pub fn new() -> Self {
        Self(VecDeque::new())
    }

    pub fn push_back(&mut self, id: ProcessId) {
        self.0.push_back(id);
    }

    pub fn pop_front(&mut self) -> Option<ProcessId> {
        self.0.pop_front()
    }

    pub fn front(&self) -> Option<ProcessId> {
        self.0.front().copied()
    }

    /// Removes `id` wherever it sits in the queue. At most one entry is ever
    /// present for a given id, since blocking always pairs with removal.
    pub fn remove(&mut self, id: ProcessId) {
        self.0.retain(|&x| x != id);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: ProcessId) -> bool {
        self.0.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.0.iter().copied()
    }

    /// Stable sort by a priority key, ties broken by existing (id) order —
    /// used by the priority-with-aging scheduler.
    pub fn sort_by_key<F: FnMut(ProcessId) -> f64>(&mut self, mut key: F) {
        let mut entries: Vec<ProcessId> = self.0.drain(..).collect();
        entries.sort_by(|&a, &b| key(a).partial_cmp(&key(b)).unwrap_or(std::cmp::Ordering::Equal));
        self.0 = entries.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_pop_preserve_fifo_order() {
        let mut q = ReadyQueue::new();
        q.push_back(ProcessId(1));
        q.push_back(ProcessId(2));
        assert_eq!(q.pop_front(), Some(ProcessId(1)));
        assert_eq!(q.pop_front(), Some(ProcessId(2)));
        assert_eq!(q.pop_front(), None);
    }

    #[test]
    fn remove_drops_only_matching_id() {
        let mut q = ReadyQueue::new();
        q.push_back(ProcessId(1));
        q.push_back(ProcessId(2));
        q.push_back(ProcessId(3));
        q.remove(ProcessId(2));
        assert_eq!(q.iter().collect::<Vec<_>>(), vec![ProcessId(1), ProcessId(3)]);
    }

    #[test]
    fn sort_by_key_is_stable_on_ties() {
        let mut q = ReadyQueue::new();
        q.push_back(ProcessId(3));
        q.push_back(ProcessId(1));
        q.push_back(ProcessId(2));
        // All equal priority: original (insertion) order must survive.
        q.sort_by_key(|_| 0.5);
        assert_eq!(q.iter().collect::<Vec<_>>(), vec![ProcessId(3), ProcessId(1), ProcessId(2)]);
    }

    #[test]
    fn sort_by_key_orders_ascending() {
        let mut q = ReadyQueue::new();
        q.push_back(ProcessId(1));
        q.push_back(ProcessId(2));
        q.push_back(ProcessId(3));
        let prio = |id: ProcessId| match id.0 {
            1 => 0.9,
            2 => 0.1,
            _ => 0.5,
        };
        q.sort_by_key(prio);
        assert_eq!(q.iter().collect::<Vec<_>>(), vec![ProcessId(2), ProcessId(3), ProcessId(1)]);
    }
}
