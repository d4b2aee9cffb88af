use std::{
    cmp::{
        Ordering,
        Reverse,
    },
    collections::BinaryHeap,
    time::Instant,
};

/// Deadline-ordered task queue. Tasks due at the same instant pop in the
/// order they were scheduled.
#[derive(Debug)]
pub struct Timeline<T> {
    queue: BinaryHeap<Reverse<Scheduled<T>>>,
    seq: u64,
}

#[derive(Debug)]
struct Scheduled<T> {
    at: Instant,
    seq: u64,
    task: T,
}

impl<T> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl<T> Eq for Scheduled<T> {}

impl<T> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Scheduled<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at.cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self {
            queue: BinaryHeap::new(),
            seq: 0,
        }
    }
}

impl<T> Timeline<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: Instant, task: T) {
        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);
        self.queue.push(Reverse(Scheduled { at, seq, task }));
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.peek().map(|Reverse(s)| s.at)
    }

    /// Pops the earliest task if it is due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<(Instant, T)> {
        if self.next_deadline()? > now {
            return None;
        }
        self.queue.pop().map(|Reverse(s)| (s.at, s.task))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drops every queued task matching `pred`.
    pub fn retain(&mut self, mut pred: impl FnMut(&T) -> bool) {
        self.queue.retain(|Reverse(s)| pred(&s.task));
    }
}
