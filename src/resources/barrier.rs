//! Fan-out/fan-in counter gating each load phase.
//!
//! A phase dispatches `expected` loads and calls [`Barrier::settle`] once
//! per settlement, success or failure alike. The call that brings
//! `completed` up to `expected` is the only one that returns `true`; every
//! later call is ignored. An empty phase is closed with [`Barrier::try_close`]
//! right after it opens.

use log::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Barrier {
    expected: usize,
    completed: usize,
    closed: bool,
}

impl Barrier {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            completed: 0,
            closed: false,
        }
    }

    /// Record one settlement. Returns `true` exactly once, on the settlement
    /// that satisfies the barrier.
    pub fn settle(&mut self) -> bool {
        if self.closed {
            warn!(
                "Settlement after barrier closed ({}/{}), ignoring",
                self.completed, self.expected
            );
            return false;
        }
        self.completed += 1;
        self.try_close()
    }

    /// Close the barrier if it is satisfied and still open.
    pub fn try_close(&mut self) -> bool {
        if !self.closed && self.completed >= self.expected {
            self.closed = true;
            return true;
        }
        false
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
