//! The command queue.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::command::Command;

/// Unbounded FIFO shared by many producers (HTTP workers) and one consumer
/// (the pump).
#[derive(Debug, Default)]
pub struct CommandQueue {
    inner: Mutex<VecDeque<Command>>,
}

impl CommandQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the deque half-modified,
    // so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Command>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a command.
    pub fn push(&self, command: Command) {
        self.lock().push_back(command);
    }

    /// Removes the oldest command without blocking.
    pub fn pop(&self) -> Option<Command> {
        self.lock().pop_front()
    }

    /// Removes and returns every queued command.
    pub fn drain(&self) -> Vec<Command> {
        self.lock().drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
