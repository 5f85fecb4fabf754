//! # RTOS Primitives
//!
//! The embedded bridge backend is written against the handful of kernel
//! objects a preemptive RTOS offers: a fixed-capacity message queue, a
//! binary semaphore and prioritised tasks. This module provides those
//! objects with RTOS semantics on top of `std`, so the backend's logic runs
//! (and is tested) on a host exactly as it is structured on the board.
//!
//! | Kernel object   | Semantics kept                                    |
//! |-----------------|---------------------------------------------------|
//! | `Queue<T>`      | capacity fixed at creation, non-blocking send/recv |
//! | `BinarySemaphore` | count saturates at 1, `take` blocks             |
//! | `Task`          | named, fixed priority, explicit stack size        |

use std::collections::VecDeque;
use std::io;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use log::debug;

/// Number of priority levels configured for the kernel.
pub const MAX_PRIORITIES: u8 = 5;

/// The interpreter task runs at the highest valid priority so blocking game
/// logic is never starved.
pub const INTERPRETER_TASK_PRIORITY: u8 = MAX_PRIORITIES - 1;

/// The UI task runs one level below the interpreter.
pub const UI_TASK_PRIORITY: u8 = MAX_PRIORITIES - 2;

/// Interpreter task stack.
pub const INTERPRETER_STACK_BYTES: usize = 256 * 1024;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Queue
// ============================================================================

/// Fixed-capacity FIFO of copyable messages.
pub struct Queue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> Queue<T> {
    /// Returns `None` for a zero-length queue, mirroring a failed kernel
    /// allocation.
    pub fn new(capacity: usize) -> Option<Self> {
        if capacity == 0 {
            return None;
        }
        Some(Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Non-blocking send. A full queue hands the item back.
    pub fn try_send(&self, item: T) -> Result<(), T> {
        let mut items = lock(&self.items);
        if items.len() >= self.capacity {
            return Err(item);
        }
        items.push_back(item);
        Ok(())
    }

    /// Sends, discarding the oldest message first when full. Returns the
    /// discarded message.
    pub fn send_overwriting_oldest(&self, item: T) -> Option<T> {
        let mut items = lock(&self.items);
        let evicted = if items.len() >= self.capacity {
            items.pop_front()
        } else {
            None
        };
        items.push_back(item);
        evicted
    }

    /// Non-blocking receive.
    pub fn try_receive(&self) -> Option<T> {
        lock(&self.items).pop_front()
    }

    pub fn messages_waiting(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn reset(&self) {
        lock(&self.items).clear();
    }
}

// ============================================================================
// Binary Semaphore
// ============================================================================

/// Created empty. `give` on an already-given semaphore is a no-op.
pub struct BinarySemaphore {
    given: Mutex<bool>,
    signal: Condvar,
}

impl Default for BinarySemaphore {
    fn default() -> Self {
        Self::new()
    }
}

impl BinarySemaphore {
    pub fn new() -> Self {
        Self {
            given: Mutex::new(false),
            signal: Condvar::new(),
        }
    }

    /// Returns false if the semaphore was already available.
    pub fn give(&self) -> bool {
        let mut given = lock(&self.given);
        if *given {
            return false;
        }
        *given = true;
        self.signal.notify_one();
        true
    }

    /// Blocks until the semaphore is available, then takes it.
    pub fn take(&self) {
        let mut given = self
            .signal
            .wait_while(lock(&self.given), |given| !*given)
            .unwrap_or_else(PoisonError::into_inner);
        *given = false;
    }

    /// Takes the semaphore if it becomes available within `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> bool {
        let (mut given, _) = self
            .signal
            .wait_timeout_while(lock(&self.given), timeout, |given| !*given)
            .unwrap_or_else(PoisonError::into_inner);
        if *given {
            *given = false;
            true
        } else {
            false
        }
    }
}

// ============================================================================
// Tasks
// ============================================================================

/// A running task.
pub struct Task {
    name: String,
    priority: u8,
    handle: thread::JoinHandle<()>,
}

impl Task {
    pub fn spawn<F>(name: &str, priority: u8, stack_bytes: usize, body: F) -> io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let priority = priority.min(MAX_PRIORITIES - 1);
        debug!(
            "Creating task '{}' (priority {}, stack {} bytes)",
            name, priority, stack_bytes
        );
        let handle = thread::Builder::new()
            .name(name.to_string())
            .stack_size(stack_bytes)
            .spawn(body)?;
        Ok(Self {
            name: name.to_string(),
            priority,
            handle,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the task body to return.
    pub fn join(self) {
        if self.handle.join().is_err() {
            log::warn!("Task '{}' panicked", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_zero_capacity_queue_is_refused() {
        assert!(Queue::<u32>::new(0).is_none());
    }

    #[test]
    fn test_queue_rejects_when_full() {
        let queue = Queue::new(2).unwrap();
        assert_eq!(queue.try_send(1), Ok(()));
        assert_eq!(queue.try_send(2), Ok(()));
        assert_eq!(queue.try_send(3), Err(3));
        assert_eq!(queue.messages_waiting(), 2);
        assert_eq!(queue.try_receive(), Some(1));
        assert_eq!(queue.try_receive(), Some(2));
        assert_eq!(queue.try_receive(), None);
    }

    #[test]
    fn test_queue_overwrite_evicts_oldest() {
        let queue = Queue::new(2).unwrap();
        assert_eq!(queue.send_overwriting_oldest('a'), None);
        assert_eq!(queue.send_overwriting_oldest('b'), None);
        assert_eq!(queue.send_overwriting_oldest('c'), Some('a'));
        assert_eq!(queue.try_receive(), Some('b'));
        assert_eq!(queue.try_receive(), Some('c'));
    }

    #[test]
    fn test_semaphore_saturates_at_one() {
        let sem = BinarySemaphore::new();
        assert!(sem.give());
        assert!(!sem.give());
        assert!(sem.take_timeout(Duration::from_millis(10)));
        assert!(!sem.take_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn test_take_blocks_until_given_from_another_task() {
        let sem = Arc::new(BinarySemaphore::new());
        let giver = sem.clone();
        let task = Task::spawn("giver", UI_TASK_PRIORITY, 64 * 1024, move || {
            thread::sleep(Duration::from_millis(30));
            giver.give();
        })
        .unwrap();

        let started = Instant::now();
        sem.take();
        assert!(started.elapsed() >= Duration::from_millis(20));
        task.join();
    }

    #[test]
    fn test_task_priority_is_clamped() {
        let task = Task::spawn("clamped", 200, 64 * 1024, || {}).unwrap();
        assert_eq!(task.priority(), MAX_PRIORITIES - 1);
        assert_eq!(task.name(), "clamped");
        task.join();
    }
}
