//! Native-thread backend: mutexes, a condition variable and atomics.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use log::debug;

use super::channel::{OutputRing, PushOutcome};
use super::handshake::{Input, InputMode, InputSlot};
use super::status::StatusLine;
use super::{Bridge, BridgeConfig, BridgeError, RunState, RunStateCell};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ThreadBridge {
    output: Mutex<OutputRing>,
    input: Mutex<InputSlot>,
    input_ready: Condvar,
    /// Mirror of the slot's mode so the UI can poll without locking.
    waiting: AtomicU8,
    status: Mutex<Option<StatusLine>>,
    run_state: RunStateCell,
}

impl ThreadBridge {
    pub fn new(config: BridgeConfig) -> Result<Self, BridgeError> {
        if config.output_capacity == 0 {
            return Err(BridgeError::InvalidCapacity(0));
        }
        Ok(Self {
            output: Mutex::new(OutputRing::new(config.output_capacity, config.overflow)),
            input: Mutex::new(InputSlot::new()),
            input_ready: Condvar::new(),
            waiting: AtomicU8::new(InputMode::Idle.to_u8()),
            status: Mutex::new(None),
            run_state: RunStateCell::default(),
        })
    }

    /// Opens a request and waits for it to become ready. Returns with the
    /// slot still locked so the caller can finish it.
    fn wait_for(&self, mode: InputMode) -> MutexGuard<'_, InputSlot> {
        let mut slot = lock(&self.input);
        slot.begin(mode);
        self.waiting.store(mode.to_u8(), Ordering::Release);
        debug!("Interpreter waiting: {:?}", mode);
        self.input_ready
            .wait_while(slot, |slot| !slot.is_ready())
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_idle(&self) {
        self.waiting
            .store(InputMode::Idle.to_u8(), Ordering::Release);
    }
}

impl Bridge for ThreadBridge {
    fn push_output(&self, ch: char) {
        if let PushOutcome::EvictedOldest(_) | PushOutcome::DroppedNewest =
            lock(&self.output).push(ch)
        {
            debug!("Output channel full, lost one character");
        }
    }

    fn push_str(&self, text: &str) {
        let mut output = lock(&self.output);
        let lost = text
            .chars()
            .filter(|&ch| output.push(ch) != PushOutcome::Stored)
            .count();
        if lost > 0 {
            debug!("Output channel full, lost {} characters", lost);
        }
    }

    fn read_line(&self, max_len: usize) -> Input<String> {
        let mut slot = self.wait_for(InputMode::AwaitingLine);
        let line = slot.finish_line(max_len);
        self.set_idle();
        line
    }

    fn read_char(&self) -> Input<char> {
        let mut slot = self.wait_for(InputMode::AwaitingChar);
        let ch = slot.finish_char();
        self.set_idle();
        ch
    }

    fn set_status(&self, status: StatusLine) {
        *lock(&self.status) = Some(status);
    }

    fn reset(&self) {
        lock(&self.output).clear();
        *lock(&self.status) = None;
    }

    fn mark_exited(&self) {
        self.run_state.exit();
    }

    fn mark_running(&self) -> bool {
        self.run_state.start()
    }

    fn run_state(&self) -> RunState {
        self.run_state.get()
    }

    fn shutdown(&self) {
        let mut slot = lock(&self.input);
        if !slot.is_shut_down() {
            debug!("Bridge shutting down");
        }
        slot.shut_down();
        self.input_ready.notify_all();
    }

    fn output_available(&self) -> usize {
        lock(&self.output).len()
    }

    fn read_output(&self, out: &mut Vec<char>, max: usize) -> usize {
        lock(&self.output).drain_into(out, max)
    }

    fn input_mode(&self) -> InputMode {
        InputMode::from_u8(self.waiting.load(Ordering::Acquire))
    }

    fn status_line(&self) -> Option<StatusLine> {
        lock(&self.status).clone()
    }

    fn submit_line(&self, line: &str) -> bool {
        let accepted = lock(&self.input).deposit_line(line);
        if accepted {
            self.input_ready.notify_all();
        }
        accepted
    }

    fn submit_char(&self, ch: char) -> bool {
        let accepted = lock(&self.input).deposit_char(ch);
        if accepted {
            self.input_ready.notify_all();
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::OverflowPolicy;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn bridge() -> Arc<ThreadBridge> {
        Arc::new(
            ThreadBridge::new(BridgeConfig {
                output_capacity: 16,
                overflow: OverflowPolicy::EvictOldest,
            })
            .unwrap(),
        )
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("condition not reached");
    }

    #[test]
    fn test_read_line_blocks_until_submitted() {
        let bridge = bridge();
        let reader = bridge.clone();
        let handle = thread::spawn(move || reader.read_line(80));

        wait_until(|| bridge.waiting_for_line());
        assert!(!handle.is_finished());
        assert!(bridge.submit_line("north"));
        assert_eq!(handle.join().unwrap(), Input::Data("north".to_string()));
        assert_eq!(bridge.input_mode(), InputMode::Idle);
    }

    #[test]
    fn test_read_char_round_trip() {
        let bridge = bridge();
        let reader = bridge.clone();
        let handle = thread::spawn(move || reader.read_char());

        wait_until(|| bridge.waiting_for_char());
        assert!(!bridge.submit_line("not a char"));
        assert!(bridge.submit_char('y'));
        assert_eq!(handle.join().unwrap(), Input::Data('y'));
    }

    #[test]
    fn test_shutdown_releases_blocked_reader() {
        let bridge = bridge();
        let reader = bridge.clone();
        let handle = thread::spawn(move || reader.read_line(80));

        wait_until(|| bridge.waiting_for_line());
        bridge.shutdown();
        assert_eq!(handle.join().unwrap(), Input::Interrupted);
        assert_eq!(bridge.read_char(), Input::Interrupted);
    }

    #[test]
    fn test_reset_clears_output_and_status() {
        let bridge = bridge();
        bridge.push_str("hello");
        bridge.set_status(StatusLine::new("Attic", "Score: 0  Moves: 0"));
        assert_eq!(bridge.output_available(), 5);
        assert!(bridge.status_line().is_some());

        bridge.reset();
        assert_eq!(bridge.output_available(), 0);
        assert_eq!(bridge.status_line(), None);
    }
}
