//! RTOS backend: an output queue, a binary semaphore for the input
//! handshake and one mutex over the remaining shared state.
//!
//! The semaphore only says "look again". The interpreter re-checks the
//! slot under the mutex after every take, so a stale give from an earlier
//! request never completes a later one.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::debug;

use super::channel::OverflowPolicy;
use super::handshake::{Input, InputMode, InputSlot};
use super::status::StatusLine;
use super::{Bridge, BridgeConfig, BridgeError, RunState, RunStateCell};
use crate::rtos::{BinarySemaphore, Queue};

/// Everything guarded by the state mutex.
#[derive(Debug, Default)]
struct Shared {
    slot: InputSlot,
    status: Option<StatusLine>,
}

pub struct RtosBridge {
    output: Queue<char>,
    overflow: OverflowPolicy,
    input_ready: BinarySemaphore,
    state: Mutex<Shared>,
    waiting: AtomicU8,
    run_state: RunStateCell,
}

impl RtosBridge {
    pub fn new(config: BridgeConfig) -> Result<Self, BridgeError> {
        let output = Queue::new(config.output_capacity)
            .ok_or(BridgeError::InvalidCapacity(config.output_capacity))?;
        Ok(Self {
            output,
            overflow: config.overflow,
            input_ready: BinarySemaphore::new(),
            state: Mutex::new(Shared::default()),
            waiting: AtomicU8::new(InputMode::Idle.to_u8()),
            run_state: RunStateCell::default(),
        })
    }

    fn state(&self) -> MutexGuard<'_, Shared> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_for(&self, mode: InputMode) -> MutexGuard<'_, Shared> {
        let mut state = self.state();
        state.slot.begin(mode);
        self.waiting.store(mode.to_u8(), Ordering::Release);
        debug!("Interpreter task waiting: {:?}", mode);
        while !state.slot.is_ready() {
            drop(state);
            self.input_ready.take();
            state = self.state();
        }
        state
    }

    fn set_idle(&self) {
        self.waiting
            .store(InputMode::Idle.to_u8(), Ordering::Release);
    }
}

impl Bridge for RtosBridge {
    fn push_output(&self, ch: char) {
        match self.overflow {
            OverflowPolicy::DropNewest => {
                if self.output.try_send(ch).is_err() {
                    debug!("Output queue full, dropped incoming character");
                }
            }
            OverflowPolicy::EvictOldest => {
                if self.output.send_overwriting_oldest(ch).is_some() {
                    debug!("Output queue full, evicted oldest character");
                }
            }
        }
    }

    fn read_line(&self, max_len: usize) -> Input<String> {
        let mut state = self.wait_for(InputMode::AwaitingLine);
        let line = state.slot.finish_line(max_len);
        self.set_idle();
        line
    }

    fn read_char(&self) -> Input<char> {
        let mut state = self.wait_for(InputMode::AwaitingChar);
        let ch = state.slot.finish_char();
        self.set_idle();
        ch
    }

    fn set_status(&self, status: StatusLine) {
        self.state().status = Some(status);
    }

    fn reset(&self) {
        self.output.reset();
        self.state().status = None;
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
        self.state().slot.shut_down();
        self.input_ready.give();
    }

    fn output_available(&self) -> usize {
        self.output.messages_waiting()
    }

    fn read_output(&self, out: &mut Vec<char>, max: usize) -> usize {
        let mut count = 0;
        while count < max {
            let Some(ch) = self.output.try_receive() else {
                break;
            };
            out.push(ch);
            count += 1;
        }
        count
    }

    fn input_mode(&self) -> InputMode {
        InputMode::from_u8(self.waiting.load(Ordering::Acquire))
    }

    fn status_line(&self) -> Option<StatusLine> {
        self.state().status.clone()
    }

    fn submit_line(&self, line: &str) -> bool {
        let accepted = self.state().slot.deposit_line(line);
        if accepted {
            self.input_ready.give();
        }
        accepted
    }

    fn submit_char(&self, ch: char) -> bool {
        let accepted = self.state().slot.deposit_char(ch);
        if accepted {
            self.input_ready.give();
        }
        accepted
    }
}
