//! # Synchronization Bridge
//!
//! The only channel between the interpreter context (which blocks inside
//! the engine) and the UI context (which must never block).
//!
//! ```text
//!   interpreter context                         UI context
//!   ───────────────────                         ──────────
//!   push_output(ch) ──► output channel ──► read_output()
//!   read_line()  ◄──── input handshake ◄──── submit_line()
//!   set_status()  ───► status snapshot ───► status_line()
//!                       run state / shutdown
//! ```
//!
//! Two backends implement [`Bridge`]: [`ThreadBridge`] on native threads
//! (mutex + condition variable) and [`RtosBridge`] on RTOS kernel objects
//! (queue + binary semaphore + mutex). The handshake logic itself lives in
//! [`handshake::InputSlot`] and is shared by both.

pub mod channel;
pub mod handshake;
pub mod rtos;
pub mod status;
pub mod threaded;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use log::info;

use crate::Backend;

pub use channel::{OverflowPolicy, PushOutcome};
pub use handshake::{Input, InputMode};
pub use rtos::RtosBridge;
pub use status::{StatusLine, StatusMode};
pub use threaded::ThreadBridge;

/// Output channel capacity on the desktop host.
pub const DESKTOP_OUTPUT_CAPACITY: usize = 8192;

/// Output queue depth on the microcontroller.
pub const EMBEDDED_OUTPUT_CAPACITY: usize = 2048;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The output channel cannot be created with this many slots.
    InvalidCapacity(usize),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::InvalidCapacity(n) => {
                write!(f, "invalid output channel capacity: {}", n)
            }
        }
    }
}

impl std::error::Error for BridgeError {}

// ============================================================================
// Run State
// ============================================================================

/// Lifecycle of the interpreter. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunState {
    NotStarted,
    Running,
    Exited,
}

impl RunState {
    fn to_u8(self) -> u8 {
        match self {
            RunState::NotStarted => 0,
            RunState::Running => 1,
            RunState::Exited => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => RunState::NotStarted,
            1 => RunState::Running,
            _ => RunState::Exited,
        }
    }
}

/// Lock-free run state cell shared by both backends.
#[derive(Debug, Default)]
pub(crate) struct RunStateCell(AtomicU8);

impl RunStateCell {
    pub(crate) fn get(&self) -> RunState {
        RunState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// NotStarted → Running. False if the session was already started.
    pub(crate) fn start(&self) -> bool {
        self.0
            .compare_exchange(
                RunState::NotStarted.to_u8(),
                RunState::Running.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub(crate) fn exit(&self) {
        self.0.fetch_max(RunState::Exited.to_u8(), Ordering::AcqRel);
    }
}

// ============================================================================
// Bridge Interface
// ============================================================================

/// Shared between exactly one interpreter context and one UI context.
///
/// Methods in the first group are called from the interpreter context and
/// may block; the second group is called from the UI context and never
/// blocks.
pub trait Bridge: Send + Sync {
    // --- interpreter context ---

    /// Appends one character to the output channel. Never blocks; applies
    /// the overflow policy when full.
    fn push_output(&self, ch: char);

    fn push_str(&self, text: &str) {
        for ch in text.chars() {
            self.push_output(ch);
        }
    }

    /// Blocks until the UI submits a line or the session shuts down. The
    /// line has no terminator and at most `max_len` characters.
    fn read_line(&self, max_len: usize) -> Input<String>;

    /// Blocks until the UI submits a character or the session shuts down.
    fn read_char(&self) -> Input<char>;

    /// Replaces the status snapshot atomically.
    fn set_status(&self, status: StatusLine);

    /// Drops pending output and invalidates the status snapshot.
    fn reset(&self);

    /// Running → Exited. Called when the engine's run returns.
    fn mark_exited(&self);

    // --- lifecycle ---

    /// NotStarted → Running. False if already started.
    fn mark_running(&self) -> bool;

    fn run_state(&self) -> RunState;

    /// Wakes any pending input wait with [`Input::Interrupted`] and makes
    /// every later wait return immediately. Idempotent.
    fn shutdown(&self);

    // --- UI context ---

    fn output_available(&self) -> usize;

    /// Moves up to `max` characters into `out` without blocking. Returns how
    /// many were moved.
    fn read_output(&self, out: &mut Vec<char>, max: usize) -> usize;

    fn input_mode(&self) -> InputMode;

    /// `None` until the first status write since start or reset.
    fn status_line(&self) -> Option<StatusLine>;

    /// Hands a line to a waiting `read_line`. False if no line is awaited.
    fn submit_line(&self, line: &str) -> bool;

    /// Hands a character to a waiting `read_char`. False if no character is
    /// awaited.
    fn submit_char(&self, ch: char) -> bool;

    fn waiting_for_line(&self) -> bool {
        self.input_mode() == InputMode::AwaitingLine
    }

    fn waiting_for_char(&self) -> bool {
        self.input_mode() == InputMode::AwaitingChar
    }

    fn has_exited(&self) -> bool {
        self.run_state() == RunState::Exited
    }
}

/// Output channel settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    pub output_capacity: usize,
    pub overflow: OverflowPolicy,
}

impl BridgeConfig {
    pub fn for_backend(backend: Backend) -> Self {
        let output_capacity = match backend {
            Backend::Threaded => DESKTOP_OUTPUT_CAPACITY,
            Backend::Rtos => EMBEDDED_OUTPUT_CAPACITY,
        };
        Self {
            output_capacity,
            overflow: OverflowPolicy::default(),
        }
    }
}

/// Builds the bridge for the selected backend.
pub fn create(backend: Backend, config: BridgeConfig) -> Result<Arc<dyn Bridge>, BridgeError> {
    info!(
        "Creating {:?} bridge: {} slot output channel, {:?} on overflow",
        backend, config.output_capacity, config.overflow
    );
    let bridge: Arc<dyn Bridge> = match backend {
        Backend::Threaded => Arc::new(ThreadBridge::new(config)?),
        Backend::Rtos => Arc::new(RtosBridge::new(config)?),
    };
    Ok(bridge)
}
