//! # UI Façade
//!
//! The UI context's view of a session. [`Facade::poll`] is called on a
//! fixed period: it drains the output channel into a bounded UTF-8
//! scrollback and refreshes the waiting/exited mirrors and the status line.
//! Each of output, status and command buffer carries a version counter, so
//! a display only redraws what changed.
//!
//! Nothing here blocks.

pub mod command;
pub mod scrollback;

use std::sync::Arc;

use log::debug;

use crate::bridge::{Bridge, StatusLine};
use crate::core::profile::DisplayProfile;

pub use command::CommandBuffer;
pub use scrollback::Scrollback;

/// Characters drained from the output channel per read.
const READ_CHUNK: usize = 256;

pub struct Facade {
    bridge: Arc<dyn Bridge>,
    profile: DisplayProfile,
    scrollback: Scrollback,
    command: CommandBuffer,
    status: Option<StatusLine>,
    output_version: u64,
    status_version: u64,
    command_version: u64,
    waiting_for_line: bool,
    waiting_for_char: bool,
    exited: bool,
    chunk: Vec<char>,
}

impl Facade {
    pub fn new(bridge: Arc<dyn Bridge>, profile: DisplayProfile) -> Self {
        Self {
            bridge,
            scrollback: Scrollback::new(profile.scrollback_cap, profile.min_scrollback_lines),
            profile,
            command: CommandBuffer::new(),
            status: None,
            output_version: 0,
            status_version: 0,
            command_version: 0,
            waiting_for_line: false,
            waiting_for_char: false,
            exited: false,
            chunk: Vec::with_capacity(READ_CHUNK),
        }
    }

    /// Drains pending output and refreshes mirrored state. Returns true if
    /// anything visible changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;

        while self.bridge.output_available() > 0 {
            self.chunk.clear();
            if self.bridge.read_output(&mut self.chunk, READ_CHUNK) == 0 {
                break;
            }
            let text: String = self.chunk.iter().collect();
            if self.scrollback.append(&text) {
                self.output_version += 1;
                changed = true;
            }
        }

        let waiting_for_line = self.bridge.waiting_for_line();
        let waiting_for_char = self.bridge.waiting_for_char();
        if (waiting_for_line, waiting_for_char) != (self.waiting_for_line, self.waiting_for_char) {
            self.waiting_for_line = waiting_for_line;
            self.waiting_for_char = waiting_for_char;
            changed = true;
        }

        // A reset invalidates the status until the story writes it again
        let status = self.bridge.status_line();
        if status != self.status {
            self.status = status;
            self.status_version += 1;
            changed = true;
        }

        if self.bridge.has_exited() && !self.exited {
            debug!("Interpreter exit observed");
            self.exited = true;
            changed = true;
        }

        changed
    }

    /// Echoes `line` into the scrollback and hands it to the interpreter.
    /// Rejected (and not echoed) when no line is awaited.
    pub fn submit_line(&mut self, line: &str) -> bool {
        if !self.bridge.submit_line(line) {
            debug!("Line submitted while interpreter not waiting, ignored");
            return false;
        }
        self.scrollback.mark_current_output();
        self.scrollback.append(&self.profile.echo.echo(line));
        self.output_version += 1;
        self.waiting_for_line = false;
        true
    }

    /// Hands a keypress to a waiting character read. Not echoed.
    pub fn submit_char(&mut self, ch: char) -> bool {
        let accepted = self.bridge.submit_char(ch);
        if accepted {
            self.waiting_for_char = false;
        }
        accepted
    }

    pub fn clear_output(&mut self) {
        self.scrollback.clear();
        self.output_version += 1;
    }

    // --- command buffer ---

    pub fn append_to_command(&mut self, text: &str) {
        if self.command.append(text) {
            self.command_version += 1;
        }
    }

    pub fn backspace_command(&mut self) {
        if self.command.backspace() {
            self.command_version += 1;
        }
    }

    /// Submits the command buffer as a line. The buffer is kept if the
    /// interpreter was not waiting.
    pub fn submit_command(&mut self) -> bool {
        let line = self.command.as_str().to_string();
        if !self.submit_line(&line) {
            return false;
        }
        self.command.clear();
        self.command_version += 1;
        true
    }

    pub fn clear_command(&mut self) {
        if !self.command.is_empty() {
            self.command.clear();
            self.command_version += 1;
        }
    }

    // --- accessors ---

    pub fn output(&self) -> &str {
        self.scrollback.as_str()
    }

    pub fn output_version(&self) -> u64 {
        self.output_version
    }

    pub fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }

    pub fn status_version(&self) -> u64 {
        self.status_version
    }

    pub fn command(&self) -> &str {
        self.command.as_str()
    }

    pub fn command_version(&self) -> u64 {
        self.command_version
    }

    pub fn waiting_for_line(&self) -> bool {
        self.waiting_for_line
    }

    pub fn waiting_for_char(&self) -> bool {
        self.waiting_for_char
    }

    pub fn has_exited(&self) -> bool {
        self.exited
    }

    pub fn profile(&self) -> &DisplayProfile {
        &self.profile
    }

    pub fn bridge(&self) -> &Arc<dyn Bridge> {
        &self.bridge
    }
}
