//! # Input Handshake
//!
//! The turn-taking protocol by which the UI hands a line or a character to
//! the blocked interpreter. This is the substrate-independent state machine;
//! each bridge backend wraps an [`InputSlot`] in its own lock and wakeup
//! primitive.
//!
//! ```text
//!            begin(AwaitingLine)            deposit_line()
//!   Idle ─────────────────────────► AwaitingLine ──────────► (ready)
//!    ▲                                                          │
//!    └──────────────────── finish_line() ◄──────────────────────┘
//! ```
//!
//! `shut_down()` makes every current and future wait ready; finishing then
//! yields [`Input::Interrupted`].

/// Size of the input slot in bytes, terminator included.
pub const INPUT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Idle,
    AwaitingLine,
    AwaitingChar,
}

impl InputMode {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            InputMode::Idle => 0,
            InputMode::AwaitingLine => 1,
            InputMode::AwaitingChar => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => InputMode::AwaitingLine,
            2 => InputMode::AwaitingChar,
            _ => InputMode::Idle,
        }
    }
}

/// Outcome of a blocking input wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input<T> {
    /// The UI supplied a value. An empty line is still data.
    Data(T),
    /// The session is ending; no value will come.
    Interrupted,
}

impl<T> Input<T> {
    pub fn data(self) -> Option<T> {
        match self {
            Input::Data(value) => Some(value),
            Input::Interrupted => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Input::Interrupted)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Input<U> {
        match self {
            Input::Data(value) => Input::Data(f(value)),
            Input::Interrupted => Input::Interrupted,
        }
    }
}

/// Longest prefix of `text` that fits in `max_bytes` without splitting a
/// character.
pub(crate) fn truncate_to_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Single-item handoff cell. The interpreter side calls `begin`/`finish_*`,
/// the UI side calls `deposit_*`.
#[derive(Debug, Default)]
pub struct InputSlot {
    mode: InputMode,
    ready: bool,
    line: String,
    ch: Option<char>,
    shut_down: bool,
}

impl InputSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Opens a request. Any value left from an earlier request is discarded.
    pub fn begin(&mut self, mode: InputMode) {
        debug_assert!(mode != InputMode::Idle, "begin() needs a waiting mode");
        self.mode = mode;
        self.ready = false;
        self.line.clear();
        self.ch = None;
    }

    /// Accepted only while a line is awaited and none has been supplied yet.
    pub fn deposit_line(&mut self, line: &str) -> bool {
        if self.shut_down || self.ready || self.mode != InputMode::AwaitingLine {
            return false;
        }
        self.line.push_str(truncate_to_bytes(line, INPUT_CAPACITY - 1));
        self.ready = true;
        true
    }

    /// Accepted only while a character is awaited and none has been supplied yet.
    pub fn deposit_char(&mut self, ch: char) -> bool {
        if self.shut_down || self.ready || self.mode != InputMode::AwaitingChar {
            return false;
        }
        self.ch = Some(ch);
        self.ready = true;
        true
    }

    /// The wait condition: a value is present or the session is ending.
    pub fn is_ready(&self) -> bool {
        self.ready || self.shut_down
    }

    /// Closes a line request, returning at most `max_len` characters.
    pub fn finish_line(&mut self, max_len: usize) -> Input<String> {
        self.mode = InputMode::Idle;
        self.ready = false;
        if self.shut_down {
            return Input::Interrupted;
        }
        let line: String = self.line.chars().take(max_len).collect();
        self.line.clear();
        Input::Data(line)
    }

    pub fn finish_char(&mut self) -> Input<char> {
        self.mode = InputMode::Idle;
        self.ready = false;
        if self.shut_down {
            return Input::Interrupted;
        }
        match self.ch.take() {
            Some(ch) => Input::Data(ch),
            None => Input::Interrupted,
        }
    }

    pub fn shut_down(&mut self) {
        self.shut_down = true;
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}
