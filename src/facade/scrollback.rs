//! Bounded UTF-8 scrollback.
//!
//! Two independent limits apply after every append:
//!
//! 1. A hard byte cap. When exceeded, at least half the buffer is dropped
//!    from the front, cut just after a newline found within a short
//!    lookahead or anywhere before the current story output.
//! 2. A line floor. Only the last `min_lines` lines are kept, or the whole
//!    current story output if that is longer.
//!
//! The "current story output" starts where the last command was submitted.

/// How far past the discard point to look for a newline.
const NEWLINE_LOOKAHEAD: usize = 200;

#[derive(Debug, Clone)]
pub struct Scrollback {
    text: String,
    cap: usize,
    min_lines: usize,
    current_start: usize,
}

/// Lines in `text`, counting an unterminated last line.
fn count_lines(text: &str) -> usize {
    let newlines = text.bytes().filter(|&b| b == b'\n').count();
    if text.is_empty() || text.ends_with('\n') {
        newlines
    } else {
        newlines + 1
    }
}

impl Scrollback {
    pub fn new(cap: usize, min_lines: usize) -> Self {
        Self {
            text: String::new(),
            cap,
            min_lines,
            current_start: 0,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Text produced since the last submitted command.
    pub fn current_output(&self) -> &str {
        &self.text[self.current_start..]
    }

    /// Starts a new current-output segment at the end of the buffer.
    pub fn mark_current_output(&mut self) {
        self.current_start = self.text.len();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.current_start = 0;
    }

    /// Returns false when `text` is empty and nothing changed.
    pub fn append(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        self.text.push_str(text);
        self.enforce_cap();
        self.keep_trailing_lines();
        true
    }

    fn discard_front(&mut self, cut: usize) {
        self.text.drain(..cut);
        self.current_start = self.current_start.saturating_sub(cut);
    }

    fn enforce_cap(&mut self) {
        if self.text.len() <= self.cap {
            return;
        }
        let overflow = self.text.len() - self.cap;
        let mut cut = overflow.max(self.cap / 2);
        while !self.text.is_char_boundary(cut) {
            cut += 1;
        }
        // Look a little past the cut, or as far as the current output, for a
        // line end. A single line longer than both is cut mid-line.
        let search_end = (cut + NEWLINE_LOOKAHEAD)
            .max(self.current_start)
            .min(self.text.len());
        if let Some(offset) = self.text.as_bytes()[cut..search_end]
            .iter()
            .position(|&b| b == b'\n')
        {
            cut += offset + 1;
        }
        self.discard_front(cut);
    }

    fn keep_trailing_lines(&mut self) {
        let current = &self.text[self.current_start..];
        let current_len = current.len();
        let keep = count_lines(current).max(self.min_lines);
        let total = count_lines(&self.text);
        if total <= keep {
            return;
        }

        let to_trim = total - keep;
        let cut = self
            .text
            .match_indices('\n')
            .nth(to_trim - 1)
            .map(|(i, _)| i + 1);
        if let Some(cut) = cut.filter(|&c| c < self.text.len()) {
            self.text.drain(..cut);
            self.current_start = self.text.len().saturating_sub(current_len);
        }
    }
}
