//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use crate::bridge::{Input, StatusLine, StatusMode};
use crate::host::{InterpreterHost, PromptError};
use crate::storage::volume::HostVolume;
use crate::storage::{
    DEFAULT_SAVE_PREFIX, FileAccess, FileHandle, FileSystem, FileType, Storage,
};

/// A host that plays back scripted input and records everything the engine
/// does, without any threads. Running out of input reads as a shutdown.
pub struct ScriptedHost {
    lines: VecDeque<String>,
    chars: VecDeque<char>,
    output: String,
    status: Option<StatusLine>,
    storage: Storage,
    cursor: (u16, u16),
}

impl ScriptedHost {
    pub fn new(story: &str) -> Self {
        let storage = Storage::new(
            Arc::from(story.as_bytes()),
            DEFAULT_SAVE_PREFIX,
            Box::new(HostVolume::new("scripted-host-unmounted")),
        )
        .unwrap();
        Self {
            lines: VecDeque::new(),
            chars: VecDeque::new(),
            output: String::new(),
            status: None,
            storage,
            cursor: (1, 1),
        }
    }

    pub fn with_lines<const N: usize>(mut self, lines: [&str; N]) -> Self {
        self.lines.extend(lines.iter().map(|l| l.to_string()));
        self
    }

    pub fn with_chars<const N: usize>(mut self, chars: [char; N]) -> Self {
        self.chars.extend(chars);
        self
    }

    /// Replaces the storage with a mounted volume rooted at `root`.
    pub fn with_save_dir(mut self, root: &Path) -> Self {
        let story = {
            let mut file = self
                .storage
                .open(crate::storage::STORY_SENTINEL, FileType::Data, FileAccess::Read)
                .unwrap();
            let mut image = vec![0u8; self.storage.story_len()];
            let n = self.storage.read(&mut file, &mut image).unwrap();
            image.truncate(n);
            image
        };
        let mut storage = Storage::new(
            Arc::from(story),
            DEFAULT_SAVE_PREFIX,
            Box::new(HostVolume::new(root)),
        )
        .unwrap();
        storage.mount().unwrap();
        self.storage = storage;
        self
    }

    pub fn transcript(&self) -> &str {
        &self.output
    }

    pub fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }
}

impl InterpreterHost for ScriptedHost {
    /// Keeps the recorded output so tests can see what came before.
    fn reset(&mut self) {
        self.status = None;
        self.cursor = (1, 1);
    }

    fn close(&mut self, error: Option<&str>) {
        if let Some(message) = error {
            self.output.push_str(message);
        }
    }

    fn output(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn read_line(&mut self, max_len: usize) -> Input<String> {
        match self.lines.pop_front() {
            Some(line) => Input::Data(line.chars().take(max_len).collect()),
            None => Input::Interrupted,
        }
    }

    fn read_char(&mut self) -> Input<char> {
        match self.chars.pop_front() {
            Some(ch) => Input::Data(ch),
            None => Input::Interrupted,
        }
    }

    fn show_status(&mut self, room: &str, mode: StatusMode, p1: i16, p2: i16) {
        self.status = Some(StatusLine::format(room, mode, p1, p2));
    }

    fn set_cursor(&mut self, row: u16, column: u16, _window: i16) {
        self.cursor = (row, column);
    }

    fn cursor_row(&self) -> u16 {
        self.cursor.0
    }

    fn cursor_column(&self) -> u16 {
        self.cursor.1
    }

    fn output_interface_info(&mut self) {
        self.output.push_str("scripted host\n");
    }

    /// Opens the suggested name directly instead of asking.
    fn prompt_for_filename(
        &mut self,
        suggestion: &str,
        file_type: FileType,
        access: FileAccess,
    ) -> Result<FileHandle, PromptError> {
        if !self.storage.is_mounted() {
            return Err(PromptError::NotAvailable);
        }
        self.storage
            .open(suggestion, file_type, access)
            .map_err(PromptError::Open)
    }

    fn files(&mut self) -> &mut dyn FileSystem {
        &mut self.storage
    }
}
