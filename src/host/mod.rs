//! # Interpreter Host
//!
//! The callback contract an interpreter engine drives: capability queries,
//! text output, blocking input, status display, window/style requests and
//! file access. [`screen::BridgeHost`] implements it by delegating every
//! stateful call to the [`Bridge`](crate::bridge::Bridge) and the
//! [`Storage`](crate::storage::Storage) layer.
//!
//! Capability queries are pure: they describe a fixed-pitch, monochrome,
//! single-window text display and never touch shared state.

pub mod screen;

use std::fmt;

use crate::bridge::{Input, StatusMode};
use crate::storage::{FileAccess, FileHandle, FileSystem, FileType, StorageError};

pub use screen::BridgeHost;

/// Name reported to the engine.
pub const INTERFACE_NAME: &str = "storyhost";

/// Screen geometry in characters. Both targets present the same grid.
pub const SCREEN_WIDTH: u16 = 80;
pub const SCREEN_HEIGHT: u16 = 24;

/// Z-machine colour numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colour {
    Black = 2,
    White = 9,
}

/// Fixed description of the display, answered without side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub status_line: bool,
    pub split_screen: bool,
    pub variable_pitch_default: bool,
    pub colour: bool,
    pub pictures: bool,
    pub bold: bool,
    pub italic: bool,
    pub fixed_space_font: bool,
    pub timed_input: bool,
    pub preloaded_input: bool,
    pub character_graphics_font: bool,
    pub picture_font: bool,
    pub height_lines: u16,
    pub width_chars: u16,
    pub width_units: u16,
    pub height_units: u16,
    pub font_width_units: u8,
    pub font_height_units: u8,
    pub foreground: Colour,
    pub background: Colour,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            status_line: true,
            split_screen: false,
            variable_pitch_default: false,
            colour: false,
            pictures: false,
            bold: false,
            italic: false,
            fixed_space_font: true,
            timed_input: false,
            preloaded_input: false,
            character_graphics_font: false,
            picture_font: false,
            height_lines: SCREEN_HEIGHT,
            width_chars: SCREEN_WIDTH,
            width_units: SCREEN_WIDTH,
            height_units: SCREEN_HEIGHT,
            font_width_units: 1,
            font_height_units: 1,
            foreground: Colour::White,
            background: Colour::Black,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Why the filename prompt produced no file.
#[derive(Debug)]
pub enum PromptError {
    /// Save storage is not mounted; the user was told and nothing blocked.
    NotAvailable,
    /// The session ended while waiting for a filename.
    Interrupted,
    /// The chosen file could not be opened.
    Open(StorageError),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::NotAvailable => write!(f, "save storage not available"),
            PromptError::Interrupted => write!(f, "filename prompt interrupted"),
            PromptError::Open(e) => write!(f, "could not open file: {}", e),
        }
    }
}

impl std::error::Error for PromptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PromptError::Open(e) => Some(e),
            _ => None,
        }
    }
}

// ============================================================================
// Callback Contract
// ============================================================================

/// Everything an engine may ask of its host. Only `read_line`, `read_char`
/// and `prompt_for_filename` may block.
pub trait InterpreterHost {
    fn interface_name(&self) -> &str {
        INTERFACE_NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Called on restart: pending output, status and cursor are discarded.
    fn reset(&mut self);

    /// Flushes `error` to the player, then marks the interpreter exited.
    fn close(&mut self, error: Option<&str>);

    fn output(&mut self, text: &str);

    /// `Input::Data` holds at most `max_len` characters.
    fn read_line(&mut self, max_len: usize) -> Input<String>;

    fn read_char(&mut self) -> Input<char>;

    fn show_status(&mut self, room: &str, mode: StatusMode, p1: i16, p2: i16);

    fn set_cursor(&mut self, row: u16, column: u16, window: i16);

    fn cursor_row(&self) -> u16;

    fn cursor_column(&self) -> u16;

    /// One line identifying the host, written to the output channel.
    fn output_interface_info(&mut self);

    /// The host echoes submitted input itself.
    fn input_must_be_repeated_by_story(&self) -> bool {
        false
    }

    /// Asks the player for a save/restore filename and opens it.
    fn prompt_for_filename(
        &mut self,
        suggestion: &str,
        file_type: FileType,
        access: FileAccess,
    ) -> Result<FileHandle, PromptError>;

    /// The storage callbacks.
    fn files(&mut self) -> &mut dyn FileSystem;

    // Accepted and ignored on a single-window monochrome display.

    fn set_buffer_mode(&mut self, _buffered: bool) {}

    fn set_text_style(&mut self, _style: u16) {}

    fn set_colour(&mut self, _foreground: i16, _background: i16, _window: i16) {}

    fn set_font(&mut self, _font: u16) {}

    fn split_window(&mut self, _lines: i16) {}

    fn set_window(&mut self, _window: i16) {}

    fn erase_window(&mut self, _window: i16) {}

    fn erase_line(&mut self, _start: u16) {}

    fn game_was_restored(&mut self) {}
}
