//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the façade,
//! and translates keyboard events into façade calls.
//!
//! This is the only module that knows about ratatui and crossterm. The
//! embedded targets drive the same [`Facade`] from their own display task.
//!
//! ## Redraw Strategy
//!
//! The loop polls the façade once per poll interval and only redraws when
//! the façade reports a change or a terminal event arrived.

mod event;
mod ui;

use log::{debug, info, warn};
use std::io::{self, stdout};

use crossterm::cursor::{SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
};
use crossterm::execute;

use crate::core::config::ResolvedConfig;
use crate::core::session::Session;
use crate::engine::DemoEngine;
use crate::facade::Facade;
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};
use crate::tui::ui::TranscriptState;

/// TUI-specific presentation state
pub struct TuiState {
    pub transcript: TranscriptState,
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            transcript: TranscriptState::new(),
        }
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> io::Result<Self> {
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,
            SetCursorStyle::SteadyBlock
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, steady block cursor)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), DisableMouseCapture, DisableBracketedPaste);
    }
}

/// What the loop should do after an event.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Routes one terminal event to the façade or the transcript view.
fn handle_event(facade: &mut Facade, tui: &mut TuiState, event: TuiEvent) -> Flow {
    if matches!(event, TuiEvent::Quit) {
        return Flow::Quit;
    }
    if tui.transcript.handle_event(&event) {
        return Flow::Continue;
    }

    // A pending character read takes the very next key
    if facade.waiting_for_char() {
        let key = match event {
            TuiEvent::InputChar(c) => Some(c),
            TuiEvent::Submit => Some('\n'),
            TuiEvent::Backspace => Some('\u{8}'),
            TuiEvent::Paste(text) => text.chars().next(),
            _ => None,
        };
        if let Some(key) = key {
            facade.submit_char(key);
        }
        return Flow::Continue;
    }

    match event {
        TuiEvent::InputChar(c) => {
            let mut buf = [0u8; 4];
            facade.append_to_command(c.encode_utf8(&mut buf));
        }
        // Only the first line of a paste; a newline would end the command
        TuiEvent::Paste(text) => {
            if let Some(line) = text.lines().next() {
                facade.append_to_command(line);
            }
        }
        TuiEvent::Backspace => facade.backspace_command(),
        TuiEvent::ClearCommand => facade.clear_command(),
        TuiEvent::Submit => {
            if !facade.submit_command() {
                debug!("Enter pressed while the story is not waiting for a line");
            }
        }
        _ => {}
    }
    Flow::Continue
}

pub fn run(config: ResolvedConfig) -> io::Result<()> {
    let mut session = Session::from_config(&config).map_err(io::Error::other)?;
    session
        .start(Box::new(DemoEngine::new()))
        .map_err(io::Error::other)?;

    let mut facade = Facade::new(session.bridge(), config.profile);
    let mut tui = TuiState::new();

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    let mut needs_redraw = true; // Force first frame
    let result = loop {
        if facade.poll() {
            needs_redraw = true;
        }

        if needs_redraw {
            if let Err(e) = terminal.draw(|f| ui::draw_ui(f, &facade, &mut tui)) {
                break Err(e);
            }
            needs_redraw = false;
        }

        let first_event = poll_event_timeout(config.poll_interval);
        if first_event.is_some() {
            needs_redraw = true;
        }

        // Process first event + drain ALL pending events before next draw
        let mut should_quit = false;
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            if handle_event(&mut facade, &mut tui, event) == Flow::Quit {
                should_quit = true;
                break;
            }
        }

        if should_quit {
            break Ok(());
        }
    };

    info!("Leaving terminal UI");
    session.shutdown();
    if session.is_finished() {
        debug!("Interpreter joined");
    } else {
        warn!("Interpreter still running after shutdown");
    }

    ratatui::restore();
    result
}
