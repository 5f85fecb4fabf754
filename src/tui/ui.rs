use crate::facade::Facade;
use crate::tui::TuiState;
use crate::tui::event::TuiEvent;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Position, Rect, Size};
use ratatui::style::{Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, Paragraph, Wrap};
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};
use unicode_width::UnicodeWidthStr;

const PROMPT: &str = "> ";

/// Scroll state for the story transcript.
/// Must be persisted in the parent TuiState.
pub struct TranscriptState {
    pub scroll_state: ScrollViewState,
    /// When true, auto-scroll to bottom on new output
    pub stick_to_bottom: bool,
    /// Rendered transcript height from the last frame
    pub content_height: u16,
    /// Last known viewport height (for scroll clamping between frames)
    pub viewport_height: u16,
}

impl Default for TranscriptState {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptState {
    pub fn new() -> Self {
        Self {
            scroll_state: ScrollViewState::default(),
            stick_to_bottom: true,
            content_height: 0,
            viewport_height: 0,
        }
    }

    fn max_offset(&self) -> u16 {
        self.content_height.saturating_sub(self.viewport_height)
    }

    /// Content exists below the visible window.
    pub fn has_unseen_content(&self) -> bool {
        !self.stick_to_bottom && self.scroll_state.offset().y < self.max_offset()
    }

    fn set_offset_y(&mut self, y: u16) {
        self.scroll_state.set_offset(Position {
            x: 0,
            y: y.min(self.max_offset()),
        });
    }

    /// Re-engage auto-scroll if the user has reached the bottom.
    fn repin_if_at_bottom(&mut self) {
        if self.scroll_state.offset().y >= self.max_offset() {
            self.stick_to_bottom = true;
        }
    }

    /// Applies a scroll event. Returns false for events that are not scrolling.
    pub fn handle_event(&mut self, event: &TuiEvent) -> bool {
        let current = self.scroll_state.offset().y.min(self.max_offset());
        let page = self.viewport_height.max(1);
        match event {
            TuiEvent::ScrollUp => {
                self.set_offset_y(current.saturating_sub(1));
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollDown => {
                self.set_offset_y(current.saturating_add(1));
                self.repin_if_at_bottom();
            }
            TuiEvent::ScrollPageUp => {
                self.set_offset_y(current.saturating_sub(page));
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollPageDown => {
                self.set_offset_y(current.saturating_add(page));
                self.repin_if_at_bottom();
            }
            TuiEvent::ScrollToBottom => {
                self.set_offset_y(self.max_offset());
                self.stick_to_bottom = true;
            }
            _ => return false,
        }
        true
    }
}

pub fn draw_ui(frame: &mut Frame, facade: &Facade, tui: &mut TuiState) {
    use Constraint::{Length, Min};
    let layout = Layout::vertical([Length(1), Min(0), Length(3)]);
    let [status_area, main_area, input_area] = layout.areas(frame.area());

    draw_transcript(frame, main_area, facade, &mut tui.transcript);

    let status = status_text(facade, tui.transcript.has_unseen_content(), status_area.width);
    frame.render_widget(
        Span::styled(status, Style::default().add_modifier(Modifier::REVERSED)),
        status_area,
    );

    draw_command_line(frame, input_area, facade);
}

/// Builds the one-line status bar: room on the left, score or time on the
/// right, padded to `width` columns.
pub fn status_text(facade: &Facade, has_unseen_content: bool, width: u16) -> String {
    let (left, mut right) = match facade.status() {
        Some(status) => (status.room.clone(), status.score_or_time.clone()),
        None => (crate::host::INTERFACE_NAME.to_string(), String::new()),
    };
    if has_unseen_content {
        if right.is_empty() {
            right.push_str("↓ More");
        } else {
            right.push_str(" | ↓ More");
        }
    }
    let used = left.width() + right.width() + 2;
    let pad = usize::from(width).saturating_sub(used);
    format!(" {}{}{} ", left, " ".repeat(pad), right)
}

fn draw_transcript(frame: &mut Frame, area: Rect, facade: &Facade, state: &mut TranscriptState) {
    let content_width = area.width.saturating_sub(1); // -1 for scrollbar safe area
    let paragraph = Paragraph::new(facade.output()).wrap(Wrap { trim: false });
    let height = u16::try_from(paragraph.line_count(content_width)).unwrap_or(u16::MAX);

    state.content_height = height;
    state.viewport_height = area.height;

    let mut scroll_view = ScrollView::new(Size::new(content_width, height))
        .vertical_scrollbar_visibility(ScrollbarVisibility::Automatic)
        .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);
    scroll_view.render_widget(paragraph, Rect::new(0, 0, content_width, height));

    // Auto-scroll, or clamp after the scrollback was trimmed
    let current = state.scroll_state.offset().y;
    if state.stick_to_bottom || current > state.max_offset() {
        state.set_offset_y(state.max_offset());
    }

    frame.render_stateful_widget(scroll_view, area, &mut state.scroll_state);
}

fn command_title(facade: &Facade) -> &'static str {
    if facade.has_exited() {
        "Story finished (Esc to quit)"
    } else if facade.waiting_for_char() {
        "Press any key"
    } else if facade.waiting_for_line() {
        "Command"
    } else {
        "Working..."
    }
}

fn draw_command_line(frame: &mut Frame, area: Rect, facade: &Facade) {
    let text = format!("{}{}", PROMPT, facade.command());
    let input = Paragraph::new(text.as_str()).block(Block::bordered().title(command_title(facade)));
    frame.render_widget(input, area);

    if facade.waiting_for_line() && !facade.has_exited() {
        let inner_width = area.width.saturating_sub(2);
        let offset = u16::try_from(text.width()).unwrap_or(u16::MAX).min(inner_width);
        frame.set_cursor_position((area.x + 1 + offset, area.y + 1));
    }
}
