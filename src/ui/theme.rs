//! Colors for the monitor, picked from the terminal background.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::session::SessionState;
use crate::source::ConnectionState;

/// Colors and styles used by every view.
///
/// Built by [`Theme::auto_detect()`], or explicitly with [`Theme::dark()`]
/// and [`Theme::light()`].
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent for titles and active elements.
    pub highlight: Color,
    /// A stream is up and delivering.
    pub link_up: Color,
    /// A stream is being dialled or is closed.
    pub link_pending: Color,
    /// A stream failed.
    pub link_lost: Color,
    pub border: Color,
    /// Live waveform trace.
    pub waveform: Color,
    /// Classified beat segment trace.
    pub segment: Color,
    pub header: Style,
    pub tab_active: Style,
    pub tab_inactive: Style,
    /// Focused report form field.
    pub input_focused: Style,
    pub border_type: BorderType,
}

impl Theme {
    /// For dark backgrounds.
    pub fn dark() -> Self {
        let accent = Color::Cyan;
        Self {
            highlight: accent,
            link_up: Color::Green,
            link_pending: Color::Yellow,
            link_lost: Color::Red,
            border: Color::Gray,
            waveform: Color::LightGreen,
            segment: Color::LightMagenta,
            header: Style::default().fg(accent).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(accent).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::Gray),
            input_focused: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// For light backgrounds. The traces are darkened to stay visible.
    pub fn light() -> Self {
        let accent = Color::Blue;
        Self {
            highlight: accent,
            link_up: Color::Green,
            link_pending: Color::Yellow,
            link_lost: Color::Red,
            border: Color::DarkGray,
            waveform: Color::Green,
            segment: Color::Magenta,
            header: Style::default().fg(accent).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(accent).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::DarkGray),
            input_focused: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Style for one stream's connection state.
    pub fn connection_style(&self, state: ConnectionState) -> Style {
        match state {
            ConnectionState::Connected => Style::default().fg(self.link_up),
            ConnectionState::Disconnected => Style::default().fg(self.link_pending),
            ConnectionState::Error => self.lost_style(),
        }
    }

    /// Style for the session as a whole, used by the header indicator.
    pub fn session_style(&self, state: SessionState) -> Style {
        match state {
            SessionState::Live => Style::default().fg(self.link_up),
            SessionState::ConnectingPrimary | SessionState::ConnectingSecondary => {
                Style::default().fg(self.link_pending)
            }
            SessionState::Failed => self.lost_style(),
            SessionState::Idle | SessionState::Disconnected => {
                Style::default().add_modifier(Modifier::DIM)
            }
        }
    }

    fn lost_style(&self) -> Style {
        Style::default().fg(self.link_lost).add_modifier(Modifier::BOLD)
    }
}
