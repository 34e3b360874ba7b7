//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, and the help
//! and report overlays.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Frame,
};

use crate::app::{App, FormField, View};
use crate::session::SessionState;

/// Render the header bar with the state of both systems.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let session = app.session();
    let status_style = app.theme.session_style(session.state());

    let line = Line::from(vec![
        Span::styled(" ● ", status_style),
        Span::styled("ECG MONITOR ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(app.system_status(), status_style),
        Span::raw(" │ "),
        Span::raw(session.state().label()),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the tab bar showing available views.
///
/// Highlights the currently active view.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = vec![Line::from(" 1:Live ECG "), Line::from(" 2:Beat Analysis ")];

    let selected = match app.current_view {
        View::Live => 0,
        View::Analysis => 1,
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Render the status bar at the bottom.
///
/// Temporary status messages take precedence over the key hints.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let session = app.session();
    let controls = if app.report_form.is_some() {
        "Tab:next field Enter:submit Esc:cancel"
    } else if session.state().is_active() {
        "d:disconnect g:report e:export Tab:switch ?:help q:quit"
    } else {
        "c:connect g:report e:export Tab:switch ?:help q:quit"
    };

    let status = match (session.state(), session.last_error()) {
        (SessionState::Failed, Some(err)) => format!(" Error: {} | {}", err, controls),
        _ => format!(" {} | {}", session.settings().waveform, controls),
    };

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Session",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  c         Connect to ECG and analysis"),
        Line::from("  d         Disconnect"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Navigation",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  Tab/←/→   Switch view"),
        Line::from("  1/2       Live ECG / Beat Analysis"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " General",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  g         Generate report"),
        Line::from("  e         Export to JSON"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let help_area = super::centered(area, 42, 20);
    frame.render_widget(Clear, help_area);
    frame.render_widget(Paragraph::new(help_text).block(block), help_area);
}

/// Render the report form overlay.
///
/// Shows the editable fields plus the values the report will capture.
pub fn render_report_form(frame: &mut Frame, app: &App, area: Rect) {
    let Some(form) = app.report_form.as_ref() else {
        return;
    };

    let mut lines = vec![
        Line::from(vec![Span::styled("Generate Report", app.theme.header)]),
        Line::from(""),
    ];

    for field in [FormField::PatientId, FormField::PatientName, FormField::Description] {
        let focused = form.focus == field;
        let value_style = if focused {
            app.theme.input_focused
        } else {
            Style::default()
        };
        let cursor = if focused { "_" } else { "" };
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {:<13}", field.label()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("{}{}", form.value(field), cursor), value_style),
        ]));
    }

    let metrics = &app.frame.metrics;
    let class = app
        .classification
        .as_ref()
        .map_or(crate::report::NO_CLASSIFICATION, |c| c.class_label.as_str());

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(
            "  Heart rate {} BPM │ PR {} │ QRS {} │ QT {}",
            metrics.heart_rate_text(),
            metrics.pr_text(),
            metrics.qrs_text(),
            metrics.qt_text()
        ),
        Style::default().add_modifier(Modifier::DIM),
    )));
    lines.push(Line::from(Span::styled(
        format!("  Heart class {}", class),
        Style::default().add_modifier(Modifier::DIM),
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Tab: next field  Enter: submit  Esc: cancel",
        Style::default().add_modifier(Modifier::DIM),
    )));

    let block = Block::default()
        .title(" Report ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let form_area = super::centered(area, 60, 13);
    frame.render_widget(Clear, form_area);
    frame.render_widget(Paragraph::new(lines).block(block), form_area);
}
