//! Beat Analysis view.
//!
//! Shows the segment of the most recently classified beat next to its label,
//! and the connection state of both systems.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::ClassificationSnapshot;

/// Render the Beat Analysis view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let [segment_area, side_area] =
        Layout::horizontal([Constraint::Percentage(65), Constraint::Percentage(35)]).areas(area);
    let [beat_area, status_area] =
        Layout::vertical([Constraint::Length(6), Constraint::Min(5)]).areas(side_area);

    render_segment(frame, app, segment_area);
    render_beat(frame, app, beat_area);
    render_system_status(frame, app, status_area);
}

fn panel<'a>(app: &App, title: &'a str) -> Block<'a> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border))
}

fn render_segment(frame: &mut Frame, app: &App, area: Rect) {
    let Some(snapshot) = app.classification.as_deref() else {
        let paragraph = Paragraph::new("Waiting for a classified beat...")
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(panel(app, " Beat Segment "));
        frame.render_widget(paragraph, area);
        return;
    };

    let points = snapshot.points();
    let (y_min, y_max) = amplitude_bounds(snapshot);
    let x_max = (snapshot.segment.len().saturating_sub(1)).max(1) as f64;

    let datasets = vec![Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(app.theme.segment))
        .data(&points)];

    let chart = Chart::new(datasets)
        .block(panel(app, " Beat Segment "))
        .x_axis(
            Axis::default()
                .title("Samples")
                .bounds([0.0, x_max])
                .labels(vec![Span::raw("0"), Span::raw(format!("{}", x_max as usize))])
                .style(Style::default().fg(app.theme.border)),
        )
        .y_axis(
            Axis::default()
                .title("Amplitude")
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::raw(format!("{:.2}", y_min)),
                    Span::raw(format!("{:.2}", y_max)),
                ])
                .style(Style::default().fg(app.theme.border)),
        );

    frame.render_widget(chart, area);
}

/// Chart bounds padded around the segment's own range.
fn amplitude_bounds(snapshot: &ClassificationSnapshot) -> (f64, f64) {
    let min = snapshot.segment.iter().copied().fold(f64::INFINITY, f64::min);
    let max = snapshot
        .segment
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((max - min) * 0.1).max(0.05);
    (min - pad, max + pad)
}

fn render_beat(frame: &mut Frame, app: &App, area: Rect) {
    let label = |text: &'static str| {
        Span::styled(
            format!("{:<16}", text),
            Style::default().add_modifier(Modifier::BOLD),
        )
    };

    let lines = match app.classification.as_deref() {
        Some(snapshot) => vec![
            Line::from(vec![
                label("Beat Number"),
                Span::raw(snapshot.beat_number.to_string()),
            ]),
            Line::from(vec![
                label("Classification"),
                Span::styled(
                    snapshot.class_text(),
                    Style::default().fg(app.theme.highlight),
                ),
            ]),
            Line::from(vec![
                label("Confidence"),
                Span::raw(format!("{}%", snapshot.confidence_text())),
            ]),
        ],
        None => vec![Line::from(Span::styled(
            "No classification yet",
            Style::default().add_modifier(Modifier::DIM),
        ))],
    };

    frame.render_widget(
        Paragraph::new(lines).block(panel(app, " Current Beat ")),
        area,
    );
}

fn render_system_status(frame: &mut Frame, app: &App, area: Rect) {
    let session = app.session();
    let primary = session.primary_state();
    let secondary = session.secondary_state();

    let label = |text: &'static str| {
        Span::styled(
            format!("{:<16}", text),
            Style::default().add_modifier(Modifier::BOLD),
        )
    };

    let lines = vec![
        Line::from(vec![
            label("ECG Data"),
            Span::styled(primary.label(), app.theme.connection_style(primary)),
        ]),
        Line::from(vec![
            label("Analysis System"),
            Span::styled(secondary.label(), app.theme.connection_style(secondary)),
        ]),
        Line::from(vec![
            label("Data Points"),
            Span::raw(app.frame.window.len().to_string()),
        ]),
        Line::from(vec![
            label("Beats Detected"),
            Span::raw(app.frame.beats.to_string()),
        ]),
    ];

    frame.render_widget(
        Paragraph::new(lines).block(panel(app, " System Status ")),
        area,
    );
}
