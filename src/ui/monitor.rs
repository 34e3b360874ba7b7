//! Live ECG view.
//!
//! Draws the scrolling waveform above a row of stat boxes for heart rate and
//! the PR, QRS and QT intervals, with a sparkline of recent heart rates.

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::history::sparkline_levels;

/// Sparkline characters (8 levels of height).
const SPARKLINE_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Fixed amplitude range of the waveform chart.
const Y_BOUNDS: [f64; 2] = [-0.2, 1.2];

/// Render the Live ECG view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let [chart_area, stats_area] =
        Layout::vertical([Constraint::Min(6), Constraint::Length(5)]).areas(area);

    render_waveform(frame, app, chart_area);
    render_stats(frame, app, stats_area);
}

fn render_waveform(frame: &mut Frame, app: &App, area: Rect) {
    let points = app.frame.points();
    let x_max = (app.frame.window.len().saturating_sub(1)).max(1) as f64;

    let datasets = vec![Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(app.theme.waveform))
        .data(&points)];

    let title = format!(" ECG │ {} beats ", app.frame.beats);
    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .x_axis(
            Axis::default()
                .bounds([0.0, x_max])
                .style(Style::default().fg(app.theme.border)),
        )
        .y_axis(
            Axis::default()
                .bounds(Y_BOUNDS)
                .labels(vec![
                    Span::raw(format!("{:.1}", Y_BOUNDS[0])),
                    Span::raw("0.5"),
                    Span::raw(format!("{:.1}", Y_BOUNDS[1])),
                ])
                .style(Style::default().fg(app.theme.border)),
        );

    frame.render_widget(chart, area);
}

fn render_stats(frame: &mut Frame, app: &App, area: Rect) {
    let metrics = &app.frame.metrics;
    let boxes = Layout::horizontal([Constraint::Ratio(1, 4); 4]).split(area);

    let mut heart_rate = vec![stat_value(app, metrics.heart_rate_text(), "BPM")];
    let spark = sparkline(&app.frame.heart_rates);
    if !spark.is_empty() {
        heart_rate.push(Line::from(Span::styled(
            spark,
            Style::default().fg(app.theme.highlight),
        )));
    }
    render_stat_box(frame, app, boxes[0], "Heart Rate", heart_rate);

    let estimator = if metrics.intervals.is_some() {
        app.frame.estimator
    } else {
        ""
    };
    for (area, title, text) in [
        (boxes[1], "PR Interval", metrics.pr_text()),
        (boxes[2], "QRS Duration", metrics.qrs_text()),
        (boxes[3], "QT Interval", metrics.qt_text()),
    ] {
        let mut lines = vec![stat_value(app, text, "ms")];
        if !estimator.is_empty() {
            lines.push(Line::from(Span::styled(
                estimator,
                Style::default().add_modifier(Modifier::DIM),
            )));
        }
        render_stat_box(frame, app, area, title, lines);
    }
}

fn stat_value(app: &App, value: String, unit: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            value,
            Style::default()
                .fg(app.theme.highlight)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(unit, Style::default().add_modifier(Modifier::DIM)),
    ])
}

fn render_stat_box(frame: &mut Frame, app: &App, area: Rect, title: &str, lines: Vec<Line>) {
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(paragraph, area);
}

/// Generate a sparkline string from heart-rate readings.
fn sparkline(values: &[u32]) -> String {
    sparkline_levels(values)
        .iter()
        .map(|&v| SPARKLINE_CHARS[v.min(7) as usize])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparkline_rendering() {
        assert_eq!(sparkline(&[]), "");
        assert_eq!(sparkline(&[70]), "");
        assert_eq!(sparkline(&[60, 90]), "▁█");
        assert_eq!(sparkline(&[72, 72, 72]).chars().count(), 3);
    }
}
