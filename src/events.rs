use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, View};

/// File written by the in-app export key.
pub const EXPORT_PATH: &str = "ecgwatch_export.json";

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    // The report form captures all input while open
    if app.report_form.is_some() {
        handle_form_input(app, key);
        return;
    }

    match key.code {
        // Quit
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),

        // View switching
        KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => app.next_view(),
        KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => app.prev_view(),
        KeyCode::Char('1') => app.set_view(View::Live),
        KeyCode::Char('2') => app.set_view(View::Analysis),

        // Session
        KeyCode::Char('c') => app.connect(),
        KeyCode::Char('d') => app.disconnect(),

        // Report
        KeyCode::Char('g') => app.open_report_form(),

        // Help
        KeyCode::Char('?') => app.toggle_help(),

        // Export
        KeyCode::Char('e') => {
            let export_path = PathBuf::from(EXPORT_PATH);
            match app.export_state(&export_path) {
                Ok(()) => {
                    app.set_status_message(format!("Exported to {}", export_path.display()));
                }
                Err(e) => {
                    app.set_status_message(format!("Export failed: {}", e));
                }
            }
        }

        _ => {}
    }
}

/// Handle key input while the report form is open
fn handle_form_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.cancel_report_form();
            app.set_status_message("Report cancelled".to_string());
        }

        KeyCode::Enter => match app.submit_report() {
            Ok(id) => app.set_status_message(format!("Report {} saved", id)),
            Err(e) => app.set_status_message(format!("Report not saved: {}", e)),
        },

        KeyCode::Tab | KeyCode::BackTab => {
            if let Some(form) = app.report_form.as_mut() {
                form.next_field();
            }
        }

        KeyCode::Backspace => {
            if let Some(form) = app.report_form.as_mut() {
                form.pop();
            }
        }

        KeyCode::Char(c) => {
            if let Some(form) = app.report_form.as_mut() {
                form.push(c);
            }
        }

        _ => {}
    }
}
