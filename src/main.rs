use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ecgwatch::app::{App, View};
use ecgwatch::report::{FileReportSink, Identity};
use ecgwatch::session::SessionController;
use ecgwatch::source::NetworkTransport;
use ecgwatch::{events, ui, MonitorConfig};

/// How long the UI loop waits for input before ticking the session again.
const INPUT_POLL: Duration = Duration::from_millis(16);

#[derive(Parser, Debug)]
#[command(name = "ecgwatch")]
#[command(about = "Real-time ECG monitor: live waveform, heart rate and beat classification")]
struct Args {
    /// Waveform stream endpoint (ws://, wss:// or tcp://)
    #[arg(short, long)]
    waveform: Option<String>,

    /// Classification stream endpoint (ws://, wss:// or tcp://)
    #[arg(short = 'a', long)]
    classification: Option<String>,

    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Doctor name placed on generated reports
    #[arg(long)]
    doctor: Option<String>,

    /// Directory reports are written to
    #[arg(long)]
    reports_dir: Option<PathBuf>,

    /// Log file (the terminal is owned by the UI)
    #[arg(long, default_value = "ecgwatch.log")]
    log_file: PathBuf,

    /// Connect as soon as the UI starts
    #[arg(short, long)]
    connect: bool,

    /// Run the built-in simulator on loopback and point both streams at it
    #[arg(short, long, conflicts_with_all = ["waveform", "classification"])]
    simulate: bool,

    /// Export metrics and the latest classification to this JSON file on exit
    #[arg(short, long)]
    export: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_file)?;

    let mut config = MonitorConfig::load(args.config.as_deref())?;
    if let Some(ref endpoint) = args.waveform {
        config.waveform.endpoint = endpoint.clone();
    }
    if let Some(ref endpoint) = args.classification {
        config.classification.endpoint = endpoint.clone();
    }
    if let Some(ref doctor) = args.doctor {
        config.report.doctor = doctor.clone();
    }
    if let Some(ref dir) = args.reports_dir {
        config.report.directory = dir.clone();
    }

    // The session and its connections run on this runtime while the UI
    // loop owns the main thread.
    let rt = tokio::runtime::Runtime::new()?;
    let _guard = rt.enter();

    let simulator = if args.simulate {
        let handle = rt
            .block_on(ecgwatch_sim::Simulator::builder().start())
            .context("Failed to start simulator")?;
        config.waveform.endpoint = format!("tcp://{}", handle.waveform_addr());
        config.classification.endpoint = format!("tcp://{}", handle.classification_addr());
        Some(handle)
    } else {
        None
    };

    let settings = config.to_settings()?;
    info!(
        "ecgwatch starting: waveform {}, classification {}",
        settings.waveform, settings.classification
    );

    let session = SessionController::new(settings, Arc::new(NetworkTransport));
    let identity = Identity::new(config.report.doctor.clone());
    let sink = Box::new(FileReportSink::new(&config.report.directory));
    let mut app = App::new(session, identity, sink);
    if args.connect {
        app.connect();
    }

    let result = run_tui(&mut app);

    if let Some(ref path) = args.export {
        match app.export_state(path) {
            Ok(()) => println!("Exported monitor state to: {}", path.display()),
            Err(e) => warn!("Export to {} failed: {}", path.display(), e),
        }
    }

    app.disconnect();
    if let Some(handle) = simulator {
        handle.stop();
    }
    info!("ecgwatch stopped");

    result
}

/// Send tracing output to `path`, filtered by `RUST_LOG` (default `info`).
fn init_logging(path: &Path) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Run the TUI until the user quits
fn run_tui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    // Run the main loop
    let result = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 16;

    let mut dirty = true;
    let mut had_message = false;

    while app.running {
        if dirty {
            terminal.draw(|frame| {
                let area = frame.area();

                // Check for minimum terminal size
                if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                    let msg = format!(
                        "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                        area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                    );
                    let paragraph = ratatui::widgets::Paragraph::new(msg)
                        .alignment(ratatui::layout::Alignment::Center)
                        .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
                    let centered = ratatui::layout::Rect::new(
                        0,
                        (area.height / 2).saturating_sub(2),
                        area.width,
                        5u16.min(area.height),
                    );
                    frame.render_widget(paragraph, centered);
                    return;
                }

                let chunks = Layout::vertical([
                    Constraint::Length(1), // Header bar
                    Constraint::Length(1), // Tabs
                    Constraint::Min(12),   // Content
                    Constraint::Length(1), // Status bar
                ])
                .split(area);

                ui::common::render_header(frame, app, chunks[0]);
                ui::common::render_tabs(frame, app, chunks[1]);

                match app.current_view {
                    View::Live => ui::monitor::render(frame, app, chunks[2]),
                    View::Analysis => ui::analysis::render(frame, app, chunks[2]),
                }

                ui::common::render_status_bar(frame, app, chunks[3]);

                // Overlays
                if app.report_form.is_some() {
                    ui::common::render_report_form(frame, app, area);
                }
                if app.show_help {
                    ui::common::render_help(frame, app, area);
                }
            })?;
            dirty = false;
        }

        // Handle input
        match events::poll_event(INPUT_POLL)? {
            Some(Event::Key(key)) => {
                events::handle_key_event(app, key);
                dirty = true;
            }
            Some(Event::Resize(_, _)) => dirty = true,
            _ => {}
        }

        if app.tick(Instant::now()) {
            dirty = true;
        }

        // Redraw once more when a status message expires
        let has_message = app.get_status_message().is_some();
        if has_message != had_message {
            dirty = true;
            had_message = has_message;
        }
    }

    Ok(())
}
