use expdash::app::{self, AppState, DetailRequest};
use expdash::cli::Cli;
use expdash::events::{AppEvent, EventHandler};
use expdash::input::{self, Action, InputContext};
use expdash::server::client::{ExperimentSource, HttpSource};
use expdash::server::loader;
use expdash::tui;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, SetTitle};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;

fn setup_verbose_logging() -> Result<()> {
    let state_dir = state_dir_or_fallback();
    std::fs::create_dir_all(&state_dir)
        .map_err(|e| eyre!("Failed to create log directory {state_dir:?}: {e}"))?;
    let log_path = state_dir.join("debug.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| eyre!("Failed to open log file {log_path:?}: {e}"))?;
    tracing_subscriber::fmt()
        .with_writer(file)
        .with_ansi(false)
        .init();
    tracing::info!(
        "expdash v{} starting with verbose logging",
        env!("CARGO_PKG_VERSION")
    );
    Ok(())
}

fn state_dir_or_fallback() -> std::path::PathBuf {
    if let Some(state) = std::env::var_os("XDG_STATE_HOME") {
        std::path::PathBuf::from(state).join("expdash")
    } else if let Some(home) = std::env::var_os("HOME") {
        std::path::PathBuf::from(home)
            .join(".local")
            .join("state")
            .join("expdash")
    } else {
        std::path::PathBuf::from("/tmp/expdash")
    }
}

/// Spawns `fut` and reports a panic inside it as an error toast.
fn spawn_monitored(
    tx: UnboundedSender<AppEvent>,
    label: &'static str,
    fut: impl Future<Output = ()> + Send + 'static,
) {
    tokio::spawn(async move {
        let handle = tokio::spawn(fut);
        if let Err(join_err) = handle.await {
            let msg = if join_err.is_panic() {
                match join_err.into_panic().downcast::<String>() {
                    Ok(s) => *s,
                    Err(payload) => match payload.downcast::<&str>() {
                        Ok(s) => s.to_string(),
                        Err(_) => "unknown panic".to_string(),
                    },
                }
            } else {
                "task cancelled".to_string()
            };
            tracing::error!("{label} panicked: {msg}");
            if tx
                .send(AppEvent::Error(format!("{label} crashed: {msg}")))
                .is_err()
            {
                tracing::warn!("{label}: channel closed while reporting panic");
            }
        }
    });
}

fn spawn_list_request(
    state: &mut AppState,
    source: &Arc<dyn ExperimentSource>,
    tx: &UnboundedSender<AppEvent>,
) {
    let request = state.begin_list_request();
    let source = source.clone();
    let tx2 = tx.clone();
    spawn_monitored(tx.clone(), "experiment_list", async move {
        loader::request_experiment_list(&*source, request, &tx2).await;
    });
}

fn spawn_detail_request(
    request: Option<DetailRequest>,
    source: &Arc<dyn ExperimentSource>,
    tx: &UnboundedSender<AppEvent>,
) {
    let Some(request) = request else {
        return;
    };
    let source = source.clone();
    let tx2 = tx.clone();
    spawn_monitored(tx.clone(), "experiment_info", async move {
        loader::load_experiment_detail(&*source, request, &tx2).await;
    });
}

async fn open_in_browser(url: &str) -> Result<()> {
    let (cmd, args): (&str, Vec<&str>) = if cfg!(target_os = "macos") {
        ("open", vec![url])
    } else if cfg!(target_os = "windows") {
        ("cmd", vec!["/C", "start", url])
    } else {
        ("xdg-open", vec![url])
    };
    Command::new(cmd)
        .args(&args)
        .spawn()
        .map_err(|e| eyre!("Failed to open browser: {e}"))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    if args.verbose {
        setup_verbose_logging()?;
    }

    let http = Arc::new(HttpSource::new(
        &args.server,
        Duration::from_millis(args.timeout_ms),
    )?);
    let source: Arc<dyn ExperimentSource> = http.clone();

    let mut state = AppState::new(
        http.root().clone(),
        args.project.clone(),
        Duration::from_millis(args.timeout_ms),
    );
    state.set_mask_text(&args.mask);

    // Setup terminal with panic hook before any request goes out
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        if let Err(e) = terminal::disable_raw_mode() {
            eprintln!("Failed to disable raw mode during panic: {e}");
        }
        if let Err(e) = execute!(
            io::stdout(),
            DisableMouseCapture,
            LeaveAlternateScreen,
            SetTitle("")
        ) {
            eprintln!("Failed to leave alternate screen during panic: {e}");
        }
        original_hook(panic_info);
    }));

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        SetTitle(format!("expdash {}", args.project))
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let events = EventHandler::new(Duration::from_millis(100));
    let tx = events.sender();

    if args.no_autoload {
        tracing::info!("autoload disabled; waiting for a manual refresh");
    } else {
        spawn_list_request(&mut state, &source, &tx);
    }

    let result = run_app(&mut terminal, &mut state, events, &tx, &source, &http).await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen,
        SetTitle("")
    )?;
    terminal.show_cursor()?;

    result
}

/// Height of the list area, from the current terminal size.
fn list_area_height(terminal: &Terminal<CrosstermBackend<io::Stdout>>) -> u16 {
    let total = terminal.size().map(|s| s.height).unwrap_or_else(|e| {
        tracing::warn!("terminal size query failed: {e}");
        24
    });
    tui::render::list_height(total)
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState,
    mut events: EventHandler,
    tx: &UnboundedSender<AppEvent>,
    source: &Arc<dyn ExperimentSource>,
    http: &HttpSource,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| tui::render::render(f, state))?;

        state.prune_notifications();
        state.prune_error();

        let Some(event) = events.next().await else {
            break;
        };
        match event {
            AppEvent::Key(key) => {
                let ctx = InputContext {
                    has_error: state.error.is_some(),
                    is_loading: state.list_loading,
                    editing_mask: state.mask_editor.is_some(),
                };
                match input::map_key(key, &ctx) {
                    Action::Quit => state.should_quit = true,
                    Action::DismissError => state.clear_error(),
                    Action::MoveUp => state.move_cursor_up(),
                    Action::MoveDown => state.move_cursor_down(),
                    Action::Toggle => {
                        let request = state.toggle_selected();
                        spawn_detail_request(request, source, tx);
                    }
                    Action::Collapse => state.collapse_selected(),
                    Action::Refresh => spawn_list_request(state, source, tx),
                    Action::ReloadDetail => {
                        let request = state.reload_selected();
                        spawn_detail_request(request, source, tx);
                    }
                    Action::QuickSelect(n) => state.quick_select(n),
                    Action::EditMask => state.open_mask_editor(),
                    Action::MaskChar(c) => state.mask_input(c),
                    Action::MaskBackspace => state.mask_backspace(),
                    Action::MaskCancel => state.cancel_mask_editor(),
                    Action::MaskSubmit => {
                        if state.submit_mask_editor() {
                            spawn_list_request(state, source, tx);
                        }
                    }
                    Action::OpenBrowser => {
                        if let Some(exp) = state.selected_experiment() {
                            match http.detail_url(exp.id(), &state.config.project) {
                                Ok(url) => {
                                    let tx2 = tx.clone();
                                    spawn_monitored(tx.clone(), "open_browser", async move {
                                        if let Err(e) = open_in_browser(url.as_str()).await {
                                            if tx2.send(AppEvent::Error(e.to_string())).is_err() {
                                                tracing::warn!("open_browser: channel closed");
                                            }
                                        }
                                    });
                                }
                                Err(e) => state.set_error(e.to_string()),
                            }
                        }
                    }
                    Action::None => {}
                }
            }
            AppEvent::Mouse(mouse) => {
                let height = list_area_height(terminal);
                if let Some(line) = input::clicked_list_line(mouse, app::HEADER_HEIGHT, height) {
                    let request = state.click_line(line, height as usize);
                    spawn_detail_request(request, source, tx);
                }
            }
            AppEvent::Tick => {
                if last_tick.elapsed() >= Duration::from_millis(100) {
                    state.advance_spinner();
                    last_tick = Instant::now();
                }
            }
            AppEvent::ListResult { generation, result } => {
                state.apply_list_result(generation, result);
            }
            AppEvent::DetailResult { request, result } => {
                state.apply_detail(&request, result);
            }
            AppEvent::Error(e) => state.set_error(e),
        }

        if state.should_quit {
            break;
        }
    }

    events.stop();
    Ok(())
}
