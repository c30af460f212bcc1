mod app;
mod components;
mod draw;
mod keys;
mod state;
mod ui;

use crate::app::App;
use crate::state::app_settings::AppSettings;
use crate::state::chat::{ChatCommand, ChatEvent, ChatWorker};
use crate::state::messages::{NetworkRequest, NetworkResponse, UiEvent};
use crate::state::network::{LoadingState, NetworkWorker};
use crate::state::refresher::PeriodicRefresher;
use anyhow::Context;
use crossterm::event::{self as crossterm_event, Event};
use crossterm::{cursor, execute, terminal};
use log::{error, info, warn};
use std::io::{BufRead, Stdout, Write};
use std::sync::Arc;
use std::{io, panic};
use tokio::sync::{Mutex, mpsc};
use tourney_api::client::TourneyApi;
use tourney_api::session::{Session, SessionStore};
use tui::{Terminal, backend::CrosstermBackend};

enum Command {
    Run { tournament_id: Option<String> },
    Login { username: String },
    Logout,
    Exit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = AppSettings::load();
    let store = SessionStore::new(SessionStore::default_path());

    let tournament_id = match parse_cli_args(std::env::args().skip(1)) {
        Command::Run { tournament_id } => tournament_id,
        Command::Login { username } => return login(&settings, &store, &username).await,
        Command::Logout => {
            store.clear().context("failed to remove stored session")?;
            println!("Logged out.");
            return Ok(());
        }
        Command::Exit => return Ok(()),
    };

    better_panic::install();

    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend)?;

    setup_panic_hook();
    setup_terminal()?;

    tui_logger::init_logger(log::LevelFilter::Debug)?;
    tui_logger::set_default_level(settings.log_level.unwrap_or(log::LevelFilter::Error));

    let session = load_session(&store, &settings);
    let client = TourneyApi::new(settings.api_url.clone(), session.clone());
    let refresh_interval = settings.refresh_interval;
    let app = Arc::new(Mutex::new(App::new(settings, session)));

    let (ui_event_tx, ui_event_rx) = mpsc::channel::<UiEvent>(100);
    let (network_req_tx, network_req_rx) = mpsc::channel::<NetworkRequest>(100);
    let (network_resp_tx, network_resp_rx) = mpsc::channel::<NetworkResponse>(100);
    let (chat_cmd_tx, chat_cmd_rx) = mpsc::channel::<ChatCommand>(100);
    let (chat_evt_tx, chat_evt_rx) = mpsc::channel::<ChatEvent>(100);

    // Input handler thread
    let input_handler = tokio::spawn(input_handler_task(ui_event_tx.clone()));

    // Network thread
    let network_worker = NetworkWorker::new(client, network_req_rx, network_resp_tx);
    let network_task = tokio::spawn(network_worker.run());

    // Chat thread
    let chat_worker = {
        let guard = app.lock().await;
        ChatWorker::new(
            guard.state.chat.endpoint.clone(),
            guard.state.chat.room.clone(),
            guard.state.chat.username.clone(),
            chat_cmd_rx,
            chat_evt_tx,
        )
    };
    let chat_task = tokio::spawn(chat_worker.run());

    // Periodic match refresh thread
    let periodic_updater = PeriodicRefresher::new(network_req_tx.clone(), refresh_interval);
    let periodic_task = tokio::spawn(periodic_updater.run());

    let _ = ui_event_tx.send(UiEvent::AppStarted).await;
    if let Some(tournament_id) = tournament_id {
        let _ = network_req_tx
            .send(NetworkRequest::LoadTournament { tournament_id })
            .await;
    }

    main_ui_loop(
        terminal,
        app,
        ui_event_rx,
        network_req_tx,
        network_resp_rx,
        chat_cmd_tx,
        chat_evt_rx,
    )
    .await;

    input_handler.abort();
    network_task.abort();
    chat_task.abort();
    periodic_task.abort();

    Ok(())
}

fn parse_cli_args(mut args: impl Iterator<Item = String>) -> Command {
    let Some(arg) = args.next() else {
        return Command::Run { tournament_id: None };
    };

    match arg.as_str() {
        "-h" | "--help" => {
            println!("{}", usage_text());
            Command::Exit
        }
        "-V" | "--version" => {
            println!("tourney {}", env!("CARGO_PKG_VERSION"));
            Command::Exit
        }
        "login" => match args.next() {
            Some(username) => Command::Login { username },
            None => {
                eprintln!("login requires a username\n\n{}", usage_text());
                std::process::exit(2);
            }
        },
        "logout" => Command::Logout,
        flag if flag.starts_with('-') => {
            eprintln!("Unknown argument: {arg}\n\n{}", usage_text());
            std::process::exit(2);
        }
        _ => Command::Run { tournament_id: Some(arg) },
    }
}

fn usage_text() -> &'static str {
    "tourney - tournament bracket terminal UI

Usage:
  tourney [TOURNAMENT_ID]
  tourney login <USERNAME>     (password is read from stdin)
  tourney logout
  tourney --help
  tourney --version

Environment:
  TOURNEY_API_URL       Tournament REST API base URL (default http://127.0.0.1:8080/api)
  TOURNEY_TOKEN         Bearer token, overrides the stored session
  TOURNEY_CHAT_WS       WebSocket chat relay URL (default ws://127.0.0.1:8787)
  TOURNEY_CHAT_ROOM     Chat room name (default lobby)
  TOURNEY_MAX_DEPTH     Maximum number of bracket rounds (default 10)
  TOURNEY_REFRESH_SECS  Match refresh period in seconds (default 30)
  TOURNEY_LOG_LEVEL     error, warn, info, debug or trace (default error)"
}

async fn login(settings: &AppSettings, store: &SessionStore, username: &str) -> anyhow::Result<()> {
    print!("Password for {username}: ");
    io::stdout().flush()?;
    let mut password = String::new();
    io::stdin().lock().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']);

    let client = TourneyApi::new(settings.api_url.clone(), Session::anonymous());
    let session = client
        .login(username, password)
        .await
        .with_context(|| format!("login to {} failed", settings.api_url))?;
    store
        .save(&session)
        .with_context(|| format!("failed to write {}", store.path().display()))?;

    println!(
        "Logged in as {}. Session saved to {}",
        session.display_name().unwrap_or(username),
        store.path().display()
    );
    Ok(())
}

/// The stored session, with its token replaced by `TOURNEY_TOKEN` when set.
fn load_session(store: &SessionStore, settings: &AppSettings) -> Session {
    let mut session = store.load().unwrap_or_else(|e| {
        warn!("ignoring unreadable session file: {e}");
        Session::anonymous()
    });
    if let Some(token) = settings.token.as_deref() {
        session.token = Some(token.to_string());
    }
    if session.is_authenticated() {
        info!("using session for {}", session.display_name().unwrap_or("token user"));
    }
    session
}

async fn main_ui_loop(
    mut terminal: Terminal<CrosstermBackend<Stdout>>,
    app: Arc<Mutex<App>>,
    mut ui_events: mpsc::Receiver<UiEvent>,
    network_requests: mpsc::Sender<NetworkRequest>,
    mut network_responses: mpsc::Receiver<NetworkResponse>,
    chat_commands: mpsc::Sender<ChatCommand>,
    mut chat_events: mpsc::Receiver<ChatEvent>,
) {
    let mut loading = LoadingState::default();

    loop {
        tokio::select! {
            Some(ui_event) = ui_events.recv() => {
                let should_redraw = handle_ui_event(ui_event, &app, &network_requests, &chat_commands).await;
                if should_redraw && !loading.is_loading {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(response) = network_responses.recv() => {
                let should_redraw = handle_network_response(response, &app, &mut loading).await;
                if should_redraw {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(chat_event) = chat_events.recv() => {
                let should_redraw = handle_chat_response(chat_event, &app).await;
                if should_redraw && !loading.is_loading {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }
        }
    }
}

async fn handle_ui_event(
    ui_event: UiEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    chat_commands: &mpsc::Sender<ChatCommand>,
) -> bool {
    match ui_event {
        UiEvent::AppStarted => {
            let _ = network_requests.send(NetworkRequest::LoadTournaments).await;
            true
        }
        UiEvent::KeyPressed(key_event) => {
            keys::handle_key_bindings(key_event, app, network_requests, chat_commands).await;
            true
        }
        UiEvent::Resize => true,
    }
}

async fn handle_chat_response(response: ChatEvent, app: &Arc<Mutex<App>>) -> bool {
    let mut guard = app.lock().await;
    match response {
        ChatEvent::Connected => guard.on_chat_connected(),
        ChatEvent::Disconnected => guard.on_chat_disconnected(),
        ChatEvent::Message(msg) => guard.on_chat_message(msg),
        ChatEvent::Error(message) => guard.on_chat_error(message),
    }
    true
}

async fn handle_network_response(
    response: NetworkResponse,
    app: &Arc<Mutex<App>>,
    loading: &mut LoadingState,
) -> bool {
    match response {
        NetworkResponse::LoadingStateChanged { loading_state } => {
            *loading = loading_state;
            return true;
        }
        NetworkResponse::TournamentsLoaded { tournaments } => {
            app.lock().await.on_tournaments_loaded(tournaments);
        }
        NetworkResponse::TournamentLoaded { view } => {
            app.lock().await.on_tournament_loaded(view);
        }
        NetworkResponse::MatchesUpdated { tournament_id, matches } => {
            app.lock().await.on_matches_updated(&tournament_id, matches);
        }
        NetworkResponse::Error { message } => {
            error!("Network error: {message}");
            app.lock().await.on_error(message);
        }
    }
    !loading.is_loading
}

async fn input_handler_task(ui_events: mpsc::Sender<UiEvent>) {
    loop {
        if let Ok(event) = crossterm_event::read() {
            let ui_event = match event {
                Event::Key(key_event) => Some(UiEvent::KeyPressed(key_event)),
                Event::Resize(_, _) => Some(UiEvent::Resize),
                _ => None,
            };

            if let Some(ui_event) = ui_event
                && ui_events.send(ui_event).await.is_err()
            {
                break;
            }
        }
    }
}

fn setup_terminal() -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, cursor::Hide)?;
    execute!(stdout, terminal::EnterAlternateScreen)?;
    execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
    terminal::enable_raw_mode()
}

pub fn cleanup_terminal() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, cursor::MoveTo(0, 0));
    let _ = execute!(stdout, terminal::Clear(terminal::ClearType::All));
    let _ = execute!(stdout, terminal::LeaveAlternateScreen);
    let _ = execute!(stdout, cursor::Show);
    let _ = terminal::disable_raw_mode();
}

fn setup_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        cleanup_terminal();
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));
}
