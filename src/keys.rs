use crate::app::{App, MenuItem};
use crate::state::chat::ChatCommand;
use crate::state::messages::NetworkRequest;
use crossterm::event::KeyCode::Char;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

pub async fn handle_key_bindings(
    key_event: KeyEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    chat_commands: &mpsc::Sender<ChatCommand>,
) {
    let mut guard = app.lock().await;

    // Compose mode swallows every key except Enter/Esc.
    if guard.state.active_tab == MenuItem::Chat && guard.state.chat.composing {
        match key_event.code {
            KeyCode::Enter => {
                if let Some(message) = guard.state.chat.submit_input() {
                    drop(guard);
                    let _ = chat_commands
                        .send(ChatCommand::Send { body: message.body, message_id: message.id })
                        .await;
                }
            }
            KeyCode::Esc => {
                guard.state.chat.composing = false;
                guard.state.chat.input.clear();
            }
            KeyCode::Backspace => {
                guard.state.chat.input.pop();
            }
            Char(c) => guard.state.chat.input.push(c),
            _ => {}
        }
        return;
    }

    match (guard.state.active_tab, key_event.code, key_event.modifiers) {
        // Quit
        (_, Char('q'), _) | (_, Char('c'), KeyModifiers::CONTROL) => {
            crate::cleanup_terminal();
            std::process::exit(0);
        }

        // Tab switching
        (_, Char('1'), _) => guard.update_tab(MenuItem::Tournaments),
        (_, Char('2'), _) => guard.update_tab(MenuItem::Bracket),
        (_, Char('3'), _) => guard.update_tab(MenuItem::Matches),
        (_, Char('4'), _) => guard.update_tab(MenuItem::Chat),
        (_, Char('?'), _) => guard.update_tab(MenuItem::Help),
        (MenuItem::Help, KeyCode::Esc, _) => guard.exit_help(),

        // Tournament list
        (MenuItem::Tournaments, Char('j') | KeyCode::Down, _) => guard.state.tournaments.select_next(),
        (MenuItem::Tournaments, Char('k') | KeyCode::Up, _) => guard.state.tournaments.select_prev(),
        (MenuItem::Tournaments, Char('r'), _) => {
            drop(guard);
            let _ = network_requests.send(NetworkRequest::LoadTournaments).await;
        }
        (MenuItem::Tournaments, KeyCode::Enter, _) => {
            if let Some(tournament_id) = guard.state.tournaments.selected_id() {
                drop(guard);
                let _ = network_requests
                    .send(NetworkRequest::LoadTournament { tournament_id })
                    .await;
            }
        }

        // Bracket navigation
        (MenuItem::Bracket, Char('l') | KeyCode::Right, _) => guard.state.bracket.navigate_round_next(),
        (MenuItem::Bracket, Char('h') | KeyCode::Left, _) => guard.state.bracket.navigate_round_prev(),
        (MenuItem::Bracket, Char('j') | KeyCode::Down, _) => guard.state.bracket.navigate_match_down(),
        (MenuItem::Bracket, Char('k') | KeyCode::Up, _) => guard.state.bracket.navigate_match_up(),
        (MenuItem::Bracket | MenuItem::Matches, Char('r'), _) => {
            drop(guard);
            let _ = network_requests.send(NetworkRequest::RefreshMatches).await;
        }

        // Match list navigation
        (MenuItem::Matches, Char('j') | KeyCode::Down, _) => guard.match_list_down(),
        (MenuItem::Matches, Char('k') | KeyCode::Up, _) => guard.match_list_up(),

        // Chat
        (MenuItem::Chat, Char('i') | KeyCode::Enter, _) => guard.state.chat.composing = true,
        (MenuItem::Chat, Char('k') | KeyCode::Up, _) => {
            guard.state.chat.scroll_offset = guard.state.chat.scroll_offset.saturating_add(1);
        }
        (MenuItem::Chat, Char('j') | KeyCode::Down, _) => {
            guard.state.chat.scroll_offset = guard.state.chat.scroll_offset.saturating_sub(1);
        }

        // Global
        (_, Char('f'), _) => guard.toggle_full_screen(),
        (_, Char('"'), _) => guard.toggle_show_logs(),

        _ => {}
    }
}
