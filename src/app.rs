use crate::state::app_settings::AppSettings;
use crate::state::app_state::{AppState, BracketState, ChatMessage, ChatState};
use crate::state::chat::ChatWireMessage;
use tourney_api::bracket::BracketBuilder;
use tourney_api::session::Session;
use tourney_api::{Match, Tournament, TournamentView};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum MenuItem {
    #[default]
    Tournaments,
    Bracket,
    Matches,
    Chat,
    Help,
}

pub struct App {
    pub settings: AppSettings,
    pub session: Session,
    pub state: AppState,
}

impl App {
    pub fn new(settings: AppSettings, session: Session) -> Self {
        let username = session
            .display_name()
            .map(str::to_owned)
            .or_else(|| std::env::var("USER").ok().filter(|u| !u.trim().is_empty()))
            .unwrap_or_else(|| "guest".to_string());

        let state = AppState {
            bracket: BracketState::new(BracketBuilder::new(settings.max_depth)),
            chat: ChatState::new(settings.chat_endpoint.clone(), settings.chat_room.clone(), username),
            ..AppState::default()
        };

        if let Some(level) = settings.log_level {
            log::set_max_level(level);
            tui_logger::set_default_level(level);
        }

        Self { settings, session, state }
    }

    // -----------------------------------------------------------------------
    // Network response handlers, called from main_ui_loop
    // -----------------------------------------------------------------------

    pub fn on_tournaments_loaded(&mut self, tournaments: Vec<Tournament>) {
        self.state.last_error = None;
        self.state.tournaments.load(tournaments);
    }

    pub fn on_tournament_loaded(&mut self, view: TournamentView) {
        self.state.last_error = if view.is_demo {
            Some("Server unreachable: showing demo tournament".to_string())
        } else {
            None
        };
        self.state.bracket.load(view);
        self.state.match_list = Default::default();
        if self.state.active_tab == MenuItem::Tournaments {
            self.update_tab(MenuItem::Bracket);
        }
    }

    /// Ignores refreshes for a tournament that is no longer open.
    pub fn on_matches_updated(&mut self, tournament_id: &str, matches: Vec<Match>) {
        if self.state.bracket.tournament_id() == Some(tournament_id) {
            self.state.bracket.merge_matches(matches);
        }
    }

    pub fn on_error(&mut self, message: String) {
        self.state.last_error = Some(message);
    }

    // -----------------------------------------------------------------------
    // Tab management
    // -----------------------------------------------------------------------

    pub fn update_tab(&mut self, next: MenuItem) {
        if self.state.active_tab == next {
            return;
        }
        self.state.previous_tab = self.state.active_tab;
        self.state.active_tab = next;
        if self.state.active_tab == MenuItem::Chat {
            self.state.chat.scroll_offset = 0;
        }
    }

    pub fn exit_help(&mut self) {
        if self.state.active_tab == MenuItem::Help {
            self.state.active_tab = self.state.previous_tab;
        }
    }

    pub fn toggle_show_logs(&mut self) {
        self.state.show_logs = !self.state.show_logs;
    }

    pub fn toggle_full_screen(&mut self) {
        self.settings.full_screen = !self.settings.full_screen;
    }

    // -----------------------------------------------------------------------
    // Match list navigation
    // -----------------------------------------------------------------------

    pub fn match_list_down(&mut self) {
        let max = self.state.bracket.match_list().len().saturating_sub(1);
        let list = &mut self.state.match_list;
        list.selected = (list.selected + 1).min(max);
    }

    pub fn match_list_up(&mut self) {
        self.state.match_list.selected = self.state.match_list.selected.saturating_sub(1);
    }

    // -----------------------------------------------------------------------
    // Chat
    // -----------------------------------------------------------------------

    pub fn on_chat_connected(&mut self) {
        self.state.chat.connected = true;
        self.state
            .chat
            .push_system(format!("connected to {}", self.state.chat.endpoint));
    }

    pub fn on_chat_disconnected(&mut self) {
        if self.state.chat.connected {
            self.state.chat.push_system("chat disconnected, retrying...");
        }
        self.state.chat.connected = false;
    }

    pub fn on_chat_error(&mut self, message: String) {
        self.state.chat.push_system(format!("chat error: {message}"));
    }

    pub fn on_chat_message(&mut self, msg: ChatWireMessage) {
        self.state.chat.ingest_message(ChatMessage {
            id: msg.id,
            author: msg.author,
            body: msg.body,
            timestamp: msg.timestamp,
            is_system: false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourney_api::client::load_demo_view;

    fn app() -> App {
        App::new(AppSettings::default(), Session::anonymous())
    }

    #[test]
    fn loading_a_tournament_switches_to_bracket() {
        let mut app = app();
        app.on_tournament_loaded(load_demo_view().unwrap());
        assert_eq!(app.state.active_tab, MenuItem::Bracket);
        assert!(app.state.last_error.as_deref().unwrap().contains("demo"));
    }

    #[test]
    fn stale_refresh_is_ignored() {
        let mut app = app();
        app.on_tournament_loaded(load_demo_view().unwrap());
        app.on_matches_updated("some-other-tournament", vec![]);
        assert_eq!(app.state.bracket.rounds.len(), 3);
    }

    #[test]
    fn help_returns_to_previous_tab() {
        let mut app = app();
        app.update_tab(MenuItem::Matches);
        app.update_tab(MenuItem::Help);
        app.exit_help();
        assert_eq!(app.state.active_tab, MenuItem::Matches);
    }

    #[test]
    fn session_user_names_the_chat_author() {
        let session = Session::authenticated(
            "tok",
            Some(tourney_api::User { id: "u".into(), username: "referee".into(), email: None }),
        );
        let app = App::new(AppSettings::default(), session);
        assert_eq!(app.state.chat.username, "referee");
    }

    #[test]
    fn match_list_selection_is_clamped() {
        let mut app = app();
        app.on_tournament_loaded(load_demo_view().unwrap());
        for _ in 0..20 {
            app.match_list_down();
        }
        assert_eq!(app.state.match_list.selected, 6);
        app.match_list_up();
        assert_eq!(app.state.match_list.selected, 5);
    }
}
