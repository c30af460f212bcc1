use crate::state::network::LoadingState;
use crossterm::event::KeyEvent;
use tourney_api::{Match, Tournament, TournamentView};

#[derive(Debug, Clone)]
pub enum NetworkRequest {
    LoadTournaments,
    LoadTournament { tournament_id: String },
    /// Re-fetch matches of the tournament currently open, if any.
    RefreshMatches,
}

#[derive(Debug)]
pub enum NetworkResponse {
    LoadingStateChanged { loading_state: LoadingState },
    TournamentsLoaded { tournaments: Vec<Tournament> },
    TournamentLoaded { view: TournamentView },
    MatchesUpdated { tournament_id: String, matches: Vec<Match> },
    Error { message: String },
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    KeyPressed(KeyEvent),
    Resize,
    AppStarted,
}
