use crate::app::MenuItem;
use chrono::Local;
use std::collections::HashSet;
use tourney_api::bracket::{BracketBuilder, display_order};
use tourney_api::{BracketRounds, GroupType, Match, Tournament, TournamentView};

/// Chat history kept in memory.
const CHAT_HISTORY_LIMIT: usize = 200;

// ---------------------------------------------------------------------------
// Tournament list state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct TournamentListState {
    pub items: Vec<Tournament>,
    pub selected: usize,
    pub loaded: bool,
}

impl TournamentListState {
    pub fn load(&mut self, items: Vec<Tournament>) {
        self.items = items;
        self.selected = self.selected.min(self.items.len().saturating_sub(1));
        self.loaded = true;
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.items.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected_id(&self) -> Option<String> {
        self.items.get(self.selected).map(|t| t.id.clone())
    }
}

// ---------------------------------------------------------------------------
// Bracket / tournament state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct BracketState {
    pub view: Option<TournamentView>,
    /// Derived from `view` on every load or refresh; never edited directly.
    pub rounds: BracketRounds,
    pub builder: BracketBuilder,
    pub selected_round: usize,
    pub selected_match: usize,
    /// Vertical scroll offset for when matches exceed terminal height.
    pub scroll_offset: u16,
}

impl BracketState {
    pub fn new(builder: BracketBuilder) -> Self {
        Self { builder, ..Self::default() }
    }

    /// Store a newly loaded tournament and jump to the live round.
    pub fn load(&mut self, view: TournamentView) {
        self.view = Some(view);
        self.rebuild();
        self.selected_round = detect_active_round(&self.rounds);
        self.selected_match = 0;
        self.scroll_offset = 0;
    }

    /// Apply a match refresh, keeping the selection where it was when possible.
    pub fn merge_matches(&mut self, matches: Vec<Match>) {
        let selected_id = self.selected_match().map(|m| m.id.clone());
        if let Some(view) = &mut self.view {
            view.merge_matches(matches);
        }
        self.rebuild();

        let found = selected_id.and_then(|id| {
            self.rounds.rounds.iter().enumerate().find_map(|(r, round)| {
                round.matches.iter().position(|m| m.id == id).map(|i| (r, i))
            })
        });
        match found {
            Some((round, index)) => {
                self.selected_round = round;
                self.selected_match = index;
            }
            None => self.clamp_selection(),
        }
    }

    pub fn tournament_id(&self) -> Option<&str> {
        self.view.as_ref().map(|v| v.tournament.id.as_str())
    }

    pub fn type_group(&self) -> Option<&GroupType> {
        self.view.as_ref()?.bracket.as_ref().map(|b| &b.type_group)
    }

    pub fn navigate_round_next(&mut self) {
        if self.selected_round + 1 < self.rounds.len() {
            self.selected_round += 1;
            self.selected_match = 0;
        }
    }

    pub fn navigate_round_prev(&mut self) {
        if self.selected_round > 0 {
            self.selected_round -= 1;
            self.selected_match = 0;
        }
    }

    pub fn navigate_match_down(&mut self) {
        let max = self.matches_in_round().saturating_sub(1);
        if self.selected_match < max {
            self.selected_match += 1;
        }
    }

    pub fn navigate_match_up(&mut self) {
        self.selected_match = self.selected_match.saturating_sub(1);
    }

    pub fn selected_match(&self) -> Option<&Match> {
        self.rounds
            .rounds
            .get(self.selected_round)?
            .matches
            .get(self.selected_match)
    }

    /// All matches of the open tournament in display order.
    pub fn match_list(&self) -> Vec<&Match> {
        let Some(view) = &self.view else {
            return Vec::new();
        };
        let mut matches: Vec<&Match> = view.matches.iter().collect();
        matches.sort_by(|a, b| display_order(a, b));
        matches
    }

    fn rebuild(&mut self) {
        self.rounds = match &self.view {
            Some(view) => match &view.bracket {
                Some(bracket) => self.builder.build(&view.bracket_matches(), &bracket.type_group),
                None => BracketRounds::default(),
            },
            None => BracketRounds::default(),
        };
    }

    fn matches_in_round(&self) -> usize {
        self.rounds
            .rounds
            .get(self.selected_round)
            .map(|r| r.matches.len())
            .unwrap_or(0)
    }

    fn clamp_selection(&mut self) {
        self.selected_round = self.selected_round.min(self.rounds.len().saturating_sub(1));
        self.selected_match = self.selected_match.min(self.matches_in_round().saturating_sub(1));
    }
}

/// The first round with a live match, or failing that the round after the
/// last one with a finished match.
fn detect_active_round(rounds: &BracketRounds) -> usize {
    use tourney_api::MatchStatus;

    let mut active = 0;
    for round in &rounds.rounds {
        if round.matches.iter().any(Match::is_live) {
            return round.index;
        }
        if round.matches.iter().any(|m| m.status == MatchStatus::Finished) {
            active = (round.index + 1).min(rounds.len().saturating_sub(1));
        }
    }
    active
}

// ---------------------------------------------------------------------------
// Match list state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MatchListState {
    pub selected: usize,
    pub scroll_offset: u16,
}

// ---------------------------------------------------------------------------
// Chat state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ChatMessage {
    pub id: String,
    pub author: String,
    pub body: String,
    pub timestamp: String,
    pub is_system: bool,
}

#[derive(Debug, Clone)]
pub struct OutboundChatMessage {
    pub id: String,
    pub body: String,
}

#[derive(Debug, Default)]
pub struct ChatState {
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub composing: bool,
    pub scroll_offset: u16,
    pub username: String,
    pub room: String,
    pub connected: bool,
    pub endpoint: String,
    seen_ids: HashSet<String>,
}

impl ChatState {
    pub fn new(endpoint: impl Into<String>, room: impl Into<String>, username: impl Into<String>) -> Self {
        let mut state = Self {
            endpoint: endpoint.into(),
            room: room.into(),
            username: username.into(),
            ..Self::default()
        };
        state.push_system("Chat starting... connecting to relay.");
        state
    }

    pub fn submit_input(&mut self) -> Option<OutboundChatMessage> {
        let msg = self.input.trim();
        if msg.is_empty() {
            self.composing = false;
            self.input.clear();
            return None;
        }
        let message = OutboundChatMessage {
            id: format!(
                "{}-{}",
                self.username,
                Local::now()
                    .timestamp_nanos_opt()
                    .unwrap_or_else(|| Local::now().timestamp_micros() * 1000)
            ),
            body: msg.to_string(),
        };
        self.ingest_message(ChatMessage {
            id: message.id.clone(),
            author: self.username.clone(),
            body: message.body.clone(),
            timestamp: Local::now().format("%H:%M").to_string(),
            is_system: false,
        });
        self.scroll_offset = 0;
        self.composing = false;
        self.input.clear();
        Some(message)
    }

    /// Append a message unless its id was already seen (our own messages
    /// come back from the relay).
    pub fn ingest_message(&mut self, msg: ChatMessage) {
        if !msg.id.is_empty() && !self.seen_ids.insert(msg.id.clone()) {
            return;
        }
        self.push_capped(msg);
    }

    pub fn push_system(&mut self, body: impl Into<String>) {
        let body = body.into();
        if let Some(last) = self.messages.last()
            && last.is_system
            && last.body == body
        {
            return;
        }
        self.push_capped(ChatMessage {
            id: String::new(),
            author: "system".to_string(),
            body,
            timestamp: Local::now().format("%H:%M").to_string(),
            is_system: true,
        });
    }

    /// Ids of dropped messages leave `seen_ids` with them.
    fn push_capped(&mut self, msg: ChatMessage) {
        self.messages.push(msg);
        if self.messages.len() > CHAT_HISTORY_LIMIT {
            let remove_count = self.messages.len() - CHAT_HISTORY_LIMIT;
            for dropped in self.messages.drain(0..remove_count) {
                self.seen_ids.remove(&dropped.id);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct AppState {
    pub active_tab: MenuItem,
    pub previous_tab: MenuItem,
    pub show_logs: bool,
    pub last_error: Option<String>,
    pub tournaments: TournamentListState,
    pub bracket: BracketState,
    pub match_list: MatchListState,
    pub chat: ChatState,
}
