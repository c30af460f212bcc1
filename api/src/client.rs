use crate::session::Session;
use crate::wire::{
    LoginRequest, LoginResponse, WireBracket, WireMatch, WireParticipant, WireTournament,
    WireTournamentBundle,
};
use crate::{Match, Participant, ParticipantRef, Tournament, TournamentView};
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080/api";
const DEMO_TOURNAMENT_JSON: &str = include_str!("../demo_tournament.json");

/// Client for the tournament platform's REST API.
///
/// The session is fixed at construction. `tourney login` builds its own
/// anonymous client; the viewer builds one from the stored session.
#[derive(Debug, Clone)]
pub struct TourneyApi {
    client: Client,
    base_url: String,
    timeout: Duration,
    session: Session,
}

impl Default for TourneyApi {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, Session::anonymous())
    }
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Api(reqwest::Error, String),
    Parsing(reqwest::Error, String),
    Unauthorized(String),
    NotFound(String),
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api(e, url) => write!(f, "API error for {url}: {e}"),
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::Unauthorized(url) => write!(f, "Not authorized for {url}; try `tourney login`"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// True when the server could not be reached or failed on its side.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Network(..) | ApiError::Api(..))
    }
}

impl TourneyApi {
    pub fn new(base_url: impl Into<String>, session: Session) -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("tourney/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            timeout: Duration::from_secs(10),
            session,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn fetch_tournaments(&self) -> ApiResult<Vec<Tournament>> {
        let raw: Vec<WireTournament> = self.get("tournaments").await?;
        Ok(raw.into_iter().map(Tournament::from).collect())
    }

    pub async fn fetch_tournament(&self, tournament_id: &str) -> ApiResult<Tournament> {
        let raw: WireTournament = self.get(&format!("tournaments/{tournament_id}")).await?;
        Ok(raw.into())
    }

    pub async fn fetch_matches(&self, tournament_id: &str) -> ApiResult<Vec<Match>> {
        let raw: Vec<WireMatch> = self.get(&format!("tournaments/{tournament_id}/matches")).await?;
        Ok(raw.into_iter().map(Match::from).collect())
    }

    /// Bracket descriptor of a tournament. `None` when the tournament has no bracket yet.
    pub async fn fetch_bracket(&self, tournament_id: &str) -> ApiResult<Option<crate::Bracket>> {
        match self.get::<WireBracket>(&format!("tournaments/{tournament_id}/bracket")).await {
            Ok(raw) => Ok(Some(raw.into())),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn fetch_participant(&self, participant_id: &str) -> ApiResult<Participant> {
        let raw: WireParticipant = self.get(&format!("participants/{participant_id}")).await?;
        Ok(raw.into())
    }

    /// Exchange credentials for a token. The caller decides whether to keep
    /// the returned session (see [`crate::session::SessionStore`]).
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<Session> {
        let url = self.url("auth/login");
        let request = self.client.post(&url).json(&LoginRequest { username, password });
        let raw: LoginResponse = self.send(request, &url).await?;
        if raw.token.trim().is_empty() {
            return Err(ApiError::Other(format!("login response from {url} carried no token")));
        }
        Ok(Session::authenticated(raw.token, raw.user))
    }

    /// Load everything needed to display one tournament.
    ///
    /// Participants known only by id are resolved by name. When the server
    /// cannot be reached the embedded demo tournament is returned instead,
    /// flagged with `is_demo`.
    pub async fn load_tournament_view(&self, tournament_id: &str) -> ApiResult<TournamentView> {
        match self.fetch_view(tournament_id).await {
            Ok(mut view) => {
                self.resolve_participants(&mut view.matches).await;
                Ok(view)
            }
            Err(e) if e.is_transport() => {
                warn!("loading tournament {tournament_id} failed, using demo data: {e}");
                load_demo_view()
            }
            Err(e) => Err(e),
        }
    }

    /// Re-fetch the match list of a tournament, resolving participant names.
    pub async fn refresh_matches(&self, tournament_id: &str) -> ApiResult<Vec<Match>> {
        let mut matches = self.fetch_matches(tournament_id).await?;
        self.resolve_participants(&mut matches).await;
        Ok(matches)
    }

    /// Replace [`ParticipantRef::Id`] entries with resolved participants.
    /// Each distinct id is looked up once; failed lookups leave the raw id.
    pub async fn resolve_participants(&self, matches: &mut [Match]) {
        let mut pending: Vec<String> = matches
            .iter()
            .flat_map(|m| m.participants.iter())
            .filter(|s| !s.participant.is_resolved() && !s.participant.id().is_empty())
            .map(|s| s.participant.id().to_owned())
            .collect();
        pending.sort();
        pending.dedup();

        let mut resolved: HashMap<String, Participant> = HashMap::new();
        for id in pending {
            match self.fetch_participant(&id).await {
                Ok(participant) => {
                    resolved.insert(id, participant);
                }
                Err(e) => debug!("participant {id} left unresolved: {e}"),
            }
        }

        for slot in matches.iter_mut().flat_map(|m| m.participants.iter_mut()) {
            if let Some(p) = resolved.get(slot.participant.id()) {
                slot.participant = ParticipantRef::Resolved(p.clone());
            }
        }
    }

    async fn fetch_view(&self, tournament_id: &str) -> ApiResult<TournamentView> {
        let tournament = self.fetch_tournament(tournament_id).await?;
        let bracket = self.fetch_bracket(tournament_id).await?;
        let matches = self.fetch_matches(tournament_id).await?;
        Ok(TournamentView { tournament, bracket, matches, is_demo: false })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.url(path);
        let request = self.client.get(&url);
        self.send(request, &url).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, url: &str) -> ApiResult<T> {
        let request = match self.session.bearer() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(ApiError::NotFound(url.to_owned())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ApiError::Unauthorized(url.to_owned()));
            }
            _ => {}
        }

        match response.error_for_status() {
            Ok(res) => res
                .json::<T>()
                .await
                .map_err(|e| ApiError::Parsing(e, url.to_owned())),
            Err(e) => Err(ApiError::Api(e, url.to_owned())),
        }
    }
}

/// The embedded demo tournament shown when the server is unreachable.
pub fn load_demo_view() -> ApiResult<TournamentView> {
    let raw: WireTournamentBundle = serde_json::from_str(DEMO_TOURNAMENT_JSON)
        .map_err(|e| ApiError::Other(format!("invalid embedded demo tournament json: {e}")))?;
    Ok(TournamentView {
        tournament: raw.tournament.into(),
        bracket: raw.bracket.map(Into::into),
        matches: raw.matches.into_iter().map(Match::from).collect(),
        is_demo: true,
    })
}
