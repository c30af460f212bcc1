use crate::state::messages::{NetworkRequest, NetworkResponse};
use log::{debug, error};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tourney_api::client::{ApiError, TourneyApi};

const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
pub const ERROR_CHAR: char = '!';

#[derive(Debug, Copy, Clone)]
pub struct LoadingState {
    pub is_loading: bool,
    pub spinner_char: char,
}

impl Default for LoadingState {
    fn default() -> Self {
        Self { is_loading: false, spinner_char: ' ' }
    }
}

pub struct NetworkWorker {
    client: TourneyApi,
    requests: mpsc::Receiver<NetworkRequest>,
    responses: mpsc::Sender<NetworkResponse>,
    is_loading: Arc<AtomicBool>,
    /// Tournament whose matches the periodic refresh re-fetches.
    /// None until a tournament loads, and while the demo data is shown.
    open_tournament: Option<String>,
}

impl NetworkWorker {
    pub fn new(
        client: TourneyApi,
        requests: mpsc::Receiver<NetworkRequest>,
        responses: mpsc::Sender<NetworkResponse>,
    ) -> Self {
        Self {
            client,
            requests,
            responses,
            is_loading: Arc::new(AtomicBool::new(false)),
            open_tournament: None,
        }
    }

    pub async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            if matches!(request, NetworkRequest::RefreshMatches) && self.open_tournament.is_none() {
                continue;
            }

            self.start_loading_animation().await;

            let result = match request {
                NetworkRequest::LoadTournaments => self.handle_load_tournaments().await,
                NetworkRequest::LoadTournament { tournament_id } => {
                    self.handle_load_tournament(tournament_id).await
                }
                NetworkRequest::RefreshMatches => self.handle_refresh_matches().await,
            };

            debug!("network request complete");
            self.stop_loading_animation(result.is_ok()).await;

            let response = result.unwrap_or_else(|err| NetworkResponse::Error {
                message: err.to_string(),
            });

            if let Err(e) = self.responses.send(response).await {
                error!("Failed to send network response: {e}");
                break;
            }
        }
    }

    async fn handle_load_tournaments(&self) -> Result<NetworkResponse, ApiError> {
        debug!("loading tournament list");
        let tournaments = self.client.fetch_tournaments().await?;
        Ok(NetworkResponse::TournamentsLoaded { tournaments })
    }

    async fn handle_load_tournament(&mut self, tournament_id: String) -> Result<NetworkResponse, ApiError> {
        debug!("loading tournament {tournament_id}");
        let view = self.client.load_tournament_view(&tournament_id).await?;
        self.open_tournament = if view.is_demo { None } else { Some(view.tournament.id.clone()) };
        Ok(NetworkResponse::TournamentLoaded { view })
    }

    async fn handle_refresh_matches(&self) -> Result<NetworkResponse, ApiError> {
        let Some(tournament_id) = self.open_tournament.clone() else {
            return Err(ApiError::Other("no tournament open".into()));
        };
        debug!("refreshing matches of {tournament_id}");
        let matches = self.client.refresh_matches(&tournament_id).await?;
        Ok(NetworkResponse::MatchesUpdated { tournament_id, matches })
    }

    async fn start_loading_animation(&self) {
        self.is_loading.store(true, Ordering::Relaxed);

        let mut loading_state =
            LoadingState { is_loading: true, spinner_char: SPINNER_CHARS[0] };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged { loading_state })
            .await;

        let responses = self.responses.clone();
        let is_loading = self.is_loading.clone();

        tokio::spawn(async move {
            let mut spinner_index = 1;
            let mut interval = tokio::time::interval(Duration::from_millis(33));
            loop {
                interval.tick().await;
                if !is_loading.load(Ordering::Relaxed) {
                    break;
                }
                loading_state.spinner_char = SPINNER_CHARS[spinner_index];
                spinner_index = (spinner_index + 1) % SPINNER_CHARS.len();
                let _ = responses
                    .send(NetworkResponse::LoadingStateChanged { loading_state })
                    .await;
            }
        });
    }

    async fn stop_loading_animation(&self, is_ok: bool) {
        self.is_loading.store(false, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(15)).await;

        let spinner_char = if is_ok { ' ' } else { ERROR_CHAR };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged {
                loading_state: LoadingState { is_loading: false, spinner_char },
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourney_api::session::Session;

    #[tokio::test]
    async fn refresh_without_open_tournament_is_ignored() {
        let (req_tx, req_rx) = mpsc::channel(4);
        let (resp_tx, mut resp_rx) = mpsc::channel(16);
        let worker = NetworkWorker::new(
            TourneyApi::new("http://127.0.0.1:1", Session::anonymous()),
            req_rx,
            resp_tx,
        );
        let task = tokio::spawn(worker.run());

        req_tx.send(NetworkRequest::RefreshMatches).await.unwrap();
        drop(req_tx);
        task.await.unwrap();

        assert!(resp_rx.recv().await.is_none(), "no response expected");
    }

    #[tokio::test]
    async fn unreachable_server_loads_demo_tournament() {
        let (req_tx, req_rx) = mpsc::channel(4);
        let (resp_tx, mut resp_rx) = mpsc::channel(256);
        let worker = NetworkWorker::new(
            TourneyApi::new("http://127.0.0.1:1", Session::anonymous())
                .with_timeout(Duration::from_secs(2)),
            req_rx,
            resp_tx,
        );
        let task = tokio::spawn(worker.run());

        req_tx
            .send(NetworkRequest::LoadTournament { tournament_id: "t1".into() })
            .await
            .unwrap();
        drop(req_tx);
        task.await.unwrap();

        let mut loaded = None;
        while let Ok(response) = resp_rx.try_recv() {
            if let NetworkResponse::TournamentLoaded { view } = response {
                loaded = Some(view);
            }
        }
        let view = loaded.expect("tournament should load from demo data");
        assert!(view.is_demo);
    }
}
