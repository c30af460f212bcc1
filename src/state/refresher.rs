use crate::state::messages::NetworkRequest;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Periodic match refresh for the open tournament.
/// Tournament metadata and the bracket descriptor are only loaded on demand.
pub struct PeriodicRefresher {
    network_requests: mpsc::Sender<NetworkRequest>,
    period: Duration,
}

impl PeriodicRefresher {
    pub fn new(network_requests: mpsc::Sender<NetworkRequest>, period: Duration) -> Self {
        Self { network_requests, period }
    }

    pub async fn run(self) {
        let mut matches_interval = interval(self.period);
        // Skip the immediate first tick so startup loading isn't double-triggered.
        matches_interval.tick().await;

        loop {
            matches_interval.tick().await;
            if self
                .network_requests
                .send(NetworkRequest::RefreshMatches)
                .await
                .is_err()
            {
                break;
            }
        }
    }
}
