use log::LevelFilter;
use std::str::FromStr;
use std::time::Duration;
use tourney_api::bracket::DEFAULT_MAX_DEPTH;
use tourney_api::client::DEFAULT_BASE_URL;

const DEFAULT_CHAT_WS: &str = "ws://127.0.0.1:8787";
const DEFAULT_CHAT_ROOM: &str = "lobby";
const DEFAULT_REFRESH_SECS: u64 = 30;

/// Runtime configuration, read from `TOURNEY_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub full_screen: bool,
    pub log_level: Option<LevelFilter>,
    pub api_url: String,
    /// Overrides the token of the stored session.
    pub token: Option<String>,
    pub chat_endpoint: String,
    pub chat_room: String,
    pub max_depth: usize,
    pub refresh_interval: Duration,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            full_screen: false,
            log_level: None,
            api_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            chat_endpoint: DEFAULT_CHAT_WS.to_string(),
            chat_room: DEFAULT_CHAT_ROOM.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
        }
    }
}

impl AppSettings {
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            full_screen: false,
            log_level: var("TOURNEY_LOG_LEVEL").and_then(|v| LevelFilter::from_str(&v).ok()),
            api_url: var("TOURNEY_API_URL").unwrap_or(defaults.api_url),
            token: var("TOURNEY_TOKEN"),
            chat_endpoint: var("TOURNEY_CHAT_WS").unwrap_or(defaults.chat_endpoint),
            chat_room: var("TOURNEY_CHAT_ROOM").unwrap_or(defaults.chat_room),
            max_depth: var("TOURNEY_MAX_DEPTH")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_depth),
            refresh_interval: var("TOURNEY_REFRESH_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.refresh_interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> AppSettings {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppSettings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let s = settings(&[]);
        assert_eq!(s.api_url, DEFAULT_BASE_URL);
        assert_eq!(s.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(s.refresh_interval, Duration::from_secs(30));
        assert!(s.token.is_none());
        assert!(s.log_level.is_none());
    }

    #[test]
    fn environment_overrides() {
        let s = settings(&[
            ("TOURNEY_API_URL", "https://arena.example.org/api"),
            ("TOURNEY_TOKEN", "abc"),
            ("TOURNEY_MAX_DEPTH", "12"),
            ("TOURNEY_REFRESH_SECS", "5"),
            ("TOURNEY_LOG_LEVEL", "debug"),
            ("TOURNEY_CHAT_ROOM", "finals"),
        ]);
        assert_eq!(s.api_url, "https://arena.example.org/api");
        assert_eq!(s.token.as_deref(), Some("abc"));
        assert_eq!(s.max_depth, 12);
        assert_eq!(s.refresh_interval, Duration::from_secs(5));
        assert_eq!(s.log_level, Some(LevelFilter::Debug));
        assert_eq!(s.chat_room, "finals");
    }

    #[test]
    fn garbage_values_fall_back() {
        let s = settings(&[
            ("TOURNEY_MAX_DEPTH", "deep"),
            ("TOURNEY_REFRESH_SECS", "0"),
            ("TOURNEY_TOKEN", "   "),
        ]);
        assert_eq!(s.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(s.refresh_interval, Duration::from_secs(30));
        assert!(s.token.is_none());
    }
}
