//! Authentication session.
//!
//! A [`Session`] is created once at startup, replaced after a successful
//! login and cleared on logout. It is handed to [`crate::client::TourneyApi`]
//! explicitly; nothing reads it from global state.

use crate::User;
use crate::client::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<User>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(token: impl Into<String>, user: Option<User>) -> Self {
        Self { token: Some(token.into()), user }
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer().is_some()
    }

    /// Token for the `Authorization: Bearer` header, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn display_name(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.username.as_str())
    }
}

/// Persists a [`Session`] as JSON on disk.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_CONFIG_HOME/tourney/session.json`, falling back to
    /// `$HOME/.config/tourney/session.json` and then the working directory.
    pub fn default_path() -> PathBuf {
        if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME")
            && !config_dir.trim().is_empty()
        {
            return PathBuf::from(config_dir).join("tourney").join("session.json");
        }
        if let Ok(home) = std::env::var("HOME")
            && !home.trim().is_empty()
        {
            return PathBuf::from(home).join(".config").join("tourney").join("session.json");
        }
        PathBuf::from("tourney-session.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session. A missing file is an anonymous session.
    pub fn load(&self) -> ApiResult<Session> {
        if !self.path.exists() {
            return Ok(Session::anonymous());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ApiError::Other(format!("read session {} failed: {e}", self.path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| ApiError::Other(format!("invalid session file {}: {e}", self.path.display())))
    }

    pub fn save(&self, session: &Session) -> ApiResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| ApiError::Other(format!("create dir failed: {e}")))?;
        }
        let payload = serde_json::to_string_pretty(session)
            .map_err(|e| ApiError::Other(format!("serialize session failed: {e}")))?;
        std::fs::write(&self.path, payload)
            .map_err(|e| ApiError::Other(format!("write session failed: {e}")))
    }

    /// Forget the stored session. Clearing an absent session is not an error.
    pub fn clear(&self) -> ApiResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::Other(format!("remove session failed: {e}"))),
        }
    }
}
