//! Session guard and the persisted key-value store it reads from.
//!
//! The login flow writes two keys: `token` (the bearer credential) and `user`
//! (a JSON object with at least `id` and `username` or `name`). This crate
//! only ever reads them.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ListingError, Result};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// Read access to the persisted key-value store.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
}

/// In-memory store, used by tests and embedders that already hold the values.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.entries.insert(key.to_string(), value.into());
        self
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }
}

/// Store backed by a JSON object file of string values.
///
/// A missing file reads as an empty store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entries: HashMap<String, Value> = serde_json::from_str(&raw)?;
        Ok(entries.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            // A user object stored without the usual stringify step
            other => other.to_string(),
        }))
    }
}

/// Profile of the logged-in seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Whatever the login API returned: usually a number, sometimes a string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SessionUser {
    /// Name to greet the seller with.
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.name.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or("seller")
    }
}

/// Token plus profile, used to authorize API calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
}

impl Session {
    pub fn new(token: impl Into<String>, user: SessionUser) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    /// Read the session from the store.
    ///
    /// Fails with [`ListingError::SessionMissing`] when the token is absent or
    /// empty, or when the user record is absent or not a JSON object.
    pub fn load(store: &dyn SessionStore) -> Result<Self> {
        let token = store
            .get(TOKEN_KEY)?
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ListingError::SessionMissing("no token".to_string()))?;

        let raw_user = store
            .get(USER_KEY)?
            .ok_or_else(|| ListingError::SessionMissing("no user record".to_string()))?;

        let user: SessionUser = match serde_json::from_str::<Value>(&raw_user) {
            Ok(value @ Value::Object(_)) => serde_json::from_value(value).map_err(|e| {
                ListingError::SessionMissing(format!("unparsable user record: {e}"))
            })?,
            Ok(_) => {
                return Err(ListingError::SessionMissing(
                    "user record is not an object".to_string(),
                ));
            }
            Err(e) => {
                return Err(ListingError::SessionMissing(format!(
                    "unparsable user record: {e}"
                )));
            }
        };

        tracing::debug!(user = %user.display_name(), "Session loaded");
        Ok(Self { token, user })
    }
}
