//! Client configuration, resolved once at startup from the environment

use crate::db::HISTORY_KEY;
use crate::typing::TypingConfig;
use std::path::PathBuf;
use std::time::Duration;

const API_PATH: &str = "/api";

/// Fully-qualified URLs of the two remote operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub ask: String,
    pub tour: String,
}

impl Endpoints {
    /// Resolve endpoints from a base URL.
    ///
    /// Accepts the base with or without a trailing `/api`. A missing or blank
    /// base, or one that is only the bare `/api` suffix, means the API is not
    /// configured.
    pub fn resolve(base: Option<&str>) -> Option<Self> {
        let base = base?.trim().trim_end_matches('/');
        let base = base.strip_suffix(API_PATH).unwrap_or(base);
        if base.is_empty() {
            return None;
        }
        Some(Self {
            ask: format!("{base}{API_PATH}/ask"),
            tour: format!("{base}{API_PATH}/tour"),
        })
    }
}

/// Configuration for the chat client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: Option<String>,
    pub db_path: PathBuf,
    pub storage_key: String,
    pub typing: TypingConfig,
    /// Per-request timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("TOUR_CHAT_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".tour-chat").join("history.db")
            },
            PathBuf::from,
        );

        let defaults = TypingConfig::default();
        let typing = TypingConfig {
            base: millis(&lookup, "TOUR_CHAT_TYPING_BASE_MS").unwrap_or(defaults.base),
            per_char: millis(&lookup, "TOUR_CHAT_TYPING_PER_CHAR_MS").unwrap_or(defaults.per_char),
            max: millis(&lookup, "TOUR_CHAT_TYPING_MAX_MS").unwrap_or(defaults.max),
        };

        Self {
            api_base_url: lookup("TOUR_CHAT_API_URL").filter(|url| !url.trim().is_empty()),
            db_path,
            storage_key: lookup("TOUR_CHAT_STORAGE_KEY")
                .filter(|key| !key.is_empty())
                .unwrap_or_else(|| HISTORY_KEY.to_string()),
            typing,
            request_timeout: parse_u64(&lookup, "TOUR_CHAT_REQUEST_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }

    pub fn endpoints(&self) -> Option<Endpoints> {
        Endpoints::resolve(self.api_base_url.as_deref())
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable numeric setting");
            None
        }
    }
}

fn millis(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    parse_u64(lookup, key).map(Duration::from_millis)
}
