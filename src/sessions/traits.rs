//! Session storage traits and types for conversation context tracking.

use async_trait::async_trait;
use std::fmt;

/// Caller-chosen key correlating a sequence of queries over time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    /// Wrap a raw session identifier. Empty identifiers are not session keys.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            None
        } else {
            Some(Self(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a single append observed and produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryUpdate {
    /// Last query recorded before this append (empty for a fresh session).
    pub previous: String,
    /// Full history after this append, newest last.
    pub history: Vec<String>,
}

/// In-process storage for per-session query histories.
///
/// `append` is the only mutating operation and must be atomic per key:
/// reading the previous entry and pushing the new one happen as one unit.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current history for a session, oldest first. Unknown keys yield an empty history.
    async fn history(&self, key: &SessionKey) -> Vec<String>;

    /// Append a query, creating the session on first use.
    async fn append(&self, key: &SessionKey, query: &str) -> HistoryUpdate;

    /// Number of sessions currently tracked.
    async fn session_count(&self) -> usize;

    /// The name of this session store implementation.
    fn name(&self) -> &str;
}
