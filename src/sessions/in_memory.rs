//! In-memory session store implementation.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use super::traits::{HistoryUpdate, SessionKey, SessionStore};

/// An in-memory session store backed by a mutex-protected hash map.
///
/// Histories live for the process lifetime. When `max_history` is set, the
/// oldest queries of a session are dropped once the cap is exceeded.
pub struct InMemorySessionStore {
    histories: Mutex<HashMap<SessionKey, VecDeque<String>>>,
    max_history: Option<usize>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            histories: Mutex::new(HashMap::new()),
            max_history: None,
        }
    }

    /// Cap every session at `max_history` entries. Zero means unbounded.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            histories: Mutex::new(HashMap::new()),
            max_history: (max_history > 0).then_some(max_history),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn history(&self, key: &SessionKey) -> Vec<String> {
        let histories = self.histories.lock();
        histories
            .get(key)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn append(&self, key: &SessionKey, query: &str) -> HistoryUpdate {
        // Held across read-previous and push so concurrent appends serialize.
        let mut histories = self.histories.lock();
        let entries = histories.entry(key.clone()).or_default();

        let previous = entries.back().cloned().unwrap_or_default();
        entries.push_back(query.to_string());

        if let Some(max) = self.max_history {
            while entries.len() > max {
                entries.pop_front();
            }
        }

        HistoryUpdate {
            previous,
            history: entries.iter().cloned().collect(),
        }
    }

    async fn session_count(&self) -> usize {
        self.histories.lock().len()
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}
