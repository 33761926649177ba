//! Session management: tracks per-caller conversation context.

pub mod in_memory;
pub mod traits;

use std::sync::Arc;

use crate::config::SessionsConfig;

pub use in_memory::InMemorySessionStore;
pub use traits::{HistoryUpdate, SessionKey, SessionStore};

/// Create the in-memory session store described by `[sessions]`.
pub fn create_session_store(config: &SessionsConfig) -> Arc<dyn SessionStore> {
    Arc::new(InMemorySessionStore::with_max_history(config.max_history))
}
