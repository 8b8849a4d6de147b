//! Registry of live sessions for transports that multiplex many clients.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use mcp_wire::HandshakeConfig;

use crate::dispatch::Dispatcher;
use crate::handlers::HandlerRegistry;

struct SessionEntry {
    dispatcher: Arc<Mutex<Dispatcher>>,
    opened_at: DateTime<Utc>,
}

/// Live sessions keyed by id. Each session sits behind its own mutex, so
/// one session is never processed concurrently while distinct sessions run
/// in parallel.
pub struct SessionRegistry {
    config: Arc<HandshakeConfig>,
    handlers: Arc<HandlerRegistry>,
    sessions: HashMap<String, SessionEntry>,
}

impl SessionRegistry {
    pub fn new(config: Arc<HandshakeConfig>, handlers: Arc<HandlerRegistry>) -> Self {
        Self {
            config,
            handlers,
            sessions: HashMap::new(),
        }
    }

    /// A fresh, unregistered dispatcher with a new random session id.
    pub fn create(&self) -> Dispatcher {
        Dispatcher::new(
            uuid::Uuid::new_v4().to_string(),
            self.config.clone(),
            self.handlers.clone(),
        )
    }

    /// Register `dispatcher` under its session id.
    pub fn insert(&mut self, dispatcher: Dispatcher) -> Arc<Mutex<Dispatcher>> {
        let id = dispatcher.session().id().to_string();
        let dispatcher = Arc::new(Mutex::new(dispatcher));
        tracing::info!("Opened session {id}");
        self.sessions.insert(
            id,
            SessionEntry {
                dispatcher: dispatcher.clone(),
                opened_at: Utc::now(),
            },
        );
        dispatcher
    }

    pub fn get(&self, id: &str) -> Option<Arc<Mutex<Dispatcher>>> {
        self.sessions.get(id).map(|e| e.dispatcher.clone())
    }

    pub fn opened_at(&self, id: &str) -> Option<DateTime<Utc>> {
        self.sessions.get(id).map(|e| e.opened_at)
    }

    /// Drop a session from the registry. The caller closes it.
    pub fn remove(&mut self, id: &str) -> Option<Arc<Mutex<Dispatcher>>> {
        let entry = self.sessions.remove(id)?;
        let lifetime = Utc::now() - entry.opened_at;
        tracing::info!(
            "Removed session {id} after {}s",
            lifetime.num_seconds()
        );
        Some(entry.dispatcher)
    }

    /// Number of live sessions.
    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}
