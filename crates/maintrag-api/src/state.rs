use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use maintrag_core::models::ConversationContext;
use maintrag_retrieval::QueryPipeline;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// One conversation held by the server
#[derive(Debug)]
pub struct Session {
    pub context: ConversationContext,
    pub created_at: DateTime<Utc>,
}

impl Session {
    fn new() -> Self {
        Self {
            context: ConversationContext::new(),
            created_at: Utc::now(),
        }
    }
}

/// Conversation contexts keyed by session id
///
/// Each session sits behind its own mutex, so turns of one conversation run
/// one at a time while different sessions proceed independently.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh session
    pub async fn create(&self) -> (Uuid, DateTime<Utc>) {
        let id = Uuid::new_v4();
        let session = Session::new();
        let created_at = session.created_at;
        self.sessions.write().await.insert(id, Arc::new(Mutex::new(session)));
        (id, created_at)
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Drop a session; false when it did not exist
    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<QueryPipeline>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(pipeline: QueryPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            sessions: Arc::new(SessionStore::new()),
        }
    }
}
