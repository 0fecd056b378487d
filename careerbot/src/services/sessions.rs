use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::models::Turn;

/// In-process dialogue state for one chat session.
#[derive(Debug)]
pub struct ConversationState {
    pub session_id: String,
    pub owner_id: String,
    /// Persisted chat row, created on the first turn.
    pub chat_id: Option<String>,
    pub turns: Vec<Turn>,
    last_active: Instant,
}

impl ConversationState {
    fn new(session_id: String, owner_id: &str) -> Self {
        Self {
            session_id,
            owner_id: owner_id.to_string(),
            chat_id: None,
            turns: Vec::new(),
            last_active: Instant::now(),
        }
    }

    pub fn push_turn(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn last_active(&self) -> Instant {
        self.last_active
    }
}

/// Shared handle to a session. Holding the lock serializes turns.
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    state: Arc<Mutex<ConversationState>>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn lock(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().await
    }
}

/// Registry of live chat sessions.
///
/// The map lock is only held to look up, insert or remove entries; each
/// session has its own async mutex, so different sessions never block each
/// other.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Mutex<ConversationState>>>>,
    idle_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    pub fn create_session(&self, owner_id: &str) -> SessionHandle {
        let id = uuid::Uuid::new_v4().to_string();
        let state = Arc::new(Mutex::new(ConversationState::new(id.clone(), owner_id)));

        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), Arc::clone(&state));

        debug!(session_id = %id, owner_id, "Session created");
        SessionHandle { id, state }
    }

    pub fn get_session(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .map(|state| SessionHandle {
                id: session_id.to_string(),
                state: Arc::clone(state),
            })
    }

    /// Returns false when the session did not exist.
    pub fn expire_session(&self, session_id: &str) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
            .is_some();
        if removed {
            debug!(session_id, "Session expired");
        }
        removed
    }

    /// Drop sessions idle for longer than the TTL as of `now`. Sessions in
    /// the middle of a turn are kept.
    pub fn expire_idle(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, state| match state.try_lock() {
            Ok(state) => now.saturating_duration_since(state.last_active) < self.idle_ttl,
            Err(_) => true,
        });
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Periodically expires idle sessions.
#[derive(Clone)]
pub struct SessionSweeper {
    registry: Arc<SessionRegistry>,
    interval_secs: u64,
}

impl SessionSweeper {
    pub fn new(registry: Arc<SessionRegistry>, interval_secs: u64) -> Self {
        Self {
            registry,
            interval_secs,
        }
    }

    pub fn run_once(&self) -> usize {
        let expired = self.registry.expire_idle(Instant::now());
        if expired > 0 {
            info!(expired, remaining = self.registry.len(), "Expired idle chat sessions");
        }
        expired
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(n: usize) -> Turn {
        Turn {
            user: format!("question {n}"),
            assistant: format!("answer {n}"),
        }
    }

    #[tokio::test]
    async fn test_create_get_expire() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let handle = registry.create_session("u1");

        let found = registry.get_session(handle.id()).expect("session exists");
        assert_eq!(found.lock().await.owner_id, "u1");
        assert_eq!(registry.len(), 1);

        assert!(registry.expire_session(handle.id()));
        assert!(!registry.expire_session(handle.id()));
        assert!(registry.get_session(handle.id()).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_handles_share_state() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let handle = registry.create_session("u1");
        handle.lock().await.push_turn(turn(1));

        let again = registry.get_session(handle.id()).unwrap();
        assert_eq!(again.lock().await.turns, vec![turn(1)]);
    }

    #[tokio::test]
    async fn test_same_session_turns_are_serialized() {
        let registry = Arc::new(SessionRegistry::new(Duration::from_secs(60)));
        let id = registry.create_session("u1").id().to_string();

        let mut tasks = Vec::new();
        for n in 0..16 {
            let registry = Arc::clone(&registry);
            let id = id.clone();
            tasks.push(tokio::spawn(async move {
                let handle = registry.get_session(&id).unwrap();
                let mut state = handle.lock().await;
                // read-modify-append across an await point
                let seen = state.turns.len();
                tokio::task::yield_now().await;
                assert_eq!(state.turns.len(), seen);
                state.push_turn(turn(n));
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let handle = registry.get_session(&id).unwrap();
        assert_eq!(handle.lock().await.turns.len(), 16);
    }

    #[tokio::test]
    async fn test_different_sessions_do_not_block() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let a = registry.create_session("u1");
        let b = registry.create_session("u1");

        let _held = a.lock().await;
        let state = tokio::time::timeout(Duration::from_millis(100), b.lock())
            .await
            .expect("other session is free");
        assert!(state.turns.is_empty());
    }

    #[tokio::test]
    async fn test_expire_idle_keeps_active_and_locked_sessions() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let idle = registry.create_session("u1");
        let busy = registry.create_session("u2");
        let fresh = registry.create_session("u3");

        let later = Instant::now() + Duration::from_secs(120);
        fresh.lock().await.last_active = later;
        let _guard = busy.lock().await;

        assert_eq!(registry.expire_idle(later), 1);
        assert!(registry.get_session(idle.id()).is_none());
        assert!(registry.get_session(busy.id()).is_some());
        assert!(registry.get_session(fresh.id()).is_some());
    }

    #[test]
    fn test_sweeper_without_idle_sessions() {
        let registry = Arc::new(SessionRegistry::new(Duration::from_secs(60)));
        registry.create_session("u1");
        let sweeper = SessionSweeper::new(Arc::clone(&registry), 300);

        assert_eq!(sweeper.run_once(), 0);
        assert_eq!(sweeper.interval_secs(), 300);
        assert_eq!(registry.len(), 1);
    }
}
