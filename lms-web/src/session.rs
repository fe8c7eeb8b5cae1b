//! In-memory session store keyed by the `sessionid` cookie
//!
//! Sessions expire after a period without use and the table is capped; when
//! full, the least recently used session is evicted to make room.

use axum::http::{header::COOKIE, HeaderMap};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Cookie carrying the session id
pub const SESSION_COOKIE_NAME: &str = "sessionid";

/// Two weeks
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Key/value data of one session
pub type SessionData = HashMap<String, String>;

struct SessionEntry {
    data: SessionData,
    last_seen: Instant,
}

impl SessionEntry {
    fn new(now: Instant) -> Self {
        Self {
            data: SessionData::new(),
            last_seen: now,
        }
    }
}

/// Shared session table
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_SESSION_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose sessions expire after `ttl` idle, holding at most
    /// `max_sessions` (minimum 1)
    pub fn with_limits(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    fn is_live(&self, entry: &SessionEntry, now: Instant) -> bool {
        now.duration_since(entry.last_seen) < self.ttl
    }

    /// Reuse the session named by `requested` if it is live, else create one
    ///
    /// Expired sessions are purged first. Returns the session id and whether
    /// it was newly created.
    pub async fn resolve(&self, requested: Option<Uuid>) -> (Uuid, bool) {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, entry| self.is_live(entry, now));
        if sessions.len() < before {
            tracing::debug!(expired = before - sessions.len(), "Expired sessions removed");
        }

        if let Some(id) = requested {
            if let Some(entry) = sessions.get_mut(&id) {
                entry.last_seen = now;
                return (id, false);
            }
        }

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                }
                None => break,
            }
        }

        let id = Uuid::new_v4();
        sessions.insert(id, SessionEntry::new(now));
        (id, true)
    }

    /// Read one value from a live session
    pub async fn get(&self, id: Uuid, key: &str) -> Option<String> {
        let now = Instant::now();
        self.sessions
            .read()
            .await
            .get(&id)
            .filter(|entry| self.is_live(entry, now))
            .and_then(|entry| entry.data.get(key).cloned())
    }

    /// Run `f` against a session's data, creating the session if missing
    pub async fn update<F, R>(&self, id: Uuid, f: F) -> R
    where
        F: FnOnce(&mut SessionData) -> R,
    {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(id).or_insert_with(|| SessionEntry::new(now));
        entry.last_seen = now;
        f(&mut entry.data)
    }

    /// Number of stored sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Session id from the request's `Cookie` header, if present and well formed
pub fn extract_session_id(headers: &HeaderMap) -> Option<Uuid> {
    let cookies = headers.get(COOKIE)?.to_str().ok()?;

    // "name1=value1; name2=value2"
    cookies.split(';').find_map(|part| {
        let (name, value) = part.trim().split_once('=')?;
        if name == SESSION_COOKIE_NAME {
            Uuid::parse_str(value.trim()).ok()
        } else {
            None
        }
    })
}

/// `Set-Cookie` value for a session id
pub fn session_cookie(id: Uuid) -> String {
    format!("{SESSION_COOKIE_NAME}={id}; HttpOnly; SameSite=Lax; Path=/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_session_id() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("csrftoken=abc; sessionid={id}; theme=dark")).unwrap(),
        );
        assert_eq!(extract_session_id(&headers), Some(id));

        headers.insert(COOKIE, HeaderValue::from_static("sessionid=not-a-uuid"));
        assert_eq!(extract_session_id(&headers), None);

        assert_eq!(extract_session_id(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_resolve_reuses_known_session_only() {
        let store = SessionStore::new();
        let (first, created) = store.resolve(None).await;
        assert!(created);

        assert_eq!(store.resolve(Some(first)).await, (first, false));

        let (other, created) = store.resolve(Some(Uuid::new_v4())).await;
        assert!(created);
        assert_ne!(other, first);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_expired_sessions_are_purged() {
        let store = SessionStore::with_limits(Duration::from_millis(20), 100);
        let (stale, _) = store.resolve(None).await;
        store.resolve(None).await;
        assert_eq!(store.len().await, 2);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get(stale, "_language").await, None);

        let (fresh, created) = store.resolve(Some(stale)).await;
        assert!(created);
        assert_ne!(fresh, stale);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let store = SessionStore::with_limits(DEFAULT_SESSION_TTL, 2);
        let (first, _) = store.resolve(None).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        let (second, _) = store.resolve(None).await;
        tokio::time::sleep(Duration::from_millis(2)).await;

        // Touch the first so the second becomes least recently used
        assert_eq!(store.resolve(Some(first)).await, (first, false));
        tokio::time::sleep(Duration::from_millis(2)).await;

        let (third, created) = store.resolve(None).await;
        assert!(created);
        assert_eq!(store.len().await, 2);
        assert_eq!(store.resolve(Some(first)).await, (first, false));
        assert_eq!(store.resolve(Some(third)).await, (third, false));

        let (replacement, created) = store.resolve(Some(second)).await;
        assert!(created);
        assert_ne!(replacement, second);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_unknown_cookies_cannot_grow_store_past_cap() {
        let store = SessionStore::with_limits(DEFAULT_SESSION_TTL, 50);
        for i in 0..500 {
            let requested = if i % 2 == 0 { None } else { Some(Uuid::new_v4()) };
            store.resolve(requested).await;
        }
        assert_eq!(store.len().await, 50);
    }

    #[tokio::test]
    async fn test_update_and_get() {
        let store = SessionStore::new();
        let (id, _) = store.resolve(None).await;
        store
            .update(id, |data| data.insert("_language".to_string(), "fr".to_string()))
            .await;
        assert_eq!(store.get(id, "_language").await.as_deref(), Some("fr"));
        assert_eq!(store.get(id, "missing").await, None);
    }
}
