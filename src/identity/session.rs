use std::collections::HashMap;
use std::time::{Duration, Instant};

use base64::Engine;
use parking_lot::RwLock;
use tracing::debug;

use super::principal::Principal;

/// Opaque per-client session identifier carried in the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// 256-bit random token, base64url without padding. Fails rather than
    /// hand out a predictable id when the OS random source is unavailable.
    pub fn generate() -> Result<Self, getrandom::Error> {
        let mut buf = [0u8; 32];
        getrandom::getrandom(&mut buf)?;
        Ok(SessionId(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self { SessionId(s) }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self { SessionId(s.to_string()) }
}

/// Per-client session state. Holds at most one principal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    principal: Option<Principal>,
}

impl Session {
    pub fn anonymous() -> Self { Self::default() }

    pub fn principal(&self) -> Option<&Principal> { self.principal.as_ref() }

    pub fn is_authenticated(&self) -> bool { self.principal.is_some() }

    pub fn set_principal(&mut self, principal: Principal) { self.principal = Some(principal); }

    pub fn clear(&mut self) { self.principal = None; }
}

/// Backing store for sessions, keyed by client session id.
pub trait SessionStore: Send + Sync {
    fn create(&self, session: Session) -> Result<SessionId, getrandom::Error>;
    fn load(&self, id: &SessionId) -> Option<Session>;
    /// Returns false when the id is unknown or already expired.
    fn save(&self, id: &SessionId, session: Session) -> bool;
    fn destroy(&self, id: &SessionId) -> bool;
    fn sweep_expired(&self) -> usize;
}

#[derive(Debug)]
struct SessionEntry {
    session: Session,
    expires_at: Instant,
}

/// In-process session store with an idle timeout.
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
}

impl Default for MemorySessionStore {
    fn default() -> Self { Self::new(Duration::from_secs(60 * 60)) }
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, sessions: RwLock::new(HashMap::new()) }
    }

    pub fn ttl(&self) -> Duration { self.ttl }

    pub fn len(&self) -> usize { self.sessions.read().len() }

    pub fn is_empty(&self) -> bool { self.sessions.read().is_empty() }
}

impl SessionStore for MemorySessionStore {
    fn create(&self, session: Session) -> Result<SessionId, getrandom::Error> {
        let id = SessionId::generate()?;
        let entry = SessionEntry { session, expires_at: Instant::now() + self.ttl };
        self.sessions.write().insert(id.clone(), entry);
        debug!(target: "session", ttl_secs = self.ttl.as_secs(), "session.create");
        Ok(id)
    }

    fn load(&self, id: &SessionId) -> Option<Session> {
        let now = Instant::now();
        let mut map = self.sessions.write();
        match map.get_mut(id) {
            Some(ent) if ent.expires_at > now => {
                ent.expires_at = now + self.ttl;
                Some(ent.session.clone())
            }
            Some(_) => {
                map.remove(id);
                debug!(target: "session", "session.expired");
                None
            }
            None => None,
        }
    }

    fn save(&self, id: &SessionId, session: Session) -> bool {
        let now = Instant::now();
        let mut map = self.sessions.write();
        match map.get_mut(id) {
            Some(ent) if ent.expires_at > now => {
                ent.session = session;
                ent.expires_at = now + self.ttl;
                true
            }
            Some(_) => {
                map.remove(id);
                false
            }
            None => false,
        }
    }

    fn destroy(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().remove(id).is_some();
        if removed { debug!(target: "session", "session.destroy"); }
        removed
    }

    fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut map = self.sessions.write();
        let before = map.len();
        map.retain(|_, ent| ent.expires_at > now);
        before - map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Role;

    fn alice() -> Principal {
        Principal { id: 42, username: "alice".into(), role: Role::User }
    }

    #[test]
    fn generated_ids_are_unique_and_urlsafe() {
        let a = SessionId::generate().unwrap();
        let b = SessionId::generate().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 43);
        assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn create_load_save_destroy() {
        let store = MemorySessionStore::default();
        let mut s = Session::anonymous();
        s.set_principal(alice());
        let id = store.create(s.clone()).unwrap();
        assert_eq!(store.load(&id), Some(s));

        let cleared = Session::anonymous();
        assert!(store.save(&id, cleared.clone()));
        assert_eq!(store.load(&id), Some(cleared));

        assert!(store.destroy(&id));
        assert!(!store.destroy(&id));
        assert_eq!(store.load(&id), None);
        assert!(!store.save(&id, Session::anonymous()));
    }

    #[test]
    fn unknown_id_loads_nothing() {
        let store = MemorySessionStore::default();
        assert_eq!(store.load(&SessionId::from("bogus")), None);
    }

    #[test]
    fn ttl_is_what_was_configured() {
        assert_eq!(MemorySessionStore::default().ttl(), Duration::from_secs(3600));
        assert_eq!(MemorySessionStore::new(Duration::from_secs(5)).ttl(), Duration::from_secs(5));
    }

    #[test]
    fn expired_sessions_vanish_and_sweep() {
        let store = MemorySessionStore::new(Duration::from_millis(0));
        let a = store.create(Session::anonymous()).unwrap();
        let _b = store.create(Session::anonymous()).unwrap();
        assert_eq!(store.load(&a), None);
        assert_eq!(store.sweep_expired(), 1);
        assert!(store.is_empty());
    }
}
