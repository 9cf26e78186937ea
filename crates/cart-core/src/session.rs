//! Session Management
//!
//! Per-visitor key/value storage that survives across requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{CartError, Result};

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A visitor session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    /// Authenticated user, `None` for anonymous visitors
    pub user_id: Option<String>,

    /// Arbitrary session data keyed by feature
    pub data: HashMap<String, Value>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last write timestamp
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new anonymous session
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    /// Create with specific ID
    pub fn with_id(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id: None,
            data: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub const fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Session store trait for persistence
///
/// Writing to a session that does not exist yet creates it, the same way a
/// host session is started lazily on first write.
pub trait SessionStore: Send + Sync {
    /// Save a whole session
    fn save(&self, session: &Session) -> Result<()>;

    /// Load a session by ID
    fn load(&self, id: &SessionId) -> Result<Option<Session>>;

    /// Read one value from a session
    fn get(&self, id: &SessionId, key: &str) -> Result<Option<Value>>;

    /// Replace one value in a session
    fn set(&self, id: &SessionId, key: &str, value: Value) -> Result<()>;

    /// Atomic read-modify-write of one value
    fn update(
        &self,
        id: &SessionId,
        key: &str,
        f: &mut dyn FnMut(Option<&Value>) -> Value,
    ) -> Result<()>;
}

/// In-memory session store (for development/testing)
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map_or(0, |s| s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> CartError {
    CartError::Session("session store lock poisoned".into())
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn load(&self, id: &SessionId) -> Result<Option<Session>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(id).cloned())
    }

    fn get(&self, id: &SessionId, key: &str) -> Result<Option<Value>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(id).and_then(|s| s.data.get(key)).cloned())
    }

    fn set(&self, id: &SessionId, key: &str, value: Value) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        let session = sessions
            .entry(id.clone())
            .or_insert_with(|| Session::with_id(id.clone()));
        session.data.insert(key.to_string(), value);
        session.touch();
        Ok(())
    }

    fn update(
        &self,
        id: &SessionId,
        key: &str,
        f: &mut dyn FnMut(Option<&Value>) -> Value,
    ) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        let session = sessions
            .entry(id.clone())
            .or_insert_with(|| Session::with_id(id.clone()));
        let next = f(session.data.get(key));
        session.data.insert(key.to_string(), next);
        session.touch();
        Ok(())
    }
}
