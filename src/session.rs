use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{error::SessionError, models::MigrantProfile, navigation::SubjectKind};

/// Storage keys of the session area. All string-keyed access goes through
/// [`Session`]; nothing else in the crate names these.
pub mod keys {
    pub const MIGRANT_TOKEN: &str = "token";
    pub const USER_ID: &str = "userId";
    pub const USER: &str = "user";
    pub const DEPT_TOKEN: &str = "deptToken";
    pub const DEPARTMENT_NAME: &str = "departmentName";
    pub const GOV_TOKEN: &str = "govToken";
    pub const AGENCY_TOKEN: &str = "agencyToken";
    pub const RETURN_TO: &str = "returnTo";
    pub const NOTICE: &str = "notice";
}

/// The raw key-value area held per browser.
pub type Entries = BTreeMap<String, String>;

/// MigrantIdentity
///
/// A migrant sign-in as recorded in the session: the bearer token plus the
/// cached profile snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrantIdentity {
    pub token: String,
    pub user_id: Option<String>,
    pub profile: MigrantProfile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepartmentIdentity {
    pub token: String,
    pub department_name: String,
}

/// Session
///
/// Typed view over one browser's key-value area. Guards and flows only ever
/// read session state through these accessors. Empty values count as absent.
///
/// Writes are recorded key by key. A store merges only those writes into what
/// it holds, so two overlapping requests on one session never erase each
/// other's keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: Uuid,
    entries: Entries,
    // Keys written since load; `None` marks a removal.
    changes: BTreeMap<String, Option<String>>,
}

impl Session {
    pub fn new(id: Uuid) -> Self {
        Self::from_entries(id, Entries::new())
    }

    pub fn from_entries(id: Uuid, entries: Entries) -> Self {
        Self {
            id,
            entries,
            changes: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Pending writes, in key order.
    pub fn changes(&self) -> &BTreeMap<String, Option<String>> {
        &self.changes
    }

    fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        self.entries.insert(key.to_string(), value.clone());
        self.changes.insert(key.to_string(), Some(value));
    }

    // Only keys this snapshot actually held are removed from the store.
    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.changes.insert(key.to_string(), None);
        }
    }

    // --- Migrant ---

    pub fn migrant_token(&self) -> Option<&str> {
        self.get(keys::MIGRANT_TOKEN)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.get(keys::USER_ID)
    }

    /// The cached profile. A corrupt entry reads as no profile at all.
    pub fn migrant_profile(&self) -> Option<MigrantProfile> {
        let raw = self.get(keys::USER)?;
        match serde_json::from_str(raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "discarding unreadable cached profile");
                None
            }
        }
    }

    /// Both the token and a readable profile must be present.
    pub fn migrant(&self) -> Option<MigrantIdentity> {
        let token = self.migrant_token()?.to_string();
        let profile = self.migrant_profile()?;
        Some(MigrantIdentity {
            token,
            user_id: self.user_id().map(str::to_string),
            profile,
        })
    }

    pub fn sign_in_migrant(
        &mut self,
        token: &str,
        profile: &MigrantProfile,
    ) -> Result<(), SessionError> {
        self.set(keys::MIGRANT_TOKEN, token);
        self.refresh_profile(profile)
    }

    /// Replaces the cached profile snapshot (and the user id derived from it).
    pub fn refresh_profile(&mut self, profile: &MigrantProfile) -> Result<(), SessionError> {
        let encoded = serde_json::to_string(profile)?;
        self.set(keys::USER, encoded);
        if !profile.id.is_empty() {
            self.set(keys::USER_ID, profile.id.clone());
        }
        Ok(())
    }

    // --- Department ---

    pub fn department(&self) -> Option<DepartmentIdentity> {
        Some(DepartmentIdentity {
            token: self.get(keys::DEPT_TOKEN)?.to_string(),
            department_name: self.get(keys::DEPARTMENT_NAME)?.to_string(),
        })
    }

    pub fn sign_in_department(&mut self, token: &str, department_name: &str) {
        self.set(keys::DEPT_TOKEN, token);
        self.set(keys::DEPARTMENT_NAME, department_name);
    }

    // --- Government & Agency ---

    pub fn government_token(&self) -> Option<&str> {
        self.get(keys::GOV_TOKEN)
    }

    pub fn sign_in_government(&mut self, token: &str) {
        self.set(keys::GOV_TOKEN, token);
    }

    pub fn agency_token(&self) -> Option<&str> {
        self.get(keys::AGENCY_TOKEN)
    }

    pub fn sign_in_agency(&mut self, token: &str) {
        self.set(keys::AGENCY_TOKEN, token);
    }

    /// Removes only the credentials belonging to `kind`.
    pub fn sign_out(&mut self, kind: SubjectKind) {
        let owned: &[&str] = match kind {
            SubjectKind::Migrant => &[keys::MIGRANT_TOKEN, keys::USER_ID, keys::USER],
            SubjectKind::Agency => &[keys::AGENCY_TOKEN],
            SubjectKind::Department => &[keys::DEPT_TOKEN, keys::DEPARTMENT_NAME],
            SubjectKind::Government => &[keys::GOV_TOKEN],
        };
        for key in owned {
            self.remove(key);
        }
    }

    /// Subject kinds currently holding credentials in this session.
    pub fn signed_in(&self) -> Vec<SubjectKind> {
        SubjectKind::ALL
            .into_iter()
            .filter(|kind| match kind {
                SubjectKind::Migrant => self.migrant_token().is_some(),
                SubjectKind::Agency => self.agency_token().is_some(),
                SubjectKind::Department => self.department().is_some(),
                SubjectKind::Government => self.government_token().is_some(),
            })
            .collect()
    }

    // --- Navigation State ---

    pub fn set_return_to(&mut self, path: &str) {
        self.set(keys::RETURN_TO, path);
    }

    pub fn return_to(&self) -> Option<&str> {
        self.get(keys::RETURN_TO)
    }

    pub fn take_return_to(&mut self) -> Option<String> {
        let value = self.return_to().map(str::to_string);
        self.remove(keys::RETURN_TO);
        value
    }

    pub fn push_notice(&mut self, message: &str) {
        self.set(keys::NOTICE, message);
    }

    /// One-shot: the notice is removed once read.
    pub fn take_notice(&mut self) -> Option<String> {
        let value = self.get(keys::NOTICE).map(str::to_string);
        self.remove(keys::NOTICE);
        value
    }
}

// 1. SessionStore Contract
/// SessionStore
///
/// Where session areas live between requests. Swappable between the
/// in-memory store and the file-backed store without touching handlers.
///
/// Sessions idle for longer than the store's TTL are treated as gone and are
/// swept out on the next save.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads a live session and marks it as seen.
    async fn load(&self, id: Uuid) -> Result<Option<Session>, SessionError>;

    /// Merges the session's pending writes into the stored entries under the
    /// store's lock. A session left without entries is dropped.
    async fn save(&self, session: &Session) -> Result<(), SessionError>;

    async fn remove(&self, id: Uuid) -> Result<(), SessionError>;
}

/// SessionState
///
/// The concrete type used to share the session store across the application state.
pub type SessionState = Arc<dyn SessionStore>;

/// Idle lifetime of a stored session unless configured otherwise.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    entries: Entries,
    last_seen: DateTime<Utc>,
}

/// The table both stores keep behind their lock.
#[derive(Debug)]
struct SessionTable {
    sessions: HashMap<Uuid, StoredSession>,
    ttl: TimeDelta,
}

impl SessionTable {
    fn new(sessions: HashMap<Uuid, StoredSession>, ttl: Duration) -> Self {
        Self {
            sessions,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    fn is_live(&self, stored: &StoredSession, now: DateTime<Utc>) -> bool {
        now - stored.last_seen <= self.ttl
    }

    fn load(&mut self, id: Uuid, now: DateTime<Utc>) -> Option<Session> {
        let live = self.is_live(self.sessions.get(&id)?, now);
        if !live {
            self.sessions.remove(&id);
            return None;
        }

        let stored = self.sessions.get_mut(&id)?;
        stored.last_seen = now;
        Some(Session::from_entries(id, stored.entries.clone()))
    }

    /// Returns whether the stored state changed.
    fn apply(&mut self, session: &Session, now: DateTime<Utc>) -> bool {
        if session.changes().is_empty() {
            return false;
        }

        let previous = self
            .sessions
            .remove(&session.id())
            .filter(|stored| self.is_live(stored, now));
        let existed = previous.is_some();
        let mut entries = previous.map(|stored| stored.entries).unwrap_or_default();

        for (key, value) in session.changes() {
            match value {
                Some(value) => entries.insert(key.clone(), value.clone()),
                None => entries.remove(key),
            };
        }

        if entries.is_empty() {
            return existed;
        }
        self.sessions.insert(
            session.id(),
            StoredSession {
                entries,
                last_seen: now,
            },
        );
        true
    }

    /// Drops every expired session, returning how many went.
    fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        let ttl = self.ttl;
        self.sessions
            .retain(|_, stored| now - stored.last_seen <= ttl);
        let swept = before - self.sessions.len();
        if swept > 0 {
            tracing::debug!(swept, "expired sessions evicted");
        }
        swept
    }
}

// 2. In-memory implementation
pub struct MemorySessionStore {
    table: RwLock<SessionTable>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            table: RwLock::new(SessionTable::new(HashMap::new(), ttl)),
        }
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.sessions.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: Uuid) -> Result<Option<Session>, SessionError> {
        Ok(self.table.write().await.load(id, Utc::now()))
    }

    async fn save(&self, session: &Session) -> Result<(), SessionError> {
        let now = Utc::now();
        let mut table = self.table.write().await;
        table.sweep(now);
        table.apply(session, now);
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        self.table.write().await.sessions.remove(&id);
        Ok(())
    }
}

// 3. File-backed implementation
#[derive(Serialize, Deserialize, Default)]
struct SessionFile {
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
    sessions: BTreeMap<String, StoredSession>,
}

/// FileSessionStore
///
/// Keeps every session in memory and rewrites a single JSON file on each change,
/// so sessions survive a restart. Writes go to a sibling temp file first and are
/// renamed into place.
pub struct FileSessionStore {
    path: PathBuf,
    table: RwLock<SessionTable>,
}

impl FileSessionStore {
    /// Opens the store at `path`, loading any existing sessions. A missing file
    /// starts an empty store; entries with unparseable ids are skipped.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref().to_path_buf();
        let sessions = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let file: SessionFile = serde_json::from_slice(&bytes)?;
                if let Some(saved_at) = file.saved_at {
                    tracing::debug!(saved_at = %saved_at.to_rfc3339(), "restoring sessions");
                }
                file.sessions
                    .into_iter()
                    .filter_map(|(id, stored)| Uuid::parse_str(&id).ok().map(|id| (id, stored)))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), sessions = sessions.len(), "session file opened");

        Ok(Self {
            path,
            table: RwLock::new(SessionTable::new(sessions, DEFAULT_SESSION_TTL)),
        })
    }

    /// Replaces the idle lifetime of stored sessions.
    pub fn with_ttl(self, ttl: Duration) -> Self {
        let sessions = self.table.into_inner().sessions;
        Self {
            path: self.path,
            table: RwLock::new(SessionTable::new(sessions, ttl)),
        }
    }

    async fn persist(&self, table: &SessionTable) -> Result<(), SessionError> {
        let file = SessionFile {
            saved_at: Some(Utc::now()),
            sessions: table
                .sessions
                .iter()
                .map(|(id, stored)| (id.to_string(), stored.clone()))
                .collect(),
        };
        let encoded = serde_json::to_vec_pretty(&file)?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, encoded).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, id: Uuid) -> Result<Option<Session>, SessionError> {
        // The refreshed `last_seen` reaches the file with the next write.
        Ok(self.table.write().await.load(id, Utc::now()))
    }

    async fn save(&self, session: &Session) -> Result<(), SessionError> {
        let now = Utc::now();
        // Held across the write so concurrent saves hit the file in order.
        let mut table = self.table.write().await;
        let swept = table.sweep(now);
        if table.apply(session, now) || swept > 0 {
            self.persist(&table).await?;
        }
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        let mut table = self.table.write().await;
        if table.sessions.remove(&id).is_some() {
            self.persist(&table).await?;
        }
        Ok(())
    }
}
