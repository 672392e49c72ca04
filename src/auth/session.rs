// auth/session.rs - server-side sessions keyed by a hashed cookie token

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use super::superadmin::{SUPERADMIN_EMAIL, SUPERADMIN_ID};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::User;
use crate::types::{MandantScope, Role};

/// The user as stored in the session and handed to handlers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub mandant_id: Option<i32>,
    #[serde(default)]
    pub mandant_access: Vec<i32>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_profile_id: Option<i32>,
}

impl SessionUser {
    pub fn superadmin(username: &str) -> Self {
        Self {
            id: SUPERADMIN_ID.to_string(),
            username: username.to_string(),
            email: Some(SUPERADMIN_EMAIL.to_string()),
            role: Role::Superadmin,
            mandant_id: None,
            mandant_access: Vec::new(),
            first_name: Some("Super".to_string()),
            last_name: Some("Admin".to_string()),
            user_profile_id: None,
        }
    }

    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role(),
            mandant_id: user.mandant_id,
            mandant_access: user.mandant_access_ids(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            user_profile_id: user.user_profile_id,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_superadmin(&self) -> bool {
        self.role == Role::Superadmin
    }

    /// Own mandant first, then the extra grants, without duplicates
    pub fn accessible_mandants(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.mandant_id.into_iter().collect();
        for id in &self.mandant_access {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }

    /// Admins see everything; everyone else is limited to their mandants
    pub fn scope(&self) -> MandantScope {
        if self.is_admin() {
            MandantScope::All
        } else {
            MandantScope::Only(self.accessible_mandants())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user: SessionUser,
    pub login_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(user: SessionUser, now: DateTime<Utc>) -> Self {
        Self {
            user,
            login_time: now,
            last_activity: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExpiry {
    Absolute,
    Inactivity,
}

impl SessionExpiry {
    pub fn reason(&self) -> &'static str {
        match self {
            SessionExpiry::Absolute => "absolute_timeout",
            SessionExpiry::Inactivity => "inactivity_timeout",
        }
    }
}

/// Absolute lifetime since login plus an idle limit since the last request
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub absolute: Duration,
    pub inactivity: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            absolute: Duration::hours(24),
            inactivity: Duration::hours(2),
        }
    }
}

impl SessionPolicy {
    pub fn from_config() -> Self {
        let session = &crate::config::config().session;
        Self {
            absolute: Duration::seconds(session.absolute_timeout_secs.max(1)),
            inactivity: Duration::seconds(session.inactivity_timeout_secs.max(1)),
        }
    }

    pub fn check(&self, record: &SessionRecord, now: DateTime<Utc>) -> Result<(), SessionExpiry> {
        if now - record.login_time > self.absolute {
            return Err(SessionExpiry::Absolute);
        }
        if now - record.last_activity > self.inactivity {
            return Err(SessionExpiry::Inactivity);
        }
        Ok(())
    }

    /// The earlier of the two deadlines; used as the row expiry
    pub fn expires_at(&self, record: &SessionRecord) -> DateTime<Utc> {
        (record.login_time + self.absolute).min(record.last_activity + self.inactivity)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session store database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Session payload error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for SessionError {
    fn from(err: sqlx::Error) -> Self {
        SessionError::Database(DatabaseError::Sqlx(err))
    }
}

/// Persistence for session records, keyed by the token hash
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, sid: &str, record: &SessionRecord, expire: DateTime<Utc>) -> Result<(), SessionError>;
    async fn load(&self, sid: &str) -> Result<Option<SessionRecord>, SessionError>;
    async fn destroy(&self, sid: &str) -> Result<(), SessionError>;
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, SessionError>;
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, (SessionRecord, DateTime<Utc>)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, sid: &str, record: &SessionRecord, expire: DateTime<Utc>) -> Result<(), SessionError> {
        self.sessions
            .write()
            .await
            .insert(sid.to_string(), (record.clone(), expire));
        Ok(())
    }

    async fn load(&self, sid: &str) -> Result<Option<SessionRecord>, SessionError> {
        Ok(self.sessions.read().await.get(sid).map(|(record, _)| record.clone()))
    }

    async fn destroy(&self, sid: &str) -> Result<(), SessionError> {
        self.sessions.write().await.remove(sid);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, SessionError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, (_, expire)| *expire > now);
        Ok((before - sessions.len()) as u64)
    }
}

/// `sessions` table: sid, sess (jsonb), expire
#[derive(Debug, Default)]
pub struct PgSessionStore;

impl PgSessionStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn save(&self, sid: &str, record: &SessionRecord, expire: DateTime<Utc>) -> Result<(), SessionError> {
        let pool = DatabaseManager::main_pool().await?;
        let sess = serde_json::to_value(record)?;
        sqlx::query(
            "INSERT INTO sessions (sid, sess, expire) VALUES ($1, $2, $3) \
             ON CONFLICT (sid) DO UPDATE SET sess = EXCLUDED.sess, expire = EXCLUDED.expire",
        )
        .bind(sid)
        .bind(sess)
        .bind(expire)
        .execute(&pool)
        .await?;
        Ok(())
    }

    async fn load(&self, sid: &str) -> Result<Option<SessionRecord>, SessionError> {
        let pool = DatabaseManager::main_pool().await?;
        let row: Option<(serde_json::Value,)> = sqlx::query_as("SELECT sess FROM sessions WHERE sid = $1")
            .bind(sid)
            .fetch_optional(&pool)
            .await?;
        match row {
            Some((sess,)) => Ok(Some(serde_json::from_value(sess)?)),
            None => Ok(None),
        }
    }

    async fn destroy(&self, sid: &str) -> Result<(), SessionError> {
        let pool = DatabaseManager::main_pool().await?;
        sqlx::query("DELETE FROM sessions WHERE sid = $1")
            .bind(sid)
            .execute(&pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, SessionError> {
        let pool = DatabaseManager::main_pool().await?;
        let result = sqlx::query("DELETE FROM sessions WHERE expire <= $1")
            .bind(now)
            .execute(&pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// 32 random bytes, hex encoded; only ever sent to the client
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Store key for a cookie token
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[derive(Debug, Error)]
pub enum SessionCheckError {
    #[error("Not authenticated")]
    Missing,

    #[error("Session expired")]
    Expired(SessionExpiry),

    #[error(transparent)]
    Store(#[from] SessionError),
}

/// Session lifecycle on top of a store: create, authenticate (rolling), destroy
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    policy: SessionPolicy,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, policy: SessionPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Returns the cookie token for the new session
    pub async fn create(&self, user: SessionUser, now: DateTime<Utc>) -> Result<(String, SessionRecord), SessionError> {
        let token = generate_token();
        let record = SessionRecord::new(user, now);
        self.store
            .save(&hash_token(&token), &record, self.policy.expires_at(&record))
            .await?;
        Ok((token, record))
    }

    /// Validate the token and refresh its activity stamp. Expired sessions are destroyed.
    pub async fn authenticate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionRecord, SessionCheckError> {
        let sid = hash_token(token);
        let mut record = self.store.load(&sid).await?.ok_or(SessionCheckError::Missing)?;

        if let Err(expiry) = self.policy.check(&record, now) {
            self.store.destroy(&sid).await?;
            return Err(SessionCheckError::Expired(expiry));
        }

        record.last_activity = now;
        self.store.save(&sid, &record, self.policy.expires_at(&record)).await?;
        Ok(record)
    }

    pub async fn destroy(&self, token: &str) -> Result<(), SessionError> {
        self.store.destroy(&hash_token(token)).await
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, SessionError> {
        self.store.purge_expired(now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::session_user;

    fn manager() -> (Arc<MemorySessionStore>, SessionManager) {
        let store = Arc::new(MemorySessionStore::new());
        let manager = SessionManager::new(store.clone(), SessionPolicy::default());
        (store, manager)
    }

    #[tokio::test]
    async fn create_then_authenticate() {
        let (store, manager) = manager();
        let now = Utc::now();
        let (token, _) = manager.create(session_user(Role::User, Some(1), vec![]), now).await.unwrap();
        assert_eq!(token.len(), 64);
        assert_eq!(store.len().await, 1);

        let later = now + Duration::minutes(30);
        let record = manager.authenticate(&token, later).await.unwrap();
        assert_eq!(record.last_activity, later);
        assert_eq!(record.login_time, now);
    }

    #[tokio::test]
    async fn store_never_sees_raw_token() {
        let (store, manager) = manager();
        let (token, _) = manager.create(SessionUser::superadmin("root"), Utc::now()).await.unwrap();
        assert!(store.load(&token).await.unwrap().is_none());
        assert!(store.load(&hash_token(&token)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn inactivity_timeout_destroys_session() {
        let (store, manager) = manager();
        let now = Utc::now();
        let (token, _) = manager.create(session_user(Role::Admin, Some(1), vec![]), now).await.unwrap();

        let err = manager.authenticate(&token, now + Duration::hours(3)).await.unwrap_err();
        assert!(matches!(err, SessionCheckError::Expired(SessionExpiry::Inactivity)));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn rolling_activity_still_hits_absolute_limit() {
        let (_, manager) = manager();
        let start = Utc::now();
        let (token, _) = manager.create(session_user(Role::User, None, vec![]), start).await.unwrap();

        let mut now = start;
        for _ in 0..23 {
            now += Duration::hours(1);
            manager.authenticate(&token, now).await.unwrap();
        }
        let err = manager.authenticate(&token, start + Duration::hours(24) + Duration::minutes(1)).await.unwrap_err();
        assert!(matches!(err, SessionCheckError::Expired(SessionExpiry::Absolute)));
        assert_eq!(SessionExpiry::Absolute.reason(), "absolute_timeout");
    }

    #[tokio::test]
    async fn unknown_token_is_missing() {
        let (_, manager) = manager();
        assert!(matches!(
            manager.authenticate("deadbeef", Utc::now()).await,
            Err(SessionCheckError::Missing)
        ));
    }

    #[tokio::test]
    async fn purge_removes_expired_rows() {
        let (store, manager) = manager();
        let now = Utc::now();
        manager.create(session_user(Role::User, None, vec![]), now - Duration::hours(5)).await.unwrap();
        manager.create(session_user(Role::User, None, vec![]), now).await.unwrap();
        assert_eq!(manager.purge_expired(now).await.unwrap(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn accessible_mandants_deduplicate() {
        let user = session_user(Role::User, Some(3), vec![3, 5, 7]);
        assert_eq!(user.accessible_mandants(), vec![3, 5, 7]);
        assert_eq!(user.scope(), MandantScope::Only(vec![3, 5, 7]));
        assert_eq!(session_user(Role::Admin, Some(3), vec![]).scope(), MandantScope::All);
    }
}
