//! Session-scoped persistence of wizard progress.
//!
//! Every key lives under [`NAMESPACE`]. The wizard state, the uploaded resume
//! bytes and the post-signup welcome snapshot are stored in separate slots so
//! the serialized form data only ever holds a file reference.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::signup::SignupFormData;
use crate::signup::reducer::WizardState;

pub const NAMESPACE: &str = "jobboard:signup-wizard";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Corrupt session payload: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Completed form data kept for the welcome screen, passwords removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WelcomeSnapshot {
    pub form_data: SignupFormData,
    pub completed_at: DateTime<Utc>,
}

impl WelcomeSnapshot {
    pub fn from_form(form_data: &SignupFormData, completed_at: DateTime<Utc>) -> Self {
        Self {
            form_data: form_data.without_secrets(),
            completed_at,
        }
    }
}

fn state_key(session_id: Uuid) -> String {
    format!("{NAMESPACE}:{session_id}:state")
}

fn resume_key(session_id: Uuid) -> String {
    format!("{NAMESPACE}:{session_id}:resume")
}

fn welcome_key(session_id: Uuid) -> String {
    format!("{NAMESPACE}:{session_id}:welcome")
}

fn decode<T: DeserializeOwned>(raw: Option<Vec<u8>>) -> Result<Option<T>, StoreError> {
    raw.map(|bytes| serde_json::from_slice(&bytes))
        .transpose()
        .map_err(StoreError::from)
}

/// Storage for signup sessions. Implement the raw key operations; the typed
/// helpers are shared.
///
/// Carried in `AppState` as `Arc<dyn WizardStore>`.
#[async_trait]
pub trait WizardStore: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Writes `value` with the store's session expiry.
    async fn set_raw(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Reads and deletes `key` in one step.
    async fn take_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn delete_raw(&self, keys: &[String]) -> Result<(), StoreError>;

    async fn load(&self, session_id: Uuid) -> Result<Option<WizardState>, StoreError> {
        decode(self.get_raw(&state_key(session_id)).await?)
    }

    async fn save(&self, session_id: Uuid, state: &WizardState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(state)?;
        self.set_raw(&state_key(session_id), bytes).await
    }

    /// Removes the wizard state and any uploaded resume.
    async fn delete(&self, session_id: Uuid) -> Result<(), StoreError> {
        self.delete_raw(&[state_key(session_id), resume_key(session_id)])
            .await
    }

    async fn save_resume(&self, session_id: Uuid, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.set_raw(&resume_key(session_id), bytes).await
    }

    async fn load_resume(&self, session_id: Uuid) -> Result<Option<Vec<u8>>, StoreError> {
        self.get_raw(&resume_key(session_id)).await
    }

    async fn save_welcome(
        &self,
        session_id: Uuid,
        snapshot: &WelcomeSnapshot,
    ) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(snapshot)?;
        self.set_raw(&welcome_key(session_id), bytes).await
    }

    /// Returns the welcome snapshot once; later calls see `None`.
    async fn take_welcome(&self, session_id: Uuid) -> Result<Option<WelcomeSnapshot>, StoreError> {
        decode(self.take_raw(&welcome_key(session_id)).await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Redis
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RedisWizardStore {
    conn: MultiplexedConnection,
    ttl_secs: u64,
}

impl RedisWizardStore {
    pub async fn connect(redis_url: &str, ttl_secs: u64) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("Redis session store connected (ttl: {ttl_secs}s)");
        Ok(Self { conn, ttl_secs })
    }
}

#[async_trait]
impl WizardStore for RedisWizardStore {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await?;
        debug!("Saved {key}");
        Ok(())
    }

    async fn take_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        let (value, _deleted): (Option<Vec<u8>>, i64) = redis::pipe()
            .atomic()
            .cmd("GET")
            .arg(key)
            .cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn delete_raw(&self, keys: &[String]) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("DEL").arg(keys).query_async(&mut conn).await?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Process-local store for development and tests. Same keys and expiry
/// semantics as Redis.
pub struct MemoryWizardStore {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
}

impl MemoryWizardStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    /// Drops every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl WizardStore for MemoryWizardStore {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut entries = self.entries.lock().await;
        let expired = entries
            .get(key)
            .is_some_and(|e| e.expires_at <= Instant::now());
        if expired {
            entries.remove(key);
        }
        Ok(entries.get(key).map(|e| e.value.clone()))
    }

    async fn set_raw(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let now = Instant::now();
        let entry = Entry {
            value,
            expires_at: now + self.ttl,
        };
        let mut entries = self.entries.lock().await;
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn take_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let entry = self.entries.lock().await.remove(key);
        Ok(entry
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value))
    }

    async fn delete_raw(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}
