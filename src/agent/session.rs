//! In-memory session store.
//!
//! Each session sits behind its own async mutex. A chat turn holds that
//! lock from classification through the store update, so turns for one
//! key run in arrival order while different keys proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::agent::intent::NftInfo;
use crate::agent::router::Mode;
use crate::llm::Role;

/// Progress label of a session's collection flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Initial,
    NftStart,
    NftCreationComplete,
    TransferHandler,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::NftStart => "nft_start",
            Self::NftCreationComplete => "nft_creation_complete",
            Self::TransferHandler => "transfer_handler",
        }
    }

    /// Mode implied by the label prefix, if any.
    pub fn mode(&self) -> Option<Mode> {
        match self {
            Self::Initial => None,
            Self::NftStart | Self::NftCreationComplete => Some(Mode::Nft),
            Self::TransferHandler => Some(Mode::Transfer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// `{wallet}_{mode}`, or the bare wallet when the request named no mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(wallet_address: &str, mode: Option<Mode>) -> Self {
        let wallet = wallet_address.trim();
        match mode {
            Some(mode) => Self(format!("{wallet}_{}", mode.as_str())),
            None => Self(wallet.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub key: SessionKey,
    pub turns: Vec<Turn>,
    pub nft_info: NftInfo,
    pub phase: Phase,
    pub wallet_address: String,
    pub current_balance: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(key: SessionKey) -> Self {
        let now = Utc::now();
        Self {
            key,
            turns: Vec::new(),
            nft_info: NftInfo::default(),
            phase: Phase::Initial,
            wallet_address: String::new(),
            current_balance: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Role::User, content.into());
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Role::Assistant, content.into());
    }

    fn push(&mut self, role: Role, content: String) {
        let at = Utc::now();
        self.turns.push(Turn { role, content, at });
        self.updated_at = at;
    }

    /// Clear history, entity bag and phase. Wallet and balance survive.
    pub fn reset_conversation(&mut self) {
        self.turns.clear();
        self.nft_info = NftInfo::default();
        self.phase = Phase::Initial;
        self.updated_at = Utc::now();
    }

    /// The last `n` turns, oldest first.
    pub fn recent_turns(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            key: self.key.clone(),
            phase: self.phase,
            turn_count: self.turns.len(),
            nft_info: self.nft_info.clone(),
            wallet_address: self.wallet_address.clone(),
            current_balance: self.current_balance.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Read-only summary exposed over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub key: SessionKey,
    pub phase: Phase,
    pub turn_count: usize,
    pub nft_info: NftInfo,
    pub wallet_address: String,
    pub current_balance: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied by [`SessionStore::update`].
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub phase: Option<Phase>,
    pub nft_info: Option<NftInfo>,
    pub wallet_address: Option<String>,
    pub current_balance: Option<String>,
}

impl SessionPatch {
    fn apply(self, session: &mut Session) {
        if let Some(phase) = self.phase {
            session.phase = phase;
        }
        if let Some(nft_info) = self.nft_info {
            session.nft_info = nft_info;
        }
        if let Some(wallet) = self.wallet_address {
            session.wallet_address = wallet;
        }
        if let Some(balance) = self.current_balance {
            session.current_balance = Some(balance);
        }
        session.updated_at = Utc::now();
    }
}

/// Exclusive access to one session for the length of a turn.
pub type SessionGuard = OwnedMutexGuard<Session>;

/// Process-wide session repository. No eviction, no persistence.
#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<HashMap<SessionKey, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, key: &SessionKey) -> Arc<Mutex<Session>> {
        if let Some(slot) = self.inner.read().await.get(key) {
            return Arc::clone(slot);
        }
        let mut map = self.inner.write().await;
        let slot = map.entry(key.clone()).or_insert_with(|| {
            tracing::debug!(session_key = %key, "session created");
            Arc::new(Mutex::new(Session::new(key.clone())))
        });
        Arc::clone(slot)
    }

    /// Lock the session for `key`, creating it if needed.
    ///
    /// A slot deleted while this call waited on it is skipped and the
    /// lookup starts over, so the guard always belongs to the live entry.
    pub async fn lock(&self, key: &SessionKey) -> SessionGuard {
        loop {
            let slot = self.slot(key).await;
            let guard = Arc::clone(&slot).lock_owned().await;
            if self.is_current(key, &slot).await {
                return guard;
            }
        }
    }

    async fn is_current(&self, key: &SessionKey, slot: &Arc<Mutex<Session>>) -> bool {
        self.inner
            .read()
            .await
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Copy of the session for `key`, creating it if needed.
    pub async fn get_or_create(&self, key: &SessionKey) -> Session {
        self.lock(key).await.clone()
    }

    pub async fn get(&self, key: &SessionKey) -> Option<Session> {
        let slot = self.inner.read().await.get(key).cloned()?;
        let session = slot.lock().await;
        Some(session.clone())
    }

    pub async fn snapshot(&self, key: &SessionKey) -> Option<SessionSnapshot> {
        let slot = self.inner.read().await.get(key).cloned()?;
        let session = slot.lock().await;
        Some(session.snapshot())
    }

    /// Replace the stored session wholesale.
    pub async fn upsert(&self, session: Session) {
        let key = session.key.clone();
        *self.lock(&key).await = session;
        tracing::debug!(session_key = %key, "session upserted");
    }

    /// Apply a partial update, creating the session if needed.
    pub async fn update(&self, key: &SessionKey, patch: SessionPatch) -> Session {
        let mut session = self.lock(key).await;
        patch.apply(&mut session);
        session.clone()
    }

    /// Remove the session for `key`. Waits for an in-flight turn on it to
    /// finish first.
    pub async fn delete(&self, key: &SessionKey) -> bool {
        let Some(slot) = self.inner.read().await.get(key).cloned() else {
            return false;
        };
        let _session = slot.lock().await;
        let mut map = self.inner.write().await;
        let same_slot = map
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, &slot));
        let removed = same_slot && map.remove(key).is_some();
        if removed {
            tracing::debug!(session_key = %key, "session deleted");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn key_format() {
        assert_eq!(
            SessionKey::new("0xabc", Some(Mode::Nft)).as_str(),
            "0xabc_nft"
        );
        assert_eq!(SessionKey::new(" 0xabc ", None).as_str(), "0xabc");
    }

    #[test]
    fn phase_labels_and_modes() {
        assert_eq!(Phase::NftCreationComplete.as_str(), "nft_creation_complete");
        assert_eq!(Phase::NftStart.mode(), Some(Mode::Nft));
        assert_eq!(Phase::TransferHandler.mode(), Some(Mode::Transfer));
        assert_eq!(Phase::Initial.mode(), None);
        assert_eq!(
            serde_json::to_string(&Phase::TransferHandler).unwrap(),
            "\"transfer_handler\""
        );
    }

    #[test]
    fn appended_turns_are_never_dropped() {
        let mut session = Session::new(SessionKey::new("0xabc", None));
        for i in 0..10 {
            session.push_user(format!("message {i}"));
        }
        assert_eq!(session.turns.len(), 10);
        assert_eq!(session.recent_turns(6).len(), 6);
        assert_eq!(session.recent_turns(6)[0].content, "message 4");
        assert_eq!(session.recent_turns(50).len(), 10);
    }

    #[test]
    fn reset_keeps_wallet() {
        let mut session = Session::new(SessionKey::new("0xabc", Some(Mode::Nft)));
        session.wallet_address = "0xabc".to_string();
        session.current_balance = Some("12.5".to_string());
        session.phase = Phase::NftStart;
        session.nft_info.name = Some("Cyber Cat".to_string());
        session.push_user("hi");

        session.reset_conversation();
        assert!(session.turns.is_empty());
        assert!(session.nft_info.is_empty());
        assert_eq!(session.phase, Phase::Initial);
        assert_eq!(session.wallet_address, "0xabc");
        assert_eq!(session.current_balance.as_deref(), Some("12.5"));
    }

    #[tokio::test]
    async fn repository_operations() {
        let store = SessionStore::new();
        let key = SessionKey::new("0xabc", Some(Mode::Transfer));
        assert!(store.get(&key).await.is_none());

        let created = store.get_or_create(&key).await;
        assert_eq!(created.phase, Phase::Initial);
        assert_eq!(store.len().await, 1);

        let updated = store
            .update(
                &key,
                SessionPatch {
                    phase: Some(Phase::TransferHandler),
                    current_balance: Some("3".to_string()),
                    ..SessionPatch::default()
                },
            )
            .await;
        assert_eq!(updated.phase, Phase::TransferHandler);

        let mut replacement = updated.clone();
        replacement.push_user("again");
        store.upsert(replacement).await;
        let snapshot = store.snapshot(&key).await.expect("snapshot");
        assert_eq!(snapshot.turn_count, 1);
        assert_eq!(snapshot.current_balance.as_deref(), Some("3"));

        assert!(store.delete(&key).await);
        assert!(!store.delete(&key).await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn same_key_turns_are_serialized() {
        let store = Arc::new(SessionStore::new());
        let key = SessionKey::new("0xabc", Some(Mode::Nft));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                let mut session = store.lock(&key).await;
                let before = session.turns.len();
                tokio::time::sleep(Duration::from_millis(2)).await;
                session.push_user(format!("turn {i}"));
                assert_eq!(session.turns.len(), before + 1);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.get(&key).await.unwrap().turns.len(), 8);
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let store = SessionStore::new();
        let a = SessionKey::new("0xaaa", None);
        let b = SessionKey::new("0xbbb", None);

        let _held = store.lock(&a).await;
        let other = tokio::time::timeout(Duration::from_millis(200), store.lock(&b)).await;
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn delete_waits_for_the_running_turn() {
        let store = Arc::new(SessionStore::new());
        let key = SessionKey::new("0xabc", Some(Mode::Nft));

        let mut running = store.lock(&key).await;
        running.push_user("mid-turn");

        let deleter = {
            let store = Arc::clone(&store);
            let key = key.clone();
            tokio::spawn(async move { store.delete(&key).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!deleter.is_finished());

        let next_turn = {
            let store = Arc::clone(&store);
            let key = key.clone();
            tokio::spawn(async move { store.lock(&key).await.turns.len() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(running);
        assert!(deleter.await.unwrap());
        assert_eq!(next_turn.await.unwrap(), 0);
        assert_eq!(store.len().await, 1);
    }
}
