//! In-memory profile store adapters
//!
//! Stand-ins for the device-local snapshot and the remote profile tables.
//! The remote store can be switched offline to reproduce outages.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::domain::ports::{LocalProfileStore, RemoteProfileStore};
use crate::domain::profile::{LocalProfile, QuizAnswerRow, StyleProfile, SyncState};
use crate::error::{Error, Result};

// =============================================================================
// Local snapshot
// =============================================================================

#[derive(Debug, Default)]
struct LocalState {
    profile: Option<LocalProfile>,
    sync: SyncState,
    session_id: Option<String>,
}

/// Device-local snapshot held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryLocalProfileStore {
    state: RwLock<LocalState>,
}

impl InMemoryLocalProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with a snapshot.
    pub fn with_profile(profile: LocalProfile) -> Self {
        let store = Self::default();
        store.state.write().profile = Some(profile);
        store
    }
}

#[async_trait]
impl LocalProfileStore for InMemoryLocalProfileStore {
    async fn load(&self) -> Result<Option<LocalProfile>> {
        Ok(self.state.read().profile.clone())
    }

    async fn save(&self, profile: &LocalProfile) -> Result<()> {
        self.state.write().profile = Some(profile.clone());
        Ok(())
    }

    async fn sync_state(&self) -> Result<SyncState> {
        Ok(self.state.read().sync)
    }

    async fn set_sync_state(&self, state: SyncState) -> Result<()> {
        self.state.write().sync = state;
        Ok(())
    }

    async fn session_id(&self) -> Result<Option<String>> {
        Ok(self.state.read().session_id.clone())
    }

    async fn set_session_id(&self, session_id: &str) -> Result<()> {
        self.state.write().session_id = Some(session_id.to_string());
        Ok(())
    }

    async fn clear_profile(&self) -> Result<()> {
        let mut state = self.state.write();
        state.profile = None;
        state.sync = SyncState::default();
        Ok(())
    }
}

// =============================================================================
// Remote tables
// =============================================================================

/// Remote `style_profiles` / `quiz_answers` tables held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryRemoteProfileStore {
    profiles: RwLock<Vec<StyleProfile>>,
    answers: RwLock<Vec<(String, QuizAnswerRow)>>,
    offline: AtomicBool,
    writes: AtomicU64,
}

impl InMemoryRemoteProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Store an individually saved answer for `user_id`.
    pub fn insert_answer(&self, user_id: &str, question_id: &str, answer: serde_json::Value) {
        self.answers.write().push((
            user_id.to_string(),
            QuizAnswerRow {
                question_id: question_id.to_string(),
                answer,
            },
        ));
    }

    /// Every stored profile, in insertion order.
    pub fn profiles(&self) -> Vec<StyleProfile> {
        self.profiles.read().clone()
    }

    /// Number of inserts and updates received.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable("profile store offline".into()));
        }
        Ok(())
    }

    fn latest_where(&self, owned: impl Fn(&StyleProfile) -> bool) -> Option<StyleProfile> {
        self.profiles
            .read()
            .iter()
            .filter(|p| owned(*p))
            .max_by_key(|p| (p.created_at, p.id))
            .cloned()
    }
}

#[async_trait]
impl RemoteProfileStore for InMemoryRemoteProfileStore {
    async fn latest_for_user(&self, user_id: &str) -> Result<Option<StyleProfile>> {
        self.ensure_online()?;
        Ok(self.latest_where(|p| p.user_id.as_deref() == Some(user_id)))
    }

    async fn latest_for_session(&self, session_id: &str) -> Result<Option<StyleProfile>> {
        self.ensure_online()?;
        Ok(self.latest_where(|p| p.session_id.as_deref() == Some(session_id)))
    }

    async fn answers_for_user(&self, user_id: &str) -> Result<Vec<QuizAnswerRow>> {
        self.ensure_online()?;
        Ok(self
            .answers
            .read()
            .iter()
            .filter(|(owner, _)| owner == user_id)
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn insert_profile(&self, profile: &StyleProfile) -> Result<i64> {
        self.ensure_online()?;
        self.writes.fetch_add(1, Ordering::Relaxed);

        let mut profiles = self.profiles.write();
        let id = profiles.len() as i64 + 1;
        let mut stored = profile.clone();
        stored.id = Some(id);
        stored.created_at = stored.created_at.or_else(|| Some(Utc::now()));
        profiles.push(stored);
        Ok(id)
    }

    async fn update_profile(&self, id: i64, profile: &StyleProfile) -> Result<()> {
        self.ensure_online()?;
        self.writes.fetch_add(1, Ordering::Relaxed);

        let mut profiles = self.profiles.write();
        let existing = profiles
            .iter_mut()
            .find(|p| p.id == Some(id))
            .ok_or_else(|| Error::Internal(format!("no style profile with id {}", id)))?;

        let created_at = existing.created_at;
        *existing = profile.clone();
        existing.id = Some(id);
        existing.created_at = created_at;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[tokio::test]
    async fn test_local_clear_keeps_session() {
        let store = InMemoryLocalProfileStore::with_profile(LocalProfile::default());
        store.set_session_id("s-1").await.unwrap();
        store.set_sync_state(SyncState::synced_at(Utc::now())).await.unwrap();

        store.clear_profile().await.unwrap();

        assert!(store.load().await.unwrap().is_none());
        assert_eq!(store.sync_state().await.unwrap(), SyncState::default());
        assert_eq!(store.session_id().await.unwrap().as_deref(), Some("s-1"));
    }

    #[tokio::test]
    async fn test_remote_update_keeps_id_and_creation_time() {
        let store = InMemoryRemoteProfileStore::new();
        let id = store
            .insert_profile(&StyleProfile {
                user_id: Some("u-1".into()),
                gender: Some("male".into()),
                ..StyleProfile::default()
            })
            .await
            .unwrap();
        let created_at = store.profiles()[0].created_at;

        store
            .update_profile(
                id,
                &StyleProfile {
                    user_id: Some("u-1".into()),
                    gender: Some("female".into()),
                    ..StyleProfile::default()
                },
            )
            .await
            .unwrap();

        let latest = store.latest_for_user("u-1").await.unwrap().unwrap();
        assert_eq!(latest.id, Some(id));
        assert_eq!(latest.created_at, created_at);
        assert_eq!(latest.gender.as_deref(), Some("female"));
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_remote_answers_and_outage() {
        let store = InMemoryRemoteProfileStore::new();
        store.insert_answer("u-1", "gender", json!("female"));
        store.insert_answer("u-2", "gender", json!("male"));

        let rows = store.answers_for_user("u-1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].answer, json!("female"));

        store.set_offline(true);
        assert_matches!(
            store.latest_for_session("s-1").await,
            Err(Error::StoreUnavailable(_))
        );
    }
}
