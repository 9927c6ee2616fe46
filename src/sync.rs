//! Style profile synchronisation
//!
//! Keeps the device-local profile snapshot and the remote `style_profiles`
//! table in step. Reads prefer the remote copy and cache it locally; writes
//! push the local snapshot up, updating the user's existing row when there is
//! one. Every remote failure degrades to the local copy.
//!
//! ```text
//! get_profile:          remote (user id | session id) ──hit──▶ cache locally ─▶ profile
//!                              │ miss / error
//!                              ▼
//!                       local snapshot ─▶ profile
//!
//! sync_local_to_remote: local snapshot ─▶ update existing row | insert ─▶ synced
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clock::{elapsed, Clock, SystemClock};
use crate::domain::ports::{LocalProfileStore, RemoteProfileStore};
use crate::domain::profile::{LocalProfile, StyleProfile, SyncState, SyncStatus};
use crate::error::Result;
use crate::quiz::QuizAnswers;

/// How long a successful sync stays fresh.
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(5 * 60);

/// Profile sync service
pub struct ProfileSync {
    local: Arc<dyn LocalProfileStore>,
    remote: Option<Arc<dyn RemoteProfileStore>>,
    clock: Arc<dyn Clock>,
    user_id: Option<String>,
    freshness: Duration,
    in_progress: AtomicBool,
}

impl std::fmt::Debug for ProfileSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileSync")
            .field("has_remote", &self.remote.is_some())
            .field("user_id", &self.user_id.as_deref().map(short_id))
            .field("freshness", &self.freshness)
            .finish_non_exhaustive()
    }
}

impl ProfileSync {
    /// Local-only service; no user, default freshness, system clock.
    pub fn new(local: Arc<dyn LocalProfileStore>) -> Self {
        Self {
            local,
            remote: None,
            clock: Arc::new(SystemClock),
            user_id: None,
            freshness: DEFAULT_FRESHNESS,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteProfileStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Signed-in user. Without one, profiles are keyed by the session id.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    /// Whether a push is currently running.
    pub fn is_syncing(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Current profile: the remote copy when one exists, else the local one.
    ///
    /// A remote hit is written through to the local snapshot and marks the
    /// state synced. Remote errors fall back to the local snapshot.
    pub async fn get_profile(&self) -> Option<StyleProfile> {
        let Some(remote) = &self.remote else {
            debug!("No remote profile store, using local profile");
            return self.local_profile().await;
        };

        match self.fetch_remote(remote.as_ref()).await {
            Ok(Some(profile)) => {
                self.cache_profile(&profile).await;
                info!(
                    id = ?profile.id,
                    has_quiz_answers = profile.quiz_answers.is_some(),
                    "Profile loaded from remote and cached"
                );
                Some(profile)
            }
            Ok(None) => {
                debug!("No remote profile, using local profile");
                self.local_profile().await
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch remote profile, falling back to local");
                self.local_profile().await
            }
        }
    }

    /// Push the local snapshot to the remote store.
    ///
    /// Returns `true` when the remote copy is known to be current, either
    /// because this push succeeded or because the last one is still fresh.
    /// Returns `false` while another push runs, without a remote store,
    /// without local quiz answers, or when the push fails.
    pub async fn sync_local_to_remote(&self) -> bool {
        let Some(_syncing) = self.begin_sync() else {
            debug!("Sync already in progress, skipping");
            return false;
        };

        let now = self.clock.now();
        let state = self.local.sync_state().await.unwrap_or_default();
        if self.is_fresh(&state, now) {
            debug!("Recently synced, skipping");
            return true;
        }

        let Some(remote) = &self.remote else {
            warn!("No remote profile store available");
            return false;
        };

        match self.push(remote.as_ref(), now).await {
            Ok(true) => {
                self.mark_synced(now).await;
                info!(user = ?self.user_id.as_deref().map(short_id), "Profile sync successful");
                true
            }
            Ok(false) => {
                warn!("No local profile to sync");
                false
            }
            Err(e) => {
                error!(error = %e, "Profile sync failed");
                let failed = SyncState {
                    status: SyncStatus::Error,
                    last_sync: state.last_sync,
                };
                if let Err(e) = self.local.set_sync_state(failed).await {
                    warn!(error = %e, "Failed to record sync error");
                }
                false
            }
        }
    }

    /// Sync status of the local snapshot; `Unknown` when it cannot be read.
    pub async fn sync_status(&self) -> SyncStatus {
        self.local
            .sync_state()
            .await
            .map(|state| state.status)
            .unwrap_or_default()
    }

    /// Push pending or failed changes; refresh a stale synced copy.
    pub async fn check_and_sync(&self) {
        let state = self.local.sync_state().await.unwrap_or_default();

        match state.status {
            SyncStatus::Pending | SyncStatus::Error => {
                self.sync_local_to_remote().await;
            }
            SyncStatus::Synced => {
                let now = self.clock.now();
                let stale = state
                    .last_sync
                    .map_or(true, |at| elapsed(at, now) > self.freshness);
                if stale {
                    self.get_profile().await;
                }
            }
            SyncStatus::Unknown => {}
        }
    }

    /// Store a freshly completed quiz locally and mark it pending.
    pub async fn record_quiz(
        &self,
        answers: QuizAnswers,
        archetype: Option<Value>,
        color_profile: Option<Value>,
    ) -> Result<()> {
        let snapshot = LocalProfile {
            quiz_answers: Some(answers),
            archetype,
            color_profile,
            completed_at: Some(self.clock.now()),
        };
        self.local.save(&snapshot).await?;

        let previous = self.local.sync_state().await.unwrap_or_default();
        self.local
            .set_sync_state(SyncState {
                status: SyncStatus::Pending,
                last_sync: previous.last_sync,
            })
            .await?;

        let answered = snapshot.quiz_answers.as_ref().map_or(0, QuizAnswers::len);
        debug!(answered, "Recorded quiz locally");
        Ok(())
    }

    /// Drop the local snapshot and sync state.
    pub async fn clear_cache(&self) -> Result<()> {
        self.local.clear_profile().await?;
        info!("Cleared local profile");
        Ok(())
    }

    // -------------------------------------------------------------------------

    fn begin_sync(&self) -> Option<SyncInProgress<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| SyncInProgress(&self.in_progress))
    }

    fn is_fresh(&self, state: &SyncState, now: DateTime<Utc>) -> bool {
        state.status == SyncStatus::Synced
            && state
                .last_sync
                .is_some_and(|at| elapsed(at, now) < self.freshness)
    }

    async fn fetch_remote(&self, remote: &dyn RemoteProfileStore) -> Result<Option<StyleProfile>> {
        if let Some(user_id) = &self.user_id {
            debug!(user = short_id(user_id), "Fetching remote profile for user");
            let Some(mut profile) = remote.latest_for_user(user_id).await? else {
                return Ok(None);
            };

            match remote.answers_for_user(user_id).await {
                Ok(rows) => {
                    if !rows.is_empty() {
                        debug!(count = rows.len(), "Merged individual quiz answers");
                    }
                    profile.merge_answers(rows);
                }
                Err(e) => debug!(error = %e, "Skipping individual quiz answers"),
            }
            return Ok(Some(profile));
        }

        match self.local.session_id().await? {
            Some(session_id) => {
                debug!(session = short_id(&session_id), "Fetching remote profile for session");
                remote.latest_for_session(&session_id).await
            }
            None => Ok(None),
        }
    }

    /// Write a remote profile through to the local snapshot.
    async fn cache_profile(&self, profile: &StyleProfile) {
        let cached = async {
            let mut snapshot = self.local.load().await?.unwrap_or_default();
            snapshot.absorb(profile);
            self.local.save(&snapshot).await
        };
        if let Err(e) = cached.await {
            warn!(error = %e, "Failed to cache remote profile locally");
        }
        self.mark_synced(self.clock.now()).await;
    }

    async fn mark_synced(&self, at: DateTime<Utc>) {
        if let Err(e) = self.local.set_sync_state(SyncState::synced_at(at)).await {
            warn!(error = %e, "Failed to record sync state");
        }
    }

    async fn local_profile(&self) -> Option<StyleProfile> {
        match self.local.load().await {
            Ok(snapshot) => snapshot.and_then(|s| s.to_style_profile()),
            Err(e) => {
                warn!(error = %e, "Failed to read local profile");
                None
            }
        }
    }

    /// `Ok(false)` when there is nothing to push.
    async fn push(&self, remote: &dyn RemoteProfileStore, now: DateTime<Utc>) -> Result<bool> {
        let Some(mut profile) = self
            .local
            .load()
            .await?
            .and_then(|snapshot| snapshot.to_style_profile())
        else {
            return Ok(false);
        };

        let session_id = match self.local.session_id().await? {
            Some(session_id) => session_id,
            None => {
                let session_id = Uuid::new_v4().to_string();
                self.local.set_session_id(&session_id).await?;
                debug!(session = short_id(&session_id), "Issued session id");
                session_id
            }
        };

        profile.user_id = self.user_id.clone();
        profile.session_id = self.user_id.is_none().then_some(session_id);
        profile.completed_at = profile.completed_at.or(Some(now));
        profile.updated_at = Some(now);

        // a failed lookup is treated as no existing row
        let existing = match &self.user_id {
            Some(user_id) => remote
                .latest_for_user(user_id)
                .await
                .ok()
                .flatten()
                .and_then(|p| p.id),
            None => None,
        };

        match existing {
            Some(id) => {
                debug!(id, "Updating existing style profile");
                remote.update_profile(id, &profile).await?;
            }
            None => {
                profile.created_at = Some(now);
                let id = remote.insert_profile(&profile).await?;
                debug!(id, "Created style profile");
            }
        }
        Ok(true)
    }
}

/// Clears the in-progress flag when a push ends or is cancelled.
struct SyncInProgress<'a>(&'a AtomicBool);

impl Drop for SyncInProgress<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(end, _)| &id[..end])
}
