//! The storage-collaborator seam.
//!
//! Match and profile persistence live outside this service. The core only
//! needs three operations, expressed as the [`RatingStore`] trait; the
//! production deployment implements it against the real database service,
//! while [`MemoryStore`] backs development and tests.

#![allow(async_fn_in_trait)]

use std::collections::HashMap;

use tokio::sync::Mutex;

use scrimnet_protocol::PlayerId;

use crate::{MatchRecord, PlayerProfile};

/// Errors surfaced by a rating store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing service could not be reached; the caller may retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the write outright; retrying will not help.
    #[error("store rejected write: {0}")]
    Rejected(String),
}

/// External persistence for match records and cumulative profiles.
pub trait RatingStore: Send + Sync + 'static {
    /// Fetches a player's profile, or `None` if they have never played.
    fn profile(
        &self,
        player: &PlayerId,
    ) -> impl std::future::Future<Output = Result<Option<PlayerProfile>, StoreError>> + Send;

    /// Persists a match record. Writes are keyed by `record.id`: saving
    /// the same id again must overwrite, so retrying after a partial
    /// failure cannot duplicate the match.
    fn save_match(
        &self,
        record: &MatchRecord,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Applies the finalized profiles for every participant.
    fn save_profiles(
        &self,
        profiles: &[PlayerProfile],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}

/// In-memory [`RatingStore`] for development and tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    profiles: HashMap<PlayerId, PlayerProfile>,
    matches: Vec<MatchRecord>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a profile (test setup helper).
    pub async fn insert_profile(&self, profile: PlayerProfile) {
        let mut inner = self.inner.lock().await;
        inner.profiles.insert(profile.odiscord_id.clone(), profile);
    }

    /// All match records saved so far, oldest first.
    pub async fn matches(&self) -> Vec<MatchRecord> {
        self.inner.lock().await.matches.clone()
    }
}

impl RatingStore for MemoryStore {
    async fn profile(&self, player: &PlayerId) -> Result<Option<PlayerProfile>, StoreError> {
        Ok(self.inner.lock().await.profiles.get(player).cloned())
    }

    async fn save_match(&self, record: &MatchRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.matches.iter().position(|m| m.id == record.id) {
            Some(idx) => inner.matches[idx] = record.clone(),
            None => inner.matches.push(record.clone()),
        }
        Ok(())
    }

    async fn save_profiles(&self, profiles: &[PlayerProfile]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        for profile in profiles {
            inner
                .profiles
                .insert(profile.odiscord_id.clone(), profile.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use scrimnet_protocol::{LobbyCode, TeamId};

    use super::*;

    #[tokio::test]
    async fn test_memory_store_profile_round_trip() {
        let store = MemoryStore::new();
        let pid = PlayerId::from("1");
        assert!(store.profile(&pid).await.unwrap().is_none());

        store
            .insert_profile(PlayerProfile::new(pid.clone(), "kira".into()))
            .await;

        let profile = store.profile(&pid).await.unwrap().unwrap();
        assert_eq!(profile.username, "kira");
        assert_eq!(profile.elo, crate::elo::DEFAULT_ELO);
    }

    #[tokio::test]
    async fn test_memory_store_save_profiles_overwrites() {
        let store = MemoryStore::new();
        let pid = PlayerId::from("1");
        let mut profile = PlayerProfile::new(pid.clone(), "kira".into());
        store.insert_profile(profile.clone()).await;

        profile.elo = 532;
        store.save_profiles(&[profile]).await.unwrap();

        assert_eq!(store.profile(&pid).await.unwrap().unwrap().elo, 532);
    }

    #[tokio::test]
    async fn test_memory_store_save_match_upserts_by_id() {
        let store = MemoryStore::new();
        let mut record = MatchRecord {
            id: "abc123".into(),
            lobby_code: LobbyCode("AB3X9".into()),
            created_at_ms: 0,
            winner_team: Some(TeamId::Team1),
            is_draw: false,
            is_ranked: true,
            elo_gain: 16,
            elo_loss: 16,
            winners: Vec::new(),
            losers: Vec::new(),
        };
        store.save_match(&record).await.unwrap();

        record.elo_gain = 20;
        store.save_match(&record).await.unwrap();

        let matches = store.matches().await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].elo_gain, 20);
    }
}
