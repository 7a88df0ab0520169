//! The match finalizer: outcome in, persisted record + profile updates out.
//!
//! Finalization is the only path that touches the storage collaborator.
//! It never mutates lobby state — the caller keeps the lobby in `playing`
//! until this returns `Ok`, so a storage outage cannot strand a lobby in a
//! half-finished phase.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;

use scrimnet_protocol::{LobbyCode, PlayerId, TeamId, Winner};

use crate::elo::{self, EloSettings};
use crate::store::{RatingStore, StoreError};
use crate::{CombatStats, MatchPlayer, MatchRecord, PlayerProfile};

/// One rostered player as handed over by the lobby core.
#[derive(Debug, Clone)]
pub struct LineupPlayer {
    pub odiscord_id: PlayerId,
    pub username: String,
    /// Display rating snapshot taken at join; used as the pre-match rating.
    pub elo: i32,
    /// Combat totals if the game server reported them.
    pub stats: Option<CombatStats>,
}

/// The declared result of a match, before rating math.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub lobby_code: LobbyCode,
    pub winner: Winner,
    pub is_ranked: bool,
    pub team1: Vec<LineupPlayer>,
    pub team2: Vec<LineupPlayer>,
}

/// Bounded retry with exponential backoff for storage writes.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(250),
        }
    }
}

/// Errors from match finalization.
#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    /// A team roster was empty; there is nothing to rate.
    #[error("cannot finalize: {0} has no players")]
    EmptyTeam(TeamId),

    /// Storage stayed unreachable through every retry.
    #[error("storage failed after {attempts} attempts: {source}")]
    Store {
        attempts: u32,
        #[source]
        source: StoreError,
    },
}

/// Converts a match outcome into a persisted [`MatchRecord`] and updated
/// profiles.
pub struct MatchFinalizer<S> {
    store: Arc<S>,
    settings: EloSettings,
    retry: RetryPolicy,
}

impl<S: RatingStore> MatchFinalizer<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            settings: EloSettings::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the ELO tunables.
    pub fn with_settings(mut self, settings: EloSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Overrides the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Computes rating deltas, builds the immutable record, and persists
    /// everything through the store with bounded retries.
    pub async fn finalize(&self, outcome: MatchOutcome) -> Result<MatchRecord, FinalizeError> {
        if outcome.team1.is_empty() {
            return Err(FinalizeError::EmptyTeam(TeamId::Team1));
        }
        if outcome.team2.is_empty() {
            return Err(FinalizeError::EmptyTeam(TeamId::Team2));
        }

        let record = self.build_record(&outcome);

        let mut last_err = None;
        for attempt in 0..self.retry.attempts {
            if attempt > 0 {
                let delay = self.retry.base_delay * 2u32.pow(attempt - 1);
                tokio::time::sleep(delay).await;
            }
            match self.persist(&record).await {
                Ok(()) => {
                    tracing::info!(
                        match_id = %record.id,
                        code = %record.lobby_code,
                        ranked = record.is_ranked,
                        "match finalized"
                    );
                    return Ok(record);
                }
                Err(e) => {
                    tracing::warn!(
                        code = %record.lobby_code,
                        attempt = attempt + 1,
                        error = %e,
                        "finalization write failed"
                    );
                    last_err = Some(e);
                }
            }
        }

        Err(FinalizeError::Store {
            attempts: self.retry.attempts,
            source: last_err.unwrap_or_else(|| StoreError::Unavailable("no attempts".into())),
        })
    }

    fn build_record(&self, outcome: &MatchOutcome) -> MatchRecord {
        let avg1 = elo::team_average(&ratings(&outcome.team1));
        let avg2 = elo::team_average(&ratings(&outcome.team2));

        let score1 = match outcome.winner {
            Winner::Team1 => 1.0,
            Winner::Draw => 0.5,
            Winner::Team2 => 0.0,
        };

        // Casual matches record the result but move no rating.
        let delta1 = if outcome.is_ranked {
            elo::team1_delta(&self.settings, avg1, avg2, score1)
        } else {
            0
        };

        let team1_rows = rows(&outcome.team1, delta1);
        let team2_rows = rows(&outcome.team2, -delta1);

        // On a draw, team1 occupies the winners slot by convention; the
        // isDraw flag tells the client not to crown anyone.
        let (winners, losers, winners_delta) = match outcome.winner {
            Winner::Team2 => (team2_rows, team1_rows, -delta1),
            Winner::Team1 | Winner::Draw => (team1_rows, team2_rows, delta1),
        };

        MatchRecord {
            id: match_id(),
            lobby_code: outcome.lobby_code.clone(),
            created_at_ms: now_ms(),
            winner_team: outcome.winner.team(),
            is_draw: outcome.winner == Winner::Draw,
            is_ranked: outcome.is_ranked,
            elo_gain: winners_delta,
            elo_loss: winners_delta,
            winners,
            losers,
        }
    }

    /// One persistence attempt: record first, then every profile.
    ///
    /// `save_match` is keyed by the record id, so a retry after a partial
    /// failure overwrites rather than duplicates.
    async fn persist(&self, record: &MatchRecord) -> Result<(), StoreError> {
        self.store.save_match(record).await?;

        let mut profiles = Vec::with_capacity(record.winners.len() + record.losers.len());
        for (row, won) in record
            .winners
            .iter()
            .map(|r| (r, true))
            .chain(record.losers.iter().map(|r| (r, false)))
        {
            let mut profile = self
                .store
                .profile(&row.odiscord_id)
                .await?
                .unwrap_or_else(|| {
                    PlayerProfile::new(row.odiscord_id.clone(), row.username.clone())
                });
            profile.username = row.username.clone();
            profile.apply(row, won, record.is_draw);
            profiles.push(profile);
        }

        self.store.save_profiles(&profiles).await
    }
}

fn ratings(team: &[LineupPlayer]) -> Vec<i32> {
    team.iter().map(|p| p.elo).collect()
}

fn rows(team: &[LineupPlayer], delta: i32) -> Vec<MatchPlayer> {
    team.iter()
        .map(|p| MatchPlayer {
            odiscord_id: p.odiscord_id.clone(),
            username: p.username.clone(),
            old_elo: p.elo,
            new_elo: p.elo + delta,
            stats: p.stats,
        })
        .collect()
}

/// Random 32-char hex match id (128 bits).
fn match_id() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::store::MemoryStore;

    use super::*;

    fn lineup(id: &str, elo: i32) -> LineupPlayer {
        LineupPlayer {
            odiscord_id: PlayerId::from(id),
            username: id.to_string(),
            elo,
            stats: None,
        }
    }

    fn outcome(winner: Winner, ranked: bool) -> MatchOutcome {
        MatchOutcome {
            lobby_code: LobbyCode("AB3X9".into()),
            winner,
            is_ranked: ranked,
            team1: vec![lineup("a", 520), lineup("b", 480)],
            team2: vec![lineup("c", 500), lineup("d", 500)],
        }
    }

    fn avg(rows: &[MatchPlayer], old: bool) -> f64 {
        let sum: i32 = rows.iter().map(|r| if old { r.old_elo } else { r.new_elo }).sum();
        sum as f64 / rows.len() as f64
    }

    #[tokio::test]
    async fn test_finalize_winner_gains_loser_loses() {
        let store = Arc::new(MemoryStore::new());
        let finalizer = MatchFinalizer::new(Arc::clone(&store));

        let record = finalizer.finalize(outcome(Winner::Team1, true)).await.unwrap();

        assert_eq!(record.winner_team, Some(TeamId::Team1));
        assert!(!record.is_draw);
        assert!(record.elo_gain > 0, "even-strength win must gain rating");
        assert_eq!(record.elo_gain, record.elo_loss, "system is zero-sum");
        assert!(avg(&record.winners, false) >= avg(&record.winners, true));
        assert!(avg(&record.losers, false) <= avg(&record.losers, true));
    }

    #[tokio::test]
    async fn test_finalize_deltas_are_deterministic() {
        let store = Arc::new(MemoryStore::new());
        let finalizer = MatchFinalizer::new(Arc::clone(&store));

        let a = finalizer.finalize(outcome(Winner::Team2, true)).await.unwrap();
        let b = finalizer.finalize(outcome(Winner::Team2, true)).await.unwrap();

        assert_eq!(a.elo_gain, b.elo_gain);
        assert_eq!(
            a.winners.iter().map(|r| r.new_elo).collect::<Vec<_>>(),
            b.winners.iter().map(|r| r.new_elo).collect::<Vec<_>>(),
        );
    }

    #[tokio::test]
    async fn test_finalize_draw_splits_near_zero() {
        let store = Arc::new(MemoryStore::new());
        let finalizer = MatchFinalizer::new(Arc::clone(&store));

        let record = finalizer.finalize(outcome(Winner::Draw, true)).await.unwrap();

        assert!(record.is_draw);
        assert_eq!(record.winner_team, None);
        // Equal team averages drawing: no movement at all.
        assert_eq!(record.elo_gain, 0);
        for row in record.winners.iter().chain(record.losers.iter()) {
            assert_eq!(row.old_elo, row.new_elo);
        }
    }

    #[tokio::test]
    async fn test_finalize_casual_match_moves_no_rating() {
        let store = Arc::new(MemoryStore::new());
        let finalizer = MatchFinalizer::new(Arc::clone(&store));

        let record = finalizer.finalize(outcome(Winner::Team1, false)).await.unwrap();

        assert_eq!(record.elo_gain, 0);
        for row in record.winners.iter().chain(record.losers.iter()) {
            assert_eq!(row.old_elo, row.new_elo);
        }
        // The match itself is still recorded with a win/loss.
        let profile = store.profile(&PlayerId::from("a")).await.unwrap().unwrap();
        assert_eq!(profile.wins, 1);
    }

    #[tokio::test]
    async fn test_finalize_updates_profiles_in_store() {
        let store = Arc::new(MemoryStore::new());
        let finalizer = MatchFinalizer::new(Arc::clone(&store));

        let record = finalizer.finalize(outcome(Winner::Team1, true)).await.unwrap();

        let winner = store.profile(&PlayerId::from("a")).await.unwrap().unwrap();
        let loser = store.profile(&PlayerId::from("c")).await.unwrap().unwrap();
        assert_eq!(winner.elo, 520 + record.elo_gain);
        assert_eq!(winner.wins, 1);
        assert_eq!(loser.elo, 500 - record.elo_loss);
        assert_eq!(loser.losses, 1);
        assert_eq!(store.matches().await.len(), 1);
    }

    #[tokio::test]
    async fn test_finalize_empty_team_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let finalizer = MatchFinalizer::new(store);
        let mut bad = outcome(Winner::Team1, true);
        bad.team2.clear();

        let result = finalizer.finalize(bad).await;
        assert!(matches!(result, Err(FinalizeError::EmptyTeam(TeamId::Team2))));
    }

    // -- Retry behavior ---------------------------------------------------

    /// Store that fails a configured number of `save_match` calls, then
    /// delegates to a `MemoryStore`.
    struct FlakyStore {
        failures_left: AtomicU32,
        inner: MemoryStore,
    }

    impl FlakyStore {
        fn failing(times: u32) -> Self {
            Self {
                failures_left: AtomicU32::new(times),
                inner: MemoryStore::new(),
            }
        }
    }

    impl RatingStore for FlakyStore {
        async fn profile(&self, player: &PlayerId) -> Result<Option<PlayerProfile>, StoreError> {
            self.inner.profile(player).await
        }

        async fn save_match(&self, record: &MatchRecord) -> Result<(), StoreError> {
            if self.failures_left.fetch_sub(1, Ordering::SeqCst) > 0 {
                return Err(StoreError::Unavailable("simulated outage".into()));
            }
            self.inner.save_match(record).await
        }

        async fn save_profiles(&self, profiles: &[PlayerProfile]) -> Result<(), StoreError> {
            self.inner.save_profiles(profiles).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_finalize_retries_through_transient_outage() {
        let store = Arc::new(FlakyStore::failing(2));
        let finalizer = MatchFinalizer::new(Arc::clone(&store));

        let record = finalizer.finalize(outcome(Winner::Team1, true)).await.unwrap();
        assert_eq!(store.inner.matches().await.len(), 1);
        assert!(record.elo_gain > 0);
    }

    /// Store whose `save_profiles` fails a configured number of times
    /// after `save_match` already succeeded, leaving a torn write behind.
    struct TornStore {
        profile_failures: AtomicU32,
        inner: MemoryStore,
    }

    impl RatingStore for TornStore {
        async fn profile(&self, player: &PlayerId) -> Result<Option<PlayerProfile>, StoreError> {
            self.inner.profile(player).await
        }

        async fn save_match(&self, record: &MatchRecord) -> Result<(), StoreError> {
            self.inner.save_match(record).await
        }

        async fn save_profiles(&self, profiles: &[PlayerProfile]) -> Result<(), StoreError> {
            if self.profile_failures.fetch_sub(1, Ordering::SeqCst) > 0 {
                return Err(StoreError::Unavailable("simulated outage".into()));
            }
            self.inner.save_profiles(profiles).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_torn_write_keeps_one_record() {
        let store = Arc::new(TornStore {
            profile_failures: AtomicU32::new(1),
            inner: MemoryStore::new(),
        });
        let finalizer = MatchFinalizer::new(Arc::clone(&store));

        finalizer.finalize(outcome(Winner::Team1, true)).await.unwrap();

        // The first attempt persisted the record before the profile write
        // failed; the retry overwrites it rather than appending a twin.
        assert_eq!(store.inner.matches().await.len(), 1);
        let profile = store.inner.profile(&PlayerId::from("a")).await.unwrap().unwrap();
        assert_eq!(profile.wins, 1);
        assert_eq!(profile.games_played, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finalize_gives_up_after_exhausting_attempts() {
        let store = Arc::new(FlakyStore::failing(10));
        let finalizer = MatchFinalizer::new(Arc::clone(&store));

        let result = finalizer.finalize(outcome(Winner::Team1, true)).await;
        assert!(matches!(
            result,
            Err(FinalizeError::Store { attempts: 3, .. })
        ));
        // Nothing was persisted.
        assert!(store.inner.matches().await.is_empty());
    }
}
