//! Rating math and match finalization.
//!
//! This crate owns everything that happens after a winner is declared:
//! team-average ELO deltas, the immutable match record, cumulative player
//! profiles, and the retrying writer that pushes both through the
//! [`RatingStore`] seam.

mod elo;
mod finalize;
mod record;
mod store;

pub use elo::{DEFAULT_ELO, EloSettings, expected_score, team1_delta, team_average};
pub use finalize::{FinalizeError, LineupPlayer, MatchFinalizer, MatchOutcome, RetryPolicy};
pub use record::{CombatStats, MatchPlayer, MatchRecord, PlayerProfile};
pub use store::{MemoryStore, RatingStore, StoreError};
