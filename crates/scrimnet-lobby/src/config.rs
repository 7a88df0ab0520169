//! Lobby tunables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration shared by every lobby spawned from one registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyConfig {
    /// Minimum members required before the host can start team formation.
    pub min_players: usize,

    /// Length of each auction bidding window. The deadline is fixed;
    /// bids do not extend it.
    pub auction_window: Duration,

    /// Auction budget each team starts with.
    pub starting_budget: u32,

    /// Delay between `purgeStart` and the first elimination.
    pub purge_countdown: Duration,

    /// Delay between successive eliminations.
    pub purge_step: Duration,

    /// How long a disconnected member is kept before it counts as a leave.
    pub reconnect_grace: Duration,

    /// Round score that ends the match automatically, if set.
    pub win_score: Option<u32>,

    /// Command channel size per lobby actor.
    pub channel_size: usize,

    /// Seed for purge elimination and code generation. `None` uses
    /// entropy; tests set it for reproducible outcomes.
    pub rng_seed: Option<u64>,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            min_players: 4,
            auction_window: Duration::from_secs(30),
            starting_budget: 1000,
            purge_countdown: Duration::from_secs(5),
            purge_step: Duration::from_secs(1),
            reconnect_grace: Duration::from_secs(30),
            win_score: None,
            channel_size: 64,
            rng_seed: None,
        }
    }
}
