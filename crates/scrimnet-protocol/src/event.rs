//! Server→client events.
//!
//! Same internally tagged JSON shape as intents. `lobbyUpdate` carries a
//! full [`LobbySnapshot`] after every successful mutation; the incremental
//! purge/auction events exist so the client can animate sequentially.

use serde::{Deserialize, Serialize};

use crate::{LobbySnapshot, PlayerId, PublicLobby, TeamId};

/// Everything the service pushes to connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Your `createLobby` succeeded; you are the host.
    LobbyCreated { lobby: LobbySnapshot },

    /// Your `joinLobby` succeeded.
    LobbyJoined { lobby: LobbySnapshot },

    /// You reconnected within the grace window and are still a member.
    RejoinedLobby { lobby: LobbySnapshot },

    /// Full state refresh after any mutation.
    LobbyUpdate { lobby: LobbySnapshot },

    /// The lobby is gone; stop rendering it.
    LobbyClosed { reason: String },

    /// A player was removed by the host.
    #[serde(rename_all = "camelCase")]
    PlayerKicked {
        odiscord_id: PlayerId,
        reason: String,
    },

    /// Confirmation for the host's `timeoutPlayer`.
    #[serde(rename_all = "camelCase")]
    TimeoutSuccess { odiscord_id: PlayerId, mins: u64 },

    // -- Purge --
    /// The purge countdown has begun; `count` players will be eliminated.
    PurgeStart { count: usize, seconds: u64 },

    /// A player spent their immunity token and is exempt this purge.
    #[serde(rename_all = "camelCase")]
    ImmunityUsed { odiscord_id: PlayerId },

    /// One player was eliminated (emitted per elimination, in order).
    #[serde(rename_all = "camelCase")]
    PlayerEliminated { odiscord_id: PlayerId },

    /// The purge finished; these members remain.
    PurgeComplete { survivors: Vec<PlayerId> },

    // -- Market --
    /// A bidding window opened for a player.
    #[serde(rename_all = "camelCase")]
    AuctionStart { odiscord_id: PlayerId, seconds: u64 },

    /// A team placed a new leading bid.
    BidUpdate { team: TeamId, amount: u32 },

    /// The window closed; the player was assigned.
    #[serde(rename_all = "camelCase")]
    AuctionEnd {
        odiscord_id: PlayerId,
        team: TeamId,
        amount: u32,
    },

    // -- Finalization --
    /// The match was persisted; ratings are updated.
    #[serde(rename_all = "camelCase")]
    MatchFinalized { match_id: String },

    /// Voice-channel presence report.
    #[serde(rename = "vcStatus")]
    VcStatus {
        #[serde(rename = "playersInVC")]
        players_in_vc: Vec<PlayerId>,
        #[serde(rename = "allInVC")]
        all_in_vc: bool,
    },

    /// Current public lobbies for the browse page.
    LobbiesUpdate { lobbies: Vec<PublicLobby> },

    /// A rejected action; lobby state is unchanged.
    Error { message: String },
}

impl ServerEvent {
    /// Convenience constructor for validation failures.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
