//! Error types for the lobby core.
//!
//! Every rejected action maps to one variant; the server layer renders the
//! `Display` string into the client-facing `error` event, so the messages
//! are written for players, not operators.

use scrimnet_protocol::{LobbyCode, Phase, PlayerId, TeamId};
use scrimnet_rating::FinalizeError;

/// Errors that can occur during lobby operations.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// No lobby with this code exists.
    #[error("lobby {0} not found")]
    NotFound(LobbyCode),

    /// The lobby has no more room for joiners.
    #[error("lobby {0} is full")]
    LobbyFull(LobbyCode),

    /// The player is already a member of a lobby.
    #[error("player {0} is already in a lobby")]
    AlreadyInLobby(PlayerId),

    /// The player is not a member of this lobby.
    #[error("player {0} is not in this lobby")]
    NotInLobby(PlayerId),

    /// A host-only action attempted by a non-host.
    #[error("only the host can do that")]
    NotHost,

    /// A captain-only action attempted by a non-captain.
    #[error("only a captain can do that")]
    NotCaptain,

    /// A pick attempted by the captain whose team is not on turn.
    #[error("it is not your turn to pick")]
    NotYourTurn,

    /// The action is not legal in the lobby's current phase.
    #[error("cannot {action} while the lobby is {phase}")]
    WrongPhase { action: &'static str, phase: Phase },

    /// Joining a private lobby without a whitelist entry.
    #[error("this lobby is private")]
    NotWhitelisted,

    /// The player is serving a cross-lobby timeout.
    #[error("you are timed out for another {mins} minute(s)")]
    TimedOut { mins: u64 },

    /// Too few members to start team formation.
    #[error("need at least {need} players to start, have {have}")]
    NotEnoughPlayers { have: usize, need: usize },

    /// A public lobby cannot start until every member reports present.
    #[error("all players must be in the voice channel to start")]
    MembersAbsent,

    /// `maxPlayers` outside the supported range.
    #[error("invalid lobby size: {0}")]
    InvalidMaxPlayers(usize),

    /// The player is already a captain.
    #[error("player {0} is already a captain")]
    AlreadyCaptain(PlayerId),

    /// `removeCaptain` on a player who is not a captain.
    #[error("player {0} is not a captain")]
    NotACaptain(PlayerId),

    /// A draft pick targeting a player already on a team.
    #[error("player {0} is already on a team")]
    AlreadyAssigned(PlayerId),

    /// The team's roster has reached auction capacity.
    #[error("{0} has no open roster slots")]
    TeamFull(TeamId),

    /// A bid at or below the current leading bid.
    #[error("bid must be at least {minimum}")]
    BidTooLow { minimum: u32 },

    /// A bid beyond the team's remaining budget.
    #[error("bid exceeds your remaining budget of {budget}")]
    InsufficientBudget { budget: u32 },

    /// No player is currently up for auction.
    #[error("no auction is in progress")]
    NoActiveAuction,

    /// Team color id outside 0–7.
    #[error("team color {0} is out of range")]
    InvalidColor(u8),

    /// The intent is not something a lobby can act on.
    #[error("unsupported action")]
    Unsupported,

    /// The lobby's command channel is closed or full.
    #[error("lobby {0} is unavailable")]
    Unavailable(LobbyCode),

    /// Match finalization failed; the lobby remains in `playing`.
    #[error(transparent)]
    Finalize(#[from] FinalizeError),
}
