//! Lobby orchestration for Scrimnet.
//!
//! Each lobby runs as an isolated Tokio task (actor model) owning the
//! phase machine, membership, team formation, and every timer that can
//! mutate lobby state on its own.
//!
//! # Key types
//!
//! - [`LobbyRegistry`] — creates/destroys lobbies, routes players
//! - [`LobbyHandle`] — send commands to a running lobby actor
//! - [`Lobby`] — the pure state aggregate behind an actor
//! - [`PresenceProvider`] — the voice-presence collaborator seam
//! - [`LobbyConfig`] — tunables (auction window, purge cadence, etc.)

mod actor;
mod code;
mod config;
mod draft;
mod error;
mod ledger;
mod lobby;
mod market;
mod presence;
mod purge;
mod registry;

pub use actor::{EventSender, LobbyHandle, LobbyInfo};
pub use code::{CODE_LEN, generate_code};
pub use config::LobbyConfig;
pub use draft::DraftState;
pub use error::LobbyError;
pub use ledger::{ImmunityLedger, TimeoutLedger};
pub use lobby::{AuctionProgress, Events, Lobby, StartRoute};
pub use market::AuctionState;
pub use presence::{AlwaysPresent, PresenceProvider};
pub use purge::PurgeState;
pub use registry::LobbyRegistry;
